//! Covault Types - Core type definitions shared across the COVAULT treasury.
//!
//! This crate provides the fundamental types used throughout the governance
//! layer:
//! - Signer identifiers (20-byte, Bech32m encoded)
//! - The epoch counter driving expiry decisions

pub mod signer;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use signer::SignerId;
pub use error::TypesError;

/// Monotonically increasing time counter supplied by the host per call.
///
/// The governance layer never reads a wall clock; expiry comparisons use
/// whatever epoch the host passed in.
pub type Epoch = u64;
