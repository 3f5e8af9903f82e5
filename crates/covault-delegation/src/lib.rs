//! Covault Delegation - vote delegation for the COVAULT treasury.
//!
//! Signers authorized to approve treasury proposals can hand their approval
//! authority to another signer, permanently or until an expiry epoch, so the
//! delegate votes on their behalf. This crate provides:
//! - Address-keyed delegation storage with bounded per-delegator history
//! - Bounded-cost chain resolution over the active-edge graph
//! - Create/revoke/expire lifecycle transitions that keep the graph acyclic
//! - The voting adapter consumed by the proposal-approval path
//!
//! Every operation is synchronous and cost-bounded: resolution and the
//! creation-time cycle probe are both O(max hops). The host supplies the
//! epoch counter and the eligible signer set per call.

pub mod store;
pub mod resolver;
pub mod lifecycle;
pub mod adapter;
pub mod events;
pub mod error;

pub use adapter::{BallotBook, BallotChoice, VotingAdapter};
pub use error::DelegationError;
pub use events::DelegationEvent;
pub use lifecycle::{DelegationConfig, LifecycleManager};
pub use resolver::{resolve, Resolution, MAX_DEPTH};
pub use store::{
    DelegationEdge, DelegationStore, EndReason, HistoryEntry, MemoryStore,
    DEFAULT_HISTORY_CAPACITY,
};
