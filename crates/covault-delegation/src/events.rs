//! Delegation notifications for off-chain observers.
//!
//! Every successful create, revoke, or lazily-discovered expiry emits
//! exactly one event. The lifecycle manager buffers them; the host drains
//! the buffer and ships them wherever its observers live.

use covault_types::{Epoch, SignerId};
use serde::{Deserialize, Serialize};

/// Structured notification of a delegation state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelegationEvent {
    Created {
        id: u64,
        delegator: SignerId,
        delegate: SignerId,
        expiry: Option<Epoch>,
        at: Epoch,
    },
    Revoked {
        id: u64,
        delegator: SignerId,
        delegate: SignerId,
        at: Epoch,
    },
    Expired {
        id: u64,
        delegator: SignerId,
        delegate: SignerId,
        at: Epoch,
    },
}

impl DelegationEvent {
    /// The delegator the event concerns.
    pub fn delegator(&self) -> SignerId {
        match self {
            DelegationEvent::Created { delegator, .. }
            | DelegationEvent::Revoked { delegator, .. }
            | DelegationEvent::Expired { delegator, .. } => *delegator,
        }
    }

    /// Delegation id the event refers to.
    pub fn delegation_id(&self) -> u64 {
        match self {
            DelegationEvent::Created { id, .. }
            | DelegationEvent::Revoked { id, .. }
            | DelegationEvent::Expired { id, .. } => *id,
        }
    }
}
