//! Chain resolution.
//!
//! Pure traversal over the active-edge graph: follows delegations from a
//! starting signer to the effective voter. Iterative with an explicit
//! visited set, so the hop bound is enforced by construction and cost is
//! O(max_hops) regardless of graph history.

use std::collections::HashSet;

use covault_types::{Epoch, SignerId};

use crate::error::DelegationError;
use crate::store::DelegationStore;

/// Maximum delegation chain depth, enforced at creation time.
pub const MAX_DEPTH: u32 = 3;

/// Outcome of a chain resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Terminal signer of the chain
    pub effective: SignerId,
    /// Edges traversed to reach it
    pub hops: u32,
    /// Every signer visited, starting with the origin
    pub path: Vec<SignerId>,
}

/// Follow active delegation edges from `start` to the effective voter.
///
/// A missing edge or one whose expiry has been reached ends the chain;
/// pruning stale edges is the voting adapter's job, not ours. Reaching
/// `max_hops` ends the chain at the current signer; cycle and depth
/// checks at write time keep that branch cold.
///
/// # Errors
/// Returns `CycleDetected` if a delegate is already in the visited set.
/// That edge should never have been persisted, so the enclosing call must
/// abort rather than resolve to an arbitrary node.
pub fn resolve<S>(
    store: &S,
    start: SignerId,
    now: Epoch,
    max_hops: u32,
) -> Result<Resolution, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    let mut current = start;
    let mut visited = HashSet::new();
    visited.insert(current);
    let mut path = vec![current];
    let mut hops = 0u32;

    loop {
        let edge = match store.get_active(&current) {
            Some(edge) => edge,
            None => break,
        };

        if edge.is_stale(now) {
            break;
        }

        if visited.contains(&edge.delegate) {
            tracing::error!(
                "Delegation cycle detected during resolution: {} -> {}",
                current,
                edge.delegate
            );
            return Err(DelegationError::CycleDetected(edge.delegate));
        }

        if hops + 1 > max_hops {
            break;
        }

        current = edge.delegate;
        visited.insert(current);
        path.push(current);
        hops += 1;
    }

    Ok(Resolution {
        effective: current,
        hops,
        path,
    })
}
