//! Delegation lifecycle transitions.
//!
//! Validates and applies create/revoke/expire transitions against an
//! injected store. Per-delegator state machine:
//!
//! `NoDelegation -> ActiveDelegation -> {Revoked, Expired} -> NoDelegation`
//!
//! The terminal states collapse immediately back to "no active edge"; the
//! history log retains the record. Every check runs before any mutation of
//! this call's slot, so a rejected call leaves durable state unchanged.

use std::collections::HashSet;

use covault_types::{Epoch, SignerId};

use crate::error::DelegationError;
use crate::events::DelegationEvent;
use crate::resolver::{self, MAX_DEPTH};
use crate::store::{DelegationEdge, DelegationStore, EndReason, HistoryEntry};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct DelegationConfig {
    /// Maximum chain depth accepted at creation
    pub max_depth: u32,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

/// Applies delegation state transitions.
///
/// Owns the store and the notification buffer. Cycle and depth checks run
/// here, at write time, so resolution stays O(max_hops) no matter what the
/// graph has been through.
pub struct LifecycleManager<S: DelegationStore> {
    store: S,
    config: DelegationConfig,
    next_id: u64,
    events: Vec<DelegationEvent>,
}

impl<S: DelegationStore> LifecycleManager<S> {
    /// Create a manager with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, DelegationConfig::default())
    }

    /// Create a manager with a custom configuration.
    pub fn with_config(store: S, config: DelegationConfig) -> Self {
        Self {
            store,
            config,
            next_id: 1,
            events: Vec::new(),
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DelegationConfig {
        &self.config
    }

    /// Create a delegation from `delegator` to `delegate`.
    ///
    /// Absent `expiry` means permanent. Returns the assigned delegation id.
    ///
    /// # Errors
    /// - `NotEligible` if either signer is outside `eligible_signers`
    /// - `SelfDelegation` if delegator and delegate coincide
    /// - `AlreadyDelegating` if an active, non-stale edge already exists
    /// - `WouldCreateCycle` if the delegator is reachable from the delegate
    /// - `ChainTooLong` if the chain from the delegate is already at the
    ///   depth bound
    pub fn create(
        &mut self,
        delegator: SignerId,
        delegate: SignerId,
        expiry: Option<Epoch>,
        now: Epoch,
        eligible_signers: &HashSet<SignerId>,
    ) -> Result<u64, DelegationError> {
        if !eligible_signers.contains(&delegator) {
            return Err(DelegationError::NotEligible(delegator));
        }
        if !eligible_signers.contains(&delegate) {
            return Err(DelegationError::NotEligible(delegate));
        }

        if delegator == delegate {
            return Err(DelegationError::SelfDelegation);
        }

        self.expire_if_due(delegator, now);
        if let Some(existing) = self.store.get_active(&delegator) {
            return Err(DelegationError::AlreadyDelegating(existing.delegate));
        }

        // Probe the chain the new edge would extend. The delegator showing
        // up anywhere in it closes a loop; a chain already at the depth
        // bound cannot take one more hop in front of it.
        let probe = resolver::resolve(&self.store, delegate, now, self.config.max_depth)?;
        if probe.path.contains(&delegator) {
            return Err(DelegationError::WouldCreateCycle);
        }
        if probe.hops >= self.config.max_depth {
            return Err(DelegationError::ChainTooLong(self.config.max_depth));
        }

        let id = self.next_id;
        self.next_id += 1;

        self.store
            .put_active(DelegationEdge::new(id, delegator, delegate, expiry, now));
        self.store.append_history(
            &delegator,
            HistoryEntry {
                id,
                delegator,
                delegate,
                created_at: now,
                ended_at: None,
                ended_reason: None,
            },
        );
        self.emit(DelegationEvent::Created {
            id,
            delegator,
            delegate,
            expiry,
            at: now,
        });

        Ok(id)
    }

    /// Revoke the caller's active delegation.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller == delegator`
    /// - `NoActiveDelegation` if nothing is active (an edge that lapsed
    ///   before this call counts as expired, not revoked)
    pub fn revoke(
        &mut self,
        delegator: SignerId,
        caller: SignerId,
        now: Epoch,
    ) -> Result<(), DelegationError> {
        if caller != delegator {
            return Err(DelegationError::Unauthorized);
        }

        self.expire_if_due(delegator, now);
        let edge = match self.store.get_active(&delegator) {
            Some(edge) => edge,
            None => return Err(DelegationError::NoActiveDelegation),
        };

        self.store.clear_active(&delegator);
        self.store.append_history(
            &delegator,
            HistoryEntry {
                id: edge.id,
                delegator,
                delegate: edge.delegate,
                created_at: edge.created_at,
                ended_at: Some(now),
                ended_reason: Some(EndReason::Revoked),
            },
        );
        self.emit(DelegationEvent::Revoked {
            id: edge.id,
            delegator,
            delegate: edge.delegate,
            at: now,
        });

        Ok(())
    }

    /// Lazily expire the delegator's active edge if its expiry has been
    /// reached. Invoked by every read path. Idempotent under repeated
    /// calls with the same or later `now`.
    ///
    /// Returns whether an edge was pruned.
    pub fn expire_if_due(&mut self, delegator: SignerId, now: Epoch) -> bool {
        let edge = match self.store.get_active(&delegator) {
            Some(edge) => edge,
            None => return false,
        };
        let expired_at = match edge.expiry {
            Some(t) if now >= t => t,
            _ => return false,
        };

        self.store.clear_active(&delegator);
        self.store.append_history(
            &delegator,
            HistoryEntry {
                id: edge.id,
                delegator,
                delegate: edge.delegate,
                created_at: edge.created_at,
                ended_at: Some(expired_at),
                ended_reason: Some(EndReason::Expired),
            },
        );
        self.emit(DelegationEvent::Expired {
            id: edge.id,
            delegator,
            delegate: edge.delegate,
            at: expired_at,
        });

        true
    }

    /// Active edge for a delegator, with lazy expiry applied.
    pub fn active_delegation(
        &mut self,
        delegator: SignerId,
        now: Epoch,
    ) -> Option<DelegationEdge> {
        self.expire_if_due(delegator, now);
        self.store.get_active(&delegator)
    }

    /// History entries for a delegator, most recent first.
    pub fn history(&self, delegator: &SignerId) -> Vec<HistoryEntry> {
        self.store.get_history(delegator)
    }

    /// Drain buffered notifications for off-chain observers.
    pub fn take_events(&mut self) -> Vec<DelegationEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: DelegationEvent) {
        match &event {
            DelegationEvent::Created {
                id,
                delegator,
                delegate,
                expiry,
                at,
            } => {
                tracing::info!(
                    "Delegation {} created: {} -> {} (expiry {:?}, epoch {})",
                    id,
                    delegator,
                    delegate,
                    expiry,
                    at
                );
            }
            DelegationEvent::Revoked {
                id,
                delegator,
                delegate,
                at,
            } => {
                tracing::info!(
                    "Delegation {} revoked: {} -> {} (epoch {})",
                    id,
                    delegator,
                    delegate,
                    at
                );
            }
            DelegationEvent::Expired {
                id,
                delegator,
                delegate,
                at,
            } => {
                tracing::info!(
                    "Delegation {} expired: {} -> {} (epoch {})",
                    id,
                    delegator,
                    delegate,
                    at
                );
            }
        }
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use proptest::prelude::*;

    fn signer(n: u8) -> SignerId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        SignerId::from_bytes(bytes)
    }

    fn eligible(n: u8) -> HashSet<SignerId> {
        (1..=n).map(signer).collect()
    }

    fn manager() -> LifecycleManager<MemoryStore> {
        LifecycleManager::new(MemoryStore::new())
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let mut m = manager();
        let set = eligible(4);

        let id1 = m.create(signer(1), signer(2), None, 100, &set).unwrap();
        let id2 = m.create(signer(3), signer(4), None, 100, &set).unwrap();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);

        let edge = m.store().get_active(&signer(1)).unwrap();
        assert_eq!(edge.delegate, signer(2));
        assert_eq!(edge.created_at, 100);
        assert!(edge.active);
    }

    #[test]
    fn test_create_rejects_ineligible() {
        let mut m = manager();
        let set = eligible(2);

        let outsider = signer(9);
        assert_eq!(
            m.create(outsider, signer(1), None, 100, &set),
            Err(DelegationError::NotEligible(outsider))
        );
        assert_eq!(
            m.create(signer(1), outsider, None, 100, &set),
            Err(DelegationError::NotEligible(outsider))
        );
    }

    #[test]
    fn test_create_rejects_self_delegation() {
        let mut m = manager();
        let set = eligible(2);

        assert_eq!(
            m.create(signer(1), signer(1), None, 100, &set),
            Err(DelegationError::SelfDelegation)
        );
    }

    #[test]
    fn test_create_rejects_second_delegation() {
        let mut m = manager();
        let set = eligible(3);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        assert_eq!(
            m.create(signer(1), signer(3), None, 200, &set),
            Err(DelegationError::AlreadyDelegating(signer(2)))
        );
    }

    #[test]
    fn test_create_allowed_after_expiry() {
        let mut m = manager();
        let set = eligible(3);

        m.create(signer(1), signer(2), Some(500), 100, &set).unwrap();

        // The expired edge is pruned on the way in, so the slot is free
        let id = m.create(signer(1), signer(3), None, 500, &set).unwrap();
        assert_eq!(id, 2);

        let history = m.history(&signer(1));
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].ended_reason, Some(EndReason::Expired));
        assert_eq!(history[1].ended_at, Some(500));
    }

    #[test]
    fn test_create_rejects_direct_cycle() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        assert_eq!(
            m.create(signer(2), signer(1), None, 100, &set),
            Err(DelegationError::WouldCreateCycle)
        );
    }

    #[test]
    fn test_create_rejects_transitive_cycle() {
        let mut m = manager();
        let set = eligible(3);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        m.create(signer(2), signer(3), None, 100, &set).unwrap();
        assert_eq!(
            m.create(signer(3), signer(1), None, 100, &set),
            Err(DelegationError::WouldCreateCycle)
        );
    }

    #[test]
    fn test_create_rejects_chain_at_depth_bound() {
        let mut m = manager();
        let set = eligible(5);

        // b -> c -> d -> e: three hops from b
        m.create(signer(2), signer(3), None, 100, &set).unwrap();
        m.create(signer(3), signer(4), None, 100, &set).unwrap();
        m.create(signer(4), signer(5), None, 100, &set).unwrap();

        // One more hop in front of b would exceed the bound
        assert_eq!(
            m.create(signer(1), signer(2), None, 100, &set),
            Err(DelegationError::ChainTooLong(MAX_DEPTH))
        );
    }

    #[test]
    fn test_create_allows_chain_below_depth_bound() {
        let mut m = manager();
        let set = eligible(4);

        m.create(signer(2), signer(3), None, 100, &set).unwrap();
        m.create(signer(3), signer(4), None, 100, &set).unwrap();

        // Two hops from b: delegating to b makes exactly three
        m.create(signer(1), signer(2), None, 100, &set).unwrap();

        let res = resolver::resolve(m.store(), signer(1), 100, MAX_DEPTH).unwrap();
        assert_eq!(res.effective, signer(4));
        assert_eq!(res.hops, 3);
    }

    #[test]
    fn test_create_propagates_persisted_cycle() {
        let mut store = MemoryStore::new();
        // Corrupt state written past the lifecycle checks
        store.put_active(DelegationEdge::new(1, signer(2), signer(3), None, 100));
        store.put_active(DelegationEdge::new(2, signer(3), signer(2), None, 100));

        let mut m = LifecycleManager::new(store);
        let set = eligible(3);

        assert!(matches!(
            m.create(signer(1), signer(2), None, 100, &set),
            Err(DelegationError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_revoke_clears_edge_and_records_history() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        m.revoke(signer(1), signer(1), 200).unwrap();

        assert!(m.store().get_active(&signer(1)).is_none());

        let history = m.history(&signer(1));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].ended_reason, Some(EndReason::Revoked));
        assert_eq!(history[0].ended_at, Some(200));
        assert_eq!(history[0].created_at, 100);
    }

    #[test]
    fn test_revoke_requires_delegator() {
        let mut m = manager();
        let set = eligible(3);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        assert_eq!(
            m.revoke(signer(1), signer(3), 200),
            Err(DelegationError::Unauthorized)
        );

        // The edge survives the failed call
        assert!(m.store().get_active(&signer(1)).is_some());
    }

    #[test]
    fn test_revoke_without_delegation() {
        let mut m = manager();
        assert_eq!(
            m.revoke(signer(1), signer(1), 100),
            Err(DelegationError::NoActiveDelegation)
        );
    }

    #[test]
    fn test_revoke_twice_fails() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        m.revoke(signer(1), signer(1), 200).unwrap();
        assert_eq!(
            m.revoke(signer(1), signer(1), 300),
            Err(DelegationError::NoActiveDelegation)
        );
    }

    #[test]
    fn test_revoke_of_lapsed_edge_counts_as_expired() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), Some(500), 100, &set).unwrap();
        assert_eq!(
            m.revoke(signer(1), signer(1), 600),
            Err(DelegationError::NoActiveDelegation)
        );

        let history = m.history(&signer(1));
        assert_eq!(history[0].ended_reason, Some(EndReason::Expired));
        assert_eq!(history[0].ended_at, Some(500));
    }

    #[test]
    fn test_expire_if_due_is_idempotent() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), Some(500), 100, &set).unwrap();

        assert!(m.expire_if_due(signer(1), 500));
        let history_after_first = m.history(&signer(1));
        let events_after_first = m.take_events();

        assert!(!m.expire_if_due(signer(1), 500));
        assert!(!m.expire_if_due(signer(1), 900));

        assert_eq!(m.history(&signer(1)), history_after_first);
        assert_eq!(events_after_first.len(), 2); // created + expired
        assert!(m.take_events().is_empty());
    }

    #[test]
    fn test_expire_if_due_ignores_permanent_edges() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), None, 100, &set).unwrap();
        assert!(!m.expire_if_due(signer(1), u64::MAX));
        assert!(m.store().get_active(&signer(1)).is_some());
    }

    #[test]
    fn test_active_delegation_applies_lazy_expiry() {
        let mut m = manager();
        let set = eligible(2);

        m.create(signer(1), signer(2), Some(500), 100, &set).unwrap();
        assert!(m.active_delegation(signer(1), 499).is_some());
        assert!(m.active_delegation(signer(1), 500).is_none());
    }

    #[test]
    fn test_events_match_transitions() {
        let mut m = manager();
        let set = eligible(3);

        let id = m.create(signer(1), signer(2), None, 100, &set).unwrap();
        m.revoke(signer(1), signer(1), 200).unwrap();
        m.create(signer(1), signer(3), Some(400), 300, &set).unwrap();
        m.expire_if_due(signer(1), 400);

        let events = m.take_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], DelegationEvent::Created { .. }));
        assert!(matches!(events[1], DelegationEvent::Revoked { id: rid, .. } if rid == id));
        assert!(matches!(events[2], DelegationEvent::Created { .. }));
        assert!(matches!(events[3], DelegationEvent::Expired { at: 400, .. }));

        // Failed calls emit nothing
        let _ = m.create(signer(1), signer(1), None, 500, &set);
        assert!(m.take_events().is_empty());
    }

    proptest! {
        /// For any sequence of successful create/revoke calls, the
        /// active-edge graph never contains a cycle. Resolution with a
        /// generous hop allowance visits every reachable node, so any
        /// persisted cycle would surface as `CycleDetected`.
        #[test]
        fn prop_graph_stays_acyclic(
            ops in proptest::collection::vec((1u8..=6, 1u8..=6, any::<bool>()), 1..48)
        ) {
            let mut m = manager();
            let set = eligible(6);
            let mut now = 0u64;

            for (a, b, is_revoke) in ops {
                now += 1;
                if is_revoke {
                    let _ = m.revoke(signer(a), signer(a), now);
                } else {
                    let _ = m.create(signer(a), signer(b), None, now, &set);
                }

                for s in 1u8..=6 {
                    let res = resolver::resolve(m.store(), signer(s), now, 8);
                    prop_assert!(res.is_ok());
                }
            }
        }

        /// Resolution at the configured bound never exceeds MAX_DEPTH hops.
        #[test]
        fn prop_resolution_respects_depth_bound(
            ops in proptest::collection::vec((1u8..=8, 1u8..=8), 1..48)
        ) {
            let mut m = manager();
            let set = eligible(8);
            let mut now = 0u64;

            for (a, b) in ops {
                now += 1;
                let _ = m.create(signer(a), signer(b), None, now, &set);
            }

            for s in 1u8..=8 {
                let res = resolver::resolve(m.store(), signer(s), now, MAX_DEPTH).unwrap();
                prop_assert!(res.hops <= MAX_DEPTH);
            }
        }
    }
}
