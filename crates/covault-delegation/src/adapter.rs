//! Voting adapter.
//!
//! The sole entry point used by the proposal-approval component. Combines
//! lazy expiry pruning with chain resolution, and carries the integration
//! contract: resolve first, record the vote under the effective voter,
//! reject if that voter already appears in either vote set.

use std::collections::HashSet;

use covault_types::{Epoch, SignerId};

use crate::error::DelegationError;
use crate::events::DelegationEvent;
use crate::lifecycle::{DelegationConfig, LifecycleManager};
use crate::resolver;
use crate::store::{DelegationEdge, DelegationStore, HistoryEntry, MemoryStore};

/// Approval or abstention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotChoice {
    Approve,
    Abstain,
}

/// Per-proposal vote sets, keyed by effective voter.
///
/// Owned by the proposal-approval collaborator; one book per proposal.
#[derive(Debug, Default)]
pub struct BallotBook {
    approvals: HashSet<SignerId>,
    abstentions: HashSet<SignerId>,
}

impl BallotBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a signer already appears in either vote set.
    pub fn has_voted(&self, signer: &SignerId) -> bool {
        self.approvals.contains(signer) || self.abstentions.contains(signer)
    }

    pub fn approvals(&self) -> &HashSet<SignerId> {
        &self.approvals
    }

    pub fn abstentions(&self) -> &HashSet<SignerId> {
        &self.abstentions
    }
}

/// Entry point for the surrounding governance system.
///
/// Owns the lifecycle manager and its store; every operation re-reads
/// fresh durable state, so a resolution observes any revocation or expiry
/// that logically precedes it.
pub struct VotingAdapter<S: DelegationStore = MemoryStore> {
    manager: LifecycleManager<S>,
}

impl VotingAdapter<MemoryStore> {
    /// Adapter over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: DelegationStore> VotingAdapter<S> {
    pub fn new(store: S) -> Self {
        Self {
            manager: LifecycleManager::new(store),
        }
    }

    pub fn with_config(store: S, config: DelegationConfig) -> Self {
        Self {
            manager: LifecycleManager::with_config(store, config),
        }
    }

    /// Delegate approval authority. Absent expiry = permanent.
    ///
    /// Returns the assigned delegation id.
    pub fn delegate(
        &mut self,
        delegator: SignerId,
        delegate: SignerId,
        expiry: Option<Epoch>,
        now: Epoch,
        eligible_signers: &HashSet<SignerId>,
    ) -> Result<u64, DelegationError> {
        self.manager
            .create(delegator, delegate, expiry, now, eligible_signers)
    }

    /// Revoke the caller's active delegation.
    pub fn revoke(
        &mut self,
        delegator: SignerId,
        caller: SignerId,
        now: Epoch,
    ) -> Result<(), DelegationError> {
        self.manager.revoke(delegator, caller, now)
    }

    /// Terminal signer reached from `signer`, falling back to the input
    /// itself when undelegated. Stale edges discovered along the way are
    /// pruned, each leaving one history entry and one notification.
    pub fn resolve_effective_voter(
        &mut self,
        signer: SignerId,
        now: Epoch,
    ) -> Result<SignerId, DelegationError> {
        let resolution = resolver::resolve(
            self.manager.store(),
            signer,
            now,
            self.manager.config().max_depth,
        )?;

        for hop in &resolution.path {
            self.manager.expire_if_due(*hop, now);
        }

        Ok(resolution.effective)
    }

    /// Resolve `signer` and record a ballot under the effective voter.
    ///
    /// This is the integration contract with the proposal-approval path:
    /// the vote lands on the returned effective voter, never the original
    /// caller, and a voter reached by two converging chains counts once.
    ///
    /// # Errors
    /// `AlreadyVoted` if the effective voter already appears in either
    /// vote set; the book is left unchanged.
    pub fn record_ballot(
        &mut self,
        book: &mut BallotBook,
        signer: SignerId,
        choice: BallotChoice,
        now: Epoch,
    ) -> Result<SignerId, DelegationError> {
        let effective = self.resolve_effective_voter(signer, now)?;

        if book.has_voted(&effective) {
            return Err(DelegationError::AlreadyVoted(effective));
        }

        match choice {
            BallotChoice::Approve => book.approvals.insert(effective),
            BallotChoice::Abstain => book.abstentions.insert(effective),
        };

        Ok(effective)
    }

    /// Active edge for a delegator, with lazy expiry applied.
    pub fn get_active_delegation(
        &mut self,
        delegator: SignerId,
        now: Epoch,
    ) -> Option<DelegationEdge> {
        self.manager.active_delegation(delegator, now)
    }

    /// History for a delegator, most recent first, capped.
    pub fn get_history(&self, delegator: &SignerId) -> Vec<HistoryEntry> {
        self.manager.history(delegator)
    }

    /// Drain buffered notifications for off-chain observers.
    pub fn take_events(&mut self) -> Vec<DelegationEvent> {
        self.manager.take_events()
    }
}
