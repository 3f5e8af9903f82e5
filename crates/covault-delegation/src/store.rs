//! Delegation persistence.
//!
//! Key-value storage only: one active-edge slot per delegator plus a
//! bounded, append-only history log. Validation and time-awareness live
//! in the lifecycle manager, never here.

use std::collections::{HashMap, VecDeque};

use covault_types::{Epoch, SignerId};
use serde::{Deserialize, Serialize};

/// Default number of history entries retained per delegator.
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// Why a delegation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Explicitly revoked by the delegator
    Revoked,
    /// Expiry epoch reached, discovered on a read path
    Expired,
}

/// Active delegation edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationEdge {
    /// Numeric delegation id, assigned at creation (audit index only)
    pub id: u64,
    /// Delegator (who is delegating)
    pub delegator: SignerId,
    /// Delegate (who receives approval authority)
    pub delegate: SignerId,
    /// Epoch at which the edge stops counting; `None` = permanent
    pub expiry: Option<Epoch>,
    /// Epoch when the delegation was created
    pub created_at: Epoch,
    /// Whether the edge is still active
    pub active: bool,
}

impl DelegationEdge {
    /// Create a new active edge.
    pub fn new(
        id: u64,
        delegator: SignerId,
        delegate: SignerId,
        expiry: Option<Epoch>,
        created_at: Epoch,
    ) -> Self {
        Self {
            id,
            delegator,
            delegate,
            expiry,
            created_at,
            active: true,
        }
    }

    /// An edge with an expiry is stale once `now` reaches it.
    pub fn is_stale(&self, now: Epoch) -> bool {
        matches!(self.expiry, Some(t) if now >= t)
    }
}

/// Record of a past delegation event for one delegator.
///
/// Creation appends an open record (`ended_at`/`ended_reason` unset);
/// revocation or expiry appends a closed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Delegation id the record refers to
    pub id: u64,
    pub delegator: SignerId,
    pub delegate: SignerId,
    /// Epoch when the delegation was created
    pub created_at: Epoch,
    /// Epoch when it ended, if it has
    pub ended_at: Option<Epoch>,
    /// How it ended, if it has
    pub ended_reason: Option<EndReason>,
}

/// Key-value persistence for delegation state.
///
/// Injected into the lifecycle manager so tests can substitute a double.
/// Callers guarantee the single-active-edge invariant; the store never
/// inspects what it is handed.
pub trait DelegationStore {
    /// Active edge for a delegator, if any.
    fn get_active(&self, delegator: &SignerId) -> Option<DelegationEdge>;

    /// Overwrite the delegator's active slot.
    fn put_active(&mut self, edge: DelegationEdge);

    /// Clear the delegator's active slot.
    fn clear_active(&mut self, delegator: &SignerId);

    /// Append to the delegator's bounded history log. Inserting past
    /// capacity evicts the oldest entry.
    fn append_history(&mut self, delegator: &SignerId, entry: HistoryEntry);

    /// History entries for a delegator, most recent first.
    fn get_history(&self, delegator: &SignerId) -> Vec<HistoryEntry>;
}

/// In-memory store backing the engine.
///
/// The active slot is keyed by delegator; the numeric id index is a
/// secondary lookup over that slot for audit queries.
#[derive(Debug)]
pub struct MemoryStore {
    /// delegator -> active edge
    active: HashMap<SignerId, DelegationEdge>,
    /// delegator -> past entries, newest at the front
    history: HashMap<SignerId, VecDeque<HistoryEntry>>,
    /// delegation id -> delegator (active edges only)
    by_id: HashMap<u64, SignerId>,
    /// Per-delegator history bound
    history_capacity: usize,
}

impl MemoryStore {
    /// Create a store with the default history capacity.
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a store with a custom history capacity.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            active: HashMap::new(),
            history: HashMap::new(),
            by_id: HashMap::new(),
            history_capacity: capacity.max(1),
        }
    }

    /// Audit lookup of an active edge by delegation id.
    pub fn get_by_id(&self, id: u64) -> Option<DelegationEdge> {
        self.by_id.get(&id).and_then(|d| self.active.get(d)).cloned()
    }

    /// Number of active edges in the store.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DelegationStore for MemoryStore {
    fn get_active(&self, delegator: &SignerId) -> Option<DelegationEdge> {
        self.active.get(delegator).cloned()
    }

    fn put_active(&mut self, edge: DelegationEdge) {
        self.by_id.insert(edge.id, edge.delegator);
        self.active.insert(edge.delegator, edge);
    }

    fn clear_active(&mut self, delegator: &SignerId) {
        if let Some(edge) = self.active.remove(delegator) {
            self.by_id.remove(&edge.id);
        }
    }

    fn append_history(&mut self, delegator: &SignerId, entry: HistoryEntry) {
        let log = self.history.entry(*delegator).or_default();
        while log.len() >= self.history_capacity {
            log.pop_back();
        }
        log.push_front(entry);
    }

    fn get_history(&self, delegator: &SignerId) -> Vec<HistoryEntry> {
        self.history
            .get(delegator)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }
}
