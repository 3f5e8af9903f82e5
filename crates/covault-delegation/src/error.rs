use covault_types::SignerId;
use thiserror::Error;

/// Errors that can occur in delegation operations.
///
/// All validation is synchronous and pre-mutation: a rejected call leaves
/// the store untouched and must be corrected and resubmitted by the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DelegationError {
    #[error("Signer not eligible: {0}")]
    NotEligible(SignerId),

    #[error("Self-delegation not allowed")]
    SelfDelegation,

    #[error("Already delegating to {0}")]
    AlreadyDelegating(SignerId),

    #[error("Delegation would create a cycle")]
    WouldCreateCycle,

    #[error("Delegation chain too long: maximum depth {0}")]
    ChainTooLong(u32),

    #[error("No active delegation")]
    NoActiveDelegation,

    #[error("Unauthorized: only the delegator may revoke")]
    Unauthorized,

    #[error("Effective voter {0} has already voted")]
    AlreadyVoted(SignerId),

    /// A cycle observed while resolving, as opposed to at creation time.
    /// This means persisted state violates the acyclicity invariant; the
    /// enclosing call must abort rather than resolve to an arbitrary node.
    #[error("Delegation cycle detected at {0}")]
    CycleDetected(SignerId),
}
