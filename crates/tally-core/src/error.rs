//! Error types for tally.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
///
/// Every variant is a business or infrastructure outcome the boundary knows how
/// to present; messages are safe to show to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Bad, missing or contradictory request payload.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The resolved balance does not cover the operation cost.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Resolved balance.
        balance: i64,
        /// Operation cost.
        required: i64,
    },

    /// Record or operation absent, or the target of an update is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create hit an existing primary key.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An optimistic write lost against a concurrent writer too many times.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into a domain entity.
    #[error("decode error: {0}")]
    Decode(String),

    /// Opaque storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The message transport refused a work item.
    #[error("transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::InvalidOperation`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Shorthand for [`LedgerError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

impl From<IdError> for LedgerError {
    fn from(err: IdError) -> Self {
        Self::InvalidOperation(err.to_string())
    }
}
