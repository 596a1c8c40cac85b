//! Error types for tally storage.

use tally_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// `Database` and `Serialization` carry a short, caller-safe description; the
/// underlying error is logged where it happens.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A create hit an existing primary key.
    #[error("row already exists: {pk}/{sk}")]
    AlreadyExists {
        /// Partition value.
        pk: String,
        /// Sort value.
        sk: String,
    },

    /// The target of an update or partial update does not exist.
    #[error("row not found: {pk}/{sk}")]
    NotFound {
        /// Partition value.
        pk: String,
        /// Sort value.
        sk: String,
    },

    /// A guarded write found a different latest row than expected.
    #[error("guard failed on partition {partition}")]
    Conflict {
        /// Partition the guard query ran against.
        partition: String,
    },

    /// A key or attribute cannot be stored as given.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { pk, sk } => Self::AlreadyExists(format!("{pk}/{sk}")),
            StoreError::NotFound { pk, sk } => Self::NotFound(format!("{pk}/{sk}")),
            StoreError::Conflict { partition } => {
                Self::Conflict(format!("concurrent write on {partition}"))
            }
            StoreError::InvalidKey(_) | StoreError::Database(_) | StoreError::Serialization(_) => {
                Self::Storage(err.to_string())
            }
        }
    }
}
