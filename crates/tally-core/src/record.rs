//! Ledger records.

use serde::{Deserialize, Serialize};

use crate::ids::{OperationId, RecordId, UserId};

/// One immutable ledger entry per settled operation.
///
/// Records are appended by settlement and only ever mutated by flipping
/// `deleted`. The current balance of a user is the `user_balance` of their most
/// recent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier pre-assigned at admission.
    pub record_id: RecordId,

    /// The user charged.
    pub user_id: UserId,

    /// Catalog entry that was performed.
    pub operation_id: OperationId,

    /// Credits charged.
    pub amount: i64,

    /// Balance after this operation. Never negative.
    pub user_balance: i64,

    /// Stringified result.
    pub operation_response: String,

    /// Settlement timestamp, milliseconds since the Unix epoch.
    pub date: i64,

    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
}
