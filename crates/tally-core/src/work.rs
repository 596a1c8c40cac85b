//! Routed work items.
//!
//! A [`WorkItem`] is the JSON message admission publishes and settlement
//! consumes. It embeds the resolved [`Operation`] so the worker never has to
//! look the catalog up again.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::ids::{RecordId, UserId};
use crate::operation::Operation;
use crate::request::{validate_payload, Payload};

/// Queue message schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// The user to charge.
    pub user_id: UserId,
    /// Record id pre-assigned at admission.
    pub record_id: RecordId,
    /// First binary operand.
    pub num1: Option<f64>,
    /// Second binary operand.
    pub num2: Option<f64>,
    /// Square-root operand.
    pub single_number: Option<f64>,
    /// Catalog entry resolved at admission.
    pub operation: Operation,
}

impl WorkItem {
    /// Build a work item from a validated payload.
    #[must_use]
    pub fn new(user_id: UserId, record_id: RecordId, payload: Payload, operation: Operation) -> Self {
        let (num1, num2, single_number) = match payload {
            Payload::Binary { num1, num2 } => (Some(num1), Some(num2), None),
            Payload::SquareRoot { value } => (None, None, Some(value)),
            Payload::RandomString => (None, None, None),
        };
        Self {
            user_id,
            record_id,
            num1,
            num2,
            single_number,
            operation,
        }
    }

    /// Re-derive the typed payload from the wire fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when the operands do not fit the embedded
    /// operation type.
    pub fn payload(&self) -> Result<Payload> {
        validate_payload(
            self.operation.operation_type,
            self.num1,
            self.num2,
            self.single_number,
        )
    }

    /// Serialize to the JSON message body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if an operand cannot be represented in JSON.
    pub fn to_message(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LedgerError::invalid(e.to_string()))
    }

    /// Parse a JSON message body.
    ///
    /// # Errors
    ///
    /// Returns `Decode` if the body does not match the schema.
    pub fn from_message(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| LedgerError::decode(e.to_string()))
    }
}
