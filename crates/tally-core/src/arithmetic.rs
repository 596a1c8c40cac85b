//! Arithmetic evaluation.

use crate::error::{LedgerError, Result};
use crate::operation::OperationType;
use crate::request::Payload;

/// Evaluate an arithmetic operation.
///
/// The square root re-checks its operand even though admission already did:
/// a negative radicand here means a malformed work item and fails settlement.
///
/// # Errors
///
/// Returns `InvalidOperation` for a negative square-root operand, a zero
/// divisor, or a payload that does not match the operation type.
pub fn evaluate(operation_type: OperationType, payload: &Payload) -> Result<f64> {
    match (operation_type, *payload) {
        (OperationType::Addition, Payload::Binary { num1, num2 }) => Ok(num1 + num2),
        (OperationType::Subtraction, Payload::Binary { num1, num2 }) => Ok(num1 - num2),
        (OperationType::Multiplication, Payload::Binary { num1, num2 }) => Ok(num1 * num2),
        (OperationType::Division, Payload::Binary { num2, .. }) if num2 == 0.0 => {
            Err(LedgerError::invalid("division by zero"))
        }
        (OperationType::Division, Payload::Binary { num1, num2 }) => Ok(num1 / num2),
        (OperationType::SquareRoot, Payload::SquareRoot { value }) => {
            if value < 0.0 {
                return Err(LedgerError::invalid(format!(
                    "cannot take the square root of {value}"
                )));
            }
            Ok(value.sqrt())
        }
        (operation_type, payload) => Err(LedgerError::invalid(format!(
            "{operation_type} cannot be evaluated with {payload:?}"
        ))),
    }
}

/// Render a numeric result the way records store it.
///
/// Integral values drop the fractional part: `2 + 3` is stored as `"5"`.
#[must_use]
pub fn format_result(value: f64) -> String {
    value.to_string()
}
