//! Operation requests and their validation.
//!
//! Requests arrive as loosely typed JSON. [`OperationRequest::validate`] turns
//! them into a closed set of [`Payload`] variants before anything else looks
//! at them.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::operation::OperationType;

/// An operation request as received from a caller.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OperationRequest {
    /// Requested operation, e.g. `"ADDITION"`.
    pub operation_type: String,
    /// First operand of a binary operation.
    #[serde(default)]
    pub num1: Option<f64>,
    /// Second operand of a binary operation.
    #[serde(default)]
    pub num2: Option<f64>,
    /// Operand of a square root.
    #[serde(default)]
    pub single_number: Option<f64>,
}

/// Validated, type-specific operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// Operands of addition, subtraction, multiplication or division.
    Binary {
        /// Left operand.
        num1: f64,
        /// Right operand.
        num2: f64,
    },
    /// Operand of a square root. Non-negative.
    SquareRoot {
        /// The radicand.
        value: f64,
    },
    /// Random strings take no operands.
    RandomString,
}

/// A request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedRequest {
    /// The requested operation.
    pub operation_type: OperationType,
    /// Operands matching the operation.
    pub payload: Payload,
}

impl OperationRequest {
    /// Validate the request against its operation type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for an unknown type, a missing or lone binary
    /// operand, a zero divisor, or a missing or negative square-root operand.
    pub fn validate(&self) -> Result<ValidatedRequest> {
        let operation_type: OperationType = self.operation_type.trim().parse()?;
        let payload = validate_payload(operation_type, self.num1, self.num2, self.single_number)?;
        Ok(ValidatedRequest {
            operation_type,
            payload,
        })
    }
}

/// Check operands for `operation_type` and build the matching [`Payload`].
///
/// Shared by request validation and work-item decoding.
///
/// # Errors
///
/// See [`OperationRequest::validate`].
pub fn validate_payload(
    operation_type: OperationType,
    num1: Option<f64>,
    num2: Option<f64>,
    single_number: Option<f64>,
) -> Result<Payload> {
    match operation_type {
        OperationType::RandomString => Ok(Payload::RandomString),
        OperationType::SquareRoot => {
            let value = single_number
                .ok_or_else(|| LedgerError::invalid("single_number is required for SQUARE_ROOT"))?;
            if value.is_nan() || value < 0.0 {
                return Err(LedgerError::invalid(
                    "single_number must be non-negative for SQUARE_ROOT",
                ));
            }
            Ok(Payload::SquareRoot { value })
        }
        binary => {
            let (num1, num2) = match (num1, num2) {
                (Some(a), Some(b)) => (a, b),
                (Some(_), None) => {
                    return Err(LedgerError::invalid(
                        "needs a second value for operation to be complete",
                    ))
                }
                (None, Some(_)) => {
                    return Err(LedgerError::invalid(
                        "needs a first value for operation to be complete",
                    ))
                }
                (None, None) => {
                    return Err(LedgerError::invalid(format!(
                        "num1 and num2 are required for {binary}"
                    )))
                }
            };
            if binary == OperationType::Division && num2 == 0.0 {
                return Err(LedgerError::invalid("division by zero"));
            }
            Ok(Payload::Binary { num1, num2 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(op: &str, num1: Option<f64>, num2: Option<f64>, single: Option<f64>) -> OperationRequest {
        OperationRequest {
            operation_type: op.into(),
            num1,
            num2,
            single_number: single,
        }
    }

    #[test]
    fn addition_with_both_operands() {
        let validated = request("ADDITION", Some(2.0), Some(3.0), None).validate().unwrap();
        assert_eq!(validated.operation_type, OperationType::Addition);
        assert_eq!(validated.payload, Payload::Binary { num1: 2.0, num2: 3.0 });
    }

    #[test]
    fn zero_operands_are_present_operands() {
        let validated = request("SUBTRACTION", Some(0.0), Some(0.0), None).validate().unwrap();
        assert_eq!(validated.payload, Payload::Binary { num1: 0.0, num2: 0.0 });
    }

    #[test]
    fn lone_operand_rejected() {
        let err = request("MULTIPLICATION", Some(2.0), None, None).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation(_)));

        let err = request("MULTIPLICATION", None, Some(2.0), None).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation(_)));
    }

    #[test]
    fn binary_without_operands_rejected() {
        let err = request("ADDITION", None, None, None).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation(_)));
    }

    #[test]
    fn division_by_zero_rejected() {
        let err = request("DIVISION", Some(4.0), Some(0.0), None).validate().unwrap_err();
        assert_eq!(err, LedgerError::invalid("division by zero"));
    }

    #[test]
    fn square_root_requires_non_negative_operand() {
        assert!(request("SQUARE_ROOT", None, None, None).validate().is_err());
        assert!(request("SQUARE_ROOT", None, None, Some(-1.0)).validate().is_err());
        let ok = request("SQUARE_ROOT", None, None, Some(0.0)).validate().unwrap();
        assert_eq!(ok.payload, Payload::SquareRoot { value: 0.0 });
    }

    #[test]
    fn random_string_ignores_operands() {
        let validated = request("RANDOM_STRING", Some(1.0), None, None).validate().unwrap();
        assert_eq!(validated.payload, Payload::RandomString);
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(request("POWER", Some(1.0), Some(2.0), None).validate().is_err());
    }

    #[test]
    fn deserializes_from_json_body() {
        let req: OperationRequest =
            serde_json::from_str(r#"{"operation_type":"DIVISION","num1":4,"num2":2}"#).unwrap();
        assert_eq!(req.num1, Some(4.0));
        assert_eq!(req.single_number, None);
    }
}
