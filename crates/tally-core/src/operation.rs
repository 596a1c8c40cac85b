//! Operation catalog types.
//!
//! An [`Operation`] is a priced catalog entry. Exactly one exists per
//! [`OperationType`]; the set is seeded once and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::ids::OperationId;

/// The kinds of operation a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// `num1 + num2`
    Addition,
    /// `num1 - num2`
    Subtraction,
    /// `num1 * num2`
    Multiplication,
    /// `num1 / num2`
    Division,
    /// `sqrt(single_number)`
    SquareRoot,
    /// A random string from the string-generation channel.
    RandomString,
}

impl OperationType {
    /// Every operation type, in catalog seeding order.
    pub const ALL: [Self; 6] = [
        Self::Addition,
        Self::Subtraction,
        Self::Multiplication,
        Self::Division,
        Self::SquareRoot,
        Self::RandomString,
    ];

    /// The wire name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Addition => "ADDITION",
            Self::Subtraction => "SUBTRACTION",
            Self::Multiplication => "MULTIPLICATION",
            Self::Division => "DIVISION",
            Self::SquareRoot => "SQUARE_ROOT",
            Self::RandomString => "RANDOM_STRING",
        }
    }

    /// The downstream channel that settles this operation type.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::RandomString => Channel::RandomString,
            _ => Channel::Arithmetic,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LedgerError::invalid(format!("unknown operation type: {s}")))
    }
}

/// Worker class that settles a routed work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    /// Binary arithmetic and square root.
    Arithmetic,
    /// Random string generation.
    RandomString,
}

impl Channel {
    /// Channel name as used by the transport.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Arithmetic => "arithmetic",
            Self::RandomString => "random-string",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Stable identifier assigned at seeding.
    pub operation_id: OperationId,

    /// What the operation does.
    #[serde(rename = "type")]
    pub operation_type: OperationType,

    /// Credits charged per settlement. Always positive.
    pub cost: i64,
}
