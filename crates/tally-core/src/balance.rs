//! Balance rules.
//!
//! Balances are never stored as counters. They are derived from the most recent
//! ledger record, or fall back to [`DEFAULT_INITIAL_BALANCE`] for a user with no
//! history. These functions hold the arithmetic shared by admission and
//! settlement.

use crate::error::{LedgerError, Result};

/// Balance granted to a user before their first settled operation.
pub const DEFAULT_INITIAL_BALANCE: i64 = 20;

/// Fail with [`LedgerError::InsufficientFunds`] iff `balance < cost`.
///
/// A balance equal to the cost is sufficient.
///
/// # Errors
///
/// Returns `InsufficientFunds` when the balance does not cover the cost.
pub fn check_sufficient_balance(balance: i64, cost: i64) -> Result<()> {
    if balance < cost {
        return Err(LedgerError::InsufficientFunds {
            balance,
            required: cost,
        });
    }
    Ok(())
}

/// Balance after charging `cost`, clamped at zero.
#[must_use]
pub fn settled_balance(balance: i64, cost: i64) -> i64 {
    balance.saturating_sub(cost).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sufficient_when_balance_exceeds_cost() {
        assert!(check_sufficient_balance(10, 3).is_ok());
    }

    #[test]
    fn sufficient_at_boundary() {
        assert!(check_sufficient_balance(3, 3).is_ok());
    }

    #[test]
    fn insufficient_below_cost() {
        assert_eq!(
            check_sufficient_balance(0, 1),
            Err(LedgerError::InsufficientFunds {
                balance: 0,
                required: 1
            })
        );
    }

    #[test]
    fn settled_balance_deducts() {
        assert_eq!(settled_balance(DEFAULT_INITIAL_BALANCE, 1), DEFAULT_INITIAL_BALANCE - 1);
    }

    #[test]
    fn settled_balance_never_negative() {
        assert_eq!(settled_balance(2, 5), 0);
        assert_eq!(settled_balance(i64::MIN, 1), 0);
    }
}
