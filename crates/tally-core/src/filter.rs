//! Record listing filters.
//!
//! Date filters take precedence over balance filters. Within each dimension a
//! start alone is a lower bound, an end alone an upper bound, and both form an
//! inclusive range.

use crate::error::{LedgerError, Result};

/// A validated record listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record of the user.
    All,
    /// `date >= start`.
    DateFrom(i64),
    /// `date <= end`.
    DateUntil(i64),
    /// `start <= date <= end`.
    DateBetween {
        /// Inclusive lower bound.
        start: i64,
        /// Inclusive upper bound.
        end: i64,
    },
    /// `user_balance >= start`.
    BalanceFrom(i64),
    /// `user_balance <= end`.
    BalanceUntil(i64),
    /// `start <= user_balance <= end`.
    BalanceBetween {
        /// Inclusive lower bound.
        start: i64,
        /// Inclusive upper bound.
        end: i64,
    },
}

impl RecordFilter {
    /// Build a filter from raw query parameters. Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for non-numeric or negative bounds, or a start
    /// greater than its end.
    pub fn from_params(
        date_start: Option<&str>,
        date_end: Option<&str>,
        balance_start: Option<&str>,
        balance_end: Option<&str>,
    ) -> Result<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.is_empty())
        }

        match (present(date_start), present(date_end)) {
            (Some(start), Some(end)) => {
                let (start, end) = (parse_bound("date_start", start)?, parse_bound("date_end", end)?);
                check_range(start, end)?;
                return Ok(Self::DateBetween { start, end });
            }
            (Some(start), None) => return Ok(Self::DateFrom(parse_bound("date_start", start)?)),
            (None, Some(end)) => return Ok(Self::DateUntil(parse_bound("date_end", end)?)),
            (None, None) => {}
        }

        match (present(balance_start), present(balance_end)) {
            (Some(start), Some(end)) => {
                let start = parse_bound("balance_start", start)?;
                let end = parse_bound("balance_end", end)?;
                check_range(start, end)?;
                Ok(Self::BalanceBetween { start, end })
            }
            (Some(start), None) => Ok(Self::BalanceFrom(parse_bound("balance_start", start)?)),
            (None, Some(end)) => Ok(Self::BalanceUntil(parse_bound("balance_end", end)?)),
            (None, None) => Ok(Self::All),
        }
    }
}

fn parse_bound(name: &str, raw: &str) -> Result<i64> {
    if let Some(digits) = raw.strip_prefix('-') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::invalid(format!("{name} cannot be negative")));
        }
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::invalid(format!("{name} must be numeric")));
    }
    raw.parse()
        .map_err(|_| LedgerError::invalid(format!("{name} is out of range")))
}

fn check_range(start: i64, end: i64) -> Result<()> {
    if start > end {
        return Err(LedgerError::invalid(
            "start value cannot be greater than end value",
        ));
    }
    Ok(())
}
