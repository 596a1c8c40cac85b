//! Balance resolution.
//!
//! A user's balance is the `user_balance` of their most recent record. "Most
//! recent" is the greatest secondary-1 sort value (`Record#{date}`) not after
//! now, so a record dated in the future by mistake never becomes current.

use std::sync::Arc;

use tally_core::{Record, Result, UserId};
use tally_store::{codec, Condition, Index, Query, Store};

/// What the ledger says about a user at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// The record the balance was read from, if any.
    pub latest: Option<Record>,
    /// Current balance.
    pub balance: i64,
}

impl BalanceSnapshot {
    /// True iff the user has no settled operation yet.
    #[must_use]
    pub const fn is_first_operation(&self) -> bool {
        self.latest.is_none()
    }
}

/// Derives balances from the ledger.
#[derive(Clone)]
pub struct BalanceResolver {
    store: Arc<dyn Store>,
    initial_balance: i64,
}

impl BalanceResolver {
    /// Create a resolver granting `initial_balance` to users without records.
    pub fn new(store: Arc<dyn Store>, initial_balance: i64) -> Self {
        Self {
            store,
            initial_balance,
        }
    }

    /// The user's most recent record dated no later than now.
    pub fn most_recent_record(&self, user_id: &UserId) -> Result<Option<Record>> {
        self.most_recent_record_at(user_id, chrono::Utc::now().timestamp_millis())
    }

    /// The user's most recent record dated no later than `now` (epoch millis).
    pub fn most_recent_record_at(&self, user_id: &UserId, now: i64) -> Result<Option<Record>> {
        let query = Query::partition(codec::user_partition(user_id))
            .on(Index::Gsi1)
            .when(Condition::LessThanOrEqual(codec::record_date_key(now)))
            .descending()
            .limit(1);

        self.store
            .query(&query)?
            .first()
            .map(codec::decode_record)
            .transpose()
    }

    /// True iff the user has never had an operation settled.
    pub fn is_first_operation(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.most_recent_record(user_id)?.is_none())
    }

    /// The user's current balance.
    pub fn current_balance(&self, user_id: &UserId) -> Result<i64> {
        Ok(self.snapshot(user_id)?.balance)
    }

    /// Most recent record and the balance derived from it.
    pub fn snapshot(&self, user_id: &UserId) -> Result<BalanceSnapshot> {
        let latest = self.most_recent_record(user_id)?;
        let balance = latest
            .as_ref()
            .map_or(self.initial_balance, |record| record.user_balance);
        Ok(BalanceSnapshot { latest, balance })
    }
}
