//! Record polling, listing and soft deletion.

use std::sync::Arc;

use serde_json::{Map, Value};

use tally_core::{LedgerError, Record, RecordFilter, RecordId, Result, UserId};
use tally_store::{codec, Condition, Index, Query, Store, StoreError};

/// Read and soft-delete access to a user's records.
#[derive(Clone)]
pub struct RecordQueries {
    store: Arc<dyn Store>,
}

impl RecordQueries {
    /// Create a query surface over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Fetch one record. An id that does not parse cannot exist, so it is
    /// reported as not found.
    pub fn get(&self, user_id: &UserId, record_id: &str) -> Result<Record> {
        let record_id = parse_record_id(record_id)?;
        let row = self
            .store
            .get(&codec::record_key(user_id, &record_id))?
            .ok_or_else(|| record_not_found(&record_id))?;
        codec::decode_record(&row)
    }

    /// The user's records matching `filter`, newest first on the filtered
    /// dimension. Soft-deleted records are skipped unless `include_deleted`.
    pub fn list(
        &self,
        user_id: &UserId,
        filter: RecordFilter,
        include_deleted: bool,
    ) -> Result<Vec<Record>> {
        let query = filter_query(user_id, filter);
        tracing::debug!(user_id = %user_id, ?query, "Listing records");

        let mut records = Vec::new();
        for row in self.store.query(&query)? {
            let record = codec::decode_record(&row)?;
            if include_deleted || !record.deleted {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Mark a record deleted and return it. Deleting twice is harmless.
    pub fn soft_delete(&self, user_id: &UserId, record_id: &str) -> Result<Record> {
        let record_id = parse_record_id(record_id)?;

        let mut updates = Map::new();
        updates.insert("deleted".into(), Value::Bool(true));

        let row = match self
            .store
            .update_partial(&codec::record_key(user_id, &record_id), &updates)
        {
            Ok(row) => row,
            Err(StoreError::NotFound { .. }) => return Err(record_not_found(&record_id)),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = %user_id, record_id = %record_id, "Record soft-deleted");
        codec::decode_record(&row)
    }
}

/// Translate a listing filter into a store query.
fn filter_query(user_id: &UserId, filter: RecordFilter) -> Query {
    let base = Query::partition(codec::user_partition(user_id)).descending();
    let date = codec::record_date_key;
    let balance = codec::record_balance_key;

    match filter {
        RecordFilter::All => base
            .on(Index::Gsi1)
            .when(Condition::BeginsWith(codec::RECORD_PREFIX.into())),
        RecordFilter::DateFrom(start) => base
            .on(Index::Gsi1)
            .when(Condition::GreaterThanOrEqual(date(start))),
        RecordFilter::DateUntil(end) => base
            .on(Index::Gsi1)
            .when(Condition::LessThanOrEqual(date(end))),
        RecordFilter::DateBetween { start, end } => base.on(Index::Gsi1).when(Condition::Between {
            low: date(start),
            high: date(end),
        }),
        RecordFilter::BalanceFrom(start) => base
            .on(Index::Gsi2)
            .when(Condition::GreaterThanOrEqual(balance(start))),
        RecordFilter::BalanceUntil(end) => base
            .on(Index::Gsi2)
            .when(Condition::LessThanOrEqual(balance(end))),
        RecordFilter::BalanceBetween { start, end } => {
            base.on(Index::Gsi2).when(Condition::Between {
                low: balance(start),
                high: balance(end),
            })
        }
    }
}

fn parse_record_id(raw: &str) -> Result<RecordId> {
    raw.parse()
        .map_err(|_| LedgerError::NotFound(format!("record {raw} does not exist")))
}

fn record_not_found(record_id: &RecordId) -> LedgerError {
    LedgerError::NotFound(format!("record {record_id} does not exist"))
}
