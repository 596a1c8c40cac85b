//! Operation settlement.
//!
//! Settlement runs after admission, possibly much later, so it resolves the
//! balance again instead of trusting the admitted one. A work item whose user
//! can no longer pay is dropped: no record, no error.
//!
//! With the guard enabled the record write only succeeds while the user's
//! latest record is still the one the balance was read from. Losing that race
//! re-resolves and tries again. The guard looks [`GUARD_WINDOW_MS`] past the
//! new record's date and no further, so a record dated far in the future is
//! ignored here just as the balance resolver ignores it.

use std::sync::Arc;
use std::time::Duration;

use tally_core::{
    arithmetic, check_sufficient_balance, settled_balance, LedgerError, Payload, Record, Result,
    WorkItem,
};
use tally_store::{codec, Condition, Index, LatestGuard, Query, Row, Store, StoreError};

use crate::ledger::balance::{BalanceResolver, BalanceSnapshot};
use crate::random_org::RandomStringCache;

/// How far past a new record's date the guard looks for competing records.
/// A lost guard also waits this long before re-resolving.
pub const GUARD_WINDOW_MS: u32 = 50;

/// What happened to a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The record was written.
    Settled(Record),
    /// The user could not pay at settlement time.
    Dropped {
        /// Balance at settlement time.
        balance: i64,
        /// Cost of the operation.
        required: i64,
    },
}

/// The settlement worker logic.
pub struct Settlement {
    store: Arc<dyn Store>,
    resolver: BalanceResolver,
    random: Arc<RandomStringCache>,
    guard: bool,
    conflict_retries: u32,
}

impl Settlement {
    /// Create a settlement with the latest-record guard enabled.
    pub fn new(
        store: Arc<dyn Store>,
        resolver: BalanceResolver,
        random: Arc<RandomStringCache>,
    ) -> Self {
        Self {
            store,
            resolver,
            random,
            guard: true,
            conflict_retries: 3,
        }
    }

    /// Configure the guard and how often a lost guard is retried.
    #[must_use]
    pub const fn with_guard(mut self, enabled: bool, conflict_retries: u32) -> Self {
        self.guard = enabled;
        self.conflict_retries = conflict_retries;
        self
    }

    /// Settle one work item.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the payload cannot be evaluated.
    /// - `AlreadyExists` if the record id was already settled.
    /// - `Conflict` if the guard kept failing.
    /// - `Storage`/`Decode` on store failures.
    pub async fn settle(&self, item: &WorkItem) -> Result<SettlementOutcome> {
        let payload = item.payload()?;
        let cost = item.operation.cost;
        let mut response: Option<String> = None;
        let mut attempt = 0;

        loop {
            let snapshot = self.resolver.snapshot(&item.user_id)?;
            if !snapshot.is_first_operation() {
                if let Err(LedgerError::InsufficientFunds { balance, required }) =
                    check_sufficient_balance(snapshot.balance, cost)
                {
                    tracing::warn!(
                        user_id = %item.user_id,
                        record_id = %item.record_id,
                        balance = balance,
                        required = required,
                        "Insufficient funds at settlement, dropping work item"
                    );
                    return Ok(SettlementOutcome::Dropped { balance, required });
                }
            }

            // Computed once: a random string must not be drawn per attempt
            let operation_response = match &response {
                Some(value) => value.clone(),
                None => {
                    let value = self.compute(item, &payload).await?;
                    response = Some(value.clone());
                    value
                }
            };

            let record = Record {
                record_id: item.record_id,
                user_id: item.user_id,
                operation_id: item.operation.operation_id,
                amount: cost,
                user_balance: settled_balance(snapshot.balance, cost),
                operation_response,
                date: next_date(snapshot.latest.as_ref()).await,
                deleted: false,
            };

            let row = codec::encode_record(&record)?;
            match self.write(&row, &record, &snapshot) {
                Ok(()) => {
                    tracing::info!(
                        user_id = %record.user_id,
                        record_id = %record.record_id,
                        amount = record.amount,
                        user_balance = record.user_balance,
                        attempt = attempt + 1,
                        "Record settled"
                    );
                    return Ok(SettlementOutcome::Settled(record));
                }
                Err(StoreError::Conflict { .. }) if attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::debug!(
                        user_id = %item.user_id,
                        record_id = %item.record_id,
                        attempt = attempt,
                        "Latest record changed during settlement, re-resolving"
                    );
                    // Lets a competitor dated inside the window become current
                    tokio::time::sleep(Duration::from_millis(u64::from(GUARD_WINDOW_MS))).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn compute(&self, item: &WorkItem, payload: &Payload) -> Result<String> {
        match payload {
            Payload::RandomString => Ok(self.random.next().await),
            _ => arithmetic::evaluate(item.operation.operation_type, payload)
                .map(arithmetic::format_result),
        }
    }

    fn write(
        &self,
        row: &Row,
        record: &Record,
        snapshot: &BalanceSnapshot,
    ) -> tally_store::Result<()> {
        if !self.guard {
            return self.store.create(row);
        }

        let guard = LatestGuard {
            query: Query::partition(codec::user_partition(&record.user_id))
                .on(Index::Gsi1)
                .when(Condition::Between {
                    low: codec::RECORD_PREFIX.into(),
                    high: codec::record_date_key(
                        record.date.saturating_add(i64::from(GUARD_WINDOW_MS)),
                    ),
                })
                .descending()
                .limit(1),
            expected: snapshot
                .latest
                .as_ref()
                .map(|latest| codec::record_key(&latest.user_id, &latest.record_id)),
        };
        self.store.create_guarded(row, &guard)
    }
}

/// Current time in epoch millis, strictly after `latest` so that a user's
/// records never share a date.
async fn next_date(latest: Option<&Record>) -> i64 {
    let floor = latest.map_or(i64::MIN, |record| record.date);
    loop {
        let now = chrono::Utc::now().timestamp_millis();
        if now > floor {
            return now;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::{Map, Value};
    use tally_core::{Operation, OperationId, OperationType, RecordId, UserId};
    use tally_store::{PrimaryKey, RocksStore};
    use tempfile::TempDir;

    use crate::ledger::catalog::default_cost;

    /// Writes a competing record for the same user right before the first
    /// guarded create, as a concurrent settlement would.
    struct InterleavingStore {
        inner: RocksStore,
        competitor: Record,
        fired: AtomicBool,
    }

    impl Store for InterleavingStore {
        fn create(&self, row: &Row) -> tally_store::Result<()> {
            self.inner.create(row)
        }

        fn create_guarded(&self, row: &Row, guard: &LatestGuard) -> tally_store::Result<()> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                let mut competitor = self.competitor.clone();
                competitor.date = chrono::Utc::now().timestamp_millis();
                self.inner.create(&codec::encode_record(&competitor).unwrap())?;
            }
            self.inner.create_guarded(row, guard)
        }

        fn update(&self, row: &Row) -> tally_store::Result<()> {
            self.inner.update(row)
        }

        fn update_partial(
            &self,
            key: &PrimaryKey,
            updates: &Map<String, Value>,
        ) -> tally_store::Result<Row> {
            self.inner.update_partial(key, updates)
        }

        fn get(&self, key: &PrimaryKey) -> tally_store::Result<Option<Row>> {
            self.inner.get(key)
        }

        fn delete(&self, key: &PrimaryKey) -> tally_store::Result<Option<Row>> {
            self.inner.delete(key)
        }

        fn query(&self, query: &Query) -> tally_store::Result<Vec<Row>> {
            self.inner.query(query)
        }
    }

    struct Fixture {
        settlement: Settlement,
        store: Arc<dyn Store>,
        user_id: UserId,
        _dir: TempDir,
    }

    fn settlement_over(store: Arc<dyn Store>) -> Settlement {
        Settlement::new(
            store.clone(),
            BalanceResolver::new(store, 20),
            Arc::new(RandomStringCache::new(None, 10, 8)),
        )
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn Store> = Arc::new(RocksStore::open(dir.path()).unwrap());
        Fixture {
            settlement: settlement_over(store.clone()),
            store,
            user_id: UserId::generate(),
            _dir: dir,
        }
    }

    fn record(user_id: UserId, user_balance: i64, date: i64) -> Record {
        Record {
            record_id: RecordId::generate(),
            user_id,
            operation_id: OperationId::generate(),
            amount: 1,
            user_balance,
            operation_response: "0".into(),
            date,
            deleted: false,
        }
    }

    fn item(user_id: UserId, operation_type: OperationType, payload: Payload) -> WorkItem {
        WorkItem::new(
            user_id,
            RecordId::generate(),
            payload,
            Operation {
                operation_id: OperationId::generate(),
                operation_type,
                cost: default_cost(operation_type),
            },
        )
    }

    fn addition(user_id: UserId) -> WorkItem {
        item(
            user_id,
            OperationType::Addition,
            Payload::Binary {
                num1: 2.0,
                num2: 3.0,
            },
        )
    }

    impl Fixture {
        fn give(&self, user_balance: i64, date: i64) {
            let row = codec::encode_record(&record(self.user_id, user_balance, date)).unwrap();
            self.store.create(&row).unwrap();
        }

        fn stored(&self, item: &WorkItem) -> Option<Record> {
            self.store
                .get(&codec::record_key(&item.user_id, &item.record_id))
                .unwrap()
                .map(|row| codec::decode_record(&row).unwrap())
        }
    }

    #[tokio::test]
    async fn first_operation_settles_from_initial_balance() {
        let f = fixture();
        let work = addition(f.user_id);

        let outcome = f.settlement.settle(&work).await.unwrap();

        let SettlementOutcome::Settled(record) = outcome else {
            panic!("expected a settled record");
        };
        assert_eq!(record.record_id, work.record_id);
        assert_eq!(record.amount, 1);
        assert_eq!(record.user_balance, 19);
        assert_eq!(record.operation_response, "5");
        assert!(!record.deleted);
        assert_eq!(f.stored(&work), Some(record));
    }

    #[tokio::test]
    async fn balances_chain_across_settlements() {
        let f = fixture();
        let resolver = BalanceResolver::new(f.store.clone(), 20);

        let mut dates = Vec::new();
        for expected in [19, 18, 17] {
            let SettlementOutcome::Settled(record) =
                f.settlement.settle(&addition(f.user_id)).await.unwrap()
            else {
                panic!("expected a settled record");
            };
            assert_eq!(resolver.current_balance(&f.user_id).unwrap(), expected);
            dates.push(record.date);
        }
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]), "{dates:?}");
    }

    #[tokio::test]
    async fn insufficient_funds_drops_without_record() {
        let f = fixture();
        f.give(2, 1_000);
        let work = item(
            f.user_id,
            OperationType::SquareRoot,
            Payload::SquareRoot { value: 16.0 },
        );

        let outcome = f.settlement.settle(&work).await.unwrap();

        assert_eq!(
            outcome,
            SettlementOutcome::Dropped {
                balance: 2,
                required: 5
            }
        );
        assert_eq!(f.stored(&work), None);
    }

    #[tokio::test]
    async fn random_string_can_spend_the_whole_balance() {
        let f = fixture();
        f.give(6, 1_000);
        let work = item(f.user_id, OperationType::RandomString, Payload::RandomString);

        let SettlementOutcome::Settled(record) = f.settlement.settle(&work).await.unwrap() else {
            panic!("expected a settled record");
        };
        assert_eq!(record.user_balance, 0);
        assert_eq!(record.operation_response.len(), 8);
    }

    #[tokio::test]
    async fn negative_square_root_is_fatal() {
        let f = fixture();
        let mut work = item(
            f.user_id,
            OperationType::SquareRoot,
            Payload::SquareRoot { value: 4.0 },
        );
        work.single_number = Some(-4.0);

        let err = f.settlement.settle(&work).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOperation(_)));
        assert_eq!(f.stored(&work), None);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_rejected() {
        let f = fixture();
        let work = addition(f.user_id);

        f.settlement.settle(&work).await.unwrap();
        let err = f.settlement.settle(&work).await.unwrap_err();

        assert!(matches!(err, LedgerError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn lost_guard_re_resolves_balance() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();
        let store: Arc<dyn Store> = Arc::new(InterleavingStore {
            inner: RocksStore::open(dir.path()).unwrap(),
            competitor: record(user_id, 10, 0),
            fired: AtomicBool::new(false),
        });
        let settlement = settlement_over(store.clone());

        let outcome = settlement.settle(&addition(user_id)).await.unwrap();

        // Charged against the competitor's balance, not the initial one
        let SettlementOutcome::Settled(record) = outcome else {
            panic!("expected a settled record");
        };
        assert_eq!(record.user_balance, 9);
    }

    #[tokio::test]
    async fn lost_guard_can_turn_into_a_drop() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();
        let store: Arc<dyn Store> = Arc::new(InterleavingStore {
            inner: RocksStore::open(dir.path()).unwrap(),
            competitor: record(user_id, 0, 0),
            fired: AtomicBool::new(false),
        });
        let settlement = settlement_over(store.clone());
        let work = addition(user_id);

        let outcome = settlement.settle(&work).await.unwrap();

        assert_eq!(
            outcome,
            SettlementOutcome::Dropped {
                balance: 0,
                required: 1
            }
        );
    }

    #[tokio::test]
    async fn far_future_record_does_not_block_settlement() {
        let f = fixture();
        f.give(10, 1_000);
        f.give(15, chrono::Utc::now().timestamp_millis() + 3_600_000);

        let SettlementOutcome::Settled(record) =
            f.settlement.settle(&addition(f.user_id)).await.unwrap()
        else {
            panic!("expected a settled record");
        };
        // Charged against the record dated before now
        assert_eq!(record.user_balance, 9);

        let unguarded = settlement_over(f.store.clone()).with_guard(false, 0);
        let SettlementOutcome::Settled(record) =
            unguarded.settle(&addition(f.user_id)).await.unwrap()
        else {
            panic!("expected a settled record");
        };
        assert_eq!(record.user_balance, 8);
    }

    #[tokio::test]
    async fn record_dated_inside_the_guard_window_settles_after_a_retry() {
        let f = fixture();
        f.give(15, chrono::Utc::now().timestamp_millis() + 20);

        let SettlementOutcome::Settled(record) =
            f.settlement.settle(&addition(f.user_id)).await.unwrap()
        else {
            panic!("expected a settled record");
        };
        assert_eq!(record.user_balance, 14);
    }
}
