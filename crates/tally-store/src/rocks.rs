//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::query::{Index, LatestGuard, Order, Query};
use crate::row::{PrimaryKey, Row, KEY_ATTRIBUTES};
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
///
/// Reads go straight to the database. Every write that checks a precondition
/// holds `write_lock` from the check until the batch is written.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

/// Log a `RocksDB` error and replace it with a caller-safe one.
fn database_error(operation: &'static str) -> impl FnOnce(rocksdb::Error) -> StoreError {
    move |e| {
        tracing::error!(operation, error = %e, "rocksdb operation failed");
        StoreError::Database(format!("{operation} failed"))
    }
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(database_error("open"))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a row using CBOR.
    fn serialize(row: &Row) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(row, &mut buf).map_err(|e| {
            tracing::error!(pk = %row.pk, sk = %row.sk, error = %e, "row encoding failed");
            StoreError::Serialization("row encoding failed".into())
        })?;
        Ok(buf)
    }

    /// Deserialize a row from CBOR.
    fn deserialize(data: &[u8]) -> Result<Row> {
        ciborium::from_reader(data).map_err(|e| {
            tracing::error!(error = %e, "row decoding failed");
            StoreError::Serialization("row decoding failed".into())
        })
    }

    fn validate(row: &Row) -> Result<()> {
        keys::validate_component(&row.pk)?;
        keys::validate_component(&row.sk)?;
        for index in [Index::Gsi1, Index::Gsi2] {
            if let Some((ipk, isk)) = row.index_key(index) {
                keys::validate_component(ipk)?;
                keys::validate_component(isk)?;
            }
        }
        check_attribute_names(&row.attributes)
    }

    fn load(&self, pk: &str, sk: &str) -> Result<Option<Row>> {
        let cf = self.cf(cf::LEDGER)?;
        self.db
            .get_cf(&cf, keys::row_key(pk, sk))
            .map_err(database_error("get"))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage the row and its index entries.
    fn put_batch(&self, batch: &mut WriteBatch, row: &Row) -> Result<()> {
        let cf_ledger = self.cf(cf::LEDGER)?;
        batch.put_cf(&cf_ledger, keys::row_key(&row.pk, &row.sk), Self::serialize(row)?);
        for (name, key) in index_entries(row) {
            let cf_index = self.cf(name)?;
            batch.put_cf(&cf_index, key, []); // Index entry (empty value)
        }
        Ok(())
    }

    /// Stage removal of the row and its index entries.
    fn delete_batch(&self, batch: &mut WriteBatch, row: &Row) -> Result<()> {
        let cf_ledger = self.cf(cf::LEDGER)?;
        batch.delete_cf(&cf_ledger, keys::row_key(&row.pk, &row.sk));
        for (name, key) in index_entries(row) {
            let cf_index = self.cf(name)?;
            batch.delete_cf(&cf_index, key);
        }
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(database_error("write"))
    }

    /// Insert `row` if its primary key is free. Caller holds the write lock.
    fn insert(&self, row: &Row) -> Result<()> {
        if self.load(&row.pk, &row.sk)?.is_some() {
            return Err(StoreError::AlreadyExists {
                pk: row.pk.clone(),
                sk: row.sk.clone(),
            });
        }
        let mut batch = WriteBatch::default();
        self.put_batch(&mut batch, row)?;
        self.write(batch)
    }

    fn not_found(key: &PrimaryKey) -> StoreError {
        StoreError::NotFound {
            pk: key.partition.clone(),
            sk: key.sort.clone(),
        }
    }
}

fn index_entries(row: &Row) -> Vec<(&'static str, Vec<u8>)> {
    [(Index::Gsi1, cf::LEDGER_GSI1), (Index::Gsi2, cf::LEDGER_GSI2)]
        .into_iter()
        .filter_map(|(index, name)| {
            row.index_key(index)
                .map(|(ipk, isk)| (name, keys::index_key(ipk, isk, &row.pk, &row.sk)))
        })
        .collect()
}

fn check_attribute_names(attributes: &Map<String, Value>) -> Result<()> {
    match KEY_ATTRIBUTES.iter().find(|name| attributes.contains_key(**name)) {
        Some(name) => Err(StoreError::InvalidKey(format!(
            "{name} cannot be set as an attribute"
        ))),
        None => Ok(()),
    }
}

impl Store for RocksStore {
    fn create(&self, row: &Row) -> Result<()> {
        Self::validate(row)?;
        let _write = self.lock()?;
        self.insert(row)
    }

    fn create_guarded(&self, row: &Row, guard: &LatestGuard) -> Result<()> {
        Self::validate(row)?;
        let _write = self.lock()?;

        let latest = self
            .query(&guard.query)?
            .into_iter()
            .next()
            .map(|latest| latest.primary_key());
        if latest != guard.expected {
            tracing::debug!(
                partition = %guard.query.partition,
                expected = ?guard.expected,
                found = ?latest,
                "guarded create lost"
            );
            return Err(StoreError::Conflict {
                partition: guard.query.partition.clone(),
            });
        }

        self.insert(row)
    }

    fn update(&self, row: &Row) -> Result<()> {
        Self::validate(row)?;
        let _write = self.lock()?;

        let existing = self
            .load(&row.pk, &row.sk)?
            .ok_or_else(|| Self::not_found(&row.primary_key()))?;

        let mut batch = WriteBatch::default();
        self.delete_batch(&mut batch, &existing)?;
        self.put_batch(&mut batch, row)?;
        self.write(batch)
    }

    fn update_partial(&self, key: &PrimaryKey, updates: &Map<String, Value>) -> Result<Row> {
        check_attribute_names(updates)?;
        let _write = self.lock()?;

        let mut row = self
            .load(&key.partition, &key.sort)?
            .ok_or_else(|| Self::not_found(key))?;
        for (name, value) in updates {
            row.attributes.insert(name.clone(), value.clone());
        }

        let mut batch = WriteBatch::default();
        self.put_batch(&mut batch, &row)?;
        self.write(batch)?;
        Ok(row)
    }

    fn get(&self, key: &PrimaryKey) -> Result<Option<Row>> {
        self.load(&key.partition, &key.sort)
    }

    fn delete(&self, key: &PrimaryKey) -> Result<Option<Row>> {
        let _write = self.lock()?;

        let Some(row) = self.load(&key.partition, &key.sort)? else {
            return Ok(None);
        };
        let mut batch = WriteBatch::default();
        self.delete_batch(&mut batch, &row)?;
        self.write(batch)?;
        Ok(Some(row))
    }

    fn query(&self, query: &Query) -> Result<Vec<Row>> {
        let limit = query.limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        if limit == 0 {
            return Ok(rows);
        }

        let cf_name = match query.index {
            Index::Primary => cf::LEDGER,
            Index::Gsi1 => cf::LEDGER_GSI1,
            Index::Gsi2 => cf::LEDGER_GSI2,
        };
        let cf = self.cf(cf_name)?;

        let prefix = keys::partition_prefix(&query.partition);
        let upper = keys::prefix_upper_bound(&prefix);
        let mode = match query.order {
            Order::Ascending => IteratorMode::From(&prefix, Direction::Forward),
            Order::Descending => IteratorMode::From(&upper, Direction::Reverse),
        };
        let matches = |sort: &str| query.condition.as_ref().map_or(true, |c| c.matches(sort));

        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item.map_err(database_error("query"))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let row = if query.index == Index::Primary {
                let (_, sk) = keys::split_row_key(&key)
                    .ok_or_else(|| StoreError::Serialization("malformed row key".into()))?;
                if !matches(&sk) {
                    continue;
                }
                Self::deserialize(&value)?
            } else {
                let (_, isk, pk, sk) = keys::split_index_key(&key)
                    .ok_or_else(|| StoreError::Serialization("malformed index key".into()))?;
                if !matches(&isk) {
                    continue;
                }
                match self.load(&pk, &sk)? {
                    Some(row) => row,
                    None => {
                        tracing::warn!(%pk, %sk, index = cf_name, "dangling index entry");
                        continue;
                    }
                }
            };

            rows.push(row);
            if rows.len() >= limit {
                break;
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Condition;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn entry(pk: &str, sk: &str, position: &str) -> Row {
        Row::new(pk, sk)
            .with_gsi1(pk, format!("Pos#{position}"))
            .with_gsi2(pk, format!("Tag#{sk}"))
            .with_attribute("position", position)
    }

    fn sort_keys(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.sk.as_str()).collect()
    }

    #[test]
    fn create_and_get() {
        let (store, _dir) = create_test_store();
        let row = entry("P#1", "S#a", "1");

        store.create(&row).unwrap();

        let retrieved = store.get(&row.primary_key()).unwrap().unwrap();
        assert_eq!(retrieved, row);
        assert!(store.get(&PrimaryKey::new("P#1", "S#b")).unwrap().is_none());
    }

    #[test]
    fn create_rejects_existing_key() {
        let (store, _dir) = create_test_store();
        let row = entry("P#1", "S#a", "1");
        store.create(&row).unwrap();

        let result = store.create(&entry("P#1", "S#a", "2"));
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));

        // Original untouched
        let retrieved = store.get(&row.primary_key()).unwrap().unwrap();
        assert_eq!(retrieved.attribute("position"), Some(&Value::from("1")));
    }

    #[test]
    fn update_requires_existing_row() {
        let (store, _dir) = create_test_store();
        let result = store.update(&entry("P#1", "S#a", "1"));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert!(store.get(&PrimaryKey::new("P#1", "S#a")).unwrap().is_none());
    }

    #[test]
    fn update_moves_index_entries() {
        let (store, _dir) = create_test_store();
        store.create(&entry("P#1", "S#a", "1")).unwrap();
        store.update(&entry("P#1", "S#a", "9")).unwrap();

        let old = store
            .query(&Query::partition("P#1").on(Index::Gsi1).when(Condition::Equals("Pos#1".into())))
            .unwrap();
        assert!(old.is_empty());

        let new = store
            .query(&Query::partition("P#1").on(Index::Gsi1).when(Condition::Equals("Pos#9".into())))
            .unwrap();
        assert_eq!(sort_keys(&new), vec!["S#a"]);
    }

    #[test]
    fn update_partial_merges_attributes() {
        let (store, _dir) = create_test_store();
        let row = entry("P#1", "S#a", "1").with_attribute("deleted", false);
        store.create(&row).unwrap();

        let mut updates = Map::new();
        updates.insert("deleted".into(), Value::Bool(true));
        let updated = store.update_partial(&row.primary_key(), &updates).unwrap();

        assert_eq!(updated.attribute("deleted"), Some(&Value::Bool(true)));
        assert_eq!(updated.attribute("position"), Some(&Value::from("1")));
        assert_eq!(store.get(&row.primary_key()).unwrap().unwrap(), updated);

        // Still reachable through its index
        let indexed = store.query(&Query::partition("P#1").on(Index::Gsi1)).unwrap();
        assert_eq!(indexed, vec![updated]);
    }

    #[test]
    fn update_partial_missing_row() {
        let (store, _dir) = create_test_store();
        let result = store.update_partial(&PrimaryKey::new("P#1", "S#a"), &Map::new());
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn update_partial_cannot_touch_keys() {
        let (store, _dir) = create_test_store();
        let row = entry("P#1", "S#a", "1");
        store.create(&row).unwrap();

        let mut updates = Map::new();
        updates.insert("GSI1SK".into(), Value::from("Pos#0"));
        let result = store.update_partial(&row.primary_key(), &updates);
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn delete_returns_removed_row() {
        let (store, _dir) = create_test_store();
        let row = entry("P#1", "S#a", "1");
        store.create(&row).unwrap();

        let removed = store.delete(&row.primary_key()).unwrap();
        assert_eq!(removed, Some(row.clone()));
        assert!(store.get(&row.primary_key()).unwrap().is_none());
        assert!(store.query(&Query::partition("P#1").on(Index::Gsi2)).unwrap().is_empty());

        assert_eq!(store.delete(&row.primary_key()).unwrap(), None);
    }

    #[test]
    fn query_orders_and_limits() {
        let (store, _dir) = create_test_store();
        for (sk, position) in [("S#b", "2"), ("S#a", "3"), ("S#c", "1")] {
            store.create(&entry("P#1", sk, position)).unwrap();
        }

        let ascending = store.query(&Query::partition("P#1")).unwrap();
        assert_eq!(sort_keys(&ascending), vec!["S#a", "S#b", "S#c"]);

        let descending = store.query(&Query::partition("P#1").descending()).unwrap();
        assert_eq!(sort_keys(&descending), vec!["S#c", "S#b", "S#a"]);

        let by_position = store
            .query(&Query::partition("P#1").on(Index::Gsi1).descending().limit(2))
            .unwrap();
        assert_eq!(sort_keys(&by_position), vec!["S#a", "S#b"]);

        assert!(store.query(&Query::partition("P#1").limit(0)).unwrap().is_empty());
    }

    #[test]
    fn query_applies_condition_to_index_sort_value() {
        let (store, _dir) = create_test_store();
        for (sk, position) in [("S#a", "1"), ("S#b", "2"), ("S#c", "3"), ("S#d", "4")] {
            store.create(&entry("P#1", sk, position)).unwrap();
        }

        let between = store
            .query(&Query::partition("P#1").on(Index::Gsi1).when(Condition::Between {
                low: "Pos#2".into(),
                high: "Pos#3".into(),
            }))
            .unwrap();
        assert_eq!(sort_keys(&between), vec!["S#b", "S#c"]);

        let latest_before = store
            .query(
                &Query::partition("P#1")
                    .on(Index::Gsi1)
                    .when(Condition::LessThanOrEqual("Pos#3".into()))
                    .descending()
                    .limit(1),
            )
            .unwrap();
        assert_eq!(sort_keys(&latest_before), vec!["S#c"]);

        let tagged = store
            .query(&Query::partition("P#1").on(Index::Gsi2).when(Condition::BeginsWith("Tag#S#d".into())))
            .unwrap();
        assert_eq!(sort_keys(&tagged), vec!["S#d"]);
    }

    #[test]
    fn partitions_are_isolated() {
        let (store, _dir) = create_test_store();
        store.create(&entry("User#1", "S#a", "1")).unwrap();
        store.create(&entry("User#12", "S#b", "1")).unwrap();
        store.create(&entry("User#0", "S#c", "1")).unwrap();

        let rows = store.query(&Query::partition("User#1")).unwrap();
        assert_eq!(sort_keys(&rows), vec!["S#a"]);

        let rows = store.query(&Query::partition("User#1").on(Index::Gsi1).descending()).unwrap();
        assert_eq!(sort_keys(&rows), vec!["S#a"]);
    }

    #[test]
    fn guarded_create_checks_latest_row() {
        let (store, _dir) = create_test_store();
        let latest = |expected: Option<PrimaryKey>| LatestGuard {
            query: Query::partition("P#1").on(Index::Gsi1).descending().limit(1),
            expected,
        };

        let first = entry("P#1", "S#a", "1");
        store.create_guarded(&first, &latest(None)).unwrap();

        // Someone else wrote since we looked
        let result = store.create_guarded(&entry("P#1", "S#b", "2"), &latest(None));
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert!(store.get(&PrimaryKey::new("P#1", "S#b")).unwrap().is_none());

        store
            .create_guarded(&entry("P#1", "S#b", "2"), &latest(Some(first.primary_key())))
            .unwrap();
        assert_eq!(store.query(&Query::partition("P#1")).unwrap().len(), 2);
    }

    #[test]
    fn rejects_unencodable_keys() {
        let (store, _dir) = create_test_store();
        assert!(matches!(
            store.create(&Row::new("P\0#1", "S#a")),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.create(&Row::new("P#1", "S#a").with_attribute("PK", "x")),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let row = entry("P#1", "S#a", "1").with_attribute("amount", 3);
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.create(&row).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let retrieved = store.get(&row.primary_key()).unwrap().unwrap();
        assert_eq!(retrieved.attribute("amount").and_then(Value::as_i64), Some(3));
        assert_eq!(store.query(&Query::partition("P#1").on(Index::Gsi1)).unwrap().len(), 1);
    }
}
