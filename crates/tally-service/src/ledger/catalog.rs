//! The operation catalog.

use std::sync::Arc;

use tally_core::{LedgerError, Operation, OperationType, Result};
use tally_store::{codec, Condition, Index, Query, Store};

/// Cost of each operation type when the catalog is seeded.
#[must_use]
pub const fn default_cost(operation_type: OperationType) -> i64 {
    match operation_type {
        OperationType::Addition => 1,
        OperationType::Subtraction => 2,
        OperationType::Multiplication => 3,
        OperationType::Division => 4,
        OperationType::SquareRoot => 5,
        OperationType::RandomString => 6,
    }
}

/// Reads and seeds catalog entries.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    /// Create a catalog over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Seed one operation per type unless the catalog already has entries.
    ///
    /// Returns the operations created, which is empty when nothing was seeded.
    pub fn seed_if_empty(&self) -> Result<Vec<Operation>> {
        let existing = self
            .store
            .query(&Query::partition(codec::OPERATION_PARTITION).limit(1))?;
        if !existing.is_empty() {
            tracing::debug!("Operation catalog already seeded");
            return Ok(Vec::new());
        }

        let mut seeded = Vec::with_capacity(OperationType::ALL.len());
        for operation_type in OperationType::ALL {
            let row = codec::encode_operation(operation_type, default_cost(operation_type))?;
            self.store.create(&row)?;
            seeded.push(codec::decode_operation(&row)?);
        }

        tracing::info!(count = seeded.len(), "Seeded operation catalog");
        Ok(seeded)
    }

    /// The catalog entry for `operation_type`.
    pub fn find_by_type(&self, operation_type: OperationType) -> Result<Operation> {
        let query = Query::partition(codec::OPERATION_PARTITION)
            .on(Index::Gsi1)
            .when(Condition::Equals(codec::operation_type_key(operation_type)))
            .limit(1);

        match self.store.query(&query)?.first() {
            Some(row) => codec::decode_operation(row),
            None => Err(LedgerError::NotFound(format!(
                "operation {operation_type} is not in the catalog"
            ))),
        }
    }

    /// All operations, ordered by type name, optionally narrowed to types
    /// starting with `type_filter` (case-insensitive).
    pub fn list(&self, type_filter: Option<&str>) -> Result<Vec<Operation>> {
        let prefix = match type_filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(filter) => format!("{}{}", codec::OPERATION_PREFIX, filter.to_uppercase()),
            None => codec::OPERATION_PREFIX.to_string(),
        };
        tracing::debug!(%prefix, "Listing operations");

        let query = Query::partition(codec::OPERATION_PARTITION)
            .on(Index::Gsi1)
            .when(Condition::BeginsWith(prefix));

        self.store
            .query(&query)?
            .iter()
            .map(codec::decode_operation)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::RocksStore;
    use tempfile::TempDir;

    fn create_test_catalog() -> (Catalog, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (Catalog::new(store), dir)
    }

    #[test]
    fn seeds_once() {
        let (catalog, _dir) = create_test_catalog();

        let seeded = catalog.seed_if_empty().unwrap();
        assert_eq!(seeded.len(), 6);
        assert!(catalog.seed_if_empty().unwrap().is_empty());
        assert_eq!(catalog.list(None).unwrap().len(), 6);
    }

    #[test]
    fn find_by_type() {
        let (catalog, _dir) = create_test_catalog();
        catalog.seed_if_empty().unwrap();

        let operation = catalog.find_by_type(OperationType::SquareRoot).unwrap();
        assert_eq!(operation.operation_type, OperationType::SquareRoot);
        assert_eq!(operation.cost, 5);
    }

    #[test]
    fn missing_type_is_not_found() {
        let (catalog, _dir) = create_test_catalog();
        let err = catalog.find_by_type(OperationType::Addition).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn list_filters_by_type_prefix() {
        let (catalog, _dir) = create_test_catalog();
        catalog.seed_if_empty().unwrap();

        let types: Vec<_> = catalog
            .list(None)
            .unwrap()
            .into_iter()
            .map(|op| op.operation_type)
            .collect();
        assert_eq!(
            types,
            vec![
                OperationType::Addition,
                OperationType::Division,
                OperationType::Multiplication,
                OperationType::RandomString,
                OperationType::SquareRoot,
                OperationType::Subtraction,
            ]
        );

        let filtered = catalog.list(Some("s")).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|op| op.operation_type.as_str().starts_with('S')));

        assert!(catalog.list(Some("modulo")).unwrap().is_empty());
    }
}
