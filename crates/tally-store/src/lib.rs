//! `RocksDB` ledger store for tally.
//!
//! This crate provides a small keyspace store modelled on a partitioned
//! key-value table with two secondary indexes, and the codec that maps ledger
//! entities onto it.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `ledger`: rows, keyed by partition and sort value
//! - `ledger_gsi1`: secondary index 1 entries
//! - `ledger_gsi2`: secondary index 2 entries
//!
//! [`Store`] knows nothing about records or operations; [`codec`] is the only
//! module that does.
//!
//! # Example
//!
//! ```no_run
//! use tally_store::{codec, Index, Query, RocksStore, Store};
//! use tally_core::OperationType;
//!
//! let store = RocksStore::open("/tmp/tally-db").unwrap();
//!
//! // Seed an operation
//! let row = codec::encode_operation(OperationType::Addition, 1).unwrap();
//! store.create(&row).unwrap();
//!
//! // Find it by type
//! let rows = store
//!     .query(&Query::partition(codec::OPERATION_PARTITION).on(Index::Gsi1))
//!     .unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod keys;
pub mod query;
pub mod rocks;
pub mod row;
pub mod schema;

pub use error::{Result, StoreError};
pub use query::{Condition, Index, LatestGuard, Order, Query};
pub use rocks::RocksStore;
pub use row::{PrimaryKey, Row};

use serde_json::{Map, Value};

/// The storage trait defining all keyspace operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, wrappers that inject failures in tests).
pub trait Store: Send + Sync {
    /// Insert a row whose primary key is not yet taken.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a row exists at the primary key.
    fn create(&self, row: &Row) -> Result<()>;

    /// Insert a row, provided the latest row of a guard query is still the
    /// expected one.
    ///
    /// The check and the insert are atomic with respect to other writes.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if the guard query's first row differs.
    /// - `StoreError::AlreadyExists` if a row exists at the primary key.
    fn create_guarded(&self, row: &Row, guard: &LatestGuard) -> Result<()>;

    /// Replace an existing row, re-indexing it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row exists at the primary key.
    fn update(&self, row: &Row) -> Result<()>;

    /// Set attributes on an existing row and return the updated row.
    ///
    /// Key fields cannot be updated this way.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no row exists at `key`.
    /// - `StoreError::InvalidKey` if `updates` names a key field.
    fn update_partial(&self, key: &PrimaryKey, updates: &Map<String, Value>) -> Result<Row>;

    /// Get a row by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(&self, key: &PrimaryKey) -> Result<Option<Row>>;

    /// Remove a row and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete(&self, key: &PrimaryKey) -> Result<Option<Row>>;

    /// Run a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn query(&self, query: &Query) -> Result<Vec<Row>>;
}
