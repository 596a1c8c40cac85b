//! Column families used by the ledger store.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Ledger rows, keyed by `PK \0 SK`. Value is the CBOR-encoded row.
    pub const LEDGER: &str = "ledger";

    /// Secondary index 1, keyed by `GSI1PK \0 GSI1SK \0 PK \0 SK`.
    /// Value is empty (index only).
    pub const LEDGER_GSI1: &str = "ledger_gsi1";

    /// Secondary index 2, keyed by `GSI2PK \0 GSI2SK \0 PK \0 SK`.
    /// Value is empty (index only).
    pub const LEDGER_GSI2: &str = "ledger_gsi2";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::LEDGER, cf::LEDGER_GSI1, cf::LEDGER_GSI2]
}
