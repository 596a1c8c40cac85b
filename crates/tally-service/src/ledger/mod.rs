//! The ledger core: balances, the catalog, admission and settlement.

pub mod admission;
pub mod balance;
pub mod catalog;
pub mod records;
pub mod settlement;

pub use admission::{Admission, Admitted};
pub use balance::{BalanceResolver, BalanceSnapshot};
pub use catalog::{default_cost, Catalog};
pub use records::RecordQueries;
pub use settlement::{Settlement, SettlementOutcome};
