//! Core types and rules for tally.
//!
//! This crate provides the foundational types of the tally credit ledger:
//!
//! - **Identifiers**: `UserId`, `RecordId`, `OperationId`
//! - **Catalog**: `Operation`, `OperationType`, `Channel`
//! - **Ledger**: `Record`, balance rules
//! - **Requests**: `OperationRequest`, `ValidatedRequest`, `Payload`, `WorkItem`
//! - **Listing**: `RecordFilter`, `Paginator`, `Page`
//!
//! # Credits
//!
//! Credits are synthetic, non-refundable integers. A user's balance is never
//! stored as a counter: it is the `user_balance` of their most recent record,
//! or [`DEFAULT_INITIAL_BALANCE`] before their first settled operation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod arithmetic;
pub mod balance;
pub mod error;
pub mod filter;
pub mod ids;
pub mod operation;
pub mod pagination;
pub mod record;
pub mod request;
pub mod work;

pub use balance::{check_sufficient_balance, settled_balance, DEFAULT_INITIAL_BALANCE};
pub use error::{LedgerError, Result};
pub use filter::RecordFilter;
pub use ids::{IdError, OperationId, RecordId, UserId};
pub use operation::{Channel, Operation, OperationType};
pub use pagination::{Page, Paginator};
pub use record::Record;
pub use request::{OperationRequest, Payload, ValidatedRequest};
pub use work::WorkItem;
