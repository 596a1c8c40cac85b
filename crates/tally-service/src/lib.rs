//! Tally HTTP API Service.
//!
//! This crate provides the HTTP API and the settlement workers of the tally
//! credit ledger:
//!
//! - Balance lookup
//! - Operation catalog and operation requests
//! - Record polling, listing and soft deletion
//! - Asynchronous settlement with random.org backed random strings
//!
//! # Identity
//!
//! Callers are authenticated upstream. The authorizer forwards the subject as
//! a UUID in the `x-user-id` header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers over the synchronous store stay async for axum

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ledger;
pub mod queue;
pub mod random_org;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use queue::{DeadLetter, DeadLetterSink, InProcessQueue, Transport};
pub use random_org::{RandomOrgClient, RandomStringCache};
pub use routes::create_router;
pub use state::AppState;
