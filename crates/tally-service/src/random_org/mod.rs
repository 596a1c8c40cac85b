//! Random string generation.
//!
//! Strings come from random.org in batches, are cached, and are generated
//! locally whenever random.org has nothing to give.

pub mod cache;
pub mod client;

pub use cache::{generate_local, CacheState, RandomStringCache};
pub use client::{RandomOrgClient, RandomOrgError, RandomSource};
