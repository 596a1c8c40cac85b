//! API handlers.

pub mod balance;
pub mod health;
pub mod operations;
pub mod records;
