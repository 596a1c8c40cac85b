//! Key encoding utilities for `RocksDB`.
//!
//! Key components are joined with a NUL byte. NUL sorts below every other
//! byte, so `a \0 ...` orders before `ab \0 ...` and the byte order of the
//! encoded keys matches the string order of their components.

use crate::error::{Result, StoreError};

const SEPARATOR: u8 = 0;

/// Reject key components the encoding cannot represent.
///
/// # Errors
///
/// Returns `StoreError::InvalidKey` for an empty component or one containing NUL.
pub fn validate_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(StoreError::InvalidKey("empty key component".into()));
    }
    if component.as_bytes().contains(&SEPARATOR) {
        return Err(StoreError::InvalidKey(format!(
            "key component contains NUL: {component:?}"
        )));
    }
    Ok(())
}

/// Key of a row in the ledger column family.
///
/// Format: `pk \0 sk`
#[must_use]
pub fn row_key(pk: &str, sk: &str) -> Vec<u8> {
    join(&[pk, sk])
}

/// Key of an index entry.
///
/// Format: `ipk \0 isk \0 pk \0 sk`
#[must_use]
pub fn index_key(ipk: &str, isk: &str, pk: &str, sk: &str) -> Vec<u8> {
    join(&[ipk, isk, pk, sk])
}

/// Prefix shared by every key of a partition.
#[must_use]
pub fn partition_prefix(partition: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(partition.len() + 1);
    prefix.extend_from_slice(partition.as_bytes());
    prefix.push(SEPARATOR);
    prefix
}

/// The smallest key greater than every key starting with `prefix`.
///
/// Used as the seek target for descending scans.
#[must_use]
pub fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return bound;
        }
    }
    vec![u8::MAX; prefix.len() + 1]
}

/// Split a row key into `(pk, sk)`.
#[must_use]
pub fn split_row_key(key: &[u8]) -> Option<(String, String)> {
    let mut parts = split(key)?;
    let sk = parts.pop()?;
    let pk = parts.pop()?;
    parts.is_empty().then_some((pk, sk))
}

/// Split an index key into `(ipk, isk, pk, sk)`.
#[must_use]
pub fn split_index_key(key: &[u8]) -> Option<(String, String, String, String)> {
    let parts = split(key)?;
    match <[String; 4]>::try_from(parts) {
        Ok([ipk, isk, pk, sk]) => Some((ipk, isk, pk, sk)),
        Err(_) => None,
    }
}

fn join(components: &[&str]) -> Vec<u8> {
    let len = components.iter().map(|c| c.len() + 1).sum();
    let mut key = Vec::with_capacity(len);
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.extend_from_slice(component.as_bytes());
    }
    key
}

fn split(key: &[u8]) -> Option<Vec<String>> {
    key.split(|b| *b == SEPARATOR)
        .map(|part| String::from_utf8(part.to_vec()).ok())
        .collect()
}
