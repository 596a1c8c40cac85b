//! Keyspace rows.
//!
//! A [`Row`] is the unit the store reads and writes: a primary key, up to two
//! secondary index projections, and free-form attributes. The store never looks
//! inside the attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::Index;

/// Attribute names reserved for keys. Partial updates may not touch them.
pub const KEY_ATTRIBUTES: [&str; 6] = ["PK", "SK", "GSI1PK", "GSI1SK", "GSI2PK", "GSI2SK"];

/// The identity of a row: partition value plus sort value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// Partition value, e.g. `User#{id}`.
    pub partition: String,
    /// Sort value, e.g. `Record#{id}`.
    pub sort: String,
}

impl PrimaryKey {
    /// Build a primary key.
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

/// A stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Partition value.
    #[serde(rename = "PK")]
    pub pk: String,

    /// Sort value, unique within the partition.
    #[serde(rename = "SK")]
    pub sk: String,

    /// Secondary index 1 partition value.
    #[serde(rename = "GSI1PK", default, skip_serializing_if = "Option::is_none")]
    pub gsi1pk: Option<String>,

    /// Secondary index 1 sort value.
    #[serde(rename = "GSI1SK", default, skip_serializing_if = "Option::is_none")]
    pub gsi1sk: Option<String>,

    /// Secondary index 2 partition value.
    #[serde(rename = "GSI2PK", default, skip_serializing_if = "Option::is_none")]
    pub gsi2pk: Option<String>,

    /// Secondary index 2 sort value.
    #[serde(rename = "GSI2SK", default, skip_serializing_if = "Option::is_none")]
    pub gsi2sk: Option<String>,

    /// Everything else.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Row {
    /// A row with only a primary key.
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
            gsi1pk: None,
            gsi1sk: None,
            gsi2pk: None,
            gsi2sk: None,
            attributes: Map::new(),
        }
    }

    /// Set the secondary index 1 projection.
    #[must_use]
    pub fn with_gsi1(mut self, pk: impl Into<String>, sk: impl Into<String>) -> Self {
        self.gsi1pk = Some(pk.into());
        self.gsi1sk = Some(sk.into());
        self
    }

    /// Set the secondary index 2 projection.
    #[must_use]
    pub fn with_gsi2(mut self, pk: impl Into<String>, sk: impl Into<String>) -> Self {
        self.gsi2pk = Some(pk.into());
        self.gsi2sk = Some(sk.into());
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The row's primary key.
    #[must_use]
    pub fn primary_key(&self) -> PrimaryKey {
        PrimaryKey::new(self.pk.clone(), self.sk.clone())
    }

    /// Look up an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The `(partition, sort)` pair the row is found under in `index`, if it
    /// is projected there.
    #[must_use]
    pub fn index_key(&self, index: Index) -> Option<(&str, &str)> {
        match index {
            Index::Primary => Some((&self.pk, &self.sk)),
            Index::Gsi1 => Some((self.gsi1pk.as_deref()?, self.gsi1sk.as_deref()?)),
            Index::Gsi2 => Some((self.gsi2pk.as_deref()?, self.gsi2sk.as_deref()?)),
        }
    }
}
