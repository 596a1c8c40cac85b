//! Query primitives.
//!
//! A [`Query`] selects rows of one partition of one index, optionally narrowed
//! by a [`Condition`] on the index's sort value, scanned in an [`Order`] and
//! capped by a limit.

use crate::row::PrimaryKey;

/// Which projection of the keyspace a query scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// `PK` / `SK`.
    Primary,
    /// `GSI1PK` / `GSI1SK`.
    Gsi1,
    /// `GSI2PK` / `GSI2SK`.
    Gsi2,
}

/// Scan direction over the sort value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Smallest sort value first.
    #[default]
    Ascending,
    /// Largest sort value first.
    Descending,
}

/// A predicate on a sort value. Comparisons are lexicographic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `key == value`
    Equals(String),
    /// `key < value`
    LessThan(String),
    /// `key <= value`
    LessThanOrEqual(String),
    /// `key > value`
    GreaterThan(String),
    /// `key >= value`
    GreaterThanOrEqual(String),
    /// `key` starts with `value`
    BeginsWith(String),
    /// `low <= key <= high`
    Between {
        /// Inclusive lower bound.
        low: String,
        /// Inclusive upper bound.
        high: String,
    },
}

impl Condition {
    /// Whether `key` satisfies the condition.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Equals(v) => key == v,
            Self::LessThan(v) => key < v.as_str(),
            Self::LessThanOrEqual(v) => key <= v.as_str(),
            Self::GreaterThan(v) => key > v.as_str(),
            Self::GreaterThanOrEqual(v) => key >= v.as_str(),
            Self::BeginsWith(v) => key.starts_with(v.as_str()),
            Self::Between { low, high } => low.as_str() <= key && key <= high.as_str(),
        }
    }
}

/// A query against one partition of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Partition value to scan.
    pub partition: String,
    /// Index to scan.
    pub index: Index,
    /// Optional sort value predicate.
    pub condition: Option<Condition>,
    /// Scan direction.
    pub order: Order,
    /// Maximum number of rows returned.
    pub limit: Option<usize>,
}

impl Query {
    /// Every row of `partition` in the primary index, ascending.
    pub fn partition(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            index: Index::Primary,
            condition: None,
            order: Order::Ascending,
            limit: None,
        }
    }

    /// Scan `index` instead of the primary index.
    #[must_use]
    pub const fn on(mut self, index: Index) -> Self {
        self.index = index;
        self
    }

    /// Narrow the scan with `condition`.
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Scan largest sort value first.
    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Precondition for [`Store::create_guarded`](crate::Store::create_guarded).
///
/// The first row returned by `query` must be the row at `expected`, or the
/// query must return nothing when `expected` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestGuard {
    /// Query whose first row is checked.
    pub query: Query,
    /// Primary key the first row must have.
    pub expected: Option<PrimaryKey>,
}
