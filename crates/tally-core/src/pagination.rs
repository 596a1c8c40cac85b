//! Page-number pagination over fully materialised result sets.

use serde::Serialize;

use crate::error::{LedgerError, Result};

/// Default page when the caller does not pass one.
pub const DEFAULT_PAGE: &str = "1";

/// Default page size when the caller does not pass one.
pub const DEFAULT_PER_PAGE: &str = "10";

/// Validated pagination parameters. Pages are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    per_page: usize,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Requested page.
    pub page: usize,
    /// Requested page size.
    pub per_page: usize,
    /// Total number of items across all pages.
    pub total: usize,
    /// Number of non-empty pages.
    pub total_pages: usize,
    /// Items on this page; empty when the page is out of range.
    pub data: Vec<T>,
}

impl Paginator {
    /// Parse raw `page` / `per_page` parameters, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for non-numeric values or values below 1.
    pub fn from_params(page: Option<&str>, per_page: Option<&str>) -> Result<Self> {
        let page = parse_positive("page", page.unwrap_or(DEFAULT_PAGE))?;
        let per_page = parse_positive("per_page", per_page.unwrap_or(DEFAULT_PER_PAGE))?;
        Ok(Self { page, per_page })
    }

    /// Requested page.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Requested page size.
    #[must_use]
    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    /// Cut `items` down to the requested page.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let total_pages = total.div_ceil(self.per_page);
        let start = (self.page - 1).saturating_mul(self.per_page);
        let data = items.into_iter().skip(start).take(self.per_page).collect();
        Page {
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages,
            data,
        }
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::invalid(format!("{name} parameter must be an integer")));
    }
    let value: usize = raw
        .parse()
        .map_err(|_| LedgerError::invalid(format!("{name} parameter is out of range")))?;
    if value == 0 {
        return Err(LedgerError::invalid(format!("{name} parameter must be at least 1")));
    }
    Ok(value)
}
