//! Paginated results of list reads.
//!
//! [`Pagination`] turns the caller's `limit`/`skip`/`page` into a consistent window, and
//! [`ResultEnvelope`] carries one page of results together with the metadata a client
//! needs to walk through the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{document::Document, error::DocumentStoreResult, record::Record};

/// One page of a list read.
///
/// # Example
///
/// ```ignore
/// use docrest::envelope::{Pagination, ResultEnvelope};
///
/// let window = Pagination::resolve(Some(20), None, Some(1), 10);
/// let envelope = ResultEnvelope::builder(records)
///     .with_total(32)
///     .with_window(window)
///     .build();
///
/// assert_eq!(envelope.pages, 2);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope<T = Record> {
    /// The records of this page.
    pub data: Vec<T>,
    /// Number of records matching the read, across all pages.
    pub total: u64,
    /// Number of records in `data`.
    pub size: u64,
    pub limit: u64,
    pub skip: u64,
    /// The requested page, 1-indexed.
    pub page: u64,
    /// Number of pages needed to hold `total` records.
    pub pages: u64,
    /// Latest update timestamp among the matching records.
    pub last_modified: Option<DateTime<Utc>>,
    /// `true` when the requested page lies past the last page.
    pub has_more: bool,
}

impl<T> ResultEnvelope<T> {
    pub fn builder(data: Vec<T>) -> ResultEnvelopeBuilder<T> {
        ResultEnvelopeBuilder::new(data)
    }

    /// Converts every item of the page, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultEnvelope<U> {
        ResultEnvelope {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            size: self.size,
            limit: self.limit,
            skip: self.skip,
            page: self.page,
            pages: self.pages,
            last_modified: self.last_modified,
            has_more: self.has_more,
        }
    }
}

impl ResultEnvelope<Record> {
    /// Deserializes every record of the page into `D`.
    ///
    /// # Errors
    ///
    /// Returns the first record that does not match the shape of `D`.
    pub fn into_typed<D: Document>(self) -> DocumentStoreResult<ResultEnvelope<D>> {
        let data = self
            .data
            .iter()
            .map(Record::to_typed::<D>)
            .collect::<DocumentStoreResult<Vec<D>>>()?;

        Ok(ResultEnvelope {
            data,
            total: self.total,
            size: self.size,
            limit: self.limit,
            skip: self.skip,
            page: self.page,
            pages: self.pages,
            last_modified: self.last_modified,
            has_more: self.has_more,
        })
    }
}

/// Builder for [`ResultEnvelope`]. `size`, `pages` and `has_more` are derived when the
/// envelope is built.
pub struct ResultEnvelopeBuilder<T> {
    data: Vec<T>,
    total: u64,
    window: Pagination,
    last_modified: Option<DateTime<Utc>>,
}

impl<T> ResultEnvelopeBuilder<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            total: 0,
            window: Pagination::default(),
            last_modified: None,
        }
    }

    /// Sets the number of matching records across all pages.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// Sets the window the page was read with.
    pub fn with_window(mut self, window: Pagination) -> Self {
        self.window = window;
        self
    }

    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn build(self) -> ResultEnvelope<T> {
        let pages = self.window.pages(self.total);

        ResultEnvelope {
            size: self.data.len() as u64,
            data: self.data,
            total: self.total,
            limit: self.window.limit,
            skip: self.window.skip,
            page: self.window.page,
            pages,
            last_modified: self.last_modified,
            has_more: self.window.page > pages,
        }
    }
}

/// A resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub skip: u64,
    pub page: u64,
}

impl Pagination {
    /// Resolves the caller's values into a window.
    ///
    /// A non-positive `limit` falls back to `default_limit`, a non-positive `skip` to `0`.
    /// A positive `page` wins over `skip` (`skip = (page - 1) * limit`); without one the
    /// page is the one `skip` falls into.
    pub fn resolve(
        limit: Option<i64>,
        skip: Option<i64>,
        page: Option<i64>,
        default_limit: i64,
    ) -> Self {
        let limit = positive(limit)
            .or_else(|| positive(Some(default_limit)))
            .unwrap_or(1);

        match positive(page) {
            Some(page) => Self {
                limit,
                skip: (page - 1).saturating_mul(limit),
                page,
            },
            None => {
                let skip = positive(skip).unwrap_or(0);
                Self { limit, skip, page: skip / limit + 1 }
            }
        }
    }

    /// Number of pages needed for `total` records.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: 10, skip: 0, page: 1 }
    }
}

fn positive(value: Option<i64>) -> Option<u64> {
    value
        .filter(|value| *value > 0)
        .map(|value| value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_round_up() {
        let window = Pagination::resolve(Some(10), None, None, 10);
        assert_eq!(window.pages(32), 4);

        let window = Pagination::resolve(Some(20), None, None, 10);
        assert_eq!(window.pages(32), 2);
        assert_eq!(window.pages(0), 0);
    }

    #[test]
    fn positive_page_overrides_skip() {
        let window = Pagination::resolve(Some(10), Some(5), Some(3), 10);
        assert_eq!(window, Pagination { limit: 10, skip: 20, page: 3 });
    }

    #[test]
    fn non_positive_values_fall_back() {
        let window = Pagination::resolve(Some(0), Some(-4), Some(0), 25);
        assert_eq!(window, Pagination { limit: 25, skip: 0, page: 1 });

        let window = Pagination::resolve(Some(-1), Some(40), None, 20);
        assert_eq!(window, Pagination { limit: 20, skip: 40, page: 3 });
    }

    #[test]
    fn envelope_derives_counts() {
        let envelope = ResultEnvelope::builder(vec![1; 20])
            .with_total(32)
            .with_window(Pagination::resolve(Some(20), None, Some(1), 10))
            .build();

        assert_eq!(envelope.size, 20);
        assert_eq!(envelope.pages, 2);
        assert_eq!(envelope.page, 1);
        assert!(!envelope.has_more);

        let past_end = ResultEnvelope::<i32>::builder(Vec::new())
            .with_total(32)
            .with_window(Pagination::resolve(Some(20), None, Some(3), 10))
            .build();
        assert!(past_end.has_more);
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let envelope = ResultEnvelope::<i32>::builder(vec![]).build();
        let json = serde_json::to_value(&envelope).unwrap();

        assert!(json.get("lastModified").is_some());
        assert_eq!(json["hasMore"], serde_json::Value::Bool(false));
    }
}
