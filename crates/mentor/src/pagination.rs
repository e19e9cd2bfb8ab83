//! Page envelope and query parameters for paginated endpoints.
//!
//! Every listing endpoint returns `{ results, meta }`. Pages are 1-indexed and
//! selected with the `page` query parameter; a traversal is complete once the
//! server reports `current_page >= total_pages`.

use serde::{Deserialize, Serialize};

/// Name of the query parameter selecting a page.
pub const PAGE_PARAM: &str = "page";

/// Pagination metadata attached to every page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub total_pages: u32,
    /// Only present on the notifications endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
}

/// One page of a paginated response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// True when no further page should be requested.
    #[inline]
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.meta.current_page >= self.meta.total_pages
    }
}

/// Ordered query parameters.
///
/// Keys are unique: [`Query::set`] replaces an existing value in place so the
/// page number is mutated, never appended twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Query::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
