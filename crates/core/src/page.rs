//! Pagination model shared by list operations.

use serde::{Deserialize, Serialize};

/// Page/limit pair for list queries.
///
/// Invalid or non-positive values coerce to the defaults (page 1, limit 10)
/// rather than failing the request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.coerced()
    }

    /// Build from raw query-string values; anything unparseable or
    /// non-positive falls back to the default.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
        let limit = limit.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
        Self { page, limit }.coerced()
    }

    fn coerced(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.limit == 0 {
            self.limit = 10;
        }
        self
    }

    /// Zero-based row offset for the backing query.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of results plus the totals the client needs to render paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_data: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, params: PageParams, total_data: u64) -> Self {
        let limit = u64::from(params.limit);
        let total_pages = total_data.div_ceil(limit);
        Self {
            items,
            page: params.page,
            limit: params.limit,
            total_data,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total_data: self.total_data,
            total_pages: self.total_pages,
        }
    }
}
