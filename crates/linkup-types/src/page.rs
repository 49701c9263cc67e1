//! Pagination

use serde::{Deserialize, Serialize};

/// Default page size
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest page size a caller may request
pub const MAX_LIMIT: u32 = 50;

/// Normalised page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Items per page
    pub limit: u32,
}

impl PageRequest {
    /// Build a page request, clamping page to >= 1 and limit to `1..=MAX_LIMIT`
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(0) | None => DEFAULT_LIMIT,
            Some(l) => l.min(MAX_LIMIT),
        };
        Self { page, limit }
    }

    /// Rows to skip
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned with a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total matching items
    pub total: u64,
    /// Total pages
    pub total_page: u64,
}

impl PageMeta {
    /// Compute metadata for `total` items
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_page: total.div_ceil(u64::from(request.limit)),
        }
    }
}

/// A page of items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Metadata
    pub meta: PageMeta,
    /// Items on this page
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page
    pub fn new(request: PageRequest, total: u64, data: Vec<T>) -> Self {
        Self {
            meta: PageMeta::new(request, total),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_page_and_limit() {
        assert_eq!(PageRequest::new(Some(0), Some(500)), PageRequest { page: 1, limit: 50 });
        assert_eq!(PageRequest::new(None, Some(0)), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_total_pages_round_up() {
        let meta = PageMeta::new(PageRequest::new(Some(1), Some(10)), 21);
        assert_eq!(meta.total_page, 3);
        assert_eq!(PageMeta::new(PageRequest::default(), 0).total_page, 0);
    }
}
