//! Page requests and paged results.

use serde::Serialize;

/// Page size used when the caller doesn't ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A 1-based page request. Always holds clamped, usable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1.
    pub page: u32,
    /// Items per page, in `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
}

impl PageRequest {
    /// Builds a request from optional query values, clamping out-of-range input.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    /// SQL `LIMIT`.
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of matching items.
    pub total: i64,
    /// Page number.
    pub page: u32,
    /// Page size that was applied.
    pub page_size: u32,
    /// Number of pages for `total` items.
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Wraps the items of `request` out of `total`.
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total = total.max(0);
        let size = i64::from(request.page_size);
        let total_pages = u32::try_from((total + size - 1) / size).unwrap_or(u32::MAX);
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages,
        }
    }

    /// Converts the items, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }

    /// Returns true if the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults() {
        let request = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn offset_follows_page() {
        let request = PageRequest::new(Some(3), Some(10));
        assert_eq!(request.offset(), 20);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn total_pages_rounds_up() {
        let request = PageRequest::new(Some(1), Some(10));
        assert_eq!(Page::<()>::new(vec![], 0, request).total_pages, 0);
        assert_eq!(Page::<()>::new(vec![], 10, request).total_pages, 1);
        assert_eq!(Page::<()>::new(vec![], 11, request).total_pages, 2);
    }

    #[test]
    fn map_keeps_paging() {
        let page = Page::new(vec![1, 2, 3], 13, PageRequest::new(Some(2), Some(3)));
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.total, 13);
        assert_eq!(mapped.page, 2);
        assert_eq!(mapped.total_pages, 5);
    }

    proptest! {
        #[test]
        fn request_is_always_clamped(page in any::<Option<u32>>(), size in any::<Option<u32>>()) {
            let request = PageRequest::new(page, size);
            prop_assert!(request.page >= 1);
            prop_assert!((1..=MAX_PAGE_SIZE).contains(&request.page_size));
            prop_assert!(request.offset() >= 0);
        }
    }
}
