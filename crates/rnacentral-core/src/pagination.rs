//! # Pagination
//!
//! Page-number pagination for list endpoints.

use crate::{Error, Result};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound on a client-requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a request from optional query parameters, clamping the size.
    #[must_use]
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Cut one page out of `items`.
    ///
    /// Page 1 of an empty list is valid; any other page past the end is
    /// reported as not found.
    pub fn paginate<T>(&self, items: Vec<T>) -> Result<Page<T>> {
        let count = items.len();
        let start = (self.page - 1).saturating_mul(self.page_size);
        if start >= count && self.page > 1 {
            return Err(Error::not_found("page", self.page.to_string()));
        }
        let results = items
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect();
        Ok(Page {
            count,
            page: self.page,
            page_size: self.page_size,
            results,
        })
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Total number of items across all pages.
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Number of the following page, if any.
    #[must_use]
    pub fn next_page(&self) -> Option<usize> {
        let shown = self.page.saturating_mul(self.page_size);
        (shown < self.count).then_some(self.page + 1)
    }

    /// Number of the preceding page, if any.
    #[must_use]
    pub fn previous_page(&self) -> Option<usize> {
        (self.page > 1).then(|| self.page - 1)
    }

    /// Convert the results while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_many() {
        let page = PageRequest::new(None, Some(3)).paginate((1..=7).collect::<Vec<_>>());
        let page = page.ok();
        assert_eq!(page.as_ref().map(|p| p.results.clone()), Some(vec![1, 2, 3]));
        assert_eq!(page.as_ref().and_then(|p| p.next_page()), Some(2));
        assert_eq!(page.as_ref().and_then(|p| p.previous_page()), None);
    }

    #[test]
    fn last_partial_page() {
        let page = PageRequest::new(Some(3), Some(3)).paginate((1..=7).collect::<Vec<_>>());
        let page = page.ok();
        assert_eq!(page.as_ref().map(|p| p.results.clone()), Some(vec![7]));
        assert_eq!(page.as_ref().and_then(|p| p.next_page()), None);
        assert_eq!(page.as_ref().and_then(|p| p.previous_page()), Some(2));
    }

    #[test]
    fn page_past_end_is_not_found() {
        let result = PageRequest::new(Some(4), Some(3)).paginate((1..=7).collect::<Vec<_>>());
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn empty_first_page_is_valid() {
        let result = PageRequest::default().paginate(Vec::<u8>::new());
        assert_eq!(result.ok().map(|p| p.count), Some(0));
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(Some(0), Some(10_000)).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(0), Some(0)).page, 1);
    }
}
