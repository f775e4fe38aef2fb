//! Offset pagination.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Upper bound on `page_size` accepted from callers.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated 1-based page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    pub fn new(page: u32, page_size: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::validation("page must be >= 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(DomainError::validation(format!(
                "pageSize must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }

    /// Build from optional query parameters, applying defaults.
    pub fn from_query(page: Option<u32>, page_size: Option<u32>) -> Result<Self, DomainError> {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Slice an already-ordered sequence (used by in-memory stores).
    pub fn apply<T: Clone>(&self, ordered: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        ordered
            .iter()
            .skip(start)
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_zero_page_and_oversized_pages() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
        assert_eq!(PageRequest::from_query(None, None).unwrap(), PageRequest::default());
    }

    #[test]
    fn fifteen_rows_split_ten_then_five() {
        let rows: Vec<u32> = (1..=15).collect();
        let first = PageRequest::new(1, 10).unwrap().apply(&rows);
        let second = PageRequest::new(2, 10).unwrap().apply(&rows);
        assert_eq!(first.len(), 10);
        assert_eq!(second, vec![11, 12, 13, 14, 15]);
    }

    proptest! {
        #[test]
        fn pages_partition_the_sequence(len in 0usize..120, size in 1u32..=MAX_PAGE_SIZE) {
            let rows: Vec<usize> = (0..len).collect();
            let mut seen = Vec::new();
            let mut page = 1u32;
            loop {
                let chunk = PageRequest::new(page, size).unwrap().apply(&rows);
                if chunk.is_empty() {
                    break;
                }
                prop_assert!(chunk.len() <= size as usize);
                seen.extend(chunk);
                page += 1;
            }
            prop_assert_eq!(seen, rows);
        }
    }
}
