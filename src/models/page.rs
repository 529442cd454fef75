use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Validated, 1-based pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    index: u32,
    size: u32,
}

impl PageRequest {
    /// Validates page bounds; both must be at least 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use lawdoc::PageRequest;
    ///
    /// let page = PageRequest::new(2, 10).unwrap();
    /// assert_eq!(page.offset(), 10);
    ///
    /// assert!(PageRequest::new(0, 10).is_err());
    /// assert!(PageRequest::new(1, 0).is_err());
    /// ```
    pub fn new(index: u32, size: u32) -> Result<Self> {
        if index < 1 || size < 1 {
            return Err(ServiceError::invalid(format!(
                "page index and page size must be greater than or equal to 1 (got index {index}, size {size})"
            )));
        }
        Ok(Self { index, size })
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn size(self) -> u32 {
        self.size
    }

    /// Number of rows to skip before this page.
    pub fn offset(self) -> i64 {
        i64::from(self.index - 1) * i64::from(self.size)
    }

    pub fn limit(self) -> i64 {
        i64::from(self.size)
    }
}

/// One page of results plus the metadata needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching rows before pagination was applied.
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        let size = u64::from(request.size());
        let total_pages = u32::try_from(total_count.div_ceil(size)).unwrap_or(u32::MAX);
        Self {
            items,
            total_count,
            page_number: request.index(),
            page_size: request.size(),
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn zero_index_or_size_is_invalid() {
        assert_eq!(
            PageRequest::new(0, 5).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            PageRequest::new(3, 0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn page_metadata_is_computed_from_total() {
        let request = PageRequest::new(2, 3).unwrap();
        let page = Page::new(vec!["d", "e", "f"], 7, request);

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page_number, 2);
        assert!(page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: Page<u8> = Page::new(Vec::new(), 0, PageRequest::new(1, 10).unwrap());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }
}
