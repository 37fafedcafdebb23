use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&size=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageParams {
    /// Resolves defaults and rejects out-of-range values.
    pub fn resolve(&self) -> Result<Page, AppError> {
        let page = self.page.unwrap_or(1);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(AppError::Validation("page must be >= 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(AppError::Validation(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if (page - 1).checked_mul(size).is_none() {
            return Err(AppError::Validation("page is too large".to_string()));
        }
        Ok(Page { page, size })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub page: i64,
    pub size: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            size: page.size,
            pages: (total + page.size - 1) / page.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageParams { page: None, size: None }.resolve().unwrap();
        assert_eq!(page, Page { page: 1, size: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_offset_for_later_pages() {
        let page = PageParams { page: Some(3), size: Some(25) }.resolve().unwrap();
        assert_eq!(page.offset(), 50);
        assert_eq!(page.limit(), 25);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(PageParams { page: Some(0), size: None }.resolve().is_err());
        assert!(PageParams { page: None, size: Some(0) }.resolve().is_err());
        assert!(PageParams { page: None, size: Some(101) }.resolve().is_err());
    }

    #[test]
    fn test_page_with_overflowing_offset_rejected() {
        let err = PageParams { page: Some(i64::MAX), size: Some(100) }
            .resolve()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let last = i64::MAX / 100 + 1;
        let page = PageParams { page: Some(last), size: Some(100) }.resolve().unwrap();
        assert_eq!(page.offset(), (last - 1) * 100);
    }

    #[test]
    fn test_page_count_rounds_up() {
        let page = Page { page: 1, size: 10 };
        assert_eq!(Paginated::<u8>::new(vec![], 0, page).pages, 0);
        assert_eq!(Paginated::<u8>::new(vec![], 10, page).pages, 1);
        assert_eq!(Paginated::<u8>::new(vec![], 11, page).pages, 2);
    }
}
