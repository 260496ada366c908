//! Shared pagination utilities

use serde::{Deserialize, Serialize};

/// Common pagination request parameters
///
/// Defaults to page 1 with 100 items; per-page is clamped to 1-1000 since
/// partition pages feed operator tooling rather than end-user lists.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    /// Items per page. Defaults to 100, clamped to 1-1000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl PaginationParams {
    /// Get the page number (1-indexed), defaulting to 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get items per page, defaulting to 100 and clamped to 1-1000
    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(100).clamp(1, 1000)
    }

    /// Calculate the offset for SQL OFFSET clause
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

/// Pagination metadata for response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMetadata {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationMetadata {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 100);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_calculation() {
        let params = PaginationParams {
            page: Some(3),
            per_page: Some(50),
        };
        assert_eq!(params.offset(), 100);
    }

    #[test]
    fn test_per_page_clamped() {
        let params = PaginationParams {
            page: Some(1),
            per_page: Some(100_000),
        };
        assert_eq!(params.per_page(), 1000);
    }

    #[test]
    fn test_metadata_total_pages() {
        let meta = PaginationMetadata::new(1, 100, 250);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PaginationMetadata::new(1, 100, 0).total_pages, 0);
    }
}
