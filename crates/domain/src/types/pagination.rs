//! Paged list responses

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT};

const fn default_page() -> u32 {
    DEFAULT_PAGE
}

const fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// One page of a paginated listing
///
/// Navigation flags are derived from `page` and `total_pages` rather than
/// trusted from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next_page().then(|| self.page + 1)
    }

    pub fn prev_page(&self) -> Option<u32> {
        self.has_prev_page().then(|| self.page - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_flags_follow_page_counts() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"data":[1,2],"page":2,"limit":2,"total":6,"totalPages":3}"#)
                .unwrap();
        assert!(page.has_next_page());
        assert!(page.has_prev_page());
        assert_eq!(page.next_page(), Some(3));
        assert_eq!(page.prev_page(), Some(1));
    }

    #[test]
    fn missing_fields_default_to_first_page() {
        let page: Page<u32> = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 10);
        assert!(!page.has_next_page());
        assert_eq!(page.prev_page(), None);
    }
}
