use serde::{Deserialize, Serialize};

/// Paged slice of a listing, with the counts the UI needs for navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, window: PageWindow) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + window.per_page - 1) / window.per_page
        };
        Self {
            items,
            total,
            page: window.page,
            per_page: window.per_page,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
}

impl PageWindow {
    pub fn from_query(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_clamped() {
        let w = PageWindow::from_query(Some(0), Some(1000));
        assert_eq!(w, PageWindow { page: 1, per_page: 100 });
        assert_eq!(PageWindow::from_query(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<()> = Page::new(vec![], 41, PageWindow::from_query(None, Some(20)));
        assert_eq!(page.total_pages, 3);
        let empty: Page<()> = Page::new(vec![], 0, PageWindow::from_query(None, None));
        assert_eq!(empty.total_pages, 0);
    }
}
