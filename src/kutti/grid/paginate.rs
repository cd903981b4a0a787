use serde::{Deserialize, Serialize};

/// Derived pagination metadata. `start_index`/`end_index` are 1-based display
/// bounds; both are 0 when there is nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub total_count: usize,
}

impl PageWindow {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    pub window: PageWindow,
}

/// Number of pages for `len` rows; never below 1 so an empty grid still has a page.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub fn paginate<T>(rows: &[T], page_size: usize, current_page: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total = total_pages(rows.len(), page_size);
    let current = clamp_page(current_page, total);

    let start = ((current - 1) * page_size).min(rows.len());
    let end = (current * page_size).min(rows.len());

    let (start_index, end_index) = if rows.is_empty() {
        (0, 0)
    } else {
        (start + 1, end)
    };

    Page {
        rows: &rows[start..end],
        window: PageWindow {
            current_page: current,
            total_pages: total,
            page_size,
            start_index,
            end_index,
            total_count: rows.len(),
        },
    }
}
