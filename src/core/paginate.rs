use serde::{Deserialize, Serialize};

/// Zero-based page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationState {
    /// Zero-based page.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: 5,
        }
    }
}

/// `max(1, ceil(count / page_size))`; a zero page size counts as one.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

impl PaginationState {
    /// First page at `page_size`.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    /// Pulls `page_index` back inside `[0, total_pages)`. Returns true when it moved.
    pub fn clamp(&mut self, total_pages: usize) -> bool {
        let last = total_pages.max(1) - 1;
        if self.page_index > last {
            self.page_index = last;
            true
        } else {
            false
        }
    }

    /// Changes the page size, keeping the page index unless it is now out of range.
    pub fn set_page_size(&mut self, page_size: usize, visible_count: usize) {
        self.page_size = page_size.max(1);
        self.clamp(total_pages(visible_count, self.page_size));
    }

    /// A previous page exists.
    pub fn can_previous(&self) -> bool {
        self.page_index > 0
    }

    /// A next page exists.
    pub fn can_next(&self, total_pages: usize) -> bool {
        self.page_index + 1 < total_pages
    }

    /// Steps back one page.
    pub fn previous(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    /// Steps forward one page.
    pub fn next(&mut self, total_pages: usize) {
        if self.can_next(total_pages) {
            self.page_index += 1;
        }
    }
}

/// One page cut out of an ordered row set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows on the page.
    pub rows: Vec<T>,
    /// Clamped index actually shown.
    pub page_index: usize,
    /// Page count, at least one.
    pub total_pages: usize,
}

/// Clamps `page_index` and slices `[index * size, index * size + size)`.
pub fn paginate<T: Clone>(ordered: &[T], page_index: usize, page_size: usize) -> Page<T> {
    let size = page_size.max(1);
    let total = total_pages(ordered.len(), size);
    let page_index = page_index.min(total - 1);
    let start = (page_index * size).min(ordered.len());
    let end = (start + size).min(ordered.len());
    Page {
        rows: ordered[start..end].to_vec(),
        page_index,
        total_pages: total,
    }
}
