use crate::{record::Record, types::PagingMode};

use super::{
    filter::{FilterState, filter},
    paginate::{Page, paginate},
    sort::{SortState, sort},
};

/// Every input of one filter → sort → paginate pass.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInput<'q> {
    /// Column filters.
    pub filters: &'q FilterState,
    /// Debounced search, never the raw keystrokes.
    pub search: &'q str,
    /// Columns the search looks at.
    pub searchable: &'q [&'q str],
    /// Sort.
    pub sort: &'q SortState,
    /// Requested page.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Where pagination happens.
    pub paging: PagingMode,
    /// Server-reported page count, used when `paging` is [`PagingMode::Server`].
    pub server_total_pages: usize,
}

/// Rows of the current page plus the counts the footer shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput<'a> {
    /// Page to show.
    pub page: Page<&'a Record>,
    /// Rows left after filtering, across all local pages.
    pub visible_count: usize,
}

/// Runs the pure pipeline over a borrowed record set.
///
/// Client paging slices the sorted rows locally. Server paging shows the
/// whole fetched page and takes the page count from the server.
pub fn run<'a>(records: &'a [Record], input: &PipelineInput<'_>) -> PipelineOutput<'a> {
    let visible = filter(records, input.filters, input.search, input.searchable);
    let visible_count = visible.len();
    let ordered = sort(visible, input.sort);

    let page = match input.paging {
        PagingMode::Client => paginate(&ordered, input.page_index, input.page_size),
        PagingMode::Server => {
            let total_pages = input.server_total_pages.max(1);
            Page {
                rows: ordered,
                page_index: input.page_index.min(total_pages - 1),
                total_pages,
            }
        }
    };

    PipelineOutput { page, visible_count }
}
