//! Single owner of one list view's state.
//!
//! Every input change reruns the explicit filter → sort → paginate pipeline.
//! I/O is never performed here: methods return [`FetchPlan`]s and
//! [`MutationPlan`]s for the runtime to execute and hand the answers back
//! through [`TableView::complete_fetch`] and [`TableView::complete_mutation`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    core::{
        filter::FilterState,
        paginate::{PaginationState, total_pages},
        pipeline::{self, PipelineInput},
        sort::{SortDirective, SortState},
    },
    error::{FetchError, GatewayError, MutationError, RenderError, ViewError},
    gateway::GatewayResponse,
    mutation::{MutationOrchestrator, MutationPlan, MutationState, MutationSuccess},
    record::{Record, RecordInput},
    recovery::{ErrorRecovery, Fallback},
    schema::EntitySchema,
    source::{DataSource, FetchPlan, ListPage, ListParams, Read},
    types::{Dialog, EntityKind, MutationKind, MutationTarget, PagingMode, RecordId, RequestSeq},
};

/// Raw search input and the debounced value the filter actually uses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SearchState {
    raw: String,
    committed: String,
}

impl SearchState {
    /// Latest keystrokes.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Value consumed by the filter.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Input is ahead of the committed value.
    pub fn is_searching(&self) -> bool {
        self.raw != self.committed
    }
}

/// One displayed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Source record.
    pub record: Record,
    /// Cell text per schema column.
    pub cells: Vec<String>,
}

/// Everything a renderer needs for one frame of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    /// Entity shown.
    pub kind: EntityKind,
    /// Column headers in display order.
    pub headers: Vec<&'static str>,
    /// Rows of the current page, empty while faulted.
    pub rows: Vec<TableRow>,
    /// Zero-based page shown.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Page count, at least one.
    pub total_pages: usize,
    /// Rows left after filtering (client paging) or reported by the server.
    pub total_count: usize,
    /// A list request is in flight.
    pub loading: bool,
    /// Search input not yet committed.
    pub searching: bool,
    /// Raw search input.
    pub search: String,
    /// Committed search.
    pub committed_search: String,
    /// Column filters.
    pub filters: BTreeMap<String, String>,
    /// Active sort.
    pub sort: Option<SortDirective>,
    /// Fallback shown instead of rows.
    pub fault: Option<Fallback>,
    /// Open dialog.
    pub dialog: Option<Dialog>,
    /// Non-idle mutation states.
    pub mutations: Vec<(MutationTarget, MutationState)>,
    /// Placeholder text when there are no rows.
    pub empty_message: Option<String>,
    /// Footer text, e.g. `Page 1 of 3 | Total: 12 companies`.
    pub status_line: String,
    /// Pipeline runs so far.
    pub recompute_count: u64,
}

/// How a fetch answer was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Superseded by a newer request; dropped.
    Stale,
    /// Record set replaced.
    Loaded {
        /// Records received.
        records: usize,
    },
    /// Fetch or render failed; the view is faulted.
    Faulted(String),
}

/// Result of [`TableView::complete_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchApplied {
    /// What happened.
    pub outcome: FetchOutcome,
    /// The answer ended a fault.
    pub recovered: bool,
    /// A clamped server page that must be fetched next.
    pub follow_up: Option<FetchPlan>,
}

/// Result of [`TableView::complete_mutation`].
#[derive(Debug, Clone, PartialEq)]
pub struct MutationApplied {
    /// Terminal outcome for the caller.
    pub result: Result<MutationSuccess, MutationError>,
    /// Refetch issued after a success.
    pub refetch: Option<FetchPlan>,
}

/// Record set plus filter, search, sort, pagination, mutation and fault
/// state of one mounted list.
#[derive(Debug)]
pub struct TableView {
    schema: &'static EntitySchema,
    searchable: Vec<&'static str>,
    source: DataSource,
    records: Vec<Record>,
    loaded: bool,
    server_total_pages: usize,
    total_elements: Option<usize>,
    filters: FilterState,
    search: SearchState,
    sort: SortState,
    pagination: PaginationState,
    mutations: MutationOrchestrator,
    recovery: ErrorRecovery,
    rendered: Vec<TableRow>,
    total_pages: usize,
    visible_count: usize,
    recompute_count: u64,
}

fn render_row(schema: &EntitySchema, record: &Record) -> Result<TableRow, RenderError> {
    let cells = schema
        .columns
        .iter()
        .map(|column| match record.get(column.key) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            Some(Value::Array(_) | Value::Object(_)) => Err(RenderError::NestedValue {
                id: record.id.clone(),
                column: column.key.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TableRow {
        record: record.clone(),
        cells,
    })
}

impl TableView {
    /// Empty view over `kind`; nothing is fetched until [`Self::load`].
    pub fn new(kind: EntityKind, page_size: usize) -> Self {
        let schema = kind.schema();
        Self {
            schema,
            searchable: schema.searchable_fields(),
            source: DataSource::new(kind),
            records: Vec::new(),
            loaded: false,
            server_total_pages: 1,
            total_elements: None,
            filters: FilterState::new(),
            search: SearchState::default(),
            sort: SortState::new(),
            pagination: PaginationState::new(page_size),
            mutations: MutationOrchestrator::new(kind),
            recovery: ErrorRecovery::new(schema),
            rendered: Vec::new(),
            total_pages: 1,
            visible_count: 0,
            recompute_count: 0,
        }
    }

    /// Entity shown.
    pub fn kind(&self) -> EntityKind {
        self.schema.kind
    }

    /// Column and endpoint layout.
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Active column filters.
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Raw and committed search.
    pub fn search(&self) -> &SearchState {
        &self.search
    }

    /// Sort state.
    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    /// Page index and size.
    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    /// Fault tracking.
    pub fn recovery(&self) -> &ErrorRecovery {
        &self.recovery
    }

    /// Dialog and per-target mutation state.
    pub fn mutations(&self) -> &MutationOrchestrator {
        &self.mutations
    }

    /// Last record set received.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Page count from the last pipeline run.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Rows left after filtering.
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Pipeline runs so far.
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    /// A list request is in flight.
    pub fn is_loading(&self) -> bool {
        self.source.is_loading()
    }

    fn params(&self) -> ListParams {
        match self.schema.paging {
            PagingMode::Client => ListParams::default(),
            PagingMode::Server => ListParams {
                page_number: Some(self.schema.page_number_base + self.pagination.page_index),
                size: Some(self.pagination.page_size),
                search: Some(self.search.committed.clone()).filter(|s| !s.is_empty()),
                filters: self
                    .filters
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        }
    }

    /// Reads the current parameters through the cache. Returns a plan on a miss.
    pub fn load(&mut self) -> Option<FetchPlan> {
        match self.source.read(self.params()) {
            Read::Cached(page) => {
                self.apply_page(page);
                None
            }
            Read::Fetch(plan) => Some(plan),
        }
    }

    /// Invalidates the entity and fetches the current parameters again.
    pub fn refresh(&mut self) -> FetchPlan {
        self.source.invalidate(self.schema.kind);
        self.source.fetch(self.params())
    }

    /// Re-invokes the data source from scratch after a fault.
    pub fn retry(&mut self) -> Result<FetchPlan, ViewError> {
        let Some(fallback) = self.recovery.fallback() else {
            return Err(ViewError::NotFaulted);
        };
        if fallback.session_expired {
            return Err(FetchError::AuthRejected.into());
        }
        self.recovery.begin_retry();
        Ok(self.refresh())
    }

    /// Applies the gateway's answer to list request `seq`.
    pub fn complete_fetch(
        &mut self,
        seq: RequestSeq,
        result: Result<GatewayResponse, GatewayError>,
    ) -> FetchApplied {
        match self.source.complete(seq, result) {
            Ok(None) => FetchApplied {
                outcome: FetchOutcome::Stale,
                recovered: false,
                follow_up: None,
            },
            Ok(Some(page)) => {
                let records = page.records.len();
                let was_faulted = self.recovery.is_faulted();
                let follow_up = self.apply_page(page);
                match self.recovery.fallback() {
                    Some(fallback) => FetchApplied {
                        outcome: FetchOutcome::Faulted(fallback.detail.clone()),
                        recovered: false,
                        follow_up,
                    },
                    None => FetchApplied {
                        outcome: FetchOutcome::Loaded { records },
                        recovered: was_faulted,
                        follow_up,
                    },
                }
            }
            Err(err) => {
                self.recovery.fetch_failed(&err);
                FetchApplied {
                    outcome: FetchOutcome::Faulted(err.to_string()),
                    recovered: false,
                    follow_up: None,
                }
            }
        }
    }

    fn apply_page(&mut self, page: ListPage) -> Option<FetchPlan> {
        self.server_total_pages = page.server_total_pages(self.pagination.page_size);
        self.total_elements = page.total_elements;
        self.records = page.records;
        self.loaded = true;

        let (clamped, rendered) = self.run_pipeline();
        if !rendered {
            return None;
        }
        self.recovery.recovered();
        if clamped && self.schema.paging == PagingMode::Server {
            return self.load();
        }
        None
    }

    /// Runs the pipeline over the current record set and state.
    ///
    /// Clamps the stored page index and returns true when it moved. A fault
    /// raised here stays until a fetch renders cleanly.
    pub fn recompute(&mut self) -> bool {
        self.run_pipeline().0
    }

    fn run_pipeline(&mut self) -> (bool, bool) {
        let unfiltered = FilterState::new();
        // Server-paged lists arrive already searched and filtered.
        let (filters, search) = match self.schema.paging {
            PagingMode::Client => (&self.filters, self.search.committed.as_str()),
            PagingMode::Server => (&unfiltered, ""),
        };
        let (page_index, total_pages, visible_count, rendered) = {
            let input = PipelineInput {
                filters,
                search,
                searchable: &self.searchable,
                sort: &self.sort,
                page_index: self.pagination.page_index,
                page_size: self.pagination.page_size,
                paging: self.schema.paging,
                server_total_pages: self.server_total_pages,
            };
            let output = pipeline::run(&self.records, &input);
            let rendered: Result<Vec<TableRow>, RenderError> = output
                .page
                .rows
                .iter()
                .map(|record| render_row(self.schema, record))
                .collect();
            (
                output.page.page_index,
                output.page.total_pages,
                output.visible_count,
                rendered,
            )
        };

        self.recompute_count += 1;
        let clamped = page_index != self.pagination.page_index;
        self.pagination.page_index = page_index;
        self.total_pages = total_pages;
        self.visible_count = visible_count;

        let ok = match rendered {
            Ok(rows) => {
                self.rendered = rows;
                true
            }
            Err(err) => {
                self.rendered.clear();
                self.recovery.render_failed(&err);
                false
            }
        };

        debug!(
            kind = ?self.schema.kind,
            visible = visible_count,
            page_index,
            total_pages,
            clamped,
            "pipeline recomputed"
        );
        (clamped, ok)
    }

    fn query_changed(&mut self) -> Option<FetchPlan> {
        match self.schema.paging {
            PagingMode::Client => {
                self.recompute();
                None
            }
            PagingMode::Server => {
                self.recompute();
                self.load()
            }
        }
    }

    /// Updates the raw search input. Filtering waits for [`Self::commit_search`].
    pub fn set_search(&mut self, raw: impl Into<String>) {
        self.search.raw = raw.into();
    }

    /// Commits the debounced search value and reruns the pipeline once.
    pub fn commit_search(&mut self, value: impl Into<String>) -> Option<FetchPlan> {
        let value = value.into();
        if value == self.search.committed {
            return None;
        }
        self.search.committed = value;
        self.query_changed()
    }

    fn filterable(&self, column: &str) -> Result<(), ViewError> {
        match self.schema.column(column) {
            None => Err(ViewError::UnknownColumn(column.to_string())),
            Some(c) if !c.filterable => Err(ViewError::NotFilterable(column.to_string())),
            Some(_) => Ok(()),
        }
    }

    /// Sets a column filter; an empty value removes it.
    pub fn set_filter(&mut self, column: &str, value: impl Into<String>) -> Result<Option<FetchPlan>, ViewError> {
        self.filterable(column)?;
        self.filters.set(column, value);
        Ok(self.query_changed())
    }

    /// Selects `value`, or clears it when it is already selected.
    pub fn toggle_filter(&mut self, column: &str, value: impl Into<String>) -> Result<Option<FetchPlan>, ViewError> {
        self.filterable(column)?;
        self.filters.toggle(column, value);
        Ok(self.query_changed())
    }

    /// Drops one column filter.
    pub fn clear_filter(&mut self, column: &str) -> Option<FetchPlan> {
        self.filters.remove(column)?;
        self.query_changed()
    }

    /// Drops every column filter.
    pub fn clear_filters(&mut self) -> Option<FetchPlan> {
        if self.filters.is_empty() {
            return None;
        }
        self.filters.clear();
        self.query_changed()
    }

    /// Advances the tri-state sort of `column`.
    pub fn toggle_sort(&mut self, column: &str) -> Result<(), ViewError> {
        match self.schema.column(column) {
            None => return Err(ViewError::UnknownColumn(column.to_string())),
            Some(c) if !c.sortable => return Err(ViewError::NotSortable(column.to_string())),
            Some(_) => {}
        }
        self.sort.toggle(column);
        self.recompute();
        Ok(())
    }

    /// Moves to `page_index`, clamped to the known page count.
    pub fn set_page(&mut self, page_index: usize) -> Option<FetchPlan> {
        let index = page_index.min(self.total_pages.max(1) - 1);
        if index == self.pagination.page_index {
            return None;
        }
        self.pagination.page_index = index;
        self.query_changed()
    }

    /// Next page, if any.
    pub fn next_page(&mut self) -> Option<FetchPlan> {
        if !self.pagination.can_next(self.total_pages) {
            return None;
        }
        self.set_page(self.pagination.page_index + 1)
    }

    /// Previous page, if any.
    pub fn previous_page(&mut self) -> Option<FetchPlan> {
        if !self.pagination.can_previous() {
            return None;
        }
        self.set_page(self.pagination.page_index - 1)
    }

    /// Changes the page size; the index is kept unless it becomes invalid.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<Option<FetchPlan>, ViewError> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize);
        }
        match self.schema.paging {
            PagingMode::Client => {
                self.pagination.set_page_size(page_size, self.visible_count);
                self.recompute();
                Ok(None)
            }
            PagingMode::Server => {
                match self.total_elements {
                    Some(known) => {
                        self.pagination.set_page_size(page_size, known);
                        self.server_total_pages = total_pages(known, page_size);
                    }
                    None => self.pagination.page_size = page_size,
                }
                Ok(self.load())
            }
        }
    }

    /// Opens the create dialog.
    pub fn open_create(&mut self) -> Result<(), ViewError> {
        Ok(self.mutations.open_create()?)
    }

    /// Opens the edit dialog for `id`.
    pub fn open_edit(&mut self, id: RecordId) -> Result<(), ViewError> {
        Ok(self.mutations.open_edit(id)?)
    }

    /// First delete phase; opens the confirmation only.
    pub fn request_delete(&mut self, id: RecordId) -> Result<(), ViewError> {
        Ok(self.mutations.request_delete(id)?)
    }

    /// Closes the open dialog, returning it.
    pub fn close_dialog(&mut self) -> Option<Dialog> {
        self.mutations.close_dialog()
    }

    /// Clears a failed mutation's message.
    pub fn dismiss_error(&mut self, target: &MutationTarget) {
        self.mutations.dismiss(target);
    }

    /// Marks the create pending and returns its request.
    pub fn plan_create(&mut self, input: RecordInput) -> Result<MutationPlan, MutationError> {
        self.mutations.plan_create(input)
    }

    /// Marks the update of `id` pending and returns its request.
    pub fn plan_update(&mut self, id: RecordId, input: RecordInput) -> Result<MutationPlan, MutationError> {
        self.mutations.plan_update(id, input)
    }

    /// Second delete phase; blocked without an open confirmation.
    pub fn plan_delete(&mut self, id: RecordId) -> Result<MutationPlan, MutationError> {
        self.mutations.plan_delete(id)
    }

    /// Applies a mutation answer. Success invalidates and refetches; failure
    /// leaves the record set and cache alone.
    pub fn complete_mutation(
        &mut self,
        op: MutationKind,
        target: MutationTarget,
        result: Result<GatewayResponse, GatewayError>,
    ) -> MutationApplied {
        let result = self.mutations.resolve(op, target, result);
        let refetch = match &result {
            Ok(_) => Some(self.refresh()),
            Err(_) => None,
        };
        MutationApplied { result, refetch }
    }

    fn empty_message(&self) -> Option<String> {
        if !self.loaded || !self.rendered.is_empty() || self.recovery.is_faulted() {
            return None;
        }
        let search = self.search.committed();
        Some(if search.is_empty() {
            format!("No {} available.", self.schema.plural)
        } else {
            format!("No {} found matching \"{search}\"", self.schema.plural)
        })
    }

    fn total_count(&self) -> usize {
        match self.schema.paging {
            PagingMode::Client => self.visible_count,
            PagingMode::Server => self.total_elements.unwrap_or(self.visible_count),
        }
    }

    /// Current frame for rendering.
    pub fn snapshot(&self) -> TableSnapshot {
        let total_count = self.total_count();
        TableSnapshot {
            kind: self.schema.kind,
            headers: self.schema.columns.iter().map(|c| c.header).collect(),
            rows: if self.recovery.is_faulted() {
                Vec::new()
            } else {
                self.rendered.clone()
            },
            page_index: self.pagination.page_index,
            page_size: self.pagination.page_size,
            total_pages: self.total_pages,
            total_count,
            loading: self.source.is_loading(),
            searching: self.search.is_searching(),
            search: self.search.raw.clone(),
            committed_search: self.search.committed.clone(),
            filters: self
                .filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            sort: self.sort.active().cloned(),
            fault: self.recovery.fallback().cloned(),
            dialog: self.mutations.dialog().cloned(),
            mutations: self.mutations.states(),
            empty_message: self.empty_message(),
            status_line: format!(
                "Page {} of {} | Total: {}",
                self.pagination.page_index + 1,
                self.total_pages,
                self.schema.count_label(total_count)
            ),
            recompute_count: self.recompute_count,
        }
    }
}
