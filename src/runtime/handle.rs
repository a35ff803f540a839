use std::sync::Arc;

use hashbrown::HashMap;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{Instant, sleep_until},
};
use tracing::{debug, info};

use crate::{
    error::{GatewayError, ViewError},
    gateway::{Credential, Gateway, GatewayRequest, GatewayResponse},
    mutation::{MutationPlan, MutationSuccess},
    record::RecordInput,
    source::FetchPlan,
    types::{Dialog, EntityKind, MutationKind, MutationTarget, RecordId, RequestSeq},
    view::{FetchOutcome, TableSnapshot, TableView},
};

use super::{config::RuntimeConfig, debounce::Debouncer, events::ViewEvent};

type Reply<T> = oneshot::Sender<T>;
type MutationReply = Reply<Result<MutationSuccess, ViewError>>;

/// Cloneable front end of one running table view.
#[derive(Clone)]
pub struct TableViewHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<ViewEvent>,
}

enum Mutation {
    Create(RecordInput),
    Update(RecordId, RecordInput),
    Delete(RecordId),
}

enum Command {
    Snapshot { resp: Reply<TableSnapshot> },
    SetSearch { value: String, resp: Reply<()> },
    SearchNow { resp: Reply<()> },
    SetFilter { column: String, value: String, resp: Reply<Result<(), ViewError>> },
    ToggleFilter { column: String, value: String, resp: Reply<Result<(), ViewError>> },
    ClearFilter { column: String, resp: Reply<()> },
    ClearFilters { resp: Reply<()> },
    ToggleSort { column: String, resp: Reply<Result<(), ViewError>> },
    SetPage { index: usize, resp: Reply<()> },
    NextPage { resp: Reply<()> },
    PreviousPage { resp: Reply<()> },
    SetPageSize { size: usize, resp: Reply<Result<(), ViewError>> },
    Refresh { resp: Reply<()> },
    Retry { resp: Reply<Result<(), ViewError>> },
    OpenCreate { resp: Reply<Result<(), ViewError>> },
    OpenEdit { id: RecordId, resp: Reply<Result<(), ViewError>> },
    RequestDelete { id: RecordId, resp: Reply<Result<(), ViewError>> },
    CloseDialog { resp: Reply<Option<Dialog>> },
    Mutate { mutation: Mutation, resp: MutationReply },
    Dismiss { target: MutationTarget, resp: Reply<()> },
    Shutdown { resp: Reply<()> },
}

enum Completion {
    Fetched {
        seq: RequestSeq,
        result: Result<GatewayResponse, GatewayError>,
    },
    Mutated {
        op: MutationKind,
        target: MutationTarget,
        result: Result<GatewayResponse, GatewayError>,
    },
}

struct ViewRuntime {
    view: TableView,
    gateway: Arc<dyn Gateway>,
    credential: Option<Credential>,
    done_tx: mpsc::UnboundedSender<Completion>,
    events_tx: broadcast::Sender<ViewEvent>,
    debouncer: Debouncer<String>,
    waiting: HashMap<MutationTarget, MutationReply>,
}

/// Starts the command loop for `kind` and issues the initial fetch.
///
/// The loop is the only owner of the view. Gateway calls run on the blocking
/// pool and report back over an internal channel, so a slow request never
/// stalls input handling. Answers arriving after shutdown are dropped.
pub fn spawn_table_view(
    kind: EntityKind,
    gateway: Arc<dyn Gateway>,
    credential: Option<Credential>,
    config: RuntimeConfig,
) -> TableViewHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<ViewEvent>(config.event_capacity.max(1));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

    let mut runtime = ViewRuntime {
        view: TableView::new(kind, config.page_size),
        gateway,
        credential,
        done_tx,
        events_tx: events_tx.clone(),
        debouncer: Debouncer::new(config.debounce()),
        waiting: HashMap::new(),
    };

    tokio::spawn(async move {
        info!(?kind, debounce_ms = config.debounce_ms, page_size = config.page_size, "table view mounted");
        runtime.observe(|rt| {
            let plan = rt.view.load();
            rt.fetch(plan);
        });

        loop {
            let deadline = runtime.debouncer.deadline();
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if runtime.observe(|rt| rt.handle_command(cmd)) {
                        break;
                    }
                }
                done = done_rx.recv() => {
                    if let Some(done) = done {
                        runtime.observe(|rt| rt.handle_completion(done));
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    runtime.observe(ViewRuntime::fire_debounce);
                }
            }
        }

        runtime.debouncer.cancel();
        info!(?kind, "table view unmounted");
    });

    TableViewHandle { cmd_tx, events_tx }
}

impl TableViewHandle {
    /// New receiver for view events.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events_tx.subscribe()
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ViewError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| ViewError::ChannelClosed)?;
        rx.await.map_err(|_| ViewError::ChannelClosed)
    }

    /// Current frame.
    pub async fn snapshot(&self) -> Result<TableSnapshot, ViewError> {
        self.call(|resp| Command::Snapshot { resp }).await
    }

    /// Records raw search input; the filter sees it after the debounce window.
    pub async fn set_search(&self, value: impl Into<String>) -> Result<(), ViewError> {
        let value = value.into();
        self.call(|resp| Command::SetSearch { value, resp }).await
    }

    /// Commits pending search input without waiting for the window.
    pub async fn search_now(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::SearchNow { resp }).await
    }

    /// Sets a column filter.
    pub async fn set_filter(&self, column: impl Into<String>, value: impl Into<String>) -> Result<(), ViewError> {
        let (column, value) = (column.into(), value.into());
        self.call(|resp| Command::SetFilter { column, value, resp }).await?
    }

    /// Selects or clears a filter value.
    pub async fn toggle_filter(&self, column: impl Into<String>, value: impl Into<String>) -> Result<(), ViewError> {
        let (column, value) = (column.into(), value.into());
        self.call(|resp| Command::ToggleFilter { column, value, resp }).await?
    }

    /// Drops one column filter.
    pub async fn clear_filter(&self, column: impl Into<String>) -> Result<(), ViewError> {
        let column = column.into();
        self.call(|resp| Command::ClearFilter { column, resp }).await
    }

    /// Drops every column filter.
    pub async fn clear_filters(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::ClearFilters { resp }).await
    }

    /// Advances the tri-state sort of `column`.
    pub async fn toggle_sort(&self, column: impl Into<String>) -> Result<(), ViewError> {
        let column = column.into();
        self.call(|resp| Command::ToggleSort { column, resp }).await?
    }

    /// Moves to page `index`.
    pub async fn set_page(&self, index: usize) -> Result<(), ViewError> {
        self.call(|resp| Command::SetPage { index, resp }).await
    }

    /// Next page, if any.
    pub async fn next_page(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::NextPage { resp }).await
    }

    /// Previous page, if any.
    pub async fn previous_page(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::PreviousPage { resp }).await
    }

    /// Changes rows per page.
    pub async fn set_page_size(&self, size: usize) -> Result<(), ViewError> {
        self.call(|resp| Command::SetPageSize { size, resp }).await?
    }

    /// Drops cached data for the entity and fetches again.
    pub async fn refresh(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::Refresh { resp }).await
    }

    /// Re-fetches from scratch after a fault. Session expiry is returned as
    /// an error without contacting the gateway.
    pub async fn retry(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::Retry { resp }).await?
    }

    /// Opens the create dialog.
    pub async fn open_create(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::OpenCreate { resp }).await?
    }

    /// Opens the edit dialog for `id`.
    pub async fn open_edit(&self, id: impl Into<RecordId>) -> Result<(), ViewError> {
        let id = id.into();
        self.call(|resp| Command::OpenEdit { id, resp }).await?
    }

    /// Opens the delete confirmation. Nothing is sent.
    pub async fn request_delete(&self, id: impl Into<RecordId>) -> Result<(), ViewError> {
        let id = id.into();
        self.call(|resp| Command::RequestDelete { id, resp }).await?
    }

    /// Closes the open dialog, returning it.
    pub async fn close_dialog(&self) -> Result<Option<Dialog>, ViewError> {
        self.call(|resp| Command::CloseDialog { resp }).await
    }

    /// Creates a record and waits for the terminal outcome.
    pub async fn create(&self, input: RecordInput) -> Result<MutationSuccess, ViewError> {
        let mutation = Mutation::Create(input);
        self.call(|resp| Command::Mutate { mutation, resp }).await?
    }

    /// Updates `id` and waits for the terminal outcome.
    pub async fn update(&self, id: impl Into<RecordId>, input: RecordInput) -> Result<MutationSuccess, ViewError> {
        let mutation = Mutation::Update(id.into(), input);
        self.call(|resp| Command::Mutate { mutation, resp }).await?
    }

    /// Deletes `id` once its confirmation is open and waits for the outcome.
    pub async fn confirm_delete(&self, id: impl Into<RecordId>) -> Result<MutationSuccess, ViewError> {
        let mutation = Mutation::Delete(id.into());
        self.call(|resp| Command::Mutate { mutation, resp }).await?
    }

    /// Clears the retained error of `target`.
    pub async fn dismiss(&self, target: MutationTarget) -> Result<(), ViewError> {
        self.call(|resp| Command::Dismiss { target, resp }).await
    }

    /// Stops the loop. Pending debounce is cancelled and late answers dropped.
    pub async fn shutdown(&self) -> Result<(), ViewError> {
        self.call(|resp| Command::Shutdown { resp }).await
    }
}

impl ViewRuntime {
    fn emit(&self, event: ViewEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Runs `f` and reports a pipeline run if one happened.
    fn observe<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.view.recompute_count();
        let out = f(self);
        let count = self.view.recompute_count();
        if count != before {
            self.emit(ViewEvent::Recomputed {
                count,
                visible: self.view.visible_count(),
            });
        }
        out
    }

    fn send_to_gateway(&self, request: GatewayRequest) -> impl Future<Output = Result<GatewayResponse, GatewayError>> + Send + 'static {
        let gateway = Arc::clone(&self.gateway);
        let credential = self.credential.clone();
        async move {
            tokio::task::spawn_blocking(move || gateway.request(&request, credential.as_ref()))
                .await
                .unwrap_or_else(|e| Err(GatewayError::Transport(format!("join error: {e}"))))
        }
    }

    fn fetch(&self, plan: Option<FetchPlan>) {
        let Some(FetchPlan { seq, request }) = plan else {
            return;
        };
        self.emit(ViewEvent::FetchStarted { seq });
        let call = self.send_to_gateway(request);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = call.await;
            let _ = done_tx.send(Completion::Fetched { seq, result });
        });
    }

    fn mutate(&mut self, plan: MutationPlan, resp: MutationReply) {
        let MutationPlan { op, target, request } = plan;
        self.waiting.insert(target.clone(), resp);
        self.emit(ViewEvent::MutationPending {
            op,
            target: target.clone(),
        });
        let call = self.send_to_gateway(request);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = call.await;
            let _ = done_tx.send(Completion::Mutated { op, target, result });
        });
    }

    fn commit_search(&mut self, value: String) {
        debug!(%value, "search committed");
        let changed = value != self.view.search().committed();
        let plan = self.view.commit_search(value.clone());
        if changed {
            self.emit(ViewEvent::SearchCommitted { value });
        }
        self.fetch(plan);
    }

    fn fire_debounce(&mut self) {
        if let Some(value) = self.debouncer.fire() {
            self.commit_search(value);
        }
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Snapshot { resp } => {
                let _ = resp.send(self.view.snapshot());
            }
            Command::SetSearch { value, resp } => {
                self.view.set_search(value.clone());
                self.debouncer.schedule(value);
                let _ = resp.send(());
            }
            Command::SearchNow { resp } => {
                if let Some(value) = self.debouncer.cancel() {
                    self.commit_search(value);
                }
                let _ = resp.send(());
            }
            Command::SetFilter { column, value, resp } => {
                let res = self.view.set_filter(&column, value).map(|plan| self.fetch(plan));
                let _ = resp.send(res);
            }
            Command::ToggleFilter { column, value, resp } => {
                let res = self.view.toggle_filter(&column, value).map(|plan| self.fetch(plan));
                let _ = resp.send(res);
            }
            Command::ClearFilter { column, resp } => {
                let plan = self.view.clear_filter(&column);
                self.fetch(plan);
                let _ = resp.send(());
            }
            Command::ClearFilters { resp } => {
                let plan = self.view.clear_filters();
                self.fetch(plan);
                let _ = resp.send(());
            }
            Command::ToggleSort { column, resp } => {
                let _ = resp.send(self.view.toggle_sort(&column));
            }
            Command::SetPage { index, resp } => {
                let plan = self.view.set_page(index);
                self.fetch(plan);
                let _ = resp.send(());
            }
            Command::NextPage { resp } => {
                let plan = self.view.next_page();
                self.fetch(plan);
                let _ = resp.send(());
            }
            Command::PreviousPage { resp } => {
                let plan = self.view.previous_page();
                self.fetch(plan);
                let _ = resp.send(());
            }
            Command::SetPageSize { size, resp } => {
                let res = self.view.set_page_size(size).map(|plan| self.fetch(plan));
                let _ = resp.send(res);
            }
            Command::Refresh { resp } => {
                let plan = self.view.refresh();
                self.fetch(Some(plan));
                let _ = resp.send(());
            }
            Command::Retry { resp } => {
                let res = self.view.retry().map(|plan| self.fetch(Some(plan)));
                let _ = resp.send(res);
            }
            Command::OpenCreate { resp } => {
                let _ = resp.send(self.view.open_create());
            }
            Command::OpenEdit { id, resp } => {
                let _ = resp.send(self.view.open_edit(id));
            }
            Command::RequestDelete { id, resp } => {
                let _ = resp.send(self.view.request_delete(id));
            }
            Command::CloseDialog { resp } => {
                let _ = resp.send(self.view.close_dialog());
            }
            Command::Mutate { mutation, resp } => {
                let planned = match mutation {
                    Mutation::Create(input) => self.view.plan_create(input),
                    Mutation::Update(id, input) => self.view.plan_update(id, input),
                    Mutation::Delete(id) => self.view.plan_delete(id),
                };
                match planned {
                    Ok(plan) => self.mutate(plan, resp),
                    Err(err) => {
                        debug!(error = %err, "mutation rejected before sending");
                        let _ = resp.send(Err(err.into()));
                    }
                }
            }
            Command::Dismiss { target, resp } => {
                self.view.dismiss_error(&target);
                let _ = resp.send(());
            }
            Command::Shutdown { resp } => {
                let _ = resp.send(());
                return true;
            }
        }
        false
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Fetched { seq, result } => {
                let applied = self.view.complete_fetch(seq, result);
                match applied.outcome {
                    FetchOutcome::Stale => self.emit(ViewEvent::FetchDiscarded { seq }),
                    FetchOutcome::Loaded { records } => self.emit(ViewEvent::Loaded { seq, records }),
                    FetchOutcome::Faulted(detail) => {
                        let expired = self
                            .view
                            .recovery()
                            .fallback()
                            .is_some_and(|f| f.session_expired);
                        if expired {
                            self.emit(ViewEvent::SessionExpired);
                        } else {
                            self.emit(ViewEvent::Faulted { detail });
                        }
                    }
                }
                if applied.recovered {
                    self.emit(ViewEvent::Recovered);
                }
                self.fetch(applied.follow_up);
            }
            Completion::Mutated { op, target, result } => {
                let applied = self.view.complete_mutation(op, target.clone(), result);
                match &applied.result {
                    Ok(success) => self.emit(ViewEvent::MutationSucceeded {
                        op,
                        target: target.clone(),
                        message: success.message.clone(),
                    }),
                    Err(err) => self.emit(ViewEvent::MutationFailed {
                        op,
                        target: target.clone(),
                        message: err.to_string(),
                    }),
                }
                self.fetch(applied.refetch);
                if let Some(resp) = self.waiting.remove(&target) {
                    let _ = resp.send(applied.result.map_err(ViewError::from));
                }
            }
        }
    }
}
