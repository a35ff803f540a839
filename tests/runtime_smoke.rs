use std::{sync::Arc, time::Duration};

use dashtable::{
    error::{FetchError, MutationError, ViewError},
    gateway::{Credential, GatewayResponse, memory::MemoryGateway},
    mutation::MutationState,
    record::RecordInput,
    runtime::{
        config::RuntimeConfig,
        events::ViewEvent,
        handle::{TableViewHandle, spawn_table_view},
    },
    types::{Dialog, EntityKind, MutationTarget},
    view::TableSnapshot,
};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const TOKEN: &str = "s3ss10n";

fn companies() -> Vec<Value> {
    vec![
        json!({"companyId": "1", "companyName": "Acme", "phoneContact": "555-0100"}),
        json!({"companyId": "2", "companyName": "Ace Corp", "phoneContact": "555-0199"}),
        json!({"companyId": "3", "companyName": "Zenith", "phoneContact": "777-0000"}),
    ]
}

fn gateway() -> Arc<MemoryGateway> {
    Arc::new(
        MemoryGateway::new()
            .with_token(TOKEN)
            .with_records(EntityKind::Companies, companies()),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn spawn(kind: EntityKind, gw: &Arc<MemoryGateway>, config: RuntimeConfig) -> TableViewHandle {
    init_tracing();
    spawn_table_view(kind, gw.clone(), Some(Credential::new(TOKEN)), config)
}

fn ids(snapshot: &TableSnapshot) -> Vec<String> {
    snapshot.rows.iter().map(|r| r.record.id.clone()).collect()
}

async fn settle(handle: &TableViewHandle) -> TableSnapshot {
    for _ in 0..1000 {
        let snapshot = handle.snapshot().await.expect("snapshot");
        let pending = snapshot
            .mutations
            .iter()
            .any(|(_, state)| *state == MutationState::Pending);
        if !snapshot.loading && !snapshot.searching && !pending {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("view never settled");
}

fn drain(rx: &mut broadcast::Receiver<ViewEvent>) -> Vec<ViewEvent> {
    let mut out = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        out.push(evt);
    }
    out
}

async fn wait_for(rx: &mut broadcast::Receiver<ViewEvent>, want: &ViewEvent) -> Vec<ViewEvent> {
    let mut seen = Vec::new();
    loop {
        let evt = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event before timeout")
            .expect("recv");
        let done = evt == *want;
        seen.push(evt);
        if done {
            return seen;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn keystrokes_inside_window_commit_once_with_final_value() {
    let gw = gateway();
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    let loaded = settle(&handle).await;
    assert_eq!(ids(&loaded), vec!["1", "2", "3"]);

    let mut events = handle.subscribe();
    for value in ["a", "ac", "ace"] {
        handle.set_search(value).await.expect("search");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let typing = handle.snapshot().await.expect("snapshot");
    assert!(typing.searching);
    assert_eq!(typing.committed_search, "");
    assert_eq!(typing.rows.len(), 3);

    let settled = settle(&handle).await;
    assert_eq!(settled.committed_search, "ace");
    assert_eq!(ids(&settled), vec!["1", "2"]);

    let events = drain(&mut events);
    let commits: Vec<&ViewEvent> = events
        .iter()
        .filter(|e| matches!(e, ViewEvent::SearchCommitted { .. }))
        .collect();
    assert_eq!(
        commits,
        vec![&ViewEvent::SearchCommitted {
            value: "ace".to_string()
        }]
    );
    let recomputes = events
        .iter()
        .filter(|e| matches!(e, ViewEvent::Recomputed { .. }))
        .count();
    assert_eq!(recomputes, 1);
    assert_eq!(gw.call_count(), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn slow_initial_fetch_is_discarded_after_newer_search() {
    let gw = Arc::new(
        MemoryGateway::new()
            .with_token(TOKEN)
            .with_records(
                EntityKind::Employees,
                vec![
                    json!({"id": 1, "fullName": "Alex Fox", "email": "alex@acme.io"}),
                    json!({"id": 2, "fullName": "Bea Holm", "email": "bea@north.io"}),
                ],
            )
            .with_latency(|req| {
                if req.query_value("search").is_some() {
                    Duration::ZERO
                } else {
                    Duration::from_millis(300)
                }
            }),
    );
    let config = RuntimeConfig {
        debounce_ms: 20,
        ..RuntimeConfig::default()
    };
    let handle = spawn(EntityKind::Employees, &gw, config);
    let mut events = handle.subscribe();

    handle.set_search("bea").await.expect("search");
    let seen = wait_for(&mut events, &ViewEvent::FetchDiscarded { seq: 1 }).await;

    let loaded = seen
        .iter()
        .position(|e| *e == ViewEvent::Loaded { seq: 2, records: 1 })
        .expect("newer fetch applied");
    let discarded = seen.len() - 1;
    assert!(loaded < discarded);

    let snapshot = handle.snapshot().await.expect("snapshot");
    assert_eq!(ids(&snapshot), vec!["2"]);
    assert_eq!(snapshot.total_count, 1);
    assert!(!snapshot.loading);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn concurrent_confirms_send_exactly_one_delete() {
    let delete_path = EntityKind::Companies
        .schema()
        .delete_path
        .unwrap_or_default();
    let gw = Arc::new(
        MemoryGateway::new()
            .with_token(TOKEN)
            .with_records(EntityKind::Companies, companies())
            .with_latency(move |req| {
                if req.path == delete_path {
                    Duration::from_millis(50)
                } else {
                    Duration::ZERO
                }
            }),
    );
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    settle(&handle).await;

    handle.request_delete("2").await.expect("open confirm");
    let (a, b) = tokio::join!(handle.confirm_delete("2"), handle.confirm_delete("2"));
    let outcomes = [a, b];
    let ok: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].message, "Company deleted successfully");
    assert!(outcomes.iter().any(|r| {
        *r == Err(ViewError::Mutation(MutationError::AlreadyPending(
            MutationTarget::Record("2".to_string()),
        )))
    }));

    let after = settle(&handle).await;
    assert_eq!(gw.calls_to(delete_path), 1);
    assert_eq!(ids(&after), vec!["1", "3"]);
    assert_eq!(after.dialog, None);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn failed_delete_keeps_dialog_rows_and_message() {
    let gw = gateway();
    gw.block_delete(EntityKind::Companies, "2", "Cannot delete: has dependents");
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    let before = settle(&handle).await;

    handle.request_delete("2").await.expect("open confirm");
    let err = handle.confirm_delete("2").await.expect_err("blocked");
    assert_eq!(err.to_string(), "Cannot delete: has dependents");

    let after = settle(&handle).await;
    assert_eq!(ids(&after), ids(&before));
    assert_eq!(after.dialog, Some(Dialog::ConfirmDelete("2".to_string())));
    assert_eq!(
        after.mutations,
        vec![(
            MutationTarget::Record("2".to_string()),
            MutationState::Error("Cannot delete: has dependents".to_string())
        )]
    );
    let list_path = EntityKind::Companies.schema().list_path;
    assert_eq!(gw.calls_to(list_path), 1);

    handle
        .dismiss(MutationTarget::Record("2".to_string()))
        .await
        .expect("dismiss");
    assert!(settle(&handle).await.mutations.is_empty());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn delete_without_confirmation_never_reaches_gateway() {
    let gw = gateway();
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    settle(&handle).await;

    let err = handle.confirm_delete("1").await.expect_err("needs confirm");
    assert_eq!(
        err,
        ViewError::Mutation(MutationError::ConfirmationRequired("1".to_string()))
    );
    assert_eq!(gw.call_count(), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn create_closes_dialog_and_refetches() {
    let gw = gateway();
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    settle(&handle).await;

    handle.open_create().await.expect("open");
    let ok = handle
        .create(
            RecordInput::new()
                .with("companyName", "Nova")
                .with("phoneContact", "555-0300"),
        )
        .await
        .expect("create");
    assert!(ok.dialog_closed);
    assert_eq!(ok.message, "Company created successfully");

    let after = settle(&handle).await;
    assert_eq!(after.dialog, None);
    assert_eq!(after.total_count, 4);
    assert_eq!(gw.calls_to(EntityKind::Companies.schema().list_path), 2);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn malformed_response_faults_then_retry_recovers() {
    let gw = gateway();
    let list_path = EntityKind::Companies.schema().list_path;
    gw.script(list_path, Ok(GatewayResponse::new(200, json!({"items": []}))));
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    let mut events = handle.subscribe();

    let faulted = settle(&handle).await;
    let fallback = faulted.fault.expect("fallback shown");
    assert_eq!(fallback.message, "There was an error loading the companies data.");
    assert_eq!(fallback.retry_label, "Try again");
    assert!(!fallback.session_expired);
    assert!(faulted.rows.is_empty());

    handle.retry().await.expect("retry");
    wait_for(&mut events, &ViewEvent::Recovered).await;

    let recovered = settle(&handle).await;
    assert_eq!(recovered.fault, None);
    assert_eq!(ids(&recovered), vec!["1", "2", "3"]);
    assert_eq!(handle.retry().await, Err(ViewError::NotFaulted));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn rejected_session_is_not_retried() {
    init_tracing();
    let gw = gateway();
    let handle = spawn_table_view(
        EntityKind::Companies,
        gw.clone(),
        Some(Credential::new("expired")),
        RuntimeConfig::default(),
    );

    let snapshot = settle(&handle).await;
    assert!(snapshot.fault.as_ref().is_some_and(|f| f.session_expired));
    assert_eq!(
        handle.retry().await,
        Err(ViewError::Fetch(FetchError::AuthRejected))
    );
    assert_eq!(gw.call_count(), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn server_page_past_filtered_total_is_refetched() {
    let users: Vec<Value> = (1..=12)
        .map(|i| {
            let domain = if i % 4 == 0 { "acme.io" } else { "north.io" };
            json!({"id": i, "userName": format!("user{i:02}"), "email": format!("user{i}@{domain}")})
        })
        .collect();
    let gw = Arc::new(
        MemoryGateway::new()
            .with_token(TOKEN)
            .with_records(EntityKind::Users, users),
    );
    let handle = spawn(EntityKind::Users, &gw, RuntimeConfig::default());

    let first = settle(&handle).await;
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.rows.len(), 5);

    handle.set_page(2).await.expect("page");
    let last = settle(&handle).await;
    assert_eq!(last.page_index, 2);
    assert_eq!(last.rows.len(), 2);

    handle.set_filter("email", "acme").await.expect("filter");
    let filtered = settle(&handle).await;
    assert_eq!(filtered.page_index, 0);
    assert_eq!(filtered.total_pages, 1);
    assert_eq!(filtered.rows.len(), 3);
    assert_eq!(filtered.status_line, "Page 1 of 1 | Total: 3 users");

    let pages: Vec<Option<String>> = gw
        .requests()
        .iter()
        .map(|r| r.query_value("pageNumber").map(str::to_string))
        .collect();
    assert_eq!(
        pages,
        vec![
            Some("1".to_string()),
            Some("3".to_string()),
            Some("3".to_string()),
            Some("1".to_string())
        ]
    );

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn handle_reports_closed_after_shutdown() {
    let gw = gateway();
    let handle = spawn(EntityKind::Companies, &gw, RuntimeConfig::default());
    settle(&handle).await;
    handle.shutdown().await.expect("shutdown");
    tokio::task::yield_now().await;

    assert_eq!(handle.snapshot().await.err(), Some(ViewError::ChannelClosed));
}
