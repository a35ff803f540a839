//! Client-side engine behind the dashboard's entity tables.
//!
//! Each mounted list view owns a record set fetched through a [`gateway::Gateway`],
//! runs it through filter → sort → paginate on every state change, and routes
//! create/update/delete through per-target exclusive mutations followed by an
//! explicit refetch.
//!
//! # Examples
//!
//! Synchronous use with [`view::TableView`], answering its fetch plans by hand:
//! ```
//! use dashtable::{
//!     gateway::GatewayResponse,
//!     types::EntityKind,
//!     view::TableView,
//! };
//! use serde_json::json;
//!
//! let mut view = TableView::new(EntityKind::Companies, 5);
//! let plan = view.load().expect("first load goes to the gateway");
//! let body = json!({"companyList": [
//!     {"companyId": "1", "companyName": "Acme"},
//!     {"companyId": "2", "companyName": "Ace Corp"},
//!     {"companyId": "3", "companyName": "Zenith"},
//! ]});
//! view.complete_fetch(plan.seq, Ok(GatewayResponse::new(200, body)));
//!
//! view.commit_search("ace");
//! let snapshot = view.snapshot();
//! assert_eq!(snapshot.rows.len(), 2);
//! assert_eq!(snapshot.status_line, "Page 1 of 1 | Total: 2 companies");
//! ```
//!
//! Runtime usage with the in-memory gateway:
//! ```no_run
//! use std::sync::Arc;
//!
//! use dashtable::{
//!     gateway::{Credential, memory::MemoryGateway},
//!     runtime::{config::RuntimeConfig, handle::spawn_table_view},
//!     types::EntityKind,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let gateway = Arc::new(MemoryGateway::new().with_token("t0k3n"));
//! let handle = spawn_table_view(
//!     EntityKind::Companies,
//!     gateway,
//!     Some(Credential::new("t0k3n")),
//!     RuntimeConfig::default(),
//! );
//! handle.set_search("acme").await.expect("search");
//! let snapshot = handle.snapshot().await.expect("snapshot");
//! println!("{}", snapshot.status_line);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Pure filter, fuzzy ranking, sort and pagination engines.
pub mod core;
/// Typed errors for fetching, rendering, mutations and the runtime.
pub mod error;
/// Authenticated request boundary and an in-memory implementation.
pub mod gateway;
/// Create/update/delete orchestration.
pub mod mutation;
/// Schemaless records and mutation input.
pub mod record;
/// Fault state and retry for a table.
pub mod recovery;
/// Single-owner runtime handle, debounce and events.
pub mod runtime;
/// Static per-entity schemas.
pub mod schema;
/// Cached list fetching with stale-response protection.
pub mod source;
/// Shared primitive types and enums.
pub mod types;
/// The per-view state owner.
pub mod view;
