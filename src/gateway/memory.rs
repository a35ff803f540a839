//! In-process gateway backed by per-entity JSON tables.
//!
//! Answers like the dashboard's route handlers do: 401 without a known token,
//! `{error}` payloads on failure, pagination metadata on server-paged lists.
//! Scripted responses and per-request latency make it usable for failure and
//! ordering tests.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use hashbrown::{HashMap, HashSet};
use serde_json::{Map, Value, json};

use crate::{
    record::{Record, field_text},
    schema::EntitySchema,
    types::{EntityKind, MutationKind, PagingMode, RecordId},
};

use super::{Credential, Gateway, GatewayRequest, GatewayResponse, GatewayResult};

/// Computes an artificial delay per request.
pub type LatencyFn = Box<dyn Fn(&GatewayRequest) -> Duration + Send + Sync>;

#[derive(Default)]
struct Inner {
    tokens: HashSet<String>,
    tables: HashMap<EntityKind, Vec<Value>>,
    scripted: VecDeque<(String, GatewayResult<GatewayResponse>)>,
    blocked_deletes: HashMap<(EntityKind, RecordId), String>,
    log: Vec<GatewayRequest>,
    next_id: u64,
}

/// Gateway backed by in-process collections, with call accounting and injectable faults.
pub struct MemoryGateway {
    inner: Mutex<Inner>,
    latency: Option<LatencyFn>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryGateway {
    /// Empty gateway.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1000,
                ..Inner::default()
            }),
            latency: None,
        }
    }

    /// Accepts `token` as a valid session.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        lock(&self.inner).tokens.insert(token.into());
        self
    }

    /// Seeds the table of `kind`.
    pub fn with_records(self, kind: EntityKind, records: Vec<Value>) -> Self {
        self.set_records(kind, records);
        self
    }

    /// Delays every request by `latency(request)` before answering.
    pub fn with_latency(mut self, latency: impl Fn(&GatewayRequest) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Some(Box::new(latency));
        self
    }

    /// Replaces the collection behind `kind`.
    pub fn set_records(&self, kind: EntityKind, records: Vec<Value>) {
        lock(&self.inner).tables.insert(kind, records);
    }

    /// Copy of the collection behind `kind`.
    pub fn records(&self, kind: EntityKind) -> Vec<Value> {
        lock(&self.inner).tables.get(&kind).cloned().unwrap_or_default()
    }

    /// Makes calls with `token` answer 401.
    pub fn revoke(&self, token: &str) {
        lock(&self.inner).tokens.remove(token);
    }

    /// Answers the next request to `path` with `result` instead of the table.
    pub fn script(&self, path: impl Into<String>, result: GatewayResult<GatewayResponse>) {
        lock(&self.inner).scripted.push_back((path.into(), result));
    }

    /// Makes deleting `id` fail with `message` as the `error` field.
    pub fn block_delete(&self, kind: EntityKind, id: impl Into<RecordId>, message: impl Into<String>) {
        lock(&self.inner)
            .blocked_deletes
            .insert((kind, id.into()), message.into());
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<GatewayRequest> {
        lock(&self.inner).log.clone()
    }

    /// Calls made to `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        lock(&self.inner).log.iter().filter(|r| r.path == path).count()
    }

    /// Calls made in total.
    pub fn call_count(&self) -> usize {
        lock(&self.inner).log.len()
    }
}

impl Gateway for MemoryGateway {
    fn request(&self, request: &GatewayRequest, credential: Option<&Credential>) -> GatewayResult<GatewayResponse> {
        lock(&self.inner).log.push(request.clone());

        if let Some(latency) = &self.latency {
            std::thread::sleep(latency(request));
        }

        let mut inner = lock(&self.inner);

        let authorized = credential.is_some_and(|c| inner.tokens.contains(c.token()));
        if !authorized {
            return Ok(GatewayResponse::new(401, json!({ "error": "Unauthorized" })));
        }

        if let Some(pos) = inner.scripted.iter().position(|(path, _)| *path == request.path) {
            if let Some((_, scripted)) = inner.scripted.remove(pos) {
                return scripted;
            }
        }

        let Some((schema, op)) = EntitySchema::by_path(&request.path) else {
            return Ok(GatewayResponse::new(404, json!({ "error": "Not found" })));
        };

        Ok(match op {
            None => inner.list(schema, request),
            Some(MutationKind::Create) => inner.create(schema, request),
            Some(MutationKind::Update) => inner.update(schema, request),
            Some(MutationKind::Delete) => inner.delete(schema, request),
        })
    }
}

impl Inner {
    fn table(&mut self, kind: EntityKind) -> &mut Vec<Value> {
        self.tables.entry(kind).or_default()
    }

    fn position(&mut self, schema: &EntitySchema, id: &str) -> Option<usize> {
        self.table(schema.kind)
            .iter()
            .position(|v| Record::from_json(v.clone(), schema.id_field).is_some_and(|r| r.id == id))
    }

    fn list(&mut self, schema: &EntitySchema, request: &GatewayRequest) -> GatewayResponse {
        let rows = self.table(schema.kind).clone();

        if schema.paging == PagingMode::Client {
            let total = rows.len();
            return GatewayResponse::new(200, json!({ schema.array_field: rows, "totalElements": total }));
        }

        let search = request.query_value("search").map(str::to_lowercase);
        let rows: Vec<Value> = rows
            .into_iter()
            .filter(|row| {
                search.as_deref().is_none_or(|needle| {
                    row.as_object()
                        .is_some_and(|obj| obj.values().any(|v| field_text(Some(v)).to_lowercase().contains(needle)))
                })
            })
            .filter(|row| {
                request
                    .query
                    .iter()
                    .filter(|(key, _)| schema.column(key).is_some_and(|c| c.filterable))
                    .all(|(key, value)| {
                        field_text(row.get(key.as_str()))
                            .to_lowercase()
                            .contains(&value.to_lowercase())
                    })
            })
            .collect();

        let total = rows.len();
        let size = request
            .query_value("size")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(total.max(1));
        let page_number = request
            .query_value("pageNumber")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(schema.page_number_base);
        let index = page_number.saturating_sub(schema.page_number_base);
        let page: Vec<Value> = rows.into_iter().skip(index * size).take(size).collect();

        GatewayResponse::new(
            200,
            json!({
                schema.array_field: page,
                "totalElements": total,
                "totalPages": total.div_ceil(size),
                "pageNumber": page_number,
            }),
        )
    }

    fn create(&mut self, schema: &EntitySchema, request: &GatewayRequest) -> GatewayResponse {
        let Some(Value::Object(mut fields)) = request.body.clone() else {
            return GatewayResponse::new(400, json!({ "error": "Invalid request body" }));
        };

        let id = match fields.get(schema.id_field) {
            Some(v) => field_text(Some(v)),
            None => {
                self.next_id += 1;
                let id = self.next_id.to_string();
                fields.insert(schema.id_field.to_string(), Value::String(id.clone()));
                id
            }
        };

        if self.position(schema, &id).is_some() {
            return GatewayResponse::new(409, json!({ "error": format!("{} {id} already exists", schema.title()) }));
        }

        let value = Value::Object(fields);
        self.table(schema.kind).push(value.clone());
        GatewayResponse::new(200, value)
    }

    fn update(&mut self, schema: &EntitySchema, request: &GatewayRequest) -> GatewayResponse {
        let id = request.query_value("id").unwrap_or_default().to_string();
        let Some(Value::Object(patch)) = request.body.clone() else {
            return GatewayResponse::new(400, json!({ "error": "Invalid request body" }));
        };
        let Some(pos) = self.position(schema, &id) else {
            return GatewayResponse::new(404, json!({ "error": format!("{} not found", schema.title()) }));
        };

        let row = &mut self.table(schema.kind)[pos];
        if let Value::Object(fields) = row {
            merge(fields, patch, schema.id_field);
        }
        GatewayResponse::new(200, row.clone())
    }

    fn delete(&mut self, schema: &EntitySchema, request: &GatewayRequest) -> GatewayResponse {
        let id = request.query_value("id").unwrap_or_default().to_string();

        if let Some(message) = self.blocked_deletes.get(&(schema.kind, id.clone())) {
            return GatewayResponse::new(
                500,
                json!({
                    "message": format!("Error deleting {}", schema.singular),
                    "error": message,
                }),
            );
        }

        let Some(pos) = self.position(schema, &id) else {
            return GatewayResponse::new(404, json!({ "error": format!("{} not found", schema.title()) }));
        };
        self.table(schema.kind).remove(pos);
        GatewayResponse::new(
            200,
            json!({ "message": format!("{} deleted successfully", schema.title()) }),
        )
    }
}

fn merge(fields: &mut Map<String, Value>, patch: Map<String, Value>, id_field: &str) {
    for (key, value) in patch {
        if key != id_field {
            fields.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::Method;

    fn gateway() -> MemoryGateway {
        MemoryGateway::new().with_token("t").with_records(
            EntityKind::Employees,
            (0..7).map(|i| json!({ "id": i, "fullName": format!("Emp {i}") })).collect(),
        )
    }

    fn cred() -> Option<Credential> {
        Some(Credential::new("t"))
    }

    #[test]
    fn unknown_token_is_rejected() {
        let gw = gateway();
        let req = GatewayRequest::get(EntityKind::Employees.schema().list_path);
        let resp = gw.request(&req, Some(&Credential::new("nope"))).expect("request");
        assert_eq!(resp.status, 401);
        let resp = gw.request(&req, None).expect("request");
        assert!(resp.is_unauthorized());
    }

    #[test]
    fn server_list_pages_with_base() {
        let gw = gateway();
        let req = GatewayRequest::get(EntityKind::Employees.schema().list_path)
            .with_query("pageNumber", "1")
            .with_query("size", "5");
        let resp = gw.request(&req, cred().as_ref()).expect("request");
        assert_eq!(resp.body["employees"].as_array().map(Vec::len), Some(2));
        assert_eq!(resp.body["totalElements"], json!(7));
        assert_eq!(resp.body["totalPages"], json!(2));
    }

    #[test]
    fn scripted_response_wins_once() {
        let gw = gateway();
        let path = EntityKind::Employees.schema().list_path;
        gw.script(path, Err(GatewayError::Timeout(Duration::from_secs(30))));
        let req = GatewayRequest::get(path);
        assert!(gw.request(&req, cred().as_ref()).is_err());
        assert!(gw.request(&req, cred().as_ref()).is_ok());
        assert_eq!(gw.calls_to(path), 2);
    }

    #[test]
    fn blocked_delete_reports_error_field() {
        let gw = gateway();
        gw.block_delete(EntityKind::Employees, "3", "Cannot delete: has dependents");
        let req = GatewayRequest::get(EntityKind::Employees.schema().delete_path.unwrap_or_default())
            .with_method(Method::Delete)
            .with_query("id", "3");
        let resp = gw.request(&req, cred().as_ref()).expect("request");
        assert_eq!(resp.status, 500);
        assert_eq!(resp.error_message(), Some("Cannot delete: has dependents"));
        assert_eq!(gw.records(EntityKind::Employees).len(), 7);
    }
}
