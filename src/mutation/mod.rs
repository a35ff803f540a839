//! Create/update/delete orchestration with per-target exclusivity.
//!
//! The orchestrator never touches the record set. It plans requests, tracks
//! `Idle | Pending | Error` per target, and owns the dialog slot; the view
//! invalidates and refetches when a plan resolves successfully.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{GatewayError, MutationError},
    gateway::{GatewayRequest, GatewayResponse, Method},
    record::{Record, RecordInput},
    schema::EntitySchema,
    types::{Dialog, EntityKind, MutationKind, MutationTarget, RecordId},
};

/// Progress of the mutation aimed at one target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MutationState {
    /// Nothing in flight, no retained error.
    #[default]
    Idle,
    /// Request sent, answer not yet applied.
    Pending,
    /// Last attempt failed; message kept until retried or dismissed.
    Error(String),
}

/// A planned mutation request.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    /// Mutation kind.
    pub op: MutationKind,
    /// Target now marked pending.
    pub target: MutationTarget,
    /// Request to send through the gateway.
    pub request: GatewayRequest,
}

/// Terminal success of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationSuccess {
    /// Mutation kind.
    pub op: MutationKind,
    /// Target that was mutated.
    pub target: MutationTarget,
    /// Persisted record returned by create/update.
    pub record: Option<Record>,
    /// Notification text.
    pub message: String,
    /// True when the initiating dialog was closed.
    pub dialog_closed: bool,
}

/// Dialog slot plus per-target mutation states for one list view.
#[derive(Debug)]
pub struct MutationOrchestrator {
    schema: &'static EntitySchema,
    dialog: Option<Dialog>,
    states: HashMap<MutationTarget, MutationState>,
}

impl MutationOrchestrator {
    /// Creates an orchestrator for `kind` with no dialog open.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            schema: kind.schema(),
            dialog: None,
            states: HashMap::new(),
        }
    }

    /// Currently open dialog.
    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    /// Opens the create form.
    pub fn open_create(&mut self) -> Result<(), MutationError> {
        self.endpoint(MutationKind::Create)?;
        self.dialog = Some(Dialog::Create);
        Ok(())
    }

    /// Opens the edit form for `id`.
    pub fn open_edit(&mut self, id: RecordId) -> Result<(), MutationError> {
        self.endpoint(MutationKind::Update)?;
        self.dialog = Some(Dialog::Edit(id));
        Ok(())
    }

    /// First delete phase: records the intent and opens the confirmation.
    /// No request is made.
    pub fn request_delete(&mut self, id: RecordId) -> Result<(), MutationError> {
        self.endpoint(MutationKind::Delete)?;
        self.dialog = Some(Dialog::ConfirmDelete(id));
        Ok(())
    }

    /// Closes whatever dialog is open. A pending mutation keeps running.
    pub fn close_dialog(&mut self) -> Option<Dialog> {
        self.dialog.take()
    }

    /// State of `target`; `Idle` when never touched.
    pub fn state(&self, target: &MutationTarget) -> MutationState {
        self.states.get(target).cloned().unwrap_or_default()
    }

    /// True while a request for `target` is in flight.
    pub fn is_pending(&self, target: &MutationTarget) -> bool {
        matches!(self.states.get(target), Some(MutationState::Pending))
    }

    /// Non-idle states ordered by target.
    pub fn states(&self) -> Vec<(MutationTarget, MutationState)> {
        let mut out: Vec<_> = self
            .states
            .iter()
            .map(|(t, s)| (t.clone(), s.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Clears a retained error for `target`.
    pub fn dismiss(&mut self, target: &MutationTarget) {
        if matches!(self.states.get(target), Some(MutationState::Error(_))) {
            self.states.remove(target);
        }
    }

    /// Plans a create request.
    pub fn plan_create(&mut self, input: RecordInput) -> Result<MutationPlan, MutationError> {
        let path = self.endpoint(MutationKind::Create)?;
        self.check_input(&input, true)?;
        let request = GatewayRequest::get(path)
            .with_method(Method::Post)
            .with_body(input.into_body());
        self.begin(MutationKind::Create, MutationTarget::New, request)
    }

    /// Plans an update request for `id`.
    pub fn plan_update(&mut self, id: RecordId, input: RecordInput) -> Result<MutationPlan, MutationError> {
        let path = self.endpoint(MutationKind::Update)?;
        self.check_input(&input, false)?;
        let request = GatewayRequest::get(path)
            .with_method(Method::Put)
            .with_query("id", id.clone())
            .with_body(input.into_body());
        self.begin(MutationKind::Update, MutationTarget::Record(id), request)
    }

    /// Second delete phase. Blocked unless the confirmation for `id` is open.
    pub fn plan_delete(&mut self, id: RecordId) -> Result<MutationPlan, MutationError> {
        let path = self.endpoint(MutationKind::Delete)?;
        if self.dialog.as_ref() != Some(&Dialog::ConfirmDelete(id.clone())) {
            return Err(MutationError::ConfirmationRequired(id));
        }
        let request = GatewayRequest::get(path)
            .with_method(Method::Delete)
            .with_query("id", id.clone());
        self.begin(MutationKind::Delete, MutationTarget::Record(id), request)
    }

    fn endpoint(&self, op: MutationKind) -> Result<&'static str, MutationError> {
        self.schema.mutation_path(op).ok_or(MutationError::Unsupported {
            kind: self.schema.kind,
            op,
        })
    }

    fn check_input(&self, input: &RecordInput, allow_id: bool) -> Result<(), MutationError> {
        if input.is_empty() {
            return Err(MutationError::EmptyInput);
        }
        for key in input.fields.keys() {
            let editable = self.schema.column(key).is_some_and(|c| c.editable);
            if !editable && !(allow_id && key == self.schema.id_field) {
                return Err(MutationError::NotEditable(key.clone()));
            }
        }
        Ok(())
    }

    fn begin(
        &mut self,
        op: MutationKind,
        target: MutationTarget,
        request: GatewayRequest,
    ) -> Result<MutationPlan, MutationError> {
        if self.is_pending(&target) {
            return Err(MutationError::AlreadyPending(target));
        }
        self.states.insert(target.clone(), MutationState::Pending);
        Ok(MutationPlan { op, target, request })
    }

    /// Applies the gateway's answer to a planned mutation.
    ///
    /// Success clears the target's state and closes its dialog. Failure keeps
    /// the dialog open and retains the message on the target.
    pub fn resolve(
        &mut self,
        op: MutationKind,
        target: MutationTarget,
        result: Result<GatewayResponse, GatewayError>,
    ) -> Result<MutationSuccess, MutationError> {
        match self.classify(op, result) {
            Ok(record) => {
                self.states.remove(&target);
                let dialog_closed = self.dialog.as_ref().is_some_and(|d| d.target() == target);
                if dialog_closed {
                    self.dialog = None;
                }
                let message = format!("{} {} successfully", self.schema.title(), op.past_tense());
                info!(kind = ?self.schema.kind, ?op, %target, "mutation succeeded");
                Ok(MutationSuccess {
                    op,
                    target,
                    record,
                    message,
                    dialog_closed,
                })
            }
            Err(err) => {
                warn!(kind = ?self.schema.kind, ?op, %target, error = %err, "mutation failed");
                self.states.insert(target, MutationState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    fn classify(
        &self,
        op: MutationKind,
        result: Result<GatewayResponse, GatewayError>,
    ) -> Result<Option<Record>, MutationError> {
        let response = result.map_err(|e| MutationError::Network(e.to_string()))?;
        if response.is_unauthorized() {
            return Err(MutationError::AuthRejected);
        }
        if let Some(message) = response.error_message() {
            return Err(MutationError::Validation(message.to_string()));
        }
        if !response.is_success() {
            return Err(MutationError::Failed(format!(
                "Failed to {} {}",
                op.verb(),
                self.schema.singular
            )));
        }
        Ok(match op {
            MutationKind::Delete => None,
            MutationKind::Create | MutationKind::Update => Record::from_json(response.body, self.schema.id_field),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn orchestrator() -> MutationOrchestrator {
        MutationOrchestrator::new(EntityKind::Companies)
    }

    fn target(id: &str) -> MutationTarget {
        MutationTarget::Record(id.to_string())
    }

    #[test]
    fn delete_without_confirmation_is_blocked() {
        let mut m = orchestrator();
        assert_eq!(
            m.plan_delete("c1".to_string()),
            Err(MutationError::ConfirmationRequired("c1".to_string()))
        );
        m.request_delete("c2".to_string()).expect("request");
        assert!(matches!(
            m.plan_delete("c1".to_string()),
            Err(MutationError::ConfirmationRequired(_))
        ));
        assert_eq!(m.state(&target("c1")), MutationState::Idle);
    }

    #[test]
    fn second_submit_while_pending_is_rejected() {
        let mut m = orchestrator();
        m.request_delete("c1".to_string()).expect("request");
        let plan = m.plan_delete("c1".to_string()).expect("plan");
        assert_eq!(plan.request.query_value("id"), Some("c1"));
        assert_eq!(
            m.plan_delete("c1".to_string()),
            Err(MutationError::AlreadyPending(target("c1")))
        );
        assert!(m.plan_create(RecordInput::new().with("companyName", "Other")).is_ok());
    }

    #[test]
    fn failure_keeps_dialog_and_verbatim_message() {
        let mut m = orchestrator();
        m.request_delete("c1".to_string()).expect("request");
        let plan = m.plan_delete("c1".to_string()).expect("plan");
        let resp = GatewayResponse::new(
            500,
            json!({"message": "Error deleting company", "error": "Cannot delete: has dependents"}),
        );
        let err = m.resolve(plan.op, plan.target.clone(), Ok(resp)).expect_err("fails");
        assert_eq!(err.to_string(), "Cannot delete: has dependents");
        assert_eq!(m.dialog(), Some(&Dialog::ConfirmDelete("c1".to_string())));
        assert_eq!(
            m.state(&plan.target),
            MutationState::Error("Cannot delete: has dependents".to_string())
        );

        m.dismiss(&plan.target);
        assert_eq!(m.state(&plan.target), MutationState::Idle);
    }

    #[test]
    fn failure_without_message_is_generic() {
        let mut m = orchestrator();
        m.request_delete("c1".to_string()).expect("request");
        let plan = m.plan_delete("c1".to_string()).expect("plan");
        let err = m
            .resolve(plan.op, plan.target, Ok(GatewayResponse::new(502, json!(null))))
            .expect_err("fails");
        assert_eq!(err, MutationError::Failed("Failed to delete company".to_string()));
    }

    #[test]
    fn success_closes_matching_dialog() {
        let mut m = orchestrator();
        m.open_create().expect("open");
        let plan = m
            .plan_create(RecordInput::new().with("companyName", "Acme"))
            .expect("plan");
        let ok = m
            .resolve(
                plan.op,
                plan.target,
                Ok(GatewayResponse::new(200, json!({"companyId": "c9", "companyName": "Acme"}))),
            )
            .expect("success");
        assert!(ok.dialog_closed);
        assert_eq!(ok.message, "Company created successfully");
        assert_eq!(ok.record.map(|r| r.id), Some("c9".to_string()));
        assert_eq!(m.dialog(), None);
        assert_eq!(m.state(&MutationTarget::New), MutationState::Idle);
    }

    #[test]
    fn input_is_checked_before_any_request() {
        let mut m = orchestrator();
        assert_eq!(m.plan_create(RecordInput::new()), Err(MutationError::EmptyInput));
        assert_eq!(
            m.plan_update("c1".to_string(), RecordInput::new().with("companyId", "c2")),
            Err(MutationError::NotEditable("companyId".to_string()))
        );
        let mut logs = MutationOrchestrator::new(EntityKind::Logs);
        assert!(matches!(logs.request_delete("1".to_string()), Err(MutationError::Unsupported { .. })));
    }
}
