//! Fault boundary around the rendered table.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{FetchError, RenderError},
    schema::EntitySchema,
};

/// Label of the retry control.
pub const RETRY_LABEL: &str = "Try again";

/// What the table shows instead of rows while faulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// Human-readable headline.
    pub message: String,
    /// Underlying error text.
    pub detail: String,
    /// Retry control label.
    pub retry_label: String,
    /// Session expired; retrying will not help.
    pub session_expired: bool,
}

/// `Ok` or `Faulted`; nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecoveryState {
    /// Rendering normally.
    #[default]
    Ok,
    /// Showing a fallback.
    Faulted(Fallback),
}

/// Fault tracker for one view: failures flip it to a fallback, and only a
/// clean render flips it back.
#[derive(Debug)]
pub struct ErrorRecovery {
    schema: &'static EntitySchema,
    state: RecoveryState,
    retries: u32,
}

impl ErrorRecovery {
    /// Healthy tracker for `schema`.
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            state: RecoveryState::Ok,
            retries: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &RecoveryState {
        &self.state
    }

    /// Fallback while faulted.
    pub fn fallback(&self) -> Option<&Fallback> {
        match &self.state {
            RecoveryState::Ok => None,
            RecoveryState::Faulted(fallback) => Some(fallback),
        }
    }

    /// A fallback is shown.
    pub fn is_faulted(&self) -> bool {
        matches!(self.state, RecoveryState::Faulted(_))
    }

    /// Retries attempted since the last `Ok`.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Faults on a fetch error.
    pub fn fetch_failed(&mut self, err: &FetchError) {
        self.fault(err.to_string(), err.is_auth());
    }

    /// Faults on a render error.
    pub fn render_failed(&mut self, err: &RenderError) {
        self.fault(err.to_string(), false);
    }

    fn fault(&mut self, detail: String, session_expired: bool) {
        let message = if session_expired {
            "Your session has expired. Sign in again to continue.".to_string()
        } else {
            format!("There was an error loading the {} data.", self.schema.plural)
        };
        warn!(kind = ?self.schema.kind, %detail, retries = self.retries, "table faulted");
        self.state = RecoveryState::Faulted(Fallback {
            message,
            detail,
            retry_label: RETRY_LABEL.to_string(),
            session_expired,
        });
    }

    /// Counts a user-triggered retry. The fallback stays up until the retry
    /// resolves through [`Self::recovered`] or another fault.
    pub fn begin_retry(&mut self) {
        self.retries += 1;
    }

    /// A fetch and render succeeded. Returns true when this ended a fault.
    pub fn recovered(&mut self) -> bool {
        let was_faulted = self.is_faulted();
        if was_faulted {
            info!(kind = ?self.schema.kind, retries = self.retries, "table recovered");
        }
        self.state = RecoveryState::Ok;
        self.retries = 0;
        was_faulted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;

    #[test]
    fn faulted_to_faulted_to_ok() {
        let mut recovery = ErrorRecovery::new(EntityKind::Companies.schema());
        recovery.fetch_failed(&FetchError::Network {
            status: Some(500),
            message: "Failed to fetch companies".to_string(),
        });
        let fallback = recovery.fallback().expect("faulted");
        assert_eq!(fallback.message, "There was an error loading the companies data.");
        assert_eq!(fallback.retry_label, "Try again");

        recovery.begin_retry();
        recovery.fetch_failed(&FetchError::Malformed {
            detail: "no array".to_string(),
        });
        assert!(recovery.is_faulted());
        assert_eq!(recovery.retries(), 1);

        recovery.begin_retry();
        assert!(recovery.recovered());
        assert_eq!(recovery.state(), &RecoveryState::Ok);
        assert!(!recovery.recovered());
    }

    #[test]
    fn auth_fault_marks_session_expired() {
        let mut recovery = ErrorRecovery::new(EntityKind::Logs.schema());
        recovery.fetch_failed(&FetchError::AuthRejected);
        assert!(recovery.fallback().is_some_and(|f| f.session_expired));
    }
}
