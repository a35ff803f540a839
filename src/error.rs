//! Error types surfaced by the data source, mutations, rendering and runtime.

use std::time::Duration;

use thiserror::Error;

use crate::types::{EntityKind, MutationKind, MutationTarget, RecordId};

/// Failures reported by a [`crate::gateway::Gateway`] before any HTTP status exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Connection or protocol level failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The gateway's own network timeout elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Typed list fetch failure. Never accompanied by partial data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The gateway rejected the session credential.
    #[error("session expired, sign in again")]
    AuthRejected,
    /// Transport failure, timeout, or non-success status.
    #[error("{message}")]
    Network {
        /// HTTP status when one was received.
        status: Option<u16>,
        /// Server-provided or generic message.
        message: String,
    },
    /// The body parsed but lacks required fields.
    #[error("malformed response: {detail}")]
    Malformed {
        /// What was missing or wrong.
        detail: String,
    },
}

impl FetchError {
    /// True for session expiry, which is never retried.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthRejected)
    }
}

impl From<GatewayError> for FetchError {
    fn from(value: GatewayError) -> Self {
        Self::Network {
            status: None,
            message: value.to_string(),
        }
    }
}

/// Failure while turning page records into displayed cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A displayed column holds an array or object.
    #[error("record {id} has a nested value in column '{column}'")]
    NestedValue {
        /// Offending record.
        id: RecordId,
        /// Offending column.
        column: String,
    },
}

/// Mutation failure, surfaced on the initiating dialog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The gateway rejected the session credential.
    #[error("session expired, sign in again")]
    AuthRejected,
    /// The backend rejected the mutation with its own message.
    #[error("{0}")]
    Validation(String),
    /// The backend failed without a message; carries the generic text.
    #[error("{0}")]
    Failed(String),
    /// Transport failure or timeout.
    #[error("{0}")]
    Network(String),
    /// Delete attempted without an open confirmation for the record.
    #[error("deleting {0} requires confirmation")]
    ConfirmationRequired(RecordId),
    /// A mutation for the same target is still in flight.
    #[error("a change to {0} is already in progress")]
    AlreadyPending(MutationTarget),
    /// The entity has no endpoint for this mutation.
    #[error("{kind:?} does not support {op:?}")]
    Unsupported {
        /// Entity of the view.
        kind: EntityKind,
        /// Requested mutation.
        op: MutationKind,
    },
    /// The input names a field that is not editable.
    #[error("field '{0}' is not editable")]
    NotEditable(String),
    /// Create/update submitted with no fields.
    #[error("nothing to save")]
    EmptyInput,
}

impl MutationError {
    /// Failures decided locally, before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::ConfirmationRequired(_)
                | Self::AlreadyPending(_)
                | Self::Unsupported { .. }
                | Self::NotEditable(_)
                | Self::EmptyInput
        )
    }
}

/// Errors returned by [`crate::view::TableView`] and the runtime handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// Fetch failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Mutation failure.
    #[error(transparent)]
    Mutation(#[from] MutationError),
    /// Column key not in the entity schema.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    /// Column exists but has no sort toggle.
    #[error("column '{0}' is not sortable")]
    NotSortable(String),
    /// Column exists but has no filter.
    #[error("column '{0}' is not filterable")]
    NotFilterable(String),
    /// Page size must be at least one.
    #[error("page size must be at least 1")]
    InvalidPageSize,
    /// Retry requested while the view is not faulted.
    #[error("nothing to retry")]
    NotFaulted,
    /// The view runtime stopped.
    #[error("table view runtime is closed")]
    ChannelClosed,
}
