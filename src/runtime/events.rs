//! Runtime event stream payloads.

use crate::types::{MutationKind, MutationTarget, RequestSeq};

/// Events emitted from the view's command loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// A list request went out.
    FetchStarted {
        /// Request sequence number.
        seq: RequestSeq,
    },
    /// The latest list request succeeded.
    Loaded {
        /// Request sequence number.
        seq: RequestSeq,
        /// Records received.
        records: usize,
    },
    /// An answer arrived after a newer request was issued and was dropped.
    FetchDiscarded {
        /// Sequence number of the dropped answer.
        seq: RequestSeq,
    },
    /// The table shows its fallback.
    Faulted {
        /// Underlying error text.
        detail: String,
    },
    /// The gateway rejected the session.
    SessionExpired,
    /// A fetch after a fault rendered cleanly.
    Recovered,
    /// Debounced search value reached the filter.
    SearchCommitted {
        /// Committed value.
        value: String,
    },
    /// The pipeline ran.
    Recomputed {
        /// Runs so far.
        count: u64,
        /// Rows left after filtering.
        visible: usize,
    },
    /// A mutation request went out.
    MutationPending {
        /// Mutation kind.
        op: MutationKind,
        /// Target.
        target: MutationTarget,
    },
    /// A mutation succeeded.
    MutationSucceeded {
        /// Mutation kind.
        op: MutationKind,
        /// Target.
        target: MutationTarget,
        /// Notification text.
        message: String,
    },
    /// A mutation failed.
    MutationFailed {
        /// Mutation kind.
        op: MutationKind,
        /// Target.
        target: MutationTarget,
        /// Error shown on the dialog.
        message: String,
    },
}
