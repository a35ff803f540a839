//! Shared primitive IDs and table-view enums.

use serde::{Deserialize, Serialize};

/// Stable record identifier, held as text whatever its JSON type.
pub type RecordId = String;
/// Monotonic fetch request sequence number.
pub type RequestSeq = u64;

/// Collection shown by a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Tenant companies (super-admin).
    Companies,
    /// Employees of the signed-in company (admin).
    Employees,
    /// Dashboard users (super-admin).
    Users,
    /// Audit log lines (super-admin, read-only).
    Logs,
    /// Storage records of the signed-in user.
    Storages,
}

/// Sort direction of the active sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// How a list endpoint pages its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PagingMode {
    /// Whole collection fetched once, paginated locally.
    Client,
    /// One page per request, totals reported by the server.
    Server,
}

/// Mutation kind issued against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Create a new record.
    Create,
    /// Update an existing record.
    Update,
    /// Delete an existing record.
    Delete,
}

impl MutationKind {
    /// Past-tense verb used in notifications.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }

    /// Infinitive verb used in failure messages.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Identity a mutation is serialized on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MutationTarget {
    /// A record that does not exist yet.
    New,
    /// An existing record.
    Record(RecordId),
}

impl std::fmt::Display for MutationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => f.write_str("new record"),
            Self::Record(id) => write!(f, "record {id}"),
        }
    }
}

/// Dialog currently open over the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialog {
    /// Create form.
    Create,
    /// Edit form for one record.
    Edit(RecordId),
    /// Delete confirmation for one record.
    ConfirmDelete(RecordId),
}

impl Dialog {
    /// Mutation target the dialog submits against.
    pub fn target(&self) -> MutationTarget {
        match self {
            Self::Create => MutationTarget::New,
            Self::Edit(id) | Self::ConfirmDelete(id) => MutationTarget::Record(id.clone()),
        }
    }
}
