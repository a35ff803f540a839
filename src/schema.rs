//! Static per-entity column and endpoint descriptions.

use crate::types::{EntityKind, MutationKind, PagingMode};

/// One displayed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Field key in the record JSON.
    pub key: &'static str,
    /// Header label.
    pub header: &'static str,
    /// Exposes a per-column substring filter.
    pub filterable: bool,
    /// Exposes the tri-state sort toggle.
    pub sortable: bool,
    /// Participates in the global fuzzy search.
    pub searchable: bool,
    /// Accepted in create/update bodies.
    pub editable: bool,
}

const fn col(key: &'static str, header: &'static str) -> ColumnDef {
    ColumnDef {
        key,
        header,
        filterable: false,
        sortable: false,
        searchable: false,
        editable: false,
    }
}

impl ColumnDef {
    const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    const fn editable(mut self) -> Self {
        self.editable = true;
        self
    }
}

/// Endpoints and columns of one entity's list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity described.
    pub kind: EntityKind,
    /// Singular noun, lower case.
    pub singular: &'static str,
    /// Plural noun, lower case.
    pub plural: &'static str,
    /// List endpoint path.
    pub list_path: &'static str,
    /// Create endpoint path, when the entity can be created.
    pub create_path: Option<&'static str>,
    /// Update endpoint path, when the entity can be edited.
    pub update_path: Option<&'static str>,
    /// Delete endpoint path, when the entity can be deleted.
    pub delete_path: Option<&'static str>,
    /// Response field holding the record array.
    pub array_field: &'static str,
    /// Record field holding the id.
    pub id_field: &'static str,
    /// Local or server pagination.
    pub paging: PagingMode,
    /// Page number sent for page index 0.
    pub page_number_base: usize,
    /// Displayed columns in order.
    pub columns: &'static [ColumnDef],
}

const COMPANY_COLUMNS: &[ColumnDef] = &[
    col("companyId", "Company ID").filterable().searchable(),
    col("companyName", "Name").sortable().searchable().editable(),
    col("phoneContact", "Phone Contact").filterable().editable(),
];

const EMPLOYEE_COLUMNS: &[ColumnDef] = &[
    col("id", "Employee ID").filterable().searchable(),
    col("fullName", "Full Name").sortable().searchable().editable(),
    col("email", "Email").filterable().searchable().editable(),
    col("phoneNumber", "Phone").filterable().editable(),
];

const USER_COLUMNS: &[ColumnDef] = &[
    col("id", "User ID").filterable(),
    col("userName", "Username").sortable().searchable().editable(),
    col("email", "Email").filterable().searchable().editable(),
    col("companyName", "Company").filterable().sortable().editable(),
];

const LOG_COLUMNS: &[ColumnDef] = &[
    col("date", "Date").sortable(),
    col("logLevel", "Level").filterable(),
    col("message", "Message").searchable(),
    col("hour", "Hour").sortable(),
    col("type", "Type").filterable(),
];

const STORAGE_COLUMNS: &[ColumnDef] = &[
    col("id", "Storage ID").filterable(),
    col("storageName", "Name").sortable().searchable().editable(),
    col("location", "Location").filterable().searchable().editable(),
    col("capacity", "Capacity").sortable().editable(),
];

const COMPANIES: EntitySchema = EntitySchema {
    kind: EntityKind::Companies,
    singular: "company",
    plural: "companies",
    list_path: "/api/dashboard/superadmin/companies/list",
    create_path: Some("/api/dashboard/superadmin/companies/create"),
    update_path: Some("/api/dashboard/superadmin/companies/update"),
    delete_path: Some("/api/dashboard/superadmin/companies/delete"),
    array_field: "companyList",
    id_field: "companyId",
    paging: PagingMode::Client,
    page_number_base: 0,
    columns: COMPANY_COLUMNS,
};

const EMPLOYEES: EntitySchema = EntitySchema {
    kind: EntityKind::Employees,
    singular: "employee",
    plural: "employees",
    list_path: "/api/dashboard/admin/employees/list",
    create_path: Some("/api/dashboard/admin/employees/create"),
    update_path: Some("/api/dashboard/admin/employees/update"),
    delete_path: Some("/api/dashboard/admin/employees/delete"),
    array_field: "employees",
    id_field: "id",
    paging: PagingMode::Server,
    page_number_base: 0,
    columns: EMPLOYEE_COLUMNS,
};

const USERS: EntitySchema = EntitySchema {
    kind: EntityKind::Users,
    singular: "user",
    plural: "users",
    list_path: "/api/dashboard/superadmin/users/list",
    create_path: Some("/api/dashboard/superadmin/users/create"),
    update_path: Some("/api/dashboard/superadmin/users/update"),
    delete_path: Some("/api/dashboard/superadmin/users/delete"),
    array_field: "users",
    id_field: "id",
    paging: PagingMode::Server,
    page_number_base: 1,
    columns: USER_COLUMNS,
};

const LOGS: EntitySchema = EntitySchema {
    kind: EntityKind::Logs,
    singular: "log",
    plural: "logs",
    list_path: "/api/dashboard/superadmin/logs",
    create_path: None,
    update_path: None,
    delete_path: None,
    array_field: "logs",
    id_field: "id",
    paging: PagingMode::Client,
    page_number_base: 0,
    columns: LOG_COLUMNS,
};

const STORAGES: EntitySchema = EntitySchema {
    kind: EntityKind::Storages,
    singular: "storage",
    plural: "storages",
    list_path: "/api/dashboard/admin/storages/listofuser",
    create_path: Some("/api/dashboard/admin/storages/create"),
    update_path: None,
    delete_path: None,
    array_field: "storages",
    id_field: "id",
    paging: PagingMode::Server,
    page_number_base: 1,
    columns: STORAGE_COLUMNS,
};

impl EntityKind {
    /// Every entity with a list view.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Companies,
        EntityKind::Employees,
        EntityKind::Users,
        EntityKind::Logs,
        EntityKind::Storages,
    ];

    /// Static schema of this entity.
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Self::Companies => &COMPANIES,
            Self::Employees => &EMPLOYEES,
            Self::Users => &USERS,
            Self::Logs => &LOGS,
            Self::Storages => &STORAGES,
        }
    }
}

impl EntitySchema {
    /// Looks up a column by key.
    pub fn column(&self, key: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Keys of the globally searchable columns.
    pub fn searchable_fields(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.searchable)
            .map(|c| c.key)
            .collect()
    }

    /// Endpoint for a mutation kind, if the entity supports it.
    pub fn mutation_path(&self, kind: MutationKind) -> Option<&'static str> {
        match kind {
            MutationKind::Create => self.create_path,
            MutationKind::Update => self.update_path,
            MutationKind::Delete => self.delete_path,
        }
    }

    /// Capitalized singular noun for notifications.
    pub fn title(&self) -> String {
        let mut chars = self.singular.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// `"1 company"` / `"3 companies"`.
    pub fn count_label(&self, n: usize) -> String {
        if n == 1 {
            format!("{n} {}", self.singular)
        } else {
            format!("{n} {}", self.plural)
        }
    }

    /// Resolves the schema owning a list or mutation path.
    pub fn by_path(path: &str) -> Option<(&'static EntitySchema, Option<MutationKind>)> {
        EntityKind::ALL.iter().map(|k| k.schema()).find_map(|s| {
            if s.list_path == path {
                Some((s, None))
            } else if s.create_path == Some(path) {
                Some((s, Some(MutationKind::Create)))
            } else if s.update_path == Some(path) {
                Some((s, Some(MutationKind::Update)))
            } else if s.delete_path == Some(path) {
                Some((s, Some(MutationKind::Delete)))
            } else {
                None
            }
        })
    }
}
