use serde_json::Value;
use tracing::error;

use crate::{
    error::FetchError,
    gateway::GatewayResponse,
    record::Record,
    schema::EntitySchema,
};

/// Records of one successful list fetch plus the server's pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    /// Rows in response order.
    pub records: Vec<Record>,
    /// Row count reported by the server.
    pub total_elements: Option<usize>,
    /// Page count reported by the server.
    pub total_pages: Option<usize>,
}

impl ListPage {
    /// Page count for server paging: reported pages, else derived from the
    /// element count, else one.
    pub fn server_total_pages(&self, page_size: usize) -> usize {
        self.total_pages
            .or_else(|| self.total_elements.map(|n| n.div_ceil(page_size.max(1))))
            .unwrap_or(1)
            .max(1)
    }
}

fn meta(body: &Value, key: &str) -> Option<usize> {
    body.get(key)
        .or_else(|| body.get("page").and_then(|p| p.get(key)))
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

/// Classifies a list response. Anything short of a well-formed record array
/// is an error; partial data is never returned.
pub fn parse_list(schema: &EntitySchema, response: GatewayResponse) -> Result<ListPage, FetchError> {
    if response.is_unauthorized() {
        return Err(FetchError::AuthRejected);
    }

    if !response.is_success() {
        let message = response
            .error_message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Failed to fetch {}", schema.plural));
        return Err(FetchError::Network {
            status: Some(response.status),
            message,
        });
    }

    let GatewayResponse { status, mut body } = response;

    if body.is_null() {
        return Err(FetchError::Network {
            status: Some(status),
            message: "No data received".to_string(),
        });
    }
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Err(FetchError::Network {
            status: Some(status),
            message: message.to_string(),
        });
    }

    let total_elements = meta(&body, "totalElements");
    let total_pages = meta(&body, "totalPages");

    let Some(Value::Array(items)) = body.get_mut(schema.array_field).map(Value::take) else {
        let detail = format!("response has no '{}' array", schema.array_field);
        error!(kind = ?schema.kind, %detail, body = %body, "malformed list response");
        return Err(FetchError::Malformed { detail });
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Some(record) = Record::from_json(item, schema.id_field) else {
            let detail = format!("item {idx} of '{}' lacks a usable '{}'", schema.array_field, schema.id_field);
            error!(kind = ?schema.kind, %detail, "malformed list response");
            return Err(FetchError::Malformed { detail });
        };
        records.push(record);
    }

    Ok(ListPage {
        records,
        total_elements,
        total_pages,
    })
}
