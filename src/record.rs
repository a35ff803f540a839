//! Table record, mutation input, and field value helpers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::RecordId;

/// Field map of a record or mutation input.
pub type Fields = Map<String, Value>;

/// One row of a list view, replaced wholesale on every refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier taken from the entity's id field.
    pub id: RecordId,
    /// All named fields, including the id field.
    pub fields: Fields,
}

impl Record {
    /// Builds a record from a JSON object, reading the id from `id_field`.
    ///
    /// Returns `None` when the value is not an object or the id is missing or
    /// not a string/integer.
    pub fn from_json(value: Value, id_field: &str) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };
        let id = match fields.get(id_field)? {
            Value::String(s) => s.clone(),
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return None,
        };
        Some(Self { id, fields })
    }

    /// Returns the raw value of `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns the filter/search text of `column`.
    pub fn text(&self, column: &str) -> String {
        field_text(self.get(column))
    }
}

/// Editable fields submitted by a create or edit form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordInput {
    /// Field values keyed by column.
    pub fields: Fields,
}

impl RecordInput {
    /// Creates an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the input into a JSON object body.
    pub fn into_body(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Text form of a field value: strings verbatim, missing/null empty,
/// everything else as compact JSON.
pub fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Case-insensitive text ordering where digit runs compare as numbers, so
/// `"Company 9"` sorts before `"Company 10"`. Equal folds fall back to the
/// raw strings.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    let (fa, fb) = (a.to_lowercase(), b.to_lowercase());
    let (mut xs, mut ys) = (fa.chars().peekable(), fb.chars().peekable());
    loop {
        let ord = match (xs.peek().copied(), ys.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                compare_digit_runs(&take_digits(&mut xs), &take_digits(&mut ys))
            }
            (Some(x), Some(y)) => {
                xs.next();
                ys.next();
                x.cmp(&y)
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

// Arbitrary length: strip leading zeros, then longer means larger.
fn compare_digit_runs(x: &str, y: &str) -> Ordering {
    let (tx, ty) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
    tx.len()
        .cmp(&ty.len())
        .then_with(|| tx.cmp(ty))
        .then_with(|| x.len().cmp(&y.len()))
}

/// Natural ordering of two field values.
///
/// Numbers compare numerically and text with [`compare_text`]; values of
/// different types order null < bool < number < text < array < object.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => compare_text(x, y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => x.to_string().cmp(&y.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
