use serde::{Deserialize, Serialize};

use crate::{
    record::{Record, compare_values},
    types::SortDirection,
};

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortDirective {
    /// Column key.
    pub column: String,
    /// Direction.
    pub direction: SortDirection,
}

/// At most one active sort; `None` keeps server order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    active: Option<SortDirective>,
}

impl SortState {
    /// Unsorted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted on `column`.
    pub fn by(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            active: Some(SortDirective {
                column: column.into(),
                direction,
            }),
        }
    }

    /// Active directive, if any.
    pub fn active(&self) -> Option<&SortDirective> {
        self.active.as_ref()
    }

    /// Direction of `column`, `None` when it is not the active column.
    pub fn direction_of(&self, column: &str) -> Option<SortDirection> {
        self.active
            .as_ref()
            .filter(|d| d.column == column)
            .map(|d| d.direction)
    }

    /// Advances `column` through unsorted → ascending → descending → unsorted.
    /// A different column starts over at ascending.
    pub fn toggle(&mut self, column: &str) {
        self.active = match self.direction_of(column) {
            None => Some(SortDirective {
                column: column.to_string(),
                direction: SortDirection::Ascending,
            }),
            Some(SortDirection::Ascending) => Some(SortDirective {
                column: column.to_string(),
                direction: SortDirection::Descending,
            }),
            Some(SortDirection::Descending) => None,
        };
    }

    /// Back to source order.
    pub fn clear(&mut self) {
        self.active = None;
    }
}

/// Stable sort of `rows` by the active directive; ties keep input order in
/// both directions.
pub fn sort<'a>(mut rows: Vec<&'a Record>, state: &SortState) -> Vec<&'a Record> {
    let Some(directive) = state.active() else {
        return rows;
    };
    let column = directive.column.as_str();
    match directive.direction {
        SortDirection::Ascending => rows.sort_by(|a, b| compare_values(a.get(column), b.get(column))),
        SortDirection::Descending => rows.sort_by(|a, b| compare_values(b.get(column), a.get(column))),
    }
    rows
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn records() -> Vec<Record> {
        [
            json!({"id": 1, "name": "b", "size": 10}),
            json!({"id": 2, "name": "a", "size": 9}),
            json!({"id": 3, "name": "b", "size": 100}),
        ]
        .into_iter()
        .filter_map(|v| Record::from_json(v, "id"))
        .collect()
    }

    fn ids<'a>(rows: &[&'a Record]) -> Vec<&'a str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn three_toggles_return_to_unsorted() {
        let mut state = SortState::new();
        state.toggle("name");
        assert_eq!(state.direction_of("name"), Some(SortDirection::Ascending));
        state.toggle("name");
        assert_eq!(state.direction_of("name"), Some(SortDirection::Descending));
        state.toggle("name");
        assert_eq!(state, SortState::new());
    }

    #[test]
    fn new_column_resets_previous() {
        let mut state = SortState::by("name", SortDirection::Descending);
        state.toggle("size");
        assert_eq!(state.direction_of("name"), None);
        assert_eq!(state.direction_of("size"), Some(SortDirection::Ascending));
    }

    #[test]
    fn ties_are_stable_both_ways() {
        let records = records();
        let rows: Vec<&Record> = records.iter().collect();
        let asc = sort(rows.clone(), &SortState::by("name", SortDirection::Ascending));
        assert_eq!(ids(&asc), vec!["2", "1", "3"]);
        let desc = sort(rows, &SortState::by("name", SortDirection::Descending));
        assert_eq!(ids(&desc), vec!["1", "3", "2"]);
    }

    #[test]
    fn text_sorts_case_insensitively_with_numeric_runs() {
        let records: Vec<Record> = ["acme", "Zenith", "Ace Corp", "Company 10", "Company 9"]
            .into_iter()
            .enumerate()
            .filter_map(|(i, name)| Record::from_json(json!({"id": i, "name": name}), "id"))
            .collect();
        let rows: Vec<&Record> = records.iter().collect();
        let names = |rows: &[&Record]| -> Vec<String> {
            rows.iter().map(|r| crate::record::field_text(r.get("name"))).collect()
        };

        let asc = sort(rows.clone(), &SortState::by("name", SortDirection::Ascending));
        assert_eq!(names(&asc), vec!["Ace Corp", "acme", "Company 9", "Company 10", "Zenith"]);
        let desc = sort(rows, &SortState::by("name", SortDirection::Descending));
        assert_eq!(names(&desc), vec!["Zenith", "Company 10", "Company 9", "acme", "Ace Corp"]);
    }

    #[test]
    fn numbers_sort_numerically() {
        let records = records();
        let rows: Vec<&Record> = records.iter().collect();
        let asc = sort(rows, &SortState::by("size", SortDirection::Ascending));
        assert_eq!(ids(&asc), vec!["2", "1", "3"]);
    }
}
