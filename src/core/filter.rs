use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

use super::fuzzy;

/// Per-column substring filters. Absent key means no filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    entries: BTreeMap<String, String>,
}

impl FilterState {
    /// No filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter for `column`; an empty value removes it.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        if value.is_empty() {
            self.entries.remove(&column);
        } else {
            self.entries.insert(column, value);
        }
    }

    /// Selecting the active value again clears it.
    pub fn toggle(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        if self.entries.get(&column) == Some(&value) {
            self.entries.remove(&column);
        } else {
            self.set(column, value);
        }
    }

    /// Drops the filter on `column`, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.entries.remove(column)
    }

    /// Drops every filter.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Value filtered on `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries.get(column).map(String::as_str)
    }

    /// No filter is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filters set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Filters ordered by column.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Keeps records passing every column filter and, when `search` is non-empty,
/// the fuzzy search on at least one of `searchable`. Input order is kept.
pub fn filter<'a>(
    records: &'a [Record],
    filters: &FilterState,
    search: &str,
    searchable: &[&str],
) -> Vec<&'a Record> {
    let folded: Vec<(&str, String)> = filters
        .iter()
        .map(|(column, value)| (column, value.to_lowercase()))
        .collect();

    records
        .iter()
        .filter(|rec| {
            folded
                .iter()
                .all(|(column, needle)| rec.text(column).to_lowercase().contains(needle.as_str()))
        })
        .filter(|rec| search.is_empty() || matches_search(rec, search, searchable))
        .collect()
}

/// True when any searchable field ranks as a passing fuzzy match.
pub fn matches_search(record: &Record, search: &str, searchable: &[&str]) -> bool {
    searchable
        .iter()
        .any(|field| fuzzy::rank(&record.text(field), search).passed)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn companies() -> Vec<Record> {
        [
            json!({"companyId": "1", "companyName": "Acme", "phoneContact": "555-0100"}),
            json!({"companyId": "2", "companyName": "Ace Corp", "phoneContact": "555-0199"}),
            json!({"companyId": "3", "companyName": "Zenith", "phoneContact": null}),
        ]
        .into_iter()
        .filter_map(|v| Record::from_json(v, "companyId"))
        .collect()
    }

    fn ids(rows: &[&Record]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn empty_state_returns_input_in_order() {
        let records = companies();
        let out = filter(&records, &FilterState::new(), "", &["companyName"]);
        assert_eq!(ids(&out), vec!["1", "2", "3"]);
    }

    #[test]
    fn column_filters_are_case_folded_substrings_and_compose() {
        let records = companies();
        let mut filters = FilterState::new();
        filters.set("phoneContact", "555-01");
        assert_eq!(ids(&filter(&records, &filters, "", &[])), vec!["1", "2"]);

        filters.set("companyName", "CORP");
        assert_eq!(ids(&filter(&records, &filters, "", &[])), vec!["2"]);
    }

    #[test]
    fn search_keeps_original_order() {
        let records = companies();
        let out = filter(&records, &FilterState::new(), "ace", &["companyId", "companyName"]);
        assert_eq!(ids(&out), vec!["1", "2"]);
    }

    #[test]
    fn empty_value_removes_key_and_toggle_clears() {
        let mut filters = FilterState::new();
        filters.set("companyId", "1");
        filters.set("companyId", "");
        assert!(filters.is_empty());

        filters.toggle("companyId", "1");
        assert_eq!(filters.get("companyId"), Some("1"));
        filters.toggle("companyId", "1");
        assert!(filters.is_empty());
    }
}
