//! # Filter Predicate Engine
//!
//! Turns a dataset plus a [`FilterState`] into a filtered, sorted view. The
//! input slice is never modified; the result borrows from it.
//!
//! Stages run in a fixed order, each narrowing the previous result:
//!
//! 1. global search over every field of the row
//! 2. per-column substring filters
//! 3. date ranges
//! 4. number ranges
//! 5. multi-select membership
//! 6. stable sort
//!
//! ## Invalid input policy
//!
//! A row whose value cannot be read as a date (or number) fails every
//! active bound of that range. A bound that is itself unparseable fails
//! every row; the grid rejects such bounds before they reach the state, so
//! this only matters for hand-built states.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::sort::{sort_rows, SortSpec};
use crate::dates::parse_datetime;
use crate::model::{display_value, field_text, Record};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZE_OPTIONS: [usize; 5] = [5, 10, 25, 50, 100];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRange {
    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// Every search, filter, sort and pagination choice of one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub column_filters: BTreeMap<String, String>,
    pub date_ranges: BTreeMap<String, DateRange>,
    pub number_ranges: BTreeMap<String, NumberRange>,
    pub multi_selects: BTreeMap<String, BTreeSet<String>>,
    pub sort: Option<SortSpec>,
    pub page_size: usize,
    pub current_page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            column_filters: BTreeMap::new(),
            date_ranges: BTreeMap::new(),
            number_ranges: BTreeMap::new(),
            multi_selects: BTreeMap::new(),
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
        }
    }
}

impl FilterState {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    /// Number of narrowing filters in effect, search excluded.
    pub fn active_filter_count(&self) -> usize {
        self.column_filters.values().filter(|v| !v.is_empty()).count()
            + self.date_ranges.values().filter(|r| r.is_active()).count()
            + self.number_ranges.values().filter(|r| r.is_active()).count()
            + self.multi_selects.values().filter(|s| !s.is_empty()).count()
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search.is_empty() || self.active_filter_count() > 0
    }
}

/// Runs every stage of the engine over `rows`.
pub fn apply<'a>(rows: &'a [Record], state: &FilterState) -> Vec<&'a Record> {
    let mut out: Vec<&Record> = rows
        .iter()
        .filter(|row| matches_search(row, &state.search))
        .filter(|row| matches_column_filters(row, &state.column_filters))
        .filter(|row| matches_date_ranges(row, &state.date_ranges))
        .filter(|row| matches_number_ranges(row, &state.number_ranges))
        .filter(|row| matches_multi_selects(row, &state.multi_selects))
        .collect();

    if let Some(spec) = &state.sort {
        sort_rows(&mut out, spec);
    }
    out
}

pub fn matches_search(row: &Record, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    row.values().any(|value| value_contains(value, &needle))
}

// Nulls never match; nested media arrays are searched leaf by leaf.
fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|v| value_contains(v, needle)),
        Value::Object(map) => map.values().any(|v| value_contains(v, needle)),
        scalar => display_value(scalar).to_lowercase().contains(needle),
    }
}

pub fn matches_column_filters(row: &Record, filters: &BTreeMap<String, String>) -> bool {
    filters
        .iter()
        .filter(|(_, wanted)| !wanted.is_empty())
        .all(|(key, wanted)| {
            field_text(row, key)
                .to_lowercase()
                .contains(&wanted.to_lowercase())
        })
}

pub fn matches_date_ranges(row: &Record, ranges: &BTreeMap<String, DateRange>) -> bool {
    ranges
        .iter()
        .filter(|(_, range)| range.is_active())
        .all(|(key, range)| date_in_range(&field_text(row, key), range))
}

fn date_in_range(value: &str, range: &DateRange) -> bool {
    let Some(at) = parse_datetime(value) else {
        return false;
    };
    if let Some(start) = &range.start {
        match parse_datetime(start) {
            Some(start) if at >= start => {}
            _ => return false,
        }
    }
    if let Some(end) = &range.end {
        match parse_datetime(end) {
            Some(end) if at <= end => {}
            _ => return false,
        }
    }
    true
}

pub fn matches_number_ranges(row: &Record, ranges: &BTreeMap<String, NumberRange>) -> bool {
    ranges
        .iter()
        .filter(|(_, range)| range.is_active())
        .all(|(key, range)| {
            let Some(n) = row.get(key).and_then(coerce_number) else {
                return false;
            };
            range.min.is_none_or(|min| n >= min) && range.max.is_none_or(|max| n <= max)
        })
}

/// Numeric reading of a value; `None` for blanks and non-numeric text.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn matches_multi_selects(row: &Record, selects: &BTreeMap<String, BTreeSet<String>>) -> bool {
    selects
        .iter()
        .filter(|(_, chosen)| !chosen.is_empty())
        .all(|(key, chosen)| chosen.contains(&field_text(row, key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::sort::SortDirection;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Record> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn names(result: &[&Record]) -> Vec<String> {
        result.iter().map(|r| field_text(r, "name")).collect()
    }

    #[test]
    fn empty_dataset_gives_empty_result() {
        let data: Vec<Record> = Vec::new();
        let state = FilterState {
            search: "x".into(),
            ..FilterState::default()
        };
        assert!(apply(&data, &state).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let data = rows(json!([{"name": "Maria"}, {"name": "Carlo"}]));
        let state = FilterState {
            search: "ARI".into(),
            ..FilterState::default()
        };
        assert_eq!(names(&apply(&data, &state)), vec!["Maria"]);
    }

    #[test]
    fn search_skips_nulls_and_reaches_nested_media() {
        let data = rows(json!([
            {"name": "A", "notes": null},
            {"name": "B", "media": [{"path": "null-island.jpg"}]}
        ]));
        let state = FilterState {
            search: "null".into(),
            ..FilterState::default()
        };
        assert_eq!(names(&apply(&data, &state)), vec!["B"]);
    }

    #[test]
    fn column_filter_treats_missing_field_as_empty() {
        let data = rows(json!([
            {"name": "A", "mission_name": "Kenya North"},
            {"name": "B"}
        ]));
        let mut state = FilterState::default();
        state
            .column_filters
            .insert("mission_name".into(), "kenya".into());
        assert_eq!(names(&apply(&data, &state)), vec!["A"]);

        state.column_filters.insert("mission_name".into(), String::new());
        assert_eq!(apply(&data, &state).len(), 2);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let data = rows(json!([
            {"name": "early", "date": "2024-01-01"},
            {"name": "mid", "date": "2024-02-15"},
            {"name": "late", "date": "2024-03-31"}
        ]));
        let mut state = FilterState::default();
        state.date_ranges.insert(
            "date".into(),
            DateRange {
                start: Some("2024-01-01".into()),
                end: Some("2024-02-15".into()),
            },
        );
        assert_eq!(names(&apply(&data, &state)), vec!["early", "mid"]);
    }

    #[test]
    fn unparseable_row_date_fails_active_bound() {
        let data = rows(json!([
            {"name": "ok", "date": "2024-05-01"},
            {"name": "bad", "date": "soon"},
            {"name": "missing"}
        ]));
        let mut state = FilterState::default();
        state.date_ranges.insert(
            "date".into(),
            DateRange {
                start: Some("2024-01-01".into()),
                end: None,
            },
        );
        assert_eq!(names(&apply(&data, &state)), vec!["ok"]);
    }

    #[test]
    fn unparseable_bound_fails_every_row() {
        let data = rows(json!([{"name": "ok", "date": "2024-05-01"}]));
        let mut state = FilterState::default();
        state.date_ranges.insert(
            "date".into(),
            DateRange {
                start: None,
                end: Some("whenever".into()),
            },
        );
        assert!(apply(&data, &state).is_empty());
    }

    #[test]
    fn number_range_min_keeps_equal_and_above() {
        let data = rows(json!([
            {"name": "a", "age": 3},
            {"name": "b", "age": 5},
            {"name": "c", "age": "8"}
        ]));
        let mut state = FilterState::default();
        state.number_ranges.insert(
            "age".into(),
            NumberRange {
                min: Some(5.0),
                max: None,
            },
        );
        assert_eq!(names(&apply(&data, &state)), vec!["b", "c"]);
    }

    #[test]
    fn number_range_rejects_non_numeric_rows() {
        let data = rows(json!([
            {"name": "a", "age": "unknown"},
            {"name": "b", "age": 9},
            {"name": "c"}
        ]));
        let mut state = FilterState::default();
        state.number_ranges.insert(
            "age".into(),
            NumberRange {
                min: None,
                max: Some(10.0),
            },
        );
        assert_eq!(names(&apply(&data, &state)), vec!["b"]);
    }

    #[test]
    fn multi_select_requires_membership() {
        let data = rows(json!([
            {"name": "a", "gender": "man"},
            {"name": "b", "gender": "woman"},
            {"name": "c", "gender": "other"}
        ]));
        let mut state = FilterState::default();
        state.multi_selects.insert(
            "gender".into(),
            ["man".to_string(), "other".to_string()].into_iter().collect(),
        );
        assert_eq!(names(&apply(&data, &state)), vec!["a", "c"]);

        state.multi_selects.insert("gender".into(), BTreeSet::new());
        assert_eq!(apply(&data, &state).len(), 3);
    }

    #[test]
    fn every_result_satisfies_all_predicates_and_none_are_lost() {
        let data = rows(json!([
            {"name": "Maria", "age": 7, "mission_name": "North", "gender": "woman"},
            {"name": "Mario", "age": 12, "mission_name": "North", "gender": "man"},
            {"name": "Marta", "age": 4, "mission_name": "South", "gender": "woman"},
            {"name": "Luca", "age": 9, "mission_name": "North", "gender": "man"},
            {"name": "Marina", "age": 10, "mission_name": "north east", "gender": "woman"}
        ]));
        let mut state = FilterState {
            search: "mar".into(),
            ..FilterState::default()
        };
        state.column_filters.insert("mission_name".into(), "north".into());
        state.number_ranges.insert(
            "age".into(),
            NumberRange {
                min: Some(5.0),
                max: Some(11.0),
            },
        );
        state
            .multi_selects
            .insert("gender".into(), ["woman".to_string()].into_iter().collect());

        let result = apply(&data, &state);
        let predicate = |r: &Record| {
            matches_search(r, &state.search)
                && matches_column_filters(r, &state.column_filters)
                && matches_number_ranges(r, &state.number_ranges)
                && matches_multi_selects(r, &state.multi_selects)
        };
        assert!(result.iter().all(|r| predicate(r)));
        let expected: Vec<&Record> = data.iter().filter(|r| predicate(r)).collect();
        assert_eq!(result, expected);
        assert_eq!(names(&result), vec!["Maria", "Marina"]);
    }

    #[test]
    fn apply_does_not_touch_input_order() {
        let data = rows(json!([{"name": "b"}, {"name": "a"}]));
        let state = FilterState {
            sort: Some(SortSpec::new("name", SortDirection::Ascending)),
            ..FilterState::default()
        };
        assert_eq!(names(&apply(&data, &state)), vec!["a", "b"]);
        assert_eq!(field_text(&data[0], "name"), "b");
    }

    #[test]
    fn active_filter_count_ignores_empty_entries() {
        let mut state = FilterState::default();
        state.column_filters.insert("a".into(), String::new());
        state.column_filters.insert("b".into(), "x".into());
        state.date_ranges.insert("d".into(), DateRange::default());
        state.number_ranges.insert(
            "n".into(),
            NumberRange {
                min: Some(1.0),
                max: None,
            },
        );
        assert_eq!(state.active_filter_count(), 2);
        assert!(state.has_active_filters());
        assert!(!FilterState::default().has_active_filters());
    }
}
