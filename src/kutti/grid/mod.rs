//! # Data Grid
//!
//! The reusable table behind every entity listing. A [`DataGrid`] owns the
//! rows, the column descriptors, the [`FilterState`] and the view mode, and
//! composes the filter engine ([`filter`], [`sort`]) with pagination
//! ([`paginate`]).
//!
//! Every mutation recomputes a [`GridSnapshot`] (`{rows, total_count,
//! pagination, view_mode}`) and hands it to the registered listener, but only
//! when its content differs from the previous emission. Equal snapshots are
//! swallowed so a listener that feeds state back into the grid cannot loop.
//!
//! Filter mutations reset the current page to 1. Sort changes keep the page;
//! data changes only clamp it.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{KuttiError, Result};
use crate::model::{field_text, Record};

pub mod column;
pub mod export;
pub mod filter;
pub mod paginate;
pub mod sort;

pub use column::{ColumnDescriptor, ColumnKind, Renderer};
pub use filter::{DateRange, FilterState, NumberRange, PAGE_SIZE_OPTIONS};
pub use paginate::{paginate, PageWindow};
pub use sort::{SortDirection, SortSpec};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Table,
    Cards,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Table => ViewMode::Cards,
            ViewMode::Cards => ViewMode::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// What the grid reports upward after each change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSnapshot {
    pub rows: Vec<Record>,
    pub total_count: usize,
    pub unfiltered_count: usize,
    pub pagination: PageWindow,
    pub view_mode: ViewMode,
}

type Listener = Box<dyn FnMut(&GridSnapshot)>;

pub struct DataGrid {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Record>,
    state: FilterState,
    view_mode: ViewMode,
    paginated: bool,
    listener: Option<Listener>,
    last_emitted: Option<GridSnapshot>,
}

impl DataGrid {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Record>) -> Self {
        Self {
            columns,
            rows,
            state: FilterState::default(),
            view_mode: ViewMode::Table,
            paginated: true,
            listener: None,
            last_emitted: None,
        }
    }

    pub fn with_state(mut self, state: FilterState) -> Self {
        self.state = state;
        self.state.page_size = self.state.page_size.max(1);
        self
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    /// Shows every filtered row on one page.
    pub fn without_pagination(mut self) -> Self {
        self.paginated = false;
        self
    }

    /// Registers the change listener and immediately emits the current snapshot.
    pub fn on_change(&mut self, listener: impl FnMut(&GridSnapshot) + 'static) {
        self.listener = Some(Box::new(listener));
        self.last_emitted = None;
        self.emit();
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn filterable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.filterable)
    }

    pub fn sortable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.sortable)
    }

    /// Every row passing the current filters, sorted, across all pages.
    pub fn filtered(&self) -> Vec<&Record> {
        filter::apply(&self.rows, &self.state)
    }

    pub fn snapshot(&self) -> GridSnapshot {
        let filtered = self.filtered();
        let page_size = if self.paginated {
            self.state.page_size
        } else {
            filtered.len().max(1)
        };
        let page = paginate(&filtered, page_size, self.state.current_page);
        GridSnapshot {
            rows: page.rows.iter().map(|r| (*r).clone()).collect(),
            total_count: filtered.len(),
            unfiltered_count: self.rows.len(),
            pagination: page.window,
            view_mode: self.view_mode,
        }
    }

    /// Sorted distinct non-empty values of a column, for filter pickers.
    pub fn filter_options(&self, key: &str) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| field_text(r, key))
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn set_data(&mut self, rows: Vec<Record>) {
        self.rows = rows;
        self.clamp_page();
        self.emit();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.state.search = term.into();
        self.filters_changed();
    }

    /// Sets or clears (empty value) a per-column substring filter.
    pub fn set_column_filter(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.column(key)?;
        let value = value.into();
        if value.is_empty() {
            self.state.column_filters.remove(key);
        } else {
            self.state.column_filters.insert(key.to_string(), value);
        }
        self.filters_changed();
        Ok(())
    }

    pub fn set_date_bound(&mut self, key: &str, bound: Bound, value: Option<&str>) -> Result<()> {
        let column = self.column(key)?;
        if column.kind != ColumnKind::Date {
            return Err(KuttiError::Validation(format!(
                "'{}' is not a date column",
                key
            )));
        }
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        if let Some(v) = value {
            if crate::dates::parse_datetime(v).is_none() {
                return Err(KuttiError::Validation(format!("Invalid date '{}'", v)));
            }
        }

        let range = self.state.date_ranges.entry(key.to_string()).or_default();
        let slot = match bound {
            Bound::Start => &mut range.start,
            Bound::End => &mut range.end,
        };
        *slot = value.map(str::to_string);
        if !range.is_active() {
            self.state.date_ranges.remove(key);
        }
        self.filters_changed();
        Ok(())
    }

    pub fn set_number_bound(&mut self, key: &str, bound: Bound, value: Option<f64>) -> Result<()> {
        let column = self.column(key)?;
        if column.kind != ColumnKind::Number {
            return Err(KuttiError::Validation(format!(
                "'{}' is not a number column",
                key
            )));
        }
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(KuttiError::Validation(format!(
                "Invalid bound for '{}'",
                key
            )));
        }

        let range = self.state.number_ranges.entry(key.to_string()).or_default();
        match bound {
            Bound::Start => range.min = value,
            Bound::End => range.max = value,
        }
        if !range.is_active() {
            self.state.number_ranges.remove(key);
        }
        self.filters_changed();
        Ok(())
    }

    pub fn set_selected(&mut self, key: &str, value: &str, selected: bool) -> Result<()> {
        self.column(key)?;
        let chosen = self.state.multi_selects.entry(key.to_string()).or_default();
        if selected {
            chosen.insert(value.to_string());
        } else {
            chosen.remove(value);
        }
        if chosen.is_empty() {
            self.state.multi_selects.remove(key);
        }
        self.filters_changed();
        Ok(())
    }

    /// Clicking a column header: same column flips direction, a new one sorts ascending.
    pub fn toggle_sort(&mut self, key: &str) -> Result<()> {
        let column = self.column(key)?;
        if !column.sortable {
            return Err(KuttiError::Validation(format!("'{}' is not sortable", key)));
        }
        self.state.sort = Some(SortSpec::toggled(self.state.sort.as_ref(), key));
        self.emit();
        Ok(())
    }

    pub fn clear_sort(&mut self) {
        self.state.sort = None;
        self.emit();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.state.page_size = page_size.max(1);
        self.state.current_page = 1;
        self.emit();
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.state.current_page = page;
        self.clamp_page();
        self.emit();
    }

    pub fn first_page(&mut self) {
        self.go_to_page(1);
    }

    pub fn previous_page(&mut self) {
        self.go_to_page(self.state.current_page.saturating_sub(1));
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.state.current_page + 1);
    }

    pub fn last_page(&mut self) {
        let total = paginate::total_pages(self.filtered().len(), self.state.page_size);
        self.go_to_page(total);
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
        self.emit();
    }

    pub fn toggle_view_mode(&mut self) {
        self.set_view_mode(self.view_mode.toggled());
    }

    /// Back to defaults, keeping the page size the user picked.
    pub fn clear_filters(&mut self) {
        self.state = FilterState::with_page_size(self.state.page_size);
        self.emit();
    }

    pub fn export_csv(&self) -> Result<String> {
        export::to_csv(&self.columns, &self.filtered())
    }

    pub fn export_filename(&self, title: &str, today: NaiveDate) -> String {
        export::export_filename(title, today)
    }

    fn column(&self, key: &str) -> Result<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| KuttiError::Validation(format!("Unknown column '{}'", key)))
    }

    fn filters_changed(&mut self) {
        self.state.current_page = 1;
        self.emit();
    }

    fn clamp_page(&mut self) {
        let total = paginate::total_pages(self.filtered().len(), self.state.page_size);
        self.state.current_page = paginate::clamp_page(self.state.current_page, total);
    }

    fn emit(&mut self) {
        if self.listener.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if self.last_emitted.as_ref() == Some(&snapshot) {
            return;
        }
        if let Some(listener) = self.listener.as_mut() {
            listener(&snapshot);
        }
        self.last_emitted = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rows(values: Value) -> Vec<Record> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn children() -> Vec<Record> {
        rows(json!((1..=12)
            .map(|i| json!({
                "id": i,
                "name": format!("child {:02}", i),
                "age": i,
                "gender": if i % 2 == 0 { "woman" } else { "man" },
                "birth": format!("2015-01-{:02}", i)
            }))
            .collect::<Vec<_>>()))
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("name", "Name").sortable(),
            ColumnDescriptor::new("age", "Age")
                .sortable()
                .kind(ColumnKind::Number),
            ColumnDescriptor::new("gender", "Gender").filterable(),
            ColumnDescriptor::new("birth", "Birth").kind(ColumnKind::Date),
        ]
    }

    fn grid() -> DataGrid {
        DataGrid::new(columns(), children()).with_state(FilterState::with_page_size(5))
    }

    fn recorder(grid: &mut DataGrid) -> Rc<RefCell<Vec<GridSnapshot>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        grid.on_change(move |s| sink.borrow_mut().push(s.clone()));
        seen
    }

    #[test]
    fn snapshot_reports_page_and_totals() {
        let mut g = grid();
        g.go_to_page(2);
        let s = g.snapshot();
        assert_eq!(s.total_count, 12);
        assert_eq!(s.pagination.total_pages, 3);
        assert_eq!(s.pagination.start_index, 6);
        assert_eq!(s.pagination.end_index, 10);
        assert_eq!(s.rows.len(), 5);
        assert_eq!(field_text(&s.rows[0], "id"), "6");
    }

    #[test]
    fn any_filter_change_resets_page() {
        let mut g = grid();
        g.go_to_page(3);
        g.set_search("child");
        assert_eq!(g.state().current_page, 1);

        g.go_to_page(2);
        g.set_column_filter("gender", "wo").unwrap();
        assert_eq!(g.state().current_page, 1);

        g.go_to_page(2);
        g.set_number_bound("age", Bound::Start, Some(2.0)).unwrap();
        assert_eq!(g.state().current_page, 1);

        g.go_to_page(2);
        g.set_selected("gender", "woman", true).unwrap();
        assert_eq!(g.state().current_page, 1);

        g.go_to_page(2);
        g.set_date_bound("birth", Bound::End, Some("2015-01-10"))
            .unwrap();
        assert_eq!(g.state().current_page, 1);
    }

    #[test]
    fn page_navigation_is_clamped() {
        let mut g = grid();
        g.last_page();
        assert_eq!(g.state().current_page, 3);
        g.next_page();
        assert_eq!(g.state().current_page, 3);
        g.first_page();
        g.previous_page();
        assert_eq!(g.state().current_page, 1);
    }

    #[test]
    fn shrinking_data_clamps_page() {
        let mut g = grid();
        g.go_to_page(3);
        g.set_data(children().into_iter().take(4).collect());
        assert_eq!(g.state().current_page, 1);
    }

    #[test]
    fn sorting_toggles_and_rejects_unsortable_columns() {
        let mut g = grid();
        g.toggle_sort("age").unwrap();
        g.toggle_sort("age").unwrap();
        let first = g.snapshot().rows[0].clone();
        assert_eq!(field_text(&first, "age"), "12");
        assert!(g.toggle_sort("gender").is_err());
    }

    #[test]
    fn typed_bounds_are_validated() {
        let mut g = grid();
        assert!(g.set_date_bound("birth", Bound::Start, Some("not a date")).is_err());
        assert!(g.set_date_bound("age", Bound::Start, Some("2020-01-01")).is_err());
        assert!(g.set_number_bound("name", Bound::Start, Some(1.0)).is_err());
        assert!(g.set_number_bound("age", Bound::End, Some(f64::NAN)).is_err());
        assert!(g.set_column_filter("nope", "x").is_err());
    }

    #[test]
    fn clearing_a_bound_removes_the_range() {
        let mut g = grid();
        g.set_number_bound("age", Bound::Start, Some(3.0)).unwrap();
        g.set_number_bound("age", Bound::Start, None).unwrap();
        assert!(g.state().number_ranges.is_empty());
        assert_eq!(g.snapshot().total_count, 12);
    }

    #[test]
    fn emits_only_when_content_changes() {
        let mut g = grid();
        let seen = recorder(&mut g);
        assert_eq!(seen.borrow().len(), 1);

        g.set_search("child");
        g.set_search("child");
        g.go_to_page(1);
        assert_eq!(seen.borrow().len(), 1);

        g.set_search("child 1");
        assert_eq!(seen.borrow().len(), 2);

        g.toggle_view_mode();
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(seen.borrow()[2].view_mode, ViewMode::Cards);
    }

    #[test]
    fn identical_data_reload_is_not_reemitted() {
        let mut g = grid();
        let seen = recorder(&mut g);
        g.set_data(children());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn export_covers_all_filtered_rows_not_just_the_page() {
        let mut g = grid();
        g.set_column_filter("gender", "woman").unwrap();
        let csv = g.export_csv().unwrap();
        assert_eq!(csv.lines().count(), 1 + 6);
        assert!(csv.starts_with("Name,Age,Gender,Birth\n"));
    }

    #[test]
    fn filter_options_are_sorted_and_distinct() {
        let g = grid();
        assert_eq!(g.filter_options("gender"), vec!["man", "woman"]);
    }

    #[test]
    fn clear_filters_keeps_page_size() {
        let mut g = grid();
        g.set_search("child 1");
        g.toggle_sort("name").unwrap();
        g.clear_filters();
        assert_eq!(g.state(), &FilterState::with_page_size(5));
    }

    #[test]
    fn unpaginated_grid_shows_everything() {
        let g = DataGrid::new(columns(), children()).without_pagination();
        let s = g.snapshot();
        assert_eq!(s.rows.len(), 12);
        assert_eq!(s.pagination.total_pages, 1);
    }
}
