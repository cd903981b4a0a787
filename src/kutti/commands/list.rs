use crate::client::Transport;
use crate::commands::helpers::fetch_rows;
use crate::commands::{authorize, Access, CmdMessage, CmdResult, ColumnHeader, Listing};
use crate::error::{KuttiError, Result};
use crate::grid::{Bound, DataGrid, FilterState, ViewMode, PAGE_SIZE_OPTIONS};
use crate::model::{record_id, EntityKind, Role};
use crate::registry::descriptor;
use crate::session::SessionContext;
use crate::store::SessionStore;

/// Search, filter, sort and paging choices for one listing.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
    pub from: Vec<(String, String)>,
    pub to: Vec<(String, String)>,
    pub min: Vec<(String, f64)>,
    pub max: Vec<(String, f64)>,
    pub select: Vec<(String, String)>,
    pub sort: Option<String>,
    pub descending: bool,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub cards: bool,
}

/// Builds the grid for `kind` as the given role sees it, with every choice
/// of `query` applied in the order a user would make them.
pub fn build_grid<T: Transport + ?Sized>(
    transport: &T,
    session: &crate::model::Session,
    kind: EntityKind,
    query: &ListQuery,
    default_page_size: usize,
) -> Result<DataGrid> {
    let role: Role = session.role();
    let rows = fetch_rows(transport, session, kind)?;
    let mut grid = DataGrid::new(descriptor(kind).columns(role), rows)
        .with_state(FilterState::with_page_size(default_page_size));

    if let Some(size) = query.page_size {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return Err(KuttiError::Validation(format!(
                "Page size must be one of {:?}",
                PAGE_SIZE_OPTIONS
            )));
        }
        grid.set_page_size(size);
    }
    if let Some(term) = &query.search {
        grid.set_search(term.as_str());
    }
    for (key, value) in &query.filters {
        grid.set_column_filter(key, value.as_str())?;
    }
    for (key, value) in &query.from {
        grid.set_date_bound(key, Bound::Start, Some(value.as_str()))?;
    }
    for (key, value) in &query.to {
        grid.set_date_bound(key, Bound::End, Some(value.as_str()))?;
    }
    for (key, value) in &query.min {
        grid.set_number_bound(key, Bound::Start, Some(*value))?;
    }
    for (key, value) in &query.max {
        grid.set_number_bound(key, Bound::End, Some(*value))?;
    }
    for (key, value) in &query.select {
        grid.set_selected(key, value, true)?;
    }
    if let Some(field) = &query.sort {
        grid.toggle_sort(field)?;
        if query.descending {
            grid.toggle_sort(field)?;
        }
    }
    if query.cards {
        grid.set_view_mode(ViewMode::Cards);
    }
    if let Some(page) = query.page {
        grid.go_to_page(page);
    }
    Ok(grid)
}

pub fn listing(kind: EntityKind, grid: &DataGrid) -> Listing {
    let snapshot = grid.snapshot();
    let cells = snapshot
        .rows
        .iter()
        .map(|row| grid.columns().iter().map(|c| c.cell(row)).collect())
        .collect();
    Listing {
        kind,
        columns: grid.columns().iter().map(ColumnHeader::from).collect(),
        ids: snapshot.rows.iter().map(record_id).collect(),
        cells,
        total_count: snapshot.total_count,
        unfiltered_count: snapshot.unfiltered_count,
        filtered: grid.state().has_active_filters(),
        active_filters: grid.state().active_filter_count(),
        pagination: snapshot.pagination,
        view_mode: snapshot.view_mode,
    }
}

pub fn run<T: Transport + ?Sized, S: SessionStore>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    query: &ListQuery,
    default_page_size: usize,
) -> Result<CmdResult> {
    let current = authorize(session, kind, Access::View)?;
    let grid = build_grid(transport, current, kind, query, default_page_size)?;
    let listing = listing(kind, &grid);

    let mut result = CmdResult::default();
    if listing.total_count == 0 {
        let empty = if listing.filtered {
            format!("No {} match the current filters.", kind)
        } else {
            format!("No {} found.", kind)
        };
        result.add_message(CmdMessage::info(empty));
    }
    Ok(result.with_listing(listing))
}
