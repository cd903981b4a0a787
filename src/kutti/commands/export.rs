use chrono::{Local, NaiveDate};
use std::path::Path;

use crate::client::Transport;
use crate::commands::list::{build_grid, ListQuery};
use crate::commands::{authorize, Access, CmdMessage, CmdResult};
use crate::error::Result;
use crate::grid::export::write_csv;
use crate::model::EntityKind;
use crate::session::SessionContext;
use crate::store::SessionStore;

/// Writes every row matching `query` (all pages) to a dated CSV in `dir`.
pub fn run<T: Transport + ?Sized, S: SessionStore>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    query: &ListQuery,
    dir: &Path,
) -> Result<CmdResult> {
    run_on(transport, session, kind, query, dir, Local::now().date_naive())
}

pub fn run_on<T: Transport + ?Sized, S: SessionStore>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    query: &ListQuery,
    dir: &Path,
    today: NaiveDate,
) -> Result<CmdResult> {
    let current = authorize(session, kind, Access::View)?;
    let grid = build_grid(transport, current, kind, query, crate::grid::filter::DEFAULT_PAGE_SIZE)?;
    let rows = grid.filtered().len();

    let csv = grid.export_csv()?;
    let filename = grid.export_filename(&format!("{} overview", kind), today);
    let path = write_csv(dir, &filename, &csv)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Exported {} {} to {}",
        rows,
        if rows == 1 { "row" } else { "rows" },
        path.display()
    )));
    Ok(result.with_exported(path))
}
