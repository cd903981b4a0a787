use crate::client::Transport;
use crate::commands::create::{fill_and_submit, FormInput};
use crate::commands::helpers::fetch_rows;
use crate::commands::{authorize, find_record, record_title, Access, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{EntityKind, RecordId};
use crate::registry::FormMode;
use crate::session::SessionContext;
use crate::store::SessionStore;

/// Edits an existing record. Fields not named in `input` keep their values.
pub fn run<T: Transport, S: SessionStore>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    id: RecordId,
    input: &FormInput,
) -> Result<CmdResult> {
    let current = authorize(session, kind, Access::Edit)?;
    let existing = find_record(fetch_rows(transport, current, kind)?, kind, id)?;

    let saved = fill_and_submit(
        transport,
        current,
        kind,
        FormMode::Edit,
        existing,
        input,
        |payload| transport.update(kind, id, payload),
    )?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} updated: {}",
        kind.singular(),
        record_title(&saved)
    )));
    Ok(result.with_affected_records(vec![saved]))
}
