use crate::client::Transport;
use crate::commands::helpers::fetch_rows;
use crate::commands::{authorize, find_record, record_title, Access, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{EntityKind, RecordId};
use crate::session::SessionContext;
use crate::store::SessionStore;

/// Deletes one record. Without `confirmed` nothing is sent and a warning
/// asks the user to confirm.
pub fn run<T: Transport + ?Sized, S: SessionStore>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    id: RecordId,
    confirmed: bool,
) -> Result<CmdResult> {
    let current = authorize(session, kind, Access::Delete)?;
    let record = find_record(fetch_rows(transport, current, kind)?, kind, id)?;
    let title = record_title(&record);

    let mut result = CmdResult::default();
    if !confirmed {
        result.add_message(CmdMessage::warning(format!(
            "This will delete {} {} ({}). Run again with --yes to confirm.",
            kind.singular().to_lowercase(),
            id,
            title
        )));
        return Ok(result);
    }

    transport.delete(kind, id)?;
    result.add_message(CmdMessage::success(format!(
        "{} deleted: {}",
        kind.singular(),
        title
    )));
    Ok(result.with_affected_records(vec![record]))
}
