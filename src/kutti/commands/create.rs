use std::path::PathBuf;

use crate::client::{ListScope, Transport};
use crate::commands::{authorize, record_title, Access, CmdMessage, CmdResult};
use crate::error::{KuttiError, Result};
use crate::form::media::{items_from_value, items_to_value, STORED_MEDIA_KEY};
use crate::form::{FieldType, FormState, SubmitOutcome};
use crate::model::{record_id, EntityKind, Record, Session};
use crate::registry::{descriptor, load_options, prepare_payload, FormMode};
use crate::session::SessionContext;
use crate::store::SessionStore;

/// Values typed on the command line for a create or edit form.
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    pub values: Vec<(String, String)>,
    /// Files for the form's media field.
    pub media: Vec<PathBuf>,
}

/// Builds the form for `mode`, applies `input` over `initial` and saves it
/// with `save`. Field errors come back as one validation error.
pub(crate) fn fill_and_submit<T, F>(
    transport: &T,
    current: &Session,
    kind: EntityKind,
    mode: FormMode,
    initial: Record,
    input: &FormInput,
    save: F,
) -> Result<Record>
where
    T: Transport,
    F: FnOnce(&Record) -> Result<Record>,
{
    let mut fields = descriptor(kind).fields(mode);
    load_options(&mut fields, transport, &ListScope::for_session(Some(current)))?;

    let media_key = fields
        .iter()
        .find(|f| f.field_type == FieldType::Media)
        .map(|f| f.key.clone());
    let mut initial = initial;
    // Saving without the media field clears a record's attachments
    if let Some(key) = &media_key {
        if !initial.contains_key(key) {
            if let Some(stored) = initial.get(STORED_MEDIA_KEY) {
                let items = items_from_value(Some(stored));
                initial.insert(key.clone(), items_to_value(&items));
            }
        }
    }
    let initial = initial
        .into_iter()
        .filter(|(key, _)| fields.iter().any(|f| &f.key == key))
        .collect();
    let mut form = FormState::new(fields, initial);

    for (key, text) in &input.values {
        form.set_text(key, text)?;
    }
    if !input.media.is_empty() {
        let key = media_key.ok_or_else(|| {
            KuttiError::Validation(format!("{} records take no media files", kind.singular()))
        })?;
        form.attach_media(&key, transport, &input.media)?;
    }

    match form.submit(|values| save(&prepare_payload(mode, values))) {
        SubmitOutcome::Saved(record) => Ok(record),
        SubmitOutcome::Busy => Err(KuttiError::Validation(
            "The form is still busy".to_string(),
        )),
        SubmitOutcome::Invalid | SubmitOutcome::Rejected => {
            let errors = form.errors();
            let mut lines: Vec<String> = errors
                .fields
                .iter()
                .map(|(key, message)| {
                    let label = form.field(key).map(|f| f.label.as_str()).unwrap_or(key.as_str());
                    format!("{}: {}", label, message)
                })
                .collect();
            lines.extend(errors.general.clone());
            Err(KuttiError::Validation(lines.join("; ")))
        }
    }
}

pub fn run<T: Transport, S: SessionStore>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    input: &FormInput,
) -> Result<CmdResult> {
    let current = authorize(session, kind, Access::Create)?;
    let saved = fill_and_submit(
        transport,
        current,
        kind,
        FormMode::Create,
        Record::new(),
        input,
        |payload| transport.create(kind, payload),
    )?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} created: {} (id {})",
        kind.singular(),
        record_title(&saved),
        record_id(&saved).map(|id| id.to_string()).unwrap_or_else(|| "?".into())
    )));
    Ok(result.with_affected_records(vec![saved]))
}
