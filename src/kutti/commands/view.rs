use crate::client::Transport;
use crate::commands::helpers::fetch_rows;
use crate::commands::{authorize, find_record, record_title, Access, CmdResult, Detail, DetailField};
use crate::error::Result;
use crate::form::media::{items_from_value, stored_media};
use crate::model::{display_value, EntityKind, RecordId};
use crate::registry::{descriptor, FormMode};
use crate::session::SessionContext;
use crate::store::SessionStore;
use crate::translate::{resolve_all, TranslatedField};

/// `birth_date` reads as "Birth date".
fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn run<T, S>(
    transport: &T,
    session: &SessionContext<S>,
    kind: EntityKind,
    id: RecordId,
    language: &str,
) -> Result<CmdResult>
where
    T: Transport + Sync + ?Sized,
    S: SessionStore,
{
    let current = authorize(session, kind, Access::View)?;
    let record = find_record(fetch_rows(transport, current, kind)?, kind, id)?;

    let entity = descriptor(kind);
    let columns = entity.columns(current.role());
    let form_fields = entity.fields(FormMode::Edit);

    let mut fields = Vec::new();
    let mut translated = Vec::new();
    for key in entity.detail_fields {
        let Some(value) = record.get(*key).filter(|v| !v.is_null()) else {
            continue;
        };
        let column = columns.iter().find(|c| c.key == *key);
        let label = column
            .map(|c| c.label.clone())
            .or_else(|| form_fields.iter().find(|f| f.key == *key).map(|f| f.label.clone()))
            .unwrap_or_else(|| humanize(key));

        if entity.is_translated(key) {
            translated.push(TranslatedField::new(
                kind,
                Some(id),
                *key,
                display_value(value),
                language,
            ));
        }
        let text = match column {
            Some(c) if !entity.is_translated(key) => c.cell(&record),
            _ => display_value(value),
        };
        fields.push(DetailField {
            key: key.to_string(),
            label,
            value: text,
            translated: false,
        });
    }

    resolve_all(&mut translated, transport);
    for t in &translated {
        if let Some(field) = fields.iter_mut().find(|f| f.key == t.field_name()) {
            field.value = t.text().to_string();
            field.translated = t.is_translated();
        }
    }

    let media = items_from_value(stored_media(&record, "media_files"))
        .into_iter()
        .map(|item| item.url.unwrap_or(item.path))
        .collect();

    let title = translated
        .iter()
        .find(|t| ["name", "title"].contains(&t.field_name()))
        .map(|t| t.text().to_string())
        .unwrap_or_else(|| record_title(&record));

    Ok(CmdResult::default()
        .with_detail(Detail {
            kind,
            id,
            title,
            fields,
            media,
            language: language.to_string(),
        })
        .with_affected_records(vec![record]))
}
