//! Photo and video attachments of a media field.
//!
//! Files are uploaded one at a time through an [`Uploader`]. A batch is
//! all-or-nothing: if any upload fails, none of the batch is attached and
//! the files already sent are logged, since the server keeps them.
//! Files beyond the field's limit are skipped.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{KuttiError, Result};
use crate::model::{MediaItem, MediaKind, Record, UploadedFile};

/// Key under which the API returns a record's attachments.
pub const STORED_MEDIA_KEY: &str = "media";

pub trait Uploader {
    fn upload(&self, path: &Path) -> Result<UploadedFile>;
}

/// Reads a media field's value. Bare strings are taken as file paths;
/// anything else that is not a media object is dropped.
pub fn items_from_value(value: Option<&Value>) -> Vec<MediaItem> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if let Value::String(path) = entry {
            items.push(MediaItem {
                kind: MediaKind::from_filename(path),
                path: path.clone(),
                description: String::new(),
                url: None,
                original_name: None,
            });
            continue;
        }
        match serde_json::from_value(entry.clone()) {
            Ok(item) => items.push(item),
            Err(e) => debug!(index, error = %e, "dropping unreadable media entry"),
        }
    }
    items
}

/// A record's attachments: the form field if present, else the list the
/// API returns under [`STORED_MEDIA_KEY`].
pub fn stored_media<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).or_else(|| record.get(STORED_MEDIA_KEY))
}

pub fn items_to_value(items: &[MediaItem]) -> Value {
    Value::Array(
        items
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    )
}

/// Uploads `paths` and appends them to `items`, returning how many were added.
pub fn attach(
    items: &mut Vec<MediaItem>,
    max_files: usize,
    uploader: &dyn Uploader,
    paths: &[PathBuf],
) -> Result<usize> {
    let slots = max_files.saturating_sub(items.len());
    let batch = &paths[..paths.len().min(slots)];
    if batch.len() < paths.len() {
        debug!(
            skipped = paths.len() - batch.len(),
            max_files, "media limit reached"
        );
    }

    let mut uploaded: Vec<MediaItem> = Vec::with_capacity(batch.len());
    for path in batch {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = match uploader.upload(path) {
            Ok(file) => file,
            Err(e) => {
                if !uploaded.is_empty() {
                    let orphaned: Vec<&str> = uploaded.iter().map(|m| m.path.as_str()).collect();
                    warn!(
                        failed = %path.display(),
                        orphaned = ?orphaned,
                        "upload failed; files already sent stay on the server unattached"
                    );
                }
                return Err(e);
            }
        };
        debug!(file = %file.filename, "uploaded");
        uploaded.push(MediaItem {
            kind: MediaKind::from_filename(&original_name),
            path: file.filename,
            description: String::new(),
            url: Some(file.url),
            original_name: Some(original_name),
        });
    }

    let added = uploaded.len();
    items.extend(uploaded);
    Ok(added)
}

pub fn remove(items: &mut Vec<MediaItem>, index: usize) -> Result<MediaItem> {
    if index >= items.len() {
        return Err(out_of_range(index, items.len()));
    }
    Ok(items.remove(index))
}

/// Moves an item; a target outside the list leaves it unchanged.
pub fn move_item(items: &mut Vec<MediaItem>, from: usize, to: usize) -> Result<()> {
    if from >= items.len() {
        return Err(out_of_range(from, items.len()));
    }
    if to >= items.len() {
        return Ok(());
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

pub fn describe(items: &mut [MediaItem], index: usize, description: &str) -> Result<()> {
    let len = items.len();
    let item = items
        .get_mut(index)
        .ok_or_else(|| out_of_range(index, len))?;
    item.description = description.to_string();
    Ok(())
}

fn out_of_range(index: usize, len: usize) -> KuttiError {
    KuttiError::Validation(format!(
        "No attachment #{} (there are {})",
        index + 1,
        len
    ))
}
