//! # Record Form
//!
//! [`FormState`] drives a create or edit form built from a list of
//! [`FieldDescriptor`]s: it holds the current values, per-field errors, a
//! general error slot and the in-flight flags.
//!
//! Submitting is a two-step protocol so the actual save can happen anywhere:
//!
//! 1. [`FormState::begin_submit`] validates and, when the form is valid and
//!    idle, marks it as submitting and hands back the values to save.
//! 2. [`FormState::finish_submit`] takes the save result. A rejection is
//!    routed to the field the server named, or to the general slot.
//!
//! [`FormState::submit`] runs both steps around a closure. The form never
//! closes itself; a `Saved` outcome tells the caller it may.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::{KuttiError, Result};
use crate::model::{MediaItem, Record};

pub mod field;
pub mod media;
pub mod validate;

pub use field::{FieldDescriptor, FieldType, OptionSource, SelectOption, Validator};
pub use media::Uploader;

pub const SAVE_FAILED: &str = "An error occurred while saving";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, String>,
    pub general: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A submit or upload is already running.
    Busy,
    /// Validation failed; see the field errors.
    Invalid,
    /// The save was attempted and refused.
    Rejected,
    Saved(Record),
}

#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<FieldDescriptor>,
    values: Record,
    errors: FormErrors,
    submitting: bool,
    uploading: BTreeSet<String>,
}

impl FormState {
    pub fn new(fields: Vec<FieldDescriptor>, initial: Record) -> Self {
        Self {
            fields,
            values: initial,
            errors: FormErrors::default(),
            submitting: false,
            uploading: BTreeSet::new(),
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_uploading(&self) -> bool {
        !self.uploading.is_empty()
    }

    /// Replaces all values, e.g. when the record being edited is reloaded.
    pub fn reset(&mut self, values: Record) {
        self.values = values;
        self.errors = FormErrors::default();
    }

    /// Sets a value and clears that field's error.
    pub fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        self.known(key)?;
        self.values.insert(key.to_string(), value);
        self.errors.fields.remove(key);
        Ok(())
    }

    /// Sets a value from user-typed text, converted for the field's type.
    ///
    /// Checkboxes take `true/false/yes/no/1/0`. Number fields keep text that
    /// does not parse so validation can report it.
    pub fn set_text(&mut self, key: &str, text: &str) -> Result<()> {
        let field = self.known(key)?;
        let value = match field.field_type {
            FieldType::Checkbox => Value::Bool(parse_flag(text).ok_or_else(|| {
                KuttiError::Validation(format!("'{}' expects yes or no", key))
            })?),
            FieldType::Number => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| text.trim().parse::<f64>().map(Value::from))
                .unwrap_or_else(|_| Value::String(text.to_string())),
            FieldType::Media => {
                return Err(KuttiError::Validation(format!(
                    "'{}' takes files, not text",
                    key
                )))
            }
            _ => Value::String(text.to_string()),
        };
        self.set_value(key, value)
    }

    /// Runs every validator, replacing the field errors. True when valid.
    pub fn validate(&mut self) -> bool {
        self.errors.fields = validate::validate(&self.fields, &self.values);
        self.errors.fields.is_empty()
    }

    pub fn begin_upload(&mut self, key: &str) -> Result<()> {
        self.known(key)?;
        self.uploading.insert(key.to_string());
        Ok(())
    }

    pub fn end_upload(&mut self, key: &str) {
        self.uploading.remove(key);
    }

    /// Uploads files into a media field. On failure the field is unchanged
    /// and the error lands in that field's slot.
    pub fn attach_media(
        &mut self,
        key: &str,
        uploader: &dyn Uploader,
        paths: &[PathBuf],
    ) -> Result<usize> {
        let limit = self.media_field(key)?.file_limit();
        let mut items = media::items_from_value(self.values.get(key));

        self.begin_upload(key)?;
        let result = media::attach(&mut items, limit, uploader, paths);
        self.end_upload(key);

        match result {
            Ok(added) => {
                self.set_value(key, media::items_to_value(&items))?;
                Ok(added)
            }
            Err(err) => {
                self.errors
                    .fields
                    .insert(key.to_string(), format!("Error uploading file: {}", err));
                Err(err)
            }
        }
    }

    pub fn remove_media(&mut self, key: &str, index: usize) -> Result<()> {
        self.edit_media(key, |items| media::remove(items, index).map(|_| ()))
    }

    pub fn move_media(&mut self, key: &str, from: usize, to: usize) -> Result<()> {
        self.edit_media(key, |items| media::move_item(items, from, to))
    }

    pub fn describe_media(&mut self, key: &str, index: usize, description: &str) -> Result<()> {
        self.edit_media(key, |items| media::describe(items, index, description))
    }

    /// Validates and marks the form as submitting; returns the values to save.
    pub fn begin_submit(&mut self) -> std::result::Result<Record, SubmitOutcome> {
        if self.submitting || self.is_uploading() {
            return Err(SubmitOutcome::Busy);
        }
        self.errors.general = None;
        if !self.validate() {
            return Err(SubmitOutcome::Invalid);
        }
        self.submitting = true;
        Ok(self.values.clone())
    }

    pub fn finish_submit(&mut self, result: Result<Record>) -> SubmitOutcome {
        self.submitting = false;
        match result {
            Ok(saved) => SubmitOutcome::Saved(saved),
            Err(err) => {
                match err.field().filter(|f| self.field(f).is_some()) {
                    Some(key) => {
                        self.errors
                            .fields
                            .insert(key.to_string(), err.user_message());
                    }
                    None => {
                        let message = match &err {
                            KuttiError::Api { .. }
                            | KuttiError::Network(_)
                            | KuttiError::Validation(_)
                            | KuttiError::Unauthorized(_) => err.user_message(),
                            _ => SAVE_FAILED.to_string(),
                        };
                        self.errors.general = Some(message);
                    }
                }
                SubmitOutcome::Rejected
            }
        }
    }

    pub fn submit<F>(&mut self, save: F) -> SubmitOutcome
    where
        F: FnOnce(&Record) -> Result<Record>,
    {
        match self.begin_submit() {
            Ok(values) => {
                let result = save(&values);
                self.finish_submit(result)
            }
            Err(outcome) => outcome,
        }
    }

    fn known(&self, key: &str) -> Result<&FieldDescriptor> {
        self.field(key)
            .ok_or_else(|| KuttiError::Validation(format!("Unknown field '{}'", key)))
    }

    fn media_field(&self, key: &str) -> Result<&FieldDescriptor> {
        let field = self.known(key)?;
        if field.field_type != FieldType::Media {
            return Err(KuttiError::Validation(format!(
                "'{}' is not a media field",
                key
            )));
        }
        Ok(field)
    }

    fn edit_media<F>(&mut self, key: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<MediaItem>) -> Result<()>,
    {
        self.media_field(key)?;
        let mut items = media::items_from_value(self.values.get(key));
        edit(&mut items)?;
        self.set_value(key, media::items_to_value(&items))
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::media::tests::FakeUploader;
    use serde_json::json;

    fn news_fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("title", "Title", FieldType::Text).required(),
            FieldDescriptor::new("date", "Date", FieldType::Date).required(),
            FieldDescriptor::new("featured", "Featured", FieldType::Checkbox),
            FieldDescriptor::new("media_files", "Media", FieldType::Media).max_files(2),
        ]
    }

    fn filled() -> FormState {
        let mut form = FormState::new(news_fields(), Record::new());
        form.set_text("title", "Back to school").unwrap();
        form.set_text("date", "2024-09-02").unwrap();
        form
    }

    #[test]
    fn invalid_form_is_not_submitted() {
        let mut form = FormState::new(news_fields(), Record::new());
        let mut called = false;
        let outcome = form.submit(|v| {
            called = true;
            Ok(v.clone())
        });
        assert_eq!(outcome, SubmitOutcome::Invalid);
        assert!(!called);
        assert_eq!(form.errors().get("title"), Some(validate::REQUIRED));
        assert!(!form.is_submitting());
    }

    #[test]
    fn editing_a_field_clears_its_error() {
        let mut form = FormState::new(news_fields(), Record::new());
        form.validate();
        assert!(form.errors().get("title").is_some());
        form.set_text("title", "x").unwrap();
        assert!(form.errors().get("title").is_none());
        assert!(form.errors().get("date").is_some());
    }

    #[test]
    fn successful_submit_returns_saved_record() {
        let mut form = filled();
        let outcome = form.submit(|v| {
            let mut saved = v.clone();
            saved.insert("id".into(), json!(9));
            Ok(saved)
        });
        match outcome {
            SubmitOutcome::Saved(record) => assert_eq!(record["id"], 9),
            other => panic!("unexpected {:?}", other),
        }
        assert!(form.errors().is_empty());
    }

    #[test]
    fn second_submit_while_in_flight_is_refused() {
        let mut form = filled();
        assert!(form.begin_submit().is_ok());
        assert_eq!(form.begin_submit(), Err(SubmitOutcome::Busy));
        form.finish_submit(Ok(Record::new()));
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn rejection_goes_to_named_field_or_general_slot() {
        let mut form = filled();
        let outcome = form.submit(|_| {
            Err(KuttiError::Api {
                status: 400,
                message: "Title already used".into(),
                field: Some("title".into()),
            })
        });
        assert_eq!(outcome, SubmitOutcome::Rejected);
        assert_eq!(form.errors().get("title"), Some("Title already used"));
        assert!(form.errors().general.is_none());

        let mut form = filled();
        form.submit(|_| Err(KuttiError::Network("timed out".into())));
        assert_eq!(
            form.errors().general.as_deref(),
            Some("Network error: timed out")
        );

        let mut form = filled();
        form.submit(|_| Err(KuttiError::Io(std::io::Error::other("disk"))));
        assert_eq!(form.errors().general.as_deref(), Some(SAVE_FAILED));
    }

    #[test]
    fn cannot_submit_while_uploading() {
        let mut form = filled();
        form.begin_upload("media_files").unwrap();
        assert_eq!(form.begin_submit(), Err(SubmitOutcome::Busy));
        form.end_upload("media_files");
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn checkbox_text_is_parsed() {
        let mut form = filled();
        form.set_text("featured", "yes").unwrap();
        assert_eq!(form.value("featured"), Some(&json!(true)));
        assert!(form.set_text("featured", "maybe").is_err());
        assert!(form.set_text("nope", "x").is_err());
    }

    #[test]
    fn media_round_trip_through_form_values() {
        let mut form = filled();
        let up = FakeUploader::default();
        let added = form
            .attach_media(
                "media_files",
                &up,
                &[PathBuf::from("a.jpg"), PathBuf::from("b.mp4"), PathBuf::from("c.jpg")],
            )
            .unwrap();
        assert_eq!(added, 2);
        form.move_media("media_files", 1, 0).unwrap();
        form.describe_media("media_files", 0, "dance").unwrap();
        let media = form.value("media_files").unwrap();
        assert_eq!(media[0]["type"], "video");
        assert_eq!(media[0]["description"], "dance");
        form.remove_media("media_files", 1).unwrap();
        assert_eq!(form.value("media_files").unwrap().as_array().unwrap().len(), 1);
        assert!(!form.is_uploading());
    }

    #[test]
    fn failed_upload_sets_field_error() {
        let mut form = filled();
        let up = FakeUploader::default();
        let err = form.attach_media("media_files", &up, &[PathBuf::from("broken.jpg")]);
        assert!(err.is_err());
        assert!(form
            .errors()
            .get("media_files")
            .unwrap()
            .starts_with("Error uploading file"));
        assert!(form.value("media_files").is_none());
        assert!(form.attach_media("title", &up, &[]).is_err());
    }
}
