use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Record;

/// Extra check for one field. Receives the field's value and every value of
/// the form; returns the error message, if any.
pub type Validator = fn(&Value, &Record) -> Option<String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Password,
    Number,
    Date,
    Textarea,
    Select,
    Checkbox,
    File,
    Media,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Where a select field gets its choices when they are not static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSource {
    Children,
    Missions,
    Referents,
    Sponsors,
    Roles,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
    pub option_source: Option<OptionSource>,
    pub max_files: Option<usize>,
    pub rows: Option<u8>,
    pub validator: Option<Validator>,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            required: false,
            placeholder: None,
            options: Vec::new(),
            option_source: None,
            max_files: None,
            rows: None,
            validator: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn options_from(mut self, source: OptionSource) -> Self {
        self.option_source = Some(source);
        self
    }

    pub fn max_files(mut self, max: usize) -> Self {
        self.max_files = Some(max);
        self
    }

    pub fn rows(mut self, rows: u8) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Media fields accept five files unless told otherwise.
    pub fn file_limit(&self) -> usize {
        self.max_files.unwrap_or(5)
    }

    /// Label of a select option, falling back to the raw value.
    pub fn option_label<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }
}
