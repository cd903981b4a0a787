//! Synchronous field validation, run on every submit attempt.
//!
//! Checks per field, in order: required, email shape, calendar date,
//! number, select membership. A custom validator runs last and replaces
//! any built-in message.
//! Format checks only apply to non-empty values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use super::field::{FieldDescriptor, FieldType};
use crate::dates::parse_datetime;
use crate::grid::filter::coerce_number;
use crate::model::{display_value, Record};

pub const REQUIRED: &str = "This field is required";
pub const INVALID_EMAIL: &str = "Invalid email format";
pub const INVALID_DATE: &str = "Invalid date format";
pub const INVALID_NUMBER: &str = "Must be a number";
pub const INVALID_CHOICE: &str = "Not one of the available options";

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Blank strings, nulls, empty lists and unchecked boxes count as empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(_)) => false,
    }
}

pub fn is_email(text: &str) -> bool {
    EMAIL.is_match(text)
}

pub fn validate_field(field: &FieldDescriptor, values: &Record) -> Option<String> {
    let value = values.get(&field.key);
    let mut error = None;

    if is_empty(value) {
        if field.required {
            error = Some(REQUIRED.to_string());
        }
    } else if let Some(value) = value {
        error = format_error(field.field_type, value).or_else(|| choice_error(field, value));
    }

    if let Some(check) = field.validator {
        let value = value.unwrap_or(&Value::Null);
        if let Some(message) = check(value, values) {
            error = Some(message);
        }
    }
    error
}

fn format_error(field_type: FieldType, value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    match field_type {
        FieldType::Email if !is_email(&text) => Some(INVALID_EMAIL.to_string()),
        FieldType::Date if parse_datetime(&text).is_none() => Some(INVALID_DATE.to_string()),
        FieldType::Number if coerce_number(value).is_none() => Some(INVALID_NUMBER.to_string()),
        _ => None,
    }
}

// Selects only check membership once their options are known.
fn choice_error(field: &FieldDescriptor, value: &Value) -> Option<String> {
    if field.field_type != FieldType::Select || field.options.is_empty() {
        return None;
    }
    let chosen = display_value(value);
    (!field.options.iter().any(|o| o.value == chosen)).then(|| INVALID_CHOICE.to_string())
}

/// Errors keyed by field; empty when the form may be submitted.
pub fn validate(fields: &[FieldDescriptor], values: &Record) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter_map(|f| validate_field(f, values).map(|e| (f.key.clone(), e)))
        .collect()
}
