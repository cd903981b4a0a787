use crate::client::{ListScope, Transport};
use crate::error::{KuttiError, Result};
use crate::model::{EntityKind, Record, Session};

/// Splits `key=value` at the first `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(KuttiError::Validation(format!(
            "Expected key=value, got '{}'",
            raw
        ))),
    }
}

pub fn parse_assignments<I: AsRef<str>>(raw: &[I]) -> Result<Vec<(String, String)>> {
    raw.iter().map(|r| parse_assignment(r.as_ref())).collect()
}

pub fn parse_number_assignments<I: AsRef<str>>(raw: &[I]) -> Result<Vec<(String, f64)>> {
    parse_assignments(raw)?
        .into_iter()
        .map(|(key, value)| match value.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok((key, n)),
            _ => Err(KuttiError::Validation(format!(
                "'{}' is not a number (for {})",
                value, key
            ))),
        })
        .collect()
}

/// Everything the signed-in user may see of one entity.
pub fn fetch_rows<T: Transport + ?Sized>(
    transport: &T,
    session: &Session,
    kind: EntityKind,
) -> Result<Vec<Record>> {
    transport.list(kind, &ListScope::for_session(Some(session)))
}
