//! # API Client
//!
//! Everything the console persists goes through the REST API, reached via
//! the [`Transport`] trait. The API is treated as an opaque service with a
//! fixed JSON contract:
//!
//! | Call                     | Request                    | Response                     |
//! |--------------------------|----------------------------|------------------------------|
//! | `GET /<entity>`          | `?user_id=&user_role=`     | array of records             |
//! | `POST /<entity>`         | record                     | `{id, ...}`                  |
//! | `PUT /<entity>/<id>`     | record                     | `{...}`                      |
//! | `DELETE /<entity>/<id>`  |                            | status                       |
//! | `POST /upload`           | multipart `file`           | `{filename, url}`            |
//! | `POST /translate/field`  | [`TranslationRequest`]     | `{translated_text}`          |
//! | `POST /login`            | `{username, password}`     | `{success, user}` / `{error}`|
//!
//! Failures carry an `{"error": "..."}` body.
//!
//! ## Implementations
//!
//! - [`http::HttpTransport`]: the real API over HTTP
//! - [`memory::InMemoryTransport`]: same contract held in memory, for tests
//!
//! Uploading and translation lookups are separate traits ([`Uploader`],
//! [`TranslationSource`]) so forms and translated fields only need the part
//! they use.

use crate::error::Result;
use crate::form::Uploader;
use crate::model::{EntityKind, Record, RecordId, Role, Session, User};
use crate::translate::TranslationSource;

pub mod http;
pub mod memory;

/// Who is asking for a listing. The API narrows children and news to what a
/// sponsor or local referent may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListScope {
    pub user_id: Option<RecordId>,
    pub role: Option<Role>,
}

impl ListScope {
    pub fn for_session(session: Option<&Session>) -> Self {
        match session {
            Some(s) => Self {
                user_id: Some(s.user.id),
                role: Some(s.role()),
            },
            None => Self::default(),
        }
    }

    /// Query parameters for the listing endpoints.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.user_id {
            pairs.push(("user_id", id.to_string()));
        }
        if let Some(role) = self.role {
            pairs.push(("user_role", role_query_value(role).to_string()));
        }
        pairs
    }
}

// The listing endpoints spell the referent role the old way.
fn role_query_value(role: Role) -> &'static str {
    match role {
        Role::LocalReferent => "localReferent",
        other => other.as_str(),
    }
}

pub trait Transport: Uploader + TranslationSource {
    fn list(&self, kind: EntityKind, scope: &ListScope) -> Result<Vec<Record>>;

    /// Creates a record; returns it with the id the server assigned.
    fn create(&self, kind: EntityKind, payload: &Record) -> Result<Record>;

    fn update(&self, kind: EntityKind, id: RecordId, payload: &Record) -> Result<Record>;

    fn delete(&self, kind: EntityKind, id: RecordId) -> Result<()>;

    fn login(&self, username: &str, password: &str) -> Result<User>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_query_uses_legacy_referent_spelling() {
        let user: User = serde_json::from_value(json!({
            "id": 4, "username": "rita", "role": "referent"
        }))
        .unwrap();
        let session = Session::new(user);
        let pairs = ListScope::for_session(Some(&session)).query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("user_id", "4".to_string()),
                ("user_role", "localReferent".to_string())
            ]
        );
        assert!(ListScope::for_session(None).query_pairs().is_empty());
    }
}
