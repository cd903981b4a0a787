use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{ListScope, Transport};
use crate::error::{KuttiError, Result};
use crate::form::Uploader;
use crate::model::{record_id, EntityKind, Record, RecordId, Role, UploadedFile, User};
use crate::translate::{TranslationRequest, TranslationSource};

type TranslationKey = (String, RecordId, String, String);

#[derive(Default)]
struct State {
    collections: BTreeMap<EntityKind, Vec<Record>>,
    passwords: HashMap<String, String>,
    translations: HashMap<TranslationKey, String>,
    next_id: RecordId,
    offline: bool,
}

impl State {
    fn next_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn records(&self, kind: EntityKind) -> &[Record] {
        self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(KuttiError::Network("No response from server".to_string()));
        }
        Ok(())
    }

    fn mission_referent(&self, mission_id: Option<&Value>) -> Option<RecordId> {
        let mission_id = mission_id.and_then(Value::as_i64)?;
        self.records(EntityKind::Missions)
            .iter()
            .find(|m| record_id(m) == Some(mission_id))
            .and_then(|m| m.get("referent_id"))
            .and_then(Value::as_i64)
    }

    fn child(&self, id: Option<&Value>) -> Option<&Record> {
        let id = id.and_then(Value::as_i64)?;
        self.records(EntityKind::Children)
            .iter()
            .find(|c| record_id(c) == Some(id))
    }

    // Sponsors see the children they sponsor, referents the children of
    // their missions. News follows its child.
    fn visible(&self, kind: EntityKind, scope: &ListScope, record: &Record) -> bool {
        let (Some(user_id), Some(role)) = (scope.user_id, scope.role) else {
            return true;
        };
        let child = match kind {
            EntityKind::Children => Some(record),
            EntityKind::News => self.child(record.get("child_id")),
            _ => return true,
        };
        let Some(child) = child else {
            return role == Role::Admin;
        };
        match role {
            Role::Admin => true,
            Role::Sponsor => child.get("sponsor_id").and_then(Value::as_i64) == Some(user_id),
            Role::LocalReferent => {
                self.mission_referent(child.get("mission_id")) == Some(user_id)
            }
        }
    }
}

/// The API contract held in memory. Ids are assigned from one counter
/// shared by every collection.
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<State>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| KuttiError::Network("in-memory transport is poisoned".to_string()))
    }

    /// Seeds a collection; records without an id get one.
    pub fn with_records(self, kind: EntityKind, records: Vec<Record>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            for mut record in records {
                match record_id(&record) {
                    Some(id) => state.next_id = state.next_id.max(id),
                    None => {
                        let id = state.next_id();
                        record.insert("id".to_string(), json!(id));
                    }
                }
                state.collections.entry(kind).or_default().push(record);
            }
        }
        self
    }

    pub fn with_user(self, username: &str, password: &str, role: Role) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let id = state.next_id();
            state.collections.entry(EntityKind::Users).or_default().push(
                json!({"id": id, "username": username, "role": role})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            );
            state
                .passwords
                .insert(username.to_string(), password.to_string());
        }
        self
    }

    pub fn with_translation(
        self,
        kind: EntityKind,
        id: RecordId,
        field: &str,
        language: &str,
        text: &str,
    ) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.translations.insert(
                (
                    kind.translation_tag().to_string(),
                    id,
                    field.to_string(),
                    language.to_string(),
                ),
                text.to_string(),
            );
        }
        self
    }

    /// Simulates the server being unreachable.
    pub fn set_offline(&self, offline: bool) -> Result<()> {
        self.lock()?.offline = offline;
        Ok(())
    }

    pub fn records(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(self.lock()?.records(kind).to_vec())
    }
}

/// Stores submitted `media_files` the way the API returns them, under
/// `media`. A save without `media_files` leaves the record with none.
fn store_media(kind: EntityKind, record: &mut Record) {
    if kind == EntityKind::Missions {
        return;
    }
    let submitted = record.remove("media_files");
    let media: Vec<Value> = submitted
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(order, item)| {
                    json!({
                        "media_path": item.get("path").or_else(|| item.get("media_path")),
                        "media_type": item
                            .get("type")
                            .or_else(|| item.get("media_type"))
                            .cloned()
                            .unwrap_or_else(|| json!("photo")),
                        "description": item.get("description").cloned().unwrap_or_else(|| json!("")),
                        "media_order": order,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    record.insert("media".to_string(), Value::Array(media));
}

fn not_found(kind: EntityKind, id: RecordId) -> KuttiError {
    KuttiError::Api {
        status: 404,
        message: format!("{} {} not found", kind.singular(), id),
        field: None,
    }
}

impl Uploader for InMemoryTransport {
    fn upload(&self, path: &Path) -> Result<UploadedFile> {
        self.lock()?.check_online()?;
        if !path.is_file() {
            return Err(KuttiError::Api {
                status: 400,
                message: format!("No file selected: {}", path.display()),
                field: None,
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filename = format!("{}_{}", Uuid::new_v4().simple(), name);
        Ok(UploadedFile {
            url: format!("/uploads/{}", filename),
            filename,
        })
    }
}

impl TranslationSource for InMemoryTransport {
    fn lookup(&self, request: &TranslationRequest) -> Result<Option<String>> {
        let state = self.lock()?;
        state.check_online()?;
        let key = (
            request.entity_type.clone(),
            request.entity_id,
            request.field_name.clone(),
            request.target_language.clone(),
        );
        Ok(state.translations.get(&key).cloned())
    }
}

impl Transport for InMemoryTransport {
    fn list(&self, kind: EntityKind, scope: &ListScope) -> Result<Vec<Record>> {
        let state = self.lock()?;
        state.check_online()?;
        Ok(state
            .records(kind)
            .iter()
            .filter(|r| state.visible(kind, scope, r))
            .cloned()
            .collect())
    }

    fn create(&self, kind: EntityKind, payload: &Record) -> Result<Record> {
        let mut state = self.lock()?;
        state.check_online()?;

        let mut record = payload.clone();
        store_media(kind, &mut record);
        if kind == EntityKind::Users {
            let username = record
                .get("username")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if state.passwords.contains_key(&username) {
                return Err(KuttiError::Api {
                    status: 400,
                    message: "Username already exists".to_string(),
                    field: Some("username".to_string()),
                });
            }
            let password = record
                .remove("password")
                .and_then(|p| p.as_str().map(str::to_string))
                .unwrap_or_default();
            state.passwords.insert(username, password);
        }

        let id = state.next_id();
        record.insert("id".to_string(), json!(id));
        state.collections.entry(kind).or_default().push(record.clone());
        Ok(record)
    }

    fn update(&self, kind: EntityKind, id: RecordId, payload: &Record) -> Result<Record> {
        let mut state = self.lock()?;
        state.check_online()?;

        let new_password = payload
            .get("password")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let record = state
            .collections
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|r| record_id(r) == Some(id)))
            .ok_or_else(|| not_found(kind, id))?;
        let mut payload = payload.clone();
        store_media(kind, &mut payload);
        for (key, value) in payload {
            if key != "password" && key != "id" {
                record.insert(key, value);
            }
        }
        let updated = record.clone();

        if let (Some(password), Some(username)) = (
            new_password,
            updated.get("username").and_then(Value::as_str),
        ) {
            state.passwords.insert(username.to_string(), password);
        }
        Ok(updated)
    }

    fn delete(&self, kind: EntityKind, id: RecordId) -> Result<()> {
        let mut state = self.lock()?;
        state.check_online()?;
        let rows = state.collections.entry(kind).or_default();
        let before = rows.len();
        rows.retain(|r| record_id(r) != Some(id));
        if rows.len() == before {
            return Err(not_found(kind, id));
        }
        Ok(())
    }

    fn login(&self, username: &str, password: &str) -> Result<User> {
        let state = self.lock()?;
        state.check_online()?;
        if username.is_empty() || password.is_empty() {
            return Err(KuttiError::Auth(
                "Username and password are required".to_string(),
            ));
        }
        if state.passwords.get(username).map(String::as_str) != Some(password) {
            return Err(KuttiError::Auth("Invalid username or password".to_string()));
        }
        let record = state
            .records(EntityKind::Users)
            .iter()
            .find(|u| u.get("username").and_then(Value::as_str) == Some(username))
            .cloned()
            .ok_or_else(|| KuttiError::Auth("Invalid username or password".to_string()))?;
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}
