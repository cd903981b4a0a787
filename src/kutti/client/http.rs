use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{ListScope, Transport};
use crate::error::{KuttiError, Result};
use crate::form::Uploader;
use crate::model::{EntityKind, Record, RecordId, UploadedFile, User};
use crate::translate::{TranslationRequest, TranslationSource};

pub struct HttpTransport {
    agent: ureq::Agent,
    base: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    user: Option<User>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct TranslationResponse {
    translated_text: Option<String>,
}

impl HttpTransport {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn get_records(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<Record>> {
        let url = self.url(path);
        debug!(%url, "GET");
        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(map_error)?;
        read_json(response)
    }
}

/// Merges what the server answered into what was sent, so callers always
/// get the full record back even when the API only returns `{message, id}`.
fn saved_record(payload: &Record, response: Value) -> Record {
    let mut saved = payload.clone();
    if let Value::Object(answer) = response {
        for (key, value) in answer {
            if key != "message" {
                saved.insert(key, value);
            }
        }
    }
    saved
}

fn read_json<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T> {
    response
        .into_json::<T>()
        .map_err(|e| KuttiError::Network(format!("unreadable response: {}", e)))
}

fn map_error(err: ureq::Error) -> KuttiError {
    match err {
        ureq::Error::Status(status, response) => {
            let body: Value = response.into_json().unwrap_or(Value::Null);
            let message = body
                .get("error")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status));
            let field = body
                .get("field")
                .and_then(Value::as_str)
                .map(str::to_string);
            KuttiError::Api {
                status,
                message,
                field,
            }
        }
        ureq::Error::Transport(transport) => KuttiError::Network(transport.to_string()),
    }
}

fn content_type(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// One-part `multipart/form-data` body with the file under the `file` name.
fn multipart_body(boundary: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type(filename)).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

impl Uploader for HttpTransport {
    fn upload(&self, path: &Path) -> Result<UploadedFile> {
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| KuttiError::Validation(format!("Not a file: {}", path.display())))?;
        let boundary = format!("kutti-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, &filename, &bytes);

        let url = self.url("upload");
        debug!(%url, file = %filename, size = bytes.len(), "POST upload");
        let response = self
            .agent
            .post(&url)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
            .map_err(map_error)?;
        read_json(response)
    }
}

impl TranslationSource for HttpTransport {
    fn lookup(&self, request: &TranslationRequest) -> Result<Option<String>> {
        let url = self.url("translate/field");
        debug!(
            %url,
            entity = %request.entity_type,
            id = request.entity_id,
            field = %request.field_name,
            lang = %request.target_language,
            "POST translation lookup"
        );
        let response = self
            .agent
            .post(&url)
            .send_json(request)
            .map_err(map_error)?;
        let answer: TranslationResponse = read_json(response)?;
        Ok(answer.translated_text.filter(|t| !t.trim().is_empty()))
    }
}

impl Transport for HttpTransport {
    fn list(&self, kind: EntityKind, scope: &ListScope) -> Result<Vec<Record>> {
        self.get_records(kind.endpoint(), &scope.query_pairs())
    }

    fn create(&self, kind: EntityKind, payload: &Record) -> Result<Record> {
        let url = self.url(kind.endpoint());
        debug!(%url, "POST");
        let response = self
            .agent
            .post(&url)
            .send_json(payload)
            .map_err(map_error)?;
        Ok(saved_record(payload, read_json(response)?))
    }

    fn update(&self, kind: EntityKind, id: RecordId, payload: &Record) -> Result<Record> {
        let url = self.url(&format!("{}/{}", kind.endpoint(), id));
        debug!(%url, "PUT");
        let response = self
            .agent
            .put(&url)
            .send_json(payload)
            .map_err(map_error)?;
        let mut saved = saved_record(payload, read_json(response)?);
        saved.insert("id".to_string(), json!(id));
        Ok(saved)
    }

    fn delete(&self, kind: EntityKind, id: RecordId) -> Result<()> {
        let url = self.url(&format!("{}/{}", kind.endpoint(), id));
        debug!(%url, "DELETE");
        self.agent.delete(&url).call().map_err(map_error)?;
        Ok(())
    }

    fn login(&self, username: &str, password: &str) -> Result<User> {
        let url = self.url("login");
        debug!(%url, %username, "POST login");
        let body = json!({ "username": username, "password": password });
        let answer: LoginResponse = match self.agent.post(&url).send_json(body) {
            Ok(response) => read_json(response)?,
            Err(ureq::Error::Status(status, response)) => {
                let answer: LoginResponse = response.into_json().map_err(|_| {
                    KuttiError::Api {
                        status,
                        message: format!("HTTP {}", status),
                        field: None,
                    }
                })?;
                answer
            }
            Err(other) => return Err(map_error(other)),
        };

        match answer {
            LoginResponse {
                success: true,
                user: Some(user),
                ..
            } => Ok(user),
            LoginResponse { error, .. } => Err(KuttiError::Auth(
                error.unwrap_or_else(|| "Invalid username or password".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let t = HttpTransport::new("http://127.0.0.1:5001/", Duration::from_secs(1));
        assert_eq!(t.url("/children"), "http://127.0.0.1:5001/children");
        assert_eq!(t.url("news/3"), "http://127.0.0.1:5001/news/3");
    }

    #[test]
    fn saved_record_merges_server_answer() {
        let payload = serde_json::json!({"name": "Ana"})
            .as_object()
            .unwrap()
            .clone();
        let saved = saved_record(
            &payload,
            serde_json::json!({"message": "Child created successfully", "id": 12}),
        );
        assert_eq!(saved["id"], 12);
        assert_eq!(saved["name"], "Ana");
        assert!(saved.get("message").is_none());
    }

    #[test]
    fn multipart_body_wraps_file() {
        let body = multipart_body("b0", "clip.mp4", b"DATA");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b0\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"clip.mp4\""));
        assert!(text.contains("Content-Type: video/mp4\r\n\r\nDATA\r\n--b0--\r\n"));
    }

    #[test]
    fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let t = HttpTransport::new("http://127.0.0.1:9", Duration::from_millis(500));
        let err = t.list(EntityKind::News, &ListScope::default()).unwrap_err();
        assert!(matches!(err, KuttiError::Network(_)));
    }
}
