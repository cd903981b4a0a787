//! # Translated Fields
//!
//! Multilingual records (news titles, mission descriptions, child profiles)
//! are shown through the server's translation cache. A [`TranslatedField`]
//! asks the cache for one `(entity, id, field)` in the reader's language and
//! falls back to the original text on a miss or a failure. Translation is an
//! enhancement, so failures are logged and never surfaced as errors.
//!
//! Every lookup carries a token from a per-field counter. Only the response
//! carrying the latest token is applied: if the text or language changed
//! while a lookup was in flight, its late answer is dropped.

use serde::Serialize;
use std::thread;
use tracing::{debug, warn};

use crate::error::{KuttiError, Result};
use crate::model::{EntityKind, RecordId};

/// Body of `POST /translate/field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRequest {
    pub entity_type: String,
    pub entity_id: RecordId,
    pub field_name: String,
    pub target_language: String,
    pub original_text: String,
}

/// Anything that can answer a cached translation lookup.
///
/// `Ok(None)` is a cache miss.
pub trait TranslationSource {
    fn lookup(&self, request: &TranslationRequest) -> Result<Option<String>>;
}

/// One in-flight lookup.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub token: u64,
    pub request: TranslationRequest,
}

#[derive(Debug, Clone)]
pub struct TranslatedField {
    kind: EntityKind,
    entity_id: Option<RecordId>,
    field_name: String,
    original: String,
    language: String,
    text: String,
    loading: bool,
    error: Option<String>,
    token: u64,
}

impl TranslatedField {
    pub fn new(
        kind: EntityKind,
        entity_id: Option<RecordId>,
        field_name: impl Into<String>,
        original: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let original = original.into();
        Self {
            kind,
            entity_id,
            field_name: field_name.into(),
            text: original.clone(),
            original,
            language: language.into(),
            loading: false,
            error: None,
            token: 0,
        }
    }

    /// Text to display: the translation when one was found, else the original.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last lookup failure, kept for diagnostics only.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_translated(&self) -> bool {
        self.text != self.original
    }

    /// The lookup to perform, or `None` when id, field name or text is missing.
    pub fn request(&self) -> Option<TranslationRequest> {
        let entity_id = self.entity_id?;
        if self.field_name.is_empty() || self.original.trim().is_empty() {
            return None;
        }
        Some(TranslationRequest {
            entity_type: self.kind.translation_tag().to_string(),
            entity_id,
            field_name: self.field_name.clone(),
            target_language: self.language.clone(),
            original_text: self.original.clone(),
        })
    }

    /// Starts a new lookup, invalidating any older one still in flight.
    pub fn begin(&mut self) -> Option<Ticket> {
        self.token += 1;
        self.error = None;
        match self.request() {
            Some(request) => {
                self.loading = true;
                Some(Ticket {
                    token: self.token,
                    request,
                })
            }
            None => {
                self.loading = false;
                self.text = self.original.clone();
                None
            }
        }
    }

    /// Applies a lookup result. Returns false when the ticket was stale.
    pub fn complete(&mut self, token: u64, result: Result<Option<String>>) -> bool {
        if token != self.token {
            debug!(field = %self.field_name, token, current = self.token, "dropping stale translation");
            return false;
        }
        self.loading = false;
        self.text = match result {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!(field = %self.field_name, lang = %self.language, "translation cache miss");
                self.original.clone()
            }
            Err(err) => {
                warn!(field = %self.field_name, error = %err, "translation lookup failed");
                self.error = Some(err.to_string());
                self.original.clone()
            }
        };
        true
    }

    /// New inputs; returns a ticket when the text or language actually changed.
    pub fn set_inputs(&mut self, original: &str, language: &str) -> Option<Ticket> {
        if original == self.original && language == self.language {
            return None;
        }
        self.original = original.to_string();
        self.language = language.to_string();
        self.text = self.original.clone();
        self.begin()
    }

    /// Looks the field up synchronously.
    pub fn refresh<S: TranslationSource + ?Sized>(&mut self, source: &S) {
        if let Some(ticket) = self.begin() {
            let result = source.lookup(&ticket.request);
            self.complete(ticket.token, result);
        }
    }
}

/// Looks up every field at once, one thread per lookup.
pub fn resolve_all<S>(fields: &mut [TranslatedField], source: &S)
where
    S: TranslationSource + Sync + ?Sized,
{
    let tickets: Vec<(usize, Ticket)> = fields
        .iter_mut()
        .enumerate()
        .filter_map(|(i, f)| f.begin().map(|t| (i, t)))
        .collect();

    let results: Vec<(usize, u64, Result<Option<String>>)> = thread::scope(|scope| {
        let handles: Vec<_> = tickets
            .into_iter()
            .map(|(i, ticket)| {
                let token = ticket.token;
                let handle = scope.spawn(move || source.lookup(&ticket.request));
                (i, token, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(i, token, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(KuttiError::Network("translation lookup panicked".into()))
                });
                (i, token, result)
            })
            .collect()
    });

    for (i, token, result) in results {
        fields[i].complete(token, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Cache {
        entries: HashMap<(String, String), String>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Cache {
        fn with(mut self, field: &str, lang: &str, text: &str) -> Self {
            self.entries
                .insert((field.to_string(), lang.to_string()), text.to_string());
            self
        }
    }

    impl TranslationSource for Cache {
        fn lookup(&self, request: &TranslationRequest) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(KuttiError::Network("refused".into()));
            }
            Ok(self
                .entries
                .get(&(request.field_name.clone(), request.target_language.clone()))
                .cloned())
        }
    }

    fn title(text: &str, lang: &str) -> TranslatedField {
        TranslatedField::new(EntityKind::News, Some(3), "title", text, lang)
    }

    #[test]
    fn cache_hit_replaces_text() {
        let cache = Cache::default().with("title", "it", "Ciao");
        let mut f = title("Hello", "it");
        f.refresh(&cache);
        assert_eq!(f.text(), "Ciao");
        assert!(f.is_translated());
        assert!(!f.is_loading());
    }

    #[test]
    fn cache_miss_shows_original_without_error() {
        let mut f = title("Hello", "fr");
        f.refresh(&Cache::default());
        assert_eq!(f.text(), "Hello");
        assert!(f.error().is_none());
    }

    #[test]
    fn failure_falls_back_and_records_error() {
        let cache = Cache {
            fail: true,
            ..Cache::default()
        };
        let mut f = title("Hello", "fr");
        f.refresh(&cache);
        assert_eq!(f.text(), "Hello");
        assert!(f.error().unwrap().contains("refused"));
    }

    #[test]
    fn missing_inputs_skip_the_lookup() {
        let cache = Cache::default().with("title", "it", "Ciao");
        let mut no_id = TranslatedField::new(EntityKind::News, None, "title", "Hello", "it");
        no_id.refresh(&cache);
        let mut blank = title("", "it");
        blank.refresh(&cache);
        assert_eq!(cache.calls.load(Ordering::SeqCst), 0);
        assert_eq!(no_id.text(), "Hello");
    }

    #[test]
    fn stale_response_does_not_overwrite_newer_one() {
        let mut f = title("Hello", "fr");
        let old = f.begin().unwrap();
        let new = f.set_inputs("Hello", "it").unwrap();
        assert!(f.complete(new.token, Ok(Some("Ciao".into()))));
        assert!(!f.complete(old.token, Ok(Some("Bonjour".into()))));
        assert_eq!(f.text(), "Ciao");
    }

    #[test]
    fn unchanged_inputs_do_not_requery() {
        let mut f = title("Hello", "it");
        assert!(f.set_inputs("Hello", "it").is_none());
        assert!(f.set_inputs("Hello there", "it").is_some());
        assert_eq!(f.original(), "Hello there");
    }

    #[test]
    fn users_use_singular_entity_tag() {
        let f = TranslatedField::new(EntityKind::Users, Some(1), "bio", "Hi", "en");
        assert_eq!(f.request().unwrap().entity_type, "user");
    }

    #[test]
    fn resolve_all_fills_each_field() {
        let cache = Cache::default()
            .with("title", "it", "Scuola")
            .with("content", "it", "Primo giorno");
        let mut fields = vec![
            title("School", "it"),
            TranslatedField::new(EntityKind::News, Some(3), "content", "First day", "it"),
            TranslatedField::new(EntityKind::News, Some(3), "summary", "Short", "it"),
        ];
        resolve_all(&mut fields, &cache);
        let texts: Vec<&str> = fields.iter().map(|f| f.text()).collect();
        assert_eq!(texts, vec!["Scuola", "Primo giorno", "Short"]);
        assert_eq!(cache.calls.load(Ordering::SeqCst), 3);
    }
}
