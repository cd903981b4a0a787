use super::SessionStore;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    raw: Option<String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with something already stored, e.g. a corrupt value.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load_raw(&self) -> Result<Option<String>> {
        Ok(self.raw.clone())
    }

    fn save_raw(&mut self, raw: &str) -> Result<()> {
        self.raw = Some(raw.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.raw = None;
        Ok(())
    }
}
