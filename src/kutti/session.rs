//! # Session Context
//!
//! Holds the signed-in user for the lifetime of the console. The context is
//! created once at startup and passed to whatever needs it; nothing reads the
//! persisted session behind its back.
//!
//! [`SessionContext::bootstrap`] reads the store exactly once. Until then the
//! context reports itself as uninitialized, which the route guard turns into
//! a loading state instead of a redirect. A stored value that does not parse
//! is removed and the user is treated as signed out.

use std::io::ErrorKind;
use tracing::{info, warn};

use crate::error::{KuttiError, Result};
use crate::model::{Role, Session, User};
use crate::store::SessionStore;

pub struct SessionContext<S: SessionStore> {
    store: S,
    current: Option<Session>,
    initialized: bool,
}

impl<S: SessionStore> SessionContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
            initialized: false,
        }
    }

    pub fn bootstrap(&mut self) -> Result<Option<&Session>> {
        if !self.initialized {
            let raw = match self.store.load_raw() {
                Ok(raw) => raw.map(|raw| parse_session(&raw)),
                // Not UTF-8; same as any other unparseable value
                Err(KuttiError::Io(e)) if e.kind() == ErrorKind::InvalidData => Some(None),
                Err(e) => return Err(e),
            };
            self.current = match raw {
                Some(Some(session)) => Some(session),
                Some(None) => {
                    warn!("discarding unreadable stored session");
                    self.store.clear()?;
                    None
                }
                None => None,
            };
            self.initialized = true;
        }
        Ok(self.current.as_ref())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn sign_in(&mut self, user: User) -> Result<&Session> {
        let session = Session::new(user);
        self.store.save_raw(&serde_json::to_string_pretty(&session)?)?;
        info!(user = %session.user.username, role = %session.role(), "signed in");
        self.initialized = true;
        Ok(self.current.insert(session))
    }

    /// Forgets the session; returns the one that was active, if any.
    pub fn sign_out(&mut self) -> Result<Option<Session>> {
        self.store.clear()?;
        self.initialized = true;
        let previous = self.current.take();
        if let Some(session) = &previous {
            info!(user = %session.user.username, "signed out");
        }
        Ok(previous)
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    pub fn role(&self) -> Option<Role> {
        self.current.as_ref().map(Session::role)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

// Accepts a bare user object too, the shape older clients stored.
fn parse_session(raw: &str) -> Option<Session> {
    serde_json::from_str::<Session>(raw)
        .ok()
        .or_else(|| serde_json::from_str::<User>(raw).ok().map(Session::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemorySessionStore;
    use crate::store::fs::FileSessionStore;
    use serde_json::json;

    fn anna() -> User {
        serde_json::from_value(json!({
            "id": 1,
            "username": "anna",
            "role": "admin"
        }))
        .unwrap()
    }

    #[test]
    fn starts_uninitialized_and_empty() {
        let mut ctx = SessionContext::new(InMemorySessionStore::new());
        assert!(!ctx.is_initialized());
        assert!(ctx.bootstrap().unwrap().is_none());
        assert!(ctx.is_initialized());
    }

    #[test]
    fn sign_in_persists_and_survives_restart() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut ctx = SessionContext::new(FileSessionStore::new(dir.path().to_path_buf()));
        ctx.bootstrap().unwrap();
        let id = ctx.sign_in(anna()).unwrap().id;

        let mut again = SessionContext::new(FileSessionStore::new(dir.path().to_path_buf()));
        let session = again.bootstrap().unwrap().unwrap();
        assert_eq!(session.id, id);
        assert_eq!(again.role(), Some(Role::Admin));
    }

    #[test]
    fn corrupt_value_is_discarded() {
        let mut ctx = SessionContext::new(InMemorySessionStore::with_raw("{not json"));
        assert!(ctx.bootstrap().unwrap().is_none());
        assert_eq!(ctx.store().raw(), None);
    }

    #[test]
    fn non_utf8_session_file_is_discarded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(crate::store::fs::SESSION_FILE);
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let mut ctx = SessionContext::new(FileSessionStore::new(dir.path().to_path_buf()));
        assert!(ctx.bootstrap().unwrap().is_none());
        assert!(ctx.is_initialized());
        assert!(!path.exists());

        ctx.sign_in(anna()).unwrap();
        assert_eq!(ctx.role(), Some(Role::Admin));
    }

    #[test]
    fn bare_user_object_is_accepted() {
        let raw = serde_json::to_string(&anna()).unwrap();
        let mut ctx = SessionContext::new(InMemorySessionStore::with_raw(raw));
        let session = ctx.bootstrap().unwrap().unwrap();
        assert_eq!(session.user.username, "anna");
    }

    #[test]
    fn bootstrap_reads_only_once() {
        let mut ctx = SessionContext::new(InMemorySessionStore::new());
        ctx.bootstrap().unwrap();
        ctx.sign_in(anna()).unwrap();
        assert!(ctx.bootstrap().unwrap().is_some());
    }

    #[test]
    fn sign_out_clears_store() {
        let mut ctx = SessionContext::new(InMemorySessionStore::new());
        ctx.sign_in(anna()).unwrap();
        let previous = ctx.sign_out().unwrap();
        assert_eq!(previous.unwrap().user.username, "anna");
        assert!(ctx.current().is_none());
        assert_eq!(ctx.store().raw(), None);
        assert!(ctx.sign_out().unwrap().is_none());
    }
}
