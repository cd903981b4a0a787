//! # Session Storage
//!
//! The signed-in user is remembered between runs under a single key. The
//! [`SessionStore`] trait hides where that key lives so the session logic
//! can be tested without touching the filesystem.
//!
//! ## Implementations
//!
//! - [`fs::FileSessionStore`]: `session.json` inside the data directory
//! - [`memory::InMemorySessionStore`]: no persistence, for tests
//!
//! Stores deal in raw strings. Parsing, and discarding values that do not
//! parse, is the job of [`crate::session::SessionContext`].

use crate::error::Result;

pub mod fs;
pub mod memory;

pub trait SessionStore {
    /// The stored value, or `None` when nothing was saved.
    fn load_raw(&self) -> Result<Option<String>>;

    fn save_raw(&mut self, raw: &str) -> Result<()>;

    /// Removes the stored value; a no-op when there is none.
    fn clear(&mut self) -> Result<()>;
}
