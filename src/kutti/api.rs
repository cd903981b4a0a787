//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single
//! entry point for console operations, whatever UI sits on top.
//!
//! The facade:
//! - **Dispatches** to the matching command function
//! - **Normalizes inputs** (raw `key=value` strings, entity names, the reader's language)
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no business logic, no terminal I/O and no formatting.
//!
//! ## Generic Over Transport And Session Storage
//!
//! `KuttiApi<T: Transport, S: SessionStore>`:
//! - Production: `KuttiApi<HttpTransport, FileSessionStore>`
//! - Testing: `KuttiApi<InMemoryTransport, InMemorySessionStore>`
//!
//! API tests check dispatch and argument plumbing; the command modules test
//! the logic itself.

use std::path::{Path, PathBuf};

use crate::client::Transport;
use crate::commands;
use crate::config::KuttiConfig;
use crate::error::Result;
use crate::model::{EntityKind, RecordId};
use crate::session::SessionContext;
use crate::store::SessionStore;

pub struct KuttiApi<T: Transport, S: SessionStore> {
    transport: T,
    session: SessionContext<S>,
    config: KuttiConfig,
    data_dir: PathBuf,
}

impl<T: Transport + Sync, S: SessionStore> KuttiApi<T, S> {
    pub fn new(transport: T, session: SessionContext<S>, config: KuttiConfig, data_dir: PathBuf) -> Self {
        Self {
            transport,
            session,
            config,
            data_dir,
        }
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<CmdResult> {
        commands::login::login(&self.transport, &mut self.session, username, password)
    }

    pub fn logout(&mut self) -> Result<CmdResult> {
        commands::login::logout(&mut self.session)
    }

    pub fn whoami(&self) -> Result<CmdResult> {
        commands::login::whoami(&self.session)
    }

    pub fn list(&self, kind: EntityKind, query: &ListQuery) -> Result<CmdResult> {
        commands::list::run(
            &self.transport,
            &self.session,
            kind,
            query,
            self.config.page_size,
        )
    }

    /// Shows one record, translated into `language` or else the reader's
    /// own interface language or else the configured one.
    pub fn view(&self, kind: EntityKind, id: RecordId, language: Option<&str>) -> Result<CmdResult> {
        let language = self.reading_language(language);
        commands::view::run(&self.transport, &self.session, kind, id, &language)
    }

    pub fn create<I: AsRef<str>>(
        &self,
        kind: EntityKind,
        assignments: &[I],
        media: Vec<PathBuf>,
    ) -> Result<CmdResult> {
        let input = FormInput {
            values: parse_assignments(assignments)?,
            media,
        };
        commands::create::run(&self.transport, &self.session, kind, &input)
    }

    pub fn update<I: AsRef<str>>(
        &self,
        kind: EntityKind,
        id: RecordId,
        assignments: &[I],
        media: Vec<PathBuf>,
    ) -> Result<CmdResult> {
        let input = FormInput {
            values: parse_assignments(assignments)?,
            media,
        };
        commands::update::run(&self.transport, &self.session, kind, id, &input)
    }

    pub fn delete(&self, kind: EntityKind, id: RecordId, confirmed: bool) -> Result<CmdResult> {
        commands::delete::run(&self.transport, &self.session, kind, id, confirmed)
    }

    pub fn export(&self, kind: EntityKind, query: &ListQuery, dir: &Path) -> Result<CmdResult> {
        commands::export::run(&self.transport, &self.session, kind, query, dir)
    }

    pub fn route(&self, path: &str) -> Result<CmdResult> {
        commands::route::run(&self.session, path)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.data_dir, action)
    }

    pub fn settings(&self) -> &KuttiConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session(&self) -> &SessionContext<S> {
        &self.session
    }

    fn reading_language(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .or_else(|| self.session.user().and_then(|u| u.ui_language.clone()))
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or_else(|| self.config.language.clone())
    }
}

pub use crate::commands::config::ConfigAction;
pub use crate::commands::create::FormInput;
pub use crate::commands::helpers::{parse_assignments, parse_number_assignments};
pub use crate::commands::list::ListQuery;
pub use crate::commands::{CmdMessage, CmdResult, Detail, Listing, MessageLevel, RouteReport};
