use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::KuttiConfig;
use crate::error::{KuttiError, Result};
use crate::grid::{ColumnDescriptor, PageWindow, ViewMode};
use crate::model::{record_id, EntityKind, Record, RecordId, Role, Session};
use crate::registry::{descriptor, Permissions};
use crate::session::SessionContext;
use crate::shell::{NavItem, Route, RouteDecision};
use crate::store::SessionStore;

pub mod config;
pub mod create;
pub mod delete;
pub mod export;
pub mod helpers;
pub mod list;
pub mod login;
pub mod route;
pub mod update;
pub mod view;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// A listing column as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub key: String,
    pub label: String,
}

impl From<&ColumnDescriptor> for ColumnHeader {
    fn from(column: &ColumnDescriptor) -> Self {
        Self {
            key: column.key.clone(),
            label: column.label.clone(),
        }
    }
}

/// One page of an entity listing with its cells already rendered.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub kind: EntityKind,
    pub columns: Vec<ColumnHeader>,
    pub ids: Vec<Option<RecordId>>,
    pub cells: Vec<Vec<String>>,
    pub total_count: usize,
    pub unfiltered_count: usize,
    /// Search or any filter is narrowing the rows.
    pub filtered: bool,
    pub active_filters: usize,
    pub pagination: PageWindow,
    pub view_mode: ViewMode,
}

impl Listing {
    /// "N results", plus the unfiltered count while anything narrows the rows.
    pub fn summary(&self) -> String {
        let noun = if self.total_count == 1 {
            "result"
        } else {
            "results"
        };
        if self.filtered {
            format!(
                "{} {} (filtered from {} total)",
                self.total_count, noun, self.unfiltered_count
            )
        } else {
            format!("{} {}", self.total_count, noun)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailField {
    pub key: String,
    pub label: String,
    pub value: String,
    pub translated: bool,
}

/// A single record laid out for reading.
#[derive(Debug, Clone, Serialize)]
pub struct Detail {
    pub kind: EntityKind,
    pub id: RecordId,
    pub title: String,
    pub fields: Vec<DetailField>,
    pub media: Vec<String>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub route: String,
    pub decision: RouteDecision,
    pub nav: Vec<NavItem>,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub affected_records: Vec<Record>,
    pub listing: Option<Listing>,
    pub detail: Option<Detail>,
    pub session: Option<Session>,
    pub route: Option<RouteReport>,
    pub config: Option<KuttiConfig>,
    pub exported: Option<PathBuf>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_records(mut self, records: Vec<Record>) -> Self {
        self.affected_records = records;
        self
    }

    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_route(mut self, route: RouteReport) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_config(mut self, config: KuttiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_exported(mut self, path: PathBuf) -> Self {
        self.exported = Some(path);
        self
    }
}

/// What a command needs to know about the caller.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    View,
    Create,
    Edit,
    Delete,
}

impl Access {
    fn allowed(self, permissions: &Permissions, role: Role) -> bool {
        match self {
            Access::View => permissions.can_view(role),
            Access::Create => permissions.can_create(role),
            Access::Edit => permissions.can_edit(role),
            Access::Delete => permissions.can_delete(role),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Access::View => "view",
            Access::Create => "create",
            Access::Edit => "edit",
            Access::Delete => "delete",
        }
    }
}

/// The signed-in session, if it may act on `kind`.
///
/// Runs the same gate as the shell's router for the entity's section, then
/// the entity's permission for the specific action.
pub fn authorize<S: SessionStore>(
    session: &SessionContext<S>,
    kind: EntityKind,
    access: Access,
) -> Result<&Session> {
    let route = match kind {
        EntityKind::Children => Route::Children,
        EntityKind::News => Route::News,
        EntityKind::Missions => Route::Missions,
        EntityKind::Users => Route::Users,
    };
    let current = session
        .current()
        .ok_or_else(|| KuttiError::Unauthorized("Sign in first (kutti login <username>)".into()))?;
    let role = current.role();
    let denied = || {
        KuttiError::Unauthorized(format!(
            "{}s cannot {} {}",
            crate::shell::role_label(role),
            access.verb(),
            kind
        ))
    };
    if crate::shell::guard(&route, session) != RouteDecision::Render {
        return Err(denied());
    }
    if !access.allowed(&descriptor(kind).permissions, role) {
        return Err(denied());
    }
    Ok(current)
}

/// Finds one record by id in a listing.
pub fn find_record(records: Vec<Record>, kind: EntityKind, id: RecordId) -> Result<Record> {
    records
        .into_iter()
        .find(|r| record_id(r) == Some(id))
        .ok_or_else(|| KuttiError::NotFound(format!("{} {}", kind.singular(), id)))
}

/// Headline for a record: the first non-empty of its usual naming fields.
pub fn record_title(record: &Record) -> String {
    ["name", "title", "full_name", "username"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "(untitled)".to_string())
}
