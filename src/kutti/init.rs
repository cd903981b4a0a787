use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::debug;

use crate::api::KuttiApi;
use crate::client::http::HttpTransport;
use crate::config::KuttiConfig;
use crate::error::{KuttiError, Result};
use crate::session::SessionContext;
use crate::store::fs::FileSessionStore;

/// Overrides the data directory (config and stored session).
pub const HOME_ENV: &str = "KUTTI_HOME";

pub struct KuttiContext {
    pub api: KuttiApi<HttpTransport, FileSessionStore>,
    pub config: KuttiConfig,
}

/// `$KUTTI_HOME` when set, else the platform data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("org", "kutti", "kutti")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| KuttiError::Config("Could not determine the data directory".into()))
}

/// Loads config and the stored session. `api_base` replaces the configured
/// API root for this run only.
pub fn initialize(api_base: Option<&str>) -> Result<KuttiContext> {
    let dir = data_dir()?;
    let mut config = KuttiConfig::load(&dir)?;
    if let Some(base) = api_base {
        config.set("api-base", base)?;
    }
    debug!(dir = %dir.display(), api = %config.api_base, "initializing");

    let transport = HttpTransport::new(&config.api_base, config.timeout());
    let mut session = SessionContext::new(FileSessionStore::new(dir.clone()));
    session.bootstrap()?;

    let api = KuttiApi::new(transport, session, config.clone(), dir);
    Ok(KuttiContext { api, config })
}
