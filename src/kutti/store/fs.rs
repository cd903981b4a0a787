use super::SessionStore;
use crate::error::{KuttiError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "session.json";

pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(KuttiError::Io)?;
        }
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load_raw(&self) -> Result<Option<String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(raw))
    }

    fn save_raw(&mut self, raw: &str) -> Result<()> {
        self.ensure_dir(&self.root)?;
        fs::write(self.path(), raw)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
