use std::path::Path;

use crate::commands::{CmdMessage, CmdResult};
use crate::config::KuttiConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    ShowAll,
    ShowKey(String),
    Set(String, String),
}

pub fn run(dir: &Path, action: ConfigAction) -> Result<CmdResult> {
    let mut config = KuttiConfig::load(dir)?;
    match action {
        ConfigAction::ShowAll => Ok(CmdResult::default().with_config(config)),
        ConfigAction::ShowKey(key) => {
            let mut result = CmdResult::default();
            match config.get(&key) {
                Some(value) => result.add_message(CmdMessage::info(value)),
                None => {
                    result.add_message(CmdMessage::error(format!("Unknown config key: {}", key)))
                }
            }
            Ok(result)
        }
        ConfigAction::Set(key, value) => {
            if let Err(e) = config.set(&key, &value) {
                let mut result = CmdResult::default();
                result.add_message(CmdMessage::error(e.to_string()));
                return Ok(result);
            }
            config.save(dir)?;
            let shown = config.get(&key).unwrap_or(value);
            let mut result = CmdResult::default().with_config(config);
            result.add_message(CmdMessage::success(format!("{} set to {}", key, shown)));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use tempfile::TempDir;

    #[test]
    fn set_persists_normalized_value() {
        let dir = TempDir::new().unwrap();
        let result = run(
            dir.path(),
            ConfigAction::Set("api-base".into(), "https://api.kutti.org/".into()),
        )
        .unwrap();
        assert_eq!(result.messages[0].content, "api-base set to https://api.kutti.org");

        let shown = run(dir.path(), ConfigAction::ShowKey("api-base".into())).unwrap();
        assert_eq!(shown.messages[0].content, "https://api.kutti.org");
    }

    #[test]
    fn bad_values_are_reported_not_saved() {
        let dir = TempDir::new().unwrap();
        let result = run(dir.path(), ConfigAction::Set("page-size".into(), "7".into())).unwrap();
        assert_eq!(result.messages[0].level, MessageLevel::Error);
        assert!(!dir.path().join("config.json").exists());
    }

    #[test]
    fn show_all_and_unknown_key() {
        let dir = TempDir::new().unwrap();
        let all = run(dir.path(), ConfigAction::ShowAll).unwrap();
        assert_eq!(all.config.unwrap().page_size, 10);
        let unknown = run(dir.path(), ConfigAction::ShowKey("colour".into())).unwrap();
        assert_eq!(unknown.messages[0].level, MessageLevel::Error);
    }
}
