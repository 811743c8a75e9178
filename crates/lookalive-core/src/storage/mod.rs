mod config;

pub use config::{
    BlinkConfig, Config, GazeConfig, NotificationBackend, NotificationsConfig, ProximityConfig,
    StorageConfig, TimerConfig, UiConfig,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `LOOKALIVE_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/lookalive[-dev]/`, with the `-dev` suffix when
/// `LOOKALIVE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("LOOKALIVE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("LOOKALIVE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("lookalive-dev")
            } else {
                base_dir.join("lookalive")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Resolve a configured file name against the data directory.
pub fn resolve_in_data_dir(file: &Path) -> Result<PathBuf, ConfigError> {
    if file.is_absolute() {
        Ok(file.to_path_buf())
    } else {
        Ok(data_dir()?.join(file))
    }
}

/// How a persisted file was obtained.
///
/// Loading never fails: the caller always gets a usable value and this tag
/// says whether it came from disk or is an empty default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded,
    Missing,
    Corrupt { reason: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }

    /// Emit a log line for anything other than a clean load.
    pub fn log(&self, what: &str, path: &Path) {
        match self {
            LoadOutcome::Loaded => tracing::debug!("loaded {what} from {}", path.display()),
            LoadOutcome::Missing => {
                tracing::info!("no {what} at {}, starting empty", path.display())
            }
            LoadOutcome::Corrupt { reason } => tracing::warn!(
                "{what} at {} is unreadable ({reason}), starting empty",
                path.display()
            ),
        }
    }
}

/// Read and parse a JSON document, mapping every failure to a [`LoadOutcome`].
pub(crate) fn load_json<T>(path: &Path) -> (Option<T>, LoadOutcome)
where
    T: for<'de> Deserialize<'de>,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (None, LoadOutcome::Missing),
        Err(e) => {
            return (
                None,
                LoadOutcome::Corrupt {
                    reason: e.to_string(),
                },
            )
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => (Some(value), LoadOutcome::Loaded),
        Err(e) => (
            None,
            LoadOutcome::Corrupt {
                reason: e.to_string(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Doc {
        a: u32,
    }

    #[test]
    fn load_json_distinguishes_missing_and_corrupt() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dir.path().join("nope.json");
        let (value, outcome) = load_json::<Doc>(&missing);
        assert!(value.is_none());
        assert_eq!(outcome, LoadOutcome::Missing);

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        let (value, outcome) = load_json::<Doc>(&corrupt);
        assert!(value.is_none());
        assert!(matches!(outcome, LoadOutcome::Corrupt { .. }));

        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"a": 7}"#).unwrap();
        let (value, outcome) = load_json::<Doc>(&good);
        assert_eq!(value, Some(Doc { a: 7 }));
        assert!(outcome.is_loaded());
    }
}
