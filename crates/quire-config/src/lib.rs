//! quire configuration, stored as TOML at `~/.config/quire/config.toml`.
//!
//! ```toml
//! drafts_path = "~/blog/drafts"
//!
//! [editor]
//! history_depth = 200
//! languages = ["ts", "tsx"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting '{setting}' in {config_path}: {reason}")]
    InvalidSetting {
        config_path: PathBuf,
        setting: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the HTML drafts
    pub drafts_path: PathBuf,
    #[serde(default)]
    pub editor: EditorSettings,
}

/// The `[editor]` table. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub history_depth: usize,
    pub copy_feedback_ms: u64,
    pub terminal_copy_feedback_ms: u64,
    pub languages: Vec<String>,
    pub default_package_manager: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_depth: 100,
            copy_feedback_ms: 1000,
            terminal_copy_feedback_ms: 1200,
            languages: ["ts", "tsx", "js", "jsx"].map(String::from).to_vec(),
            default_package_manager: "npm".to_string(),
        }
    }
}

impl Config {
    pub fn new(drafts_path: impl Into<PathBuf>) -> Self {
        Self {
            drafts_path: drafts_path.into(),
            editor: EditorSettings::default(),
        }
    }

    /// `Ok(None)` when there is no config file yet.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.validate(config_path)?;

        config.drafts_path = Self::expand_path(&config.drafts_path).unwrap_or(config.drafts_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/quire");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn validate(&self, config_path: &Path) -> Result<(), ConfigError> {
        let invalid = |setting, reason: &str| ConfigError::InvalidSetting {
            config_path: config_path.to_path_buf(),
            setting,
            reason: reason.to_string(),
        };
        if self.editor.history_depth == 0 {
            return Err(invalid("editor.history_depth", "must be at least 1"));
        }
        if self.editor.languages.is_empty() {
            return Err(invalid("editor.languages", "must name at least one language"));
        }
        Ok(())
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}
