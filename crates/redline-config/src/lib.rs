use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Author recorded on marks when nothing better can be resolved
pub const FALLBACK_AUTHOR: &str = "Unknown";

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
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name attributed to every insertion/deletion this user's agent proposes.
    /// Shell variables (`$USER`) and `~` are expanded on load.
    pub author: String,
    /// Whether new marks carry a timestamp
    pub stamp_dates: bool,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Move focus to the next pending unit after accept/reject/apply/discard
    pub advance_on_resolve: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author: "$USER".to_string(),
            stamp_dates: true,
            review: ReviewConfig::default(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            advance_on_resolve: true,
        }
    }
}

impl Config {
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

        config.author = Self::expand_author(&config.author);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load the user's config, or the defaults (with the author expanded) if there is none
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_else(|| {
            let mut config = Config::default();
            config.author = Self::expand_author(&config.author);
            config
        }))
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
        let config_dir = shellexpand::tilde("~/.config/redline");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Expand shell variables in the author name. Unset variables or an empty
    /// result fall back to [`FALLBACK_AUTHOR`] so marks are never anonymous.
    fn expand_author(author: &str) -> String {
        let expanded = match shellexpand::full(author) {
            Ok(expanded) => expanded.trim().to_string(),
            Err(_) => String::new(),
        };
        if expanded.is_empty() {
            FALLBACK_AUTHOR.to_string()
        } else {
            expanded
        }
    }
}
