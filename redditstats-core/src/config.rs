use crate::{ConfigError, CoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "redditstats.toml";

pub const ENV_DATABASE_URL: &str = "REDDITSTATS_DATABASE_URL";
pub const ENV_LOG: &str = "REDDITSTATS_LOG";
pub const ENV_OUTPUT: &str = "REDDITSTATS_OUTPUT";
pub const ENV_SUBREDDIT: &str = "REDDITSTATS_SUBREDDIT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::InvalidValue {
                field: "output".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub log_filter: String,
    pub output: OutputFormat,
    pub subreddit: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://reddit_data.db".to_string(),
            log_filter: "redditstats=info,analytics=info,database=info".to_string(),
            output: OutputFormat::Table,
            subreddit: None,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the TOML file, then environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `redditstats.toml` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let config = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        debug!("Reading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CoreError> {
        let config = toml::from_str(contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(output) = lookup(ENV_OUTPUT) {
            self.output = output.parse()?;
        }
        if let Some(subreddit) = lookup(ENV_SUBREDDIT) {
            self.subreddit = Some(subreddit).filter(|name| !name.is_empty());
        }
        Ok(self)
    }
}
