//! Configuration management for filechat
//!
//! Settings live in `.filechat/config.toml` inside the project directory, with a
//! fallback to `filechat/config.toml` under the user's config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-project configuration directory
pub const CONFIG_DIR_NAME: &str = ".filechat";

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur during configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error while reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The API key environment variable is not set
    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure for filechat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Model API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Directory the configuration was loaded for
    #[serde(skip)]
    pub project_root: Option<PathBuf>,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens the model may generate per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Consecutive tool rounds allowed before the session stops.
    /// Unset means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_rounds: Option<u32>,

    /// Optional system prompt sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}

fn default_max_tokens() -> usize {
    2048
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_tool_rounds: None,
            system_prompt: None,
        }
    }
}

/// Model API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the Messages API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey(self.api_key_env.clone())),
        }
    }
}

impl Config {
    /// Load configuration for a project directory.
    ///
    /// Tries the project file first, then the user-level file. Returns the
    /// default configuration when neither exists.
    pub fn load<P: AsRef<Path>>(project_root: P) -> Result<Self, ConfigError> {
        let project_root = project_root.as_ref();
        let candidates = [Some(Self::project_config_path(project_root)), Self::user_config_path()];

        let mut config = match candidates.into_iter().flatten().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_file(&path)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        };

        config.project_root = Some(project_root.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the project's `.filechat` directory
    pub fn save<P: AsRef<Path>>(&self, project_root: P) -> Result<(), ConfigError> {
        let config_dir = project_root.as_ref().join(CONFIG_DIR_NAME);

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(config_dir.join(CONFIG_FILE_NAME), contents)?;

        Ok(())
    }

    /// Check values that the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.model.trim().is_empty() {
            return Err(ConfigError::Invalid("agent.model must not be empty".to_string()));
        }
        if self.agent.max_tokens == 0 {
            return Err(ConfigError::Invalid("agent.max_tokens must be positive".to_string()));
        }
        if self.agent.max_tool_rounds == Some(0) {
            return Err(ConfigError::Invalid(
                "agent.max_tool_rounds must be positive when set".to_string(),
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Path of the project-level config file
    pub fn project_config_path<P: AsRef<Path>>(project_root: P) -> PathBuf {
        project_root.as_ref().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Path of the user-level config file, if the platform has a config directory
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("filechat").join(CONFIG_FILE_NAME))
    }
}
