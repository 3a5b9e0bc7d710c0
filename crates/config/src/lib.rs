//! Configuration management for tatty
//!
//! Settings are layered: built-in defaults, then the JSON config file, then a
//! `.env` file, then `TATTY_*` environment variables, then explicit overrides
//! from the caller.
//! Every layer that changes a value is recorded in [`Config::sources`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_home};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Model endpoint credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Agent loop defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Safety ceiling for nested sub-agents. Unset leaves only the agent's
    /// built-in nesting limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_iterations: default_max_iterations(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_depth: None,
            working_dir: default_working_dir(),
        }
    }
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_max_iterations() -> u32 {
    20
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_working_dir() -> String {
    ".".to_string()
}

/// Built-in tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,
    #[serde(default = "default_enable_shell")]
    pub enable_shell: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            exec_timeout_secs: default_exec_timeout(),
            enable_shell: default_enable_shell(),
        }
    }
}

fn default_exec_timeout() -> u64 {
    120
}

fn default_enable_shell() -> bool {
    true
}

/// Values supplied directly by the caller (usually CLI flags)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub working_dir: Option<String>,
    pub model: Option<String>,
    pub max_iterations: Option<u32>,
    pub max_depth: Option<u32>,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentDefaults,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(skip)]
    sources: Vec<String>,
}

impl Config {
    /// Load the default config file, then any `.env` file, then the process
    /// environment
    pub async fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path()).await?;
        config.load_dotenv()?;
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific file. A missing file yields the defaults.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.sources.push(format!("file:{}", path.display()));
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        self.save_to(&config_path()).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply the first `.env` file found, if any.
    ///
    /// Looks at `.env`, `.env.local` and `config/.env` in the current
    /// directory, then `.env` in the configured working directory.
    pub fn load_dotenv(&mut self) -> Result<Option<PathBuf>> {
        let candidates = [
            PathBuf::from(".env"),
            PathBuf::from(".env.local"),
            PathBuf::from("config").join(".env"),
            self.working_dir().join(".env"),
        ];

        match candidates.into_iter().find(|path| path.is_file()) {
            Some(path) => {
                self.apply_dotenv_file(&path)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// Apply `TATTY_*` entries from a `.env` file. The process environment is
    /// left untouched, so a later [`Config::apply_env`] still wins.
    pub fn apply_dotenv_file(&mut self, path: &Path) -> Result<()> {
        debug!("Reading .env from {:?}", path);
        let vars: HashMap<String, String> =
            dotenvy::from_path_iter(path)?.collect::<std::result::Result<_, _>>()?;

        let applied = self.apply_vars(vars);
        if !applied.is_empty() {
            self.sources.push(format!("dotenv:{}", path.display()));
        }
        Ok(())
    }

    /// Apply `TATTY_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(std::env::vars());
    }

    /// Apply `TATTY_*` variables from the given key/value pairs
    pub fn apply_env_from<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        for name in self.apply_vars(vars) {
            self.sources.push(format!("env:{}", name));
        }
    }

    /// Apply recognised variables, returning the names that changed a value
    fn apply_vars(&mut self, vars: HashMap<String, String>) -> Vec<&'static str> {
        let mut applied = Vec::new();

        let key_var = ["TATTY_API_KEY", "OPENAI_API_KEY"]
            .into_iter()
            .find(|name| vars.contains_key(*name));
        if let Some(name) = key_var {
            self.provider.api_key = vars[name].clone();
            applied.push(name);
        }

        if let Some(value) = vars.get("TATTY_API_BASE") {
            self.provider.api_base = Some(value.clone());
            applied.push("TATTY_API_BASE");
        }
        if let Some(value) = vars.get("TATTY_MODEL") {
            self.agent.model = value.clone();
            applied.push("TATTY_MODEL");
        }
        if let Some(value) = vars.get("TATTY_WORKING_DIR") {
            self.agent.working_dir = value.clone();
            applied.push("TATTY_WORKING_DIR");
        }
        if let Some(value) = vars.get("TATTY_MAX_ITERATIONS") {
            if let Some(n) = parse_number("TATTY_MAX_ITERATIONS", value) {
                self.agent.max_iterations = n;
                applied.push("TATTY_MAX_ITERATIONS");
            }
        }
        if let Some(value) = vars.get("TATTY_MAX_DEPTH") {
            if let Some(n) = parse_number("TATTY_MAX_DEPTH", value) {
                self.agent.max_depth = Some(n);
                applied.push("TATTY_MAX_DEPTH");
            }
        }
        if let Some(value) = vars.get("TATTY_TEMPERATURE") {
            if let Some(t) = parse_number("TATTY_TEMPERATURE", value) {
                self.agent.temperature = t;
                applied.push("TATTY_TEMPERATURE");
            }
        }
        if let Some(value) = vars.get("TATTY_EXEC_TIMEOUT") {
            if let Some(secs) = parse_number("TATTY_EXEC_TIMEOUT", value) {
                self.tools.exec_timeout_secs = secs;
                applied.push("TATTY_EXEC_TIMEOUT");
            }
        }
        if let Some(value) = vars.get("TATTY_ENABLE_SHELL") {
            self.tools.enable_shell = parse_bool(value);
            applied.push("TATTY_ENABLE_SHELL");
        }

        applied
    }

    /// Apply caller overrides; `None` fields leave the current value alone
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.working_dir {
            self.agent.working_dir = dir.clone();
            self.sources.push("arg:working_dir".to_string());
        }
        if let Some(model) = &overrides.model {
            self.agent.model = model.clone();
            self.sources.push("arg:model".to_string());
        }
        if let Some(n) = overrides.max_iterations {
            self.agent.max_iterations = n;
            self.sources.push("arg:max_iterations".to_string());
        }
        if let Some(n) = overrides.max_depth {
            self.agent.max_depth = Some(n);
            self.sources.push("arg:max_depth".to_string());
        }
    }

    /// Where the current values came from, in application order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Working directory with `~` expanded
    pub fn working_dir(&self) -> PathBuf {
        expand_home(&self.agent.working_dir)
    }

    /// API key, if one is configured
    pub fn api_key(&self) -> Option<String> {
        if self.provider.api_key.is_empty() {
            None
        } else {
            Some(self.provider.api_key.clone())
        }
    }

    /// API base URL, if one is configured
    pub fn api_base(&self) -> Option<String> {
        self.provider
            .api_base
            .as_ref()
            .filter(|base| !base.is_empty())
            .cloned()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// API key reduced to its last four characters for display
    pub fn masked_api_key(&self) -> String {
        match self.api_key() {
            Some(key) => {
                let tail: String = key
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("***{}", tail)
            }
            None => "Not set".to_string(),
        }
    }
}

/// Write the default config file unless one already exists
pub async fn init() -> Result<Config> {
    let path = config_path();

    if path.exists() {
        warn!("Config already exists at {:?}", path);
    } else {
        Config::default().save_to(&path).await?;
        info!("Config created at {:?}", path);
    }

    Config::load_from(&path).await
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring {}: {:?} is not a valid number", name, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_truthy_words() {
        for value in ["true", "TRUE", "1", "yes", "on", "enabled", " On "] {
            assert!(parse_bool(value), "{} should be true", value);
        }
        for value in ["false", "0", "no", "off", ""] {
            assert!(!parse_bool(value), "{} should be false", value);
        }
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert_eq!(parse_number::<u32>("X", "42"), Some(42));
        assert_eq!(parse_number::<u32>("X", "forty"), None);
        assert_eq!(parse_number::<f32>("X", "0.25"), Some(0.25));
    }

    #[test]
    fn test_masked_api_key() {
        let mut config = Config::default();
        assert_eq!(config.masked_api_key(), "Not set");

        config.provider.api_key = "sk-abcdef1234".to_string();
        assert_eq!(config.masked_api_key(), "***1234");

        config.provider.api_key = "ab".to_string();
        assert_eq!(config.masked_api_key(), "***ab");
    }

    #[test]
    fn test_api_base_ignores_empty_string() {
        let mut config = Config::default();
        config.provider.api_base = Some(String::new());
        assert_eq!(config.api_base(), None);

        config.provider.api_base = Some("http://localhost:8000/v1".to_string());
        assert_eq!(config.api_base().as_deref(), Some("http://localhost:8000/v1"));
    }
}
