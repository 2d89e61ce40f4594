mod secrets;

pub use secrets::SecretSource;

use crate::constants::defaults;
use crate::error::{ConfigError, FinteamError};
use crate::llm::ModelRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// `provider:id`, e.g. `openai:gpt-4o`
    pub reference: ModelRef,
    /// Overrides the provider's default key variable (`OPENAI_API_KEY`, ...)
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    /// Secret file consulted after the process environment
    pub secret_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub search_max_results: usize,
    pub news_max_results: usize,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub search_base_url: String,
    pub finance_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub show_tool_calls: bool,
    pub markdown: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            reference: ModelRef::default(),
            api_key_env: None,
            base_url: None,
            secret_file: PathBuf::from(defaults::SECRET_FILE),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            stream: true,
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            search_max_results: defaults::SEARCH_MAX_RESULTS,
            news_max_results: defaults::NEWS_MAX_RESULTS,
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
            user_agent: defaults::USER_AGENT.to_string(),
            search_base_url: crate::constants::endpoints::DUCKDUCKGO_HTML_URL.to_string(),
            finance_base_url: crate::constants::endpoints::YAHOO_FINANCE_URL.to_string(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_tool_calls: true,
            markdown: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finteam")
            .join("config.toml")
    }

    /// Loads the user config, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), "ignoring config file: {e}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, FinteamError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, FinteamError> {
        toml::from_str(content).map_err(|e| ConfigError::Settings(e.to_string()).into())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), FinteamError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Settings(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tools.http_timeout_secs)
    }
}
