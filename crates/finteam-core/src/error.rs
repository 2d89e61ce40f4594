use thiserror::Error;

/// Problems detected while building descriptors, teams, or settings.
/// These are raised before anything touches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("agent name cannot be empty")]
    EmptyName,

    #[error("unknown tool capability '{0}' (expected one of: web_search, financial_lookup)")]
    UnknownCapability(String),

    #[error("capability '{capability}' has no feature named '{feature}'")]
    UnknownFeature { capability: String, feature: String },

    #[error("invalid model reference '{0}'")]
    InvalidModelRef(String),

    #[error("model '{0}' cannot be resolved: {1}")]
    UnresolvedModel(String, String),

    #[error("{env} is not set in the environment or the secret file")]
    MissingCredential { env: String },

    #[error("a team needs at least one member")]
    EmptyTeam,

    #[error("duplicate team member name '{0}'")]
    DuplicateMember(String),

    #[error("settings: {0}")]
    Settings(String),
}

#[derive(Error, Debug)]
pub enum FinteamError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Agent '{agent}' exceeded maximum iterations ({limit})")]
    MaxIterations { agent: String, limit: usize },

    #[error("Response stream cancelled")]
    Cancelled,
}

impl FinteamError {
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FinteamError>;
