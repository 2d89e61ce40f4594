use crate::config::{SecretSource, Settings};
use crate::constants::{endpoints, models};
use crate::error::{ConfigError, FinteamError};
use crate::llm::{LlmClient, OpenAIClient};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Model providers reachable through the OpenAI chat-completions dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    OpenAI,
    Groq,
    Together,
    OpenRouter,
    Ollama,
}

impl ModelProvider {
    pub fn all() -> [ModelProvider; 5] {
        [
            Self::OpenAI,
            Self::Groq,
            Self::Together,
            Self::OpenRouter,
            Self::Ollama,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Groq => "groq",
            Self::Together => "together",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }

    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Together => "TOGETHER_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Ollama => "",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => endpoints::OPENAI_BASE_URL,
            Self::Groq => endpoints::GROQ_BASE_URL,
            Self::Together => endpoints::TOGETHER_BASE_URL,
            Self::OpenRouter => endpoints::OPENROUTER_BASE_URL,
            Self::Ollama => endpoints::OLLAMA_BASE_URL,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => models::DEFAULT_OPENAI_MODEL,
            Self::Groq => models::DEFAULT_GROQ_MODEL,
            Self::Together => models::DEFAULT_TOGETHER_MODEL,
            Self::OpenRouter => models::DEFAULT_OPENROUTER_MODEL,
            Self::Ollama => models::DEFAULT_OLLAMA_MODEL,
        }
    }
}

impl FromStr for ModelProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidModelRef(s.to_string()))
    }
}

/// Reference to a model: `provider:id`, or a bare id for OpenAI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelRef {
    provider: ModelProvider,
    id: String,
}

impl ModelRef {
    pub fn new(provider: ModelProvider, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
        }
    }

    pub fn openai(id: impl Into<String>) -> Self {
        Self::new(ModelProvider::OpenAI, id)
    }

    pub fn provider(&self) -> ModelProvider {
        self.provider
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Default for ModelRef {
    fn default() -> Self {
        Self::openai(models::DEFAULT_OPENAI_MODEL)
    }
}

impl FromStr for ModelRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (provider, id) = match trimmed.split_once(':') {
            Some((provider, id)) if provider.parse::<ModelProvider>().is_ok() => {
                let provider = provider.parse::<ModelProvider>()?;
                match id.trim() {
                    // `groq:` picks the provider's default model
                    "" => (provider, provider.default_model()),
                    id => (provider, id),
                }
            }
            // Ollama tags (llama3.1:8b) carry colons too; only a known prefix selects a provider
            _ => (ModelProvider::OpenAI, trimmed),
        };
        if id.is_empty() {
            return Err(ConfigError::InvalidModelRef(s.to_string()));
        }
        Ok(Self::new(provider, id))
    }
}

impl TryFrom<String> for ModelRef {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelRef> for String {
    fn from(value: ModelRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider.key(), self.id)
    }
}

/// How a registered provider is reached.
#[derive(Clone)]
pub enum ProviderEndpoint {
    Http {
        api_key: Option<String>,
        base_url: String,
    },
    /// A pre-built client answering for every model id of the provider.
    Client(Arc<dyn LlmClient>),
}

impl fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { api_key, base_url } => f
                .debug_struct("Http")
                .field("api_key", &api_key.as_ref().map(|_| "[REDACTED]"))
                .field("base_url", base_url)
                .finish(),
            Self::Client(client) => f.debug_tuple("Client").field(&client.model()).finish(),
        }
    }
}

/// Resolves [`ModelRef`]s to usable model clients.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    providers: HashMap<ModelProvider, ProviderEndpoint>,
    http: Option<reqwest::Client>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from settings and secrets.
    ///
    /// The configured provider must have its credential available; other
    /// providers are registered only when their key happens to be present.
    pub fn from_settings(settings: &Settings, secrets: &SecretSource) -> Result<Self, FinteamError> {
        let configured = settings.model.reference.provider();
        let mut registry = Self::new();

        for provider in ModelProvider::all() {
            let env = if provider == configured {
                settings
                    .model
                    .api_key_env
                    .clone()
                    .unwrap_or_else(|| provider.default_api_key_env().to_string())
            } else {
                provider.default_api_key_env().to_string()
            };

            let api_key = if provider.needs_api_key() {
                match secrets.get(&env) {
                    Some(key) => Some(key.to_string()),
                    None if provider == configured => {
                        return Err(ConfigError::MissingCredential { env }.into());
                    }
                    None => continue,
                }
            } else {
                None
            };

            let base_url = match (&settings.model.base_url, provider == configured) {
                (Some(url), true) => url.clone(),
                _ => provider.default_base_url().to_string(),
            };

            tracing::debug!(provider = provider.key(), %base_url, "registered model provider");
            registry.providers.insert(provider, ProviderEndpoint::Http { api_key, base_url });
        }

        Ok(registry)
    }

    pub fn with_provider(mut self, provider: ModelProvider, endpoint: ProviderEndpoint) -> Self {
        self.providers.insert(provider, endpoint);
        self
    }

    pub fn with_client(self, provider: ModelProvider, client: Arc<dyn LlmClient>) -> Self {
        self.with_provider(provider, ProviderEndpoint::Client(client))
    }

    /// Shared HTTP client for every model client this registry builds.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn is_registered(&self, provider: ModelProvider) -> bool {
        self.providers.contains_key(&provider)
    }

    /// Checks that `model` can be resolved without building a client.
    pub fn check(&self, model: &ModelRef) -> Result<(), ConfigError> {
        if model.id().trim().is_empty() {
            return Err(ConfigError::UnresolvedModel(
                model.to_string(),
                "empty model id".to_string(),
            ));
        }
        if !self.is_registered(model.provider()) {
            let reason = if model.provider().needs_api_key() {
                format!(
                    "provider '{}' is not configured (is {} set?)",
                    model.provider().key(),
                    model.provider().default_api_key_env()
                )
            } else {
                format!("provider '{}' is not configured", model.provider().key())
            };
            return Err(ConfigError::UnresolvedModel(model.to_string(), reason));
        }
        Ok(())
    }

    pub fn resolve(&self, model: &ModelRef) -> Result<Arc<dyn LlmClient>, ConfigError> {
        self.check(model)?;
        let endpoint = self
            .providers
            .get(&model.provider())
            .ok_or_else(|| ConfigError::UnresolvedModel(model.to_string(), "not registered".into()))?;

        Ok(match endpoint {
            ProviderEndpoint::Client(client) => client.clone(),
            ProviderEndpoint::Http { api_key, base_url } => {
                let mut client =
                    OpenAIClient::new(api_key.clone(), model.id()).with_base_url(base_url.clone());
                if let Some(ref http) = self.http {
                    client = client.with_http_client(http.clone());
                }
                Arc::new(client)
            }
        })
    }
}
