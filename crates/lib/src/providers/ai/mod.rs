pub mod claude;
pub mod openai;

use crate::{config::ProviderConfig, errors::PromptError};
use async_trait::async_trait;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Sampling temperature used for SQL generation.
pub const GENERATION_TEMPERATURE: f32 = 0.1;

/// Output token cap, enough for one statement.
pub const GENERATION_MAX_TOKENS: u32 = 1000;

/// The closed set of supported language-model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Claude,
}

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [ProviderId::OpenAi, ProviderId::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Claude => "claude",
        }
    }

    /// The model used until the configuration says otherwise.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "gpt-3.5-turbo",
            ProviderId::Claude => "claude-3-opus-20240229",
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderId::Claude => "https://api.anthropic.com/v1/messages",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OPENAI_API_KEY",
            ProviderId::Claude => "CLAUDE_API_KEY",
        }
    }

    /// Environment variable overriding the model name.
    pub fn model_var(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OPENAI_MODEL",
            ProviderId::Claude => "CLAUDE_MODEL",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ProviderId::OpenAi),
            "claude" => Ok(ProviderId::Claude),
            other => Err(PromptError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// A trait for interacting with an AI provider.
///
/// Each implementation owns the request/response envelope of one backend and
/// normalizes the reply into the raw text the model produced.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Which backend this implementation talks to.
    fn id(&self) -> ProviderId;

    /// Sends a single completion request using the given configuration snapshot.
    async fn generate(&self, prompt: &str, config: &ProviderConfig)
        -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);

/// Returns the API key from a snapshot, treating an empty string as absent.
pub(crate) fn require_api_key(
    provider: ProviderId,
    config: &ProviderConfig,
) -> Result<&str, PromptError> {
    config
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or(PromptError::MissingCredential(provider))
}
