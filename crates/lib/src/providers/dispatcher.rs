//! # Provider Dispatcher
//!
//! Resolves a provider identifier against the closed set of registered backends and
//! sends exactly one completion request with the caller's configuration snapshot.
//! Failures are returned as-is; retry policy belongs to the caller.

use crate::{
    config::ProviderConfig,
    errors::PromptError,
    providers::ai::{claude::ClaudeProvider, openai::OpenAiProvider, AiProvider, ProviderId},
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default upper bound for a single provider request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ProviderDispatcher {
    providers: HashMap<ProviderId, Box<dyn AiProvider>>,
}

impl ProviderDispatcher {
    /// Registers the OpenAI and Claude backends with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, PromptError> {
        Ok(Self::empty()
            .with_provider(Box::new(OpenAiProvider::new(timeout)?))
            .with_provider(Box::new(ClaudeProvider::new(timeout)?)))
    }

    /// A dispatcher with no backends; every call fails until one is registered.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registers `provider` under its own id, replacing any previous backend.
    pub fn with_provider(mut self, provider: Box<dyn AiProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    /// Resolves a provider identifier to a registered backend.
    pub fn resolve(&self, provider_id: &str) -> Result<&dyn AiProvider, PromptError> {
        let id: ProviderId = provider_id.parse()?;
        self.providers
            .get(&id)
            .map(|p| p.as_ref())
            .ok_or_else(|| PromptError::UnsupportedProvider(provider_id.to_string()))
    }

    /// Sends `prompt` to the provider named by `provider_id` and returns its raw text.
    ///
    /// The credential check happens before any network activity.
    pub async fn generate(
        &self,
        provider_id: &str,
        prompt: &str,
        config: &ProviderConfig,
    ) -> Result<String, PromptError> {
        let provider = self.resolve(provider_id)?;
        let id = provider.id();
        if !config.has_api_key() {
            warn!(provider = %id, "Provider selected without an API key");
            return Err(PromptError::MissingCredential(id));
        }

        info!(provider = %id, model = %config.model_name, "Dispatching SQL generation request");
        match provider.generate(prompt, config).await {
            Ok(raw) => {
                debug!(provider = %id, "<-- Raw response from provider: {}", raw);
                Ok(raw)
            }
            Err(e) => {
                warn!(provider = %id, error = %e, "Provider request failed");
                Err(e)
            }
        }
    }
}
