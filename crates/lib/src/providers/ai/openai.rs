use crate::{
    config::ProviderConfig,
    errors::PromptError,
    providers::ai::{
        require_api_key, AiProvider, ProviderId, GENERATION_MAX_TOKENS, GENERATION_TEMPERATURE,
    },
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

// --- OpenAI chat completion request and response structures ---

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

// --- OpenAI Provider implementation ---

/// A provider for the OpenAI chat completions API (or any compatible gateway).
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    client: ReqwestClient,
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider` whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn generate(&self, prompt: &str, config: &ProviderConfig) -> Result<String, PromptError> {
        let provider = self.id();
        let api_key = require_api_key(provider, config)?;

        let request_body = OpenAiRequest {
            model: &config.model_name,
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
        };

        debug!(url = %config.api_url, model = %config.model_name, "--> Sending prompt to OpenAI");

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PromptError::provider(provider, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptError::provider(provider, format!("{status}: {error_text}")));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| PromptError::provider(provider, e))?;

        openai_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| PromptError::provider(provider, "response contained no choices"))
    }
}
