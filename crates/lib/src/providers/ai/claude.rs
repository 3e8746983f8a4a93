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

/// The Messages API version this provider speaks.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Claude-specific request and response structures ---

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// --- Claude Provider implementation ---

/// A provider for interacting with the Anthropic Messages API.
#[derive(Clone, Debug)]
pub struct ClaudeProvider {
    client: ReqwestClient,
}

impl ClaudeProvider {
    /// Creates a new `ClaudeProvider` whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AiProvider for ClaudeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    async fn generate(&self, prompt: &str, config: &ProviderConfig) -> Result<String, PromptError> {
        let provider = self.id();
        let api_key = require_api_key(provider, config)?;

        let request_body = ClaudeRequest {
            model: &config.model_name,
            max_tokens: GENERATION_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(url = %config.api_url, model = %config.model_name, "--> Sending prompt to Claude");

        let response = self
            .client
            .post(&config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| PromptError::provider(provider, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptError::provider(provider, format!("{status}: {error_text}")));
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| PromptError::provider(provider, e))?;

        claude_response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| PromptError::provider(provider, "response contained no text block"))
    }
}
