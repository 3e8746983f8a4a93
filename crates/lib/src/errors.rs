use crate::providers::ai::ProviderId;
use thiserror::Error;

/// Custom error types for the synthesis pipeline.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("No database schema information available")]
    EmptySchema,
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),
    #[error("{0} API key not configured")]
    MissingCredential(ProviderId),
    #[error("Request to {provider} failed: {message}")]
    ProviderRequest {
        provider: ProviderId,
        message: String,
    },
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Failed to connect to storage: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PromptError {
    /// Builds a `ProviderRequest` error from anything displayable coming back from upstream.
    pub(crate) fn provider(provider: ProviderId, message: impl ToString) -> Self {
        PromptError::ProviderRequest {
            provider,
            message: message.to_string(),
        }
    }
}
