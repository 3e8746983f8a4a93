//! # SQL Synthesizer
//!
//! The pipeline entry point: prompt construction, provider dispatch and reference
//! validation. Each call is independent; the only shared state is the configuration
//! store, which is read once per call as a snapshot.

use crate::{
    config::{ConfigStore, ProviderConfigUpdate, ProviderSummary},
    errors::PromptError,
    prompts::{build_prompt_for_dialect, DEFAULT_DIALECT},
    providers::{
        ai::ProviderId,
        db::storage::SchemaProvider,
        dispatcher::{ProviderDispatcher, DEFAULT_REQUEST_TIMEOUT},
    },
    schema::SchemaModel,
    validator::{self, ValidationReport},
};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A single synthesis call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub question: &'a str,
    pub schema: &'a SchemaModel,
    pub provider_id: &'a str,
}

/// The SQL produced for a question and the advisory report about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    pub sql: String,
    pub validation: ValidationReport,
    pub provider: ProviderId,
    pub model_name: String,
}

/// Turns natural-language questions into SQL grounded in a schema snapshot.
#[derive(Debug, Clone)]
pub struct SqlSynthesizer {
    dispatcher: ProviderDispatcher,
    config: Arc<ConfigStore>,
    dialect: String,
}

impl SqlSynthesizer {
    pub fn new(dispatcher: ProviderDispatcher, config: Arc<ConfigStore>) -> Self {
        Self {
            dispatcher,
            config,
            dialect: DEFAULT_DIALECT.to_string(),
        }
    }

    /// A synthesizer with the built-in providers and the default request timeout.
    pub fn with_defaults(config: Arc<ConfigStore>) -> Result<Self, PromptError> {
        Ok(Self::new(
            ProviderDispatcher::new(DEFAULT_REQUEST_TIMEOUT)?,
            config,
        ))
    }

    /// Sets the SQL dialect named in the prompt (defaults to PostgreSQL).
    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Generates SQL for `question` against `schema` using `provider_id`.
    ///
    /// The SQL is returned even when the validation report has issues.
    pub async fn synthesize(
        &self,
        question: &str,
        schema: &SchemaModel,
        provider_id: &str,
    ) -> Result<SynthesisResult, PromptError> {
        self.run(GenerationRequest {
            question,
            schema,
            provider_id,
        })
        .await
    }

    /// Fetches the schema from `schema_provider` and then synthesizes.
    ///
    /// Schema failures surface before any provider is contacted.
    pub async fn synthesize_from(
        &self,
        question: &str,
        schema_provider: &dyn SchemaProvider,
        provider_id: &str,
    ) -> Result<SynthesisResult, PromptError> {
        let schema = schema_provider.fetch_schema().await?;
        info!(
            "Using {} schema with tables: {}",
            schema_provider.name(),
            schema.table_names().collect::<Vec<_>>().join(", ")
        );
        self.synthesize(question, &schema, provider_id).await
    }

    /// Runs one request through prompt building, dispatch and validation.
    pub async fn run(&self, request: GenerationRequest<'_>) -> Result<SynthesisResult, PromptError> {
        let question = request.question;
        if question.trim().is_empty() {
            return Err(PromptError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        if request.schema.is_empty() {
            return Err(PromptError::EmptySchema);
        }

        let provider: ProviderId = request.provider_id.parse()?;
        let snapshot = self.config.snapshot(provider);
        info!(provider = %provider, "Generating SQL for question: {:?}", question);

        let prompt = build_prompt_for_dialect(request.schema, question, &self.dialect);
        debug!(prompt = %prompt, "--> Prompt for AI");

        let raw = self
            .dispatcher
            .generate(request.provider_id, &prompt, &snapshot)
            .await
            .inspect_err(|e| error!("SQL generation failed: {e}"))?;

        let sql = extract_sql(&raw);
        let validation = validator::validate(&sql, request.schema);
        if validation.has_issues {
            for issue in &validation.issues {
                warn!(provider = %provider, "Generated SQL may have issues: {issue}");
            }
        }
        info!(provider = %provider, "Generated SQL: {}", sql);

        Ok(SynthesisResult {
            sql,
            validation,
            provider,
            model_name: snapshot.model_name.clone(),
        })
    }

    /// Merges a partial configuration. Returns `false` (and logs) when rejected.
    pub fn update_provider_config(&self, provider_id: &str, update: &ProviderConfigUpdate) -> bool {
        match self.config.update_config(provider_id, update) {
            Ok(()) => true,
            Err(e) => {
                error!("Error updating model configuration: {e}");
                false
            }
        }
    }

    pub fn provider_config_summary(&self) -> BTreeMap<ProviderId, ProviderSummary> {
        self.config.summary()
    }
}

/// Unwraps a Markdown code fence if the model added one; otherwise trims the text.
///
/// Whatever follows the opening fence on its line is the info string (`sql`,
/// `sqlite`, ...) and is dropped. A fence without a newline is unwrapped as is.
pub fn extract_sql(raw: &str) -> String {
    let capture = |pattern: &str| {
        Regex::new(pattern).ok().and_then(|re| {
            re.captures(raw)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
    };
    capture(r"```[^\n`]*\n([\s\S]*?)```")
        .or_else(|| capture(r"```([^\n]*?)```"))
        .unwrap_or_else(|| raw.trim().to_string())
}
