#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared fixtures and mock providers so tests stay isolated and repeatable.

use askdb::providers::ai::{AiProvider, ProviderId};
use askdb::providers::db::storage::SchemaProvider;
use askdb::{ColumnInfo, PromptError, ProviderConfig, SchemaModel, TableInfo};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::{Arc, Once, RwLock};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber once per test binary.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// `users(id PK, email)` and `orders(id PK, user_id FK, total)`.
pub fn shop_schema() -> SchemaModel {
    SchemaModel::new(vec![
        TableInfo::new(
            "users",
            vec![
                ColumnInfo::new("id", "integer").primary_key(),
                ColumnInfo::new("email", "character varying"),
            ],
        ),
        TableInfo::new(
            "orders",
            vec![
                ColumnInfo::new("id", "integer").primary_key(),
                ColumnInfo::new("user_id", "integer").not_null().foreign_key(),
                ColumnInfo::new("total", "numeric").with_default("0"),
            ],
        ),
    ])
    .expect("fixture schema is valid")
}

// --- Mock AI Provider for Logic Testing ---

/// Records every prompt and the model it was sent with, then replays canned responses.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    id: ProviderId,
    pub call_history: Arc<RwLock<Vec<(String, String)>>>,
    responses: Arc<RwLock<Vec<String>>>,
}

impl MockAiProvider {
    pub fn new(id: ProviderId, responses: Vec<&str>) -> Self {
        Self {
            id,
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(
                responses.into_iter().rev().map(String::from).collect(),
            )),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn generate(&self, prompt: &str, config: &ProviderConfig) -> Result<String, PromptError> {
        self.call_history
            .write()
            .unwrap()
            .push((prompt.to_string(), config.model_name.clone()));

        self.responses
            .write()
            .unwrap()
            .pop()
            .ok_or_else(|| PromptError::ProviderRequest {
                provider: self.id,
                message: "MockAiProvider: no response programmed".to_string(),
            })
    }
}

// --- Mock Schema Provider ---

/// Serves a fixed schema, or fails the way an empty or disconnected database does.
#[derive(Clone, Debug)]
pub enum MockSchemaProvider {
    Fixed(SchemaModel),
    Empty,
    Disconnected,
}

#[async_trait]
impl SchemaProvider for MockSchemaProvider {
    fn name(&self) -> &str {
        "MockDB"
    }

    async fn fetch_schema(&self) -> Result<SchemaModel, PromptError> {
        match self {
            MockSchemaProvider::Fixed(schema) => Ok(schema.clone()),
            MockSchemaProvider::Empty => SchemaModel::from_rows(Vec::new()),
            MockSchemaProvider::Disconnected => Err(PromptError::SchemaUnavailable(
                "no active connection".to_string(),
            )),
        }
    }
}
