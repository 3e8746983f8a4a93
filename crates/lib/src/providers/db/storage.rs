use crate::{errors::PromptError, schema::SchemaModel};
use async_trait::async_trait;
use dyn_clone::DynClone;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Rows returned by a `QueryExecutor`, already reduced to transport-safe scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
}

/// A source of schema snapshots for the synthesis pipeline.
#[async_trait]
pub trait SchemaProvider: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "SQLite").
    fn name(&self) -> &str;

    /// Introspects the connected database.
    ///
    /// Fails with `SchemaUnavailable` when no connection is active and with
    /// `EmptySchema` when the database has no tables.
    async fn fetch_schema(&self) -> Result<SchemaModel, PromptError>;
}

/// Runs SQL produced by the pipeline. Execution is never part of synthesis itself.
#[async_trait]
pub trait QueryExecutor: Send + Sync + DynClone + Debug {
    /// Verifies that the database answers a trivial query.
    async fn test_connection(&self) -> Result<(), PromptError>;

    /// Executes a statement and returns its rows.
    async fn execute(&self, sql: &str) -> Result<QueryResult, PromptError>;
}

dyn_clone::clone_trait_object!(SchemaProvider);
dyn_clone::clone_trait_object!(QueryExecutor);
