use crate::{
    errors::PromptError,
    providers::db::storage::{QueryExecutor, QueryResult, SchemaProvider},
    schema::{SchemaModel, SchemaRow},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt::{self, Debug};
use tracing::{debug, info, warn};
use turso::{Connection, Database, Value as TursoValue};

pub mod sql;

/// Largest integer magnitude a JSON consumer can hold without losing precision (2^53 - 1).
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// A schema provider and query executor for a local SQLite database using Turso.
///
/// When cloned, it shares the same underlying database, so an in-memory database
/// can be populated through one clone and introspected through another.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Opens a database file, or a fresh isolated database for `":memory:"`.
    pub async fn new(db_path: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        // PRAGMA returns a row, so `query` rather than `execute`.
        let conn = db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        info!(db_path = %db_path, "Opened SQLite database");
        Ok(Self { db })
    }

    /// A helper for tests and demos to pre-populate data from `;`-separated statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), PromptError> {
        let conn = self.connect()?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection, PromptError> {
        self.db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))
    }

    async fn list_tables(&self, conn: &Connection) -> Result<Vec<String>, PromptError> {
        let mut rows = conn
            .query(sql::LIST_TABLES, ())
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let mut tables = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?
        {
            if let Ok(TursoValue::Text(name)) = row.get_value(0) {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    /// Columns of `table_name` that reference another table.
    ///
    /// Best-effort: engines without `PRAGMA foreign_key_list` yield an empty set.
    async fn foreign_key_columns(&self, conn: &Connection, table_name: &str) -> HashSet<String> {
        let mut columns = HashSet::new();
        let mut rows = match conn.query(&sql::foreign_key_list(table_name), ()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table_name = %table_name, error = %e, "Foreign key introspection unavailable");
                return columns;
            }
        };
        loop {
            match rows.next().await {
                Ok(Some(row)) => {
                    if let Ok(TursoValue::Text(from)) = row.get_value(3) {
                        columns.insert(from);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(table_name = %table_name, error = %e, "Foreign key introspection aborted");
                    break;
                }
            }
        }
        columns
    }

    async fn table_rows(
        &self,
        conn: &Connection,
        table_name: &str,
    ) -> Result<Vec<SchemaRow>, PromptError> {
        let foreign_keys = self.foreign_key_columns(conn, table_name).await;
        let mut rows = conn
            .query(&sql::table_info(table_name), ())
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let mut schema_rows = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?
        {
            // PRAGMA table_info columns: cid, name, type, notnull, dflt_value, pk
            let Ok(TursoValue::Text(name)) = row.get_value(1) else {
                continue;
            };
            let data_type = match row.get_value(2) {
                Ok(TursoValue::Text(t)) => t,
                _ => String::new(),
            };
            let not_null = matches!(row.get_value(3), Ok(TursoValue::Integer(n)) if n != 0);
            let default = match row.get_value(4) {
                Ok(TursoValue::Null) | Err(_) => None,
                Ok(value) => scalar_to_string(value),
            };
            let is_primary_key = matches!(row.get_value(5), Ok(TursoValue::Integer(n)) if n > 0);

            schema_rows.push(SchemaRow {
                table_name: table_name.to_string(),
                is_foreign_key: foreign_keys.contains(&name),
                column_name: name,
                data_type,
                nullable: !not_null && !is_primary_key,
                default,
                is_primary_key,
            });
        }
        Ok(schema_rows)
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

fn scalar_to_string(value: TursoValue) -> Option<String> {
    match value {
        TursoValue::Null => None,
        TursoValue::Integer(i) => Some(i.to_string()),
        TursoValue::Real(f) => Some(f.to_string()),
        TursoValue::Text(s) => Some(s),
        TursoValue::Blob(b) => Some(hex::encode(b)),
    }
}

/// Converts a Turso value to a transport-safe JSON scalar.
///
/// Integers beyond the exact range of a double become decimal strings and blobs
/// become lowercase hex strings.
pub fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i) => {
            Value::Number(i.into())
        }
        TursoValue::Integer(i) => Value::String(i.to_string()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(b) => Value::String(hex::encode(b)),
    }
}

#[async_trait]
impl SchemaProvider for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    async fn fetch_schema(&self) -> Result<SchemaModel, PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::SchemaUnavailable(e.to_string()))?;

        let tables = self.list_tables(&conn).await?;
        debug!("Found {} tables: {}", tables.len(), tables.join(", "));

        let mut rows = Vec::new();
        for table in &tables {
            rows.extend(self.table_rows(&conn, table).await?);
        }

        let schema = SchemaModel::from_rows(rows)?;
        info!("Fetched schema with {} tables", schema.len());
        Ok(schema)
    }
}

#[async_trait]
impl QueryExecutor for SqliteProvider {
    async fn test_connection(&self) -> Result<(), PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(sql::PING, ())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        rows.next()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<QueryResult, PromptError> {
        debug!(query = %query, "--> Executing SQLite query");

        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(query)
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt
            .query(())
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let mut results: Vec<Map<String, Value>> = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?
        {
            let mut row_map = Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = row
                    .get_value(i)
                    .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
                row_map.insert(name.clone(), turso_value_to_json(value));
            }
            results.push(row_map);
        }

        info!("Query executed successfully. Rows returned: {}", results.len());
        Ok(QueryResult {
            row_count: results.len(),
            rows: results,
        })
    }
}
