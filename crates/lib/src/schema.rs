//! # Schema Model
//!
//! An immutable, normalized snapshot of a relational database's tables and columns.
//! It is built once per connection by a schema provider and then shared by reference
//! with the prompt builder and the reference validator.

use crate::errors::PromptError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A single column as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    /// The database-native type name, e.g. `integer` or `character varying`.
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
}

impl ColumnInfo {
    /// Creates a nullable, non-key column. Use the `primary_key`/`foreign_key`/`not_null`
    /// helpers to adjust it before handing it to a `TableInfo`.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            is_primary_key: false,
            is_foreign_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// A table and its columns in native ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.is_foreign_key)
            .map(|c| c.name.as_str())
    }
}

/// One raw row from a schema introspection query.
///
/// Rows are expected grouped by table and ordered by the column's ordinal position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

/// The normalized schema snapshot.
///
/// Invariants (checked by every constructor): at least one table, unique table names,
/// unique column names within a table. Tables iterate in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TableInfo>", into = "Vec<TableInfo>")]
pub struct SchemaModel {
    tables: Vec<TableInfo>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SchemaModel {
    /// Builds a schema from already grouped tables.
    pub fn new(tables: Vec<TableInfo>) -> Result<Self, PromptError> {
        if tables.is_empty() {
            return Err(PromptError::EmptySchema);
        }

        let mut index = HashMap::with_capacity(tables.len());
        for (position, table) in tables.iter().enumerate() {
            if index.insert(table.name.clone(), position).is_some() {
                return Err(PromptError::InvalidSchema(format!(
                    "duplicate table '{}'",
                    table.name
                )));
            }
            let mut seen = HashSet::with_capacity(table.columns.len());
            for column in &table.columns {
                if !seen.insert(column.name.as_str()) {
                    return Err(PromptError::InvalidSchema(format!(
                        "duplicate column '{}' in table '{}'",
                        column.name, table.name
                    )));
                }
            }
        }

        Ok(Self { tables, index })
    }

    /// Builds a schema from raw introspection rows, preserving column order per table
    /// and table order by first appearance.
    pub fn from_rows<I>(rows: I) -> Result<Self, PromptError>
    where
        I: IntoIterator<Item = SchemaRow>,
    {
        let mut tables: Vec<TableInfo> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let position = *positions.entry(row.table_name.clone()).or_insert_with(|| {
                tables.push(TableInfo::new(row.table_name.clone(), Vec::new()));
                tables.len() - 1
            });
            tables[position].columns.push(ColumnInfo {
                name: row.column_name,
                data_type: row.data_type,
                nullable: row.nullable,
                default: row.default,
                is_primary_key: row.is_primary_key,
                is_foreign_key: row.is_foreign_key,
            });
        }

        Self::new(tables)
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table)
            .is_some_and(|t| t.column(column).is_some())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Always `false` for a constructed schema; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TryFrom<Vec<TableInfo>> for SchemaModel {
    type Error = PromptError;

    fn try_from(tables: Vec<TableInfo>) -> Result<Self, Self::Error> {
        Self::new(tables)
    }
}

impl From<SchemaModel> for Vec<TableInfo> {
    fn from(schema: SchemaModel) -> Self {
        schema.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(table: &str, column: &str, pk: bool) -> SchemaRow {
        SchemaRow {
            table_name: table.to_string(),
            column_name: column.to_string(),
            data_type: "integer".to_string(),
            nullable: !pk,
            default: None,
            is_primary_key: pk,
            is_foreign_key: false,
        }
    }

    #[test]
    fn from_rows_preserves_table_and_column_order() {
        let schema = SchemaModel::from_rows(vec![
            row("users", "id", true),
            row("users", "email", false),
            row("orders", "id", true),
            row("orders", "user_id", false),
        ])
        .unwrap();

        let names: Vec<&str> = schema.table_names().collect();
        assert_eq!(names, vec!["users", "orders"]);
        let users = schema.table("users").unwrap();
        let columns: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["id", "email"]);
        assert_eq!(users.primary_keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn from_rows_rejects_empty_input() {
        let err = SchemaModel::from_rows(Vec::new()).unwrap_err();
        assert!(matches!(err, PromptError::EmptySchema));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let err = SchemaModel::from_rows(vec![row("users", "id", true), row("users", "id", false)])
            .unwrap_err();
        assert!(matches!(err, PromptError::InvalidSchema(_)));
    }

    #[test]
    fn duplicate_table_is_rejected() {
        let err = SchemaModel::new(vec![
            TableInfo::new("users", vec![ColumnInfo::new("id", "integer")]),
            TableInfo::new("users", vec![ColumnInfo::new("email", "text")]),
        ])
        .unwrap_err();
        assert!(matches!(err, PromptError::InvalidSchema(_)));
    }

    #[test]
    fn deserializes_from_json_array() {
        let json = r#"[
            {"name": "users", "columns": [
                {"name": "id", "type": "integer", "nullable": false, "isPrimaryKey": true},
                {"name": "email", "type": "text", "nullable": true}
            ]}
        ]"#;
        let schema: SchemaModel = serde_json::from_str(json).unwrap();
        assert!(schema.has_column("users", "email"));
        assert!(!schema.has_column("users", "emial"));
        assert!(schema.table("users").unwrap().columns[0].is_primary_key);

        let empty: Result<SchemaModel, _> = serde_json::from_str("[]");
        assert!(empty.is_err());
    }
}
