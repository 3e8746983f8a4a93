//! # SQL Generation Prompt
//!
//! Builds the instruction text sent to the language model. The output is a pure
//! function of the schema, the question and the dialect: identical inputs always
//! produce byte-identical prompts.

use crate::schema::{ColumnInfo, SchemaModel, TableInfo};

/// The dialect named in the prompt when none is given.
pub const DEFAULT_DIALECT: &str = "PostgreSQL";

/// Grounding rules appended to every SQL generation prompt.
pub const GROUNDING_RULES: &str = r#"IMPORTANT GUIDELINES:
1. Use ONLY tables and columns that exist in the provided schema
2. Double check that EVERY column you reference actually exists in the specified tables
3. Use proper table and column names EXACTLY as shown in the schema (case-sensitive)
4. If a requested column doesn't exist, do not invent it - use columns that are available
5. Do not add "u.id" or other columns that aren't listed in the schema
6. Pay special attention to table names (they might be singular or plural)
7. If joining tables, ensure the join columns actually exist in both tables
8. Return ONLY the executable SQL query with no explanations or markdown"#;

/// Builds the SQL generation prompt for the default dialect.
pub fn build_prompt(schema: &SchemaModel, question: &str) -> String {
    build_prompt_for_dialect(schema, question, DEFAULT_DIALECT)
}

/// Builds the SQL generation prompt for a specific SQL dialect.
///
/// Values are spliced in a single pass so a question that happens to contain
/// text like `{schema}` is never re-expanded.
pub fn build_prompt_for_dialect(schema: &SchemaModel, question: &str, dialect: &str) -> String {
    let schema_context = format_schema_for_prompt(schema);
    format!(
        r#"
You are a precise {dialect} expert who translates natural language queries into SQL.

{upper_dialect} DATABASE SCHEMA:
{schema_context}

TASK:
Convert this natural language query to {dialect} SQL:
"{question}"

{GROUNDING_RULES}

SQL QUERY:
"#,
        upper_dialect = dialect.to_uppercase(),
    )
}

/// Renders every table block in schema order, separated by a blank line.
pub fn format_schema_for_prompt(schema: &SchemaModel) -> String {
    schema
        .tables()
        .iter()
        .map(format_table)
        .collect::<Vec<String>>()
        .join("\n\n")
}

fn format_table(table: &TableInfo) -> String {
    let mut block = format!("TABLE: {}\n", table.name);

    let primary_keys: Vec<&str> = table.primary_keys().collect();
    if !primary_keys.is_empty() {
        block.push_str(&format!("PRIMARY KEY(S): {}\n", primary_keys.join(", ")));
    }
    let foreign_keys: Vec<&str> = table.foreign_keys().collect();
    if !foreign_keys.is_empty() {
        block.push_str(&format!("FOREIGN KEY(S): {}\n", foreign_keys.join(", ")));
    }

    let columns = table
        .columns
        .iter()
        .map(format_column)
        .collect::<Vec<String>>()
        .join("\n");
    block.push_str("COLUMNS:\n");
    block.push_str(&columns);
    block
}

/// `    - name (Type: <type>, Nullable|NOT NULL[, PRIMARY KEY][, FOREIGN KEY])`
fn format_column(column: &ColumnInfo) -> String {
    let mut details = vec![
        format!("Type: {}", column.data_type),
        if column.nullable { "Nullable" } else { "NOT NULL" }.to_string(),
    ];
    if column.is_primary_key {
        details.push("PRIMARY KEY".to_string());
    }
    if column.is_foreign_key {
        details.push("FOREIGN KEY".to_string());
    }
    format!("    - {} ({})", column.name, details.join(", "))
}
