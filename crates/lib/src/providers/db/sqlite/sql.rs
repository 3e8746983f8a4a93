//! # SQLite Specific SQL Queries
//!
//! This module centralizes the introspection queries used by the SQLite provider.

/// Lists user tables in a stable order. Internal `sqlite_` tables are excluded.
pub const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name;";

/// Cheap round trip used to verify that the database answers.
pub const PING: &str = "SELECT 1;";

/// Column metadata in ordinal order: cid, name, type, notnull, dflt_value, pk.
pub fn table_info(table_name: &str) -> String {
    format!("PRAGMA table_info({});", quote_identifier(table_name))
}

/// Outgoing foreign keys: id, seq, table, from, to, on_update, on_delete, match.
pub fn foreign_key_list(table_name: &str) -> String {
    format!("PRAGMA foreign_key_list({});", quote_identifier(table_name))
}

/// Plain identifiers are passed through; anything else is double-quoted with
/// embedded quotes doubled.
pub fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
