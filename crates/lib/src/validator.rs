//! # Reference Validator
//!
//! A heuristic, advisory check of generated SQL against the schema it was generated
//! from. Only alias-qualified column references (`u.email`) whose alias was bound in a
//! `FROM`/`JOIN` clause are checked, which keeps false positives low at the cost of
//! missing unqualified references. The SQL text is never modified, and a scan that
//! cannot run degrades to an empty report instead of an error.

use crate::schema::SchemaModel;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Matches `FROM <table>` and `JOIN <table>`. The table may be double-quoted and
/// schema-qualified. The alias is probed separately so a keyword following the
/// table is never consumed and the next `JOIN` stays visible to the scan.
const TABLE_PATTERN: &str = r#"(?i)\b(?:FROM|JOIN)\s+((?:"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)(?:\.(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*))?)"#;

/// Matches `[AS] <alias>` directly after a table reference.
const ALIAS_PATTERN: &str = r"(?i)^\s+(?:AS\s+)?([A-Za-z_][A-Za-z0-9_]*)";

/// Words that can follow a table reference without being an alias.
const RESERVED_WORDS: &[&str] = &[
    "AND", "AS", "ASC", "BY", "CASE", "CROSS", "DESC", "ELSE", "END", "EXCEPT", "FETCH", "FOR",
    "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INTERSECT", "IS", "JOIN", "LATERAL",
    "LEFT", "LIMIT", "NATURAL", "NOT", "OFFSET", "ON", "OR", "ORDER", "OUTER", "RETURNING",
    "RIGHT", "SELECT", "SET", "TABLESAMPLE", "THEN", "UNION", "USING", "VALUES", "WHEN", "WHERE",
    "WINDOW", "WITH",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    UnknownTable,
    UnknownColumn,
}

/// A reference in the SQL text that does not exist in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub table_name: String,
    pub column_name: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.column_name) {
            (IssueKind::UnknownColumn, Some(column)) => write!(
                f,
                "Column \"{column}\" not found in table \"{}\"",
                self.table_name
            ),
            _ => write!(f, "Table \"{}\" not found in schema", self.table_name),
        }
    }
}

/// The outcome of a validation pass. Issues are kept in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub has_issues: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn push(&mut self, issue: ValidationIssue) {
        self.has_issues = true;
        self.issues.push(issue);
    }
}

/// Alias to table bindings in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    /// Binds `alias` to `table`. A rebound alias keeps its position and takes the new table.
    pub fn insert(&mut self, alias: String, table: String) {
        match self.entries.iter_mut().find(|(a, _)| *a == alias) {
            Some(entry) => entry.1 = table,
            None => self.entries.push((alias, table)),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}

/// Strips quotes and any schema qualifier: `public."Users"` becomes `Users`.
///
/// Only dots outside quotes separate segments, so `"my.table"` stays `my.table`.
fn normalize_table_name(raw: &str) -> String {
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => start = i + 1,
            _ => {}
        }
    }
    raw[start..].replace('"', "")
}

/// Extracts `alias -> table` bindings from `FROM` and `JOIN` clauses.
pub fn extract_aliases(sql: &str) -> AliasMap {
    let mut aliases = AliasMap::default();
    let (table_re, alias_re) = match (Regex::new(TABLE_PATTERN), Regex::new(ALIAS_PATTERN)) {
        (Ok(table_re), Ok(alias_re)) => (table_re, alias_re),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Alias extraction pattern failed to compile; skipping");
            return aliases;
        }
    };

    for caps in table_re.captures_iter(sql) {
        let (Some(whole), Some(table)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(alias) = alias_re
            .captures(&sql[whole.end()..])
            .and_then(|c| c.get(1))
        else {
            continue;
        };
        let alias = alias.as_str();
        if is_reserved(alias) {
            continue;
        }
        let table_name = normalize_table_name(table.as_str());
        if alias != table_name {
            aliases.insert(alias.to_string(), table_name);
        }
    }
    aliases
}

/// Checks every alias-qualified column reference in `sql` against `schema`.
pub fn validate(sql: &str, schema: &SchemaModel) -> ValidationReport {
    let mut report = ValidationReport::default();
    let aliases = extract_aliases(sql);
    debug!("Detected table aliases: {:?}", aliases);

    for (alias, table_name) in aliases.iter() {
        let pattern = format!(
            r#"\b{}\.(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))"#,
            regex::escape(alias)
        );
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(alias = %alias, error = %e, "Column reference pattern failed to compile; skipping alias");
                continue;
            }
        };

        for caps in re.captures_iter(sql) {
            let Some(column) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            match schema.table(table_name) {
                None => report.push(ValidationIssue {
                    kind: IssueKind::UnknownTable,
                    table_name: table_name.to_string(),
                    column_name: None,
                }),
                Some(table) if table.column(column.as_str()).is_none() => {
                    report.push(ValidationIssue {
                        kind: IssueKind::UnknownColumn,
                        table_name: table_name.to_string(),
                        column_name: Some(column.as_str().to_string()),
                    })
                }
                Some(_) => {}
            }
        }
    }

    report
}
