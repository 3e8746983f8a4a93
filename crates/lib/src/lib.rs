//! # Natural Language to SQL
//!
//! This crate turns a natural-language question and a relational schema snapshot into
//! a candidate SQL statement using a configurable AI provider, then cross-checks the
//! statement's alias-qualified table and column references against that schema.
//!
//! The validation report is advisory: SQL is always returned when generation succeeds.

pub mod config;
pub mod errors;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod synthesizer;
pub mod validator;

pub use config::{ConfigStore, ProviderConfig, ProviderConfigUpdate, ProviderSummary};
pub use errors::PromptError;
pub use providers::ai::ProviderId;
pub use schema::{ColumnInfo, SchemaModel, SchemaRow, TableInfo};
pub use synthesizer::{GenerationRequest, SqlSynthesizer, SynthesisResult};
pub use validator::{IssueKind, ValidationIssue, ValidationReport};
