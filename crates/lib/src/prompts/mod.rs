//! # Prompt Templates
//!
//! Prompt construction for the SQL synthesis pipeline.

pub mod core;

pub use self::core::{build_prompt, build_prompt_for_dialect, DEFAULT_DIALECT};
