//! Error types for the simulation engine.
//!
//! Gameplay never fails: rejected mode assignments and unaffordable actions
//! are plain `false`/`None`. The only fallible surface is configuration.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to parse simulation config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid simulation config ({} problem(s)): {}", .0.len(), describe(.0))]
    InvalidConfig(Vec<ConfigError>),
}

fn describe(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
