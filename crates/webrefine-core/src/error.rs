//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShieldError {
    #[error("Rule error: {0}")]
    Rules(#[from] webrefine_rules::RuleError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
