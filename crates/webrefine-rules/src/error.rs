//! Rule store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Cannot read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rule file {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error("Rule set already exists: {0}")]
    DuplicateRuleSet(String),

    #[error("Invalid rule set priority {0}, expected 1..=99")]
    InvalidPriority(u8),
}
