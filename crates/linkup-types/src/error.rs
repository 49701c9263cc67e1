//! Common error types

use thiserror::Error;

/// Error parsing one of the ledger's string-encoded enums
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum failed to parse
    pub kind: &'static str,
    /// The offending input
    pub value: String,
}

impl ParseEnumError {
    /// Create a new parse error
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
