#![forbid(unsafe_code)]

//! Errors raised by payload ingestion.
//!
//! Everything past ingestion degrades instead of failing: bad geometry is
//! skipped and unknown projections fall back to identity. Only a document
//! that cannot be read or parsed surfaces as an error.

use thiserror::Error;

/// Result alias for ingestion.
pub type Result<T> = std::result::Result<T, PayloadError>;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to read payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("payload does not match the comparison schema: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("payload root must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

impl PayloadError {
    /// Reader failures surface as I/O errors, everything else as syntax.
    pub(crate) fn read(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::Io(err.into())
        } else {
            Self::Syntax(err)
        }
    }

    pub(crate) fn not_an_object(value: &serde_json::Value) -> Self {
        let found = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Array(_) => "an array",
            serde_json::Value::Object(_) => "an object",
        };
        Self::NotAnObject { found }
    }
}
