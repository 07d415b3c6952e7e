//! ABI map error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("Entry {index} of contract {contract} has no name")]
    MissingName { contract: String, index: usize },

    #[error("Malformed signature {name} in contract {contract}: {reason}")]
    MalformedSignature {
        contract: String,
        name: String,
        reason: String,
    },

    #[error("Signature {name} in contract {contract} declares ({declared}) but inputs are ({derived})")]
    SignatureMismatch {
        contract: String,
        name: String,
        declared: String,
        derived: String,
    },

    #[error("Duplicate function {key} in contract {contract}")]
    DuplicateFunction { contract: String, key: String },

    #[error("Duplicate event {name} (in {first} and {second})")]
    DuplicateEvent {
        name: String,
        first: String,
        second: String,
    },

    #[error("Function not found: {contract}.{key}")]
    FunctionNotFound { contract: String, key: String },

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AbiResult<T> = Result<T, AbiError>;
