//! Ledger error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger transport error: {0}")]
    Transport(String),

    #[error("{method} takes {expected} parameters, got {actual}")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Log payload decode error: {0}")]
    Decode(String),

    #[error("Block not found: {0}")]
    BlockNotFound(u64),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
