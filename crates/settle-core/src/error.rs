//! Error types for settle-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid trade intent: {0}")]
    InvalidIntent(String),

    #[error("Negative amount cannot be fixed-point encoded: {0}")]
    NegativeAmount(String),

    #[error("Amount {value} has more than {decimals} decimal places")]
    PrecisionLoss { value: String, decimals: u32 },

    #[error("Invalid decimal amount: {0}")]
    InvalidAmount(String),

    #[error("Fixed-point overflow: {0}")]
    Overflow(String),

    #[error("Unsupported fixed-point decimals: {0}")]
    InvalidDecimals(u32),

    #[error("Unknown trade type: {0}")]
    UnknownTradeType(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
