//! Protocol error types.
//!
//! Every terminal failure carries a structured payload: the error kind plus
//! whatever context identifies it (gas numbers, the missing trade id, the
//! attempted transaction, the transaction hash).

use alloy::primitives::B256;
use settle_abi::AbiError;
use settle_core::{CoreError, TradeId};
use settle_ledger::{CallReturn, ErrorCode, LedgerError, LedgerFailure, Transaction};
use thiserror::Error;

/// Gas admission failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Gas limit exceeded: cost {cost} > ceiling {ceiling}")]
    GasLimitExceeded { cost: u64, ceiling: u64 },

    #[error("Couldn't find trade: {0}")]
    TradeNotFound(TradeId),

    #[error("Ledger error during gas check: {0}")]
    Ledger(#[from] LedgerError),
}

/// Commitment phase failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("Commitment transaction failed: {}", .failure.message)]
    Failed {
        tx: Box<Transaction>,
        failure: LedgerFailure,
    },

    #[error("Commitment lifecycle closed before success")]
    LifecycleClosed { tx: Box<Transaction> },

    #[error("Trade hash does not match the revealed intent")]
    HashMismatch,

    #[error("Block fast-forward failed: {0}")]
    FastForward(LedgerError),

    #[error("Intent encoding failed: {0}")]
    Encoding(CoreError),

    #[error("Transaction build failed: {0}")]
    Build(LedgerError),
}

/// Reveal phase failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Trade transaction failed: {}", .failure.message)]
    Rejected {
        tx: Box<Transaction>,
        failure: LedgerFailure,
    },

    #[error("Unexpected return from {}: {call_return:?}", .tx.method)]
    UnexpectedReturn {
        tx: Box<Transaction>,
        call_return: CallReturn,
    },

    #[error("Contract error {} from {}: {}", .code.code, .tx.method, .code.message)]
    Contract { tx: Box<Transaction>, code: ErrorCode },

    #[error("Trade lifecycle closed before success")]
    LifecycleClosed { tx: Box<Transaction> },

    #[error("Return value decode failed: {0}")]
    Decode(CoreError),

    #[error("Parameter encoding failed: {0}")]
    Encoding(String),

    #[error("Transaction build failed: {0}")]
    Build(LedgerError),
}

/// Receipt retrieval and log scan failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("Transaction receipt not found: {tx_hash}")]
    NotFound { tx_hash: B256 },

    #[error("Receipt for {tx_hash} reports error: {error}")]
    Errored { tx_hash: B256, error: String },

    #[error("Fill log {index} in {tx_hash} has {words} payload words, expected at least 3")]
    MalformedLog {
        tx_hash: B256,
        index: usize,
        words: usize,
    },

    #[error("Fill log {index} in {tx_hash} could not be decoded: {reason}")]
    Decode {
        tx_hash: B256,
        index: usize,
        reason: String,
    },

    #[error("Settlement total overflowed in {tx_hash}")]
    Overflow { tx_hash: B256 },

    #[error("Ledger error fetching receipt for {tx_hash}: {source}")]
    Ledger { tx_hash: B256, source: LedgerError },
}

/// Error kind for branching without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeErrorKind {
    Admission,
    Commitment,
    Execution,
    Receipt,
}

impl TradeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeErrorKind::Admission => "admission",
            TradeErrorKind::Commitment => "commitment",
            TradeErrorKind::Execution => "execution",
            TradeErrorKind::Receipt => "receipt",
        }
    }
}

/// Terminal failure of a protocol invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TradeError {
    #[error("Admission error: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),
}

impl TradeError {
    pub fn kind(&self) -> TradeErrorKind {
        match self {
            TradeError::Admission(_) => TradeErrorKind::Admission,
            TradeError::Commitment(_) => TradeErrorKind::Commitment,
            TradeError::Execution(_) => TradeErrorKind::Execution,
            TradeError::Receipt(_) => TradeErrorKind::Receipt,
        }
    }
}

/// Construction and configuration errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
