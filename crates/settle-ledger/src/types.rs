//! Values exchanged with the ledger.
//!
//! Result shapes are tagged variants. Whatever transport sits behind a
//! [`crate::Ledger`] validates raw responses into these before the protocol
//! sees them.

use alloy::primitives::{Bytes, B256, I256, U256};
use settle_abi::{AbiFunctionDescriptor, ReturnKind};
use settle_core::{TradeId, TradeType};

use crate::error::{LedgerError, LedgerResult};

/// Block header subset the gas check needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    /// Per-block gas ceiling.
    pub gas_limit: u64,
}

/// Resting order as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    pub id: TradeId,
    pub trade_type: TradeType,
}

/// ABI-level transaction parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Uint(U256),
    Bytes32(B256),
    Bytes32Array(Vec<B256>),
}

/// State-changing call built from a function descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub contract: String,
    pub method: String,
    pub signature_name: String,
    pub input_types: Vec<String>,
    pub returns: ReturnKind,
    pub params: Vec<AbiValue>,
}

impl Transaction {
    /// Build a call to `function` with positional `params`.
    ///
    /// # Errors
    /// Returns `LedgerError::ArityMismatch` if the parameter count differs
    /// from the function's declared inputs.
    pub fn from_function(
        function: &AbiFunctionDescriptor,
        params: Vec<AbiValue>,
    ) -> LedgerResult<Self> {
        if params.len() != function.arity() {
            return Err(LedgerError::ArityMismatch {
                method: function.signature_name.clone(),
                expected: function.arity(),
                actual: params.len(),
            });
        }

        Ok(Self {
            contract: function.contract.clone(),
            method: function.method.clone(),
            signature_name: function.signature_name.clone(),
            input_types: function.input_types.clone(),
            returns: function.returns,
            params,
        })
    }
}

/// Value returned by a submitted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallReturn {
    /// Multi-value return, one word per element.
    Tuple(Vec<U256>),
    /// Single signed value; contracts report error codes this way.
    Scalar(I256),
    Empty,
}

/// Outcome attached to sent / success / confirmed lifecycle stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub call_return: CallReturn,
}

/// Ledger-reported transaction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerFailure {
    pub code: Option<i64>,
    pub message: String,
}

/// Contract-level error resolved from a raw return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: i64,
    pub message: String,
}

/// One stage of a submitted transaction's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    /// Accepted into the pending pool.
    Sent(TxOutcome),
    /// Included with a provisional success.
    Success(TxOutcome),
    /// Rejected or reverted.
    Failed(LedgerFailure),
    /// Success re-observed at confirmation depth.
    Confirmed(TxOutcome),
}

impl TxEvent {
    pub fn stage(&self) -> &'static str {
        match self {
            TxEvent::Sent(_) => "sent",
            TxEvent::Success(_) => "success",
            TxEvent::Failed(_) => "failed",
            TxEvent::Confirmed(_) => "confirmed",
        }
    }
}

/// Log entry emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl LogEntry {
    #[inline]
    pub fn leading_topic(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// Finalized record of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// Set when the ledger recorded the transaction as errored.
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
}
