//! Ledger trait for the settlement protocol.
//!
//! Provides a trait-based abstraction over the chain connection so the
//! protocol can be driven by a real RPC client or by [`crate::MockLedger`].
//! Timeouts and retries belong to the implementation; the protocol waits
//! on every call for as long as it takes.

use std::pin::Pin;
use std::sync::Arc;

use alloy::primitives::{B256, U256};
use settle_abi::ReturnKind;
use settle_core::TradeId;
use tokio::sync::mpsc;

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Block, CallReturn, ErrorCode, Receipt, TradeRecord, Transaction, TxEvent};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Stream of lifecycle events for one submitted transaction.
///
/// The ledger closes the channel once it has nothing more to report.
pub type TxLifecycle = mpsc::UnboundedReceiver<TxEvent>;

/// Connection to the ledger.
pub trait Ledger: Send + Sync {
    /// Number of the current head block.
    fn current_block_number(&self) -> BoxFuture<'_, LedgerResult<u64>>;

    /// Block header by number.
    fn get_block(&self, number: u64) -> BoxFuture<'_, LedgerResult<Block>>;

    /// Resting order by id, `None` if the ledger does not know it.
    fn get_trade<'a>(&'a self, id: &'a TradeId) -> BoxFuture<'a, LedgerResult<Option<TradeRecord>>>;

    /// Submit a transaction and stream its sent / success / failed /
    /// confirmed stages.
    fn submit_transaction(&self, tx: Transaction) -> TxLifecycle;

    /// Advance the chain by `blocks`, resolving to the new head number.
    fn fast_forward(&self, blocks: u64) -> BoxFuture<'_, LedgerResult<u64>>;

    /// Receipt for a mined transaction, `None` if not found.
    fn get_receipt(&self, tx_hash: B256) -> BoxFuture<'_, LedgerResult<Option<Receipt>>>;

    /// Decode a log payload into its ordered 32-byte words.
    fn decode_log_payload(&self, data: &[u8]) -> LedgerResult<Vec<U256>> {
        if data.len() % 32 != 0 {
            return Err(LedgerError::Decode(format!(
                "payload length {} is not a multiple of 32",
                data.len()
            )));
        }
        Ok(data.chunks_exact(32).map(U256::from_be_slice).collect())
    }

    /// Resolve a raw return of `operation` into a contract error code.
    fn classify_error(
        &self,
        operation: &str,
        expected: ReturnKind,
        raw: &CallReturn,
    ) -> Option<ErrorCode>;
}

/// Arc wrapper for Ledger trait objects.
pub type DynLedger = Arc<dyn Ledger>;
