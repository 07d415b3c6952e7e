//! Scripted in-memory ledger for tests.

use std::collections::{HashMap, VecDeque};

use alloy::primitives::{B256, I256};
use parking_lot::Mutex;
use settle_abi::ReturnKind;
use settle_core::{TradeId, TradeType};
use tokio::sync::mpsc;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{BoxFuture, Ledger, TxLifecycle};
use crate::types::{Block, CallReturn, ErrorCode, Receipt, TradeRecord, Transaction, TxEvent};

/// Ledger call recorded by [`MockLedger`], in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    CurrentBlockNumber,
    GetBlock(u64),
    GetTrade(TradeId),
    Submit(String),
    FastForward(u64),
    GetReceipt(B256),
}

/// Mock ledger.
///
/// Each `submit_transaction` pops the next scripted event list and replays
/// it; a submission with no script gets a lifecycle that closes without any
/// event.
#[derive(Debug)]
pub struct MockLedger {
    head: Mutex<u64>,
    gas_limit: Mutex<u64>,
    trades: Mutex<HashMap<TradeId, TradeRecord>>,
    scripts: Mutex<VecDeque<Vec<TxEvent>>>,
    receipts: Mutex<HashMap<B256, Receipt>>,
    error_codes: Mutex<HashMap<i64, String>>,
    submissions: Mutex<Vec<Transaction>>,
    calls: Mutex<Vec<LedgerCall>>,
    transport_down: Mutex<bool>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Default per-block gas ceiling.
    pub const DEFAULT_GAS_LIMIT: u64 = 3_141_592;

    pub fn new() -> Self {
        Self {
            head: Mutex::new(1),
            gas_limit: Mutex::new(Self::DEFAULT_GAS_LIMIT),
            trades: Mutex::new(HashMap::new()),
            scripts: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(HashMap::new()),
            error_codes: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            transport_down: Mutex::new(false),
        }
    }

    pub fn set_gas_limit(&self, gas_limit: u64) {
        *self.gas_limit.lock() = gas_limit;
    }

    pub fn set_head(&self, number: u64) {
        *self.head.lock() = number;
    }

    /// Make every async call fail with a transport error.
    pub fn set_transport_down(&self, down: bool) {
        *self.transport_down.lock() = down;
    }

    pub fn insert_trade(&self, id: impl Into<TradeId>, trade_type: TradeType) {
        let id = id.into();
        self.trades.lock().insert(
            id.clone(),
            TradeRecord {
                id,
                trade_type,
            },
        );
    }

    /// Queue the lifecycle for the next submission.
    pub fn push_script(&self, events: Vec<TxEvent>) {
        self.scripts.lock().push_back(events);
    }

    pub fn insert_receipt(&self, receipt: Receipt) {
        self.receipts.lock().insert(receipt.tx_hash, receipt);
    }

    /// Map a scalar return value to a named contract error.
    pub fn register_error(&self, code: i64, message: impl Into<String>) {
        self.error_codes.lock().insert(code, message.into());
    }

    pub fn submissions(&self) -> Vec<Transaction> {
        self.submissions.lock().clone()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    pub fn fast_forwards(&self) -> Vec<u64> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                LedgerCall::FastForward(blocks) => Some(*blocks),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: LedgerCall) -> LedgerResult<()> {
        self.calls.lock().push(call);
        if *self.transport_down.lock() {
            return Err(LedgerError::Transport("mock transport down".to_string()));
        }
        Ok(())
    }
}

impl Ledger for MockLedger {
    fn current_block_number(&self) -> BoxFuture<'_, LedgerResult<u64>> {
        Box::pin(async move {
            self.record(LedgerCall::CurrentBlockNumber)?;
            Ok(*self.head.lock())
        })
    }

    fn get_block(&self, number: u64) -> BoxFuture<'_, LedgerResult<Block>> {
        Box::pin(async move {
            self.record(LedgerCall::GetBlock(number))?;
            if number > *self.head.lock() {
                return Err(LedgerError::BlockNotFound(number));
            }
            Ok(Block {
                number,
                gas_limit: *self.gas_limit.lock(),
            })
        })
    }

    fn get_trade<'a>(&'a self, id: &'a TradeId) -> BoxFuture<'a, LedgerResult<Option<TradeRecord>>> {
        Box::pin(async move {
            self.record(LedgerCall::GetTrade(id.clone()))?;
            Ok(self.trades.lock().get(id).cloned())
        })
    }

    fn submit_transaction(&self, tx: Transaction) -> TxLifecycle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.calls.lock().push(LedgerCall::Submit(tx.method.clone()));
        self.submissions.lock().push(tx);

        if let Some(events) = self.scripts.lock().pop_front() {
            for event in events {
                let _ = event_tx.send(event);
            }
        }

        event_rx
    }

    fn fast_forward(&self, blocks: u64) -> BoxFuture<'_, LedgerResult<u64>> {
        Box::pin(async move {
            self.record(LedgerCall::FastForward(blocks))?;
            let mut head = self.head.lock();
            *head += blocks;
            Ok(*head)
        })
    }

    fn get_receipt(&self, tx_hash: B256) -> BoxFuture<'_, LedgerResult<Option<Receipt>>> {
        Box::pin(async move {
            self.record(LedgerCall::GetReceipt(tx_hash))?;
            Ok(self.receipts.lock().get(&tx_hash).cloned())
        })
    }

    fn classify_error(
        &self,
        _operation: &str,
        _expected: ReturnKind,
        raw: &CallReturn,
    ) -> Option<ErrorCode> {
        let CallReturn::Scalar(value) = raw else {
            return None;
        };
        let code = i64::try_from(*value).ok()?;
        self.error_codes.lock().get(&code).map(|message| ErrorCode {
            code,
            message: message.clone(),
        })
    }
}

/// Scalar return helper for scripting error codes.
pub fn scalar_return(code: i64) -> CallReturn {
    CallReturn::Scalar(I256::try_from(code).unwrap_or(I256::ZERO))
}
