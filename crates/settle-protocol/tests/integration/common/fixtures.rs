//! Shared fixtures: interface map, scripted outcomes and fill logs.

use std::sync::Arc;

use alloy::primitives::{Bytes, B256, U256};
use rust_decimal::Decimal;
use settle_abi::AbiMap;
use settle_core::FixedPoint;
use settle_ledger::{CallReturn, LogEntry, MockLedger, Receipt, TxEvent, TxOutcome};
use settle_protocol::{ProtocolConfig, ProtocolEvent, TradeProtocol};
use tokio::sync::mpsc;

/// Interface of the commitment and trade contracts.
pub const TRADE_ABI: &str = r#"{
    "Trades": [
        {"type": "function", "name": "commitTrade", "constant": false,
         "inputs": [{"name": "hash", "type": "bytes32"}],
         "outputs": [{"name": "out", "type": "int256"}]},
        {"type": "function", "name": "getTradeType(bytes32)", "constant": true,
         "inputs": [{"name": "tradeId", "type": "bytes32"}],
         "outputs": [{"name": "out", "type": "uint256"}]}
    ],
    "Trade": [
        {"type": "function", "name": "trade", "constant": false,
         "inputs": [
            {"name": "fxpMaxValue", "type": "uint256"},
            {"name": "fxpMaxAmount", "type": "uint256"},
            {"name": "tradeIds", "type": "bytes32[]"}
         ],
         "outputs": [{"name": "fxpOut", "type": "uint256[]"}]},
        {"type": "function", "name": "short_sell", "constant": false,
         "inputs": [
            {"name": "buyerTradeId", "type": "bytes32"},
            {"name": "fxpAmount", "type": "uint256"}
         ],
         "outputs": [{"name": "fxpOut", "type": "uint256[]"}]},
        {"type": "event", "name": "log_fill_tx",
         "inputs": [
            {"name": "market", "type": "bytes32", "indexed": true},
            {"name": "type", "type": "uint256", "indexed": false},
            {"name": "price", "type": "uint256", "indexed": false},
            {"name": "amount", "type": "uint256", "indexed": false}
         ]}
    ]
}"#;

pub const COMMIT_TX: B256 = B256::repeat_byte(0xc0);
pub const REVEAL_TX: B256 = B256::repeat_byte(0xee);

/// Protocol over a fresh mock ledger with default config.
pub fn setup() -> (Arc<MockLedger>, TradeProtocol) {
    let ledger = Arc::new(MockLedger::new());
    let abi = Arc::new(AbiMap::from_json(TRADE_ABI).unwrap());
    let protocol = TradeProtocol::new(ledger.clone(), abi, &ProtocolConfig::default()).unwrap();
    (ledger, protocol)
}

pub fn fixed(value: Decimal) -> U256 {
    FixedPoint::default().fix(value).unwrap()
}

pub fn outcome(tx_hash: B256, call_return: CallReturn) -> TxOutcome {
    TxOutcome {
        tx_hash,
        block_number: Some(2),
        call_return,
    }
}

/// Commitment that is sent, succeeds and later confirms.
pub fn commit_script() -> Vec<TxEvent> {
    vec![
        TxEvent::Sent(outcome(COMMIT_TX, CallReturn::Empty)),
        TxEvent::Success(outcome(COMMIT_TX, CallReturn::Empty)),
        TxEvent::Confirmed(outcome(COMMIT_TX, CallReturn::Empty)),
    ]
}

/// Reveal that is sent and succeeds with `call_return`.
pub fn reveal_script(call_return: CallReturn) -> Vec<TxEvent> {
    vec![
        TxEvent::Sent(outcome(REVEAL_TX, CallReturn::Empty)),
        TxEvent::Success(outcome(REVEAL_TX, call_return)),
    ]
}

pub fn trade_return(unmatched_cash: Decimal, unmatched_shares: Decimal) -> CallReturn {
    CallReturn::Tuple(vec![
        U256::from(1),
        fixed(unmatched_cash),
        fixed(unmatched_shares),
    ])
}

pub fn short_sell_return(
    unmatched_shares: Decimal,
    matched_shares: Decimal,
    price: Decimal,
) -> CallReturn {
    CallReturn::Tuple(vec![
        U256::from(1),
        fixed(unmatched_shares),
        fixed(matched_shares),
        fixed(price),
    ])
}

/// Fill log tagged with `topic`.
pub fn fill_log(topic: B256, side: u64, price: Decimal, quantity: Decimal) -> LogEntry {
    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(&U256::from(side).to_be_bytes::<32>());
    data.extend_from_slice(&fixed(price).to_be_bytes::<32>());
    data.extend_from_slice(&fixed(quantity).to_be_bytes::<32>());
    LogEntry {
        topics: vec![topic, B256::repeat_byte(0x01)],
        data: Bytes::from(data),
    }
}

pub fn reveal_receipt(logs: Vec<LogEntry>) -> Receipt {
    Receipt {
        tx_hash: REVEAL_TX,
        block_number: Some(3),
        error: None,
        logs,
    }
}

/// Names of every event received so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ProtocolEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    names
}
