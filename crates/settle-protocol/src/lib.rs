//! Commit-reveal trade protocol.
//!
//! Drives one trade intent from admission to settlement against a
//! [`settle_ledger::Ledger`]:
//!
//! 1. GasCheck -> `AdmissionError` if the batch does not fit the block (trade only)
//! 2. Hashing -> `on_trade_hash`
//! 3. Committing -> `on_commit_sent` / `on_commit_success` / `on_commit_failed`
//! 4. Advancing -> one block fast-forward, `on_next_block`
//! 5. Executing -> reveal, receipt scan, `on_trade_success` / `on_trade_confirmed`
//!
//! # Key Components
//!
//! - [`TradeProtocol`]: state machine driver, one `submit` call per intent
//! - [`GasEstimator`]: static and ledger-backed gas admission
//! - [`SettlementParser`]: return-tuple validation and fill log accumulation
//! - [`TradeObserver`]: lifecycle callbacks, all optional
//! - [`ProtocolConfig`]: contract bindings, fixed-point decimals, gas table

pub mod config;
pub mod error;
pub mod gas;
pub mod observer;
pub mod protocol;
pub mod settlement;
pub mod state;

pub use config::{ContractBindings, GasRow, ProtocolConfig, TradeGasTable};
pub use error::{
    AdmissionError, CommitmentError, ExecutionError, ProtocolError, ProtocolResult, ReceiptError,
    TradeError, TradeErrorKind,
};
pub use gas::{GasBudget, GasEstimator};
pub use observer::{ChannelObserver, NoopObserver, ProtocolEvent, TradeObserver};
pub use protocol::TradeProtocol;
pub use settlement::{FillTotals, SettlementParser};
pub use state::{ProtocolState, StateMachine};
