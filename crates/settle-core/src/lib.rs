//! Core domain types for commit-reveal trade settlement.
//!
//! This crate provides the values that flow through the protocol:
//! - `TradeId`, `TradeType`: trade identifiers and buy/sell tags
//! - `TradeIntent`, `TradeHash`: the committed parameters and their digest
//! - `Price`, `Size`, `FixedPoint`: precision-safe amounts and their on-chain encoding
//! - `ExactDecimal`: lossless totals over ledger integers
//! - `SettlementResult`: typed outcome of a revealed trade

pub mod decimal;
pub mod error;
pub mod exact;
pub mod settlement;
pub mod trade;

pub use decimal::{FixedPoint, Price, Size};
pub use error::{CoreError, Result};
pub use exact::ExactDecimal;
pub use settlement::{Confidence, SettlementResult, ShortSellSettlement, TradeSettlement};
pub use trade::{IntentKind, TradeHash, TradeId, TradeIntent, TradeType};
