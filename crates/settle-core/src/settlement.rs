//! Typed outcome of a revealed trade.

use alloy::primitives::B256;
use rust_decimal::Decimal;

use crate::decimal::{Price, Size};
use crate::exact::ExactDecimal;

/// Confidence level at which a reveal outcome was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidence {
    /// First ledger-reported success.
    Provisional,
    /// Success re-observed at confirmation depth.
    Confirmed,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Provisional => "provisional",
            Confidence::Confirmed => "confirmed",
        }
    }
}

/// Settlement of a `trade` reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeSettlement {
    pub tx_hash: B256,
    /// Cash left unspent, from the reveal's return tuple.
    pub unmatched_cash: Decimal,
    /// Shares left unsold, from the reveal's return tuple.
    pub unmatched_shares: Size,
    /// Sum of quantities filled against sell orders.
    pub shares_bought: ExactDecimal,
    /// Sum of price x quantity filled against buy orders.
    pub cash_from_trade: ExactDecimal,
}

/// Settlement of a `short_sell` reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortSellSettlement {
    pub tx_hash: B256,
    pub unmatched_shares: Size,
    pub matched_shares: Size,
    /// Sum of price x quantity over every fill log.
    pub cash_from_trade: ExactDecimal,
    /// Realized price reported by the contract.
    pub price: Price,
}

/// Result handed to the caller once a reveal settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    Trade(TradeSettlement),
    ShortSell(ShortSellSettlement),
}

impl SettlementResult {
    pub fn tx_hash(&self) -> B256 {
        match self {
            SettlementResult::Trade(s) => s.tx_hash,
            SettlementResult::ShortSell(s) => s.tx_hash,
        }
    }

    pub fn cash_from_trade(&self) -> ExactDecimal {
        match self {
            SettlementResult::Trade(s) => s.cash_from_trade,
            SettlementResult::ShortSell(s) => s.cash_from_trade,
        }
    }

    pub fn as_trade(&self) -> Option<&TradeSettlement> {
        match self {
            SettlementResult::Trade(s) => Some(s),
            SettlementResult::ShortSell(_) => None,
        }
    }

    pub fn as_short_sell(&self) -> Option<&ShortSellSettlement> {
        match self {
            SettlementResult::ShortSell(s) => Some(s),
            SettlementResult::Trade(_) => None,
        }
    }
}
