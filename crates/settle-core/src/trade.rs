//! Trade identifiers, intents, and the commitment digest.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, B256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::FixedPoint;
use crate::error::{CoreError, Result};

/// Identifier of a resting order on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(String);

impl TradeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 32-byte word used for hashing and as a transaction parameter.
    ///
    /// `0x`-prefixed hex of at most 32 bytes is left-padded; any other
    /// identifier is mapped through keccak256.
    pub fn to_word(&self) -> B256 {
        if let Some(stripped) = self.0.strip_prefix("0x") {
            if let Ok(bytes) = hex::decode(stripped) {
                if bytes.len() <= 32 {
                    return B256::left_padding_from(&bytes);
                }
            }
        }
        keccak256(self.0.as_bytes())
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TradeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Side of a resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(CoreError::UnknownTradeType(other.to_string())),
        }
    }
}

/// Which reveal transaction an intent ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    /// Fill one or more resting orders.
    Trade,
    /// Sell shares not held against a single resting buy order.
    ShortSell,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Trade => "trade",
            IntentKind::ShortSell => "short_sell",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters a caller commits to before revealing a trade.
///
/// Built through [`TradeIntent::trade`] or [`TradeIntent::short_sell`]. The
/// same instance is hashed for the commitment and later encoded into the
/// reveal, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeIntent {
    kind: IntentKind,
    max_value: Decimal,
    max_amount: Decimal,
    trade_ids: Vec<TradeId>,
}

impl TradeIntent {
    /// Intent to fill `trade_ids` in order, bounded by `max_value` cash and
    /// `max_amount` shares.
    pub fn trade(max_value: Decimal, max_amount: Decimal, trade_ids: Vec<TradeId>) -> Result<Self> {
        if trade_ids.is_empty() {
            return Err(CoreError::InvalidIntent("trade id list is empty".to_string()));
        }
        Self::check_non_negative("max_value", max_value)?;
        Self::check_non_negative("max_amount", max_amount)?;
        Ok(Self {
            kind: IntentKind::Trade,
            max_value,
            max_amount,
            trade_ids,
        })
    }

    /// Intent to short-sell up to `max_amount` shares into `buyer_trade_id`.
    ///
    /// The committed value is always zero.
    pub fn short_sell(buyer_trade_id: TradeId, max_amount: Decimal) -> Result<Self> {
        Self::check_non_negative("max_amount", max_amount)?;
        Ok(Self {
            kind: IntentKind::ShortSell,
            max_value: Decimal::ZERO,
            max_amount,
            trade_ids: vec![buyer_trade_id],
        })
    }

    fn check_non_negative(field: &str, value: Decimal) -> Result<()> {
        if value < Decimal::ZERO {
            return Err(CoreError::InvalidIntent(format!("{field} is negative: {value}")));
        }
        Ok(())
    }

    #[inline]
    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    #[inline]
    pub fn max_value(&self) -> Decimal {
        self.max_value
    }

    #[inline]
    pub fn max_amount(&self) -> Decimal {
        self.max_amount
    }

    #[inline]
    pub fn trade_ids(&self) -> &[TradeId] {
        &self.trade_ids
    }

    /// Counter-order of a short-sell intent.
    pub fn buyer_trade_id(&self) -> Option<&TradeId> {
        match self.kind {
            IntentKind::ShortSell => self.trade_ids.first(),
            IntentKind::Trade => None,
        }
    }

    /// Commitment digest over `(max_value, max_amount, trade_ids)`.
    ///
    /// Each field is one 32-byte big-endian word; amounts are fixed-point
    /// encoded first. Trade id order is part of the digest.
    pub fn hash(&self, fxp: &FixedPoint) -> Result<TradeHash> {
        let mut data = Vec::with_capacity(32 * (2 + self.trade_ids.len()));
        data.extend_from_slice(&fxp.fix(self.max_value)?.to_be_bytes::<32>());
        data.extend_from_slice(&fxp.fix(self.max_amount)?.to_be_bytes::<32>());
        for id in &self.trade_ids {
            data.extend_from_slice(id.to_word().as_slice());
        }
        Ok(TradeHash(keccak256(&data)))
    }
}

/// Digest committed on-chain before a trade is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TradeHash(B256);

impl TradeHash {
    #[inline]
    pub fn as_b256(&self) -> B256 {
        self.0
    }

    /// Whether this digest was derived from `intent`.
    pub fn matches(&self, intent: &TradeIntent, fxp: &FixedPoint) -> Result<bool> {
        Ok(intent.hash(fxp)? == *self)
    }
}

impl fmt::Display for TradeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
