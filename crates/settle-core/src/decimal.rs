//! Precision-safe decimal types for settlement amounts.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Settlement totals are
//! financial amounts, so no value ever passes through a float.
//!
//! [`FixedPoint`] converts between `Decimal` and the scaled 256-bit integers
//! the ledger stores. Totals derived from many ledger words are kept as
//! [`ExactDecimal`] instead.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::exact::ExactDecimal;

/// Unit price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Share quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Fixed-point codec between `Decimal` and ledger integers.
///
/// A value `v` is stored on-chain as `v * 10^decimals`. Encoding rejects
/// negative values and any fraction finer than `decimals`. Decoding into a
/// `Decimal` rejects integers too wide for its mantissa; decoding into an
/// [`ExactDecimal`] never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPoint {
    decimals: u32,
}

impl FixedPoint {
    pub const DEFAULT_DECIMALS: u32 = 18;
    /// `10^decimals` must fit a u64.
    pub const MAX_DECIMALS: u32 = 19;

    pub fn new(decimals: u32) -> Result<Self> {
        if decimals > Self::MAX_DECIMALS {
            return Err(CoreError::InvalidDecimals(decimals));
        }
        Ok(Self { decimals })
    }

    #[inline]
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Encode a non-negative decimal as a scaled integer.
    ///
    /// Every `Decimal` fits: the widest mantissa times `10^MAX_DECIMALS`
    /// stays far below `2^256`.
    pub fn fix(&self, value: Decimal) -> Result<U256> {
        let exact = ExactDecimal::from_decimal(value)?.normalize();
        if exact.scale() > self.decimals {
            return Err(CoreError::PrecisionLoss {
                value: value.to_string(),
                decimals: self.decimals,
            });
        }

        exact
            .rescale(self.decimals)
            .map(|e| e.raw())
            .ok_or_else(|| CoreError::Overflow(value.to_string()))
    }

    /// Decode a scaled integer back into a normalized decimal.
    ///
    /// `Decimal` carries a 96-bit mantissa, so at 18 decimals only words up
    /// to about `7.9e10` units decode. Wider words fail with `Overflow`
    /// rather than round; use [`FixedPoint::unfix_exact`] for those.
    pub fn unfix(&self, raw: U256) -> Result<Decimal> {
        self.unfix_exact(raw)
            .to_decimal()
            .ok_or_else(|| CoreError::Overflow(raw.to_string()))
    }

    /// Decode a scaled integer without any width limit.
    #[inline]
    pub fn unfix_exact(&self, raw: U256) -> ExactDecimal {
        ExactDecimal::new(raw, self.decimals)
    }
}

impl Default for FixedPoint {
    fn default() -> Self {
        Self {
            decimals: Self::DEFAULT_DECIMALS,
        }
    }
}
