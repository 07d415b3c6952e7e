//! Exact decimal values over 256-bit ledger integers.
//!
//! [`ExactDecimal`] holds `raw / 10^scale` with `raw` a `U256`. Sums and
//! products never round: a product carries the sum of its operands' scales,
//! so fill totals keep every digit the ledger reported. Only leaving the
//! 256-bit range fails.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Non-negative decimal stored exactly as `raw / 10^scale`.
#[derive(Debug, Clone, Copy)]
pub struct ExactDecimal {
    raw: U256,
    scale: u32,
}

fn pow10(exp: u32) -> Option<U256> {
    let ten = U256::from(10u8);
    (0..exp).try_fold(U256::from(1u8), |acc, _| acc.checked_mul(ten))
}

impl ExactDecimal {
    pub const ZERO: Self = Self {
        raw: U256::ZERO,
        scale: 0,
    };

    #[inline]
    pub fn new(raw: U256, scale: u32) -> Self {
        Self { raw, scale }
    }

    #[inline]
    pub fn raw(&self) -> U256 {
        self.raw
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Lift a non-negative `Decimal` without changing its value.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(CoreError::NegativeAmount(value.to_string()));
        }
        let mantissa = u128::try_from(value.mantissa())
            .map_err(|_| CoreError::NegativeAmount(value.to_string()))?;
        Ok(Self::new(U256::from(mantissa), value.scale()))
    }

    /// Same value with trailing fractional zeros removed.
    pub fn normalize(&self) -> Self {
        if self.raw.is_zero() {
            return Self::ZERO;
        }
        let ten = U256::from(10u8);
        let mut raw = self.raw;
        let mut scale = self.scale;
        while scale > 0 && (raw % ten).is_zero() {
            raw /= ten;
            scale -= 1;
        }
        Self::new(raw, scale)
    }

    /// Same value at a wider scale. `None` when `scale` is narrower than the
    /// current one or the widened integer overflows.
    pub fn rescale(&self, scale: u32) -> Option<Self> {
        let widen = scale.checked_sub(self.scale)?;
        let raw = self.raw.checked_mul(pow10(widen)?)?;
        Some(Self::new(raw, scale))
    }

    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        let scale = self.scale.max(rhs.scale);
        let lhs = self.rescale(scale)?;
        let rhs = rhs.rescale(scale)?;
        Some(Self::new(lhs.raw.checked_add(rhs.raw)?, scale))
    }

    pub fn checked_mul(&self, rhs: Self) -> Option<Self> {
        let raw = self.raw.checked_mul(rhs.raw)?;
        let scale = self.scale.checked_add(rhs.scale)?;
        Some(Self::new(raw, scale))
    }

    /// The value as a `Decimal`, or `None` when it needs more than 28
    /// fractional digits or a mantissa wider than 96 bits.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let n = self.normalize();
        let mantissa = i128::try_from(u128::try_from(n.raw).ok()?).ok()?;
        Decimal::try_from_i128_with_scale(mantissa, n.scale).ok()
    }
}

impl Default for ExactDecimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for ExactDecimal {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.normalize(), other.normalize());
        a.raw == b.raw && a.scale == b.scale
    }
}

impl Eq for ExactDecimal {}

impl PartialEq<Decimal> for ExactDecimal {
    fn eq(&self, other: &Decimal) -> bool {
        ExactDecimal::from_decimal(*other)
            .map(|other| *self == other)
            .unwrap_or(false)
    }
}

impl From<u64> for ExactDecimal {
    fn from(value: u64) -> Self {
        Self::new(U256::from(value), 0)
    }
}

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.normalize();
        let digits = n.raw.to_string();
        let scale = n.scale as usize;
        if scale == 0 {
            f.write_str(&digits)
        } else if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

impl FromStr for ExactDecimal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidAmount(s.to_string());
        let (int, frac) = s.split_once('.').unwrap_or((s, ""));
        if (int.is_empty() && frac.is_empty())
            || !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let raw = U256::from_str_radix(&format!("{int}{frac}"), 10).map_err(|_| invalid())?;
        let scale = u32::try_from(frac.len()).map_err(|_| invalid())?;
        Ok(Self::new(raw, scale))
    }
}

impl Serialize for ExactDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExactDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exact(s: &str) -> ExactDecimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_product_keeps_every_digit() {
        let price = exact("0.333333333333333333");
        let qty = exact("3.000000000000000001");

        let cash = price.checked_mul(qty).unwrap();

        assert_eq!(cash, exact("0.999999999999999999333333333333333333"));
        assert_eq!(cash.to_string(), "0.999999999999999999333333333333333333");
        assert_eq!(cash.to_decimal(), None);
    }

    #[test]
    fn test_add_aligns_scales() {
        let total = exact("2.5").checked_add(exact("0.25")).unwrap();
        assert_eq!(total, dec!(2.75));
        assert_eq!(total.scale(), 2);
    }

    #[test]
    fn test_equality_ignores_trailing_zeros() {
        assert_eq!(exact("12.000"), ExactDecimal::from(12));
        assert_eq!(exact("0.0"), ExactDecimal::ZERO);
        assert_eq!(ExactDecimal::ZERO.to_string(), "0");
        assert_eq!(exact("0.05").to_string(), "0.05");
    }

    #[test]
    fn test_decimal_round_trip_when_representable() {
        let value = ExactDecimal::from_decimal(dec!(1.5)).unwrap();
        assert_eq!(value.to_decimal(), Some(dec!(1.5)));
        assert!(matches!(
            ExactDecimal::from_decimal(dec!(-1)),
            Err(CoreError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = ExactDecimal::new(U256::MAX, 0);
        assert_eq!(max.checked_add(ExactDecimal::from(1)), None);
        assert_eq!(max.checked_mul(ExactDecimal::from(2)), None);
        assert_eq!(exact("1").rescale(80), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("1.2.3".parse::<ExactDecimal>(), Err(CoreError::InvalidAmount(_))));
        assert!(matches!("-1".parse::<ExactDecimal>(), Err(CoreError::InvalidAmount(_))));
        assert!(matches!(".".parse::<ExactDecimal>(), Err(CoreError::InvalidAmount(_))));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&exact("4.20")).unwrap();
        assert_eq!(json, "\"4.2\"");
        let back: ExactDecimal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dec!(4.2));
    }
}
