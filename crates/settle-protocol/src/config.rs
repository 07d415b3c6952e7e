//! Protocol configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use settle_core::{FixedPoint, TradeType};

use crate::error::{ProtocolError, ProtocolResult};

/// Contract functions and the settlement event the protocol drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractBindings {
    /// Contract holding the commitment function. Default: "Trades".
    #[serde(default = "default_commit_contract")]
    pub commit_contract: String,
    /// Commitment function, takes the trade hash. Default: "commitTrade".
    #[serde(default = "default_commit_method")]
    pub commit_method: String,
    /// Contract holding the reveal functions. Default: "Trade".
    #[serde(default = "default_trade_contract")]
    pub trade_contract: String,
    /// Reveal for a trade intent. Default: "trade".
    #[serde(default = "default_trade_method")]
    pub trade_method: String,
    /// Reveal for a short-sell intent. Default: "short_sell".
    #[serde(default = "default_short_sell_method")]
    pub short_sell_method: String,
    /// Event emitted once per fill. Default: "log_fill_tx".
    #[serde(default = "default_fill_event")]
    pub fill_event: String,
}

fn default_commit_contract() -> String {
    "Trades".to_string()
}

fn default_commit_method() -> String {
    "commitTrade".to_string()
}

fn default_trade_contract() -> String {
    "Trade".to_string()
}

fn default_trade_method() -> String {
    "trade".to_string()
}

fn default_short_sell_method() -> String {
    "short_sell".to_string()
}

fn default_fill_event() -> String {
    "log_fill_tx".to_string()
}

impl Default for ContractBindings {
    fn default() -> Self {
        Self {
            commit_contract: default_commit_contract(),
            commit_method: default_commit_method(),
            trade_contract: default_trade_contract(),
            trade_method: default_trade_method(),
            short_sell_method: default_short_sell_method(),
            fill_event: default_fill_event(),
        }
    }
}

/// Gas cost of filling one order, by order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasRow {
    pub buy: u64,
    pub sell: u64,
}

impl GasRow {
    #[inline]
    pub fn cost(&self, trade_type: TradeType) -> u64 {
        match trade_type {
            TradeType::Buy => self.buy,
            TradeType::Sell => self.sell,
        }
    }
}

/// Per-fill gas costs.
///
/// The first fill in a batch pays setup costs the later ones do not, so
/// the table has one row for position 0 and one for every later position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeGasTable {
    #[serde(default = "default_first_row")]
    pub first: GasRow,
    #[serde(default = "default_subsequent_row")]
    pub subsequent: GasRow,
}

fn default_first_row() -> GasRow {
    GasRow {
        buy: 787_421,
        sell: 756_374,
    }
}

fn default_subsequent_row() -> GasRow {
    GasRow {
        buy: 661_894,
        sell: 615_817,
    }
}

impl TradeGasTable {
    /// Cost of the fill at `position` in the batch.
    #[inline]
    pub fn cost(&self, position: usize, trade_type: TradeType) -> u64 {
        if position == 0 {
            self.first.cost(trade_type)
        } else {
            self.subsequent.cost(trade_type)
        }
    }
}

impl Default for TradeGasTable {
    fn default() -> Self {
        Self {
            first: default_first_row(),
            subsequent: default_subsequent_row(),
        }
    }
}

/// Top-level protocol configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Decimal places of on-chain fixed-point amounts. Default: 18.
    #[serde(default = "default_fixed_point_decimals")]
    pub fixed_point_decimals: u32,
    #[serde(default)]
    pub contracts: ContractBindings,
    #[serde(default)]
    pub gas: TradeGasTable,
}

fn default_fixed_point_decimals() -> u32 {
    FixedPoint::DEFAULT_DECIMALS
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            fixed_point_decimals: default_fixed_point_decimals(),
            contracts: ContractBindings::default(),
            gas: TradeGasTable::default(),
        }
    }
}

impl ProtocolConfig {
    /// Load from `SETTLE_CONFIG` (default `config/settle.toml`), falling back
    /// to defaults when the file does not exist.
    pub fn load() -> ProtocolResult<Self> {
        let config_path =
            std::env::var("SETTLE_CONFIG").unwrap_or_else(|_| "config/settle.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> ProtocolResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> ProtocolResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ProtocolError::Config(format!("Failed to parse config: {e}")))?;
        config.fixed_point()?;
        Ok(config)
    }

    /// Fixed-point codec for the configured decimals.
    pub fn fixed_point(&self) -> ProtocolResult<FixedPoint> {
        Ok(FixedPoint::new(self.fixed_point_decimals)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert_eq!(config.contracts.commit_method, "commitTrade");
        assert_eq!(config.contracts.fill_event, "log_fill_tx");
        assert_eq!(config.fixed_point_decimals, 18);
        assert_eq!(config.gas.first.buy, 787_421);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ProtocolConfig::from_toml(
            r#"
            fixed_point_decimals = 6

            [contracts]
            trade_contract = "Exchange"

            [gas.first]
            buy = 100
            sell = 90
            "#,
        )
        .unwrap();

        assert_eq!(config.fixed_point_decimals, 6);
        assert_eq!(config.contracts.trade_contract, "Exchange");
        assert_eq!(config.contracts.trade_method, "trade");
        assert_eq!(config.gas.first.cost(TradeType::Sell), 90);
        assert_eq!(config.gas.subsequent, default_subsequent_row());
    }

    #[test]
    fn test_invalid_decimals_rejected() {
        assert!(matches!(
            ProtocolConfig::from_toml("fixed_point_decimals = 40"),
            Err(ProtocolError::Core(_))
        ));
    }

    #[test]
    fn test_gas_table_rows_by_position() {
        let table = TradeGasTable::default();
        assert_eq!(table.cost(0, TradeType::Buy), 787_421);
        assert_eq!(table.cost(1, TradeType::Buy), 661_894);
        assert_eq!(table.cost(7, TradeType::Sell), 615_817);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&ProtocolConfig::default()).unwrap();
        assert!(toml_str.contains("fixed_point_decimals"));
        assert!(toml_str.contains("commit_method"));
    }
}
