//! Gas admission for trade batches.
//!
//! The cost of a batch is the sum of per-fill costs from [`TradeGasTable`],
//! where the row is chosen by position in the batch and the column by the
//! side of the resting order. A batch is admitted when its cost does not
//! exceed the ceiling.

use settle_core::{TradeId, TradeType};
use settle_ledger::DynLedger;
use tracing::{debug, warn};

use crate::config::TradeGasTable;
use crate::error::AdmissionError;

/// Estimated cost of a batch against a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasBudget {
    pub ceiling: u64,
    pub cost: u64,
}

impl GasBudget {
    /// Whether the batch fits. Equality admits.
    #[inline]
    pub fn admits(&self) -> bool {
        self.cost <= self.ceiling
    }

    /// `Ok(self)` if admitted, `GasLimitExceeded` otherwise.
    pub fn check(self) -> Result<Self, AdmissionError> {
        if self.admits() {
            Ok(self)
        } else {
            Err(AdmissionError::GasLimitExceeded {
                cost: self.cost,
                ceiling: self.ceiling,
            })
        }
    }
}

/// Gas estimator.
///
/// The static form works from trade types alone; the ledger-backed form
/// looks up each resting order and reads the ceiling from the head block.
#[derive(Clone)]
pub struct GasEstimator {
    ledger: DynLedger,
    table: TradeGasTable,
}

impl GasEstimator {
    pub fn new(ledger: DynLedger, table: TradeGasTable) -> Self {
        Self { ledger, table }
    }

    #[inline]
    pub fn table(&self) -> &TradeGasTable {
        &self.table
    }

    /// Sum of per-fill costs. Only the fill at index 0 uses the first row.
    pub fn sum_trade_gas(&self, trade_types: &[TradeType]) -> u64 {
        trade_types
            .iter()
            .enumerate()
            .fold(0u64, |total, (position, trade_type)| {
                total.saturating_add(self.table.cost(position, *trade_type))
            })
    }

    /// Static admission against a known ceiling.
    pub fn is_under_limit(&self, trade_types: &[TradeType], ceiling: u64) -> GasBudget {
        GasBudget {
            ceiling,
            cost: self.sum_trade_gas(trade_types),
        }
    }

    /// Gas limit of the current head block.
    pub async fn network_ceiling(&self) -> Result<u64, AdmissionError> {
        let number = self.ledger.current_block_number().await?;
        let block = self.ledger.get_block(number).await?;
        debug!(block = number, gas_limit = block.gas_limit, "Fetched block gas limit");
        Ok(block.gas_limit)
    }

    /// Admission for known trade types, fetching the ceiling when not given.
    pub async fn check_trade_types(
        &self,
        trade_types: &[TradeType],
        ceiling: Option<u64>,
    ) -> Result<GasBudget, AdmissionError> {
        let ceiling = match ceiling {
            Some(ceiling) => ceiling,
            None => self.network_ceiling().await?,
        };
        Ok(self.is_under_limit(trade_types, ceiling))
    }

    /// Admission for a batch of resting orders.
    ///
    /// Orders are fetched one at a time in batch order. The first unknown id
    /// fails the whole check; no partial sum is reported.
    pub async fn check_trades(&self, trade_ids: &[TradeId]) -> Result<GasBudget, AdmissionError> {
        let mut trade_types = Vec::with_capacity(trade_ids.len());
        for id in trade_ids {
            match self.ledger.get_trade(id).await? {
                Some(record) => trade_types.push(record.trade_type),
                None => {
                    warn!(trade_id = %id, "Trade not found during gas check");
                    return Err(AdmissionError::TradeNotFound(id.clone()));
                }
            }
        }
        self.check_trade_types(&trade_types, None).await
    }
}

impl std::fmt::Debug for GasEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GasEstimator")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settle_ledger::{LedgerCall, LedgerError, MockLedger};
    use std::sync::Arc;

    fn estimator() -> (Arc<MockLedger>, GasEstimator) {
        let ledger = Arc::new(MockLedger::new());
        let estimator = GasEstimator::new(ledger.clone(), TradeGasTable::default());
        (ledger, estimator)
    }

    #[test]
    fn test_first_row_only_for_index_zero() {
        let (_, estimator) = estimator();
        assert_eq!(estimator.sum_trade_gas(&[]), 0);
        assert_eq!(estimator.sum_trade_gas(&[TradeType::Buy]), 787_421);
        assert_eq!(
            estimator.sum_trade_gas(&[TradeType::Sell, TradeType::Buy, TradeType::Sell]),
            756_374 + 661_894 + 615_817
        );
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let (_, estimator) = estimator();
        let types = [TradeType::Buy, TradeType::Sell];
        let cost = estimator.sum_trade_gas(&types);

        assert!(estimator.is_under_limit(&types, cost).admits());
        assert!(!estimator.is_under_limit(&types, cost - 1).admits());
        assert_eq!(
            estimator.is_under_limit(&types, cost - 1).check(),
            Err(AdmissionError::GasLimitExceeded {
                cost,
                ceiling: cost - 1
            })
        );
    }

    #[tokio::test]
    async fn test_check_trades_reads_head_block() {
        let (ledger, estimator) = estimator();
        ledger.insert_trade("t1", TradeType::Sell);
        ledger.insert_trade("t2", TradeType::Buy);
        ledger.set_head(5);

        let budget = estimator
            .check_trades(&[TradeId::from("t1"), TradeId::from("t2")])
            .await
            .unwrap();

        assert_eq!(budget.ceiling, MockLedger::DEFAULT_GAS_LIMIT);
        assert_eq!(budget.cost, 756_374 + 661_894);
        assert!(budget.admits());
        assert_eq!(
            ledger.calls(),
            vec![
                LedgerCall::GetTrade(TradeId::from("t1")),
                LedgerCall::GetTrade(TradeId::from("t2")),
                LedgerCall::CurrentBlockNumber,
                LedgerCall::GetBlock(5),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_trade_stops_lookup() {
        let (ledger, estimator) = estimator();
        ledger.insert_trade("t2", TradeType::Buy);

        let result = estimator
            .check_trades(&[TradeId::from("missing"), TradeId::from("t2")])
            .await;

        assert_eq!(
            result,
            Err(AdmissionError::TradeNotFound(TradeId::from("missing")))
        );
        assert_eq!(ledger.calls().len(), 1);
    }

    #[test]
    fn test_explicit_ceiling_skips_block_lookup() {
        let (ledger, estimator) = estimator();
        let budget = tokio_test::block_on(
            estimator.check_trade_types(&[TradeType::Buy], Some(1_000_000)),
        )
        .unwrap();
        assert!(budget.admits());
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_admission_error() {
        let (ledger, estimator) = estimator();
        ledger.set_transport_down(true);
        assert!(matches!(
            estimator.network_ceiling().await,
            Err(AdmissionError::Ledger(LedgerError::Transport(_)))
        ));
    }
}
