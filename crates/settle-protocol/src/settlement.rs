//! Reveal result parsing.
//!
//! A reveal settles in two steps:
//! 1. The call's return tuple is validated: status word 1 and the arity of
//!    the revealed function (3 for `trade`, 4 for `short_sell`).
//! 2. The receipt is fetched and every log whose leading topic is the fill
//!    event's topic is decoded as `(side, price, quantity)` and summed.
//!    Sums run on the fixed-point words themselves, so totals never round.
//!
//! The same parse runs at both confidence levels.

use alloy::primitives::{B256, U256};
use settle_core::{
    ExactDecimal, FixedPoint, IntentKind, Price, SettlementResult, ShortSellSettlement, Size,
    TradeSettlement,
};
use settle_ledger::{CallReturn, DynLedger, Receipt, Transaction, TxOutcome};
use tracing::{debug, warn};

use crate::error::{ExecutionError, ReceiptError, TradeError};

/// Status word of a successful reveal.
const SUCCESS_STATUS: u64 = 1;
/// Side word of a fill against a resting sell order.
const SIDE_BOUGHT: u64 = 1;
/// Words in a fill log payload: side, price, quantity.
const FILL_WORDS: usize = 3;

/// Accumulated fills of one receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillTotals {
    pub shares_bought: ExactDecimal,
    pub cash_from_trade: ExactDecimal,
    /// Matching logs scanned.
    pub fills: usize,
}

/// Settlement parser bound to one fill event topic.
#[derive(Clone)]
pub struct SettlementParser {
    ledger: DynLedger,
    fill_topic: B256,
    fxp: FixedPoint,
}

impl SettlementParser {
    pub fn new(ledger: DynLedger, fill_topic: B256, fxp: FixedPoint) -> Self {
        Self {
            ledger,
            fill_topic,
            fxp,
        }
    }

    #[inline]
    pub fn fill_topic(&self) -> B256 {
        self.fill_topic
    }

    /// Tuple words of a successful reveal.
    ///
    /// Anything else is handed to the ledger's error classifier: a known
    /// code becomes `ExecutionError::Contract`, the rest
    /// `ExecutionError::UnexpectedReturn` with the raw value.
    pub fn validate_return<'r>(
        &self,
        kind: IntentKind,
        tx: &Transaction,
        call_return: &'r CallReturn,
    ) -> Result<&'r [U256], ExecutionError> {
        let expected = expected_arity(kind);
        if let CallReturn::Tuple(words) = call_return {
            if words.len() == expected && words[0] == U256::from(SUCCESS_STATUS) {
                return Ok(words.as_slice());
            }
        }

        match self
            .ledger
            .classify_error(&tx.method, tx.returns, call_return)
        {
            Some(code) => Err(ExecutionError::Contract {
                tx: Box::new(tx.clone()),
                code,
            }),
            None => Err(ExecutionError::UnexpectedReturn {
                tx: Box::new(tx.clone()),
                call_return: call_return.clone(),
            }),
        }
    }

    /// Fetch the receipt for `tx_hash` and sum its fills.
    pub async fn scan_receipt(
        &self,
        kind: IntentKind,
        tx_hash: B256,
    ) -> Result<FillTotals, ReceiptError> {
        let receipt = self
            .ledger
            .get_receipt(tx_hash)
            .await
            .map_err(|source| ReceiptError::Ledger { tx_hash, source })?
            .ok_or(ReceiptError::NotFound { tx_hash })?;

        if let Some(error) = receipt.error.clone() {
            warn!(tx_hash = %tx_hash, error = %error, "Receipt reports error");
            return Err(ReceiptError::Errored { tx_hash, error });
        }

        self.accumulate(kind, &receipt)
    }

    /// Sum the fills of an already fetched receipt.
    pub fn accumulate(&self, kind: IntentKind, receipt: &Receipt) -> Result<FillTotals, ReceiptError> {
        let tx_hash = receipt.tx_hash;
        let mut totals = FillTotals::default();

        for (index, log) in receipt.logs.iter().enumerate() {
            if log.leading_topic() != Some(&self.fill_topic) {
                continue;
            }

            let words = self
                .ledger
                .decode_log_payload(&log.data)
                .map_err(|e| ReceiptError::Decode {
                    tx_hash,
                    index,
                    reason: e.to_string(),
                })?;
            if words.len() < FILL_WORDS {
                return Err(ReceiptError::MalformedLog {
                    tx_hash,
                    index,
                    words: words.len(),
                });
            }

            let price = self.fxp.unfix_exact(words[1]);
            let quantity = self.fxp.unfix_exact(words[2]);
            let bought = words[0] == U256::from(SIDE_BOUGHT);

            match kind {
                IntentKind::Trade if bought => {
                    totals.shares_bought = totals
                        .shares_bought
                        .checked_add(quantity)
                        .ok_or(ReceiptError::Overflow { tx_hash })?;
                }
                IntentKind::Trade | IntentKind::ShortSell => {
                    let cash = price
                        .checked_mul(quantity)
                        .ok_or(ReceiptError::Overflow { tx_hash })?;
                    totals.cash_from_trade = totals
                        .cash_from_trade
                        .checked_add(cash)
                        .ok_or(ReceiptError::Overflow { tx_hash })?;
                }
            }
            totals.fills += 1;
        }

        debug!(
            tx_hash = %tx_hash,
            fills = totals.fills,
            shares_bought = %totals.shares_bought,
            cash_from_trade = %totals.cash_from_trade,
            "Scanned fill logs"
        );
        Ok(totals)
    }

    /// Full parse of one reveal outcome into a settlement.
    pub async fn settle(
        &self,
        kind: IntentKind,
        tx: &Transaction,
        outcome: &TxOutcome,
    ) -> Result<SettlementResult, TradeError> {
        let words = self.validate_return(kind, tx, &outcome.call_return)?;
        let remainder = |word: U256| self.fxp.unfix(word).map_err(ExecutionError::Decode);

        let result = match kind {
            IntentKind::Trade => {
                let unmatched_cash = remainder(words[1])?;
                let unmatched_shares = Size::new(remainder(words[2])?);
                let totals = self.scan_receipt(kind, outcome.tx_hash).await?;
                SettlementResult::Trade(TradeSettlement {
                    tx_hash: outcome.tx_hash,
                    unmatched_cash,
                    unmatched_shares,
                    shares_bought: totals.shares_bought,
                    cash_from_trade: totals.cash_from_trade,
                })
            }
            IntentKind::ShortSell => {
                let unmatched_shares = Size::new(remainder(words[1])?);
                let matched_shares = Size::new(remainder(words[2])?);
                let price = Price::new(remainder(words[3])?);
                let totals = self.scan_receipt(kind, outcome.tx_hash).await?;
                SettlementResult::ShortSell(ShortSellSettlement {
                    tx_hash: outcome.tx_hash,
                    unmatched_shares,
                    matched_shares,
                    cash_from_trade: totals.cash_from_trade,
                    price,
                })
            }
        };

        Ok(result)
    }
}

impl std::fmt::Debug for SettlementParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementParser")
            .field("fill_topic", &self.fill_topic)
            .field("fxp", &self.fxp)
            .finish_non_exhaustive()
    }
}

/// Return tuple length of the reveal for `kind`, status word included.
fn expected_arity(kind: IntentKind) -> usize {
    match kind {
        IntentKind::Trade => 3,
        IntentKind::ShortSell => 4,
    }
}
