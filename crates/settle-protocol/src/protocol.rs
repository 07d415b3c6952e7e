//! Commit-reveal driver.
//!
//! One [`TradeProtocol::submit`] call walks one intent through every
//! phase. The commitment lifecycle is read until its first success; its
//! remaining events (the deep confirmation) are forwarded to the observer
//! concurrently with the reveal, and `submit` resolves after both finish.

use std::sync::Arc;

use rust_decimal::Decimal;
use settle_abi::{AbiFunctionDescriptor, AbiMap};
use settle_core::{
    Confidence, FixedPoint, IntentKind, SettlementResult, TradeHash, TradeIntent,
};
use settle_ledger::{AbiValue, DynLedger, Transaction, TxEvent, TxLifecycle};
use settle_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::config::ProtocolConfig;
use crate::error::{
    CommitmentError, ExecutionError, ProtocolError, ProtocolResult, TradeError, TradeErrorKind,
};
use crate::gas::GasEstimator;
use crate::observer::TradeObserver;
use crate::settlement::SettlementParser;
use crate::state::{ProtocolState, StateMachine};

/// Blocks to advance between commitment and reveal.
const REVEAL_DELAY_BLOCKS: u64 = 1;

/// Commit-reveal protocol bound to one ledger and one interface map.
///
/// Function and event descriptors are resolved once at construction, so a
/// misconfigured binding fails here rather than mid-trade.
#[derive(Clone)]
pub struct TradeProtocol {
    ledger: DynLedger,
    abi: Arc<AbiMap>,
    config: ProtocolConfig,
    fxp: FixedPoint,
    commit_fn: AbiFunctionDescriptor,
    trade_fn: AbiFunctionDescriptor,
    short_sell_fn: AbiFunctionDescriptor,
    gas: GasEstimator,
    parser: SettlementParser,
}

impl TradeProtocol {
    /// Create a protocol driver.
    ///
    /// # Errors
    /// Fails if a configured function or event is missing from `abi`, if a
    /// bound function has the wrong number of inputs, or if the configured
    /// fixed-point decimals are unsupported.
    pub fn new(ledger: DynLedger, abi: Arc<AbiMap>, config: &ProtocolConfig) -> ProtocolResult<Self> {
        let fxp = config.fixed_point()?;
        let contracts = &config.contracts;

        let commit_fn = bound_function(&abi, &contracts.commit_contract, &contracts.commit_method, 1)?;
        let trade_fn = bound_function(&abi, &contracts.trade_contract, &contracts.trade_method, 3)?;
        let short_sell_fn = bound_function(
            &abi,
            &contracts.trade_contract,
            &contracts.short_sell_method,
            2,
        )?;
        let fill_topic = abi.event(&contracts.fill_event)?.topic;

        debug!(
            commit = %commit_fn.signature_name,
            trade = %trade_fn.signature_name,
            short_sell = %short_sell_fn.signature_name,
            fill_topic = %fill_topic,
            "Trade protocol bound"
        );

        Ok(Self {
            gas: GasEstimator::new(ledger.clone(), config.gas),
            parser: SettlementParser::new(ledger.clone(), fill_topic, fxp),
            ledger,
            abi,
            config: config.clone(),
            fxp,
            commit_fn,
            trade_fn,
            short_sell_fn,
        })
    }

    #[inline]
    pub fn abi(&self) -> &AbiMap {
        &self.abi
    }

    #[inline]
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    #[inline]
    pub fn gas(&self) -> &GasEstimator {
        &self.gas
    }

    #[inline]
    pub fn parser(&self) -> &SettlementParser {
        &self.parser
    }

    /// Run `intent` to settlement.
    ///
    /// Returns the confirmed settlement when the reveal reached
    /// confirmation depth, otherwise the provisional one. Every failure is
    /// also reported to `observer`: admission and commitment failures via
    /// `on_commit_failed`, reveal and receipt failures via `on_trade_failed`.
    ///
    /// The commitment's late events are forwarded alongside the reveal, and
    /// this call returns only once both are done: the settlement is not
    /// handed back until the ledger closes the commitment lifecycle. A
    /// ledger that never closes it keeps this future pending.
    pub async fn submit(
        &self,
        intent: TradeIntent,
        observer: &dyn TradeObserver,
    ) -> Result<SettlementResult, TradeError> {
        let kind = intent.kind();
        Metrics::protocol_started(kind.as_str());
        let mut machine = StateMachine::new(kind);

        match self.run(&intent, &mut machine, observer).await {
            Ok(settlement) => {
                info!(
                    kind = %kind,
                    tx_hash = %settlement.tx_hash(),
                    cash_from_trade = %settlement.cash_from_trade(),
                    "Trade settled"
                );
                Ok(settlement)
            }
            Err(error) => {
                warn!(
                    kind = %kind,
                    state = %machine.state(),
                    error = %error,
                    "Trade protocol failed"
                );
                Metrics::phase_failed(machine.state().phase(), error.kind().as_str());
                machine.advance(ProtocolState::Failed);
                match error.kind() {
                    TradeErrorKind::Admission | TradeErrorKind::Commitment => {
                        observer.on_commit_failed(&error)
                    }
                    TradeErrorKind::Execution | TradeErrorKind::Receipt => {
                        observer.on_trade_failed(&error)
                    }
                }
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        intent: &TradeIntent,
        machine: &mut StateMachine,
        observer: &dyn TradeObserver,
    ) -> Result<SettlementResult, TradeError> {
        if machine.state() == ProtocolState::GasCheck {
            let budget = self.gas.check_trades(intent.trade_ids()).await?.check()?;
            debug!(cost = budget.cost, ceiling = budget.ceiling, "Gas check passed");
            Metrics::trade_gas(budget.cost);
            machine.advance(ProtocolState::Hashing);
        }

        let hash = intent.hash(&self.fxp).map_err(CommitmentError::Encoding)?;
        debug!(trade_hash = %hash, kind = %intent.kind(), "Trade hash computed");
        observer.on_trade_hash(&hash);
        machine.advance(ProtocolState::Committing);

        let commit_tail = self.commit(hash, observer).await?;

        let (settlement, ()) = tokio::join!(
            self.reveal(intent, hash, machine, observer),
            forward_commit_tail(commit_tail, observer),
        );
        settlement
    }

    /// Submit the commitment and wait for its first success.
    ///
    /// Returns the still-open lifecycle so later stages can be forwarded.
    async fn commit(
        &self,
        hash: TradeHash,
        observer: &dyn TradeObserver,
    ) -> Result<TxLifecycle, TradeError> {
        let tx = Transaction::from_function(&self.commit_fn, vec![AbiValue::Bytes32(hash.as_b256())])
            .map_err(CommitmentError::Build)?;
        let mut lifecycle = self.ledger.submit_transaction(tx.clone());
        let mut sent = false;

        while let Some(event) = lifecycle.recv().await {
            match event {
                TxEvent::Sent(outcome) => {
                    if !sent {
                        sent = true;
                        debug!(tx_hash = %outcome.tx_hash, "Commitment sent");
                        observer.on_commit_sent(&outcome);
                    }
                }
                TxEvent::Success(outcome) => {
                    info!(
                        tx_hash = %outcome.tx_hash,
                        block = ?outcome.block_number,
                        "Commitment succeeded"
                    );
                    observer.on_commit_success(&outcome);
                    return Ok(lifecycle);
                }
                TxEvent::Confirmed(outcome) => observer.on_commit_confirmed(&outcome),
                TxEvent::Failed(failure) => {
                    return Err(CommitmentError::Failed {
                        tx: Box::new(tx),
                        failure,
                    }
                    .into());
                }
            }
        }

        Err(CommitmentError::LifecycleClosed { tx: Box::new(tx) }.into())
    }

    /// Advance past the commitment block, then submit and settle the reveal.
    async fn reveal(
        &self,
        intent: &TradeIntent,
        hash: TradeHash,
        machine: &mut StateMachine,
        observer: &dyn TradeObserver,
    ) -> Result<SettlementResult, TradeError> {
        machine.advance(ProtocolState::Advancing);
        let block = self
            .ledger
            .fast_forward(REVEAL_DELAY_BLOCKS)
            .await
            .map_err(CommitmentError::FastForward)?;
        debug!(block, "Advanced past commitment block");
        observer.on_next_block(block);

        if !hash.matches(intent, &self.fxp).map_err(CommitmentError::Encoding)? {
            return Err(CommitmentError::HashMismatch.into());
        }

        let tx = self.build_reveal(intent)?;
        machine.advance(ProtocolState::Executing);

        let kind = intent.kind();
        let mut lifecycle = self.ledger.submit_transaction(tx.clone());
        let mut sent = false;
        let mut provisional: Option<SettlementResult> = None;
        let mut confirmed: Option<SettlementResult> = None;

        while let Some(event) = lifecycle.recv().await {
            match event {
                TxEvent::Sent(outcome) => {
                    if !sent {
                        sent = true;
                        debug!(tx_hash = %outcome.tx_hash, method = %tx.method, "Reveal sent");
                        observer.on_trade_sent(&outcome);
                    }
                }
                TxEvent::Success(outcome) => {
                    if provisional.is_some() {
                        warn!(tx_hash = %outcome.tx_hash, "Duplicate reveal success ignored");
                        continue;
                    }
                    let settlement = self.parser.settle(kind, &tx, &outcome).await?;
                    machine.advance(ProtocolState::Settled);
                    Metrics::settlement_delivered(kind.as_str(), Confidence::Provisional.as_str());
                    info!(tx_hash = %outcome.tx_hash, "Reveal succeeded");
                    observer.on_trade_success(&settlement);
                    provisional = Some(settlement);
                }
                TxEvent::Confirmed(outcome) => {
                    if confirmed.is_some() {
                        warn!(tx_hash = %outcome.tx_hash, "Duplicate reveal confirmation ignored");
                        continue;
                    }
                    let settlement = self.parser.settle(kind, &tx, &outcome).await?;
                    machine.advance(ProtocolState::Settled);
                    Metrics::settlement_delivered(kind.as_str(), Confidence::Confirmed.as_str());
                    info!(tx_hash = %outcome.tx_hash, "Reveal confirmed");
                    observer.on_trade_confirmed(&settlement);
                    confirmed = Some(settlement);
                }
                TxEvent::Failed(failure) => {
                    return Err(ExecutionError::Rejected {
                        tx: Box::new(tx),
                        failure,
                    }
                    .into());
                }
            }
        }

        confirmed
            .or(provisional)
            .ok_or_else(|| ExecutionError::LifecycleClosed { tx: Box::new(tx) }.into())
    }

    /// Reveal transaction for `intent`.
    fn build_reveal(&self, intent: &TradeIntent) -> Result<Transaction, TradeError> {
        let (function, params) = match intent.kind() {
            IntentKind::Trade => {
                let function = &self.trade_fn;
                let ids = intent.trade_ids().iter().map(|id| id.to_word()).collect();
                let params = vec![
                    self.amount_param(function, 0, intent.max_value())?,
                    self.amount_param(function, 1, intent.max_amount())?,
                    AbiValue::Bytes32Array(ids),
                ];
                (function, params)
            }
            IntentKind::ShortSell => {
                let function = &self.short_sell_fn;
                let buyer = intent.buyer_trade_id().ok_or_else(|| {
                    ExecutionError::Encoding("short-sell intent has no buyer trade id".to_string())
                })?;
                let params = vec![
                    AbiValue::Bytes32(buyer.to_word()),
                    self.amount_param(function, 1, intent.max_amount())?,
                ];
                (function, params)
            }
        };

        Ok(Transaction::from_function(function, params).map_err(ExecutionError::Build)?)
    }

    /// Amount at input `index`, always fixed-point encoded.
    ///
    /// The trade hash commits to the fixed-point words, so the reveal must
    /// carry the same words whatever the input is named.
    fn amount_param(
        &self,
        function: &AbiFunctionDescriptor,
        index: usize,
        value: Decimal,
    ) -> Result<AbiValue, ExecutionError> {
        if !function.is_fixed_input(index) {
            debug!(
                function = %function.signature_name,
                index,
                "Amount input not marked fixed-point, encoding fixed-point anyway"
            );
        }
        self.fxp
            .fix(value)
            .map(AbiValue::Uint)
            .map_err(|e| ExecutionError::Encoding(e.to_string()))
    }
}

impl std::fmt::Debug for TradeProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeProtocol")
            .field("config", &self.config)
            .field("commit", &self.commit_fn.signature_name)
            .field("trade", &self.trade_fn.signature_name)
            .field("short_sell", &self.short_sell_fn.signature_name)
            .finish_non_exhaustive()
    }
}

/// Forward whatever the commitment lifecycle reports after its success.
async fn forward_commit_tail(mut lifecycle: TxLifecycle, observer: &dyn TradeObserver) {
    let mut confirmed = false;
    while let Some(event) = lifecycle.recv().await {
        match event {
            TxEvent::Confirmed(outcome) if !confirmed => {
                confirmed = true;
                debug!(tx_hash = %outcome.tx_hash, "Commitment confirmed");
                observer.on_commit_confirmed(&outcome);
            }
            TxEvent::Failed(failure) => {
                warn!(message = %failure.message, "Commitment failed after success");
            }
            other => {
                debug!(stage = other.stage(), "Ignoring late commitment event");
            }
        }
    }
}

fn bound_function(
    abi: &AbiMap,
    contract: &str,
    method: &str,
    arity: usize,
) -> ProtocolResult<AbiFunctionDescriptor> {
    let function = abi.function(contract, method)?;
    if function.arity() != arity {
        return Err(ProtocolError::Config(format!(
            "{contract}.{} takes {} inputs, expected {arity}",
            function.signature_name,
            function.arity()
        )));
    }
    Ok(function.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdmissionError;
    use crate::observer::{ChannelObserver, ProtocolEvent};
    use alloy::primitives::{keccak256, Bytes, B256, U256};
    use rust_decimal_macros::dec;
    use settle_core::{TradeId, TradeType};
    use settle_ledger::{
        CallReturn, LedgerCall, LedgerFailure, LogEntry, MockLedger, Receipt, TxOutcome,
    };

    const ABI: &str = r#"{
        "Trades": [
            {"type": "function", "name": "commitTrade", "constant": false,
             "inputs": [{"name": "hash", "type": "bytes32"}],
             "outputs": [{"name": "out", "type": "int256"}]}
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

    fn setup() -> (Arc<MockLedger>, TradeProtocol) {
        let ledger = Arc::new(MockLedger::new());
        let abi = Arc::new(AbiMap::from_json(ABI).unwrap());
        let protocol = TradeProtocol::new(ledger.clone(), abi, &ProtocolConfig::default()).unwrap();
        (ledger, protocol)
    }

    fn outcome(byte: u8, call_return: CallReturn) -> TxOutcome {
        TxOutcome {
            tx_hash: B256::repeat_byte(byte),
            block_number: Some(2),
            call_return,
        }
    }

    fn fixed(value: Decimal) -> U256 {
        FixedPoint::default().fix(value).unwrap()
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProtocolEvent>) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        names
    }

    #[test]
    fn test_missing_binding_fails_construction() {
        let ledger = Arc::new(MockLedger::new());
        let abi = Arc::new(AbiMap::from_json(ABI).unwrap());
        let mut config = ProtocolConfig::default();
        config.contracts.fill_event = "log_missing".to_string();

        assert!(matches!(
            TradeProtocol::new(ledger, abi, &config),
            Err(ProtocolError::Abi(_))
        ));
    }

    #[test]
    fn test_reveal_params_follow_fixed_inputs() {
        let (_, protocol) = setup();
        let intent =
            TradeIntent::trade(dec!(10), dec!(5), vec![TradeId::from("0x01")]).unwrap();
        let tx = protocol.build_reveal(&intent).unwrap();

        assert_eq!(tx.method, "trade");
        assert_eq!(
            tx.params,
            vec![
                AbiValue::Uint(fixed(dec!(10))),
                AbiValue::Uint(fixed(dec!(5))),
                AbiValue::Bytes32Array(vec![TradeId::from("0x01").to_word()]),
            ]
        );

        let short = TradeIntent::short_sell(TradeId::from("t9"), dec!(3)).unwrap();
        let tx = protocol.build_reveal(&short).unwrap();
        assert_eq!(tx.method, "short_sell");
        assert_eq!(tx.params[0], AbiValue::Bytes32(TradeId::from("t9").to_word()));
        assert_eq!(tx.params[1], AbiValue::Uint(fixed(dec!(3))));
    }

    #[test]
    fn test_reveal_words_hash_to_commitment_without_fixed_names() {
        let ledger = Arc::new(MockLedger::new());
        let plain = ABI
            .replace("fxpMaxValue", "maxValue")
            .replace("fxpMaxAmount", "maxAmount")
            .replace("fxpAmount", "amount");
        let abi = Arc::new(AbiMap::from_json(&plain).unwrap());
        let protocol = TradeProtocol::new(ledger, abi, &ProtocolConfig::default()).unwrap();
        assert!(!protocol.trade_fn.is_fixed_input(0));

        let intent = TradeIntent::trade(
            dec!(10),
            dec!(5),
            vec![TradeId::from("0x01"), TradeId::from("t2")],
        )
        .unwrap();
        let tx = protocol.build_reveal(&intent).unwrap();

        let mut data = Vec::new();
        for param in &tx.params {
            match param {
                AbiValue::Uint(word) => data.extend_from_slice(&word.to_be_bytes::<32>()),
                AbiValue::Bytes32Array(words) => {
                    words.iter().for_each(|w| data.extend_from_slice(w.as_slice()))
                }
                other => panic!("unexpected trade param {other:?}"),
            }
        }
        let hash = intent.hash(&FixedPoint::default()).unwrap();
        assert_eq!(keccak256(&data), hash.as_b256());
        assert_eq!(tx.params[0], AbiValue::Uint(fixed(dec!(10))));

        let short = TradeIntent::short_sell(TradeId::from("t9"), dec!(3)).unwrap();
        let tx = protocol.build_reveal(&short).unwrap();
        assert_eq!(tx.params[1], AbiValue::Uint(fixed(dec!(3))));
    }

    #[tokio::test]
    async fn test_gas_rejection_never_commits() {
        let (ledger, protocol) = setup();
        ledger.insert_trade("t1", TradeType::Buy);
        ledger.set_gas_limit(787_420);
        let (observer, mut rx) = ChannelObserver::new();

        let intent = TradeIntent::trade(dec!(1), dec!(1), vec![TradeId::from("t1")]).unwrap();
        let error = protocol.submit(intent, &observer).await.unwrap_err();

        assert_eq!(
            error,
            TradeError::Admission(AdmissionError::GasLimitExceeded {
                cost: 787_421,
                ceiling: 787_420
            })
        );
        assert_eq!(drain(&mut rx), vec!["commit_failed"]);
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_stops_before_fast_forward() {
        let (ledger, protocol) = setup();
        ledger.insert_trade("t1", TradeType::Sell);
        ledger.push_script(vec![TxEvent::Failed(LedgerFailure {
            code: Some(-32000),
            message: "nonce too low".to_string(),
        })]);
        let (observer, mut rx) = ChannelObserver::new();

        let intent = TradeIntent::trade(dec!(1), dec!(1), vec![TradeId::from("t1")]).unwrap();
        let error = protocol.submit(intent, &observer).await.unwrap_err();

        assert_eq!(error.kind(), TradeErrorKind::Commitment);
        assert_eq!(drain(&mut rx), vec!["trade_hash", "commit_failed"]);
        assert!(ledger.fast_forwards().is_empty());
        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_short_sell_confirmed_result_wins() {
        let (ledger, protocol) = setup();
        let returned = CallReturn::Tuple(vec![
            U256::from(1),
            fixed(dec!(0)),
            fixed(dec!(3)),
            fixed(dec!(2)),
        ]);
        ledger.push_script(vec![
            TxEvent::Sent(outcome(1, CallReturn::Empty)),
            TxEvent::Success(outcome(1, CallReturn::Empty)),
            TxEvent::Confirmed(outcome(1, CallReturn::Empty)),
        ]);
        ledger.push_script(vec![
            TxEvent::Sent(outcome(2, CallReturn::Empty)),
            TxEvent::Success(outcome(2, returned.clone())),
            TxEvent::Confirmed(outcome(2, returned)),
        ]);

        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(2).to_be_bytes::<32>());
        data.extend_from_slice(&fixed(dec!(2)).to_be_bytes::<32>());
        data.extend_from_slice(&fixed(dec!(3)).to_be_bytes::<32>());
        ledger.insert_receipt(Receipt {
            tx_hash: B256::repeat_byte(2),
            block_number: Some(3),
            error: None,
            logs: vec![LogEntry {
                topics: vec![protocol.parser().fill_topic()],
                data: Bytes::from(data),
            }],
        });

        let (observer, mut rx) = ChannelObserver::new();
        let intent = TradeIntent::short_sell(TradeId::from("t9"), dec!(3)).unwrap();
        let result = protocol.submit(intent, &observer).await.unwrap();

        let short = result.as_short_sell().unwrap();
        assert_eq!(short.cash_from_trade, dec!(6));
        assert_eq!(short.price.inner(), dec!(2));

        let names = drain(&mut rx);
        assert!(names.contains(&"commit_confirmed"));
        assert!(names.contains(&"trade_confirmed"));
        assert!(!ledger
            .calls()
            .iter()
            .any(|call| matches!(call, LedgerCall::GetTrade(_))));
    }

    #[tokio::test]
    async fn test_submit_resolves_after_commit_tail_is_forwarded() {
        let (ledger, protocol) = setup();
        ledger.insert_trade("t1", TradeType::Buy);
        ledger.push_script(vec![
            TxEvent::Sent(outcome(1, CallReturn::Empty)),
            TxEvent::Success(outcome(1, CallReturn::Empty)),
            TxEvent::Confirmed(outcome(1, CallReturn::Empty)),
            TxEvent::Confirmed(outcome(1, CallReturn::Empty)),
            TxEvent::Failed(LedgerFailure {
                code: None,
                message: "reorged".to_string(),
            }),
        ]);
        let returned = CallReturn::Tuple(vec![U256::from(1), fixed(dec!(1)), fixed(dec!(1))]);
        ledger.push_script(vec![
            TxEvent::Sent(outcome(2, CallReturn::Empty)),
            TxEvent::Success(outcome(2, returned)),
        ]);
        ledger.insert_receipt(Receipt {
            tx_hash: B256::repeat_byte(2),
            block_number: Some(3),
            error: None,
            logs: vec![],
        });

        let (observer, mut rx) = ChannelObserver::new();
        let intent = TradeIntent::trade(dec!(2), dec!(2), vec![TradeId::from("t1")]).unwrap();
        protocol.submit(intent, &observer).await.unwrap();

        let names = drain(&mut rx);
        let confirmations = names.iter().filter(|name| **name == "commit_confirmed").count();
        assert_eq!(confirmations, 1);
        assert!(!names.contains(&"commit_failed"));
        assert!(names.contains(&"trade_success"));
    }
}
