//! Lifecycle callbacks.
//!
//! Every callback is optional: the trait methods default to no-ops, so an
//! observer overrides only the stages it cares about. Callbacks fire in
//! protocol order and at most once per stage, except `on_commit_confirmed`
//! and `on_trade_confirmed`, which are informational.

use settle_core::{SettlementResult, TradeHash};
use settle_ledger::TxOutcome;
use tokio::sync::mpsc;

use crate::error::TradeError;

/// Receiver of protocol lifecycle notifications.
pub trait TradeObserver: Send + Sync {
    fn on_trade_hash(&self, _hash: &TradeHash) {}

    fn on_commit_sent(&self, _outcome: &TxOutcome) {}

    fn on_commit_success(&self, _outcome: &TxOutcome) {}

    fn on_commit_confirmed(&self, _outcome: &TxOutcome) {}

    /// Admission, commitment and fast-forward failures land here.
    fn on_commit_failed(&self, _error: &TradeError) {}

    /// The chain advanced past the commitment block.
    fn on_next_block(&self, _block_number: u64) {}

    fn on_trade_sent(&self, _outcome: &TxOutcome) {}

    fn on_trade_success(&self, _settlement: &SettlementResult) {}

    fn on_trade_confirmed(&self, _settlement: &SettlementResult) {}

    fn on_trade_failed(&self, _error: &TradeError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TradeObserver for NoopObserver {}

/// One lifecycle notification, as forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    TradeHash(TradeHash),
    CommitSent(TxOutcome),
    CommitSuccess(TxOutcome),
    CommitConfirmed(TxOutcome),
    CommitFailed(TradeError),
    NextBlock(u64),
    TradeSent(TxOutcome),
    TradeSuccess(SettlementResult),
    TradeConfirmed(SettlementResult),
    TradeFailed(TradeError),
}

impl ProtocolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolEvent::TradeHash(_) => "trade_hash",
            ProtocolEvent::CommitSent(_) => "commit_sent",
            ProtocolEvent::CommitSuccess(_) => "commit_success",
            ProtocolEvent::CommitConfirmed(_) => "commit_confirmed",
            ProtocolEvent::CommitFailed(_) => "commit_failed",
            ProtocolEvent::NextBlock(_) => "next_block",
            ProtocolEvent::TradeSent(_) => "trade_sent",
            ProtocolEvent::TradeSuccess(_) => "trade_success",
            ProtocolEvent::TradeConfirmed(_) => "trade_confirmed",
            ProtocolEvent::TradeFailed(_) => "trade_failed",
        }
    }
}

/// Observer that forwards every notification into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ProtocolEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProtocolEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ProtocolEvent) {
        // Receiver gone means nobody is listening.
        let _ = self.tx.send(event);
    }
}

impl TradeObserver for ChannelObserver {
    fn on_trade_hash(&self, hash: &TradeHash) {
        self.emit(ProtocolEvent::TradeHash(*hash));
    }

    fn on_commit_sent(&self, outcome: &TxOutcome) {
        self.emit(ProtocolEvent::CommitSent(outcome.clone()));
    }

    fn on_commit_success(&self, outcome: &TxOutcome) {
        self.emit(ProtocolEvent::CommitSuccess(outcome.clone()));
    }

    fn on_commit_confirmed(&self, outcome: &TxOutcome) {
        self.emit(ProtocolEvent::CommitConfirmed(outcome.clone()));
    }

    fn on_commit_failed(&self, error: &TradeError) {
        self.emit(ProtocolEvent::CommitFailed(error.clone()));
    }

    fn on_next_block(&self, block_number: u64) {
        self.emit(ProtocolEvent::NextBlock(block_number));
    }

    fn on_trade_sent(&self, outcome: &TxOutcome) {
        self.emit(ProtocolEvent::TradeSent(outcome.clone()));
    }

    fn on_trade_success(&self, settlement: &SettlementResult) {
        self.emit(ProtocolEvent::TradeSuccess(settlement.clone()));
    }

    fn on_trade_confirmed(&self, settlement: &SettlementResult) {
        self.emit(ProtocolEvent::TradeConfirmed(settlement.clone()));
    }

    fn on_trade_failed(&self, error: &TradeError) {
        self.emit(ProtocolEvent::TradeFailed(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdmissionError;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_next_block(4);
        observer.on_commit_failed(&TradeError::from(AdmissionError::GasLimitExceeded {
            cost: 2,
            ceiling: 1,
        }));

        assert_eq!(rx.try_recv().unwrap(), ProtocolEvent::NextBlock(4));
        assert_eq!(rx.try_recv().unwrap().name(), "commit_failed");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_next_block(1);
    }

    #[test]
    fn test_noop_observer_accepts_everything() {
        NoopObserver.on_next_block(1);
    }
}
