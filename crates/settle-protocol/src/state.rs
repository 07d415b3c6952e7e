//! Protocol phase tracking.
//!
//! A trade walks GasCheck -> Hashing -> Committing -> Advancing -> Executing
//! -> Settled. A short-sell starts at Hashing. Any phase may fail, and the
//! Settled phase may be re-entered when a confirmation replaces a
//! provisional result.

use settle_core::IntentKind;
use tracing::debug;

/// Phase of one protocol invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    GasCheck,
    Hashing,
    Committing,
    Advancing,
    Executing,
    Settled,
    Failed,
}

impl ProtocolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolState::GasCheck => "gas_check",
            ProtocolState::Hashing => "hashing",
            ProtocolState::Committing => "committing",
            ProtocolState::Advancing => "advancing",
            ProtocolState::Executing => "executing",
            ProtocolState::Settled => "settled",
            ProtocolState::Failed => "failed",
        }
    }

    /// Protocol half ("commit" or "reveal"), used as the failure metric label.
    pub fn phase(&self) -> &'static str {
        match self {
            ProtocolState::GasCheck
            | ProtocolState::Hashing
            | ProtocolState::Committing
            | ProtocolState::Advancing => "commit",
            ProtocolState::Executing | ProtocolState::Settled | ProtocolState::Failed => "reveal",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolState::Failed)
    }

    pub fn can_transition_to(&self, next: ProtocolState) -> bool {
        use ProtocolState::*;
        matches!(
            (self, next),
            (GasCheck, Hashing)
                | (Hashing, Committing)
                | (Committing, Advancing)
                | (Advancing, Executing)
                | (Executing, Settled)
                | (Settled, Settled)
                | (GasCheck | Hashing | Committing | Advancing | Executing | Settled, Failed)
        )
    }
}

impl std::fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current phase of one invocation.
#[derive(Debug)]
pub struct StateMachine {
    kind: IntentKind,
    state: ProtocolState,
}

impl StateMachine {
    /// Initial phase for `kind`.
    pub fn new(kind: IntentKind) -> Self {
        let state = match kind {
            IntentKind::Trade => ProtocolState::GasCheck,
            IntentKind::ShortSell => ProtocolState::Hashing,
        };
        Self { kind, state }
    }

    #[inline]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Move to `next`. Returns false and stays put on an illegal transition.
    pub fn advance(&mut self, next: ProtocolState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!(
                kind = %self.kind,
                from = %self.state,
                to = %next,
                "Rejected protocol transition"
            );
            return false;
        }
        debug!(kind = %self.kind, from = %self.state, to = %next, "Protocol transition");
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_walks_every_phase() {
        let mut machine = StateMachine::new(IntentKind::Trade);
        assert_eq!(machine.state(), ProtocolState::GasCheck);
        for next in [
            ProtocolState::Hashing,
            ProtocolState::Committing,
            ProtocolState::Advancing,
            ProtocolState::Executing,
            ProtocolState::Settled,
            ProtocolState::Settled,
        ] {
            assert!(machine.advance(next), "to {next}");
        }
    }

    #[test]
    fn test_short_sell_skips_gas_check() {
        let machine = StateMachine::new(IntentKind::ShortSell);
        assert_eq!(machine.state(), ProtocolState::Hashing);
    }

    #[test]
    fn test_no_skipping_or_leaving_failed() {
        let mut machine = StateMachine::new(IntentKind::Trade);
        assert!(!machine.advance(ProtocolState::Executing));
        assert_eq!(machine.state(), ProtocolState::GasCheck);

        assert!(machine.advance(ProtocolState::Failed));
        assert!(machine.state().is_terminal());
        assert!(!machine.advance(ProtocolState::Hashing));
        assert!(!machine.advance(ProtocolState::Failed));
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(ProtocolState::GasCheck.phase(), "commit");
        assert_eq!(ProtocolState::Advancing.phase(), "commit");
        assert_eq!(ProtocolState::Executing.phase(), "reveal");
    }
}
