//! Ledger collaborator contract.
//!
//! The protocol never talks to a chain directly. It goes through the
//! [`Ledger`] trait: block lookup, trade lookup, transaction submission with
//! a four-stage lifecycle, block fast-forward, receipt retrieval, log payload
//! decoding and contract error classification.
//!
//! [`MockLedger`] is a scripted in-memory implementation for tests.

pub mod error;
pub mod ledger;
pub mod mock;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{BoxFuture, DynLedger, Ledger, TxLifecycle};
pub use mock::{scalar_return, LedgerCall, MockLedger};
pub use types::{
    AbiValue, Block, CallReturn, ErrorCode, LedgerFailure, LogEntry, Receipt, TradeRecord,
    Transaction, TxEvent, TxOutcome,
};
