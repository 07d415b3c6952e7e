//! Integration tests for settle-protocol.
//!
//! These tests drive full commit-reveal runs against the scripted ledger:
//! - Trade and short-sell settlement end to end
//! - Failure routing per phase
//! - Ledger call ordering

pub mod common;
