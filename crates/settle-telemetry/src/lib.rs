//! Prometheus metrics and structured logging for trade settlement.
//!
//! - Structured logging with tracing, format and filter from the environment
//! - Counters for protocol starts, phase failures and delivered settlements

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_with, LogFormat, LogSettings};
pub use metrics::Metrics;
