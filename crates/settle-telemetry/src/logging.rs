//! Subscriber setup for settlement traces.
//!
//! Protocol phases log with structured fields (`kind`, `tx_hash`,
//! `trade_hash`, `state`), so the JSON form is the one to ship. The format
//! is read from `SETTLE_LOG_FORMAT` and the filter from `RUST_LOG`.

use std::str::FromStr;

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "SETTLE_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset: phase transitions and ledger calls
/// at debug, everything else at info.
pub const DEFAULT_FILTER: &str = "info,settle_protocol=debug,settle_ledger=debug";

/// Output format of the settlement subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with the enclosing spans.
    Json,
    #[default]
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> TelemetryResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(TelemetryError::InvalidFormat(other.to_string())),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directives.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LogSettings {
    /// Settings from `SETTLE_LOG_FORMAT` and `RUST_LOG`.
    ///
    /// An unset variable falls back to its default; an unknown format is an
    /// error rather than a silent fallback.
    pub fn from_env() -> TelemetryResult<Self> {
        Self::from_vars(
            std::env::var(FORMAT_ENV).ok().as_deref(),
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        )
    }

    fn from_vars(format: Option<&str>, filter: Option<&str>) -> TelemetryResult<Self> {
        let format = format.map(str::parse::<LogFormat>).transpose()?.unwrap_or_default();
        let filter = filter
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FILTER)
            .to_string();
        Ok(Self { format, filter })
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| TelemetryError::InvalidFilter {
            filter: self.filter.clone(),
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber from the environment.
///
/// # Errors
/// `InvalidFormat` or `InvalidFilter` for bad settings, `LoggingInit` if a
/// global subscriber is already set.
pub fn init_logging() -> TelemetryResult<()> {
    init_with(&LogSettings::from_env()?)
}

/// Install the global subscriber with explicit settings.
pub fn init_with(settings: &LogSettings) -> TelemetryResult<()> {
    let registry = tracing_subscriber::registry().with(settings.env_filter()?);

    let result = match settings.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_vars_use_settlement_defaults() {
        let settings = LogSettings::from_vars(None, Some("  ")).unwrap();
        assert_eq!(settings, LogSettings::default());
        assert!(settings.filter.contains("settle_protocol=debug"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!(
            LogSettings::from_vars(Some("xml"), None),
            Err(TelemetryError::InvalidFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn test_bad_filter_is_reported_before_install() {
        let settings = LogSettings {
            format: LogFormat::Json,
            filter: "settle_protocol=loud".to_string(),
        };
        assert!(matches!(
            init_with(&settings),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_second_init_is_rejected() {
        let settings = LogSettings {
            format: LogFormat::Compact,
            ..LogSettings::default()
        };
        let _ = init_with(&settings);
        assert!(matches!(
            init_with(&settings),
            Err(TelemetryError::LoggingInit(_))
        ));
    }
}
