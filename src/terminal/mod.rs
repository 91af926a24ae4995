pub mod http;

pub use http::HttpTerminal;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// A single tick exactly as the terminal reports it, field name to value.
///
/// Field order follows the terminal's record layout.
pub type RawTick = serde_json::Map<String, serde_json::Value>;

/// Selects which tick stream `copy_ticks_range` returns.
///
/// The numeric values match the terminal's `COPY_TICKS_*` flags:
/// - `All`: every tick
/// - `Info`: ticks carrying bid/ask changes
/// - `Trade`: ticks carrying last price and volume changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyTicks {
    #[default]
    All,
    Info,
    Trade,
}

impl CopyTicks {
    /// The terminal's numeric `COPY_TICKS_*` value, as sent to the bridge.
    pub fn as_flag(self) -> i32 {
        match self {
            CopyTicks::All => -1,
            CopyTicks::Info => 1,
            CopyTicks::Trade => 2,
        }
    }
}

impl std::str::FromStr for CopyTicks {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(CopyTicks::All),
            "info" => Ok(CopyTicks::Info),
            "trade" => Ok(CopyTicks::Trade),
            other => Err(format!("unknown tick flags '{}', expected all, info or trade", other)),
        }
    }
}

/// The terminal's own error code and description, as returned by `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LastError(pub i64, pub String);

impl std::fmt::Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {:?})", self.0, self.1)
    }
}

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("terminal bridge returned {status} for {operation}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("terminal rejected request: {0}")]
    Rejected(LastError),
}

/// Connection to a trading terminal that can serve historical ticks.
///
/// A terminal is a process-wide resource: callers must pair every
/// `initialize` with a `shutdown`, whatever happens in between.
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Establishes the connection. `Ok(false)` means the terminal refused it;
    /// `last_error` then describes why.
    async fn initialize(&self) -> Result<bool, TerminalError>;

    /// The most recent error recorded by the terminal.
    async fn last_error(&self) -> Result<LastError, TerminalError>;

    /// Shows (`enable = true`) or hides a symbol in the market watch.
    /// Returns `false` if the terminal does not know the symbol.
    async fn symbol_select(&self, symbol: &str, enable: bool) -> Result<bool, TerminalError>;

    /// Ticks for `symbol` between `from` and `to`, both inclusive.
    ///
    /// `None` means the terminal failed to produce a result at all, which
    /// callers treat the same as an empty batch.
    async fn copy_ticks_range(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        flags: CopyTicks,
    ) -> Result<Option<Vec<RawTick>>, TerminalError>;

    async fn shutdown(&self) -> Result<(), TerminalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_ticks_flags() {
        assert_eq!(CopyTicks::All.as_flag(), -1);
        assert_eq!(CopyTicks::Info.as_flag(), 1);
        assert_eq!(CopyTicks::Trade.as_flag(), 2);
        assert_eq!(CopyTicks::default(), CopyTicks::All);
    }

    #[test]
    fn test_copy_ticks_parse() {
        assert_eq!("ALL".parse::<CopyTicks>().unwrap(), CopyTicks::All);
        assert_eq!(" trade ".parse::<CopyTicks>().unwrap(), CopyTicks::Trade);
        assert!("bidask".parse::<CopyTicks>().is_err());
    }

    #[test]
    fn test_last_error_display() {
        let err = LastError(-10003, "IPC initialize failed".to_string());
        assert_eq!(err.to_string(), "(-10003, \"IPC initialize failed\")");
    }
}
