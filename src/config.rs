use crate::data::TickRequest;
use crate::terminal::CopyTicks;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_TERMINAL_URL: &str = "http://127.0.0.1:8222";
pub const DEFAULT_SYMBOL: &str = "DXY";
pub const DEFAULT_FROM: &str = "2020-01-01T00:00:00";
pub const DEFAULT_TO: &str = "2025-12-31T23:59:59";
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for one export run.
///
/// Read from the environment (after `.env` has been loaded):
/// * `TERMINAL_URL`: base URL of the terminal bridge
/// * `TICK_SYMBOL`: symbol to export
/// * `TICK_FROM` / `TICK_TO`: inclusive UTC range, `YYYY-MM-DDTHH:MM:SS` or RFC 3339
/// * `TICK_FLAGS`: `all`, `info` or `trade`
/// * `TICK_OUTPUT_DIR`: directory the CSV file is written to
/// * `TICK_PREVIEW_ROWS`: rows to log before writing, `0` disables the preview
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub terminal_url: String,
    pub request: TickRequest,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
}

impl ExportConfig {
    /// Builds the configuration from process environment variables.
    ///
    /// # Errors
    /// Returns an error if any variable is set to an unparseable value
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset or blank
    /// keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let terminal_url = get("TERMINAL_URL").unwrap_or_else(|| DEFAULT_TERMINAL_URL.to_string());
        let symbol = get("TICK_SYMBOL").unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

        let from = parse_utc(
            "TICK_FROM",
            &get("TICK_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
        )?;
        let to = parse_utc(
            "TICK_TO",
            &get("TICK_TO").unwrap_or_else(|| DEFAULT_TO.to_string()),
        )?;

        let flags = match get("TICK_FLAGS") {
            Some(raw) => raw.parse::<CopyTicks>().map_err(|reason| ConfigError::Invalid {
                key: "TICK_FLAGS",
                value: raw.clone(),
                reason,
            })?,
            None => CopyTicks::default(),
        };

        let output_dir = get("TICK_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let preview_rows = match get("TICK_PREVIEW_ROWS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::Invalid {
                key: "TICK_PREVIEW_ROWS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PREVIEW_ROWS,
        };

        Ok(Self {
            terminal_url,
            request: TickRequest::new(symbol, from, to).with_flags(flags),
            output_dir,
            preview_rows,
        })
    }
}

/// Parses an RFC 3339 timestamp, or a naive one taken as UTC.
fn parse_utc(key: &'static str, raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExportConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.terminal_url, DEFAULT_TERMINAL_URL);
        assert_eq!(config.request.symbol, "DXY");
        assert_eq!(
            config.request.from,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            config.request.to,
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()
        );
        assert_eq!(config.request.flags, CopyTicks::All);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn test_overrides() {
        let config = ExportConfig::from_lookup(lookup(&[
            ("TERMINAL_URL", "http://bridge:9000"),
            ("TICK_SYMBOL", "XAUUSD"),
            ("TICK_FROM", "2024-03-01T08:00:00+02:00"),
            ("TICK_TO", "2024-03-02 00:00:00"),
            ("TICK_FLAGS", "trade"),
            ("TICK_OUTPUT_DIR", "/tmp/ticks"),
            ("TICK_PREVIEW_ROWS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.terminal_url, "http://bridge:9000");
        assert_eq!(config.request.symbol, "XAUUSD");
        assert_eq!(
            config.request.from,
            Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
        );
        assert_eq!(
            config.request.to,
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(config.request.flags, CopyTicks::Trade);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/ticks"));
        assert_eq!(config.preview_rows, 0);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = ExportConfig::from_lookup(lookup(&[("TICK_SYMBOL", "  ")])).unwrap();
        assert_eq!(config.request.symbol, DEFAULT_SYMBOL);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = ExportConfig::from_lookup(lookup(&[("TICK_FROM", "yesterday")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TICK_FROM", .. }));

        let err = ExportConfig::from_lookup(lookup(&[("TICK_FLAGS", "quotes")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TICK_FLAGS", .. }));

        let err =
            ExportConfig::from_lookup(lookup(&[("TICK_PREVIEW_ROWS", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TICK_PREVIEW_ROWS", .. }));
    }
}
