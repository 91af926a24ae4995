pub mod export;
pub mod ingestion;
pub mod processing;

pub use export::{export_ticks, output_file_name, write_csv, ExportSummary};
pub use ingestion::{TickIngestion, TickRequest};
pub use processing::{TickFrame, TimeColumn};

use crate::terminal::{LastError, TerminalError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Everything that can abort a tick export. The first failure ends the run;
/// no output file is written once any of these is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid range: {from} is after {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("initialize() failed, error code = {0}")]
    InitializationFailed(LastError),

    #[error("failed to select symbol {0}")]
    SymbolSelectFailed(String),

    #[error("no tick data retrieved for {0}")]
    NoTicks(String),

    #[error("no recognizable time column found in tick data (columns: {columns:?})")]
    UnrecognizedTimeColumn { columns: Vec<String> },

    #[error("tick {row} has an unusable {field} value: {value}")]
    InvalidTimestamp {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("failed to write tick file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode tick file: {0}")]
    Csv(#[from] csv::Error),
}
