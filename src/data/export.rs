use super::processing::{format_cell, format_timestamp, INDEX_COLUMN};
use super::{ExportError, TickFrame, TickIngestion, TickRequest, TimeColumn};
use crate::config::ExportConfig;
use crate::terminal::Terminal;
use chrono::{DateTime, Datelike, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub time_column: TimeColumn,
}

/// File name for a symbol and range, e.g. `DXY_ticks_2020_2025.csv`.
///
/// Characters other than ASCII alphanumerics, `.`, `_` and `-` in the symbol
/// are replaced with `_` so names like `XAU/USD` stay a single path segment.
pub fn output_file_name(symbol: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let safe: String = symbol
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{}_ticks_{}_{}.csv", safe, from.year(), to.year())
}

/// Writes the table as CSV: a `time` index column followed by the tick
/// columns, one record per tick.
pub fn write_csv<W: io::Write>(frame: &TickFrame, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(frame.columns().len() + 1);
    header.push(INDEX_COLUMN);
    header.extend(frame.columns().iter().map(String::as_str));
    csv_writer.write_record(&header)?;

    for (timestamp, cells) in frame.iter() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(format_timestamp(timestamp, frame.time_column()));
        record.extend(cells.iter().map(format_cell));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Runs one complete export: connect, select, fetch, reshape, write.
///
/// The terminal is shut down before this returns on every path once the
/// range has been validated, including when `initialize` itself fails.
/// Nothing is written unless every step before the write succeeds; an
/// existing file with the same name is overwritten.
///
/// # Errors
/// Returns the first `ExportError` encountered; see its variants
pub async fn export_ticks<T: Terminal + ?Sized>(
    terminal: &T,
    config: &ExportConfig,
) -> Result<ExportSummary, ExportError> {
    config.request.validate()?;

    let ingestion = TickIngestion::new(terminal);
    let result = run_export(&ingestion, config).await;
    ingestion.disconnect().await;

    result
}

async fn run_export<T: Terminal + ?Sized>(
    ingestion: &TickIngestion<'_, T>,
    config: &ExportConfig,
) -> Result<ExportSummary, ExportError> {
    let request: &TickRequest = &config.request;

    ingestion.connect().await?;
    ingestion.select_symbol(&request.symbol).await?;
    let ticks = ingestion.fetch_ticks(request).await?;

    let frame = TickFrame::from_ticks(ticks)?;
    tracing::info!(
        columns = ?frame.columns(),
        time_column = frame.time_column().field(),
        "tick data columns"
    );
    if config.preview_rows > 0 {
        tracing::info!("\n{}", frame.preview(config.preview_rows));
    }
    if !frame.is_monotonic() {
        tracing::warn!(symbol = %request.symbol, "tick timestamps are not in order");
    }

    let path = config
        .output_dir
        .join(output_file_name(&request.symbol, request.from, request.to));
    write_file(&frame, &path)?;

    tracing::info!(path = %path.display(), rows = frame.len(), "tick file written");

    Ok(ExportSummary {
        path,
        rows: frame.len(),
        time_column: frame.time_column(),
    })
}

/// Writes into a temporary file beside `path` and renames it into place, so
/// a failed write leaves any previous file untouched and no partial CSV.
fn write_file(frame: &TickFrame, path: &Path) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    write_csv(frame, io::BufWriter::new(staged.as_file_mut()))?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
