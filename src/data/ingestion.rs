use super::ExportError;
use crate::terminal::{CopyTicks, LastError, RawTick, Terminal};
use chrono::{DateTime, Utc};

/// What to pull from the terminal: one symbol over an inclusive UTC range.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRequest {
    pub symbol: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub flags: CopyTicks,
}

impl TickRequest {
    pub fn new(symbol: impl Into<String>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            from,
            to,
            flags: CopyTicks::All,
        }
    }

    pub fn with_flags(mut self, flags: CopyTicks) -> Self {
        self.flags = flags;
        self
    }

    /// # Errors
    /// Returns `InvalidRange` if `from` is after `to`
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.from > self.to {
            return Err(ExportError::InvalidRange {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }
}

/// Drives the terminal through one retrieval: connect, select the symbol,
/// copy the ticks, disconnect.
///
/// Each step turns the terminal's soft failures (`false`, `None`, empty
/// batches) into the matching `ExportError`. Releasing the connection is the
/// caller's job and must happen whatever these steps return; see
/// [`export_ticks`](super::export_ticks).
pub struct TickIngestion<'a, T: Terminal + ?Sized> {
    terminal: &'a T,
}

impl<'a, T: Terminal + ?Sized> TickIngestion<'a, T> {
    pub fn new(terminal: &'a T) -> Self {
        Self { terminal }
    }

    /// Initializes the terminal connection.
    ///
    /// # Errors
    /// Returns `InitializationFailed` with the terminal's last error if the
    /// terminal refuses the connection
    pub async fn connect(&self) -> Result<(), ExportError> {
        if self.terminal.initialize().await? {
            tracing::info!("terminal connection initialized");
            return Ok(());
        }

        let last_error = match self.terminal.last_error().await {
            Ok(err) => err,
            Err(e) => LastError(-1, e.to_string()),
        };
        Err(ExportError::InitializationFailed(last_error))
    }

    /// Makes `symbol` available in the terminal's market watch.
    ///
    /// # Errors
    /// Returns `SymbolSelectFailed` if the terminal does not know the symbol
    pub async fn select_symbol(&self, symbol: &str) -> Result<(), ExportError> {
        if !self.terminal.symbol_select(symbol, true).await? {
            return Err(ExportError::SymbolSelectFailed(symbol.to_string()));
        }
        tracing::info!(symbol, "symbol selected");
        Ok(())
    }

    /// Fetches every tick in the request's range.
    ///
    /// # Errors
    /// Returns `NoTicks` if the terminal produced no result or an empty batch
    pub async fn fetch_ticks(&self, request: &TickRequest) -> Result<Vec<RawTick>, ExportError> {
        tracing::info!(
            symbol = %request.symbol,
            from = %request.from,
            to = %request.to,
            flags = ?request.flags,
            "requesting ticks"
        );

        let ticks = self
            .terminal
            .copy_ticks_range(&request.symbol, request.from, request.to, request.flags)
            .await?
            .unwrap_or_default();

        if ticks.is_empty() {
            return Err(ExportError::NoTicks(request.symbol.clone()));
        }

        tracing::info!(symbol = %request.symbol, count = ticks.len(), "ticks retrieved");
        Ok(ticks)
    }

    /// Shuts the terminal connection down. Failures are logged, not returned,
    /// so they never mask the outcome of the retrieval itself.
    pub async fn disconnect(&self) {
        match self.terminal.shutdown().await {
            Ok(()) => tracing::info!("terminal connection shut down"),
            Err(e) => tracing::warn!(error = %e, "terminal shutdown failed"),
        }
    }
}
