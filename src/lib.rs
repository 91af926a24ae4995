//! Historical tick export from a trading terminal, plus the capability
//! contract for real-time message transports.

pub mod config;
pub mod data;
pub mod terminal;
pub mod transport;

pub use config::{ConfigError, ExportConfig};
pub use data::{export_ticks, ExportError, ExportSummary, TickFrame, TickRequest, TimeColumn};
pub use terminal::{CopyTicks, HttpTerminal, RawTick, Terminal, TerminalError};
pub use transport::{BaseTransport, Transport, TransportCallbacks, TransportError};
