//! # Forgelog - Structured Log Sink
//!
//! Leveled, timestamped log records written to one of three interchangeable
//! backends chosen at construction time:
//! - Console: formatted lines on standard output
//! - DelimitedFile: append-only quoted CSV with a fixed header row
//! - EmbeddedTable: a `logs` table inside an embedded SQLite database
//!
//! Only configuration mistakes surface as errors. Backend failures are
//! reported through an injectable [`Diagnostics`] channel and never reach
//! the caller of [`LogSink::record`].

pub mod config;
pub mod delimited;
pub mod diagnostics;
pub mod entry;
pub mod sink;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use config::{BackendKind, SinkOptions};
pub use diagnostics::{Diagnostics, RecordingDiagnostics, StderrDiagnostics, TracingDiagnostics};
pub use entry::{Clock, LogEntry, SystemClock};
pub use sink::{LogSink, SinkBuilder, SinkState};
pub use storage::{BundledSqlite, DatabaseDriver, LogStore, NoDatabase};

/// Result type alias for Forgelog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Forgelog operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
