//! Structured log sink
//!
//! A sink is built once with a [`SinkOptions`] and writes every accepted
//! record to exactly one backend. The only error construction can return is
//! [`Error::Configuration`]; an embedded table that cannot be used is
//! replaced by console output and reported through [`Diagnostics`].
//! Once built, nothing a sink does returns an error to its caller.

use crate::config::{BackendKind, SinkOptions, ensure_parent_dir};
use crate::delimited::DelimitedFile;
use crate::diagnostics::{Diagnostics, StderrDiagnostics};
use crate::entry::{Clock, LogEntry, SystemClock, level};
use crate::storage::{BundledSqlite, DatabaseDriver, LogStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Lifecycle of a sink; `Closed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Open,
    Closed,
}

enum ConsoleWriter {
    Stdout,
    Custom(Box<dyn Write + Send>),
}

impl ConsoleWriter {
    fn write_entry(&mut self, entry: &LogEntry) {
        // console output never fails the caller
        let _ = match self {
            Self::Stdout => {
                let line = crate::ui::styled_entry(&entry.timestamp, &entry.level, &entry.message);
                writeln!(std::io::stdout().lock(), "{}", line)
            }
            Self::Custom(writer) => writeln!(writer, "{}", entry.console_line()),
        };
    }
}

enum Backend {
    Console(ConsoleWriter),
    DelimitedFile(DelimitedFile),
    /// `None` once the connection has been released
    EmbeddedTable(Option<LogStore>),
}

impl Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Self::Console(_) => BackendKind::Console,
            Self::DelimitedFile(_) => BackendKind::DelimitedFile,
            Self::EmbeddedTable(_) => BackendKind::EmbeddedTable,
        }
    }
}

/// Leveled, timestamped log sink over a single backend
pub struct LogSink {
    requested: BackendKind,
    backend: Backend,
    state: SinkState,
    diagnostics: Arc<dyn Diagnostics>,
    clock: Arc<dyn Clock>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl LogSink {
    /// Build a sink with the default driver, clock and diagnostics
    pub fn new(options: SinkOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    pub fn builder(options: SinkOptions) -> SinkBuilder {
        SinkBuilder::new(options)
    }

    /// Backend actually in use, after any fallback to console
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn requested_backend(&self) -> BackendKind {
        self.requested
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SinkState::Closed
    }

    /// Append one entry to the active backend.
    ///
    /// Write failures are reported through the diagnostics channel and
    /// swallowed. A record on a closed embedded-table sink is dropped.
    pub fn record(&mut self, level: &str, message: &str) {
        if level.is_empty() {
            self.diagnostics.error("Rejected log record with an empty level");
            return;
        }

        let entry = LogEntry::new(self.next_timestamp(), level, message);

        match &mut self.backend {
            Backend::Console(writer) => writer.write_entry(&entry),
            Backend::DelimitedFile(file) => {
                if let Err(e) = file.append(&entry) {
                    self.diagnostics.error(&format!(
                        "Failed to write log record to {}: {}",
                        file.path().display(),
                        e
                    ));
                }
            }
            Backend::EmbeddedTable(Some(store)) => {
                if let Err(e) = store.insert_entry(&entry) {
                    self.diagnostics
                        .error(&format!("Failed to insert log record: {}", e));
                }
            }
            Backend::EmbeddedTable(None) => {
                self.diagnostics.error(&format!(
                    "Log database is closed; dropped {} record",
                    entry.level
                ));
            }
        }
    }

    pub fn info(&mut self, message: &str) {
        self.record(level::INFO, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.record(level::WARN, message);
    }

    pub fn error(&mut self, message: &str) {
        self.record(level::ERROR, message);
    }

    pub fn debug(&mut self, message: &str) {
        self.record(level::DEBUG, message);
    }

    /// Release the backend's resources. Idempotent.
    ///
    /// Console and delimited-file sinks hold nothing to release and keep
    /// writing after close.
    pub fn close(&mut self) {
        if self.state == SinkState::Closed {
            return;
        }
        self.state = SinkState::Closed;

        if let Backend::EmbeddedTable(slot) = &mut self.backend {
            if let Some(store) = slot.take() {
                match store.close() {
                    Ok(()) => tracing::debug!("Closed log database"),
                    Err(e) => self
                        .diagnostics
                        .error(&format!("Failed to close log database: {}", e)),
                }
            }
        }
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        let at = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(at);
        at
    }
}

/// Builder for [`LogSink`] with injectable collaborators
pub struct SinkBuilder {
    options: SinkOptions,
    diagnostics: Arc<dyn Diagnostics>,
    driver: Arc<dyn DatabaseDriver>,
    clock: Arc<dyn Clock>,
    console: Option<Box<dyn Write + Send>>,
}

impl SinkBuilder {
    pub fn new(options: SinkOptions) -> Self {
        Self {
            options,
            diagnostics: Arc::new(StderrDiagnostics),
            driver: Arc::new(BundledSqlite),
            clock: Arc::new(SystemClock),
            console: None,
        }
    }

    pub fn diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    pub fn driver(mut self, driver: impl DatabaseDriver + 'static) -> Self {
        self.driver = Arc::new(driver);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Send console output somewhere other than stdout (unstyled)
    pub fn console_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console = Some(Box::new(writer));
        self
    }

    pub fn build(self) -> Result<LogSink> {
        self.options.validate()?;

        let console = match self.console {
            Some(writer) => ConsoleWriter::Custom(writer),
            None => ConsoleWriter::Stdout,
        };
        let diagnostics = self.diagnostics;

        let backend = match self.options.backend {
            BackendKind::Console => Backend::Console(console),
            BackendKind::DelimitedFile => {
                let path = required(self.options.file_path.as_deref(), "file_path")?;
                let file = DelimitedFile::new(path);
                match file.ensure_header() {
                    Ok(true) => tracing::debug!("Created log file {}", path.display()),
                    Ok(false) => {}
                    Err(e) => diagnostics.error(&format!(
                        "Failed to create log file {}: {}",
                        path.display(),
                        e
                    )),
                }
                Backend::DelimitedFile(file)
            }
            BackendKind::EmbeddedTable => {
                let path = required(self.options.database_path.as_deref(), "database_path")?;
                open_table(self.driver.as_ref(), path, diagnostics.as_ref())
                    .map(|store| Backend::EmbeddedTable(Some(store)))
                    .unwrap_or(Backend::Console(console))
            }
        };

        Ok(LogSink {
            requested: self.options.backend,
            backend,
            state: SinkState::Open,
            diagnostics,
            clock: self.clock,
            last_timestamp: None,
        })
    }
}

fn required<'a>(path: Option<&'a Path>, name: &str) -> Result<&'a Path> {
    path.ok_or_else(|| Error::Configuration(format!("{} is required", name)))
}

/// Open the log table, or report why console output is used instead
fn open_table(
    driver: &dyn DatabaseDriver,
    path: &Path,
    diagnostics: &dyn Diagnostics,
) -> Option<LogStore> {
    if !driver.is_available() {
        diagnostics.warn(&format!(
            "Embedded database is not available in this environment; logging to console instead of {}",
            path.display()
        ));
        return None;
    }

    let opened = ensure_parent_dir(path)
        .map_err(Error::from)
        .and_then(|()| LogStore::open_with(driver, path));

    match opened {
        Ok(store) => {
            tracing::debug!("Opened log database {}", path.display());
            Some(store)
        }
        Err(e) => {
            diagnostics.error(&format!(
                "Failed to initialize log database {}: {}; logging to console instead",
                path.display(),
                e
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimited::read_entries;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::storage::NoDatabase;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Console target that tests can read back
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Replays a fixed sequence of instants, repeating the last one
    struct ScriptedClock(Mutex<Vec<DateTime<Utc>>>);

    impl Clock for ScriptedClock {
        fn now(&self) -> DateTime<Utc> {
            let mut instants = self.0.lock().unwrap();
            if instants.len() > 1 {
                instants.remove(0)
            } else {
                instants[0]
            }
        }
    }

    fn console_sink(options: SinkOptions) -> (LogSink, SharedBuffer, RecordingDiagnostics) {
        let buffer = SharedBuffer::default();
        let diagnostics = RecordingDiagnostics::new();
        let sink = LogSink::builder(options)
            .console_writer(buffer.clone())
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();
        (sink, buffer, diagnostics)
    }

    #[test]
    fn test_missing_file_path_is_configuration_error() {
        let options = SinkOptions {
            backend: BackendKind::DelimitedFile,
            ..Default::default()
        };
        assert!(matches!(LogSink::new(options), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_database_path_is_configuration_error() {
        let options = SinkOptions {
            backend: BackendKind::EmbeddedTable,
            ..Default::default()
        };
        assert!(matches!(LogSink::new(options), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_console_line_has_level_and_message() {
        let (mut sink, buffer, diagnostics) = console_sink(SinkOptions::console());
        sink.record("info", "hello");

        let output = buffer.contents();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("INFO"));
        assert!(output.contains("hello"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unavailable_database_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("logs.db");
        let buffer = SharedBuffer::default();
        let diagnostics = RecordingDiagnostics::new();

        let mut sink = LogSink::builder(SinkOptions::embedded_table(&db_path))
            .driver(NoDatabase)
            .console_writer(buffer.clone())
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();

        assert_eq!(sink.requested_backend(), BackendKind::EmbeddedTable);
        assert_eq!(sink.backend_kind(), BackendKind::Console);
        assert_eq!(diagnostics.warnings().len(), 1);
        assert!(diagnostics.errors().is_empty());

        sink.record("warn", "sandboxed");
        assert!(buffer.contents().contains("[WARN] sandboxed"));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_corrupt_database_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("logs.db");
        std::fs::write(&db_path, vec![b'x'; 4096]).unwrap();

        let buffer = SharedBuffer::default();
        let diagnostics = RecordingDiagnostics::new();
        let mut sink = LogSink::builder(SinkOptions::embedded_table(&db_path))
            .console_writer(buffer.clone())
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();

        assert_eq!(sink.backend_kind(), BackendKind::Console);
        assert_eq!(diagnostics.errors().len(), 1);

        sink.error("still visible");
        assert!(buffer.contents().contains("[ERROR] still visible"));
    }

    #[test]
    fn test_delimited_quotes_are_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.csv");
        let mut sink = LogSink::new(SinkOptions::delimited_file(&path)).unwrap();

        sink.record("error", "a \"quoted\" value");

        let content = std::fs::read_to_string(&path).unwrap();
        let line = content.lines().nth(1).unwrap();
        assert!(line.ends_with(",\"error\",\"a \"\"quoted\"\" value\""));
    }

    #[test]
    fn test_delimited_has_header_plus_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.csv");
        let mut sink = LogSink::new(SinkOptions::delimited_file(&path)).unwrap();

        for i in 0..7 {
            sink.info(&format!("entry {}", i));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "timestamp,level,message");
        for (i, line) in lines[1..].iter().enumerate() {
            assert!(line.ends_with(&format!("\"info\",\"entry {}\"", i)));
        }
    }

    #[test]
    fn test_empty_file_left_behind_still_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.csv");
        std::fs::write(&path, "").unwrap();

        let mut sink = LogSink::new(SinkOptions::delimited_file(&path)).unwrap();
        for i in 0..3 {
            sink.info(&format!("entry {}", i));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "timestamp,level,message");
    }

    #[test]
    fn test_two_sinks_share_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.csv");

        let mut first = LogSink::new(SinkOptions::delimited_file(&path)).unwrap();
        let mut second = LogSink::new(SinkOptions::delimited_file(&path)).unwrap();
        first.info("from first");
        second.info("from second");
        first.info("first again");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("timestamp,level,message").count(), 1);

        let messages: Vec<String> = read_entries(&path)
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, ["from first", "from second", "first again"]);
    }

    #[test]
    fn test_file_write_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.csv");
        let diagnostics = RecordingDiagnostics::new();
        let mut sink = LogSink::builder(SinkOptions::delimited_file(&path))
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        sink.info("lost");

        assert_eq!(diagnostics.errors().len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_embedded_table_ids_are_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("logs.db");
        let mut sink = LogSink::new(SinkOptions::embedded_table(&db_path)).unwrap();
        assert_eq!(sink.backend_kind(), BackendKind::EmbeddedTable);

        for i in 0..5 {
            sink.record("debug", &format!("row {}", i));
        }
        sink.close();

        let store = LogStore::open(&db_path).unwrap();
        let rows = store.recent_entries(100).unwrap();
        assert_eq!(rows.len(), 5);
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(rows[4].message, "row 4");
    }

    #[test]
    fn test_insert_failure_on_open_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("logs.db");
        let diagnostics = RecordingDiagnostics::new();
        let mut sink = LogSink::builder(SinkOptions::embedded_table(&db_path))
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();
        sink.info("before");

        let other = rusqlite::Connection::open(&db_path).unwrap();
        other.execute("DROP TABLE logs", []).unwrap();
        drop(other);

        sink.info("after the table vanished");

        assert_eq!(sink.backend_kind(), BackendKind::EmbeddedTable);
        assert!(!sink.is_closed());
        assert_eq!(diagnostics.errors().len(), 1);
        sink.close();
    }

    #[test]
    fn test_record_after_close_on_table_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("logs.db");
        let diagnostics = RecordingDiagnostics::new();
        let mut sink = LogSink::builder(SinkOptions::embedded_table(&db_path))
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();

        sink.info("kept");
        sink.close();
        sink.close();
        assert!(sink.is_closed());

        sink.info("dropped");
        assert_eq!(diagnostics.errors().len(), 1);

        let store = LogStore::open(&db_path).unwrap();
        assert_eq!(store.count_entries().unwrap(), 1);
    }

    #[test]
    fn test_close_is_idempotent_for_console_and_file() {
        let (mut console, buffer, _) = console_sink(SinkOptions::console());
        console.close();
        console.close();
        assert_eq!(console.state(), SinkState::Closed);
        console.info("after close");
        assert!(buffer.contents().contains("after close"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.csv");
        let mut file = LogSink::new(SinkOptions::delimited_file(&path)).unwrap();
        file.close();
        file.close();
        file.info("after close");
        assert_eq!(read_entries(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_level_is_rejected() {
        let (mut sink, buffer, diagnostics) = console_sink(SinkOptions::console());
        sink.record("", "no level");

        assert!(buffer.contents().is_empty());
        assert_eq!(diagnostics.errors().len(), 1);
    }

    #[test]
    fn test_custom_levels_are_tolerated() {
        let (mut sink, buffer, _) = console_sink(SinkOptions::console());
        sink.record("audit", "user signed in");
        assert!(buffer.contents().contains("[AUDIT] user signed in"));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let later = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap();
        let clock = ScriptedClock(Mutex::new(vec![later, earlier, later]));

        let buffer = SharedBuffer::default();
        let mut sink = LogSink::builder(SinkOptions::console())
            .console_writer(buffer.clone())
            .clock(clock)
            .build()
            .unwrap();

        sink.info("one");
        sink.info("two");
        sink.info("three");

        let output = buffer.contents();
        let stamps: Vec<&str> = output.lines().map(|l| &l[1..25]).collect();
        assert_eq!(stamps, vec!["2026-01-01T12:00:00.000Z"; 3]);
    }

    #[test]
    fn test_directory_as_file_path_never_raises() {
        let dir = tempfile::tempdir().unwrap();
        let diagnostics = RecordingDiagnostics::new();
        let mut sink = LogSink::builder(SinkOptions::delimited_file(dir.path()))
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();

        sink.info("nowhere to go");
        assert!(!diagnostics.errors().is_empty());
    }
}
