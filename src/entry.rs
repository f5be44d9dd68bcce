//! Log entries and the wall-clock source that stamps them

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Well-known level names. Any other non-empty string is accepted as-is.
pub mod level {
    pub const DEBUG: &str = "debug";
    pub const INFO: &str = "info";
    pub const WARN: &str = "warn";
    pub const ERROR: &str = "error";
}

/// Header row of the delimited-file layout
pub const DELIMITED_HEADER: &str = "timestamp,level,message";

/// Wall-clock time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A single leveled, timestamped message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 timestamp, millisecond precision, UTC
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(at: DateTime<Utc>, level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: format_timestamp(at),
            level: level.into(),
            message: message.into(),
        }
    }

    /// `[<timestamp>] [<LEVEL>] <message>`
    pub fn console_line(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.timestamp,
            self.level.to_uppercase(),
            self.message
        )
    }

    /// `"<timestamp>","<level>","<message>"` followed by a newline
    pub fn delimited_line(&self) -> String {
        format!(
            "{},{},{}\n",
            quote_field(&self.timestamp),
            quote_field(&self.level),
            quote_field(&self.message)
        )
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wrap a field in double quotes, doubling any embedded quote
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
