//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params};
use serde::Serialize;
use crate::Result;
use crate::entry::LogEntry;
use super::driver::{BundledSqlite, DatabaseDriver};
use super::schema;

/// SQLite-backed storage for log records
pub struct LogStore {
    conn: Connection,
}

/// A log record as persisted, with its row id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEntry {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

impl LogStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(&BundledSqlite, path)
    }

    /// Open a database file through a specific driver
    pub fn open_with(driver: &dyn DatabaseDriver, path: &Path) -> Result<Self> {
        let conn = driver.open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Append one record, returning its row id
    pub fn insert_entry(&self, entry: &LogEntry) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO logs (timestamp, level, message) VALUES (?1, ?2, ?3)",
            params![entry.timestamp, entry.level, entry.message],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Count all records
    pub fn count_entries(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// The most recent `limit` records, oldest first
    pub fn recent_entries(&self, limit: usize) -> Result<Vec<StoredEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, level, message FROM logs ORDER BY id DESC LIMIT ?1"
        )?;

        let mut entries: Vec<StoredEntry> = stmt
            .query_map([limit as i64], |row| {
                Ok(StoredEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    level: row.get(2)?,
                    message: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        entries.reverse();
        Ok(entries)
    }

    /// Get table statistics
    pub fn stats(&self) -> Result<LogStats> {
        let mut stmt = self.conn.prepare(
            "SELECT level, COUNT(*) FROM logs GROUP BY level ORDER BY level"
        )?;

        let by_level = stmt
            .query_map([], |row| {
                let level: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((level, count as usize))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(LogStats::from_levels(by_level))
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

/// Record counts, overall and per level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total: usize,
    pub by_level: Vec<(String, usize)>,
}

impl LogStats {
    pub fn from_levels(mut by_level: Vec<(String, usize)>) -> Self {
        by_level.sort();
        let total = by_level.iter().map(|(_, n)| n).sum();
        Self { total, by_level }
    }
}

impl std::fmt::Display for LogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Log Statistics:")?;
        writeln!(f, "  Total: {}", self.total)?;
        for (level, count) in &self.by_level {
            writeln!(f, "  {}: {}", level, count)?;
        }
        Ok(())
    }
}
