//! Embedded database capability

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;

/// Opens embedded database connections, or reports that it cannot
pub trait DatabaseDriver: Send + Sync {
    /// Whether the embedded database exists in this execution environment
    fn is_available(&self) -> bool {
        true
    }

    fn open(&self, path: &Path) -> Result<Connection>;
}

/// SQLite compiled into the binary; always available
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSqlite;

impl DatabaseDriver for BundledSqlite {
    fn open(&self, path: &Path) -> Result<Connection> {
        Ok(Connection::open(path)?)
    }
}

/// A host without an embedded database (sandboxed runtimes, restricted builds)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatabase;

impl DatabaseDriver for NoDatabase {
    fn is_available(&self) -> bool {
        false
    }

    fn open(&self, path: &Path) -> Result<Connection> {
        Err(Error::BackendUnavailable(format!(
            "no embedded database in this environment (requested {})",
            path.display()
        )))
    }
}
