//! Storage Layer - embedded SQLite table backend
//!
//! A single table holds every record:
//! - logs(id, timestamp, level, message)
//!
//! The database engine is reached through a [`DatabaseDriver`] so hosts
//! without an embedded database can say so up front.

pub mod driver;
pub mod schema;
pub mod sqlite;

pub use driver::{BundledSqlite, DatabaseDriver, NoDatabase};
pub use sqlite::{LogStats, LogStore, StoredEntry};
