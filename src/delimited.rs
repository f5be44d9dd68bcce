//! Delimited-file backend
//!
//! Layout: a `timestamp,level,message` header, then one quoted record per
//! entry. Every field is wrapped in double quotes with embedded quotes
//! doubled, so commas and newlines inside a message stay inside its field.

use crate::Result;
use crate::config::ensure_parent_dir;
use crate::entry::{DELIMITED_HEADER, LogEntry};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Append-only quoted CSV file
#[derive(Debug, Clone)]
pub struct DelimitedFile {
    path: PathBuf,
}

impl DelimitedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if it does not exist yet.
    /// Returns `true` when this call created it.
    pub fn ensure_header(&self) -> Result<bool> {
        ensure_parent_dir(&self.path)?;

        // create_new: of two writers racing on a fresh path only one writes the header
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                file.write_all(format!("{}\n", DELIMITED_HEADER).as_bytes())?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => self.repair_empty(),
            Err(e) => Err(e.into()),
        }
    }

    /// An existing but empty file lost its header to an earlier failed write
    fn repair_empty(&self) -> Result<bool> {
        if !self.path.is_file() || std::fs::metadata(&self.path)?.len() > 0 {
            return Ok(false);
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(format!("{}\n", DELIMITED_HEADER).as_bytes())?;
        tracing::debug!("Wrote missing header to {}", self.path.display());
        Ok(true)
    }

    /// Append one entry as a single write
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let line = entry.delimited_line();
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Read every entry back from a delimited file, skipping the header
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    let content = std::fs::read_to_string(path)?;
    let mut records = parse_records(&content).into_iter().peekable();

    if records
        .peek()
        .is_some_and(|first| first.join(",") == DELIMITED_HEADER)
    {
        records.next();
    }

    let entries = records
        .filter_map(|mut fields| {
            if fields.len() != 3 {
                tracing::debug!("Skipping malformed record with {} fields", fields.len());
                return None;
            }
            let message = fields.pop()?;
            let level = fields.pop()?;
            let timestamp = fields.pop()?;
            Some(LogEntry { timestamp, level, message })
        })
        .collect();

    Ok(entries)
}

/// Split delimited text into records of unquoted fields
pub fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    // blank line
    if record.len() == 1 && record[0].is_empty() {
        return;
    }
    records.push(record);
}
