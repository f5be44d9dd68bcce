//! Side channel for a sink's own degradations and write failures

use std::sync::{Arc, Mutex, MutexGuard};

/// Where a sink reports problems about itself
pub trait Diagnostics: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Themed lines on standard error
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn warn(&self, message: &str) {
        crate::ui::warn(message);
    }

    fn error(&self, message: &str) {
        crate::ui::error(message);
    }
}

/// Tracing events only, for hosts that already route tracing output
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "forgelog::diagnostics", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "forgelog::diagnostics", "{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
}

/// In-memory diagnostics; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Severity, String)>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        self.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.by_severity(Severity::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.by_severity(Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn by_severity(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn warn(&self, message: &str) {
        self.lock().push((Severity::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lock().push((Severity::Error, message.to_string()));
    }
}
