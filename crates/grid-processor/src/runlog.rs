//! Run log: the human-readable check list of one pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surface_common::{Classify, ErrorClass};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One timestamped entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Output scanline the entry refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// Ordered entries for the host to display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, level: LogLevel, message: String, row: Option<usize>, class: Option<ErrorClass>) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
            row,
            class: class.map(|c| format!("{:?}", c)),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into(), None, None);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message.into(), None, None);
    }

    /// Record a failure that did not stop the run.
    pub fn failure<E: Classify + std::fmt::Display>(&mut self, row: Option<usize>, message: impl Into<String>, err: &E) {
        self.push(
            LogLevel::Error,
            format!("{}: {}", message.into(), err),
            row,
            Some(err.class()),
        );
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entry messages in order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }

    /// Entries at error level.
    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.level == LogLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
