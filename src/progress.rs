//! Human-readable progress lines.
//!
//! Separate from `tracing`: these go to whoever is driving the proof (a UI,
//! the CLI) and are purely observational.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub message: String,
}

impl ProgressEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProgressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp_ms, self.message)
    }
}

/// Receives progress entries in emission order.
pub trait ProgressSink {
    fn record(&mut self, entry: &ProgressEntry);

    fn emit(&mut self, message: &str) {
        self.record(&ProgressEntry::now(message));
    }
}

impl<F: FnMut(&ProgressEntry)> ProgressSink for F {
    fn record(&mut self, entry: &ProgressEntry) {
        self(entry)
    }
}

/// Append-only in-memory log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLog {
    entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProgressSink for ProgressLog {
    fn record(&mut self, entry: &ProgressEntry) {
        self.entries.push(entry.clone());
    }
}

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

#[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
