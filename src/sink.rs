//! Row sinks: where finished rows go.
//!
//! The core never waits on a sink and never learns whether a row arrived.

use parking_lot::Mutex;
use std::sync::Arc;

/// Accepts one flattened row per call. Fire-and-forget.
pub trait RowSink: Send {
    fn post_row(&self, row: String);
}

/// Keeps every row in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl RowSink for MemorySink {
    fn post_row(&self, row: String) {
        self.rows.lock().push(row);
    }
}

/// Writes each row to the log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RowSink for LogSink {
    fn post_row(&self, row: String) {
        log::info!("telemetry row: {}", row);
    }
}
