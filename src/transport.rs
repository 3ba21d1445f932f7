//! Async row transport – hands rows off the tick thread to a writer task.
//!
//! [`ChannelSink`] is the tick-side half: posting never blocks and never
//! fails loudly. [`RowReceiver::drain_into`] is the task-side half and writes
//! one row per line to any async writer (stdout, a file, a socket).

use crate::sink::RowSink;
use bytes::Bytes;
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Create a connected sink / receiver pair.
pub fn channel() -> (ChannelSink, RowReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelSink {
            tx,
            closed_reported: AtomicBool::new(false),
        },
        RowReceiver { rx },
    )
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Bytes>,
    closed_reported: AtomicBool,
}

impl RowSink for ChannelSink {
    fn post_row(&self, row: String) {
        let mut line = row.into_bytes();
        line.push(b'\n');
        if self.tx.send(Bytes::from(line)).is_err()
            && !self.closed_reported.swap(true, Ordering::Relaxed)
        {
            warn!("Row transport closed; further rows are dropped");
        }
    }
}

pub struct RowReceiver {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl RowReceiver {
    /// Write rows until every sender is dropped. Returns the number of rows
    /// written.
    ///
    /// A failed write is logged and the row dropped; the drain keeps going.
    pub async fn drain_into<W>(mut self, mut writer: W) -> std::io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;
        while let Some(line) = self.rx.recv().await {
            match writer.write_all(&line).await {
                Ok(()) => written += 1,
                Err(e) => warn!("Failed to write telemetry row: {}", e),
            }
        }
        writer.flush().await?;
        Ok(written)
    }
}
