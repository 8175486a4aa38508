//! Progress aggregation for a download session.
//!
//! Workers report the byte count of every write through a `ProgressReporter`.
//! A single aggregator task sums them into a running total (capped at the
//! resource size, so bytes of a failed-and-retried attempt never push it past
//! 100%) and forwards `ProgressStats` snapshots to an optional renderer.
//! Consumers can compute rate = bytes_done / elapsed_secs and
//! ETA = (total_bytes - bytes_done) / rate.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Snapshot of download progress for one session (CLI-friendly).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes received so far.
    pub bytes_done: u64,
    /// Total resource size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since the session started downloading (seconds).
    pub elapsed_secs: f64,
    /// Set on the last snapshot of a session.
    pub done: bool,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Sending side handed to workers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: mpsc::Sender<u64>,
}

impl ProgressReporter {
    /// Report `bytes` written. Must be called from a blocking context (the curl
    /// write callback); waits only while the bounded buffer is full.
    pub fn report_blocking(&self, bytes: u64) {
        // A closed channel means the session is being torn down.
        let _ = self.tx.blocking_send(bytes);
    }
}

/// Spawns the aggregator. The task ends once every `ProgressReporter` clone is
/// dropped; it then sends a final `done` snapshot and yields the total.
pub fn spawn_aggregator(
    total_bytes: u64,
    buffer: usize,
    stats_tx: Option<mpsc::Sender<ProgressStats>>,
) -> (ProgressReporter, JoinHandle<u64>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let handle = tokio::spawn(run_aggregator(rx, total_bytes, stats_tx));
    (ProgressReporter { tx }, handle)
}

async fn run_aggregator(
    mut rx: mpsc::Receiver<u64>,
    total_bytes: u64,
    stats_tx: Option<mpsc::Sender<ProgressStats>>,
) -> u64 {
    let started = Instant::now();
    let mut bytes_done = 0u64;

    while let Some(n) = rx.recv().await {
        bytes_done = bytes_done.saturating_add(n).min(total_bytes);
        if let Some(tx) = &stats_tx {
            // Renderer lagging: drop the snapshot, a newer one follows.
            let _ = tx.try_send(ProgressStats {
                bytes_done,
                total_bytes,
                elapsed_secs: started.elapsed().as_secs_f64(),
                done: false,
            });
        }
    }

    if let Some(tx) = &stats_tx {
        let _ = tx
            .send(ProgressStats {
                bytes_done,
                total_bytes,
                elapsed_secs: started.elapsed().as_secs_f64(),
                done: true,
            })
            .await;
    }
    tracing::debug!(bytes_done, total_bytes, "progress aggregator finished");
    bytes_done
}
