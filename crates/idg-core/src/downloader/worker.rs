//! Worker pool: N tasks pulling segments from the dispatcher.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::segment::{fetch_once, FetchContext};
use crate::control::CancelToken;
use crate::error::SegmentError;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::segmenter::{Segment, SegmentStatus};

/// Terminal report for one segment. Sent exactly once per segment a worker
/// took off the queue.
#[derive(Debug)]
pub struct SegmentResult {
    pub segment: Segment,
    /// `None` on success.
    pub error: Option<SegmentError>,
    /// Bytes kept in the segment's temp file (0 on failure: partial files are removed).
    pub bytes: u64,
}

/// Spawns `count` workers. Each one loops: take the next segment (or stop
/// when the queue closes or `cancel` is raised), fetch it with retries, send
/// a `SegmentResult`. A worker whose segment failed for good exits.
pub(crate) fn spawn_workers(
    count: usize,
    ctx: Arc<FetchContext>,
    queue: mpsc::Receiver<Segment>,
    results: mpsc::Sender<SegmentResult>,
    policy: RetryPolicy,
    cancel: CancelToken,
) -> Vec<JoinHandle<()>> {
    let queue = Arc::new(Mutex::new(queue));
    (0..count)
        .map(|id| {
            tokio::spawn(run_worker(
                id,
                Arc::clone(&ctx),
                Arc::clone(&queue),
                results.clone(),
                policy,
                cancel.clone(),
            ))
        })
        .collect()
}

async fn run_worker(
    id: usize,
    ctx: Arc<FetchContext>,
    queue: Arc<Mutex<mpsc::Receiver<Segment>>>,
    results: mpsc::Sender<SegmentResult>,
    policy: RetryPolicy,
    mut cancel: CancelToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.raised() => None,
            segment = async { queue.lock().await.recv().await } => segment,
        };
        let Some(mut segment) = next else {
            break;
        };

        segment.status = SegmentStatus::InFlight;
        tracing::debug!(
            worker = id,
            segment = segment.number,
            range = %segment.range.range_header_value(),
            "segment started"
        );

        let report = run_with_retry(&policy, &cancel, |attempt| {
            let ctx = Arc::clone(&ctx);
            let seg = segment.clone();
            async move {
                tracing::debug!(worker = id, segment = seg.number, attempt, "requesting");
                tokio::task::spawn_blocking(move || fetch_once(&ctx, &seg))
                    .await
                    .unwrap_or_else(|e| Err(SegmentError::Task(e.to_string())))
            }
        })
        .await;

        segment.attempts = report.attempts;
        let (bytes, error) = match report.result {
            Ok(bytes) => {
                segment.status = SegmentStatus::Completed;
                tracing::debug!(
                    worker = id,
                    segment = segment.number,
                    bytes,
                    attempts = segment.attempts,
                    "segment completed"
                );
                (bytes, None)
            }
            Err(e) => {
                segment.status = SegmentStatus::Failed;
                (0, Some(e))
            }
        };
        let failed = error.is_some();
        if results
            .send(SegmentResult {
                segment,
                error,
                bytes,
            })
            .await
            .is_err()
        {
            break;
        }
        if failed {
            break;
        }
    }
    tracing::trace!(worker = id, "worker exiting");
}
