//! Dispatcher: feeds planned segments, in byte order, into a bounded channel.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::control::CancelToken;
use crate::segmenter::Segment;

/// Spawns the dispatcher. The returned receiver yields `segments` in order and
/// closes after the last one, or as soon as `cancel` is raised (even while the
/// channel is full). The task yields how many segments it published.
pub(crate) fn spawn_dispatcher(
    segments: Vec<Segment>,
    capacity: usize,
    cancel: CancelToken,
) -> (mpsc::Receiver<Segment>, JoinHandle<usize>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut cancel = cancel;
        let mut published = 0usize;
        for segment in segments {
            if cancel.is_raised() {
                break;
            }
            let number = segment.number;
            tokio::select! {
                biased;
                _ = cancel.raised() => break,
                sent = tx.send(segment) => {
                    if sent.is_err() {
                        // Every worker is gone.
                        break;
                    }
                }
            }
            tracing::trace!(segment = number, "segment dispatched");
            published += 1;
        }
        published
    });
    (rx, handle)
}
