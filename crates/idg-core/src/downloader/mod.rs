//! Download session orchestrator.
//!
//! `Downloader::download` runs one session end to end: probe the URL, plan the
//! segments, feed them through the dispatcher to a fixed pool of workers,
//! aggregate progress, collect results with first-error-wins semantics and
//! finally join the temp files into `<dir>/<name>`.
//!
//! A failed session leaves no final file and no segment temp files behind.

mod dispatch;
mod segment;
mod worker;

pub use worker::SegmentResult;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::IdgConfig;
use crate::control::cancel_pair;
use crate::error::{DownloadError, SegmentError};
use crate::joiner;
use crate::probe::probe;
use crate::progress::{spawn_aggregator, ProgressStats};
use crate::resource::{DownloadRequest, Resource};
use crate::retry::RetryPolicy;
use crate::segmenter::{plan_segments, Segment, SegmentStatus};
use crate::storage::remove_if_exists;
use crate::transport::{Transport, TransportOptions};

use dispatch::spawn_dispatcher;
use segment::FetchContext;
use worker::spawn_workers;

/// Default number of segments and workers when none is configured.
pub const DEFAULT_CONNECTIONS: usize = 8;

/// Default capacity of the worker -> aggregator progress channel.
pub const DEFAULT_PROGRESS_BUFFER: usize = 1024;

/// A finished session.
#[derive(Debug)]
pub struct Completed {
    /// The probed resource, with `disk_path` set.
    pub resource: Resource,
    /// Final output path (`<dir>/<name>`).
    pub path: PathBuf,
    /// Bytes written into segment temp files across all segments.
    pub bytes_transferred: u64,
    /// Segments in ascending number order, all `Completed`.
    pub segments: Vec<Segment>,
}

/// Builder and entry point for one download.
#[derive(Debug, Clone)]
pub struct Downloader {
    request: DownloadRequest,
    dir: PathBuf,
    connections: usize,
    retry: RetryPolicy,
    transport: TransportOptions,
    progress_buffer: usize,
    progress: Option<mpsc::Sender<ProgressStats>>,
}

impl Downloader {
    pub fn new(request: DownloadRequest, dir: impl Into<PathBuf>) -> Self {
        Self {
            request,
            dir: dir.into(),
            connections: DEFAULT_CONNECTIONS,
            retry: RetryPolicy::default(),
            transport: TransportOptions::default(),
            progress_buffer: DEFAULT_PROGRESS_BUFFER,
            progress: None,
        }
    }

    /// Builds a downloader from the loaded config file.
    pub fn from_config(request: DownloadRequest, dir: impl Into<PathBuf>, cfg: &IdgConfig) -> Self {
        let transport = cfg
            .transport
            .as_ref()
            .map(TransportOptions::from)
            .unwrap_or_default();
        Self::new(request, dir)
            .connections(cfg.connections)
            .retry_policy(cfg.retry_policy())
            .transport(transport)
            .progress_buffer(cfg.progress_buffer)
    }

    /// Requested number of segments, which is also the worker count.
    pub fn connections(mut self, n: usize) -> Self {
        self.connections = n;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn transport(mut self, options: TransportOptions) -> Self {
        self.transport = options;
        self
    }

    pub fn progress_buffer(mut self, n: usize) -> Self {
        self.progress_buffer = n;
        self
    }

    /// Receives a `ProgressStats` snapshot after each write, and a final one
    /// with `done` set. Snapshots are dropped when the receiver lags.
    pub fn progress(mut self, tx: mpsc::Sender<ProgressStats>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Runs the session and returns the final path on success.
    pub async fn download(&self) -> Result<Completed, DownloadError> {
        if self.connections == 0 {
            return Err(DownloadError::InvalidInput(
                "connection count must be at least 1".into(),
            ));
        }

        let dir = prepare_dir(&self.dir).await?;
        let transport = Transport::new(self.transport.clone());

        let mut resource = {
            let transport = transport.clone();
            let request = self.request.clone();
            let dir = dir.clone();
            tokio::task::spawn_blocking(move || probe(&transport, &request, &dir))
                .await
                .map_err(|e| DownloadError::Internal(format!("probe task: {}", e)))??
        };

        let segments = plan_segments(&resource, self.connections);
        let temp_paths: Vec<PathBuf> = segments.iter().map(|s| s.path.clone()).collect();
        tracing::info!(
            name = %resource.name,
            size = resource.size,
            segments = segments.len(),
            ranged = segments.first().map_or(false, |s| s.ranged),
            "download started"
        );

        let fetched = self.fetch_all(&transport, &resource, segments).await;
        let (segments, bytes_transferred) = match fetched {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(name = %resource.name, "download failed: {}", e);
                remove_temp_files(&temp_paths);
                return Err(e);
            }
        };

        let path = joiner::join(&resource, segments.clone()).await?;
        resource.set_disk_path(path.clone());
        Ok(Completed {
            resource,
            path,
            bytes_transferred,
            segments,
        })
    }

    /// Dispatcher, workers and aggregator for one session. Returns the
    /// completed segments once the pool has drained, or the first failure.
    async fn fetch_all(
        &self,
        transport: &Transport,
        resource: &Resource,
        segments: Vec<Segment>,
    ) -> Result<(Vec<Segment>, u64), DownloadError> {
        let expected = segments.len();
        let workers = self.connections.min(expected).max(1);

        let (cancel, token) = cancel_pair();
        let (reporter, aggregator) =
            spawn_aggregator(resource.size, self.progress_buffer, self.progress.clone());
        let ctx = Arc::new(FetchContext::new(transport.clone(), resource, reporter));
        let (queue, dispatcher) = spawn_dispatcher(segments, workers, token.clone());
        // Every worker reports at most once per segment, so sends never wait.
        let (results_tx, mut results_rx) = mpsc::channel(expected.max(1));
        let handles = spawn_workers(workers, ctx, queue, results_tx, self.retry, token);

        let mut session = DownloadSession::new(expected);
        while let Some(result) = results_rx.recv().await {
            if session.record(result) {
                cancel.raise();
            }
        }

        for handle in handles {
            handle
                .await
                .map_err(|e| DownloadError::Internal(format!("worker task: {}", e)))?;
        }
        let published = dispatcher
            .await
            .map_err(|e| DownloadError::Internal(format!("dispatcher task: {}", e)))?;
        let progress_total = aggregator
            .await
            .map_err(|e| DownloadError::Internal(format!("progress task: {}", e)))?;
        tracing::debug!(published, progress_total, "worker pool drained");

        session.finish()
    }
}

/// Fan-in state for one session: completed segments, bytes and the first
/// fatal error. Later errors are dropped; they are usually fallout from
/// cancellation.
struct DownloadSession {
    expected: usize,
    completed: Vec<Segment>,
    bytes: u64,
    first_error: Option<(Segment, SegmentError)>,
}

impl DownloadSession {
    fn new(expected: usize) -> Self {
        Self {
            expected,
            completed: Vec::with_capacity(expected),
            bytes: 0,
            first_error: None,
        }
    }

    /// Records one result. Returns true when it is the session's first failure.
    fn record(&mut self, result: SegmentResult) -> bool {
        match result.error {
            None => {
                self.bytes += result.bytes;
                self.completed.push(result.segment);
                false
            }
            Some(e) if self.first_error.is_none() => {
                tracing::warn!(
                    segment = result.segment.number,
                    attempts = result.segment.attempts,
                    "segment failed: {}",
                    e
                );
                self.first_error = Some((result.segment, e));
                true
            }
            Some(e) => {
                tracing::debug!(
                    segment = result.segment.number,
                    "ignoring failure after cancellation: {}",
                    e
                );
                false
            }
        }
    }

    fn finish(mut self) -> Result<(Vec<Segment>, u64), DownloadError> {
        if let Some((segment, source)) = self.first_error {
            return Err(DownloadError::SegmentExhausted {
                number: segment.number,
                start: segment.range.start,
                end: segment.range.end,
                attempts: segment.attempts,
                source,
            });
        }
        if self.completed.len() != self.expected
            || self
                .completed
                .iter()
                .any(|s| s.status != SegmentStatus::Completed)
        {
            return Err(DownloadError::Internal(format!(
                "{} of {} segments completed",
                self.completed.len(),
                self.expected
            )));
        }
        self.completed.sort_by_key(|s| s.number);
        Ok((self.completed, self.bytes))
    }
}

/// Creates `dir` if needed and returns its canonical form.
async fn prepare_dir(dir: &Path) -> Result<PathBuf, DownloadError> {
    let io_err = |source| DownloadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    tokio::fs::canonicalize(dir).await.map_err(io_err)
}

fn remove_temp_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = remove_if_exists(path) {
            tracing::warn!(path = %path.display(), "could not remove temp file: {}", e);
        }
    }
}

/// Downloads `url` into `dir` with `connections` segments and default settings.
pub async fn download_file(
    url: &str,
    dir: impl Into<PathBuf>,
    connections: usize,
) -> Result<PathBuf, DownloadError> {
    let request = DownloadRequest::new(url)?;
    let completed = Downloader::new(request, dir)
        .connections(connections)
        .download()
        .await?;
    Ok(completed.path)
}
