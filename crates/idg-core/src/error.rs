//! Error taxonomy for a download session.
//!
//! `DownloadError` is what `Downloader::download` returns; each variant names
//! the phase that failed. `SegmentError` is the per-attempt failure of a single
//! segment fetch and is only surfaced (wrapped in `SegmentExhausted`) once the
//! retry budget runs out.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("probe: upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] curl::Error),

    #[error("probe: upstream rejected request with HTTP {status}")]
    UpstreamRejected { status: u32 },

    #[error("probe: resource size unknown (missing or non-positive Content-Length)")]
    SizeUnknown,

    #[error("probe: no filename could be determined")]
    NoFilename,

    #[error(
        "segment {number} (bytes {start}-{end}) failed after {attempts} attempt(s): {source}"
    )]
    SegmentExhausted {
        number: usize,
        start: u64,
        end: u64,
        attempts: u32,
        #[source]
        source: SegmentError,
    },

    #[error("join: segment {number} ({}): {source}", .path.display())]
    JoinFailure {
        number: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("internal: {0}")]
    Internal(String),
}

/// Failure of one attempt at fetching a segment. Every kind is retryable.
#[derive(Debug)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection reset, DNS, ...).
    Transport(curl::Error),
    /// Response status outside {200, 206}.
    Http(u32),
    /// Body length did not match the segment's byte range.
    LengthMismatch { expected: u64, received: u64 },
    /// Writing the segment's temp file failed.
    Storage(io::Error),
    /// The blocking fetch task died before reporting.
    Task(String),
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Transport(e) => write!(f, "transport: {}", e),
            SegmentError::Http(code) => write!(f, "HTTP {}", code),
            SegmentError::LengthMismatch { expected, received } => {
                write!(f, "length mismatch: expected {} bytes, got {}", expected, received)
            }
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
            SegmentError::Task(msg) => write!(f, "fetch task: {}", msg),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Transport(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            SegmentError::Http(_)
            | SegmentError::LengthMismatch { .. }
            | SegmentError::Task(_) => None,
        }
    }
}
