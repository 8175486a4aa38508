//! Segmented HTTP range downloader.
//!
//! Probe a URL, split it into byte ranges, fetch the ranges in parallel with
//! per-segment retry, and join them back into one file in byte order.

pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod error;
pub mod joiner;
pub mod probe;
pub mod progress;
pub mod resource;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use downloader::{download_file, Completed, Downloader};
pub use error::{DownloadError, SegmentError};
pub use progress::ProgressStats;
pub use resource::{Cookie, DownloadRequest, Resource};
