//! Joiner: concatenates completed segment files into the final output.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::DownloadError;
use crate::resource::Resource;
use crate::segmenter::Segment;
use crate::storage::remove_if_exists;

/// Writes every segment's temp file, in ascending segment-number order, into
/// `<dir>/<name>` and deletes each temp file once appended.
///
/// Only call this with the full set of completed segments. Completion order
/// from the pool is arbitrary, so the segments are sorted here. On error the
/// destination is left truncated for inspection; removing it is up to the caller.
pub async fn join(
    resource: &Resource,
    mut segments: Vec<Segment>,
) -> Result<PathBuf, DownloadError> {
    segments.sort_by_key(|s| s.number);
    if let Some((i, s)) = segments
        .iter()
        .enumerate()
        .find(|(i, s)| s.number != i + 1)
    {
        return Err(DownloadError::Internal(format!(
            "segment set not contiguous: position {} holds segment {}",
            i + 1,
            s.number
        )));
    }

    let destination = resource.destination();
    let io_err = |source| DownloadError::Io {
        path: destination.clone(),
        source,
    };
    let file = File::create(&destination).await.map_err(io_err)?;
    let mut out = BufWriter::new(file);

    let mut total = 0u64;
    for segment in &segments {
        let join_err = |source| DownloadError::JoinFailure {
            number: segment.number,
            path: segment.path.clone(),
            source,
        };
        let mut part = File::open(&segment.path).await.map_err(join_err)?;
        let copied = tokio::io::copy(&mut part, &mut out).await.map_err(join_err)?;
        drop(part);
        remove_if_exists(&segment.path).map_err(join_err)?;
        tracing::trace!(segment = segment.number, bytes = copied, "segment appended");
        total += copied;
    }

    let last = segments.last().map_or(0, |s| s.number);
    finish(out, last, &destination).await?;

    tracing::info!(
        path = %destination.display(),
        bytes = total,
        segments = segments.len(),
        "join complete"
    );
    Ok(destination)
}

/// Flushes and syncs the output. A failure here (disk full, I/O error) is a
/// join failure, attributed to the last segment appended.
async fn finish(
    mut out: BufWriter<File>,
    last: usize,
    destination: &Path,
) -> Result<(), DownloadError> {
    let join_err = |source| DownloadError::JoinFailure {
        number: last,
        path: destination.to_path_buf(),
        source,
    };
    out.flush().await.map_err(join_err)?;
    out.into_inner().sync_all().await.map_err(join_err)
}
