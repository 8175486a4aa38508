//! One attempt at fetching a segment into its temp file.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::str;
use std::sync::MutexGuard;

use crate::error::SegmentError;
use crate::progress::ProgressReporter;
use crate::resource::{Cookie, Resource};
use crate::segmenter::Segment;
use crate::storage::SegmentStore;
use crate::transport::Transport;

/// Everything a worker needs to issue requests for one session. Shared
/// read-only between workers.
pub(crate) struct FetchContext {
    pub transport: Transport,
    pub url: url::Url,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub progress: ProgressReporter,
}

impl FetchContext {
    pub fn new(transport: Transport, resource: &Resource, progress: ProgressReporter) -> Self {
        Self {
            transport,
            url: resource.url.clone(),
            headers: resource.headers.clone(),
            cookies: resource.cookies.clone(),
            progress,
        }
    }
}

fn accepted(status: u32) -> bool {
    status == 200 || status == 206
}

/// True for a status that ends the exchange (not 1xx, not a redirect).
fn is_final(status: u32) -> bool {
    status >= 200 && !(300..400).contains(&status)
}

/// Status code from a status line such as `HTTP/1.1 206 Partial Content`.
fn parse_status_line(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// GET the segment (with a Range header when it is ranged) and stream the
/// body into the segment's temp file. Returns the bytes written.
///
/// The transport's admission lock is held from issuing the request until the
/// final response's headers are in. The temp file is only opened once a 200
/// or 206 body starts arriving, and is deleted again if the attempt fails.
/// Blocking; run it on a blocking thread.
pub(crate) fn fetch_once(ctx: &FetchContext, segment: &Segment) -> Result<u64, SegmentError> {
    let expected = segment.len();
    let mut easy = ctx
        .transport
        .get(&ctx.url, &ctx.headers, &ctx.cookies)
        .map_err(SegmentError::Transport)?;
    if segment.ranged {
        // curl takes "start-end" and sends "Range: bytes=start-end".
        easy.range(&format!("{}-{}", segment.range.start, segment.range.end))
            .map_err(SegmentError::Transport)?;
    }

    let status = Cell::new(0u32);
    let admission: RefCell<Option<MutexGuard<'_, ()>>> = RefCell::new(None);
    let store: RefCell<Option<SegmentStore>> = RefCell::new(None);
    let failure: RefCell<Option<SegmentError>> = RefCell::new(None);

    let perform_result = {
        *admission.borrow_mut() = Some(ctx.transport.admit());
        tracing::debug!(segment = segment.number, "request admitted");

        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                let line = str::from_utf8(data).unwrap_or("").trim_end();
                if let Some(code) = parse_status_line(line) {
                    status.set(code);
                } else if line.is_empty() && is_final(status.get()) {
                    admission.borrow_mut().take();
                }
                true
            })
            .map_err(SegmentError::Transport)?;
        transfer
            .write_function(|data| {
                admission.borrow_mut().take();
                let code = status.get();
                if !accepted(code) {
                    failure.borrow_mut().replace(SegmentError::Http(code));
                    return Ok(0);
                }

                let mut slot = store.borrow_mut();
                if slot.is_none() {
                    match SegmentStore::create(&segment.path) {
                        Ok(s) => *slot = Some(s),
                        Err(e) => {
                            failure.borrow_mut().replace(SegmentError::Storage(e));
                            return Ok(0);
                        }
                    }
                }
                let Some(file) = slot.as_mut() else {
                    return Ok(0);
                };

                let received = file.written() + data.len() as u64;
                if received > expected {
                    failure
                        .borrow_mut()
                        .replace(SegmentError::LengthMismatch { expected, received });
                    return Ok(0);
                }
                if let Err(e) = file.write(data) {
                    failure.borrow_mut().replace(SegmentError::Storage(e));
                    return Ok(0);
                }
                ctx.progress.report_blocking(data.len() as u64);
                Ok(data.len())
            })
            .map_err(SegmentError::Transport)?;
        let result = transfer.perform();
        admission.borrow_mut().take();
        result
    };

    let store = store.into_inner();
    let outcome = check_outcome(
        perform_result,
        failure.into_inner(),
        easy.response_code().unwrap_or_else(|_| status.get()),
        store.as_ref().map_or(0, SegmentStore::written),
        expected,
    );

    match (outcome, store) {
        (Ok(()), Some(file)) => file.finalize().map_err(SegmentError::Storage),
        (Ok(()), None) => Err(SegmentError::LengthMismatch {
            expected,
            received: 0,
        }),
        (Err(e), file) => {
            if let Some(file) = file {
                let path = file.path().to_path_buf();
                if let Err(rm) = file.discard() {
                    tracing::warn!(
                        segment = segment.number,
                        path = %path.display(),
                        "could not remove temp file: {}",
                        rm
                    );
                }
            }
            Err(e)
        }
    }
}

/// Decide whether a finished transfer produced a complete segment.
fn check_outcome(
    perform_result: Result<(), curl::Error>,
    failure: Option<SegmentError>,
    status: u32,
    received: u64,
    expected: u64,
) -> Result<(), SegmentError> {
    if let Some(f) = failure {
        return Err(f);
    }
    perform_result.map_err(SegmentError::Transport)?;
    if !accepted(status) {
        return Err(SegmentError::Http(status));
    }
    if received != expected {
        return Err(SegmentError::LengthMismatch { expected, received });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_line("HTTP/1.1 206 Partial Content"), Some(206));
        assert_eq!(parse_status_line("HTTP/2 200"), Some(200));
        assert_eq!(parse_status_line("Content-Length: 5"), None);
        assert_eq!(parse_status_line("HTTP/1.1"), None);
    }

    #[test]
    fn outcome_accepts_200_and_206_with_exact_length() {
        assert!(check_outcome(Ok(()), None, 206, 10, 10).is_ok());
        assert!(check_outcome(Ok(()), None, 200, 10, 10).is_ok());
    }

    #[test]
    fn outcome_rejects_other_status() {
        assert!(matches!(
            check_outcome(Ok(()), None, 503, 0, 10),
            Err(SegmentError::Http(503))
        ));
        assert!(matches!(
            check_outcome(Ok(()), None, 416, 0, 10),
            Err(SegmentError::Http(416))
        ));
    }

    #[test]
    fn outcome_rejects_short_body() {
        assert!(matches!(
            check_outcome(Ok(()), None, 206, 4, 10),
            Err(SegmentError::LengthMismatch {
                expected: 10,
                received: 4
            })
        ));
    }

    #[test]
    fn recorded_failure_wins_over_write_error() {
        let write_err = curl::Error::new(23);
        let r = check_outcome(Err(write_err), Some(SegmentError::Http(500)), 500, 0, 10);
        assert!(matches!(r, Err(SegmentError::Http(500))));
    }
}
