//! Metadata probe.
//!
//! Issues one GET (not HEAD: some servers omit `Content-Length` or
//! `Accept-Ranges` on HEAD) with the session's headers and cookies, reads the
//! response headers, and aborts the transfer at the first body byte.

mod parse;

pub use parse::ResponseMeta;

use std::path::Path;
use std::str;

use crate::error::DownloadError;
use crate::resource::{DownloadRequest, Resource};
use crate::transport::Transport;
use crate::url_model::derive_filename;

/// Probes `request.url` and builds the `Resource` to download into `dir`.
///
/// Blocking; call from `spawn_blocking` when used from async code.
pub fn probe(
    transport: &Transport,
    request: &DownloadRequest,
    dir: &Path,
) -> Result<Resource, DownloadError> {
    let ProbeResponse {
        status,
        meta,
        final_url,
    } = fetch_headers(transport, request)?;

    if status != 200 {
        return Err(DownloadError::UpstreamRejected { status });
    }

    let size = match meta.content_length {
        Some(n) if n > 0 => n as u64,
        _ => return Err(DownloadError::SizeUnknown),
    };

    // Without a Content-Disposition name, the URL that answered names the file.
    let name = derive_filename(&final_url, meta.content_disposition.as_deref())?;

    tracing::info!(
        url = %request.url,
        final_url = %final_url,
        name = %name,
        size,
        accept_ranges = meta.accept_ranges,
        "probe complete"
    );

    Ok(Resource::new(request, name, size, meta.accept_ranges, dir))
}

/// What the last hop of the redirect chain answered.
struct ProbeResponse {
    status: u32,
    meta: ResponseMeta,
    final_url: url::Url,
}

/// Runs the GET and returns the final status code, parsed headers and the
/// effective URL after redirects.
fn fetch_headers(
    transport: &Transport,
    request: &DownloadRequest,
) -> Result<ProbeResponse, DownloadError> {
    let mut lines: Vec<String> = Vec::new();
    let mut easy = transport
        .get(&request.url, &request.headers, &request.cookies)
        .map_err(DownloadError::UpstreamUnreachable)?;

    let perform_result = {
        let _admitted = transport.admit();
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(DownloadError::UpstreamUnreachable)?;
        // Returning 0 makes curl abort with a write error: the body is not needed.
        transfer
            .write_function(|_| Ok(0))
            .map_err(DownloadError::UpstreamUnreachable)?;
        transfer.perform()
    };

    match perform_result {
        Ok(()) => {}
        Err(e) if e.is_write_error() => {}
        Err(e) => return Err(DownloadError::UpstreamUnreachable(e)),
    }

    let status = easy
        .response_code()
        .map_err(DownloadError::UpstreamUnreachable)?;
    let final_url = easy
        .effective_url()
        .map_err(DownloadError::UpstreamUnreachable)?
        .and_then(|u| url::Url::parse(u).ok())
        .unwrap_or_else(|| request.url.clone());
    tracing::debug!(url = %final_url, status, "probe response headers received");
    Ok(ProbeResponse {
        status,
        meta: parse::parse_headers(&lines),
        final_url,
    })
}
