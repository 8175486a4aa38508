//! Parse HTTP response header lines into ResponseMeta.

/// Metadata of the final response in a (possibly redirected) exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Raw `Content-Length`, if present and numeric (may be negative).
    pub content_length: Option<i64>,
    /// True if an `Accept-Ranges` (or `Accept-Range`) header was present, whatever its value.
    pub accept_ranges: bool,
    /// `Content-Disposition` value if present (filename hint).
    pub content_disposition: Option<String>,
}

/// Parse collected header lines. A status line (`HTTP/...`) starts a new
/// block, so only the last response of a redirect chain is kept.
pub(crate) fn parse_headers(lines: &[String]) -> ResponseMeta {
    let mut meta = ResponseMeta::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            meta = ResponseMeta::default();
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            meta.content_length = value.parse::<i64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges")
            || name.eq_ignore_ascii_case("accept-range")
        {
            meta.accept_ranges = true;
        } else if name.eq_ignore_ascii_case("content-disposition") {
            meta.content_disposition = Some(value.to_string());
        }
    }

    meta
}
