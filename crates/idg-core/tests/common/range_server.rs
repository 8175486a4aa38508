//! Minimal HTTP/1.1 server with Range GET support and fault injection.
//!
//! Serves a single static body at any path. One request per connection
//! (`Connection: close`). Faults are configured up front through
//! `RangeServerOptions`; every request is recorded for later inspection.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

const STALL_LIMIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// Sent as `Content-Disposition` on every response.
    pub content_disposition: Option<&'static str>,
    /// Leave `Content-Length` off the response headers (body is still sent).
    pub omit_content_length: bool,
    /// Answer every request with this status and an empty body.
    pub status_override: Option<u16>,
    /// Ranged requests starting at this byte get a 503...
    pub fail_range_start: Option<u64>,
    /// ...this many times before being served normally.
    pub fail_times: usize,
    /// `(from, to)`: requests for path `from` get a 302 to path `to`.
    pub redirect: Option<(&'static str, &'static str)>,
    /// Send the headers and half the body of the first ranged request, then
    /// hold the rest until another ranged request arrives.
    pub stall_first_range: bool,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            advertise_ranges: true,
            content_disposition: None,
            omit_content_length: false,
            status_override: None,
            fail_range_start: None,
            fail_times: 0,
            redirect: None,
            stall_first_range: false,
        }
    }
}

/// One request as the server saw it.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub path: String,
    pub range: Option<(u64, u64)>,
    pub cookie: Option<String>,
    /// Every header line, names lowercased.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// State shared by the accept loop and the per-connection threads.
#[derive(Debug, Default)]
struct Shared {
    range_hits: AtomicUsize,
    connections: AtomicUsize,
    log: Mutex<Vec<RecordedRequest>>,
    /// Ranged requests seen so far, with a condvar for the stalled handler.
    ranged: Mutex<usize>,
    ranged_cv: Condvar,
    stall_claimed: AtomicBool,
    stall_overlapped: AtomicBool,
}

/// Handle to a running server.
#[derive(Debug, Clone)]
pub struct RangeServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub base: String,
    shared: Arc<Shared>,
}

impl RangeServer {
    /// URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Requests seen for `fail_range_start`, failed or not.
    pub fn range_hits(&self) -> usize {
        self.shared.range_hits.load(Ordering::SeqCst)
    }

    /// Requests handled so far, the initial metadata request included.
    pub fn requests(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Every parsed request, in arrival order.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.shared.log.lock().unwrap().clone()
    }

    /// True once another ranged request arrived while the stalled body was
    /// still open.
    pub fn stall_overlapped(&self) -> bool {
        self.shared.stall_overlapped.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let shared = Arc::new(Shared::default());
    let server = RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        shared: Arc::clone(&shared),
    };
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let shared = Arc::clone(&shared);
            shared.connections.fetch_add(1, Ordering::SeqCst);
            thread::spawn(move || handle(stream, &body, opts, &shared));
        }
    });
    server
}

fn respond_empty(stream: &mut std::net::TcpStream, status: &str, extra: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: 0\r\n{}Connection: close\r\n\r\n",
        status, extra
    );
    let _ = stream.write_all(response.as_bytes());
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    shared: &Shared,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, req) = parse_request(request);
    let range = req.range;
    let path = req.path.clone();
    shared.log.lock().unwrap().push(req);
    if !method.eq_ignore_ascii_case("GET") {
        respond_empty(&mut stream, "405 Method Not Allowed", "");
        return;
    }

    if let Some(code) = opts.status_override {
        respond_empty(&mut stream, &format!("{} Injected", code), "");
        return;
    }

    if let Some((from, to)) = opts.redirect {
        if path == from {
            respond_empty(&mut stream, "302 Found", &format!("Location: {}\r\n", to));
            return;
        }
    }

    // Arrival number among ranged requests.
    let arrival = range.map(|_| {
        let mut seen = shared.ranged.lock().unwrap();
        *seen += 1;
        shared.ranged_cv.notify_all();
        *seen
    });

    if let (Some(fail_start), Some((start, _))) = (opts.fail_range_start, range) {
        if start == fail_start {
            let served = shared.range_hits.fetch_add(1, Ordering::SeqCst);
            if served < opts.fail_times {
                respond_empty(&mut stream, "503 Service Unavailable", "");
                return;
            }
        }
    }

    let total = body.len() as u64;
    let (status, content_range, slice) = match range.filter(|_| opts.support_ranges) {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                (
                    "416 Range Not Satisfiable",
                    Some(format!("bytes */{}", total)),
                    &body[0..0],
                )
            } else {
                let slice = &body[start as usize..=end_incl as usize];
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    slice,
                )
            }
        }
        None => ("200 OK", None, body),
    };

    let mut headers = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    if !opts.omit_content_length {
        headers.push_str(&format!("Content-Length: {}\r\n", slice.len()));
    }
    if let Some(cr) = content_range {
        headers.push_str(&format!("Content-Range: {}\r\n", cr));
    }
    if opts.advertise_ranges && opts.support_ranges {
        headers.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(cd) = opts.content_disposition {
        headers.push_str(&format!("Content-Disposition: {}\r\n", cd));
    }
    headers.push_str("\r\n");
    let _ = stream.write_all(headers.as_bytes());

    let claim = || !shared.stall_claimed.swap(true, Ordering::SeqCst);
    let stall = match arrival {
        Some(n) if opts.stall_first_range && claim() => n,
        _ => {
            let _ = stream.write_all(slice);
            return;
        }
    };

    let (head, tail) = slice.split_at(slice.len() / 2);
    let _ = stream.write_all(head);
    let _ = stream.flush();
    // Any ranged request that arrived after this one overlaps its open body.
    let seen = shared.ranged.lock().unwrap();
    let (seen, _) = shared
        .ranged_cv
        .wait_timeout_while(seen, STALL_LIMIT, |n| *n == stall)
        .unwrap();
    if *seen > stall {
        shared.stall_overlapped.store(true, Ordering::SeqCst);
    }
    drop(seen);
    let _ = stream.write_all(tail);
}

/// Returns the method and the parsed request.
fn parse_request(request: &str) -> (&str, RecordedRequest) {
    let mut method = "";
    let mut req = RecordedRequest::default();
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            req.path = parts.next().unwrap_or("/").to_string();
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        req.headers.push((name.clone(), value.to_string()));
        match name.as_str() {
            "cookie" => req.cookie = Some(value.to_string()),
            "range" => req.range = value.strip_prefix("bytes=").and_then(parse_byte_range),
            _ => {}
        }
    }
    (method, req)
}

/// `X-Y` or `X-` as (start, end_inclusive).
fn parse_byte_range(spec: &str) -> Option<(u64, u64)> {
    let (a, b) = spec.split_once('-')?;
    let start = a.trim().parse::<u64>().unwrap_or(0);
    let end = b.trim();
    let end_incl = if end.is_empty() {
        u64::MAX
    } else {
        end.parse::<u64>().unwrap_or(0)
    };
    Some((start, end_incl))
}
