//! Input request and the probed remote resource.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::DownloadError;

/// A cookie sent with every request of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Optional attributes; only used to decide whether the cookie applies.
    pub domain: Option<String>,
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    /// Parses `name=value`. Returns `None` when the name is empty or `=` is missing.
    pub fn parse(s: &str) -> Option<Self> {
        let (name, value) = s.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }

    /// True if the cookie's domain/path attributes match `url`.
    pub fn applies_to(&self, url: &url::Url) -> bool {
        if let Some(domain) = &self.domain {
            let domain = domain.trim_start_matches('.').to_ascii_lowercase();
            let host = url.host_str().unwrap_or("").to_ascii_lowercase();
            if host != domain && !host.ends_with(&format!(".{}", domain)) {
                return false;
            }
        }
        if let Some(path) = &self.path {
            if !url.path().starts_with(path.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Formats cookies as a single `Cookie` header value (`a=1; b=2`).
pub fn cookie_header(cookies: &[Cookie], url: &url::Url) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| c.applies_to(url))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// What the caller asks for: URL plus optional request headers and cookies.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: url::Url,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
}

impl DownloadRequest {
    /// Validates `url` as an absolute http/https URL.
    pub fn new(url: &str) -> Result<Self, DownloadError> {
        Ok(Self {
            url: parse_url(url)?,
            headers: HashMap::new(),
            cookies: Vec::new(),
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }
}

/// Parses and validates a download URL.
pub fn parse_url(url: &str) -> Result<url::Url, DownloadError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DownloadError::InvalidInput(format!("malformed URL {:?}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DownloadError::InvalidInput(format!(
                "unsupported URL scheme {:?}",
                other
            )))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(DownloadError::InvalidInput(format!("URL has no host: {}", url)));
    }
    Ok(parsed)
}

/// The remote file as seen by the probe. Immutable once built, except for
/// `disk_path`, which is set after a successful join.
#[derive(Debug, Clone)]
pub struct Resource {
    pub url: url::Url,
    /// Sanitized filename (single path component).
    pub name: String,
    /// Total size in bytes; always > 0.
    pub size: u64,
    pub accept_ranges: bool,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub dir: PathBuf,
    disk_path: Option<PathBuf>,
}

impl Resource {
    pub fn new(
        request: &DownloadRequest,
        name: String,
        size: u64,
        accept_ranges: bool,
        dir: &Path,
    ) -> Self {
        Self {
            url: request.url.clone(),
            name,
            size,
            accept_ranges,
            headers: request.headers.clone(),
            cookies: request.cookies.clone(),
            dir: dir.to_path_buf(),
            disk_path: None,
        }
    }

    /// Path of the assembled output file.
    pub fn destination(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Temp file for segment `number`: `<dir>/<name>_<number>`.
    pub fn segment_path(&self, number: usize) -> PathBuf {
        self.dir.join(format!("{}_{}", self.name, number))
    }

    /// Final path on disk; `None` until the join succeeded.
    pub fn disk_path(&self) -> Option<&Path> {
        self.disk_path.as_deref()
    }

    pub(crate) fn set_disk_path(&mut self, path: PathBuf) {
        self.disk_path = Some(path);
    }
}
