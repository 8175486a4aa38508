//! Shared HTTP transport: curl options and the admission lock.
//!
//! Every request of a session (probe and segment GETs) is built from the same
//! read-only `TransportOptions`. The admission lock is held from request
//! issuance until the response headers are in, never while a body streams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::TransportConfig;
use crate::resource::{cookie_header, Cookie};

/// Curl settings applied to each handle.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirects: u32,
    pub user_agent: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            max_redirects: 10,
            user_agent: Some(format!("idg/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl From<&TransportConfig> for TransportOptions {
    fn from(cfg: &TransportConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            max_redirects: cfg.max_redirects,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Cheap to clone; clones share the admission lock.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    options: TransportOptions,
    admission: Arc<Mutex<()>>,
}

impl Transport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            options,
            admission: Arc::new(Mutex::new(())),
        }
    }

    /// Takes the admission lock. A poisoned lock is recovered: it guards no data.
    pub fn admit(&self) -> MutexGuard<'_, ()> {
        self.admission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Builds a GET handle for `url` with the session's headers and cookies attached.
    pub fn get(
        &self,
        url: &url::Url,
        headers: &HashMap<String, String>,
        cookies: &[Cookie],
    ) -> Result<curl::easy::Easy, curl::Error> {
        let opts = &self.options;
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(opts.max_redirects)?;
        easy.connect_timeout(opts.connect_timeout)?;
        easy.low_speed_limit(opts.low_speed_limit)?;
        easy.low_speed_time(opts.low_speed_time)?;
        if let Some(ua) = &opts.user_agent {
            easy.useragent(ua)?;
        }
        if let Some(cookie) = cookie_header(cookies, url) {
            easy.cookie(&cookie)?;
        }

        let mut list = curl::easy::List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}
