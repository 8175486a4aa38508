//! CLI command handlers, one file per subcommand.

mod config;
mod get;
mod probe;

use anyhow::Result;
use idg_core::resource::{Cookie, DownloadRequest};

pub use config::run_config;
pub use get::{run_get, GetArgs};
pub use probe::run_probe;

/// URL plus the headers and cookies every request of a session carries.
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<Cookie>,
}

impl RequestArgs {
    pub fn into_request(self) -> Result<DownloadRequest> {
        let mut request = DownloadRequest::new(&self.url)?;
        for (name, value) in self.headers {
            request = request.header(name, value);
        }
        for cookie in self.cookies {
            request = request.cookie(cookie);
        }
        Ok(request)
    }
}
