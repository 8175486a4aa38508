//! Filename derivation for probed resources.
//!
//! The candidate comes from the `Content-Disposition` filename, else from the
//! URL path. It is then resolved against a virtual root so that whatever the
//! server sends, the result is a single path component inside the
//! destination directory.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::resolve_filename;

use crate::error::DownloadError;

/// Derives a safe filename for saving a download.
///
/// Fails with `NoFilename` when neither source yields a usable name.
///
/// # Examples
///
/// - `derive_filename(&"https://example.com/archive.zip".parse()?, None)` → `"archive.zip"`
/// - `derive_filename(.., Some("attachment; filename=\"../../etc/passwd\""))` → `"passwd"`
pub fn derive_filename(
    url: &url::Url,
    content_disposition: Option<&str>,
) -> Result<String, DownloadError> {
    let candidate = content_disposition
        .and_then(parse_content_disposition_filename)
        .unwrap_or_else(|| filename_from_url_path(url));

    resolve_filename(&candidate).ok_or(DownloadError::NoFilename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).unwrap()
    }

    #[test]
    fn derive_filename_from_url_path() {
        assert_eq!(
            derive_filename(&url("https://example.com/archive.zip"), None).unwrap(),
            "archive.zip"
        );
        assert_eq!(
            derive_filename(&url("https://cdn.example.com/path/to/debian-12.iso?x=1"), None)
                .unwrap(),
            "debian-12.iso"
        );
    }

    #[test]
    fn content_disposition_overrides_url() {
        assert_eq!(
            derive_filename(
                &url("https://example.com/archive.zip"),
                Some("attachment; filename=\"real-name.tar.gz\"")
            )
            .unwrap(),
            "real-name.tar.gz"
        );
    }

    #[test]
    fn traversal_in_content_disposition_is_contained() {
        assert_eq!(
            derive_filename(
                &url("https://example.com/x"),
                Some("attachment; filename=\"../../etc/passwd\"")
            )
            .unwrap(),
            "passwd"
        );
    }

    #[test]
    fn root_url_has_no_filename() {
        assert!(matches!(
            derive_filename(&url("https://example.com/"), None),
            Err(DownloadError::NoFilename)
        ));
        assert!(matches!(
            derive_filename(&url("https://example.com"), None),
            Err(DownloadError::NoFilename)
        ));
    }

    #[test]
    fn slash_only_content_disposition_has_no_filename() {
        assert!(matches!(
            derive_filename(
                &url("https://example.com/good.bin"),
                Some("attachment; filename=\"/\"")
            ),
            Err(DownloadError::NoFilename)
        ));
    }

    #[test]
    fn disposition_without_filename_falls_back_to_url() {
        assert_eq!(
            derive_filename(&url("https://example.com/a/b.txt"), Some("inline")).unwrap(),
            "b.txt"
        );
    }
}
