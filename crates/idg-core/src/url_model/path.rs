//! Filename candidate from the URL path.

use super::content_disposition::percent_decode;

/// Returns the percent-decoded URL path (e.g. `/a/b/file.deb`), which the
/// sanitizer reduces to its last component. Query and fragment are ignored.
pub fn filename_from_url_path(url: &url::Url) -> String {
    percent_decode(url.path())
}
