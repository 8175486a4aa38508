//! Per-segment temp files.
//!
//! Each segment's bytes land in `<dir>/<name>_<number>`. A worker creates the
//! file (truncating leftovers of an earlier attempt), streams into it, and
//! finalizes it; the joiner consumes and deletes it.

mod store;

pub use store::{remove_if_exists, SegmentStore};
