//! Segment type and range planning.

use std::path::PathBuf;

use crate::resource::Resource;

/// Inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Pending,
    InFlight,
    Completed,
    Failed,
}

/// One independently downloaded part of the resource.
#[derive(Debug, Clone)]
pub struct Segment {
    /// 1-based, dense, ascending in byte order.
    pub number: usize,
    pub range: ByteRange,
    /// Temp file holding this segment's bytes; fixed for the segment's lifetime.
    pub path: PathBuf,
    pub status: SegmentStatus,
    pub attempts: u32,
    /// False for the single whole-resource segment of a server without range support.
    pub ranged: bool,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.range.len()
    }
}

/// Splits `[0, total_size)` into `count` inclusive ranges.
///
/// Range `i` starts at `i * w` with `w = total_size / count`; the last range
/// ends at `total_size - 1` and absorbs the division remainder. `count` is
/// clamped to `[1, total_size]` so no range is empty. Returns an empty vec
/// when `total_size` is 0.
pub fn plan_ranges(total_size: u64, count: usize) -> Vec<ByteRange> {
    if total_size == 0 {
        return Vec::new();
    }

    let count = (count.max(1) as u64).min(total_size);
    let width = total_size / count;

    (0..count)
        .map(|i| {
            let start = i * width;
            let end = if i == count - 1 {
                total_size - 1
            } else {
                (i + 1) * width - 1
            };
            ByteRange { start, end }
        })
        .collect()
}

/// Builds the segments for `resource`. Without range support the plan is a
/// single unranged segment covering the whole resource.
pub fn plan_segments(resource: &Resource, count: usize) -> Vec<Segment> {
    let count = if resource.accept_ranges { count } else { 1 };
    let ranged = resource.accept_ranges && count > 1;

    plan_ranges(resource.size, count)
        .into_iter()
        .enumerate()
        .map(|(i, range)| Segment {
            number: i + 1,
            range,
            path: resource.segment_path(i + 1),
            status: SegmentStatus::Pending,
            attempts: 0,
            ranged,
        })
        .collect()
}
