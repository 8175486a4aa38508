//! Range math and segment planning.
//!
//! Splits a resource into contiguous, non-overlapping inclusive byte ranges
//! numbered 1..=k in byte order, and computes HTTP Range header values.

mod range;

pub use range::{plan_ranges, plan_segments, ByteRange, Segment, SegmentStatus};
