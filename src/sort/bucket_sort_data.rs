//! Depth Bucket Sort Data
//!
//! Buckets are singly linked lists threaded through one scratch array, so a
//! sort pass allocates nothing once the scratch has grown to the level size.

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterId;

/// Upper bound on buckets per sort
pub const MAX_BUCKET_COUNT: usize = 1 << 20;

/// Direction in which buckets are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending bucket index, nearest first
    FrontToBack,
    /// Descending bucket index, for alpha blending
    #[default]
    BackToFront,
}

/// One cluster placed in a bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketEntry {
    pub cluster: ClusterId,
    /// Normalized view depth, may be non-finite
    pub depth: f32,
    pub bucket: u32,
    pub(crate) next: Option<u32>,
}

/// Per-frame approximate depth ordering of one tree level
#[derive(Debug)]
pub struct DepthBucketSort {
    pub(crate) heads: Vec<Option<u32>>,
    pub(crate) entries: Vec<BucketEntry>,
    pub(crate) clamped: usize,
    pub(crate) populated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketSortStats {
    pub bucket_count: usize,
    pub entries: usize,
    pub non_empty_buckets: usize,
    pub max_occupancy: usize,
    /// Entries whose depth was not finite
    pub clamped: usize,
}
