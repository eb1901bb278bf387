//! Per-frame approximate depth ordering of cluster tree levels

mod bucket_sort_data;
mod bucket_sort_operations;

pub use bucket_sort_data::{BucketEntry, BucketSortStats, DepthBucketSort, SortOrder, MAX_BUCKET_COUNT};
pub use bucket_sort_operations::BucketIter;
