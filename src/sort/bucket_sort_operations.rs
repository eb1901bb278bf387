//! Depth Bucket Sort Operations
//!
//! Clear, populate once from the camera, consume, reset. Bucket index is
//! `floor(depth * B)` over depth normalized by the tree's bounding sphere.

use glam::Mat4;
use log::{debug, error, warn};

use super::bucket_sort_data::{
    BucketEntry, BucketSortStats, DepthBucketSort, SortOrder, MAX_BUCKET_COUNT,
};
use crate::cluster::{ClusterId, ClusterTree};
use crate::error::{EngineError, EngineResult};

impl DepthBucketSort {
    pub fn new(bucket_count: usize) -> EngineResult<Self> {
        if bucket_count == 0 || bucket_count > MAX_BUCKET_COUNT {
            error!(
                "[DepthBucketSort::new] Invalid bucket count {}",
                bucket_count
            );
            return Err(EngineError::InvalidBucketCount {
                count: bucket_count,
                max: MAX_BUCKET_COUNT,
            });
        }

        Ok(Self {
            heads: vec![None; bucket_count],
            entries: Vec::new(),
            clamped: 0,
            populated: false,
        })
    }

    /// Empty every bucket and make room for `capacity` entries
    pub fn init(&mut self, capacity: usize) {
        self.heads.iter_mut().for_each(|head| *head = None);
        self.entries.clear();
        self.entries.reserve(capacity);
        self.clamped = 0;
        self.populated = false;
    }

    /// Bucket every cluster of `tree.level(level)` by its depth under
    /// `view`. Returns the number of clusters placed.
    pub fn sort(&mut self, tree: &ClusterTree, level: u32, view: &Mat4) -> usize {
        if self.populated {
            warn!("[DepthBucketSort::sort] Sorting over an unconsumed pass, resetting first");
        }
        let ids = tree.level(level);
        self.init(ids.len());

        let (center, radius) = tree.bounding_sphere();
        if radius <= 0.0 {
            // every centroid coincides, so every cluster shares one depth
            debug!(
                "[DepthBucketSort::sort] Scene has zero extent, {} clusters go to the last bucket",
                ids.len()
            );
            let last = self.heads.len() - 1;
            for &id in ids {
                self.push_entry(id, 1.0, last);
            }
            self.populated = true;
            return self.entries.len();
        }

        let center_depth = view_depth(view, center);
        let near = center_depth - radius;
        let extent = 2.0 * radius;

        for &id in ids {
            let Some(cluster) = tree.cluster(id) else {
                continue;
            };
            let depth = (view_depth(view, cluster.centroid) - near) / extent;
            self.insert(id, depth);
        }

        self.populated = true;
        if self.clamped > 0 {
            warn!(
                "[DepthBucketSort::sort] {} of {} clusters had non-finite depth",
                self.clamped,
                self.entries.len()
            );
        }
        debug!(
            "[DepthBucketSort::sort] Placed {} clusters of level {} into {} buckets",
            self.entries.len(),
            level,
            self.heads.len()
        );
        self.entries.len()
    }

    /// Prepend `cluster` to the bucket for normalized `depth`
    pub fn insert(&mut self, cluster: ClusterId, depth: f32) {
        let (bucket, clamped) = bucket_index(depth, self.heads.len());
        if clamped {
            self.clamped += 1;
        }
        self.push_entry(cluster, depth, bucket);
    }

    fn push_entry(&mut self, cluster: ClusterId, depth: f32, bucket: usize) {
        let index = self.entries.len() as u32;
        self.entries.push(BucketEntry {
            cluster,
            depth,
            bucket: bucket as u32,
            next: self.heads[bucket],
        });
        self.heads[bucket] = Some(index);
        self.populated = true;
    }

    /// Release the pass once the renderer has consumed it
    pub fn reset(&mut self) {
        self.init(0);
    }

    pub fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one bucket, most recently inserted first
    pub fn bucket(&self, index: usize) -> BucketIter<'_> {
        BucketIter {
            entries: &self.entries,
            next: self.heads.get(index).copied().flatten(),
        }
    }

    /// Every entry, buckets visited in `order`
    pub fn iter(&self, order: SortOrder) -> impl Iterator<Item = &BucketEntry> + '_ {
        let count = self.heads.len();
        let buckets: Box<dyn Iterator<Item = usize>> = match order {
            SortOrder::FrontToBack => Box::new(0..count),
            SortOrder::BackToFront => Box::new((0..count).rev()),
        };
        buckets.flat_map(move |index| self.bucket(index))
    }

    pub fn ordered_clusters(&self, order: SortOrder) -> Vec<ClusterId> {
        self.iter(order).map(|entry| entry.cluster).collect()
    }

    pub fn bucket_index_of(&self, cluster: ClusterId) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.cluster == cluster)
            .map(|entry| entry.bucket as usize)
    }

    pub fn stats(&self) -> BucketSortStats {
        let mut occupancy = vec![0usize; self.heads.len()];
        for entry in &self.entries {
            occupancy[entry.bucket as usize] += 1;
        }

        BucketSortStats {
            bucket_count: self.heads.len(),
            entries: self.entries.len(),
            non_empty_buckets: occupancy.iter().filter(|&&n| n > 0).count(),
            max_occupancy: occupancy.iter().copied().max().unwrap_or(0),
            clamped: self.clamped,
        }
    }
}

pub struct BucketIter<'a> {
    entries: &'a [BucketEntry],
    next: Option<u32>,
}

impl<'a> Iterator for BucketIter<'a> {
    type Item = &'a BucketEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.next? as usize)?;
        self.next = entry.next;
        Some(entry)
    }
}

/// Distance in front of the camera; views look down -Z
fn view_depth(view: &Mat4, position: glam::Vec3) -> f32 {
    -view.transform_point3(position).z
}

/// Map a normalized depth to a bucket. NaN and +inf land in the last
/// bucket, -inf in the first; the flag reports non-finite input.
fn bucket_index(depth: f32, bucket_count: usize) -> (usize, bool) {
    let last = bucket_count - 1;
    if depth.is_nan() || depth == f32::INFINITY {
        return (last, true);
    }
    if depth == f32::NEG_INFINITY {
        return (0, true);
    }

    let scaled = (depth * bucket_count as f32).floor();
    if scaled <= 0.0 {
        (0, false)
    } else {
        // float to int casts saturate
        ((scaled as usize).min(last), false)
    }
}
