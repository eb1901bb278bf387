//! Cluster Tree Construction
//!
//! Recursive principal-axis splitting over one point array. Each range is
//! partitioned in place, so a cluster's points are always contiguous and
//! the tree never copies a point.

use glam::{DVec3, Mat3, Vec3};
use log::{debug, error, info};

use super::aabb::{aabb_from_positions, Aabb};
use super::cluster_data::{Cluster, ClusterId, ClusterTree, ClusterTreeConfig, Point};
use super::eigen::principal_eigen;
use crate::error::{EngineError, EngineResult};

/// Why a range became a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafReason {
    TooSmall,
    MaxDepth,
    BelowDistanceLimit,
    Degenerate,
    OneSided,
}

struct TreeBuilder<'a> {
    points: Vec<Point>,
    clusters: Vec<Cluster>,
    config: &'a ClusterTreeConfig,
    depth: u32,
    degenerate_leaves: usize,
}

/// Build a cluster tree, taking ownership of `points`. The returned tree
/// holds the same points in partition order.
pub fn build_cluster_tree(points: Vec<Point>, config: &ClusterTreeConfig) -> EngineResult<ClusterTree> {
    if points.is_empty() {
        error!("[build_cluster_tree] Refusing to build a tree from zero points");
        return Err(EngineError::EmptyPointSet);
    }

    let point_count = points.len();
    let mut builder = TreeBuilder {
        points,
        clusters: Vec::with_capacity(estimate_cluster_count(point_count, config)),
        config,
        depth: 0,
        degenerate_leaves: 0,
    };
    builder.build_recursive(0, point_count, 0, None);

    let levels = (0..=builder.depth)
        .map(|level| collect_level(&builder.clusters, level))
        .collect();

    info!(
        "[build_cluster_tree] Built {} clusters over {} points, depth {}",
        builder.clusters.len(),
        point_count,
        builder.depth
    );

    Ok(ClusterTree {
        points: builder.points,
        clusters: builder.clusters,
        config: *config,
        depth: builder.depth,
        levels,
        degenerate_leaves: builder.degenerate_leaves,
    })
}

impl TreeBuilder<'_> {
    fn build_recursive(
        &mut self,
        start: usize,
        count: usize,
        depth: u32,
        parent: Option<ClusterId>,
    ) -> ClusterId {
        self.depth = self.depth.max(depth);

        let range = &self.points[start..start + count];
        let centroid = compute_centroid(range);
        let bounds = aabb_from_positions(range.iter().map(|p| p.position));
        let scale = compute_scale(range, centroid);

        let id = ClusterId(self.clusters.len() as u32);
        self.clusters.push(Cluster {
            id,
            parent,
            children: None,
            depth,
            start,
            count,
            centroid,
            bounds,
            scale,
        });

        let mid = match self.try_split(start, count, depth, centroid, &bounds, scale) {
            Ok(mid) => mid,
            Err(reason) => {
                if reason == LeafReason::Degenerate {
                    self.degenerate_leaves += 1;
                }
                debug!(
                    "[TreeBuilder::build_recursive] Leaf {:?} at depth {} with {} points ({:?})",
                    id, depth, count, reason
                );
                return id;
            }
        };

        let left = self.build_recursive(start, mid - start, depth + 1, Some(id));
        let right = self.build_recursive(mid, start + count - mid, depth + 1, Some(id));
        self.clusters[id.index()].children = Some([left, right]);

        id
    }

    /// Partition `start..start + count` and return the split index, or the
    /// reason the range stays whole.
    fn try_split(
        &mut self,
        start: usize,
        count: usize,
        depth: u32,
        centroid: Vec3,
        bounds: &Aabb,
        scale: f32,
    ) -> Result<usize, LeafReason> {
        if count < self.config.min_cluster_size {
            return Err(LeafReason::TooSmall);
        }
        if depth >= self.config.max_depth {
            return Err(LeafReason::MaxDepth);
        }
        if self.config.min_distance > 0.0 && scale < self.config.distance_limit(depth) {
            return Err(LeafReason::BelowDistanceLimit);
        }
        if bounds.min == bounds.max {
            return Err(LeafReason::Degenerate);
        }

        let range = &mut self.points[start..start + count];
        let axis = principal_axis(range, centroid).ok_or(LeafReason::Degenerate)?;
        let left = partition_by_axis(range, centroid, axis);

        if left == 0 || left == count {
            return Err(LeafReason::OneSided);
        }
        Ok(start + left)
    }
}

/// Mean position, accumulated in f64
pub fn compute_centroid(points: &[Point]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    let sum = points
        .iter()
        .fold(DVec3::ZERO, |acc, p| acc + p.position.as_dvec3());
    (sum / points.len() as f64).as_vec3()
}

/// Covariance of positions about `centroid`
pub fn compute_covariance(points: &[Point], centroid: Vec3) -> Mat3 {
    if points.is_empty() {
        return Mat3::ZERO;
    }
    let c = centroid.as_dvec3();
    let mut xx = 0.0f64;
    let mut xy = 0.0f64;
    let mut xz = 0.0f64;
    let mut yy = 0.0f64;
    let mut yz = 0.0f64;
    let mut zz = 0.0f64;
    for point in points {
        let d = point.position.as_dvec3() - c;
        xx += d.x * d.x;
        xy += d.x * d.y;
        xz += d.x * d.z;
        yy += d.y * d.y;
        yz += d.y * d.z;
        zz += d.z * d.z;
    }
    let n = points.len() as f64;
    Mat3::from_cols(
        Vec3::new((xx / n) as f32, (xy / n) as f32, (xz / n) as f32),
        Vec3::new((xy / n) as f32, (yy / n) as f32, (yz / n) as f32),
        Vec3::new((xz / n) as f32, (yz / n) as f32, (zz / n) as f32),
    )
}

/// Direction of greatest spread, `None` when the points have no spread
pub fn principal_axis(points: &[Point], centroid: Vec3) -> Option<Vec3> {
    let covariance = compute_covariance(points, centroid);
    let (variance, axis) = principal_eigen(&covariance);
    if !variance.is_finite() || variance <= 0.0 || axis == Vec3::ZERO || !axis.is_finite() {
        return None;
    }
    Some(axis)
}

/// Move points on the negative side of the plane through `centroid`
/// (normal `axis`) to the front. Returns how many moved.
pub fn partition_by_axis(points: &mut [Point], centroid: Vec3, axis: Vec3) -> usize {
    let mut left = 0;
    for i in 0..points.len() {
        if (points[i].position - centroid).dot(axis) < 0.0 {
            points.swap(left, i);
            left += 1;
        }
    }
    left
}

/// Bounding radius about `centroid`, grown by the largest sprite
pub fn compute_scale(points: &[Point], centroid: Vec3) -> f32 {
    let (max_distance_sq, max_size) = points.iter().fold((0.0f32, 0.0f32), |(d, s), p| {
        (d.max(p.position.distance_squared(centroid)), s.max(p.size))
    });
    max_distance_sq.sqrt() + max_size
}

fn collect_level(clusters: &[Cluster], level: u32) -> Vec<ClusterId> {
    // arena order is pre-order, so the cut comes out left to right
    clusters
        .iter()
        .filter(|c| c.depth == level || (c.is_leaf() && c.depth < level))
        .map(|c| c.id)
        .collect()
}

fn estimate_cluster_count(point_count: usize, config: &ClusterTreeConfig) -> usize {
    let full = 1usize
        .checked_shl(config.max_depth.saturating_add(1).min(24))
        .unwrap_or(usize::MAX);
    full.min(point_count.saturating_mul(2))
}
