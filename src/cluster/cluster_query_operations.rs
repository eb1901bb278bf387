//! Cluster Tree Queries
//!
//! Read-only access used by the depth sort and the renderer.

use glam::{Vec3, Vec4};

use super::aabb::{aabb_bounding_radius, aabb_center, Aabb};
use super::cluster_data::{Cluster, ClusterId, ClusterTree, ClusterTreeConfig, ClusterTreeStats, Point};

impl ClusterTree {
    pub fn root(&self) -> &Cluster {
        // a built tree always holds at least the root
        &self.clusters[ClusterId::ROOT.index()]
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.index())
    }

    /// Every cluster in pre-order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn children(&self, id: ClusterId) -> impl Iterator<Item = &Cluster> + '_ {
        self.cluster(id)
            .and_then(|c| c.children)
            .into_iter()
            .flatten()
            .filter_map(move |child| self.cluster(child))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Cluster> + '_ {
        self.clusters.iter().filter(|c| c.is_leaf())
    }

    /// Deepest level built
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn config(&self) -> &ClusterTreeConfig {
        &self.config
    }

    /// Level-of-detail cut: clusters at depth `level` plus any shallower
    /// leaves. Levels past the deepest one clamp to it. Together the
    /// returned clusters hold every point exactly once.
    pub fn level(&self, level: u32) -> &[ClusterId] {
        let index = level.min(self.depth) as usize;
        self.levels.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn level_len(&self, level: u32) -> usize {
        self.level(level).len()
    }

    pub fn level_clusters(&self, level: u32) -> impl Iterator<Item = &Cluster> + '_ {
        self.level(level).iter().filter_map(move |&id| self.cluster(id))
    }

    pub fn points_of(&self, id: ClusterId) -> &[Point] {
        self.cluster(id)
            .map(|c| &self.points[c.range()])
            .unwrap_or(&[])
    }

    /// All points, in partition order
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.root().bounds
    }

    /// Sphere enclosing every centroid, used to normalize view depth
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        let bounds = self.bounds();
        (aabb_center(&bounds), aabb_bounding_radius(&bounds))
    }

    /// One representative point per cluster of the cut at `level`
    pub fn summary_points(&self, level: u32) -> Vec<Point> {
        self.level_clusters(level)
            .map(|cluster| self.summarize(cluster))
            .collect()
    }

    fn summarize(&self, cluster: &Cluster) -> Point {
        let points = &self.points[cluster.range()];
        let n = points.len().max(1) as f32;
        let (value_sum, color_sum) = points
            .iter()
            .fold((0.0f32, Vec4::ZERO), |(v, c), p| (v + p.value, c + p.color));

        Point {
            position: cluster.centroid,
            color: color_sum / n,
            value: value_sum / n,
            size: cluster.scale,
        }
    }

    pub fn stats(&self) -> ClusterTreeStats {
        let (leaf_count, largest_leaf) = self
            .leaves()
            .fold((0, 0), |(n, largest), c| (n + 1, largest.max(c.count)));

        ClusterTreeStats {
            point_count: self.points.len(),
            cluster_count: self.clusters.len(),
            leaf_count,
            depth: self.depth,
            degenerate_leaves: self.degenerate_leaves,
            largest_leaf,
        }
    }
}
