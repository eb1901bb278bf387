//! Cluster Tree Data
//!
//! Plain data for the hierarchical point partition. Construction lives in
//! pca_split_operations.rs, read-side queries in cluster_query_operations.rs.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;

/// One input sample from a point or volume loader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub position: Vec3,
    pub color: Vec4,
    /// Scalar field value, looked up through a transfer function
    pub value: f32,
    /// Sprite radius in world units
    pub size: f32,
}

impl Point {
    pub fn new(position: Vec3, value: f32) -> Self {
        Self {
            position,
            color: Vec4::ONE,
            value,
            size: 1.0,
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0)
    }
}

/// Index of a cluster inside its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub u32);

impl ClusterId {
    pub const ROOT: Self = Self(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the tree. Owns the contiguous range `start..start + count`
/// of the tree's point array.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub parent: Option<ClusterId>,
    pub children: Option<[ClusterId; 2]>,
    pub depth: u32,
    pub start: usize,
    pub count: usize,
    /// Mean position of every contained point
    pub centroid: Vec3,
    pub bounds: Aabb,
    /// Farthest point distance from the centroid plus the largest sprite
    pub scale: f32,
}

impl Cluster {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }
}

/// Split limits for tree construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTreeConfig {
    pub max_depth: u32,
    /// Ranges with fewer points become leaves
    pub min_cluster_size: usize,
    /// Scale below which the root stops splitting; 0 disables the limit
    pub min_distance: f32,
    /// Multiplier applied to the limit at each level
    pub distance_scale: f32,
}

impl Default for ClusterTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_cluster_size: 2,
            min_distance: 0.5,
            distance_scale: 0.2,
        }
    }
}

impl ClusterTreeConfig {
    /// Scale limit at `depth`
    pub fn distance_limit(&self, depth: u32) -> f32 {
        self.min_distance * self.distance_scale.powi(depth as i32)
    }
}

/// Arena-backed cluster hierarchy over one permuted point array
#[derive(Debug, Clone)]
pub struct ClusterTree {
    pub(crate) points: Vec<Point>,
    pub(crate) clusters: Vec<Cluster>,
    pub(crate) config: ClusterTreeConfig,
    /// Deepest level actually built
    pub(crate) depth: u32,
    /// Level-of-detail cuts, indexed by level
    pub(crate) levels: Vec<Vec<ClusterId>>,
    pub(crate) degenerate_leaves: usize,
}

/// Summary of a built tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterTreeStats {
    pub point_count: usize,
    pub cluster_count: usize,
    pub leaf_count: usize,
    pub depth: u32,
    /// Leaves that stopped because their points had no spread
    pub degenerate_leaves: usize,
    pub largest_leaf: usize,
}
