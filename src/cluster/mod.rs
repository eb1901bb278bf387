//! Hierarchical point clustering
//!
//! Points are split recursively along their principal axis into a binary
//! tree whose levels serve as level-of-detail cuts.

mod aabb;
mod cluster_data;
mod cluster_query_operations;
mod eigen;
mod pca_split_operations;

pub use aabb::{
    aabb_bounding_radius, aabb_center, aabb_contains_point, aabb_from_positions, aabb_grow,
    aabb_half_extents, aabb_is_empty, aabb_merge, create_aabb, Aabb,
};
pub use cluster_data::{Cluster, ClusterId, ClusterTree, ClusterTreeConfig, ClusterTreeStats, Point};
pub use eigen::{principal_eigen, symmetric_eigen, SymmetricEigen3};
pub use pca_split_operations::{
    build_cluster_tree, compute_centroid, compute_covariance, compute_scale, partition_by_axis,
    principal_axis,
};
