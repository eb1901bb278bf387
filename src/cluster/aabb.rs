//! Axis-aligned bounds of cluster point ranges
//!
//! Pure functions over a plain data struct, no methods beyond constants.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box - pure data structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Inverted box; growing it by any point yields that point
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };
}

/// Create AABB from min/max points
pub fn create_aabb(min: Vec3, max: Vec3) -> Aabb {
    Aabb { min, max }
}

/// Smallest box containing every position
pub fn aabb_from_positions(positions: impl IntoIterator<Item = Vec3>) -> Aabb {
    positions.into_iter().fold(Aabb::EMPTY, aabb_grow)
}

/// Grow box to include a point
pub fn aabb_grow(aabb: Aabb, point: Vec3) -> Aabb {
    Aabb {
        min: aabb.min.min(point),
        max: aabb.max.max(point),
    }
}

/// Box containing both inputs
pub fn aabb_merge(a: &Aabb, b: &Aabb) -> Aabb {
    Aabb {
        min: a.min.min(b.min),
        max: a.max.max(b.max),
    }
}

pub fn aabb_is_empty(aabb: &Aabb) -> bool {
    aabb.min.x > aabb.max.x || aabb.min.y > aabb.max.y || aabb.min.z > aabb.max.z
}

/// Get center point of AABB
pub fn aabb_center(aabb: &Aabb) -> Vec3 {
    (aabb.min + aabb.max) * 0.5
}

/// Get half extents of AABB
pub fn aabb_half_extents(aabb: &Aabb) -> Vec3 {
    (aabb.max - aabb.min) * 0.5
}

/// Radius of the sphere around the center that encloses the box
pub fn aabb_bounding_radius(aabb: &Aabb) -> f32 {
    if aabb_is_empty(aabb) {
        0.0
    } else {
        aabb_half_extents(aabb).length()
    }
}

/// Test if AABB contains a point (inclusive)
pub fn aabb_contains_point(aabb: &Aabb, point: Vec3) -> bool {
    point.cmpge(aabb.min).all() && point.cmple(aabb.max).all()
}
