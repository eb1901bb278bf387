//! Camera data structures
//!
//! Plain data. All transformations happen in camera_operations.rs

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Look-at camera viewing a point set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraData {
    /// Camera position in world space
    pub eye: Vec3,

    /// Point the camera looks at
    pub target: Vec3,

    pub up: Vec3,

    /// Field of view (vertical, radians)
    pub fov_radians: f32,

    /// Aspect ratio (width / height)
    pub aspect_ratio: f32,

    pub near_plane: f32,
    pub far_plane: f32,
}

/// Camera uniform buffer data for GPU
/// Must match shader layout exactly
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    /// View matrix (4x4, column-major)
    pub view_matrix: [[f32; 4]; 4],

    /// Projection matrix (4x4, column-major)
    pub projection_matrix: [[f32; 4]; 4],

    /// View-projection matrix (4x4, column-major)
    pub view_projection_matrix: [[f32; 4]; 4],

    /// Camera position (vec3 + padding)
    pub camera_position: [f32; 4],

    /// Camera forward vector (vec3 + padding)
    pub camera_forward: [f32; 4],

    /// Near/far planes, fov, aspect
    pub planes: [f32; 4],
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_radians: 60.0_f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near_plane: 0.1,
            far_plane: 10000.0,
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            projection_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            view_projection_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0, 0.0, 0.0, 1.0],
            camera_forward: [0.0, 0.0, -1.0, 0.0],
            planes: [0.1, 10000.0, 60.0_f32.to_radians(), 16.0 / 9.0],
        }
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<CameraUniform>(), 240);
