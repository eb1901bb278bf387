//! Camera operations
//!
//! Functions take camera data and return new data. No side effects.

use glam::{Mat4, Quat, Vec3};

use super::camera_data::{CameraData, CameraUniform};

// ============================================================================
// INITIALIZATION
// ============================================================================

pub fn init_camera(eye: Vec3, target: Vec3) -> CameraData {
    CameraData {
        eye,
        target,
        ..Default::default()
    }
}

/// Camera at `distance` from `target`, looking along `direction`
pub fn look_along(target: Vec3, direction: Vec3, distance: f32) -> CameraData {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    CameraData {
        eye: target - direction * distance,
        target,
        up,
        ..Default::default()
    }
}

/// Camera framing a bounding sphere, looking along `direction`
pub fn frame_sphere(center: Vec3, radius: f32, direction: Vec3) -> CameraData {
    let defaults = CameraData::default();
    let half_fov = (defaults.fov_radians * 0.5).max(1e-3);
    let distance = (radius / half_fov.sin()).max(defaults.near_plane * 2.0);
    CameraData {
        far_plane: defaults.far_plane.max(distance + radius * 2.0),
        ..look_along(center, direction, distance)
    }
}

// ============================================================================
// VIEW/PROJECTION MATRICES
// ============================================================================

pub fn build_view_matrix(camera: &CameraData) -> Mat4 {
    Mat4::look_at_rh(camera.eye, camera.target, camera.up)
}

pub fn build_projection_matrix(camera: &CameraData) -> Mat4 {
    Mat4::perspective_rh(
        camera.fov_radians,
        camera.aspect_ratio,
        camera.near_plane,
        camera.far_plane,
    )
}

/// Build camera uniform for GPU
pub fn build_camera_uniform(camera: &CameraData) -> CameraUniform {
    let view_matrix = build_view_matrix(camera);
    let projection_matrix = build_projection_matrix(camera);
    let view_projection = projection_matrix * view_matrix;
    let forward = calculate_forward_vector(camera);

    CameraUniform {
        view_matrix: view_matrix.to_cols_array_2d(),
        projection_matrix: projection_matrix.to_cols_array_2d(),
        view_projection_matrix: view_projection.to_cols_array_2d(),
        camera_position: camera.eye.extend(1.0).to_array(),
        camera_forward: forward.extend(0.0).to_array(),
        planes: [
            camera.near_plane,
            camera.far_plane,
            camera.fov_radians,
            camera.aspect_ratio,
        ],
    }
}

// ============================================================================
// UPDATES
// ============================================================================

/// Update aspect ratio (e.g., on window resize)
pub fn update_aspect_ratio(camera: &CameraData, width: u32, height: u32) -> CameraData {
    let mut new_camera = *camera;
    new_camera.aspect_ratio = width as f32 / height.max(1) as f32;
    new_camera
}

/// Rotate the eye around the target by yaw (about `up`) and pitch (about
/// the camera's right axis). Pitch stops short of the poles.
pub fn orbit(camera: &CameraData, yaw_delta: f32, pitch_delta: f32) -> CameraData {
    const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

    let offset = camera.eye - camera.target;
    let up = camera.up.try_normalize().unwrap_or(Vec3::Y);
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return *camera;
    }

    let current_pitch = (offset.dot(up) / distance).clamp(-1.0, 1.0).asin();
    let pitch = (current_pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT) - current_pitch;

    let right = offset.cross(up).try_normalize().unwrap_or(Vec3::X);
    let rotation = Quat::from_axis_angle(up, yaw_delta) * Quat::from_axis_angle(right, pitch);

    let mut new_camera = *camera;
    new_camera.eye = camera.target + rotation * offset;
    new_camera
}

/// Zoom toward the target, never past the near plane
pub fn dolly(camera: &CameraData, factor: f32) -> CameraData {
    let offset = camera.eye - camera.target;
    let distance = (offset.length() * factor).max(camera.near_plane);
    let mut new_camera = *camera;
    new_camera.eye = camera.target + offset.normalize_or_zero() * distance;
    new_camera
}

// ============================================================================
// UTILITIES
// ============================================================================

pub fn calculate_forward_vector(camera: &CameraData) -> Vec3 {
    (camera.target - camera.eye).normalize_or_zero()
}

/// Log camera context for debugging
pub fn log_camera_context(camera: &CameraData) {
    log::debug!(
        "[Camera] Eye: ({:.1}, {:.1}, {:.1}) | Target: ({:.1}, {:.1}, {:.1}) | FOV: {:.1}°",
        camera.eye.x,
        camera.eye.y,
        camera.eye.z,
        camera.target.x,
        camera.target.y,
        camera.target.z,
        camera.fov_radians.to_degrees()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-4), "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_view_matrix_looks_down_negative_z() {
        let camera = init_camera(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let view = build_view_matrix(&camera);
        assert_vec_close(view.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn test_look_along() {
        let camera = look_along(Vec3::new(1.0, 0.0, 0.0), Vec3::X, 4.0);
        assert_vec_close(camera.eye, Vec3::new(-3.0, 0.0, 0.0));
        assert_vec_close(calculate_forward_vector(&camera), Vec3::X);

        let vertical = look_along(Vec3::ZERO, Vec3::NEG_Y, 2.0);
        assert_eq!(vertical.up, Vec3::Z);
        assert!(build_view_matrix(&vertical).is_finite());
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let camera = init_camera(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let moved = orbit(&camera, std::f32::consts::FRAC_PI_2, 0.0);
        assert!((moved.eye.length() - 10.0).abs() < 1e-4);
        assert_vec_close(moved.eye, Vec3::new(10.0, 0.0, 0.0));

        let tilted = orbit(&camera, 0.0, 10.0);
        assert!((tilted.eye.length() - 10.0).abs() < 1e-3);
        assert!(tilted.eye.y > 9.9);
        assert!(tilted.eye.y < 10.0);
    }

    #[test]
    fn test_frame_sphere_contains_sphere() {
        let camera = frame_sphere(Vec3::ONE, 5.0, Vec3::NEG_Z);
        let distance = camera.eye.distance(Vec3::ONE);
        assert!(distance > 5.0);
        assert!(camera.far_plane >= distance + 5.0);
    }

    #[test]
    fn test_camera_uniform() {
        let camera = CameraData::default();
        let uniform = build_camera_uniform(&camera);
        assert_eq!(uniform.camera_position, [0.0, 0.0, 10.0, 1.0]);
        assert_eq!(uniform.camera_forward, [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(uniform.planes[0], camera.near_plane);
        let bytes: &[u8] = bytemuck::bytes_of(&uniform);
        assert_eq!(bytes.len(), 240);
    }

    #[test]
    fn test_update_aspect_ratio() {
        let camera = update_aspect_ratio(&CameraData::default(), 800, 400);
        assert_eq!(camera.aspect_ratio, 2.0);
        let camera = update_aspect_ratio(&camera, 800, 0);
        assert_eq!(camera.aspect_ratio, 800.0);
    }
}
