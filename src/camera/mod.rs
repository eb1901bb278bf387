/// Camera Module
///
/// - camera_data.rs: Plain data structures
/// - camera_operations.rs: Functions that operate on data

pub mod camera_data;
pub mod camera_operations;

pub use camera_data::{CameraData, CameraUniform};

pub use camera_operations::{
    // Initialization
    frame_sphere,
    init_camera,
    look_along,

    // View/projection
    build_camera_uniform,
    build_projection_matrix,
    build_view_matrix,

    // Updates
    dolly,
    orbit,
    update_aspect_ratio,

    // Utilities
    calculate_forward_vector,
    log_camera_context,
};
