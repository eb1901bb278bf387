// Field Visualization Engine
//
// Rendering core for large point and volume data sets:
// - gpu: device context, shared resource handles, copy-or-adopt buffers
// - transfer: scalar to RGBA tables mirrored in 1-D textures
// - cluster: principal-axis cluster tree, one level per level of detail
// - sort: per-frame depth bucket sort over a tree level
// - renderer: gathers sorted clusters into a vertex stream
//
// The device is always passed in explicitly; nothing here holds a global.

pub mod camera;
pub mod cluster;
pub mod config;
pub mod error;
pub mod gpu;
pub mod renderer;
pub mod sort;
pub mod transfer;

pub use camera::{CameraData, CameraUniform};
pub use cluster::{build_cluster_tree, Cluster, ClusterId, ClusterTree, ClusterTreeConfig, Point};
pub use config::{ConfigError, RenderConfig};
pub use error::{EngineError, EngineResult, ErrorContext, OptionExt};
pub use gpu::{
    BufferDescriptor, BufferSource, DeviceBuffer, ElementKind, FrameResourceTracker, GpuBackend,
    GpuError, HeadlessBackend, IndexBuffer, ResourceHandle, VertexBuffer, WgpuBackend,
};
pub use renderer::{FrameDraw, PointSetRenderer, PointVertex};
pub use sort::{DepthBucketSort, SortOrder};
pub use transfer::{TransferFunction, TransferFunctionRegistry};

/// Install `env_logger` as the `log` backend. Safe to call more than once;
/// later calls leave the first logger in place.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
