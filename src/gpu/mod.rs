//! GPU Module - device context and GPU-resident objects
//!
//! Every object that lives on the device goes through a `GpuBackend`
//! passed in explicitly by the caller. There is no process-wide device.
//! - backend.rs: the device seam
//! - wgpu_backend.rs: real device via wgpu
//! - headless.rs: CPU mirror with readback, for servers without a GPU and tests
//! - resource.rs / resource_tracker.rs: shared ownership of device objects
//! - device_buffer.rs: vertex/index buffers with copy-or-adopt storage

pub mod backend;
pub mod device_buffer;
pub mod headless;
pub mod resource;
pub mod resource_tracker;
pub mod wgpu_backend;

pub use backend::{BufferUsage, GpuBackend, TexelFormat};
pub use device_buffer::{
    share_buffer_data, BufferDescriptor, BufferSource, DeviceBuffer, ElementKind, ElementRole,
    IndexBuffer, SharedBufferData, VertexBuffer,
};
pub use headless::{HeadlessBackend, HeadlessBuffer, HeadlessTexture};
pub use resource::{ResourceHandle, ResourceId};
pub use resource_tracker::FrameResourceTracker;
pub use wgpu_backend::WgpuBackend;

/// Result alias for device-level operations
pub type GpuResult<T> = Result<T, GpuError>;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No compatible GPU adapter found")]
    DeviceNotFound,
    #[error("Device request failed: {0}")]
    RequestDevice(String),
    #[error("Upload to '{label}' has no data")]
    EmptyUpload { label: String },
    #[error("Write of {len} bytes at offset {offset} overruns '{label}' ({size} bytes)")]
    WriteOutOfBounds {
        label: String,
        offset: u64,
        len: usize,
        size: u64,
    },
    #[error("Texture '{label}' width {width} exceeds device limit {max}")]
    TextureTooLarge { label: String, width: u32, max: u32 },
    #[error("Texture '{label}' expects {expected} bytes of texels, found {found}")]
    TexelCountMismatch {
        label: String,
        expected: usize,
        found: usize,
    },
}
