//! The device seam
//!
//! Components never reach for a global device. They take a `&B` where
//! `B: GpuBackend` and hold the handles it returns; dropping a handle
//! releases the device object.

use super::GpuResult;

/// How a buffer is bound when drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

impl BufferUsage {
    pub fn to_wgpu(self) -> wgpu::BufferUsages {
        match self {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// Texel layouts used by 1-D lookup textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelFormat {
    /// Four f32 channels, the transfer function table layout
    Rgba32Float,
}

impl TexelFormat {
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            TexelFormat::Rgba32Float => 16,
        }
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TexelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }

    /// Whether a filtering sampler may read this format on a device
    /// without `FLOAT32_FILTERABLE`. When false, shaders fetch texels
    /// with `textureLoad` and interpolate between neighbours themselves.
    pub const fn is_filterable(self) -> bool {
        match self {
            TexelFormat::Rgba32Float => false,
        }
    }

    pub fn sample_type(self) -> wgpu::TextureSampleType {
        wgpu::TextureSampleType::Float {
            filterable: self.is_filterable(),
        }
    }
}

/// Device context handed to every GPU-backed component
pub trait GpuBackend {
    type Buffer;
    type Texture;

    /// Short name for logs
    fn backend_name(&self) -> &'static str;

    /// Largest width accepted by `create_texture_1d`
    fn max_texture_dimension_1d(&self) -> u32;

    /// Allocate a buffer and copy `contents` into it
    fn create_buffer(
        &self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> GpuResult<Self::Buffer>;

    /// Overwrite part of an existing buffer without reallocating it.
    /// The write is visible to every draw submitted after this call returns.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, contents: &[u8]) -> GpuResult<()>;

    /// Allocate a 1-D texture of `width` texels and upload `texels`
    fn create_texture_1d(
        &self,
        label: &str,
        width: u32,
        format: TexelFormat,
        texels: &[u8],
    ) -> GpuResult<Self::Texture>;

    /// Replace the full contents of a 1-D texture
    fn write_texture_1d(
        &self,
        texture: &Self::Texture,
        width: u32,
        format: TexelFormat,
        texels: &[u8],
    ) -> GpuResult<()>;
}

/// Shared size check for 1-D texture uploads
pub(crate) fn check_texels(
    label: &str,
    width: u32,
    max: u32,
    format: TexelFormat,
    texels: &[u8],
) -> GpuResult<()> {
    use super::GpuError;

    if width == 0 || texels.is_empty() {
        return Err(GpuError::EmptyUpload {
            label: label.to_string(),
        });
    }
    if width > max {
        return Err(GpuError::TextureTooLarge {
            label: label.to_string(),
            width,
            max,
        });
    }
    let expected = width as usize * format.bytes_per_texel();
    if texels.len() != expected {
        return Err(GpuError::TexelCountMismatch {
            label: label.to_string(),
            expected,
            found: texels.len(),
        });
    }
    Ok(())
}
