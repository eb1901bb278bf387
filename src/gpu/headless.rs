//! Headless backend - CPU mirror of device objects
//!
//! Used on machines without an adapter and by the test suite, which needs
//! readback and live-object counts.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::backend::{check_texels, BufferUsage, GpuBackend, TexelFormat};
use super::{GpuError, GpuResult};

/// Matches the wgpu default limit
const DEFAULT_MAX_TEXTURE_DIMENSION_1D: u32 = 8192;

pub struct HeadlessBuffer {
    label: String,
    usage: BufferUsage,
    bytes: RwLock<Vec<u8>>,
    live: Arc<AtomicUsize>,
}

impl HeadlessBuffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size(&self) -> u64 {
        self.bytes.read().len() as u64
    }
}

impl Drop for HeadlessBuffer {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct HeadlessTexture {
    label: String,
    width: u32,
    format: TexelFormat,
    texels: RwLock<Vec<u8>>,
    live: Arc<AtomicUsize>,
}

impl HeadlessTexture {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn format(&self) -> TexelFormat {
        self.format
    }
}

impl Drop for HeadlessTexture {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct HeadlessBackend {
    max_texture_dimension_1d: u32,
    live_buffers: Arc<AtomicUsize>,
    live_textures: Arc<AtomicUsize>,
    uploads: AtomicU64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_max_texture_dimension_1d(DEFAULT_MAX_TEXTURE_DIMENSION_1D)
    }

    pub fn with_max_texture_dimension_1d(max: u32) -> Self {
        log::debug!(
            "[HeadlessBackend::new] Max 1D texture width {}",
            max
        );
        Self {
            max_texture_dimension_1d: max,
            live_buffers: Arc::new(AtomicUsize::new(0)),
            live_textures: Arc::new(AtomicUsize::new(0)),
            uploads: AtomicU64::new(0),
        }
    }

    /// Current device-side bytes of a buffer
    pub fn read_buffer(&self, buffer: &HeadlessBuffer) -> Vec<u8> {
        buffer.bytes.read().clone()
    }

    /// Current device-side texels of a texture
    pub fn read_texture(&self, texture: &HeadlessTexture) -> Vec<u8> {
        texture.texels.read().clone()
    }

    /// Buffers created and not yet dropped
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::Acquire)
    }

    /// Textures created and not yet dropped
    pub fn live_textures(&self) -> usize {
        self.live_textures.load(Ordering::Acquire)
    }

    /// Total uploads (creations and writes) issued so far
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for HeadlessBackend {
    type Buffer = HeadlessBuffer;
    type Texture = HeadlessTexture;

    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn max_texture_dimension_1d(&self) -> u32 {
        self.max_texture_dimension_1d
    }

    fn create_buffer(
        &self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> GpuResult<Self::Buffer> {
        if contents.is_empty() {
            return Err(GpuError::EmptyUpload {
                label: label.to_string(),
            });
        }

        self.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(HeadlessBuffer {
            label: label.to_string(),
            usage,
            bytes: RwLock::new(contents.to_vec()),
            live: Arc::clone(&self.live_buffers),
        })
    }

    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, contents: &[u8]) -> GpuResult<()> {
        if contents.is_empty() {
            return Err(GpuError::EmptyUpload {
                label: buffer.label.clone(),
            });
        }

        let mut bytes = buffer.bytes.write();
        let start = offset as usize;
        let end = start + contents.len();
        if end > bytes.len() {
            return Err(GpuError::WriteOutOfBounds {
                label: buffer.label.clone(),
                offset,
                len: contents.len(),
                size: bytes.len() as u64,
            });
        }

        bytes[start..end].copy_from_slice(contents);
        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn create_texture_1d(
        &self,
        label: &str,
        width: u32,
        format: TexelFormat,
        texels: &[u8],
    ) -> GpuResult<Self::Texture> {
        check_texels(label, width, self.max_texture_dimension_1d, format, texels)?;

        self.live_textures.fetch_add(1, Ordering::AcqRel);
        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(HeadlessTexture {
            label: label.to_string(),
            width,
            format,
            texels: RwLock::new(texels.to_vec()),
            live: Arc::clone(&self.live_textures),
        })
    }

    fn write_texture_1d(
        &self,
        texture: &Self::Texture,
        width: u32,
        format: TexelFormat,
        texels: &[u8],
    ) -> GpuResult<()> {
        check_texels(
            &texture.label,
            width,
            self.max_texture_dimension_1d,
            format,
            texels,
        )?;
        if width != texture.width {
            return Err(GpuError::TexelCountMismatch {
                label: texture.label.clone(),
                expected: texture.width as usize * format.bytes_per_texel(),
                found: texels.len(),
            });
        }

        texture.texels.write().copy_from_slice(texels);
        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
