//! wgpu device backend
//!
//! Uploads go through `Queue::write_buffer` / `Queue::write_texture`. wgpu
//! schedules those copies ahead of any command buffer submitted later, so a
//! draw recorded after an update never sees a half-written buffer or texture.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::backend::{check_texels, BufferUsage, GpuBackend, TexelFormat};
use super::{GpuError, GpuResult};

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuBackend {
    /// Wrap a device/queue pair owned by the host renderer
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        log::info!(
            "[WgpuBackend::new] Using device with max 1D texture width {}",
            device.limits().max_texture_dimension_1d
        );
        Self { device, queue }
    }

    /// Request an adapter and device with no surface attached
    pub async fn request_headless() -> GpuResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(GpuError::DeviceNotFound)?;

        log::info!(
            "[WgpuBackend::request_headless] Adapter: {:?}",
            adapter.get_info()
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("fieldvis device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::RequestDevice(e.to_string()))?;

        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// Blocking variant of `request_headless`
    #[cfg(feature = "native")]
    pub fn new_headless() -> GpuResult<Self> {
        pollster::block_on(Self::request_headless())
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// View suitable for binding a lookup table to a shader
    pub fn create_texture_view_1d(&self, texture: &wgpu::Texture) -> wgpu::TextureView {
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("1D Lookup View"),
            dimension: Some(wgpu::TextureViewDimension::D1),
            ..Default::default()
        })
    }

    /// Layout entry for a 1-D lookup table of `format` at `binding`
    pub fn texture_1d_layout_entry(
        binding: u32,
        format: TexelFormat,
        visibility: wgpu::ShaderStages,
    ) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: format.sample_type(),
                view_dimension: wgpu::TextureViewDimension::D1,
                multisampled: false,
            },
            count: None,
        }
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Texture = wgpu::Texture;

    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn max_texture_dimension_1d(&self) -> u32 {
        self.device.limits().max_texture_dimension_1d
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

        // create_buffer_init pads the allocation to COPY_BUFFER_ALIGNMENT
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usage.to_wgpu(),
            }))
    }

    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, contents: &[u8]) -> GpuResult<()> {
        if contents.is_empty() {
            return Err(GpuError::EmptyUpload {
                label: "buffer".to_string(),
            });
        }
        if offset + contents.len() as u64 > buffer.size() {
            return Err(GpuError::WriteOutOfBounds {
                label: "buffer".to_string(),
                offset,
                len: contents.len(),
                size: buffer.size(),
            });
        }

        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        if contents.len() % align == 0 {
            self.queue.write_buffer(buffer, offset, contents);
        } else {
            // 16-bit index data can end off the copy alignment
            let mut padded = Vec::with_capacity(contents.len() + align);
            padded.extend_from_slice(contents);
            padded.resize(contents.len().next_multiple_of(align), 0);
            self.queue.write_buffer(buffer, offset, &padded);
        }
        Ok(())
    }

    fn create_texture_1d(
        &self,
        label: &str,
        width: u32,
        format: TexelFormat,
        texels: &[u8],
    ) -> GpuResult<Self::Texture> {
        check_texels(label, width, self.max_texture_dimension_1d(), format, texels)?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: format.to_wgpu(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.write_texture_1d(&texture, width, format, texels)?;
        Ok(texture)
    }

    fn write_texture_1d(
        &self,
        texture: &Self::Texture,
        width: u32,
        format: TexelFormat,
        texels: &[u8],
    ) -> GpuResult<()> {
        check_texels("texture", width, self.max_texture_dimension_1d(), format, texels)?;

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * format.bytes_per_texel() as u32),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}
