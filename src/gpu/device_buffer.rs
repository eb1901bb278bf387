//! Vertex and index buffers
//!
//! A buffer either owns a deep copy of its host data or adopts storage the
//! caller keeps sharing. The device copy is always taken from the data the
//! caller passed in, at construction and on every `update_buffer`.

use std::mem;
use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::RwLock;

use super::backend::{BufferUsage, GpuBackend};
use crate::error::{EngineError, EngineResult};

/// Caller-owned host storage a buffer can adopt instead of copying
pub type SharedBufferData<T> = Arc<RwLock<Vec<T>>>;

pub fn share_buffer_data<T>(data: Vec<T>) -> SharedBufferData<T> {
    Arc::new(RwLock::new(data))
}

/// Whether an element is drawn as vertex data or used as an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    Vertex,
    Index,
}

/// Layout of one element in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Position3,
    Normal3,
    Color3,
    Color4,
    TexCoord2,
    /// Interleaved `renderer::PointVertex`
    PointVertex,
    Index16,
    Index32,
}

impl ElementKind {
    pub const fn stride(self) -> usize {
        match self {
            ElementKind::Position3 | ElementKind::Normal3 | ElementKind::Color3 => 12,
            ElementKind::Color4 => 16,
            ElementKind::TexCoord2 => 8,
            ElementKind::PointVertex => 32,
            ElementKind::Index16 => 2,
            ElementKind::Index32 => 4,
        }
    }

    pub const fn role(self) -> ElementRole {
        match self {
            ElementKind::Index16 | ElementKind::Index32 => ElementRole::Index,
            _ => ElementRole::Vertex,
        }
    }

    fn usage(self) -> BufferUsage {
        match self.role() {
            ElementRole::Vertex => BufferUsage::Vertex,
            ElementRole::Index => BufferUsage::Index,
        }
    }
}

/// Shape of a buffer, fixed for its lifetime
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub kind: ElementKind,
    pub count: usize,
}

impl BufferDescriptor<'_> {
    pub fn byte_size(&self) -> usize {
        self.count * self.kind.stride()
    }
}

/// Where a buffer's host data comes from
pub enum BufferSource<'a, T> {
    /// Deep-copy the slice; the buffer owns the copy
    Copy(&'a [T]),
    /// Reference caller storage; host edits stay visible through the buffer
    Adopt(SharedBufferData<T>),
}

enum HostStorage<T> {
    Owned(Vec<T>),
    Adopted(SharedBufferData<T>),
}

pub struct DeviceBuffer<B: GpuBackend, T: Pod> {
    label: String,
    kind: ElementKind,
    count: usize,
    storage: HostStorage<T>,
    handle: B::Buffer,
}

/// Buffer constructed through `DeviceBuffer::new_vertex`
pub type VertexBuffer<B, T> = DeviceBuffer<B, T>;
/// Buffer constructed through `DeviceBuffer::new_index`
pub type IndexBuffer<B, T> = DeviceBuffer<B, T>;

impl<B: GpuBackend, T: Pod> DeviceBuffer<B, T> {
    /// Validate the source against `descriptor`, set up host storage and
    /// upload the source contents to a new device buffer.
    pub fn new(
        device: &B,
        descriptor: BufferDescriptor<'_>,
        source: BufferSource<'_, T>,
    ) -> EngineResult<Self> {
        let label = descriptor.label;
        validate_layout::<T>(&descriptor)?;

        let (storage, handle) = match source {
            BufferSource::Copy(data) => {
                check_source_len::<T>(&descriptor, data.len())?;
                let handle =
                    device.create_buffer(label, descriptor.kind.usage(), bytemuck::cast_slice(data))?;
                (HostStorage::Owned(data.to_vec()), handle)
            }
            BufferSource::Adopt(shared) => {
                let handle = {
                    let data = shared.read();
                    check_source_len::<T>(&descriptor, data.len())?;
                    device.create_buffer(
                        label,
                        descriptor.kind.usage(),
                        bytemuck::cast_slice(data.as_slice()),
                    )?
                };
                (HostStorage::Adopted(shared), handle)
            }
        };

        log::debug!(
            "[DeviceBuffer::new] '{}' {:?} x{} ({} bytes, {}) on {}",
            label,
            descriptor.kind,
            descriptor.count,
            descriptor.byte_size(),
            match &storage {
                HostStorage::Owned(_) => "owned",
                HostStorage::Adopted(_) => "adopted",
            },
            device.backend_name()
        );

        Ok(Self {
            label: label.to_string(),
            kind: descriptor.kind,
            count: descriptor.count,
            storage,
            handle,
        })
    }

    pub fn new_vertex(
        device: &B,
        descriptor: BufferDescriptor<'_>,
        source: BufferSource<'_, T>,
    ) -> EngineResult<Self> {
        require_role(&descriptor, ElementRole::Vertex)?;
        Self::new(device, descriptor, source)
    }

    pub fn new_index(
        device: &B,
        descriptor: BufferDescriptor<'_>,
        source: BufferSource<'_, T>,
    ) -> EngineResult<Self> {
        require_role(&descriptor, ElementRole::Index)?;
        Self::new(device, descriptor, source)
    }

    /// Re-upload `data` into the existing device buffer. `data` must hold
    /// exactly `count()` elements. Owned host storage is refreshed too;
    /// adopted storage belongs to the caller and is left alone.
    pub fn update_buffer(&mut self, device: &B, data: &[T]) -> EngineResult<()> {
        if data.len() != self.count {
            return Err(EngineError::BufferSizeMismatch {
                label: self.label.clone(),
                expected: self.byte_size(),
                found: mem::size_of_val(data),
            });
        }

        device.write_buffer(&self.handle, 0, bytemuck::cast_slice(data))?;
        if let HostStorage::Owned(owned) = &mut self.storage {
            owned.copy_from_slice(data);
        }
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn stride(&self) -> usize {
        self.kind.stride()
    }

    pub fn byte_size(&self) -> usize {
        self.count * self.kind.stride()
    }

    /// True when the buffer holds its own deep copy of the host data
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, HostStorage::Owned(_))
    }

    /// Run `f` over the current host data
    pub fn with_host_data<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        match &self.storage {
            HostStorage::Owned(data) => f(data),
            HostStorage::Adopted(shared) => f(shared.read().as_slice()),
        }
    }

    /// Snapshot of the current host data
    pub fn host_data(&self) -> Vec<T> {
        self.with_host_data(|data| data.to_vec())
    }

    pub fn device_buffer(&self) -> &B::Buffer {
        &self.handle
    }
}

impl<B: GpuBackend, T: Pod> Drop for DeviceBuffer<B, T> {
    fn drop(&mut self) {
        log::debug!(
            "[DeviceBuffer::drop] Releasing '{}' ({} bytes, owned={})",
            self.label,
            self.byte_size(),
            self.is_owned()
        );
    }
}

fn validate_layout<T: Pod>(descriptor: &BufferDescriptor<'_>) -> EngineResult<()> {
    if descriptor.count == 0 {
        log::error!("[DeviceBuffer::new] '{}' has zero elements", descriptor.label);
        return Err(EngineError::EmptyBuffer {
            label: descriptor.label.to_string(),
        });
    }
    if mem::size_of::<T>() != descriptor.kind.stride() {
        return Err(EngineError::ElementKindMismatch {
            label: descriptor.label.to_string(),
            kind: format!("{:?}", descriptor.kind),
            reason: format!(
                "element is {} bytes, layout stride is {}",
                mem::size_of::<T>(),
                descriptor.kind.stride()
            ),
        });
    }
    Ok(())
}

fn check_source_len<T>(descriptor: &BufferDescriptor<'_>, len: usize) -> EngineResult<()> {
    if len == 0 {
        return Err(EngineError::EmptyBuffer {
            label: descriptor.label.to_string(),
        });
    }
    if len != descriptor.count {
        log::error!(
            "[DeviceBuffer::new] '{}' source holds {} elements, descriptor says {}",
            descriptor.label,
            len,
            descriptor.count
        );
        return Err(EngineError::BufferSizeMismatch {
            label: descriptor.label.to_string(),
            expected: descriptor.byte_size(),
            found: len * mem::size_of::<T>(),
        });
    }
    Ok(())
}

fn require_role(descriptor: &BufferDescriptor<'_>, role: ElementRole) -> EngineResult<()> {
    if descriptor.kind.role() != role {
        return Err(EngineError::ElementKindMismatch {
            label: descriptor.label.to_string(),
            kind: format!("{:?}", descriptor.kind),
            reason: format!("not a {:?} layout", role),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    fn positions() -> Vec<[f32; 3]> {
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
    }

    fn descriptor(count: usize) -> BufferDescriptor<'static> {
        BufferDescriptor {
            label: "positions",
            kind: ElementKind::Position3,
            count,
        }
    }

    #[test]
    fn test_copy_is_independent_of_source() {
        let backend = HeadlessBackend::new();
        let mut source = positions();
        let buffer =
            DeviceBuffer::new_vertex(&backend, descriptor(3), BufferSource::Copy(&source)).unwrap();

        source[0] = [9.0, 9.0, 9.0];
        assert!(buffer.is_owned());
        assert_eq!(buffer.host_data(), positions());
        assert_eq!(
            backend.read_buffer(buffer.device_buffer()),
            bytemuck::cast_slice::<[f32; 3], u8>(&positions()).to_vec()
        );
    }

    #[test]
    fn test_adopt_observes_source_edits() {
        let backend = HeadlessBackend::new();
        let shared = share_buffer_data(positions());
        let buffer = DeviceBuffer::new_vertex(
            &backend,
            descriptor(3),
            BufferSource::Adopt(Arc::clone(&shared)),
        )
        .unwrap();

        shared.write()[0] = [9.0, 9.0, 9.0];
        assert!(!buffer.is_owned());
        assert_eq!(buffer.host_data()[0], [9.0, 9.0, 9.0]);

        // The device copy was taken at construction
        let device_bytes = backend.read_buffer(buffer.device_buffer());
        let device_data: &[[f32; 3]] = bytemuck::cast_slice(&device_bytes);
        assert_eq!(device_data[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_drop_releases_device_buffer_and_only_owned_storage() {
        let backend = HeadlessBackend::new();
        let shared = share_buffer_data(positions());
        let adopted = DeviceBuffer::new_vertex(
            &backend,
            descriptor(3),
            BufferSource::Adopt(Arc::clone(&shared)),
        )
        .unwrap();
        let source = positions();
        let owned =
            DeviceBuffer::new_vertex(&backend, descriptor(3), BufferSource::Copy(&source)).unwrap();
        assert_eq!(backend.live_buffers(), 2);
        assert_eq!(Arc::strong_count(&shared), 2);

        drop(adopted);
        drop(owned);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(Arc::strong_count(&shared), 1);
        assert_eq!(shared.read().len(), 3);
    }

    #[test]
    fn test_rejects_invalid_construction() {
        let backend = HeadlessBackend::new();
        let empty: Vec<[f32; 3]> = Vec::new();

        let zero = DeviceBuffer::new(&backend, descriptor(0), BufferSource::Copy(&empty));
        assert!(matches!(zero, Err(EngineError::EmptyBuffer { .. })));

        let source = positions();
        let mismatched = DeviceBuffer::new(&backend, descriptor(4), BufferSource::Copy(&source));
        assert!(matches!(mismatched, Err(EngineError::BufferSizeMismatch { .. })));

        let wrong_stride = DeviceBuffer::new(
            &backend,
            BufferDescriptor {
                label: "colors",
                kind: ElementKind::Color4,
                count: 3,
            },
            BufferSource::Copy(&source),
        );
        assert!(matches!(wrong_stride, Err(EngineError::ElementKindMismatch { .. })));
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_index_role_checked() {
        let backend = HeadlessBackend::new();
        let indices: Vec<u32> = vec![0, 1, 2];
        let index_desc = BufferDescriptor {
            label: "indices",
            kind: ElementKind::Index32,
            count: 3,
        };

        let as_vertex = DeviceBuffer::new_vertex(&backend, index_desc, BufferSource::Copy(&indices));
        assert!(matches!(as_vertex, Err(EngineError::ElementKindMismatch { .. })));

        let buffer =
            IndexBuffer::new_index(&backend, index_desc, BufferSource::Copy(&indices)).unwrap();
        assert_eq!(buffer.byte_size(), 12);
        assert_eq!(buffer.device_buffer().usage(), BufferUsage::Index);
    }

    #[test]
    fn test_update_buffer_reuploads_in_place() {
        let backend = HeadlessBackend::new();
        let source = positions();
        let mut buffer =
            DeviceBuffer::new_vertex(&backend, descriptor(3), BufferSource::Copy(&source)).unwrap();

        let next = vec![[2.0f32, 2.0, 2.0]; 3];
        buffer.update_buffer(&backend, &next).unwrap();
        assert_eq!(buffer.host_data(), next);
        assert_eq!(
            backend.read_buffer(buffer.device_buffer()),
            bytemuck::cast_slice::<[f32; 3], u8>(&next).to_vec()
        );
        assert_eq!(backend.live_buffers(), 1);

        let short = vec![[0.0f32; 3]; 2];
        assert!(matches!(
            buffer.update_buffer(&backend, &short),
            Err(EngineError::BufferSizeMismatch { .. })
        ));
        assert_eq!(buffer.host_data(), next);
    }

    #[test]
    fn test_update_leaves_adopted_storage_alone() {
        let backend = HeadlessBackend::new();
        let shared = share_buffer_data(positions());
        let mut buffer = DeviceBuffer::new_vertex(
            &backend,
            descriptor(3),
            BufferSource::Adopt(Arc::clone(&shared)),
        )
        .unwrap();

        let next = vec![[5.0f32, 5.0, 5.0]; 3];
        buffer.update_buffer(&backend, &next).unwrap();
        assert_eq!(*shared.read(), positions());
        assert_eq!(
            backend.read_buffer(buffer.device_buffer()),
            bytemuck::cast_slice::<[f32; 3], u8>(&next).to_vec()
        );
    }
}
