//! Point sprite vertex layout

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::cluster::Point;

/// One point as the vertex shader sees it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    /// Scalar value for the transfer function lookup
    pub value: f32,
    pub color: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<PointVertex>(), 32);

impl PointVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32,
        2 => Float32x4,
    ];

    pub fn from_point(point: &Point) -> Self {
        Self {
            position: point.position.to_array(),
            value: point.value,
            color: point.color.to_array(),
        }
    }

    pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&Point> for PointVertex {
    fn from(point: &Point) -> Self {
        Self::from_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::ElementKind;
    use glam::{Vec3, Vec4};

    #[test]
    fn test_layout_matches_element_kind() {
        let layout = PointVertex::vertex_buffer_layout();
        assert_eq!(layout.array_stride as usize, ElementKind::PointVertex.stride());
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 16);
    }

    #[test]
    fn test_from_point() {
        let point = Point::new(Vec3::new(1.0, 2.0, 3.0), 0.25).with_color(Vec4::new(0.1, 0.2, 0.3, 0.4));
        let vertex = PointVertex::from(&point);
        assert_eq!(vertex.position, [1.0, 2.0, 3.0]);
        assert_eq!(vertex.value, 0.25);
        assert_eq!(vertex.color, [0.1, 0.2, 0.3, 0.4]);
    }
}
