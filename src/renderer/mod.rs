//! Renderer Module - point set drawing on top of the depth sort

pub mod point_set_renderer;
pub mod point_vertex;

pub use point_set_renderer::{FrameDraw, PointSetRenderer, SharedVertexBuffer};
pub use point_vertex::PointVertex;
