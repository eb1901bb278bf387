//! Point Set Renderer
//!
//! Consumer of the cluster tree and depth sort: every frame the chosen
//! level is bucketed from the camera, the points of each cluster are
//! gathered in draw order and uploaded as one vertex stream.

use log::{debug, info, warn};

use super::point_vertex::PointVertex;
use crate::camera::{build_view_matrix, CameraData};
use crate::cluster::ClusterTree;
use crate::config::RenderConfig;
use crate::error::EngineResult;
use crate::gpu::{
    share_buffer_data, BufferDescriptor, BufferSource, DeviceBuffer, ElementKind, FrameResourceTracker,
    GpuBackend, ResourceHandle, SharedBufferData, VertexBuffer,
};
use crate::sort::{BucketSortStats, DepthBucketSort, SortOrder};
use crate::transfer::SharedTransferFunction;

const VERTEX_BUFFER_LABEL: &str = "point set vertices";

pub type SharedVertexBuffer<B> = ResourceHandle<VertexBuffer<B, PointVertex>>;

/// What one prepared frame will draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDraw {
    pub frame_index: u64,
    pub vertex_count: usize,
    pub clusters_drawn: usize,
    pub level: u32,
    pub order: SortOrder,
    pub sort_stats: BucketSortStats,
    /// Version of the bound transfer function, if any
    pub transfer_version: Option<u64>,
    /// Whether the vertex buffer had to be allocated this frame
    pub reallocated: bool,
}

pub struct PointSetRenderer<B: GpuBackend> {
    config: RenderConfig,
    sort: DepthBucketSort,
    /// Host side of the vertex stream, adopted by the device buffer
    vertices: SharedBufferData<PointVertex>,
    vertex_buffer: Option<SharedVertexBuffer<B>>,
    transfer_function: Option<SharedTransferFunction<B>>,
    tracker: FrameResourceTracker,
    frame_index: u64,
}

impl<B: GpuBackend + 'static> PointSetRenderer<B> {
    pub fn new(config: RenderConfig) -> EngineResult<Self> {
        config.validate()?;
        let sort = DepthBucketSort::new(config.bucket_count)?;
        info!(
            "[PointSetRenderer::new] {} buckets, level {}, {:?}",
            config.bucket_count, config.sort_level, config.order
        );

        Ok(Self {
            config,
            sort,
            vertices: share_buffer_data(Vec::new()),
            vertex_buffer: None,
            transfer_function: None,
            tracker: FrameResourceTracker::new(),
            frame_index: 0,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_order(&mut self, order: SortOrder) {
        self.config.order = order;
    }

    /// Level used by later frames; clamps to each tree's depth when sorting
    pub fn set_level(&mut self, level: u32) {
        self.config.sort_level = level;
    }

    pub fn set_transfer_function(&mut self, transfer_function: SharedTransferFunction<B>) {
        self.transfer_function = Some(transfer_function);
    }

    pub fn transfer_function(&self) -> Option<&SharedTransferFunction<B>> {
        self.transfer_function.as_ref()
    }

    pub fn vertex_buffer(&self) -> Option<&SharedVertexBuffer<B>> {
        self.vertex_buffer.as_ref()
    }

    /// Vertices of the last prepared frame, in draw order
    pub fn vertices(&self) -> Vec<PointVertex> {
        self.vertices.read().clone()
    }

    /// Frames prepared but not yet ended hold their resources
    pub fn frame_in_flight(&self) -> bool {
        !self.tracker.is_empty()
    }

    /// Sort the configured level for `camera` and upload the points in
    /// draw order. The sort is consumed and reset before returning.
    /// Only one frame is in flight: a frame that was never ended is
    /// retired here first.
    pub fn prepare_frame(
        &mut self,
        device: &B,
        tree: &ClusterTree,
        camera: &CameraData,
    ) -> EngineResult<FrameDraw> {
        if !self.tracker.is_empty() {
            warn!(
                "[PointSetRenderer::prepare_frame] Frame {} was never ended, retiring it",
                self.frame_index.saturating_sub(1)
            );
            self.tracker.retire();
        }

        let level = self.config.sort_level.min(tree.depth());
        let order = self.config.order;
        let view = build_view_matrix(camera);

        self.sort.sort(tree, level, &view);
        let sort_stats = self.sort.stats();

        let clusters_drawn = {
            let mut vertices = self.vertices.write();
            vertices.clear();
            vertices.reserve(tree.point_count());
            let mut drawn = 0;
            for entry in self.sort.iter(order) {
                vertices.extend(tree.points_of(entry.cluster).iter().map(PointVertex::from_point));
                drawn += 1;
            }
            drawn
        };
        self.sort.reset();

        let reallocated = self.upload_vertices(device)?;
        let vertex_count = self.vertices.read().len();

        if let Some(buffer) = &self.vertex_buffer {
            self.tracker.track(buffer);
        }
        let transfer_version = self.transfer_function.as_ref().map(|tf| {
            self.tracker.track(tf);
            tf.read().version()
        });

        let frame_index = self.frame_index;
        self.frame_index += 1;

        debug!(
            "[PointSetRenderer::prepare_frame] Frame {}: {} clusters, {} vertices, level {}",
            frame_index, clusters_drawn, vertex_count, level
        );

        Ok(FrameDraw {
            frame_index,
            vertex_count,
            clusters_drawn,
            level,
            order,
            sort_stats,
            transfer_version,
            reallocated,
        })
    }

    /// Release everything the last prepared frame kept alive
    pub fn end_frame(&mut self) -> usize {
        self.tracker.retire()
    }

    /// Rewrite the existing buffer when no in-flight frame still holds it
    /// and the size matches; allocate a new one otherwise.
    fn upload_vertices(&mut self, device: &B) -> EngineResult<bool> {
        let vertices = self.vertices.read();
        if vertices.is_empty() {
            return Ok(false);
        }

        if let Some(handle) = self.vertex_buffer.as_mut() {
            if handle.count() == vertices.len() {
                if let Some(buffer) = handle.get_mut() {
                    buffer.update_buffer(device, &vertices)?;
                    return Ok(false);
                }
            }
        }

        let count = vertices.len();
        drop(vertices);
        let buffer = DeviceBuffer::new_vertex(
            device,
            BufferDescriptor {
                label: VERTEX_BUFFER_LABEL,
                kind: ElementKind::PointVertex,
                count,
            },
            BufferSource::Adopt(self.vertices.clone()),
        )?;
        debug!(
            "[PointSetRenderer::upload_vertices] Allocated {} bytes for {} vertices",
            buffer.byte_size(),
            count
        );

        // an in-flight frame keeps the previous buffer through the tracker
        if let Some(previous) = self.vertex_buffer.replace(ResourceHandle::new(buffer)) {
            previous.release();
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{init_camera, look_along};
    use crate::cluster::{build_cluster_tree, ClusterTreeConfig, Point};
    use crate::gpu::HeadlessBackend;
    use crate::transfer::TransferFunctionRegistry;
    use glam::Vec3;

    fn two_groups() -> ClusterTree {
        let mut points = Vec::new();
        for i in 0..4 {
            let jitter = i as f32 * 0.01;
            points.push(Point::new(Vec3::new(jitter, jitter, 0.0), 0.0));
            points.push(Point::new(Vec3::new(10.0 + jitter, -jitter, 0.0), 1.0));
        }
        let config = ClusterTreeConfig {
            max_depth: 1,
            ..ClusterTreeConfig::default()
        };
        build_cluster_tree(points, &config).unwrap()
    }

    fn renderer(order: SortOrder) -> PointSetRenderer<HeadlessBackend> {
        let config = RenderConfig {
            bucket_count: 4,
            sort_level: 1,
            order,
            cluster: ClusterTreeConfig {
                max_depth: 1,
                ..ClusterTreeConfig::default()
            },
        };
        PointSetRenderer::new(config).unwrap()
    }

    fn vertex_values(backend: &HeadlessBackend, renderer: &PointSetRenderer<HeadlessBackend>) -> Vec<f32> {
        let buffer = renderer.vertex_buffer().unwrap();
        let bytes = backend.read_buffer(buffer.device_buffer());
        let vertices: Vec<PointVertex> = bytemuck::pod_collect_to_vec(&bytes);
        vertices.iter().map(|v| v.value).collect()
    }

    #[test]
    fn test_near_group_drawn_first_front_to_back() {
        let backend = HeadlessBackend::new();
        let tree = two_groups();
        let camera = init_camera(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0));

        let mut renderer = renderer(SortOrder::FrontToBack);
        let frame = renderer.prepare_frame(&backend, &tree, &camera).unwrap();
        assert_eq!(frame.clusters_drawn, 2);
        assert_eq!(frame.vertex_count, 8);
        assert_eq!(frame.sort_stats.non_empty_buckets, 2);
        assert_eq!(vertex_values(&backend, &renderer), [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        renderer.end_frame();

        renderer.set_order(SortOrder::BackToFront);
        renderer.prepare_frame(&backend, &tree, &camera).unwrap();
        assert_eq!(vertex_values(&backend, &renderer), [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_buffer_reused_after_end_frame() {
        let backend = HeadlessBackend::new();
        let tree = two_groups();
        let camera = look_along(Vec3::new(5.0, 0.0, 0.0), Vec3::X, 15.0);
        let mut renderer = renderer(SortOrder::BackToFront);

        let first = renderer.prepare_frame(&backend, &tree, &camera).unwrap();
        assert!(first.reallocated);
        assert!(renderer.frame_in_flight());
        assert_eq!(renderer.end_frame(), 1);

        let second = renderer.prepare_frame(&backend, &tree, &camera).unwrap();
        assert!(!second.reallocated);
        assert_eq!(second.frame_index, 1);
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn test_in_flight_buffer_is_not_overwritten() {
        let backend = HeadlessBackend::new();
        let tree = two_groups();
        let mut renderer = renderer(SortOrder::FrontToBack);

        let near_first = init_camera(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0));
        renderer.prepare_frame(&backend, &tree, &near_first).unwrap();
        let in_flight = renderer.vertex_buffer().unwrap().acquire();

        // camera on the other side reverses the order
        let far_first = init_camera(Vec3::new(20.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0));
        let frame = renderer.prepare_frame(&backend, &tree, &far_first).unwrap();
        assert!(frame.reallocated);
        assert_eq!(backend.live_buffers(), 2);

        let old: Vec<PointVertex> =
            bytemuck::pod_collect_to_vec(&backend.read_buffer(in_flight.device_buffer()));
        assert_eq!(old[0].value, 0.0);
        assert_eq!(vertex_values(&backend, &renderer)[0], 1.0);

        in_flight.release();
        renderer.end_frame();
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn test_unended_frames_do_not_accumulate_buffers() {
        let backend = HeadlessBackend::new();
        let tree = two_groups();
        let camera = look_along(Vec3::new(5.0, 0.0, 0.0), Vec3::X, 15.0);
        let mut renderer = renderer(SortOrder::BackToFront);

        for _ in 0..50 {
            renderer.prepare_frame(&backend, &tree, &camera).unwrap();
            assert!(backend.live_buffers() <= 1);
        }
        assert!(renderer.frame_in_flight());
        assert_eq!(renderer.end_frame(), 1);
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn test_transfer_function_tracked_per_frame() {
        let backend = HeadlessBackend::new();
        let mut registry = TransferFunctionRegistry::new();
        registry
            .define(&backend, "gray", 2, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0])
            .unwrap();
        let tree = two_groups();
        let camera = look_along(Vec3::new(5.0, 0.0, 0.0), Vec3::X, 15.0);

        let mut renderer = renderer(SortOrder::BackToFront);
        renderer.set_transfer_function(registry.get("gray").unwrap());
        let frame = renderer.prepare_frame(&backend, &tree, &camera).unwrap();
        assert_eq!(frame.transfer_version, Some(0));

        // registry, renderer and the in-flight frame
        assert_eq!(renderer.transfer_function().unwrap().holders(), 3);
        assert_eq!(renderer.end_frame(), 2);
        assert_eq!(renderer.transfer_function().unwrap().holders(), 2);

        assert!(registry.remove("gray"));
        assert_eq!(backend.live_textures(), 1);
    }

    #[test]
    fn test_level_clamps_to_tree_depth() {
        let backend = HeadlessBackend::new();
        let tree = two_groups();
        let mut renderer = renderer(SortOrder::BackToFront);
        renderer.set_level(7);
        let frame = renderer
            .prepare_frame(&backend, &tree, &CameraData::default())
            .unwrap();
        assert_eq!(frame.level, 1);
        assert_eq!(frame.vertex_count, tree.point_count());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RenderConfig {
            bucket_count: 0,
            ..RenderConfig::default()
        };
        assert!(PointSetRenderer::<HeadlessBackend>::new(config).is_err());
    }
}
