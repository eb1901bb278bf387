//! Build a synthetic point cloud and prepare a few frames of it
//!
//! Runs on the CPU mirror backend, then on a real adapter when one is
//! available. Use RUST_LOG=debug to see per-frame detail.

use anyhow::Context;
use fieldvis_engine::{
    build_cluster_tree, camera, gpu::GpuBackend, transfer::colorize_points, init_logging,
    HeadlessBackend, Point, PointSetRenderer, RenderConfig, SortOrder, TransferFunction,
    TransferFunctionRegistry, WgpuBackend,
};
use fieldvis_engine::transfer::{ColorControlPoint, OpacityControlPoint};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POINTS_PER_BLOB: usize = 20_000;

fn main() -> anyhow::Result<()> {
    init_logging();

    let headless = HeadlessBackend::new();
    run(&headless).context("headless run failed")?;
    log::info!(
        "[main] Headless backend: {} uploads, {} live buffers",
        headless.upload_count(),
        headless.live_buffers()
    );

    match WgpuBackend::new_headless() {
        Ok(device) => run(&device).context("wgpu run failed")?,
        Err(err) => log::warn!("[main] Skipping wgpu run: {}", err),
    }
    Ok(())
}

fn run<B: GpuBackend + 'static>(device: &B) -> anyhow::Result<()> {
    log::info!("[run] Backend {}", device.backend_name());

    let config = RenderConfig::from_toml_str(
        r#"
        bucket_count = 256
        sort_level = 4

        [cluster]
        max_depth = 8
        min_cluster_size = 16
        "#,
    )?;

    let ramp = TransferFunction::from_control_points(
        device,
        "heat",
        256,
        &[
            ColorControlPoint { position: 0.0, rgb: [0.1, 0.1, 0.6] },
            ColorControlPoint { position: 0.5, rgb: [0.9, 0.9, 0.2] },
            ColorControlPoint { position: 1.0, rgb: [0.8, 0.1, 0.1] },
        ],
        &[
            OpacityControlPoint { position: 0.0, alpha: 0.2 },
            OpacityControlPoint { position: 1.0, alpha: 1.0 },
        ],
    )?;

    let mut points = two_blobs();
    colorize_points(&mut points, &ramp, (0.0, 1.0));
    let tree = build_cluster_tree(points, &config.cluster)?;
    log::info!("[run] {:?}", tree.stats());

    let mut registry = TransferFunctionRegistry::new();
    registry.define(device, "heat", ramp.sample_count(), ramp.rgba())?;

    let mut renderer = PointSetRenderer::new(config)?;
    if let Some(heat) = registry.get("heat") {
        renderer.set_transfer_function(heat);
    }

    let (center, radius) = tree.bounding_sphere();
    let mut view = camera::frame_sphere(center, radius, Vec3::NEG_Z);
    for frame in 0..8 {
        if frame == 4 {
            renderer.set_order(SortOrder::FrontToBack);
        }
        let draw = renderer.prepare_frame(device, &tree, &view)?;
        log::info!(
            "[run] Frame {}: {} clusters, {} vertices, {} buckets used, reallocated: {}",
            draw.frame_index,
            draw.clusters_drawn,
            draw.vertex_count,
            draw.sort_stats.non_empty_buckets,
            draw.reallocated
        );
        renderer.end_frame();
        view = camera::orbit(&view, 0.4, 0.05);
        camera::log_camera_context(&view);
    }
    Ok(())
}

fn two_blobs() -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(42);
    let centers = [Vec3::new(-20.0, 0.0, 0.0), Vec3::new(25.0, 5.0, -10.0)];
    centers
        .iter()
        .enumerate()
        .flat_map(|(blob, &center)| {
            (0..POINTS_PER_BLOB)
                .map(|_| {
                    let offset = Vec3::new(
                        rng.gen_range(-8.0..8.0),
                        rng.gen_range(-4.0..4.0),
                        rng.gen_range(-6.0..6.0),
                    );
                    let falloff = 1.0 - (offset.length() / 11.0).min(1.0);
                    let value = (blob as f32 * 0.5 + falloff * 0.5).clamp(0.0, 1.0);
                    Point::new(center + offset, value).with_size(0.05)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
