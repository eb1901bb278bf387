//! Transfer function - scalar to RGBA table mirrored in a 1-D texture
//!
//! The table has a fixed number of samples for its whole life. `update`
//! replaces every sample and re-uploads the whole texture before returning,
//! so the texture always matches `rgba()`.
//!
//! The texture is `Rgba32Float`, which is not filterable on most devices.
//! Shaders read it with `textureLoad` and blend the two nearest texels,
//! the same lookup `sample_table` performs on the CPU.

use rayon::prelude::*;

use super::control_points::{build_rgba_table, ColorControlPoint, OpacityControlPoint};
use crate::cluster::Point;
use crate::error::{EngineError, EngineResult};
use crate::gpu::{GpuBackend, TexelFormat};

const TEXEL_FORMAT: TexelFormat = TexelFormat::Rgba32Float;

pub struct TransferFunction<B: GpuBackend> {
    name: String,
    sample_count: usize,
    rgba: Vec<f32>,
    texture: B::Texture,
    version: u64,
}

impl<B: GpuBackend> TransferFunction<B> {
    /// Create from `sample_count` RGBA quadruples (`rgba.len() == 4 * sample_count`)
    pub fn new(device: &B, name: &str, sample_count: usize, rgba: &[f32]) -> EngineResult<Self> {
        validate_table(device, name, sample_count, rgba)?;

        let texture = device.create_texture_1d(
            name,
            sample_count as u32,
            TEXEL_FORMAT,
            bytemuck::cast_slice(rgba),
        )?;

        log::info!(
            "[TransferFunction::new] '{}' with {} samples on {}",
            name,
            sample_count,
            device.backend_name()
        );

        Ok(Self {
            name: name.to_string(),
            sample_count,
            rgba: rgba.to_vec(),
            texture,
            version: 0,
        })
    }

    /// Build the table from piecewise-linear control points
    pub fn from_control_points(
        device: &B,
        name: &str,
        sample_count: usize,
        colors: &[ColorControlPoint],
        opacities: &[OpacityControlPoint],
    ) -> EngineResult<Self> {
        let table = build_rgba_table(sample_count, colors, opacities).map_err(|reason| {
            EngineError::InvalidControlPoints {
                name: name.to_string(),
                reason,
            }
        })?;
        Self::new(device, name, sample_count, &table)
    }

    /// Replace every sample and re-upload the texture. On error neither the
    /// table nor the texture has changed.
    pub fn update(&mut self, device: &B, rgba: &[f32]) -> EngineResult<()> {
        validate_table(device, &self.name, self.sample_count, rgba)?;

        device.write_texture_1d(
            &self.texture,
            self.sample_count as u32,
            TEXEL_FORMAT,
            bytemuck::cast_slice(rgba),
        )?;
        self.rgba.copy_from_slice(rgba);
        self.version += 1;

        log::debug!(
            "[TransferFunction::update] '{}' now at version {}",
            self.name,
            self.version
        );
        Ok(())
    }

    /// Interpolated lookup, the same one a shader does against the texture
    pub fn sample(&self, value: f32) -> [f32; 4] {
        sample_table(&self.rgba, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// The RGBA table, four floats per sample
    pub fn rgba(&self) -> &[f32] {
        &self.rgba
    }

    pub fn texture(&self) -> &B::Texture {
        &self.texture
    }

    /// Texel layout of `texture()`, for building bind group layouts
    pub fn texel_format(&self) -> TexelFormat {
        TEXEL_FORMAT
    }

    /// Number of successful `update` calls
    pub fn version(&self) -> u64 {
        self.version
    }
}

fn validate_table<B: GpuBackend>(
    device: &B,
    name: &str,
    sample_count: usize,
    rgba: &[f32],
) -> EngineResult<()> {
    let max = device.max_texture_dimension_1d() as usize;
    if sample_count == 0 || sample_count > max {
        log::error!(
            "[TransferFunction] '{}' sample count {} out of range (max {})",
            name,
            sample_count,
            max
        );
        return Err(EngineError::InvalidSampleCount {
            name: name.to_string(),
            count: sample_count,
            max,
        });
    }
    if rgba.len() != sample_count * 4 {
        return Err(EngineError::TransferTableMismatch {
            name: name.to_string(),
            expected: sample_count * 4,
            found: rgba.len(),
        });
    }
    if let Some((index, &value)) = rgba
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && (0.0..=1.0).contains(*v)))
    {
        return Err(EngineError::TransferValueOutOfRange {
            name: name.to_string(),
            index,
            value,
        });
    }
    Ok(())
}

/// Linear interpolation over an RGBA table by normalized value. Values
/// outside [0, 1] clamp to the ends; NaN reads the first sample.
pub fn sample_table(rgba: &[f32], value: f32) -> [f32; 4] {
    let samples = rgba.len() / 4;
    if samples == 0 {
        return [0.0; 4];
    }
    let texel = |i: usize| -> [f32; 4] { [rgba[i * 4], rgba[i * 4 + 1], rgba[i * 4 + 2], rgba[i * 4 + 3]] };
    if samples == 1 {
        return texel(0);
    }

    let t = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let x = t * (samples - 1) as f32;
    let i0 = (x.floor() as usize).min(samples - 1);
    let i1 = (i0 + 1).min(samples - 1);
    let f = x - i0 as f32;

    let a = texel(i0);
    let b = texel(i1);
    [
        a[0] + (b[0] - a[0]) * f,
        a[1] + (b[1] - a[1]) * f,
        a[2] + (b[2] - a[2]) * f,
        a[3] + (b[3] - a[3]) * f,
    ]
}

/// Color points from their scalar value, for loaders that supply no
/// per-point color. `range` maps raw values onto [0, 1].
pub fn colorize_points<B: GpuBackend>(
    points: &mut [Point],
    transfer_function: &TransferFunction<B>,
    range: (f32, f32),
) {
    let table = transfer_function.rgba();
    let (min, max) = range;
    let span = max - min;

    points.par_iter_mut().for_each(|point| {
        let normalized = if span.abs() > f32::EPSILON {
            (point.value - min) / span
        } else {
            0.0
        };
        point.color = sample_table(table, normalized).into();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;
    use glam::Vec3;

    fn gray_ramp(n: usize) -> Vec<f32> {
        (0..n)
            .flat_map(|i| {
                let v = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
                [v, v, v, 1.0]
            })
            .collect()
    }

    fn texture_floats(backend: &HeadlessBackend, tf: &TransferFunction<HeadlessBackend>) -> Vec<f32> {
        let bytes = backend.read_texture(tf.texture());
        bytemuck::pod_collect_to_vec(&bytes)
    }

    #[test]
    fn test_texture_mirrors_table_after_updates() {
        let backend = HeadlessBackend::new();
        for n in [1usize, 2, 7, 256] {
            let mut tf = TransferFunction::new(&backend, "ramp", n, &gray_ramp(n)).unwrap();
            assert_eq!(texture_floats(&backend, &tf), gray_ramp(n));

            let next: Vec<f32> = gray_ramp(n).iter().map(|v| 1.0 - v).collect();
            tf.update(&backend, &next).unwrap();
            assert_eq!(tf.rgba(), next.as_slice());
            assert_eq!(texture_floats(&backend, &tf), next);
            assert_eq!(tf.version(), 1);
        }
    }

    #[test]
    fn test_rejects_invalid_tables() {
        let backend = HeadlessBackend::with_max_texture_dimension_1d(16);

        let zero = TransferFunction::new(&backend, "tf", 0, &[]);
        assert!(matches!(zero, Err(EngineError::InvalidSampleCount { .. })));

        let too_many = TransferFunction::new(&backend, "tf", 17, &gray_ramp(17));
        assert!(matches!(too_many, Err(EngineError::InvalidSampleCount { .. })));

        let short = TransferFunction::new(&backend, "tf", 2, &[0.0; 7]);
        assert!(matches!(short, Err(EngineError::TransferTableMismatch { .. })));

        let out_of_range = TransferFunction::new(&backend, "tf", 1, &[0.0, 0.0, 2.0, 1.0]);
        assert!(matches!(
            out_of_range,
            Err(EngineError::TransferValueOutOfRange { index: 2, .. })
        ));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_failed_update_keeps_previous_state() {
        let backend = HeadlessBackend::new();
        let mut tf = TransferFunction::new(&backend, "tf", 4, &gray_ramp(4)).unwrap();

        assert!(tf.update(&backend, &gray_ramp(5)).is_err());
        let mut bad = gray_ramp(4);
        bad[3] = f32::INFINITY;
        assert!(tf.update(&backend, &bad).is_err());

        assert_eq!(tf.rgba(), gray_ramp(4).as_slice());
        assert_eq!(texture_floats(&backend, &tf), gray_ramp(4));
        assert_eq!(tf.version(), 0);
    }

    #[test]
    fn test_drop_releases_texture() {
        let backend = HeadlessBackend::new();
        let tf = TransferFunction::new(&backend, "tf", 8, &gray_ramp(8)).unwrap();
        assert_eq!(backend.live_textures(), 1);
        drop(tf);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_sample_interpolates() {
        let table = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        assert_eq!(sample_table(&table, 0.0), [0.0; 4]);
        assert_eq!(sample_table(&table, 1.0), [1.0; 4]);
        assert_eq!(sample_table(&table, 0.25), [0.25; 4]);
        assert_eq!(sample_table(&table, -3.0), [0.0; 4]);
        assert_eq!(sample_table(&table, 7.0), [1.0; 4]);
        assert_eq!(sample_table(&table, f32::NAN), [0.0; 4]);
        assert_eq!(sample_table(&[0.2, 0.4, 0.6, 0.8], 0.9), [0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn test_from_control_points() {
        let backend = HeadlessBackend::new();
        let tf = TransferFunction::from_control_points(
            &backend,
            "hot",
            2,
            &[ColorControlPoint {
                position: 0.0,
                rgb: [1.0, 0.5, 0.0],
            }],
            &[OpacityControlPoint {
                position: 0.0,
                alpha: 0.25,
            }],
        )
        .unwrap();
        assert_eq!(tf.rgba(), &[1.0, 0.5, 0.0, 0.25, 1.0, 0.5, 0.0, 0.25]);

        let err = TransferFunction::from_control_points(&backend, "empty", 2, &[], &[]);
        assert!(matches!(err, Err(EngineError::InvalidControlPoints { .. })));
    }

    #[test]
    fn test_table_binds_as_unfilterable_texture() {
        let backend = HeadlessBackend::new();
        let tf = TransferFunction::new(&backend, "gray", 2, &gray_ramp(2)).unwrap();
        assert!(!tf.texel_format().is_filterable());

        let entry = crate::gpu::WgpuBackend::texture_1d_layout_entry(
            3,
            tf.texel_format(),
            wgpu::ShaderStages::FRAGMENT,
        );
        assert_eq!(entry.binding, 3);
        assert_eq!(
            entry.ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D1,
                multisampled: false,
            }
        );
    }

    #[test]
    fn test_colorize_points() {
        let backend = HeadlessBackend::new();
        let table = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let tf = TransferFunction::new(&backend, "gray", 2, &table).unwrap();

        let mut points = vec![
            Point::new(Vec3::ZERO, 10.0),
            Point::new(Vec3::ONE, 20.0),
            Point::new(Vec3::X, 15.0),
        ];
        colorize_points(&mut points, &tf, (10.0, 20.0));
        assert_eq!(points[0].color.to_array(), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(points[1].color.to_array(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(points[2].color.to_array(), [0.5, 0.5, 0.5, 1.0]);
    }
}
