//! Piecewise-linear control points
//!
//! Color and opacity are edited independently, each as a set of
//! (position, value) points over the normalized scalar range. Between points
//! values are interpolated linearly; outside the first/last point they hold.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorControlPoint {
    pub position: f32,
    pub rgb: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityControlPoint {
    pub position: f32,
    pub alpha: f32,
}

/// Sample both control point sets into an RGBA table of `sample_count`
/// entries. Errors describe the first offending point.
pub fn build_rgba_table(
    sample_count: usize,
    colors: &[ColorControlPoint],
    opacities: &[OpacityControlPoint],
) -> Result<Vec<f32>, String> {
    if colors.is_empty() {
        return Err("no color control points".to_string());
    }
    if opacities.is_empty() {
        return Err("no opacity control points".to_string());
    }

    let mut color_keys: Vec<(f32, [f32; 3])> = Vec::with_capacity(colors.len());
    for (i, point) in colors.iter().enumerate() {
        check_unit("color position", i, point.position)?;
        for &channel in &point.rgb {
            check_unit("color channel", i, channel)?;
        }
        color_keys.push((point.position, point.rgb));
    }

    let mut alpha_keys: Vec<(f32, [f32; 1])> = Vec::with_capacity(opacities.len());
    for (i, point) in opacities.iter().enumerate() {
        check_unit("opacity position", i, point.position)?;
        check_unit("opacity", i, point.alpha)?;
        alpha_keys.push((point.position, [point.alpha]));
    }

    color_keys.sort_by(|a, b| a.0.total_cmp(&b.0));
    alpha_keys.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut table = Vec::with_capacity(sample_count * 4);
    for i in 0..sample_count {
        let t = if sample_count > 1 {
            i as f32 / (sample_count - 1) as f32
        } else {
            0.0
        };
        let rgb = interpolate(&color_keys, t);
        let [alpha] = interpolate(&alpha_keys, t);
        table.extend_from_slice(&[rgb[0], rgb[1], rgb[2], alpha]);
    }
    Ok(table)
}

fn check_unit(what: &str, index: usize, value: f32) -> Result<(), String> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} {} at point {} is outside [0, 1]", what, value, index))
    }
}

/// `keys` is sorted by position and non-empty
fn interpolate<const N: usize>(keys: &[(f32, [f32; N])], t: f32) -> [f32; N] {
    let first = keys[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in keys.windows(2) {
        let (p0, v0) = pair[0];
        let (p1, v1) = pair[1];
        if t <= p1 {
            let span = p1 - p0;
            if span <= f32::EPSILON {
                return v1;
            }
            let f = (t - p0) / span;
            let mut out = [0.0; N];
            for c in 0..N {
                out[c] = v0[c] + (v1[c] - v0[c]) * f;
            }
            return out;
        }
    }
    keys[keys.len() - 1].1
}
