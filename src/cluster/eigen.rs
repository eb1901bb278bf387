//! Symmetric 3x3 eigen decomposition (cyclic Jacobi)
//!
//! Covariance matrices are small and symmetric, so a handful of Jacobi
//! sweeps in f64 converges to full f32 precision.

use glam::{DVec3, Mat3, Vec3};

const MAX_SWEEPS: usize = 32;

/// Eigenvalues and unit eigenvectors, sorted by descending eigenvalue
#[derive(Debug, Clone, Copy)]
pub struct SymmetricEigen3 {
    pub values: [f32; 3],
    pub vectors: [Vec3; 3],
}

/// Decompose a symmetric matrix. Only the upper triangle is read.
pub fn symmetric_eigen(matrix: &Mat3) -> SymmetricEigen3 {
    let m = matrix.as_dmat3();
    let mut a = [
        [m.x_axis.x, m.y_axis.x, m.z_axis.x],
        [m.y_axis.x, m.y_axis.y, m.z_axis.y],
        [m.z_axis.x, m.z_axis.y, m.z_axis.z],
    ];
    // columns of v are the eigenvectors
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..MAX_SWEEPS {
        let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off < 1e-30 {
            break;
        }
        for (p, q) in [(0usize, 1usize), (0, 2), (1, 2)] {
            if a[p][q].abs() < 1e-300 {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            for k in 0..3 {
                let akp = a[k][p];
                let akq = a[k][q];
                a[k][p] = c * akp - s * akq;
                a[k][q] = s * akp + c * akq;
            }
            for k in 0..3 {
                let apk = a[p][k];
                let aqk = a[q][k];
                a[p][k] = c * apk - s * aqk;
                a[q][k] = s * apk + c * aqk;
            }
            for row in v.iter_mut() {
                let vp = row[p];
                let vq = row[q];
                row[p] = c * vp - s * vq;
                row[q] = s * vp + c * vq;
            }
        }
    }

    let mut pairs: Vec<(f64, DVec3)> = (0..3)
        .map(|i| (a[i][i], DVec3::new(v[0][i], v[1][i], v[2][i])))
        .collect();
    pairs.sort_by(|x, y| y.0.total_cmp(&x.0));

    SymmetricEigen3 {
        values: [pairs[0].0 as f32, pairs[1].0 as f32, pairs[2].0 as f32],
        vectors: [
            pairs[0].1.normalize_or_zero().as_vec3(),
            pairs[1].1.normalize_or_zero().as_vec3(),
            pairs[2].1.normalize_or_zero().as_vec3(),
        ],
    }
}

/// Largest eigenvalue and its eigenvector
pub fn principal_eigen(matrix: &Mat3) -> (f32, Vec3) {
    let eigen = symmetric_eigen(matrix);
    (eigen.values[0], eigen.vectors[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DMat3;

    fn reconstruct(eigen: &SymmetricEigen3) -> DMat3 {
        let mut out = DMat3::ZERO;
        for i in 0..3 {
            let v = eigen.vectors[i].as_dvec3();
            let outer = DMat3::from_cols(v * v.x, v * v.y, v * v.z);
            out = out + outer * eigen.values[i] as f64;
        }
        out
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    #[test]
    fn test_diagonal_matrix() {
        let m = Mat3::from_diagonal(Vec3::new(1.0, 5.0, 3.0));
        let eigen = symmetric_eigen(&m);
        assert_close(eigen.values[0], 5.0);
        assert_close(eigen.values[1], 3.0);
        assert_close(eigen.values[2], 1.0);
        assert_close(eigen.vectors[0].dot(Vec3::Y).abs(), 1.0);
    }

    #[test]
    fn test_rotated_axis() {
        // variance 4 along (1,1,0)/sqrt2, 1 along (1,-1,0)/sqrt2, 0.5 along z
        let m = Mat3::from_cols(
            Vec3::new(2.5, 1.5, 0.0),
            Vec3::new(1.5, 2.5, 0.0),
            Vec3::new(0.0, 0.0, 0.5),
        );
        let (value, axis) = principal_eigen(&m);
        assert_close(value, 4.0);
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert_close(axis.dot(expected).abs(), 1.0);
    }

    #[test]
    fn test_reconstruction() {
        let m = Mat3::from_cols(
            Vec3::new(4.0, 1.0, -2.0),
            Vec3::new(1.0, 3.0, 0.5),
            Vec3::new(-2.0, 0.5, 6.0),
        );
        let eigen = symmetric_eigen(&m);
        let back = reconstruct(&eigen).as_mat3();
        for (a, b) in back.to_cols_array().iter().zip(m.to_cols_array().iter()) {
            assert_close(*a, *b);
        }
        assert!(eigen.values[0] >= eigen.values[1] && eigen.values[1] >= eigen.values[2]);
    }

    #[test]
    fn test_zero_matrix() {
        let (value, _) = principal_eigen(&Mat3::ZERO);
        assert_eq!(value, 0.0);
    }
}
