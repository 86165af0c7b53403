// src/colour/math.rs

//! Small fixed-size linear algebra and colour space conversions.

use crate::colour::constants::{
    ACES_CHROMATICITIES, ACES_WHITE_XYZ, CAT02, D65_WHITE_XY, SRGB_TO_XYZ,
};
use crate::types::Matrix3;

pub fn mat_mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

pub fn mat_vec(m: &Matrix3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

pub fn determinant(m: &Matrix3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse of a 3x3 matrix, `None` when singular.
pub fn invert(m: &Matrix3) -> Option<Matrix3> {
    let det = determinant(m);
    if det.abs() < 1e-300 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

pub fn diag(v: &[f64; 3]) -> Matrix3 {
    [[v[0], 0.0, 0.0], [0.0, v[1], 0.0], [0.0, 0.0, v[2]]]
}

pub fn scale(m: &Matrix3, factor: f64) -> Matrix3 {
    let mut out = *m;
    for row in out.iter_mut() {
        for v in row.iter_mut() {
            *v *= factor;
        }
    }
    out
}

pub fn sum(m: &Matrix3) -> f64 {
    m.iter().flatten().sum()
}

/// Row-major 9-element slice into a matrix.
pub fn from_flat(v: &[f64; 9]) -> Matrix3 {
    [[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]]
}

pub fn to_flat(m: &Matrix3) -> [f64; 9] {
    [
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    ]
}

/// `xy` chromaticity to an unnormalised XYZ triplet `[x, y, 1 - x - y]`.
pub fn xy_to_xyz(xy: &[f64; 2]) -> [f64; 3] {
    [xy[0], xy[1], 1.0 - xy[0] - xy[1]]
}

/// XYZ to CIE 1960 UCS `uv`.
pub fn xyz_to_uv(xyz: &[f64; 3]) -> [f64; 2] {
    let denom = xyz[0] + 15.0 * xyz[1] + 3.0 * xyz[2];
    [4.0 * xyz[0] / denom, 6.0 * xyz[1] / denom]
}

/// CIE 1960 UCS `uv` to an unnormalised XYZ triplet.
pub fn uv_to_xyz(uv: &[f64; 2]) -> [f64; 3] {
    let denom = 2.0 * uv[0] - 8.0 * uv[1] + 4.0;
    xy_to_xyz(&[3.0 * uv[0] / denom, 2.0 * uv[1] / denom])
}

/// Normalised primary matrix (RGB to XYZ) from R, G, B, W chromaticities.
pub fn rgb_to_xyz_matrix(chromaticities: &[[f64; 2]; 4]) -> Matrix3 {
    let r = xy_to_xyz(&chromaticities[0]);
    let g = xy_to_xyz(&chromaticities[1]);
    let b = xy_to_xyz(&chromaticities[2]);
    let mut w = xy_to_xyz(&chromaticities[3]);

    let primaries = [[r[0], g[0], b[0]], [r[1], g[1], b[1]], [r[2], g[2], b[2]]];

    let wy = w[1];
    for v in w.iter_mut() {
        *v /= wy;
    }

    let gains = match invert(&primaries) {
        Some(inv) => mat_vec(&inv, &w),
        None => [1.0, 1.0, 1.0],
    };
    mat_mul(&primaries, &diag(&gains))
}

/// Von Kries style adaptation in CAT02 cone space from `src_white` to
/// `dst_white` (both XYZ).
pub fn chromatic_adaptation(src_white: &[f64; 3], dst_white: &[f64; 3]) -> Matrix3 {
    let src_cone = mat_vec(&CAT02, src_white);
    let dst_cone = mat_vec(&CAT02, dst_white);
    let gains = [
        dst_cone[0] / src_cone[0],
        dst_cone[1] / src_cone[1],
        dst_cone[2] / src_cone[2],
    ];
    let inv = invert(&CAT02).unwrap_or(crate::types::IDENTITY3);
    mat_mul(&inv, &mat_mul(&diag(&gains), &CAT02))
}

/// ACES AP0 RGB to XYZ.
pub fn aces_to_xyz() -> Matrix3 {
    rgb_to_xyz_matrix(&ACES_CHROMATICITIES)
}

/// XYZ to ACES AP0 RGB.
pub fn xyz_to_aces() -> Matrix3 {
    invert(&aces_to_xyz()).unwrap_or(crate::types::IDENTITY3)
}

/// D65 white point as XYZ with Y = 1.
pub fn d65_white_xyz() -> [f64; 3] {
    let xyz = xy_to_xyz(&D65_WHITE_XY);
    [xyz[0] / xyz[1], 1.0, xyz[2] / xyz[1]]
}

/// Chromatic adaptation from D65 to the ACES white point.
pub fn cat_d65_to_aces() -> Matrix3 {
    chromatic_adaptation(&d65_white_xyz(), &ACES_WHITE_XYZ)
}

/// XYZ relative to D65 to ACES AP0 RGB; D65 white maps to RGB (1, 1, 1).
pub fn xyz_d65_to_aces() -> Matrix3 {
    mat_mul(&xyz_to_aces(), &cat_d65_to_aces())
}

const LAB_EPSILON: f64 = 216.0 / 24389.0;
const LAB_KAPPA: f64 = 24389.0 / 27.0;

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        (LAB_KAPPA * t + 16.0) / 116.0
    }
}

/// XYZ to CIE L*a*b* relative to the ACES white point.
pub fn xyz_to_lab(xyz: &[f64; 3]) -> [f64; 3] {
    let fx = lab_f(xyz[0] / ACES_WHITE_XYZ[0]);
    let fy = lab_f(xyz[1] / ACES_WHITE_XYZ[1]);
    let fz = lab_f(xyz[2] / ACES_WHITE_XYZ[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Camera to XYZ (D65) matrix from an XYZ to camera matrix, normalised the
/// way raw developers do: each row of `xyz_to_cam * sRGB_to_XYZ` is scaled to
/// sum to one so that white-balanced camera white maps to D65.
///
/// Also returns the daylight multipliers implied by the normalisation.
pub fn camera_to_xyz_from_colour_matrix(xyz_to_cam: &Matrix3) -> Option<(Matrix3, [f64; 3])> {
    let mut cam_rgb = mat_mul(xyz_to_cam, &SRGB_TO_XYZ);
    let mut pre_mul = [1.0; 3];
    for (i, row) in cam_rgb.iter_mut().enumerate() {
        let total: f64 = row.iter().sum();
        if total.abs() < 1e-12 {
            return None;
        }
        for v in row.iter_mut() {
            *v /= total;
        }
        pre_mul[i] = 1.0 / total;
    }
    let rgb_cam = invert(&cam_rgb)?;
    Some((mat_mul(&SRGB_TO_XYZ, &rgb_cam), pre_mul))
}
