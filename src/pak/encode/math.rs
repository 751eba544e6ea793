#![forbid(unsafe_code)]

//! Bind-pose decomposition for skeleton bones.

/// Row-major 4x4 affine matrix, translation in the last column.
pub type Mat4 = [[f32; 4]; 4];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Floats per bone transform: scale xyz, rotation xyzw, translation xyz.
pub const TRANSFORM_FLOATS: usize = 10;

pub fn mat4_from_row_major(v: &[f32]) -> Option<Mat4> {
    if v.len() != 16 {
        return None;
    }
    let mut m = IDENTITY;
    for (i, row) in m.iter_mut().enumerate() {
        row.copy_from_slice(&v[i * 4..i * 4 + 4]);
    }
    Some(m)
}

/// `a * b`: applies `b` first, then `a`.
pub fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut m = [[0f32; 4]; 4];
    for (row, out) in m.iter_mut().enumerate() {
        for (col, v) in out.iter_mut().enumerate() {
            *v = (0..4).map(|k| a[row][k] * b[k][col]).sum();
        }
    }
    m
}

/// Quaternion `[x, y, z, w]` of a pure rotation matrix.
pub fn quat_from_rotation(r: &[[f32; 3]; 3]) -> [f32; 4] {
    let trace = r[0][0] + r[1][1] + r[2][2];
    let q = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        [
            (r[2][1] - r[1][2]) / s,
            (r[0][2] - r[2][0]) / s,
            (r[1][0] - r[0][1]) / s,
            0.25 * s,
        ]
    } else if r[0][0] > r[1][1] && r[0][0] > r[2][2] {
        let s = (1.0 + r[0][0] - r[1][1] - r[2][2]).sqrt() * 2.0;
        [
            0.25 * s,
            (r[0][1] + r[1][0]) / s,
            (r[0][2] + r[2][0]) / s,
            (r[2][1] - r[1][2]) / s,
        ]
    } else if r[1][1] > r[2][2] {
        let s = (1.0 + r[1][1] - r[0][0] - r[2][2]).sqrt() * 2.0;
        [
            (r[0][1] + r[1][0]) / s,
            0.25 * s,
            (r[1][2] + r[2][1]) / s,
            (r[0][2] - r[2][0]) / s,
        ]
    } else {
        let s = (1.0 + r[2][2] - r[0][0] - r[1][1]).sqrt() * 2.0;
        [
            (r[0][2] + r[2][0]) / s,
            (r[1][2] + r[2][1]) / s,
            0.25 * s,
            (r[1][0] - r[0][1]) / s,
        ]
    };

    let len = q.iter().map(|c| c * c).sum::<f32>().sqrt();
    if len > 0.0 {
        q.map(|c| c / len)
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

/// Splits `m` into scale, rotation and translation.
///
/// Scale is the length of each basis column; it is divided out of the 3x3
/// block before the rotation is converted. Shear and mirroring are not
/// represented.
pub fn decompose(m: &Mat4) -> [f32; TRANSFORM_FLOATS] {
    let mut scale = [0f32; 3];
    for (col, s) in scale.iter_mut().enumerate() {
        *s = (0..3).map(|row| m[row][col] * m[row][col]).sum::<f32>().sqrt();
    }

    let mut rot = [[0f32; 3]; 3];
    for (row, r) in rot.iter_mut().enumerate() {
        for (col, v) in r.iter_mut().enumerate() {
            let s = if scale[col] > 0.0 { scale[col] } else { 1.0 };
            *v = m[row][col] / s;
        }
    }
    let q = quat_from_rotation(&rot);

    [
        scale[0], scale[1], scale[2], q[0], q[1], q[2], q[3], m[0][3], m[1][3], m[2][3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn identity_decomposes_to_unit_transform() {
        let t = decompose(&IDENTITY);
        assert!(close(&t, &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn scale_is_stripped_before_rotation() {
        // 90 degrees about Z, scale (2, 3, 4), translation (5, 6, 7)
        let m = mat4_from_row_major(&[
            0.0, -3.0, 0.0, 5.0, //
            2.0, 0.0, 0.0, 6.0, //
            0.0, 0.0, 4.0, 7.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
        .unwrap();
        let h = std::f32::consts::FRAC_1_SQRT_2;
        let t = decompose(&m);
        assert!(close(&t, &[2.0, 3.0, 4.0, 0.0, 0.0, h, h, 5.0, 6.0, 7.0]), "{t:?}");
    }

    #[test]
    fn half_turn_uses_diagonal_branch() {
        // 180 degrees about X: trace is -1
        let r = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];
        let q = quat_from_rotation(&r);
        assert!(close(&q, &[1.0, 0.0, 0.0, 0.0]), "{q:?}");
    }

    #[test]
    fn product_applies_right_operand_first() {
        let scale = mat4_from_row_major(&[
            2.0, 0.0, 0.0, 0.0, //
            0.0, 2.0, 0.0, 0.0, //
            0.0, 0.0, 2.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
        .unwrap();
        let shift = mat4_from_row_major(&[
            1.0, 0.0, 0.0, 10.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
        .unwrap();
        assert_eq!(mul(&shift, &scale)[0][3], 10.0);
        assert_eq!(mul(&scale, &shift)[0][3], 20.0);
        assert_eq!(mul(&IDENTITY, &scale), scale);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(mat4_from_row_major(&[0.0; 12]).is_none());
    }
}
