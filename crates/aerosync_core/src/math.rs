//! Quaternion and frame helpers.
//!
//! Quaternions are `[e0, e1, e2, e3]`, scalar first. The inertial frame is
//! north-east-down; body axes are forward-right-down.

/// Euclidean norm of a quaternion.
#[inline]
#[must_use]
pub fn quat_norm(e: [f64; 4]) -> f64 {
    (e[0] * e[0] + e[1] * e[1] + e[2] * e[2] + e[3] * e[3]).sqrt()
}

/// Hamilton product `a ⊗ b`.
#[must_use]
pub fn quat_mul(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [
        a[0] * b[0] - a[1] * b[1] - a[2] * b[2] - a[3] * b[3],
        a[0] * b[1] + a[1] * b[0] + a[2] * b[3] - a[3] * b[2],
        a[0] * b[2] - a[1] * b[3] + a[2] * b[0] + a[3] * b[1],
        a[0] * b[3] + a[1] * b[2] - a[2] * b[1] + a[3] * b[0],
    ]
}

/// Rotates a body-frame vector into the inertial frame.
#[must_use]
pub fn body_to_fixed(v: [f64; 3], e: [f64; 4]) -> [f64; 3] {
    let [e0, e1, e2, e3] = e;
    [
        (e1 * e1 + e0 * e0 - e2 * e2 - e3 * e3) * v[0]
            + 2.0 * (e1 * e2 - e3 * e0) * v[1]
            + 2.0 * (e1 * e3 + e2 * e0) * v[2],
        2.0 * (e1 * e2 + e3 * e0) * v[0]
            + (e2 * e2 + e0 * e0 - e1 * e1 - e3 * e3) * v[1]
            + 2.0 * (e2 * e3 - e1 * e0) * v[2],
        2.0 * (e1 * e3 - e2 * e0) * v[0]
            + 2.0 * (e2 * e3 + e1 * e0) * v[1]
            + (e3 * e3 + e0 * e0 - e1 * e1 - e2 * e2) * v[2],
    ]
}

/// Rotates an inertial-frame vector into the body frame.
#[must_use]
pub fn fixed_to_body(v: [f64; 3], e: [f64; 4]) -> [f64; 3] {
    body_to_fixed(v, [e[0], -e[1], -e[2], -e[3]])
}

/// Quaternion to Euler angles `[bank, elevation, heading]` in radians.
#[must_use]
pub fn quat_to_euler(e: [f64; 4]) -> [f64; 3] {
    let [e0, e1, e2, e3] = e;
    let sin_theta = (2.0 * (e0 * e2 - e1 * e3)).clamp(-1.0, 1.0);
    [
        (2.0 * (e0 * e1 + e2 * e3)).atan2(e0 * e0 + e3 * e3 - e1 * e1 - e2 * e2),
        sin_theta.asin(),
        (2.0 * (e0 * e3 + e1 * e2)).atan2(e0 * e0 + e1 * e1 - e2 * e2 - e3 * e3),
    ]
}

/// Euler angles `[bank, elevation, heading]` in radians to a unit quaternion.
#[must_use]
pub fn euler_to_quat(euler: [f64; 3]) -> [f64; 4] {
    let (s_phi, c_phi) = (euler[0] * 0.5).sin_cos();
    let (s_theta, c_theta) = (euler[1] * 0.5).sin_cos();
    let (s_psi, c_psi) = (euler[2] * 0.5).sin_cos();
    [
        c_phi * c_theta * c_psi + s_phi * s_theta * s_psi,
        s_phi * c_theta * c_psi - c_phi * s_theta * s_psi,
        c_phi * s_theta * c_psi + s_phi * c_theta * s_psi,
        c_phi * c_theta * s_psi - s_phi * s_theta * c_psi,
    ]
}
