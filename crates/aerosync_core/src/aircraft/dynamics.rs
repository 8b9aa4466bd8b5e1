//! Flat-earth 6-DOF rigid-body equations of motion.

use super::Airframe;
use crate::math::{body_to_fixed, fixed_to_body, quat_mul};
use crate::state::RigidBodyState;

/// Below this airspeed aerodynamic angles are undefined and taken as zero.
const MIN_AIRSPEED: f64 = 1e-6;

/// Air-relative quantities derived from the body velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirData {
    /// True airspeed.
    pub airspeed: f64,
    /// Angle of attack, radians.
    pub alpha: f64,
    /// Sideslip angle, radians.
    pub beta: f64,
    /// Dynamic pressure.
    pub dyn_pressure: f64,
    /// Nondimensional roll rate `p b / 2V`.
    pub p_bar: f64,
    /// Nondimensional pitch rate `q c / 2V`.
    pub q_bar: f64,
    /// Nondimensional yaw rate `r b / 2V`.
    pub r_bar: f64,
}

impl AirData {
    /// Computes air data for `state` flying through still air.
    #[must_use]
    pub fn from_state(state: &RigidBodyState, airframe: &Airframe) -> Self {
        let airspeed = state.airspeed();
        if !(airspeed > MIN_AIRSPEED) {
            return Self {
                airspeed,
                alpha: 0.0,
                beta: 0.0,
                dyn_pressure: 0.0,
                p_bar: 0.0,
                q_bar: 0.0,
                r_bar: 0.0,
            };
        }
        let inv_2v = 0.5 / airspeed;
        Self {
            airspeed,
            alpha: state.w.atan2(state.u),
            beta: (state.v / airspeed).clamp(-1.0, 1.0).asin(),
            dyn_pressure: 0.5 * airframe.air_density * airspeed * airspeed,
            p_bar: state.p * airframe.span * inv_2v,
            q_bar: state.q * airframe.chord * inv_2v,
            r_bar: state.r * airframe.span * inv_2v,
        }
    }

    /// Rotates lift (up), drag (aft) and side force into body axes.
    #[must_use]
    pub fn wind_to_body(&self, lift: f64, drag: f64, side: f64) -> [f64; 3] {
        let (s_a, c_a) = self.alpha.sin_cos();
        [lift * s_a - drag * c_a, side, -lift * c_a - drag * s_a]
    }
}

/// Time-derivative of `state` under body-frame `forces` and `moments`.
///
/// Gravity is added here; `forces` carries aerodynamics and thrust only.
#[must_use]
pub fn rigid_body_rates(
    state: &RigidBodyState,
    forces: [f64; 3],
    moments: [f64; 3],
    airframe: &Airframe,
) -> RigidBodyState {
    let RigidBodyState { u, v, w, p, q, r, .. } = *state;
    let e = state.quaternion();
    let m = airframe.mass;
    let g_body = fixed_to_body([0.0, 0.0, airframe.gravity], e);

    let u_dot = forces[0] / m + g_body[0] + r * v - q * w;
    let v_dot = forces[1] / m + g_body[1] + p * w - r * u;
    let w_dot = forces[2] / m + g_body[2] + q * u - p * v;

    // Euler's equations with the xz product of inertia
    let Airframe { ixx, iyy, izz, ixz, .. } = *airframe;
    let roll = moments[0] - (izz - iyy) * q * r + ixz * p * q;
    let yaw = moments[2] - (iyy - ixx) * p * q - ixz * q * r;
    let det = ixx * izz - ixz * ixz;
    let p_dot = (izz * roll + ixz * yaw) / det;
    let q_dot = (moments[1] - (ixx - izz) * p * r - ixz * (p * p - r * r)) / iyy;
    let r_dot = (ixz * roll + ixx * yaw) / det;

    let [x_dot, y_dot, z_dot] = body_to_fixed([u, v, w], e);
    let e_dot = quat_mul(e, [0.0, p, q, r]).map(|c| 0.5 * c);

    let mut out = RigidBodyState {
        u: u_dot,
        v: v_dot,
        w: w_dot,
        p: p_dot,
        q: q_dot,
        r: r_dot,
        x: x_dot,
        y: y_dot,
        z: z_dot,
        ..RigidBodyState::ZERO
    };
    out.set_quaternion(e_dot);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_fall() {
        let airframe = Airframe::default();
        let state = RigidBodyState::at_rest();
        let d = rigid_body_rates(&state, [0.0; 3], [0.0; 3], &airframe);
        assert!((d.w - airframe.gravity).abs() < 1e-12);
        assert_eq!(d.u, 0.0);
        assert_eq!(d.z, 0.0);
        assert_eq!(d.quaternion(), [0.0; 4]);
    }

    #[test]
    fn test_position_rate_follows_heading() {
        let airframe = Airframe::default();
        let mut state = RigidBodyState { u: 10.0, ..RigidBodyState::at_rest() };
        state.set_quaternion(crate::math::euler_to_quat([0.0, 0.0, std::f64::consts::FRAC_PI_2]));
        let d = rigid_body_rates(&state, [0.0; 3], [0.0; 3], &airframe);
        assert!(d.x.abs() < 1e-9);
        assert!((d.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_pure_roll_moment() {
        let airframe = Airframe::default();
        let d = rigid_body_rates(&RigidBodyState::at_rest(), [0.0; 3], [100.0, 0.0, 0.0], &airframe);
        assert!((d.p - 100.0 / airframe.ixx).abs() < 1e-12);
        assert_eq!(d.r, 0.0);
    }

    #[test]
    fn test_air_data_at_rest() {
        let air = AirData::from_state(&RigidBodyState::at_rest(), &Airframe::default());
        assert_eq!(air.alpha, 0.0);
        assert_eq!(air.dyn_pressure, 0.0);
    }

    #[test]
    fn test_air_data_angles() {
        let state = RigidBodyState { u: 50.0, w: 5.0, ..RigidBodyState::at_rest() };
        let air = AirData::from_state(&state, &Airframe::default());
        assert!((air.alpha - (0.1f64).atan()).abs() < 1e-12);
        assert_eq!(air.beta, 0.0);
        let [fx, _, fz] = air.wind_to_body(1000.0, 0.0, 0.0);
        assert!(fx > 0.0 && fz < 0.0);
    }
}
