//! # Rigid-Body State Vector
//!
//! The 13 ordered scalars that describe one aircraft at one instant:
//!
//! ```text
//! index:  0  1  2 | 3  4  5 | 6  7  8 | 9   10  11  12
//!         u  v  w | p  q  r | x  y  z | e0  e1  e2  e3
//!         body    | body    | inertial| unit quaternion
//!         velocity| rates   | position| (scalar first)
//! ```
//!
//! The struct is `#[repr(C)]` and `Pod`, so it can be viewed as a flat
//! `[f64; 13]` for componentwise arithmetic and copied into the shared
//! channel without any per-field marshalling.

use std::ops::{Add, Mul};

use bytemuck::{Pod, Zeroable};

/// Number of scalars in a state vector.
pub const STATE_LEN: usize = 13;

/// Number of scalars in a published frame (state + dt + t + wall time).
pub const FRAME_LEN: usize = 16;

/// Rigid-body state of the aircraft.
///
/// The same type is used for the state derivative: the derivative provider
/// returns the 13 time-derivatives in the same order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RigidBodyState {
    /// Body-frame velocity along x.
    pub u: f64,
    /// Body-frame velocity along y.
    pub v: f64,
    /// Body-frame velocity along z.
    pub w: f64,
    /// Body-frame roll rate.
    pub p: f64,
    /// Body-frame pitch rate.
    pub q: f64,
    /// Body-frame yaw rate.
    pub r: f64,
    /// Inertial position north.
    pub x: f64,
    /// Inertial position east.
    pub y: f64,
    /// Inertial position down.
    pub z: f64,
    /// Quaternion scalar part.
    pub e0: f64,
    /// Quaternion x part.
    pub e1: f64,
    /// Quaternion y part.
    pub e2: f64,
    /// Quaternion z part.
    pub e3: f64,
}

impl RigidBodyState {
    /// All-zero state. Also the "no physics output yet" sentinel.
    pub const ZERO: Self = Self {
        u: 0.0,
        v: 0.0,
        w: 0.0,
        p: 0.0,
        q: 0.0,
        r: 0.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        e0: 0.0,
        e1: 0.0,
        e2: 0.0,
        e3: 0.0,
    };

    /// State at rest at the origin with identity orientation.
    #[must_use]
    pub const fn at_rest() -> Self {
        Self { e0: 1.0, ..Self::ZERO }
    }

    /// Builds a state from its flat representation.
    #[inline]
    #[must_use]
    pub fn from_array(values: [f64; STATE_LEN]) -> Self {
        bytemuck::cast(values)
    }

    /// Flat view of the 13 scalars.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> &[f64; STATE_LEN] {
        bytemuck::cast_ref(self)
    }

    /// Mutable flat view of the 13 scalars.
    #[inline]
    pub fn as_array_mut(&mut self) -> &mut [f64; STATE_LEN] {
        bytemuck::cast_mut(self)
    }

    /// Returns `self + k * other` without touching either operand.
    #[inline]
    #[must_use]
    pub fn add_scaled(&self, other: &Self, k: f64) -> Self {
        let mut out = *self;
        for (o, d) in out.as_array_mut().iter_mut().zip(other.as_array()) {
            *o += k * d;
        }
        out
    }

    /// Returns `k * self`.
    #[inline]
    #[must_use]
    pub fn scale(&self, k: f64) -> Self {
        let mut out = *self;
        for o in out.as_array_mut() {
            *o *= k;
        }
        out
    }

    /// Body velocity `[u, v, w]`.
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> [f64; 3] {
        [self.u, self.v, self.w]
    }

    /// Body angular rate `[p, q, r]`.
    #[inline]
    #[must_use]
    pub fn angular_rate(&self) -> [f64; 3] {
        [self.p, self.q, self.r]
    }

    /// Inertial position `[x, y, z]`.
    #[inline]
    #[must_use]
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Orientation quaternion `[e0, e1, e2, e3]`.
    #[inline]
    #[must_use]
    pub fn quaternion(&self) -> [f64; 4] {
        [self.e0, self.e1, self.e2, self.e3]
    }

    /// Sets the orientation quaternion.
    #[inline]
    pub fn set_quaternion(&mut self, e: [f64; 4]) {
        [self.e0, self.e1, self.e2, self.e3] = e;
    }

    /// Euclidean norm of the quaternion part.
    #[inline]
    #[must_use]
    pub fn quaternion_norm(&self) -> f64 {
        crate::math::quat_norm(self.quaternion())
    }

    /// Copy with the quaternion renormalized to unit length.
    ///
    /// A zero or non-finite quaternion is returned unchanged; there is no
    /// meaningful direction to recover.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let norm = self.quaternion_norm();
        if norm == 0.0 || !norm.is_finite() {
            return *self;
        }
        let mut out = *self;
        out.set_quaternion(self.quaternion().map(|e| e / norm));
        out
    }

    /// True when every scalar is zero (the channel sentinel).
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_array().iter().all(|v| *v == 0.0)
    }

    /// True when every scalar is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }

    /// Magnitude of the body velocity.
    #[inline]
    #[must_use]
    pub fn airspeed(&self) -> f64 {
        (self.u * self.u + self.v * self.v + self.w * self.w).sqrt()
    }
}

impl Add for RigidBodyState {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.add_scaled(&rhs, 1.0)
    }
}

impl Mul<f64> for RigidBodyState {
    type Output = Self;

    #[inline]
    fn mul(self, k: f64) -> Self {
        self.scale(k)
    }
}

/// One published physics step: the state plus its timing.
///
/// Exactly [`FRAME_LEN`] scalars, the unit that crosses the shared channel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StateFrame {
    /// Aircraft state after the step.
    pub state: RigidBodyState,
    /// Physics step size used for this step (0 while paused).
    pub dt_physics: f64,
    /// Simulation time after the step.
    pub t_physics: f64,
    /// Wall-clock publish time, seconds since the Unix epoch.
    pub wall_time: f64,
}

impl StateFrame {
    /// Builds a frame from its flat representation.
    #[inline]
    #[must_use]
    pub fn from_array(values: [f64; FRAME_LEN]) -> Self {
        bytemuck::cast(values)
    }

    /// Flat view of the 16 scalars.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> &[f64; FRAME_LEN] {
        bytemuck::cast_ref(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<RigidBodyState>(), STATE_LEN * 8);
        assert_eq!(std::mem::size_of::<StateFrame>(), FRAME_LEN * 8);
    }

    #[test]
    fn test_array_order() {
        let values: [f64; STATE_LEN] = std::array::from_fn(|i| i as f64);
        let state = RigidBodyState::from_array(values);
        assert_eq!(state.u, 0.0);
        assert_eq!(state.r, 5.0);
        assert_eq!(state.z, 8.0);
        assert_eq!(state.e3, 12.0);
        assert_eq!(state.as_array(), &values);
    }

    #[test]
    fn test_add_scaled_leaves_operands() {
        let a = RigidBodyState::at_rest();
        let b = RigidBodyState { u: 2.0, x: 4.0, ..RigidBodyState::ZERO };
        let c = a.add_scaled(&b, 0.5);
        assert_eq!(c.u, 1.0);
        assert_eq!(c.x, 2.0);
        assert_eq!(c.e0, 1.0);
        assert_eq!(a, RigidBodyState::at_rest());
        assert_eq!((a + b * 2.0).x, 8.0);
    }

    #[test]
    fn test_normalize_quaternion() {
        let mut s = RigidBodyState::at_rest();
        s.set_quaternion([2.0, 0.0, 2.0, 0.0]);
        let n = s.normalized();
        assert!((n.quaternion_norm() - 1.0).abs() < 1e-12);
        assert!((n.e0 - n.e2).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_is_noop() {
        let n = RigidBodyState::ZERO.normalized();
        assert!(n.is_zero());
    }

    #[test]
    fn test_sentinel_and_finiteness() {
        assert!(RigidBodyState::ZERO.is_zero());
        assert!(!RigidBodyState::at_rest().is_zero());
        let bad = RigidBodyState { u: f64::NAN, ..RigidBodyState::at_rest() };
        assert!(!bad.is_finite());
        assert!(bad.airspeed().is_nan());
    }
}
