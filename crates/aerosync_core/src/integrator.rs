//! # RK4 Integrator
//!
//! Classic fourth-order Runge-Kutta over the 13-scalar state:
//!
//! ```text
//! k0 = f(y,             t)
//! k1 = f(y + dt/2 * k0, t + dt/2)
//! k2 = f(y + dt/2 * k1, t + dt/2)
//! k3 = f(y + dt   * k2, t + dt)
//! y' = y + dt/6 * (k0 + 2 k1 + 2 k2 + k3)
//! ```
//!
//! The caller's state is never mutated; every stage is built from the
//! original `y`. A zero-length step is legal and only evaluates the
//! derivative (used to time one evaluation before the first real step).

use crate::aircraft::AircraftDerivativeProvider;
use crate::state::RigidBodyState;

/// Stateless RK4 stepper.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rk4;

impl Rk4 {
    /// Advances `state` by `dt` using derivative function `f(state, t)`.
    #[inline]
    pub fn step<F>(&self, state: &RigidBodyState, f: F, t: f64, dt: f64) -> RigidBodyState
    where
        F: FnMut(&RigidBodyState, f64) -> RigidBodyState,
    {
        rk4_step(state, f, t, dt)
    }

    /// One step against a provider followed by its mandatory normalization.
    #[inline]
    pub fn step_provider<A>(&self, aircraft: &A, state: &RigidBodyState, t: f64, dt: f64) -> RigidBodyState
    where
        A: AircraftDerivativeProvider + ?Sized,
    {
        let next = rk4_step(state, |s, time| aircraft.derivative(s, time), t, dt);
        aircraft.normalize(&next)
    }
}

/// Free-function form of [`Rk4::step`].
pub fn rk4_step<F>(y0: &RigidBodyState, mut f: F, t: f64, dt: f64) -> RigidBodyState
where
    F: FnMut(&RigidBodyState, f64) -> RigidBodyState,
{
    let half = 0.5 * dt;

    let k0 = f(y0, t);
    let k1 = f(&y0.add_scaled(&k0, half), t + half);
    let k2 = f(&y0.add_scaled(&k1, half), t + half);
    let k3 = f(&y0.add_scaled(&k2, dt), t + dt);

    let mut out = *y0;
    let sixth = dt / 6.0;
    let slots = out.as_array_mut().iter_mut().zip(
        k0.as_array()
            .iter()
            .zip(k1.as_array())
            .zip(k2.as_array().iter().zip(k3.as_array())),
    );
    for (y, ((a, b), (c, d))) in slots {
        *y += sixth * (a + 2.0 * b + 2.0 * c + d);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::quat_mul;

    #[test]
    fn test_constant_field_is_exact() {
        let y0 = RigidBodyState { x: 10.0, z: -500.0, ..RigidBodyState::at_rest() };
        let c = RigidBodyState::from_array(std::array::from_fn(|i| 0.25 * i as f64 - 1.0));
        let dt = 0.02;

        let y1 = rk4_step(&y0, |_, _| c, 0.0, dt);
        let expected = y0.add_scaled(&c, dt);
        for (a, b) in y1.as_array().iter().zip(expected.as_array()) {
            assert!((a - b).abs() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn test_zero_step_returns_input() {
        let y0 = RigidBodyState { u: 50.0, ..RigidBodyState::at_rest() };
        let mut calls = 0;
        let y1 = rk4_step(&y0, |s, _| { calls += 1; *s }, 3.0, 0.0);
        assert_eq!(y1, y0);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_time_arguments() {
        // du/dt = t integrates t^2/2 exactly (Simpson's rule).
        let y0 = RigidBodyState::ZERO;
        let y1 = rk4_step(&y0, |_, t| RigidBodyState { u: t, ..RigidBodyState::ZERO }, 1.0, 0.5);
        let exact = (1.5f64 * 1.5 - 1.0) / 2.0;
        assert!((y1.u - exact).abs() < 1e-14);
    }

    #[test]
    fn test_fourth_order_accuracy() {
        let y0 = RigidBodyState { u: 1.0, ..RigidBodyState::ZERO };
        let y1 = rk4_step(&y0, |s, _| RigidBodyState { u: s.u, ..RigidBodyState::ZERO }, 0.0, 0.1);
        assert!((y1.u - 0.1f64.exp()).abs() < 1e-7);
    }

    #[test]
    fn test_quaternion_stays_unit_after_normalization() {
        let rates = [0.0, 0.7, -1.3, 2.1];
        let f = |s: &RigidBodyState, _t: f64| {
            let de = quat_mul(s.quaternion(), rates);
            let mut d = RigidBodyState::ZERO;
            d.set_quaternion(de.map(|v| 0.5 * v));
            d
        };

        let mut y = RigidBodyState::at_rest();
        let mut t = 0.0;
        for _ in 0..10_000 {
            y = rk4_step(&y, f, t, 0.01).normalized();
            t += 0.01;
        }
        assert!((y.quaternion_norm() - 1.0).abs() < 1e-9);
    }
}
