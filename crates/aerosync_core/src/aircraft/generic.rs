//! Nonlinear aircraft model with stall.
//!
//! Lift blends from the linear lift curve to a flat-plate curve through a
//! sigmoid centred on the stall angle. Drag is parasite plus induced drag
//! from the wing aspect ratio.

use std::f64::consts::PI;

use super::dynamics::{rigid_body_rates, AirData};
use super::{
    trace_output, AircraftConfig, AircraftDerivativeProvider, Airframe, ControlSettings,
    GenericCoefficients, GraphicsAssets, GraphicsInfo,
};
use crate::error::{AircraftError, AircraftResult};
use crate::state::RigidBodyState;

/// Aircraft with a stalling lift curve and induced drag.
#[derive(Clone, Debug)]
pub struct GenericAeroModel {
    name: String,
    airframe: Airframe,
    coefficients: GenericCoefficients,
    controls: ControlSettings,
    initial: RigidBodyState,
    assets: GraphicsAssets,
    induced_factor: f64,
    stall_alpha: f64,
}

impl GenericAeroModel {
    /// Builds the model from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the Oswald factor or stall angle is not usable.
    pub fn new(config: &AircraftConfig, coefficients: GenericCoefficients) -> AircraftResult<Self> {
        if !(coefficients.oswald > 0.0) {
            return Err(AircraftError::InvalidParameter {
                name: "oswald",
                reason: format!("must be positive, got {}", coefficients.oswald),
            });
        }
        if !(coefficients.stall_alpha > 0.0 && coefficients.stall_alpha < 90.0) {
            return Err(AircraftError::InvalidParameter {
                name: "stall_alpha",
                reason: format!("must be within (0, 90) degrees, got {}", coefficients.stall_alpha),
            });
        }
        let induced_factor = 1.0 / (PI * coefficients.oswald * config.airframe.aspect_ratio());
        let stall_alpha = coefficients.stall_alpha.to_radians();
        Ok(Self {
            name: config.name.clone(),
            airframe: config.airframe,
            coefficients,
            controls: config.controls,
            initial: config.initial.to_state(),
            assets: config.graphics.clone(),
            induced_factor,
            stall_alpha,
        })
    }

    /// Lift coefficient at angle of attack `alpha` with elevator `de`.
    #[must_use]
    pub fn lift_coefficient(&self, alpha: f64, de: f64) -> f64 {
        let c = &self.coefficients;
        let linear = c.CL0 + c.CL_a * alpha + c.CL_de * de;
        let flat_plate = 2.0 * alpha.signum() * alpha.sin().powi(2) * alpha.cos();
        let blend_lo = (-c.stall_blend * (alpha - self.stall_alpha)).exp();
        let blend_hi = (c.stall_blend * (alpha + self.stall_alpha)).exp();
        let sigma = (1.0 + blend_lo + blend_hi) / ((1.0 + blend_lo) * (1.0 + blend_hi));
        (1.0 - sigma) * linear + sigma * flat_plate
    }

    #[allow(non_snake_case)]
    fn forces_and_moments(&self, state: &RigidBodyState) -> ([f64; 3], [f64; 3]) {
        let c = &self.coefficients;
        let air = AirData::from_state(state, &self.airframe);
        let ControlSettings { throttle, elevator: de, aileron: da, rudder: dr, .. } = self.controls;

        let CL = self.lift_coefficient(air.alpha, de);
        let CD = c.CD0 + self.induced_factor * CL * CL;
        let CS = c.CS_b * air.beta;
        let Cl = c.Cl_b * air.beta + c.Cl_pbar * air.p_bar + c.Cl_da * da;
        let Cm = c.Cm0 + c.Cm_a * air.alpha + c.Cm_qbar * air.q_bar + c.Cm_de * de;
        let Cn = c.Cn_b * air.beta + c.Cn_rbar * air.r_bar + c.Cn_dr * dr;

        let qS = air.dyn_pressure * self.airframe.wing_area;
        let mut forces = air.wind_to_body(qS * CL, qS * CD, qS * CS);
        forces[0] += throttle * self.airframe.max_thrust;

        let moments = [
            qS * self.airframe.span * Cl,
            qS * self.airframe.chord * Cm,
            qS * self.airframe.span * Cn,
        ];
        (forces, moments)
    }
}

impl AircraftDerivativeProvider for GenericAeroModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn initial_state(&self) -> RigidBodyState {
        self.initial
    }

    fn derivative(&self, state: &RigidBodyState, _t: f64) -> RigidBodyState {
        let (forces, moments) = self.forces_and_moments(state);
        rigid_body_rates(state, forces, moments, &self.airframe)
    }

    fn graphics_info(&self) -> GraphicsInfo {
        GraphicsInfo {
            name: self.name.clone(),
            obj_file: self.assets.obj_file.clone(),
            v_shader_file: self.assets.v_shader_file.clone(),
            f_shader_file: self.assets.f_shader_file.clone(),
            texture_file: self.assets.texture_file.clone(),
            l_ref_lat: self.airframe.span,
            l_ref_lon: self.airframe.chord,
            position: self.initial.position(),
            orientation: self.initial.quaternion(),
        }
    }

    fn control_settings(&self) -> ControlSettings {
        self.controls
    }

    fn record_output(&mut self, state: &RigidBodyState, t: f64) {
        trace_output(&self.name, state, t);
    }
}
