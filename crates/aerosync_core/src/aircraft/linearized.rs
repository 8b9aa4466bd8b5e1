//! Stability-derivative aircraft model.
//!
//! Force and moment coefficients are linear in angle of attack, sideslip,
//! nondimensional body rates and control deflections. Drag follows a
//! quadratic polar in the lift coefficient.

use super::dynamics::{rigid_body_rates, AirData};
use super::{
    trace_output, AircraftConfig, AircraftDerivativeProvider, Airframe, ControlSettings,
    GraphicsAssets, GraphicsInfo, LinearCoefficients,
};
use crate::state::RigidBodyState;

/// Aircraft driven by linear aerodynamic coefficients.
#[derive(Clone, Debug)]
pub struct LinearizedModel {
    name: String,
    airframe: Airframe,
    coefficients: LinearCoefficients,
    controls: ControlSettings,
    initial: RigidBodyState,
    assets: GraphicsAssets,
}

impl LinearizedModel {
    /// Builds the model from a validated configuration.
    #[must_use]
    pub fn new(config: &AircraftConfig, coefficients: LinearCoefficients) -> Self {
        Self {
            name: config.name.clone(),
            airframe: config.airframe,
            coefficients,
            controls: config.controls,
            initial: config.initial.to_state(),
            assets: config.graphics.clone(),
        }
    }

    /// Body-frame aerodynamic plus thrust forces and moments.
    #[allow(non_snake_case)]
    fn forces_and_moments(&self, state: &RigidBodyState) -> ([f64; 3], [f64; 3]) {
        let c = &self.coefficients;
        let air = AirData::from_state(state, &self.airframe);
        let ControlSettings { throttle, elevator: de, aileron: da, rudder: dr, .. } = self.controls;

        let CL = c.CL0 + c.CL_a * air.alpha + c.CL_qbar * air.q_bar + c.CL_de * de;
        let CD = c.CD0 + c.CD1 * CL + c.CD2 * CL * CL;
        let CS = c.CS_b * air.beta + c.CS_pbar * air.p_bar + c.CS_rbar * air.r_bar
            + c.CS_da * da
            + c.CS_dr * dr;
        let Cl = c.Cl_b * air.beta + c.Cl_pbar * air.p_bar + c.Cl_rbar * air.r_bar
            + c.Cl_da * da
            + c.Cl_dr * dr;
        let Cm = c.Cm0 + c.Cm_a * air.alpha + c.Cm_qbar * air.q_bar + c.Cm_de * de;
        let Cn = c.Cn_b * air.beta + c.Cn_pbar * air.p_bar + c.Cn_rbar * air.r_bar
            + c.Cn_da * da
            + c.Cn_dr * dr;

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

impl AircraftDerivativeProvider for LinearizedModel {
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
