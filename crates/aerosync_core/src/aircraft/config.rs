//! Aircraft parameters, deserialized from the `[aircraft]` table.
//!
//! ```toml
//! [aircraft]
//! name = "trainer"
//!
//! [aircraft.airframe]
//! mass = 1043.0
//!
//! [aircraft.aero]
//! type = "linearized_coefficients"   # or "generic_aero"
//! CL_a = 4.44
//! ```

use serde::{Deserialize, Serialize};

use super::ControlSettings;
use crate::error::{AircraftError, AircraftResult};
use crate::math::euler_to_quat;
use crate::state::RigidBodyState;

/// Full aircraft description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AircraftConfig {
    /// Display name.
    pub name: String,
    /// Mass, inertia and geometry.
    #[serde(default)]
    pub airframe: Airframe,
    /// Initial flight condition.
    #[serde(default)]
    pub initial: InitialCondition,
    /// Fixed control-surface settings.
    #[serde(default)]
    pub controls: ControlSettings,
    /// Render asset paths.
    #[serde(default)]
    pub graphics: GraphicsAssets,
    /// Aerodynamic model; its `type` selects the variant.
    pub aero: AeroModelConfig,
}

/// Aerodynamic model discriminator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AeroModelConfig {
    /// Stability-derivative coefficients.
    LinearizedCoefficients(LinearCoefficients),
    /// Nonlinear lift curve with stall.
    GenericAero(GenericCoefficients),
}

/// Mass properties, reference geometry and environment (SI units).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Airframe {
    /// Mass, kg.
    pub mass: f64,
    /// Roll inertia, kg m^2.
    pub ixx: f64,
    /// Pitch inertia, kg m^2.
    pub iyy: f64,
    /// Yaw inertia, kg m^2.
    pub izz: f64,
    /// Roll-yaw product of inertia, kg m^2.
    pub ixz: f64,
    /// Wing reference area, m^2.
    pub wing_area: f64,
    /// Wing span, m.
    pub span: f64,
    /// Mean aerodynamic chord, m.
    pub chord: f64,
    /// Static thrust at full throttle, N.
    pub max_thrust: f64,
    /// Air density, kg/m^3.
    pub air_density: f64,
    /// Gravitational acceleration, m/s^2.
    pub gravity: f64,
}

impl Default for Airframe {
    fn default() -> Self {
        // Light single-engine trainer
        Self {
            mass: 1043.0,
            ixx: 1285.0,
            iyy: 1825.0,
            izz: 2667.0,
            ixz: 0.0,
            wing_area: 16.2,
            span: 10.9,
            chord: 1.49,
            max_thrust: 2200.0,
            air_density: 1.225,
            gravity: 9.806_65,
        }
    }
}

impl Airframe {
    /// Checks that the parameters describe a physical body.
    ///
    /// # Errors
    ///
    /// Returns [`AircraftError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> AircraftResult<()> {
        let positive = [
            ("mass", self.mass),
            ("ixx", self.ixx),
            ("iyy", self.iyy),
            ("izz", self.izz),
            ("wing_area", self.wing_area),
            ("span", self.span),
            ("chord", self.chord),
            ("air_density", self.air_density),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(AircraftError::InvalidParameter {
                    name,
                    reason: format!("must be positive and finite, got {value}"),
                });
            }
        }
        if self.ixx * self.izz - self.ixz * self.ixz <= 0.0 {
            return Err(AircraftError::InvalidParameter {
                name: "ixz",
                reason: "inertia tensor is not positive definite".to_string(),
            });
        }
        Ok(())
    }

    /// Wing aspect ratio.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.span * self.span / self.wing_area
    }
}

/// Initial flight condition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialCondition {
    /// True airspeed along the body x axis, m/s.
    pub airspeed: f64,
    /// Altitude above ground, m.
    pub altitude: f64,
    /// North position, m.
    pub north: f64,
    /// East position, m.
    pub east: f64,
    /// Bank angle, degrees.
    pub bank: f64,
    /// Elevation (pitch) angle, degrees.
    pub elevation: f64,
    /// Heading, degrees.
    pub heading: f64,
}

impl Default for InitialCondition {
    fn default() -> Self {
        Self {
            airspeed: 50.0,
            altitude: 1000.0,
            north: 0.0,
            east: 0.0,
            bank: 0.0,
            elevation: 0.0,
            heading: 0.0,
        }
    }
}

impl InitialCondition {
    /// State vector for this condition.
    #[must_use]
    pub fn to_state(&self) -> RigidBodyState {
        let mut state = RigidBodyState {
            u: self.airspeed,
            x: self.north,
            y: self.east,
            z: -self.altitude,
            ..RigidBodyState::ZERO
        };
        state.set_quaternion(euler_to_quat([
            self.bank.to_radians(),
            self.elevation.to_radians(),
            self.heading.to_radians(),
        ]));
        state
    }
}

/// Render asset paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsAssets {
    /// Mesh file.
    pub obj_file: String,
    /// Vertex shader file.
    pub v_shader_file: String,
    /// Fragment shader file.
    pub f_shader_file: String,
    /// Texture file.
    pub texture_file: String,
}

impl Default for GraphicsAssets {
    fn default() -> Self {
        Self {
            obj_file: "graphics/trainer/trainer.obj".to_string(),
            v_shader_file: "graphics/shaders/aircraft.vs".to_string(),
            f_shader_file: "graphics/shaders/aircraft.fs".to_string(),
            texture_file: "graphics/trainer/trainer_texture.jpg".to_string(),
        }
    }
}

/// Stability and control derivatives of the linearized model.
///
/// Rate derivatives are with respect to the nondimensional rates
/// `p b / 2V`, `q c / 2V`, `r b / 2V`.
#[allow(non_snake_case, missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearCoefficients {
    pub CL0: f64,
    pub CL_a: f64,
    pub CL_qbar: f64,
    pub CL_de: f64,
    pub CD0: f64,
    pub CD1: f64,
    pub CD2: f64,
    pub CS_b: f64,
    pub CS_pbar: f64,
    pub CS_rbar: f64,
    pub CS_da: f64,
    pub CS_dr: f64,
    pub Cl_b: f64,
    pub Cl_pbar: f64,
    pub Cl_rbar: f64,
    pub Cl_da: f64,
    pub Cl_dr: f64,
    pub Cm0: f64,
    pub Cm_a: f64,
    pub Cm_qbar: f64,
    pub Cm_de: f64,
    pub Cn_b: f64,
    pub Cn_pbar: f64,
    pub Cn_rbar: f64,
    pub Cn_da: f64,
    pub Cn_dr: f64,
}

impl Default for LinearCoefficients {
    fn default() -> Self {
        Self {
            CL0: 0.31,
            CL_a: 5.143,
            CL_qbar: 3.9,
            CL_de: 0.43,
            CD0: 0.031,
            CD1: -0.01,
            CD2: 0.054,
            CS_b: -0.31,
            CS_pbar: -0.037,
            CS_rbar: 0.21,
            CS_da: 0.0,
            CS_dr: 0.187,
            Cl_b: -0.089,
            Cl_pbar: -0.47,
            Cl_rbar: 0.096,
            Cl_da: -0.178,
            Cl_dr: 0.0147,
            Cm0: -0.015,
            Cm_a: -0.89,
            Cm_qbar: -12.4,
            Cm_de: -1.28,
            Cn_b: 0.065,
            Cn_pbar: -0.03,
            Cn_rbar: -0.099,
            Cn_da: -0.053,
            Cn_dr: -0.0657,
        }
    }
}

/// Coefficients of the nonlinear model.
#[allow(non_snake_case, missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericCoefficients {
    pub CL0: f64,
    pub CL_a: f64,
    pub CL_de: f64,
    pub CD0: f64,
    /// Oswald efficiency factor.
    pub oswald: f64,
    /// Stall angle of attack, degrees.
    pub stall_alpha: f64,
    /// Sharpness of the stall blend, 1/rad.
    pub stall_blend: f64,
    pub CS_b: f64,
    pub Cl_b: f64,
    pub Cl_pbar: f64,
    pub Cl_da: f64,
    pub Cm0: f64,
    pub Cm_a: f64,
    pub Cm_qbar: f64,
    pub Cm_de: f64,
    pub Cn_b: f64,
    pub Cn_rbar: f64,
    pub Cn_dr: f64,
}

impl Default for GenericCoefficients {
    fn default() -> Self {
        Self {
            CL0: 0.28,
            CL_a: 4.58,
            CL_de: 0.4,
            CD0: 0.03,
            oswald: 0.8,
            stall_alpha: 16.0,
            stall_blend: 50.0,
            CS_b: -0.3,
            Cl_b: -0.09,
            Cl_pbar: -0.5,
            Cl_da: -0.18,
            Cm0: -0.02,
            Cm_a: -0.9,
            Cm_qbar: -12.0,
            Cm_de: -1.2,
            Cn_b: 0.07,
            Cn_rbar: -0.1,
            Cn_dr: -0.065,
        }
    }
}
