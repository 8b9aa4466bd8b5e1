//! # Aircraft Derivative Providers
//!
//! The physics loop only needs a capability: "given a state and a time,
//! what is its time-derivative?" plus a few hooks around it.
//!
//! ```text
//!            ┌────────────────────────────────┐
//!            │  AircraftDerivativeProvider    │
//!            │  derivative / normalize        │
//!            │  graphics_info / control_inputs│
//!            │  control_settings / record     │
//!            └───────────────┬────────────────┘
//!                            │
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!      ┌───────────────┐           ┌────────────────┐
//!      │LinearizedModel│           │GenericAeroModel│
//!      └───────────────┘           └────────────────┘
//! ```
//!
//! The variant is chosen once, at load time, from the `type` discriminator
//! of the aircraft configuration ([`AircraftModel::from_config`]).

mod config;
mod dynamics;
mod generic;
mod linearized;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AircraftResult, ChannelError};
use crate::state::RigidBodyState;

pub use config::{
    AeroModelConfig, AircraftConfig, Airframe, GenericCoefficients, GraphicsAssets,
    InitialCondition, LinearCoefficients,
};
pub use dynamics::{rigid_body_rates, AirData};
pub use generic::GenericAeroModel;
pub use linearized::LinearizedModel;

/// Capability the physics loop integrates against.
///
/// Implementations must be `Send` so the physics loop can own them on
/// its own thread or process.
pub trait AircraftDerivativeProvider: Send {
    /// Display name of the aircraft.
    fn name(&self) -> &str;

    /// State at the start of the simulation.
    fn initial_state(&self) -> RigidBodyState;

    /// Time-derivative of `state` at time `t`, in state-vector order.
    fn derivative(&self, state: &RigidBodyState, t: f64) -> RigidBodyState;

    /// Post-step normalization. Called after every integration step.
    fn normalize(&self, state: &RigidBodyState) -> RigidBodyState {
        state.normalized()
    }

    /// Static rendering metadata, published once before the first step.
    fn graphics_info(&self) -> GraphicsInfo;

    /// Pilot commands polled once per physics iteration.
    fn control_inputs(&mut self) -> ControlInputs {
        ControlInputs::default()
    }

    /// Current control-surface settings, for display.
    fn control_settings(&self) -> ControlSettings {
        ControlSettings::default()
    }

    /// Output hook for the state at time `t`.
    fn record_output(&mut self, _state: &RigidBodyState, _t: f64) {}
}

impl<A: AircraftDerivativeProvider + ?Sized> AircraftDerivativeProvider for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn initial_state(&self) -> RigidBodyState {
        (**self).initial_state()
    }

    fn derivative(&self, state: &RigidBodyState, t: f64) -> RigidBodyState {
        (**self).derivative(state, t)
    }

    fn normalize(&self, state: &RigidBodyState) -> RigidBodyState {
        (**self).normalize(state)
    }

    fn graphics_info(&self) -> GraphicsInfo {
        (**self).graphics_info()
    }

    fn control_inputs(&mut self) -> ControlInputs {
        (**self).control_inputs()
    }

    fn control_settings(&self) -> ControlSettings {
        (**self).control_settings()
    }

    fn record_output(&mut self, state: &RigidBodyState, t: f64) {
        (**self).record_output(state, t);
    }
}

/// Pilot commands. Each `true` is a one-shot toggle request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlInputs {
    /// Toggle pause.
    pub pause: bool,
    /// Toggle quit.
    pub quit: bool,
    /// Toggle the flight-data overlay.
    pub data_toggle: bool,
    /// Switch to the next view.
    pub view_toggle: bool,
}

impl ControlInputs {
    /// True when no command is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.pause || self.quit || self.data_toggle || self.view_toggle)
    }
}

/// Control surfaces exposed to the display side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum ControlSurface {
    /// Throttle setting, 0..1.
    Throttle = 0,
    /// Elevator deflection, radians.
    Elevator = 1,
    /// Aileron deflection, radians.
    Aileron = 2,
    /// Rudder deflection, radians.
    Rudder = 3,
    /// Flap deflection, radians.
    Flaps = 4,
}

impl ControlSurface {
    /// Number of surfaces.
    pub const COUNT: usize = 5;

    /// All surfaces in slot order.
    pub const ALL: [Self; Self::COUNT] =
        [Self::Throttle, Self::Elevator, Self::Aileron, Self::Rudder, Self::Flaps];

    /// Display key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Throttle => "throttle",
            Self::Elevator => "elevator",
            Self::Aileron => "aileron",
            Self::Rudder => "rudder",
            Self::Flaps => "flaps",
        }
    }

    /// Slot index in the shared channel.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ControlSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControlSurface {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|surface| surface.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChannelError::UnknownControl(s.to_string()))
    }
}

/// Control-surface settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Throttle, 0..1.
    pub throttle: f64,
    /// Elevator, radians (trailing edge down positive).
    pub elevator: f64,
    /// Aileron, radians (right roll positive).
    pub aileron: f64,
    /// Rudder, radians (nose left positive).
    pub rudder: f64,
    /// Flaps, radians.
    pub flaps: f64,
}

impl ControlSettings {
    /// Value of one surface.
    #[must_use]
    pub fn get(&self, surface: ControlSurface) -> f64 {
        match surface {
            ControlSurface::Throttle => self.throttle,
            ControlSurface::Elevator => self.elevator,
            ControlSurface::Aileron => self.aileron,
            ControlSurface::Rudder => self.rudder,
            ControlSurface::Flaps => self.flaps,
        }
    }

    /// Sets one surface.
    pub fn set(&mut self, surface: ControlSurface, value: f64) {
        match surface {
            ControlSurface::Throttle => self.throttle = value,
            ControlSurface::Elevator => self.elevator = value,
            ControlSurface::Aileron => self.aileron = value,
            ControlSurface::Rudder => self.rudder = value,
            ControlSurface::Flaps => self.flaps = value,
        }
    }

    /// `(surface, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ControlSurface, f64)> + '_ {
        ControlSurface::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

/// Rendering metadata handed to the render side once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphicsInfo {
    /// Aircraft name.
    pub name: String,
    /// Mesh file.
    pub obj_file: String,
    /// Vertex shader file.
    pub v_shader_file: String,
    /// Fragment shader file.
    pub f_shader_file: String,
    /// Texture file.
    pub texture_file: String,
    /// Lateral reference length (span).
    pub l_ref_lat: f64,
    /// Longitudinal reference length (chord).
    pub l_ref_lon: f64,
    /// Initial inertial position.
    pub position: [f64; 3],
    /// Initial orientation quaternion.
    pub orientation: [f64; 4],
}

/// Aircraft selected from configuration.
#[derive(Clone, Debug)]
pub enum AircraftModel {
    /// Stability-derivative model.
    Linearized(LinearizedModel),
    /// Nonlinear lift/drag model.
    GenericAero(GenericAeroModel),
}

impl AircraftModel {
    /// Builds the variant named by the configuration discriminator.
    ///
    /// # Errors
    ///
    /// Returns an error when the airframe parameters are not physical.
    pub fn from_config(config: &AircraftConfig) -> AircraftResult<Self> {
        config.airframe.validate()?;
        let model = match &config.aero {
            AeroModelConfig::LinearizedCoefficients(coefficients) => {
                Self::Linearized(LinearizedModel::new(config, coefficients.clone()))
            }
            AeroModelConfig::GenericAero(coefficients) => {
                Self::GenericAero(GenericAeroModel::new(config, coefficients.clone())?)
            }
        };
        tracing::info!(aircraft = %config.name, model = model.kind(), "aircraft loaded");
        Ok(model)
    }

    /// Short name of the model variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linearized(_) => "linearized_coefficients",
            Self::GenericAero(_) => "generic_aero",
        }
    }

    fn provider(&self) -> &dyn AircraftDerivativeProvider {
        match self {
            Self::Linearized(m) => m,
            Self::GenericAero(m) => m,
        }
    }

    fn provider_mut(&mut self) -> &mut dyn AircraftDerivativeProvider {
        match self {
            Self::Linearized(m) => m,
            Self::GenericAero(m) => m,
        }
    }
}

impl AircraftDerivativeProvider for AircraftModel {
    fn name(&self) -> &str {
        self.provider().name()
    }

    fn initial_state(&self) -> RigidBodyState {
        self.provider().initial_state()
    }

    fn derivative(&self, state: &RigidBodyState, t: f64) -> RigidBodyState {
        self.provider().derivative(state, t)
    }

    fn normalize(&self, state: &RigidBodyState) -> RigidBodyState {
        self.provider().normalize(state)
    }

    fn graphics_info(&self) -> GraphicsInfo {
        self.provider().graphics_info()
    }

    fn control_inputs(&mut self) -> ControlInputs {
        self.provider_mut().control_inputs()
    }

    fn control_settings(&self) -> ControlSettings {
        self.provider().control_settings()
    }

    fn record_output(&mut self, state: &RigidBodyState, t: f64) {
        self.provider_mut().record_output(state, t);
    }
}

/// Emits the per-step output record shared by the built-in models.
pub(crate) fn trace_output(name: &str, state: &RigidBodyState, t: f64) {
    tracing::trace!(
        target: "aerosync::output",
        aircraft = name,
        t,
        x = state.x,
        y = state.y,
        z = state.z,
        u = state.u,
        v = state.v,
        w = state.w,
        p = state.p,
        q = state.q,
        r = state.r,
        "state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(aero: AeroModelConfig) -> AircraftConfig {
        AircraftConfig {
            name: "test".to_string(),
            airframe: Airframe::default(),
            initial: InitialCondition::default(),
            controls: ControlSettings::default(),
            graphics: GraphicsAssets::default(),
            aero,
        }
    }

    #[test]
    fn test_control_surface_names() {
        for surface in ControlSurface::ALL {
            assert_eq!(surface.name().parse::<ControlSurface>().ok(), Some(surface));
        }
        assert_eq!("Throttle".parse::<ControlSurface>().ok(), Some(ControlSurface::Throttle));
        assert!("spoiler".parse::<ControlSurface>().is_err());
    }

    #[test]
    fn test_control_settings_roundtrip_by_surface() {
        let mut settings = ControlSettings::default();
        settings.set(ControlSurface::Rudder, 0.1);
        assert_eq!(settings.get(ControlSurface::Rudder), 0.1);
        assert_eq!(settings.iter().count(), ControlSurface::COUNT);
    }

    #[test]
    fn test_model_selection_by_discriminator() {
        let lin = AircraftModel::from_config(&config_with(AeroModelConfig::LinearizedCoefficients(
            LinearCoefficients::default(),
        )))
        .unwrap();
        assert_eq!(lin.kind(), "linearized_coefficients");

        let generic = AircraftModel::from_config(&config_with(AeroModelConfig::GenericAero(
            GenericCoefficients::default(),
        )))
        .unwrap();
        assert_eq!(generic.kind(), "generic_aero");
        assert_eq!(generic.name(), "test");
    }

    #[test]
    fn test_invalid_airframe_rejected() {
        let mut config = config_with(AeroModelConfig::GenericAero(GenericCoefficients::default()));
        config.airframe.mass = 0.0;
        assert!(AircraftModel::from_config(&config).is_err());
    }

    #[test]
    fn test_initial_state_is_unit_quaternion() {
        let model = AircraftModel::from_config(&config_with(AeroModelConfig::LinearizedCoefficients(
            LinearCoefficients::default(),
        )))
        .unwrap();
        let s = model.initial_state();
        assert!((s.quaternion_norm() - 1.0).abs() < 1e-12);
        assert!(s.z < 0.0);
        assert!(model.derivative(&s, 0.0).is_finite());
    }
}
