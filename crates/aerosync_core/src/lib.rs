//! # AEROSYNC Core
//!
//! State, integration and the shared channel of the flight simulator's
//! physics/render pipeline.
//!
//! - [`RigidBodyState`]: the 13-scalar 6-DOF state vector
//! - [`Rk4`]: fourth-order Runge-Kutta over that state
//! - [`AircraftDerivativeProvider`]: the derivative capability, with the
//!   [`LinearizedModel`] and [`GenericAeroModel`] variants
//! - [`SharedChannel`]: lock-free state exchange plus control flags
//!
//! ## Example
//!
//! ```rust,ignore
//! use aerosync_core::{ChannelOptions, Rk4, SharedChannel};
//!
//! let channel = SharedChannel::anonymous(ChannelOptions::default())?;
//! let mut publisher = channel.claim_publisher()?;
//! let next = Rk4.step_provider(&aircraft, &state, t, dt);
//! publisher.publish_state(&next, dt, t + dt);
//! ```

pub mod aircraft;
pub mod error;
pub mod integrator;
pub mod math;
pub mod state;
pub mod sync;

pub use aircraft::{
    AeroModelConfig, AircraftConfig, AircraftDerivativeProvider, AircraftModel, Airframe,
    ControlInputs, ControlSettings, ControlSurface, GenericAeroModel, GraphicsInfo,
    InitialCondition, LinearizedModel,
};
pub use error::{AircraftError, AircraftResult, ChannelError, ChannelResult};
pub use integrator::{rk4_step, Rk4};
pub use state::{RigidBodyState, StateFrame, FRAME_LEN, STATE_LEN};
pub use sync::{ChannelOptions, HandshakeWait, SharedChannel, Snapshot, StatePublisher};
