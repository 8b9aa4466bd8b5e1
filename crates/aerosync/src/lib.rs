//! # AEROSYNC Simulation
//!
//! The two sides of the flight-simulator pipeline and the launcher that
//! wires them together.
//!
//! ```text
//! ┌──────────────┐   publish (seqlock)   ┌───────────────┐   latest()   ┌──────────────┐
//! │ PhysicsLoop  │ ─────────────────────►│ SharedChannel │ ────────────►│ RenderLoop   │
//! │ RK4, own dt  │ ◄───── flags ─────────│ (mmap region) │ ◄── flags ───│ filter, sink │
//! └──────────────┘                       └───────────────┘              └──────────────┘
//! ```
//!
//! Neither side blocks the other after the startup handshake. Physics steps
//! at a measured (real-time) or fixed rate; render draws at its own rate and
//! smooths the position it draws.
//!
//! ## Modules
//!
//! - [`physics_loop`]: integrate, publish, honor pause and quit
//! - [`render_loop`]: consume, smooth, detect ground contact
//! - [`filter`]: autoregressive position smoother
//! - [`launcher`]: in-process and two-process topologies

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod flight_data;
pub mod input;
pub mod launcher;
pub mod physics_loop;
pub mod render_loop;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ChannelSettings, SimulationConfig, SimulationSettings};
pub use error::{ConfigError, ConfigResult, SimError, SimResult};
pub use filter::{AxisFilter, SmoothingFilter, MAX_FILTER_DT};
pub use flight_data::FlightData;
pub use input::{drain_inputs, input_queue, RenderInput};
pub use launcher::{run_in_process, run_physics, run_two_process, spawn_physics_process, RunSummary};
pub use physics_loop::{PhysicsLoop, PhysicsLoopConfig, PhysicsPhase, PhysicsStats, TickOutcome, VIEW_COUNT};
pub use render_loop::{FrameOutcome, FramePacer, FrameSink, RenderFrame, RenderLoop, RenderLoopConfig, RenderStats};
