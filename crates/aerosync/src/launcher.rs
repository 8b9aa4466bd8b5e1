//! # Launcher
//!
//! Wires the two sides together in one of two topologies:
//!
//! ```text
//! in-process                          two-process
//! ┌──────────────────────────┐        ┌──────────────┐   file-backed   ┌──────────────┐
//! │ thread "aerosync-physics"│        │ aerosync run │◄───channel─────►│ aerosync     │
//! │   PhysicsLoop            │        │  RenderLoop  │                 │  physics     │
//! │        ▲  anonymous map  │        └──────────────┘                 │  PhysicsLoop │
//! │        ▼                 │                                         └──────────────┘
//! │ caller: RenderLoop       │
//! └──────────────────────────┘
//! ```
//!
//! Without graphics only the physics side runs, on the caller's thread.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::Arc;
use std::thread;

use aerosync_core::{AircraftModel, ChannelOptions, SharedChannel};
use crossbeam_channel::Receiver;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::input::RenderInput;
use crate::physics_loop::{PhysicsLoop, PhysicsLoopConfig, PhysicsStats};
use crate::render_loop::{FrameSink, RenderLoop, RenderLoopConfig, RenderStats};

/// Name of the physics thread in the in-process topology.
pub const PHYSICS_THREAD_NAME: &str = "aerosync-physics";

/// Subcommand the two-process topology re-invokes the executable with.
pub const PHYSICS_SUBCOMMAND: &str = "physics";

/// What a finished run reports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// Physics counters. Absent when physics ran in another process.
    pub physics: Option<PhysicsStats>,
    /// Render counters. Absent when graphics were disabled.
    pub render: Option<RenderStats>,
}

/// Builds the configured aircraft.
///
/// # Errors
///
/// Returns an error when the aircraft parameters are not physical.
pub fn build_aircraft(config: &SimulationConfig) -> SimResult<AircraftModel> {
    Ok(AircraftModel::from_config(&config.aircraft)?)
}

/// Maps the channel named by `[channel] path`, or anonymous memory.
///
/// # Errors
///
/// Returns an error when the region cannot be created.
pub fn create_channel(config: &SimulationConfig) -> SimResult<Arc<SharedChannel>> {
    let options = ChannelOptions::default();
    let channel = match &config.channel.path {
        Some(path) => SharedChannel::create(path, options)?,
        None => SharedChannel::anonymous(options)?,
    };
    Ok(channel)
}

/// Runs the physics side against `channel` on the caller's thread.
///
/// # Errors
///
/// Returns an error when the aircraft cannot be built or the loop fails.
pub fn run_physics(config: &SimulationConfig, channel: Arc<SharedChannel>) -> SimResult<PhysicsStats> {
    let aircraft = build_aircraft(config)?;
    PhysicsLoop::new(aircraft, channel, PhysicsLoopConfig::from(&config.simulation)).run()
}

/// Entry point of the physics child process: opens the parent's channel and
/// runs physics on it.
///
/// # Errors
///
/// Returns an error when the channel cannot be opened or the loop fails.
pub fn run_physics_process(config: &SimulationConfig, channel_path: &Path) -> SimResult<PhysicsStats> {
    let channel = SharedChannel::open(channel_path)?;
    info!(path = %channel_path.display(), "physics process attached to channel");
    let result = run_physics(config, Arc::clone(&channel));
    channel.request_quit();
    result
}

/// Runs both sides in this process: physics on its own thread, render on
/// the caller's thread.
///
/// # Errors
///
/// Returns the physics failure if there is one, else the render failure,
/// or [`SimError::PhysicsPanicked`] when the physics thread panicked.
pub fn run_in_process<S: FrameSink>(
    config: &SimulationConfig,
    sink: S,
    inputs: Option<Receiver<RenderInput>>,
) -> SimResult<RunSummary> {
    let channel = create_channel(config)?;
    if !config.simulation.enable_graphics {
        let physics = run_physics(config, channel)?;
        return Ok(RunSummary { physics: Some(physics), render: None });
    }

    let aircraft = build_aircraft(config)?;
    let physics_config = PhysicsLoopConfig::from(&config.simulation);
    let physics_channel = Arc::clone(&channel);
    let handle = thread::Builder::new()
        .name(PHYSICS_THREAD_NAME.to_string())
        .spawn(move || PhysicsLoop::new(aircraft, physics_channel, physics_config).run())
        .map_err(SimError::Spawn)?;

    let render = run_render(config, Arc::clone(&channel), sink, inputs);
    if render.is_err() {
        channel.request_quit();
    }

    let physics = handle.join().map_err(|_| SimError::PhysicsPanicked)?;
    combine_sides(physics, render)
}

/// Physics failures win: a render error is usually a consequence of them.
fn combine_sides(physics: SimResult<PhysicsStats>, render: SimResult<RenderStats>) -> SimResult<RunSummary> {
    match (physics, render) {
        (Ok(physics), Ok(render)) => Ok(RunSummary { physics: Some(physics), render: Some(render) }),
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
        (Err(physics), Err(render)) => {
            warn!(error = %render, "render side also failed");
            Err(physics)
        }
    }
}

/// Starts `aerosync physics` as a child process on the given channel file.
///
/// # Errors
///
/// Returns [`SimError::Spawn`] when the executable cannot be located or started.
pub fn spawn_physics_process(config_path: &Path, channel_path: &Path) -> SimResult<Child> {
    let exe = std::env::current_exe().map_err(SimError::Spawn)?;
    let child = Command::new(exe)
        .arg(PHYSICS_SUBCOMMAND)
        .arg("--config")
        .arg(config_path)
        .arg("--channel")
        .arg(channel_path)
        .spawn()
        .map_err(SimError::Spawn)?;
    info!(pid = child.id(), channel = %channel_path.display(), "physics process started");
    Ok(child)
}

/// Runs render here and physics in a child process sharing a file-backed
/// channel at `channel_path`.
///
/// # Errors
///
/// Returns a spawn failure, [`SimError::PhysicsExited`] when the child exits
/// unsuccessfully, or else the render failure.
pub fn run_two_process<S: FrameSink>(
    config: &SimulationConfig,
    config_path: &Path,
    channel_path: &Path,
    sink: S,
    inputs: Option<Receiver<RenderInput>>,
) -> SimResult<RunSummary> {
    let channel = SharedChannel::create(channel_path, ChannelOptions::default())?;
    let mut child = spawn_physics_process(config_path, channel_path)?;

    let render = if config.simulation.enable_graphics {
        run_render(config, Arc::clone(&channel), sink, inputs).map(Some)
    } else {
        Ok(None)
    };
    if let Err(err) = &render {
        warn!(error = %err, "render side failed; stopping physics");
        channel.request_quit();
    }

    let status = child.wait().map_err(SimError::Spawn)?;
    if !status.success() {
        return Err(SimError::PhysicsExited(status));
    }
    Ok(RunSummary { physics: None, render: render? })
}

/// Default location of the channel file for two-process runs.
#[must_use]
pub fn default_channel_path() -> PathBuf {
    std::env::temp_dir().join(format!("aerosync-{}.shm", std::process::id()))
}

fn run_render<S: FrameSink>(
    config: &SimulationConfig,
    channel: Arc<SharedChannel>,
    sink: S,
    inputs: Option<Receiver<RenderInput>>,
) -> SimResult<RenderStats> {
    let mut render = RenderLoop::new(channel, RenderLoopConfig::from(&config.simulation), sink);
    if let Some(inputs) = inputs {
        render = render.with_inputs(inputs);
    }
    render.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_loop::RenderFrame;
    use aerosync_core::ChannelError;
    use std::time::Duration;

    const GRAPHICS: &str = r#"
        [simulation]
        real_time = false
        final_time = 0.5
        dt = 0.01
        enable_graphics = true
        target_framerate = 200
        handshake_timeout_ms = 5000

        [aircraft]
        name = "trainer"
        [aircraft.initial]
        altitude = 1000.0
        [aircraft.aero]
        type = "linearized_coefficients"
    "#;

    #[test]
    fn test_headless_run_has_no_render_side() {
        let text = GRAPHICS.replace("enable_graphics = true", "enable_graphics = false");
        let config = SimulationConfig::from_toml_str(&text).unwrap();
        let summary = run_in_process(&config, Vec::<RenderFrame>::new(), None).unwrap();
        assert!(summary.render.is_none());
        assert_eq!(summary.physics.unwrap().steps, 50);
    }

    #[test]
    fn test_in_process_run_renders() {
        let config = SimulationConfig::from_toml_str(GRAPHICS).unwrap();
        let summary = run_in_process(&config, Vec::<RenderFrame>::new(), None).unwrap();
        let physics = summary.physics.unwrap();
        assert_eq!(physics.published, physics.steps);
        assert!(summary.render.is_some());
    }

    #[test]
    fn test_physics_error_reported_over_render_error() {
        let diverged = || Err(SimError::Diverged { time: 1.5 });
        let timed_out = || Err(SimError::Channel(ChannelError::MetadataTimeout(Duration::from_secs(1))));

        assert!(matches!(combine_sides(diverged(), timed_out()), Err(SimError::Diverged { .. })));
        assert!(matches!(
            combine_sides(Ok(PhysicsStats::default()), timed_out()),
            Err(SimError::Channel(ChannelError::MetadataTimeout(_)))
        ));
        assert!(matches!(
            combine_sides(diverged(), Ok(RenderStats::default())),
            Err(SimError::Diverged { .. })
        ));
        let summary = combine_sides(Ok(PhysicsStats::default()), Ok(RenderStats::default())).unwrap();
        assert_eq!(summary.physics, Some(PhysicsStats::default()));
    }

    #[test]
    fn test_build_aircraft_uses_discriminator() {
        let config = SimulationConfig::from_toml_str(GRAPHICS).unwrap();
        assert_eq!(build_aircraft(&config).unwrap().kind(), "linearized_coefficients");
    }
}
