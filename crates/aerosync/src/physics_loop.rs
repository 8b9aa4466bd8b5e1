//! # Physics Loop
//!
//! Integrates the aircraft state and publishes every step to the shared
//! channel. Control flows back through the channel's flags.
//!
//! ```text
//!  Initializing ──► WaitingForRenderReady ──► Priming ──► Running ◄──► Paused
//!       │              (graphics only)                      │
//!       └───────────────────────────────────────────────────┴──► Terminating
//!
//! Running, per tick:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. poll pilot inputs                → flip channel flags            │
//! │ 2. t > final time or quit?          → Terminating (sets quit)       │
//! │ 3. paused?                          → publish dt = 0 once, no step  │
//! │ 4. RK4 step with current dt + normalize                             │
//! │ 5. real time: dt = wall-clock delta since the previous iteration    │
//! │ 6. t += dt                                                          │
//! │ 7. publish frame + control settings (graphics only)                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In real-time mode the step size is measured, so scheduling jitter lands
//! directly in the integration step. `max_dt` optionally clamps it.

use std::sync::Arc;
use std::time::Duration;

use aerosync_core::{
    AircraftDerivativeProvider, HandshakeWait, RigidBodyState, Rk4, SharedChannel, StatePublisher,
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::SimulationSettings;
use crate::error::{SimError, SimResult};

/// Number of views the pilot's view toggle cycles through.
pub const VIEW_COUNT: u32 = 2;

/// Settings of the physics loop.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsLoopConfig {
    /// Measure the step size from the clock.
    pub real_time: bool,
    /// Simulation start time.
    pub start_time: f64,
    /// Simulation end time (infinite runs until quit).
    pub final_time: f64,
    /// Fixed step size when not real-time.
    pub dt: f64,
    /// Publish frames and wait for the render side.
    pub enable_graphics: bool,
    /// Bound on the render-ready wait.
    pub handshake_timeout: Duration,
    /// Clamp on measured steps.
    pub max_dt: Option<f64>,
    /// Measured steps above this are logged.
    pub stall_warn_dt: f64,
    /// Turn the first non-finite state into an error.
    pub halt_on_divergence: bool,
}

impl Default for PhysicsLoopConfig {
    fn default() -> Self {
        Self::from(&SimulationSettings::default())
    }
}

impl From<&SimulationSettings> for PhysicsLoopConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            real_time: settings.real_time,
            start_time: settings.start_time,
            final_time: settings.final_time_or_inf(),
            dt: settings.dt,
            enable_graphics: settings.enable_graphics,
            handshake_timeout: settings.handshake_timeout(),
            max_dt: settings.max_dt,
            stall_warn_dt: settings.stall_warn_dt,
            halt_on_divergence: settings.halt_on_divergence,
        }
    }
}

/// Lifecycle phase of the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsPhase {
    /// Constructed, nothing published.
    Initializing,
    /// Metadata published, waiting for the render side.
    WaitingForRenderReady,
    /// Measuring the first real-time step.
    Priming,
    /// Stepping.
    Running,
    /// Holding time while the pause flag is set.
    Paused,
    /// Finished; quit has been raised.
    Terminating,
}

/// Result of one [`PhysicsLoop::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// One integration step was taken.
    Stepped,
    /// Paused; time did not advance.
    Paused,
    /// The loop has terminated.
    Finished,
}

/// Counters kept over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicsStats {
    /// Integration steps taken.
    pub steps: u64,
    /// Frames published to the channel.
    pub published: u64,
    /// Ticks spent paused.
    pub paused_ticks: u64,
    /// Measured steps above the stall threshold.
    pub stalled_steps: u64,
    /// Measured steps cut down to `max_dt`.
    pub clamped_steps: u64,
    /// Largest step size used.
    pub max_dt_seen: f64,
    /// Time of the first non-finite state.
    pub diverged_at: Option<f64>,
}

/// The physics side of the simulation.
pub struct PhysicsLoop<A, C = MonotonicClock> {
    aircraft: A,
    clock: C,
    config: PhysicsLoopConfig,
    channel: Arc<SharedChannel>,
    publisher: Option<StatePublisher>,
    integrator: Rk4,
    phase: PhysicsPhase,
    state: RigidBodyState,
    t: f64,
    dt: f64,
    last_wall: f64,
    stats: PhysicsStats,
}

impl<A: AircraftDerivativeProvider> PhysicsLoop<A> {
    /// Creates a loop on the wall clock.
    #[must_use]
    pub fn new(aircraft: A, channel: Arc<SharedChannel>, config: PhysicsLoopConfig) -> Self {
        Self::with_clock(aircraft, channel, config, MonotonicClock::new())
    }
}

impl<A: AircraftDerivativeProvider, C: Clock> PhysicsLoop<A, C> {
    /// Creates a loop on the given clock.
    #[must_use]
    pub fn with_clock(aircraft: A, channel: Arc<SharedChannel>, config: PhysicsLoopConfig, clock: C) -> Self {
        let state = aircraft.initial_state();
        Self {
            aircraft,
            clock,
            t: config.start_time,
            dt: config.dt,
            config,
            channel,
            publisher: None,
            integrator: Rk4,
            phase: PhysicsPhase::Initializing,
            state,
            last_wall: 0.0,
            stats: PhysicsStats::default(),
        }
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> PhysicsPhase {
        self.phase
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &RigidBodyState {
        &self.state
    }

    /// Current simulation time.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Step size the next step will use.
    #[inline]
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Counters so far.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &PhysicsStats {
        &self.stats
    }

    /// The aircraft being integrated.
    #[inline]
    #[must_use]
    pub fn aircraft(&self) -> &A {
        &self.aircraft
    }

    /// The channel this loop publishes to and polls.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Arc<SharedChannel> {
        &self.channel
    }

    /// Runs initialization, priming and ticks until termination.
    ///
    /// Quit is raised on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error from the handshake, or [`SimError::Diverged`] when
    /// configured to halt on divergence.
    pub fn run(&mut self) -> SimResult<PhysicsStats> {
        let result = self.run_to_end();
        self.terminate();
        if let Err(err) = &result {
            warn!(error = %err, t = self.t, "physics loop failed");
        }
        result.map(|()| self.stats)
    }

    fn run_to_end(&mut self) -> SimResult<()> {
        self.initialize()?;
        if self.channel.is_quit() {
            return Ok(());
        }
        self.prime();
        loop {
            match self.tick()? {
                TickOutcome::Finished => return Ok(()),
                TickOutcome::Paused => std::thread::yield_now(),
                TickOutcome::Stepped => {}
            }
        }
    }

    /// Publishes graphics metadata and waits for the render side.
    ///
    /// Does nothing beyond logging when graphics are disabled.
    ///
    /// # Errors
    ///
    /// Returns a channel error when the publisher cannot be claimed or the
    /// metadata cannot be written, and [`SimError::RenderHandshakeTimeout`]
    /// when the render side stays silent. A quit raised during the wait ends
    /// it without error.
    pub fn initialize(&mut self) -> SimResult<()> {
        self.phase = PhysicsPhase::Initializing;
        info!(
            aircraft = self.aircraft.name(),
            real_time = self.config.real_time,
            graphics = self.config.enable_graphics,
            "physics initializing"
        );
        if !self.config.enable_graphics {
            return Ok(());
        }

        let mut publisher = self.channel.claim_publisher()?;
        publisher.publish_graphics_info(&self.aircraft.graphics_info())?;
        publisher.publish_control_settings(&self.aircraft.control_settings());
        self.publisher = Some(publisher);

        self.phase = PhysicsPhase::WaitingForRenderReady;
        debug!(timeout = ?self.config.handshake_timeout, "waiting for render ready");
        match self.channel.wait_for_render_ready(self.config.handshake_timeout) {
            HandshakeWait::Ready => debug!("render side ready"),
            HandshakeWait::Quit => info!("quit requested during render handshake"),
            HandshakeWait::TimedOut => {
                return Err(SimError::RenderHandshakeTimeout(self.config.handshake_timeout));
            }
        }
        Ok(())
    }

    /// Seeds the step size and records the initial output.
    ///
    /// In real-time mode one zero-length step is timed and its cost becomes
    /// the first step size.
    pub fn prime(&mut self) {
        self.phase = PhysicsPhase::Priming;
        if self.config.real_time {
            let start = self.clock.now();
            self.state = self.integrator.step_provider(&self.aircraft, &self.state, self.t, 0.0);
            self.aircraft.record_output(&self.state, self.t);
            let end = self.clock.now();
            self.dt = (end - start).max(0.0);
            self.last_wall = end;
        } else {
            self.aircraft.record_output(&self.state, self.t);
        }
        self.phase = PhysicsPhase::Running;
        info!(t = self.t, dt = self.dt, "physics running");
    }

    /// Advances the loop by one iteration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Diverged`] at the first non-finite state when
    /// configured to halt on divergence.
    pub fn tick(&mut self) -> SimResult<TickOutcome> {
        if self.phase == PhysicsPhase::Terminating {
            return Ok(TickOutcome::Finished);
        }
        self.poll_controls();
        if self.t > self.config.final_time || self.channel.is_quit() {
            self.terminate();
            return Ok(TickOutcome::Finished);
        }

        if self.channel.is_paused() {
            if self.phase != PhysicsPhase::Paused {
                self.phase = PhysicsPhase::Paused;
                info!(t = self.t, "physics paused");
                self.publish(0.0);
            }
            self.stats.paused_ticks += 1;
            return Ok(TickOutcome::Paused);
        }
        if self.phase == PhysicsPhase::Paused {
            self.phase = PhysicsPhase::Running;
            // Paused wall time is not charged to the next step
            self.last_wall = self.clock.now();
            info!(t = self.t, "physics resumed");
        }

        self.step()?;
        Ok(TickOutcome::Stepped)
    }

    fn step(&mut self) -> SimResult<()> {
        self.state = self.integrator.step_provider(&self.aircraft, &self.state, self.t, self.dt);

        if self.config.real_time {
            let now = self.clock.now();
            let measured = (now - self.last_wall).max(0.0);
            self.last_wall = now;
            self.dt = self.apply_dt_policy(measured);
        }
        self.t += self.dt;
        self.stats.steps += 1;
        self.stats.max_dt_seen = self.stats.max_dt_seen.max(self.dt);

        if self.stats.diverged_at.is_none() && !self.state.is_finite() {
            self.stats.diverged_at = Some(self.t);
            warn!(t = self.t, "aircraft state is no longer finite");
            if self.config.halt_on_divergence {
                return Err(SimError::Diverged { time: self.t });
            }
        }

        self.publish(self.dt);
        self.aircraft.record_output(&self.state, self.t);
        Ok(())
    }

    fn apply_dt_policy(&mut self, measured: f64) -> f64 {
        if measured > self.config.stall_warn_dt {
            self.stats.stalled_steps += 1;
            warn!(dt = measured, threshold = self.config.stall_warn_dt, "physics step stalled");
        }
        match self.config.max_dt {
            Some(max) if measured > max => {
                self.stats.clamped_steps += 1;
                max
            }
            _ => measured,
        }
    }

    fn publish(&mut self, dt: f64) {
        let Some(publisher) = self.publisher.as_mut() else {
            return;
        };
        publisher.publish_state(&self.state, dt, self.t);
        publisher.publish_control_settings(&self.aircraft.control_settings());
        self.stats.published += 1;
    }

    fn poll_controls(&mut self) {
        let inputs = self.aircraft.control_inputs();
        if inputs.is_empty() {
            return;
        }
        if inputs.pause {
            let paused = self.channel.toggle_pause();
            debug!(paused, "pause toggled by pilot input");
        }
        if inputs.quit {
            self.channel.request_quit();
        }
        if inputs.data_toggle {
            self.channel.toggle_data_overlay();
        }
        if inputs.view_toggle {
            self.channel.next_view(VIEW_COUNT);
        }
    }

    fn terminate(&mut self) {
        if self.phase == PhysicsPhase::Terminating {
            return;
        }
        self.phase = PhysicsPhase::Terminating;
        self.channel.request_quit();
        info!(
            t = self.t,
            steps = self.stats.steps,
            published = self.stats.published,
            "physics terminated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use aerosync_core::{ChannelOptions, ControlInputs, GraphicsInfo};

    /// Zero-derivative aircraft with scripted pilot inputs.
    struct Still {
        inputs: Vec<ControlInputs>,
    }

    impl AircraftDerivativeProvider for Still {
        fn name(&self) -> &str {
            "still"
        }

        fn initial_state(&self) -> RigidBodyState {
            RigidBodyState::at_rest()
        }

        fn derivative(&self, _state: &RigidBodyState, _t: f64) -> RigidBodyState {
            RigidBodyState::ZERO
        }

        fn graphics_info(&self) -> GraphicsInfo {
            GraphicsInfo {
                name: "still".to_string(),
                obj_file: String::new(),
                v_shader_file: String::new(),
                f_shader_file: String::new(),
                texture_file: String::new(),
                l_ref_lat: 1.0,
                l_ref_lon: 1.0,
                position: [0.0; 3],
                orientation: [1.0, 0.0, 0.0, 0.0],
            }
        }

        fn control_inputs(&mut self) -> ControlInputs {
            self.inputs.pop().unwrap_or_default()
        }
    }

    fn fixed_config(final_time: f64) -> PhysicsLoopConfig {
        PhysicsLoopConfig {
            real_time: false,
            final_time,
            dt: 0.01,
            ..PhysicsLoopConfig::default()
        }
    }

    fn channel() -> Arc<SharedChannel> {
        SharedChannel::anonymous(ChannelOptions::default()).unwrap()
    }

    #[test]
    fn test_fixed_step_count() {
        let mut physics = PhysicsLoop::new(Still { inputs: Vec::new() }, channel(), fixed_config(1.0));
        let stats = physics.run().unwrap();
        assert_eq!(stats.steps, 100);
        assert_eq!(stats.published, 0);
        assert_eq!(physics.phase(), PhysicsPhase::Terminating);
        assert!(physics.channel().is_quit());
        assert_eq!(physics.state(), &RigidBodyState::at_rest());
    }

    #[test]
    fn test_quit_stops_immediately() {
        let channel = channel();
        channel.request_quit();
        let mut physics = PhysicsLoop::new(Still { inputs: Vec::new() }, channel, fixed_config(1.0));
        let stats = physics.run().unwrap();
        assert_eq!(stats.steps, 0);
    }

    #[test]
    fn test_pilot_inputs_flip_flags() {
        let inputs = vec![
            ControlInputs { quit: true, ..ControlInputs::default() },
            ControlInputs { data_toggle: true, view_toggle: true, ..ControlInputs::default() },
        ];
        let channel = channel();
        let mut physics = PhysicsLoop::new(Still { inputs }, Arc::clone(&channel), fixed_config(10.0));
        physics.prime();

        assert_eq!(physics.tick().unwrap(), TickOutcome::Stepped);
        assert!(!channel.is_data_overlay_visible());
        assert_eq!(channel.view_index(), 0);

        assert_eq!(physics.tick().unwrap(), TickOutcome::Finished);
        assert!(channel.is_quit());
    }

    #[test]
    fn test_real_time_dt_is_measured() {
        let clock = ManualClock::new();
        let config = PhysicsLoopConfig { real_time: true, ..PhysicsLoopConfig::default() };
        let mut physics =
            PhysicsLoop::with_clock(Still { inputs: Vec::new() }, channel(), config, clock.clone());
        physics.prime();
        assert_eq!(physics.dt(), 0.0);

        clock.advance(0.02);
        physics.tick().unwrap();
        assert_eq!(physics.dt(), 0.02);
        assert_eq!(physics.time(), 0.02);
    }

    #[test]
    fn test_stall_is_clamped_and_counted() {
        let clock = ManualClock::new();
        let config = PhysicsLoopConfig {
            real_time: true,
            max_dt: Some(0.05),
            ..PhysicsLoopConfig::default()
        };
        let mut physics =
            PhysicsLoop::with_clock(Still { inputs: Vec::new() }, channel(), config, clock.clone());
        physics.prime();
        clock.advance(3.0);
        physics.tick().unwrap();
        assert_eq!(physics.dt(), 0.05);
        assert_eq!(physics.stats().stalled_steps, 1);
        assert_eq!(physics.stats().clamped_steps, 1);
    }

    #[test]
    fn test_divergence_halts_when_configured() {
        struct Exploding;
        impl AircraftDerivativeProvider for Exploding {
            fn name(&self) -> &str {
                "exploding"
            }
            fn initial_state(&self) -> RigidBodyState {
                RigidBodyState::at_rest()
            }
            fn derivative(&self, _state: &RigidBodyState, _t: f64) -> RigidBodyState {
                RigidBodyState { u: f64::NAN, ..RigidBodyState::ZERO }
            }
            fn graphics_info(&self) -> GraphicsInfo {
                Still { inputs: Vec::new() }.graphics_info()
            }
        }

        let config = PhysicsLoopConfig { halt_on_divergence: true, ..fixed_config(1.0) };
        let channel = channel();
        let mut physics = PhysicsLoop::new(Exploding, Arc::clone(&channel), config);
        assert!(matches!(physics.run(), Err(SimError::Diverged { .. })));
        assert!(channel.is_quit());

        let mut tolerant = PhysicsLoop::new(Exploding, self::channel(), fixed_config(0.1));
        let stats = tolerant.run().unwrap();
        assert!(stats.diverged_at.is_some());
        assert_eq!(stats.steps, 11);
    }

    #[test]
    fn test_quit_during_handshake_finishes_cleanly() {
        let config = PhysicsLoopConfig {
            enable_graphics: true,
            handshake_timeout: Duration::from_secs(60),
            ..fixed_config(1.0)
        };
        let channel = channel();
        channel.request_quit();
        let mut physics = PhysicsLoop::new(Still { inputs: Vec::new() }, Arc::clone(&channel), config);

        let start = std::time::Instant::now();
        let stats = physics.run().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.steps, 0);
        assert_eq!(stats.published, 0);
        assert_eq!(physics.phase(), PhysicsPhase::Terminating);
    }

    #[test]
    fn test_double_pause_toggle_is_a_no_op() {
        let config = PhysicsLoopConfig { enable_graphics: true, ..fixed_config(10.0) };
        let channel = channel();
        channel.signal_render_ready();
        let mut physics = PhysicsLoop::new(Still { inputs: Vec::new() }, Arc::clone(&channel), config);
        physics.initialize().unwrap();
        physics.prime();

        assert!(channel.toggle_pause());
        assert!(!channel.toggle_pause());
        for _ in 0..3 {
            assert_eq!(physics.tick().unwrap(), TickOutcome::Stepped);
            assert_eq!(channel.latest().dt_physics(), 0.01);
        }
        assert_eq!(physics.stats().paused_ticks, 0);
        assert_eq!(channel.publish_count(), 3);
    }

    #[test]
    fn test_handshake_timeout() {
        let config = PhysicsLoopConfig {
            enable_graphics: true,
            handshake_timeout: Duration::from_millis(10),
            ..fixed_config(1.0)
        };
        let channel = channel();
        let mut physics = PhysicsLoop::new(Still { inputs: Vec::new() }, Arc::clone(&channel), config);
        assert!(matches!(physics.run(), Err(SimError::RenderHandshakeTimeout(_))));
        assert!(channel.is_quit());
        assert!(channel.graphics_info().unwrap().is_some());
    }
}
