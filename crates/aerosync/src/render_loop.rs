//! # Render Loop
//!
//! The render side's consumption contract with the shared channel. Drawing
//! itself is delegated to a [`FrameSink`].
//!
//! ```text
//! handshake:  wait for graphics metadata → seed filter → signal render ready
//!
//! per frame:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. drain pilot inputs               → channel flag writes           │
//! │ 2. quit set?                        → Quit                          │
//! │ 3. latest() is the sentinel?        → Waiting                       │
//! │ 4. filter the raw position                                          │
//! │ 5. z > 0 (below ground)?            → raise quit, Crashed           │
//! │ 6. NaN airspeed?                    → error banner, keep going      │
//! │ 7. hand the frame to the sink                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ground contact ends the session; a NaN state does not.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aerosync_core::{ChannelError, GraphicsInfo, SharedChannel};
use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::config::SimulationSettings;
use crate::error::{SimError, SimResult};
use crate::filter::SmoothingFilter;
use crate::flight_data::FlightData;
use crate::input::{drain_inputs, RenderInput};
use crate::physics_loop::VIEW_COUNT;

/// Settings of the render loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderLoopConfig {
    /// Frames per second to pace to.
    pub target_framerate: u32,
    /// Bound on the graphics-metadata wait.
    pub handshake_timeout: Duration,
    /// Number of views `NextView` cycles through.
    pub view_count: u32,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self::from(&SimulationSettings::default())
    }
}

impl From<&SimulationSettings> for RenderLoopConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            target_framerate: settings.target_framerate,
            handshake_timeout: settings.handshake_timeout(),
            view_count: VIEW_COUNT,
        }
    }
}

/// Everything a drawer needs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderFrame {
    /// Smoothed inertial position.
    pub position: [f64; 3],
    /// Position as published.
    pub raw_position: [f64; 3],
    /// Orientation quaternion as published.
    pub orientation: [f64; 4],
    /// Active view.
    pub view_index: u32,
    /// Whether the flight-data overlay is shown.
    pub data_overlay: bool,
    /// Overlay values.
    pub flight_data: FlightData,
    /// Physics produced a NaN; show the error banner.
    pub physics_error: bool,
    /// The snapshot may mix two publishes.
    pub torn: bool,
}

/// Result of one [`RenderLoop::frame`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Physics has not published yet.
    Waiting,
    /// A frame was handed to the sink.
    Rendered(RenderFrame),
    /// The aircraft hit the ground; quit has been raised.
    Crashed,
    /// Quit is set.
    Quit,
}

/// Drawing collaborator.
pub trait FrameSink {
    /// Draws one frame.
    fn present(&mut self, frame: &RenderFrame);

    /// Shows the end-of-session screen after ground contact.
    fn game_over(&mut self) {}
}

impl FrameSink for Vec<RenderFrame> {
    fn present(&mut self, frame: &RenderFrame) {
        self.push(*frame);
    }
}

/// Counters kept over a render session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames handed to the sink.
    pub frames_rendered: u64,
    /// Frames spent on the sentinel.
    pub frames_waiting: u64,
    /// Rendered frames built from a torn snapshot.
    pub torn_frames: u64,
    /// Rendered frames showing the physics error banner.
    pub physics_error_frames: u64,
    /// The session ended in ground contact.
    pub crashed: bool,
}

/// Sleeps each frame out to the target rate and reports the frame time.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    frame_time: Duration,
    last: Instant,
}

impl FramePacer {
    /// Pacer for `target_framerate` frames per second.
    #[must_use]
    pub fn new(target_framerate: u32) -> Self {
        Self {
            frame_time: Duration::from_secs(1) / target_framerate.max(1),
            last: Instant::now(),
        }
    }

    /// Target time per frame.
    #[inline]
    #[must_use]
    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    /// Waits out the rest of the frame and returns seconds since the last tick.
    pub fn tick(&mut self) -> f64 {
        let deadline = self.last + self.frame_time;
        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
        }
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        elapsed
    }
}

/// The render side of the simulation.
pub struct RenderLoop<S> {
    channel: Arc<SharedChannel>,
    config: RenderLoopConfig,
    inputs: Option<Receiver<RenderInput>>,
    sink: S,
    filter: Option<SmoothingFilter>,
    graphics: Option<GraphicsInfo>,
    stats: RenderStats,
}

impl<S: FrameSink> RenderLoop<S> {
    /// Creates a render loop drawing into `sink`.
    #[must_use]
    pub fn new(channel: Arc<SharedChannel>, config: RenderLoopConfig, sink: S) -> Self {
        Self {
            channel,
            config,
            inputs: None,
            sink,
            filter: None,
            graphics: None,
            stats: RenderStats::default(),
        }
    }

    /// Attaches the pilot input queue.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Receiver<RenderInput>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Counters so far.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Graphics metadata received in the handshake.
    #[inline]
    #[must_use]
    pub fn graphics_info(&self) -> Option<&GraphicsInfo> {
        self.graphics.as_ref()
    }

    /// The drawing sink.
    #[inline]
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the loop, returning its sink.
    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Waits for graphics metadata, seeds the filter and signals readiness.
    ///
    /// # Errors
    ///
    /// Returns a channel error when the metadata does not arrive in time or
    /// does not decode.
    pub fn handshake(&mut self) -> SimResult<&GraphicsInfo> {
        debug!(timeout = ?self.config.handshake_timeout, "waiting for graphics metadata");
        let info = self.channel.wait_for_graphics_info(self.config.handshake_timeout)?;
        info!(aircraft = %info.name, mesh = %info.obj_file, "graphics metadata received");
        self.filter = Some(SmoothingFilter::new(info.position));
        self.channel.signal_render_ready();
        Ok(&*self.graphics.insert(info))
    }

    /// Processes one render frame of length `dt_graphics` seconds.
    pub fn frame(&mut self, dt_graphics: f64) -> FrameOutcome {
        if let Some(inputs) = &self.inputs {
            drain_inputs(inputs, &self.channel, self.config.view_count);
        }
        if self.channel.is_quit() {
            return FrameOutcome::Quit;
        }

        let snapshot = self.channel.latest();
        let Some(state) = snapshot.state() else {
            self.stats.frames_waiting += 1;
            return FrameOutcome::Waiting;
        };

        let raw_position = state.position();
        let filter = self.filter.get_or_insert_with(|| SmoothingFilter::new(raw_position));
        let position = filter.update(raw_position, dt_graphics);

        if state.z > 0.0 {
            info!(t = snapshot.t_physics(), altitude = -state.z, "ground contact");
            self.channel.request_quit();
            self.sink.game_over();
            self.stats.crashed = true;
            return FrameOutcome::Crashed;
        }

        let flight_data =
            FlightData::from_frame(snapshot.frame(), dt_graphics, self.channel.control_settings());
        let physics_error = state.u.is_nan() || flight_data.has_physics_error();
        if physics_error && self.stats.physics_error_frames == 0 {
            warn!(t = snapshot.t_physics(), "physics produced NaN; showing error banner");
        }

        let frame = RenderFrame {
            position,
            raw_position,
            orientation: state.quaternion(),
            view_index: self.channel.view_index(),
            data_overlay: self.channel.is_data_overlay_visible(),
            flight_data,
            physics_error,
            torn: snapshot.is_torn(),
        };
        self.sink.present(&frame);

        self.stats.frames_rendered += 1;
        self.stats.torn_frames += u64::from(frame.torn);
        self.stats.physics_error_frames += u64::from(physics_error);
        FrameOutcome::Rendered(frame)
    }

    /// Handshakes, then paces frames until quit or ground contact.
    ///
    /// A quit raised before the handshake completes ends the run cleanly.
    ///
    /// # Errors
    ///
    /// Returns the handshake error.
    pub fn run(&mut self) -> SimResult<RenderStats> {
        match self.handshake().map(|_| ()) {
            Ok(()) => {}
            Err(SimError::Channel(ChannelError::QuitDuringHandshake)) => {
                info!("quit requested during graphics handshake");
                return Ok(self.stats);
            }
            Err(err) => return Err(err),
        }
        let mut pacer = FramePacer::new(self.config.target_framerate);
        loop {
            let dt = pacer.tick();
            match self.frame(dt) {
                FrameOutcome::Quit | FrameOutcome::Crashed => break,
                FrameOutcome::Waiting | FrameOutcome::Rendered(_) => {}
            }
        }
        info!(
            frames = self.stats.frames_rendered,
            waiting = self.stats.frames_waiting,
            crashed = self.stats.crashed,
            "render loop finished"
        );
        Ok(self.stats)
    }
}
