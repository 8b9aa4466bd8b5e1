//! # Simulation Configuration
//!
//! Loaded once at startup from TOML.
//!
//! ```toml
//! [simulation]
//! real_time = true
//! final_time = 120.0
//! enable_graphics = true
//! target_framerate = 30
//!
//! [channel]
//! path = "/dev/shm/aerosync"
//!
//! [aircraft]
//! name = "trainer"
//!
//! [aircraft.aero]
//! type = "linearized_coefficients"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use aerosync_core::AircraftConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Complete configuration of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Timing and mode.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Shared region location.
    #[serde(default)]
    pub channel: ChannelSettings,
    /// The aircraft to fly.
    pub aircraft: AircraftConfig,
}

/// `[simulation]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Measure the step size from the wall clock instead of using `dt`.
    pub real_time: bool,
    /// Simulation start time, seconds.
    pub start_time: f64,
    /// Simulation end time, seconds. Absent means run until quit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_time: Option<f64>,
    /// Fixed step size, seconds. Ignored in real-time mode.
    pub dt: f64,
    /// Run the render side and publish frames.
    pub enable_graphics: bool,
    /// Render frames per second.
    pub target_framerate: u32,
    /// Bound on each startup handshake, milliseconds.
    pub handshake_timeout_ms: u64,
    /// Upper clamp on a measured real-time step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dt: Option<f64>,
    /// Measured steps longer than this are logged as stalls.
    pub stall_warn_dt: f64,
    /// Stop with an error at the first non-finite state.
    pub halt_on_divergence: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            real_time: true,
            start_time: 0.0,
            final_time: None,
            dt: 0.01,
            enable_graphics: false,
            target_framerate: 30,
            handshake_timeout_ms: 10_000,
            max_dt: None,
            stall_warn_dt: 0.1,
            halt_on_divergence: false,
        }
    }
}

impl SimulationSettings {
    /// End time, infinite when unset.
    #[inline]
    #[must_use]
    pub fn final_time_or_inf(&self) -> f64 {
        self.final_time.unwrap_or(f64::INFINITY)
    }

    /// Handshake bound as a duration.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// `[channel]` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// File backing the shared region. Absent means anonymous memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl SimulationConfig {
    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            aircraft = %config.aircraft.name,
            real_time = config.simulation.real_time,
            graphics = config.simulation.enable_graphics,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error when the text does not parse or validate.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges that the schema alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        let sim = &self.simulation;
        if !(sim.dt > 0.0 && sim.dt.is_finite()) {
            return Err(ConfigError::Invalid(format!("dt must be positive, got {}", sim.dt)));
        }
        if !sim.start_time.is_finite() {
            return Err(ConfigError::Invalid("start_time must be finite".to_string()));
        }
        if let Some(tf) = sim.final_time {
            if tf.is_nan() || tf < sim.start_time {
                return Err(ConfigError::Invalid(format!(
                    "final_time {tf} is before start_time {}",
                    sim.start_time
                )));
            }
        }
        if sim.target_framerate == 0 {
            return Err(ConfigError::Invalid("target_framerate must be at least 1".to_string()));
        }
        if let Some(max_dt) = sim.max_dt {
            if !(max_dt > 0.0) {
                return Err(ConfigError::Invalid(format!("max_dt must be positive, got {max_dt}")));
            }
        }
        self.aircraft
            .airframe
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}
