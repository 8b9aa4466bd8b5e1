//! # Simulation Error Types

use std::path::PathBuf;
use std::time::Duration;

use aerosync_core::{AircraftError, ChannelError};
use thiserror::Error;

/// Errors raised while loading a simulation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that end a simulation run.
#[derive(Error, Debug)]
pub enum SimError {
    /// Shared channel failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Aircraft could not be built.
    #[error(transparent)]
    Aircraft(#[from] AircraftError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The render side never signalled readiness.
    #[error("render side not ready within {0:?}")]
    RenderHandshakeTimeout(Duration),

    /// The state became non-finite and the run was configured to halt.
    #[error("state diverged at t = {time}")]
    Diverged {
        /// Simulation time of the first non-finite state.
        time: f64,
    },

    /// The physics thread panicked.
    #[error("physics thread panicked")]
    PhysicsPanicked,

    /// The physics process could not be started or waited on.
    #[error("physics process failed: {0}")]
    Spawn(#[source] std::io::Error),

    /// The physics process exited unsuccessfully.
    #[error("physics process exited with {0}")]
    PhysicsExited(std::process::ExitStatus),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for simulation runs.
pub type SimResult<T> = Result<T, SimError>;
