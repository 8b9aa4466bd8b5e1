//! # Core Error Types
//!
//! Errors raised by the shared channel and by aircraft model construction.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while creating or using a shared channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Creating, sizing or mapping the backing file failed.
    #[error("channel i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The mapped region was written by an incompatible build.
    #[error("channel layout mismatch: expected magic {expected_magic:#x} v{expected_version}, found {found_magic:#x} v{found_version}")]
    LayoutMismatch {
        /// Magic this build writes.
        expected_magic: u64,
        /// Layout version this build writes.
        expected_version: u64,
        /// Magic found in the region.
        found_magic: u64,
        /// Layout version found in the region.
        found_version: u64,
    },

    /// The mapped region is smaller than the channel layout.
    #[error("channel region too small: need {required} bytes, mapped {actual}")]
    RegionTooSmall {
        /// Bytes the layout needs.
        required: usize,
        /// Bytes actually mapped.
        actual: usize,
    },

    /// Another handle already owns the publishing side.
    #[error("channel already has a publisher")]
    PublisherClaimed,

    /// Graphics metadata is write-once.
    #[error("graphics metadata already published")]
    MetadataAlreadyPublished,

    /// Encoded graphics metadata does not fit the metadata block.
    #[error("graphics metadata too large: {size} bytes, capacity {capacity}")]
    MetadataTooLarge {
        /// Encoded size.
        size: usize,
        /// Block capacity.
        capacity: usize,
    },

    /// Graphics metadata could not be encoded.
    #[error("failed to encode graphics metadata: {0}")]
    MetadataEncode(#[from] toml::ser::Error),

    /// Graphics metadata in the region could not be decoded.
    #[error("failed to decode graphics metadata: {0}")]
    MetadataDecode(#[from] toml::de::Error),

    /// Graphics metadata did not appear in time.
    #[error("graphics metadata not published within {0:?}")]
    MetadataTimeout(Duration),

    /// Quit was raised while waiting for graphics metadata.
    #[error("quit requested before graphics metadata was published")]
    QuitDuringHandshake,

    /// A control name that matches no control surface.
    #[error("unknown control surface: {0}")]
    UnknownControl(String),
}

/// Errors that can occur while building an aircraft model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AircraftError {
    /// A parameter is outside its physical range.
    #[error("invalid aircraft parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Result type for aircraft model construction.
pub type AircraftResult<T> = Result<T, AircraftError>;
