//! # Physics/Render Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Physics (own process):  steps at a measured, jittery rate
//! Render  (own process):  draws at a fixed target rate
//!
//! With a lock:     a slow frame stalls physics, a long step stalls the frame
//! Without care:    render sees half of step N and half of step N+1
//! ```
//!
//! ## The Solution: Sequenced Double Buffer in Shared Memory
//!
//! ```text
//! Step N:    physics writes slot B, flips index → B
//!            render reads slot A (step N-1) or B once flipped
//! Step N+1:  physics writes slot A, flips index → A
//! ```
//!
//! Neither side ever waits on the other. Control travels back through
//! single-word flags in the same region.

mod channel;

pub use channel::{
    wall_clock_seconds, ChannelOptions, HandshakeWait, SharedChannel, Snapshot, StatePublisher, CHANNEL_MAGIC,
    CHANNEL_SIZE, CHANNEL_VERSION, METADATA_CAPACITY,
};
