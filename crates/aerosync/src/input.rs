//! Render-side input queue.
//!
//! The windowing/input collaborator pushes [`RenderInput`] commands from
//! wherever its events arrive; the render loop drains them once per frame
//! and turns each into a flag write on the shared channel.

use aerosync_core::SharedChannel;
use crossbeam_channel::{Receiver, Sender};

/// A command from the pilot to the render side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderInput {
    /// Flip the pause flag.
    TogglePause,
    /// Flip flight-data overlay visibility.
    ToggleDataOverlay,
    /// Select a view by index.
    SetView(u32),
    /// Cycle to the next view.
    NextView,
    /// End the session.
    Quit,
}

impl RenderInput {
    /// Applies this command to the channel flags.
    pub fn apply(self, channel: &SharedChannel, view_count: u32) {
        match self {
            Self::TogglePause => {
                let paused = channel.toggle_pause();
                tracing::info!(paused, "pause toggled");
            }
            Self::ToggleDataOverlay => {
                channel.toggle_data_overlay();
            }
            Self::SetView(index) => channel.set_view(index),
            Self::NextView => {
                channel.next_view(view_count);
            }
            Self::Quit => {
                tracing::info!("quit requested by pilot");
                channel.request_quit();
            }
        }
    }
}

/// Unbounded input queue; the sender side goes to the input collaborator.
#[must_use]
pub fn input_queue() -> (Sender<RenderInput>, Receiver<RenderInput>) {
    crossbeam_channel::unbounded()
}

/// Applies every queued command. Returns how many were applied.
pub fn drain_inputs(inputs: &Receiver<RenderInput>, channel: &SharedChannel, view_count: u32) -> usize {
    let mut applied = 0;
    for input in inputs.try_iter() {
        input.apply(channel, view_count);
        applied += 1;
    }
    applied
}
