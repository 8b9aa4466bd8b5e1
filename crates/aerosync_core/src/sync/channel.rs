//! # Shared State Channel
//!
//! Lock-free exchange of the latest physics frame and the control flags
//! between the physics side and the render side.
//!
//! ## Safety Note
//!
//! The channel lives in a memory mapping that other handles (possibly in
//! other processes) mutate concurrently. Every field is an atomic except the
//! write-once metadata block, whose publication is ordered by its length.

#![allow(unsafe_code)]
//!
//! ## Layout
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ magic "AEROSYNC" │ version │ active_slot │ publish_count │
//!   ├──────────────────────────────────────────────────────────┤
//!   │ slot 0: seq │ 16 x f64 bits                              │
//!   │ slot 1: seq │ 16 x f64 bits                              │
//!   ├──────────────────────────────────────────────────────────┤
//!   │ quit │ pause │ view │ overlay │ render_ready │ publisher │
//!   ├──────────────────────────────────────────────────────────┤
//!   │ controls: throttle elevator aileron rudder flaps         │
//!   ├──────────────────────────────────────────────────────────┤
//!   │ metadata_len │ metadata (TOML, write-once)               │
//!   └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Publish / Read
//!
//! ```text
//! Publisher:  write inactive slot (seq odd → values → seq even)
//!             flip active_slot
//!
//! Reader:     load active_slot → seq → values → seq again
//!             equal and even  → consistent frame
//!             otherwise retry, then accept the copy as torn
//! ```
//!
//! A fresh region is all-zero, so the first read returns the all-zero
//! sentinel frame until the publisher's first step lands.

use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::hint::spin_loop;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use memmap2::{MmapMut, MmapOptions};

use crate::aircraft::{ControlSettings, ControlSurface, GraphicsInfo};
use crate::error::{ChannelError, ChannelResult};
use crate::state::{RigidBodyState, StateFrame, FRAME_LEN};

/// Region magic, "AEROSYNC" in little-endian bytes.
pub const CHANNEL_MAGIC: u64 = u64::from_le_bytes(*b"AEROSYNC");

/// Layout version written into the header.
pub const CHANNEL_VERSION: u64 = 1;

/// Capacity of the graphics metadata block in bytes.
pub const METADATA_CAPACITY: usize = 4096;

/// Read attempts before a torn copy is accepted.
const READ_RETRIES: usize = 64;

/// Spins between `yield_now` calls while waiting on a handshake.
const SPINS_PER_YIELD: u32 = 128;

/// Size in bytes of the mapped region.
pub const CHANNEL_SIZE: usize = std::mem::size_of::<ChannelLayout>();

// =============================================================================
// MAPPED LAYOUT
// =============================================================================

#[repr(C)]
struct StateSlot {
    seq: AtomicU64,
    values: [AtomicU64; FRAME_LEN],
}

#[repr(C)]
struct ChannelLayout {
    magic: AtomicU64,
    version: AtomicU64,
    active_slot: AtomicU64,
    publish_count: AtomicU64,
    slots: [StateSlot; 2],
    quit: AtomicU32,
    pause: AtomicU32,
    view_index: AtomicU32,
    data_overlay: AtomicU32,
    render_ready: AtomicU32,
    publisher_claimed: AtomicU32,
    controls: [AtomicU64; ControlSurface::COUNT],
    metadata_len: AtomicU64,
    metadata: UnsafeCell<[u8; METADATA_CAPACITY]>,
}

/// How a startup handshake wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeWait {
    /// The other side arrived.
    Ready,
    /// Quit was raised first.
    Quit,
    /// The timeout elapsed.
    TimedOut,
}

/// Initial flag values written when a channel region is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Active view index at startup.
    pub initial_view: u32,
    /// Whether the flight-data overlay starts visible.
    pub data_overlay: bool,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        // Cockpit view, overlay shown
        Self {
            initial_view: 1,
            data_overlay: true,
        }
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Handle on a mapped channel region.
///
/// Share it between threads with `Arc`. Handles in other processes map the
/// same file with [`SharedChannel::open`].
///
/// ## Usage
///
/// ```rust,ignore
/// let channel = SharedChannel::anonymous(ChannelOptions::default())?;
/// let mut publisher = channel.claim_publisher()?;
/// publisher.publish_state(&state, dt, t);
///
/// let snapshot = channel.latest();
/// if let Some(state) = snapshot.state() {
///     // draw...
/// }
/// ```
pub struct SharedChannel {
    map: MmapMut,
    layout: NonNull<ChannelLayout>,
    torn_reads: AtomicU64,
}

// SAFETY: all shared fields of the layout are atomics; the metadata block is
// written once by the claimed publisher before its length is released.
unsafe impl Send for SharedChannel {}
// SAFETY: see above
unsafe impl Sync for SharedChannel {}

impl SharedChannel {
    /// Creates a channel in anonymous memory, for threads of one process.
    ///
    /// # Errors
    ///
    /// Returns an error when the mapping cannot be created.
    pub fn anonymous(options: ChannelOptions) -> ChannelResult<Arc<Self>> {
        let map = MmapMut::map_anon(CHANNEL_SIZE)?;
        let channel = Self::from_map(map)?;
        channel.initialize(options);
        Ok(Arc::new(channel))
    }

    /// Creates (or truncates) a file-backed channel at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created, sized or mapped.
    pub fn create(path: impl AsRef<Path>, options: ChannelOptions) -> ChannelResult<Arc<Self>> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(CHANNEL_SIZE as u64)?;
        // SAFETY: the file was just truncated and sized by us; other handles
        // only touch it through the atomic layout.
        let map = unsafe { MmapOptions::new().len(CHANNEL_SIZE).map_mut(&file)? };
        let channel = Self::from_map(map)?;
        channel.initialize(options);
        tracing::debug!(path = %path.display(), bytes = CHANNEL_SIZE, "channel created");
        Ok(Arc::new(channel))
    }

    /// Maps an existing file-backed channel created by [`SharedChannel::create`].
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing, too small, or carries a
    /// different magic or layout version.
    pub fn open(path: impl AsRef<Path>) -> ChannelResult<Arc<Self>> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let actual = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
        if actual < CHANNEL_SIZE {
            return Err(ChannelError::RegionTooSmall {
                required: CHANNEL_SIZE,
                actual,
            });
        }
        // SAFETY: the region is only mutated through the atomic layout.
        let map = unsafe { MmapOptions::new().len(CHANNEL_SIZE).map_mut(&file)? };
        let channel = Self::from_map(map)?;
        channel.check_header()?;
        tracing::debug!(path = %path.display(), "channel opened");
        Ok(Arc::new(channel))
    }

    fn from_map(mut map: MmapMut) -> ChannelResult<Self> {
        if map.len() < CHANNEL_SIZE {
            return Err(ChannelError::RegionTooSmall {
                required: CHANNEL_SIZE,
                actual: map.len(),
            });
        }
        // Mappings are page aligned, which satisfies the layout's alignment.
        let layout = NonNull::from(&mut map[..]).cast::<ChannelLayout>();
        Ok(Self {
            map,
            layout,
            torn_reads: AtomicU64::new(0),
        })
    }

    fn initialize(&self, options: ChannelOptions) {
        let layout = self.layout();
        layout.view_index.store(options.initial_view, Ordering::Relaxed);
        layout
            .data_overlay
            .store(u32::from(options.data_overlay), Ordering::Relaxed);
        layout.version.store(CHANNEL_VERSION, Ordering::Relaxed);
        layout.magic.store(CHANNEL_MAGIC, Ordering::Release);
    }

    fn check_header(&self) -> ChannelResult<()> {
        let layout = self.layout();
        let found_magic = layout.magic.load(Ordering::Acquire);
        let found_version = layout.version.load(Ordering::Relaxed);
        if found_magic != CHANNEL_MAGIC || found_version != CHANNEL_VERSION {
            return Err(ChannelError::LayoutMismatch {
                expected_magic: CHANNEL_MAGIC,
                expected_version: CHANNEL_VERSION,
                found_magic,
                found_version,
            });
        }
        Ok(())
    }

    #[inline]
    fn layout(&self) -> &ChannelLayout {
        // SAFETY: `layout` points into `map`, which lives as long as `self`,
        // is at least CHANNEL_SIZE bytes and page aligned. All-zero bytes are a
        // valid ChannelLayout.
        unsafe { self.layout.as_ref() }
    }

    /// Size of the mapped region in bytes.
    #[inline]
    #[must_use]
    pub fn mapped_len(&self) -> usize {
        self.map.len()
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Claims the single publishing side of the channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::PublisherClaimed`] while another publisher,
    /// in this or any other process, is alive.
    pub fn claim_publisher(self: &Arc<Self>) -> ChannelResult<StatePublisher> {
        self.layout()
            .publisher_claimed
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChannelError::PublisherClaimed)?;
        Ok(StatePublisher {
            channel: Arc::clone(self),
        })
    }

    /// Whether a publisher currently holds the claim.
    #[inline]
    #[must_use]
    pub fn is_publisher_claimed(&self) -> bool {
        self.layout().publisher_claimed.load(Ordering::Acquire) != 0
    }

    /// Reads the most recently published frame.
    ///
    /// Never blocks. A copy that stayed inconsistent for every retry is
    /// returned anyway and flagged as torn.
    #[must_use]
    pub fn latest(&self) -> Snapshot {
        let layout = self.layout();
        let mut values = [0.0; FRAME_LEN];
        for _ in 0..READ_RETRIES {
            let index = slot_index(layout.active_slot.load(Ordering::Acquire));
            let slot = &layout.slots[index];
            let before = slot.seq.load(Ordering::Acquire);
            for (value, cell) in values.iter_mut().zip(&slot.values) {
                *value = f64::from_bits(cell.load(Ordering::Relaxed));
            }
            fence(Ordering::Acquire);
            let after = slot.seq.load(Ordering::Relaxed);
            if before == after && before & 1 == 0 {
                return Snapshot {
                    frame: StateFrame::from_array(values),
                    torn: false,
                };
            }
            spin_loop();
        }
        self.torn_reads.fetch_add(1, Ordering::Relaxed);
        Snapshot {
            frame: StateFrame::from_array(values),
            torn: true,
        }
    }

    /// Number of frames published into this region.
    #[inline]
    #[must_use]
    pub fn publish_count(&self) -> u64 {
        self.layout().publish_count.load(Ordering::Acquire)
    }

    /// Number of reads through this handle that returned a torn copy.
    #[inline]
    #[must_use]
    pub fn torn_reads(&self) -> u64 {
        self.torn_reads.load(Ordering::Relaxed)
    }

    // =========================================================================
    // FLAGS
    // =========================================================================

    /// Raises the quit flag. Idempotent.
    #[inline]
    pub fn request_quit(&self) {
        self.layout().quit.store(1, Ordering::Release);
    }

    /// Whether quit has been requested by either side.
    #[inline]
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.layout().quit.load(Ordering::Acquire) != 0
    }

    /// Flips the pause flag and returns the new value.
    #[inline]
    pub fn toggle_pause(&self) -> bool {
        self.layout().pause.fetch_xor(1, Ordering::AcqRel) == 0
    }

    /// Sets the pause flag.
    #[inline]
    pub fn set_paused(&self, paused: bool) {
        self.layout().pause.store(u32::from(paused), Ordering::Release);
    }

    /// Whether the simulation is paused.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.layout().pause.load(Ordering::Acquire) != 0
    }

    /// Selects the active view.
    #[inline]
    pub fn set_view(&self, index: u32) {
        self.layout().view_index.store(index, Ordering::Release);
    }

    /// Index of the active view.
    #[inline]
    #[must_use]
    pub fn view_index(&self) -> u32 {
        self.layout().view_index.load(Ordering::Acquire)
    }

    /// Advances to the next of `count` views, wrapping, and returns it.
    pub fn next_view(&self, count: u32) -> u32 {
        let count = count.max(1);
        let previous = self
            .layout()
            .view_index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| Some(v.wrapping_add(1) % count))
            .unwrap_or_else(|v| v);
        previous.wrapping_add(1) % count
    }

    /// Flips overlay visibility and returns the new value.
    #[inline]
    pub fn toggle_data_overlay(&self) -> bool {
        self.layout().data_overlay.fetch_xor(1, Ordering::AcqRel) == 0
    }

    /// Whether the flight-data overlay is visible.
    #[inline]
    #[must_use]
    pub fn is_data_overlay_visible(&self) -> bool {
        self.layout().data_overlay.load(Ordering::Acquire) != 0
    }

    /// Marks the render side as ready to consume frames.
    #[inline]
    pub fn signal_render_ready(&self) {
        self.layout().render_ready.store(1, Ordering::Release);
    }

    /// Whether the render side has signalled readiness.
    #[inline]
    #[must_use]
    pub fn is_render_ready(&self) -> bool {
        self.layout().render_ready.load(Ordering::Acquire) != 0
    }

    /// Spins until the render side is ready, quit is raised, or `timeout`
    /// elapses.
    #[must_use]
    pub fn wait_for_render_ready(&self, timeout: Duration) -> HandshakeWait {
        spin_until(timeout, || self.is_render_ready() || self.is_quit());
        if self.is_render_ready() {
            HandshakeWait::Ready
        } else if self.is_quit() {
            HandshakeWait::Quit
        } else {
            HandshakeWait::TimedOut
        }
    }

    // =========================================================================
    // CONTROL SETTINGS
    // =========================================================================

    /// Stores one control-surface value for display.
    #[inline]
    pub fn set_control(&self, surface: ControlSurface, value: f64) {
        self.layout().controls[surface.index()].store(value.to_bits(), Ordering::Release);
    }

    /// Displayed value of one control surface.
    #[inline]
    #[must_use]
    pub fn control(&self, surface: ControlSurface) -> f64 {
        f64::from_bits(self.layout().controls[surface.index()].load(Ordering::Acquire))
    }

    /// Stores a control value by its display name.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UnknownControl`] for an unrecognised name.
    pub fn set_control_by_name(&self, name: &str, value: f64) -> ChannelResult<()> {
        let surface: ControlSurface = name.parse()?;
        self.set_control(surface, value);
        Ok(())
    }

    /// All displayed control values.
    #[must_use]
    pub fn control_settings(&self) -> ControlSettings {
        let mut settings = ControlSettings::default();
        for surface in ControlSurface::ALL {
            settings.set(surface, self.control(surface));
        }
        settings
    }

    // =========================================================================
    // GRAPHICS METADATA
    // =========================================================================

    /// Graphics metadata, if the publisher has written it.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored block does not decode.
    pub fn graphics_info(&self) -> ChannelResult<Option<GraphicsInfo>> {
        let layout = self.layout();
        let len = usize::try_from(layout.metadata_len.load(Ordering::Acquire))
            .unwrap_or(METADATA_CAPACITY)
            .min(METADATA_CAPACITY);
        if len == 0 {
            return Ok(None);
        }
        // SAFETY: the block is written once, before `metadata_len` is released,
        // and never again.
        let bytes = unsafe { &(&(*layout.metadata.get()))[..len] };
        let text = String::from_utf8_lossy(bytes);
        Ok(Some(toml::from_str(&text)?))
    }

    /// Spins until graphics metadata is published, quit is raised, or
    /// `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::QuitDuringHandshake`] when quit is raised first,
    /// [`ChannelError::MetadataTimeout`] on timeout, or a decode error.
    pub fn wait_for_graphics_info(&self, timeout: Duration) -> ChannelResult<GraphicsInfo> {
        let mut found = None;
        let mut failure = None;
        spin_until(timeout, || match self.graphics_info() {
            Ok(Some(info)) => {
                found = Some(info);
                true
            }
            Ok(None) => self.is_quit(),
            Err(err) => {
                failure = Some(err);
                true
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        match found {
            Some(info) => Ok(info),
            None if self.is_quit() => Err(ChannelError::QuitDuringHandshake),
            None => Err(ChannelError::MetadataTimeout(timeout)),
        }
    }
}

impl std::fmt::Debug for SharedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedChannel")
            .field("publish_count", &self.publish_count())
            .field("quit", &self.is_quit())
            .field("paused", &self.is_paused())
            .field("view_index", &self.view_index())
            .field("render_ready", &self.is_render_ready())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PUBLISHER
// =============================================================================

/// Exclusive publishing side of a channel.
///
/// Only one can exist per region at a time; the claim is released on drop.
pub struct StatePublisher {
    channel: Arc<SharedChannel>,
}

impl StatePublisher {
    /// The channel this publisher writes to.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Arc<SharedChannel> {
        &self.channel
    }

    /// Publishes one frame as a unit.
    pub fn publish(&mut self, frame: &StateFrame) {
        let layout = self.channel.layout();
        let target = slot_index(layout.active_slot.load(Ordering::Relaxed)) ^ 1;
        let slot = &layout.slots[target];

        let seq = slot.seq.load(Ordering::Relaxed);
        slot.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        for (cell, value) in slot.values.iter().zip(frame.as_array()) {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
        slot.seq.store(seq.wrapping_add(2), Ordering::Release);

        layout.active_slot.store(target as u64, Ordering::Release);
        layout.publish_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Stamps `state` with its timing and the wall clock, publishes it and
    /// returns the frame that was written.
    pub fn publish_state(&mut self, state: &RigidBodyState, dt_physics: f64, t_physics: f64) -> StateFrame {
        let frame = StateFrame {
            state: *state,
            dt_physics,
            t_physics,
            wall_time: wall_clock_seconds(),
        };
        self.publish(&frame);
        frame
    }

    /// Stores every control-surface value for display.
    pub fn publish_control_settings(&mut self, settings: &ControlSettings) {
        for (surface, value) in settings.iter() {
            self.channel.set_control(surface, value);
        }
    }

    /// Writes the write-once graphics metadata block.
    ///
    /// # Errors
    ///
    /// Returns an error when metadata was already published, does not encode,
    /// or does not fit [`METADATA_CAPACITY`].
    pub fn publish_graphics_info(&mut self, info: &GraphicsInfo) -> ChannelResult<()> {
        let layout = self.channel.layout();
        if layout.metadata_len.load(Ordering::Acquire) != 0 {
            return Err(ChannelError::MetadataAlreadyPublished);
        }
        let text = toml::to_string(info)?;
        let bytes = text.as_bytes();
        if bytes.is_empty() || bytes.len() > METADATA_CAPACITY {
            return Err(ChannelError::MetadataTooLarge {
                size: bytes.len(),
                capacity: METADATA_CAPACITY,
            });
        }
        // SAFETY: we hold the publisher claim and the block is unpublished, so
        // no reader looks at it until the length below is released.
        unsafe {
            (&mut (*layout.metadata.get()))[..bytes.len()].copy_from_slice(bytes);
        }
        layout.metadata_len.store(bytes.len() as u64, Ordering::Release);
        tracing::debug!(bytes = bytes.len(), aircraft = %info.name, "graphics metadata published");
        Ok(())
    }
}

impl Drop for StatePublisher {
    fn drop(&mut self) {
        self.channel.layout().publisher_claimed.store(0, Ordering::Release);
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// One read of the channel's state buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    frame: StateFrame,
    torn: bool,
}

impl Snapshot {
    /// The raw 16-scalar frame.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &StateFrame {
        &self.frame
    }

    /// True while no physics step has been published.
    #[inline]
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.frame.state.is_zero()
    }

    /// The published state, or `None` for the sentinel.
    #[inline]
    #[must_use]
    pub fn state(&self) -> Option<RigidBodyState> {
        (!self.is_sentinel()).then_some(self.frame.state)
    }

    /// Whether the copy may mix two publishes.
    #[inline]
    #[must_use]
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    /// Physics step size of the frame.
    #[inline]
    #[must_use]
    pub fn dt_physics(&self) -> f64 {
        self.frame.dt_physics
    }

    /// Simulation time of the frame.
    #[inline]
    #[must_use]
    pub fn t_physics(&self) -> f64 {
        self.frame.t_physics
    }

    /// Wall-clock publish time, seconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub fn wall_time(&self) -> f64 {
        self.frame.wall_time
    }
}

// =============================================================================
// HELPERS
// =============================================================================

#[inline]
fn slot_index(raw: u64) -> usize {
    usize::from(raw & 1 == 1)
}

/// Seconds since the Unix epoch.
#[must_use]
pub fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

fn spin_until(timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    let mut spins = 0u32;
    loop {
        if ready() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        spins = spins.wrapping_add(1);
        if spins % SPINS_PER_YIELD == 0 {
            std::thread::yield_now();
        } else {
            spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sample_info() -> GraphicsInfo {
        GraphicsInfo {
            name: "trainer".to_string(),
            obj_file: "a.obj".to_string(),
            v_shader_file: "a.vs".to_string(),
            f_shader_file: "a.fs".to_string(),
            texture_file: "a.jpg".to_string(),
            l_ref_lat: 10.9,
            l_ref_lon: 1.49,
            position: [0.0, 0.0, -1000.0],
            orientation: [1.0, 0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_fresh_channel_is_sentinel() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let snapshot = channel.latest();
        assert!(snapshot.is_sentinel());
        assert!(snapshot.state().is_none());
        assert!(!snapshot.is_torn());
        assert_eq!(channel.publish_count(), 0);
        assert_eq!(channel.view_index(), 1);
        assert!(channel.is_data_overlay_visible());
        assert!(!channel.is_paused());
        assert!(!channel.is_quit());
    }

    #[test]
    fn test_publish_then_read() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();
        let state = RigidBodyState { u: 50.0, z: -1000.0, ..RigidBodyState::at_rest() };
        let frame = publisher.publish_state(&state, 0.01, 0.01);

        let snapshot = channel.latest();
        assert_eq!(snapshot.frame(), &frame);
        assert_eq!(snapshot.state(), Some(state));
        assert_eq!(snapshot.dt_physics(), 0.01);
        assert!(snapshot.wall_time() > 0.0);
        assert_eq!(channel.publish_count(), 1);

        // Second publish lands in the other slot
        let later = RigidBodyState { u: 51.0, ..state };
        publisher.publish_state(&later, 0.01, 0.02);
        assert_eq!(channel.latest().state(), Some(later));
        assert_eq!(channel.latest().t_physics(), 0.02);
    }

    #[test]
    fn test_sentinel_never_returns() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();
        for i in 0..10 {
            let state = RigidBodyState { x: f64::from(i), ..RigidBodyState::at_rest() };
            publisher.publish_state(&state, 0.0, 0.0);
            assert!(!channel.latest().is_sentinel());
        }
    }

    #[test]
    fn test_single_publisher() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let first = channel.claim_publisher().unwrap();
        assert!(channel.is_publisher_claimed());
        assert!(matches!(channel.claim_publisher(), Err(ChannelError::PublisherClaimed)));
        drop(first);
        assert!(!channel.is_publisher_claimed());
        assert!(channel.claim_publisher().is_ok());
    }

    #[test]
    fn test_flags() {
        let channel = SharedChannel::anonymous(ChannelOptions { initial_view: 0, data_overlay: false }).unwrap();
        assert!(channel.toggle_pause());
        assert!(channel.is_paused());
        assert!(!channel.toggle_pause());
        channel.set_paused(true);
        assert!(channel.is_paused());

        assert!(channel.toggle_data_overlay());
        assert!(channel.is_data_overlay_visible());

        assert_eq!(channel.next_view(2), 1);
        assert_eq!(channel.next_view(2), 0);
        channel.set_view(5);
        assert_eq!(channel.view_index(), 5);

        assert_eq!(channel.wait_for_render_ready(Duration::from_millis(5)), HandshakeWait::TimedOut);
        channel.signal_render_ready();
        assert_eq!(channel.wait_for_render_ready(Duration::ZERO), HandshakeWait::Ready);

        channel.request_quit();
        channel.request_quit();
        assert!(channel.is_quit());
        assert_eq!(channel.wait_for_render_ready(Duration::ZERO), HandshakeWait::Ready);
    }

    #[test]
    fn test_quit_ends_handshake_waits() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        channel.request_quit();

        let start = Instant::now();
        assert_eq!(channel.wait_for_render_ready(Duration::from_secs(60)), HandshakeWait::Quit);
        assert!(matches!(
            channel.wait_for_graphics_info(Duration::from_secs(60)),
            Err(ChannelError::QuitDuringHandshake)
        ));
        assert!(start.elapsed() < Duration::from_secs(5));

        let mut publisher = channel.claim_publisher().unwrap();
        publisher.publish_graphics_info(&sample_info()).unwrap();
        assert_eq!(channel.wait_for_graphics_info(Duration::ZERO).unwrap(), sample_info());
    }

    #[test]
    fn test_control_settings() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();
        let settings = ControlSettings { throttle: 0.7, elevator: -0.05, ..ControlSettings::default() };
        publisher.publish_control_settings(&settings);
        assert_eq!(channel.control_settings(), settings);

        channel.set_control_by_name("Rudder", 0.02).unwrap();
        assert_eq!(channel.control(ControlSurface::Rudder), 0.02);
        assert!(matches!(
            channel.set_control_by_name("canard", 1.0),
            Err(ChannelError::UnknownControl(_))
        ));
    }

    #[test]
    fn test_graphics_info_write_once() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        assert!(channel.graphics_info().unwrap().is_none());
        assert!(matches!(
            channel.wait_for_graphics_info(Duration::from_millis(5)),
            Err(ChannelError::MetadataTimeout(_))
        ));

        let mut publisher = channel.claim_publisher().unwrap();
        publisher.publish_graphics_info(&sample_info()).unwrap();
        assert_eq!(channel.graphics_info().unwrap(), Some(sample_info()));
        assert_eq!(channel.wait_for_graphics_info(Duration::ZERO).unwrap(), sample_info());
        assert!(matches!(
            publisher.publish_graphics_info(&sample_info()),
            Err(ChannelError::MetadataAlreadyPublished)
        ));
    }

    #[test]
    fn test_graphics_info_too_large() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();
        let info = GraphicsInfo { name: "x".repeat(METADATA_CAPACITY), ..sample_info() };
        assert!(matches!(
            publisher.publish_graphics_info(&info),
            Err(ChannelError::MetadataTooLarge { .. })
        ));
        assert!(channel.graphics_info().unwrap().is_none());
    }

    #[test]
    fn test_file_backed_channel_shares_state() {
        let path = std::env::temp_dir().join(format!("aerosync-channel-test-{}", std::process::id()));
        let writer = SharedChannel::create(&path, ChannelOptions::default()).unwrap();
        let reader = SharedChannel::open(&path).unwrap();

        let mut publisher = writer.claim_publisher().unwrap();
        assert!(reader.is_publisher_claimed());
        let state = RigidBodyState { u: 42.0, ..RigidBodyState::at_rest() };
        publisher.publish_state(&state, 0.02, 1.0);
        reader.toggle_pause();

        assert_eq!(reader.latest().state(), Some(state));
        assert!(writer.is_paused());

        drop(publisher);
        drop(writer);
        drop(reader);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_open_rejects_foreign_file() {
        let path = std::env::temp_dir().join(format!("aerosync-foreign-test-{}", std::process::id()));
        std::fs::write(&path, vec![0xAB; CHANNEL_SIZE]).unwrap();
        assert!(matches!(
            SharedChannel::open(&path),
            Err(ChannelError::LayoutMismatch { .. })
        ));
        std::fs::write(&path, [0u8; 8]).unwrap();
        assert!(matches!(
            SharedChannel::open(&path),
            Err(ChannelError::RegionTooSmall { .. })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_concurrent_reads_are_consistent() {
        let channel = SharedChannel::anonymous(ChannelOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();

        let writer = thread::spawn(move || {
            for n in 1..=20_000u32 {
                let value = f64::from(n);
                publisher.publish(&StateFrame::from_array([value; FRAME_LEN]));
            }
        });

        while !writer.is_finished() {
            let snapshot = channel.latest();
            if snapshot.is_torn() {
                continue;
            }
            let values = snapshot.frame().as_array();
            assert!(values.iter().all(|v| *v == values[0]), "mixed frame {values:?}");
        }
        writer.join().unwrap();
        assert_eq!(channel.publish_count(), 20_000);
        assert_eq!(channel.latest().frame().as_array()[0], 20_000.0);
    }
}
