//! Media engine boundary
//!
//! The bridge never decodes or renders anything itself. It opens one
//! [`MediaPipeline`] per session through a [`MediaEngine`] and forwards
//! commands to it. The engine reports readiness, buffering, end of stream and
//! failures asynchronously by sending [`EngineNotification`]s on the channel
//! handed to it at open time; the session drains that channel on its own task.

pub mod simulated;
pub mod source;

pub use simulated::{MediaInfo, SimulatedEngine, SimulatedEngineConfig};
pub use source::{MediaSource, SourceDescriptor, SourceLocation, StreamFormat};

use evp_common::Handle;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::surface::SurfaceEntry;

/// Asynchronous notifications from a pipeline to its session
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotification {
    /// Media loaded; duration and frame size are known
    Ready {
        duration_ms: u64,
        width: u32,
        height: u32,
        /// Clockwise rotation of the encoded frames (0, 90, 180 or 270)
        rotation_degrees: u32,
    },

    BufferingStarted,

    BufferingEnded,

    /// Playback reached the end of the media. `restarted` is true when the
    /// pipeline already rewound to the start because looping was enabled.
    EndOfStream { restarted: bool },

    /// Unrecoverable decode/render failure
    Failed { message: String },
}

/// Sending half of a session's notification channel
pub type NotificationSender = mpsc::UnboundedSender<EngineNotification>;

/// Everything an engine needs to open a pipeline
pub struct OpenRequest<'a> {
    pub handle: Handle,
    pub source: &'a MediaSource,
    pub surface: &'a dyn SurfaceEntry,
    /// Audio focus policy: mix with other apps instead of taking focus
    pub mix_with_others: bool,
    pub notifications: NotificationSender,
}

/// One decode/render pipeline bound to a surface
pub trait MediaPipeline: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, position_ms: u64);
    fn set_volume(&mut self, volume: f64);
    fn set_speed(&mut self, speed: f64);
    fn set_looping(&mut self, looping: bool);

    /// Current playback position in milliseconds
    fn current_position(&self) -> u64;

    /// End of the buffered range in milliseconds
    fn buffered_position(&self) -> u64;

    /// Stop decoding and free engine resources. Called at most once.
    fn release(&mut self) -> Result<()>;
}

/// Native media engine
pub trait MediaEngine: Send + Sync {
    /// Open a pipeline. Readiness is reported later through
    /// `request.notifications`; this call must not block on it.
    fn open(&self, request: OpenRequest<'_>) -> Result<Box<dyn MediaPipeline>>;
}
