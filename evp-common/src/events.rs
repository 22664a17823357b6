//! Event types for the EVP per-session event streams
//!
//! Every session publishes [`VideoEvent`]s on its own stream. The JSON form is
//! internally tagged by `event`, e.g. `{"event":"bufferingUpdate","values":[[0,1500]]}`.

use serde::{Deserialize, Serialize};

/// Error code attached to engine failure events
pub const VIDEO_ERROR_CODE: &str = "VideoError";

/// Events a playback session publishes to its subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum VideoEvent {
    /// Engine reported the media ready to play
    #[serde(rename_all = "camelCase")]
    Initialized {
        /// Media duration in milliseconds
        duration: u64,
        width: u32,
        height: u32,
        /// Rotation the renderer must apply, present only for upside-down media
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation_correction: Option<u32>,
    },

    /// Engine started buffering
    BufferingStart,

    /// Buffered ranges as `[start_ms, end_ms]` pairs
    BufferingUpdate { values: Vec<[u64; 2]> },

    /// Engine finished buffering
    BufferingEnd,

    /// Playback reached the end of the media (also sent when looping restarts)
    Completed,

    /// Unrecoverable engine failure; the session is disposed afterwards
    Error { code: String, message: String },
}

impl VideoEvent {
    /// Event name used on the wire (SSE `event:` field)
    pub fn kind(&self) -> &'static str {
        match self {
            VideoEvent::Initialized { .. } => "initialized",
            VideoEvent::BufferingStart => "bufferingStart",
            VideoEvent::BufferingUpdate { .. } => "bufferingUpdate",
            VideoEvent::BufferingEnd => "bufferingEnd",
            VideoEvent::Completed => "completed",
            VideoEvent::Error { .. } => "error",
        }
    }

    /// Buffering update covering `[0, buffered_ms]`
    pub fn buffered_up_to(buffered_ms: u64) -> Self {
        VideoEvent::BufferingUpdate {
            values: vec![[0, buffered_ms]],
        }
    }

    /// Engine failure event with the standard code and message prefix
    pub fn engine_error(detail: impl std::fmt::Display) -> Self {
        VideoEvent::Error {
            code: VIDEO_ERROR_CODE.to_string(),
            message: format!("Video player had error {}", detail),
        }
    }
}

/// Lifecycle status of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Uninitialized,
    Initializing,
    Ready,
    Playing,
    Paused,
    Ended,
    Disposed,
}

impl PlaybackStatus {
    /// States in which the media is loaded and the position is meaningful
    pub fn is_seekable(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Ready | PlaybackStatus::Playing | PlaybackStatus::Paused
        )
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaybackStatus::Uninitialized => "uninitialized",
            PlaybackStatus::Initializing => "initializing",
            PlaybackStatus::Ready => "ready",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Ended => "ended",
            PlaybackStatus::Disposed => "disposed",
        };
        f.write_str(s)
    }
}
