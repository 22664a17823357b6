//! Session state machine
//!
//! `Uninitialized → Initializing → Ready ⇄ Playing ⇄ Paused`, with terminal
//! `Ended` (end of stream without looping) and `Disposed` (from anywhere).
//! Transition methods return whether the transition happened so callers only
//! touch the pipeline on real changes.

use evp_common::PlaybackStatus;

use crate::error::{Error, Result};

pub const DEFAULT_VOLUME: f64 = 1.0;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Clamp a volume into `[0, 1]`; NaN has no meaningful clamp and is rejected
pub fn clamp_volume(volume: f64) -> Result<f64> {
    if volume.is_nan() {
        return Err(Error::invalid_argument("volume must be a number"));
    }
    Ok(volume.clamp(0.0, 1.0))
}

/// Playback speed must be a positive rate (NaN compares false and is rejected)
pub fn validate_speed(speed: f64) -> Result<f64> {
    if speed > 0.0 {
        Ok(speed)
    } else {
        Err(Error::invalid_argument(format!(
            "playback speed must be positive, got {}",
            speed
        )))
    }
}

/// Mutable playback attributes of one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: PlaybackStatus,
    pub looping: bool,
    pub volume: f64,
    pub speed: f64,
    /// Last known position in milliseconds
    pub position_ms: u64,
    /// Known once the engine reports readiness
    pub duration_ms: Option<u64>,
    pub buffering: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Uninitialized,
            looping: false,
            volume: DEFAULT_VOLUME,
            speed: DEFAULT_SPEED,
            position_ms: 0,
            duration_ms: None,
            buffering: false,
        }
    }
}

impl SessionState {
    pub fn is_disposed(&self) -> bool {
        self.status == PlaybackStatus::Disposed
    }

    /// Pipeline opened, waiting for the engine
    pub fn begin_initializing(&mut self) -> bool {
        self.transition(PlaybackStatus::Uninitialized, PlaybackStatus::Initializing)
    }

    /// Engine reported readiness
    pub fn mark_ready(&mut self, duration_ms: u64) -> bool {
        if self.transition(PlaybackStatus::Initializing, PlaybackStatus::Ready) {
            self.duration_ms = Some(duration_ms);
            true
        } else {
            false
        }
    }

    /// Ready/Paused → Playing
    pub fn start_playing(&mut self) -> bool {
        match self.status {
            PlaybackStatus::Ready | PlaybackStatus::Paused => {
                self.status = PlaybackStatus::Playing;
                true
            }
            _ => false,
        }
    }

    /// Playing → Paused
    pub fn pause(&mut self) -> bool {
        self.transition(PlaybackStatus::Playing, PlaybackStatus::Paused)
    }

    /// Seek target clamped to `[0, duration]`, or None when seeking is not
    /// valid in the current state
    pub fn seek_target(&self, position_ms: i64) -> Option<u64> {
        if !self.status.is_seekable() {
            return None;
        }
        let duration = self.duration_ms.unwrap_or(0);
        Some((position_ms.max(0) as u64).min(duration))
    }

    /// End of stream while Playing. Returns false when not Playing.
    /// Looping sessions rewind and keep playing, others end.
    pub fn reach_end(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        if self.looping {
            self.position_ms = 0;
        } else {
            self.status = PlaybackStatus::Ended;
            self.position_ms = self.duration_ms.unwrap_or(self.position_ms);
        }
        true
    }

    /// Any state → Disposed. Returns false if already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.status = PlaybackStatus::Disposed;
        self.buffering = false;
        true
    }

    fn transition(&mut self, from: PlaybackStatus, to: PlaybackStatus) -> bool {
        if self.status == from {
            self.status = to;
            true
        } else {
            false
        }
    }
}
