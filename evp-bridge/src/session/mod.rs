//! Playback session
//!
//! A [`Session`] owns one media pipeline, its output surface and its event
//! bridge. Commands run on the caller's context; engine notifications are
//! drained by a per-session tokio task. Both paths go through the same
//! session lock, and every event is emitted while holding it, so disposal
//! (which closes the bridge under that lock) guarantees no event is delivered
//! after the session reaches `Disposed`.

pub mod bridge;
pub mod state;

pub use bridge::EventBridge;
pub use state::SessionState;

use std::sync::{Arc, Weak};

use evp_common::messages::SessionSnapshot;
use evp_common::{Handle, PlaybackStatus, VideoEvent};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{EngineNotification, MediaEngine, MediaPipeline, MediaSource, OpenRequest};
use crate::error::Result;
use crate::options::PlayerOptions;
use crate::surface::SurfaceEntry;

/// Resources and state guarded by the session lock
struct SessionCore {
    state: SessionState,
    pipeline: Option<Box<dyn MediaPipeline>>,
    surface: Option<Box<dyn SurfaceEntry>>,
}

struct SessionInner {
    handle: Handle,
    source: MediaSource,
    options: PlayerOptions,
    bridge: EventBridge,
    core: Mutex<SessionCore>,
}

/// One playback pipeline bound to one handle
pub struct Session {
    inner: Arc<SessionInner>,
    pump: Option<JoinHandle<()>>,
}

impl Session {
    /// Open a pipeline for `source` rendering into `surface`.
    ///
    /// Returns as soon as the engine accepted the pipeline; readiness arrives
    /// later as an `initialized` event. Must be called within a Tokio runtime.
    /// On failure the surface is released before returning.
    pub fn open(
        mut surface: Box<dyn SurfaceEntry>,
        source: MediaSource,
        options: PlayerOptions,
        engine: &dyn MediaEngine,
    ) -> Result<Self> {
        let handle = surface.id();
        let (tx, rx) = mpsc::unbounded_channel();

        let opened = engine.open(OpenRequest {
            handle,
            source: &source,
            surface: &*surface,
            mix_with_others: options.mix_with_others,
            notifications: tx,
        });
        let pipeline = match opened {
            Ok(pipeline) => pipeline,
            Err(e) => {
                if let Err(release_err) = surface.release() {
                    warn!("Session {}: surface release failed: {}", handle, release_err);
                }
                return Err(e);
            }
        };

        let mut state = SessionState::default();
        state.begin_initializing();

        let inner = Arc::new(SessionInner {
            handle,
            source,
            options,
            bridge: EventBridge::new(handle),
            core: Mutex::new(SessionCore {
                state,
                pipeline: Some(pipeline),
                surface: Some(surface),
            }),
        });

        let pump = tokio::spawn(pump_notifications(Arc::downgrade(&inner), rx));
        info!("Session {} opened for {}", handle, inner.source.uri);

        Ok(Self {
            inner,
            pump: Some(pump),
        })
    }

    pub fn handle(&self) -> Handle {
        self.inner.handle
    }

    pub fn source(&self) -> &MediaSource {
        &self.inner.source
    }

    /// Options snapshot taken when the session was created
    pub fn options(&self) -> PlayerOptions {
        self.inner.options
    }

    pub fn status(&self) -> PlaybackStatus {
        self.inner.core.lock().state.status
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.core.lock().state.is_disposed()
    }

    /// Attach the event subscriber (see [`EventBridge::subscribe`])
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<VideoEvent>> {
        self.inner.bridge.subscribe()
    }

    pub fn play(&self) {
        let mut core = self.inner.core.lock();
        if core.state.start_playing() {
            if let Some(pipeline) = core.pipeline.as_mut() {
                pipeline.play();
            }
            debug!("Session {}: playing", self.inner.handle);
        }
    }

    pub fn pause(&self) {
        let mut core = self.inner.core.lock();
        if core.state.pause() {
            let position = core.pipeline.as_mut().map(|pipeline| {
                pipeline.pause();
                pipeline.current_position()
            });
            if let Some(position) = position {
                core.state.position_ms = position;
            }
            debug!("Session {}: paused", self.inner.handle);
        }
    }

    pub fn seek_to(&self, position_ms: i64) {
        let mut core = self.inner.core.lock();
        let Some(target) = core.state.seek_target(position_ms) else {
            debug!(
                "Session {}: seek ignored in state {}",
                self.inner.handle, core.state.status
            );
            return;
        };
        if let Some(pipeline) = core.pipeline.as_mut() {
            pipeline.seek_to(target);
        }
        core.state.position_ms = target;
    }

    pub fn set_looping(&self, looping: bool) {
        let mut core = self.inner.core.lock();
        if core.state.is_disposed() {
            return;
        }
        core.state.looping = looping;
        if let Some(pipeline) = core.pipeline.as_mut() {
            pipeline.set_looping(looping);
        }
    }

    /// Set the volume, clamped into `[0, 1]`
    pub fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = state::clamp_volume(volume)?;
        let mut core = self.inner.core.lock();
        if core.state.is_disposed() {
            return Ok(());
        }
        core.state.volume = volume;
        if let Some(pipeline) = core.pipeline.as_mut() {
            pipeline.set_volume(volume);
        }
        Ok(())
    }

    /// Set the playback rate; non-positive rates are rejected
    pub fn set_playback_speed(&self, speed: f64) -> Result<()> {
        let speed = state::validate_speed(speed)?;
        let mut core = self.inner.core.lock();
        if core.state.is_disposed() {
            return Ok(());
        }
        core.state.speed = speed;
        if let Some(pipeline) = core.pipeline.as_mut() {
            pipeline.set_speed(speed);
        }
        Ok(())
    }

    /// Current position in milliseconds. Also publishes a `bufferingUpdate`
    /// so pollers also observe buffering progress.
    pub fn position(&self) -> u64 {
        let mut core = self.inner.core.lock();
        if core.state.is_disposed() {
            return 0;
        }

        let (position, buffered) = match core.pipeline.as_ref() {
            Some(pipeline) => (pipeline.current_position(), pipeline.buffered_position()),
            None => (core.state.position_ms, 0),
        };
        core.state.position_ms = position;
        self.inner.bridge.emit(VideoEvent::buffered_up_to(buffered));

        position
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let core = self.inner.core.lock();
        SessionSnapshot {
            texture_id: self.inner.handle,
            status: core.state.status,
            position: core
                .pipeline
                .as_ref()
                .map(|p| p.current_position())
                .unwrap_or(core.state.position_ms),
            duration: core.state.duration_ms,
            volume: core.state.volume,
            speed: core.state.speed,
            is_looping: core.state.looping,
            mix_with_others: self.inner.options.mix_with_others,
        }
    }

    /// Release pipeline and surface; any state → Disposed. Idempotent.
    pub fn dispose(&mut self) {
        self.inner.dispose();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.inner.handle)
            .field("source", &self.inner.source.uri)
            .field("status", &self.status())
            .finish()
    }
}

impl SessionInner {
    fn dispose(&self) {
        let mut core = self.core.lock();
        self.dispose_locked(&mut core);
    }

    fn dispose_locked(&self, core: &mut SessionCore) {
        if !core.state.dispose() {
            return;
        }

        // Close first: nothing may reach the subscriber once Disposed
        self.bridge.close();

        if let Some(mut pipeline) = core.pipeline.take() {
            if let Err(e) = pipeline.release() {
                warn!("Session {}: pipeline release failed: {}", self.handle, e);
            }
        }
        if let Some(mut surface) = core.surface.take() {
            if let Err(e) = surface.release() {
                warn!("Session {}: surface release failed: {}", self.handle, e);
            }
        }
        info!("Session {} disposed", self.handle);
    }

    /// Apply one engine notification. Returns false once the session is
    /// disposed and the notification channel should be abandoned.
    fn handle_notification(&self, notification: EngineNotification) -> bool {
        let mut core = self.core.lock();
        if core.state.is_disposed() {
            return false;
        }

        match notification {
            EngineNotification::Ready {
                duration_ms,
                width,
                height,
                rotation_degrees,
            } => {
                if core.state.mark_ready(duration_ms) {
                    let (width, height) = match rotation_degrees {
                        90 | 270 => (height, width),
                        _ => (width, height),
                    };
                    let rotation_correction = (rotation_degrees == 180).then_some(180);
                    info!(
                        "Session {} initialized: {} ms, {}x{}",
                        self.handle, duration_ms, width, height
                    );
                    self.bridge.emit(VideoEvent::Initialized {
                        duration: duration_ms,
                        width,
                        height,
                        rotation_correction,
                    });
                }
            }

            EngineNotification::BufferingStarted => {
                if !core.state.buffering {
                    core.state.buffering = true;
                    let buffered = core
                        .pipeline
                        .as_ref()
                        .map(|p| p.buffered_position())
                        .unwrap_or(0);
                    self.bridge.emit(VideoEvent::BufferingStart);
                    self.bridge.emit(VideoEvent::buffered_up_to(buffered));
                }
            }

            EngineNotification::BufferingEnded => {
                if core.state.buffering {
                    core.state.buffering = false;
                    self.bridge.emit(VideoEvent::BufferingEnd);
                }
            }

            EngineNotification::EndOfStream { restarted } => {
                if core.state.reach_end() {
                    self.bridge.emit(VideoEvent::Completed);

                    let looping = core.state.looping;
                    let end_ms = core.state.position_ms;
                    if let Some(pipeline) = core.pipeline.as_mut() {
                        if looping && !restarted {
                            pipeline.seek_to(0);
                            pipeline.play();
                        } else if !looping {
                            // The pipeline may already have wrapped if looping
                            // was switched off after it restarted
                            pipeline.pause();
                            pipeline.seek_to(end_ms);
                        }
                    }
                    debug!(
                        "Session {}: end of stream, now {}",
                        self.handle, core.state.status
                    );
                }
            }

            EngineNotification::Failed { message } => {
                warn!("Session {}: engine failure: {}", self.handle, message);
                self.bridge.emit(VideoEvent::engine_error(&message));
                self.dispose_locked(&mut core);
                return false;
            }
        }

        true
    }
}

/// Drain engine notifications until the session is gone or disposed
async fn pump_notifications(
    inner: Weak<SessionInner>,
    mut rx: mpsc::UnboundedReceiver<EngineNotification>,
) {
    while let Some(notification) = rx.recv().await {
        let Some(session) = inner.upgrade() else {
            break;
        };
        if !session.handle_notification(notification) {
            break;
        }
    }
}
