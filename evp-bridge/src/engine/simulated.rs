//! Clock-driven simulated media engine
//!
//! Stands in for a native decoder: each pipeline tracks a virtual playback
//! position that moves only when [`SimulatedEngine::advance`] is called,
//! either by a test or by the clock task started with
//! [`SimulatedEngine::spawn_clock`]. Media properties come from a small
//! catalog keyed by URI, with a default for unknown sources.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use evp_common::Handle;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{
    EngineNotification, MediaEngine, MediaPipeline, MediaSource, NotificationSender, OpenRequest,
};
use crate::error::{Error, Result};

/// Properties of one simulated media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    pub duration_ms: u64,
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u32,
}

impl MediaInfo {
    pub fn new(duration_ms: u64, width: u32, height: u32) -> Self {
        Self {
            duration_ms,
            width,
            height,
            rotation_degrees: 0,
        }
    }

    pub fn rotated(mut self, degrees: u32) -> Self {
        self.rotation_degrees = degrees;
        self
    }
}

impl Default for MediaInfo {
    fn default() -> Self {
        Self::new(10_000, 1280, 720)
    }
}

/// Behaviour of the simulated engine
#[derive(Debug, Clone)]
pub struct SimulatedEngineConfig {
    /// Media used for URIs not in the catalog
    pub default_media: MediaInfo,
    /// How far ahead of the position the buffer reaches
    pub buffer_ahead_ms: u64,
    /// Report readiness as soon as a pipeline is opened
    pub auto_ready: bool,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            default_media: MediaInfo::default(),
            buffer_ahead_ms: 5_000,
            auto_ready: true,
        }
    }
}

/// Mutable state of one simulated pipeline
#[derive(Debug)]
struct PipelineState {
    media: MediaInfo,
    position_ms: f64,
    playing: bool,
    looping: bool,
    speed: f64,
    volume: f64,
    ready: bool,
    mix_with_others: bool,
    notifications: NotificationSender,
}

impl PipelineState {
    fn notify(&self, notification: EngineNotification) {
        // Session already gone; nothing left to inform
        let _ = self.notifications.send(notification);
    }

    fn announce_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.notify(EngineNotification::BufferingStarted);
        self.notify(EngineNotification::Ready {
            duration_ms: self.media.duration_ms,
            width: self.media.width,
            height: self.media.height,
            rotation_degrees: self.media.rotation_degrees,
        });
        self.notify(EngineNotification::BufferingEnded);
    }

    fn buffered_ms(&self, buffer_ahead_ms: u64) -> u64 {
        if !self.ready {
            return 0;
        }
        (self.position_ms as u64)
            .saturating_add(buffer_ahead_ms)
            .min(self.media.duration_ms)
    }

    /// Move the virtual clock forward by `elapsed_ms` of wall time
    fn tick(&mut self, elapsed_ms: f64) {
        if !self.ready || !self.playing {
            return;
        }

        let duration = self.media.duration_ms as f64;
        self.position_ms += elapsed_ms * self.speed;

        if self.position_ms < duration {
            return;
        }

        if self.looping && duration > 0.0 {
            self.position_ms %= duration;
            self.notify(EngineNotification::EndOfStream { restarted: true });
        } else {
            self.position_ms = duration;
            self.playing = false;
            self.notify(EngineNotification::EndOfStream { restarted: false });
        }
    }
}

type PipelineTable = Mutex<HashMap<Handle, Arc<Mutex<PipelineState>>>>;

#[derive(Debug)]
struct EngineShared {
    config: SimulatedEngineConfig,
    catalog: Mutex<HashMap<String, MediaInfo>>,
    failures: Mutex<HashMap<String, String>>,
    pipelines: PipelineTable,
}

/// Simulated [`MediaEngine`]; cheap to clone, clones share all pipelines
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    shared: Arc<EngineShared>,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulatedEngineConfig::default())
    }
}

impl SimulatedEngine {
    pub fn new(config: SimulatedEngineConfig) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                config,
                catalog: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register media properties for an exact URI
    pub fn with_media(self, uri: impl Into<String>, media: MediaInfo) -> Self {
        self.shared.catalog.lock().insert(uri.into(), media);
        self
    }

    /// Make pipelines opened for `uri` fail right after opening
    pub fn with_failure(self, uri: impl Into<String>, message: impl Into<String>) -> Self {
        self.shared.failures.lock().insert(uri.into(), message.into());
        self
    }

    fn pipeline(&self, handle: Handle) -> Option<Arc<Mutex<PipelineState>>> {
        self.shared.pipelines.lock().get(&handle).cloned()
    }

    fn all_pipelines(&self) -> Vec<Arc<Mutex<PipelineState>>> {
        self.shared.pipelines.lock().values().cloned().collect()
    }

    /// Advance every playing pipeline by `elapsed` of wall time
    pub fn advance(&self, elapsed: Duration) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        for pipeline in self.all_pipelines() {
            pipeline.lock().tick(elapsed_ms);
        }
    }

    /// Report readiness for a pipeline opened with `auto_ready` disabled
    pub fn complete_loading(&self, handle: Handle) -> bool {
        match self.pipeline(handle) {
            Some(pipeline) => {
                pipeline.lock().announce_ready();
                true
            }
            None => false,
        }
    }

    pub fn start_buffering(&self, handle: Handle) -> bool {
        self.send(handle, EngineNotification::BufferingStarted)
    }

    pub fn finish_buffering(&self, handle: Handle) -> bool {
        self.send(handle, EngineNotification::BufferingEnded)
    }

    /// Inject an unrecoverable failure
    pub fn fail(&self, handle: Handle, message: impl Into<String>) -> bool {
        self.send(
            handle,
            EngineNotification::Failed {
                message: message.into(),
            },
        )
    }

    fn send(&self, handle: Handle, notification: EngineNotification) -> bool {
        match self.pipeline(handle) {
            Some(pipeline) => {
                pipeline.lock().notify(notification);
                true
            }
            None => false,
        }
    }

    /// Number of pipelines opened and not yet released
    pub fn open_pipelines(&self) -> usize {
        self.shared.pipelines.lock().len()
    }

    pub fn is_open(&self, handle: Handle) -> bool {
        self.shared.pipelines.lock().contains_key(&handle)
    }

    pub fn position_of(&self, handle: Handle) -> Option<u64> {
        self.pipeline(handle).map(|p| p.lock().position_ms as u64)
    }

    pub fn volume_of(&self, handle: Handle) -> Option<f64> {
        self.pipeline(handle).map(|p| p.lock().volume)
    }

    pub fn speed_of(&self, handle: Handle) -> Option<f64> {
        self.pipeline(handle).map(|p| p.lock().speed)
    }

    pub fn is_playing(&self, handle: Handle) -> Option<bool> {
        self.pipeline(handle).map(|p| p.lock().playing)
    }

    /// Audio focus policy the pipeline was opened with
    pub fn mix_with_others_of(&self, handle: Handle) -> Option<bool> {
        self.pipeline(handle).map(|p| p.lock().mix_with_others)
    }

    /// Drive the virtual clock from real time until the returned task is aborted
    pub fn spawn_clock(&self, tick: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        info!("Simulated engine clock running every {:?}", tick);

        tokio::spawn(async move {
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = Instant::now();

            loop {
                ticker.tick().await;
                let now = Instant::now();
                engine.advance(now.duration_since(last));
                last = now;
            }
        })
    }
}

impl MediaEngine for SimulatedEngine {
    fn open(&self, request: OpenRequest<'_>) -> Result<Box<dyn MediaPipeline>> {
        if request.surface.id() != request.handle {
            return Err(Error::Engine(format!(
                "surface {} does not belong to handle {}",
                request.surface.id(),
                request.handle
            )));
        }

        let uri = &request.source.uri;
        let media = self
            .shared
            .catalog
            .lock()
            .get(uri)
            .copied()
            .unwrap_or(self.shared.config.default_media);

        let mut state = PipelineState {
            media,
            position_ms: 0.0,
            playing: false,
            looping: false,
            speed: 1.0,
            volume: 1.0,
            ready: false,
            mix_with_others: request.mix_with_others,
            notifications: request.notifications,
        };

        if let Some(message) = self.shared.failures.lock().get(uri) {
            warn!("Simulated failure for {}: {}", uri, message);
            state.notify(EngineNotification::Failed {
                message: message.clone(),
            });
        } else if self.shared.config.auto_ready {
            state.announce_ready();
        }

        let state = Arc::new(Mutex::new(state));
        self.shared
            .pipelines
            .lock()
            .insert(request.handle, Arc::clone(&state));
        debug!(
            "Opened simulated pipeline {} for {} ({:?}, {:?})",
            request.handle, uri, request.source.format, request.source.location
        );

        Ok(Box::new(SimulatedPipeline {
            handle: request.handle,
            state,
            engine: Arc::downgrade(&self.shared),
        }))
    }
}

/// Pipeline handed out by [`SimulatedEngine`]
#[derive(Debug)]
pub struct SimulatedPipeline {
    handle: Handle,
    state: Arc<Mutex<PipelineState>>,
    engine: Weak<EngineShared>,
}

impl SimulatedPipeline {
    fn buffer_ahead_ms(&self) -> u64 {
        self.engine
            .upgrade()
            .map(|engine| engine.config.buffer_ahead_ms)
            .unwrap_or(0)
    }
}

impl MediaPipeline for SimulatedPipeline {
    fn play(&mut self) {
        self.state.lock().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().playing = false;
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut state = self.state.lock();
        state.position_ms = position_ms.min(state.media.duration_ms) as f64;
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn set_speed(&mut self, speed: f64) {
        self.state.lock().speed = speed;
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn current_position(&self) -> u64 {
        self.state.lock().position_ms as u64
    }

    fn buffered_position(&self) -> u64 {
        let ahead = self.buffer_ahead_ms();
        self.state.lock().buffered_ms(ahead)
    }

    fn release(&mut self) -> Result<()> {
        if let Some(engine) = self.engine.upgrade() {
            engine.pipelines.lock().remove(&self.handle);
        }
        self.state.lock().playing = false;
        debug!("Released simulated pipeline {}", self.handle);
        Ok(())
    }
}
