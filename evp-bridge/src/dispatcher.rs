//! Command dispatcher
//!
//! Entry point for every host command. Commands naming an unknown handle are
//! silent no-ops (queries answer with a neutral value); only argument
//! validation errors reach the caller.

use std::sync::Arc;

use evp_common::messages::{
    CreateMessage, LoopingMessage, MixWithOthersMessage, PlaybackSpeedMessage, PositionMessage,
    SessionSnapshot, TextureMessage, VolumeMessage,
};
use evp_common::{Handle, VideoEvent};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::assets::AssetResolver;
use crate::engine::{MediaEngine, SourceDescriptor};
use crate::error::Result;
use crate::options::GlobalOptions;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::surface::SurfaceAllocator;

/// Routes host commands to sessions
pub struct CommandDispatcher {
    registry: SessionRegistry,
    options: GlobalOptions,
    surfaces: Arc<dyn SurfaceAllocator>,
    engine: Arc<dyn MediaEngine>,
    assets: Arc<dyn AssetResolver>,
}

impl CommandDispatcher {
    pub fn new(
        surfaces: Arc<dyn SurfaceAllocator>,
        engine: Arc<dyn MediaEngine>,
        assets: Arc<dyn AssetResolver>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            options: GlobalOptions::default(),
            surfaces,
            engine,
            assets,
        }
    }

    /// Create a session and return its handle.
    ///
    /// The source is validated before a surface is allocated, so a rejected
    /// request leaves no resources behind. Must be called within a Tokio
    /// runtime.
    pub fn create(&self, msg: CreateMessage) -> Result<TextureMessage> {
        let descriptor = SourceDescriptor::try_from(&msg)?;
        let source = descriptor.resolve(self.assets.as_ref())?;

        let surface = self.surfaces.allocate()?;
        let session = Session::open(surface, source, self.options.snapshot(), self.engine.as_ref())?;
        let texture_id = self.registry.register(session);

        info!("Created session {}", texture_id);
        Ok(TextureMessage { texture_id })
    }

    pub fn dispose(&self, msg: TextureMessage) {
        if self.registry.remove(msg.texture_id) {
            info!("Disposed session {}", msg.texture_id);
        }
    }

    pub fn play(&self, msg: TextureMessage) {
        self.with_session(msg.texture_id, "play", |s| s.play());
    }

    pub fn pause(&self, msg: TextureMessage) {
        self.with_session(msg.texture_id, "pause", |s| s.pause());
    }

    pub fn seek_to(&self, msg: PositionMessage) {
        self.with_session(msg.texture_id, "seekTo", |s| s.seek_to(msg.position));
    }

    /// Current position; 0 for an unknown handle
    pub fn position(&self, msg: TextureMessage) -> PositionMessage {
        let position = self
            .with_session(msg.texture_id, "position", |s| s.position())
            .unwrap_or(0);

        PositionMessage {
            texture_id: msg.texture_id,
            position: i64::try_from(position).unwrap_or(i64::MAX),
        }
    }

    pub fn set_looping(&self, msg: LoopingMessage) {
        self.with_session(msg.texture_id, "setLooping", |s| {
            s.set_looping(msg.is_looping)
        });
    }

    pub fn set_volume(&self, msg: VolumeMessage) -> Result<()> {
        self.with_session(msg.texture_id, "setVolume", |s| s.set_volume(msg.volume))
            .unwrap_or(Ok(()))
    }

    pub fn set_playback_speed(&self, msg: PlaybackSpeedMessage) -> Result<()> {
        self.with_session(msg.texture_id, "setPlaybackSpeed", |s| {
            s.set_playback_speed(msg.speed)
        })
        .unwrap_or(Ok(()))
    }

    /// Applies to sessions created after this call
    pub fn set_mix_with_others(&self, msg: MixWithOthersMessage) {
        self.options.set_mix_with_others(msg.mix_with_others);
    }

    /// Attach the event subscriber for `handle`; None when unknown
    pub fn subscribe(&self, handle: Handle) -> Option<mpsc::UnboundedReceiver<VideoEvent>> {
        self.registry.with_session(handle, |s| s.subscribe()).flatten()
    }

    pub fn snapshot(&self, handle: Handle) -> Option<SessionSnapshot> {
        self.registry.with_session(handle, |s| s.snapshot())
    }

    /// Dispose every session, e.g. when the host detaches
    pub fn dispose_all(&self) -> usize {
        self.registry.remove_all()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn global_options(&self) -> &GlobalOptions {
        &self.options
    }

    fn with_session<R>(&self, handle: Handle, command: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let result = self.registry.with_session(handle, f);
        if result.is_none() {
            debug!("{} for unknown handle {} ignored", command, handle);
        }
        result
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("sessions", &self.registry.len())
            .field("options", &self.options.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BundleAssetResolver;
    use crate::engine::SimulatedEngine;
    use crate::error::Error;
    use crate::surface::LocalSurfaceAllocator;

    fn dispatcher() -> (CommandDispatcher, Arc<LocalSurfaceAllocator>) {
        let surfaces = Arc::new(LocalSurfaceAllocator::new());
        let dispatcher = CommandDispatcher::new(
            surfaces.clone(),
            Arc::new(SimulatedEngine::default()),
            Arc::new(BundleAssetResolver::default()),
        );
        (dispatcher, surfaces)
    }

    #[tokio::test]
    async fn test_create_registers_session() {
        let (dispatcher, surfaces) = dispatcher();
        let created = dispatcher.create(CreateMessage::asset("videos/a.mp4")).unwrap();

        assert_eq!(dispatcher.session_count(), 1);
        assert!(surfaces.is_live(created.texture_id));
    }

    #[tokio::test]
    async fn test_rejected_create_allocates_nothing() {
        let (dispatcher, surfaces) = dispatcher();
        let msg = CreateMessage {
            asset: Some("a.mp4".into()),
            uri: Some("https://example.com/a.mp4".into()),
            ..CreateMessage::default()
        };

        assert!(matches!(dispatcher.create(msg), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            dispatcher.create(CreateMessage::default()),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(surfaces.live_count(), 0);
        assert_eq!(dispatcher.session_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_handle_commands_are_noops() {
        let (dispatcher, _) = dispatcher();
        let texture_id = Handle(999);

        dispatcher.play(TextureMessage { texture_id });
        dispatcher.pause(TextureMessage { texture_id });
        dispatcher.dispose(TextureMessage { texture_id });
        dispatcher.seek_to(PositionMessage { texture_id, position: 5 });
        dispatcher.set_looping(LoopingMessage { texture_id, is_looping: true });
        dispatcher
            .set_volume(VolumeMessage { texture_id, volume: 0.5 })
            .unwrap();
        // Unknown handle wins over argument validation
        dispatcher
            .set_playback_speed(PlaybackSpeedMessage { texture_id, speed: -1.0 })
            .unwrap();

        assert_eq!(dispatcher.position(TextureMessage { texture_id }).position, 0);
        assert!(dispatcher.snapshot(texture_id).is_none());
        assert!(dispatcher.subscribe(texture_id).is_none());
    }

    #[tokio::test]
    async fn test_mix_with_others_applies_to_later_sessions() {
        let (dispatcher, _) = dispatcher();
        let before = dispatcher.create(CreateMessage::asset("a.mp4")).unwrap();

        dispatcher.set_mix_with_others(MixWithOthersMessage { mix_with_others: true });
        let after = dispatcher.create(CreateMessage::asset("b.mp4")).unwrap();

        assert!(!dispatcher.snapshot(before.texture_id).unwrap().mix_with_others);
        assert!(dispatcher.snapshot(after.texture_id).unwrap().mix_with_others);
        assert!(dispatcher.global_options().snapshot().mix_with_others);
    }

    #[tokio::test]
    async fn test_dispose_all() {
        let (dispatcher, surfaces) = dispatcher();
        dispatcher.create(CreateMessage::asset("a.mp4")).unwrap();
        dispatcher.create(CreateMessage::uri("https://example.com/b.m3u8")).unwrap();

        assert_eq!(dispatcher.dispose_all(), 2);
        assert_eq!(dispatcher.session_count(), 0);
        assert_eq!(surfaces.live_count(), 0);
    }
}
