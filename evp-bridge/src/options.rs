//! Process-wide playback options
//!
//! Sessions never share the live value: each one receives a copy of the
//! options current at its construction, so changing an option only affects
//! sessions created afterwards.

use parking_lot::RwLock;
use tracing::info;

/// Options applied to a session at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerOptions {
    /// Mix audio with other apps instead of requesting exclusive focus
    pub mix_with_others: bool,
}

/// The single mutable option set owned by the dispatcher
#[derive(Debug, Default)]
pub struct GlobalOptions {
    current: RwLock<PlayerOptions>,
}

impl GlobalOptions {
    /// Copy of the current options, taken for a new session
    pub fn snapshot(&self) -> PlayerOptions {
        *self.current.read()
    }

    pub fn set_mix_with_others(&self, mix_with_others: bool) {
        self.current.write().mix_with_others = mix_with_others;
        info!("Global option mix_with_others = {}", mix_with_others);
    }
}
