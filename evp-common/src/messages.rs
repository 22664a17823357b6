//! Command transport message types
//!
//! Field names follow the camelCase convention of the host application
//! (`textureId`, `isLooping`, `formatHint`, ...).

use serde::{Deserialize, Serialize};

use crate::events::PlaybackStatus;

/// Opaque identifier of one playback session and its output surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub i64);

impl Handle {
    pub fn id(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arguments of the `create` command
///
/// Exactly one of `asset` and `uri` must be supplied. `package_name` only
/// applies to assets, `format_hint` only to URIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub format_hint: Option<String>,
}

impl CreateMessage {
    pub fn asset(asset: impl Into<String>) -> Self {
        Self {
            asset: Some(asset.into()),
            ..Self::default()
        }
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }
}

/// Handle-only argument or result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureMessage {
    pub texture_id: Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopingMessage {
    pub texture_id: Handle,
    pub is_looping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMessage {
    pub texture_id: Handle,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSpeedMessage {
    pub texture_id: Handle,
    pub speed: f64,
}

/// Position in milliseconds; seek argument and `position` result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMessage {
    pub texture_id: Handle,
    pub position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixWithOthersMessage {
    pub mix_with_others: bool,
}

/// Point-in-time view of one session, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub texture_id: Handle,
    pub status: PlaybackStatus,
    pub position: u64,
    pub duration: Option<u64>,
    pub volume: f64,
    pub speed: f64,
    pub is_looping: bool,
    pub mix_with_others: bool,
}
