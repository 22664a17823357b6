//! # EVP Common Library
//!
//! Shared code for the EVP video playback bridge:
//! - Wire message types exchanged with the command transport
//! - Session event types (VideoEvent enum) and playback status
//! - Configuration file discovery and loading
//! - SSE helpers for per-handle event streams

pub mod config;
pub mod error;
pub mod events;
pub mod messages;
pub mod sse;

pub use error::{Error, Result};
pub use events::{PlaybackStatus, VideoEvent};
pub use messages::Handle;
