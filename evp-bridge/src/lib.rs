//! Embedded video player bridge
//!
//! Host commands create playback sessions bound to output surfaces, drive
//! them through a media engine, and receive each session's lifecycle events
//! on a dedicated stream.

pub mod api;
pub mod assets;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod options;
pub mod registry;
pub mod session;
pub mod surface;

pub use dispatcher::CommandDispatcher;
pub use error::{Error, Result};
