//! HTTP transport for the command dispatcher
//!
//! One POST route per host command, a snapshot query, and a per-session
//! SSE stream carrying that session's events.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
