//! Server-Sent Events (SSE) utilities
//!
//! Turns a session's event receiver into an SSE response. The stream ends
//! when the sending side is closed, which happens when the session is
//! disposed.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::VideoEvent;
use crate::messages::Handle;

/// Keep-alive interval for idle event streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Convert one event into an SSE frame (`event:` = kind, `data:` = JSON)
pub fn to_sse_event(event: &VideoEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.kind()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Create the SSE stream for one session's events
pub fn create_session_sse_stream(
    handle: Handle,
    mut rx: mpsc::UnboundedReceiver<VideoEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("SSE client attached to session {}", handle);

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            debug!("SSE: session {} -> {}", handle, event.kind());
            if let Some(frame) = to_sse_event(&event) {
                yield Ok(frame);
            }
        }
        info!("SSE: session {} event stream closed", handle);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
