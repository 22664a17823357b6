//! Per-session event bridge
//!
//! Events emitted before anyone subscribes are queued and flushed to the
//! first subscriber. Once a subscriber has attached, events are only
//! delivered while it is listening; a detached subscriber means later events
//! are dropped. [`EventBridge::close`] drops the sender, which ends the
//! subscriber's stream, and nothing is delivered afterwards.

use std::collections::VecDeque;

use evp_common::{Handle, VideoEvent};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Default)]
struct BridgeInner {
    sink: Option<mpsc::UnboundedSender<VideoEvent>>,
    pending: VecDeque<VideoEvent>,
    attached_once: bool,
    closed: bool,
}

/// Ordered event channel from one session to its subscriber
#[derive(Debug)]
pub struct EventBridge {
    handle: Handle,
    inner: Mutex<BridgeInner>,
}

impl EventBridge {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            inner: Mutex::new(BridgeInner::default()),
        }
    }

    /// Deliver or queue an event. Returns false when the event was dropped.
    pub fn emit(&self, event: VideoEvent) -> bool {
        let mut inner = self.inner.lock();

        if inner.closed {
            debug!("Session {}: dropping {} after close", self.handle, event.kind());
            return false;
        }

        if let Some(sink) = inner.sink.take() {
            return match sink.send(event) {
                Ok(()) => {
                    inner.sink = Some(sink);
                    true
                }
                Err(mpsc::error::SendError(event)) => {
                    debug!(
                        "Session {}: subscriber detached, dropping {}",
                        self.handle,
                        event.kind()
                    );
                    false
                }
            };
        }

        if inner.attached_once {
            debug!("Session {}: no subscriber, dropping {}", self.handle, event.kind());
            false
        } else {
            inner.pending.push_back(event);
            true
        }
    }

    /// Attach a subscriber, replacing any previous one. Queued events are
    /// delivered first. Returns None once the bridge is closed.
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<VideoEvent>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for event in inner.pending.drain(..) {
            // Receiver is alive in this scope
            let _ = tx.send(event);
        }
        inner.sink = Some(tx);
        inner.attached_once = true;
        debug!("Session {}: subscriber attached", self.handle);

        Some(rx)
    }

    /// Tear down; ends the subscriber stream. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.sink = None;
        inner.pending.clear();
        debug!("Session {}: event bridge closed", self.handle);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn has_subscriber(&self) -> bool {
        self.inner.lock().sink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_before_subscribe_are_queued_in_order() {
        let bridge = EventBridge::new(Handle(1));
        assert!(bridge.emit(VideoEvent::BufferingStart));
        assert!(bridge.emit(VideoEvent::BufferingEnd));

        let mut rx = bridge.subscribe().unwrap();
        assert_eq!(rx.try_recv().unwrap(), VideoEvent::BufferingStart);
        assert_eq!(rx.try_recv().unwrap(), VideoEvent::BufferingEnd);

        assert!(bridge.emit(VideoEvent::Completed));
        assert_eq!(rx.try_recv().unwrap(), VideoEvent::Completed);
    }

    #[test]
    fn test_detached_subscriber_drops_events() {
        let bridge = EventBridge::new(Handle(1));
        let rx = bridge.subscribe().unwrap();
        drop(rx);

        assert!(!bridge.emit(VideoEvent::Completed));
        assert!(!bridge.has_subscriber());
        assert!(!bridge.emit(VideoEvent::Completed));
    }

    #[test]
    fn test_resubscribe_replaces_previous_subscriber() {
        let bridge = EventBridge::new(Handle(1));
        let mut first = bridge.subscribe().unwrap();
        let mut second = bridge.subscribe().unwrap();

        bridge.emit(VideoEvent::Completed);

        assert_eq!(second.try_recv().unwrap(), VideoEvent::Completed);
        assert!(matches!(
            first.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_close_ends_stream_and_drops_later_events() {
        let bridge = EventBridge::new(Handle(1));
        let mut rx = bridge.subscribe().unwrap();

        bridge.close();
        bridge.close();

        assert!(!bridge.emit(VideoEvent::Completed));
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(bridge.subscribe().is_none());
        assert!(bridge.is_closed());
    }

    #[test]
    fn test_close_discards_queue() {
        let bridge = EventBridge::new(Handle(1));
        bridge.emit(VideoEvent::BufferingStart);
        bridge.close();
        assert!(bridge.subscribe().is_none());
    }
}
