//! Session registry
//!
//! The only owner of live sessions. Sessions are reached through
//! [`SessionRegistry::with_session`], which runs a closure under the registry
//! lock, so no caller can keep a reference past a concurrent removal.
//! Removal detaches the entry first and disposes it afterwards, which means a
//! lookup never observes a session in the middle of disposal.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use evp_common::Handle;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::session::Session;

/// Map from handle to the session that owns it
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Handle, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly created session under its handle.
    ///
    /// # Panics
    /// If a live session already owns the handle. Handles come from the
    /// surface allocator and are never reused while live, so a collision is a
    /// broken allocator, not a runtime condition.
    pub fn register(&self, session: Session) -> Handle {
        let handle = session.handle();
        let mut sessions = self.sessions.lock();

        let outcome = match sessions.entry(handle) {
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(None)
            }
            // Left behind by an engine failure; its resources are already released
            Entry::Occupied(mut slot) if slot.get().is_disposed() => {
                Ok(Some(slot.insert(session)))
            }
            Entry::Occupied(_) => Err(session),
        };
        drop(sessions);

        let Ok(stale) = outcome else {
            panic!("handle {} is already owned by a live session", handle);
        };
        if stale.is_some() {
            warn!("Replaced disposed session left under handle {}", handle);
        }
        debug!("Registered session {}", handle);
        handle
    }

    /// Run `f` against the live session for `handle`.
    ///
    /// Returns None when the handle is unknown. Sessions disposed by an engine
    /// failure are purged here and also reported as absent.
    pub fn with_session<R>(&self, handle: Handle, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock();

        if sessions.get(&handle)?.is_disposed() {
            let stale = sessions.remove(&handle);
            drop(sessions);
            drop(stale);
            debug!("Purged failed session {}", handle);
            return None;
        }

        sessions.get(&handle).map(f)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.with_session(handle, |_| ()).is_some()
    }

    /// Remove and dispose the session for `handle`. Unknown handles are a no-op.
    pub fn remove(&self, handle: Handle) -> bool {
        let removed = self.sessions.lock().remove(&handle);

        match removed {
            Some(mut session) => {
                session.dispose();
                true
            }
            None => {
                debug!("Remove of unknown handle {} ignored", handle);
                false
            }
        }
    }

    /// Remove and dispose every session. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let drained: Vec<Session> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        let count = drained.len();

        for mut session in drained {
            session.dispose();
        }

        if count > 0 {
            info!("Disposed {} session(s)", count);
        }
        count
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.purge_disposed();
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all live sessions, sorted
    pub fn handles(&self) -> Vec<Handle> {
        self.purge_disposed();
        let mut handles: Vec<Handle> = self.sessions.lock().keys().copied().collect();
        handles.sort();
        handles
    }

    /// Drop entries whose session was disposed by an engine failure
    fn purge_disposed(&self) {
        let stale: Vec<Session> = {
            let mut sessions = self.sessions.lock();
            let disposed: Vec<Handle> = sessions
                .iter()
                .filter(|(_, session)| session.is_disposed())
                .map(|(handle, _)| *handle)
                .collect();
            disposed
                .iter()
                .filter_map(|handle| sessions.remove(handle))
                .collect()
        };

        for session in &stale {
            debug!("Purged failed session {}", session.handle());
        }
    }
}
