//! Output surface allocation
//!
//! The surface allocator owns handle allocation: every session is identified
//! by the id of the surface it renders into. The bridge never touches the
//! surface pixels, it only keeps the entry alive and releases it on disposal.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use evp_common::Handle;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;

/// One allocated output surface
pub trait SurfaceEntry: Send {
    /// Handle identifying this surface (and the session bound to it)
    fn id(&self) -> Handle;

    /// Release the surface. Must be idempotent.
    fn release(&mut self) -> Result<()>;
}

/// Allocates output surfaces; ids are never reused while a surface is live
pub trait SurfaceAllocator: Send + Sync {
    fn allocate(&self) -> Result<Box<dyn SurfaceEntry>>;
}

/// In-process allocator handing out monotonically increasing ids
#[derive(Debug, Default)]
pub struct LocalSurfaceAllocator {
    next_id: AtomicI64,
    live: Arc<Mutex<HashSet<Handle>>>,
}

impl LocalSurfaceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of surfaces allocated and not yet released
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.live.lock().contains(&handle)
    }
}

impl SurfaceAllocator for LocalSurfaceAllocator {
    fn allocate(&self) -> Result<Box<dyn SurfaceEntry>> {
        let id = Handle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.live.lock().insert(id);
        debug!("Allocated surface {}", id);

        Ok(Box::new(LocalSurface {
            id,
            live: Arc::clone(&self.live),
            released: false,
        }))
    }
}

/// Surface handed out by [`LocalSurfaceAllocator`]
#[derive(Debug)]
pub struct LocalSurface {
    id: Handle,
    live: Arc<Mutex<HashSet<Handle>>>,
    released: bool,
}

impl SurfaceEntry for LocalSurface {
    fn id(&self) -> Handle {
        self.id
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.live.lock().remove(&self.id);
            debug!("Released surface {}", self.id);
        }
        Ok(())
    }
}

impl Drop for LocalSurface {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let allocator = LocalSurfaceAllocator::new();

        let a = allocator.allocate().unwrap();
        let b = allocator.allocate().unwrap();

        assert!(b.id() > a.id());
        assert_eq!(allocator.live_count(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let allocator = LocalSurfaceAllocator::new();
        let mut surface = allocator.allocate().unwrap();
        let id = surface.id();

        surface.release().unwrap();
        surface.release().unwrap();

        assert!(!allocator.is_live(id));
        assert_eq!(allocator.live_count(), 0);
    }

    #[test]
    fn test_ids_not_reused_after_release() {
        let allocator = LocalSurfaceAllocator::new();
        let mut first = allocator.allocate().unwrap();
        let first_id = first.id();
        first.release().unwrap();

        let second = allocator.allocate().unwrap();
        assert_ne!(second.id(), first_id);
    }

    #[test]
    fn test_drop_releases_surface() {
        let allocator = LocalSurfaceAllocator::new();
        {
            let _surface = allocator.allocate().unwrap();
            assert_eq!(allocator.live_count(), 1);
        }
        assert_eq!(allocator.live_count(), 0);
    }
}
