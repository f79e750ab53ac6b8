//! Host-owned rendering target the tool writes decoded frames into.

use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A decoded video frame handed to a [`Surface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Presentation timestamp in stream time base units.
    pub pts: i64,
    pub data: Bytes,
}

/// A rendering target owned by the host.
///
/// Resources behind the surface are released when the last handle to it is
/// dropped.
pub trait Surface: Send + Sync + fmt::Debug {
    /// Short name for diagnostics.
    fn label(&self) -> &str;

    /// Render one frame.
    fn present(&self, frame: &VideoFrame);
}

/// Shared reference to a host surface.
pub type SurfaceHandle = Arc<dyn Surface>;

/// Holds the single surface currently bound for output.
///
/// Rebinding while a command runs is allowed: the tool may still hold the
/// handle it fetched earlier, which stays valid until the tool drops it.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    current: Mutex<Option<SurfaceHandle>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bound surface, or clear it with `None`.
    ///
    /// The registry's reference to the previous surface is released exactly
    /// once, after the lock is dropped.
    pub fn bind(&self, surface: Option<SurfaceHandle>) {
        let previous = std::mem::replace(&mut *self.current.lock(), surface);
        if let Some(previous) = previous {
            tracing::debug!(surface = previous.label(), "releasing output surface");
            drop(previous);
        }
    }

    /// Clear the bound surface.
    pub fn clear(&self) {
        self.bind(None);
    }

    /// The surface currently bound, if any.
    pub fn current(&self) -> Option<SurfaceHandle> {
        self.current.lock().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.current.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingSurface {
        label: String,
        presented: AtomicUsize,
        released: Arc<AtomicUsize>,
    }

    impl CountingSurface {
        fn handle(label: &str, released: &Arc<AtomicUsize>) -> SurfaceHandle {
            Arc::new(Self {
                label: label.to_string(),
                presented: AtomicUsize::new(0),
                released: Arc::clone(released),
            })
        }
    }

    impl Surface for CountingSurface {
        fn label(&self) -> &str {
            &self.label
        }

        fn present(&self, _frame: &VideoFrame) {
            self.presented.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Drop for CountingSurface {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_unbound_by_default() {
        let registry = SurfaceRegistry::new();
        assert!(registry.current().is_none());
        assert!(!registry.is_bound());
    }

    #[test]
    fn test_rebind_releases_previous_once() {
        let released_1 = Arc::new(AtomicUsize::new(0));
        let released_2 = Arc::new(AtomicUsize::new(0));
        let registry = SurfaceRegistry::new();

        registry.bind(Some(CountingSurface::handle("h1", &released_1)));
        registry.bind(Some(CountingSurface::handle("h2", &released_2)));

        assert_eq!(registry.current().unwrap().label(), "h2");
        assert_eq!(released_1.load(Ordering::SeqCst), 1);
        assert_eq!(released_2.load(Ordering::SeqCst), 0);

        registry.clear();
        assert_eq!(released_1.load(Ordering::SeqCst), 1);
        assert_eq!(released_2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_handle_outlives_rebind() {
        let released = Arc::new(AtomicUsize::new(0));
        let registry = SurfaceRegistry::new();
        registry.bind(Some(CountingSurface::handle("old", &released)));

        let in_flight = registry.current().unwrap();
        registry.bind(None);
        assert_eq!(released.load(Ordering::SeqCst), 0);

        in_flight.present(&VideoFrame {
            width: 2,
            height: 2,
            pts: 0,
            data: Bytes::from_static(&[0; 6]),
        });
        drop(in_flight);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
