//! Live-object accounting.
//!
//! Every object the graph layer creates on behalf of a caller (operation
//! descriptors, built operations, image buffers) holds a [`Lease`] on a
//! [`ResourceTracker`]. The lease is returned when the object is dropped,
//! so a tracker's live counts go back to their baseline once every
//! object reachable through a call has been released, on success and on
//! failure alike.
//!
//! # Example
//!
//! ```rust
//! use vfx_core::{ResourceKind, ResourceTracker};
//!
//! let tracker = ResourceTracker::new();
//! let before = tracker.counts();
//!
//! let lease = tracker.acquire(ResourceKind::Descriptor);
//! assert_eq!(tracker.live(ResourceKind::Descriptor), 1);
//!
//! drop(lease);
//! assert_eq!(tracker.counts(), before);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Kind of tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Unbuilt operation descriptor (graph node).
    Descriptor,
    /// Result of building a descriptor.
    BuiltOperation,
    /// Pixel buffer allocated by the engine.
    Image,
}

impl ResourceKind {
    /// All kinds, in counter order.
    pub const ALL: [ResourceKind; 3] = [Self::Descriptor, Self::BuiltOperation, Self::Image];

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Descriptor => 0,
            Self::BuiltOperation => 1,
            Self::Image => 2,
        }
    }
}

/// Atomic live/total counters per [`ResourceKind`].
///
/// Shared behind an [`Arc`] so leases can outlive the component that
/// issued them.
#[derive(Default)]
pub struct ResourceTracker {
    live: [AtomicUsize; 3],
    total: [AtomicUsize; 3],
}

impl ResourceTracker {
    /// Creates a new tracker with all counters at zero.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new live resource and returns its lease.
    pub fn acquire(self: &Arc<Self>, kind: ResourceKind) -> Lease {
        self.live[kind.index()].fetch_add(1, Ordering::AcqRel);
        self.total[kind.index()].fetch_add(1, Ordering::Relaxed);
        Lease {
            tracker: Arc::clone(self),
            kind,
        }
    }

    /// Number of live resources of `kind`.
    #[inline]
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.live[kind.index()].load(Ordering::Acquire)
    }

    /// Number of resources of `kind` ever acquired.
    #[inline]
    pub fn total(&self, kind: ResourceKind) -> usize {
        self.total[kind.index()].load(Ordering::Relaxed)
    }

    /// Snapshot of live counts.
    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            descriptors: self.live(ResourceKind::Descriptor),
            built_operations: self.live(ResourceKind::BuiltOperation),
            images: self.live(ResourceKind::Image),
        }
    }

    fn release(&self, kind: ResourceKind) {
        self.live[kind.index()].fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for ResourceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTracker")
            .field("live", &self.counts())
            .field("total_descriptors", &self.total(ResourceKind::Descriptor))
            .field("total_built", &self.total(ResourceKind::BuiltOperation))
            .field("total_images", &self.total(ResourceKind::Image))
            .finish()
    }
}

/// RAII guard for one live resource.
///
/// Not `Clone`: exactly one lease exists per tracked object, and it is
/// returned exactly once, on drop.
pub struct Lease {
    tracker: Arc<ResourceTracker>,
    kind: ResourceKind,
}

impl Lease {
    /// Kind of resource this lease accounts for.
    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Tracker that issued this lease.
    #[inline]
    pub fn tracker(&self) -> &Arc<ResourceTracker> {
        &self.tracker
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.tracker.release(self.kind);
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("kind", &self.kind).finish()
    }
}

/// Snapshot of live resource counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    /// Live operation descriptors.
    pub descriptors: usize,
    /// Live built operations.
    pub built_operations: usize,
    /// Live engine-allocated image buffers.
    pub images: usize,
}

impl ResourceCounts {
    /// Sum over all kinds.
    #[inline]
    pub fn total(&self) -> usize {
        self.descriptors + self.built_operations + self.images
    }

    /// Returns `true` if nothing is live.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for ResourceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "descriptors={} built={} images={}",
            self.descriptors, self.built_operations, self.images
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release() {
        let tracker = ResourceTracker::new();
        let a = tracker.acquire(ResourceKind::Image);
        let b = tracker.acquire(ResourceKind::Image);
        let c = tracker.acquire(ResourceKind::BuiltOperation);
        assert_eq!(tracker.live(ResourceKind::Image), 2);
        assert_eq!(tracker.live(ResourceKind::BuiltOperation), 1);
        assert_eq!(c.kind(), ResourceKind::BuiltOperation);

        drop(a);
        drop(c);
        assert_eq!(
            tracker.counts(),
            ResourceCounts {
                descriptors: 0,
                built_operations: 0,
                images: 1
            }
        );
        drop(b);
        assert!(tracker.counts().is_zero());
        assert_eq!(tracker.total(ResourceKind::Image), 2);
    }

    #[test]
    fn test_lease_outlives_owner_handle() {
        let tracker = ResourceTracker::new();
        let lease = tracker.acquire(ResourceKind::Descriptor);
        let weak = Arc::downgrade(&tracker);
        drop(tracker);
        // Lease keeps the tracker alive until it is returned.
        assert!(weak.upgrade().is_some());
        assert_eq!(lease.tracker().live(ResourceKind::Descriptor), 1);
        drop(lease);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_counts_display() {
        let counts = ResourceCounts {
            descriptors: 2,
            built_operations: 1,
            images: 3,
        };
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.to_string(), "descriptors=2 built=1 images=3");
    }

    #[test]
    fn test_concurrent_leases() {
        let tracker = ResourceTracker::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                let tracker = Arc::clone(&tracker);
                s.spawn(move || {
                    for _ in 0..100 {
                        let _l = tracker.acquire(ResourceKind::Image);
                    }
                });
            }
        });
        assert_eq!(tracker.live(ResourceKind::Image), 0);
        assert_eq!(tracker.total(ResourceKind::Image), 800);
    }
}
