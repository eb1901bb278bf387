//! Frame resource tracking
//!
//! Keeps the resources a frame touched alive until the host says the frame
//! has been submitted and retired.

use super::resource::{ResourceHandle, ResourceId};

trait TrackedResource {
    fn resource_id(&self) -> ResourceId;
}

impl<T: 'static> TrackedResource for ResourceHandle<T> {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

/// Holders for every resource used by the frame in flight
#[derive(Default)]
pub struct FrameResourceTracker {
    live: Vec<Box<dyn TrackedResource>>,
}

impl FrameResourceTracker {
    pub const fn new() -> Self {
        Self { live: Vec::new() }
    }

    /// Hold an extra reference to `handle` until `retire`. Tracking the same
    /// resource twice in a frame is a no-op.
    pub fn track<T: 'static>(&mut self, handle: &ResourceHandle<T>) {
        let id = handle.id();
        if self.contains(id) {
            return;
        }
        self.live.push(Box::new(handle.acquire()));
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.live.iter().any(|t| t.resource_id() == id)
    }

    /// Release every holder taken this frame
    pub fn retire(&mut self) -> usize {
        let released = self.live.len();
        self.live.clear();
        log::debug!("[FrameResourceTracker::retire] Released {} resources", released);
        released
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_keeps_resource_alive() {
        let mut tracker = FrameResourceTracker::new();
        let handle = ResourceHandle::new(vec![1u8, 2, 3]);
        tracker.track(&handle);
        tracker.track(&handle);
        assert_eq!(tracker.len(), 1);
        assert_eq!(handle.holders(), 2);

        assert_eq!(tracker.retire(), 1);
        assert_eq!(handle.holders(), 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_tracked_resource_outlives_caller_handle() {
        let mut tracker = FrameResourceTracker::new();
        let handle = ResourceHandle::new(String::from("lut"));
        let id = handle.id();
        tracker.track(&handle);
        assert_eq!(handle.release(), 1);
        assert!(tracker.contains(id));
        tracker.retire();
        assert!(!tracker.contains(id));
    }
}
