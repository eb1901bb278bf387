//! Shared ownership of device-backed objects
//!
//! A `ResourceHandle` is one holder of an object. The creator holds the
//! first handle; `acquire` adds a holder and `release` (or dropping the
//! handle) removes one. The object is dropped exactly once, when the last
//! holder goes away, and no handle can outlive it.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a shared resource, stable across all of its handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

struct ResourceCell<T> {
    id: ResourceId,
    value: T,
}

pub struct ResourceHandle<T> {
    inner: Arc<ResourceCell<T>>,
}

impl<T> ResourceHandle<T> {
    /// Wrap `value`; the returned handle is its first holder
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ResourceCell {
                id: ResourceId::next(),
                value,
            }),
        }
    }

    /// Add a holder
    pub fn acquire(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Give up this holder and return how many remain. Returns 0 when this
    /// call dropped the object.
    pub fn release(self) -> usize {
        let id = self.inner.id;
        let before = Arc::strong_count(&self.inner);
        match Arc::into_inner(self.inner) {
            Some(cell) => {
                log::debug!("[ResourceHandle::release] Last holder of {} released", id);
                drop(cell);
                0
            }
            None => before.saturating_sub(1),
        }
    }

    /// Current number of holders
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    /// Mutable access, only while this is the sole holder
    pub fn get_mut(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.inner).map(|cell| &mut cell.value)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        self.acquire()
    }
}

impl<T> Deref for ResourceHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.inner.id)
            .field("holders", &self.holders())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_created_with_one_holder() {
        let drops = Arc::new(AtomicUsize::new(0));
        let handle = ResourceHandle::new(DropCounter(Arc::clone(&drops)));
        assert_eq!(handle.holders(), 1);
        assert_eq!(handle.release(), 0);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroyed_exactly_once_after_last_release() {
        let drops = Arc::new(AtomicUsize::new(0));
        let first = ResourceHandle::new(DropCounter(Arc::clone(&drops)));
        let second = first.acquire();
        let third = second.acquire();
        assert_eq!(first.holders(), 3);
        assert_eq!(first.id(), third.id());

        assert_eq!(second.release(), 2);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(first.release(), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(third.release(), 0);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_random_acquire_release_sequences() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let drops = Arc::new(AtomicUsize::new(0));
            let mut holders = vec![ResourceHandle::new(DropCounter(Arc::clone(&drops)))];

            while !holders.is_empty() {
                if rng.gen_bool(0.45) {
                    let pick = rng.gen_range(0..holders.len());
                    let extra = holders[pick].acquire();
                    holders.push(extra);
                } else {
                    let pick = rng.gen_range(0..holders.len());
                    let handle = holders.swap_remove(pick);
                    let remaining = handle.release();
                    assert_eq!(remaining, holders.len());
                    let expected_drops = if holders.is_empty() { 1 } else { 0 };
                    assert_eq!(drops.load(Ordering::SeqCst), expected_drops);
                }
            }
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_get_mut_requires_sole_holder() {
        let mut handle = ResourceHandle::new(5u32);
        let other = handle.acquire();
        assert!(handle.get_mut().is_none());
        drop(other);
        *handle.get_mut().unwrap() = 6;
        assert_eq!(*handle, 6);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ResourceHandle::new(());
        let b = ResourceHandle::new(());
        assert_ne!(a.id(), b.id());
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.acquire()));
    }
}
