//! Debug-only lock-owner tracking.
//!
//! Every guarded collection records which thread currently holds its
//! mutex. In debug builds, acquiring the same instance again from the
//! owning thread (for example from inside a `get_or_add` factory) panics
//! instead of deadlocking on the non-reentrant mutex. In release builds
//! this compiles to a zero-cost no-op.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(debug_assertions))]
use core::marker::PhantomData;

/// Address of a per-thread byte; unique among live threads and never zero.
#[cfg(debug_assertions)]
fn current_thread_token() -> usize {
    thread_local! {
        static TOKEN: u8 = const { 0 };
    }
    TOKEN.with(|t| t as *const u8 as usize)
}

/// Per-instance owner tracker. Embed next to the mutex it describes and
/// bracket every acquisition with `check_entry` (before locking) and
/// `claim` (after locking).
#[derive(Debug)]
pub struct DebugLockOwner {
    #[cfg(debug_assertions)]
    owner: AtomicUsize,
}

impl DebugLockOwner {
    /// Create a tracker with no owner. Const so it can be a field default.
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            owner: AtomicUsize::new(0),
        }
    }

    /// Call before blocking on the mutex. In debug builds, panics if the
    /// calling thread already holds it.
    #[inline]
    pub fn check_entry(&self) {
        #[cfg(debug_assertions)]
        {
            if self.held_by_current_thread() {
                tracing::error!("reentrant lock acquisition on a guarded collection");
                panic!("reentrant lock acquisition: this thread already holds the collection lock");
            }
        }
    }

    /// Record the calling thread as the holder. Call only once the mutex is
    /// acquired; the returned mark clears ownership when dropped.
    #[inline]
    pub fn claim(&self) -> OwnerMark<'_> {
        #[cfg(debug_assertions)]
        {
            self.owner.store(current_thread_token(), Ordering::Release);
            return OwnerMark { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return OwnerMark { _z: PhantomData };
        }
    }

    /// Whether the calling thread is the recorded holder. Always false in
    /// release builds.
    #[inline]
    pub fn held_by_current_thread(&self) -> bool {
        #[cfg(debug_assertions)]
        {
            return self.owner.load(Ordering::Acquire) == current_thread_token();
        }

        #[cfg(not(debug_assertions))]
        {
            return false;
        }
    }
}

impl Default for DebugLockOwner {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII mark returned by `DebugLockOwner::claim`.
///
/// Drop it before the mutex guard it accompanies.
pub struct OwnerMark<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugLockOwner,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl<'a> OwnerMark<'a> {
    /// Clear ownership while the mutex is released by a condition wait.
    #[inline]
    pub fn suspend(&self) {
        #[cfg(debug_assertions)]
        self.owner.owner.store(0, Ordering::Release);
    }

    /// Re-record the calling thread once a condition wait reacquires the mutex.
    #[inline]
    pub fn resume(&self) {
        #[cfg(debug_assertions)]
        self.owner
            .owner
            .store(current_thread_token(), Ordering::Release);
    }
}

impl<'a> Drop for OwnerMark<'a> {
    fn drop(&mut self) {
        // Clear only our own record. A callback panicking inside
        // `MutexGuard::map` unlocks the mutex before this mark drops.
        #[cfg(debug_assertions)]
        {
            let _ = self.owner.owner.compare_exchange(
                current_thread_token(),
                0,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
    }
}
