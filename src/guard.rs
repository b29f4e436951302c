//! Guarded: one mutex around one container, plus the guards that keep it
//! locked while callers look inside.
//!
//! Every synchronized wrapper in this crate owns exactly one `Guarded<C>`.
//! All access goes through `lock()` (explicit scoped guard) or `with()`
//! (closure run as one critical section); the container is never reachable
//! without the mutex held.

use crate::reentrancy::{DebugLockOwner, OwnerMark};
use core::fmt;
use core::ops::{Deref, DerefMut};
use parking_lot::{Condvar, MappedMutexGuard, Mutex, MutexGuard, WaitTimeoutResult};
use std::time::Instant;

pub struct Guarded<C> {
    owner: DebugLockOwner,
    inner: Mutex<C>,
}

impl<C> Guarded<C> {
    pub fn new(container: C) -> Self {
        Self {
            owner: DebugLockOwner::new(),
            inner: Mutex::new(container),
        }
    }

    /// Acquire the lock and return a guard that keeps it for as long as it
    /// lives. Iterating through the guard is the only unsnapshotted way to
    /// traverse a synchronized container.
    ///
    /// Panics in debug builds if the calling thread already holds this lock.
    pub fn lock(&self) -> Locked<'_, C> {
        self.owner.check_entry();
        let guard = self.inner.lock();
        let mark = self.owner.claim();
        Locked { mark, guard }
    }

    /// Run `f` as a single critical section.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let mut locked = self.lock();
        f(&mut locked)
    }

    /// Exclusive access without locking; `&mut self` already proves it.
    pub fn get_mut(&mut self) -> &mut C {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> C {
        self.inner.into_inner()
    }
}

impl<C: Default> Default for Guarded<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

/// Scoped guard over a whole container.
pub struct Locked<'a, C> {
    // Declaration order is drop order: the owner mark is cleared before
    // the mutex unlocks.
    mark: OwnerMark<'a>,
    guard: MutexGuard<'a, C>,
}

impl<'a, C> Locked<'a, C> {
    /// Narrow the guard to one value inside the container; the lock stays
    /// held until the returned guard is dropped.
    pub fn map<V: ?Sized>(self, f: impl FnOnce(&mut C) -> &mut V) -> LockedValue<'a, V> {
        let Locked { mark, guard } = self;
        LockedValue {
            mark,
            guard: MutexGuard::map(guard, f),
        }
    }

    /// Like `map`, but releases the lock and returns `None` when `f` finds
    /// nothing.
    pub fn try_map<V: ?Sized>(
        self,
        f: impl FnOnce(&mut C) -> Option<&mut V>,
    ) -> Option<LockedValue<'a, V>> {
        let Locked { mark, guard } = self;
        match MutexGuard::try_map(guard, f) {
            Ok(guard) => Some(LockedValue { mark, guard }),
            Err(guard) => {
                drop(mark);
                drop(guard);
                None
            }
        }
    }

    /// Block on `cv` until notified or until `deadline`, releasing the lock
    /// meanwhile. The lock is held again when this returns.
    pub(crate) fn wait_until(&mut self, cv: &Condvar, deadline: Instant) -> WaitTimeoutResult {
        self.mark.suspend();
        let res = cv.wait_until(&mut self.guard, deadline);
        self.mark.resume();
        res
    }

    /// Block on `cv` with no deadline.
    pub(crate) fn wait(&mut self, cv: &Condvar) {
        self.mark.suspend();
        cv.wait(&mut self.guard);
        self.mark.resume();
    }
}

impl<'a, C> Deref for Locked<'a, C> {
    type Target = C;
    fn deref(&self) -> &C {
        &self.guard
    }
}

impl<'a, C> DerefMut for Locked<'a, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.guard
    }
}

impl<'a, C: fmt::Debug> fmt::Debug for Locked<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.guard, f)
    }
}

/// Guard over a single stored value. Holds the container lock, so the value
/// can be read and mutated in place without racing other operations.
pub struct LockedValue<'a, V: ?Sized> {
    mark: OwnerMark<'a>,
    guard: MappedMutexGuard<'a, V>,
}

impl<'a, V: ?Sized> LockedValue<'a, V> {
    /// Copy the value out and release the lock.
    pub fn cloned(self) -> V
    where
        V: Clone,
    {
        let LockedValue { mark, guard } = self;
        let value = (*guard).clone();
        drop(mark);
        drop(guard);
        value
    }
}

impl<'a, V: ?Sized> Deref for LockedValue<'a, V> {
    type Target = V;
    fn deref(&self) -> &V {
        &self.guard
    }
}

impl<'a, V: ?Sized> DerefMut for LockedValue<'a, V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.guard
    }
}

impl<'a, V: ?Sized + fmt::Debug> fmt::Debug for LockedValue<'a, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.guard, f)
    }
}
