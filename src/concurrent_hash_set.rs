//! ConcurrentHashSet: a `HashSet` behind one mutex. `clone_set` is the
//! consistent-view primitive: it copies the set under the lock and returns
//! an independent `HashSet`.

use crate::guard::{Guarded, Locked};
use crate::hash_set::HashSet;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;
use tracing::debug;

pub struct ConcurrentHashSet<T, S = RandomState> {
    inner: Guarded<HashSet<T, S>>,
}

impl<T> ConcurrentHashSet<T>
where
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self::from_set(HashSet::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_set(HashSet::with_capacity(capacity))
    }
}

impl<T, S> ConcurrentHashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_set(HashSet::with_hasher(hasher))
    }

    pub fn from_set(set: HashSet<T, S>) -> Self {
        Self {
            inner: Guarded::new(set),
        }
    }

    pub fn lock(&self) -> Locked<'_, HashSet<T, S>> {
        self.inner.lock()
    }

    pub fn len(&self) -> usize {
        self.inner.with(|s| s.len())
    }
    pub fn is_empty(&self) -> bool {
        self.inner.with(|s| s.is_empty())
    }
    pub fn any(&self) -> bool {
        self.inner.with(|s| s.any())
    }

    pub fn clear(&self) {
        self.inner.with(|s| s.clear());
    }

    pub fn insert(&self, item: T) {
        self.inner.with(|s| s.insert(item));
    }

    pub fn try_insert(&self, item: T) -> bool {
        self.inner.with(|s| s.try_insert(item))
    }

    pub fn contains<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.with(|s| s.contains(item))
    }

    #[inline]
    pub fn exists<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.contains(item)
    }

    pub fn remove<Q>(&self, item: &Q)
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.with(|s| s.remove(item));
    }

    pub fn try_remove<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.with(|s| s.try_remove(item))
    }

    /// `action` runs under the lock for every element.
    pub fn for_each<F>(&self, action: F)
    where
        F: FnMut(&T),
    {
        self.inner.with(|s| s.for_each(action));
    }

    /// Independent deep copy taken under the lock.
    pub fn clone_set(&self) -> HashSet<T, S>
    where
        T: Clone,
        S: Clone,
    {
        let snap = self.inner.with(|s| s.clone());
        debug!(len = snap.len(), "hash set snapshot taken");
        snap
    }

    pub fn copy_from(&self, other: &Self)
    where
        T: Clone,
        S: Clone,
    {
        let snap = other.clone_set();
        self.inner.with(|s| *s = snap);
    }

    pub fn into_inner(self) -> HashSet<T, S> {
        self.inner.into_inner()
    }
}

impl<T, S> Default for ConcurrentHashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::from_set(HashSet::default())
    }
}

impl<T, S> Clone for ConcurrentHashSet<T, S>
where
    T: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        Self::from_set(self.clone_set())
    }
}

impl<T, S> FromIterator<T> for ConcurrentHashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug, S> fmt::Debug for ConcurrentHashSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|s| f.debug_tuple("ConcurrentHashSet").field(s).finish())
    }
}
