//! ConcurrentMap: a `Map` behind one mutex.
//!
//! Every method is a single critical section, so compound operations such
//! as `get_or_add`, `add_or_update`, `try_remove_if` and `incr` are atomic
//! with respect to every other call on the same instance.
//!
//! Values leave the lock by clone. The in-place accessors (`get_or_add`,
//! `get_or_add_new`, `get_or_default`, `value`) instead return a
//! `LockedValue` that keeps the lock held until it is dropped; do not call
//! back into the same map while holding one. Traversal is either through a
//! snapshot (`snapshot`, `keys`, `values`) or through `lock()`, whose guard
//! must outlive the traversal.

use crate::error::CollectionError;
use crate::guard::{Guarded, Locked, LockedValue};
use crate::handle::{Arena, Handle};
use crate::map::Map;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::AddAssign;
use std::collections::hash_map::RandomState;
use tracing::debug;

pub struct ConcurrentMap<K, V, S = RandomState> {
    inner: Guarded<Map<K, V, S>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(Map::with_capacity(capacity))
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_map(Map::with_hasher(hasher))
    }

    /// Take ownership of an existing map.
    pub fn from_map(map: Map<K, V, S>) -> Self {
        Self {
            inner: Guarded::new(map),
        }
    }

    /// Hold the lock for a multi-step operation or a full traversal.
    pub fn lock(&self) -> Locked<'_, Map<K, V, S>> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Map<K, V, S>) -> R) -> R {
        self.inner.with(f)
    }

    pub fn len(&self) -> usize {
        self.inner.with(|m| m.len())
    }
    pub fn is_empty(&self) -> bool {
        self.inner.with(|m| m.is_empty())
    }
    pub fn any(&self) -> bool {
        self.inner.with(|m| m.any())
    }

    pub fn clear(&self) {
        self.inner.with(|m| m.clear());
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.with(|m| m.contains_key(q))
    }

    pub fn try_add(&self, key: K, value: V) -> bool {
        self.inner.with(|m| m.try_add(key, value))
    }

    /// `make` runs under the lock and only when `key` is absent.
    pub fn try_add_with<F>(&self, key: K, make: F) -> bool
    where
        F: FnOnce() -> V,
    {
        self.inner.with(|m| m.try_add_with(key, make))
    }

    pub fn insert_new(&self, key: K, value: V) -> Result<(), CollectionError> {
        self.inner.with(|m| m.insert_new(key, value).map(|_| ()))
    }

    pub fn add(&self, key: K, value: V) -> bool {
        self.inner.with(|m| m.add(key, value))
    }

    pub fn try_get_value<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.with(|m| m.try_get_value(q).cloned())
    }

    pub fn try_get_value_with<Q, F>(&self, q: &Q, action: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V),
    {
        self.inner.with(|m| m.try_get_value_with(q, action))
    }

    pub fn try_check_value<Q, F>(&self, q: &Q, cond: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> bool,
    {
        self.inner.with(|m| m.try_check_value(q, cond))
    }

    /// Locked in-place access to an existing value.
    pub fn value<Q>(&self, q: &Q) -> Option<LockedValue<'_, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().try_map(|m| m.try_get_value_mut(q))
    }

    pub fn try_remove<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.with(|m| m.try_remove(q))
    }

    pub fn try_remove_with<Q, F>(&self, q: &Q, action: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(V),
    {
        self.inner.with(|m| m.try_remove_with(q, action))
    }

    /// Remove only if present and `cond` holds. True iff removed.
    pub fn try_remove_if<Q, F>(&self, q: &Q, cond: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> bool,
    {
        self.inner.with(|m| m.try_remove_if(q, cond))
    }

    /// Remove if `cond` holds. True iff the key is still present afterward.
    pub fn try_remove_when<Q, F>(&self, q: &Q, cond: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> bool,
    {
        self.inner.with(|m| m.try_remove_when(q, cond))
    }

    /// Existing value or a freshly added one, behind the map lock.
    ///
    /// Lookup, `add()` and insert run as one critical section: under any
    /// number of racing callers `add` runs at most once per absent key.
    pub fn get_or_add<F>(&self, key: K, add: F) -> LockedValue<'_, V>
    where
        F: FnOnce() -> V,
    {
        self.inner.lock().map(move |m| m.get_or_add(key, add))
    }

    pub fn get_or_add_new(&self, key: K) -> LockedValue<'_, V>
    where
        V: Default,
    {
        self.inner.lock().map(move |m| m.get_or_add_new(key))
    }

    pub fn get_or_default(&self, key: K) -> LockedValue<'_, V>
    where
        V: Default,
    {
        self.inner.lock().map(move |m| m.get_or_default(key))
    }

    pub fn add_or_update<A, U>(&self, key: K, add: A, update: U)
    where
        A: FnOnce() -> V,
        U: FnOnce(&mut V),
    {
        self.inner.with(|m| m.add_or_update(key, add, update));
    }

    /// Read, add `delta`, write back; returns the new value. A missing key
    /// starts from `V::default()`.
    pub fn incr(&self, key: K, delta: V) -> V
    where
        V: Default + AddAssign + Clone,
    {
        self.inner.with(|m| {
            let v = m.get_or_default(key);
            *v += delta;
            v.clone()
        })
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.with(|m| m.keys())
    }

    pub fn keys_where<F>(&self, cond: F) -> Vec<K>
    where
        K: Clone,
        F: FnMut(&K) -> bool,
    {
        self.inner.with(|m| m.keys_where(cond))
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.with(|m| m.values())
    }

    /// Independent copy of the whole map, taken under the lock.
    pub fn snapshot(&self) -> Map<K, V, S>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let snap = self.inner.with(|m| m.clone());
        debug!(len = snap.len(), "map snapshot taken");
        snap
    }

    /// `action` runs under the lock for every entry.
    pub fn for_each<F>(&self, action: F)
    where
        F: FnMut(&K, &mut V),
    {
        self.inner.with(|m| m.for_each(action));
    }

    pub fn transform<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        self.inner.with(|m| m.transform(f));
    }

    pub fn replace_from<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.inner.with(|m| m.replace_from(entries));
    }

    /// Replace this map's contents with a snapshot of `other`.
    ///
    /// The two locks are never held together.
    pub fn copy_from(&self, other: &Self)
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let snap = other.inner.with(|m| m.clone());
        debug!(len = snap.len(), "map contents replaced from another map");
        self.inner.with(|m| *m = snap);
    }

    pub fn into_inner(self) -> Map<K, V, S> {
        self.inner.into_inner()
    }
}

impl<K, T, S> ConcurrentMap<K, Option<T>, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get_or_add_or_none<F>(&self, key: K, add: F) -> LockedValue<'_, T>
    where
        F: FnOnce() -> T,
    {
        self.inner
            .lock()
            .map(move |m| m.get_or_add_or_none(key, add))
    }
}

impl<K, T, S> ConcurrentMap<K, Handle<T>, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Existing handle, or one to a default `T` allocated in `arena`. The
    /// arena, not the map, owns the referent.
    pub fn get_or_add_new_in(&self, key: K, arena: &mut Arena<T>) -> Handle<T>
    where
        T: Default,
    {
        self.inner.with(|m| m.get_or_add_new_in(key, arena))
    }
}

impl<K, V, S> Default for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::from_map(Map::default())
    }
}

impl<K, V, S> Clone for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        Self::from_map(self.snapshot())
    }
}

impl<K, V, S> From<Map<K, V, S>> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn from(map: Map<K, V, S>) -> Self {
        Self::from_map(map)
    }
}

impl<K, V, S> FromIterator<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K, V, S> fmt::Debug for ConcurrentMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.with(|m| f.debug_tuple("ConcurrentMap").field(m).finish())
    }
}
