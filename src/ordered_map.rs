//! OrderedMap: key -> value container kept sorted by an injected key order.
//!
//! Same contract as `Map`, plus first-entry access and the `sub` ledger
//! operation: a per-key running balance that evicts itself when it reaches
//! zero or below.
//!
//! Lookups take `&K` rather than a borrowed form of the key: the stored key
//! is ordered by `O`, which is only defined over `K`. A `String`-keyed map
//! therefore needs a `String` to look up; keep one around for hot paths.

use crate::error::CollectionError;
use crate::handle::{Arena, Handle};
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Index, Sub};
use std::collections::btree_map::{self, BTreeMap, Entry};
use tracing::trace;

/// Total order over `K` used to sort an `OrderedMap`.
pub trait KeyOrder<K: ?Sized> {
    fn compare(a: &K, b: &K) -> Ordering;
}

/// Smallest key first (`Ord` order).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ascending;

/// Largest key first (reverse `Ord` order).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Descending;

impl<K: ?Sized + Ord> KeyOrder<K> for Ascending {
    #[inline]
    fn compare(a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized + Ord> KeyOrder<K> for Descending {
    #[inline]
    fn compare(a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

/// Stored key: `K` ordered by `O` instead of its own `Ord`.
#[repr(transparent)]
struct OrderedKey<K, O> {
    key: K,
    _order: PhantomData<fn() -> O>,
}

impl<K, O> OrderedKey<K, O> {
    #[inline]
    fn wrap(key: K) -> Self {
        Self {
            key,
            _order: PhantomData,
        }
    }

    /// View a borrowed key as a stored key, for lookups without cloning.
    #[inline]
    fn from_ref(key: &K) -> &Self {
        // SAFETY: `OrderedKey` is `repr(transparent)` over `K`; the only
        // other field is a zero-sized, align-1 `PhantomData`.
        unsafe { &*(key as *const K as *const Self) }
    }
}

impl<K: Clone, O> Clone for OrderedKey<K, O> {
    fn clone(&self) -> Self {
        Self::wrap(self.key.clone())
    }
}

impl<K, O: KeyOrder<K>> PartialEq for OrderedKey<K, O> {
    fn eq(&self, other: &Self) -> bool {
        O::compare(&self.key, &other.key) == Ordering::Equal
    }
}

impl<K, O: KeyOrder<K>> Eq for OrderedKey<K, O> {}

impl<K, O: KeyOrder<K>> PartialOrd for OrderedKey<K, O> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, O: KeyOrder<K>> Ord for OrderedKey<K, O> {
    fn cmp(&self, other: &Self) -> Ordering {
        O::compare(&self.key, &other.key)
    }
}

pub struct OrderedMap<K, V, O = Ascending> {
    entries: BTreeMap<OrderedKey<K, O>, V>,
}

impl<K, V, O> Default for OrderedMap<K, V, O>
where
    O: KeyOrder<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, O> OrderedMap<K, V, O>
where
    O: KeyOrder<K>,
{
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn any(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(OrderedKey::<K, O>::from_ref(key))
    }

    /// Entry with the first key in `O` order.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.entries.iter().next().map(|(k, v)| (&k.key, v))
    }

    pub fn first_key(&self) -> Option<&K> {
        self.entries.keys().next().map(|k| &k.key)
    }

    /// Insert only if `key` is absent. Never overwrites.
    pub fn try_add(&mut self, key: K, value: V) -> bool {
        match self.entries.entry(OrderedKey::wrap(key)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(value);
                true
            }
        }
    }

    pub fn try_add_with<F>(&mut self, key: K, make: F) -> bool
    where
        F: FnOnce() -> V,
    {
        match self.entries.entry(OrderedKey::wrap(key)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(make());
                true
            }
        }
    }

    pub fn insert_new(&mut self, key: K, value: V) -> Result<&mut V, CollectionError> {
        match self.entries.entry(OrderedKey::wrap(key)) {
            Entry::Occupied(_) => Err(CollectionError::DuplicateKey),
            Entry::Vacant(v) => Ok(v.insert(value)),
        }
    }

    /// Insert or overwrite. Returns true if a new key was created.
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.entries.insert(OrderedKey::wrap(key), value).is_none()
    }

    pub fn try_get_value(&self, key: &K) -> Option<&V> {
        self.entries.get(OrderedKey::<K, O>::from_ref(key))
    }

    pub fn try_get_value_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(OrderedKey::<K, O>::from_ref(key))
    }

    pub fn try_get_value_with<F>(&self, key: &K, action: F) -> bool
    where
        F: FnOnce(&V),
    {
        match self.try_get_value(key) {
            Some(v) => {
                action(v);
                true
            }
            None => false,
        }
    }

    pub fn try_check_value<F>(&mut self, key: &K, cond: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        self.try_get_value_mut(key).map(cond).unwrap_or(false)
    }

    pub fn try_remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(OrderedKey::<K, O>::from_ref(key))
    }

    pub fn try_remove_with<F>(&mut self, key: &K, action: F) -> bool
    where
        F: FnOnce(V),
    {
        match self.try_remove(key) {
            Some(v) => {
                action(v);
                true
            }
            None => false,
        }
    }

    /// Remove only if present and `cond` holds. True iff removed.
    pub fn try_remove_if<F>(&mut self, key: &K, cond: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        let remove = self.try_get_value_mut(key).map(cond).unwrap_or(false);
        if remove {
            self.try_remove(key);
        }
        remove
    }

    /// Remove if `cond` holds. True iff the key is still present afterward.
    pub fn try_remove_when<F>(&mut self, key: &K, cond: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        let remove = match self.try_get_value_mut(key) {
            Some(v) => cond(v),
            None => return false,
        };
        if remove {
            self.try_remove(key);
        }
        !remove
    }

    pub fn get_or_add<F>(&mut self, key: K, add: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.entries.entry(OrderedKey::wrap(key)).or_insert_with(add)
    }

    pub fn get_or_add_new(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entries.entry(OrderedKey::wrap(key)).or_default()
    }

    /// Auto-vivifying access for values with a meaningful default.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entries.entry(OrderedKey::wrap(key)).or_default()
    }

    pub fn add_or_update<A, U>(&mut self, key: K, add: A, update: U)
    where
        A: FnOnce() -> V,
        U: FnOnce(&mut V),
    {
        match self.entries.entry(OrderedKey::wrap(key)) {
            Entry::Occupied(mut o) => update(o.get_mut()),
            Entry::Vacant(v) => {
                v.insert(add());
            }
        }
    }

    /// Ledger debit: subtract `amount` from the balance at `key`.
    ///
    /// A missing key counts as `V::default()`. When the balance would drop
    /// to zero or below the entry is evicted instead. Returns true iff a
    /// positive remainder is still stored.
    ///
    /// Overflow follows `V`'s `-`: for primitive integers it panics in debug
    /// builds, e.g. a negative `amount` on a balance near `V::MAX`, or
    /// `MIN` on a missing key.
    pub fn sub(&mut self, key: K, amount: V) -> bool
    where
        V: Default + PartialOrd + Sub<Output = V>,
    {
        // `balance > amount` is `balance - amount > 0` without underflow.
        match self.entries.entry(OrderedKey::wrap(key)) {
            Entry::Occupied(mut o) => {
                if *o.get() > amount {
                    let balance = o.get_mut();
                    let current = core::mem::take(balance);
                    *balance = current - amount;
                    true
                } else {
                    o.remove();
                    trace!("ledger entry exhausted and evicted");
                    false
                }
            }
            Entry::Vacant(slot) => {
                let zero = V::default();
                if zero > amount {
                    slot.insert(zero - amount);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Keys in `O` order, copied out.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.entries.keys().map(|k| k.key.clone()).collect()
    }

    pub fn keys_where<F>(&self, mut cond: F) -> Vec<K>
    where
        K: Clone,
        F: FnMut(&K) -> bool,
    {
        self.entries
            .keys()
            .filter(|k| cond(&k.key))
            .map(|k| k.key.clone())
            .collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.entries.values().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (&k.key, v))
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (&K, &mut V)> + '_ {
        self.entries.iter_mut().map(|(k, v)| (&k.key, v))
    }

    pub fn for_each<F>(&mut self, mut action: F)
    where
        F: FnMut(&K, &mut V),
    {
        for (k, v) in self.entries.iter_mut() {
            action(&k.key, v);
        }
    }

    pub fn transform<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        for (k, v) in self.entries.iter_mut() {
            let next = f(&k.key, v);
            *v = next;
        }
    }

    pub fn replace_from<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.entries.clear();
        self.extend(entries);
    }
}

impl<K, T, O> OrderedMap<K, Option<T>, O>
where
    O: KeyOrder<K>,
{
    /// Existing `Some` value, or fill a missing or `None` slot from `add`.
    pub fn get_or_add_or_none<F>(&mut self, key: K, add: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        self.entries
            .entry(OrderedKey::wrap(key))
            .or_insert(None)
            .get_or_insert_with(add)
    }
}

impl<K, T, O> OrderedMap<K, Handle<T>, O>
where
    O: KeyOrder<K>,
{
    /// Existing handle, or a handle to a default `T` allocated in `arena`.
    pub fn get_or_add_new_in(&mut self, key: K, arena: &mut Arena<T>) -> Handle<T>
    where
        T: Default,
    {
        *self
            .entries
            .entry(OrderedKey::wrap(key))
            .or_insert_with(|| arena.insert_default())
    }
}

impl<K, V, O: KeyOrder<K>> Index<&K> for OrderedMap<K, V, O> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        match self.try_get_value(key) {
            Some(v) => v,
            None => panic!("OrderedMap index: key not present"),
        }
    }
}

impl<K: Clone, V: Clone, O> Clone for OrderedMap<K, V, O> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K, V: PartialEq, O: KeyOrder<K>> PartialEq for OrderedMap<K, V, O> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O> fmt::Debug for OrderedMap<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (&k.key, v)))
            .finish()
    }
}

impl<K, V, O: KeyOrder<K>> FromIterator<(K, V)> for OrderedMap<K, V, O> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

impl<K, V, O: KeyOrder<K>> Extend<(K, V)> for OrderedMap<K, V, O> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.entries.insert(OrderedKey::wrap(k), v);
        }
    }
}

impl<K: Ord, V> From<BTreeMap<K, V>> for OrderedMap<K, V> {
    fn from(src: BTreeMap<K, V>) -> Self {
        src.into_iter().collect()
    }
}

/// Owning iterator in `O` order.
pub struct IntoIter<K, V, O> {
    inner: btree_map::IntoIter<OrderedKey<K, O>, V>,
}

impl<K, V, O> Iterator for IntoIter<K, V, O> {
    type Item = (K, V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.key, v))
    }
}

impl<K, V, O> IntoIterator for OrderedMap<K, V, O> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, O>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.entries.into_iter(),
        }
    }
}
