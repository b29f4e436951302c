//! ConcurrentOrderedMap: an `OrderedMap` behind one mutex. Same locking
//! contract as `ConcurrentMap`, plus locked `first`/`first_key` and the
//! `sub` ledger debit.

use crate::error::CollectionError;
use crate::guard::{Guarded, Locked, LockedValue};
use crate::handle::{Arena, Handle};
use crate::ordered_map::{Ascending, KeyOrder, OrderedMap};
use core::fmt;
use core::ops::{AddAssign, Sub};
use tracing::debug;

pub struct ConcurrentOrderedMap<K, V, O = Ascending> {
    inner: Guarded<OrderedMap<K, V, O>>,
}

impl<K, V, O> ConcurrentOrderedMap<K, V, O>
where
    O: KeyOrder<K>,
{
    pub fn new() -> Self {
        Self::from_map(OrderedMap::new())
    }

    pub fn from_map(map: OrderedMap<K, V, O>) -> Self {
        Self {
            inner: Guarded::new(map),
        }
    }

    pub fn lock(&self) -> Locked<'_, OrderedMap<K, V, O>> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut OrderedMap<K, V, O>) -> R) -> R {
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

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.with(|m| m.contains_key(key))
    }

    /// First entry in `O` order, copied out.
    pub fn first(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner
            .with(|m| m.first().map(|(k, v)| (k.clone(), v.clone())))
    }

    pub fn first_key(&self) -> Option<K>
    where
        K: Clone,
    {
        self.inner.with(|m| m.first_key().cloned())
    }

    pub fn try_add(&self, key: K, value: V) -> bool {
        self.inner.with(|m| m.try_add(key, value))
    }

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

    pub fn try_get_value(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.with(|m| m.try_get_value(key).cloned())
    }

    pub fn try_get_value_with<F>(&self, key: &K, action: F) -> bool
    where
        F: FnOnce(&V),
    {
        self.inner.with(|m| m.try_get_value_with(key, action))
    }

    pub fn try_check_value<F>(&self, key: &K, cond: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        self.inner.with(|m| m.try_check_value(key, cond))
    }

    pub fn value(&self, key: &K) -> Option<LockedValue<'_, V>> {
        self.inner.lock().try_map(|m| m.try_get_value_mut(key))
    }

    pub fn try_remove(&self, key: &K) -> Option<V> {
        self.inner.with(|m| m.try_remove(key))
    }

    pub fn try_remove_with<F>(&self, key: &K, action: F) -> bool
    where
        F: FnOnce(V),
    {
        self.inner.with(|m| m.try_remove_with(key, action))
    }

    /// True iff removed.
    pub fn try_remove_if<F>(&self, key: &K, cond: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        self.inner.with(|m| m.try_remove_if(key, cond))
    }

    /// True iff the key is still present afterward.
    pub fn try_remove_when<F>(&self, key: &K, cond: F) -> bool
    where
        F: FnOnce(&mut V) -> bool,
    {
        self.inner.with(|m| m.try_remove_when(key, cond))
    }

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

    /// Locked ledger debit; see `OrderedMap::sub`.
    pub fn sub(&self, key: K, amount: V) -> bool
    where
        V: Default + PartialOrd + Sub<Output = V>,
    {
        self.inner.with(|m| m.sub(key, amount))
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

    pub fn snapshot(&self) -> OrderedMap<K, V, O>
    where
        K: Clone,
        V: Clone,
    {
        let snap = self.inner.with(|m| m.clone());
        debug!(len = snap.len(), "ordered map snapshot taken");
        snap
    }

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

    pub fn copy_from(&self, other: &Self)
    where
        K: Clone,
        V: Clone,
    {
        let snap = other.inner.with(|m| m.clone());
        debug!(len = snap.len(), "ordered map contents replaced from another map");
        self.inner.with(|m| *m = snap);
    }

    pub fn into_inner(self) -> OrderedMap<K, V, O> {
        self.inner.into_inner()
    }
}

impl<K, T, O> ConcurrentOrderedMap<K, Option<T>, O>
where
    O: KeyOrder<K>,
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

impl<K, T, O> ConcurrentOrderedMap<K, Handle<T>, O>
where
    O: KeyOrder<K>,
{
    pub fn get_or_add_new_in(&self, key: K, arena: &mut Arena<T>) -> Handle<T>
    where
        T: Default,
    {
        self.inner.with(|m| m.get_or_add_new_in(key, arena))
    }
}

impl<K, V, O: KeyOrder<K>> Default for ConcurrentOrderedMap<K, V, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, O: KeyOrder<K>> Clone for ConcurrentOrderedMap<K, V, O> {
    fn clone(&self) -> Self {
        Self::from_map(self.snapshot())
    }
}

impl<K, V, O: KeyOrder<K>> From<OrderedMap<K, V, O>> for ConcurrentOrderedMap<K, V, O> {
    fn from(map: OrderedMap<K, V, O>) -> Self {
        Self::from_map(map)
    }
}

impl<K, V, O: KeyOrder<K>> FromIterator<(K, V)> for ConcurrentOrderedMap<K, V, O> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O> fmt::Debug for ConcurrentOrderedMap<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|m| f.debug_tuple("ConcurrentOrderedMap").field(m).finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordered_map::Descending;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    #[test]
    fn first_and_sub_under_the_lock() {
        let book: ConcurrentOrderedMap<i64, i32, Descending> = ConcurrentOrderedMap::new();
        book.try_add(1, 100);
        book.try_add(5, 10);
        assert_eq!(book.first(), Some((5, 10)));
        assert!(!book.sub(5, 10));
        assert_eq!(book.first_key(), Some(1));
        assert!(book.sub(1, 99));
        assert_eq!(book.try_get_value(&1), Some(1));
    }

    /// Invariant: concurrent debits never leave a non-positive balance.
    #[test]
    fn concurrent_debits_evict_exactly_once() {
        let book: Arc<ConcurrentOrderedMap<u32, u64>> = Arc::new(ConcurrentOrderedMap::new());
        book.add(0, 1_000);
        let evictions: usize = (0..4)
            .map(|_| {
                let book = book.clone();
                std::thread::spawn(move || (0..300).filter(|_| !book.sub(0, 1)).count())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();
        assert!(!book.contains_key(&0));
        // 1000 debits drain the balance; the rest see an absent key
        assert_eq!(evictions, 1_200 - 999);
    }

    #[test]
    fn copy_from_keeps_order() {
        let a: ConcurrentOrderedMap<u8, u8, Descending> = (1..=3).map(|k| (k, k)).collect();
        let b = ConcurrentOrderedMap::new();
        b.copy_from(&a);
        assert_eq!(b.keys(), vec![3, 2, 1]);
        assert_eq!(b.snapshot().first(), Some((&3, &3)));
    }

    #[test]
    fn racing_get_or_add_runs_factory_once() {
        const THREADS: usize = 8;
        let m: Arc<ConcurrentOrderedMap<u32, usize>> = Arc::new(ConcurrentOrderedMap::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let (m, calls, barrier) = (m.clone(), calls.clone(), barrier.clone());
                std::thread::spawn(move || {
                    barrier.wait();
                    let v = m.get_or_add(1, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        i
                    });
                    *v
                })
            })
            .collect();
        let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|v| *v == seen[0]));
        assert_eq!(m.try_get_value(&1), Some(seen[0]));
    }

    #[test]
    fn concurrent_add_or_update_and_incr_lose_nothing() {
        let m: ConcurrentOrderedMap<u8, u64> = ConcurrentOrderedMap::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for i in 0..500u64 {
                        m.add_or_update(0, || 1, |v| *v += 1);
                        m.incr((i % 2) as u8 + 1, 2);
                    }
                });
            }
        });
        assert_eq!(m.try_get_value(&0), Some(4_000));
        assert_eq!(m.try_get_value(&1), Some(4_000));
        assert_eq!(m.try_get_value(&2), Some(4_000));
    }

    #[test]
    fn try_remove_if_race_has_a_single_winner() {
        let m: ConcurrentOrderedMap<&'static str, u32> = ConcurrentOrderedMap::new();
        m.add("job", 7);
        let wins: usize = std::thread::scope(|s| {
            let hs: Vec<_> = (0..8)
                .map(|_| s.spawn(|| m.try_remove_if(&"job", |v| *v == 7) as usize))
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(wins, 1);
        assert!(m.is_empty());
    }

    /// try_remove_when reports whether the key survived.
    #[test]
    fn try_remove_when_reports_presence() {
        let m: ConcurrentOrderedMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
        assert!(m.try_remove_when(&1, |v| *v > 10));
        assert!(m.contains_key(&1));
        assert!(!m.try_remove_when(&1, |v| *v == 10));
        assert!(!m.contains_key(&1));
        assert!(!m.try_remove_when(&3, |_| unreachable!()));
        assert!(!m.try_remove_if(&2, |v| *v > 20));
        assert!(m.try_check_value(&2, |v| *v == 20));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn locked_value_accessors_mutate_in_place() {
        let m: ConcurrentOrderedMap<&'static str, Vec<u8>> = ConcurrentOrderedMap::new();
        m.get_or_add("a", Vec::new).push(1);
        m.get_or_add_new("a").push(2);
        m.get_or_default("b").push(3);
        if let Some(mut v) = m.value(&"b") {
            v.push(4);
        }
        assert!(m.value(&"zz").is_none());
        assert_eq!(m.values(), vec![vec![1, 2], vec![3, 4]]);
        m.transform(|_, v| v.iter().rev().copied().collect());
        m.for_each(|_, v| v.push(0));
        assert_eq!(m.try_get_value(&"a"), Some(vec![2, 1, 0]));
        assert_eq!(m.keys_where(|k| k.starts_with('b')), vec!["b"]);
        m.replace_from([("c", vec![9])]);
        assert_eq!(m.keys(), vec!["c"]);
    }

    #[test]
    fn option_and_handle_values() {
        let opts: ConcurrentOrderedMap<u8, Option<String>> = ConcurrentOrderedMap::new();
        opts.add(1, None);
        opts.get_or_add_or_none(1, || "x".into()).push('y');
        assert_eq!(opts.try_get_value(&1), Some(Some("xy".to_string())));

        let handles: ConcurrentOrderedMap<u8, Handle<String>> = ConcurrentOrderedMap::new();
        let mut arena = Arena::new();
        let h = handles.get_or_add_new_in(1, &mut arena);
        assert_eq!(handles.get_or_add_new_in(1, &mut arena), h);
        handles.clear();
        assert_eq!(h.get(&arena).map(String::as_str), Some(""));
        assert_eq!(arena.len(), 1);
    }
}
