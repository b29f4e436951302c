//! Map: unordered key -> value container with try/compound operations.
//!
//! Keys are unique and immutable once inserted. The map owns its entries;
//! when `V` is a `Handle<T>` it owns only the handle, never the referent.

use crate::error::CollectionError;
use crate::handle::{Arena, Handle};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::{self, Entry};
use std::collections::hash_map::RandomState;

pub struct Map<K, V, S = RandomState> {
    entries: hashbrown::HashMap<K, V, S>,
}

impl<K, V> Map<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> Default for Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            entries: hashbrown::HashMap::with_hasher(hasher),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            entries: hashbrown::HashMap::with_capacity_and_hasher(capacity, hasher),
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

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.contains_key(q)
    }

    /// Insert only if `key` is absent. Never overwrites.
    pub fn try_add(&mut self, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(value);
                true
            }
        }
    }

    /// Insert a lazily built value only if `key` is absent; `make` runs only
    /// on insertion.
    pub fn try_add_with<F>(&mut self, key: K, make: F) -> bool
    where
        F: FnOnce() -> V,
    {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(make());
                true
            }
        }
    }

    /// Checked insert: the new value on success, `DuplicateKey` otherwise.
    pub fn insert_new(&mut self, key: K, value: V) -> Result<&mut V, CollectionError> {
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(CollectionError::DuplicateKey),
            Entry::Vacant(v) => Ok(v.insert(value)),
        }
    }

    /// Insert or overwrite. Returns true if a new key was created.
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.entries.insert(key, value).is_none()
    }

    pub fn try_get_value<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.get(q)
    }

    pub fn try_get_value_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.get_mut(q)
    }

    /// Run `action` on the value if present. Returns whether it ran.
    pub fn try_get_value_with<Q, F>(&self, q: &Q, action: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V),
    {
        match self.entries.get(q) {
            Some(v) => {
                action(v);
                true
            }
            None => false,
        }
    }

    /// False when absent, otherwise the result of `cond` on the value.
    pub fn try_check_value<Q, F>(&mut self, q: &Q, cond: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> bool,
    {
        self.entries.get_mut(q).map(cond).unwrap_or(false)
    }

    pub fn try_remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.entries.remove(q)
    }

    /// Remove and hand the value to `action`. Returns whether a value was
    /// removed.
    pub fn try_remove_with<Q, F>(&mut self, q: &Q, action: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(V),
    {
        match self.entries.remove(q) {
            Some(v) => {
                action(v);
                true
            }
            None => false,
        }
    }

    /// Remove only if the key exists and `cond` holds for its value.
    ///
    /// Returns true iff the removal happened. Compare `try_remove_when`,
    /// which reports the opposite fact.
    pub fn try_remove_if<Q, F>(&mut self, q: &Q, cond: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> bool,
    {
        let remove = match self.entries.get_mut(q) {
            Some(v) => cond(v),
            None => false,
        };
        if remove {
            self.entries.remove(q);
        }
        remove
    }

    /// Remove if `cond` holds, otherwise keep the entry.
    ///
    /// Returns true iff the key is still present afterward: false when it
    /// was absent to begin with or was just removed.
    pub fn try_remove_when<Q, F>(&mut self, q: &Q, cond: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> bool,
    {
        let remove = match self.entries.get_mut(q) {
            Some(v) => cond(v),
            None => return false,
        };
        if remove {
            self.entries.remove(q);
        }
        !remove
    }

    /// Existing value, or the factory's value freshly inserted.
    pub fn get_or_add<F>(&mut self, key: K, add: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.entries.entry(key).or_insert_with(add)
    }

    pub fn get_or_add_new(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entries.entry(key).or_default()
    }

    /// Auto-vivifying access: a missing key gets `V::default()`. Only
    /// available when `V` has a meaningful default; plain indexing panics
    /// on a missing key instead.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entries.entry(key).or_default()
    }

    /// Insert via `add` when absent, otherwise mutate in place via `update`.
    pub fn add_or_update<A, U>(&mut self, key: K, add: A, update: U)
    where
        A: FnOnce() -> V,
        U: FnOnce(&mut V),
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut o) => update(o.get_mut()),
            Entry::Vacant(v) => {
                v.insert(add());
            }
        }
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.entries.keys().cloned().collect()
    }

    pub fn keys_where<F>(&self, mut cond: F) -> Vec<K>
    where
        K: Clone,
        F: FnMut(&K) -> bool,
    {
        self.entries.keys().filter(|k| cond(k)).cloned().collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.entries.values().cloned().collect()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> hash_map::IterMut<'_, K, V> {
        self.entries.iter_mut()
    }

    pub fn for_each<F>(&mut self, mut action: F)
    where
        F: FnMut(&K, &mut V),
    {
        for (k, v) in self.entries.iter_mut() {
            action(k, v);
        }
    }

    /// Replace every value with `f(key, old)`.
    pub fn transform<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        for (k, v) in self.entries.iter_mut() {
            let next = f(k, v);
            *v = next;
        }
    }

    /// Clear, then fill from `entries`.
    pub fn replace_from<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.entries.clear();
        self.entries.extend(entries);
    }
}

impl<K, T, S> Map<K, Option<T>, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Existing `Some` value, or fill a missing or `None` slot from `add`.
    pub fn get_or_add_or_none<F>(&mut self, key: K, add: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        self.entries.entry(key).or_insert(None).get_or_insert_with(add)
    }
}

impl<K, T, S> Map<K, Handle<T>, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Existing handle, or a handle to a default `T` freshly allocated in
    /// `arena`. The arena keeps ownership; removing the entry never frees it.
    pub fn get_or_add_new_in(&mut self, key: K, arena: &mut Arena<T>) -> Handle<T>
    where
        T: Default,
    {
        *self
            .entries
            .entry(key)
            .or_insert_with(|| arena.insert_default())
    }
}

impl<K, Q, V, S> Index<&Q> for Map<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if the key is absent; use `try_get_value` or `get_or_add`
    /// when a miss is expected.
    fn index(&self, key: &Q) -> &V {
        match self.entries.get(key) {
            Some(v) => v,
            None => panic!("Map index: key not present"),
        }
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for Map<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K, V, S> PartialEq for Map<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Map<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K, V, S> FromIterator<(K, V)> for Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<K, V> From<std::collections::HashMap<K, V>> for Map<K, V>
where
    K: Eq + Hash,
{
    fn from(src: std::collections::HashMap<K, V>) -> Self {
        src.into_iter().collect()
    }
}

impl<K, V, S> IntoIterator for Map<K, V, S> {
    type Item = (K, V);
    type IntoIter = hash_map::IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a Map<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = hash_map::Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::hash::Hasher;

    /// Absent keys leave the caller's previous value untouched.
    #[test]
    fn try_get_value_miss_reports_absence() {
        let mut m: Map<String, i32> = Map::new();
        m.add("present".to_string(), 1);
        let mut out = 99;
        if let Some(v) = m.try_get_value("absent") {
            out = *v;
        }
        assert_eq!(out, 99);
        assert_eq!(m.try_get_value("present"), Some(&1));
    }

    /// The first value wins; the second try_add reports false.
    #[test]
    fn try_add_never_overwrites() {
        let mut m: Map<&'static str, i32> = Map::new();
        assert!(m.try_add("k", 1));
        assert!(!m.try_add("k", 2));
        assert_eq!(m["k"], 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn add_overwrites_and_reports_new_keys() {
        let mut m: Map<&'static str, i32> = Map::new();
        assert!(m.add("k", 1));
        assert!(!m.add("k", 2));
        assert_eq!(m["k"], 2);
    }

    #[test]
    fn try_add_with_is_lazy() {
        let mut m: Map<&'static str, String> = Map::new();
        let calls = Cell::new(0);
        let make = || {
            calls.set(calls.get() + 1);
            "v".to_string()
        };
        assert!(m.try_add_with("k", make));
        assert!(!m.try_add_with("k", make));
        assert_eq!(calls.get(), 1, "factory must not run on duplicate");
    }

    #[test]
    fn insert_new_rejects_duplicates() {
        let mut m: Map<String, i32> = Map::new();
        *m.insert_new("a".to_string(), 1).unwrap() += 1;
        match m.insert_new("a".to_string(), 5) {
            Err(CollectionError::DuplicateKey) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(m["a"], 2);
    }

    #[test]
    fn try_remove_yields_value_once() {
        let mut m: Map<i32, String> = Map::new();
        m.add(1, "one".to_string());
        assert_eq!(m.try_remove(&1).as_deref(), Some("one"));
        assert_eq!(m.try_remove(&1), None);
        let mut seen = None;
        m.add(2, "two".to_string());
        assert!(m.try_remove_with(&2, |v| seen = Some(v)));
        assert!(!m.try_remove_with(&2, |_| unreachable!()));
        assert_eq!(seen.as_deref(), Some("two"));
    }

    /// try_remove_if reports "removed"; try_remove_when reports "still present".
    #[test]
    fn remove_if_and_remove_when_have_inverted_senses() {
        let mut m: Map<&'static str, i32> = Map::new();
        m.add("a", 1);
        m.add("b", 2);

        // Condition false: entry stays
        assert!(!m.try_remove_if(&"a", |v| *v > 5));
        assert!(m.try_remove_when(&"a", |v| *v > 5));
        assert!(m.contains_key(&"a"));

        // Condition true: entry goes
        assert!(m.try_remove_if(&"a", |v| *v == 1));
        assert!(!m.contains_key(&"a"));
        assert!(!m.try_remove_when(&"b", |v| *v == 2));
        assert!(!m.contains_key(&"b"));

        // Absent: neither runs the predicate, both report false
        assert!(!m.try_remove_if(&"zz", |_| unreachable!()));
        assert!(!m.try_remove_when(&"zz", |_| unreachable!()));
    }

    #[test]
    fn try_check_value_and_with() {
        let mut m: Map<i32, i32> = Map::new();
        m.add(1, 10);
        assert!(m.try_check_value(&1, |v| *v == 10));
        assert!(!m.try_check_value(&1, |v| *v == 11));
        assert!(!m.try_check_value(&2, |_| true));
        let mut got = 0;
        assert!(m.try_get_value_with(&1, |v| got = *v));
        assert!(!m.try_get_value_with(&2, |_| unreachable!()));
        assert_eq!(got, 10);
    }

    #[test]
    fn get_or_add_returns_existing_or_inserts_once() {
        let mut m: Map<&'static str, Vec<i32>> = Map::new();
        m.get_or_add("k", Vec::new).push(1);
        m.get_or_add("k", || unreachable!()).push(2);
        assert_eq!(m["k"], vec![1, 2]);
        m.get_or_add_new("n").push(3);
        assert_eq!(m["n"], vec![3]);
    }

    #[test]
    fn add_or_update_inserts_then_mutates() {
        let mut m: Map<&'static str, i32> = Map::new();
        m.add_or_update("k", || 1, |_| unreachable!());
        m.add_or_update("k", || unreachable!(), |v| *v += 10);
        assert_eq!(m["k"], 11);
    }

    #[test]
    fn get_or_default_auto_vivifies() {
        let mut m: Map<&'static str, u64> = Map::new();
        *m.get_or_default("hits") += 1;
        *m.get_or_default("hits") += 1;
        assert_eq!(m["hits"], 2);
    }

    #[test]
    #[should_panic(expected = "key not present")]
    fn index_on_missing_key_panics() {
        let m: Map<&'static str, i32> = Map::new();
        let _ = m["nope"];
    }

    #[test]
    fn option_values_refill_none_slots() {
        let mut m: Map<i32, Option<String>> = Map::new();
        m.add(1, None);
        assert_eq!(m.get_or_add_or_none(1, || "filled".to_string()), "filled");
        assert_eq!(m.get_or_add_or_none(1, || unreachable!()), "filled");
        assert_eq!(m.get_or_add_or_none(2, || "new".to_string()), "new");
        assert_eq!(m.len(), 2);
    }

    /// Removing or clearing handle-valued entries never frees the referent.
    #[test]
    fn handle_values_are_not_owned() {
        let mut arena: Arena<String> = Arena::new();
        let mut m: Map<i32, Handle<String>> = Map::new();
        let h = m.get_or_add_new_in(1, &mut arena);
        h.get_mut(&mut arena).unwrap().push_str("four");
        assert_eq!(m.get_or_add_new_in(1, &mut arena), h);

        let shared = arena.insert("shared".to_string());
        m.add(2, shared);
        m.add(3, shared);
        assert_eq!(m.try_remove(&2), Some(shared));
        m.clear();
        drop(m);

        assert_eq!(arena.len(), 2);
        assert_eq!(h.get(&arena).map(String::as_str), Some("four"));
        assert_eq!(arena.remove(shared).as_deref(), Some("shared"));
    }

    #[test]
    fn keys_and_values_are_snapshots() {
        let mut m: Map<String, i32> = Map::new();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            m.add(k.to_string(), i as i32);
        }
        let keys: BTreeSet<String> = m.keys().into_iter().collect();
        m.clear();
        assert_eq!(keys.len(), 3);
        assert!(m.keys().is_empty());

        m.add("ab".to_string(), 1);
        m.add("b".to_string(), 2);
        assert_eq!(m.keys_where(|k| k.starts_with('a')), vec!["ab".to_string()]);
        let mut vals = m.values();
        vals.sort();
        assert_eq!(vals, vec![1, 2]);
    }

    #[test]
    fn transform_and_for_each_rewrite_values() {
        let mut m: Map<i32, i32> = (1..=3).map(|k| (k, k * 10)).collect();
        m.transform(|k, v| v + k);
        assert_eq!(m[&2], 22);
        m.for_each(|_, v| *v = -*v);
        let total: i32 = m.iter().map(|(_, v)| *v).sum();
        assert_eq!(total, -(11 + 22 + 33));
    }

    #[test]
    fn replace_from_clears_first() {
        let mut m: Map<i32, i32> = Map::new();
        m.add(100, 100);
        m.replace_from(vec![(1, 1), (2, 2)]);
        assert_eq!(m.len(), 2);
        assert!(!m.contains_key(&100));
        let copy = m.clone();
        assert_eq!(copy, m);
    }

    /// Lookups stay correct when every key lands in one bucket.
    #[test]
    fn collision_handling_with_const_hasher() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        let mut m: Map<String, i32, ConstBuildHasher> = Map::with_hasher(ConstBuildHasher);
        m.add("a".to_string(), 1);
        m.add("b".to_string(), 2);
        assert_eq!(m["a"], 1);
        assert_eq!(m["b"], 2);
        assert!(m.try_remove_if("a", |v| *v == 1));
        assert_eq!(m.try_get_value("b"), Some(&2));
    }
}
