#![cfg(test)]

// Property tests for Map and OrderedMap, kept inside the crate next to the
// modules they exercise.

use crate::error::CollectionError;
use crate::map::Map;
use crate::ordered_map::{Descending, OrderedMap};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    TryAdd(usize, i32),
    Add(usize, i32),
    InsertNew(usize, i32),
    Get(usize),
    Remove(usize),
    RemoveIf(usize, i32),
    RemoveWhen(usize, i32),
    GetOrAdd(usize, i32),
    AddOrUpdate(usize, i32),
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=6).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let v = -50i32..50;
        let op = prop_oneof![
            4 => (idx.clone(), v.clone()).prop_map(|(i, v)| Op::TryAdd(i, v)),
            3 => (idx.clone(), v.clone()).prop_map(|(i, v)| Op::Add(i, v)),
            2 => (idx.clone(), v.clone()).prop_map(|(i, v)| Op::InsertNew(i, v)),
            3 => idx.clone().prop_map(Op::Get),
            2 => idx.clone().prop_map(Op::Remove),
            2 => (idx.clone(), v.clone()).prop_map(|(i, t)| Op::RemoveIf(i, t)),
            2 => (idx.clone(), v.clone()).prop_map(|(i, t)| Op::RemoveWhen(i, t)),
            3 => (idx.clone(), v.clone()).prop_map(|(i, v)| Op::GetOrAdd(i, v)),
            3 => (idx.clone(), v.clone()).prop_map(|(i, d)| Op::AddOrUpdate(i, d)),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// - try_add never overwrites; add reports whether the key was new.
// - try_remove_if reports removal; try_remove_when reports survival.
// - get_or_add runs its factory only for absent keys.
// - len and the key set match the model after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_map_matches_model((pool, ops) in arb_scenario()) {
        let mut sut: Map<Key, i32> = Map::new();
        let mut model: HashMap<Key, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::TryAdd(i, v) => {
                    let k = Key(pool[i].clone());
                    let fresh = !model.contains_key(&k);
                    prop_assert_eq!(sut.try_add(k.clone(), v), fresh);
                    model.entry(k).or_insert(v);
                }
                Op::Add(i, v) => {
                    let k = Key(pool[i].clone());
                    let fresh = model.insert(k.clone(), v).is_none();
                    prop_assert_eq!(sut.add(k, v), fresh);
                }
                Op::InsertNew(i, v) => {
                    let k = Key(pool[i].clone());
                    match sut.insert_new(k.clone(), v) {
                        Ok(stored) => {
                            prop_assert_eq!(*stored, v);
                            prop_assert!(model.insert(k, v).is_none());
                        }
                        Err(e) => {
                            prop_assert_eq!(e, CollectionError::DuplicateKey);
                            prop_assert!(model.contains_key(&k));
                        }
                    }
                }
                Op::Get(i) => {
                    let s: &str = &pool[i];
                    prop_assert_eq!(sut.try_get_value(s), model.get(s));
                    prop_assert_eq!(sut.contains_key(s), model.contains_key(s));
                }
                Op::Remove(i) => {
                    let s: &str = &pool[i];
                    prop_assert_eq!(sut.try_remove(s), model.remove(s));
                }
                Op::RemoveIf(i, t) => {
                    let s: &str = &pool[i];
                    let expect = model.get(s).map_or(false, |v| *v < t);
                    prop_assert_eq!(sut.try_remove_if(s, |v| *v < t), expect);
                    if expect {
                        model.remove(s);
                    }
                }
                Op::RemoveWhen(i, t) => {
                    let s: &str = &pool[i];
                    let remove = model.get(s).map(|v| *v < t);
                    let still_there = remove == Some(false);
                    prop_assert_eq!(sut.try_remove_when(s, |v| *v < t), still_there);
                    if remove == Some(true) {
                        model.remove(s);
                    }
                }
                Op::GetOrAdd(i, v) => {
                    let k = Key(pool[i].clone());
                    let fresh = !model.contains_key(&k);
                    let mut ran = false;
                    let got = *sut.get_or_add(k.clone(), || { ran = true; v });
                    prop_assert_eq!(ran, fresh);
                    prop_assert_eq!(got, *model.entry(k).or_insert(v));
                }
                Op::AddOrUpdate(i, d) => {
                    let k = Key(pool[i].clone());
                    sut.add_or_update(k.clone(), || d, |v| *v = v.wrapping_add(d));
                    model.entry(k).and_modify(|v| *v = v.wrapping_add(d)).or_insert(d);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }

        let mut keys = sut.keys();
        keys.sort();
        let mut expected: Vec<Key> = model.keys().cloned().collect();
        expected.sort();
        prop_assert_eq!(keys, expected);
    }
}

#[derive(Clone, Debug)]
enum LedgerOp {
    Credit(u8, u16),
    Debit(u8, u16),
    Remove(u8),
}

fn arb_ledger_ops() -> impl Strategy<Value = Vec<LedgerOp>> {
    let op = prop_oneof![
        (0u8..6, 0u16..200).prop_map(|(k, a)| LedgerOp::Credit(k, a)),
        (0u8..6, 0u16..200).prop_map(|(k, a)| LedgerOp::Debit(k, a)),
        (0u8..6).prop_map(LedgerOp::Remove),
    ];
    proptest::collection::vec(op, 1..100)
}

// Property: an OrderedMap used as a ledger tracks a BTreeMap model and never
// holds a zero balance.
// - sub returns true iff a positive remainder is stored.
// - Iteration follows the injected order (descending here).
// - first/first_key agree with the model's greatest key.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_ledger_matches_model(ops in arb_ledger_ops()) {
        let mut sut: OrderedMap<u8, u32, Descending> = OrderedMap::new();
        let mut model: BTreeMap<u8, u32> = BTreeMap::new();

        for op in ops {
            match op {
                LedgerOp::Credit(k, a) if a > 0 => {
                    *sut.get_or_default(k) += u32::from(a);
                    *model.entry(k).or_default() += u32::from(a);
                }
                LedgerOp::Credit(..) => {}
                LedgerOp::Debit(k, a) => {
                    let amount = u32::from(a);
                    let left = model.get(&k).copied().unwrap_or(0).saturating_sub(amount);
                    if left > 0 {
                        model.insert(k, left);
                    } else {
                        model.remove(&k);
                    }
                    prop_assert_eq!(sut.sub(k, amount), left > 0);
                }
                LedgerOp::Remove(k) => {
                    prop_assert_eq!(sut.try_remove(&k), model.remove(&k));
                }
            }
            prop_assert!(sut.iter().all(|(_, v)| *v > 0), "zero balances must be evicted");
            prop_assert_eq!(sut.len(), model.len());
        }

        let got: Vec<(u8, u32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
        let want: Vec<(u8, u32)> = model.iter().rev().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, want);
        prop_assert_eq!(sut.first_key(), model.keys().next_back());
    }
}
