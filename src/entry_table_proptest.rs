#![cfg(test)]

// Property tests for EntryTable kept inside the crate since the table is not
// part of the public surface.

use crate::entry_table::EntryTable;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
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

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum Op {
    Upsert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Keys,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Upsert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,4}"].prop_map(Op::Contains),
            1 => Just(Op::Keys),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// - `upsert` returns the model's previous value; keys stay unique.
// - `remove` returns the owned pair exactly once.
// - `get`/`contains_key` agree with the model, including borrowed `&str` lookups.
// - `keys`/`iter` yield the model's key set; `len`/`is_empty` match after each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: EntryTable<Key, i32> = EntryTable::new();
        let mut model: HashMap<Key, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Upsert(i, v) => {
                    let k = Key(pool[i].clone());
                    prop_assert_eq!(sut.upsert(k.clone(), v), model.insert(k, v));
                }
                Op::Remove(i) => {
                    let k = Key(pool[i].clone());
                    match (sut.remove(k.0.as_str()), model.remove(&k)) {
                        (Some((kk, vv)), Some(mv)) => {
                            prop_assert_eq!(kk, k);
                            prop_assert_eq!(vv, mv);
                        }
                        (None, None) => {}
                        (s, m) => {
                            prop_assert!(false, "remove mismatch: {:?} vs {:?}", s, m);
                        }
                    }
                }
                Op::Get(i) => {
                    let k = Key(pool[i].clone());
                    prop_assert_eq!(sut.get(&k), model.get(&k));
                }
                Op::Contains(s) => {
                    let has_model = model.keys().any(|k| k.0 == s);
                    prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
                }
                Op::Keys => {
                    let s_keys: Vec<_> = sut.keys().cloned().collect();
                    let unique: BTreeSet<_> = s_keys.iter().cloned().collect();
                    prop_assert_eq!(s_keys.len(), unique.len(), "keys must be unique");
                    let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                    prop_assert_eq!(unique, m_keys);
                }
                Op::Iterate => {
                    let s_pairs: BTreeSet<_> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    let m_pairs: BTreeSet<_> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(s_pairs, m_pairs);
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }
    }
}
