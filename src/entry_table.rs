//! EntryTable: structural layer holding the entries behind the map's lock.
//!
//! Entries live in a generational `SlotMap`; a hashbrown `HashTable` indexes
//! slot keys by the entry's stored hash. `K: Hash` runs once per insert or
//! lookup and never while the index grows, which keeps user code out of the
//! critical section as much as possible.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

pub(crate) struct EntryTable<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> EntryTable<K, V>
where
    K: Eq + Hash,
{
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S> EntryTable<K, V, S> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Iterator over entries in `EntryTable`, in slot order.
pub(crate) struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &e.value))
    }
}

impl<K, V, S> EntryTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn find<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let k = self.find(q)?;
        self.slots.get(k).map(|e| &e.value)
    }

    /// Insert `key`, or overwrite the value of an equal key already present.
    /// Returns the previous value on overwrite. The stored key is kept.
    pub fn upsert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(o) => {
                let slot = *o.get();
                self.slots
                    .get_mut(slot)
                    .map(|e| core::mem::replace(&mut e.value, value))
            }
            hashbrown::hash_table::Entry::Vacant(v) => {
                let slot = self.slots.insert(Entry { key, value, hash });
                let _ = v.insert(slot);
                None
            }
        }
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let found = self.index.find_entry(hash, |&kk| {
            self.slots
                .get(kk)
                .map(|e| e.key.borrow() == q)
                .unwrap_or(false)
        });
        let slot = match found {
            Ok(occupied) => occupied.remove().0,
            Err(_) => return None,
        };
        let entry = self.slots.remove(slot)?;
        Some((entry.key, entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.slots.values().map(|e| &e.key)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }
}
