//! BoundedBlockingMap: capacity-bounded map with blocking waits for space.

use crate::config::MapConfig;
use crate::entry_table::EntryTable;
use crate::error::{ConfigError, TryInsertError};
use crate::timeout::{Deadline, Timeout};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::hash_map::RandomState;
use tracing::{debug, trace};

struct State<K, V, S> {
    table: EntryTable<K, V, S>,
    closed: bool,
    /// Threads parked in `wait_for_space`.
    space_waiters: usize,
    /// Threads parked in `wait_for_entry`.
    entry_waiters: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Signal {
    Space,
    Entry,
}

impl<K, V, S> State<K, V, S> {
    fn parked(&mut self, signal: Signal) -> &mut usize {
        match signal {
            Signal::Space => &mut self.space_waiters,
            Signal::Entry => &mut self.entry_waiters,
        }
    }
}

/// A thread-safe map holding at most `capacity` entries.
///
/// Producers call [`try_insert`](Self::try_insert); when the map is full they
/// get their key and value back and park in
/// [`wait_for_space`](Self::wait_for_space) until a consumer's
/// [`remove`](Self::remove) frees a slot. The retry loop belongs to the
/// caller:
///
/// ```rust
/// use bounded_blocking_map::{BoundedBlockingMap, TryInsertError};
/// use std::time::Duration;
///
/// let map = BoundedBlockingMap::new(1).unwrap();
/// map.try_insert(1u64, "first").unwrap();
///
/// let mut pending = (2u64, "second");
/// loop {
///     match map.try_insert(pending.0, pending.1) {
///         Ok(_) => break,
///         Err(TryInsertError::Full(k, v)) => {
///             pending = (k, v);
///             if !map.wait_for_space(Duration::from_millis(10)) {
///                 // Nobody freed a slot in time; make room ourselves.
///                 map.remove(&1u64);
///             }
///         }
///         Err(TryInsertError::Closed(..)) => unreachable!(),
///     }
/// }
/// assert_eq!(map.keys(), vec![2]);
/// ```
///
/// All entries sit behind one mutex. Waiters park on condition variables
/// tied to that mutex, so a producer waiting for space never holds the lock
/// a consumer needs to free it. `remove` signals one space waiter when it
/// takes the map off full capacity, or when any producer is still parked;
/// `try_insert` does the same for entry waiters on the empty to non-empty
/// transition. Mutations with nobody parked off those edges stay silent.
/// Woken threads always re-check their condition.
///
/// The map is never exposed by reference; reads return copies.
pub struct BoundedBlockingMap<K, V, S = RandomState> {
    state: Mutex<State<K, V, S>>,
    /// Signalled when a slot frees up while producers wait, and on close.
    space: Condvar,
    /// Signalled when an entry arrives while consumers wait, and on close.
    entries: Condvar,
    capacity: usize,
    name: String,
}

impl<K, V> BoundedBlockingMap<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty map bounded to `capacity` entries.
    ///
    /// Fails with [`ConfigError::InvalidCapacity`] when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_hasher(capacity, Default::default())
    }

    /// Create an empty map from `config`, validating it first.
    pub fn with_config(config: MapConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V, S> BoundedBlockingMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Like [`new`](BoundedBlockingMap::new), hashing keys with `hasher`.
    pub fn with_hasher(capacity: usize, hasher: S) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(MapConfig::new(capacity), hasher)
    }

    /// Like [`with_config`](BoundedBlockingMap::with_config), hashing keys with `hasher`.
    pub fn with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let MapConfig { capacity, name } = config;
        debug!(name = %name, capacity, "bounded map created");
        Ok(Self {
            state: Mutex::new(State {
                table: EntryTable::with_hasher(hasher),
                closed: false,
                space_waiters: 0,
                entry_waiters: 0,
            }),
            space: Condvar::new(),
            entries: Condvar::new(),
            capacity,
            name,
        })
    }

    /// Maximum number of entries, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Label carried by this map's log events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries. Advisory: other threads may change it right after
    /// this returns.
    pub fn len(&self) -> usize {
        self.state.lock().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().table.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.state.lock().table.contains_key(key)
    }

    /// Copy of the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.state.lock().table.get(key).cloned()
    }

    /// Point-in-time copy of the key set, in no particular order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.state.lock().table.keys().cloned().collect()
    }

    /// Point-in-time copy of every entry, in no particular order.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.state
            .lock()
            .table
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Store `value` under `key` if the map has a free slot, never blocking.
    ///
    /// Returns the previous value when `key` was already present. A full map
    /// refuses the call even when it would only overwrite, handing the pair
    /// back in [`TryInsertError::Full`]. After [`close`](Self::close) every
    /// call returns [`TryInsertError::Closed`].
    pub fn try_insert(&self, key: K, value: V) -> Result<Option<V>, TryInsertError<K, V>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TryInsertError::Closed(key, value));
        }
        if state.table.len() >= self.capacity {
            trace!(name = %self.name, capacity = self.capacity, "insert refused, map full");
            return Err(TryInsertError::Full(key, value));
        }
        let previous = state.table.upsert(key, value);
        let len = state.table.len();
        debug_assert!(len <= self.capacity, "size {len} exceeds capacity");
        let waiters = state.entry_waiters;
        drop(state);

        if previous.is_none() && (len == 1 || waiters > 0) {
            self.entries.notify_one();
        }
        Ok(previous)
    }

    /// Remove `key`, returning its value if it was present.
    ///
    /// Taking the map off full capacity, or freeing a slot while producers
    /// are parked, wakes one thread in [`wait_for_space`](Self::wait_for_space).
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut state = self.state.lock();
        let before = state.table.len();
        // Bound to a name so the key drops after the lock is released.
        let (_key, value) = state.table.remove(key)?;
        let waiters = state.space_waiters;
        drop(state);

        if before == self.capacity || waiters > 0 {
            let woke = self.space.notify_one();
            trace!(name = %self.name, woke, waiters, "slot freed");
        }
        Some(value)
    }

    /// Block until the map has a free slot or `timeout` elapses.
    ///
    /// Returns `true` if a slot was free when the call returned. The slot is
    /// not reserved: follow up with [`try_insert`](Self::try_insert), which
    /// may still lose the race to another producer. Returns `false` at once
    /// on a closed map, and wakes with `false` if the map is closed while
    /// waiting.
    pub fn wait_for_space(&self, timeout: impl Into<Timeout>) -> bool {
        let capacity = self.capacity;
        let state = self.park_until(Signal::Space, timeout.into(), |s| {
            s.closed || s.table.len() < capacity
        });
        if state.closed {
            return false;
        }
        if state.table.len() >= capacity {
            trace!(name = %self.name, capacity, "timed out waiting for space");
            return false;
        }
        true
    }

    /// Block until the map holds at least one entry or `timeout` elapses.
    ///
    /// Returns `true` if the map was non-empty when the call returned. Once
    /// the map is closed this no longer parks and reports whether entries
    /// remain to be drained.
    pub fn wait_for_entry(&self, timeout: impl Into<Timeout>) -> bool {
        let state = self.park_until(Signal::Entry, timeout.into(), |s| {
            s.closed || !s.table.is_empty()
        });
        if state.table.is_empty() {
            if !state.closed {
                trace!(name = %self.name, "timed out waiting for an entry");
            }
            return false;
        }
        true
    }

    /// Close the map and release every parked thread.
    ///
    /// Entries stay in place and can still be read and removed; inserts and
    /// waits for space fail fast from now on. Calling `close` again has no
    /// effect.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let remaining = state.table.len();
        drop(state);

        let producers = self.space.notify_all();
        let consumers = self.entries.notify_all();
        debug!(name = %self.name, remaining, producers, consumers, "bounded map closed");
    }

    /// Lock the state and park on the condvar for `signal` until `done`
    /// holds or the deadline derived from `timeout` passes. Returns the guard
    /// either way; callers re-read the state to tell which. The thread is
    /// counted in the matching waiter total for as long as it is parked.
    fn park_until<F>(
        &self,
        signal: Signal,
        timeout: Timeout,
        done: F,
    ) -> MutexGuard<'_, State<K, V, S>>
    where
        F: Fn(&State<K, V, S>) -> bool,
    {
        let condvar = match signal {
            Signal::Space => &self.space,
            Signal::Entry => &self.entries,
        };
        let deadline = timeout.deadline();
        let mut state = self.state.lock();
        // A notification only says the condition may hold; spurious and
        // stolen wakeups loop back here.
        while !done(&*state) {
            if deadline == Deadline::Now {
                break;
            }
            *state.parked(signal) += 1;
            let timed_out = match deadline {
                Deadline::At(at) => condvar.wait_until(&mut state, at).timed_out(),
                _ => {
                    condvar.wait(&mut state);
                    false
                }
            };
            *state.parked(signal) -= 1;
            if timed_out {
                break;
            }
        }
        state
    }
}

impl<K, V, S> fmt::Debug for BoundedBlockingMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedBlockingMap")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &state.table.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NAME;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn set(keys: Vec<&'static str>) -> BTreeSet<&'static str> {
        keys.into_iter().collect()
    }

    /// Invariant: A zero capacity is rejected at construction.
    #[test]
    fn zero_capacity_rejected() {
        match BoundedBlockingMap::<u32, u32>::new(0) {
            Err(ConfigError::InvalidCapacity { capacity: 0 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(BoundedBlockingMap::<u32, u32>::with_config(MapConfig::new(0)).is_err());
        assert!(BoundedBlockingMap::<u32, u32>::with_hasher(0, RandomState::new()).is_err());

        let m = BoundedBlockingMap::<u32, u32>::with_hasher(4, RandomState::new()).unwrap();
        assert_eq!(m.capacity(), 4);
        assert_eq!(m.name(), DEFAULT_NAME);
    }

    /// Invariant: Full maps refuse new keys and hand the pair back; removal
    /// makes room again and the key set reflects exactly the live entries.
    #[test]
    fn capacity_two_scenario() {
        let m = BoundedBlockingMap::new(2).unwrap();
        assert_eq!(m.try_insert("A", 1).unwrap(), None);
        assert_eq!(m.try_insert("B", 2).unwrap(), None);
        match m.try_insert("C", 3) {
            Err(TryInsertError::Full("C", 3)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(m.remove("A"), Some(1));
        assert_eq!(m.try_insert("C", 3).unwrap(), None);
        assert_eq!(m.len(), 2);
        assert_eq!(set(m.keys()), set(vec!["B", "C"]));
    }

    /// Invariant: Overwriting a key keeps `len` unchanged and `remove`
    /// returns the latest value.
    #[test]
    fn overwrite_keeps_len() {
        let m = BoundedBlockingMap::new(4).unwrap();
        assert_eq!(m.try_insert("k".to_string(), 1).unwrap(), None);
        assert_eq!(m.try_insert("k".to_string(), 2).unwrap(), Some(1));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("k"), Some(2));
        assert_eq!(m.remove("k"), Some(2));
        assert!(m.is_empty());
        assert_eq!(m.remove("k"), None);
    }

    /// Invariant: The capacity check precedes the lookup, so a full map
    /// refuses even an overwrite and the stored value is untouched.
    #[test]
    fn full_map_refuses_overwrite() {
        let m = BoundedBlockingMap::new(1).unwrap();
        m.try_insert(1u8, "a").unwrap();
        let err = m.try_insert(1u8, "b").unwrap_err();
        assert!(err.is_full());
        assert_eq!(m.get(&1u8), Some("a"));
    }

    /// Invariant: Polling never parks; it reports the current condition.
    #[test]
    fn poll_reports_current_state() {
        let m = BoundedBlockingMap::new(1).unwrap();
        assert!(m.wait_for_space(Timeout::Poll));
        assert!(!m.wait_for_entry(Timeout::Poll));
        m.try_insert(1u8, ()).unwrap();
        assert!(!m.wait_for_space(Timeout::Poll));
        assert!(!m.wait_for_space(Duration::ZERO));
        assert!(m.wait_for_entry(Timeout::Poll));
    }

    /// Invariant: A bounded wait on a full map with no removal returns false
    /// no earlier than its timeout.
    #[test]
    fn wait_for_space_times_out() {
        let m = BoundedBlockingMap::new(1).unwrap();
        m.try_insert(1u8, ()).unwrap();
        let timeout = Duration::from_millis(30);
        let start = std::time::Instant::now();
        assert!(!m.wait_for_space(timeout));
        assert!(start.elapsed() >= timeout);
    }

    /// Invariant: Parked-thread counts return to zero once every waiter has
    /// left, whether it timed out or was woken.
    #[test]
    fn waiter_counts_settle_after_waits() {
        let m = std::sync::Arc::new(BoundedBlockingMap::new(1).unwrap());
        m.try_insert(1u8, ()).unwrap();
        assert!(!m.wait_for_space(Duration::from_millis(10)));
        assert!(m.wait_for_entry(Duration::from_millis(10)));

        let waiter = {
            let m = m.clone();
            std::thread::spawn(move || m.wait_for_space(Duration::from_secs(5)))
        };
        while m.state.lock().space_waiters == 0 {
            std::thread::yield_now();
        }
        assert_eq!(m.remove(&1u8), Some(()));
        assert!(waiter.join().unwrap());

        let state = m.state.lock();
        assert_eq!(state.space_waiters, 0);
        assert_eq!(state.entry_waiters, 0);
    }

    /// Invariant: After `close`, inserts fail with `Closed`, space waits fail
    /// fast, and existing entries can still be read and drained.
    #[test]
    fn close_is_sticky_and_allows_draining() {
        let m = BoundedBlockingMap::new(2).unwrap();
        m.try_insert("a", 1).unwrap();
        m.close();
        m.close();
        assert!(m.is_closed());

        match m.try_insert("b", 2) {
            Err(TryInsertError::Closed("b", 2)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!m.wait_for_space(Timeout::Never));
        assert!(m.wait_for_entry(Timeout::Never));
        assert_eq!(m.snapshot(), vec![("a", 1)]);
        assert_eq!(m.remove("a"), Some(1));
        assert!(!m.wait_for_entry(Timeout::Never));
    }

    /// Invariant: `Debug` shows bookkeeping only.
    #[test]
    fn debug_shows_counts() {
        let m = BoundedBlockingMap::with_config(MapConfig::new(3).with_name("acks")).unwrap();
        m.try_insert(1u32, 10u32).unwrap();
        assert_eq!(m.name(), "acks");
        assert_eq!(
            format!("{:?}", m),
            "BoundedBlockingMap { name: \"acks\", capacity: 3, len: 1, closed: false }"
        );
    }

    #[test]
    fn map_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BoundedBlockingMap<String, Vec<u8>>>();
    }
}
