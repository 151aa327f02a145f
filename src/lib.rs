//! bounded-blocking-map: a thread-safe map with a fixed capacity that
//! pushes back on producers instead of growing.
//!
//! Built for bookkeeping of in-flight requests and acknowledgements in a
//! messaging client: the client keys pending records by a correlation or
//! sequence id, inserts when it sends, and removes when the reply or ack
//! arrives. Once `capacity` records are outstanding, senders are told to
//! wait until one completes.
//!
//! Internal Design:
//!
//! Summary
//! - Layers:
//!   - EntryTable<K, V, S>: structural map. A hashbrown `HashTable` index
//!     over generational slotmap keys; each entry stores its hash, so
//!     `K: Hash` is never re-run while the index grows.
//!   - BoundedBlockingMap<K, V, S>: public API. Owns one EntryTable behind a
//!     `parking_lot::Mutex`, the capacity bound, a closed flag, and two
//!     condition variables (space available, entry available).
//!
//! Constraints
//! - `0 <= len <= capacity` whenever the lock is not held.
//! - Unique keys; inserting an existing key overwrites and keeps `len`.
//! - `try_insert` and `remove` never block. Only `wait_for_space` and
//!   `wait_for_entry` park, each bounded by a [`Timeout`].
//! - No reference into the map escapes; reads clone.
//!
//! Signalling
//! - Edge-triggered, plus parked-thread counts. `remove` notifies one space
//!   waiter when the map was full before the removal or while any producer
//!   is parked; `try_insert` notifies one entry waiter when the map goes
//!   from empty to one entry or while any consumer is parked. With nobody
//!   parked, mutations away from those edges send nothing.
//! - Each parked thread is counted in the state for as long as it waits,
//!   so every slot freed (or entry added) while someone is parked produces
//!   a wakeup, whatever order woken threads reacquire the lock in.
//! - Waiters re-check their predicate after every wakeup.
//! - No FIFO ordering among waiters.
//!
//! Shutdown
//! - `close` sets a sticky flag and wakes every parked thread. Afterward
//!   `try_insert` returns `TryInsertError::Closed`, `wait_for_space` returns
//!   `false` immediately, and `wait_for_entry` reports whether entries are
//!   left. Reads and removals keep working so the owner can drain.
//! - Dropping requires exclusive ownership, so no thread can be parked on a
//!   map while it is destroyed.
//!
//! Notes and non-goals
//! - No eviction, no TTL, no persistence, no waiter priority.
//! - Space reported by `wait_for_space` is not reserved; a producer may lose
//!   the slot to another `try_insert` and has to wait again.

mod blocking_map;
mod config;
mod entry_table;
mod entry_table_proptest;
mod error;
mod timeout;

// Public surface
pub use blocking_map::BoundedBlockingMap;
pub use config::{MapConfig, DEFAULT_CAPACITY, DEFAULT_NAME};
pub use error::{ConfigError, TryInsertError};
pub use timeout::Timeout;
