//! guarded-collections: generic collections with a synchronized variant of
//! each, where every compound operation runs as one critical section.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: make "look up, decide, write" sequences such as get-or-create,
//!   add-or-update, conditional remove and increment race-free, without
//!   asking callers to manage locks.
//! - Layers:
//!   - Unsynchronized containers: `Map<K, V, S>` (hashbrown),
//!     `OrderedMap<K, V, O>` (BTreeMap sorted by an injected `KeyOrder`),
//!     `List<T>`, `Queue<T>` and `HashSet<T, S>`. Plain `&mut self` APIs.
//!   - `Guarded<C>`: exactly one `parking_lot::Mutex<C>` plus a debug-only
//!     lock-owner tracker. Access is only through `lock()` or `with()`.
//!   - Synchronized wrappers: `ConcurrentMap`, `ConcurrentOrderedMap`,
//!     `ConcurrentList`, `ConcurrentQueue`, `ConcurrentHashSet`. Each owns
//!     one `Guarded<C>` (composition, not subtyping) and forwards every
//!     call as a single critical section.
//!   - `BlockingQueue<T>`: a guarded queue plus a `Condvar` for bounded
//!     blocking dequeue.
//!
//! Constraints
//! - One mutex per wrapper instance for its whole lifetime; no striping,
//!   no reader/writer split.
//! - Nothing returns a reference or an iterator into a wrapper's container
//!   once its lock is released.
//! - No locking across two instances at once. `copy_from` snapshots the
//!   source, releases it, then locks the destination.
//!
//! Traversal of synchronized containers
//! - Snapshots: `snapshot()`, `keys()`, `values()`, `clone_set()` copy the
//!   contents under the lock and return an independent container.
//! - Scoped guard: `lock()` returns a `Locked` guard that derefs to the
//!   container. Iterate through it; the lock is held until it drops.
//! - `for_each` runs a closure over every element under the lock.
//!
//! Values out of a synchronized container
//! - By clone (`try_get_value`, `get`, `try_peek`, `incr`), or
//! - In place through a `LockedValue` guard (`get_or_add`,
//!   `get_or_add_new`, `get_or_default`, `value`), which keeps the
//!   container lock until dropped.
//!
//! Reentrancy policy
//! - Factories and update callbacks run under the lock. Calling back into
//!   the same instance from one of them, or while a guard is alive, would
//!   deadlock on the non-reentrant mutex. Debug builds detect this and
//!   panic with "reentrant lock acquisition"; release builds carry no
//!   tracking state.
//!
//! Ownership of referents
//! - A container owns its entries, never what an entry points at. For
//!   values that refer to externally owned objects, store `Handle<T>`
//!   minted by an `Arena<T>`: clearing or dropping the container leaves
//!   the referents alive, and only `Arena::remove` frees them.
//! - `Handle<T>` has no `Default`, so the auto-vivifying accessors
//!   (`get_or_default`, `get_or_add_new`) do not exist for handle-valued
//!   containers. Use `get_or_add_new_in` with an explicit arena instead.
//!
//! Failure reporting
//! - `try_*` operations report absence through `bool` or `Option`.
//! - Checked variants (`insert_new`, `ConcurrentList::remove`,
//!   `BlockingQueue::dequeue_timeout`) return `CollectionError`.
//! - Contract violations panic: `Index` on a missing key or an
//!   out-of-range position, and reentrant locking in debug builds.
//!
//! Ledger
//! - `OrderedMap::sub` debits a per-key balance. A missing key counts as
//!   zero; a balance that reaches zero or below is evicted, so no
//!   non-positive balance is ever stored.
//!
//! Notes and non-goals
//! - No persistence and no comparator beyond a total order over `K`.
//! - The library logs through `tracing` (snapshot copies, ledger
//!   evictions, blocking waits) but never installs a subscriber.

mod blocking_queue;
mod concurrent_hash_set;
mod concurrent_list;
mod concurrent_map;
mod concurrent_ordered_map;
mod concurrent_queue;
mod error;
pub mod guard;
pub mod handle;
mod hash_set;
mod list;
mod map;
mod map_proptest;
mod ordered_map;
mod queue;
mod reentrancy;

pub use blocking_queue::BlockingQueue;
pub use concurrent_hash_set::ConcurrentHashSet;
pub use concurrent_list::ConcurrentList;
pub use concurrent_map::ConcurrentMap;
pub use concurrent_ordered_map::ConcurrentOrderedMap;
pub use concurrent_queue::ConcurrentQueue;
pub use error::CollectionError;
pub use guard::{Guarded, Locked, LockedValue};
pub use handle::{Arena, Handle};
pub use hash_set::HashSet;
pub use list::List;
pub use map::Map;
pub use ordered_map::{Ascending, Descending, KeyOrder, OrderedMap};
pub use queue::Queue;
