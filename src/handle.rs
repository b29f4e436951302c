//! Non-owning handles into a caller-owned arena.
//!
//! A container that stores `Handle<T>` holds only the reference slot.
//! Removing, clearing or dropping the container never drops the referent;
//! the arena that minted the handle owns it, and only `Arena::remove`
//! frees it. Handles are generational, so a handle whose referent was
//! removed resolves to `None` instead of aliasing a newer object.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use slotmap::{DefaultKey, SlotMap};

/// Copyable, non-owning reference to a `T` stored in an `Arena<T>`.
///
/// Deliberately has no `Default`: collections cannot auto-vivify a
/// handle-valued entry, so a missing key can never silently turn into a
/// dangling or null slot.
pub struct Handle<T> {
    key: DefaultKey,
    _pd: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(key: DefaultKey) -> Self {
        Self {
            key,
            _pd: PhantomData,
        }
    }

    pub fn get<'a>(&self, arena: &'a Arena<T>) -> Option<&'a T> {
        arena.get(*self)
    }

    pub fn get_mut<'a>(&self, arena: &'a mut Arena<T>) -> Option<&'a mut T> {
        arena.get_mut(*self)
    }
}

// Manual impls: derives would demand `T: Clone`/`T: Eq` for no reason.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.key).finish()
    }
}

/// Owner of the objects that handles point at.
pub struct Arena<T> {
    slots: SlotMap<DefaultKey, T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        Handle::new(self.slots.insert(value))
    }

    /// Allocate a default-constructed object; the caller owns its removal.
    pub fn insert_default(&mut self) -> Handle<T>
    where
        T: Default,
    {
        self.insert(T::default())
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots.contains_key(handle.key)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots.get(handle.key)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots.get_mut(handle.key)
    }

    /// Free the referent. Every copy of `handle` goes stale.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        self.slots.remove(handle.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().map(|(k, v)| (Handle::new(k), v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.slots.iter()).finish()
    }
}
