//! ConcurrentList: a `List` behind one mutex.
//!
//! Positional access is checked: another thread may shrink the list between
//! two calls, so `remove` reports `IndexOutOfBounds` and `get` returns
//! `Option` rather than panicking.

use crate::error::CollectionError;
use crate::guard::{Guarded, Locked, LockedValue};
use crate::list::List;
use core::fmt;
use tracing::debug;

pub struct ConcurrentList<T> {
    inner: Guarded<List<T>>,
}

impl<T> ConcurrentList<T> {
    pub fn new() -> Self {
        Self::from_list(List::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_list(List::with_capacity(capacity))
    }

    pub fn from_list(list: List<T>) -> Self {
        Self {
            inner: Guarded::new(list),
        }
    }

    pub fn lock(&self) -> Locked<'_, List<T>> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut List<T>) -> R) -> R {
        self.inner.with(f)
    }

    pub fn len(&self) -> usize {
        self.inner.with(|l| l.len())
    }
    pub fn is_empty(&self) -> bool {
        self.inner.with(|l| l.is_empty())
    }
    pub fn any(&self) -> bool {
        self.inner.with(|l| l.any())
    }

    pub fn clear(&self) {
        self.inner.with(|l| l.clear());
    }

    pub fn push(&self, item: T) {
        self.inner.with(|l| l.push(item));
    }

    #[inline]
    pub fn add(&self, item: T) {
        self.push(item);
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.with(|l| l.pop())
    }

    pub fn remove(&self, index: usize) -> Result<T, CollectionError> {
        self.inner.with(|l| l.try_remove(index))
    }

    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.inner.with(|l| l.get(index).cloned())
    }

    /// Locked in-place access to the element at `index`.
    pub fn value(&self, index: usize) -> Option<LockedValue<'_, T>> {
        self.inner.lock().try_map(|l| l.get_mut(index))
    }

    pub fn set(&self, index: usize, item: T) -> Result<(), CollectionError> {
        self.inner.with(|l| {
            let len = l.len();
            match l.get_mut(index) {
                Some(slot) => {
                    *slot = item;
                    Ok(())
                }
                None => Err(CollectionError::out_of_bounds(index, len)),
            }
        })
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.inner.with(|l| l.contains(item))
    }

    pub fn transform<F>(&self, f: F)
    where
        F: FnMut(&T) -> T,
    {
        self.inner.with(|l| l.transform(f));
    }

    pub fn replace_from<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.inner.with(|l| l.replace_from(items));
    }

    /// `action` runs under the lock for every element, in order.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&mut T),
    {
        self.inner.with(|l| l.iter_mut().for_each(|item| action(item)));
    }

    pub fn snapshot(&self) -> List<T>
    where
        T: Clone,
    {
        let snap = self.inner.with(|l| l.clone());
        debug!(len = snap.len(), "list snapshot taken");
        snap
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.with(|l| l.as_slice().to_vec())
    }

    pub fn copy_from(&self, other: &Self)
    where
        T: Clone,
    {
        let snap = other.inner.with(|l| l.clone());
        debug!(len = snap.len(), "list contents replaced from another list");
        self.inner.with(|l| *l = snap);
    }

    pub fn into_inner(self) -> List<T> {
        self.inner.into_inner()
    }
}

impl<T> Default for ConcurrentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for ConcurrentList<T> {
    fn clone(&self) -> Self {
        Self::from_list(self.snapshot())
    }
}

impl<T> From<Vec<T>> for ConcurrentList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_list(items.into())
    }
}

impl<T> FromIterator<T> for ConcurrentList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_list(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug> fmt::Debug for ConcurrentList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|l| f.debug_tuple("ConcurrentList").field(l).finish())
    }
}
