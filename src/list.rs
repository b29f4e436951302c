//! List: index-addressable growable sequence.

use crate::error::CollectionError;
use core::ops::{Index, IndexMut};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct List<T> {
    items: Vec<T>,
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn any(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Alias of `push`.
    #[inline]
    pub fn add(&mut self, item: T) {
        self.push(item);
    }

    /// Remove and return the last element; `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Remove at `index`, shifting later elements left.
    ///
    /// Panics if `index >= len()`; use `try_remove` for a checked variant.
    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    pub fn try_remove(&mut self, index: usize) -> Result<T, CollectionError> {
        if index < self.items.len() {
            Ok(self.items.remove(index))
        } else {
            Err(CollectionError::out_of_bounds(index, self.items.len()))
        }
    }

    /// Linear equality search.
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.items.contains(item)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn transform<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> T,
    {
        for item in self.items.iter_mut() {
            *item = f(item);
        }
    }

    /// Discard the current contents and take `items` in order.
    pub fn replace_from<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.items.clear();
        self.items.extend(items);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Index<usize> for List<T> {
    type Output = T;
    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for List<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<T> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> IntoIterator for List<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
