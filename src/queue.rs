//! Queue: strict FIFO. Emptiness is reported through `Option`/`bool`,
//! never by panicking.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
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

    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    pub fn try_dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn try_dequeue_with<F>(&mut self, action: F) -> bool
    where
        F: FnOnce(T),
    {
        match self.items.pop_front() {
            Some(item) => {
                action(item);
                true
            }
            None => false,
        }
    }

    pub fn try_peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn try_peek_with<F>(&self, action: F) -> bool
    where
        F: FnOnce(&T),
    {
        match self.items.front() {
            Some(item) => {
                action(item);
                true
            }
            None => false,
        }
    }

    /// Dequeue and hand each item to `action` until the queue is empty.
    /// Returns the number of items drained.
    pub fn while_try_dequeue<F>(&mut self, mut action: F) -> usize
    where
        F: FnMut(T),
    {
        let mut n = 0;
        while let Some(item) = self.items.pop_front() {
            action(item);
            n += 1;
        }
        n
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> FromIterator<T> for Queue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<T> for Queue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}
