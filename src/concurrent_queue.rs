//! ConcurrentQueue: a `Queue` behind one mutex.

use crate::guard::{Guarded, Locked};
use crate::queue::Queue;
use core::fmt;
use tracing::debug;

pub struct ConcurrentQueue<T> {
    inner: Guarded<Queue<T>>,
}

impl<T> ConcurrentQueue<T> {
    pub fn new() -> Self {
        Self::from_queue(Queue::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_queue(Queue::with_capacity(capacity))
    }

    pub fn from_queue(queue: Queue<T>) -> Self {
        Self {
            inner: Guarded::new(queue),
        }
    }

    pub fn lock(&self) -> Locked<'_, Queue<T>> {
        self.inner.lock()
    }

    pub fn len(&self) -> usize {
        self.inner.with(|q| q.len())
    }
    pub fn is_empty(&self) -> bool {
        self.inner.with(|q| q.is_empty())
    }
    pub fn any(&self) -> bool {
        self.inner.with(|q| q.any())
    }

    pub fn clear(&self) {
        self.inner.with(|q| q.clear());
    }

    pub fn enqueue(&self, item: T) {
        self.inner.with(|q| q.enqueue(item));
    }

    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.with(|q| q.try_dequeue())
    }

    /// `action` runs under the lock.
    pub fn try_dequeue_with<F>(&self, action: F) -> bool
    where
        F: FnOnce(T),
    {
        self.inner.with(|q| q.try_dequeue_with(action))
    }

    pub fn try_peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.with(|q| q.try_peek().cloned())
    }

    pub fn try_peek_with<F>(&self, action: F) -> bool
    where
        F: FnOnce(&T),
    {
        self.inner.with(|q| q.try_peek_with(action))
    }

    /// Drain everything queued at the time of the call as one critical
    /// section. Returns the number of items handed to `action`.
    pub fn while_try_dequeue<F>(&self, action: F) -> usize
    where
        F: FnMut(T),
    {
        self.inner.with(|q| q.while_try_dequeue(action))
    }

    pub fn snapshot(&self) -> Queue<T>
    where
        T: Clone,
    {
        let snap = self.inner.with(|q| q.clone());
        debug!(len = snap.len(), "queue snapshot taken");
        snap
    }

    pub fn copy_from(&self, other: &Self)
    where
        T: Clone,
    {
        let snap = other.snapshot();
        self.inner.with(|q| *q = snap);
    }

    pub fn into_inner(self) -> Queue<T> {
        self.inner.into_inner()
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for ConcurrentQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_queue(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|q| f.debug_tuple("ConcurrentQueue").field(q).finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn producers_and_consumers_see_every_item_once() {
        let q: Arc<ConcurrentQueue<u32>> = Arc::new(ConcurrentQueue::new());
        let producers: Vec<_> = (0..4u32)
            .map(|t| {
                let q = q.clone();
                std::thread::spawn(move || (0..500).for_each(|i| q.enqueue(t * 500 + i)))
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        let mut seen = Vec::new();
        assert_eq!(q.while_try_dequeue(|v| seen.push(v)), 2_000);
        seen.sort_unstable();
        assert_eq!(seen, (0..2_000).collect::<Vec<_>>());
        assert!(q.try_dequeue().is_none());
    }

    #[test]
    fn peek_clones_without_removing() {
        let q: ConcurrentQueue<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(q.try_peek().as_deref(), Some("a"));
        assert_eq!(q.len(), 2);
        assert!(q.try_dequeue_with(|s| assert_eq!(s, "a")));
        assert_eq!(q.snapshot().try_peek().map(String::as_str), Some("b"));

        let copy = ConcurrentQueue::new();
        copy.copy_from(&q);
        q.clear();
        assert_eq!(copy.try_dequeue().as_deref(), Some("b"));
    }
}
