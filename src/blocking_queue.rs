//! BlockingQueue: a guarded FIFO plus a condition variable, for consumers
//! that wait a bounded time for work.
//!
//! Each blocking call takes its own lock and waits on the shared `Condvar`
//! until its own deadline, so any number of consumers can wait at once.
//! Every wake (notification, spurious or deadline) attempts one dequeue;
//! failure is only reported once the deadline has passed. An item that is
//! already queued is returned without waiting.

use crate::error::CollectionError;
use crate::guard::{Guarded, Locked};
use crate::queue::Queue;
use core::fmt;
use parking_lot::Condvar;
use std::time::{Duration, Instant};
use tracing::trace;

pub struct BlockingQueue<T> {
    queue: Guarded<Queue<T>>,
    ready: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Guarded::new(Queue::with_capacity(capacity)),
            ready: Condvar::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.with(|q| q.len())
    }
    pub fn is_empty(&self) -> bool {
        self.queue.with(|q| q.is_empty())
    }

    pub fn clear(&self) {
        self.queue.with(|q| q.clear());
    }

    /// Append `item` and wake one waiting consumer.
    pub fn enqueue(&self, item: T) {
        self.queue.with(|q| q.enqueue(item));
        self.ready.notify_one();
    }

    /// Non-blocking dequeue.
    pub fn try_dequeue_now(&self) -> Option<T> {
        self.queue.with(|q| q.try_dequeue())
    }

    /// Wait up to `timeout` for an item.
    pub fn try_dequeue(&self, timeout: Duration) -> Option<T> {
        let mut locked = self.wait_for_item(timeout);
        locked.try_dequeue()
    }

    /// Wait up to `timeout`, then hand the item to `action` under the lock.
    pub fn try_dequeue_with<F>(&self, action: F, timeout: Duration) -> bool
    where
        F: FnOnce(T),
    {
        let mut locked = self.wait_for_item(timeout);
        locked.try_dequeue_with(action)
    }

    /// Like `try_dequeue`, but reports a timeout as an error.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Result<T, CollectionError> {
        self.try_dequeue(timeout)
            .ok_or(CollectionError::TimedOut(timeout))
    }

    /// Wait up to `timeout` for the first item, then drain everything that is
    /// queued. Returns the number of items handed to `action`.
    pub fn while_try_dequeue<F>(&self, action: F, timeout: Duration) -> usize
    where
        F: FnMut(T),
    {
        let mut locked = self.wait_for_item(timeout);
        locked.while_try_dequeue(action)
    }

    /// Lock the queue and wait until it is non-empty or `timeout` elapses.
    /// The returned guard may still see an empty queue on timeout.
    fn wait_for_item(&self, timeout: Duration) -> Locked<'_, Queue<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut locked = self.queue.lock();
        while locked.is_empty() {
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        trace!(?timeout, "blocking dequeue timed out");
                        break;
                    }
                    trace!(?timeout, "waiting for an item");
                    locked.wait_until(&self.ready, deadline);
                }
                // Deadline not representable: wait without one
                None => locked.wait(&self.ready),
            }
        }
        locked
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.queue
            .with(|q| f.debug_tuple("BlockingQueue").field(q).finish())
    }
}
