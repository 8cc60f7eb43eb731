//! Fixed-capacity cross-task queues
//!
//! The command-record and response queues are the only mutable state
//! shared between tasks. Both are bounded; the producer never blocks
//! indefinitely. Flows purge residue before starting so a stale entry
//! from an earlier flow cannot be misattributed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{timeout, Duration, Instant};

/// Why a queue operation did not produce a value
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum QueueError {
    /// No room within the deadline
    Full,
    /// No item within the deadline
    TimedOut,
    /// Queue closed; the owning task is gone
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

enum Rejected<T> {
    Full(T),
    Closed,
}

/// Bounded FIFO with drop-on-full producers and waitable consumers
pub(crate) struct Queue<T> {
    cap: usize,
    state: Mutex<State<T>>,
    // space: room freed for producers; items: value ready for consumers
    space: Notify,
    items: Notify,
}

impl<T> Queue<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            state: Mutex::new(State {
                items: VecDeque::with_capacity(cap),
                closed: false,
            }),
            space: Notify::new(),
            items: Notify::new(),
        }
    }

    fn offer(&self, item: T) -> std::result::Result<(), Rejected<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Rejected::Closed);
        }
        if state.items.len() >= self.cap {
            return Err(Rejected::Full(item));
        }
        state.items.push_back(item);
        drop(state);
        self.items.notify_one();
        Ok(())
    }

    /// Push without waiting; the item is dropped on `Full`
    pub fn try_push(&self, item: T) -> std::result::Result<(), QueueError> {
        match self.offer(item) {
            Ok(()) => Ok(()),
            Err(Rejected::Full(_)) => Err(QueueError::Full),
            Err(Rejected::Closed) => Err(QueueError::Closed),
        }
    }

    /// Push, waiting up to `wait` for room
    pub async fn push_timeout(&self, item: T, wait: Duration) -> std::result::Result<(), QueueError> {
        let deadline = Instant::now() + wait;
        let mut item = item;
        loop {
            let space = self.space.notified();
            match self.offer(item) {
                Ok(()) => return Ok(()),
                Err(Rejected::Closed) => return Err(QueueError::Closed),
                Err(Rejected::Full(returned)) => item = returned,
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::Full);
            }
            if timeout(deadline - now, space).await.is_err() {
                // one last attempt at the deadline edge
                return match self.offer(item) {
                    Ok(()) => Ok(()),
                    Err(Rejected::Closed) => Err(QueueError::Closed),
                    Err(Rejected::Full(_)) => Err(QueueError::Full),
                };
            }
        }
    }

    fn take(&self) -> std::result::Result<Option<T>, ()> {
        let mut state = self.state.lock();
        if let Some(item) = state.items.pop_front() {
            drop(state);
            self.space.notify_one();
            return Ok(Some(item));
        }
        if state.closed {
            return Err(());
        }
        Ok(None)
    }

    /// Pop, waiting as long as it takes. `None` means the queue closed.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let items = self.items.notified();
            match self.take() {
                Ok(Some(item)) => return Some(item),
                Err(()) => return None,
                Ok(None) => {}
            }
            items.await;
        }
    }

    /// Pop, waiting up to `wait` for an item
    pub async fn pop_timeout(&self, wait: Duration) -> std::result::Result<T, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            let items = self.items.notified();
            match self.take() {
                Ok(Some(item)) => return Ok(item),
                Err(()) => return Err(QueueError::Closed),
                Ok(None) => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::TimedOut);
            }
            if timeout(deadline - now, items).await.is_err() {
                return match self.take() {
                    Ok(Some(item)) => Ok(item),
                    Err(()) => Err(QueueError::Closed),
                    Ok(None) => Err(QueueError::TimedOut),
                };
            }
        }
    }

    /// Drop every queued entry; returns how many were discarded
    pub fn purge(&self) -> usize {
        let mut state = self.state.lock();
        let stale = state.items.len();
        state.items.clear();
        drop(state);
        if stale > 0 {
            self.space.notify_one();
        }
        stale
    }

    /// Close the queue; wakes every waiter on both sides
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.items.notify_waiters();
        self.items.notify_one();
        self.space.notify_waiters();
        self.space.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = Queue::new(4);
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();
        queue.try_push(3).unwrap();

        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, Some(3));
    }

    #[tokio::test]
    async fn test_try_push_full() {
        let queue = Queue::new(2);
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();

        assert_eq!(queue.try_push(3), Err(QueueError::Full));
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_timeout_expires() {
        let queue = Queue::new(1);
        queue.try_push(1).unwrap();

        let result = queue.push_timeout(2, Duration::from_millis(100)).await;
        assert_eq!(result, Err(QueueError::Full));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_timeout_succeeds_when_room_appears() {
        let queue = std::sync::Arc::new(Queue::new(1));
        queue.try_push(1).unwrap();

        let popper = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                queue.pop().await
            })
        };

        queue
            .push_timeout(2, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(popper.await.unwrap(), Some(1));
        assert_eq!(queue.pop().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_timeout_expires() {
        let queue: Queue<u8> = Queue::new(2);
        let result = queue.pop_timeout(Duration::from_millis(100)).await;
        assert_eq!(result, Err(QueueError::TimedOut));
    }

    #[tokio::test]
    async fn test_purge() {
        let queue = Queue::new(4);
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();

        assert_eq!(queue.purge(), 2);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_popper() {
        let queue: std::sync::Arc<Queue<u8>> = std::sync::Arc::new(Queue::new(2));
        let popper = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.close();

        assert_eq!(popper.await.unwrap(), None);
        assert_eq!(queue.try_push(1), Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn test_close_drains_remaining_items() {
        let queue = Queue::new(2);
        queue.try_push(7).unwrap();
        queue.close();

        // Items queued before the close are still delivered
        assert_eq!(queue.pop().await, Some(7));
        assert_eq!(queue.pop().await, None);
    }
}
