//! Timed action queue.
//!
//! A min-heap of deadline-keyed entries behind a mutex, with a
//! [`Notify`](tokio::sync::Notify) so producers can wake the single consumer
//! when a newly pushed entry moves the earliest deadline forward. The lock is
//! never held across an await.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

struct Entry<T> {
    due_at: Instant,
    /// Insertion order, used to break ties between equal deadlines.
    seq: u64,
    value: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap surfaces the earliest deadline, FIFO within it.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
    closed: bool,
}

/// A timed queue of scheduled values with a single consumer.
pub struct Waker<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
}

impl<T> Waker<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue `value` to become due after `delay`. No-op once closed.
    pub fn push(&self, value: T, delay: Duration) {
        self.push_at(value, Instant::now() + delay);
    }

    /// Enqueue `value` to become due immediately. No-op once closed.
    pub fn push_now(&self, value: T) {
        self.push_at(value, Instant::now());
    }

    fn push_at(&self, value: T, due_at: Instant) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry { due_at, seq, value });
        drop(inner);
        self.notify.notify_one();
    }

    /// Wait for the next due value.
    ///
    /// Sleeps until the earliest deadline, waking early if a push installs an
    /// earlier one. Returns `None` once the waker is closed; entries still in
    /// the heap at that point are discarded.
    pub async fn receive(&self) -> Option<T> {
        loop {
            let deadline = {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return None;
                }
                let next_due = inner.heap.peek().map(|entry| entry.due_at);
                match next_due {
                    Some(due_at) if due_at <= Instant::now() => {
                        let entry = inner.heap.pop().expect("peeked entry");
                        return Some(entry.value);
                    }
                    other => other,
                }
            };

            match deadline {
                Some(due_at) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(due_at) => {}
                        _ = self.notify.notified() => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Close the waker: wakes a blocked `receive`, which then yields `None`.
    /// Idempotent; pushes after close are dropped.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of entries waiting to become due.
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Waker<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_push_now_receives_immediately() {
        let waker = Waker::new();
        waker.push_now(1u32);
        assert_eq!(waker.receive().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_orders_by_deadline_not_insertion() {
        let waker = Waker::new();
        waker.push("late", Duration::from_millis(100));
        waker.push("early", Duration::from_millis(10));

        assert_eq!(waker.receive().await, Some("early"));
        assert_eq!(waker.receive().await, Some("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_delivered_before_due() {
        let waker = Waker::new();
        let start = Instant::now();
        waker.push(7u32, Duration::from_secs(3));

        assert_eq!(waker.receive().await, Some(7));
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_deadlines_fifo() {
        let waker = Waker::new();
        waker.push_now("a");
        waker.push_now("b");
        waker.push_now("c");

        assert_eq!(waker.receive().await, Some("a"));
        assert_eq!(waker.receive().await, Some("b"));
        assert_eq!(waker.receive().await, Some("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_moves_earliest_forward() {
        let waker = Arc::new(Waker::new());
        waker.push("distant", Duration::from_secs(3600));

        let consumer = {
            let waker = Arc::clone(&waker);
            tokio::spawn(async move { waker.receive().await })
        };
        // Let the consumer park on the hour-long deadline.
        tokio::task::yield_now().await;

        let start = Instant::now();
        waker.push("soon", Duration::from_millis(50));

        assert_eq!(consumer.await.unwrap(), Some("soon"));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_wakes_receiver() {
        let waker = Arc::new(Waker::<u32>::new());
        let consumer = {
            let waker = Arc::clone(&waker);
            tokio::spawn(async move { waker.receive().await })
        };
        tokio::task::yield_now().await;

        waker.close();
        assert_eq!(consumer.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_terminal_and_idempotent() {
        let waker = Waker::new();
        waker.push_now(1u32);
        waker.close();
        waker.close();

        assert!(waker.is_closed());
        assert_eq!(waker.receive().await, None);

        // Pushes after close are dropped; the pre-close entry is never drained.
        waker.push_now(2);
        assert_eq!(waker.len(), 1);
        assert_eq!(waker.receive().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_len_tracks_pending() {
        let waker = Waker::new();
        assert!(waker.is_empty());
        waker.push(1u32, Duration::from_secs(10));
        waker.push(2, Duration::from_secs(20));
        assert_eq!(waker.len(), 2);

        waker.receive().await;
        assert_eq!(waker.len(), 1);
    }
}
