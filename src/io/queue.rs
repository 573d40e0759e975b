use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::buffer::{Buffer, State};
use crate::io::traits::Queue;

#[derive(Default)]
struct Inner {
    allocated: u32,
    done: VecDeque<(Buffer, State)>,
}

/// In-memory buffer queue
///
/// Buffers handed back by an endpoint are collected in completion order and can be dequeued by
/// the application, optionally waiting for the next one.
#[derive(Default)]
pub struct BufferQueue {
    inner: Mutex<Inner>,
    ready: Condvar,
}

impl BufferQueue {
    /// Returns an empty queue without buffers
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::io::{BufferQueue, Queue};
    ///
    /// let queue = BufferQueue::new();
    /// queue.allocate(4);
    /// assert!(queue.is_busy());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocate buffers
    ///
    /// Returns the number of buffers now allocated. Requesting zero buffers frees them.
    ///
    /// # Arguments
    ///
    /// * `count` - Desired number of buffers
    pub fn allocate(&self, count: u32) -> u32 {
        let mut inner = self.lock();
        inner.allocated = count;
        if count == 0 {
            inner.done.clear();
        }
        inner.allocated
    }

    /// Release any allocated buffers
    pub fn release(&self) {
        self.allocate(0);
    }

    /// Remove the oldest returned buffer, if any
    pub fn dequeue(&self) -> Option<(Buffer, State)> {
        self.lock().done.pop_front()
    }

    /// Remove the oldest returned buffer, waiting up to `timeout` for one to arrive
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<(Buffer, State)> {
        let inner = self.lock();
        let (mut inner, _) = self
            .ready
            .wait_timeout_while(inner, timeout, |inner| inner.done.is_empty())
            .unwrap_or_else(|e| e.into_inner());
        inner.done.pop_front()
    }

    /// Number of returned buffers waiting to be dequeued
    pub fn pending(&self) -> usize {
        self.lock().done.len()
    }
}

impl Queue for BufferQueue {
    fn is_busy(&self) -> bool {
        self.lock().allocated > 0
    }

    fn done(&self, buf: Buffer, state: State) {
        self.lock().done.push_back((buf, state));
        self.ready.notify_one();
    }
}
