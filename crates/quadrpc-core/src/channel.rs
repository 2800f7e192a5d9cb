//! Bounded, closable, abortable message channel.
//!
//! One channel carries one direction of a call. Messages are delivered in
//! send order. Closing lets the receiver drain what is buffered before it
//! observes end of stream; aborting discards the buffer and fails every
//! waiter immediately.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use quadrpc_common::{CallError, Status};
use tokio::sync::Notify;

struct Slots<T> {
    queue: VecDeque<T>,
    closed: bool,
    aborted: Option<Status>,
}

/// FIFO queue between the two ends of a call.
///
/// Senders suspend while the queue holds `capacity` messages; receivers
/// suspend while it is empty and open.
pub struct MessageChannel<T> {
    slots: Mutex<Slots<T>>,
    capacity: usize,
    readable: Notify,
    writable: Notify,
}

impl<T> MessageChannel<T> {
    /// Creates a channel buffering at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots {
                queue: VecDeque::with_capacity(capacity.max(1)),
                closed: false,
                aborted: None,
            }),
            capacity: capacity.max(1),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a message, suspending while the channel is full.
    ///
    /// # Errors
    ///
    /// - `CallError::SendClosed` once the channel is closed
    /// - `CallError::Failed` once the channel is aborted
    pub async fn send(&self, msg: T) -> Result<(), CallError> {
        loop {
            // Register interest before inspecting state so a wake between
            // the check and the await is not lost.
            let mut notified = pin!(self.writable.notified());
            notified.as_mut().enable();

            {
                let mut slots = self.lock();
                if let Some(status) = &slots.aborted {
                    return Err(CallError::Failed(status.clone()));
                }
                if slots.closed {
                    return Err(CallError::SendClosed);
                }
                if slots.queue.len() < self.capacity {
                    slots.queue.push_back(msg);
                    drop(slots);
                    self.readable.notify_waiters();
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    /// Dequeues the oldest message, suspending while the channel is empty.
    ///
    /// Returns `Ok(None)` once the channel is closed and drained.
    pub async fn recv(&self) -> Result<Option<T>, CallError> {
        loop {
            let mut notified = pin!(self.readable.notified());
            notified.as_mut().enable();

            {
                let mut slots = self.lock();
                if let Some(status) = &slots.aborted {
                    return Err(CallError::Failed(status.clone()));
                }
                if let Some(msg) = slots.queue.pop_front() {
                    drop(slots);
                    self.writable.notify_waiters();
                    return Ok(Some(msg));
                }
                if slots.closed {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }

    /// Marks the channel closed. Idempotent.
    pub fn close(&self) {
        {
            let mut slots = self.lock();
            if slots.closed {
                return;
            }
            slots.closed = true;
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Fails the channel with `status`, dropping buffered messages.
    ///
    /// The first abort wins; later calls are ignored.
    pub fn abort(&self, status: Status) {
        {
            let mut slots = self.lock();
            if slots.aborted.is_some() {
                return;
            }
            slots.aborted = Some(status);
            slots.closed = true;
            slots.queue.clear();
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
