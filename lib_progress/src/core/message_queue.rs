//! # Message Queue
//!
//! The intake side of the progress log. Producers call [`MessageQueue::enqueue`]
//! from any thread; exactly one consumer calls [`MessageQueue::drain_all`].
//!
//! ## Synchronization
//!
//! The messages sit behind a single `std::sync::Mutex`. The "not empty"
//! condition is a `tokio::sync::Notify` raised on the empty → non-empty
//! transition. `Notify` stores a permit when nobody is waiting yet, so a
//! message that lands between the consumer's emptiness check and its await
//! still wakes it.
//!
//! Elements are only ever appended at the tail and removed by a full
//! drain-and-clear. There is no partial removal.
//!
//! Once the consumer is gone the queue is [closed](MessageQueue::close): the
//! backlog is released and later enqueues are discarded, so producers that
//! outlive the display do not grow it without bound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::ProgressError;

/// An unbounded, ordered, multi-producer / single-consumer message buffer.
#[derive(Debug, Default)]
pub struct MessageQueue {
    /// Pending messages in insertion order.
    messages: Mutex<Vec<String>>,
    /// Raised whenever `messages` goes from empty to non-empty.
    not_empty: Notify,
    /// Set once nobody will drain again. Only written under the `messages` lock.
    closed: AtomicBool,
}

impl MessageQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` at the tail and wakes the consumer if the queue was empty.
    ///
    /// Never blocks beyond acquiring the internal mutex. Messages appended after
    /// [`MessageQueue::close`] are accepted and discarded.
    pub fn enqueue(&self, message: impl Into<String>) {
        let message = message.into();
        let was_empty = {
            let mut messages = self.lock();
            if self.is_closed() {
                return;
            }
            let was_empty = messages.is_empty();
            messages.push(message);
            was_empty
        };
        if was_empty {
            self.not_empty.notify_one();
        }
    }

    /// Appends every message of `messages` under one lock acquisition.
    pub fn enqueue_all<I, M>(&self, messages: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        let was_empty = {
            let mut queued = self.lock();
            if self.is_closed() {
                return;
            }
            let was_empty = queued.is_empty();
            queued.extend(messages.into_iter().map(Into::into));
            was_empty && !queued.is_empty()
        };
        if was_empty {
            self.not_empty.notify_one();
        }
    }

    /// Waits until at least one message is queued, then takes the entire
    /// content and leaves the queue empty.
    ///
    /// The returned vector is an owned copy, so producers can keep appending
    /// while the caller works with it. Each message ends up in exactly one
    /// drain result.
    ///
    /// Single-consumer contract: only the drainer may call this.
    ///
    /// # Errors
    /// Returns [`ProgressError::Canceled`] as soon as `token` is cancelled,
    /// without needing a new message to arrive.
    pub async fn drain_all(&self, token: &CancellationToken) -> Result<Vec<String>, ProgressError> {
        loop {
            if token.is_cancelled() {
                return Err(ProgressError::Canceled);
            }
            {
                let mut messages = self.lock();
                if !messages.is_empty() {
                    return Ok(std::mem::take(&mut *messages));
                }
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ProgressError::Canceled),
                _ = self.not_empty.notified() => {}
            }
        }
    }

    /// Marks the queue as abandoned by its consumer and releases the backlog.
    /// Returns how many undrained messages were discarded. Idempotent.
    pub fn close(&self) -> usize {
        let mut messages = self.lock();
        self.closed.store(true, Ordering::Release);
        let discarded = messages.len();
        *messages = Vec::new();
        discarded
    }

    /// Whether [`MessageQueue::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Takes whatever is queued right now without waiting. May be empty.
    pub fn try_drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of messages waiting to be drained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A panicking producer cannot leave a half-pushed Vec behind.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }
}
