// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded buffering of serialized segments ahead of a flush.
//!
//! The `SegmentBuffer` sits between the span-ending application code (many
//! concurrent producers) and the exporter's flush loop (the single consumer):
//! 1. Producers call `try_push()`, which takes the lock only for an O(1) append
//! 2. When the buffer holds `batch_size` documents the flush loop is woken
//! 3. The flush loop drains it with `get_batch()`, at most `batch_size` at a time
//!
//! # Backpressure
//!
//! Producers never wait. When the buffer is at capacity the new document is
//! rejected and counted as dropped; already buffered documents are kept.
//!
//! # Closing
//!
//! `close()` is called on shutdown, before the final flush. The closed flag lives
//! under the queue lock, so every document is either pushed before the close
//! (and drained by the final flush) or rejected and counted as dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::errors::PushError;

/// Fixed-capacity FIFO queue of serialized segment documents.
pub struct SegmentBuffer {
    queue: Mutex<Queue>,
    capacity: usize,
    batch_size: usize,
    dropped: AtomicU64,
    batch_ready: Notify,
}

struct Queue {
    documents: VecDeque<String>,
    closed: bool,
}

impl SegmentBuffer {
    /// Creates an empty buffer. Zero sizes are raised to one.
    #[must_use]
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        let capacity = capacity.max(1);
        SegmentBuffer {
            queue: Mutex::new(Queue {
                documents: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            batch_size: batch_size.max(1),
            dropped: AtomicU64::new(0),
            batch_ready: Notify::new(),
        }
    }

    /// Appends a document without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::BufferFull`] when the buffer is at capacity and
    /// [`PushError::Closed`] after [`SegmentBuffer::close`], both carrying the
    /// rejected document. Either way the drop is counted in
    /// [`SegmentBuffer::dropped_count`].
    pub fn try_push(&self, document: String) -> Result<(), PushError> {
        let len = {
            let mut queue = self.lock();
            let rejected = if queue.closed {
                Some(PushError::Closed { document })
            } else if queue.documents.len() >= self.capacity {
                Some(PushError::BufferFull {
                    capacity: self.capacity,
                    document,
                })
            } else {
                queue.documents.push_back(document);
                None
            };
            if let Some(rejected) = rejected {
                drop(queue);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(rejected);
            }
            queue.documents.len()
        };

        if len >= self.batch_size {
            self.batch_ready.notify_one();
        }
        Ok(())
    }

    /// Removes and returns up to `batch_size` documents, oldest first.
    ///
    /// An empty vector means the buffer is drained.
    pub fn get_batch(&self) -> Vec<String> {
        let mut queue = self.lock();
        let count = queue.documents.len().min(self.batch_size);
        queue.documents.drain(..count).collect()
    }

    /// Rejects every later push. Documents already buffered can still be drained.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Resolves once a full batch has been buffered since the last wake-up.
    pub async fn batch_ready(&self) {
        self.batch_ready.notified().await;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().documents.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of documents rejected because the buffer was full or closed.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    // A panic while holding the lock cannot leave the queue half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
