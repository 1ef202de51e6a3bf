// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered segment exporter.
//!
//! The [`Exporter`] is registered with the tracing library as its
//! [`SpanConsumer`]. It turns every finished span into a segment document, queues it
//! without blocking, and leaves delivery to a single background flush loop.
//!
//! # Lifecycle
//!
//! ```text
//! Exporter::new ──> Running ──shutdown()──> Stopped
//!                      │                       │
//!         on_span_end enqueues          on_span_end is a no-op
//!         flush loop submits            final flush already done
//! ```
//!
//! # Flush Loop
//!
//! One task per exporter waits on whichever comes first:
//! - the flush interval elapsing
//! - a full batch being buffered
//! - shutdown, which triggers one last flush before the task exits
//!
//! # Failure Handling
//!
//! - **Buffer full**: the new segment is dropped and counted
//! - **Submission failure**: the batch is logged and dropped, no retry
//!
//! Neither ever reaches the code that ended the span.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::api::SegmentsApi;
use crate::config::Config;
use crate::errors::{ExporterError, PushError};
use crate::segment::{Segment, SegmentOptions};
use crate::segment_buffer::SegmentBuffer;
use crate::segment_flusher::SegmentFlusher;
use crate::span::SpanRecord;

/// Receives spans as the tracing library finishes them.
///
/// Implementations are called concurrently from request handling code and must
/// return quickly without blocking.
pub trait SpanConsumer: Send + Sync {
    fn on_span_end(&self, span: SpanRecord);
}

/// Handle to a running exporter. Clones share the same buffer and flush loop.
#[derive(Clone)]
pub struct Exporter {
    inner: Arc<Inner>,
}

struct Inner {
    flusher: Arc<SegmentFlusher>,
    options: SegmentOptions,
    blacklist: Vec<Regex>,
    running: AtomicBool,
    shutdown_token: CancellationToken,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    // Lets the loop flush what is left and exit when every handle is gone
    // without an explicit shutdown.
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

impl Exporter {
    /// Validates `config` and starts the flush loop on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when called outside a tokio runtime.
    pub fn new(api: Arc<dyn SegmentsApi>, config: Config) -> Result<Self, ExporterError> {
        config.validate()?;
        let blacklist = config.blacklist_patterns()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ExporterError::NoRuntime)?;

        let buffer = Arc::new(SegmentBuffer::new(config.buffer_size, config.batch_size));
        let flusher = Arc::new(SegmentFlusher::new(api, buffer));
        let shutdown_token = CancellationToken::new();

        let flush_task = runtime.spawn(run_flush_loop(
            Arc::clone(&flusher),
            config.flush_interval,
            shutdown_token.clone(),
        ));
        debug!(
            "Started X-Ray exporter (buffer size {}, batch size {}, flush interval {:?})",
            config.buffer_size, config.batch_size, config.flush_interval
        );

        Ok(Exporter {
            inner: Arc::new(Inner {
                flusher,
                options: config.segment_options(),
                blacklist,
                running: AtomicBool::new(true),
                shutdown_token,
                flush_task: Mutex::new(Some(flush_task)),
            }),
        })
    }

    /// Flushes everything currently buffered without waiting for the next interval.
    ///
    /// Returns the number of segments the API accepted.
    pub async fn flush(&self) -> usize {
        self.inner.flusher.flush().await
    }

    /// Stops accepting spans, flushes what is buffered once, and waits for the
    /// flush loop to exit.
    ///
    /// Later calls, including concurrent ones, return once the first has completed
    /// and do nothing else.
    pub async fn shutdown(&self) {
        let mut flush_task = self.inner.flush_task.lock().await;
        let Some(handle) = flush_task.take() else {
            debug!("X-Ray exporter already shut down");
            return;
        };

        self.inner.running.store(false, Ordering::SeqCst);
        // Producers that passed the running check before the store above land
        // either ahead of the final flush or in the dropped count.
        self.inner.flusher.buffer().close();
        self.inner.shutdown_token.cancel();
        if let Err(e) = handle.await {
            error!("X-Ray exporter flush loop failed: {e}");
        }

        let dropped = self.dropped_count();
        if dropped > 0 {
            warn!("X-Ray exporter shut down after dropping {dropped} segments");
        } else {
            debug!("X-Ray exporter shut down");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Segments dropped because the buffer was full, or ended while shutting down.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.inner.flusher.buffer().dropped_count()
    }

    /// Segments waiting for the next flush.
    #[must_use]
    pub fn buffered_count(&self) -> usize {
        self.inner.flusher.buffer().len()
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        self.inner
            .blacklist
            .iter()
            .any(|pattern| pattern.is_match(name))
    }
}

impl SpanConsumer for Exporter {
    fn on_span_end(&self, span: SpanRecord) {
        if !self.is_running() {
            return;
        }
        if self.is_blacklisted(&span.name) {
            debug!("Not exporting blacklisted span {:?}", span.name);
            return;
        }

        let segment = Segment::from_span(&span, &self.inner.options);
        let document = match segment.to_json() {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to serialize segment {}: {e}", segment.id);
                return;
            }
        };

        match self.inner.flusher.buffer().try_push(document) {
            Ok(()) => {}
            Err(e @ PushError::BufferFull { .. }) => warn!(
                "Dropping segment {}: {e}, {} dropped so far",
                segment.id,
                self.dropped_count()
            ),
            Err(e @ PushError::Closed { .. }) => {
                debug!("Dropping segment {}: {e}", segment.id);
            }
        }
    }
}

async fn run_flush_loop(
    flusher: Arc<SegmentFlusher>,
    flush_interval: Duration,
    shutdown_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(flush_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // discard first tick, which is instantaneous

    loop {
        tokio::select! {
            biased;
            () = shutdown_token.cancelled() => {
                debug!("Segment flusher shutting down, performing final flush");
                flusher.flush().await;
                break;
            }
            () = flusher.buffer().batch_ready() => {
                flusher.flush().await;
            }
            _ = interval.tick() => {
                flusher.flush().await;
            }
        }
    }
}
