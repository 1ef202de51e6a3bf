// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::api::SegmentsApi;
use crate::segment_buffer::SegmentBuffer;

/// Drains the segment buffer into the ingestion API.
///
/// Delivery is at most once: a batch that fails to submit is logged and
/// dropped, never re-queued.
#[allow(clippy::module_name_repetitions)]
pub struct SegmentFlusher {
    api: Arc<dyn SegmentsApi>,
    buffer: Arc<SegmentBuffer>,
    // Held for the whole flush so two submissions never overlap.
    flush_lock: Mutex<()>,
}

impl SegmentFlusher {
    #[must_use]
    pub fn new(api: Arc<dyn SegmentsApi>, buffer: Arc<SegmentBuffer>) -> Self {
        SegmentFlusher {
            api,
            buffer,
            flush_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<SegmentBuffer> {
        &self.buffer
    }

    /// Submits everything buffered when the flush starts, one batch per call.
    ///
    /// Segments arriving during the flush wait for the next one, so a steady
    /// stream of producers cannot keep a flush running forever.
    /// Returns the number of segments the API accepted.
    pub async fn flush(&self) -> usize {
        let _guard = self.flush_lock.lock().await;

        let pending = self.buffer.len();
        if pending == 0 {
            return 0;
        }
        let batches = pending.div_ceil(self.buffer.batch_size());

        let mut delivered = 0;
        for _ in 0..batches {
            let batch = self.buffer.get_batch();
            if batch.is_empty() {
                break;
            }
            delivered += self.send(batch).await;
        }
        delivered
    }

    async fn send(&self, batch: Vec<String>) -> usize {
        let count = batch.len();
        debug!("Flushing {count} segments");
        match self.api.put_trace_segments(batch).await {
            Ok(()) => {
                debug!("Successfully flushed {count} segments");
                count
            }
            Err(e) => {
                error!("Dropping batch of {count} segments: {e}");
                0
            }
        }
    }
}
