// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock ingestion APIs

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use xray_exporter::{api::SegmentsApi, errors::SubmissionError};

/// Forwards every submitted batch to a channel and reports success
pub struct RecordingApi {
    tx: UnboundedSender<Vec<String>>,
}

impl RecordingApi {
    pub fn new() -> (Self, UnboundedReceiver<Vec<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SegmentsApi for RecordingApi {
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), SubmissionError> {
        let _ = self.tx.send(documents);
        Ok(())
    }
}

/// Rejects every batch, counting calls and documents seen
#[derive(Default)]
pub struct FailingApi {
    calls: AtomicUsize,
    documents: AtomicUsize,
}

#[allow(dead_code)]
impl FailingApi {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn documents(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentsApi for FailingApi {
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents.fetch_add(documents.len(), Ordering::SeqCst);
        Err(SubmissionError::Status {
            status: 500,
            body: "internal failure".to_string(),
        })
    }
}
