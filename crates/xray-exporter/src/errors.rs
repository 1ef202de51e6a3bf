// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the exporter.
//!
//! None of these are fatal to the host process. Each one is recovered where it
//! occurs: a malformed header becomes "no upstream context", a full buffer drops
//! the segment, and a failed submission drops the batch.

use thiserror::Error;

/// An `X-Amzn-Trace-Id` root value that does not match `1-{8 hex}-{24 hex}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed X-Ray trace id {value:?}: {reason}")]
pub struct MalformedTraceId {
    pub value: String,
    pub reason: &'static str,
}

impl MalformedTraceId {
    pub(crate) fn new(value: &str, reason: &'static str) -> Self {
        Self {
            value: value.to_string(),
            reason,
        }
    }
}

/// The segment buffer did not take a document; the document is handed back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("segment buffer is full (capacity {capacity})")]
    BufferFull { capacity: usize, document: String },

    #[error("segment buffer is closed")]
    Closed { document: String },
}

/// A batch could not be delivered to the ingestion backend.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend rejected batch with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("daemon socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid exporter configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("buffer size must be at least 1")]
    ZeroBufferSize,

    #[error("batch size must be between 1 and {max}, got {got}")]
    BatchSize { got: usize, max: usize },

    #[error("flush interval must be greater than zero")]
    ZeroFlushInterval,

    #[error("invalid blacklist pattern {pattern:?}: {source}")]
    Blacklist {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while constructing an [`crate::exporter::Exporter`].
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("the exporter must be created inside a tokio runtime")]
    NoRuntime,
}

/// Failure to install the global log subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
