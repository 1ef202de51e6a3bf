// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote ingestion clients.
//!
//! The exporter only depends on the [`SegmentsApi`] capability: submit a batch of
//! serialized segment documents, get success or failure back. Two clients are
//! provided:
//! - **`HttpSegmentsApi`**: `PutTraceSegments` over HTTP, for a proxy or an
//!   endpoint that handles request signing
//! - **`DaemonSegmentsApi`**: the X-Ray daemon UDP protocol, one datagram per document

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::SubmissionError;

/// Prefix of every datagram sent to the X-Ray daemon.
pub const DAEMON_HEADER: &str = "{\"format\": \"json\", \"version\": 1}\n";

/// Path of the `PutTraceSegments` operation.
pub const PUT_TRACE_SEGMENTS_PATH: &str = "/TraceSegments";

/// Submits batches of segment documents to the backend.
///
/// Called only from the exporter's flush loop, never from span-ending code, so
/// implementations are free to do network I/O.
#[async_trait]
pub trait SegmentsApi: Send + Sync {
    /// Delivers one batch. Any error drops the whole batch.
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), SubmissionError>;
}

#[derive(Serialize)]
struct PutTraceSegmentsRequest<'a> {
    #[serde(rename = "TraceSegmentDocuments")]
    trace_segment_documents: &'a [String],
}

#[derive(Deserialize, Default)]
struct PutTraceSegmentsResponse {
    #[serde(rename = "UnprocessedTraceSegments", default)]
    unprocessed_trace_segments: Vec<UnprocessedTraceSegment>,
}

#[derive(Deserialize)]
struct UnprocessedTraceSegment {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "ErrorCode")]
    error_code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// `PutTraceSegments` client over HTTP.
#[derive(Clone, Debug)]
pub struct HttpSegmentsApi {
    client: reqwest::Client,
    url: String,
}

impl HttpSegmentsApi {
    /// Creates a client posting to `{endpoint}/TraceSegments`.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Creates a client posting to `endpoint` with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn from_config(endpoint: &str, config: &Config) -> Result<Self, SubmissionError> {
        Self::new(endpoint, config.request_timeout)
    }

    /// Uses a preconfigured client, e.g. one with proxy settings.
    #[must_use]
    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        let url = format!(
            "{}{PUT_TRACE_SEGMENTS_PATH}",
            endpoint.trim().trim_end_matches('/')
        );
        Self { client, url }
    }
}

#[async_trait]
impl SegmentsApi for HttpSegmentsApi {
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), SubmissionError> {
        let body = serde_json::to_vec(&PutTraceSegmentsRequest {
            trace_segment_documents: &documents,
        })?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // The backend accepts the batch but may still reject single documents.
        let response = match response.bytes().await {
            Ok(body) => {
                serde_json::from_slice::<PutTraceSegmentsResponse>(&body).unwrap_or_default()
            }
            Err(e) => {
                debug!("Batch accepted, but the response body could not be read: {e}");
                return Ok(());
            }
        };
        for unprocessed in &response.unprocessed_trace_segments {
            warn!(
                "Segment {} was not processed: {} {}",
                unprocessed.id.as_deref().unwrap_or("<unknown>"),
                unprocessed.error_code.as_deref().unwrap_or_default(),
                unprocessed.message.as_deref().unwrap_or_default(),
            );
        }
        debug!(
            "Submitted {} segments, {} unprocessed",
            documents.len(),
            response.unprocessed_trace_segments.len()
        );
        Ok(())
    }
}

/// X-Ray daemon client.
#[derive(Debug)]
pub struct DaemonSegmentsApi {
    socket: UdpSocket,
    address: SocketAddr,
}

impl DaemonSegmentsApi {
    /// Resolves the daemon address (e.g. `127.0.0.1:2000`) and opens a socket to it.
    ///
    /// # Errors
    ///
    /// Fails when the address does not resolve or no local socket can be bound.
    pub async fn bind(address: &str) -> io::Result<Self> {
        let address = tokio::net::lookup_host(address)
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("daemon address {address:?} did not resolve"),
                )
            })?;
        let local = if address.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(address).await?;
        debug!("Sending segments to X-Ray daemon at {address}");
        Ok(Self { socket, address })
    }

    /// Opens a socket to the configured daemon address.
    ///
    /// # Errors
    ///
    /// Same as [`DaemonSegmentsApi::bind`].
    pub async fn from_config(config: &Config) -> io::Result<Self> {
        Self::bind(&config.daemon_address).await
    }

    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

#[async_trait]
impl SegmentsApi for DaemonSegmentsApi {
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), SubmissionError> {
        for document in &documents {
            let datagram = format!("{DAEMON_HEADER}{document}");
            self.socket.send(datagram.as_bytes()).await?;
        }
        debug!("Sent {} segments to X-Ray daemon", documents.len());
        Ok(())
    }
}
