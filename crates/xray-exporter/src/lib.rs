// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # X-Ray Exporter
//!
//! Bridges an in-process tracing library to the AWS X-Ray ingestion backend.
//!
//! ## Overview
//!
//! Two pieces do the work:
//! - **Propagation**: the `X-Amzn-Trace-Id` header codec, used to continue traces
//!   across process boundaries ([`propagation`], [`trace_id`])
//! - **Export**: finished spans are converted to X-Ray segment documents
//!   ([`segment`]), buffered in a bounded queue ([`segment_buffer`]) and flushed in
//!   batches to a [`api::SegmentsApi`] by a single background loop ([`exporter`])
//!
//! ## Flow
//!
//! ```text
//! inbound request ─ XRayPropagator::extract ─> TraceContext
//!   ↓
//! tracing library runs the span
//!   ↓
//! SpanConsumer::on_span_end(SpanRecord)
//!   ↓
//! Segment::from_span ─> SegmentBuffer::try_push   (never blocks, drops when full)
//!   ↓
//! flush loop (interval | batch ready | shutdown)
//!   ↓
//! SegmentsApi::put_trace_segments(batch)          (at most once, no retry)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xray_exporter::{api::DaemonSegmentsApi, config::Config, exporter::Exporter};
//!
//! let config = Config::from_env();
//! let api = Arc::new(DaemonSegmentsApi::from_config(&config).await?);
//! let exporter = Exporter::new(api, config)?;
//! tracer.register_exporter(Arc::new(exporter.clone()));
//! // ...
//! exporter.shutdown().await;
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]
#![deny(unused_extern_crates)]
#![deny(unreachable_pub)]

/// Remote ingestion clients (HTTP `PutTraceSegments` and the UDP daemon)
pub mod api;

/// Exporter configuration, defaults and environment loading
pub mod config;

/// Trace and span identifiers and the propagated trace context
pub mod context;

/// Error taxonomy
pub mod errors;

/// Buffered exporter and the span consumer callback
pub mod exporter;

/// Log formatting and subscriber setup
pub mod logger;

/// `X-Amzn-Trace-Id` header propagation
pub mod propagation;

/// X-Ray segment documents
pub mod segment;

/// Bounded queue of serialized segments awaiting flush
pub mod segment_buffer;

/// Batch submission with drop-on-failure
pub mod segment_flusher;

/// Finished span records handed over by the tracing library
pub mod span;

/// Conversion between binary trace ids and X-Ray trace ids
pub mod trace_id;
