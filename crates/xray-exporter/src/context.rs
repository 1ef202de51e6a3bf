// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trace context propagated across service boundaries.
//!
//! This module defines the identifiers shared between the tracing library, the
//! `X-Amzn-Trace-Id` propagator and the segment builder:
//! - **`TraceId`**: 16-byte identifier shared by every span of a trace
//! - **`SpanId`**: 8-byte identifier of a single span
//! - **`TraceContext`**: trace id, span id and sampling decision of an upstream span
//!
//! # Usage
//!
//! ```text
//! Incoming Request
//!   ↓
//! Extract TraceContext (from X-Amzn-Trace-Id)
//!   ↓
//! Process Request (create child span)
//!   ↓
//! Inject TraceContext (into outgoing request headers)
//!   ↓
//! Outgoing Request
//! ```

use std::fmt;

/// 128-bit trace identifier shared by all spans of a distributed trace.
///
/// X-Ray splits it into a 4-byte epoch timestamp and a 12-byte random part, see
/// [`crate::trace_id`].
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
pub struct TraceId(pub [u8; 16]);

impl TraceId {
    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl From<[u8; 16]> for TraceId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

/// 64-bit span identifier.
///
/// The all-zero id never identifies a real span and is used as the "no parent"
/// value when a context carries no parent span.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
pub struct SpanId(pub [u8; 8]);

impl SpanId {
    pub const INVALID: SpanId = SpanId([0; 8]);

    #[must_use]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Parses a 16 character hex string.
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        if value.len() != 16 {
            return None;
        }
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(value, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl From<[u8; 8]> for SpanId {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Trace context of an upstream span.
///
/// Created once per request, either by extraction from the inbound
/// `X-Amzn-Trace-Id` header or by the tracing library for outbound calls, and
/// never modified afterwards.
///
/// # Example
///
/// ```
/// use xray_exporter::context::{SpanId, TraceContext, TraceId};
///
/// let context = TraceContext {
///     trace_id: TraceId([1; 16]),
///     span_id: SpanId::from(0x53995c3f42cd8ad8u64),
///     sampled: true,
/// };
/// assert!(context.has_parent());
/// ```
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct TraceContext {
    /// Identifier shared by every span of the trace.
    pub trace_id: TraceId,
    /// Identifier of the upstream span. [`SpanId::INVALID`] when there is none.
    pub span_id: SpanId,
    /// Sampling decision made upstream.
    pub sampled: bool,
}

impl TraceContext {
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.span_id.is_valid()
    }
}
