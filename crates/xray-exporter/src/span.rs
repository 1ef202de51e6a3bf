// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Finished span records.
//!
//! A `SpanRecord` is produced by the tracing library when a span ends and handed to
//! the exporter through [`crate::exporter::SpanConsumer`]. The exporter only reads it.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use crate::context::{SpanId, TraceId};

/// Attribute keys the segment builder maps into the `http` block.
pub mod attributes {
    pub const HTTP_HOST: &str = "http.host";
    pub const HTTP_METHOD: &str = "http.method";
    pub const HTTP_PATH: &str = "http.path";
    pub const HTTP_URL: &str = "http.url";
    pub const HTTP_USER_AGENT: &str = "http.user_agent";
    pub const HTTP_CLIENT_IP: &str = "http.client_ip";
    pub const HTTP_STATUS_CODE: &str = "http.status_code";
    pub const HTTP_RESPONSE_CONTENT_LENGTH: &str = "http.response_content_length";

    /// Prefix of every attribute that belongs to the `http` block.
    pub const HTTP_PREFIX: &str = "http.";
}

/// Scalar attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl AttributeValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Integer view of the value; numeric strings are accepted since some
    /// instrumentations record status codes as text.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(value) => Some(*value),
            AttributeValue::String(value) => value.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(value) => f.write_str(value),
            AttributeValue::Bool(value) => write!(f, "{value}"),
            AttributeValue::Int(value) => write!(f, "{value}"),
            AttributeValue::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

/// Role of the span in the request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SpanKind {
    #[default]
    Unspecified,
    /// Handles an inbound request.
    Server,
    /// Makes an outbound call to a remote service.
    Client,
}

/// Completion status reported by the tracing library.
///
/// Codes follow the gRPC canonical codes, `0` is OK.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    pub const OK: i32 = 0;

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == Self::OK
    }
}

/// A finished span.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanRecord {
    pub name: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub start_time: SystemTime,
    /// `None` while the span is still in progress.
    pub end_time: Option<SystemTime>,
    pub attributes: HashMap<String, AttributeValue>,
    pub status: Status,
    pub kind: SpanKind,
}

impl SpanRecord {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        trace_id: TraceId,
        span_id: SpanId,
        start_time: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            trace_id,
            span_id,
            parent_span_id: None,
            start_time,
            end_time: None,
            attributes: HashMap::new(),
            status: Status::default(),
            kind: SpanKind::default(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_end_time(mut self, end_time: SystemTime) -> Self {
        self.end_time = Some(end_time);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_span_id: SpanId) -> Self {
        self.parent_span_id = Some(parent_span_id);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_status(mut self, code: i32, message: impl Into<String>) -> Self {
        self.status = Status {
            code,
            message: message.into(),
        };
        self
    }

    /// String attribute lookup.
    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttributeValue::as_str)
    }
}
