// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! X-Ray segment documents.
//!
//! A [`Segment`] is the backend's representation of one finished span. It is built
//! from a [`SpanRecord`] by [`Segment::from_span`] and serialized to the X-Ray
//! segment JSON schema:
//!
//! ```text
//! {
//!   "name": "www.example.com",
//!   "id": "53995c3f42cd8ad8",
//!   "trace_id": "1-5759e988-bd862e3fe1be46a994272793",
//!   "start_time": 1461096053.37518,
//!   "end_time": 1461096053.4042,
//!   "http": {
//!     "request": { "method": "GET", "url": "www.example.com/index", "user_agent": "curl" },
//!     "response": { "status": 200 }
//!   }
//! }
//! ```
//!
//! Optional fields that are unset are left out of the document rather than sent
//! as empty values.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::span::{attributes, AttributeValue, SpanKind, SpanRecord};
use crate::trace_id::to_amazon_trace_id;

/// Longest segment name X-Ray accepts.
pub const MAX_NAME_LEN: usize = 200;

/// Used when a span name has no characters X-Ray accepts.
const FALLBACK_NAME: &str = "unknown";

const REMOTE_NAMESPACE: &str = "remote";
const SUBSEGMENT_TYPE: &str = "subsegment";

lazy_static! {
    /// Characters outside the set X-Ray allows in segment names.
    static ref INVALID_NAME_CHARS_REGEX: Regex =
        Regex::new(r"[^\p{L}\p{N}\s_.:/%&#=+\\\-@]").expect("failed creating regex");

    /// Annotation keys may only contain alphanumerics and underscores.
    static ref INVALID_ANNOTATION_KEY_CHARS_REGEX: Regex =
        Regex::new(r"[^A-Za-z0-9_]").expect("failed creating regex");
}

/// Settings applied to every segment, independent of the span.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentOptions {
    /// AWS resource type running the application, e.g. `AWS::EC2::Instance`.
    pub origin: Option<String>,
    /// Application version reported in `service.version`.
    pub version: Option<String>,
}

/// X-Ray segment document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    /// Hex encoded span id.
    pub id: String,
    /// Trace id in X-Ray format.
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub segment_type: Option<String>,
    /// Epoch seconds.
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<Http>,
    /// Client error (4xx).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    /// Request throttled (429).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub throttle: bool,
    /// Server error (5xx) or failed span.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fault: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Cause>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Http {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    pub exceptions: Vec<Exception>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub id: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub version: String,
}

impl Segment {
    /// Builds the segment document for a finished span.
    #[must_use]
    pub fn from_span(span: &SpanRecord, options: &SegmentOptions) -> Self {
        let id = span.span_id.to_string();
        let http = make_http(span);
        let status_code = http
            .as_ref()
            .and_then(|http| http.response.as_ref())
            .and_then(|response| response.status);

        let mut segment = Segment {
            name: segment_name(span),
            trace_id: to_amazon_trace_id(&span.trace_id),
            parent_id: span.parent_span_id.map(|parent| parent.to_string()),
            start_time: epoch_seconds(span.start_time),
            origin: options.origin.clone(),
            http,
            annotations: make_annotations(span),
            service: options.version.clone().map(|version| Service { version }),
            ..Default::default()
        };

        match span.end_time {
            Some(end_time) => segment.end_time = Some(epoch_seconds(end_time)),
            None => segment.in_progress = true,
        }

        if span.kind == SpanKind::Client {
            segment.namespace = Some(REMOTE_NAMESPACE.to_string());
            if span.parent_span_id.is_some() {
                segment.segment_type = Some(SUBSEGMENT_TYPE.to_string());
            }
        }

        match status_code {
            Some(429) => {
                segment.error = true;
                segment.throttle = true;
            }
            Some(400..=499) => segment.error = true,
            Some(500..=599) => segment.fault = true,
            Some(_) => {}
            None => segment.fault = !span.status.is_ok(),
        }

        if !span.status.is_ok() && !span.status.message.is_empty() {
            segment.cause = Some(Cause {
                exceptions: vec![Exception {
                    id: id.clone(),
                    message: span.status.message.clone(),
                }],
            });
        }

        segment.id = id;
        segment
    }

    /// Serializes the document for submission.
    ///
    /// # Errors
    ///
    /// Fails only if an annotation holds a value JSON cannot represent.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Remote host for HTTP spans, otherwise the span name.
fn segment_name(span: &SpanRecord) -> String {
    let name = span
        .attribute_str(attributes::HTTP_HOST)
        .unwrap_or(&span.name);
    sanitize_name(name)
}

fn sanitize_name(name: &str) -> String {
    let sanitized = INVALID_NAME_CHARS_REGEX.replace_all(name, "");
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    sanitized.chars().take(MAX_NAME_LEN).collect()
}

fn make_http(span: &SpanRecord) -> Option<Http> {
    let string_attribute = |key: &str| span.attribute_str(key).map(str::to_string);
    let int_attribute = |key: &str| span.attributes.get(key).and_then(AttributeValue::as_i64);

    let url = string_attribute(attributes::HTTP_URL).or_else(|| {
        match (
            span.attribute_str(attributes::HTTP_HOST),
            span.attribute_str(attributes::HTTP_PATH),
        ) {
            (Some(host), Some(path)) => Some(format!("{host}{path}")),
            (Some(host), None) => Some(host.to_string()),
            _ => None,
        }
    });

    let request = HttpRequest {
        method: string_attribute(attributes::HTTP_METHOD),
        url,
        user_agent: string_attribute(attributes::HTTP_USER_AGENT),
        client_ip: string_attribute(attributes::HTTP_CLIENT_IP),
    };
    let response = HttpResponse {
        status: int_attribute(attributes::HTTP_STATUS_CODE),
        content_length: int_attribute(attributes::HTTP_RESPONSE_CONTENT_LENGTH),
    };

    let request = (request != HttpRequest::default()).then_some(request);
    let response = (response != HttpResponse::default()).then_some(response);
    if request.is_none() && response.is_none() {
        return None;
    }
    Some(Http { request, response })
}

/// Every attribute outside the `http.` namespace, keyed by its sanitized name.
fn make_annotations(span: &SpanRecord) -> BTreeMap<String, Value> {
    span.attributes
        .iter()
        .filter(|(key, _)| !key.starts_with(attributes::HTTP_PREFIX))
        .filter_map(|(key, value)| {
            let value = match value {
                AttributeValue::String(value) => Value::String(value.clone()),
                AttributeValue::Bool(value) => Value::Bool(*value),
                AttributeValue::Int(value) => Value::Number((*value).into()),
                AttributeValue::Float(value) => Value::Number(Number::from_f64(*value)?),
            };
            let key = INVALID_ANNOTATION_KEY_CHARS_REGEX
                .replace_all(key, "_")
                .into_owned();
            Some((key, value))
        })
        .collect()
}

fn epoch_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::context::{SpanId, TraceId};

    fn start() -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(1_461_096_053_375)
    }

    fn span(name: &str) -> SpanRecord {
        SpanRecord::new(
            name,
            TraceId([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
            SpanId::from(0x53995c3f42cd8ad8u64),
            start(),
        )
    }

    #[test]
    fn http_server_span() {
        let span = span("/index")
            .with_attribute("http.host", "www.example.com")
            .with_attribute("http.path", "/index")
            .with_attribute("http.method", "GET")
            .with_attribute("http.user_agent", "blah-agent")
            .with_attribute("http.status_code", 200i64)
            .with_end_time(start() + Duration::from_millis(250));

        let segment = Segment::from_span(&span, &SegmentOptions::default());

        assert_eq!(segment.name, "www.example.com");
        assert_eq!(segment.id, "53995c3f42cd8ad8");
        assert_eq!(segment.trace_id, "1-01020304-05060708090a0b0c0d0e0f10");
        assert_eq!(segment.parent_id, None);
        assert!(!segment.in_progress);
        assert!((segment.start_time - 1_461_096_053.375).abs() < 1e-6);
        let end_time = segment.end_time.expect("end time");
        assert!((end_time - 1_461_096_053.625).abs() < 1e-6);

        let http = segment.http.expect("http block");
        assert_eq!(
            http.request,
            Some(HttpRequest {
                method: Some("GET".to_string()),
                url: Some("www.example.com/index".to_string()),
                user_agent: Some("blah-agent".to_string()),
                client_ip: None,
            })
        );
        assert_eq!(
            http.response,
            Some(HttpResponse {
                status: Some(200),
                content_length: None,
            })
        );
        assert!(!segment.error && !segment.fault && !segment.throttle);
    }

    #[test]
    fn explicit_url_takes_precedence() {
        let span = span("op")
            .with_attribute("http.url", "https://api.example.com/v1/users?id=1")
            .with_attribute("http.host", "api.example.com")
            .with_attribute("http.path", "/v1/users");

        let segment = Segment::from_span(&span, &SegmentOptions::default());
        let request = segment.http.and_then(|http| http.request).expect("request");
        assert_eq!(
            request.url.as_deref(),
            Some("https://api.example.com/v1/users?id=1")
        );
        assert_eq!(request.method, None);
    }

    #[test]
    fn span_name_used_without_host() {
        let segment = Segment::from_span(&span("checkout"), &SegmentOptions::default());
        assert_eq!(segment.name, "checkout");
        assert_eq!(segment.http, None);
    }

    #[test]
    fn in_progress_span() {
        let segment = Segment::from_span(&span("op"), &SegmentOptions::default());
        assert!(segment.in_progress);
        assert_eq!(segment.end_time, None);

        let json: Value = serde_json::from_str(&segment.to_json().expect("json")).expect("parse");
        assert_eq!(json["in_progress"], Value::Bool(true));
        assert!(json.get("end_time").is_none());
    }

    #[test]
    fn unset_fields_are_omitted() {
        let span = span("op")
            .with_attribute("http.method", "POST")
            .with_end_time(start());
        let json: Value = serde_json::from_str(
            &Segment::from_span(&span, &SegmentOptions::default())
                .to_json()
                .expect("json"),
        )
        .expect("parse");

        assert_eq!(json["http"]["request"]["method"], "POST");
        assert!(json["http"]["request"].get("url").is_none());
        assert!(json["http"]["request"].get("user_agent").is_none());
        assert!(json["http"].get("response").is_none());
        for field in [
            "parent_id",
            "type",
            "in_progress",
            "namespace",
            "origin",
            "error",
            "throttle",
            "fault",
            "cause",
            "annotations",
            "service",
        ] {
            assert!(json.get(field).is_none(), "{field} should be omitted");
        }
    }

    #[test]
    fn status_code_flags() {
        let cases = [
            (200i64, false, false, false),
            (404, true, false, false),
            (429, true, true, false),
            (503, false, false, true),
        ];
        for (status, error, throttle, fault) in cases {
            let span = span("op").with_attribute("http.status_code", status);
            let segment = Segment::from_span(&span, &SegmentOptions::default());
            assert_eq!(segment.error, error, "error for {status}");
            assert_eq!(segment.throttle, throttle, "throttle for {status}");
            assert_eq!(segment.fault, fault, "fault for {status}");
        }
    }

    #[test]
    fn failed_span_without_http_status_is_fault() {
        let span = span("op").with_status(13, "connection reset");
        let segment = Segment::from_span(&span, &SegmentOptions::default());

        assert!(segment.fault);
        assert_eq!(
            segment.cause,
            Some(Cause {
                exceptions: vec![Exception {
                    id: "53995c3f42cd8ad8".to_string(),
                    message: "connection reset".to_string(),
                }],
            })
        );
    }

    #[test]
    fn client_span_is_remote_subsegment() {
        let span = span("GET")
            .with_kind(SpanKind::Client)
            .with_parent(SpanId::from(1u64))
            .with_attribute("http.host", "dynamodb.us-east-1.amazonaws.com");
        let segment = Segment::from_span(&span, &SegmentOptions::default());

        assert_eq!(segment.namespace.as_deref(), Some("remote"));
        assert_eq!(segment.segment_type.as_deref(), Some("subsegment"));
        assert_eq!(segment.parent_id.as_deref(), Some("0000000000000001"));
        assert_eq!(segment.name, "dynamodb.us-east-1.amazonaws.com");
    }

    #[test]
    fn annotations_and_options() {
        let span = span("op")
            .with_attribute("user.id", "42")
            .with_attribute("cache-hit", true)
            .with_attribute("retries", 3i64)
            .with_attribute("ratio", f64::NAN)
            .with_attribute("http.method", "GET");
        let options = SegmentOptions {
            origin: Some("AWS::ECS::Container".to_string()),
            version: Some("1.2.3".to_string()),
        };
        let segment = Segment::from_span(&span, &options);

        assert_eq!(
            segment.annotations,
            BTreeMap::from([
                ("cache_hit".to_string(), Value::Bool(true)),
                ("retries".to_string(), Value::from(3)),
                ("user_id".to_string(), Value::String("42".to_string())),
            ])
        );
        assert_eq!(segment.origin.as_deref(), Some("AWS::ECS::Container"));
        assert_eq!(
            segment.service,
            Some(Service {
                version: "1.2.3".to_string()
            })
        );
    }

    #[test]
    fn name_is_sanitized_and_truncated() {
        assert_eq!(sanitize_name("my<service>!"), "myservice");
        assert_eq!(sanitize_name("<<>>"), FALLBACK_NAME);
        assert_eq!(sanitize_name(&"a".repeat(300)).len(), MAX_NAME_LEN);
        assert_eq!(sanitize_name("api.example.com:8080"), "api.example.com:8080");
    }
}
