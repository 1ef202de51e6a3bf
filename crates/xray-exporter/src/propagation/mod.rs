// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `X-Amzn-Trace-Id` trace context propagation.
//!
//! The header carries a `;` separated list of `Key=Value` pairs:
//!
//! ```text
//! X-Amzn-Trace-Id: Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1
//! ```
//!
//! - **`Root`**: X-Ray trace id, see [`crate::trace_id`]
//! - **`Parent`**: 16 hex digit id of the upstream span (optional)
//! - **`Sampled`**: `1` when the upstream sampled the trace, `0` or `?` otherwise
//!
//! Other keys (`Self`, `Lineage`, ...) are ignored. When a recognized key is
//! repeated, the last occurrence wins.
//!
//! Extraction never fails loudly: a missing or malformed header results in no
//! upstream context, and the request starts a new trace.

use tracing::debug;

use crate::context::{SpanId, TraceContext};
use crate::trace_id::{parse_amazon_trace_id, to_amazon_trace_id};
use carrier::{Extractor, Injector};

pub mod carrier;

/// HTTP header carrying the X-Ray trace context.
pub const AMAZON_TRACE_ID_HEADER: &str = "X-Amzn-Trace-Id";

const ROOT_KEY: &str = "Root";
const PARENT_KEY: &str = "Parent";
const SAMPLED_KEY: &str = "Sampled";

/// Extracts and injects trace context.
///
/// Registered with the tracing library as its active propagation format.
pub trait Propagator {
    /// Reads trace context from a carrier, `None` when there is none or it is malformed.
    fn extract(&self, carrier: &dyn Extractor) -> Option<TraceContext>;

    /// Writes trace context into a carrier.
    fn inject(&self, context: &TraceContext, carrier: &mut dyn Injector);
}

/// Propagator for the `X-Amzn-Trace-Id` header.
#[derive(Clone, Copy, Debug, Default)]
pub struct XRayPropagator;

impl Propagator for XRayPropagator {
    fn extract(&self, carrier: &dyn Extractor) -> Option<TraceContext> {
        let header = carrier.get(AMAZON_TRACE_ID_HEADER)?;
        let context = Self::parse_header(header);
        if context.is_none() {
            debug!("Ignoring malformed {AMAZON_TRACE_ID_HEADER} header: {header:?}");
        }
        context
    }

    fn inject(&self, context: &TraceContext, carrier: &mut dyn Injector) {
        carrier.set(AMAZON_TRACE_ID_HEADER, Self::format_header(context));
    }
}

impl XRayPropagator {
    /// Parses a header value, left to right, later keys overwriting earlier ones.
    fn parse_header(header: &str) -> Option<TraceContext> {
        let mut root = None;
        let mut parent = None;
        let mut sampled = None;

        for pair in header.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=')?;
            let value = value.trim();
            match key.trim() {
                ROOT_KEY => root = Some(value),
                PARENT_KEY => parent = Some(value),
                SAMPLED_KEY => sampled = Some(value),
                _ => {}
            }
        }

        let trace_id = match parse_amazon_trace_id(root?) {
            Ok(trace_id) => trace_id,
            Err(e) => {
                debug!("{e}");
                return None;
            }
        };

        let span_id = match parent {
            Some(parent) => SpanId::from_hex(parent)?,
            None => SpanId::INVALID,
        };

        let sampled = match sampled {
            Some("1") => true,
            // `?` asks the receiver to decide; treated as not sampled upstream.
            Some("0" | "?") | None => false,
            Some(_) => return None,
        };

        Some(TraceContext {
            trace_id,
            span_id,
            sampled,
        })
    }

    fn format_header(context: &TraceContext) -> String {
        let mut header = format!("{ROOT_KEY}={}", to_amazon_trace_id(&context.trace_id));
        if context.has_parent() {
            header.push_str(&format!(";{PARENT_KEY}={}", context.span_id));
        }
        header.push_str(&format!(
            ";{SAMPLED_KEY}={}",
            if context.sampled { "1" } else { "0" }
        ));
        header
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::context::TraceId;

    fn headers(value: &str) -> HashMap<String, String> {
        let mut carrier = HashMap::new();
        carrier.set(AMAZON_TRACE_ID_HEADER, value.to_string());
        carrier
    }

    fn trace_id(last: u8) -> TraceId {
        let mut bytes = [0u8; 16];
        bytes[3] = 1;
        bytes[15] = last;
        TraceId(bytes)
    }

    #[test]
    fn extract_root_and_sampled() {
        let carrier = headers("Root=1-00000001-0000000000000000000002;Sampled=1");

        let context = XRayPropagator.extract(&carrier).expect("context");
        assert_eq!(context.trace_id, trace_id(2));
        assert!(context.sampled);
        assert!(!context.has_parent());
    }

    #[test]
    fn extract_with_parent() {
        let carrier = headers(
            "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=0",
        );

        let context = XRayPropagator.extract(&carrier).expect("context");
        assert_eq!(context.span_id, SpanId::from(0x53995c3f42cd8ad8u64));
        assert!(!context.sampled);
    }

    #[test]
    fn extract_is_whitespace_and_case_tolerant() {
        let mut carrier = HashMap::new();
        carrier.insert(
            "x-amzn-trace-id".to_string(),
            " Root = 1-00000001-000000000000000000000002 ; Sampled = 1 ;".to_string(),
        );

        let context = XRayPropagator.extract(&carrier).expect("context");
        assert_eq!(context.trace_id, trace_id(2));
        assert!(context.sampled);
    }

    #[test]
    fn extract_from_canonical_header_name() {
        let mut carrier = HashMap::new();
        carrier.insert(
            AMAZON_TRACE_ID_HEADER.to_string(),
            "Root=1-00000001-000000000000000000000002;Sampled=1".to_string(),
        );

        let context = XRayPropagator.extract(&carrier).expect("context");
        assert_eq!(context.trace_id, trace_id(2));
    }

    #[test]
    fn extract_missing_header() {
        let carrier: HashMap<String, String> = HashMap::new();
        assert_eq!(XRayPropagator.extract(&carrier), None);
    }

    #[test]
    fn extract_missing_root() {
        let carrier = headers("Parent=53995c3f42cd8ad8;Sampled=1");
        assert_eq!(XRayPropagator.extract(&carrier), None);
    }

    #[test]
    fn extract_malformed_values() {
        let cases = [
            "Root=2-00000001-000000000000000000000002;Sampled=1",
            "Root=1-00000001-000000000000000000000002;Parent=xyz;Sampled=1",
            "Root=1-00000001-000000000000000000000002;Sampled=yes",
            "Root=1-00000001-000000000000000000000002;garbage",
            "",
        ];
        for value in cases {
            assert_eq!(XRayPropagator.extract(&headers(value)), None, "{value:?}");
        }
    }

    #[test]
    fn extract_deferred_sampling() {
        let carrier = headers("Root=1-00000001-000000000000000000000002;Sampled=?");
        let context = XRayPropagator.extract(&carrier).expect("context");
        assert!(!context.sampled);
    }

    #[test]
    fn extract_ignores_unknown_keys() {
        let carrier = headers(
            "Self=1-67891234-12456789abcdef012345678;Root=1-00000001-000000000000000000000002;Lineage=a87bd80c:1|68fd508a:5;Sampled=1",
        );
        let context = XRayPropagator.extract(&carrier).expect("context");
        assert_eq!(context.trace_id, trace_id(2));
    }

    #[test]
    fn extract_last_occurrence_wins() {
        let carrier = headers(
            "Root=1-00000001-000000000000000000000002;Sampled=0;Root=1-00000001-000000000000000000000003;Sampled=1",
        );
        let context = XRayPropagator.extract(&carrier).expect("context");
        assert_eq!(context.trace_id, trace_id(3));
        assert!(context.sampled);
    }

    #[test]
    fn inject_without_parent() {
        let context = TraceContext {
            trace_id: trace_id(2),
            span_id: SpanId::INVALID,
            sampled: false,
        };
        let mut carrier: HashMap<String, String> = HashMap::new();
        XRayPropagator.inject(&context, &mut carrier);

        assert_eq!(
            Extractor::get(&carrier, AMAZON_TRACE_ID_HEADER),
            Some("Root=1-00000001-000000000000000000000002;Sampled=0")
        );
    }

    #[test]
    fn inject_with_parent() {
        let context = TraceContext {
            trace_id: trace_id(2),
            span_id: SpanId::from(0x53995c3f42cd8ad8u64),
            sampled: true,
        };
        let mut carrier: HashMap<String, String> = HashMap::new();
        XRayPropagator.inject(&context, &mut carrier);

        assert_eq!(
            Extractor::get(&carrier, AMAZON_TRACE_ID_HEADER),
            Some("Root=1-00000001-000000000000000000000002;Parent=53995c3f42cd8ad8;Sampled=1")
        );
    }

    proptest! {
        #[test]
        fn inject_then_extract_preserves_context(
            trace_bytes in any::<[u8; 16]>(),
            span_bytes in any::<[u8; 8]>(),
            sampled in any::<bool>(),
        ) {
            let context = TraceContext {
                trace_id: TraceId(trace_bytes),
                span_id: SpanId(span_bytes),
                sampled,
            };
            let mut carrier: HashMap<String, String> = HashMap::new();
            XRayPropagator.inject(&context, &mut carrier);

            prop_assert_eq!(XRayPropagator.extract(&carrier), Some(context));
        }
    }
}
