// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for building spans and reading segment documents

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc::UnboundedReceiver;
use xray_exporter::{
    context::{SpanId, TraceId},
    segment::Segment,
    span::SpanRecord,
};

pub const TRACE_ID: TraceId = TraceId([
    0x57, 0x59, 0xe9, 0x88, 0xbd, 0x86, 0x2e, 0x3f, 0xe1, 0xbe, 0x46, 0xa9, 0x94, 0x27, 0x27, 0x93,
]);

/// A finished span with no attributes
pub fn finished_span(name: &str) -> SpanRecord {
    let start = SystemTime::now();
    SpanRecord::new(name, TRACE_ID, SpanId::from(0x5399_5c3f_42cd_8ad8u64), start)
        .with_end_time(start + Duration::from_millis(30))
}

/// The span an HTTP server framework produces for `GET www.example.com/index`
pub fn http_server_span() -> SpanRecord {
    finished_span("/index")
        .with_attribute("http.host", "www.example.com")
        .with_attribute("http.method", "GET")
        .with_attribute("http.user_agent", "blah-agent")
        .with_attribute("http.path", "/index")
}

#[allow(dead_code)]
pub fn parse_segment(document: &str) -> Segment {
    serde_json::from_str(document).expect("document should be a segment")
}

/// Waits for the next submitted batch
#[allow(dead_code)]
pub async fn next_batch(rx: &mut UnboundedReceiver<Vec<String>>) -> Vec<String> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a batch")
        .expect("api dropped")
}
