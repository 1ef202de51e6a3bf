// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion between 16-byte trace ids and X-Ray trace ids.
//!
//! An X-Ray trace id has three hyphen separated parts:
//!
//! ```text
//! 1-5759e988-bd862e3fe1be46a994272793
//! │ │        └ 96-bit random part (24 hex)
//! │ └ epoch seconds (8 hex)
//! └ version
//! ```
//!
//! The first four bytes of a [`TraceId`] map to the epoch part and the remaining
//! twelve to the random part, so the conversion is lossless in both directions.

use lazy_static::lazy_static;
use regex::Regex;

use crate::context::TraceId;
use crate::errors::MalformedTraceId;

/// Only X-Ray trace id version currently defined.
pub const TRACE_ID_VERSION: &str = "1";

const EPOCH_HEX_LEN: usize = 8;
const RANDOM_HEX_LEN: usize = 24;

/// Length of a fully padded X-Ray trace id, e.g. `1-5759e988-bd862e3fe1be46a994272793`.
pub const AMAZON_TRACE_ID_LEN: usize = 1 + 1 + EPOCH_HEX_LEN + 1 + RANDOM_HEX_LEN;

lazy_static! {
    /// Version, 8 hex digit epoch and up to 24 hex digit random part.
    ///
    /// Some emitters drop leading zeros of the random part, so shorter random
    /// parts are accepted and padded on parse.
    static ref AMAZON_TRACE_ID_REGEX: Regex =
        Regex::new(r"^1-([0-9a-fA-F]{8})-([0-9a-fA-F]{1,24})$").expect("failed creating regex");
}

/// Formats a trace id as an X-Ray trace id.
///
/// # Example
///
/// ```
/// use xray_exporter::{context::TraceId, trace_id::to_amazon_trace_id};
///
/// let trace_id = TraceId([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
/// assert_eq!(to_amazon_trace_id(&trace_id), "1-01020304-05060708090a0b0c0d0e0f10");
/// ```
#[must_use]
pub fn to_amazon_trace_id(trace_id: &TraceId) -> String {
    let (epoch, random) = trace_id.0.split_at(4);
    format!(
        "{TRACE_ID_VERSION}-{}-{}",
        hex::encode(epoch),
        hex::encode(random)
    )
}

/// Parses an X-Ray trace id back into a trace id.
///
/// # Errors
///
/// Returns [`MalformedTraceId`] when the value does not have three segments, the
/// version is not `1`, or a segment has the wrong length or non-hex characters.
pub fn parse_amazon_trace_id(value: &str) -> Result<TraceId, MalformedTraceId> {
    let segments = value.split('-').collect::<Vec<_>>();
    if segments.len() != 3 {
        return Err(MalformedTraceId::new(
            value,
            "expected 3 hyphen separated segments",
        ));
    }
    if segments[0] != TRACE_ID_VERSION {
        return Err(MalformedTraceId::new(value, "unsupported version"));
    }

    let Some(captures) = AMAZON_TRACE_ID_REGEX.captures(value) else {
        return Err(MalformedTraceId::new(
            value,
            "segment length or encoding is invalid",
        ));
    };

    let epoch = &captures[1];
    let random = format!("{:0>width$}", &captures[2], width = RANDOM_HEX_LEN);

    let mut bytes = [0u8; 16];
    hex::decode_to_slice(epoch, &mut bytes[..4])
        .map_err(|_| MalformedTraceId::new(value, "epoch is not hex"))?;
    hex::decode_to_slice(random, &mut bytes[4..])
        .map_err(|_| MalformedTraceId::new(value, "random part is not hex"))?;

    Ok(TraceId(bytes))
}
