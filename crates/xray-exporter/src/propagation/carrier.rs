// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Carrier traits for trace context propagation.
//!
//! Carriers abstract over the header sets the `X-Amzn-Trace-Id` header is read
//! from and written to. Implementations are provided for:
//! - **HashMap**: in-memory header sets and tests
//! - **serde_json::Value**: JSON encoded message attributes
//! - **reqwest::header::HeaderMap**: outbound HTTP requests
//!
//! All lookups are case-insensitive, matching HTTP header semantics
//! (`X-Amzn-Trace-Id` and `x-amzn-trace-id` name the same header).

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

/// Writes propagation headers into a carrier.
pub trait Injector {
    /// Sets `key` to `value`, replacing any previous value.
    fn set(&mut self, key: &str, value: String);
}

/// Reads propagation headers from a carrier.
pub trait Extractor {
    /// Gets the value for `key`, ignoring case.
    fn get(&self, key: &str) -> Option<&str>;

    /// Lists the keys present in the carrier.
    fn keys(&self) -> Vec<&str>;
}

/// Keys are stored lowercase.
impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

/// Keys set through [`Injector`] are found directly; keys inserted with other
/// casing are found by a scan.
impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase())
            .or_else(|| {
                self.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect::<Vec<_>>()
    }
}

/// Only `Value::Object` carries headers; other variants are left untouched.
impl Injector for Value {
    fn set(&mut self, key: &str, value: String) {
        if let Value::Object(map) = self {
            map.insert(key.to_lowercase(), Value::String(value));
        }
    }
}

impl Extractor for Value {
    fn get(&self, key: &str) -> Option<&str> {
        if let Value::Object(map) = self {
            map.get(&key.to_lowercase())
                .or_else(|| {
                    map.iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(key))
                        .map(|(_, v)| v)
                })
                .and_then(|v| v.as_str())
        } else {
            None
        }
    }

    fn keys(&self) -> Vec<&str> {
        if let Value::Object(map) = self {
            map.keys().map(String::as_str).collect::<Vec<_>>()
        } else {
            Vec::new()
        }
    }
}

/// Header names and values that are not valid HTTP are skipped.
impl Injector for HeaderMap {
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = HeaderName::from_bytes(key.to_lowercase().as_bytes()) else {
            debug!("Skipping invalid header name {key:?}");
            return;
        };
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                self.insert(name, value);
            }
            Err(e) => debug!("Skipping invalid value for header {key:?}: {e}"),
        }
    }
}

/// Only the first value of a repeated header is read. Values that are not
/// visible ASCII are treated as absent.
impl Extractor for HeaderMap {
    fn get(&self, key: &str) -> Option<&str> {
        HeaderMap::get(self, key.to_lowercase().as_str()).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        HeaderMap::keys(self).map(HeaderName::as_str).collect::<Vec<_>>()
    }
}
