// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Exporter configuration.
//!
//! Values come from, in increasing priority:
//! 1. **Defaults** (`Config::default()`)
//! 2. **Environment variables** (`Config::from_env()`)
//! 3. **Struct update syntax** by the caller, e.g. `Config { buffer_size: 1, ..Config::from_env() }`
//!
//! Environment values that fail to parse are ignored and the default is kept.
//!
//! | Variable | Field |
//! |---|---|
//! | `XRAY_EXPORTER_BUFFER_SIZE` | `buffer_size` |
//! | `XRAY_EXPORTER_BATCH_SIZE` | `batch_size` |
//! | `XRAY_EXPORTER_FLUSH_INTERVAL_MS` | `flush_interval` |
//! | `XRAY_EXPORTER_ORIGIN` | `origin` |
//! | `XRAY_EXPORTER_VERSION` | `version` |
//! | `XRAY_EXPORTER_BLACKLIST` | `blacklist` (comma separated regexes) |
//! | `AWS_XRAY_DAEMON_ADDRESS` | `daemon_address` |
//! | `XRAY_EXPORTER_TIMEOUT_MS` | `request_timeout` |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::errors::ConfigError;
use crate::segment::SegmentOptions;

/// Most documents a single `PutTraceSegments` call accepts.
pub const MAX_BATCH_SIZE: usize = 50;

pub const DEFAULT_BUFFER_SIZE: usize = 1_000;
pub const DEFAULT_BATCH_SIZE: usize = MAX_BATCH_SIZE;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DAEMON_ADDRESS: &str = "127.0.0.1:2000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// `origin` values understood by X-Ray.
pub const ORIGIN_EC2: &str = "AWS::EC2::Instance";
pub const ORIGIN_ECS: &str = "AWS::ECS::Container";
pub const ORIGIN_ELASTIC_BEANSTALK: &str = "AWS::ElasticBeanstalk::Environment";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the segment buffer. Segments ending while it is full are dropped.
    pub buffer_size: usize,
    /// Most segments submitted in one call, also the size that triggers an early flush.
    pub batch_size: usize,
    /// How often buffered segments are flushed.
    pub flush_interval: Duration,
    /// AWS resource type reported on every segment.
    pub origin: Option<String>,
    /// Application version reported on every segment.
    pub version: Option<String>,
    /// Span names matching any of these patterns are not exported.
    pub blacklist: Vec<String>,
    /// X-Ray daemon `host:port`.
    pub daemon_address: String,
    /// Timeout of a single HTTP submission.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buffer_size: DEFAULT_BUFFER_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            origin: None,
            version: None,
            blacklist: Vec::new(),
            daemon_address: DEFAULT_DAEMON_ADDRESS.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    /// Defaults overridden by the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            buffer_size: parse_env("XRAY_EXPORTER_BUFFER_SIZE").unwrap_or(defaults.buffer_size),
            batch_size: parse_env("XRAY_EXPORTER_BATCH_SIZE").unwrap_or(defaults.batch_size),
            flush_interval: parse_env("XRAY_EXPORTER_FLUSH_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_interval),
            origin: string_env("XRAY_EXPORTER_ORIGIN"),
            version: string_env("XRAY_EXPORTER_VERSION"),
            blacklist: string_env("XRAY_EXPORTER_BLACKLIST")
                .map(|patterns| {
                    patterns
                        .split(',')
                        .map(str::trim)
                        .filter(|pattern| !pattern.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            daemon_address: string_env("AWS_XRAY_DAEMON_ADDRESS")
                .unwrap_or(defaults.daemon_address),
            request_timeout: parse_env("XRAY_EXPORTER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Checks sizes and intervals and compiles the blacklist.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSize {
                got: self.batch_size,
                max: MAX_BATCH_SIZE,
            });
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        self.blacklist_patterns().map(|_| ())
    }

    /// Compiled blacklist patterns.
    ///
    /// # Errors
    ///
    /// Fails on the first pattern that is not a valid regex.
    pub fn blacklist_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.blacklist
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Blacklist {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            origin: self.origin.clone(),
            version: self.version.clone(),
        }
    }
}

fn string_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let value = string_env(key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            debug!("Ignoring invalid value {value:?} for {key}");
            None
        }
    }
}
