// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log formatting for the exporter.
//!
//! Every line is prefixed with `XRAY_EXPORTER` so exporter diagnostics can be
//! told apart from the host application's own logs:
//!
//! ```text
//! XRAY_EXPORTER | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```
//!
//! Applications that already install a subscriber keep it; the exporter only logs
//! through `tracing` macros. [`init`] is for hosts that have none.

use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::errors::LoggerError;

/// Prefix of every log line.
pub const LOG_PREFIX: &str = "XRAY_EXPORTER";

/// Formats events as `XRAY_EXPORTER | LEVEL | scope: message fields`.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "{LOG_PREFIX} | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                // Filled in by the fmt layer when the span was created.
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Builds the directive string for `level`, silencing the HTTP stack's own logs.
fn env_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    let directives = format!("h2=off,hyper=off,rustls=off,reqwest=off,{level}");
    Ok(EnvFilter::try_new(directives)?)
}

/// Installs a global subscriber writing exporter logs to stdout at `level`
/// (`error`, `warn`, `info`, `debug`, `trace`, or full filter directives).
///
/// # Errors
///
/// Fails when `level` is not a valid filter or a global subscriber already exists.
pub fn init(level: &str) -> Result<(), LoggerError> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter(level)?)
        .event_format(Formatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("Logging subsystem enabled");
    Ok(())
}
