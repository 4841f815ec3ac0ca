/*!
 * Shutdown Tracing
 * Structured tracing for termination runs using the tracing crate
 *
 * Features:
 * - Trace ID per termination run for log correlation
 * - JSON-formatted logs for structured parsing
 * - Duration and outcome recorded when the run finishes
 */

use crate::core::limits::ENV_TRACE_JSON;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SHUTDOWN_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling this more than once is harmless; only the first subscriber sticks.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        let installed = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok();
        if installed {
            info!("Structured tracing initialized with JSON output");
        }
    } else {
        let installed = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok();
        if installed {
            info!("Structured tracing initialized");
        }
    }
}

/// Generate a unique trace ID for run correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one termination run
///
/// Created by the controller when it enters the hook sequence; the duration
/// and outcome are emitted when the span is dropped.
pub struct ShutdownSpan {
    span: tracing::Span,
    start: Instant,
    entry: &'static str,
    trace_id: String,
}

impl ShutdownSpan {
    pub fn new(entry: &'static str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::INFO,
            "shutdown",
            trace_id = %trace_id,
            entry = entry,
            status = tracing::field::Empty,
            slots_run = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        span.in_scope(|| debug!(entry, trace_id = %trace_id, "shutdown run started"));

        Self {
            span,
            start: Instant::now(),
            entry,
            trace_id,
        }
    }

    /// Get the trace ID for this run
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_status(&self, status: i32) {
        self.span.record("status", status);
    }

    pub fn record_slots_run(&self, count: usize) {
        self.span.record("slots_run", count);
    }

    /// Record the run result
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    /// Record an error
    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ShutdownSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_ms", saturating_u64(duration.as_millis()));

        // Hung user hooks show up here
        if duration.as_secs() >= 5 {
            warn!(
                trace_id = %self.trace_id,
                entry = self.entry,
                duration_ms = saturating_u64(duration.as_millis()),
                slow = true,
                "slow shutdown run"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                entry = self.entry,
                duration_us = saturating_u64(duration.as_micros()),
                "shutdown run completed"
            );
        }
    }
}

#[inline]
fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
