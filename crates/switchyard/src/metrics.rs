//! Messaging metrics for observability.
//!
//! Uses the global OpenTelemetry meter provider, which must be installed by the
//! host process. Without one every instrument is a no-op.
//!
//! Instruments are built once and cached since the sink counters sit on the
//! publish path.

use std::sync::OnceLock;

use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;

use crate::types::ServiceType;

static METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    METER.get_or_init(|| opentelemetry::global::meter("switchyard"))
}

// ============================================================================
// Counters (Cumulative)
// ============================================================================

/// Counter for publish retries caused by a full queue or transport buffer.
pub fn sink_back_pressure() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        meter()
            .u64_counter("switchyard.sink.back_pressure")
            .with_description("Publish retries caused by back-pressure")
            .with_unit("retry")
            .build()
    })
}

/// Counter for publishes that returned a non-OK result.
pub fn sink_publish_failures() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        meter()
            .u64_counter("switchyard.sink.publish_failures")
            .with_description("Publishes that did not deliver the message")
            .with_unit("message")
            .build()
    })
}

/// Counter for directory registrations and deactivations.
pub fn directory_mutations() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        meter()
            .u64_counter("switchyard.directory.mutations")
            .with_description("Directory registrations and deactivations")
            .with_unit("mutation")
            .build()
    })
}

// ============================================================================
// Gauges (Current State)
// ============================================================================

/// Gauge for live (non-placeholder) directory slots.
pub fn directory_registered() -> &'static Gauge<i64> {
    static GAUGE: OnceLock<Gauge<i64>> = OnceLock::new();
    GAUGE.get_or_init(|| {
        meter()
            .i64_gauge("switchyard.directory.registered")
            .with_description("Directory slots backed by a live sink")
            .with_unit("sink")
            .build()
    })
}

// ============================================================================
// Metric Recording Helpers
// ============================================================================

/// Record back-pressure retries observed during one publish.
pub fn record_back_pressure(retries: u64, transport: &'static str) {
    if retries > 0 {
        sink_back_pressure().add(retries, &[KeyValue::new("transport", transport)]);
    }
}

/// Record a publish that did not deliver.
pub fn record_publish_failure(transport: &'static str, result: &'static str) {
    sink_publish_failures().add(
        1,
        &[
            KeyValue::new("transport", transport),
            KeyValue::new("result", result),
        ],
    );
}

/// Record a directory mutation.
pub fn record_directory_mutation(operation: &'static str, service_type: ServiceType) {
    directory_mutations().add(
        1,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("service_type", service_type.as_str()),
        ],
    );
}

/// Update the registered sink gauge for one directory.
pub fn record_registered_count(count: i64, directory_id: u64) {
    directory_registered().record(count, &[KeyValue::new("directory", directory_id as i64)]);
}
