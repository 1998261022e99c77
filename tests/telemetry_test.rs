//! Integration tests for telemetry initialization and span helpers.

use envtree_rs::telemetry::{TelemetryConfig, init_telemetry, resolve};

#[test]
fn telemetry_initializes() {
    // Note: tracing subscriber can only be set once per process.
    // Using try_init() in the implementation avoids panics if another
    // test already initialized a subscriber.
    let config = TelemetryConfig {
        level: "debug".to_string(),
        compact: true,
    };
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    let _ = init_telemetry(config);
}

#[test]
fn second_init_reports_error() {
    let _ = init_telemetry(TelemetryConfig::default());
    assert!(init_telemetry(TelemetryConfig::default()).is_err());
}

#[test]
fn resolve_span_records_outcome() {
    let span = resolve::start_resolve_span("Redis", "REDIS_");
    resolve::record_outcome(&span, 2, 1);
}
