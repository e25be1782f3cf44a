//! Observability for dump analysis runs
//!
//! - Structured JSON logging, one event per line
//! - Typed lifecycle events
//! - Begin/complete scopes around each dump file
//! - Decode counters
//!
//! Observability is read-only: nothing here influences decoding or the
//! consistency verdict.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{DumpMetrics, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
