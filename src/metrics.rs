//! Metric helpers for `bodyfield`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking body drains started.
pub const DRAINS_TOTAL: &str = "bodyfield_drains_total";
/// Name of the counter tracking body drains that ended in a structural error.
pub const DRAIN_FAILURES_TOTAL: &str = "bodyfield_drain_failures_total";
/// Name of the counter tracking drain buffer growths.
pub const BUFFER_GROWTHS_TOTAL: &str = "bodyfield_buffer_growths_total";
/// Name of the counter tracking top-level properties captured.
pub const FIELDS_CAPTURED_TOTAL: &str = "bodyfield_fields_captured_total";

/// Record the start of a body drain.
pub fn inc_drains() {
    #[cfg(feature = "metrics")]
    counter!(DRAINS_TOTAL).increment(1);
}

/// Record a failed body drain.
pub fn inc_drain_failures() {
    #[cfg(feature = "metrics")]
    counter!(DRAIN_FAILURES_TOTAL).increment(1);
}

/// Record one doubling of the drain buffer.
pub fn inc_buffer_growths() {
    #[cfg(feature = "metrics")]
    counter!(BUFFER_GROWTHS_TOTAL).increment(1);
}

/// Record `count` captured properties.
pub fn add_fields_captured(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(FIELDS_CAPTURED_TOTAL).increment(u64::try_from(count).unwrap_or(u64::MAX));
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}
