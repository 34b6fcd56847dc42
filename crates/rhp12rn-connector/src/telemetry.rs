//! Metric declarations.
//!
//! The connector records through the `metrics` facade; installing a recorder
//! is up to the application.

use metrics::{describe_counter, describe_histogram, Unit};

/// Kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing counter.
    Counter,
    /// Distribution of samples.
    Histogram,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name.
    pub name: &'static str,
    /// Counter or histogram.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement.
    pub unit: Unit,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind, unit: Unit) -> Self {
        Metric {
            name,
            kind,
            description: "",
            unit,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Metric::new(name, MetricKind::Counter, Unit::Count)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str, unit: Unit) -> Self {
        Metric::new(name, MetricKind::Histogram, unit)
    }

    /// Set the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// Metric definitions.
pub mod metric_defs {
    use super::Metric;
    use metrics::Unit;

    /// Requests put on the wire.
    pub const REQUESTS_SENT: Metric = Metric::counter("rhp12rn.requests.sent")
        .with_description("Requests transmitted to the device")
        .with_labels(&["kind"]);

    /// Transmissions that failed.
    pub const SEND_FAILURES: Metric = Metric::counter("rhp12rn.requests.send_failures")
        .with_description("Transmissions rejected by the transport")
        .with_labels(&["kind"]);

    /// Responses drained from the queue.
    pub const RESPONSES_DRAINED: Metric = Metric::counter("rhp12rn.responses.drained")
        .with_description("Pending responses read back, by outcome")
        .with_labels(&["outcome"]);

    /// Requests abandoned by a disconnect.
    pub const REQUESTS_ABANDONED: Metric = Metric::counter("rhp12rn.requests.abandoned")
        .with_description("Requests still on the wire when the connection closed");

    /// Time spent waiting for the inter-transmission interval.
    pub const PACING_WAIT: Metric = Metric::histogram("rhp12rn.pacing.wait", Unit::Seconds)
        .with_description("Time blocked before a transmission to honour the minimum spacing");

    /// Bulk status reads.
    pub const BULK_READS: Metric = Metric::counter("rhp12rn.bulk.reads")
        .with_description("Group reads performed")
        .with_labels(&["outcome"]);

    /// Every metric defined by the connector.
    pub const ALL: &[Metric] = &[
        REQUESTS_SENT,
        SEND_FAILURES,
        RESPONSES_DRAINED,
        REQUESTS_ABANDONED,
        PACING_WAIT,
        BULK_READS,
    ];
}

/// Describe every connector metric. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_unique() {
        let names: HashSet<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(metric_defs::ALL.iter().all(|m| m.name.starts_with("rhp12rn.")));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
