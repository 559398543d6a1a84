//! Edge decision metrics
//!
//! Lock-free counters and latency histograms, exported in Prometheus text
//! format on the server's metrics route.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::types::Outcome;

/// Atomic counter for thread-safe incrementing
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Simple histogram for latency tracking
#[derive(Debug)]
pub struct Histogram {
    /// Bucket boundaries in microseconds
    buckets: Vec<u64>,
    counts: Vec<AtomicU64>,
    /// Sum of all values in microseconds
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Buckets: 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
    pub fn new_latency() -> Self {
        let buckets = vec![
            5_000, 10_000, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000, 2_500_000,
            5_000_000, 10_000_000,
        ];
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();

        Self {
            buckets,
            counts,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a duration
    pub fn observe(&self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        self.sum.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        // Values past the last boundary only land in +Inf
        if let Some(i) = self.buckets.iter().position(|&boundary| micros <= boundary) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_ms(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum.load(Ordering::Relaxed) as f64 / count as f64 / 1000.0
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new_latency()
    }
}

/// All edge metrics
#[derive(Debug, Default)]
pub struct EdgeMetrics {
    pub requests_total: Counter,
    pub request_latency: Histogram,

    // Decision outcomes
    pub redirects_indexable: Counter,
    pub redirects_moved: Counter,
    pub passthroughs: Counter,
    pub passthroughs_annotated: Counter,
    pub passthroughs_index: Counter,

    // Failures
    pub probe_failures: Counter,
    pub mirror_failures: Counter,

    pub probe_latency: Histogram,
}

impl EdgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shareable metrics instance
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Count a composed response by the branch that produced it
    pub fn record_outcome(&self, outcome: Outcome) {
        match outcome {
            Outcome::Redirect => self.redirects_indexable.inc(),
            Outcome::MovedRedirect => self.redirects_moved.inc(),
            Outcome::Passthrough => self.passthroughs.inc(),
            Outcome::AnnotatedPassthrough => self.passthroughs_annotated.inc(),
            Outcome::IndexPassthrough => self.passthroughs_index.inc(),
        }
    }

    /// Export all metrics in Prometheus exposition format
    pub fn to_prometheus(&self) -> String {
        let mut out = String::with_capacity(2048);

        write_counter(&mut out, "edge_requests_total", "Total requests handled", self.requests_total.get());
        write_histogram(&mut out, "edge_request_latency_seconds", "End-to-end request latency in seconds", &self.request_latency);

        write_labeled_counter(
            &mut out,
            "edge_responses_total",
            "Responses by decision outcome",
            "outcome",
            &[
                (Outcome::Redirect.as_str(), self.redirects_indexable.get()),
                (Outcome::MovedRedirect.as_str(), self.redirects_moved.get()),
                (Outcome::Passthrough.as_str(), self.passthroughs.get()),
                (Outcome::AnnotatedPassthrough.as_str(), self.passthroughs_annotated.get()),
                (Outcome::IndexPassthrough.as_str(), self.passthroughs_index.get()),
            ],
        );

        write_counter(&mut out, "edge_probe_failures_total", "Canonical probes that failed and degraded to not indexable", self.probe_failures.get());
        write_counter(&mut out, "edge_mirror_failures_total", "Mirror fetches that failed", self.mirror_failures.get());
        write_histogram(&mut out, "edge_probe_latency_seconds", "Canonical probe latency in seconds", &self.probe_latency);

        out
    }
}

fn write_counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} counter", name);
    let _ = writeln!(out, "{} {}", name, value);
    let _ = writeln!(out);
}

fn write_labeled_counter(
    out: &mut String,
    name: &str,
    help: &str,
    label: &str,
    values: &[(&str, u64)],
) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} counter", name);
    for (label_value, value) in values {
        let _ = writeln!(out, "{}{{{}=\"{}\"}} {}", name, label, label_value, value);
    }
    let _ = writeln!(out);
}

fn write_histogram(out: &mut String, name: &str, help: &str, hist: &Histogram) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} histogram", name);

    // Buckets are cumulative
    let mut cumulative: u64 = 0;
    for (boundary, count) in hist.buckets.iter().zip(&hist.counts) {
        cumulative += count.load(Ordering::Relaxed);
        let le_seconds = *boundary as f64 / 1_000_000.0;
        let _ = writeln!(out, "{}_bucket{{le=\"{:.3}\"}} {}", name, le_seconds, cumulative);
    }
    let total_count = hist.count();
    let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, total_count);

    let sum_seconds = hist.sum.load(Ordering::Relaxed) as f64 / 1_000_000.0;
    let _ = writeln!(out, "{}_sum {:.6}", name, sum_seconds);
    let _ = writeln!(out, "{}_count {}", name, total_count);
    let _ = writeln!(out);
}

/// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Record to histogram and return elapsed
    pub fn record(self, histogram: &Histogram) -> Duration {
        let elapsed = self.start.elapsed();
        histogram.observe(elapsed);
        elapsed
    }
}
