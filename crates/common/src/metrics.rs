//! Metrics collection for campus-access.
//!
//! Counters for access decisions, registration outcomes and the health of the
//! audit trail. Everything is a relaxed atomic; there is no other shared state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Initialize global metrics with custom instance.
pub fn init_metrics(metrics: Arc<Metrics>) -> Result<(), Arc<Metrics>> {
    METRICS.set(metrics)
}

/// Application metrics collector.
#[derive(Debug)]
pub struct Metrics {
    // === Request Metrics ===
    /// Total HTTP requests received
    pub http_requests_total: AtomicU64,
    /// Active HTTP requests
    pub http_requests_active: AtomicU64,
    /// HTTP requests by status code category (2xx, 4xx, 5xx)
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    /// Total request latency in microseconds
    pub http_request_latency_us_total: AtomicU64,
    /// Request count for average calculation
    pub http_request_latency_count: AtomicU64,

    // === Access Decisions ===
    /// Access evaluations performed
    pub evaluations_total: AtomicU64,
    /// Evaluations that granted access
    pub access_granted: AtomicU64,
    /// Evaluations that denied access
    pub access_denied: AtomicU64,

    // === Registration ===
    /// Registrations created
    pub registrations_created: AtomicU64,
    /// Registrations refused by policy
    pub registrations_denied: AtomicU64,
    /// Registrations refused as duplicates
    pub registrations_conflicted: AtomicU64,
    /// Registrations aborted by datastore errors or timeouts
    pub registrations_failed: AtomicU64,

    // === Datastore ===
    /// Reads retried after a datastore error
    pub db_read_retries: AtomicU64,
    /// Datastore errors surfaced to callers
    pub db_errors_total: AtomicU64,

    // === Audit ===
    /// Audit entries written
    pub audit_entries_written: AtomicU64,
    /// Audit entries that could not be written
    pub audit_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_active: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_latency_us_total: AtomicU64::new(0),
            http_request_latency_count: AtomicU64::new(0),

            evaluations_total: AtomicU64::new(0),
            access_granted: AtomicU64::new(0),
            access_denied: AtomicU64::new(0),

            registrations_created: AtomicU64::new(0),
            registrations_denied: AtomicU64::new(0),
            registrations_conflicted: AtomicU64::new(0),
            registrations_failed: AtomicU64::new(0),

            db_read_retries: AtomicU64::new(0),
            db_errors_total: AtomicU64::new(0),

            audit_entries_written: AtomicU64::new(0),
            audit_failures: AtomicU64::new(0),
        }
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, status_code: u16, latency: Duration) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);

        match status_code {
            200..=299 => self.http_requests_2xx.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.http_requests_4xx.fetch_add(1, Ordering::Relaxed),
            500..=599 => self.http_requests_5xx.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };

        self.http_request_latency_us_total
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.http_request_latency_count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Start tracking an active request.
    pub fn start_request(&self) {
        self.http_requests_active.fetch_add(1, Ordering::Relaxed);
    }

    /// End tracking an active request.
    pub fn end_request(&self) {
        self.http_requests_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record the outcome of an access evaluation.
    pub fn record_evaluation(&self, granted: bool) {
        self.evaluations_total.fetch_add(1, Ordering::Relaxed);
        if granted {
            self.access_granted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.access_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a registration that was inserted.
    pub fn record_registration_created(&self) {
        self.registrations_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a registration refused by policy.
    pub fn record_registration_denied(&self) {
        self.registrations_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a duplicate registration attempt.
    pub fn record_registration_conflict(&self) {
        self.registrations_conflicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a registration aborted by an error or timeout.
    pub fn record_registration_failed(&self) {
        self.registrations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read that is being retried.
    pub fn record_read_retry(&self) {
        self.db_read_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a datastore error returned to a caller.
    pub fn record_db_error(&self) {
        self.db_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an audit write attempt.
    pub fn record_audit_write(&self, success: bool) {
        if success {
            self.audit_entries_written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.audit_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http_requests_total: self.http_requests_total.load(Ordering::Relaxed),
            http_requests_active: self.http_requests_active.load(Ordering::Relaxed),
            http_requests_2xx: self.http_requests_2xx.load(Ordering::Relaxed),
            http_requests_4xx: self.http_requests_4xx.load(Ordering::Relaxed),
            http_requests_5xx: self.http_requests_5xx.load(Ordering::Relaxed),
            http_request_latency_avg_us: self.average_latency_us(),

            evaluations_total: self.evaluations_total.load(Ordering::Relaxed),
            access_granted: self.access_granted.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            grant_rate: self.grant_rate(),

            registrations_created: self.registrations_created.load(Ordering::Relaxed),
            registrations_denied: self.registrations_denied.load(Ordering::Relaxed),
            registrations_conflicted: self.registrations_conflicted.load(Ordering::Relaxed),
            registrations_failed: self.registrations_failed.load(Ordering::Relaxed),

            db_read_retries: self.db_read_retries.load(Ordering::Relaxed),
            db_errors_total: self.db_errors_total.load(Ordering::Relaxed),

            audit_entries_written: self.audit_entries_written.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
        }
    }

    /// Calculate average HTTP request latency.
    fn average_latency_us(&self) -> u64 {
        let total = self.http_request_latency_us_total.load(Ordering::Relaxed);
        let count = self.http_request_latency_count.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Share of evaluations that granted access.
    fn grant_rate(&self) -> f64 {
        let granted = self.access_granted.load(Ordering::Relaxed);
        let total = self.evaluations_total.load(Ordering::Relaxed);
        if total > 0 {
            granted as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut output = String::new();

        push_metric(&mut output, "http_requests_total", "counter", "Total HTTP requests", s.http_requests_total);
        push_metric(&mut output, "http_requests_active", "gauge", "Active HTTP requests", s.http_requests_active);

        output.push_str("# HELP campus_http_requests_by_status HTTP requests by status\n");
        output.push_str("# TYPE campus_http_requests_by_status counter\n");
        output.push_str(&format!(
            "campus_http_requests_by_status{{status=\"2xx\"}} {}\n",
            s.http_requests_2xx
        ));
        output.push_str(&format!(
            "campus_http_requests_by_status{{status=\"4xx\"}} {}\n",
            s.http_requests_4xx
        ));
        output.push_str(&format!(
            "campus_http_requests_by_status{{status=\"5xx\"}} {}\n",
            s.http_requests_5xx
        ));

        push_metric(&mut output, "http_request_latency_avg_us", "gauge", "Average request latency", s.http_request_latency_avg_us);

        output.push_str("# HELP campus_access_evaluations Access evaluations by outcome\n");
        output.push_str("# TYPE campus_access_evaluations counter\n");
        output.push_str(&format!(
            "campus_access_evaluations{{outcome=\"granted\"}} {}\n",
            s.access_granted
        ));
        output.push_str(&format!(
            "campus_access_evaluations{{outcome=\"denied\"}} {}\n",
            s.access_denied
        ));

        output.push_str("# HELP campus_registrations Registration attempts by outcome\n");
        output.push_str("# TYPE campus_registrations counter\n");
        for (outcome, value) in [
            ("created", s.registrations_created),
            ("denied", s.registrations_denied),
            ("conflict", s.registrations_conflicted),
            ("failed", s.registrations_failed),
        ] {
            output.push_str(&format!(
                "campus_registrations{{outcome=\"{outcome}\"}} {value}\n"
            ));
        }

        push_metric(&mut output, "db_read_retries", "counter", "Datastore reads retried", s.db_read_retries);
        push_metric(&mut output, "db_errors_total", "counter", "Datastore errors surfaced", s.db_errors_total);
        push_metric(&mut output, "audit_entries_written", "counter", "Audit entries written", s.audit_entries_written);
        push_metric(&mut output, "audit_failures", "counter", "Audit entries lost", s.audit_failures);

        output
    }
}

fn push_metric(output: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    output.push_str(&format!("# HELP campus_{name} {help}\n"));
    output.push_str(&format!("# TYPE campus_{name} {kind}\n"));
    output.push_str(&format!("campus_{name} {value}\n"));
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    // HTTP
    pub http_requests_total: u64,
    pub http_requests_active: u64,
    pub http_requests_2xx: u64,
    pub http_requests_4xx: u64,
    pub http_requests_5xx: u64,
    pub http_request_latency_avg_us: u64,

    // Access
    pub evaluations_total: u64,
    pub access_granted: u64,
    pub access_denied: u64,
    pub grant_rate: f64,

    // Registration
    pub registrations_created: u64,
    pub registrations_denied: u64,
    pub registrations_conflicted: u64,
    pub registrations_failed: u64,

    // Datastore
    pub db_read_retries: u64,
    pub db_errors_total: u64,

    // Audit
    pub audit_entries_written: u64,
    pub audit_failures: u64,
}

/// Timer guard for measuring operation duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
