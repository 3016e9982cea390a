use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Request and workflow counters for `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    pub reads: Arc<AtomicU64>,
    pub creates: Arc<AtomicU64>,
    pub updates: Arc<AtomicU64>,
    pub deletes: Arc<AtomicU64>,
    pub distributions_submitted: Arc<AtomicU64>,
    pub distribution_rows_upserted: Arc<AtomicU64>,
    pub validation_failures: Arc<AtomicU64>,
    pub persistence_failures: Arc<AtomicU64>,
    pub start_time: Instant,
}

/// What a handler did, for the per-kind request counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Create,
    Update,
    Delete,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            reads: Arc::new(AtomicU64::new(0)),
            creates: Arc::new(AtomicU64::new(0)),
            updates: Arc::new(AtomicU64::new(0)),
            deletes: Arc::new(AtomicU64::new(0)),
            distributions_submitted: Arc::new(AtomicU64::new(0)),
            distribution_rows_upserted: Arc::new(AtomicU64::new(0)),
            validation_failures: Arc::new(AtomicU64::new(0)),
            persistence_failures: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_request(&self, kind: RequestKind) {
        let counter = match kind {
            RequestKind::Read => &self.reads,
            RequestKind::Create => &self.creates,
            RequestKind::Update => &self.updates,
            RequestKind::Delete => &self.deletes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_distribution(&self, rows: usize) {
        self.distributions_submitted.fetch_add(1, Ordering::Relaxed);
        self.distribution_rows_upserted.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn inc_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_persistence_failures(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            distributions_submitted: self.distributions_submitted.load(Ordering::Relaxed),
            distribution_rows_upserted: self.distribution_rows_upserted.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub distributions_submitted: u64,
    pub distribution_rows_upserted: u64,
    pub validation_failures: u64,
    pub persistence_failures: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// Prometheus text exposition (format 0.0.4).
    pub fn to_prometheus(&self) -> String {
        let counters: [(&str, &str, u64); 8] = [
            ("requests_read", "Read requests served", self.reads),
            ("requests_create", "Create requests served", self.creates),
            ("requests_update", "Update requests served", self.updates),
            ("requests_delete", "Delete requests served", self.deletes),
            ("distributions_submitted", "Distribution batches committed", self.distributions_submitted),
            ("distribution_rows_upserted", "Distribution rows upserted", self.distribution_rows_upserted),
            ("validation_failures", "Payloads rejected by validation", self.validation_failures),
            ("persistence_failures", "Writes that failed in the database", self.persistence_failures),
        ];
        let mut out = String::new();
        for (name, help, value) in counters {
            out.push_str(&format!(
                "# HELP schoolhouse_{name} {help}\n# TYPE schoolhouse_{name} counter\nschoolhouse_{name} {value}\n"
            ));
        }
        out.push_str(&format!(
            "# HELP schoolhouse_uptime_seconds Uptime seconds\n# TYPE schoolhouse_uptime_seconds gauge\nschoolhouse_uptime_seconds {}\n",
            self.uptime_seconds
        ));
        out
    }
}
