use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::record::RecordStore;

/// Duration aggregate for a set of request samples, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
}

impl DurationStats {
    /// Aggregate raw millisecond samples. Returns `None` for an empty set rather than
    /// fabricating zeroes, so absent metrics can be omitted from reports.
    pub fn from_samples_ms(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("duration samples are finite"));

        let count = sorted.len() as u64;
        let sum: f64 = sorted.iter().sum();

        Some(Self {
            count,
            avg_ms: sum / count as f64,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p90_ms: percentile(&sorted, 90.0),
            p95_ms: percentile(&sorted, 95.0),
        })
    }

    /// The precomputed percentile for `p`, if the aggregator tracks it.
    pub fn percentile_ms(&self, p: f64) -> Option<f64> {
        if p == 90.0 {
            Some(self.p90_ms)
        } else if p == 95.0 {
            Some(self.p95_ms)
        } else {
            None
        }
    }
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Pass/fail rate aggregate. `rate` is the failed fraction, 0.0 when no samples were recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub passes: u64,
    pub fails: u64,
    pub rate: f64,
}

impl RateStats {
    pub fn new(passes: u64, fails: u64) -> Self {
        let total = passes + fails;
        let rate = if total == 0 {
            0.0
        } else {
            fails as f64 / total as f64
        };
        Self { passes, fails, rate }
    }

    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub count: u64,
    pub rate_per_s: f64,
}

/// Read-only aggregate of a finished run. Everything the report artifacts and threshold
/// evaluation need, and nothing that can be appended to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub run_id: String,
    pub scenario_name: String,
    pub test_type: String,
    pub base_url: String,
    pub started_at: String,
    pub run_duration_s: f64,
    pub iterations: u64,
    pub http_reqs: Throughput,
    /// Duration aggregate across every endpoint. Absent when no request got a response.
    pub http_req_duration: Option<DurationStats>,
    /// Duration aggregates keyed by endpoint tag.
    pub endpoints: BTreeMap<String, DurationStats>,
    /// Request-level failures (timeouts, connection errors) as a fraction of all requests.
    pub http_req_failed: RateStats,
    /// Individual check assertions, failed fraction.
    pub checks: RateStats,
    /// The custom error-rate metric, one sample per check group.
    pub errors: RateStats,
}

pub(crate) struct SnapshotMeta {
    pub(crate) run_id: String,
    pub(crate) scenario_name: String,
    pub(crate) test_type: String,
    pub(crate) base_url: String,
    pub(crate) started_at: String,
}

impl MetricsSnapshot {
    pub(crate) fn build(meta: SnapshotMeta, store: &RecordStore, elapsed: Duration) -> Self {
        let run_duration_s = elapsed.as_secs_f64();

        let request_count = store.requests.len() as u64;
        let rate_per_s = if run_duration_s > 0.0 {
            request_count as f64 / run_duration_s
        } else {
            0.0
        };

        let mut all_durations = Vec::with_capacity(store.requests.len());
        let mut per_endpoint: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut transport_failures = 0u64;
        for record in &store.requests {
            if record.is_transport_failure() {
                transport_failures += 1;
            }
            if record.responded() {
                let ms = record.duration_ms();
                all_durations.push(ms);
                per_endpoint.entry(record.endpoint().to_string()).or_default().push(ms);
            }
        }

        let endpoints = per_endpoint
            .into_iter()
            .filter_map(|(endpoint, samples)| {
                DurationStats::from_samples_ms(&samples).map(|stats| (endpoint, stats))
            })
            .collect();

        let check_fails = store.checks.iter().filter(|c| !c.passed).count() as u64;
        let group_fails = store.error_groups.iter().filter(|g| g.failed).count() as u64;

        Self {
            run_id: meta.run_id,
            scenario_name: meta.scenario_name,
            test_type: meta.test_type,
            base_url: meta.base_url,
            started_at: meta.started_at,
            run_duration_s,
            iterations: store.iterations,
            http_reqs: Throughput {
                count: request_count,
                rate_per_s,
            },
            http_req_duration: DurationStats::from_samples_ms(&all_durations),
            endpoints,
            http_req_failed: RateStats::new(request_count - transport_failures, transport_failures),
            checks: RateStats::new(store.checks.len() as u64 - check_fails, check_fails),
            errors: RateStats::new(store.error_groups.len() as u64 - group_fails, group_fails),
        }
    }

    /// Look up a metric by the name used in threshold expressions.
    pub(crate) fn metric(&self, name: &str) -> Option<MetricView<'_>> {
        match name {
            "http_req_duration" => self.http_req_duration.as_ref().map(MetricView::Duration),
            "http_req_failed" => Some(MetricView::Rate(&self.http_req_failed)),
            "checks" => Some(MetricView::Rate(&self.checks)),
            "errors" => Some(MetricView::Rate(&self.errors)),
            _ => None,
        }
    }
}

pub(crate) enum MetricView<'a> {
    Duration(&'a DurationStats),
    Rate(&'a RateStats),
}
