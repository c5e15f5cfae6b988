mod aggregate;
mod record;
mod report;
mod threshold;

use std::time::Instant;

use parking_lot::Mutex;

use crate::aggregate::SnapshotMeta;
use crate::record::{ErrorGroupSample, RecordStore};

pub use aggregate::{DurationStats, MetricsSnapshot, RateStats, Throughput};
pub use record::{CheckSample, RequestRecord};
pub use report::{render_html, render_json, RunReport};
pub use threshold::{Threshold, ThresholdOutcome, ThresholdResult, ThresholdSet};

/// Configuration for the reporter, built once before the run starts.
#[derive(Debug)]
pub struct ReportConfig {
    run_id: String,
    scenario_name: String,
    test_type: String,
    base_url: String,
    thresholds: ThresholdSet,
    scenario_notes: Vec<String>,
    summary_table: bool,
}

impl ReportConfig {
    pub fn new(run_id: impl Into<String>, scenario_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            scenario_name: scenario_name.into(),
            test_type: String::new(),
            base_url: String::new(),
            thresholds: ThresholdSet::new(),
            scenario_notes: Vec::new(),
            summary_table: false,
        }
    }

    pub fn with_test_type(mut self, test_type: impl Into<String>) -> Self {
        self.test_type = test_type.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_scenario_notes(mut self, notes: Vec<String>) -> Self {
        self.scenario_notes = notes;
        self
    }

    /// Print the operations and thresholds summary to the console when the run finishes.
    pub fn enable_summary(mut self) -> Self {
        self.summary_table = true;
        self
    }

    pub fn init(self) -> Reporter {
        Reporter {
            config: self,
            store: Mutex::new(RecordStore::default()),
            started: Instant::now(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The shared metrics sink for a run.
///
/// Every virtual user appends into the same reporter through `&self` methods; the store behind
/// the mutex is append-only, so concurrent iterations cannot corrupt each other's observations.
#[derive(Debug)]
pub struct Reporter {
    config: ReportConfig,
    store: Mutex<RecordStore>,
    started: Instant,
    started_at: String,
}

impl Reporter {
    pub fn add_request(&self, record: RequestRecord) {
        self.store.lock().requests.push(record);
    }

    pub fn add_check(&self, sample: CheckSample) {
        self.store.lock().checks.push(sample);
    }

    /// Record one sample of the custom error-rate metric for a check group. Pass samples keep
    /// the rate honest: an all-pass run reports 0.0 rather than "no data".
    pub fn add_error_group(&self, endpoint: &str, failed: bool) {
        self.store.lock().error_groups.push(ErrorGroupSample {
            endpoint: endpoint.to_string(),
            failed,
        });
    }

    pub fn add_iteration(&self) {
        self.store.lock().iterations += 1;
    }

    /// Aggregate everything recorded so far. Cheap enough to call mid-run from tests; the run
    /// itself only takes one at the end.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let store = self.store.lock();
        MetricsSnapshot::build(
            SnapshotMeta {
                run_id: self.config.run_id.clone(),
                scenario_name: self.config.scenario_name.clone(),
                test_type: self.config.test_type.clone(),
                base_url: self.config.base_url.clone(),
                started_at: self.started_at.clone(),
            },
            &store,
            self.started.elapsed(),
        )
    }

    /// Close out the run: aggregate, evaluate thresholds and optionally print the summary.
    pub fn finalize(&self) -> RunReport {
        let snapshot = self.snapshot();
        let thresholds = self.config.thresholds.evaluate(&snapshot);

        let report = RunReport {
            snapshot,
            thresholds,
            scenario_notes: self.config.scenario_notes.clone(),
        };

        if self.config.summary_table {
            report::print_summary(&report);
        }

        report
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn reporter() -> Reporter {
        ReportConfig::new("test-run", "baseline_load")
            .with_test_type("baseline")
            .with_base_url("http://localhost:8080")
            .init()
    }

    #[test]
    fn concurrent_appends_are_all_counted() {
        let reporter = Arc::new(reporter());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        reporter.add_request(RequestRecord::start("homepage").complete(200));
                        reporter.add_check(CheckSample::new("homepage", "status ok", true));
                        reporter.add_error_group("homepage", false);
                    }
                    reporter.add_iteration();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.http_reqs.count, 800);
        assert_eq!(snapshot.checks.total(), 800);
        assert_eq!(snapshot.errors.total(), 800);
        assert_eq!(snapshot.iterations, 8);
        assert_eq!(snapshot.errors.rate, 0.0);
    }

    #[test]
    fn finalize_evaluates_the_configured_thresholds() {
        let reporter = ReportConfig::new("test-run", "baseline_load")
            .with_thresholds(
                ThresholdSet::new()
                    .require("errors", &["rate<0.05"])
                    .unwrap(),
            )
            .init();

        reporter.add_error_group("homepage", false);
        reporter.add_error_group("checkout", true);

        let report = reporter.finalize();
        // 1 failure out of 2 groups is a 50% rate, well past the 5% threshold.
        assert!(!report.passed());
        assert_eq!(report.violations().count(), 1);
    }
}
