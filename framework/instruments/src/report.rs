mod html;
mod operations_table;

use serde::{Deserialize, Serialize};

use crate::aggregate::MetricsSnapshot;
use crate::threshold::{ThresholdOutcome, ThresholdResult};

pub use html::render_html;

/// Everything a finished run produced: the final aggregate, the threshold verdicts and the
/// scenario notes carried through to the HTML artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub snapshot: MetricsSnapshot,
    pub thresholds: Vec<ThresholdResult>,
    pub scenario_notes: Vec<String>,
}

impl RunReport {
    /// False if any threshold was violated. Drives the process exit status.
    pub fn passed(&self) -> bool {
        !self.thresholds.iter().any(ThresholdResult::is_violation)
    }

    pub fn violations(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| t.is_violation())
    }
}

/// The machine-readable artifact: the full report as pretty-printed JSON.
pub fn render_json(report: &RunReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Console summary printed at the end of a run.
pub(crate) fn print_summary(report: &RunReport) {
    let snapshot = &report.snapshot;

    println!(
        "\nScenario {} against {} ran for {:.0}s",
        snapshot.scenario_name, snapshot.base_url, snapshot.run_duration_s
    );
    println!(
        "{} iterations, {} requests ({:.2}/s)",
        snapshot.iterations, snapshot.http_reqs.count, snapshot.http_reqs.rate_per_s
    );

    operations_table::print_operations(snapshot);

    println!(
        "\nChecks: {}/{} passed",
        snapshot.checks.passes,
        snapshot.checks.total()
    );
    println!("Request failures: {:.2}%", snapshot.http_req_failed.rate * 100.0);
    println!("Custom error rate: {:.2}%", snapshot.errors.rate * 100.0);

    if !report.thresholds.is_empty() {
        println!("\nThresholds");
        for result in &report.thresholds {
            let line = match &result.outcome {
                ThresholdOutcome::Passed { actual } => {
                    format!("✓ {}: {} (actual {})", result.metric, result.expression, format_actual(&result.expression, *actual))
                }
                ThresholdOutcome::Failed { actual } => {
                    format!("✗ {}: {} (actual {})", result.metric, result.expression, format_actual(&result.expression, *actual))
                }
                ThresholdOutcome::Skipped => {
                    format!("- {}: {} (no data)", result.metric, result.expression)
                }
            };
            println!("  {line}");
        }
    }
}

/// Rates read best as percentages, durations as whole milliseconds.
pub(crate) fn format_actual(expression: &str, actual: f64) -> String {
    if expression.starts_with("rate") {
        format!("{:.2}%", actual * 100.0)
    } else {
        format!("{}ms", actual.round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::ThresholdOutcome;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_round_trips_through_json() {
        let report = RunReport {
            snapshot: crate::test_support::empty_snapshot(),
            thresholds: vec![ThresholdResult {
                metric: "errors".to_string(),
                expression: "rate<0.05".to_string(),
                outcome: ThresholdOutcome::Passed { actual: 0.0 },
            }],
            scenario_notes: vec!["Baseline: 10 concurrent users for 5 minutes".to_string()],
        };

        let json = render_json(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, report);
    }

    #[test]
    fn violations_fail_the_run() {
        let mut report = RunReport {
            snapshot: crate::test_support::empty_snapshot(),
            thresholds: vec![],
            scenario_notes: vec![],
        };
        assert!(report.passed());

        report.thresholds.push(ThresholdResult {
            metric: "http_req_duration".to_string(),
            expression: "p(95)<2000".to_string(),
            outcome: ThresholdOutcome::Failed { actual: 2500.0 },
        });
        assert!(!report.passed());
        assert_eq!(report.violations().count(), 1);
    }

    #[test]
    fn skipped_thresholds_do_not_fail_the_run() {
        let report = RunReport {
            snapshot: crate::test_support::empty_snapshot(),
            thresholds: vec![ThresholdResult {
                metric: "http_req_duration".to_string(),
                expression: "p(95)<2000".to_string(),
                outcome: ThresholdOutcome::Skipped,
            }],
            scenario_notes: vec![],
        };

        assert!(report.passed());
    }

    #[test]
    fn actual_values_format_by_metric_kind() {
        assert_eq!(format_actual("rate<0.01", 0.015), "1.50%");
        assert_eq!(format_actual("p(95)<2000", 1500.4), "1500ms");
    }
}
