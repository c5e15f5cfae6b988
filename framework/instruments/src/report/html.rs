use std::fmt::Write;

use crate::aggregate::DurationStats;
use crate::report::{format_actual, RunReport};
use crate::threshold::ThresholdOutcome;

const STYLE: &str = "\
        body { font-family: Arial, sans-serif; margin: 20px; }\n\
        .header { background-color: #f0f0f0; padding: 15px; border-radius: 5px; }\n\
        .metric { margin: 10px 0; padding: 10px; border-left: 4px solid #007acc; background-color: #f9f9f9; }\n\
        .passed { border-left-color: #28a745; }\n\
        .failed { border-left-color: #dc3545; }\n\
        .warning { border-left-color: #ffc107; }\n\
        table { border-collapse: collapse; width: 100%; }\n\
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
        th { background-color: #f2f2f2; }";

const RECOMMENDATIONS: &[&str] = &[
    "Monitor response times during peak hours",
    "Consider horizontal scaling if the 95th percentile exceeds its threshold",
    "Implement caching for frequently accessed endpoints",
    "Set up alerts for error rates above 1%",
];

/// The human-readable artifact: a self-contained HTML summary of the run.
///
/// Pure function of the report. Sections whose metric recorded nothing are omitted rather than
/// rendered with fabricated values.
pub fn render_html(report: &RunReport) -> String {
    let snapshot = &report.snapshot;
    let mut out = String::new();

    let _ = write!(
        out,
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
             <title>Performance Test Report</title>\n\
             <style>\n{STYLE}\n    </style>\n\
         </head>\n\
         <body>\n\
             <div class=\"header\">\n\
                 <h1>Performance Test Report</h1>\n\
                 <p><strong>Test Date:</strong> {started_at}</p>\n\
                 <p><strong>Target:</strong> {base_url}</p>\n\
                 <p><strong>Scenario:</strong> {scenario} ({test_type})</p>\n\
                 <p><strong>Duration:</strong> {duration:.0}s</p>\n\
             </div>\n",
        started_at = snapshot.started_at,
        base_url = snapshot.base_url,
        scenario = snapshot.scenario_name,
        test_type = snapshot.test_type,
        duration = snapshot.run_duration_s,
    );

    out.push_str("\n    <h2>Key Metrics</h2>\n");
    for result in &report.thresholds {
        let (class, detail) = match &result.outcome {
            ThresholdOutcome::Passed { actual } => ("passed", format_actual(&result.expression, *actual)),
            ThresholdOutcome::Failed { actual } => ("failed", format_actual(&result.expression, *actual)),
            ThresholdOutcome::Skipped => ("warning", "no data".to_string()),
        };
        let _ = write!(
            out,
            "    <div class=\"metric {class}\">\n\
                 <strong>{metric}:</strong> {detail}\n\
                 <br><em>Threshold: {expression}</em>\n\
             </div>\n",
            metric = result.metric,
            expression = result.expression,
        );
    }

    let _ = write!(
        out,
        "    <div class=\"metric\">\n\
             <strong>Total Requests:</strong> {count}\n\
         </div>\n\
         <div class=\"metric\">\n\
             <strong>Requests/sec:</strong> {rate:.2}\n\
         </div>\n\
         <div class=\"metric\">\n\
             <strong>Iterations:</strong> {iterations}\n\
         </div>\n\
         <div class=\"metric\">\n\
             <strong>Checks Passed:</strong> {check_passes}/{check_total}\n\
         </div>\n",
        count = snapshot.http_reqs.count,
        rate = snapshot.http_reqs.rate_per_s,
        iterations = snapshot.iterations,
        check_passes = snapshot.checks.passes,
        check_total = snapshot.checks.total(),
    );

    if let Some(overall) = &snapshot.http_req_duration {
        out.push_str(
            "\n    <h2>Detailed Metrics</h2>\n    <table>\n        <tr>\n            \
             <th>Endpoint</th>\n            <th>Average</th>\n            <th>Min</th>\n            \
             <th>Max</th>\n            <th>90th Percentile</th>\n            <th>95th Percentile</th>\n        </tr>\n",
        );
        push_duration_row(&mut out, "(all)", overall);
        for (endpoint, stats) in &snapshot.endpoints {
            push_duration_row(&mut out, endpoint, stats);
        }
        out.push_str("    </table>\n");
    }

    if !report.scenario_notes.is_empty() {
        out.push_str("\n    <h2>Test Scenarios</h2>\n    <ul>\n");
        for note in &report.scenario_notes {
            let _ = writeln!(out, "        <li>{note}</li>");
        }
        out.push_str("    </ul>\n");
    }

    out.push_str("\n    <h2>Recommendations</h2>\n    <ul>\n");
    for recommendation in RECOMMENDATIONS {
        let _ = writeln!(out, "        <li>{recommendation}</li>");
    }
    out.push_str("    </ul>\n</body>\n</html>\n");

    out
}

fn push_duration_row(out: &mut String, endpoint: &str, stats: &DurationStats) {
    let _ = write!(
        out,
        "        <tr>\n            <td>{endpoint}</td>\n            <td>{avg:.0}ms</td>\n            \
         <td>{min:.0}ms</td>\n            <td>{max:.0}ms</td>\n            <td>{p90:.0}ms</td>\n            \
         <td>{p95:.0}ms</td>\n        </tr>\n",
        avg = stats.avg_ms,
        min = stats.min_ms,
        max = stats.max_ms,
        p90 = stats.p90_ms,
        p95 = stats.p95_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::ThresholdResult;

    fn report_with(outcome: ThresholdOutcome) -> RunReport {
        RunReport {
            snapshot: crate::test_support::empty_snapshot(),
            thresholds: vec![ThresholdResult {
                metric: "http_req_duration".to_string(),
                expression: "p(95)<2000".to_string(),
                outcome,
            }],
            scenario_notes: vec!["Baseline: 10 concurrent users".to_string()],
        }
    }

    #[test]
    fn passing_threshold_is_marked_passed() {
        let html = render_html(&report_with(ThresholdOutcome::Passed { actual: 1500.0 }));

        assert!(html.contains("class=\"metric passed\""));
        assert!(html.contains("1500ms"));
    }

    #[test]
    fn failing_threshold_is_marked_failed() {
        let html = render_html(&report_with(ThresholdOutcome::Failed { actual: 2500.0 }));

        assert!(html.contains("class=\"metric failed\""));
        assert!(html.contains("2500ms"));
    }

    #[test]
    fn missing_duration_metric_omits_the_table() {
        let html = render_html(&report_with(ThresholdOutcome::Skipped));

        assert!(!html.contains("Detailed Metrics"));
        assert!(html.contains("class=\"metric warning\""));
    }

    #[test]
    fn scenario_notes_and_recommendations_are_listed() {
        let html = render_html(&report_with(ThresholdOutcome::Skipped));

        assert!(html.contains("Baseline: 10 concurrent users"));
        assert!(html.contains("Recommendations"));
    }
}
