use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::{MetricView, MetricsSnapshot};

/// A single post-run assertion over an aggregated metric, parsed from a k6-style expression
/// such as `p(95)<2000` or `rate<0.01`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    PercentileBelow { p: f64, limit_ms: f64 },
    AvgBelow { limit_ms: f64 },
    MaxBelow { limit_ms: f64 },
    RateBelow { limit: f64 },
}

impl Threshold {
    pub fn parse(expr: &str) -> anyhow::Result<Self> {
        let cleaned: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let (lhs, rhs) = cleaned
            .split_once('<')
            .ok_or_else(|| anyhow::anyhow!("Threshold expression must be of the form `<aggregate><<limit>`: {expr}"))?;

        let limit: f64 = rhs
            .parse()
            .map_err(|_| anyhow::anyhow!("Threshold limit is not a number: {expr}"))?;

        match lhs {
            "rate" => Ok(Self::RateBelow { limit }),
            "avg" => Ok(Self::AvgBelow { limit_ms: limit }),
            "max" => Ok(Self::MaxBelow { limit_ms: limit }),
            _ => {
                let p = lhs
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|n| n.parse::<f64>().ok())
                    .ok_or_else(|| anyhow::anyhow!("Unknown threshold aggregate in expression: {expr}"))?;
                // The aggregator precomputes p90 and p95 only.
                anyhow::ensure!(
                    p == 90.0 || p == 95.0,
                    "Unsupported percentile p({p}) in threshold expression: {expr}"
                );
                Ok(Self::PercentileBelow { p, limit_ms: limit })
            }
        }
    }

    /// Evaluate against a metric, returning the outcome and the observed value. `None` when the
    /// expression does not apply to this kind of metric.
    pub(crate) fn evaluate(&self, metric: &MetricView<'_>) -> Option<(bool, f64)> {
        match (self, metric) {
            (Self::PercentileBelow { p, limit_ms }, MetricView::Duration(stats)) => stats
                .percentile_ms(*p)
                .map(|actual| (actual < *limit_ms, actual)),
            (Self::AvgBelow { limit_ms }, MetricView::Duration(stats)) => {
                Some((stats.avg_ms < *limit_ms, stats.avg_ms))
            }
            (Self::MaxBelow { limit_ms }, MetricView::Duration(stats)) => {
                Some((stats.max_ms < *limit_ms, stats.max_ms))
            }
            (Self::RateBelow { limit }, MetricView::Rate(stats)) => {
                Some((stats.rate < *limit, stats.rate))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PercentileBelow { p, limit_ms } => write!(f, "p({p})<{limit_ms}"),
            Self::AvgBelow { limit_ms } => write!(f, "avg<{limit_ms}"),
            Self::MaxBelow { limit_ms } => write!(f, "max<{limit_ms}"),
            Self::RateBelow { limit } => write!(f, "rate<{limit}"),
        }
    }
}

/// The full set of pass/fail assertions for a run, keyed by metric name. Built once before the
/// run starts; evaluated once against the final snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    inner: BTreeMap<String, Vec<Threshold>>,
}

impl ThresholdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add assertions for a metric. Invalid expressions are rejected here, before the run
    /// starts, never mid-run.
    pub fn require(mut self, metric: &str, exprs: &[&str]) -> anyhow::Result<Self> {
        let parsed = exprs
            .iter()
            .map(|expr| Threshold::parse(expr))
            .collect::<anyhow::Result<Vec<_>>>()?;
        self.inner.entry(metric.to_string()).or_default().extend(parsed);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<ThresholdResult> {
        let mut results = Vec::new();
        for (metric, thresholds) in &self.inner {
            for threshold in thresholds {
                let outcome = match snapshot.metric(metric) {
                    Some(view) => match threshold.evaluate(&view) {
                        Some((true, actual)) => ThresholdOutcome::Passed { actual },
                        Some((false, actual)) => ThresholdOutcome::Failed { actual },
                        None => {
                            log::warn!(
                                "Threshold `{threshold}` does not apply to metric `{metric}`, skipping"
                            );
                            ThresholdOutcome::Skipped
                        }
                    },
                    // A metric that recorded nothing is reported, not failed.
                    None => ThresholdOutcome::Skipped,
                };

                results.push(ThresholdResult {
                    metric: metric.clone(),
                    expression: threshold.to_string(),
                    outcome,
                });
            }
        }
        results
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub outcome: ThresholdOutcome,
}

impl ThresholdResult {
    pub fn is_violation(&self) -> bool {
        matches!(self.outcome, ThresholdOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThresholdOutcome {
    Passed { actual: f64 },
    Failed { actual: f64 },
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{DurationStats, RateStats};

    fn duration_stats(p95_ms: f64) -> DurationStats {
        DurationStats {
            count: 100,
            avg_ms: p95_ms / 2.0,
            min_ms: 1.0,
            max_ms: p95_ms * 2.0,
            p90_ms: p95_ms * 0.9,
            p95_ms,
        }
    }

    #[test]
    fn parses_the_standard_expressions() {
        assert_eq!(
            Threshold::parse("p(95)<2000").unwrap(),
            Threshold::PercentileBelow { p: 95.0, limit_ms: 2000.0 }
        );
        assert_eq!(
            Threshold::parse("rate<0.01").unwrap(),
            Threshold::RateBelow { limit: 0.01 }
        );
        assert_eq!(
            Threshold::parse("avg < 150").unwrap(),
            Threshold::AvgBelow { limit_ms: 150.0 }
        );
        assert_eq!(
            Threshold::parse("max<5000").unwrap(),
            Threshold::MaxBelow { limit_ms: 5000.0 }
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(Threshold::parse("p95<2000").is_err());
        assert!(Threshold::parse("p(50)<2000").is_err());
        assert!(Threshold::parse("rate<fast").is_err());
        assert!(Threshold::parse("rate>0.01").is_err());
    }

    #[test]
    fn p95_below_limit_passes() {
        let threshold = Threshold::parse("p(95)<2000").unwrap();
        let stats = duration_stats(1500.0);

        let (passed, actual) = threshold.evaluate(&MetricView::Duration(&stats)).unwrap();
        assert!(passed);
        assert_eq!(actual, 1500.0);
    }

    #[test]
    fn p95_above_limit_fails() {
        let threshold = Threshold::parse("p(95)<2000").unwrap();
        let stats = duration_stats(2500.0);

        let (passed, actual) = threshold.evaluate(&MetricView::Duration(&stats)).unwrap();
        assert!(!passed);
        assert_eq!(actual, 2500.0);
    }

    #[test]
    fn rate_threshold_applies_to_rate_metrics_only() {
        let threshold = Threshold::parse("rate<0.05").unwrap();
        let rate = RateStats::new(99, 1);

        assert_eq!(threshold.evaluate(&MetricView::Rate(&rate)), Some((true, 0.01)));
        assert_eq!(
            threshold.evaluate(&MetricView::Duration(&duration_stats(100.0))),
            None
        );
    }

    #[test]
    fn absent_metric_is_skipped_not_violated() {
        let set = ThresholdSet::new()
            .require("http_req_duration", &["p(95)<2000"])
            .unwrap();
        let snapshot = crate::test_support::empty_snapshot();

        let results = set.evaluate(&snapshot);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, ThresholdOutcome::Skipped);
        assert!(!results[0].is_violation());
    }
}
