use std::time::Duration;

use anyhow::Context;
use url::Url;

use footfall_runner::prelude::{LoadProfile, Stage, ThresholdSet};

use crate::fixtures::Fixtures;

/// Everything an iteration needs to know about the target, resolved once in the setup hook and
/// shared read-only with every virtual user.
#[derive(Debug)]
pub struct JourneyConfig {
    pub base_url: Url,
    pub fixtures: Fixtures,
    pub think_time: Duration,
    pub request_timeout: Duration,
}

impl JourneyConfig {
    pub fn new(base_url: &str, think_time: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .with_context(|| format!("Invalid base URL: {base_url}"))?,
            fixtures: Fixtures::demo_catalogue(),
            think_time,
            request_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_fixtures(mut self, fixtures: Fixtures) -> Self {
        self.fixtures = fixtures;
        self
    }
}

/// Baseline: steady concurrency to establish the reference numbers.
pub fn baseline_profile() -> LoadProfile {
    LoadProfile::constant(10, Duration::from_secs(5 * 60))
}

/// Spike: climb to a short sharp peak, then back off.
pub fn spike_profile() -> LoadProfile {
    LoadProfile::ramping(
        10,
        [
            Stage::new(Duration::from_secs(60), 50),
            Stage::new(Duration::from_secs(2 * 60), 100),
            Stage::new(Duration::from_secs(60), 200),
            Stage::new(Duration::from_secs(2 * 60), 100),
            Stage::new(Duration::from_secs(60), 10),
        ],
    )
}

/// Stress: progressive ramp well past expected capacity, then drain.
pub fn stress_profile() -> LoadProfile {
    LoadProfile::ramping(
        10,
        [
            Stage::new(Duration::from_secs(2 * 60), 50),
            Stage::new(Duration::from_secs(5 * 60), 100),
            Stage::new(Duration::from_secs(5 * 60), 200),
            Stage::new(Duration::from_secs(5 * 60), 300),
            Stage::new(Duration::from_secs(2 * 60), 0),
        ],
    )
}

pub fn thresholds() -> anyhow::Result<ThresholdSet> {
    // 95% of requests under 2s, transport failures under 1%, check-group failures under 5%.
    ThresholdSet::new()
        .require("http_req_duration", &["p(95)<2000"])?
        .require("http_req_failed", &["rate<0.01"])?
        .require("errors", &["rate<0.05"])
}

pub const SCENARIO_NOTES: &[&str] = &[
    "Baseline Load: 10 concurrent users for 5 minutes",
    "Spike Test: gradual increase to 200 users with spike simulation",
    "Stress Test: progressive load increase to 300 concurrent users",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_must_parse() {
        assert!(JourneyConfig::new("http://localhost:8080", Duration::from_secs(1)).is_ok());
        assert!(JourneyConfig::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn spike_peaks_at_two_hundred() {
        assert_eq!(spike_profile().peak_vus(), 200);
        assert_eq!(spike_profile().total_duration(), Duration::from_secs(7 * 60));
    }

    #[test]
    fn stress_ramps_down_to_zero() {
        let profile = stress_profile();

        assert_eq!(profile.peak_vus(), 300);
        assert_eq!(profile.vus_at(profile.total_duration()), 0);
    }

    #[test]
    fn thresholds_parse() {
        assert!(!thresholds().unwrap().is_empty());
    }
}
