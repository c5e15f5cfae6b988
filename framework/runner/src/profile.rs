use std::time::Duration;

/// One stage of a ramping profile: over `duration`, the number of active virtual users moves
/// linearly from wherever the previous stage left it to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// The concurrency shape of a scenario over time.
///
/// Two models are supported, matching the two executors the source scenarios use: a fixed
/// number of virtual users for a fixed duration, and an ordered ramp of (duration, target)
/// stages for spike and stress shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProfile {
    ConstantVus { vus: usize, duration: Duration },
    RampingVus { start_vus: usize, stages: Vec<Stage> },
}

impl LoadProfile {
    pub fn constant(vus: usize, duration: Duration) -> Self {
        Self::ConstantVus { vus, duration }
    }

    pub fn ramping(start_vus: usize, stages: impl IntoIterator<Item = Stage>) -> Self {
        Self::RampingVus {
            start_vus,
            stages: stages.into_iter().collect(),
        }
    }

    /// How many virtual users should be active at `elapsed` into the run.
    ///
    /// Ramping stages interpolate linearly; past the end of the schedule the last target holds,
    /// though in practice the duration timer stops the run there.
    pub fn vus_at(&self, elapsed: Duration) -> usize {
        match self {
            Self::ConstantVus { vus, .. } => *vus,
            Self::RampingVus { start_vus, stages } => {
                let mut from = *start_vus as f64;
                let mut offset = Duration::ZERO;
                for stage in stages {
                    let end = offset + stage.duration;
                    if elapsed < end && !stage.duration.is_zero() {
                        let frac =
                            (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                        return (from + (stage.target as f64 - from) * frac).round() as usize;
                    }
                    from = stage.target as f64;
                    offset = end;
                }
                stages.last().map(|s| s.target).unwrap_or(*start_vus)
            }
        }
    }

    /// The most virtual users this profile will ever ask for; the runner spawns this many
    /// agent threads up front and gates them on [LoadProfile::vus_at].
    pub fn peak_vus(&self) -> usize {
        match self {
            Self::ConstantVus { vus, .. } => *vus,
            Self::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .chain(std::iter::once(*start_vus))
                .max()
                .unwrap_or(*start_vus),
        }
    }

    pub fn total_duration(&self) -> Duration {
        match self {
            Self::ConstantVus { duration, .. } => *duration,
            Self::RampingVus { stages, .. } => stages.iter().map(|s| s.duration).sum(),
        }
    }
}
