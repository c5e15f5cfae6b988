use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use footfall_instruments::ThresholdSet;

use crate::cli::FootfallScenarioCli;
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
use crate::profile::LoadProfile;

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type AgentHookMut<RV, V> = fn(&mut AgentContext<RV, V>) -> HookResult;

struct RegisteredProfile {
    test_type: String,
    profile: LoadProfile,
}

/// The builder for a scenario definition.
///
/// Used at the start of a scenario binary to declare the named load profiles, the thresholds
/// and the hooks, before handing everything to [crate::run::run].
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario suite. Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: FootfallScenarioCli,
    profiles: HashMap<String, RegisteredProfile>,
    thresholds: ThresholdSet,
    scenario_notes: Vec<String>,
    /// Global setup hook, run once before any agents start. A failure here aborts the run.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Per-agent setup hook, run once as each agent thread starts.
    setup_agent_fn: Option<AgentHookMut<RV, V>>,
    /// The behaviour every agent loops over; one invocation is one iteration.
    agent_behaviour_fn: Option<AgentHookMut<RV, V>>,
    /// Per-agent teardown, run as the agent thread unwinds. Best effort.
    teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    /// Global teardown, run after all agents have stopped. Best effort.
    teardown_fn: Option<GlobalHook<RV>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    pub fn new(name: &str, cli: FootfallScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            profiles: HashMap::new(),
            thresholds: ThresholdSet::new(),
            scenario_notes: Vec::new(),
            setup_fn: None,
            setup_agent_fn: None,
            agent_behaviour_fn: None,
            teardown_agent_fn: None,
            teardown_fn: None,
        }
    }

    /// Register a named concurrency shape that `--scenario` can select, tagging its
    /// observations with `test_type`.
    pub fn use_profile(mut self, name: &str, test_type: &str, profile: LoadProfile) -> Self {
        let previous = self.profiles.insert(
            name.to_string(),
            RegisteredProfile {
                test_type: test_type.to_string(),
                profile,
            },
        );

        if previous.is_some() {
            panic!("Profile [{}] is already defined", name);
        }

        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Human-readable descriptions of the registered scenarios, carried into the HTML artifact.
    pub fn with_scenario_notes(mut self, notes: &[&str]) -> Self {
        self.scenario_notes = notes.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    pub fn use_agent_setup(mut self, setup_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.setup_agent_fn = Some(setup_agent_fn);
        self
    }

    pub fn use_agent_behaviour(mut self, behaviour: AgentHookMut<RV, V>) -> Self {
        self.agent_behaviour_fn = Some(behaviour);
        self
    }

    pub fn use_agent_teardown(mut self, teardown_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.teardown_agent_fn = Some(teardown_agent_fn);
        self
    }

    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    /// Resolve the CLI against the registered profiles into an immutable definition.
    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let Some(registered) = self.profiles.get(&self.cli.scenario) else {
            let mut known: Vec<_> = self.profiles.keys().cloned().collect();
            known.sort();
            anyhow::bail!(
                "Unknown scenario [{}]; known scenarios: {}",
                self.cli.scenario,
                known.join(", ")
            );
        };

        let mut profile = registered.profile.clone();
        if let Some(agents) = self.cli.agents {
            match &mut profile {
                LoadProfile::ConstantVus { vus, .. } => *vus = agents,
                LoadProfile::RampingVus { .. } => {
                    log::warn!(
                        "--agents has no effect on ramping scenario [{}]",
                        self.cli.scenario
                    );
                }
            }
        }

        let duration = if self.cli.soak {
            None
        } else {
            Some(
                self.cli
                    .duration
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| profile.total_duration()),
            )
        };

        Ok(ScenarioDefinition {
            name: self.name,
            run_id: self.cli.run_id.clone().unwrap_or_else(|| nanoid::nanoid!()),
            base_url: self.cli.base_url.clone(),
            scenario: self.cli.scenario.clone(),
            test_type: registered.test_type.clone(),
            profile,
            duration,
            think_time: Duration::from_millis(self.cli.think_time_ms),
            no_progress: self.cli.no_progress,
            report_dir: self.cli.report_dir.clone(),
            thresholds: self.thresholds,
            scenario_notes: self.scenario_notes,
            setup_fn: self.setup_fn,
            setup_agent_fn: self.setup_agent_fn,
            agent_behaviour_fn: self.agent_behaviour_fn,
            teardown_agent_fn: self.teardown_agent_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub(crate) name: String,
    pub(crate) run_id: String,
    pub(crate) base_url: String,
    pub(crate) scenario: String,
    pub(crate) test_type: String,
    pub(crate) profile: LoadProfile,
    pub(crate) duration: Option<Duration>,
    pub(crate) think_time: Duration,
    pub(crate) no_progress: bool,
    pub(crate) report_dir: PathBuf,
    pub(crate) thresholds: ThresholdSet,
    pub(crate) scenario_notes: Vec<String>,
    pub(crate) setup_fn: Option<GlobalHookMut<RV>>,
    pub(crate) setup_agent_fn: Option<AgentHookMut<RV, V>>,
    pub(crate) agent_behaviour_fn: Option<AgentHookMut<RV, V>>,
    pub(crate) teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    pub(crate) teardown_fn: Option<GlobalHook<RV>>,
}
