use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use footfall_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use footfall_instruments::Reporter;

use crate::executor::Executor;

/// Scenario-defined values carried on the contexts must be constructible up front and safe to
/// share with agent threads.
pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Run-wide state shared by every virtual user: the executor, the metrics reporter and the
/// resolved target configuration, plus one scenario-defined value slot.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    base_url: String,
    think_time: Duration,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        base_url: String,
        think_time: Duration,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            base_url,
            think_time,
            value: Default::default(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn think_time(&self) -> Duration {
        self.think_time
    }

    /// End the run early. Used by scenarios that decide they are done before the duration
    /// timer fires, and by tests.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Per-virtual-user state: the agent's identity, its view of the run, and one scenario-defined
/// value slot that lives as long as the agent thread.
pub struct AgentContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    agent_id: String,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> AgentContext<RV, V> {
    pub(crate) fn new(
        agent_id: String,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            agent_id,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
