use std::sync::Arc;
use std::time::Duration;

use footfall_runner::prelude::{
    AgentBailError, AgentContext, FootfallScenarioCli, HookResult, LoadProfile, RunnerContext,
    ScenarioDefinitionBuilder, UserValuesConstraint, run,
};

#[derive(Default, Debug)]
struct RunnerContextValue {}

impl UserValuesConstraint for RunnerContextValue {}

#[derive(Default, Debug)]
struct AgentContextValue {
    value: i32,
}

impl UserValuesConstraint for AgentContextValue {}

fn sample_cli_cfg(report_dir: &std::path::Path) -> FootfallScenarioCli {
    FootfallScenarioCli {
        base_url: "http://localhost:8080".to_string(),
        scenario: "baseline_load".to_string(),
        agents: None,
        duration: None,
        think_time_ms: 0,
        soak: false,
        no_progress: true,
        report_dir: report_dir.to_path_buf(),
        run_id: None,
    }
}

fn scenario(
    cli: FootfallScenarioCli,
) -> ScenarioDefinitionBuilder<RunnerContextValue, AgentContextValue> {
    ScenarioDefinitionBuilder::new("hook_error_handling", cli).use_profile(
        "baseline_load",
        "baseline",
        LoadProfile::constant(1, Duration::from_secs(5)),
    )
}

#[test]
fn propagate_error_in_setup_hook() {
    fn setup(_ctx: &mut RunnerContext<RunnerContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in setup hook"))
    }

    let dir = tempfile::tempdir().unwrap();
    let builder = scenario(sample_cli_cfg(dir.path())).use_setup(setup);

    let result = run(builder);

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().to_string(), "Error in setup hook");
}

#[test]
fn unknown_scenario_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut cli = sample_cli_cfg(dir.path());
    cli.scenario = "missing_scenario".to_string();

    let result = run(scenario(cli));

    assert!(result.unwrap_err().to_string().contains("Unknown scenario"));
}

#[test]
fn behaviour_errors_do_not_fail_the_run() {
    fn agent_behaviour(
        ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        if ctx.get().value < 3 {
            ctx.get_mut().value += 1;
        } else {
            // Save wall time by shutting down once this has run a few times.
            ctx.runner_context().force_stop_scenario();
        }

        Err(anyhow::anyhow!("Error in agent behaviour hook"))
    }

    let dir = tempfile::tempdir().unwrap();
    let builder = scenario(sample_cli_cfg(dir.path())).use_agent_behaviour(agent_behaviour);

    let report = run(builder).unwrap();

    // Every invocation errored, so none of them count as completed iterations.
    assert_eq!(report.snapshot.iterations, 0);
}

#[test]
fn completed_iterations_are_recorded_and_artifacts_written() {
    fn agent_behaviour(
        ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        ctx.get_mut().value += 1;
        if ctx.get().value >= 5 {
            ctx.runner_context().force_stop_scenario();
        }
        Ok(())
    }

    let dir = tempfile::tempdir().unwrap();
    let builder = scenario(sample_cli_cfg(dir.path())).use_agent_behaviour(agent_behaviour);

    let report = run(builder).unwrap();

    assert!(report.snapshot.iterations >= 5);
    assert!(report.passed());

    let json = std::fs::read_to_string(dir.path().join("performance-results.json")).unwrap();
    assert!(json.contains("\"scenario_name\": \"baseline_load\""));
    assert!(dir.path().join("performance-summary.html").exists());
}

#[test]
fn bail_error_retires_the_agent() {
    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        Err(AgentBailError::default().into())
    }

    let dir = tempfile::tempdir().unwrap();
    let mut cli = sample_cli_cfg(dir.path());
    cli.duration = Some(2);
    let builder = scenario(cli).use_agent_behaviour(agent_behaviour);

    let report = run(builder).unwrap();

    assert_eq!(report.snapshot.iterations, 0);
}

#[test]
fn teardown_runs_after_agents_stop() {
    fn agent_behaviour(
        ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        ctx.runner_context().force_stop_scenario();
        Ok(())
    }

    fn teardown(_ctx: Arc<RunnerContext<RunnerContextValue>>) -> HookResult {
        // A failing teardown must not fail the run.
        Err(anyhow::anyhow!("Error in teardown hook"))
    }

    let dir = tempfile::tempdir().unwrap();
    let builder = scenario(sample_cli_cfg(dir.path()))
        .use_agent_behaviour(agent_behaviour)
        .use_teardown(teardown);

    let result = run(builder);

    assert!(result.is_ok());
}
