use std::sync::Arc;

use anyhow::Context;

use footfall_runner::prelude::*;
use storefront_journey::client::HttpJourneyClient;
use storefront_journey::config::{self, JourneyConfig};
use storefront_journey::journey::{run_journey, JourneyPlan};
use storefront_journey::session::Session;

#[derive(Default, Debug)]
struct JourneyRunnerContext {
    config: Option<Arc<JourneyConfig>>,
}

impl UserValuesConstraint for JourneyRunnerContext {}

#[derive(Default, Debug)]
struct JourneyAgentContext {
    sessions_run: u64,
}

impl UserValuesConstraint for JourneyAgentContext {}

/// Resolve the journey configuration and verify the target is reachable before any virtual
/// user starts. A target that cannot serve its homepage fails the whole run here.
fn setup(ctx: &mut RunnerContext<JourneyRunnerContext>) -> HookResult {
    let config = JourneyConfig::new(ctx.base_url(), ctx.think_time())?;

    let base_url = config.base_url.clone();
    let timeout = config.request_timeout;
    ctx.executor().execute_in_place(async move {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let response = client
            .get(base_url.clone())
            .send()
            .await
            .with_context(|| format!("Target {base_url} is not reachable"))?;

        anyhow::ensure!(
            response.status().is_success(),
            "Target {} is not accessible. Status: {}",
            base_url,
            response.status()
        );

        Ok(())
    })?;

    log::info!("Target verification successful: {}", config.base_url);
    ctx.get_mut().config = Some(Arc::new(config));

    Ok(())
}

/// One iteration: a fresh session and plan, then the full journey.
fn agent_behaviour(
    ctx: &mut AgentContext<JourneyRunnerContext, JourneyAgentContext>,
) -> HookResult {
    let config = ctx
        .runner_context()
        .get()
        .config
        .clone()
        .context("Journey configuration missing; setup has not run")?;
    let reporter = ctx.runner_context().reporter();

    ctx.runner_context().executor().execute_in_place(async move {
        let (session, plan) = {
            let mut rng = rand::thread_rng();
            (
                Session::begin(&config.base_url, &config.fixtures, &mut rng),
                JourneyPlan::random(&config.fixtures, &mut rng),
            )
        };

        let client = HttpJourneyClient::new(&session, &config)?;
        run_journey(&client, &plan, config.think_time, &reporter).await;

        Ok(())
    })?;

    ctx.get_mut().sessions_run += 1;

    Ok(())
}

fn agent_teardown(
    ctx: &mut AgentContext<JourneyRunnerContext, JourneyAgentContext>,
) -> HookResult {
    log::debug!(
        "Agent {} completed {} sessions",
        ctx.agent_id(),
        ctx.get().sessions_run
    );

    Ok(())
}

fn teardown(_ctx: Arc<RunnerContext<JourneyRunnerContext>>) -> HookResult {
    log::info!("Performance test completed; check the report artifacts for metrics and thresholds");

    Ok(())
}

fn main() -> FootfallResult<()> {
    let cli = footfall_runner::init();

    let builder = ScenarioDefinitionBuilder::<JourneyRunnerContext, JourneyAgentContext>::new(
        env!("CARGO_PKG_NAME"),
        cli,
    )
    .use_profile("baseline_load", "baseline", config::baseline_profile())
    .use_profile("spike_test", "spike", config::spike_profile())
    .use_profile("stress_test", "stress", config::stress_profile())
    .with_thresholds(config::thresholds()?)
    .with_scenario_notes(config::SCENARIO_NOTES)
    .use_setup(setup)
    .use_agent_behaviour(agent_behaviour)
    .use_agent_teardown(agent_teardown)
    .use_teardown(teardown);

    let report = run(builder)?;

    if !report.passed() {
        // The artifacts are already on disk; the exit status is for CI consumers.
        std::process::exit(1);
    }

    Ok(())
}
