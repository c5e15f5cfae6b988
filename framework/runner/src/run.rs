use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use footfall_core::prelude::{AgentBailError, ShutdownSignalError};
use footfall_instruments::{render_html, render_json, ReportConfig, RunReport};

use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
use crate::definition::ScenarioDefinitionBuilder;
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;

/// How often an idle agent thread re-checks whether the ramp schedule wants it active.
const RAMP_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run a scenario to completion and return its report.
///
/// The returned report carries the threshold verdicts; callers decide the process exit status
/// from [RunReport::passed]. A threshold violation is not an `Err`, a failure to run is.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario [{}] from suite [{}] against {}",
        definition.scenario,
        definition.name,
        definition.base_url
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));

    let reporter = Arc::new(
        ReportConfig::new(&definition.run_id, &definition.scenario)
            .with_test_type(&definition.test_type)
            .with_base_url(&definition.base_url)
            .with_thresholds(definition.thresholds.clone())
            .with_scenario_notes(definition.scenario_notes.clone())
            .enable_summary()
            .init(),
    );

    let mut runner_context = RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle.clone(),
        definition.base_url.clone(),
        definition.think_time,
    );

    if let Some(setup_fn) = &definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    // Only once setup has verified the target do we commit to the time-bounded part of the run.
    if let Some(duration) = definition.duration {
        if !definition.no_progress {
            start_progress(duration, shutdown_handle.new_listener());
        }

        let timer_shutdown_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(duration).await;
            timer_shutdown_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);
    let runner_context_for_teardown = runner_context.clone();

    start_monitor(shutdown_handle.new_listener());

    let started = Instant::now();
    let peak = definition.profile.peak_vus();
    log::debug!("Spawning {} agent threads", peak);

    let mut handles = Vec::with_capacity(peak);
    for agent_index in 0..peak {
        let runner_context = runner_context.clone();
        let reporter = reporter.clone();
        let profile = definition.profile.clone();

        let setup_agent_fn = definition.setup_agent_fn;
        let agent_behaviour_fn = definition.agent_behaviour_fn;
        let teardown_agent_fn = definition.teardown_agent_fn;

        // For the run loop to check between iterations.
        let mut cycle_shutdown_listener = shutdown_handle.new_listener();
        // For the behaviour implementation to race its own work against.
        let delegated_shutdown_listener = shutdown_handle.new_listener();

        let agent_id = format!("agent-{}", agent_index);

        handles.push(
            std::thread::Builder::new()
                .name(agent_id.clone())
                .spawn(move || {
                    let mut context = AgentContext::new(
                        agent_id.clone(),
                        runner_context,
                        delegated_shutdown_listener,
                    );

                    if let Some(setup_agent_fn) = setup_agent_fn {
                        if let Err(e) = setup_agent_fn(&mut context) {
                            log::error!("Agent setup failed for agent {}: {:?}", agent_id, e);
                            return;
                        }
                    }

                    if let Some(behaviour) = agent_behaviour_fn {
                        loop {
                            if cycle_shutdown_listener.should_shutdown() {
                                log::debug!("Stopping agent {}", agent_id);
                                break;
                            }

                            // Ramp gating: agents beyond the currently scheduled concurrency
                            // stay idle until the schedule wants them.
                            if agent_index >= profile.vus_at(started.elapsed()) {
                                std::thread::sleep(RAMP_POLL_INTERVAL);
                                continue;
                            }

                            match behaviour(&mut context) {
                                Ok(()) => {
                                    reporter.add_iteration();
                                }
                                Err(e) if e.is::<ShutdownSignalError>() => {
                                    // Expected when the run ends mid-iteration. The check at
                                    // the top of the loop will break out.
                                }
                                Err(e) if e.is::<AgentBailError>() => {
                                    log::warn!("Agent {} is bailing: {:?}", agent_id, e);
                                    break;
                                }
                                Err(e) => {
                                    log::error!("Agent behaviour failed: {:?}", e);
                                }
                            }
                        }
                    }

                    if let Some(teardown_agent_fn) = teardown_agent_fn {
                        if let Err(e) = teardown_agent_fn(&mut context) {
                            log::error!("Agent teardown failed for agent {}: {:?}", agent_id, e);
                        }
                    }
                })
                .expect("Failed to spawn thread for test agent"),
        );
    }

    for handle in handles {
        handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining thread for test agent: {:?}", e))?;
    }

    if let Some(teardown_fn) = definition.teardown_fn {
        // A teardown failure must not swallow the report; the hook is best effort.
        if let Err(e) = teardown_fn(runner_context_for_teardown) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    let report = reporter.finalize();

    for violation in report.violations() {
        log::error!(
            "Threshold violated on {}: {}",
            violation.metric,
            violation.expression
        );
    }

    if let Err(e) = write_artifacts(&definition.report_dir, &report) {
        // The console summary has already been printed and the report is still returned; a
        // broken artifact directory must not turn a finished run into an error.
        log::error!("Failed to write report artifacts: {:?}", e);
    }

    Ok(report)
}

/// Write the JSON artifact first: it is the authoritative record, and an HTML rendering
/// problem must never cost us the raw data.
fn write_artifacts(report_dir: &Path, report: &RunReport) -> anyhow::Result<()> {
    std::fs::create_dir_all(report_dir)
        .with_context(|| format!("Failed to create report directory {}", report_dir.display()))?;

    let json_path = report_dir.join("performance-results.json");
    std::fs::write(&json_path, render_json(report)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    log::info!("Wrote {}", json_path.display());

    let html_path = report_dir.join("performance-summary.html");
    if let Err(e) = std::fs::write(&html_path, render_html(report)) {
        log::warn!("Failed to write {}: {:?}", html_path.display(), e);
    } else {
        log::info!("Wrote {}", html_path.display());
    }

    Ok(())
}
