//! Phase 4/5 of the runner: iterate scenarios honoring `requires`/pause/
//! capability gating, iterate steps within each with the `repeat` loop,
//! then finalize (spec.md §4.4/§4.5).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use newtest_model::{DeviceScope, ExecutionKind, Scenario};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::capabilities::missing_features;
use crate::dispatch::executors::dispatch_step;
use crate::drivers::DeviceRole;
use crate::error::ScenarioError;
use crate::graph::should_skip;
use crate::parser::LoadedSuite;
use crate::reporter::ProgressReporter;
use crate::result::{scenario_status_from_steps, DeviceResult, ScenarioResult, Status, StepResult, SuiteResult};
use crate::state::{RunState, RunStatus};

use super::{ordered_scenarios, DeploymentMode, Runner};

/// Run every scenario in `loaded`, honoring a prior [`RunState`] when
/// resuming (already-completed scenarios are skipped without re-running;
/// spec.md §4.4, "resume").
#[instrument(skip_all, fields(suite = %loaded.suite.name()))]
pub async fn run_suite<R: ProgressReporter>(
    runner: &Runner<R>,
    loaded: &LoadedSuite,
    cancel: &CancellationToken,
    resume_from: Option<&RunState>,
) -> Result<(RunState, SuiteResult), ScenarioError> {
    let declared_order: Vec<String> = loaded.scenarios.iter().map(|s| s.name.clone()).collect();
    let order = loaded
        .graph
        .topo_order(&declared_order)
        .map_err(|e| ScenarioError::Load(crate::error::SuiteLoadError::Validation(vec![e])))?;
    let scenarios = ordered_scenarios(&loaded.scenarios, &order);

    let now = Utc::now();
    let mut state = resume_from.cloned().unwrap_or_else(|| {
        RunState::new(
            loaded.suite.name(),
            loaded.suite.dir().to_path_buf(),
            scenarios.first().map_or_else(String::new, |s| s.topology.clone()),
            scenarios.first().map_or_else(String::new, |s| s.platform.clone()),
            std::process::id(),
            declared_order.clone(),
            now,
        )
    });

    let mut completed: BTreeMap<String, Status> = state
        .scenarios
        .iter()
        .filter_map(|s| s.status.map(|status| (s.name.clone(), status)))
        .collect();
    // Only a scenario that previously PASSED is safe to skip on resume;
    // anything recorded FAIL/SKIP/ERROR must re-run so a resumed suite
    // reaches the same final statuses an uninterrupted run would
    // (spec.md §4.4 Phase 4 step 1).
    let already_done: std::collections::HashSet<String> = completed
        .iter()
        .filter(|(_, status)| **status == Status::Pass)
        .map(|(name, _)| name.clone())
        .collect();

    runner.reporter.suite_started(loaded.suite.name(), scenarios.len()).await;

    if runner.config.deployment_mode == DeploymentMode::Shared && !runner.config.no_deploy {
        ensure_deployed(runner).await?;
    }

    let mut suite_result = SuiteResult::default();

    for scenario in scenarios {
        if already_done.contains(&scenario.name) {
            let result =
                ScenarioResult::skipped(scenario.name.clone(), "already passed (resumed)", Utc::now());
            runner.reporter.scenario_finished(&result).await;
            suite_result.scenarios.push(result);
            continue;
        }

        if cancel.is_cancelled() {
            let result = interrupted_result(&scenario.name);
            completed.insert(scenario.name.clone(), result.status);
            runner.reporter.scenario_finished(&result).await;
            suite_result.scenarios.push(result);
            continue;
        }

        if runner.store.check_pausing().await {
            state.status = RunStatus::Paused;
            state.updated_at = Utc::now();
            let _ = runner.store.save(&state).await;
            break;
        }

        if let Some(blocker) = should_skip(&loaded.graph, &scenario.name, &completed) {
            let result = ScenarioResult::skipped(
                scenario.name.clone(),
                format!("dependency '{blocker}' did not pass"),
                Utc::now(),
            );
            completed.insert(scenario.name.clone(), Status::Skip);
            state.mark_scenario(&scenario.name, Status::Skip, 0, result.skip_reason.clone());
            runner.reporter.scenario_finished(&result).await;
            suite_result.scenarios.push(result);
            continue;
        }

        if let Some(platform) = runner.drivers.network.get_platform(&scenario.platform) {
            let missing = missing_features(scenario, &platform);
            if !missing.is_empty() {
                let reason = format!("platform missing features: {}", missing.join(", "));
                let result = ScenarioResult::skipped(scenario.name.clone(), reason, Utc::now());
                completed.insert(scenario.name.clone(), Status::Skip);
                state.mark_scenario(&scenario.name, Status::Skip, 0, result.skip_reason.clone());
                runner.reporter.scenario_finished(&result).await;
                suite_result.scenarios.push(result);
                continue;
            }
        }

        if runner.config.deployment_mode == DeploymentMode::Independent && !runner.config.no_deploy {
            ensure_deployed(runner).await?;
        }

        let result = run_scenario(runner, scenario, cancel).await;
        completed.insert(scenario.name.clone(), result.status);
        suite_result.scenarios.push(result);

        if runner.config.deployment_mode == DeploymentMode::Independent && !runner.config.no_deploy {
            let _ = runner.lab.destroy().await;
        }
    }

    runner.reporter.suite_finished().await;
    state.status = if cancel.is_cancelled() {
        RunStatus::Aborted
    } else if state.status == RunStatus::Paused {
        RunStatus::Paused
    } else if suite_result.overall_status().is_passing() {
        RunStatus::Complete
    } else {
        RunStatus::Failed
    };
    state.updated_at = Utc::now();
    runner.store.save(&state).await.map_err(ScenarioError::State)?;

    Ok((state, suite_result))
}

async fn ensure_deployed<R: ProgressReporter>(runner: &Runner<R>) -> Result<(), ScenarioError> {
    if runner.lab.is_ready().await.unwrap_or(false) {
        return Ok(());
    }
    info!("deploying topology");
    runner
        .lab
        .deploy()
        .await
        .map_err(|e| ScenarioError::Infra(crate::error::InfraError::LabNotReady(e.to_string())))?;
    Ok(())
}

fn interrupted_result(name: &str) -> ScenarioResult {
    let now = Utc::now();
    ScenarioResult {
        name: name.to_owned(),
        status: Status::Error,
        steps: Vec::new(),
        skip_reason: Some("interrupted".to_owned()),
        started_at: now,
        finished_at: now,
        iteration: 1,
        failed_iteration: None,
    }
}

async fn run_scenario<R: ProgressReporter>(
    runner: &Runner<R>,
    scenario: &Scenario,
    cancel: &CancellationToken,
) -> ScenarioResult {
    let started_at = Utc::now();
    let repeat_count = scenario.repeat_count();

    let mut all_steps = Vec::new();
    let mut failed_iteration = None;
    let mut final_status = Status::Pass;
    let mut ran_iteration = 1;
    let mut cancelled = false;

    'repeat: for iteration in 1..=repeat_count {
        ran_iteration = iteration;
        runner.reporter.scenario_started(&scenario.name, iteration).await;
        let mut iteration_statuses = Vec::with_capacity(scenario.steps.len());

        for step in &scenario.steps {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            runner.reporter.step_started(&scenario.name, &step.name).await;

            let mut result = if step.action.as_str() == "wait" {
                run_wait_step(step, cancel).await
            } else {
                let devices = resolve_devices(runner, scenario, step);
                let platform = runner.drivers.network.get_platform(&scenario.platform).unwrap_or_default();
                dispatch_step(step, &devices, &runner.drivers, &runner.changesets, &platform, cancel).await
            };
            if repeat_count > 1 {
                result.name = format!("[iter {iteration}] {}", result.name);
            }

            runner.reporter.step_finished(&scenario.name, &result).await;
            let fail_fast = matches!(result.status, Status::Fail | Status::Error);
            iteration_statuses.push(result.status);
            all_steps.push(result);

            if fail_fast {
                break;
            }
        }

        final_status = if cancelled {
            Status::Error
        } else {
            scenario_status_from_steps(iteration_statuses)
        };

        if matches!(final_status, Status::Fail | Status::Error) {
            failed_iteration = Some(iteration);
            break 'repeat;
        }
    }

    let scenario_result = ScenarioResult {
        name: scenario.name.clone(),
        status: final_status,
        steps: all_steps,
        skip_reason: None,
        started_at,
        finished_at: Utc::now(),
        iteration: ran_iteration,
        failed_iteration,
    };
    runner.reporter.scenario_finished(&scenario_result).await;
    scenario_result
}

async fn run_wait_step(step: &newtest_model::Step, cancel: &CancellationToken) -> StepResult {
    let started_at = Utc::now();
    let duration = step.duration_param("duration").unwrap_or(std::time::Duration::from_secs(0));

    let status = tokio::select! {
        () = tokio::time::sleep(duration) => Status::Pass,
        () = cancel.cancelled() => Status::Error,
    };

    StepResult {
        name: step.name.clone(),
        action: "wait".to_owned(),
        status,
        devices: vec![DeviceResult {
            device: "-".to_owned(),
            status,
            message: if status == Status::Error {
                "interrupted".to_owned()
            } else {
                String::new()
            },
        }],
        started_at,
        finished_at: Utc::now(),
    }
}

/// Resolve a step's device list, skipping hosts for switch-scoped actions
/// and vice versa (spec.md §9, "Skipping hosts for switch actions").
fn resolve_devices<R: ProgressReporter>(
    runner: &Runner<R>,
    _scenario: &Scenario,
    step: &newtest_model::Step,
) -> Vec<String> {
    let scope = step.action.spec().scope;
    let all: Vec<String> = runner
        .drivers
        .network
        .list_nodes()
        .into_iter()
        .filter(|node| match scope {
            DeviceScope::SwitchOnly => node.role != DeviceRole::Host,
            DeviceScope::HostOnly => node.role == DeviceRole::Host,
            DeviceScope::None => true,
        })
        .map(|node| node.name)
        .collect();

    let resolved = step.devices_or_all().resolve(&all);
    if step.action.spec().kind == ExecutionKind::Standalone {
        return Vec::new();
    }
    resolved
}
