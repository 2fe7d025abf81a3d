//! `newtest start [suite] [--scenario NAME] [--no-deploy] [--junit PATH]`
//! (spec.md §6: "deploy + run; defaults to `--all` when no scenario
//! selector; resumes if state is `paused`").

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use newtest_core::graph::DependencyGraph;
use newtest_core::state::{RunState, RunStatus, Store};
use newtest_core::{
    load_suite, DeploymentMode, LoadedSuite, Runner, RunnerConfig, ScenarioError, SuiteResult,
};
use newtest_core::reporter::{ConsoleReporter, StateReporter};
use newtest_report::exit_code_for;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::EXIT_CLI_ERROR;
use crate::{select, topology};

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Bare suite name (resolved under `NEWTEST_SUITES_BASE`) or a path
    /// to a suite directory. Defaults to `NEWTEST_SUITE`.
    pub suite: Option<String>,

    /// Run a single scenario by name instead of the whole suite.
    #[arg(long)]
    pub scenario: Option<String>,

    /// Skip `LabDriver::deploy`; assume the topology is already up.
    #[arg(long)]
    pub no_deploy: bool,

    /// Also emit a JUnit XML report at this path.
    #[arg(long)]
    pub junit: Option<PathBuf>,
}

pub async fn run(args: StartArgs, verbose: bool, quiet: bool) -> anyhow::Result<i32> {
    let suite_dir = resolve_suite_dir(args.suite.as_deref())?;

    let loaded = match load_suite(&suite_dir).await {
        Ok(loaded) => loaded,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
    };

    let selected = match select::select(&loaded, args.scenario.as_deref()) {
        Ok(selected) => selected,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
    };

    let scenarios: Vec<_> = selected.into_iter().cloned().collect();
    let graph = DependencyGraph::build(&scenarios);
    let loaded = LoadedSuite {
        suite: loaded.suite,
        scenarios,
        graph,
    };

    let Some(first) = loaded.scenarios.first() else {
        eprintln!("error: suite has no scenarios to run");
        return Ok(EXIT_CLI_ERROR);
    };
    let topology_name = first.topology.clone();
    if loaded.scenarios.iter().any(|s| s.topology != topology_name) {
        warn!("scenarios in this suite reference different topologies; running against '{topology_name}' only");
    }
    let deployment_mode = if loaded.scenarios.iter().all(|s| s.topology == topology_name) {
        DeploymentMode::Shared
    } else {
        DeploymentMode::Independent
    };

    let (drivers, lab) = match topology::load(&newtest_env::topologies_base(), &topology_name) {
        Ok(pair) => pair,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
    };

    let suite_name = loaded.suite.name().to_owned();
    let store = Store::new(&suite_name);
    if let Err(error) = store.acquire_lock(&suite_name).await {
        eprintln!("error: {error}");
        return Ok(EXIT_CLI_ERROR);
    }

    let result = run_locked(
        &loaded,
        drivers,
        lab,
        &store,
        &suite_name,
        deployment_mode,
        args.no_deploy,
        verbose,
        quiet,
    )
    .await;

    if let Err(error) = store.release_lock().await {
        warn!(%error, "failed to release run lock");
    }

    let (state, outcome) = match result {
        Ok(pair) => pair,
        Err(ScenarioError::Load(error)) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
        Err(ScenarioError::State(error)) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
        Err(ScenarioError::Infra(error)) => {
            eprintln!("error: {error}");
            return Ok(2);
        }
        Err(ScenarioError::Cancelled) => {
            eprintln!("run cancelled");
            return Ok(2);
        }
    };

    write_reports(&outcome, args.junit.as_deref()).await;

    if !quiet {
        let color = !newtest_env::color_disabled();
        println!("{}", newtest_report::console::render(&outcome.scenarios, color));
    }

    if state.status == RunStatus::Paused {
        println!("paused; resume with: newtest start {suite_name}");
        return Ok(0);
    }

    Ok(exit_code_for(&outcome))
}

#[allow(clippy::too_many_arguments)]
async fn run_locked(
    loaded: &LoadedSuite,
    drivers: newtest_core::DriverSet,
    lab: Arc<dyn newtest_core::drivers::LabDriver>,
    store: &Store,
    suite_name: &str,
    deployment_mode: DeploymentMode,
    no_deploy: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(RunState, SuiteResult), ScenarioError> {
    let resume_from = match store.try_load().await {
        Ok(Some(state)) if state.status == RunStatus::Paused => Some(state),
        Ok(_) => None,
        Err(error) => return Err(ScenarioError::State(error)),
    };

    let declared_order: Vec<String> = loaded.scenarios.iter().map(|s| s.name.clone()).collect();
    let initial_state = resume_from.clone().unwrap_or_else(|| {
        RunState::new(
            suite_name,
            loaded.suite.dir().to_path_buf(),
            loaded.scenarios.first().map_or_else(String::new, |s| s.topology.clone()),
            loaded.scenarios.first().map_or_else(String::new, |s| s.platform.clone()),
            std::process::id(),
            declared_order,
            chrono::Utc::now(),
        )
    });

    let console = ConsoleReporter::new(verbose, quiet);
    let state_store = Store::new(suite_name);
    let reporter = Arc::new(StateReporter::new(console, state_store, initial_state));

    let config = RunnerConfig {
        deployment_mode,
        no_deploy,
    };
    let store_for_runner = Store::new(suite_name);
    let runner = Runner::new(lab, drivers, reporter, store_for_runner, config);

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, requesting graceful stop");
            cancel_for_signal.cancel();
        }
    });

    newtest_core::runner::phases::run_suite(&runner, loaded, &cancel, resume_from.as_ref()).await
}

async fn write_reports(outcome: &SuiteResult, junit_path: Option<&std::path::Path>) {
    let report_dir = std::path::Path::new("newtest/.generated");
    if let Err(error) = tokio::fs::create_dir_all(report_dir).await {
        warn!(%error, "failed to create report directory");
        return;
    }
    let markdown = newtest_report::markdown::render(&outcome.scenarios);
    if let Err(error) = tokio::fs::write(report_dir.join("report.md"), markdown).await {
        warn!(%error, "failed to write markdown report");
    }

    if let Some(path) = junit_path {
        match newtest_report::junit::render(&outcome.scenarios) {
            Ok(xml) => {
                if let Err(error) = tokio::fs::write(path, xml).await {
                    warn!(%error, path = %path.display(), "failed to write junit report");
                }
            }
            Err(error) => warn!(%error, "failed to render junit report"),
        }
    }
}

pub(crate) fn resolve_suite_dir(suite: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(suite) = suite {
        let as_path = PathBuf::from(suite);
        if as_path.is_dir() {
            return Ok(as_path);
        }
        return Ok(newtest_env::suites_base().join(suite));
    }
    if let Some(default) = newtest_env::default_suite() {
        return Ok(default);
    }
    anyhow::bail!("no suite specified: pass a suite name/path or set NEWTEST_SUITE")
}
