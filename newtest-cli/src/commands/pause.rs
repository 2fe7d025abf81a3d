//! `newtest pause [suite]` (spec.md §4.3, "pause semantics": a sidecar
//! process loads the state, confirms `running` and a live PID, writes
//! `pausing`; the runner picks this up at its next between-scenarios
//! check).

use clap::Args;
use newtest_core::state::{RunStatus, Store};

use crate::commands::EXIT_CLI_ERROR;

#[derive(Debug, Args)]
pub struct PauseArgs {
    pub suite: Option<String>,
}

pub async fn run(args: PauseArgs) -> anyhow::Result<i32> {
    let suite_name = super::resolve_suite_name(args.suite.as_deref())?;
    let store = Store::new(&suite_name);

    let mut state = match store.try_load().await {
        Ok(Some(state)) => state,
        Ok(None) => {
            eprintln!("error: no run-state found for suite '{suite_name}'");
            return Ok(EXIT_CLI_ERROR);
        }
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
    };

    if state.status != RunStatus::Running {
        eprintln!("error: suite '{suite_name}' is not running (status: {:?})", state.status);
        return Ok(EXIT_CLI_ERROR);
    }
    if !newtest_core::state::is_process_alive(state.pid) {
        eprintln!("error: suite '{suite_name}' has no live runner process");
        return Ok(EXIT_CLI_ERROR);
    }

    state.status = RunStatus::Pausing;
    state.updated_at = chrono::Utc::now();
    store.save(&state).await?;
    println!("pause requested for suite '{suite_name}'");
    Ok(0)
}
