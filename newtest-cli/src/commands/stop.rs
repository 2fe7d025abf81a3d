//! `newtest stop [suite]` (spec.md §6: "refuse if a runner is alive;
//! otherwise destroy topology via lab driver and remove state").

use clap::Args;
use newtest_core::state::{is_process_alive, Store};

use crate::commands::EXIT_CLI_ERROR;

#[derive(Debug, Args)]
pub struct StopArgs {
    pub suite: Option<String>,
}

pub async fn run(args: StopArgs) -> anyhow::Result<i32> {
    let suite_name = super::resolve_suite_name(args.suite.as_deref())?;
    let store = Store::new(&suite_name);

    let state = match store.try_load().await {
        Ok(Some(state)) => state,
        Ok(None) => {
            eprintln!("no run-state for suite '{suite_name}'; nothing to stop");
            return Ok(0);
        }
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
    };

    if is_process_alive(state.pid) {
        eprintln!("error: suite '{suite_name}' has a live runner (pid {}); pause it first", state.pid);
        return Ok(EXIT_CLI_ERROR);
    }

    match crate::topology::load(&newtest_env::topologies_base(), &state.topology) {
        Ok((_, lab)) => {
            if let Err(error) = lab.destroy().await {
                eprintln!("warning: failed to destroy topology: {error}");
            }
        }
        Err(error) => eprintln!("warning: could not load topology '{}' to destroy it: {error}", state.topology),
    }

    store.remove().await?;
    println!("suite '{suite_name}' stopped and state removed");
    Ok(0)
}
