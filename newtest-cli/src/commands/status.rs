//! `newtest status [--dir|--suite|--json|--detail|--monitor]` (spec.md
//! §6: "render RunState").

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use newtest_core::state::{RunState, RunStatus, Store};

use crate::commands::EXIT_CLI_ERROR;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Suite name to key run-state lookup (mutually exclusive with `--dir`).
    #[arg(long)]
    pub suite: Option<String>,

    /// Explicit state directory, bypassing suite-name resolution.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Emit the raw RunState as JSON instead of a formatted summary.
    #[arg(long)]
    pub json: bool,

    /// Include per-scenario skip reasons and failed-iteration detail.
    #[arg(long)]
    pub detail: bool,

    /// Poll and reprint until the run reaches a terminal status.
    #[arg(long)]
    pub monitor: bool,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<i32> {
    let store = if let Some(dir) = args.dir.clone() {
        Store::for_dir(dir)
    } else {
        let suite_name = super::resolve_suite_name(args.suite.as_deref())?;
        Store::new(&suite_name)
    };

    loop {
        let state = match store.try_load().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                eprintln!("no run-state found");
                return Ok(EXIT_CLI_ERROR);
            }
            Err(error) => {
                eprintln!("error: {error}");
                return Ok(EXIT_CLI_ERROR);
            }
        };

        render(&state, args.json, args.detail)?;

        let terminal = matches!(
            state.status,
            RunStatus::Complete | RunStatus::Failed | RunStatus::Aborted
        );
        if !args.monitor || terminal {
            break;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    Ok(0)
}

fn render(state: &RunState, json: bool, detail: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    println!(
        "suite={} status={:?} topology={} platform={}",
        state.suite, state.status, state.topology, state.platform
    );
    for scenario in &state.scenarios {
        let status = scenario.status.map_or_else(|| "-".to_owned(), |s| format!("{s:?}"));
        print!("  {:<30} {:<8} {}ms", scenario.name, status, scenario.duration_ms);
        if detail {
            if let Some(reason) = &scenario.skip_reason {
                print!("  ({reason})");
            }
        }
        println!();
    }
    Ok(())
}
