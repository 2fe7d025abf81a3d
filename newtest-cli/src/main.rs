//! `newtest`: deploy + run declarative fabric end-to-end scenarios
//! (spec.md §6, "CLI surface"). Thin argument parsing and subcommand
//! dispatch; all behavior lives in `newtest-core`/`newtest-report`.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use newtest_cli::commands;
use newtest_cli::commands::actions::ActionsArgs;
use newtest_cli::commands::list::ListArgs;
use newtest_cli::commands::pause::PauseArgs;
use newtest_cli::commands::start::StartArgs;
use newtest_cli::commands::status::StatusArgs;
use newtest_cli::commands::stop::StopArgs;

#[derive(Debug, Parser)]
#[command(name = "newtest", version, about = "Deploy and run declarative network-fabric end-to-end scenarios")]
struct Cli {
    /// Emit per-step progress lines in addition to per-scenario ones.
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress passing-scenario progress lines.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Deploy the topology and run a suite's scenarios.
    Start(StartArgs),
    /// Request a graceful pause of a running suite.
    Pause(PauseArgs),
    /// Destroy the topology and remove run-state for a suite.
    Stop(StopArgs),
    /// Render a suite's run-state.
    Status(StatusArgs),
    /// List the scenarios in a suite.
    List(ListArgs),
    /// List available topology bundles.
    Topologies,
    /// List the action registry, or describe one action.
    Actions(ActionsArgs),
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(!newtest_env::color_disabled())
        .with_target(false)
        .init();

    match dispatch(cli).await {
        Ok(code) => exit_code_for(code),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn exit_code_for(code: i32) -> ExitCode {
    u8::try_from(code).map(ExitCode::from).unwrap_or(ExitCode::FAILURE)
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Start(args) => commands::start::run(args, cli.verbose, cli.quiet).await,
        Command::Pause(args) => commands::pause::run(args).await,
        Command::Stop(args) => commands::stop::run(args).await,
        Command::Status(args) => commands::status::run(args).await,
        Command::List(args) => commands::list::run(args).await,
        Command::Topologies => commands::topologies::run().await,
        Command::Actions(args) => commands::actions::run(args).await,
    }
}
