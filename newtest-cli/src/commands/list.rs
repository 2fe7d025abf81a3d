//! `newtest list [suite]` (spec.md §6: discovery — enumerate a suite's
//! scenarios).

use clap::Args;
use newtest_core::load_suite;

use crate::commands::EXIT_CLI_ERROR;

#[derive(Debug, Args)]
pub struct ListArgs {
    pub suite: Option<String>,
}

pub async fn run(args: ListArgs) -> anyhow::Result<i32> {
    let suite_dir = super::start::resolve_suite_dir(args.suite.as_deref())?;

    let loaded = match load_suite(&suite_dir).await {
        Ok(loaded) => loaded,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(EXIT_CLI_ERROR);
        }
    };

    for scenario in &loaded.scenarios {
        let requires = if scenario.requires.is_empty() {
            String::new()
        } else {
            format!(" requires=[{}]", scenario.requires.join(", "))
        };
        println!(
            "{:<30} topology={} platform={} steps={}{requires}",
            scenario.name,
            scenario.topology,
            scenario.platform,
            scenario.steps.len()
        );
    }
    Ok(0)
}
