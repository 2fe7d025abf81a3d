//! `newtest actions [name]` (spec.md §6: discovery — list the action
//! registry, or describe one action in detail).

use clap::Args;
use newtest_model::action::ACTION_REGISTRY;
use newtest_model::find_spec;

use crate::commands::EXIT_CLI_ERROR;

#[derive(Debug, Args)]
pub struct ActionsArgs {
    pub name: Option<String>,
}

pub async fn run(args: ActionsArgs) -> anyhow::Result<i32> {
    let Some(name) = args.name else {
        for spec in ACTION_REGISTRY {
            println!("{:<28} {:?} {:?}", spec.name, spec.kind, spec.scope);
        }
        return Ok(0);
    };

    let Some(spec) = find_spec(&name) else {
        eprintln!("error: unknown action '{name}'");
        return Ok(EXIT_CLI_ERROR);
    };

    println!("name:            {}", spec.name);
    println!("kind:            {:?}", spec.kind);
    println!("scope:           {:?}", spec.scope);
    println!("single_device:   {}", spec.single_device);
    println!("requires_expect: {}", spec.requires_expect);
    println!(
        "required_params: {}",
        if spec.required_params.is_empty() {
            "-".to_owned()
        } else {
            spec.required_params.join(", ")
        }
    );
    Ok(0)
}
