//! End-to-end coverage of the `newtest` subcommands, exercising them as a
//! library so each test owns its own suite/topology/state directories
//! without spawning the compiled binary.

use std::sync::Mutex;

use newtest_cli::commands;
use newtest_cli::commands::actions::ActionsArgs;
use newtest_cli::commands::list::ListArgs;
use newtest_cli::commands::status::StatusArgs;
use newtest_core::state::{RunState, Store};

/// `NEWTEST_TOPOLOGIES` is process-wide; serialize the tests that touch it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_scenario(dir: &std::path::Path, file: &str, yaml: &str) {
    std::fs::write(dir.join(file), yaml).unwrap();
}

#[tokio::test]
async fn list_reports_scenarios_from_an_explicit_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_scenario(
        dir.path(),
        "smoke.yaml",
        "name: smoke\ntopology: leaf-spine\nplatform: sonic\nsteps:\n  - name: pause\n    action: wait\n    params:\n      duration: 0s\n",
    );

    let args = ListArgs {
        suite: Some(dir.path().to_string_lossy().into_owned()),
    };
    let code = commands::list::run(args).await.unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn list_surfaces_a_cli_error_for_an_empty_suite_directory() {
    let dir = tempfile::tempdir().unwrap();

    let args = ListArgs {
        suite: Some(dir.path().to_string_lossy().into_owned()),
    };
    let code = commands::list::run(args).await.unwrap();
    assert_eq!(code, commands::EXIT_CLI_ERROR);
}

#[tokio::test]
async fn actions_without_a_name_lists_the_whole_registry() {
    let code = commands::actions::run(ActionsArgs { name: None }).await.unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn actions_describes_a_known_action() {
    let code = commands::actions::run(ActionsArgs {
        name: Some("wait".to_owned()),
    })
    .await
    .unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn actions_rejects_an_unknown_action() {
    let code = commands::actions::run(ActionsArgs {
        name: Some("levitate".to_owned()),
    })
    .await
    .unwrap();
    assert_eq!(code, commands::EXIT_CLI_ERROR);
}

#[tokio::test]
async fn topologies_lists_bundles_under_the_configured_base() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("leaf-spine")).unwrap();
    std::fs::create_dir_all(dir.path().join("single-rack")).unwrap();

    // SAFETY: serialized by ENV_LOCK for the duration of this test.
    unsafe {
        std::env::set_var(newtest_env::NEWTEST_TOPOLOGIES, dir.path());
    }
    let code = commands::topologies::run().await.unwrap();
    unsafe {
        std::env::remove_var(newtest_env::NEWTEST_TOPOLOGIES);
    }
    assert_eq!(code, 0);
}

#[tokio::test]
async fn status_reports_a_cli_error_when_no_state_exists() {
    let dir = tempfile::tempdir().unwrap();
    let args = StatusArgs {
        suite: None,
        dir: Some(dir.path().to_path_buf()),
        json: false,
        detail: false,
        monitor: false,
    };
    let code = commands::status::run(args).await.unwrap();
    assert_eq!(code, commands::EXIT_CLI_ERROR);
}

#[tokio::test]
async fn status_renders_an_existing_state_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::for_dir(dir.path().to_path_buf());
    let state = RunState::new(
        "fabric-smoke",
        dir.path().to_path_buf(),
        "leaf-spine",
        "sonic",
        std::process::id(),
        vec!["smoke".to_owned()],
        chrono::Utc::now(),
    );
    store.save(&state).await.unwrap();

    let args = StatusArgs {
        suite: None,
        dir: Some(dir.path().to_path_buf()),
        json: true,
        detail: false,
        monitor: false,
    };
    let code = commands::status::run(args).await.unwrap();
    assert_eq!(code, 0);
}
