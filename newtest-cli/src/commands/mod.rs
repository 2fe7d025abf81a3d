//! One module per CLI subcommand, each exposing a `run(...)` that returns
//! the process exit code (spec.md §7: "Implemented via sentinel errors
//! returned from command bodies so deferred cleanup... runs before
//! process termination" — here, every command's own `run` performs its
//! cleanup on every exit path before handing `main` a plain exit code).

pub mod actions;
pub mod list;
pub mod pause;
pub mod start;
pub mod status;
pub mod stop;
pub mod topologies;

/// CLI-level failure that never ran a scenario (bad suite dir, validation
/// error, lock contention): spec.md §7, "aborts suite before any
/// execution; CLI-level error exit (non-zero, not 1 or 2)".
pub const EXIT_CLI_ERROR: i32 = 3;

/// Resolve the suite name used to key run-state, for commands that act
/// on an already-running suite rather than loading its scenario files.
pub fn resolve_suite_name(suite: Option<&str>) -> anyhow::Result<String> {
    if let Some(suite) = suite {
        return Ok(newtest_model::Suite::from_dir(std::path::Path::new(suite))
            .name()
            .to_owned());
    }
    if let Some(default) = newtest_env::default_suite() {
        return Ok(newtest_model::Suite::from_dir(&default).name().to_owned());
    }
    anyhow::bail!("no suite specified: pass a suite name/path or set NEWTEST_SUITE")
}
