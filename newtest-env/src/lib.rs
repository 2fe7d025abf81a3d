//! Environment variable names and host-path resolution honored across the
//! suite (spec.md §6, "Environment variables honored").

use std::{env, path::PathBuf};

/// Default suite path, consumed by `newtest start` when no path is given.
pub const NEWTEST_SUITE: &str = "NEWTEST_SUITE";

/// Base directory used to resolve a bare suite name into a directory.
pub const NEWTEST_SUITES_BASE: &str = "NEWTEST_SUITES_BASE";

/// Base directory for topology bundles (`<dir>/<topology>/specs/...`).
pub const NEWTEST_TOPOLOGIES: &str = "NEWTEST_TOPOLOGIES";

/// Presence (any value) disables ANSI escapes in console output.
pub const NO_COLOR: &str = "NO_COLOR";

const STATE_DIR_COMPONENTS: [&str; 2] = [".newtron", "newtest"];

/// `true` iff `NO_COLOR` is set to any value, per <https://no-color.org>.
#[must_use]
pub fn color_disabled() -> bool {
    env::var_os(NO_COLOR).is_some()
}

/// Root directory under which every suite's `state.json` lives:
/// `<home>/.newtron/newtest/`.
///
/// # Panics
/// Panics if the platform exposes no resolvable home directory; the state
/// store has nowhere sane to write otherwise.
#[must_use]
pub fn state_root() -> PathBuf {
    let mut path = dirs::home_dir().expect("resolvable home directory");
    for component in STATE_DIR_COMPONENTS {
        path.push(component);
    }
    path
}

/// `<state_root>/<suite>`.
#[must_use]
pub fn suite_state_dir(suite: &str) -> PathBuf {
    state_root().join(suite)
}

/// Resolve the suites base directory, falling back to the current directory.
#[must_use]
pub fn suites_base() -> PathBuf {
    env::var_os(NEWTEST_SUITES_BASE)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve the topologies base directory, falling back to `./topologies`.
#[must_use]
pub fn topologies_base() -> PathBuf {
    env::var_os(NEWTEST_TOPOLOGIES)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("topologies"))
}

/// Default suite path from `NEWTEST_SUITE`, if set.
#[must_use]
pub fn default_suite() -> Option<PathBuf> {
    env::var_os(NEWTEST_SUITE).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_state_dir_nests_under_state_root() {
        let dir = suite_state_dir("fabric-smoke");
        assert!(dir.ends_with(".newtron/newtest/fabric-smoke"));
    }

    #[test]
    fn suites_base_defaults_to_cwd() {
        // SAFETY: test runs single-threaded within this process's env guard.
        unsafe {
            env::remove_var(NEWTEST_SUITES_BASE);
        }
        assert_eq!(suites_base(), PathBuf::from("."));
    }
}
