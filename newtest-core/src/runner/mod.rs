//! The scenario runner: five phases, unchanged from spec.md §4.4 —
//! Select → Sort → Choose deployment mode → Iterate scenarios → Finalize.

pub mod phases;

use std::sync::{Arc, Mutex};

use newtest_model::Scenario;

use crate::drivers::{ChangeSetMap, LabDriver};
use crate::dispatch::DriverSet;
use crate::reporter::ProgressReporter;
use crate::state::Store;

/// SHARED: one topology deployed once, reused by every scenario.
/// INDEPENDENT: deployed fresh before each scenario and torn down after
/// (spec.md §4.4, "SHARED vs INDEPENDENT deployment mode").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentMode {
    Shared,
    Independent,
}

pub struct RunnerConfig {
    pub deployment_mode: DeploymentMode,
    /// Skip `LabDriver::deploy` entirely and assume the topology is
    /// already up (spec.md §4.4, "no-deploy hint path").
    pub no_deploy: bool,
}

pub struct Runner<R: ProgressReporter> {
    pub lab: Arc<dyn LabDriver>,
    pub drivers: DriverSet,
    pub reporter: Arc<R>,
    pub store: Store,
    pub config: RunnerConfig,
    /// The shared ChangeSet map for the duration of a suite run (spec.md
    /// §3, "Ownership"): each mutating executor merges its device's
    /// `ChangeSet` in last-write-wins, and `verify-provisioning` diffs
    /// against it (spec.md §4.5 step 4).
    pub changesets: ChangeSetMap,
}

impl<R: ProgressReporter> Runner<R> {
    #[must_use]
    pub fn new(
        lab: Arc<dyn LabDriver>,
        drivers: DriverSet,
        reporter: Arc<R>,
        store: Store,
        config: RunnerConfig,
    ) -> Self {
        Self {
            lab,
            drivers,
            reporter,
            store,
            config,
            changesets: Arc::new(Mutex::new(std::collections::BTreeMap::new())),
        }
    }
}

/// Select + Sort phases: order the loaded scenario set topologically,
/// tie-broken by declared order (spec.md §4.4 step 1-2).
#[must_use]
pub fn ordered_scenarios<'a>(
    scenarios: &'a [Scenario],
    order: &[String],
) -> Vec<&'a Scenario> {
    order
        .iter()
        .filter_map(|name| scenarios.iter().find(|s| &s.name == name))
        .collect()
}
