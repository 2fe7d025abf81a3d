//! Result types and the status-aggregation rules that roll per-device
//! outcomes up into a step, and per-step outcomes up into a scenario
//! (spec.md §4.6, "Status aggregation").

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    Error,
}

impl Status {
    /// Combine statuses from parallel devices/steps: worst status wins,
    /// with ERROR > FAIL > SKIP > PASS (spec.md §4.6).
    #[must_use]
    pub fn worst_of(statuses: impl IntoIterator<Item = Status>) -> Status {
        statuses
            .into_iter()
            .fold(Status::Pass, |acc, s| acc.combine(s))
    }

    #[must_use]
    pub fn combine(self, other: Status) -> Status {
        fn rank(s: Status) -> u8 {
            match s {
                Status::Pass => 0,
                Status::Skip => 1,
                Status::Fail => 2,
                Status::Error => 3,
            }
        }
        if rank(other) > rank(self) { other } else { self }
    }

    #[must_use]
    pub fn is_passing(self) -> bool {
        matches!(self, Status::Pass)
    }
}

/// Roll a scenario's step statuses up per spec.md §3: "Scenario status =
/// FAIL if any step failed; else ERROR if any step errored; else PASS" —
/// FAIL outranks ERROR here, the reverse of [`Status::worst_of`]'s
/// ordering (which governs device-within-step and suite-exit-code
/// aggregation instead).
#[must_use]
pub fn scenario_status_from_steps(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut saw_error = false;
    for status in statuses {
        match status {
            Status::Fail => return Status::Fail,
            Status::Error => saw_error = true,
            Status::Pass | Status::Skip => {}
        }
    }
    if saw_error { Status::Error } else { Status::Pass }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceResult {
    pub device: String,
    pub status: Status,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub action: String,
    pub status: Status,
    pub devices: Vec<DeviceResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StepResult {
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub status: Status,
    pub steps: Vec<StepResult>,
    pub skip_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iteration: u32,
    /// Which repeat iteration broke the loop, when `repeat > 1` and one
    /// iteration failed (spec.md §3, "Iteration failure stops the repeat
    /// loop; `failed_iteration` records which iteration broke").
    pub failed_iteration: Option<u32>,
}

impl ScenarioResult {
    #[must_use]
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status: Status::Skip,
            steps: Vec::new(),
            skip_reason: Some(reason.into()),
            started_at: at,
            finished_at: at,
            iteration: 1,
            failed_iteration: None,
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SuiteResult {
    pub scenarios: Vec<ScenarioResult>,
}

impl SuiteResult {
    #[must_use]
    pub fn overall_status(&self) -> Status {
        Status::worst_of(self.scenarios.iter().map(|s| s.status))
    }

    #[must_use]
    pub fn counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for scenario in &self.scenarios {
            *counts.entry(scenario.status).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_of_prefers_error_over_fail() {
        assert_eq!(
            Status::worst_of([Status::Pass, Status::Fail, Status::Error]),
            Status::Error
        );
    }

    #[test]
    fn worst_of_prefers_fail_over_skip() {
        assert_eq!(Status::worst_of([Status::Skip, Status::Fail]), Status::Fail);
    }

    #[test]
    fn worst_of_empty_is_pass() {
        assert_eq!(Status::worst_of([]), Status::Pass);
    }

    #[test]
    fn all_pass_is_pass() {
        assert_eq!(Status::worst_of([Status::Pass, Status::Pass]), Status::Pass);
    }

    #[test]
    fn scenario_aggregation_prefers_fail_over_error() {
        assert_eq!(
            scenario_status_from_steps([Status::Error, Status::Fail]),
            Status::Fail
        );
    }

    #[test]
    fn scenario_aggregation_is_error_without_fail() {
        assert_eq!(scenario_status_from_steps([Status::Pass, Status::Error]), Status::Error);
    }

    #[test]
    fn scenario_aggregation_ignores_skip() {
        assert_eq!(scenario_status_from_steps([Status::Skip, Status::Pass]), Status::Pass);
    }
}
