//! Exit-code policy (spec.md §7, "P7"): ERROR anywhere outranks FAIL
//! anywhere, which outranks a clean PASS/SKIP run.

use newtest_core::{Status, SuiteResult};

/// `0` on a clean run, `1` if any scenario FAILED without an ERROR
/// anywhere, `2` if any scenario ERRORED (infra failure or step error).
#[must_use]
pub fn exit_code_for(result: &SuiteResult) -> i32 {
    match result.overall_status() {
        Status::Error => 2,
        Status::Fail => 1,
        Status::Pass | Status::Skip => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newtest_core::ScenarioResult;

    fn scenario(status: Status) -> ScenarioResult {
        let now = Utc::now();
        ScenarioResult {
            name: "s".to_owned(),
            status,
            steps: Vec::new(),
            skip_reason: None,
            started_at: now,
            finished_at: now,
            iteration: 1,
            failed_iteration: None,
        }
    }

    #[test]
    fn all_pass_exits_zero() {
        let result = SuiteResult {
            scenarios: vec![scenario(Status::Pass), scenario(Status::Skip)],
        };
        assert_eq!(exit_code_for(&result), 0);
    }

    #[test]
    fn any_fail_exits_one() {
        let result = SuiteResult {
            scenarios: vec![scenario(Status::Pass), scenario(Status::Fail)],
        };
        assert_eq!(exit_code_for(&result), 1);
    }

    #[test]
    fn error_outranks_fail() {
        let result = SuiteResult {
            scenarios: vec![scenario(Status::Fail), scenario(Status::Error)],
        };
        assert_eq!(exit_code_for(&result), 2);
    }
}
