//! Markdown report: a summary table plus a Failures section (spec.md
//! §4.7, "Markdown").

use std::fmt::Write as _;

use newtest_core::{ScenarioResult, Status};

fn note(scenario: &ScenarioResult) -> String {
    if let Some(reason) = &scenario.skip_reason {
        return reason.clone();
    }
    if let Some(failed) = scenario.failed_iteration {
        return format!("iteration {failed}/{}", scenario.iteration);
    }
    String::new()
}

/// Render the Markdown report body (no surrounding frontmatter).
#[must_use]
pub fn render(scenarios: &[ScenarioResult]) -> String {
    let mut out = String::new();

    out.push_str("# Suite Report\n\n");
    out.push_str("| Scenario | Status | Duration (ms) | Note |\n");
    out.push_str("| --- | --- | --- | --- |\n");
    for scenario in scenarios {
        let _ = writeln!(
            out,
            "| {} | {:?} | {} | {} |",
            scenario.name,
            scenario.status,
            scenario.duration_ms(),
            note(scenario)
        );
    }

    let failures: Vec<&ScenarioResult> = scenarios
        .iter()
        .filter(|s| matches!(s.status, Status::Fail | Status::Error))
        .collect();

    if !failures.is_empty() {
        out.push_str("\n## Failures\n");
        for scenario in failures {
            let _ = writeln!(out, "\n### {}", scenario.name);
            for step in scenario.steps.iter().filter(|s| s.status != Status::Pass) {
                let _ = writeln!(out, "- **{}** ({:?})", step.name, step.status);
                for device in &step.devices {
                    if !device.message.is_empty() {
                        let _ = writeln!(out, "  - `{}`: {}", device.device, device.message);
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newtest_core::{DeviceResult, StepResult};

    fn failing_scenario() -> ScenarioResult {
        let now = Utc::now();
        ScenarioResult {
            name: "vlan-smoke".to_owned(),
            status: Status::Fail,
            steps: vec![StepResult {
                name: "verify".to_owned(),
                action: "verify-config-db".to_owned(),
                status: Status::Fail,
                devices: vec![DeviceResult {
                    device: "leaf1".to_owned(),
                    status: Status::Fail,
                    message: "expected vlan100 missing".to_owned(),
                }],
                started_at: now,
                finished_at: now,
            }],
            skip_reason: None,
            started_at: now,
            finished_at: now,
            iteration: 1,
            failed_iteration: Some(1),
        }
    }

    #[test]
    fn summary_table_lists_every_scenario() {
        let text = render(&[failing_scenario()]);
        assert!(text.contains("| vlan-smoke |"));
    }

    #[test]
    fn failures_section_expands_device_message() {
        let text = render(&[failing_scenario()]);
        assert!(text.contains("## Failures"));
        assert!(text.contains("expected vlan100 missing"));
    }

    #[test]
    fn passing_suite_has_no_failures_section() {
        let mut scenario = failing_scenario();
        scenario.status = Status::Pass;
        scenario.steps[0].status = Status::Pass;
        let text = render(&[scenario]);
        assert!(!text.contains("## Failures"));
    }
}
