//! Final console report: one section per scenario plus a summary line
//! (spec.md §4.7, "Console").

use std::fmt::Write as _;

use newtest_core::{ScenarioResult, Status, StepResult};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

fn paint(color: bool, code: &str, text: &str) -> String {
    if color {
        format!("{code}{text}{RESET}")
    } else {
        text.to_owned()
    }
}

fn status_label(status: Status, color: bool) -> String {
    match status {
        Status::Pass => paint(color, GREEN, "PASS"),
        Status::Fail => paint(color, RED, "FAIL"),
        Status::Error => paint(color, RED, "ERROR"),
        Status::Skip => paint(color, YELLOW, "SKIP"),
    }
}

/// Render the final report for a completed suite run. `color` should be
/// `false` when `NO_COLOR` is set (`newtest_env::color_disabled`).
#[must_use]
pub fn render(scenarios: &[ScenarioResult], color: bool) -> String {
    let mut out = String::new();

    for scenario in scenarios {
        let _ = writeln!(
            out,
            "== {} [{}] ==",
            scenario.name,
            status_label(scenario.status, color)
        );
        if let Some(reason) = &scenario.skip_reason {
            let _ = writeln!(out, "  {reason}");
        }
        if let Some(failed) = scenario.failed_iteration {
            let _ = writeln!(out, "  repeat={}, failed on iteration {failed}", scenario.iteration);
        }

        let iter_prefix = scenario.failed_iteration.map(|n| format!("[iter {n}] "));
        for step in scenario
            .steps
            .iter()
            .filter(|step| iter_prefix.as_ref().is_none_or(|prefix| step.name.starts_with(prefix.as_str())))
        {
            let _ = writeln!(
                out,
                "  - {} [{}] ({} ms)",
                step.name,
                status_label(step.status, color),
                step.duration_ms()
            );
            for device in &step.devices {
                if device.status != Status::Pass && !device.message.is_empty() {
                    let _ = writeln!(out, "      {}: {}", device.device, device.message);
                }
            }
        }
        out.push('\n');
    }

    let mut counts = std::collections::BTreeMap::new();
    for scenario in scenarios {
        *counts.entry(scenario.status).or_insert(0_usize) += 1;
    }
    let _ = write!(out, "summary:");
    for status in [Status::Pass, Status::Fail, Status::Error, Status::Skip] {
        let count = counts.get(&status).copied().unwrap_or(0);
        let _ = write!(out, " {}={count}", status_label(status, color));
    }
    out.push('\n');

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newtest_core::DeviceResult;

    fn step(name: &str, status: Status) -> StepResult {
        let now = Utc::now();
        StepResult {
            name: name.to_owned(),
            action: "verify-bgp".to_owned(),
            status,
            devices: vec![DeviceResult {
                device: "leaf1".to_owned(),
                status,
                message: if status == Status::Pass {
                    String::new()
                } else {
                    "bgp session down".to_owned()
                },
            }],
            started_at: now,
            finished_at: now,
        }
    }

    fn scenario(name: &str, status: Status, steps: Vec<StepResult>) -> ScenarioResult {
        let now = Utc::now();
        ScenarioResult {
            name: name.to_owned(),
            status,
            steps,
            skip_reason: None,
            started_at: now,
            finished_at: now,
            iteration: 1,
            failed_iteration: None,
        }
    }

    #[test]
    fn render_includes_scenario_name_and_summary() {
        let scenarios = vec![scenario("vlan-smoke", Status::Pass, vec![step("apply", Status::Pass)])];
        let text = render(&scenarios, false);
        assert!(text.contains("vlan-smoke"));
        assert!(text.contains("summary:"));
    }

    #[test]
    fn render_shows_failing_device_message() {
        let scenarios = vec![scenario(
            "bgp-check",
            Status::Fail,
            vec![step("verify", Status::Fail)],
        )];
        let text = render(&scenarios, false);
        assert!(text.contains("bgp session down"));
    }

    #[test]
    fn no_color_omits_ansi_codes() {
        let scenarios = vec![scenario("vlan-smoke", Status::Pass, vec![step("apply", Status::Pass)])];
        let text = render(&scenarios, false);
        assert!(!text.contains('\x1b'));
    }
}
