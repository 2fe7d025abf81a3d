//! JUnit XML report, serialized with `quick-xml`'s `serialize` feature
//! over serde-derived structs (spec.md §4.7, "JUnit XML").

use newtest_core::{ScenarioResult, Status};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename = "testsuites")]
pub struct TestSuites {
    #[serde(rename = "testsuite", default)]
    pub suites: Vec<TestSuite>,
}

#[derive(Serialize)]
pub struct TestSuite {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@tests")]
    pub tests: usize,
    #[serde(rename = "@failures")]
    pub failures: usize,
    #[serde(rename = "@errors")]
    pub errors: usize,
    #[serde(rename = "@skipped")]
    pub skipped: usize,
    #[serde(rename = "@time")]
    pub time: f64,
    #[serde(rename = "testcase", default)]
    pub cases: Vec<TestCase>,
}

#[derive(Serialize)]
pub struct TestCase {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@time")]
    pub time: f64,
    #[serde(rename = "failure", skip_serializing_if = "Option::is_none")]
    pub failure: Option<Message>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error: Option<Message>,
    #[serde(rename = "skipped", skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Message>,
}

#[derive(Serialize)]
pub struct Message {
    #[serde(rename = "@message")]
    pub message: String,
}

fn device_message(step: &newtest_core::StepResult) -> String {
    step.devices
        .iter()
        .filter(|d| !d.message.is_empty())
        .map(|d| format!("{}: {}", d.device, d.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn test_case_for(step: &newtest_core::StepResult) -> TestCase {
    let time = step.duration_ms() as f64 / 1000.0;
    let message = device_message(step);
    let mut case = TestCase {
        name: step.name.clone(),
        time,
        failure: None,
        error: None,
        skipped: None,
    };
    match step.status {
        Status::Pass => {}
        Status::Fail => case.failure = Some(Message { message }),
        Status::Error => case.error = Some(Message { message }),
        Status::Skip => case.skipped = Some(Message { message }),
    }
    case
}

/// Build one `<testsuite>` per scenario. A scenario-level skip (zero
/// steps) emits a single synthetic skipped case carrying the skip reason.
#[must_use]
pub fn suite_for(scenario: &ScenarioResult) -> TestSuite {
    let cases: Vec<TestCase> = if scenario.steps.is_empty() {
        vec![TestCase {
            name: scenario.name.clone(),
            time: 0.0,
            failure: None,
            error: None,
            skipped: Some(Message {
                message: scenario.skip_reason.clone().unwrap_or_default(),
            }),
        }]
    } else {
        scenario.steps.iter().map(test_case_for).collect()
    };

    let failures = cases.iter().filter(|c| c.failure.is_some()).count();
    let errors = cases.iter().filter(|c| c.error.is_some()).count();
    let skipped = cases.iter().filter(|c| c.skipped.is_some()).count();

    TestSuite {
        name: scenario.name.clone(),
        tests: cases.len(),
        failures,
        errors,
        skipped,
        time: scenario.duration_ms() as f64 / 1000.0,
        cases,
    }
}

/// Render the full JUnit XML document for a suite run.
///
/// # Errors
/// Returns an error if `quick-xml` fails to serialize the result tree,
/// which only happens on a writer failure (infallible for an in-memory
/// `String` in practice).
pub fn render(scenarios: &[ScenarioResult]) -> Result<String, quick_xml::SeError> {
    let suites = TestSuites {
        suites: scenarios.iter().map(suite_for).collect(),
    };
    let body = quick_xml::se::to_string(&suites)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newtest_core::{DeviceResult, StepResult};

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
                    "neighbor down".to_owned()
                },
            }],
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn scenario_skip_emits_synthetic_case() {
        let now = Utc::now();
        let scenario = ScenarioResult {
            name: "gated".to_owned(),
            status: Status::Skip,
            steps: Vec::new(),
            skip_reason: Some("does not support required features [dataplane]".to_owned()),
            started_at: now,
            finished_at: now,
            iteration: 1,
            failed_iteration: None,
        };
        let suite = suite_for(&scenario);
        assert_eq!(suite.cases.len(), 1);
        assert_eq!(suite.skipped, 1);
        assert!(suite.cases[0]
            .skipped
            .as_ref()
            .unwrap()
            .message
            .contains("dataplane"));
    }

    #[test]
    fn failing_step_counts_as_failure_not_error() {
        let now = Utc::now();
        let scenario = ScenarioResult {
            name: "bgp-check".to_owned(),
            status: Status::Fail,
            steps: vec![step("verify", Status::Fail)],
            skip_reason: None,
            started_at: now,
            finished_at: now,
            iteration: 1,
            failed_iteration: Some(1),
        };
        let suite = suite_for(&scenario);
        assert_eq!(suite.failures, 1);
        assert_eq!(suite.errors, 0);
    }

    #[test]
    fn render_produces_well_formed_xml_declaration() {
        let now = Utc::now();
        let scenario = ScenarioResult {
            name: "vlan-smoke".to_owned(),
            status: Status::Pass,
            steps: vec![step("apply", Status::Pass)],
            skip_reason: None,
            started_at: now,
            finished_at: now,
            iteration: 1,
            failed_iteration: None,
        };
        let xml = render(&[scenario]).expect("serialize");
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("testsuite"));
    }
}
