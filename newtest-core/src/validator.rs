//! Table-driven validation: every rule reads off [`newtest_model::ActionSpec`]
//! so the checks here can never drift from what the dispatcher actually
//! requires (spec.md §9, "Action registry" design note).

use newtest_model::{DeviceSelector, Scenario};

use crate::error::ValidationError;

/// Validate one already-defaulted scenario, collecting every violation
/// rather than stopping at the first (spec.md §4.1).
pub fn validate_scenario(scenario: &Scenario) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if scenario.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    if scenario.topology.trim().is_empty() {
        errors.push(ValidationError::EmptyTopology {
            scenario: scenario.name.clone(),
        });
    }
    if scenario.platform.trim().is_empty() {
        errors.push(ValidationError::EmptyPlatform {
            scenario: scenario.name.clone(),
        });
    }

    for step in &scenario.steps {
        let spec = step.action.spec();

        if spec.requires_expect && step.expect.is_none() {
            errors.push(ValidationError::MissingExpect {
                scenario: scenario.name.clone(),
                step: step.name.clone(),
                action: spec.name.to_owned(),
            });
        }

        for required in spec.required_params {
            if !step.params.contains_key(*required) {
                errors.push(ValidationError::MissingParam {
                    scenario: scenario.name.clone(),
                    step: step.name.clone(),
                    action: spec.name.to_owned(),
                    param: (*required).to_owned(),
                });
            }
        }

        if spec.single_device {
            let selector = step.devices_or_all();
            if let DeviceSelector::List(names) = &selector {
                if names.len() != 1 {
                    errors.push(ValidationError::TooManyDevices {
                        scenario: scenario.name.clone(),
                        step: step.name.clone(),
                        action: spec.name.to_owned(),
                        count: names.len(),
                    });
                }
            }
        }
    }

    errors
}

/// Cross-scenario checks: duplicate names and `requires` pointing at
/// scenarios that don't exist (cycles are detected separately by
/// [`crate::graph`], which needs the full set anyway).
pub fn validate_suite(scenarios: &[Scenario]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let names: std::collections::HashSet<&str> =
        scenarios.iter().map(|s| s.name.as_str()).collect();

    for scenario in scenarios {
        if !seen.insert(scenario.name.as_str()) {
            errors.push(ValidationError::DuplicateScenario(scenario.name.clone()));
        }
        for dep in &scenario.requires {
            if !names.contains(dep.as_str()) {
                errors.push(ValidationError::UnknownDependency {
                    scenario: scenario.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        errors.extend(validate_scenario(scenario));
    }

    errors
}

#[cfg(test)]
mod tests {
    use newtest_model::Step;

    use super::*;

    fn scenario_from_yaml(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn missing_required_param_is_caught() {
        let scenario = scenario_from_yaml(
            "name: s\ntopology: t\nplatform: p\nsteps:\n  - name: step1\n    action: create-vlan\n",
        );
        let errors = validate_scenario(&scenario);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingParam { param, .. } if param == "vlan_id")));
    }

    #[test]
    fn missing_expect_is_caught() {
        let scenario = scenario_from_yaml(
            "name: s\ntopology: t\nplatform: p\nsteps:\n  - name: step1\n    action: verify-config-db\n    params:\n      table: CONFIG\n",
        );
        let errors = validate_scenario(&scenario);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingExpect { .. })));
    }

    #[test]
    fn single_device_action_rejects_multiple_devices() {
        let scenario = scenario_from_yaml(
            "name: s\ntopology: t\nplatform: p\nsteps:\n  - name: step1\n    action: host-exec\n    devices: [h1, h2]\n    params:\n      command: echo hi\n",
        );
        let errors = validate_scenario(&scenario);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::TooManyDevices { count: 2, .. })));
    }

    #[test]
    fn valid_scenario_has_no_errors() {
        let scenario = scenario_from_yaml(
            "name: s\ntopology: t\nplatform: p\nsteps:\n  - name: step1\n    action: host-exec\n    devices: [h1]\n    params:\n      command: echo hi\n",
        );
        assert!(validate_scenario(&scenario).is_empty());
    }

    #[test]
    fn unknown_dependency_is_caught() {
        let scenarios = vec![scenario_from_yaml(
            "name: s\ntopology: t\nplatform: p\nrequires: [missing]\nsteps: []\n",
        )];
        let errors = validate_suite(&scenarios);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownDependency { .. })));
    }

    #[test]
    fn empty_topology_and_platform_are_caught() {
        let scenario = scenario_from_yaml("name: s\ntopology: \"\"\nplatform: \"\"\nsteps: []\n");
        let errors = validate_scenario(&scenario);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyTopology { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyPlatform { .. })));
    }

    #[test]
    fn duplicate_scenario_name_is_caught() {
        let scenarios = vec![
            scenario_from_yaml("name: s\ntopology: t\nplatform: p\nsteps: []\n"),
            scenario_from_yaml("name: s\ntopology: t\nplatform: p\nsteps: []\n"),
        ];
        let errors = validate_suite(&scenarios);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateScenario(name) if name == "s")));
    }
}
