//! Feature-capability gating, applied once at the scenario boundary
//! rather than inside individual executors (spec.md §4.3, "Platform
//! feature gating").

use newtest_model::Scenario;

use crate::drivers::Platform;

/// Every tag in `scenario.requires_features` must be present on the
/// platform profile; an explicit platform override always wins over the
/// scenario's own declared platform (spec.md §4.3, "explicit override
/// beats scenario field").
#[must_use]
pub fn missing_features(scenario: &Scenario, platform: &Platform) -> Vec<String> {
    scenario
        .requires_features
        .iter()
        .filter(|tag| !platform.supports_feature(tag))
        .cloned()
        .collect()
}

/// `verify-ping` alone probes the dataplane at the step level instead of
/// being gated at the scenario boundary (spec.md §4.3, exception clause).
#[must_use]
pub fn has_dataplane(platform: &Platform) -> bool {
    platform.has_dataplane()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_requiring(features: &[&str]) -> Scenario {
        Scenario {
            name: "s".to_owned(),
            description: String::new(),
            topology: "t".to_owned(),
            platform: "p".to_owned(),
            requires: Vec::new(),
            requires_features: features.iter().map(|s| (*s).to_owned()).collect(),
            repeat: 0,
            steps: Vec::new(),
        }
    }

    #[test]
    fn missing_features_reports_unsupported_tags() {
        let platform = Platform {
            dataplane: None,
            features: vec!["evpn".to_owned()],
        };
        let scenario = scenario_requiring(&["evpn", "mclag"]);
        assert_eq!(missing_features(&scenario, &platform), vec!["mclag".to_owned()]);
    }

    #[test]
    fn no_missing_features_when_all_supported() {
        let platform = Platform {
            dataplane: None,
            features: vec!["evpn".to_owned(), "mclag".to_owned()],
        };
        let scenario = scenario_requiring(&["evpn"]);
        assert!(missing_features(&scenario, &platform).is_empty());
    }
}
