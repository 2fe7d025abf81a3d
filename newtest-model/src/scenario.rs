//! `Scenario` — one YAML file; an ordered step list with metadata
//! (spec.md §3, "Scenario").

use serde::{Deserialize, Serialize};

use crate::step::Step;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub topology: String,
    pub platform: String,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub requires_features: Vec<String>,
    #[serde(default)]
    pub repeat: u32,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Effective repeat count: `0` and `1` both mean "run once"
    /// (spec.md §8, boundary cases).
    #[must_use]
    pub fn repeat_count(&self) -> u32 {
        self.repeat.max(1)
    }

    #[must_use]
    pub fn repeats(&self) -> bool {
        self.repeat_count() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_zero_and_one_both_run_once() {
        let mut scenario = bare_scenario();
        scenario.repeat = 0;
        assert_eq!(scenario.repeat_count(), 1);
        assert!(!scenario.repeats());

        scenario.repeat = 1;
        assert_eq!(scenario.repeat_count(), 1);
        assert!(!scenario.repeats());
    }

    #[test]
    fn repeat_above_one_is_preserved() {
        let mut scenario = bare_scenario();
        scenario.repeat = 5;
        assert_eq!(scenario.repeat_count(), 5);
        assert!(scenario.repeats());
    }

    fn bare_scenario() -> Scenario {
        Scenario {
            name: "a".to_owned(),
            description: String::new(),
            topology: "leaf-spine".to_owned(),
            platform: "sonic".to_owned(),
            requires: Vec::new(),
            requires_features: Vec::new(),
            repeat: 0,
            steps: Vec::new(),
        }
    }
}
