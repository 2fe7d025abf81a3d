//! `Step` — one action on zero or more devices (spec.md §3, "Step").

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{action::ActionName, expect::ExpectBlock, selector::DeviceSelector};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub action: ActionName,
    #[serde(default)]
    pub devices: Option<DeviceSelector>,
    #[serde(default)]
    pub expect: Option<ExpectBlock>,
    /// Free-form, action-specific parameters (spec.md §4.1: "which keys in
    /// a free-form `params` map are mandatory").
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

impl Step {
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    #[must_use]
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(serde_yaml::Value::as_u64)
    }

    #[must_use]
    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(serde_yaml::Value::as_i64)
    }

    /// `wait`'s `duration` param, parsed from either a bare seconds count or
    /// a `<n>s`/`<n>m`/`<n>h` suffix form.
    #[must_use]
    pub fn duration_param(&self, key: &str) -> Option<Duration> {
        if let Some(secs) = self.param_u64(key) {
            return Some(Duration::from_secs(secs));
        }
        let raw = self.param_str(key)?;
        parse_duration_suffix(raw)
    }

    #[must_use]
    pub fn devices_or_all(&self) -> DeviceSelector {
        self.devices.clone().unwrap_or(DeviceSelector::All)
    }
}

fn parse_duration_suffix(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit())?);
    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_param_parses_bare_seconds() {
        let step: Step = serde_yaml::from_str(
            "name: w\naction: wait\nparams:\n  duration: 5\n",
        )
        .unwrap();
        assert_eq!(step.duration_param("duration"), Some(Duration::from_secs(5)));
    }

    #[test]
    fn duration_param_parses_suffixed_form() {
        let step: Step = serde_yaml::from_str(
            "name: w\naction: wait\nparams:\n  duration: \"2m\"\n",
        )
        .unwrap();
        assert_eq!(
            step.duration_param("duration"),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn unknown_action_rejected_at_parse_time() {
        let result: Result<Step, _> =
            serde_yaml::from_str("name: w\naction: not-a-real-action\n");
        assert!(result.is_err());
    }
}
