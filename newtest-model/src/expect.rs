//! `expect:` block — a union of disjoint fields, one subset meaningful per
//! action (spec.md §3, "ExpectBlock"; §9, "Expect polymorphism").
//!
//! The source keeps every field on one wide record; we follow suit here
//! (the validator enforces which fields matter per action via
//! [`crate::action::ActionSpec::requires_expect`] and the per-action
//! param/field checks), but expose typed accessors so callers never read a
//! field meant for a different action family by mistake.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    AppDb,
    AsicDb,
}

impl Default for RouteSource {
    fn default() -> Self {
        Self::AppDb
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectBlock {
    // Structural assertions (verify-config-db, verify-state-db).
    #[serde(default)]
    pub min_entries: Option<u64>,
    #[serde(default)]
    pub exists: Option<bool>,
    #[serde(default)]
    pub fields: Option<BTreeMap<String, String>>,

    // Polling controls (every Poll-kind action).
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub poll_interval: Option<u64>,

    // Route assertions (verify-route).
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub nexthop_ip: Option<String>,
    #[serde(default)]
    pub source: Option<RouteSource>,

    // State target (verify-bgp, verify-interface-status, ...).
    #[serde(default)]
    pub state: Option<String>,

    // Ping (verify-ping).
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub count: Option<u32>,

    // Text (host-exec, ssh-command).
    #[serde(default)]
    pub contains: Option<String>,
}

impl ExpectBlock {
    #[must_use]
    pub fn timeout_secs_or(&self, default_secs: u64) -> u64 {
        self.timeout.unwrap_or(default_secs)
    }

    #[must_use]
    pub fn poll_interval_secs_or(&self, default_secs: u64) -> u64 {
        self.poll_interval.unwrap_or(default_secs)
    }

    #[must_use]
    pub fn state_or<'a>(&'a self, default_state: &'a str) -> &'a str {
        self.state.as_deref().unwrap_or(default_state)
    }

    #[must_use]
    pub fn source_or(&self, default_source: RouteSource) -> RouteSource {
        self.source.unwrap_or(default_source)
    }

    #[must_use]
    pub fn success_rate_or(&self, default_rate: f64) -> f64 {
        self.success_rate.unwrap_or(default_rate)
    }

    #[must_use]
    pub fn count_or(&self, default_count: u32) -> u32 {
        self.count.unwrap_or(default_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fall_back_when_unset() {
        let expect = ExpectBlock::default();
        assert_eq!(expect.timeout_secs_or(120), 120);
        assert_eq!(expect.poll_interval_secs_or(5), 5);
        assert_eq!(expect.state_or("Established"), "Established");
        assert_eq!(expect.source_or(RouteSource::AppDb), RouteSource::AppDb);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let expect = ExpectBlock {
            timeout: Some(60),
            state: Some("Idle".to_owned()),
            ..Default::default()
        };
        assert_eq!(expect.timeout_secs_or(120), 60);
        assert_eq!(expect.state_or("Established"), "Idle");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result: Result<ExpectBlock, _> = serde_yaml::from_str("bogus_field: true");
        assert!(result.is_err());
    }
}
