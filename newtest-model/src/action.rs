//! The action registry: one row per known `action` tag, table-driven
//! (spec.md §4.1, §4.5.1/§4.5.2, and the "Action registry" design note in
//! §9 — the validator and the dispatcher both derive their behavior from
//! this single table so the two cannot drift).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A registered action name, validated against [`ACTION_REGISTRY`] on
/// deserialization.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct ActionName(String);

impl ActionName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Look up the schema row for this action. Always present for a value
    /// that parsed successfully, since deserialization rejects unknown
    /// names.
    #[must_use]
    pub fn spec(&self) -> &'static ActionSpec {
        find_spec(&self.0).expect("ActionName always names a registered action")
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ActionName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if find_spec(&raw).is_none() {
            return Err(serde::de::Error::custom(format!(
                "unknown action: {raw}"
            )));
        }
        Ok(Self(raw))
    }
}

/// Category used by the dispatcher to pick the shared iteration helper
/// (spec.md §4.5.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecutionKind {
    /// `executeForDevices`: mutating action, aggregates ChangeSets.
    Mutate,
    /// `checkForDevices`: single-shot assertion, no polling.
    CheckOnce,
    /// `pollForDevices`: bounded polling against `expect.timeout`/`poll_interval`.
    Poll,
    /// Runs once, not iterated over devices (`wait`).
    Standalone,
}

/// Which device kind an action may run against (spec.md §9, "Skipping hosts
/// for switch actions" — two typed action sets rather than a runtime check).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceScope {
    SwitchOnly,
    HostOnly,
    None,
}

/// A single action's schema row: device requirements and mandatory `params`
/// keys (spec.md §4.1).
#[derive(Clone, Copy, Debug)]
pub struct ActionSpec {
    pub name: &'static str,
    pub kind: ExecutionKind,
    pub scope: DeviceScope,
    pub single_device: bool,
    pub requires_expect: bool,
    pub required_params: &'static [&'static str],
}

macro_rules! action {
    ($name:literal, $kind:ident, $scope:ident, single=$single:literal, expect=$expect:literal, params=[$($p:literal),* $(,)?]) => {
        ActionSpec {
            name: $name,
            kind: ExecutionKind::$kind,
            scope: DeviceScope::$scope,
            single_device: $single,
            requires_expect: $expect,
            required_params: &[$($p),*],
        }
    };
}

/// The full set of known actions. Order is insertion order; `actions()`
/// doctests assert there are no duplicate names.
pub static ACTION_REGISTRY: &[ActionSpec] = &[
    action!("wait", Standalone, None, single = false, expect = false, params = ["duration"]),
    action!("provision", Mutate, SwitchOnly, single = false, expect = false, params = ["config"]),
    action!("apply-baseline", Mutate, SwitchOnly, single = false, expect = false, params = []),
    action!("apply-frr-defaults", Mutate, SwitchOnly, single = false, expect = false, params = []),
    action!("verify-provisioning", CheckOnce, SwitchOnly, single = false, expect = false, params = []),
    action!("verify-config-db", CheckOnce, SwitchOnly, single = false, expect = true, params = ["table"]),
    action!("verify-health", CheckOnce, SwitchOnly, single = false, expect = false, params = []),
    action!("verify-state-db", Poll, SwitchOnly, single = false, expect = true, params = ["table", "key"]),
    action!("verify-bgp", Poll, SwitchOnly, single = false, expect = false, params = []),
    action!("verify-route", Poll, SwitchOnly, single = false, expect = true, params = ["prefix", "vrf"]),
    action!("verify-acl-hit-count", Poll, SwitchOnly, single = false, expect = true, params = ["acl_name"]),
    action!("verify-ping", Poll, SwitchOnly, single = false, expect = false, params = ["target"]),
    action!("host-exec", CheckOnce, HostOnly, single = true, expect = false, params = ["command"]),
    action!("ssh-command", CheckOnce, SwitchOnly, single = true, expect = false, params = ["command"]),
    action!("create-vlan", Mutate, SwitchOnly, single = false, expect = false, params = ["vlan_id"]),
    action!("delete-vlan", Mutate, SwitchOnly, single = false, expect = false, params = ["vlan_id"]),
    action!("bind-vlan-port", Mutate, SwitchOnly, single = false, expect = false, params = ["vlan_id", "port"]),
    action!("unbind-vlan-port", Mutate, SwitchOnly, single = false, expect = false, params = ["vlan_id", "port"]),
    action!("create-vrf", Mutate, SwitchOnly, single = false, expect = false, params = ["vrf_name"]),
    action!("delete-vrf", Mutate, SwitchOnly, single = false, expect = false, params = ["vrf_name"]),
    action!("bind-vrf-interface", Mutate, SwitchOnly, single = false, expect = false, params = ["vrf_name", "interface"]),
    action!("unbind-vrf-interface", Mutate, SwitchOnly, single = false, expect = false, params = ["vrf_name", "interface"]),
    action!("create-evpn-vni", Mutate, SwitchOnly, single = false, expect = false, params = ["vni", "vrf_name"]),
    action!("delete-evpn-vni", Mutate, SwitchOnly, single = false, expect = false, params = ["vni"]),
    action!("configure-qos", Mutate, SwitchOnly, single = false, expect = false, params = ["policy_name"]),
    action!("remove-qos", Mutate, SwitchOnly, single = false, expect = false, params = ["policy_name"]),
    action!("create-acl", Mutate, SwitchOnly, single = false, expect = false, params = ["acl_name"]),
    action!("delete-acl", Mutate, SwitchOnly, single = false, expect = false, params = ["acl_name"]),
    action!("apply-acl", Mutate, SwitchOnly, single = false, expect = false, params = ["acl_name", "interface"]),
    action!("remove-acl", Mutate, SwitchOnly, single = false, expect = false, params = ["acl_name", "interface"]),
    action!("create-bgp-neighbor", Mutate, SwitchOnly, single = false, expect = false, params = ["neighbor_ip", "remote_as"]),
    action!("remove-bgp-neighbor", Mutate, SwitchOnly, single = false, expect = false, params = ["neighbor_ip"]),
    action!("configure-bgp-timers", Mutate, SwitchOnly, single = false, expect = false, params = ["keepalive", "hold"]),
    action!("create-portchannel", Mutate, SwitchOnly, single = false, expect = false, params = ["portchannel_id"]),
    action!("delete-portchannel", Mutate, SwitchOnly, single = false, expect = false, params = ["portchannel_id"]),
    action!("bind-portchannel-member", Mutate, SwitchOnly, single = false, expect = false, params = ["portchannel_id", "port"]),
    action!("unbind-portchannel-member", Mutate, SwitchOnly, single = false, expect = false, params = ["portchannel_id", "port"]),
    action!("create-static-route", Mutate, SwitchOnly, single = false, expect = false, params = ["prefix", "nexthop"]),
    action!("delete-static-route", Mutate, SwitchOnly, single = false, expect = false, params = ["prefix"]),
    action!("create-service", Mutate, SwitchOnly, single = false, expect = false, params = ["service_name"]),
    action!("delete-service", Mutate, SwitchOnly, single = false, expect = false, params = ["service_name"]),
    action!("bind-service-vlan", Mutate, SwitchOnly, single = false, expect = false, params = ["service_name", "vlan_id"]),
    action!("create-mclag", Mutate, SwitchOnly, single = false, expect = false, params = ["domain_id"]),
    action!("delete-mclag", Mutate, SwitchOnly, single = false, expect = false, params = ["domain_id"]),
    action!("bind-mclag-member", Mutate, SwitchOnly, single = false, expect = false, params = ["domain_id", "port"]),
    action!("verify-interface-status", CheckOnce, SwitchOnly, single = false, expect = true, params = ["interface"]),
    action!("verify-lag-status", CheckOnce, SwitchOnly, single = false, expect = true, params = ["portchannel_id"]),
    action!("verify-mclag-status", CheckOnce, SwitchOnly, single = false, expect = true, params = ["domain_id"]),
    action!("capture-counters", CheckOnce, SwitchOnly, single = false, expect = false, params = []),
    action!("collect-tech-support", CheckOnce, SwitchOnly, single = false, expect = false, params = []),
];

#[must_use]
pub fn find_spec(name: &str) -> Option<&'static ActionSpec> {
    ACTION_REGISTRY.iter().find(|spec| spec.name == name)
}

#[must_use]
pub fn is_known_action(name: &str) -> bool {
    find_spec(name).is_some()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn registry_has_fifty_actions() {
        assert_eq!(ACTION_REGISTRY.len(), 50);
    }

    #[test]
    fn registry_has_no_duplicate_keys() {
        let mut seen = HashSet::new();
        for spec in ACTION_REGISTRY {
            assert!(seen.insert(spec.name), "duplicate action key: {}", spec.name);
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(find_spec("reboot-the-universe").is_none());
    }
}
