//! In-memory `Network` fake backing device/platform/topology lookups.

use std::collections::BTreeMap;

use newtest_core::drivers::{HostProfile, Network, NodeInfo, Platform, TopologyInfo};

#[derive(Default)]
pub struct FakeNetwork {
    topology: TopologyInfo,
    platforms: BTreeMap<String, Platform>,
    host_profiles: BTreeMap<String, HostProfile>,
}

impl FakeNetwork {
    #[must_use]
    pub fn new(topology_name: impl Into<String>, nodes: Vec<NodeInfo>) -> Self {
        Self {
            topology: TopologyInfo {
                name: topology_name.into(),
                devices: nodes,
            },
            platforms: BTreeMap::new(),
            host_profiles: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_platform(mut self, name: impl Into<String>, platform: Platform) -> Self {
        self.platforms.insert(name.into(), platform);
        self
    }

    #[must_use]
    pub fn with_host_profile(mut self, device: impl Into<String>, profile: HostProfile) -> Self {
        self.host_profiles.insert(device.into(), profile);
        self
    }
}

impl Network for FakeNetwork {
    fn get_node(&self, name: &str) -> Option<NodeInfo> {
        self.topology.devices.iter().find(|n| n.name == name).cloned()
    }

    fn list_nodes(&self) -> Vec<NodeInfo> {
        self.topology.devices.clone()
    }

    fn get_platform(&self, name: &str) -> Option<Platform> {
        self.platforms.get(name).cloned()
    }

    fn get_topology(&self) -> TopologyInfo {
        self.topology.clone()
    }

    fn is_host_device(&self, name: &str) -> bool {
        self.get_node(name)
            .is_some_and(|n| n.role == newtest_core::drivers::DeviceRole::Host)
    }

    fn get_host_profile(&self, name: &str) -> Option<HostProfile> {
        self.host_profiles.get(name).cloned()
    }
}
