//! Loads `<topologiesDir>/<topology>/specs/{topology,platforms}.json`
//! and builds the in-memory driver set the runner operates against
//! (spec.md §6, "File layout consumed"). Real device/lab drivers are
//! outside this crate's scope (spec.md §1); this wires `newtest-testkit`'s
//! fakes, seeded from the topology file, as the concrete collaborator
//! layer this binary ships with.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use newtest_core::drivers::{DeviceRole, LabDriver, NodeInfo, Platform};
use newtest_core::DriverSet;
use newtest_testkit::{DriverSetBuilder, FakeDevice, FakeLab, FakeNetwork};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TopologyFile {
    devices: Vec<TopologyDevice>,
}

#[derive(Debug, Deserialize)]
struct TopologyDevice {
    name: String,
    role: String,
    #[serde(default)]
    loopback_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlatformEntry {
    #[serde(default)]
    dataplane: Option<String>,
    #[serde(default)]
    features: Vec<String>,
}

fn parse_role(role: &str) -> DeviceRole {
    match role {
        "spine" => DeviceRole::Spine,
        "server" => DeviceRole::Server,
        "host" => DeviceRole::Host,
        _ => DeviceRole::Leaf,
    }
}

/// Read a topology bundle and assemble a [`DriverSet`] plus a fake lab
/// driver, both backed by `newtest-testkit` fakes.
pub fn load(
    topologies_base: &Path,
    topology: &str,
) -> anyhow::Result<(DriverSet, Arc<dyn LabDriver>)> {
    let specs_dir = topologies_base.join(topology).join("specs");

    let topology_path = specs_dir.join("topology.json");
    let topology_raw = std::fs::read_to_string(&topology_path)
        .with_context(|| format!("reading {}", topology_path.display()))?;
    let topology_file: TopologyFile = serde_json::from_str(&topology_raw)
        .with_context(|| format!("parsing {}", topology_path.display()))?;

    let platforms_path = specs_dir.join("platforms.json");
    let platforms: BTreeMap<String, PlatformEntry> = if platforms_path.is_file() {
        let raw = std::fs::read_to_string(&platforms_path)
            .with_context(|| format!("reading {}", platforms_path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", platforms_path.display()))?
    } else {
        BTreeMap::new()
    };

    let nodes: Vec<NodeInfo> = topology_file
        .devices
        .iter()
        .map(|d| NodeInfo {
            name: d.name.clone(),
            role: parse_role(&d.role),
            loopback_ip: d.loopback_ip.clone(),
        })
        .collect();

    let node_names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();

    let mut network = FakeNetwork::new(topology, nodes.clone());
    for (name, entry) in platforms {
        network = network.with_platform(
            name,
            Platform {
                dataplane: entry.dataplane,
                features: entry.features,
            },
        );
    }

    let mut builder = DriverSetBuilder::new();
    for node in &nodes {
        if node.role != DeviceRole::Host {
            builder = builder.with_device(FakeDevice::new(node.name.clone()));
        }
    }
    builder = builder.with_network(network);

    Ok((builder.build(), Arc::new(FakeLab::new(node_names))))
}
