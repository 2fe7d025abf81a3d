//! The collaborator traits the dispatcher calls into: `DeviceDriver`,
//! `LabDriver`, and `Network` (spec.md §1, "DELIBERATELY OUT OF SCOPE";
//! §6, "Driver contracts consumed"). Implementations live outside this
//! crate — `newtest-testkit` supplies an in-memory fake used by tests.
//!
//! Per-domain methods take an `Op` enum rather than one Rust method per
//! action name (the source's `CreateVLAN`/`BindIPVPN`/... style would mean
//! ~35 near-identical methods on one trait); this mirrors how the teacher's
//! own `NodeControlHandle` groups `restart`/`start`/`stop` under one
//! concern instead of one method per scenario. See DESIGN.md.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("device {device} is not connected")]
    NotConnected { device: String },
    #[error("{device}: {message}")]
    Operation { device: String, message: String },
    #[error("{device}: capability not supported: {capability}")]
    Unsupported { device: String, capability: String },
    #[error("lock on {device} is held by another operation")]
    Locked { device: String },
    #[error(transparent)]
    Other(#[from] DynError),
}

/// A single CONFIG_DB row mutation returned by a driver operation
/// (spec.md GLOSSARY, "ChangeSet").
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangeEntry {
    pub table: String,
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

/// The suite-wide accumulation of each device's most recent mutation,
/// owned by the `Runner` for the duration of a run (spec.md §3,
/// "Ownership"). Keyed by device name, last-write-wins: `verify-provisioning`
/// consults it to diff the device's current CONFIG_DB against what the last
/// `provision` (or other mutating executor) recorded.
pub type ChangeSetMap = Arc<Mutex<BTreeMap<String, ChangeSet>>>;

impl ChangeSet {
    #[must_use]
    pub fn single(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entries: vec![ChangeEntry {
                table: table.into(),
                key: key.into(),
                fields: BTreeMap::new(),
            }],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryMode {
    Overwrite,
    Merge,
}

#[derive(Clone, Debug)]
pub struct DeliveryReport {
    pub applied: usize,
}

pub struct DeviceLockGuard<'a> {
    driver: &'a (dyn DeviceDriver + 'a),
}

impl<'a> DeviceLockGuard<'a> {
    #[must_use]
    pub fn new(driver: &'a (dyn DeviceDriver + 'a)) -> Self {
        Self { driver }
    }
}

impl Drop for DeviceLockGuard<'_> {
    fn drop(&mut self) {
        self.driver.unlock_sync();
    }
}

macro_rules! domain_op {
    ($name:ident { $($variant:ident { $($field:ident : $ty:ty),* $(,)? }),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub enum $name {
            $($variant { $($field: $ty),* }),*
        }
    };
}

domain_op!(VlanOp {
    Create { vlan_id: u32 },
    Delete { vlan_id: u32 },
    BindPort { vlan_id: u32, port: String },
    UnbindPort { vlan_id: u32, port: String },
});

domain_op!(VrfOp {
    Create { vrf_name: String },
    Delete { vrf_name: String },
    BindInterface { vrf_name: String, interface: String },
    UnbindInterface { vrf_name: String, interface: String },
});

domain_op!(EvpnOp {
    CreateVni { vni: u32, vrf_name: String },
    DeleteVni { vni: u32 },
});

domain_op!(QosOp {
    Configure { policy_name: String },
    Remove { policy_name: String },
});

domain_op!(AclOp {
    Create { acl_name: String },
    Delete { acl_name: String },
    Apply { acl_name: String, interface: String },
    Remove { acl_name: String, interface: String },
});

domain_op!(BgpOp {
    CreateNeighbor { neighbor_ip: String, remote_as: u32 },
    RemoveNeighbor { neighbor_ip: String },
    ConfigureTimers { keepalive: u32, hold: u32 },
});

domain_op!(PortChannelOp {
    Create { portchannel_id: String },
    Delete { portchannel_id: String },
    BindMember { portchannel_id: String, port: String },
    UnbindMember { portchannel_id: String, port: String },
});

domain_op!(StaticRouteOp {
    Create { prefix: String, nexthop: String },
    Delete { prefix: String },
});

domain_op!(ServiceOp {
    Create { service_name: String },
    Delete { service_name: String },
    BindVlan { service_name: String, vlan_id: u32 },
});

domain_op!(MclagOp {
    Create { domain_id: String },
    Delete { domain_id: String },
    BindMember { domain_id: String, port: String },
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkState {
    Up,
    Down,
}

#[derive(Clone, Debug)]
pub struct BgpPeerStatus {
    pub neighbor_ip: String,
    pub healthy: bool,
    pub state_message: String,
}

#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub prefix: String,
    pub protocol: String,
    pub nexthop_ip: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubCheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Clone, Debug)]
pub struct SubCheck {
    pub name: String,
    pub status: SubCheckStatus,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct HealthReport {
    pub config_checks: Vec<SubCheck>,
    pub operational_checks: Vec<SubCheck>,
}

impl HealthReport {
    /// PASS iff every sub-check is Pass or Warn (spec.md §4.5.2,
    /// "a 'warn' sub-status is treated as PASS").
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.config_checks
            .iter()
            .chain(&self.operational_checks)
            .all(|check| check.status != SubCheckStatus::Fail)
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&SubCheck> {
        self.config_checks
            .iter()
            .chain(&self.operational_checks)
            .filter(|check| check.status == SubCheckStatus::Fail)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Per-device control surface: config mutation, read-back, and shell access
/// (spec.md §6, "DeviceDriver").
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<(), DriverError>;
    async fn disconnect(&self);

    /// Acquire the device-scoped advisory lock used around `provision`'s
    /// composite delivery + refresh (spec.md §5, "Locking discipline").
    async fn lock(&self) -> Result<DeviceLockGuard<'_>, DriverError>;
    /// Called by [`DeviceLockGuard::drop`]; synchronous because `Drop`
    /// cannot `.await`.
    fn unlock_sync(&self);

    async fn deliver_composite(
        &self,
        config: &str,
        mode: DeliveryMode,
    ) -> Result<DeliveryReport, DriverError>;
    async fn refresh(&self) -> Result<(), DriverError>;

    async fn apply_baseline(&self) -> Result<ChangeSet, DriverError>;
    async fn apply_frr_defaults(&self) -> Result<ChangeSet, DriverError>;

    async fn vlan(&self, op: VlanOp) -> Result<ChangeSet, DriverError>;
    async fn vrf(&self, op: VrfOp) -> Result<ChangeSet, DriverError>;
    async fn evpn(&self, op: EvpnOp) -> Result<ChangeSet, DriverError>;
    async fn qos(&self, op: QosOp) -> Result<ChangeSet, DriverError>;
    async fn acl(&self, op: AclOp) -> Result<ChangeSet, DriverError>;
    async fn bgp(&self, op: BgpOp) -> Result<ChangeSet, DriverError>;
    async fn portchannel(&self, op: PortChannelOp) -> Result<ChangeSet, DriverError>;
    async fn static_route(&self, op: StaticRouteOp) -> Result<ChangeSet, DriverError>;
    async fn service(&self, op: ServiceOp) -> Result<ChangeSet, DriverError>;
    async fn mclag(&self, op: MclagOp) -> Result<ChangeSet, DriverError>;

    async fn config_db(&self, table: &str) -> Result<Vec<ChangeEntry>, DriverError>;
    async fn state_db_get(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<BTreeMap<String, String>>, DriverError>;
    async fn check_bgp_sessions(&self) -> Result<Vec<BgpPeerStatus>, DriverError>;
    async fn get_route(
        &self,
        source: newtest_model::RouteSource,
        vrf: &str,
        prefix: &str,
    ) -> Result<Vec<RouteEntry>, DriverError>;
    async fn health_report(&self) -> Result<HealthReport, DriverError>;
    async fn interface_status(&self, interface: &str) -> Result<LinkState, DriverError>;
    async fn lag_status(&self, portchannel_id: &str) -> Result<LinkState, DriverError>;
    async fn mclag_status(&self, domain_id: &str) -> Result<LinkState, DriverError>;
    async fn capture_counters(&self) -> Result<ChangeSet, DriverError>;
    async fn collect_tech_support(&self) -> Result<String, DriverError>;

    async fn run_ssh_command(&self, command: &str) -> Result<CommandOutput, DriverError>;
}

/// Host endpoints are addressed via plain SSH and network-namespace exec
/// rather than the switch management channel (spec.md §4.4, "Connect
/// semantics").
#[async_trait]
pub trait HostDriver: Send + Sync {
    fn name(&self) -> &str;
    async fn connect(&self) -> Result<(), DriverError>;
    async fn disconnect(&self);
    async fn netns_exec(&self, device: &str, command: &str) -> Result<CommandOutput, DriverError>;
}

#[derive(Clone, Debug)]
pub struct NodeStatus {
    pub name: String,
    pub status: String,
}

#[derive(Clone, Debug)]
pub struct LabStatus {
    pub nodes: Vec<NodeStatus>,
}

impl LabStatus {
    #[must_use]
    pub fn all_running(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(|n| n.status == "running")
    }
}

/// Lifecycle control for the simulated fabric (spec.md §6, "LabDriver").
#[async_trait]
pub trait LabDriver: Send + Sync {
    async fn deploy(&self) -> Result<(), DriverError>;
    async fn destroy(&self) -> Result<(), DriverError>;
    async fn status(&self) -> Result<LabStatus, DriverError>;
    async fn is_ready(&self) -> Result<bool, DriverError>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceRole {
    Spine,
    Leaf,
    Server,
    Host,
}

#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub name: String,
    pub role: DeviceRole,
    pub loopback_ip: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Platform {
    pub dataplane: Option<String>,
    pub features: Vec<String>,
}

impl Platform {
    #[must_use]
    pub fn supports_feature(&self, tag: &str) -> bool {
        self.features.iter().any(|f| f == tag)
    }

    #[must_use]
    pub fn has_dataplane(&self) -> bool {
        self.dataplane.as_deref().is_some_and(|d| !d.is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct HostProfile {
    pub ssh_host: String,
    pub ssh_port: u16,
    pub ssh_user: String,
}

#[derive(Clone, Debug, Default)]
pub struct TopologyInfo {
    pub name: String,
    pub devices: Vec<NodeInfo>,
}

/// Device/platform/topology lookups, consumed by the runner and several
/// executors (spec.md §6, "Network").
pub trait Network: Send + Sync {
    fn get_node(&self, name: &str) -> Option<NodeInfo>;
    fn list_nodes(&self) -> Vec<NodeInfo>;
    fn get_platform(&self, name: &str) -> Option<Platform>;
    fn get_topology(&self) -> TopologyInfo;
    fn is_host_device(&self, name: &str) -> bool;
    fn get_host_profile(&self, name: &str) -> Option<HostProfile>;
}

impl fmt::Debug for dyn DeviceDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDriver").field("name", &self.name()).finish()
    }
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
