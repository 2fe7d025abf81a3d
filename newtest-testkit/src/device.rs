//! In-memory `DeviceDriver` fake. Every mutation just records intent in a
//! `ChangeSet` and updates a small piece of local state; nothing talks to
//! a real switch.

use std::collections::BTreeMap;

use async_trait::async_trait;
use newtest_core::drivers::{
    AclOp, BgpOp, BgpPeerStatus, ChangeEntry, ChangeSet, CommandOutput, DeliveryMode,
    DeliveryReport, DeviceDriver, DeviceLockGuard, DriverError, EvpnOp, HealthReport, LinkState,
    MclagOp, PortChannelOp, QosOp, RouteEntry, ServiceOp, StaticRouteOp, SubCheck, VlanOp, VrfOp,
};
use newtest_model::RouteSource;
use std::sync::Mutex;

#[derive(Default)]
struct DeviceState {
    connected: bool,
    locked: bool,
    config_db: BTreeMap<String, Vec<ChangeEntry>>,
    state_db: BTreeMap<(String, String), BTreeMap<String, String>>,
    bgp_peers: Vec<BgpPeerStatus>,
    routes: Vec<RouteEntry>,
    health: HealthReport,
    interfaces: BTreeMap<String, LinkState>,
    lags: BTreeMap<String, LinkState>,
    mclags: BTreeMap<String, LinkState>,
    counters: ChangeSet,
    ssh_responses: BTreeMap<String, CommandOutput>,
}

/// A fully scriptable in-memory device. Construct with [`FakeDevice::new`]
/// then seed expectations with the `with_*` builders before handing it to
/// a `DriverSet`.
pub struct FakeDevice {
    name: String,
    state: Mutex<DeviceState>,
}

impl FakeDevice {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(DeviceState::default()),
        }
    }

    #[must_use]
    pub fn with_bgp_peer(self, peer: BgpPeerStatus) -> Self {
        self.state.lock().unwrap().bgp_peers.push(peer);
        self
    }

    #[must_use]
    pub fn with_route(self, route: RouteEntry) -> Self {
        self.state.lock().unwrap().routes.push(route);
        self
    }

    #[must_use]
    pub fn with_interface_status(self, interface: impl Into<String>, state: LinkState) -> Self {
        self.state.lock().unwrap().interfaces.insert(interface.into(), state);
        self
    }

    #[must_use]
    pub fn with_lag_status(self, portchannel_id: impl Into<String>, state: LinkState) -> Self {
        self.state.lock().unwrap().lags.insert(portchannel_id.into(), state);
        self
    }

    #[must_use]
    pub fn with_mclag_status(self, domain_id: impl Into<String>, state: LinkState) -> Self {
        self.state.lock().unwrap().mclags.insert(domain_id.into(), state);
        self
    }

    #[must_use]
    pub fn with_health_check(self, check: SubCheck, operational: bool) -> Self {
        let mut state = self.state.lock().unwrap();
        if operational {
            state.health.operational_checks.push(check);
        } else {
            state.health.config_checks.push(check);
        }
        drop(state);
        self
    }

    #[must_use]
    pub fn with_ssh_response(self, command: impl Into<String>, output: CommandOutput) -> Self {
        self.state.lock().unwrap().ssh_responses.insert(command.into(), output);
        self
    }

    #[must_use]
    pub fn with_state_db_entry(
        self,
        table: impl Into<String>,
        key: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        self.state.lock().unwrap().state_db.insert((table.into(), key.into()), fields);
        self
    }

    #[must_use]
    pub fn with_config_db_entry(
        self,
        table: impl Into<String>,
        key: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        let table = table.into();
        self.state
            .lock()
            .unwrap()
            .config_db
            .entry(table.clone())
            .or_default()
            .push(ChangeEntry { table, key: key.into(), fields });
        self
    }

    fn record(&self, table: &str, key: &str) -> ChangeSet {
        let entry = ChangeEntry {
            table: table.to_owned(),
            key: key.to_owned(),
            fields: BTreeMap::new(),
        };
        self.state
            .lock()
            .unwrap()
            .config_db
            .entry(table.to_owned())
            .or_default()
            .push(entry.clone());
        ChangeSet { entries: vec![entry] }
    }
}

#[async_trait]
impl DeviceDriver for FakeDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    async fn disconnect(&self) {
        self.state.lock().unwrap().connected = false;
    }

    async fn lock(&self) -> Result<DeviceLockGuard<'_>, DriverError> {
        let mut state = self.state.lock().unwrap();
        if state.locked {
            return Err(DriverError::Locked {
                device: self.name.clone(),
            });
        }
        state.locked = true;
        Ok(DeviceLockGuard::new(self))
    }

    fn unlock_sync(&self) {
        if let Ok(mut state) = self.state.try_lock() {
            state.locked = false;
        }
    }

    async fn deliver_composite(
        &self,
        _config: &str,
        _mode: DeliveryMode,
    ) -> Result<DeliveryReport, DriverError> {
        self.record("COMPOSITE", "applied");
        Ok(DeliveryReport { applied: 1 })
    }

    async fn refresh(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn apply_baseline(&self) -> Result<ChangeSet, DriverError> {
        Ok(self.record("BASELINE", "default"))
    }

    async fn apply_frr_defaults(&self) -> Result<ChangeSet, DriverError> {
        Ok(self.record("FRR", "defaults"))
    }

    async fn vlan(&self, op: VlanOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            VlanOp::Create { vlan_id } | VlanOp::Delete { vlan_id } => vlan_id.to_string(),
            VlanOp::BindPort { vlan_id, .. } | VlanOp::UnbindPort { vlan_id, .. } => vlan_id.to_string(),
        };
        Ok(self.record("VLAN", &key))
    }

    async fn vrf(&self, op: VrfOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            VrfOp::Create { vrf_name }
            | VrfOp::Delete { vrf_name }
            | VrfOp::BindInterface { vrf_name, .. }
            | VrfOp::UnbindInterface { vrf_name, .. } => vrf_name.clone(),
        };
        Ok(self.record("VRF", &key))
    }

    async fn evpn(&self, op: EvpnOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            EvpnOp::CreateVni { vni, .. } | EvpnOp::DeleteVni { vni } => vni.to_string(),
        };
        Ok(self.record("EVPN", &key))
    }

    async fn qos(&self, op: QosOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            QosOp::Configure { policy_name } | QosOp::Remove { policy_name } => policy_name.clone(),
        };
        Ok(self.record("QOS", &key))
    }

    async fn acl(&self, op: AclOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            AclOp::Create { acl_name }
            | AclOp::Delete { acl_name }
            | AclOp::Apply { acl_name, .. }
            | AclOp::Remove { acl_name, .. } => acl_name.clone(),
        };
        Ok(self.record("ACL", &key))
    }

    async fn bgp(&self, op: BgpOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            BgpOp::CreateNeighbor { neighbor_ip, .. } | BgpOp::RemoveNeighbor { neighbor_ip } => {
                neighbor_ip.clone()
            }
            BgpOp::ConfigureTimers { .. } => "timers".to_owned(),
        };
        Ok(self.record("BGP", &key))
    }

    async fn portchannel(&self, op: PortChannelOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            PortChannelOp::Create { portchannel_id }
            | PortChannelOp::Delete { portchannel_id }
            | PortChannelOp::BindMember { portchannel_id, .. }
            | PortChannelOp::UnbindMember { portchannel_id, .. } => portchannel_id.clone(),
        };
        Ok(self.record("PORTCHANNEL", &key))
    }

    async fn static_route(&self, op: StaticRouteOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            StaticRouteOp::Create { prefix, .. } | StaticRouteOp::Delete { prefix } => prefix.clone(),
        };
        Ok(self.record("STATIC_ROUTE", &key))
    }

    async fn service(&self, op: ServiceOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            ServiceOp::Create { service_name }
            | ServiceOp::Delete { service_name }
            | ServiceOp::BindVlan { service_name, .. } => service_name.clone(),
        };
        Ok(self.record("SERVICE", &key))
    }

    async fn mclag(&self, op: MclagOp) -> Result<ChangeSet, DriverError> {
        let key = match &op {
            MclagOp::Create { domain_id }
            | MclagOp::Delete { domain_id }
            | MclagOp::BindMember { domain_id, .. } => domain_id.clone(),
        };
        Ok(self.record("MCLAG", &key))
    }

    async fn config_db(&self, table: &str) -> Result<Vec<ChangeEntry>, DriverError> {
        Ok(self.state.lock().unwrap().config_db.get(table).cloned().unwrap_or_default())
    }

    async fn state_db_get(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<BTreeMap<String, String>>, DriverError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .state_db
            .get(&(table.to_owned(), key.to_owned()))
            .cloned())
    }

    async fn check_bgp_sessions(&self) -> Result<Vec<BgpPeerStatus>, DriverError> {
        Ok(self.state.lock().unwrap().bgp_peers.clone())
    }

    async fn get_route(
        &self,
        _source: RouteSource,
        _vrf: &str,
        prefix: &str,
    ) -> Result<Vec<RouteEntry>, DriverError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .routes
            .iter()
            .filter(|r| r.prefix == prefix)
            .cloned()
            .collect())
    }

    async fn health_report(&self) -> Result<HealthReport, DriverError> {
        Ok(self.state.lock().unwrap().health.clone())
    }

    async fn interface_status(&self, interface: &str) -> Result<LinkState, DriverError> {
        self.state
            .lock()
            .unwrap()
            .interfaces
            .get(interface)
            .copied()
            .ok_or_else(|| DriverError::Operation {
                device: self.name.clone(),
                message: format!("unknown interface {interface}"),
            })
    }

    async fn lag_status(&self, portchannel_id: &str) -> Result<LinkState, DriverError> {
        self.state
            .lock()
            .unwrap()
            .lags
            .get(portchannel_id)
            .copied()
            .ok_or_else(|| DriverError::Operation {
                device: self.name.clone(),
                message: format!("unknown portchannel {portchannel_id}"),
            })
    }

    async fn mclag_status(&self, domain_id: &str) -> Result<LinkState, DriverError> {
        self.state
            .lock()
            .unwrap()
            .mclags
            .get(domain_id)
            .copied()
            .ok_or_else(|| DriverError::Operation {
                device: self.name.clone(),
                message: format!("unknown mclag domain {domain_id}"),
            })
    }

    async fn capture_counters(&self) -> Result<ChangeSet, DriverError> {
        Ok(self.state.lock().unwrap().counters.clone())
    }

    async fn collect_tech_support(&self) -> Result<String, DriverError> {
        Ok(format!("tech-support dump for {}", self.name))
    }

    async fn run_ssh_command(&self, command: &str) -> Result<CommandOutput, DriverError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .ssh_responses
            .get(command)
            .cloned()
            .unwrap_or(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}
