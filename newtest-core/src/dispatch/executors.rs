//! Per-action executors. Each one is a small closure over a
//! [`super::DriverSet`] method call, fed to whichever shared helper its
//! [`newtest_model::ExecutionKind`] selects (spec.md §4.5.2, "Action
//! executor table").

use newtest_model::{ExecutionKind, RouteSource, Step};
use tokio_util::sync::CancellationToken;

use crate::capabilities;
use crate::drivers::{
    AclOp, BgpOp, ChangeEntry, ChangeSet, ChangeSetMap, EvpnOp, MclagOp, Platform, PortChannelOp,
    QosOp, ServiceOp, StaticRouteOp, VlanOp, VrfOp,
};
use crate::error::{InfraError, StepError};
use crate::result::StepResult;

use super::{check_for_devices, execute_for_devices, poll_for_devices, DriverSet};

fn assert_that(ok: bool, message: impl Into<String>) -> Result<(), StepError> {
    if ok {
        Ok(())
    } else {
        Err(StepError::Assertion(message.into()))
    }
}

fn param_str<'a>(step: &'a Step, key: &str) -> Result<&'a str, StepError> {
    step.param_str(key)
        .ok_or_else(|| StepError::Assertion(format!("missing param '{key}'")))
}

fn param_u64(step: &Step, key: &str) -> Result<u64, StepError> {
    step.param_u64(key)
        .ok_or_else(|| StepError::Assertion(format!("missing or non-numeric param '{key}'")))
}

fn param_u32(step: &Step, key: &str) -> Result<u32, StepError> {
    Ok(param_u64(step, key)? as u32)
}

/// Dispatch one step against its resolved device list. `wait` is handled
/// by the caller (the runner) since it has no devices to iterate.
pub async fn dispatch_step(
    step: &Step,
    device_names: &[String],
    drivers: &DriverSet,
    changesets: &ChangeSetMap,
    platform: &Platform,
    cancel: &CancellationToken,
) -> StepResult {
    let action = step.action.as_str().to_owned();
    let kind = step.action.spec().kind;
    let step_owned = step.clone();

    macro_rules! mutate {
        ($body:expr) => {
            execute_for_devices(step, device_names, drivers, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                let changesets = changesets.clone();
                Box::pin(async move { $body(device, drivers, step, changesets).await })
            })
            .await
        };
    }

    macro_rules! check {
        ($body:expr) => {
            check_for_devices(step, device_names, drivers, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                let changesets = changesets.clone();
                Box::pin(async move { $body(device, drivers, step, changesets).await })
            })
            .await
        };
    }

    match (action.as_str(), kind) {
        ("provision", _) => mutate!(provision),
        ("apply-baseline", _) => mutate!(apply_baseline),
        ("apply-frr-defaults", _) => mutate!(apply_frr_defaults),
        ("create-vlan", _) => mutate!(create_vlan),
        ("delete-vlan", _) => mutate!(delete_vlan),
        ("bind-vlan-port", _) => mutate!(bind_vlan_port),
        ("unbind-vlan-port", _) => mutate!(unbind_vlan_port),
        ("create-vrf", _) => mutate!(create_vrf),
        ("delete-vrf", _) => mutate!(delete_vrf),
        ("bind-vrf-interface", _) => mutate!(bind_vrf_interface),
        ("unbind-vrf-interface", _) => mutate!(unbind_vrf_interface),
        ("create-evpn-vni", _) => mutate!(create_evpn_vni),
        ("delete-evpn-vni", _) => mutate!(delete_evpn_vni),
        ("configure-qos", _) => mutate!(configure_qos),
        ("remove-qos", _) => mutate!(remove_qos),
        ("create-acl", _) => mutate!(create_acl),
        ("delete-acl", _) => mutate!(delete_acl),
        ("apply-acl", _) => mutate!(apply_acl),
        ("remove-acl", _) => mutate!(remove_acl),
        ("create-bgp-neighbor", _) => mutate!(create_bgp_neighbor),
        ("remove-bgp-neighbor", _) => mutate!(remove_bgp_neighbor),
        ("configure-bgp-timers", _) => mutate!(configure_bgp_timers),
        ("create-portchannel", _) => mutate!(create_portchannel),
        ("delete-portchannel", _) => mutate!(delete_portchannel),
        ("bind-portchannel-member", _) => mutate!(bind_portchannel_member),
        ("unbind-portchannel-member", _) => mutate!(unbind_portchannel_member),
        ("create-static-route", _) => mutate!(create_static_route),
        ("delete-static-route", _) => mutate!(delete_static_route),
        ("create-service", _) => mutate!(create_service),
        ("delete-service", _) => mutate!(delete_service),
        ("bind-service-vlan", _) => mutate!(bind_service_vlan),
        ("create-mclag", _) => mutate!(create_mclag),
        ("delete-mclag", _) => mutate!(delete_mclag),
        ("bind-mclag-member", _) => mutate!(bind_mclag_member),

        ("verify-provisioning", _) => check!(verify_provisioning),
        ("verify-config-db", _) => check!(verify_config_db),
        ("verify-health", _) => check!(verify_health),
        ("host-exec", _) => check!(host_exec),
        ("ssh-command", _) => check!(ssh_command),
        ("verify-interface-status", _) => check!(verify_interface_status),
        ("verify-lag-status", _) => check!(verify_lag_status),
        ("verify-mclag-status", _) => check!(verify_mclag_status),
        ("capture-counters", _) => check!(capture_counters),
        ("collect-tech-support", _) => check!(collect_tech_support),

        ("verify-state-db", ExecutionKind::Poll) => {
            let expect = step.expect.clone().unwrap_or_default();
            poll_for_devices(step, device_names, drivers, &expect, cancel, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                Box::pin(async move { verify_state_db(device, drivers, step).await })
            })
            .await
        }
        ("verify-bgp", ExecutionKind::Poll) => {
            let expect = step.expect.clone().unwrap_or_default();
            poll_for_devices(step, device_names, drivers, &expect, cancel, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                Box::pin(async move { verify_bgp(device, drivers, step).await })
            })
            .await
        }
        ("verify-route", ExecutionKind::Poll) => {
            let expect = step.expect.clone().unwrap_or_default();
            poll_for_devices(step, device_names, drivers, &expect, cancel, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                Box::pin(async move { verify_route(device, drivers, step).await })
            })
            .await
        }
        ("verify-acl-hit-count", ExecutionKind::Poll) => {
            let expect = step.expect.clone().unwrap_or_default();
            poll_for_devices(step, device_names, drivers, &expect, cancel, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                Box::pin(async move { verify_acl_hit_count(device, drivers, step).await })
            })
            .await
        }
        ("verify-ping", ExecutionKind::Poll) => {
            let expect = step.expect.clone().unwrap_or_default();
            let platform = platform.clone();
            poll_for_devices(step, device_names, drivers, &expect, cancel, move |device, drivers| {
                let device = device.to_owned();
                let drivers = drivers.clone();
                let step = step_owned.clone();
                let platform = platform.clone();
                Box::pin(async move { verify_ping(device, drivers, step, platform).await })
            })
            .await
        }

        (other, _) => {
            let mut result = crate::result::StepResult {
                name: step.name.clone(),
                action: other.to_owned(),
                status: crate::result::Status::Error,
                devices: Vec::new(),
                started_at: chrono::Utc::now(),
                finished_at: chrono::Utc::now(),
            };
            result.devices.push(crate::result::DeviceResult {
                device: "-".to_owned(),
                status: crate::result::Status::Error,
                message: format!("no executor registered for action '{other}'"),
            });
            result
        }
    }
}

/// A device's platform-initialized MAC lives in `DEVICE_METADATA` and must
/// survive an overwrite-mode composite delivery: read it back before
/// delivery and splice it into the composite config so it isn't lost
/// (spec.md §4.5.2, "MAC survives the overwrite").
async fn provision(
    device: String,
    drivers: DriverSet,
    step: Step,
    changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let config = param_str(&step, "config")?;
    let _lock = driver.lock().await.map_err(InfraError::from)?;

    let existing = driver.config_db("DEVICE_METADATA").await.map_err(InfraError::from)?;
    let platform_mac = existing.iter().find_map(|entry| entry.fields.get("mac_addr").cloned());

    let config = match &platform_mac {
        Some(mac) => format!("{config}\nDEVICE_METADATA|localhost: {{mac_addr: {mac}}}\n"),
        None => config.to_owned(),
    };

    driver
        .deliver_composite(&config, crate::drivers::DeliveryMode::Overwrite)
        .await
        .map_err(InfraError::from)?;
    driver.refresh().await.map_err(InfraError::from)?;

    let mut fields = std::collections::BTreeMap::new();
    if let Some(mac) = platform_mac {
        fields.insert("mac_addr".to_owned(), mac);
    }
    let change = ChangeSet {
        entries: vec![ChangeEntry {
            table: "DEVICE_METADATA".to_owned(),
            key: "localhost".to_owned(),
            fields,
        }],
    };
    changesets.lock().unwrap().insert(device, change);
    Ok(())
}

async fn apply_baseline(
    device: String,
    drivers: DriverSet,
    _step: Step,
    changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let change = drivers.device(&device)?.apply_baseline().await.map_err(InfraError::from)?;
    changesets.lock().unwrap().insert(device, change);
    Ok(())
}

async fn apply_frr_defaults(
    device: String,
    drivers: DriverSet,
    _step: Step,
    changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let change = drivers
        .device(&device)?
        .apply_frr_defaults()
        .await
        .map_err(InfraError::from)?;
    changesets.lock().unwrap().insert(device, change);
    Ok(())
}

macro_rules! domain_mutation {
    ($fn_name:ident, $method:ident, $op:expr) => {
        async fn $fn_name(
            device: String,
            drivers: DriverSet,
            step: Step,
            changesets: ChangeSetMap,
        ) -> Result<(), StepError> {
            let driver = drivers.device(&device)?;
            let op = $op(&step)?;
            let change = driver.$method(op).await.map_err(InfraError::from)?;
            changesets.lock().unwrap().insert(device, change);
            Ok(())
        }
    };
}

domain_mutation!(create_vlan, vlan, |step: &Step| Ok::<_, StepError>(VlanOp::Create {
    vlan_id: param_u32(step, "vlan_id")?
}));
domain_mutation!(delete_vlan, vlan, |step: &Step| Ok::<_, StepError>(VlanOp::Delete {
    vlan_id: param_u32(step, "vlan_id")?
}));
domain_mutation!(bind_vlan_port, vlan, |step: &Step| Ok::<_, StepError>(VlanOp::BindPort {
    vlan_id: param_u32(step, "vlan_id")?,
    port: param_str(step, "port")?.to_owned(),
}));
domain_mutation!(unbind_vlan_port, vlan, |step: &Step| Ok::<_, StepError>(
    VlanOp::UnbindPort {
        vlan_id: param_u32(step, "vlan_id")?,
        port: param_str(step, "port")?.to_owned(),
    }
));

domain_mutation!(create_vrf, vrf, |step: &Step| Ok::<_, StepError>(VrfOp::Create {
    vrf_name: param_str(step, "vrf_name")?.to_owned()
}));
domain_mutation!(delete_vrf, vrf, |step: &Step| Ok::<_, StepError>(VrfOp::Delete {
    vrf_name: param_str(step, "vrf_name")?.to_owned()
}));
domain_mutation!(bind_vrf_interface, vrf, |step: &Step| Ok::<_, StepError>(
    VrfOp::BindInterface {
        vrf_name: param_str(step, "vrf_name")?.to_owned(),
        interface: param_str(step, "interface")?.to_owned(),
    }
));
domain_mutation!(unbind_vrf_interface, vrf, |step: &Step| Ok::<_, StepError>(
    VrfOp::UnbindInterface {
        vrf_name: param_str(step, "vrf_name")?.to_owned(),
        interface: param_str(step, "interface")?.to_owned(),
    }
));

domain_mutation!(create_evpn_vni, evpn, |step: &Step| Ok::<_, StepError>(
    EvpnOp::CreateVni {
        vni: param_u32(step, "vni")?,
        vrf_name: param_str(step, "vrf_name")?.to_owned(),
    }
));
domain_mutation!(delete_evpn_vni, evpn, |step: &Step| Ok::<_, StepError>(
    EvpnOp::DeleteVni {
        vni: param_u32(step, "vni")?
    }
));

domain_mutation!(configure_qos, qos, |step: &Step| Ok::<_, StepError>(
    QosOp::Configure {
        policy_name: param_str(step, "policy_name")?.to_owned()
    }
));
domain_mutation!(remove_qos, qos, |step: &Step| Ok::<_, StepError>(QosOp::Remove {
    policy_name: param_str(step, "policy_name")?.to_owned()
}));

domain_mutation!(create_acl, acl, |step: &Step| Ok::<_, StepError>(AclOp::Create {
    acl_name: param_str(step, "acl_name")?.to_owned()
}));
domain_mutation!(delete_acl, acl, |step: &Step| Ok::<_, StepError>(AclOp::Delete {
    acl_name: param_str(step, "acl_name")?.to_owned()
}));
domain_mutation!(apply_acl, acl, |step: &Step| Ok::<_, StepError>(AclOp::Apply {
    acl_name: param_str(step, "acl_name")?.to_owned(),
    interface: param_str(step, "interface")?.to_owned(),
}));
domain_mutation!(remove_acl, acl, |step: &Step| Ok::<_, StepError>(AclOp::Remove {
    acl_name: param_str(step, "acl_name")?.to_owned(),
    interface: param_str(step, "interface")?.to_owned(),
}));

domain_mutation!(create_bgp_neighbor, bgp, |step: &Step| Ok::<_, StepError>(
    BgpOp::CreateNeighbor {
        neighbor_ip: param_str(step, "neighbor_ip")?.to_owned(),
        remote_as: param_u32(step, "remote_as")?,
    }
));
domain_mutation!(remove_bgp_neighbor, bgp, |step: &Step| Ok::<_, StepError>(
    BgpOp::RemoveNeighbor {
        neighbor_ip: param_str(step, "neighbor_ip")?.to_owned(),
    }
));
domain_mutation!(configure_bgp_timers, bgp, |step: &Step| Ok::<_, StepError>(
    BgpOp::ConfigureTimers {
        keepalive: param_u32(step, "keepalive")?,
        hold: param_u32(step, "hold")?,
    }
));

domain_mutation!(create_portchannel, portchannel, |step: &Step| Ok::<_, StepError>(
    PortChannelOp::Create {
        portchannel_id: param_str(step, "portchannel_id")?.to_owned()
    }
));
domain_mutation!(delete_portchannel, portchannel, |step: &Step| Ok::<_, StepError>(
    PortChannelOp::Delete {
        portchannel_id: param_str(step, "portchannel_id")?.to_owned()
    }
));
domain_mutation!(bind_portchannel_member, portchannel, |step: &Step| Ok::<
    _,
    StepError,
>(PortChannelOp::BindMember {
    portchannel_id: param_str(step, "portchannel_id")?.to_owned(),
    port: param_str(step, "port")?.to_owned(),
}));
domain_mutation!(unbind_portchannel_member, portchannel, |step: &Step| Ok::<
    _,
    StepError,
>(PortChannelOp::UnbindMember {
    portchannel_id: param_str(step, "portchannel_id")?.to_owned(),
    port: param_str(step, "port")?.to_owned(),
}));

domain_mutation!(create_static_route, static_route, |step: &Step| Ok::<
    _,
    StepError,
>(StaticRouteOp::Create {
    prefix: param_str(step, "prefix")?.to_owned(),
    nexthop: param_str(step, "nexthop")?.to_owned(),
}));
domain_mutation!(delete_static_route, static_route, |step: &Step| Ok::<
    _,
    StepError,
>(StaticRouteOp::Delete {
    prefix: param_str(step, "prefix")?.to_owned(),
}));

domain_mutation!(create_service, service, |step: &Step| Ok::<_, StepError>(
    ServiceOp::Create {
        service_name: param_str(step, "service_name")?.to_owned()
    }
));
domain_mutation!(delete_service, service, |step: &Step| Ok::<_, StepError>(
    ServiceOp::Delete {
        service_name: param_str(step, "service_name")?.to_owned()
    }
));
domain_mutation!(bind_service_vlan, service, |step: &Step| Ok::<_, StepError>(
    ServiceOp::BindVlan {
        service_name: param_str(step, "service_name")?.to_owned(),
        vlan_id: param_u32(step, "vlan_id")?,
    }
));

domain_mutation!(create_mclag, mclag, |step: &Step| Ok::<_, StepError>(
    MclagOp::Create {
        domain_id: param_str(step, "domain_id")?.to_owned()
    }
));
domain_mutation!(delete_mclag, mclag, |step: &Step| Ok::<_, StepError>(
    MclagOp::Delete {
        domain_id: param_str(step, "domain_id")?.to_owned()
    }
));
domain_mutation!(bind_mclag_member, mclag, |step: &Step| Ok::<_, StepError>(
    MclagOp::BindMember {
        domain_id: param_str(step, "domain_id")?.to_owned(),
        port: param_str(step, "port")?.to_owned(),
    }
));

/// Diffs the device's current `DEVICE_METADATA` rows against the ChangeSet
/// the last mutating executor recorded for this device, reporting
/// per-entry mismatches (spec.md §4.5 step 4). Falls back to a bare
/// non-empty check when no ChangeSet has been recorded yet (e.g.
/// `verify-provisioning` ran without a prior `provision` step in this run).
async fn verify_provisioning(
    device: String,
    drivers: DriverSet,
    _step: Step,
    changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let entries = driver.config_db("DEVICE_METADATA").await.map_err(InfraError::from)?;
    let recorded = changesets.lock().unwrap().get(&device).cloned();

    let Some(change) = recorded.filter(|c| !c.is_empty()) else {
        return assert_that(!entries.is_empty(), "device metadata table is empty after provisioning");
    };

    for expected in &change.entries {
        let actual = entries
            .iter()
            .find(|e| e.table == expected.table && e.key == expected.key);
        let Some(actual) = actual else {
            return Err(StepError::Assertion(format!(
                "{}/{} missing after provisioning",
                expected.table, expected.key
            )));
        };
        for (field, value) in &expected.fields {
            let seen = actual.fields.get(field);
            assert_that(
                seen == Some(value),
                format!("{}/{}.{field} = {seen:?}, want {value:?}", expected.table, expected.key),
            )?;
        }
    }
    Ok(())
}

async fn verify_config_db(
    device: String,
    drivers: DriverSet,
    step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let table = param_str(&step, "table")?;
    let entries = driver.config_db(table).await.map_err(InfraError::from)?;
    let expect = step.expect.clone().unwrap_or_default();
    if let Some(min) = expect.min_entries {
        assert_that(
            entries.len() as u64 >= min,
            format!("table {table} has {} entries, want >= {min}", entries.len()),
        )?;
    }
    if let Some(true) = expect.exists {
        assert_that(!entries.is_empty(), format!("table {table} has no entries"))?;
    }
    if let Some(wanted) = &expect.fields {
        let matches = entries
            .iter()
            .any(|entry| wanted.iter().all(|(field, value)| entry.fields.get(field) == Some(value)));
        assert_that(matches, format!("table {table} has no entry matching expected fields"))?;
    }
    Ok(())
}

async fn verify_health(
    device: String,
    drivers: DriverSet,
    _step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let report = driver.health_report().await.map_err(InfraError::from)?;
    if report.is_healthy() {
        Ok(())
    } else {
        let failures: Vec<String> = report.failures().into_iter().map(|f| f.name.clone()).collect();
        Err(StepError::Assertion(format!(
            "health check failed: {}",
            failures.join(", ")
        )))
    }
}

async fn host_exec(
    device: String,
    drivers: DriverSet,
    step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let host = drivers.host(&device)?;
    let command = param_str(&step, "command")?;
    let output = host.netns_exec(&device, command).await.map_err(InfraError::from)?;
    check_command_output(&output, &step)
}

async fn ssh_command(
    device: String,
    drivers: DriverSet,
    step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let command = param_str(&step, "command")?;
    let output = driver.run_ssh_command(command).await.map_err(InfraError::from)?;
    check_command_output(&output, &step)
}

fn check_command_output(output: &crate::drivers::CommandOutput, step: &Step) -> Result<(), StepError> {
    assert_that(output.success(), format!("command exited {}", output.exit_code))?;
    if let Some(expect) = &step.expect {
        if let Some(contains) = &expect.contains {
            assert_that(
                output.stdout.contains(contains.as_str()),
                format!("output did not contain '{contains}'"),
            )?;
        }
    }
    Ok(())
}

async fn verify_interface_status(
    device: String,
    drivers: DriverSet,
    step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let interface = param_str(&step, "interface")?;
    let state = driver.interface_status(interface).await.map_err(InfraError::from)?;
    let expect = step.expect.clone().unwrap_or_default();
    let want_up = expect.state_or("up").eq_ignore_ascii_case("up");
    assert_that(
        (state == crate::drivers::LinkState::Up) == want_up,
        format!("interface {interface} link state mismatch"),
    )
}

async fn verify_lag_status(
    device: String,
    drivers: DriverSet,
    step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let portchannel_id = param_str(&step, "portchannel_id")?;
    let state = driver.lag_status(portchannel_id).await.map_err(InfraError::from)?;
    assert_that(state == crate::drivers::LinkState::Up, format!("{portchannel_id} is down"))
}

async fn verify_mclag_status(
    device: String,
    drivers: DriverSet,
    step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let domain_id = param_str(&step, "domain_id")?;
    let state = driver.mclag_status(domain_id).await.map_err(InfraError::from)?;
    assert_that(state == crate::drivers::LinkState::Up, format!("mclag domain {domain_id} is down"))
}

async fn capture_counters(
    device: String,
    drivers: DriverSet,
    _step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    drivers.device(&device)?.capture_counters().await.map_err(InfraError::from)?;
    Ok(())
}

async fn collect_tech_support(
    device: String,
    drivers: DriverSet,
    _step: Step,
    _changesets: ChangeSetMap,
) -> Result<(), StepError> {
    drivers
        .device(&device)?
        .collect_tech_support()
        .await
        .map_err(InfraError::from)?;
    Ok(())
}

async fn verify_state_db(device: String, drivers: DriverSet, step: Step) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let table = param_str(&step, "table")?;
    let key = param_str(&step, "key")?;
    let row = driver.state_db_get(table, key).await.map_err(InfraError::from)?;
    let expect = step.expect.clone().unwrap_or_default();
    match (&row, expect.exists) {
        (None, Some(true)) | (None, None) => {
            return Err(StepError::Assertion(format!("{table}/{key} not found in STATE_DB")));
        }
        (Some(_), Some(false)) => {
            return Err(StepError::Assertion(format!("{table}/{key} unexpectedly present")));
        }
        _ => {}
    }
    if let (Some(row), Some(wanted)) = (&row, &expect.fields) {
        for (field, value) in wanted {
            let actual = row.get(field);
            assert_that(
                actual == Some(value),
                format!("{table}/{key}.{field} = {actual:?}, want {value:?}"),
            )?;
        }
    }
    Ok(())
}

async fn verify_bgp(device: String, drivers: DriverSet, step: Step) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let sessions = driver.check_bgp_sessions().await.map_err(InfraError::from)?;
    let expect = step.expect.clone().unwrap_or_default();
    let want_established = expect.state_or("Established").eq_ignore_ascii_case("Established");
    if sessions.is_empty() {
        return Err(StepError::Assertion("no BGP neighbors configured".to_owned()));
    }
    for session in &sessions {
        assert_that(
            session.healthy == want_established,
            format!("{}: {}", session.neighbor_ip, session.state_message),
        )?;
    }
    Ok(())
}

async fn verify_route(device: String, drivers: DriverSet, step: Step) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let expect = step.expect.clone().unwrap_or_default();
    let prefix = param_str(&step, "prefix")?;
    let vrf = param_str(&step, "vrf")?;
    let source = expect.source_or(RouteSource::AppDb);
    let routes = driver
        .get_route(source, vrf, prefix)
        .await
        .map_err(InfraError::from)?;
    if routes.is_empty() {
        return Err(StepError::Assertion(format!("no route for {prefix} in vrf {vrf}")));
    }
    if let Some(protocol) = &expect.protocol {
        assert_that(
            routes.iter().any(|r| &r.protocol == protocol),
            format!("no {protocol} route for {prefix}"),
        )?;
    }
    if let Some(nexthop) = &expect.nexthop_ip {
        assert_that(
            routes.iter().any(|r| &r.nexthop_ip == nexthop),
            format!("no route for {prefix} via {nexthop}"),
        )?;
    }
    Ok(())
}

async fn verify_acl_hit_count(device: String, drivers: DriverSet, step: Step) -> Result<(), StepError> {
    let driver = drivers.device(&device)?;
    let acl_name = param_str(&step, "acl_name")?;
    let counters = driver.capture_counters().await.map_err(InfraError::from)?;
    let expect = step.expect.clone().unwrap_or_default();
    let min = expect.min_entries.unwrap_or(1);
    let hits: u64 = counters
        .entries
        .iter()
        .filter(|e| e.key == acl_name)
        .filter_map(|e| e.fields.get("hit_count"))
        .filter_map(|v| v.parse::<u64>().ok())
        .sum();
    assert_that(hits >= min, format!("acl {acl_name} hit count {hits} < {min}"))
}

async fn verify_ping(
    device: String,
    drivers: DriverSet,
    step: Step,
    platform: Platform,
) -> Result<(), StepError> {
    if !capabilities::has_dataplane(&platform) {
        return Err(StepError::Skip(
            "platform does not declare a dataplane".to_owned(),
        ));
    }

    let driver = drivers.device(&device)?;
    let target = param_str(&step, "target")?;
    // `target` may name a device rather than carry a literal IP; resolve it
    // against the topology's loopback IPs first (spec.md §4.3, "Dataplane").
    let resolved_target = match drivers.network.get_node(target) {
        Some(node) => node
            .loopback_ip
            .ok_or_else(|| StepError::Assertion(format!("device '{target}' has no loopback IP")))?,
        None => target.to_owned(),
    };

    let expect = step.expect.clone().unwrap_or_default();
    let count = expect.count_or(5);
    let command = format!("ping -c {count} {resolved_target}");
    let output = driver.run_ssh_command(&command).await.map_err(InfraError::from)?;
    let received = parse_ping_received(&output.stdout).unwrap_or(0);
    let rate = f64::from(received) / f64::from(count.max(1));
    let want_rate = expect.success_rate_or(1.0);
    assert_that(
        rate + f64::EPSILON >= want_rate,
        format!("ping success rate {rate:.2} < {want_rate:.2}"),
    )
}

fn parse_ping_received(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .find_map(|line| line.split_once("received"))
        .and_then(|(before, _)| before.trim().rsplit(|c: char| !c.is_ascii_digit()).next())
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_received_count_parses() {
        let stdout = "5 packets transmitted, 5 received, 0% packet loss, time 4005ms";
        assert_eq!(parse_ping_received(stdout), Some(5));
    }

    #[test]
    fn ping_received_count_handles_partial_loss() {
        let stdout = "5 packets transmitted, 3 received, 40% packet loss, time 4005ms";
        assert_eq!(parse_ping_received(stdout), Some(3));
    }
}
