//! Exercises `dispatch_step` against the fakes for the executor behaviors
//! that need more than one device/driver to observe: the dataplane gate
//! and target resolution on `verify-ping`, the `fields` mode on
//! `verify-config-db`, and the changeset diff on `verify-provisioning`
//! (including the MAC re-injection `provision` does first).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use newtest_core::dispatch::executors::dispatch_step;
use newtest_core::drivers::{ChangeSetMap, CommandOutput, DeviceRole, NodeInfo, Platform};
use newtest_core::result::Status;
use newtest_model::Step;
use newtest_testkit::{DriverSetBuilder, FakeDevice, FakeNetwork};
use tokio_util::sync::CancellationToken;

fn step_from_yaml(yaml: &str) -> Step {
    serde_yaml::from_str(yaml).unwrap()
}

fn empty_changesets() -> ChangeSetMap {
    Arc::new(Mutex::new(BTreeMap::new()))
}

#[tokio::test]
async fn verify_ping_skips_when_platform_has_no_dataplane() {
    let step = step_from_yaml(
        "name: ping\naction: verify-ping\ndevices: [leaf1]\nparams:\n  target: 10.0.0.1\n",
    );
    let drivers = DriverSetBuilder::new()
        .with_device(FakeDevice::new("leaf1"))
        .with_network(FakeNetwork::new("clos", vec![]))
        .build();
    let platform = Platform::default();

    let result = dispatch_step(
        &step,
        &["leaf1".to_owned()],
        &drivers,
        &empty_changesets(),
        &platform,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result.status, Status::Skip);
    assert_eq!(result.devices[0].status, Status::Skip);
}

#[tokio::test]
async fn verify_ping_resolves_target_device_to_loopback_ip() {
    let step = step_from_yaml(
        "name: ping\naction: verify-ping\ndevices: [leaf1]\nparams:\n  target: leaf2\nexpect:\n  count: 3\n",
    );
    let device = FakeDevice::new("leaf1").with_ssh_response(
        "ping -c 3 192.0.2.2",
        CommandOutput {
            exit_code: 0,
            stdout: "3 packets transmitted, 3 received, 0% packet loss".to_owned(),
            stderr: String::new(),
        },
    );
    let drivers = DriverSetBuilder::new()
        .with_device(device)
        .with_network(FakeNetwork::new(
            "clos",
            vec![
                NodeInfo {
                    name: "leaf1".to_owned(),
                    role: DeviceRole::Leaf,
                    loopback_ip: None,
                },
                NodeInfo {
                    name: "leaf2".to_owned(),
                    role: DeviceRole::Leaf,
                    loopback_ip: Some("192.0.2.2".to_owned()),
                },
            ],
        ))
        .build();
    let platform = Platform {
        dataplane: Some("vpp".to_owned()),
        features: Vec::new(),
    };

    let result = dispatch_step(
        &step,
        &["leaf1".to_owned()],
        &drivers,
        &empty_changesets(),
        &platform,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result.status, Status::Pass);
}

#[tokio::test]
async fn verify_ping_treats_unknown_target_as_literal_ip() {
    let step = step_from_yaml(
        "name: ping\naction: verify-ping\ndevices: [leaf1]\nparams:\n  target: 198.51.100.9\nexpect:\n  count: 1\n",
    );
    let device = FakeDevice::new("leaf1").with_ssh_response(
        "ping -c 1 198.51.100.9",
        CommandOutput {
            exit_code: 0,
            stdout: "1 packets transmitted, 1 received, 0% packet loss".to_owned(),
            stderr: String::new(),
        },
    );
    let drivers = DriverSetBuilder::new()
        .with_device(device)
        .with_network(FakeNetwork::new("clos", vec![]))
        .build();
    let platform = Platform {
        dataplane: Some("vpp".to_owned()),
        features: Vec::new(),
    };

    let result = dispatch_step(
        &step,
        &["leaf1".to_owned()],
        &drivers,
        &empty_changesets(),
        &platform,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result.status, Status::Pass);
}

#[tokio::test]
async fn verify_config_db_fields_mode_matches_per_field_equality() {
    let step = step_from_yaml(
        "name: check\naction: verify-config-db\ndevices: [leaf1]\nparams:\n  table: PORT\nexpect:\n  fields:\n    admin_status: up\n",
    );
    let mut fields = BTreeMap::new();
    fields.insert("admin_status".to_owned(), "up".to_owned());
    let device = FakeDevice::new("leaf1").with_config_db_entry("PORT", "Ethernet0", fields);
    let drivers = DriverSetBuilder::new()
        .with_device(device)
        .with_network(FakeNetwork::new("clos", vec![]))
        .build();
    let platform = Platform::default();

    let result = dispatch_step(
        &step,
        &["leaf1".to_owned()],
        &drivers,
        &empty_changesets(),
        &platform,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result.status, Status::Pass);
}

#[tokio::test]
async fn verify_config_db_fields_mode_fails_on_mismatch() {
    let step = step_from_yaml(
        "name: check\naction: verify-config-db\ndevices: [leaf1]\nparams:\n  table: PORT\nexpect:\n  fields:\n    admin_status: up\n",
    );
    let mut fields = BTreeMap::new();
    fields.insert("admin_status".to_owned(), "down".to_owned());
    let device = FakeDevice::new("leaf1").with_config_db_entry("PORT", "Ethernet0", fields);
    let drivers = DriverSetBuilder::new()
        .with_device(device)
        .with_network(FakeNetwork::new("clos", vec![]))
        .build();
    let platform = Platform::default();

    let result = dispatch_step(
        &step,
        &["leaf1".to_owned()],
        &drivers,
        &empty_changesets(),
        &platform,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result.status, Status::Fail);
}

#[tokio::test]
async fn provision_reinjects_platform_mac_and_records_changeset() {
    let provision_step = step_from_yaml(
        "name: provision\naction: provision\ndevices: [leaf1]\nparams:\n  config: \"VLAN|100: {}\"\n",
    );
    let verify_step = step_from_yaml("name: verify\naction: verify-provisioning\ndevices: [leaf1]\n");

    let mut mac_fields = BTreeMap::new();
    mac_fields.insert("mac_addr".to_owned(), "00:11:22:33:44:55".to_owned());
    let device = FakeDevice::new("leaf1").with_config_db_entry("DEVICE_METADATA", "localhost", mac_fields);
    let drivers = DriverSetBuilder::new()
        .with_device(device)
        .with_network(FakeNetwork::new("clos", vec![]))
        .build();
    let changesets = empty_changesets();
    let platform = Platform::default();
    let cancel = CancellationToken::new();

    let provision_result = dispatch_step(
        &provision_step,
        &["leaf1".to_owned()],
        &drivers,
        &changesets,
        &platform,
        &cancel,
    )
    .await;
    assert_eq!(provision_result.status, Status::Pass);

    let recorded = changesets.lock().unwrap().get("leaf1").cloned();
    let recorded = recorded.expect("provision records a changeset for the device");
    assert_eq!(recorded.entries.len(), 1);
    assert_eq!(
        recorded.entries[0].fields.get("mac_addr").map(String::as_str),
        Some("00:11:22:33:44:55")
    );

    let verify_result = dispatch_step(
        &verify_step,
        &["leaf1".to_owned()],
        &drivers,
        &changesets,
        &platform,
        &cancel,
    )
    .await;
    assert_eq!(verify_result.status, Status::Pass);
}

#[tokio::test]
async fn verify_provisioning_fails_when_changeset_entry_missing() {
    let verify_step = step_from_yaml("name: verify\naction: verify-provisioning\ndevices: [leaf1]\n");
    let drivers = DriverSetBuilder::new()
        .with_device(FakeDevice::new("leaf1"))
        .with_network(FakeNetwork::new("clos", vec![]))
        .build();

    let changesets = empty_changesets();
    changesets.lock().unwrap().insert(
        "leaf1".to_owned(),
        newtest_core::drivers::ChangeSet {
            entries: vec![newtest_core::drivers::ChangeEntry {
                table: "DEVICE_METADATA".to_owned(),
                key: "localhost".to_owned(),
                fields: {
                    let mut fields = BTreeMap::new();
                    fields.insert("mac_addr".to_owned(), "aa:bb:cc:dd:ee:ff".to_owned());
                    fields
                },
            }],
        },
    );

    let result = dispatch_step(
        &verify_step,
        &["leaf1".to_owned()],
        &drivers,
        &changesets,
        &Platform::default(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(result.status, Status::Fail);
}
