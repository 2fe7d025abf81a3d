//! In-memory `DeviceDriver`/`HostDriver`/`LabDriver`/`Network` fakes, used
//! by `newtest-core`'s integration tests and `newtest-cli`'s end-to-end
//! tests in place of a real fabric (spec.md §6, "Driver contracts
//! consumed").

pub mod device;
pub mod host;
pub mod lab;
pub mod network;

pub use device::FakeDevice;
pub use host::FakeHost;
pub use lab::FakeLab;
pub use network::FakeNetwork;

use std::collections::BTreeMap;
use std::sync::Arc;

use newtest_core::drivers::{DeviceDriver, HostDriver, Network};
use newtest_core::DriverSet;

/// Assembles a [`DriverSet`] from fakes without each caller hand-rolling
/// the `Arc<BTreeMap<...>>` plumbing.
#[derive(Default)]
pub struct DriverSetBuilder {
    devices: BTreeMap<String, Arc<dyn DeviceDriver>>,
    hosts: BTreeMap<String, Arc<dyn HostDriver>>,
    network: Option<Arc<dyn Network>>,
}

impl DriverSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_device(mut self, device: FakeDevice) -> Self {
        self.devices.insert(device.name().to_owned(), Arc::new(device));
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: FakeHost) -> Self {
        self.hosts.insert(host.name().to_owned(), Arc::new(host));
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: FakeNetwork) -> Self {
        self.network = Some(Arc::new(network));
        self
    }

    /// # Panics
    /// Panics if [`DriverSetBuilder::with_network`] was never called —
    /// every suite needs a `Network` to resolve step device lists.
    #[must_use]
    pub fn build(self) -> DriverSet {
        DriverSet {
            devices: Arc::new(self.devices),
            hosts: Arc::new(self.hosts),
            network: self.network.expect("DriverSetBuilder requires a network"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newtest_core::drivers::{DeviceRole, NodeInfo};

    #[tokio::test]
    async fn built_driver_set_resolves_registered_device() {
        let drivers = DriverSetBuilder::new()
            .with_device(FakeDevice::new("leaf1"))
            .with_network(FakeNetwork::new(
                "clos",
                vec![NodeInfo {
                    name: "leaf1".to_owned(),
                    role: DeviceRole::Leaf,
                    loopback_ip: None,
                }],
            ))
            .build();

        let device = drivers.device("leaf1").expect("registered device");
        assert_eq!(device.name(), "leaf1");
    }

    #[tokio::test]
    async fn missing_device_is_an_infra_error() {
        let drivers = DriverSetBuilder::new().with_network(FakeNetwork::new("clos", vec![])).build();
        assert!(drivers.device("ghost").is_err());
    }
}
