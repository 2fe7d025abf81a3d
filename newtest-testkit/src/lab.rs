//! In-memory `LabDriver` fake: tracks deploy/destroy state without
//! touching a real deployer.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use newtest_core::drivers::{DriverError, LabDriver, LabStatus, NodeStatus};

pub struct FakeLab {
    node_names: Vec<String>,
    deployed: AtomicBool,
    fail_deploy: AtomicBool,
}

impl FakeLab {
    #[must_use]
    pub fn new(node_names: Vec<String>) -> Self {
        Self {
            node_names,
            deployed: AtomicBool::new(false),
            fail_deploy: AtomicBool::new(false),
        }
    }

    /// Make the next `deploy()` call return an error, simulating an infra
    /// failure.
    #[must_use]
    pub fn failing_deploy(self) -> Self {
        self.fail_deploy.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl LabDriver for FakeLab {
    async fn deploy(&self) -> Result<(), DriverError> {
        if self.fail_deploy.load(Ordering::SeqCst) {
            return Err(DriverError::Operation {
                device: "lab".to_owned(),
                message: "simulated deploy failure".to_owned(),
            });
        }
        self.deployed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), DriverError> {
        self.deployed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self) -> Result<LabStatus, DriverError> {
        let status = if self.deployed.load(Ordering::SeqCst) {
            "running"
        } else {
            "stopped"
        };
        Ok(LabStatus {
            nodes: self
                .node_names
                .iter()
                .map(|name| NodeStatus {
                    name: name.clone(),
                    status: status.to_owned(),
                })
                .collect(),
        })
    }

    async fn is_ready(&self) -> Result<bool, DriverError> {
        Ok(self.deployed.load(Ordering::SeqCst))
    }
}
