//! In-memory `HostDriver` fake for `host-exec` steps.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use newtest_core::drivers::{CommandOutput, DriverError, HostDriver};

pub struct FakeHost {
    name: String,
    responses: Mutex<BTreeMap<String, CommandOutput>>,
}

impl FakeHost {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(BTreeMap::new()),
        }
    }

    /// Script the output returned for `ip netns exec <device> <command>`.
    #[must_use]
    pub fn with_netns_response(
        self,
        device: impl Into<String>,
        command: impl Into<String>,
        output: CommandOutput,
    ) -> Self {
        let key = format!("{}:{}", device.into(), command.into());
        self.responses.lock().unwrap().insert(key, output);
        self
    }
}

#[async_trait]
impl HostDriver for FakeHost {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn netns_exec(&self, device: &str, command: &str) -> Result<CommandOutput, DriverError> {
        let key = format!("{device}:{command}");
        Ok(self.responses.lock().unwrap().get(&key).cloned().unwrap_or(CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }))
    }
}
