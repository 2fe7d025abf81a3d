//! The dispatcher: three shared iteration helpers
//! (`execute_for_devices`/`check_for_devices`/`poll_for_devices`) plus the
//! per-action executor table in [`executors`] (spec.md §4.5.1/§4.5.2,
//! "Shared execution helpers").

pub mod executors;

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::Utc;
use newtest_model::{ExpectBlock, Step};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::drivers::{DeviceDriver, HostDriver, Network};
use crate::error::{InfraError, StepError};
use crate::result::{DeviceResult, Status, StepResult};

/// Everything a step needs to reach its collaborators, bundled so the
/// executors don't each thread through four separate arguments.
#[derive(Clone)]
pub struct DriverSet {
    pub devices: Arc<BTreeMap<String, Arc<dyn DeviceDriver>>>,
    pub hosts: Arc<BTreeMap<String, Arc<dyn HostDriver>>>,
    pub network: Arc<dyn Network>,
}

impl DriverSet {
    pub fn device(&self, name: &str) -> Result<Arc<dyn DeviceDriver>, InfraError> {
        self.devices
            .get(name)
            .cloned()
            .ok_or_else(|| InfraError::Unreachable {
                device: name.to_owned(),
                message: "no device driver registered".to_owned(),
            })
    }

    pub fn host(&self, name: &str) -> Result<Arc<dyn HostDriver>, InfraError> {
        self.hosts
            .get(name)
            .cloned()
            .ok_or_else(|| InfraError::Unreachable {
                device: name.to_owned(),
                message: "no host driver registered".to_owned(),
            })
    }
}

/// Outcome of a single device's execution of an action, before it's rolled
/// up into a [`StepResult`].
pub struct Outcome {
    pub status: Status,
    pub message: String,
}

impl Outcome {
    #[must_use]
    pub fn pass() -> Self {
        Self {
            status: Status::Pass,
            message: String::new(),
        }
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn skip(message: impl Into<String>) -> Self {
        Self {
            status: Status::Skip,
            message: message.into(),
        }
    }

    fn from_step_result(result: Result<(), StepError>) -> Self {
        match result {
            Ok(()) => Self::pass(),
            Err(StepError::Assertion(message)) => Self::fail(message),
            Err(StepError::Infra(error)) => Self::error(error.to_string()),
            Err(StepError::Skip(message)) => Self::skip(message),
        }
    }
}

/// `executeForDevices`: run a mutating action against each selected
/// device, aggregating PASS/FAIL/ERROR across the set (spec.md §4.5.1).
#[instrument(skip_all, fields(step = %step.name, devices = device_names.len()))]
pub async fn execute_for_devices(
    step: &Step,
    device_names: &[String],
    drivers: &DriverSet,
    action: impl Fn(&str, &DriverSet) -> futures::future::BoxFuture<'static, Result<(), StepError>>,
) -> StepResult {
    let started_at = Utc::now();
    let mut results = Vec::with_capacity(device_names.len());

    for device in device_names {
        let outcome = Outcome::from_step_result(action(device, drivers).await);
        results.push(DeviceResult {
            device: device.clone(),
            status: outcome.status,
            message: outcome.message,
        });
    }

    finish(step, results, started_at)
}

/// `checkForDevices`: single-shot assertion per device, no retry
/// (spec.md §4.5.1).
#[instrument(skip_all, fields(step = %step.name, devices = device_names.len()))]
pub async fn check_for_devices(
    step: &Step,
    device_names: &[String],
    drivers: &DriverSet,
    action: impl Fn(&str, &DriverSet) -> futures::future::BoxFuture<'static, Result<(), StepError>>,
) -> StepResult {
    execute_for_devices(step, device_names, drivers, action).await
}

/// `pollForDevices`: retry each device's check on `poll_interval` until it
/// passes or `timeout` elapses (spec.md §4.5.1, "Poll-kind actions").
#[instrument(skip_all, fields(step = %step.name, devices = device_names.len()))]
pub async fn poll_for_devices(
    step: &Step,
    device_names: &[String],
    drivers: &DriverSet,
    expect: &ExpectBlock,
    cancel: &CancellationToken,
    action: impl Fn(&str, &DriverSet) -> futures::future::BoxFuture<'static, Result<(), StepError>>,
) -> StepResult {
    let started_at = Utc::now();
    let timeout = Duration::from_secs(expect.timeout_secs_or(60));
    let poll_interval = Duration::from_secs(expect.poll_interval_secs_or(5).max(1));
    let deadline = tokio::time::Instant::now() + timeout;

    let mut results = Vec::with_capacity(device_names.len());
    for device in device_names {
        let mut last_outcome = Outcome::fail("poll did not run");
        loop {
            last_outcome = Outcome::from_step_result(action(device, drivers).await);
            if matches!(last_outcome.status, Status::Pass | Status::Skip) {
                break;
            }
            if cancel.is_cancelled() {
                last_outcome = Outcome::error("run cancelled during poll");
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = cancel.cancelled() => {
                    last_outcome = Outcome::error("run cancelled during poll");
                    break;
                }
            }
        }
        results.push(DeviceResult {
            device: device.clone(),
            status: last_outcome.status,
            message: last_outcome.message,
        });
    }

    finish(step, results, started_at)
}

fn finish(step: &Step, devices: Vec<DeviceResult>, started_at: chrono::DateTime<Utc>) -> StepResult {
    let status = Status::worst_of(devices.iter().map(|d| d.status));
    StepResult {
        name: step.name.clone(),
        action: step.action.as_str().to_owned(),
        status,
        devices,
        started_at,
        finished_at: Utc::now(),
    }
}
