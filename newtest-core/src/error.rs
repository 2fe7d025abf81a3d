//! Error taxonomy separating "the world is broken" from "the assertion
//! failed" (spec.md §7, "Error/failure taxonomy").

use thiserror::Error;

use crate::drivers::DriverError;

/// Raised by the parser/validator while loading a suite (spec.md §4.1,
/// "all violations are collected and reported together").
#[derive(Debug, Error)]
pub enum SuiteLoadError {
    #[error("suite directory not found: {0}")]
    DirNotFound(String),
    #[error("no scenario files found in {0}")]
    Empty(String),
    #[error("{path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{0} validation error(s) found")]
    Validation(Vec<ValidationError>),
}

#[derive(Debug, Error, Clone)]
pub enum ValidationError {
    #[error("{scenario}: step {step} references unknown action '{action}'")]
    UnknownAction {
        scenario: String,
        step: String,
        action: String,
    },
    #[error("{scenario}: step {step} action '{action}' requires an expect block")]
    MissingExpect {
        scenario: String,
        step: String,
        action: String,
    },
    #[error("{scenario}: step {step} action '{action}' is missing required param '{param}'")]
    MissingParam {
        scenario: String,
        step: String,
        action: String,
        param: String,
    },
    #[error("{scenario}: step {step} action '{action}' accepts a single device, but {count} were selected")]
    TooManyDevices {
        scenario: String,
        step: String,
        action: String,
        count: usize,
    },
    #[error("{scenario}: requires unknown scenario '{dependency}'")]
    UnknownDependency { scenario: String, dependency: String },
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },
    #[error("duplicate scenario name '{0}'")]
    DuplicateScenario(String),
    #[error("scenario has an empty name")]
    EmptyName,
    #[error("{scenario}: topology must not be empty")]
    EmptyTopology { scenario: String },
    #[error("{scenario}: platform must not be empty")]
    EmptyPlatform { scenario: String },
}

/// Failure of infrastructure surrounding a step (connection, timeout,
/// transport) as distinct from the step's own assertion failing
/// (spec.md §7, "Infra error vs. assertion failure").
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("device {device} is not reachable: {message}")]
    Unreachable { device: String, message: String },
    #[error("operation on {device} timed out after {secs}s")]
    Timeout { device: String, secs: u64 },
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("lab is not ready: {0}")]
    LabNotReady(String),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Outcome of a single step's execution: `Ok(())` for PASS, `Err(StepError::Assertion)`
/// for a failed check, `Err(StepError::Infra(_))` for an environment failure,
/// `Err(StepError::Skip(_))` for a step-level SKIP (spec.md §4.3, the
/// `verify-ping` dataplane probe is the only executor that raises this).
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Assertion(String),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("{0}")]
    Skip(String),
}

impl StepError {
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read run-state file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write run-state file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize run-state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("suite '{0}' is already locked by a running process (pid {1})")]
    AlreadyLocked(String, u32),
    #[error("no run-state found for suite '{0}'")]
    NotFound(String),
}

/// Top-level error returned by the runner for an entire scenario run
/// (distinct from a single step's outcome, which is captured in
/// `ScenarioResult` rather than propagated as an `Err`).
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Load(#[from] SuiteLoadError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("run cancelled")]
    Cancelled,
}
