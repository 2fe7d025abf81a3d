//! Parser, dependency graph, run-state store, dispatcher, and scenario
//! runner: the engine that turns a loaded suite into a [`result::SuiteResult`]
//! (spec.md §4, "Component design").

pub mod capabilities;
pub mod dispatch;
pub mod drivers;
pub mod error;
pub mod graph;
pub mod parser;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod state;
pub mod validator;

pub use dispatch::DriverSet;
pub use drivers::{DeviceDriver, HostDriver, LabDriver, Network};
pub use error::{InfraError, ScenarioError, StateError, StepError, SuiteLoadError, ValidationError};
pub use parser::{load_suite, LoadedSuite};
pub use result::{DeviceResult, ScenarioResult, Status, StepResult, SuiteResult};
pub use runner::{DeploymentMode, Runner, RunnerConfig};
pub use state::{RunState, RunStatus, Store};
