//! Progress reporting, decorator-composed: a base reporter prints to the
//! console, and [`state_reporter::StateReporter`] wraps any reporter to
//! persist [`crate::state::RunState`] after every scenario (spec.md §4.6,
//! "Progress Reporter" — six callbacks: SuiteStart, ScenarioStart,
//! ScenarioEnd, StepStart, StepEnd, SuiteEnd).

pub mod console;
pub mod state_reporter;

use async_trait::async_trait;

use crate::result::{ScenarioResult, StepResult};

#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn suite_started(&self, suite: &str, scenario_count: usize);
    async fn scenario_started(&self, name: &str, iteration: u32);
    async fn step_started(&self, scenario: &str, step: &str);
    async fn step_finished(&self, scenario: &str, result: &StepResult);
    async fn scenario_finished(&self, result: &ScenarioResult);
    async fn suite_finished(&self);
}

pub use console::ConsoleReporter;
pub use state_reporter::StateReporter;
