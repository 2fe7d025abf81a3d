//! Human-facing progress lines, emitted through `tracing` so they share
//! the same subscriber/formatting configuration as the rest of the binary
//! (spec.md §4.6, "Console: append-only formatted lines").

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::result::{ScenarioResult, Status, StepResult};

use super::ProgressReporter;

/// `verbose = false` suppresses per-step lines, only reporting scenario
/// boundaries (spec.md §4.6, "quiet and verbose modes").
pub struct ConsoleReporter {
    verbose: bool,
    quiet: AtomicBool,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet: AtomicBool::new(quiet),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

#[async_trait]
impl ProgressReporter for ConsoleReporter {
    async fn suite_started(&self, suite: &str, scenario_count: usize) {
        if !self.quiet.load(Ordering::Relaxed) {
            info!(suite, scenario_count, "suite run starting");
        }
    }

    async fn scenario_started(&self, name: &str, iteration: u32) {
        if self.quiet.load(Ordering::Relaxed) {
            return;
        }
        if iteration > 1 {
            info!(scenario = name, iteration, "scenario starting");
        } else {
            info!(scenario = name, "scenario starting");
        }
    }

    async fn step_started(&self, scenario: &str, step: &str) {
        if self.verbose {
            debug!(scenario, step, "step starting");
        }
    }

    async fn step_finished(&self, scenario: &str, result: &StepResult) {
        if !self.verbose {
            return;
        }
        match result.status {
            Status::Pass => debug!(scenario, step = %result.name, "step passed"),
            Status::Skip => debug!(scenario, step = %result.name, "step skipped"),
            Status::Fail => warn!(scenario, step = %result.name, "step failed"),
            Status::Error => error!(scenario, step = %result.name, "step errored"),
        }
    }

    async fn scenario_finished(&self, result: &ScenarioResult) {
        if self.quiet.load(Ordering::Relaxed) && result.status == Status::Pass {
            return;
        }
        match result.status {
            Status::Pass => info!(scenario = %result.name, status = "PASS", "scenario finished"),
            Status::Skip => warn!(
                scenario = %result.name,
                status = "SKIP",
                reason = result.skip_reason.as_deref().unwrap_or(""),
                "scenario skipped"
            ),
            Status::Fail => error!(scenario = %result.name, status = "FAIL", "scenario finished"),
            Status::Error => error!(scenario = %result.name, status = "ERROR", "scenario finished"),
        }
    }

    async fn suite_finished(&self) {
        if !self.quiet.load(Ordering::Relaxed) {
            info!("suite run finished");
        }
    }
}
