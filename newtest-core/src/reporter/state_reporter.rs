//! Decorator that persists run-state after every scenario completes, so a
//! killed process can be resumed (or at least accurately reported on) from
//! disk (spec.md §4.6, "StateReporter (decorator)").

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::result::{ScenarioResult, StepResult};
use crate::state::{RunState, RunStatus, Store};

use super::ProgressReporter;

pub struct StateReporter<R> {
    inner: R,
    store: Store,
    state: Mutex<RunState>,
}

impl<R: ProgressReporter> StateReporter<R> {
    #[must_use]
    pub fn new(inner: R, store: Store, state: RunState) -> Self {
        Self {
            inner,
            store,
            state: Mutex::new(state),
        }
    }

    pub async fn current_state(&self) -> RunState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl<R: ProgressReporter> ProgressReporter for StateReporter<R> {
    async fn suite_started(&self, suite: &str, scenario_count: usize) {
        self.inner.suite_started(suite, scenario_count).await;
    }

    async fn scenario_started(&self, name: &str, iteration: u32) {
        self.inner.scenario_started(name, iteration).await;
    }

    async fn step_started(&self, scenario: &str, step: &str) {
        self.inner.step_started(scenario, step).await;
    }

    async fn step_finished(&self, scenario: &str, result: &StepResult) {
        {
            let mut state = self.state.lock().await;
            state.live_step_counts.record(result.status);
        }
        self.inner.step_finished(scenario, result).await;
    }

    async fn scenario_finished(&self, result: &ScenarioResult) {
        self.inner.scenario_finished(result).await;

        let mut state = self.state.lock().await;
        state.mark_scenario(
            &result.name,
            result.status,
            result.duration_ms(),
            result.skip_reason.clone(),
        );
        state.updated_at = Utc::now();
        if let Err(error) = self.store.save(&state).await {
            tracing::warn!(%error, "failed to persist run-state after scenario");
        }
    }

    async fn suite_finished(&self) {
        {
            let mut state = self.state.lock().await;
            state.status = if state.overall_status().is_passing() {
                RunStatus::Complete
            } else {
                RunStatus::Failed
            };
            state.updated_at = Utc::now();
            if let Err(error) = self.store.save(&state).await {
                tracing::warn!(%error, "failed to persist final run-state");
            }
        }
        self.inner.suite_finished().await;
    }
}
