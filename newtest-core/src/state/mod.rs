//! Crash-safe suite run-state: atomic tempfile-then-rename writes, a
//! PID-based advisory lock so two `start` invocations on the same suite
//! can't race, and liveness checks for stale locks left behind by a killed
//! process (spec.md §3, "RunState"; §4.3, "Run-state & crash recovery").

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};
use tracing::{info, warn};

use crate::error::StateError;
use crate::result::Status;

/// spec.md §3: `status` ∈ {running, pausing, paused, complete, failed, aborted}.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Pausing,
    Paused,
    Complete,
    Failed,
    Aborted,
}

/// One row of `scenarios[]` (spec.md §3). `status: None` renders as `""`
/// for a scenario that hasn't started yet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub status: Option<Status>,
    pub duration_ms: i64,
    pub skip_reason: Option<String>,
}

impl ScenarioSummary {
    fn pending(name: String) -> Self {
        Self {
            name,
            status: None,
            duration_ms: 0,
            skip_reason: None,
        }
    }
}

/// Live per-step tally for the scenario currently in flight, driving
/// `status` command output while a suite is running (spec.md §3, "live
/// step counts for status rendering").
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct StepCounts {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub errored: u32,
}

impl StepCounts {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::Skip => self.skipped += 1,
            Status::Error => self.errored += 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunState {
    pub suite: String,
    pub suite_dir: PathBuf,
    pub topology: String,
    pub platform: String,
    pub pid: u32,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioSummary>,
    pub live_step_counts: StepCounts,
}

impl RunState {
    #[must_use]
    pub fn new(
        suite: impl Into<String>,
        suite_dir: PathBuf,
        topology: impl Into<String>,
        platform: impl Into<String>,
        pid: u32,
        scenario_names: impl IntoIterator<Item = String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            suite: suite.into(),
            suite_dir,
            topology: topology.into(),
            platform: platform.into(),
            pid,
            status: RunStatus::Running,
            started_at: now,
            updated_at: now,
            scenarios: scenario_names.into_iter().map(ScenarioSummary::pending).collect(),
            live_step_counts: StepCounts::default(),
        }
    }

    pub fn mark_scenario(
        &mut self,
        name: &str,
        status: Status,
        duration_ms: i64,
        skip_reason: Option<String>,
    ) {
        if let Some(summary) = self.scenarios.iter_mut().find(|s| s.name == name) {
            summary.status = Some(status);
            summary.duration_ms = duration_ms;
            summary.skip_reason = skip_reason;
        }
        self.live_step_counts = StepCounts::default();
    }

    #[must_use]
    pub fn overall_status(&self) -> Status {
        Status::worst_of(self.scenarios.iter().filter_map(|s| s.status))
    }
}

/// The on-disk run-state store, rooted at `~/.newtron/newtest/<suite>/`
/// (spec.md GLOSSARY, "state root"; [`newtest_env::state_root`]).
pub struct Store {
    suite_dir: PathBuf,
}

const STATE_FILE: &str = "run-state.json";
const LOCK_FILE: &str = "run.lock";

impl Store {
    #[must_use]
    pub fn new(suite: &str) -> Self {
        Self {
            suite_dir: newtest_env::suite_state_dir(suite),
        }
    }

    #[must_use]
    pub fn for_dir(suite_dir: PathBuf) -> Self {
        Self { suite_dir }
    }

    fn state_path(&self) -> PathBuf {
        self.suite_dir.join(STATE_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.suite_dir.join(LOCK_FILE)
    }

    /// Atomically persist `state`: write to a sibling tempfile in the same
    /// directory, then rename over the target so a reader never observes a
    /// half-written file (spec.md §4.3, "Writes are atomic").
    pub async fn save(&self, state: &RunState) -> Result<(), StateError> {
        tokio::fs::create_dir_all(&self.suite_dir)
            .await
            .map_err(|source| StateError::Write {
                path: self.suite_dir.display().to_string(),
                source,
            })?;

        let json = serde_json::to_vec_pretty(state)?;
        let dir = self.suite_dir.clone();
        let target = self.state_path();

        tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            std::io::Write::write_all(&mut tmp, &json)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .expect("blocking write task panicked")
        .map_err(|source| StateError::Write {
            path: self.state_path().display().to_string(),
            source,
        })
    }

    pub async fn load(&self) -> Result<RunState, StateError> {
        let path = self.state_path();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| StateError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn try_load(&self) -> Result<Option<RunState>, StateError> {
        match self.load().await {
            Ok(state) => Ok(Some(state)),
            Err(StateError::Read { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Deletes the state file and any lock on `stop` (spec.md §3,
    /// "deleted on `stop`").
    pub async fn remove(&self) -> Result<(), StateError> {
        let _ = tokio::fs::remove_file(self.lock_path()).await;
        tokio::fs::remove_file(self.state_path())
            .await
            .or_else(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })
            .map_err(|source| StateError::Write {
                path: self.state_path().display().to_string(),
                source,
            })
    }

    /// Acquire the suite's run lock, refusing if another live process
    /// already holds it (spec.md §4.3, "Lock discipline"). A lock file
    /// whose recorded PID is no longer alive is treated as stale and
    /// reclaimed.
    ///
    /// The lock file is created with `O_EXCL` semantics
    /// (`create_new`) so two processes racing this call can never both
    /// observe success: only one `create_new` wins, the other sees
    /// `AlreadyExists` and falls back to the reclaim check.
    pub async fn acquire_lock(&self, suite: &str) -> Result<(), StateError> {
        tokio::fs::create_dir_all(&self.suite_dir)
            .await
            .map_err(|source| StateError::Write {
                path: self.suite_dir.display().to_string(),
                source,
            })?;

        let lock_path = self.lock_path();
        let pid = std::process::id();

        if Self::try_create_lock(&lock_path, pid).await? {
            info!(suite, pid, "acquired run lock");
            return Ok(());
        }

        let existing = tokio::fs::read_to_string(&lock_path).await.unwrap_or_default();
        if let Ok(holder) = existing.trim().parse::<u32>() {
            if is_process_alive(holder) {
                return Err(StateError::AlreadyLocked(suite.to_owned(), holder));
            }
            warn!(suite, pid = holder, "reclaiming stale lock from dead process");
        } else {
            warn!(suite, "reclaiming unreadable lock file");
        }

        // The holder is dead (or the file is unreadable): drop it and retry
        // the exclusive create once. If another process reclaims first, its
        // `create_new` wins and ours reports the lock as held, rather than
        // both sides believing they acquired it.
        let _ = tokio::fs::remove_file(&lock_path).await;
        if Self::try_create_lock(&lock_path, pid).await? {
            info!(suite, pid, "acquired run lock");
            Ok(())
        } else {
            Err(StateError::AlreadyLocked(suite.to_owned(), pid))
        }
    }

    /// Exclusively create `lock_path` and write `pid` into it, returning
    /// `Ok(false)` (not an error) when the file already exists so the
    /// caller can fall back to reclaim logic without a second racy create.
    async fn try_create_lock(lock_path: &Path, pid: u32) -> Result<bool, StateError> {
        use tokio::io::AsyncWriteExt as _;

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
            .await
        {
            Ok(mut file) => {
                file.write_all(pid.to_string().as_bytes())
                    .await
                    .map_err(|source| StateError::Write {
                        path: lock_path.display().to_string(),
                        source,
                    })?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(StateError::Write {
                path: lock_path.display().to_string(),
                source,
            }),
        }
    }

    pub async fn release_lock(&self) -> Result<(), StateError> {
        match tokio::fs::remove_file(self.lock_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Write {
                path: self.lock_path().display().to_string(),
                source,
            }),
        }
    }

    /// Whether a `pause` request has been recorded for this suite. The
    /// runner polls this between scenarios to honor a user-requested pause
    /// without tearing down the process (spec.md §4.3, "pause semantics").
    pub async fn check_pausing(&self) -> bool {
        matches!(
            self.try_load().await,
            Ok(Some(state)) if matches!(state.status, RunStatus::Pausing | RunStatus::Paused)
        )
    }

    pub async fn list_suites(base: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(mut entries) = tokio::fs::read_dir(base).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

/// Cross-platform process-liveness check used to detect stale locks
/// (spec.md §9, "Stale lock detection").
#[must_use]
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::for_dir(dir.path().to_path_buf());
        (dir, store)
    }

    fn sample_state() -> RunState {
        RunState::new(
            "suite-a",
            PathBuf::from("/suites/suite-a"),
            "leaf-spine",
            "sonic",
            1234,
            vec!["scenario-a".to_owned(), "scenario-b".to_owned()],
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_dir, store) = tmp_store();
        let state = sample_state();
        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.suite, "suite-a");
        assert_eq!(loaded.pid, 1234);
        assert_eq!(loaded.scenarios.len(), 2);
        assert!(loaded.scenarios[0].status.is_none());
    }

    #[tokio::test]
    async fn try_load_returns_none_when_absent() {
        let (_dir, store) = tmp_store();
        assert!(store.try_load().await.unwrap().is_none());
    }

    #[test]
    fn mark_scenario_updates_summary_and_resets_live_counts() {
        let mut state = sample_state();
        state.live_step_counts.record(Status::Pass);
        state.mark_scenario("scenario-a", Status::Pass, 1500, None);
        assert_eq!(state.scenarios[0].status, Some(Status::Pass));
        assert_eq!(state.scenarios[0].duration_ms, 1500);
        assert_eq!(state.live_step_counts.passed, 0);
    }

    #[test]
    fn overall_status_ignores_pending_scenarios() {
        let mut state = sample_state();
        state.mark_scenario("scenario-a", Status::Fail, 10, None);
        assert_eq!(state.overall_status(), Status::Fail);
    }

    #[tokio::test]
    async fn acquire_lock_succeeds_when_unlocked() {
        let (_dir, store) = tmp_store();
        store.acquire_lock("suite-a").await.unwrap();
        store.release_lock().await.unwrap();
    }

    #[tokio::test]
    async fn acquire_lock_reclaims_stale_lock() {
        let (dir, store) = tmp_store();
        tokio::fs::write(dir.path().join(LOCK_FILE), "999999999")
            .await
            .unwrap();
        store.acquire_lock("suite-a").await.unwrap();
    }

    #[tokio::test]
    async fn acquire_lock_fails_when_held_by_live_process() {
        let (dir, store) = tmp_store();
        let my_pid = std::process::id();
        tokio::fs::write(dir.path().join(LOCK_FILE), my_pid.to_string())
            .await
            .unwrap();
        let result = store.acquire_lock("suite-a").await;
        assert!(matches!(result, Err(StateError::AlreadyLocked(_, pid)) if pid == my_pid));
    }

    #[test]
    fn current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }
}
