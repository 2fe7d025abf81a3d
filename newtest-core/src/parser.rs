//! Suite loading: read every `*.yaml`/`*.yml` file in a suite directory,
//! apply defaults, and validate as one batch (spec.md §4.1, "Suite
//! parsing & validation").

use std::path::Path;

use newtest_model::{Scenario, Suite};
use tracing::{debug, instrument};

use crate::error::{SuiteLoadError, ValidationError};
use crate::graph::DependencyGraph;

pub struct LoadedSuite {
    pub suite: Suite,
    pub scenarios: Vec<Scenario>,
    pub graph: DependencyGraph,
}

#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn load_suite(dir: &Path) -> Result<LoadedSuite, SuiteLoadError> {
    if !dir.is_dir() {
        return Err(SuiteLoadError::DirNotFound(dir.display().to_string()));
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|_| SuiteLoadError::DirNotFound(dir.display().to_string()))?;

    let mut paths = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => paths.push(path),
            _ => {}
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(SuiteLoadError::Empty(dir.display().to_string()));
    }

    let mut scenarios = Vec::with_capacity(paths.len());
    for path in &paths {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| SuiteLoadError::DirNotFound(path.display().to_string()))?;
        let mut scenario: Scenario =
            serde_yaml::from_str(&contents).map_err(|source| SuiteLoadError::Yaml {
                path: path.display().to_string(),
                source,
            })?;
        newtest_model::defaults::apply_defaults(&mut scenario);
        debug!(scenario = %scenario.name, steps = scenario.steps.len(), "loaded scenario");
        scenarios.push(scenario);
    }

    let mut errors: Vec<ValidationError> = crate::validator::validate_suite(&scenarios);

    let graph = DependencyGraph::build(&scenarios);
    let declared_order: Vec<String> = scenarios.iter().map(|s| s.name.clone()).collect();
    if let Err(cycle_error) = graph.topo_order(&declared_order) {
        errors.push(cycle_error);
    }

    if !errors.is_empty() {
        return Err(SuiteLoadError::Validation(errors));
    }

    Ok(LoadedSuite {
        suite: Suite::from_dir(dir),
        scenarios,
        graph,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    async fn write_scenario(dir: &Path, name: &str, yaml: &str) {
        tokio::fs::write(dir.join(format!("{name}.yaml")), yaml)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn loads_and_orders_scenarios_by_dependency() {
        let dir = tempdir().unwrap();
        write_scenario(
            dir.path(),
            "b",
            "name: b\ntopology: t\nplatform: p\nrequires: [a]\nsteps: []\n",
        )
        .await;
        write_scenario(dir.path(), "a", "name: a\ntopology: t\nplatform: p\nsteps: []\n").await;

        let loaded = load_suite(dir.path()).await.unwrap();
        assert_eq!(loaded.scenarios.len(), 2);
        let order = loaded
            .graph
            .topo_order(&loaded.scenarios.iter().map(|s| s.name.clone()).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(order, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[tokio::test]
    async fn empty_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let result = load_suite(dir.path()).await;
        assert!(matches!(result, Err(SuiteLoadError::Empty(_))));
    }

    #[tokio::test]
    async fn missing_directory_is_rejected() {
        let result = load_suite(Path::new("/nonexistent/path/for/newtest")).await;
        assert!(matches!(result, Err(SuiteLoadError::DirNotFound(_))));
    }

    #[tokio::test]
    async fn invalid_scenario_aggregates_validation_errors() {
        let dir = tempdir().unwrap();
        write_scenario(
            dir.path(),
            "bad",
            "name: bad\ntopology: t\nplatform: p\nsteps:\n  - name: s1\n    action: create-vlan\n",
        )
        .await;
        let result = load_suite(dir.path()).await;
        match result {
            Err(SuiteLoadError::Validation(errors)) => assert!(!errors.is_empty()),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }
}
