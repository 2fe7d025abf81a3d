//! Scenario dependency graph: ordering via Kahn's algorithm, cycle
//! detection, and skip propagation when a dependency fails
//! (spec.md §4.2, "Dependency graph & ordering").

use std::collections::{BTreeMap, VecDeque};

use newtest_model::Scenario;

use crate::error::ValidationError;
use crate::result::Status;

pub struct DependencyGraph {
    /// name -> names it depends on
    requires: BTreeMap<String, Vec<String>>,
    /// name -> names that depend on it
    dependents: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn build(scenarios: &[Scenario]) -> Self {
        let mut requires = BTreeMap::new();
        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for scenario in scenarios {
            requires.insert(scenario.name.clone(), scenario.requires.clone());
            dependents.entry(scenario.name.clone()).or_default();
        }
        for scenario in scenarios {
            for dep in &scenario.requires {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(scenario.name.clone());
            }
        }

        Self { requires, dependents }
    }

    /// Topologically sort scenario names via Kahn's algorithm, breaking
    /// ties by declaration order so the run order is deterministic
    /// (spec.md §4.2: "ties broken by file order").
    ///
    /// Returns `Err` with the cycle's member names if one exists.
    pub fn topo_order(&self, declared_order: &[String]) -> Result<Vec<String>, ValidationError> {
        let mut indegree: BTreeMap<&str, usize> = self
            .requires
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect();

        let position: BTreeMap<&str, usize> = declared_order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(name, _)| *name)
            .collect();
        // Stable order among initially-ready nodes.
        let mut ready_vec: Vec<&str> = ready.drain(..).collect();
        ready_vec.sort_by_key(|name| position.get(name).copied().unwrap_or(usize::MAX));
        let mut ready: VecDeque<&str> = ready_vec.into();

        let mut order = Vec::with_capacity(self.requires.len());

        while let Some(name) = ready.pop_front() {
            order.push(name.to_owned());
            if let Some(children) = self.dependents.get(name) {
                let mut newly_ready = Vec::new();
                for child in children {
                    if let Some(count) = indegree.get_mut(child.as_str()) {
                        *count -= 1;
                        if *count == 0 {
                            newly_ready.push(child.as_str());
                        }
                    }
                }
                newly_ready.sort_by_key(|n| position.get(n).copied().unwrap_or(usize::MAX));
                for n in newly_ready {
                    ready.push_back(n);
                }
            }
        }

        if order.len() != self.requires.len() {
            let cycle: Vec<String> = self
                .requires
                .keys()
                .filter(|name| !order.contains(*name))
                .cloned()
                .collect();
            return Err(ValidationError::DependencyCycle { cycle });
        }

        Ok(order)
    }

    #[must_use]
    pub fn requires_of(&self, name: &str) -> &[String] {
        self.requires.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Given the statuses of already-run scenarios, decide whether `name`
/// should be skipped because one of its dependencies did not PASS
/// (spec.md §4.2, "a scenario whose `requires` includes a FAILed or
/// SKIPped scenario is itself SKIPped").
#[must_use]
pub fn should_skip(
    graph: &DependencyGraph,
    name: &str,
    completed: &BTreeMap<String, Status>,
) -> Option<String> {
    for dep in graph.requires_of(name) {
        match completed.get(dep) {
            Some(Status::Pass) => {}
            Some(_) | None => return Some(dep.clone()),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(name: &str, requires: &[&str]) -> Scenario {
        Scenario {
            name: name.to_owned(),
            description: String::new(),
            topology: "t".to_owned(),
            platform: "p".to_owned(),
            requires: requires.iter().map(|s| (*s).to_owned()).collect(),
            requires_features: Vec::new(),
            repeat: 0,
            steps: Vec::new(),
        }
    }

    #[test]
    fn linear_chain_orders_correctly() {
        let scenarios = vec![scenario("a", &[]), scenario("b", &["a"]), scenario("c", &["b"])];
        let graph = DependencyGraph::build(&scenarios);
        let order = graph
            .topo_order(&["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn cycle_is_detected() {
        let scenarios = vec![scenario("a", &["b"]), scenario("b", &["a"])];
        let graph = DependencyGraph::build(&scenarios);
        let result = graph.topo_order(&["a".into(), "b".into()]);
        assert!(matches!(result, Err(ValidationError::DependencyCycle { .. })));
    }

    #[test]
    fn ties_broken_by_declared_order() {
        let scenarios = vec![scenario("a", &[]), scenario("b", &[])];
        let graph = DependencyGraph::build(&scenarios);
        let order = graph.topo_order(&["b".into(), "a".into()]).unwrap();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn dependency_failure_propagates_skip() {
        let scenarios = vec![scenario("a", &[]), scenario("b", &["a"])];
        let graph = DependencyGraph::build(&scenarios);
        let mut completed = BTreeMap::new();
        completed.insert("a".to_owned(), Status::Fail);
        assert_eq!(should_skip(&graph, "b", &completed), Some("a".to_owned()));
    }

    #[test]
    fn passing_dependency_does_not_skip() {
        let scenarios = vec![scenario("a", &[]), scenario("b", &["a"])];
        let graph = DependencyGraph::build(&scenarios);
        let mut completed = BTreeMap::new();
        completed.insert("a".to_owned(), Status::Pass);
        assert_eq!(should_skip(&graph, "b", &completed), None);
    }
}
