//! Phase 1 ("Select") of the runner, at the CLI boundary: resolve a
//! single requested scenario name against the loaded set, or fall
//! through to every scenario when none was given (spec.md §4.4, "If a
//! single scenario name is requested, resolve it... ambiguity is an
//! error. If `--all`, load every YAML in the suite dir.").

use anyhow::bail;
use newtest_core::LoadedSuite;
use newtest_model::Scenario;

/// Narrow `loaded` down to the scenarios matching `name`, or return every
/// scenario when `name` is `None`. Matching tries an exact name first,
/// then a suffix match (mirroring the CLI's "glob `*-<name>.yaml`"
/// fallback, since scenario identity here is the parsed `name` field
/// rather than the source file path).
pub fn select<'a>(loaded: &'a LoadedSuite, name: Option<&str>) -> anyhow::Result<Vec<&'a Scenario>> {
    let Some(name) = name else {
        return Ok(loaded.scenarios.iter().collect());
    };

    if let Some(exact) = loaded.scenarios.iter().find(|s| s.name == name) {
        return Ok(vec![exact]);
    }

    let suffix = format!("-{name}");
    let matches: Vec<&Scenario> = loaded
        .scenarios
        .iter()
        .filter(|s| s.name.ends_with(&suffix))
        .collect();

    match matches.len() {
        0 => bail!("no scenario named '{name}' found in suite"),
        1 => Ok(matches),
        _ => bail!(
            "scenario name '{name}' is ambiguous: matches {}",
            matches.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newtest_core::graph::DependencyGraph;
    use newtest_model::Suite;

    fn scenario(name: &str) -> Scenario {
        Scenario {
            name: name.to_owned(),
            description: String::new(),
            topology: "t".to_owned(),
            platform: "p".to_owned(),
            requires: Vec::new(),
            requires_features: Vec::new(),
            repeat: 0,
            steps: Vec::new(),
        }
    }

    fn loaded(names: &[&str]) -> LoadedSuite {
        let scenarios: Vec<Scenario> = names.iter().map(|n| scenario(n)).collect();
        let graph = DependencyGraph::build(&scenarios);
        LoadedSuite {
            suite: Suite::new("s", "."),
            scenarios,
            graph,
        }
    }

    #[test]
    fn no_name_selects_everything() {
        let loaded = loaded(&["a", "b"]);
        assert_eq!(select(&loaded, None).unwrap().len(), 2);
    }

    #[test]
    fn exact_name_selects_one() {
        let loaded = loaded(&["a", "b"]);
        let result = select(&loaded, Some("a")).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "a");
    }

    #[test]
    fn suffix_match_resolves_single_candidate() {
        let loaded = loaded(&["a", "prep-b"]);
        let result = select(&loaded, Some("b")).unwrap();
        assert_eq!(result[0].name, "prep-b");
    }

    #[test]
    fn ambiguous_suffix_match_is_an_error() {
        let loaded = loaded(&["rack1-smoke", "rack2-smoke"]);
        assert!(select(&loaded, Some("smoke")).is_err());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let loaded = loaded(&["a"]);
        assert!(select(&loaded, Some("ghost")).is_err());
    }
}
