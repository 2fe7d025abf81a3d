//! Default application, run once after parsing (spec.md §4.1, "After
//! parse, defaults are applied").

use crate::{expect::ExpectBlock, scenario::Scenario};

const VERIFY_PING_DEFAULT_COUNT: u32 = 5;
const VERIFY_PING_DEFAULT_SUCCESS_RATE: f64 = 1.0;
const STATE_DB_DEFAULT_TIMEOUT_SECS: u64 = 120;
const STATE_DB_DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const BGP_DEFAULT_STATE: &str = "Established";
const ROUTE_DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Mutates every step's `expect` block in place, filling the per-action
/// defaults named in spec.md §4.1. Idempotent: running it twice on an
/// already-defaulted scenario is a no-op (spec.md §8, R2).
pub fn apply_defaults(scenario: &mut Scenario) {
    for step in &mut scenario.steps {
        match step.action.as_str() {
            "verify-ping" => {
                let expect = step.expect.get_or_insert_with(ExpectBlock::default);
                expect.count.get_or_insert(VERIFY_PING_DEFAULT_COUNT);
                expect
                    .success_rate
                    .get_or_insert(VERIFY_PING_DEFAULT_SUCCESS_RATE);
            }
            "verify-state-db" => {
                let expect = step.expect.get_or_insert_with(ExpectBlock::default);
                expect.timeout.get_or_insert(STATE_DB_DEFAULT_TIMEOUT_SECS);
                expect
                    .poll_interval
                    .get_or_insert(STATE_DB_DEFAULT_POLL_INTERVAL_SECS);
            }
            "verify-bgp" => {
                let expect = step.expect.get_or_insert_with(ExpectBlock::default);
                expect.timeout.get_or_insert(STATE_DB_DEFAULT_TIMEOUT_SECS);
                expect
                    .poll_interval
                    .get_or_insert(STATE_DB_DEFAULT_POLL_INTERVAL_SECS);
                expect
                    .state
                    .get_or_insert_with(|| BGP_DEFAULT_STATE.to_owned());
            }
            "verify-route" => {
                let expect = step.expect.get_or_insert_with(ExpectBlock::default);
                expect.timeout.get_or_insert(ROUTE_DEFAULT_TIMEOUT_SECS);
                expect
                    .source
                    .get_or_insert(crate::expect::RouteSource::AppDb);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{action::ActionName, scenario::Scenario, step::Step};

    fn step_with_action(action: &str) -> Step {
        let yaml = format!("name: s\naction: {action}\n");
        serde_yaml::from_str(&yaml).unwrap()
    }

    fn action_name(action: &str) -> ActionName {
        serde_yaml::from_str(&format!("\"{action}\"")).unwrap()
    }

    fn scenario_with(step: Step) -> Scenario {
        Scenario {
            name: "a".to_owned(),
            description: String::new(),
            topology: "t".to_owned(),
            platform: "p".to_owned(),
            requires: Vec::new(),
            requires_features: Vec::new(),
            repeat: 0,
            steps: vec![step],
        }
    }

    #[test]
    fn verify_ping_defaults() {
        let _ = action_name("verify-ping");
        let mut scenario = scenario_with(step_with_action("verify-ping"));
        super::apply_defaults(&mut scenario);
        let expect = scenario.steps[0].expect.as_ref().unwrap();
        assert_eq!(expect.count, Some(5));
        assert_eq!(expect.success_rate, Some(1.0));
    }

    #[test]
    fn verify_bgp_defaults() {
        let mut scenario = scenario_with(step_with_action("verify-bgp"));
        super::apply_defaults(&mut scenario);
        let expect = scenario.steps[0].expect.as_ref().unwrap();
        assert_eq!(expect.timeout, Some(120));
        assert_eq!(expect.poll_interval, Some(5));
        assert_eq!(expect.state.as_deref(), Some("Established"));
    }

    #[test]
    fn verify_route_defaults() {
        let mut scenario = scenario_with(step_with_action("verify-route"));
        super::apply_defaults(&mut scenario);
        let expect = scenario.steps[0].expect.as_ref().unwrap();
        assert_eq!(expect.timeout, Some(60));
        assert_eq!(expect.source, Some(crate::expect::RouteSource::AppDb));
    }

    #[test]
    fn defaults_do_not_override_explicit_values() {
        let mut step = step_with_action("verify-bgp");
        step.expect = Some(crate::expect::ExpectBlock {
            state: Some("Idle".to_owned()),
            ..Default::default()
        });
        let mut scenario = scenario_with(step);
        super::apply_defaults(&mut scenario);
        assert_eq!(
            scenario.steps[0].expect.as_ref().unwrap().state.as_deref(),
            Some("Idle")
        );
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut scenario = scenario_with(step_with_action("verify-ping"));
        super::apply_defaults(&mut scenario);
        let first = scenario.steps[0].expect.clone();
        super::apply_defaults(&mut scenario);
        let second = scenario.steps[0].expect.clone();
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
