use super::types::{PostRetirementScenario, ScenarioSet, SimulationResult};

pub fn build_scenario(
    name: &str,
    final_wealth: f64,
    base_yield: f64,
    monthly_spend_retire: f64,
) -> PostRetirementScenario {
    let monthly_passive_income = final_wealth * base_yield / 12.0;
    let coverage_ratio = if monthly_spend_retire == 0.0 {
        f64::INFINITY
    } else {
        monthly_passive_income / monthly_spend_retire
    };

    PostRetirementScenario {
        name: name.to_string(),
        final_wealth,
        monthly_passive_income,
        coverage_ratio,
    }
}

pub fn build_scenarios(
    aggressive: &SimulationResult,
    conservative: &SimulationResult,
    base_yield: f64,
    monthly_spend_retire: f64,
    set: ScenarioSet,
) -> Vec<PostRetirementScenario> {
    let agg = aggressive.outcomes;
    let con = conservative.outcomes;

    let selected: Vec<(&str, f64)> = match set {
        ScenarioSet::Standard => vec![
            ("Aggressive - Best Case", agg.best),
            ("Aggressive - Avg Case", agg.avg),
            ("Aggressive - Worst Case", agg.worst),
            ("Conservative - Avg Case", con.avg),
        ],
        ScenarioSet::Full => vec![
            ("Aggressive - Best Case", agg.best),
            ("Aggressive - Avg Case", agg.avg),
            ("Aggressive - Worst Case", agg.worst),
            ("Conservative - Best Case", con.best),
            ("Conservative - Avg Case", con.avg),
            ("Conservative - Worst Case", con.worst),
        ],
    };

    selected
        .into_iter()
        .map(|(name, wealth)| build_scenario(name, wealth, base_yield, monthly_spend_retire))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SimulationOutcome;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn result(name: &str, best: f64, avg: f64, worst: f64) -> SimulationResult {
        SimulationResult {
            name: name.to_string(),
            outcomes: SimulationOutcome { best, avg, worst },
            timeline: Vec::new(),
        }
    }

    #[test]
    fn one_point_two_million_at_eight_percent_covers_four_thousand_twice() {
        let scenario = build_scenario("x", 1_200_000.0, 0.08, 4_000.0);
        assert_approx(scenario.monthly_passive_income, 8_000.0);
        assert_approx(scenario.coverage_ratio, 2.0);
        assert!(scenario.covers_spending());
    }

    #[test]
    fn zero_retirement_spending_reports_infinite_coverage() {
        let scenario = build_scenario("x", 500_000.0, 0.08, 0.0);
        assert!(scenario.coverage_ratio.is_infinite());
        assert!(scenario.covers_spending());

        let broke = build_scenario("x", 0.0, 0.08, 0.0);
        assert!(broke.coverage_ratio.is_infinite());
    }

    #[test]
    fn infinite_coverage_serializes_as_null() {
        let scenario = build_scenario("Aggressive - Avg Case", 100.0, 0.08, 0.0);
        let json = serde_json::to_string(&scenario).expect("scenario should serialize");
        assert!(json.contains("\"coverageRatio\":null"));
        assert!(json.contains("\"finalWealth\":100.0"));
        assert!(json.contains("\"monthlyPassiveIncome\""));
    }

    #[test]
    fn standard_set_surfaces_four_scenarios_in_fixed_order() {
        let agg = result("a", 3.0, 2.0, 1.0);
        let con = result("c", 30.0, 20.0, 10.0);
        let scenarios = build_scenarios(&agg, &con, 0.12, 1.0, ScenarioSet::Standard);

        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Aggressive - Best Case",
                "Aggressive - Avg Case",
                "Aggressive - Worst Case",
                "Conservative - Avg Case",
            ]
        );
        assert_approx(scenarios[0].final_wealth, 3.0);
        assert_approx(scenarios[2].final_wealth, 1.0);
        assert_approx(scenarios[3].final_wealth, 20.0);
    }

    #[test]
    fn full_set_adds_conservative_best_and_worst() {
        let agg = result("a", 3.0, 2.0, 1.0);
        let con = result("c", 30.0, 20.0, 10.0);
        let scenarios = build_scenarios(&agg, &con, 0.12, 1.0, ScenarioSet::Full);

        assert_eq!(scenarios.len(), 6);
        let best = scenarios
            .iter()
            .find(|s| s.name == "Conservative - Best Case")
            .expect("best case present");
        let worst = scenarios
            .iter()
            .find(|s| s.name == "Conservative - Worst Case")
            .expect("worst case present");
        assert_approx(best.final_wealth, 30.0);
        assert_approx(worst.final_wealth, 10.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_coverage_scales_linearly_with_final_wealth(
            wealth in 1.0f64..10_000_000.0,
            spend in 1.0f64..50_000.0
        ) {
            let single = build_scenario("x", wealth, 0.08, spend);
            let double = build_scenario("x", wealth * 2.0, 0.08, spend);
            let ratio = double.coverage_ratio / single.coverage_ratio;
            prop_assert!((ratio - 2.0).abs() < 1e-9);
        }
    }
}
