use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: u32,
    pub current_cash: f64,
    pub annual_salary: f64,
    pub salary_growth: f64,
    pub monthly_spend: f64,
    pub stable_income_retire: f64,
    pub retirement_age: u32,
    pub monthly_spend_retire: f64,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: 30,
            current_cash: 10_000.0,
            annual_salary: 80_000.0,
            salary_growth: 3.0,
            monthly_spend: 3_000.0,
            stable_income_retire: 0.0,
            retirement_age: 60,
            monthly_spend_retire: 4_000.0,
        }
    }
}

impl UserProfile {
    pub fn working_years(&self) -> u32 {
        self.retirement_age.saturating_sub(self.age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub year: i32,
    pub age: u32,
    pub monthly_deposit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationOutcome {
    pub best: f64,
    pub avg: f64,
    pub worst: f64,
}

impl SimulationOutcome {
    pub fn flat(value: f64) -> Self {
        Self {
            best: value,
            avg: value,
            worst: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationTimelinePoint {
    pub year: i32,
    pub best: f64,
    pub avg: f64,
    pub worst: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub name: String,
    pub outcomes: SimulationOutcome,
    pub timeline: Vec<SimulationTimelinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRetirementScenario {
    pub name: String,
    pub final_wealth: f64,
    pub monthly_passive_income: f64,
    /// `+inf` when no retirement spending is desired. Serializes as `null`.
    pub coverage_ratio: f64,
}

impl PostRetirementScenario {
    pub fn covers_spending(&self) -> bool {
        self.coverage_ratio >= 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub deposit_timeline: Vec<Deposit>,
    pub aggressive: SimulationResult,
    pub conservative: SimulationResult,
    pub scenarios: Vec<PostRetirementScenario>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketAssumptions {
    pub mean_return: f64,
    pub return_stdev: f64,
    pub simulations: u32,
    pub worst_percentile: f64,
    pub avg_percentile: f64,
    pub best_percentile: f64,
    pub illustrative_band: f64,
    pub base_yield: f64,
    pub yield_spread: f64,
    pub spending_inflation: f64,
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        Self {
            mean_return: 0.10,
            return_stdev: 0.18,
            simulations: 1_000,
            worst_percentile: 0.05,
            avg_percentile: 0.50,
            best_percentile: 0.95,
            illustrative_band: 0.8,
            base_yield: 0.08,
            yield_spread: 0.01,
            spending_inflation: 0.02,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConservativeTimelineMode {
    #[default]
    #[serde(alias = "repeatTerminal", alias = "repeat_terminal")]
    RepeatTerminal,
    Compounding,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioSet {
    #[default]
    Standard,
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineOptions {
    pub seed: Option<u64>,
    pub start_year: Option<i32>,
    pub conservative_timeline: ConservativeTimelineMode,
    pub scenario_set: ScenarioSet,
}
