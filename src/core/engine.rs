use chrono::Datelike;
use rand::Rng;

use super::error::{MAX_AGE, ProjectionError, ProjectionResult};
use super::scenario::build_scenarios;
use super::timeline::build_deposit_timeline;
use super::types::{
    ConservativeTimelineMode, Deposit, EngineOptions, MarketAssumptions, Projection,
    SimulationOutcome, SimulationResult, SimulationTimelinePoint, UserProfile,
};
use super::variate::{entropy_rng, gaussian, seeded_rng};

pub const AGGRESSIVE_NAME: &str = "Aggressive (S&P 500 ETF)";

pub const MIN_START_YEAR: i32 = 1900;
pub const MAX_START_YEAR: i32 = 9999;

pub fn project(
    profile: &UserProfile,
    market: &MarketAssumptions,
    options: &EngineOptions,
) -> ProjectionResult<Projection> {
    validate_profile(profile)?;
    validate_assumptions(market)?;
    validate_options(options)?;

    let start_year = options
        .start_year
        .unwrap_or_else(|| chrono::Local::now().year());
    let projection = match options.seed {
        Some(seed) => {
            let mut rng = seeded_rng(seed);
            run_projection(profile, market, options, start_year, &mut rng)
        }
        None => run_projection(profile, market, options, start_year, &mut entropy_rng()),
    };
    Ok(projection)
}

pub fn run_projection<R: Rng + ?Sized>(
    profile: &UserProfile,
    market: &MarketAssumptions,
    options: &EngineOptions,
    start_year: i32,
    rng: &mut R,
) -> Projection {
    let deposit_timeline = build_deposit_timeline(profile, start_year, market.spending_inflation);
    if deposit_timeline.is_empty() {
        log::debug!(
            "no working years (age {} retirement age {}); wealth stays at current cash",
            profile.age,
            profile.retirement_age
        );
    }

    let aggressive =
        run_aggressive_simulation(&deposit_timeline, profile.current_cash, market, rng);
    let conservative = run_conservative_simulation(
        &deposit_timeline,
        profile.current_cash,
        market,
        options.conservative_timeline,
    );
    log::debug!(
        "projection over {} years: aggressive {:?}, conservative {:?}",
        deposit_timeline.len(),
        aggressive.outcomes,
        conservative.outcomes
    );

    let scenarios = build_scenarios(
        &aggressive,
        &conservative,
        market.base_yield,
        profile.monthly_spend_retire,
        options.scenario_set,
    );

    Projection {
        deposit_timeline,
        aggressive,
        conservative,
        scenarios,
    }
}

/// The returned `timeline` is a closed-form illustration at the mean return
/// and at `mean ± stdev * illustrative_band`. It is not computed from the
/// trajectories and does not end at the outcome percentiles.
pub fn run_aggressive_simulation<R: Rng + ?Sized>(
    deposits: &[Deposit],
    current_cash: f64,
    market: &MarketAssumptions,
    rng: &mut R,
) -> SimulationResult {
    let mut terminal = Vec::with_capacity(market.simulations as usize);
    for _ in 0..market.simulations {
        terminal.push(simulate_trajectory(deposits, current_cash, market, rng));
    }
    terminal.sort_by(|a, b| a.total_cmp(b));

    let outcomes = if terminal.is_empty() {
        SimulationOutcome::flat(current_cash)
    } else {
        SimulationOutcome {
            best: percentile_by_index(&terminal, market.best_percentile),
            avg: percentile_by_index(&terminal, market.avg_percentile),
            worst: percentile_by_index(&terminal, market.worst_percentile),
        }
    };

    SimulationResult {
        name: AGGRESSIVE_NAME.to_string(),
        outcomes,
        timeline: illustrative_timeline(deposits, current_cash, market),
    }
}

fn simulate_trajectory<R: Rng + ?Sized>(
    deposits: &[Deposit],
    current_cash: f64,
    market: &MarketAssumptions,
    rng: &mut R,
) -> f64 {
    let mut wealth = current_cash;
    for deposit in deposits {
        wealth += deposit.monthly_deposit * 12.0;
        let annual_return = gaussian(rng, market.mean_return, market.return_stdev);
        wealth *= 1.0 + annual_return;
    }
    wealth
}

/// Value at index `floor(n * p)` of an ascending slice. No interpolation.
fn percentile_by_index(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn illustrative_timeline(
    deposits: &[Deposit],
    current_cash: f64,
    market: &MarketAssumptions,
) -> Vec<SimulationTimelinePoint> {
    let band = market.return_stdev * market.illustrative_band;
    deposits
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let years = (i + 1) as i32;
            let principal = current_cash + d.monthly_deposit * 12.0 * years as f64;
            SimulationTimelinePoint {
                year: d.year,
                best: principal * (1.0 + market.mean_return + band).powi(years),
                avg: principal * (1.0 + market.mean_return).powi(years),
                worst: principal * (1.0 + market.mean_return - band).powi(years),
            }
        })
        .collect()
}

pub fn conservative_name(market: &MarketAssumptions) -> String {
    format!("Conservative ({}% Dividend Yield)", market.base_yield * 100.0)
}

pub fn run_conservative_simulation(
    deposits: &[Deposit],
    current_cash: f64,
    market: &MarketAssumptions,
    mode: ConservativeTimelineMode,
) -> SimulationResult {
    let best_rate = market.base_yield + market.yield_spread;
    let avg_rate = market.base_yield;
    let worst_rate = market.base_yield - market.yield_spread;

    let best_path = compound_path(deposits, current_cash, best_rate);
    let avg_path = compound_path(deposits, current_cash, avg_rate);
    let worst_path = compound_path(deposits, current_cash, worst_rate);

    let outcomes = SimulationOutcome {
        best: best_path.last().copied().unwrap_or(current_cash),
        avg: avg_path.last().copied().unwrap_or(current_cash),
        worst: worst_path.last().copied().unwrap_or(current_cash),
    };

    let timeline = deposits
        .iter()
        .enumerate()
        .map(|(i, d)| match mode {
            ConservativeTimelineMode::RepeatTerminal => SimulationTimelinePoint {
                year: d.year,
                best: outcomes.best,
                avg: outcomes.avg,
                worst: outcomes.worst,
            },
            ConservativeTimelineMode::Compounding => SimulationTimelinePoint {
                year: d.year,
                best: best_path[i],
                avg: avg_path[i],
                worst: worst_path[i],
            },
        })
        .collect();

    SimulationResult {
        name: conservative_name(market),
        outcomes,
        timeline,
    }
}

fn compound_path(deposits: &[Deposit], current_cash: f64, rate: f64) -> Vec<f64> {
    let mut wealth = current_cash;
    deposits
        .iter()
        .map(|d| {
            wealth = (wealth + d.monthly_deposit * 12.0) * (1.0 + rate);
            wealth
        })
        .collect()
}

pub fn validate_profile(profile: &UserProfile) -> ProjectionResult<()> {
    for (field, value) in [
        ("current_cash", profile.current_cash),
        ("annual_salary", profile.annual_salary),
        ("salary_growth", profile.salary_growth),
        ("monthly_spend", profile.monthly_spend),
        ("stable_income_retire", profile.stable_income_retire),
        ("monthly_spend_retire", profile.monthly_spend_retire),
    ] {
        if !value.is_finite() {
            return Err(ProjectionError::NonFinite { field });
        }
    }

    for (field, value) in [
        ("current_cash", profile.current_cash),
        ("annual_salary", profile.annual_salary),
        ("monthly_spend", profile.monthly_spend),
        ("stable_income_retire", profile.stable_income_retire),
        ("monthly_spend_retire", profile.monthly_spend_retire),
    ] {
        if value < 0.0 {
            return Err(ProjectionError::Negative { field });
        }
    }

    if profile.age > MAX_AGE {
        return Err(ProjectionError::AgeOutOfRange { field: "age" });
    }
    if profile.retirement_age > MAX_AGE {
        return Err(ProjectionError::AgeOutOfRange {
            field: "retirement_age",
        });
    }

    if profile.salary_growth <= -100.0 {
        return Err(ProjectionError::SalaryGrowthOutOfRange);
    }

    Ok(())
}

pub fn validate_options(options: &EngineOptions) -> ProjectionResult<()> {
    let in_range = |year: i32| (MIN_START_YEAR..=MAX_START_YEAR).contains(&year);
    if options.start_year.is_some_and(|year| !in_range(year)) {
        return Err(ProjectionError::InvalidOption(format!(
            "start_year must be between {MIN_START_YEAR} and {MAX_START_YEAR}"
        )));
    }
    Ok(())
}

pub fn validate_assumptions(market: &MarketAssumptions) -> ProjectionResult<()> {
    let invalid = |msg: &str| Err(ProjectionError::InvalidAssumptions(msg.to_string()));

    if market.simulations == 0 {
        return invalid("simulations must be > 0");
    }
    if !market.return_stdev.is_finite() || market.return_stdev < 0.0 {
        return invalid("return_stdev must be >= 0");
    }
    if !market.mean_return.is_finite() || !market.illustrative_band.is_finite() {
        return invalid("mean_return and illustrative_band must be finite");
    }
    for p in [
        market.worst_percentile,
        market.avg_percentile,
        market.best_percentile,
    ] {
        if !(0.0..1.0).contains(&p) {
            return invalid("percentiles must be in [0, 1)");
        }
    }
    if !(market.worst_percentile <= market.avg_percentile
        && market.avg_percentile <= market.best_percentile)
    {
        return invalid("percentiles must be ordered worst <= avg <= best");
    }
    if !market.base_yield.is_finite()
        || !market.yield_spread.is_finite()
        || market.base_yield - market.yield_spread <= -1.0
    {
        return invalid("base_yield - yield_spread must be > -100%");
    }
    if !market.spending_inflation.is_finite() || market.spending_inflation <= -1.0 {
        return invalid("spending_inflation must be > -100%");
    }

    Ok(())
}
