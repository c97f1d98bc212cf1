mod engine;
mod error;
mod scenario;
mod timeline;
mod types;
mod variate;

pub use engine::{
    AGGRESSIVE_NAME, MAX_START_YEAR, MIN_START_YEAR, conservative_name, project,
    run_aggressive_simulation, run_conservative_simulation, run_projection, validate_assumptions,
    validate_options, validate_profile,
};
pub use error::{MAX_AGE, ProjectionError, ProjectionResult};
pub use scenario::{build_scenario, build_scenarios};
pub use timeline::build_deposit_timeline;
pub use types::{
    ConservativeTimelineMode, Deposit, EngineOptions, MarketAssumptions, PostRetirementScenario,
    Projection, ScenarioSet, SimulationOutcome, SimulationResult, SimulationTimelinePoint,
    UserProfile,
};
pub use variate::{entropy_rng, gaussian, seeded_rng};
