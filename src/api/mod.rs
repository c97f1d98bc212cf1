use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, Query, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    ConservativeTimelineMode, EngineOptions, MarketAssumptions, Projection, ProjectionError,
    ProjectionResult, ScenarioSet, UserProfile, project, validate_options, validate_profile,
};
use crate::narration::{
    AdviceBrief, Narration, NarrationContext, NarrationRequest, OfflineNarrator,
    narrate_or_fallback,
};

const ENGINE_TIMEOUT: Duration = Duration::from_secs(10);
const NARRATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliConservativeTimeline {
    RepeatTerminal,
    Compounding,
}

impl From<CliConservativeTimeline> for ConservativeTimelineMode {
    fn from(value: CliConservativeTimeline) -> Self {
        match value {
            CliConservativeTimeline::RepeatTerminal => ConservativeTimelineMode::RepeatTerminal,
            CliConservativeTimeline::Compounding => ConservativeTimelineMode::Compounding,
        }
    }
}

impl From<ConservativeTimelineMode> for CliConservativeTimeline {
    fn from(value: ConservativeTimelineMode) -> Self {
        match value {
            ConservativeTimelineMode::RepeatTerminal => CliConservativeTimeline::RepeatTerminal,
            ConservativeTimelineMode::Compounding => CliConservativeTimeline::Compounding,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliScenarioSet {
    Standard,
    Full,
}

impl From<CliScenarioSet> for ScenarioSet {
    fn from(value: CliScenarioSet) -> Self {
        match value {
            CliScenarioSet::Standard => ScenarioSet::Standard,
            CliScenarioSet::Full => ScenarioSet::Full,
        }
    }
}

impl From<ScenarioSet> for CliScenarioSet {
    fn from(value: ScenarioSet) -> Self {
        match value {
            ScenarioSet::Standard => CliScenarioSet::Standard,
            ScenarioSet::Full => CliScenarioSet::Full,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "wealthpath",
    about = "Savings timeline, Monte Carlo wealth projection and retirement income coverage"
)]
pub struct Cli {
    #[arg(long)]
    pub age: u32,
    #[arg(long, help = "Investible cash / liquid assets today")]
    pub current_cash: f64,
    #[arg(long)]
    pub annual_salary: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Expected annual salary growth in percent"
    )]
    pub salary_growth: f64,
    #[arg(long, help = "Current total monthly spending")]
    pub monthly_spend: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Expected stable monthly income after retirement"
    )]
    pub stable_income_retire: f64,
    #[arg(long)]
    pub retirement_age: u32,
    #[arg(long, help = "Expected monthly spending after retirement")]
    pub monthly_spend_retire: f64,
    #[arg(long, help = "Seed for reproducible market draws; random when omitted")]
    pub seed: Option<u64>,
    #[arg(long, help = "First calendar year of the timeline; defaults to this year")]
    pub start_year: Option<i32>,
    #[arg(long, value_enum, default_value_t = CliConservativeTimeline::RepeatTerminal)]
    pub conservative_timeline: CliConservativeTimeline,
    #[arg(long, value_enum, default_value_t = CliScenarioSet::Standard)]
    pub scenario_set: CliScenarioSet,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ProjectRequest {
    pub profile: UserProfile,
    pub options: EngineOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectQuery {
    age: Option<u32>,
    #[serde(alias = "currentCash")]
    current_cash: Option<f64>,
    #[serde(alias = "annualSalary")]
    annual_salary: Option<f64>,
    #[serde(alias = "salaryGrowth")]
    salary_growth: Option<f64>,
    #[serde(alias = "monthlySpend")]
    monthly_spend: Option<f64>,
    #[serde(alias = "stableIncomeRetire")]
    stable_income_retire: Option<f64>,
    #[serde(alias = "retirementAge")]
    retirement_age: Option<u32>,
    #[serde(alias = "monthlySpendRetire")]
    monthly_spend_retire: Option<f64>,
    seed: Option<u64>,
    #[serde(alias = "startYear")]
    start_year: Option<i32>,
    #[serde(alias = "conservativeTimeline")]
    conservative_timeline: Option<ConservativeTimelineMode>,
    #[serde(alias = "scenarioSet")]
    scenario_set: Option<ScenarioSet>,
}

#[derive(Debug, Deserialize)]
struct ProjectBody {
    #[serde(flatten)]
    profile: UserProfile,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default, alias = "startYear")]
    start_year: Option<i32>,
    #[serde(default, alias = "conservativeTimeline")]
    conservative_timeline: Option<ConservativeTimelineMode>,
    #[serde(default, alias = "scenarioSet")]
    scenario_set: Option<ScenarioSet>,
}

#[derive(Debug, Deserialize)]
struct AdviceBody {
    #[serde(flatten)]
    project: ProjectBody,
    #[serde(default)]
    question: Option<String>,
}

#[derive(Debug, Serialize)]
struct AdviceResponse {
    projection: Projection,
    advice: Narration,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_request(cli: Cli) -> ProjectionResult<ProjectRequest> {
    let profile = UserProfile {
        age: cli.age,
        current_cash: cli.current_cash,
        annual_salary: cli.annual_salary,
        salary_growth: cli.salary_growth,
        monthly_spend: cli.monthly_spend,
        stable_income_retire: cli.stable_income_retire,
        retirement_age: cli.retirement_age,
        monthly_spend_retire: cli.monthly_spend_retire,
    };
    let options = EngineOptions {
        seed: cli.seed,
        start_year: cli.start_year,
        conservative_timeline: cli.conservative_timeline.into(),
        scenario_set: cli.scenario_set.into(),
    };
    validate_profile(&profile)?;
    validate_options(&options)?;

    Ok(ProjectRequest { profile, options })
}

pub fn run_cli(cli: Cli) -> Result<String, CliError> {
    let request = build_request(cli)?;
    let projection = project(
        &request.profile,
        &MarketAssumptions::default(),
        &request.options,
    )?;
    Ok(serde_json::to_string_pretty(&projection)?)
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/advice", post(advice_post_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("projection API listening on http://{addr}");
    log::info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(query: Result<Query<ProjectQuery>, QueryRejection>) -> Response {
    let request = match query
        .map_err(|e| format!("Invalid API query: {}", e.body_text()))
        .and_then(|Query(payload)| api_request_from_query(payload).map_err(|e| e.to_string()))
    {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match run_engine(request, ENGINE_TIMEOUT).await {
        Ok(projection) => json_response(StatusCode::OK, projection),
        Err(response) => response,
    }
}

async fn project_post_handler(body: String) -> Response {
    let request = match serde_json::from_str::<ProjectBody>(&body)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))
        .and_then(|body| api_request_from_body(body).map_err(|e| e.to_string()))
    {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match run_engine(request, ENGINE_TIMEOUT).await {
        Ok(projection) => json_response(StatusCode::OK, projection),
        Err(response) => response,
    }
}

async fn advice_post_handler(body: String) -> Response {
    let payload = match serde_json::from_str::<AdviceBody>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid API JSON payload: {e}"),
            );
        }
    };
    let question = payload.question.filter(|q| !q.trim().is_empty());
    let request = match api_request_from_body(payload.project) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let profile = request.profile.clone();
    let projection = match run_engine(request, ENGINE_TIMEOUT).await {
        Ok(projection) => projection,
        Err(response) => return response,
    };

    let narration_request = match question {
        Some(question) => NarrationRequest::Question {
            question,
            context: NarrationContext::from_projection(&profile, &projection),
        },
        None => NarrationRequest::Advice(AdviceBrief::from_projection(&profile, &projection)),
    };
    let advice = narrate_or_fallback(&OfflineNarrator, &narration_request, NARRATION_TIMEOUT).await;

    json_response(StatusCode::OK, AdviceResponse { projection, advice })
}

async fn run_engine(request: ProjectRequest, limit: Duration) -> Result<Projection, Response> {
    let task = tokio::task::spawn_blocking(move || {
        project(
            &request.profile,
            &MarketAssumptions::default(),
            &request.options,
        )
    });

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(projection))) => Ok(projection),
        Ok(Ok(Err(e))) => Err(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
        Ok(Err(e)) => {
            log::error!("projection task failed: {e}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Projection failed",
            ))
        }
        Err(_) => {
            log::warn!("projection exceeded {limit:?}");
            Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Projection timed out",
            ))
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn api_request_from_query(payload: ProjectQuery) -> ProjectionResult<ProjectRequest> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.age {
        cli.age = v;
    }
    if let Some(v) = payload.current_cash {
        cli.current_cash = v;
    }
    if let Some(v) = payload.annual_salary {
        cli.annual_salary = v;
    }
    if let Some(v) = payload.salary_growth {
        cli.salary_growth = v;
    }
    if let Some(v) = payload.monthly_spend {
        cli.monthly_spend = v;
    }
    if let Some(v) = payload.stable_income_retire {
        cli.stable_income_retire = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.monthly_spend_retire {
        cli.monthly_spend_retire = v;
    }
    cli.seed = payload.seed;
    cli.start_year = payload.start_year;
    if let Some(v) = payload.conservative_timeline {
        cli.conservative_timeline = v.into();
    }
    if let Some(v) = payload.scenario_set {
        cli.scenario_set = v.into();
    }

    build_request(cli)
}

fn api_request_from_body(body: ProjectBody) -> ProjectionResult<ProjectRequest> {
    let profile = body.profile;
    let cli = Cli {
        age: profile.age,
        current_cash: profile.current_cash,
        annual_salary: profile.annual_salary,
        salary_growth: profile.salary_growth,
        monthly_spend: profile.monthly_spend,
        stable_income_retire: profile.stable_income_retire,
        retirement_age: profile.retirement_age,
        monthly_spend_retire: profile.monthly_spend_retire,
        seed: body.seed,
        start_year: body.start_year,
        conservative_timeline: body.conservative_timeline.unwrap_or_default().into(),
        scenario_set: body.scenario_set.unwrap_or_default().into(),
    };
    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    let profile = UserProfile::default();
    Cli {
        age: profile.age,
        current_cash: profile.current_cash,
        annual_salary: profile.annual_salary,
        salary_growth: profile.salary_growth,
        monthly_spend: profile.monthly_spend,
        stable_income_retire: profile.stable_income_retire,
        retirement_age: profile.retirement_age,
        monthly_spend_retire: profile.monthly_spend_retire,
        seed: None,
        start_year: None,
        conservative_timeline: CliConservativeTimeline::RepeatTerminal,
        scenario_set: CliScenarioSet::Standard,
    }
}
