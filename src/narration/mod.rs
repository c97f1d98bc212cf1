use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{PostRetirementScenario, Projection, SimulationResult, UserProfile};

pub const ADVICE_FALLBACK: &str = "Error generating financial advice. Please try again.";
pub const QUESTION_FALLBACK: &str = "Sorry, I couldn't process that request. Please try again.";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTone {
    Encouraging,
    Constructive,
}

impl AdviceTone {
    pub fn guidance(self) -> &'static str {
        match self {
            AdviceTone::Encouraging => {
                "Encouraging and educational. Focus on preserving and growing wealth."
            }
            AdviceTone::Constructive => {
                "Supportive and practical. Give concrete steps to close the gap."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceBrief {
    pub profile: UserProfile,
    pub average_monthly_deposit: f64,
    pub scenarios: Vec<PostRetirementScenario>,
    pub tone: AdviceTone,
}

impl AdviceBrief {
    pub fn from_projection(profile: &UserProfile, projection: &Projection) -> Self {
        let deposits = &projection.deposit_timeline;
        let average_monthly_deposit = if deposits.is_empty() {
            0.0
        } else {
            deposits.iter().map(|d| d.monthly_deposit).sum::<f64>() / deposits.len() as f64
        };
        let tone = if projection.scenarios.iter().any(|s| s.covers_spending()) {
            AdviceTone::Encouraging
        } else {
            AdviceTone::Constructive
        };

        Self {
            profile: profile.clone(),
            average_monthly_deposit,
            scenarios: projection.scenarios.clone(),
            tone,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResults {
    pub aggressive: SimulationResult,
    pub conservative: SimulationResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationContext {
    pub user_profile: UserProfile,
    pub simulation_results: SimulationResults,
    pub post_retirement_scenarios: Vec<PostRetirementScenario>,
}

impl NarrationContext {
    pub fn from_projection(profile: &UserProfile, projection: &Projection) -> Self {
        Self {
            user_profile: profile.clone(),
            simulation_results: SimulationResults {
                aggressive: projection.aggressive.clone(),
                conservative: projection.conservative.clone(),
            },
            post_retirement_scenarios: projection.scenarios.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NarrationRequest {
    Advice(AdviceBrief),
    Question {
        question: String,
        context: NarrationContext,
    },
}

impl NarrationRequest {
    pub fn prompt(&self) -> String {
        match self {
            NarrationRequest::Advice(brief) => render_advice_prompt(brief),
            NarrationRequest::Question { question, context } => {
                render_question_prompt(question, context)
            }
        }
    }

    pub fn fallback_text(&self) -> &'static str {
        match self {
            NarrationRequest::Advice(_) => ADVICE_FALLBACK,
            NarrationRequest::Question { .. } => QUESTION_FALLBACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narration {
    pub text: String,
    pub sources: Vec<Citation>,
}

#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("narrator does not support this request")]
    Unsupported,

    #[error("narration failed: {0}")]
    Failed(String),

    #[error("narration timed out after {0:?}")]
    TimedOut(Duration),
}

pub trait Narrator {
    fn narrate(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = Result<Narration, NarrationError>> + Send;
}

/// Runs the narrator under `limit`. Errors and timeouts are logged and
/// replaced by the request's fallback text with no sources.
pub async fn narrate_or_fallback<N: Narrator>(
    narrator: &N,
    request: &NarrationRequest,
    limit: Duration,
) -> Narration {
    let outcome = match tokio::time::timeout(limit, narrator.narrate(request)).await {
        Ok(result) => result,
        Err(_) => Err(NarrationError::TimedOut(limit)),
    };

    match outcome {
        Ok(narration) => narration,
        Err(e) => {
            log::warn!("narration unavailable, using fallback text: {e}");
            Narration {
                text: request.fallback_text().to_string(),
                sources: Vec::new(),
            }
        }
    }
}

// Free-text questions are unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineNarrator;

impl Narrator for OfflineNarrator {
    fn narrate(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = Result<Narration, NarrationError>> + Send {
        let result = match request {
            NarrationRequest::Advice(brief) => Ok(Narration {
                text: render_offline_summary(brief),
                sources: Vec::new(),
            }),
            NarrationRequest::Question { .. } => Err(NarrationError::Unsupported),
        };
        std::future::ready(result)
    }
}

pub fn render_advice_prompt(brief: &AdviceBrief) -> String {
    let p = &brief.profile;
    let mut lines = vec![
        "You are a private wealth advisor. Review this profile and projection and give personalised guidance.".to_string(),
        String::new(),
        "Profile:".to_string(),
        format!("- Age: {}", p.age),
        format!("- Investible cash: {}", format_currency(p.current_cash)),
        format!(
            "- Annual salary: {} ({}% expected annual growth)",
            format_currency(p.annual_salary),
            p.salary_growth
        ),
        format!("- Monthly spending: {}", format_currency(p.monthly_spend)),
        format!("- Retirement age: {}", p.retirement_age),
        format!(
            "- Monthly spending after retirement: {}",
            format_currency(p.monthly_spend_retire)
        ),
        String::new(),
        format!(
            "Average projected monthly saving until retirement: {}",
            format_currency(brief.average_monthly_deposit)
        ),
        String::new(),
        "Post-retirement scenarios:".to_string(),
    ];
    lines.extend(brief.scenarios.iter().map(scenario_line));
    lines.extend([
        String::new(),
        "Assess whether the average cases cover expected spending. If there is a shortfall, propose specific changes to saving or spending. If goals are met, suggest ways to preserve wealth.".to_string(),
        format!("Tone: {}", brief.tone.guidance()),
        "Format: markdown, starting with a summary and ending with key action items.".to_string(),
    ]);
    lines.join("\n")
}

pub fn render_question_prompt(question: &str, context: &NarrationContext) -> String {
    let context_json = serde_json::to_string_pretty(context).unwrap_or_else(|e| {
        log::warn!("failed to serialize narration context: {e}");
        "{}".to_string()
    });
    format!(
        "Answer the question using the user's financial context. Cite sources for any external information.\n\nContext:\n{context_json}\n\nQuestion:\n\"{question}\""
    )
}

fn render_offline_summary(brief: &AdviceBrief) -> String {
    let mut lines = vec![
        "## Summary".to_string(),
        format!(
            "You are projected to save about {} per month until retiring at {}.",
            format_currency(brief.average_monthly_deposit),
            brief.profile.retirement_age
        ),
        String::new(),
        "## Scenarios".to_string(),
    ];
    lines.extend(brief.scenarios.iter().map(scenario_line));
    lines.push(String::new());
    lines.push("## Key actions".to_string());
    let actions: [&str; 2] = match brief.tone {
        AdviceTone::Encouraging => [
            "- Keep the current savings rate.",
            "- Diversify and shift part of the portfolio to lower-risk assets as retirement nears.",
        ],
        AdviceTone::Constructive => [
            "- Raise the monthly savings amount where possible.",
            "- Review retirement spending or consider a later retirement age.",
        ],
    };
    lines.extend(actions.iter().map(|a| a.to_string()));
    lines.join("\n")
}

fn scenario_line(s: &PostRetirementScenario) -> String {
    let coverage = if s.coverage_ratio.is_finite() {
        format!("{:.2}x", s.coverage_ratio)
    } else {
        "unbounded".to_string()
    };
    format!(
        "- {}: final wealth {} -> monthly passive income {} (coverage {coverage})",
        s.name,
        format_currency(s.final_wealth),
        format_currency(s.monthly_passive_income)
    )
}

/// Whole-dollar amount with thousands separators, e.g. `$1,234,568`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let rounded = value.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineOptions, MarketAssumptions, project};

    struct FailingNarrator;

    impl Narrator for FailingNarrator {
        fn narrate(
            &self,
            _request: &NarrationRequest,
        ) -> impl Future<Output = Result<Narration, NarrationError>> + Send {
            async { Err(NarrationError::Failed("upstream returned 500".to_string())) }
        }
    }

    struct SlowNarrator;

    impl Narrator for SlowNarrator {
        fn narrate(
            &self,
            _request: &NarrationRequest,
        ) -> impl Future<Output = Result<Narration, NarrationError>> + Send {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Narration {
                    text: "late".to_string(),
                    sources: Vec::new(),
                })
            }
        }
    }

    struct CitingNarrator;

    impl Narrator for CitingNarrator {
        fn narrate(
            &self,
            request: &NarrationRequest,
        ) -> impl Future<Output = Result<Narration, NarrationError>> + Send {
            let text = format!("echo: {}", request.prompt().len());
            async move {
                Ok(Narration {
                    text,
                    sources: vec![Citation {
                        uri: "https://example.org/retirement".to_string(),
                        title: "Retirement basics".to_string(),
                    }],
                })
            }
        }
    }

    fn sample_projection(profile: &UserProfile) -> Projection {
        let options = EngineOptions {
            seed: Some(42),
            start_year: Some(2025),
            ..EngineOptions::default()
        };
        project(profile, &MarketAssumptions::default(), &options).expect("valid profile")
    }

    #[test]
    fn brief_averages_deposits_and_picks_encouraging_tone_when_covered() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let brief = AdviceBrief::from_projection(&profile, &projection);

        let expected = projection
            .deposit_timeline
            .iter()
            .map(|d| d.monthly_deposit)
            .sum::<f64>()
            / 30.0;
        assert!((brief.average_monthly_deposit - expected).abs() < 1e-9);
        assert_eq!(brief.scenarios.len(), 4);
        // Conservative compounding over 30 years clears 4,000/month easily.
        assert_eq!(brief.tone, AdviceTone::Encouraging);
    }

    #[test]
    fn brief_is_constructive_when_no_scenario_covers_spending() {
        let profile = UserProfile {
            age: 64,
            retirement_age: 60,
            current_cash: 1_000.0,
            ..UserProfile::default()
        };
        let projection = sample_projection(&profile);
        let brief = AdviceBrief::from_projection(&profile, &projection);

        assert_eq!(brief.average_monthly_deposit, 0.0);
        assert_eq!(brief.tone, AdviceTone::Constructive);
    }

    #[test]
    fn advice_prompt_lists_every_scenario_and_tone() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let brief = AdviceBrief::from_projection(&profile, &projection);
        let prompt = render_advice_prompt(&brief);

        for s in &brief.scenarios {
            assert!(prompt.contains(&s.name), "missing {}", s.name);
        }
        assert!(prompt.contains("- Age: 30"));
        assert!(prompt.contains("$80,000"));
        assert!(prompt.contains(AdviceTone::Encouraging.guidance()));
    }

    #[test]
    fn offline_summary_lays_out_sections_line_by_line() {
        let profile = UserProfile {
            age: 64,
            retirement_age: 60,
            current_cash: 1_000.0,
            ..UserProfile::default()
        };
        let projection = sample_projection(&profile);
        let brief = AdviceBrief::from_projection(&profile, &projection);
        let summary = render_offline_summary(&brief);
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "## Summary");
        assert_eq!(
            lines[1],
            "You are projected to save about $0 per month until retiring at 60."
        );
        assert_eq!(lines[3], "## Scenarios");
        assert_eq!(lines.len(), 4 + brief.scenarios.len() + 4);
        assert_eq!(
            lines.last().copied(),
            Some("- Review retirement spending or consider a later retirement age.")
        );
        assert!(!summary.ends_with('\n'));
    }

    #[test]
    fn question_prompt_embeds_structured_context() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let context = NarrationContext::from_projection(&profile, &projection);
        let prompt = render_question_prompt("Can I retire at 55?", &context);

        assert!(prompt.contains("\"userProfile\""));
        assert!(prompt.contains("\"simulationResults\""));
        assert!(prompt.contains("\"postRetirementScenarios\""));
        assert!(prompt.contains("\"monthly_spend_retire\""));
        assert!(prompt.contains("\"Can I retire at 55?\""));
    }

    #[test]
    fn format_currency_groups_thousands_and_rounds() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(1_234_567.6), "$1,234,568");
        assert_eq!(format_currency(-4_200.0), "-$4,200");
        assert_eq!(format_currency(f64::INFINITY), "n/a");
    }

    #[test]
    fn scenario_line_marks_infinite_coverage() {
        let s = PostRetirementScenario {
            name: "Aggressive - Avg Case".to_string(),
            final_wealth: 100.0,
            monthly_passive_income: 0.67,
            coverage_ratio: f64::INFINITY,
        };
        assert!(scenario_line(&s).ends_with("(coverage unbounded)"));
    }

    #[tokio::test]
    async fn offline_narrator_summarises_advice() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let request = NarrationRequest::Advice(AdviceBrief::from_projection(&profile, &projection));

        let narration =
            narrate_or_fallback(&OfflineNarrator, &request, Duration::from_secs(1)).await;
        assert!(narration.text.starts_with("## Summary"));
        assert!(narration.text.contains("Conservative - Avg Case"));
        assert!(narration.sources.is_empty());
    }

    #[tokio::test]
    async fn offline_narrator_falls_back_for_questions() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let request = NarrationRequest::Question {
            question: "What if inflation is 3%?".to_string(),
            context: NarrationContext::from_projection(&profile, &projection),
        };

        let narration =
            narrate_or_fallback(&OfflineNarrator, &request, Duration::from_secs(1)).await;
        assert_eq!(narration.text, QUESTION_FALLBACK);
    }

    #[tokio::test]
    async fn failing_narrator_yields_advice_fallback() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let request = NarrationRequest::Advice(AdviceBrief::from_projection(&profile, &projection));

        let narration =
            narrate_or_fallback(&FailingNarrator, &request, Duration::from_secs(1)).await;
        assert_eq!(narration.text, ADVICE_FALLBACK);
        assert!(narration.sources.is_empty());
    }

    #[tokio::test]
    async fn slow_narrator_times_out_to_fallback() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let request = NarrationRequest::Advice(AdviceBrief::from_projection(&profile, &projection));

        let narration =
            narrate_or_fallback(&SlowNarrator, &request, Duration::from_millis(20)).await;
        assert_eq!(narration.text, ADVICE_FALLBACK);
    }

    #[tokio::test]
    async fn successful_narration_keeps_citations() {
        let profile = UserProfile::default();
        let projection = sample_projection(&profile);
        let request = NarrationRequest::Advice(AdviceBrief::from_projection(&profile, &projection));

        let narration =
            narrate_or_fallback(&CitingNarrator, &request, Duration::from_secs(1)).await;
        assert!(narration.text.starts_with("echo: "));
        assert_eq!(narration.sources.len(), 1);
        assert_eq!(narration.sources[0].title, "Retirement basics");
    }
}
