//! AI itinerary generation.
//!
//! An [`ItineraryPlanner`] turns a system prompt and a user prompt into raw text;
//! this module builds the prompts, parses the JSON reply into [`AiTripPlanData`]
//! and checks it before anything is shown or stored.

use crate::{
    config::ai::AiSettings,
    core::aggregation::{BudgetTotals, CategorySummary},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, error, info};

const PLAN_SYSTEM_PROMPT: &str = "You are a travel planner for groups on a shared budget. \
Reply with ONLY valid JSON matching the requested format, no explanation text.";

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a frugal travel budget advisor. \
Reply with a few short bullet points of concrete advice.";

const PLAN_FORMAT: &str = r#"{
  "overview": { "route": "...", "start_date": "YYYY-MM-DD", "end_date": "YYYY-MM-DD", "budget": 0, "travelers": 1 },
  "days": [
    {
      "day": 1,
      "date": "YYYY-MM-DD",
      "title": "...",
      "morning": { "name": "...", "time": "09:00", "cost": 0, "location": "..." },
      "afternoon": { "name": "...", "time": "13:00", "cost": 0, "location": "..." },
      "evening": { "name": "...", "time": "19:00", "cost": 0, "location": "..." }
    }
  ],
  "cost_breakdown": { "accommodation": 0, "food": 0, "activities": 0, "transport": 0, "total": 0 }
}"#;

/// One activity slot of a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    /// What to do
    pub name: String,
    /// Suggested start time
    pub time: String,
    /// Estimated cost for the group
    pub cost: f64,
    /// Where it happens
    pub location: String,
}

/// One day of the itinerary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayPlan {
    /// 1-based day number
    pub day: u32,
    /// Calendar date as given by the planner
    pub date: String,
    /// Theme of the day
    pub title: String,
    /// Morning activity
    pub morning: Activity,
    /// Afternoon activity
    pub afternoon: Activity,
    /// Evening activity
    pub evening: Activity,
}

impl DayPlan {
    /// The three slots in chronological order.
    #[must_use]
    pub fn slots(&self) -> [(&'static str, &Activity); 3] {
        [
            ("Morning", &self.morning),
            ("Afternoon", &self.afternoon),
            ("Evening", &self.evening),
        ]
    }

    /// Sum of the day's activity costs.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.morning.cost + self.afternoon.cost + self.evening.cost
    }
}

/// Trip summary header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripOverview {
    /// Route description, e.g. "Porto → Lisbon"
    pub route: String,
    /// First day
    pub start_date: String,
    /// Last day
    pub end_date: String,
    /// Budget the plan was made for
    pub budget: f64,
    /// Number of travelers
    pub travelers: u32,
}

/// Estimated costs per area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostBreakdown {
    /// Lodging
    pub accommodation: f64,
    /// Meals
    pub food: f64,
    /// Tickets and tours
    pub activities: f64,
    /// Getting around
    pub transport: f64,
    /// Grand total
    pub total: f64,
}

impl CostBreakdown {
    /// Sum of the four areas.
    #[must_use]
    pub fn component_sum(&self) -> f64 {
        self.accommodation + self.food + self.activities + self.transport
    }
}

/// A complete AI-generated trip plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiTripPlanData {
    /// Summary header
    #[serde(default)]
    pub overview: TripOverview,
    /// Days ordered by day number
    #[serde(default)]
    pub days: Vec<DayPlan>,
    /// Cost estimate
    #[serde(default)]
    pub cost_breakdown: CostBreakdown,
}

impl AiTripPlanData {
    /// Sum of every activity's cost.
    #[must_use]
    pub fn activity_cost(&self) -> f64 {
        self.days.iter().map(DayPlan::cost).sum()
    }
}

/// What the user asks the planner for.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    /// Where the trip goes
    pub destination: String,
    /// Where the group starts from
    pub origin: Option<String>,
    /// First day
    pub start_date: NaiveDate,
    /// Last day
    pub end_date: NaiveDate,
    /// Total group budget
    pub budget: f64,
    /// Number of travelers
    pub travelers: u32,
    /// Free-form interests ("food", "museums", ...)
    pub interests: Vec<String>,
}

impl TripRequest {
    /// Number of days covered, counting both ends.
    #[must_use]
    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// A text-completion backend.
#[async_trait]
pub trait ItineraryPlanner: Send + Sync {
    /// Completes `prompt` under the `system` instructions and returns the raw reply.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpPlanner {
    client: Client,
    settings: AiSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl HttpPlanner {
    /// Builds a pooled HTTP client for the configured endpoint.
    ///
    /// # Errors
    /// Returns `Error::Http` if the client cannot be built.
    pub fn new(settings: AiSettings) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl ItineraryPlanner for HttpPlanner {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        info!("Calling chat completion API with model {}", self.settings.model);

        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Chat completion API returned {}: {}", status, body);
            return Err(Error::Itinerary {
                message: format!("AI service returned {status}"),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Itinerary {
                message: "AI service returned an empty reply".to_string(),
            })
    }
}

fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses and validates a planner reply.
///
/// The reply may be wrapped in a markdown code fence. Days are sorted by day
/// number, and a missing or zero total is filled in from the breakdown, or
/// from the activity costs when the breakdown is empty too.
///
/// # Errors
/// Returns `Error::Json` for malformed JSON and `Error::Itinerary` when the plan
/// has no days, repeats a day number or contains a negative cost.
pub fn parse_plan_response(response: &str) -> Result<AiTripPlanData> {
    let mut plan: AiTripPlanData = serde_json::from_str(strip_code_fences(response))?;

    if plan.days.is_empty() {
        return Err(Error::Itinerary {
            message: "The generated plan has no days".to_string(),
        });
    }

    plan.days.sort_by_key(|d| d.day);
    if plan.days.windows(2).any(|w| w[0].day == w[1].day) {
        return Err(Error::Itinerary {
            message: "The generated plan repeats a day".to_string(),
        });
    }

    let breakdown = &plan.cost_breakdown;
    let activity_costs = plan
        .days
        .iter()
        .flat_map(|d| [d.morning.cost, d.afternoon.cost, d.evening.cost]);
    let breakdown_costs = [
        breakdown.accommodation,
        breakdown.food,
        breakdown.activities,
        breakdown.transport,
        breakdown.total,
    ];
    if let Some(bad) = activity_costs
        .chain(breakdown_costs)
        .find(|c| !c.is_finite() || *c < 0.0)
    {
        return Err(Error::InvalidAmount { amount: bad });
    }

    if plan.cost_breakdown.total <= 0.0 {
        let components = plan.cost_breakdown.component_sum();
        plan.cost_breakdown.total = if components > 0.0 {
            components
        } else {
            plan.activity_cost()
        };
    }

    Ok(plan)
}

fn build_plan_prompt(request: &TripRequest) -> Result<String> {
    let mut prompt = format!(
        "Plan a {}-day trip to {} from {} to {} for {} traveler(s) with a total budget of {:.2}.\n",
        request.day_count(),
        request.destination,
        request.start_date,
        request.end_date,
        request.travelers,
        request.budget,
    );
    if let Some(origin) = &request.origin {
        writeln!(prompt, "The group travels from {origin}.")?;
    }
    if !request.interests.is_empty() {
        writeln!(prompt, "Interests: {}.", request.interests.join(", "))?;
    }
    write!(
        prompt,
        "Keep the total cost within the budget. Use exactly this JSON format:\n{PLAN_FORMAT}"
    )?;
    Ok(prompt)
}

/// Asks the planner for a new itinerary.
///
/// # Errors
/// Returns an error if the request is invalid, the backend fails or the reply
/// cannot be parsed.
pub async fn generate_itinerary(
    planner: &dyn ItineraryPlanner,
    request: &TripRequest,
) -> Result<AiTripPlanData> {
    if request.destination.trim().is_empty() {
        return Err(Error::Itinerary {
            message: "Destination cannot be empty".to_string(),
        });
    }
    if request.end_date < request.start_date {
        return Err(Error::Itinerary {
            message: "End date cannot be before start date".to_string(),
        });
    }
    if !request.budget.is_finite() || request.budget <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: request.budget,
        });
    }

    let reply = planner
        .complete(PLAN_SYSTEM_PROMPT, &build_plan_prompt(request)?)
        .await?;
    debug!("Planner reply was {} bytes", reply.len());

    let plan = parse_plan_response(&reply)?;
    info!(
        "Generated {}-day itinerary for {} (estimated {:.2})",
        plan.days.len(),
        request.destination,
        plan.cost_breakdown.total
    );
    Ok(plan)
}

/// Asks the planner to revise an itinerary according to user feedback.
///
/// # Errors
/// Returns an error if the feedback is empty, the backend fails or the reply
/// cannot be parsed.
pub async fn regenerate_itinerary(
    planner: &dyn ItineraryPlanner,
    previous: &AiTripPlanData,
    feedback: &str,
) -> Result<AiTripPlanData> {
    if feedback.trim().is_empty() {
        return Err(Error::Itinerary {
            message: "Tell me what to change about the plan".to_string(),
        });
    }

    let prompt = format!(
        "Here is the current trip plan:\n{}\n\nRevise it according to this feedback: {}\n\
         Keep the same JSON format and the same budget unless the feedback says otherwise.",
        serde_json::to_string_pretty(previous)?,
        feedback.trim()
    );

    let plan = parse_plan_response(&planner.complete(PLAN_SYSTEM_PROMPT, &prompt).await?)?;
    info!("Regenerated itinerary with {} days", plan.days.len());
    Ok(plan)
}

/// Asks the planner for advice on the group's spending so far.
///
/// # Errors
/// Returns an error if the backend fails.
pub async fn analyze_budget(
    planner: &dyn ItineraryPlanner,
    totals: &BudgetTotals,
    summaries: &[CategorySummary],
) -> Result<String> {
    let mut prompt = format!(
        "Our group trip budget is {:.2}; we have spent {:.2} ({:.0}%) and have {:.2} left.\n\
         By category:\n",
        totals.total_budget, totals.total_spent, totals.percent_used, totals.total_remaining
    );
    for summary in summaries {
        writeln!(
            prompt,
            "- {}: spent {:.2} of {:.2} ({})",
            summary.name,
            summary.spent,
            summary.budgeted,
            summary.status.label()
        )?;
    }
    prompt.push_str("Where are we overspending, and how can we stay within budget?");

    let advice = planner.complete(ANALYSIS_SYSTEM_PROMPT, &prompt).await?;
    Ok(advice.trim().to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::aggregation::BudgetStatus;
    use crate::test_utils::date;
    use std::sync::Mutex;

    struct CannedPlanner {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedPlanner {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ItineraryPlanner for CannedPlanner {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    const TWO_DAYS: &str = r#"{
        "overview": { "route": "Lisbon", "start_date": "2026-06-01", "end_date": "2026-06-02", "budget": 800, "travelers": 2 },
        "days": [
            { "day": 2, "date": "2026-06-02", "title": "Belem",
              "morning": { "name": "Tower", "time": "09:00", "cost": 20, "location": "Belem" },
              "afternoon": { "name": "Pasteis", "time": "13:00", "cost": 10, "location": "Belem" },
              "evening": { "name": "Fado", "time": "20:00", "cost": 50, "location": "Alfama" } },
            { "day": 1, "date": "2026-06-01", "title": "Arrival",
              "morning": { "name": "Check in", "time": "10:00", "cost": 0, "location": "Baixa" },
              "afternoon": { "name": "Tram 28", "time": "14:00", "cost": 6, "location": "Graca" },
              "evening": { "name": "Dinner", "time": "19:30", "cost": 40, "location": "Chiado" } }
        ],
        "cost_breakdown": { "accommodation": 0, "food": 0, "activities": 0, "transport": 0, "total": 0 }
    }"#;

    fn request() -> TripRequest {
        TripRequest {
            destination: "Lisbon".to_string(),
            origin: Some("Porto".to_string()),
            start_date: date(2026, 6, 1),
            end_date: date(2026, 6, 2),
            budget: 800.0,
            travelers: 2,
            interests: vec!["food".to_string(), "music".to_string()],
        }
    }

    #[test]
    fn test_parse_sorts_days_and_fills_total() {
        let plan = parse_plan_response(TWO_DAYS).unwrap();
        assert_eq!(plan.days[0].day, 1);
        assert_eq!(plan.days[1].title, "Belem");
        assert_eq!(plan.cost_breakdown.total, 126.0);
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let fenced = format!("```json\n{TWO_DAYS}\n```");
        assert_eq!(parse_plan_response(&fenced).unwrap().days.len(), 2);

        let bare_fence = format!("```\n{TWO_DAYS}\n```");
        assert_eq!(parse_plan_response(&bare_fence).unwrap().days.len(), 2);
    }

    #[test]
    fn test_total_prefers_breakdown_components() {
        let json = r#"{ "days": [ { "day": 1 } ],
            "cost_breakdown": { "accommodation": 300, "food": 120, "activities": 50, "transport": 30 } }"#;
        let plan = parse_plan_response(json).unwrap();
        assert_eq!(plan.cost_breakdown.total, 500.0);
    }

    #[test]
    fn test_parse_rejects_invalid_plans() {
        assert!(matches!(
            parse_plan_response(r#"{ "days": [] }"#).unwrap_err(),
            Error::Itinerary { .. }
        ));
        assert!(matches!(
            parse_plan_response(r#"{ "days": [ { "day": 1 }, { "day": 1 } ] }"#).unwrap_err(),
            Error::Itinerary { .. }
        ));
        assert!(matches!(
            parse_plan_response(r#"{ "days": [ { "day": 1, "evening": { "cost": -5 } } ] }"#)
                .unwrap_err(),
            Error::InvalidAmount { .. }
        ));
        assert!(matches!(
            parse_plan_response("Sorry, I can't help with that.").unwrap_err(),
            Error::Json(_)
        ));
    }

    #[tokio::test]
    async fn test_generate_itinerary_builds_prompt() {
        let planner = CannedPlanner::new(TWO_DAYS);
        let plan = generate_itinerary(&planner, &request()).await.unwrap();

        assert_eq!(plan.days.len(), 2);
        let prompt = planner.last_prompt();
        assert!(prompt.contains("2-day trip to Lisbon"));
        assert!(prompt.contains("from Porto"));
        assert!(prompt.contains("food, music"));
    }

    #[tokio::test]
    async fn test_generate_itinerary_validates_request() {
        let planner = CannedPlanner::new(TWO_DAYS);

        let mut bad_dates = request();
        bad_dates.end_date = date(2026, 5, 30);
        assert!(generate_itinerary(&planner, &bad_dates).await.is_err());

        let mut no_budget = request();
        no_budget.budget = 0.0;
        assert!(generate_itinerary(&planner, &no_budget).await.is_err());

        assert!(planner.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_includes_previous_plan_and_feedback() {
        let planner = CannedPlanner::new(TWO_DAYS);
        let previous = parse_plan_response(TWO_DAYS).unwrap();

        regenerate_itinerary(&planner, &previous, "more museums")
            .await
            .unwrap();
        let prompt = planner.last_prompt();
        assert!(prompt.contains("more museums"));
        assert!(prompt.contains("Tram 28"));

        assert!(regenerate_itinerary(&planner, &previous, "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_analyze_budget() {
        let planner = CannedPlanner::new("  - Eat at markets\n");
        let totals = BudgetTotals {
            total_budget: 1000.0,
            total_spent: 950.0,
            total_remaining: 50.0,
            percent_used: 95.0,
        };
        let summaries = vec![CategorySummary {
            name: "Food".to_string(),
            color: "#000000".to_string(),
            budgeted: 300.0,
            spent: 320.0,
            remaining: -20.0,
            percent_used: 106.7,
            status: BudgetStatus::OverBudget,
        }];

        let advice = analyze_budget(&planner, &totals, &summaries).await.unwrap();
        assert_eq!(advice, "- Eat at markets");
        assert!(planner.last_prompt().contains("Food: spent 320.00 of 300.00 (over budget)"));
    }
}
