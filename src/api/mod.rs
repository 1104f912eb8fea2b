use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::core::{
    AnalysisResult, Dimension, EngineError, HORIZON_YEARS, Inputs, SipInputs, Suggestion,
    YearRecord, aggregate_expenses, run_analysis, run_sip,
};

const DEFAULT_LIFE_EXPECTANCY: u32 = 90;
const DEFAULT_ANNUAL_INFLATION_PCT: f64 = 6.0;
const DEFAULT_CONTRIBUTION_GROWTH_PCT: f64 = 10.0;
const DEFAULT_EMERGENCY_FUND_MONTHS: u32 = 24;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BreakthroughPayload {
    current_age: Option<u32>,
    monthly_income: Option<f64>,
    monthly_expense_items: BTreeMap<String, Value>,
    yearly_expense_items: BTreeMap<String, Value>,
    loan_payment: Option<Value>,
    monthly_contribution: Option<f64>,
    current_portfolio_value: Option<f64>,
    expected_annual_return_pct: Option<f64>,
    assumptions: Option<AssumptionsPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AssumptionsPayload {
    life_expectancy: Option<u32>,
    annual_inflation_pct: Option<f64>,
    annual_contribution_growth_pct: Option<f64>,
    emergency_fund_months: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SipPayload {
    monthly_contribution: Option<f64>,
    annual_return_pct: Option<f64>,
    tenure_years: Option<u32>,
    annual_step_up_pct: Option<f64>,
}

/// One-shot projection from the command line; itemized expense maps are an
/// HTTP-only convenience, the CLI takes the aggregated monthly total.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    monthly_income: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_expense_total: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly loan/EMI payment")]
    loan_payment: f64,
    #[arg(long)]
    monthly_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    current_portfolio_value: f64,
    #[arg(long, help = "Expected annual return in percent, e.g. 12")]
    expected_annual_return_pct: f64,
    #[arg(long, default_value_t = DEFAULT_CONTRIBUTION_GROWTH_PCT, help = "Annual contribution step-up in percent")]
    annual_contribution_growth_pct: f64,
    #[arg(long, default_value_t = DEFAULT_LIFE_EXPECTANCY)]
    life_expectancy: u32,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_INFLATION_PCT)]
    annual_inflation_pct: f64,
    #[arg(long, default_value_t = DEFAULT_EMERGENCY_FUND_MONTHS, help = "Informational only, echoed in the output")]
    emergency_fund_months: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BreakthroughResponse {
    target_wealth: f64,
    breakthrough_age: Option<u32>,
    years_needed: Option<u32>,
    success: bool,
    final_corpus: f64,
    assumptions: AssumptionsEcho,
    yearly_data: Vec<ApiYearRow>,
    sensitivity: Vec<ApiSensitivityRow>,
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssumptionsEcho {
    life_expectancy: u32,
    annual_inflation_pct: f64,
    annual_contribution_growth_pct: f64,
    emergency_fund_months: u32,
    horizon_years: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiYearRow {
    age: u32,
    corpus: f64,
    target_wealth: f64,
    yearly_expenses: f64,
    yearly_investment: f64,
    investment_returns: f64,
    potential_yearly_income: f64,
}

impl From<&YearRecord> for ApiYearRow {
    fn from(record: &YearRecord) -> Self {
        Self {
            age: record.age,
            corpus: record.corpus,
            target_wealth: record.target_wealth,
            yearly_expenses: record.yearly_expenses,
            yearly_investment: record.yearly_contribution,
            investment_returns: record.investment_return,
            potential_yearly_income: record.potential_sustainable_income,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSensitivityRow {
    dimension: Dimension,
    change: f64,
    perturbed_value: f64,
    years_needed: u32,
    breakthrough_age: ApiBreakthroughAge,
    success: bool,
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(untagged)]
enum ApiBreakthroughAge {
    Age(u32),
    NotAchieved(&'static str),
}

impl From<Option<u32>> for ApiBreakthroughAge {
    fn from(value: Option<u32>) -> Self {
        match value {
            Some(age) => ApiBreakthroughAge::Age(age),
            None => ApiBreakthroughAge::NotAchieved("Not achieved"),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn coerce_amount(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_items(items: &BTreeMap<String, Value>) -> BTreeMap<String, f64> {
    items
        .iter()
        .map(|(category, value)| (category.clone(), coerce_amount(value)))
        .collect()
}

fn build_inputs(payload: &BreakthroughPayload) -> Result<Inputs, String> {
    let current_age = payload.current_age.ok_or("currentAge is required")?;
    let monthly_income = payload.monthly_income.ok_or("monthlyIncome is required")?;
    let monthly_contribution = payload
        .monthly_contribution
        .ok_or("monthlyContribution is required")?;
    let current_portfolio_value = payload
        .current_portfolio_value
        .ok_or("currentPortfolioValue is required")?;
    let expected_annual_return_pct = payload
        .expected_annual_return_pct
        .ok_or("expectedAnnualReturnPct is required")?;

    let loan_payment = payload.loan_payment.as_ref().map_or(0.0, coerce_amount);
    let monthly_expense_total = aggregate_expenses(
        &coerce_items(&payload.monthly_expense_items),
        &coerce_items(&payload.yearly_expense_items),
        loan_payment,
    );

    let assumptions = payload.assumptions.as_ref();
    Ok(Inputs {
        current_age,
        monthly_income,
        monthly_expense_total,
        monthly_contribution,
        current_portfolio_value,
        expected_annual_return_pct,
        annual_contribution_growth_pct: assumptions
            .and_then(|a| a.annual_contribution_growth_pct)
            .unwrap_or(DEFAULT_CONTRIBUTION_GROWTH_PCT),
        life_expectancy: assumptions
            .and_then(|a| a.life_expectancy)
            .unwrap_or(DEFAULT_LIFE_EXPECTANCY),
        annual_inflation_pct: assumptions
            .and_then(|a| a.annual_inflation_pct)
            .unwrap_or(DEFAULT_ANNUAL_INFLATION_PCT),
        emergency_fund_months: assumptions
            .and_then(|a| a.emergency_fund_months)
            .unwrap_or(DEFAULT_EMERGENCY_FUND_MONTHS),
    })
}

fn build_sip_inputs(payload: &SipPayload) -> Result<SipInputs, String> {
    Ok(SipInputs {
        monthly_contribution: payload
            .monthly_contribution
            .ok_or("monthlyContribution is required")?,
        annual_return_pct: payload
            .annual_return_pct
            .ok_or("annualReturnPct is required")?,
        tenure_years: payload.tenure_years.ok_or("tenureYears is required")?,
        annual_step_up_pct: payload.annual_step_up_pct.unwrap_or(0.0),
    })
}

fn build_breakthrough_response(inputs: &Inputs, analysis: &AnalysisResult) -> BreakthroughResponse {
    BreakthroughResponse {
        target_wealth: analysis.projection.target_wealth,
        breakthrough_age: analysis.projection.breakthrough_age,
        years_needed: analysis.projection.years_needed,
        success: analysis.projection.success,
        final_corpus: analysis.projection.final_corpus,
        assumptions: AssumptionsEcho {
            life_expectancy: inputs.life_expectancy,
            annual_inflation_pct: inputs.annual_inflation_pct,
            annual_contribution_growth_pct: inputs.annual_contribution_growth_pct,
            emergency_fund_months: inputs.emergency_fund_months,
            horizon_years: HORIZON_YEARS,
        },
        yearly_data: analysis.projection.yearly_data.iter().map(Into::into).collect(),
        sensitivity: analysis
            .sensitivity
            .iter()
            .map(|point| ApiSensitivityRow {
                dimension: point.dimension,
                change: point.change,
                perturbed_value: point.perturbed_value,
                years_needed: point.years_needed,
                breakthrough_age: point.breakthrough_age.into(),
                success: point.success,
            })
            .collect(),
        suggestions: analysis.suggestions.clone(),
    }
}

/// Runs one analysis for the `project` subcommand and renders the same JSON
/// document the HTTP API serves.
pub fn run_project(args: &ProjectArgs) -> Result<String, String> {
    let inputs = Inputs {
        current_age: args.current_age,
        monthly_income: args.monthly_income,
        monthly_expense_total: args.monthly_expense_total + args.loan_payment,
        monthly_contribution: args.monthly_contribution,
        current_portfolio_value: args.current_portfolio_value,
        expected_annual_return_pct: args.expected_annual_return_pct,
        annual_contribution_growth_pct: args.annual_contribution_growth_pct,
        life_expectancy: args.life_expectancy,
        annual_inflation_pct: args.annual_inflation_pct,
        emergency_fund_months: args.emergency_fund_months,
    };

    let analysis = run_analysis(&inputs).map_err(|e| e.to_string())?;
    let response = build_breakthrough_response(&inputs, &analysis);
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("breakthrough HTTP API listening on http://{addr}");
    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/api/breakthrough", post(breakthrough_handler))
        .route("/api/sip", get(sip_get_handler).post(sip_post_handler))
        .fallback(not_found_handler)
}

async fn breakthrough_handler(Json(payload): Json<BreakthroughPayload>) -> Response {
    let inputs = match build_inputs(&payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            tracing::warn!("rejected breakthrough request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_analysis(&inputs) {
        Ok(analysis) => json_response(
            StatusCode::OK,
            build_breakthrough_response(&inputs, &analysis),
        ),
        Err(err) => engine_error_response(err),
    }
}

async fn sip_get_handler(Query(payload): Query<SipPayload>) -> Response {
    sip_handler_impl(payload)
}

async fn sip_post_handler(Json(payload): Json<SipPayload>) -> Response {
    sip_handler_impl(payload)
}

fn sip_handler_impl(payload: SipPayload) -> Response {
    let inputs = match build_sip_inputs(&payload) {
        Ok(inputs) => inputs,
        Err(msg) => {
            tracing::warn!("rejected SIP request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_sip(&inputs) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => engine_error_response(err),
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn engine_error_response(err: EngineError) -> Response {
    tracing::warn!("rejected calculation: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
