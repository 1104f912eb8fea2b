use serde::Serialize;
use thiserror::Error;

/// Maximum number of simulated years before the projection gives up on
/// reaching target wealth.
pub const HORIZON_YEARS: u32 = 50;

#[derive(Debug, Clone)]
pub struct Inputs {
    pub current_age: u32,
    pub monthly_income: f64,
    pub monthly_expense_total: f64,
    pub monthly_contribution: f64,
    pub current_portfolio_value: f64,
    pub expected_annual_return_pct: f64,
    pub annual_contribution_growth_pct: f64,
    pub life_expectancy: u32,
    pub annual_inflation_pct: f64,
    /// Informational only; surfaced to the caller, never consumed by the math.
    pub emergency_fund_months: u32,
}

/// Single-parameter re-run mechanism shared by the sensitivity sweep and the
/// suggestion generator. Unset fields fall back to the base inputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub monthly_contribution: Option<f64>,
    pub expected_annual_return_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearRecord {
    pub age: u32,
    pub corpus: f64,
    pub target_wealth: f64,
    pub yearly_contribution: f64,
    pub investment_return: f64,
    pub yearly_expenses: f64,
    pub potential_sustainable_income: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub breakthrough_age: Option<u32>,
    pub years_needed: Option<u32>,
    pub target_wealth: f64,
    pub final_corpus: f64,
    pub success: bool,
    pub yearly_data: Vec<YearRecord>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Dimension {
    Contribution,
    ReturnRate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityPoint {
    pub dimension: Dimension,
    pub change: f64,
    pub perturbed_value: f64,
    pub years_needed: u32,
    pub breakthrough_age: Option<u32>,
    pub success: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum SuggestionCategory {
    IncreaseContribution,
    ReduceExpenses,
    RaiseReturnTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub message: String,
    pub years_saved: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub projection: ProjectionResult,
    pub sensitivity: Vec<SensitivityPoint>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone)]
pub struct SipInputs {
    pub monthly_contribution: f64,
    pub annual_return_pct: f64,
    pub tenure_years: u32,
    pub annual_step_up_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SipResult {
    pub invested_amount: f64,
    pub estimated_returns: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid assumption: {0}")]
    InvalidAssumption(String),
}
