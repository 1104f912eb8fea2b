use std::collections::BTreeMap;

use super::types::{
    AnalysisResult, Dimension, EngineError, HORIZON_YEARS, Inputs, Overrides, ProjectionResult,
    SensitivityPoint, Suggestion, SuggestionCategory, YearRecord,
};

/// Contribution perturbations tested by the sensitivity sweep, in percent of
/// the base monthly contribution.
const CONTRIBUTION_GRID_PCT: [f64; 11] = [
    -50.0, -40.0, -30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0, 50.0,
];

/// Return-rate perturbations tested by the sensitivity sweep, in percentage
/// points added to the base expected return.
const RETURN_GRID_POINTS: [f64; 11] = [
    -5.0, -4.0, -3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0,
];

/// Reduces itemized monthly and yearly expenses plus a loan/EMI payment to a
/// single normalized monthly outflow. Yearly items are amortized over twelve
/// months.
pub fn aggregate_expenses(
    monthly_items: &BTreeMap<String, f64>,
    yearly_items: &BTreeMap<String, f64>,
    loan_payment: f64,
) -> f64 {
    let monthly: f64 = monthly_items.values().sum();
    let yearly: f64 = yearly_items.values().sum();
    monthly + yearly / 12.0 + loan_payment
}

/// Wealth required at life expectancy to sustain perpetual inflation-adjusted
/// withdrawals, evaluated from today as a fixed reference horizon. The target
/// is deliberately not recomputed as the simulation's age advances.
pub fn target_wealth(inputs: &Inputs) -> Result<f64, EngineError> {
    if inputs.life_expectancy < inputs.current_age {
        return Err(EngineError::InvalidAssumption(format!(
            "life expectancy ({}) must not be below current age ({})",
            inputs.life_expectancy, inputs.current_age
        )));
    }

    let safe_withdrawal_rate =
        (inputs.expected_annual_return_pct - inputs.annual_inflation_pct) / 100.0;
    if safe_withdrawal_rate <= 0.0 {
        return Err(EngineError::InvalidAssumption(format!(
            "expected annual return ({}%) must exceed inflation ({}%)",
            inputs.expected_annual_return_pct, inputs.annual_inflation_pct
        )));
    }

    let years_to_target = inputs.life_expectancy - inputs.current_age;
    let inflation_rate = inputs.annual_inflation_pct / 100.0;
    let final_year_expenses = inputs.monthly_expense_total
        * 12.0
        * (1.0 + inflation_rate).powi(years_to_target as i32);

    Ok(final_year_expenses / safe_withdrawal_rate)
}

pub fn run_projection(inputs: &Inputs) -> Result<ProjectionResult, EngineError> {
    run_projection_with(inputs, Overrides::default())
}

/// Year-by-year compounding simulation until breakthrough or horizon
/// exhaustion. Pure and restartable: identical inputs always yield an
/// identical record sequence.
pub fn run_projection_with(
    inputs: &Inputs,
    overrides: Overrides,
) -> Result<ProjectionResult, EngineError> {
    let inputs = apply_overrides(inputs, overrides);
    validate_inputs(&inputs)?;
    let target = target_wealth(&inputs)?;

    let return_rate = inputs.expected_annual_return_pct / 100.0;
    let inflation_rate = inputs.annual_inflation_pct / 100.0;
    let base_yearly_expenses = inputs.monthly_expense_total * 12.0;
    let contribution_growth = 1.0 + inputs.annual_contribution_growth_pct / 100.0;

    let mut corpus = inputs.current_portfolio_value;
    let mut contribution = inputs.monthly_contribution * 12.0;
    let mut yearly_data = Vec::new();
    let mut breakthrough_year = None;

    let mut year = 0;
    while year < HORIZON_YEARS && breakthrough_year.is_none() {
        // Expenses inflate from the start reference; year 0 is uninflated.
        let year_expenses = base_yearly_expenses * (1.0 + inflation_rate).powi(year as i32);
        // Growth applies to the corpus before this year's contribution lands,
        // so a contribution earns nothing in its own first year.
        let investment_return = corpus * return_rate;
        corpus += investment_return + contribution;

        yearly_data.push(YearRecord {
            age: inputs.current_age + year,
            corpus: corpus.round(),
            target_wealth: target.round(),
            yearly_contribution: contribution.round(),
            investment_return: investment_return.round(),
            yearly_expenses: year_expenses.round(),
            potential_sustainable_income: (corpus * (return_rate - inflation_rate)).round(),
        });

        if corpus >= target {
            // Recorded with the pre-increment index: the number of completed
            // years so far, not year + 1.
            breakthrough_year = Some(year);
        } else {
            contribution *= contribution_growth;
            year += 1;
        }
    }

    let final_corpus = yearly_data
        .last()
        .map(|record| record.corpus)
        .unwrap_or_else(|| corpus.round());

    Ok(ProjectionResult {
        breakthrough_age: breakthrough_year.map(|y| inputs.current_age + y),
        years_needed: breakthrough_year,
        target_wealth: target,
        final_corpus,
        success: breakthrough_year.is_some(),
        yearly_data,
    })
}

/// Re-runs the projection across the fixed contribution and return-rate
/// grids, one dimension perturbed at a time. Always yields exactly 22 points
/// in grid order. A perturbed return that no longer clears inflation cannot
/// sustain any withdrawal, so that grid point reports "not achieved" instead
/// of failing the whole sweep.
pub fn run_sensitivity(inputs: &Inputs) -> Result<Vec<SensitivityPoint>, EngineError> {
    let mut points = Vec::with_capacity(CONTRIBUTION_GRID_PCT.len() + RETURN_GRID_POINTS.len());

    for percent_change in CONTRIBUTION_GRID_PCT {
        let perturbed = inputs.monthly_contribution * (1.0 + percent_change / 100.0);
        let overrides = Overrides {
            monthly_contribution: Some(perturbed),
            ..Overrides::default()
        };
        points.push(sensitivity_point(
            inputs,
            overrides,
            Dimension::Contribution,
            percent_change,
            perturbed.round(),
        )?);
    }

    for point_change in RETURN_GRID_POINTS {
        let perturbed = inputs.expected_annual_return_pct + point_change;
        let overrides = Overrides {
            expected_annual_return_pct: Some(perturbed),
            ..Overrides::default()
        };
        points.push(sensitivity_point(
            inputs,
            overrides,
            Dimension::ReturnRate,
            point_change,
            perturbed,
        )?);
    }

    Ok(points)
}

fn sensitivity_point(
    inputs: &Inputs,
    overrides: Overrides,
    dimension: Dimension,
    change: f64,
    perturbed_value: f64,
) -> Result<SensitivityPoint, EngineError> {
    match run_projection_with(inputs, overrides) {
        Ok(result) => Ok(SensitivityPoint {
            dimension,
            change,
            perturbed_value,
            years_needed: result.years_needed.unwrap_or(HORIZON_YEARS),
            breakthrough_age: result.breakthrough_age,
            success: result.success,
        }),
        Err(EngineError::InvalidAssumption(_)) => Ok(SensitivityPoint {
            dimension,
            change,
            perturbed_value,
            years_needed: HORIZON_YEARS,
            breakthrough_age: None,
            success: false,
        }),
        Err(err) => Err(err),
    }
}

/// Rule-based recommendations, each quantified by an actual engine re-run so
/// the reported impact is always consistent with the simulator.
pub fn generate_suggestions(
    inputs: &Inputs,
    base: &ProjectionResult,
) -> Result<Vec<Suggestion>, EngineError> {
    let mut suggestions = Vec::new();

    let needs_help = !base.success || base.years_needed.is_some_and(|years| years > 30);
    if !needs_help {
        return Ok(suggestions);
    }

    // When the base run never broke through, savings are measured against the
    // full horizon.
    let baseline_years = base.years_needed.unwrap_or(HORIZON_YEARS);
    let available_savings = inputs.monthly_income - inputs.monthly_expense_total;

    if inputs.monthly_contribution < 0.8 * available_savings {
        let suggested = 0.8 * available_savings;
        let rerun = run_projection_with(
            inputs,
            Overrides {
                monthly_contribution: Some(suggested),
                ..Overrides::default()
            },
        )?;
        suggestions.push(Suggestion {
            category: SuggestionCategory::IncreaseContribution,
            message: format!(
                "Increase monthly contribution to {:.0}",
                suggested.round()
            ),
            years_saved: years_saved(baseline_years, &rerun),
        });
    }

    // The freed 20% of expenses is redirected into the contribution; the
    // expense total driving the simulation stays as entered.
    let redirected = inputs.monthly_contribution + inputs.monthly_expense_total * 0.2;
    let rerun = run_projection_with(
        inputs,
        Overrides {
            monthly_contribution: Some(redirected),
            ..Overrides::default()
        },
    )?;
    suggestions.push(Suggestion {
        category: SuggestionCategory::ReduceExpenses,
        message: format!(
            "Reduce monthly expenses by 20% to {:.0} and invest the difference",
            (inputs.monthly_expense_total * 0.8).round()
        ),
        years_saved: years_saved(baseline_years, &rerun),
    });

    if inputs.expected_annual_return_pct < 12.0 {
        let rerun = run_projection_with(
            inputs,
            Overrides {
                expected_annual_return_pct: Some(14.0),
                ..Overrides::default()
            },
        )?;
        suggestions.push(Suggestion {
            category: SuggestionCategory::RaiseReturnTarget,
            message: "Consider a more aggressive portfolio targeting 14% annual returns"
                .to_string(),
            years_saved: years_saved(baseline_years, &rerun),
        });
    }

    Ok(suggestions)
}

/// Base projection, sensitivity sweep, and suggestions in one call; the
/// aggregate the presentation layer consumes.
pub fn run_analysis(inputs: &Inputs) -> Result<AnalysisResult, EngineError> {
    let projection = run_projection(inputs)?;
    let sensitivity = run_sensitivity(inputs)?;
    let suggestions = generate_suggestions(inputs, &projection)?;

    Ok(AnalysisResult {
        projection,
        sensitivity,
        suggestions,
    })
}

fn years_saved(baseline_years: u32, rerun: &ProjectionResult) -> Option<u32> {
    rerun
        .years_needed
        .map(|years| baseline_years.saturating_sub(years))
}

fn apply_overrides(inputs: &Inputs, overrides: Overrides) -> Inputs {
    let mut inputs = inputs.clone();
    if let Some(contribution) = overrides.monthly_contribution {
        inputs.monthly_contribution = contribution;
    }
    if let Some(return_pct) = overrides.expected_annual_return_pct {
        inputs.expected_annual_return_pct = return_pct;
    }
    inputs
}

fn validate_inputs(inputs: &Inputs) -> Result<(), EngineError> {
    for (name, value) in [
        ("monthlyIncome", inputs.monthly_income),
        ("monthlyExpenseTotal", inputs.monthly_expense_total),
        ("monthlyContribution", inputs.monthly_contribution),
        ("currentPortfolioValue", inputs.current_portfolio_value),
        (
            "annualContributionGrowthPct",
            inputs.annual_contribution_growth_pct,
        ),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "{name} must be a non-negative number"
            )));
        }
    }

    for (name, value) in [
        ("expectedAnnualReturnPct", inputs.expected_annual_return_pct),
        ("annualInflationPct", inputs.annual_inflation_pct),
    ] {
        if !value.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "{name} must be a finite number"
            )));
        }
    }

    Ok(())
}
