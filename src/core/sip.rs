use super::types::{EngineError, SipInputs, SipResult};

/// Monthly-compounding accumulation with an optional annual contribution
/// step-up. Independent of the FI projection pipeline; shares no state with
/// it.
pub fn run_sip(inputs: &SipInputs) -> Result<SipResult, EngineError> {
    validate_sip_inputs(inputs)?;

    let monthly_rate = inputs.annual_return_pct / 100.0 / 12.0;
    let step_up = 1.0 + inputs.annual_step_up_pct / 100.0;

    let mut invested = 0.0;
    let mut total = 0.0;
    let mut current_monthly = inputs.monthly_contribution;

    for _ in 0..inputs.tenure_years {
        for _ in 0..12 {
            invested += current_monthly;
            total = (total + current_monthly) * (1.0 + monthly_rate);
        }
        current_monthly *= step_up;
    }

    Ok(SipResult {
        invested_amount: invested.round(),
        estimated_returns: (total - invested).round(),
        total_amount: total.round(),
    })
}

fn validate_sip_inputs(inputs: &SipInputs) -> Result<(), EngineError> {
    for (name, value) in [
        ("monthlyContribution", inputs.monthly_contribution),
        ("annualReturnPct", inputs.annual_return_pct),
        ("annualStepUpPct", inputs.annual_step_up_pct),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "{name} must be a non-negative number"
            )));
        }
    }
    Ok(())
}
