mod engine;
mod sip;
mod types;

pub use engine::{
    aggregate_expenses, generate_suggestions, run_analysis, run_projection, run_projection_with,
    run_sensitivity, target_wealth,
};
pub use sip::run_sip;
pub use types::{
    AnalysisResult, Dimension, EngineError, HORIZON_YEARS, Inputs, Overrides, ProjectionResult,
    SensitivityPoint, SipInputs, SipResult, Suggestion, SuggestionCategory, YearRecord,
};
