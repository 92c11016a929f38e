use thiserror::Error;

use crate::plan::error::PlanError;

/// Whole-operation failures. Per-entry problems never surface here.
#[derive(Debug, Error)]
pub enum AutofillError {
    #[error(
        "no API key configured for the '{provider}' model provider; set model.apiKey in form-autofill.yaml, pass --api-key, or export GEMINI_API_KEY"
    )]
    MissingCredentials { provider: String },

    #[error("no profile loaded; pass --profile or set fill.activeProfile in form-autofill.yaml")]
    MissingProfile,

    #[error("could not load profile '{path}': {reason}")]
    ProfileLoad { path: String, reason: String },

    #[error("unknown model provider '{0}' (expected gemini, ollama or mock)")]
    UnknownProvider(String),

    #[error("this session has no model backend; pass a plan file or configure model.provider")]
    NoModel,

    #[error("'{path}' does not hold a fill plan; expected a JSON array of plan entries")]
    PlanFile { path: String },

    #[error("no fillable fields detected; scan a page with form controls first")]
    EmptyCandidates,

    #[error("the fill plan has no entries; request a plan before applying")]
    EmptyPlan,

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AutofillError {
    /// Whether the model provider reported a rate limit or exhausted quota.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AutofillError::Plan(PlanError::Model(e)) if e.is_rate_limited())
    }
}
