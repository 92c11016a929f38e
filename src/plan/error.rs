use thiserror::Error;

use crate::model::error::ModelError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Both the original response and its repair failed to parse.
    #[error("model response could not be parsed as a fill plan after one repair attempt")]
    Unparseable { raw_text: String, repaired_text: String },
}
