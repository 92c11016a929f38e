use thiserror::Error;

/// Failures of the external model call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// HTTP 429 or a quota-exhausted status from the provider.
    #[error("model rate limit or quota exhausted ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    RateLimited {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("model request failed with HTTP {status} ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("could not build the model request: {0}")]
    InvalidRequest(String),

    #[error("model endpoint unreachable: {0}")]
    Transport(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model response body could not be read: {0}")]
    MalformedBody(String),

    #[error("scripted model has no response left for {0}")]
    Exhausted(&'static str),
}

impl ModelError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::RateLimited { .. })
    }
}
