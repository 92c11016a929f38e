use std::cell::RefCell;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::error::ModelError;
use crate::plan::{
    plan_model::PlanRequest,
    prompt::{build_plan_prompt, build_repair_prompt},
};

/// External model call that turns a plan request into raw response text.
pub trait PlanModel {
    fn generate(&self, request: &PlanRequest) -> Result<String, ModelError>;

    /// Ask the model to fix malformed JSON against the given schema.
    fn repair(&self, raw_text: &str, schema_description: &str) -> Result<String, ModelError>;
}

/// Map a non-success HTTP response to a `ModelError`.
///
/// Understands both `{"error": {"code", "message", "status"}}` and
/// `{"error": "..."}` bodies. HTTP 429 and `RESOURCE_EXHAUSTED` are
/// reported as rate limits.
pub fn classify_http_error(status: u16, body: &str) -> ModelError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let (code, message) = match error {
        Some(Value::Object(obj)) => {
            let code = obj
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| obj.get("code").map(|c| c.to_string()));
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(body)
                .to_string();
            (code, message)
        }
        Some(Value::String(message)) => (None, message.clone()),
        _ => (None, body.trim().to_string()),
    };

    if status == 429 || code.as_deref() == Some("RESOURCE_EXHAUSTED") {
        ModelError::RateLimited {
            status,
            code,
            message,
        }
    } else {
        ModelError::Http {
            status,
            code,
            message,
        }
    }
}

fn send_json<T: Serialize>(
    url: &str,
    headers: &[(&str, &str)],
    body: &T,
) -> Result<String, ModelError> {
    let client = reqwest::blocking::Client::new();
    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request
        .send()
        .map_err(|e| ModelError::Transport(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .map_err(|e| ModelError::MalformedBody(e.to_string()))?;

    if !status.is_success() {
        let err = classify_http_error(status.as_u16(), &text);
        warn!(status = status.as_u16(), error = %err, "model request failed");
        return Err(err);
    }
    Ok(text)
}

// ============================================================================
// Gemini Backend
// ============================================================================

pub const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

pub struct GeminiBackend {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

impl GeminiBackend {
    pub fn new(api_key: &str) -> Self {
        Self {
            endpoint: GEMINI_DEFAULT_ENDPOINT.to_string(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            api_key: api_key.to_string(),
            temperature: 0.2,
            top_p: 0.9,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn complete(&self, prompt: String) -> Result<String, ModelError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                response_mime_type: "application/json",
            },
        };

        debug!(model = %self.model, "calling Gemini");
        let body = send_json(
            &self.url(),
            &[("x-goog-api-key", self.api_key.as_str())],
            &request,
        )?;
        extract_gemini_text(&body)
    }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_gemini_text(body: &str) -> Result<String, ModelError> {
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ModelError::MalformedBody(e.to_string()))?;

    let text: String = response
        .candidates
        .first()
        .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

impl PlanModel for GeminiBackend {
    fn generate(&self, request: &PlanRequest) -> Result<String, ModelError> {
        let prompt =
            build_plan_prompt(request).map_err(|e| ModelError::InvalidRequest(e.to_string()))?;
        self.complete(prompt)
    }

    fn repair(&self, raw_text: &str, schema_description: &str) -> Result<String, ModelError> {
        self.complete(build_repair_prompt(raw_text, schema_description))
    }
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        }
    }

    fn complete(&self, prompt: String) -> Result<String, ModelError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
            format: "json",
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "calling Ollama");
        let body = send_json(&self.endpoint, &[], &request)?;
        let parsed: OllamaResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::MalformedBody(e.to_string()))?;

        if parsed.response.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(parsed.response)
    }
}

impl PlanModel for OllamaBackend {
    fn generate(&self, request: &PlanRequest) -> Result<String, ModelError> {
        let prompt =
            build_plan_prompt(request).map_err(|e| ModelError::InvalidRequest(e.to_string()))?;
        self.complete(prompt)
    }

    fn repair(&self, raw_text: &str, schema_description: &str) -> Result<String, ModelError> {
        self.complete(build_repair_prompt(raw_text, schema_description))
    }
}

// ============================================================================
// Mock Backend (scripted responses, no network)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Generate,
    Repair { raw_text: String },
}

/// Replays queued responses in order, for both `generate` and `repair`.
#[derive(Default)]
pub struct MockPlanModel {
    responses: RefCell<VecDeque<Result<String, ModelError>>>,
    calls: RefCell<Vec<MockCall>>,
}

impl MockPlanModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ModelError>>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: Result<String, ModelError>) {
        self.responses.borrow_mut().push_back(response);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }

    fn next(&self, what: &'static str) -> Result<String, ModelError> {
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(ModelError::Exhausted(what)))
    }
}

impl PlanModel for MockPlanModel {
    fn generate(&self, _request: &PlanRequest) -> Result<String, ModelError> {
        self.calls.borrow_mut().push(MockCall::Generate);
        self.next("generate")
    }

    fn repair(&self, raw_text: &str, _schema_description: &str) -> Result<String, ModelError> {
        self.calls.borrow_mut().push(MockCall::Repair {
            raw_text: raw_text.to_string(),
        });
        self.next("repair")
    }
}
