use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::ai_model::PlanModel;
use crate::plan::{
    error::PlanError,
    normalize::normalize_entry,
    plan_model::{FillPlan, PlanOutcome, PlanRequest},
    prompt::FILL_PLAN_SCHEMA_DESCRIPTION,
};

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*").expect("valid regex"));

/// Strip a surrounding Markdown code fence (with optional language tag).
pub fn sanitize_json(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_open = FENCE_OPEN.replace(trimmed, "");
    let body = without_open.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}

/// Parse raw model text into a plan.
///
/// `None` means the text is not a JSON array at all. Entries that fail
/// normalization are dropped, so `Some(vec![])` is a valid empty plan.
pub fn parse_plan(raw_text: &str) -> Option<FillPlan> {
    let cleaned = sanitize_json(raw_text);

    let parsed: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, raw_len = raw_text.len(), "failed to parse fill plan JSON");
            return None;
        }
    };

    let Value::Array(entries) = parsed else {
        warn!("fill plan JSON is not an array");
        return None;
    };

    Some(normalize_entries(&entries))
}

/// Normalize every entry of an already-parsed plan array, dropping the
/// ones that fail.
pub fn normalize_entries(entries: &[Value]) -> FillPlan {
    let plan: FillPlan = entries.iter().filter_map(normalize_entry).collect();
    if plan.len() < entries.len() {
        debug!(
            dropped = entries.len() - plan.len(),
            kept = plan.len(),
            "dropped invalid fill plan entries"
        );
    }
    plan
}

/// Ask the model for a plan. If the answer does not parse, send it back
/// once for repair; a second failure is terminal.
pub fn request_fill_plan(
    model: &dyn PlanModel,
    request: &PlanRequest,
) -> Result<PlanOutcome, PlanError> {
    let raw_text = model.generate(request)?;

    if let Some(fill_plan) = parse_plan(&raw_text) {
        return Ok(PlanOutcome {
            fill_plan,
            raw_text,
            repaired: false,
        });
    }

    info!("fill plan unparseable, attempting repair round-trip");
    let repaired_text = model.repair(&raw_text, FILL_PLAN_SCHEMA_DESCRIPTION)?;

    match parse_plan(&repaired_text) {
        Some(fill_plan) => Ok(PlanOutcome {
            fill_plan,
            raw_text: repaired_text,
            repaired: true,
        }),
        None => Err(PlanError::Unparseable {
            raw_text,
            repaired_text,
        }),
    }
}
