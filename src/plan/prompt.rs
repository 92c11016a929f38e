use crate::plan::plan_model::PlanRequest;

pub const FILL_PLAN_SCHEMA_DESCRIPTION: &str = r#"FillPlan => Array<FillPlanEntry>
FillPlanEntry => {
  elKey: string;
  targetKey: string | "unknown";
  value: string | string[];
  optionMatch?: { mode: "exact" | "contains" | "index"; index?: number; expectText?: string };
  confidence: number; // 0-1
  reason?: string;
}"#;

/// Settings that shape the planner instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionOptions {
    pub min_confidence: f64,
    pub max_summary_chars: usize,
    pub phone_format: String,
}

pub fn compose_instructions(
    options: &InstructionOptions,
    host: Option<&str>,
    has_site_memory: bool,
) -> String {
    let memory_hint = if has_site_memory {
        "siteMemory is attached as a few-shot hint; prefer previously confirmed mappings."
    } else {
        "No siteMemory is available for this site."
    };

    [
        "You are a form autofill assistant. Using the provided profile and fieldCandidates, return a FillPlan JSON array that can be executed directly.".to_string(),
        format!("Target site: {}", host.unwrap_or("unknown site")),
        memory_hint.to_string(),
        "Rules:".to_string(),
        "1. Only use values from profile.fields; never invent, infer, or rewrite real data.".to_string(),
        format!(
            "2. If a mapping cannot be determined, set targetKey=\"unknown\", value=\"\", and a confidence below {:.2}.",
            options.min_confidence
        ),
        format!(
            "3. Long text values must be condensed to at most {} characters.",
            options.max_summary_chars
        ),
        "4. Dates always use YYYY-MM-DD.".to_string(),
        format!("5. Phone numbers must follow the format: {}.", options.phone_format),
        "6. Enumerable fields (select/radio/checkbox) must carry an optionMatch based on candidate options; match priority: exact -> contains -> index.".to_string(),
        "7. Return a strict JSON array with no explanation, Markdown, or extra text.".to_string(),
        "8. confidence must be a number from 0 to 1; reason is optional but should explain the decision.".to_string(),
        format!("FillPlan JSON structure:\n{}", FILL_PLAN_SCHEMA_DESCRIPTION),
    ]
    .join("\n")
}

/// Flatten a plan request into a single prompt.
pub fn build_plan_prompt(request: &PlanRequest) -> Result<String, serde_json::Error> {
    let profile = serde_json::to_string_pretty(&request.profile)?;
    let candidates = serde_json::to_string_pretty(&request.field_candidates)?;

    let mut prompt = format!(
        "{}\n\nprofile:\n{}\n\nfieldCandidates:\n{}",
        request.instructions, profile, candidates
    );
    if let Some(memory) = &request.site_memory {
        prompt.push_str("\n\nsiteMemory:\n");
        prompt.push_str(&serde_json::to_string_pretty(memory)?);
    }
    Ok(prompt)
}

pub fn build_repair_prompt(raw_text: &str, schema_description: &str) -> String {
    format!(
        r#"The text below was supposed to be a JSON array matching this schema:
{schema}

Repair it into valid JSON that matches the schema. Keep every entry and value that is present; do not add new entries.
Respond with ONLY the corrected JSON array, no explanation and no Markdown.

TEXT:
{raw}"#,
        schema = schema_description,
        raw = raw_text,
    )
}
