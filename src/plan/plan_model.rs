use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::detect::field_model::FieldCandidate;

/// Sentinel target for fields the planner could not map.
pub const UNKNOWN_TARGET: &str = "unknown";

// ============================================================================
// Fill plan (model output wire format)
// ============================================================================

/// Profile field a plan entry maps to, or the `"unknown"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetKey {
    Unknown,
    Profile(String),
}

impl TargetKey {
    pub fn is_unknown(&self) -> bool {
        matches!(self, TargetKey::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TargetKey::Unknown => UNKNOWN_TARGET,
            TargetKey::Profile(key) => key,
        }
    }
}

impl From<String> for TargetKey {
    fn from(key: String) -> Self {
        if key == UNKNOWN_TARGET {
            TargetKey::Unknown
        } else {
            TargetKey::Profile(key)
        }
    }
}

impl From<TargetKey> for String {
    fn from(key: TargetKey) -> Self {
        match key {
            TargetKey::Unknown => UNKNOWN_TARGET.to_string(),
            TargetKey::Profile(key) => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Single(String),
    List(Vec<String>),
}

impl FillValue {
    pub fn items(&self) -> Vec<&str> {
        match self {
            FillValue::Single(s) => vec![s.as_str()],
            FillValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Text form of the value; list items are joined with `separator`.
    pub fn joined(&self, separator: &str) -> String {
        match self {
            FillValue::Single(s) => s.clone(),
            FillValue::List(items) => items.join(separator),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items().iter().all(|s| s.trim().is_empty())
    }
}

impl Default for FillValue {
    fn default() -> Self {
        FillValue::Single(String::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionMatchMode {
    Exact,
    Contains,
    Index,
}

/// How an entry picks a choice of an enumerable control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionMatch {
    pub mode: OptionMatchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillPlanEntry {
    pub el_key: String,
    pub target_key: TargetKey,
    pub value: FillValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_match: Option<OptionMatch>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ordered instructions; order is application order.
pub type FillPlan = Vec<FillPlanEntry>;

// ============================================================================
// Planner inputs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileField {
    pub key: String,
    pub label: String,
    pub value: FillValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub profile_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub fields: Vec<ProfileField>,
}

impl ProfileData {
    pub fn field(&self, key: &str) -> Option<&ProfileField> {
        self.fields.iter().find(|f| f.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMemoryMapping {
    pub el_key: String,
    pub target_key: String,
    pub confidence: f64,
    pub last_confirmed: DateTime<Utc>,
}

/// Previously confirmed mappings for one site. A hint for the planner,
/// never ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMemory {
    pub host: String,
    pub structure_hash: String,
    pub last_used: DateTime<Utc>,
    pub mappings: Vec<SiteMemoryMapping>,
}

/// Structured request handed to the external model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub instructions: String,
    pub profile: ProfileData,
    pub field_candidates: Vec<FieldCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_memory: Option<SiteMemory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutcome {
    pub fill_plan: FillPlan,
    pub raw_text: String,
    pub repaired: bool,
}
