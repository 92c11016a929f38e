use std::path::PathBuf;

use form_autofill::{
    detect::{
        detector::{DetectOptions, Scope, detect},
        field_model::FieldCandidate,
        registry::ElementRegistry,
    },
    dom::dom_model::{Document, NodeId, TreeRoot},
    plan::plan_model::{
        FillPlanEntry, FillValue, OptionMatch, OptionMatchMode, ProfileData, TargetKey,
    },
};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_text(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

pub fn load_page(name: &str) -> Document {
    Document::from_json(&fixture_text(name)).unwrap()
}

pub fn load_profile() -> ProfileData {
    serde_json::from_str(&fixture_text("profile.json")).unwrap()
}

/// Build a document from a `body` element's children.
pub fn page_with(children: serde_json::Value) -> Document {
    let snapshot = serde_json::json!({
        "url": "https://forms.example.com/signup",
        "title": "Test",
        "root": { "tag": "html", "children": [{ "tag": "body", "children": children }] }
    });
    Document::from_json(&snapshot.to_string()).unwrap()
}

pub fn scan(doc: &mut Document, registry: &mut ElementRegistry) -> Vec<FieldCandidate> {
    detect(doc, Scope::Document, DetectOptions::default(), registry)
}

/// First element in the main document whose `name` attribute matches.
pub fn by_name(doc: &Document, name: &str) -> NodeId {
    doc.tree_elements(TreeRoot::Document)
        .into_iter()
        .find(|id| doc.attr(*id, "name") == Some(name))
        .unwrap_or_else(|| panic!("no element named {name}"))
}

/// All elements in the main document with the given `name`.
pub fn all_by_name(doc: &Document, name: &str) -> Vec<NodeId> {
    doc.tree_elements(TreeRoot::Document)
        .into_iter()
        .filter(|id| doc.attr(*id, "name") == Some(name))
        .collect()
}

pub fn key_of(candidates: &[FieldCandidate], name: &str) -> String {
    candidates
        .iter()
        .find(|c| c.hints.name_or_id.as_deref() == Some(name))
        .map(|c| c.el_key.clone())
        .unwrap_or_else(|| panic!("no candidate named {name}"))
}

pub fn entry(el_key: &str, target: &str, value: &str) -> FillPlanEntry {
    FillPlanEntry {
        el_key: el_key.to_string(),
        target_key: TargetKey::from(target.to_string()),
        value: FillValue::Single(value.to_string()),
        option_match: None,
        confidence: 0.9,
        reason: None,
    }
}

pub fn with_match(
    mut e: FillPlanEntry,
    mode: OptionMatchMode,
    index: Option<i64>,
    expect_text: Option<&str>,
) -> FillPlanEntry {
    e.option_match = Some(OptionMatch {
        mode,
        index,
        expect_text: expect_text.map(str::to_string),
    });
    e
}
