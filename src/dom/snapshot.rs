use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// JSON page snapshot produced by the page extractor.
///
/// A node is either `{"text": "..."}` or an element object. Element state
/// that is not expressed through attributes (current value, checked,
/// selected, whether it has a layout box) is carried in explicit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    pub root: SnapshotNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Text { text: String },
    Element(SnapshotElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotElement {
    pub tag: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,

    /// False when the element has no layout box (display:none and friends).
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub rendered: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    /// Children of this element form an isolated shadow tree.
    #[serde(default, skip_serializing_if = "is_false")]
    pub shadow_root: bool,

    /// A reactive framework tracks this control's value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub framework_controlled: bool,
}

impl SnapshotElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: vec![],
            rendered: true,
            value: None,
            checked: None,
            selected: None,
            shadow_root: false,
            framework_controlled: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_false(b: &bool) -> bool {
    !*b
}
