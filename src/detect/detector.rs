use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::detect::{
    classifier::{detect_role, is_eligible, is_prefilled},
    field_model::{FieldCandidate, FieldOption, FieldRole, FieldUiFlag},
    hints::{extract_constraints, extract_hints, extract_label_text},
    registry::{ELEMENT_KEY_ATTR, ElementRegistry},
};
use crate::dom::dom_model::{Document, NodeId, TreeRoot};

const EDITABLE_VALUES: [&str; 3] = ["", "true", "plaintext-only"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Leave out controls that already hold a value, selection, or check.
    pub skip_prefilled: bool,
}

/// Part of the page a scan covers. A document scan does not descend into
/// shadow trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Document,
    ShadowRoot(NodeId),
}

impl Scope {
    fn tree_root(&self) -> TreeRoot {
        match self {
            Scope::Document => TreeRoot::Document,
            Scope::ShadowRoot(host) => TreeRoot::Shadow(*host),
        }
    }
}

/// Scan `scope` for fillable controls.
///
/// The registry is cleared and repopulated, so keys from earlier scans
/// resolve only if their element was stamped again here.
pub fn detect(
    doc: &mut Document,
    scope: Scope,
    options: DetectOptions,
    registry: &mut ElementRegistry,
) -> Vec<FieldCandidate> {
    registry.clear();

    let controls: Vec<NodeId> = doc
        .tree_elements(scope.tree_root())
        .into_iter()
        .filter(|id| is_scanned_control(doc, *id))
        .collect();

    let mut radio_groups_handled: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for id in controls {
        if !is_eligible(doc, id) {
            continue;
        }

        let role = detect_role(doc, id);

        if role == FieldRole::Radio {
            if let Some(group_key) = radio_group_key(doc, id) {
                if !radio_groups_handled.insert(group_key) {
                    continue;
                }
            }
        }

        if options.skip_prefilled && is_prefilled(doc, id, role) {
            debug!(node = id.0, role = role.as_str(), "skipping prefilled control");
            continue;
        }

        let el_key = assign_element_key(doc, registry, id);
        candidates.push(build_candidate(doc, id, el_key, role));
    }

    debug!(count = candidates.len(), ?scope, "field scan complete");
    candidates
}

fn is_scanned_control(doc: &Document, id: NodeId) -> bool {
    let Some(el) = doc.element(id) else {
        return false;
    };

    if matches!(el.tag.as_str(), "input" | "textarea" | "select") {
        return true;
    }

    if let Some(editable) = el.attr("contenteditable") {
        if EDITABLE_VALUES.contains(&editable.trim().to_ascii_lowercase().as_str()) {
            return true;
        }
    }

    el.attr("role").is_some_and(|r| r.eq_ignore_ascii_case("textbox"))
}

/// `(form identity, name)` key for a radio; unnamed radios have none and
/// stand alone.
fn radio_group_key(doc: &Document, id: NodeId) -> Option<String> {
    let name = doc.attr(id, "name").filter(|n| !n.is_empty())?;
    let form = match doc.form_owner(id) {
        Some(form) => match doc.attr(form, "id").filter(|v| !v.is_empty()) {
            Some(form_id) => form_id.to_string(),
            None => format!("form@{}", form.0),
        },
        None => "no-form".to_string(),
    };
    Some(format!("{}:{}", form, name))
}

fn assign_element_key(doc: &mut Document, registry: &mut ElementRegistry, id: NodeId) -> String {
    let existing = doc
        .attr(id, ELEMENT_KEY_ATTR)
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    if let Some(key) = existing {
        // Cloned markup can carry another element's key
        if !registry.is_claimed_by_other(&key, id) {
            registry.register(&key, id);
            return key;
        }
    }

    let key = format!("el-{}", Uuid::new_v4());
    if let Err(e) = doc.set_attr(id, ELEMENT_KEY_ATTR, &key) {
        warn!(node = id.0, error = %e, "could not stamp element key");
    }
    registry.register(&key, id);
    key
}

fn build_candidate(doc: &Document, id: NodeId, el_key: String, role: FieldRole) -> FieldCandidate {
    FieldCandidate {
        el_key,
        role,
        hints: extract_hints(doc, id),
        constraints: extract_constraints(doc, id),
        options: role.is_enumerable().then(|| extract_options(doc, id, role)),
        ui_flags: detect_ui_flags(doc, id),
    }
}

fn detect_ui_flags(doc: &Document, id: NodeId) -> Option<Vec<FieldUiFlag>> {
    let mut flags = Vec::new();

    if matches!(doc.tree_root(id), TreeRoot::Shadow(_)) {
        flags.push(FieldUiFlag::ShadowDom);
    }
    if doc.element(id).is_some_and(|e| e.tracker.is_some()) {
        flags.push(FieldUiFlag::ReactControlled);
    }

    (!flags.is_empty()).then_some(flags)
}

/// Every choice of the control: all options of a dropdown, or every
/// same-named input of a radio/checkbox group.
pub fn extract_options(doc: &Document, id: NodeId, role: FieldRole) -> Vec<FieldOption> {
    match role {
        FieldRole::Select => doc
            .options(id)
            .into_iter()
            .enumerate()
            .map(|(idx, option)| FieldOption {
                idx,
                text: doc.option_text(option),
                alt_text: non_empty(doc.option_label(option)),
                value_attr: non_empty(doc.option_value(option)),
            })
            .collect(),
        FieldRole::Radio | FieldRole::Checkbox => doc
            .named_group(id)
            .into_iter()
            .enumerate()
            .map(|(idx, member)| {
                let value = non_empty(doc.control_value(member));
                let text = extract_label_text(doc, member)
                    .or_else(|| value.clone())
                    .unwrap_or_else(|| format!("Option {}", idx + 1));
                FieldOption {
                    idx,
                    text,
                    alt_text: value.clone(),
                    value_attr: value,
                }
            })
            .collect(),
        _ => vec![],
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
