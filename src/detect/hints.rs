use once_cell::sync::Lazy;
use regex::Regex;

use crate::detect::field_model::{FieldConstraints, FieldHints};
use crate::dom::dom_model::{Document, NodeId, collapse_whitespace};

const MAX_NEIGHBOR_CHARS: usize = 200;
const MAX_ANCESTOR_DEPTH: usize = 3;

/// Boilerplate "required" markers that make a text fragment useless as a
/// label.
static REQUIRED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)必填项?|^[\s*]*\(?required\)?[\s*]*$").expect("valid regex")
});

pub fn extract_hints(doc: &Document, id: NodeId) -> FieldHints {
    FieldHints {
        label: extract_label_text(doc, id),
        placeholder: placeholder(doc, id),
        name_or_id: name_or_id(doc, id),
        aria: aria_description(doc, id),
        title: doc.attr(id, "title").map(str::to_string),
        neighbor_text: neighbor_text(doc, id),
        group_title: group_title(doc, id),
    }
}

pub fn extract_constraints(doc: &Document, id: NodeId) -> FieldConstraints {
    let mut constraints = FieldConstraints::default();

    match doc.tag(id) {
        Some(tag @ ("input" | "textarea")) => {
            let required = doc.attr(id, "required").is_some()
                || doc.attr(id, "aria-required") == Some("true");
            constraints.required = required.then_some(true);
            constraints.maxlength = positive_attr(doc, id, "maxlength");
            constraints.minlength = positive_attr(doc, id, "minlength");

            if tag == "input" {
                constraints.pattern = non_empty_attr(doc, id, "pattern");
                constraints.accept = non_empty_attr(doc, id, "accept");
            }
        }
        Some("select") => {
            constraints.required = doc.attr(id, "required").is_some().then_some(true);
        }
        _ => {}
    }

    constraints
}

/// Label text from, in order: associated `<label>` elements, a
/// `label[for]` lookup, and a wrapping label with the control's own text
/// removed.
pub fn extract_label_text(doc: &Document, id: NodeId) -> Option<String> {
    let root = doc.tree_root(id);

    if is_labelable(doc, id) {
        let associated = doc
            .tree_elements(root)
            .into_iter()
            .filter(|l| doc.tag(*l) == Some("label") && labels_control(doc, *l, id))
            .map(|l| doc.inner_text(l))
            .find(|text| !text.is_empty());
        if associated.is_some() {
            return associated;
        }
    }

    if let Some(el_id) = doc.attr(id, "id").filter(|v| !v.is_empty()) {
        let for_label = doc
            .tree_elements(root)
            .into_iter()
            .find(|l| doc.tag(*l) == Some("label") && doc.attr(*l, "for") == Some(el_id));
        if let Some(label) = for_label {
            let text = doc.inner_text(label);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    if let Some(wrapper) = doc.closest(id, "label") {
        let text = strip_own_text(doc, wrapper, id);
        if !text.is_empty() {
            return Some(text);
        }
    }

    None
}

fn is_labelable(doc: &Document, id: NodeId) -> bool {
    match doc.element(id) {
        Some(el) if el.tag == "input" => el.input_type() != "hidden",
        Some(el) => matches!(el.tag.as_str(), "select" | "textarea" | "meter" | "output" | "progress"),
        None => false,
    }
}

/// `label.control == id`: an explicit `for` target, or the first
/// labelable descendant when `for` is absent.
fn labels_control(doc: &Document, label: NodeId, id: NodeId) -> bool {
    match doc.attr(label, "for") {
        Some(target) => doc.attr(id, "id") == Some(target),
        None => doc
            .descendant_elements(label)
            .into_iter()
            .find(|d| is_labelable(doc, *d))
            == Some(id),
    }
}

fn strip_own_text(doc: &Document, container: NodeId, id: NodeId) -> String {
    let own = doc.text_content(id);
    let text = doc.text_content(container);
    let stripped = if own.is_empty() {
        text
    } else {
        text.replacen(&own, "", 1)
    };
    collapse_whitespace(&stripped)
}

fn placeholder(doc: &Document, id: NodeId) -> Option<String> {
    match doc.tag(id) {
        Some("input" | "textarea") => non_empty_attr(doc, id, "placeholder"),
        _ => None,
    }
}

fn name_or_id(doc: &Document, id: NodeId) -> Option<String> {
    let has_name_property = matches!(
        doc.tag(id),
        Some("input" | "select" | "textarea" | "button" | "form" | "fieldset" | "output")
    );
    if has_name_property {
        if let Some(name) = non_empty_attr(doc, id, "name") {
            return Some(name);
        }
    }
    non_empty_attr(doc, id, "id")
}

fn aria_description(doc: &Document, id: NodeId) -> Option<String> {
    if let Some(label) = non_empty_attr(doc, id, "aria-label") {
        return Some(label);
    }

    let labelled_by = doc.attr(id, "aria-labelledby")?;
    let root = doc.tree_root(id);
    let text = labelled_by
        .split_whitespace()
        .filter_map(|ref_id| doc.get_element_by_id(root, ref_id))
        .map(|node| doc.text_content(node).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!text.is_empty()).then_some(text)
}

/// Visually neighboring text: the previous sibling, then the parent's
/// text minus the control, then preceding siblings of nearby ancestors.
fn neighbor_text(doc: &Document, id: NodeId) -> Option<String> {
    if let Some(previous) = doc.previous_element_sibling(id) {
        let text = doc.text_content(previous).trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Some(parent) = doc.parent_element(id) {
        let text = strip_own_text(doc, parent, id);
        if usable_fragment(&text) {
            return Some(text);
        }
    }

    ancestor_sibling_text(doc, id)
}

fn ancestor_sibling_text(doc: &Document, id: NodeId) -> Option<String> {
    let mut current = id;

    for _ in 0..MAX_ANCESTOR_DEPTH {
        let parent = doc.parent_element(current)?;
        if let Some(text) = preceding_sibling_text(doc, parent, current) {
            return Some(text);
        }
        current = parent;
    }

    None
}

fn preceding_sibling_text(doc: &Document, container: NodeId, target: NodeId) -> Option<String> {
    let children = doc.element_children(container);
    let pos = children.iter().position(|c| *c == target)?;

    let fragments: Vec<String> = children[..pos]
        .iter()
        .map(|c| collapse_whitespace(&doc.text_content(*c)))
        .filter(|t| !t.is_empty())
        .collect();

    let combined = fragments.join(" ");
    usable_fragment(&combined).then_some(combined)
}

fn usable_fragment(text: &str) -> bool {
    !text.is_empty()
        && text.chars().count() <= MAX_NEIGHBOR_CHARS
        && !REQUIRED_MARKER.is_match(text)
}

fn group_title(doc: &Document, id: NodeId) -> Option<String> {
    let fieldset = doc.closest(id, "fieldset")?;
    let legend = doc
        .descendant_elements(fieldset)
        .into_iter()
        .find(|d| doc.tag(*d) == Some("legend"))?;
    let text = doc.text_content(legend).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn non_empty_attr(doc: &Document, id: NodeId, name: &str) -> Option<String> {
    doc.attr(id, name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive_attr(doc: &Document, id: NodeId, name: &str) -> Option<u32> {
    doc.attr(id, name)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
}
