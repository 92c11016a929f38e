use crate::detect::field_model::FieldRole;
use crate::dom::dom_model::{Document, NodeId};

/// Input types that carry no fillable data.
const NON_DATA_INPUT_TYPES: [&str; 6] = ["button", "submit", "reset", "image", "hidden", "file"];

/// What kind of control an element is, as far as role classification
/// cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Input { input_type: String },
    TextArea,
    Select,
    ContentEditable,
    Other,
}

pub fn control_kind(doc: &Document, id: NodeId) -> ControlKind {
    let Some(el) = doc.element(id) else {
        return ControlKind::Other;
    };

    match el.tag.as_str() {
        "textarea" => ControlKind::TextArea,
        "select" => ControlKind::Select,
        "input" => ControlKind::Input {
            input_type: el.input_type(),
        },
        _ if doc.is_content_editable(id) => ControlKind::ContentEditable,
        _ => ControlKind::Other,
    }
}

/// Pure mapping from control kind to role. Unknown interactive elements
/// become `Custom` so they can still receive text.
pub fn classify_role(kind: &ControlKind) -> FieldRole {
    match kind {
        ControlKind::TextArea => FieldRole::Textarea,
        ControlKind::Select => FieldRole::Select,
        ControlKind::Input { input_type } => match input_type.as_str() {
            "email" => FieldRole::Email,
            "tel" | "phone" => FieldRole::Tel,
            "date" | "datetime-local" => FieldRole::Date,
            "radio" => FieldRole::Radio,
            "checkbox" => FieldRole::Checkbox,
            // number, text, search, url, password and anything else
            _ => FieldRole::Text,
        },
        ControlKind::ContentEditable => FieldRole::Contenteditable,
        ControlKind::Other => FieldRole::Custom,
    }
}

pub fn detect_role(doc: &Document, id: NodeId) -> FieldRole {
    classify_role(&control_kind(doc, id))
}

pub fn is_eligible(doc: &Document, id: NodeId) -> bool {
    let Some(el) = doc.element(id) else {
        return false;
    };

    if el.tag == "input" && NON_DATA_INPUT_TYPES.contains(&el.input_type().as_str()) {
        return false;
    }

    if matches!(el.tag.as_str(), "input" | "select" | "textarea") && el.has_attr("disabled") {
        return false;
    }

    // Editable regions may be invisible yet still relevant
    if !doc.is_rendered(id) && !doc.is_content_editable(id) {
        return false;
    }

    true
}

/// Whether the control already holds a value, selection, or checked state.
pub fn is_prefilled(doc: &Document, id: NodeId, role: FieldRole) -> bool {
    match role {
        FieldRole::Text
        | FieldRole::Textarea
        | FieldRole::Email
        | FieldRole::Tel
        | FieldRole::Date
        | FieldRole::Custom => has_non_empty(&doc.control_value(id)),
        FieldRole::Contenteditable => has_non_empty(&doc.inner_text(id)),
        FieldRole::Select => doc.select_value(id).is_some_and(|v| has_non_empty(&v)),
        FieldRole::Radio => doc.named_group(id).into_iter().any(|r| doc.checked(r)),
        FieldRole::Checkbox => doc.checked(id),
    }
}

fn has_non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}
