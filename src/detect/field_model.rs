use serde::{Deserialize, Serialize};

/// Behavioral category of a control, governing how its value is read and
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Text,
    Textarea,
    Tel,
    Email,
    Date,
    Select,
    Radio,
    Checkbox,
    Contenteditable,
    Custom,
}

impl FieldRole {
    /// Roles whose choices are enumerated in `FieldCandidate::options`.
    pub fn is_enumerable(&self) -> bool {
        matches!(self, FieldRole::Select | FieldRole::Radio | FieldRole::Checkbox)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Text => "text",
            FieldRole::Textarea => "textarea",
            FieldRole::Tel => "tel",
            FieldRole::Email => "email",
            FieldRole::Date => "date",
            FieldRole::Select => "select",
            FieldRole::Radio => "radio",
            FieldRole::Checkbox => "checkbox",
            FieldRole::Contenteditable => "contenteditable",
            FieldRole::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldUiFlag {
    MaskedInput,
    ReactControlled,
    ShadowDom,
    IframeChain,
    NeedsClickBeforeType,
    BlocksPaste,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_or_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
}

impl FieldHints {
    /// The single hint best suited for display.
    pub fn primary(&self) -> Option<&str> {
        [
            &self.label,
            &self.aria,
            &self.placeholder,
            &self.neighbor_text,
            &self.group_title,
            &self.title,
            &self.name_or_id,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxlength: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minlength: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
}

/// One enumerable choice. `idx` is the ordinal used by index matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub idx: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_attr: Option<String>,
}

/// One fillable control as seen by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCandidate {
    pub el_key: String,
    pub role: FieldRole,
    pub hints: FieldHints,
    pub constraints: FieldConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_flags: Option<Vec<FieldUiFlag>>,
}
