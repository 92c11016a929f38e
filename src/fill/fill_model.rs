use serde::{Deserialize, Serialize};

use crate::detect::field_model::FieldRole;

/// One reversible change. Only successful mutations produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFillState {
    pub el_key: String,
    /// Role at apply time; rollback does not re-derive it.
    pub role: FieldRole,
    /// Text of a text-like control, or the selected option value of a
    /// select (`None` when nothing was selected). For radios, the value
    /// of the member that was checked before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_checked: Option<bool>,
    /// Position of the previously selected option or previously checked
    /// radio within its group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_index: Option<usize>,
    /// Every option that was selected, in order. A multi-select may hold
    /// several.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_selected: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio_group_name: Option<String>,
}

impl AppliedFillState {
    pub fn new(el_key: &str, role: FieldRole) -> Self {
        Self {
            el_key: el_key.to_string(),
            role,
            previous_value: None,
            previous_checked: None,
            previous_index: None,
            previous_selected: vec![],
            radio_group_name: None,
        }
    }
}

/// The single "last application" slot. A new application replaces it
/// outright; rollback consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastApplication {
    states: Option<Vec<AppliedFillState>>,
}

impl LastApplication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new log, discarding whatever was held before.
    pub fn replace(&mut self, states: Vec<AppliedFillState>) -> Option<Vec<AppliedFillState>> {
        self.states.replace(states)
    }

    pub fn take(&mut self) -> Vec<AppliedFillState> {
        self.states.take().unwrap_or_default()
    }

    pub fn peek(&self) -> &[AppliedFillState] {
        self.states.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.peek().is_empty()
    }
}
