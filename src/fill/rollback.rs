use tracing::{debug, info, warn};

use crate::detect::{field_model::FieldRole, registry::ElementRegistry};
use crate::dom::{
    dom_model::{Document, NodeId},
    error::DomError,
};
use crate::fill::{
    applier::{notify, write_text},
    fill_model::AppliedFillState,
};

/// Undo an application log, most recent change first. Returns how many
/// records were restored.
pub fn rollback_fill_plan(
    doc: &mut Document,
    registry: &ElementRegistry,
    states: &[AppliedFillState],
) -> usize {
    let mut restored = 0;

    for state in states.iter().rev() {
        let Some(id) = registry.resolve(doc, &state.el_key) else {
            debug!(el_key = %state.el_key, "element gone, nothing to restore");
            continue;
        };

        match restore(doc, id, state) {
            Ok(()) => restored += 1,
            Err(e) => {
                warn!(el_key = %state.el_key, role = state.role.as_str(), error = %e, "failed to restore entry");
            }
        }
    }

    info!(records = states.len(), restored, "fill plan rolled back");
    restored
}

fn restore(doc: &mut Document, id: NodeId, state: &AppliedFillState) -> Result<(), DomError> {
    match state.role {
        FieldRole::Text
        | FieldRole::Textarea
        | FieldRole::Tel
        | FieldRole::Email
        | FieldRole::Date
        | FieldRole::Custom
        | FieldRole::Contenteditable => {
            write_text(doc, id, state.previous_value.as_deref().unwrap_or_default())?;
            notify(doc, id)
        }
        FieldRole::Select => {
            restore_select(doc, id, state)?;
            notify(doc, id)
        }
        FieldRole::Radio => restore_radio(doc, id, state),
        FieldRole::Checkbox => {
            doc.native_set_checked(id, state.previous_checked.unwrap_or(false))?;
            notify(doc, id)
        }
    }
}

/// Positions win while they still point at the recorded value, so
/// options sharing a value and multi-selections come back exactly.
fn restore_select(doc: &mut Document, id: NodeId, state: &AppliedFillState) -> Result<(), DomError> {
    let options = doc.options(id);
    let positions_hold = match state.previous_selected.first() {
        Some(first) => {
            state.previous_selected.iter().all(|i| *i < options.len())
                && state.previous_value.as_deref() == Some(doc.option_value(options[*first]).as_str())
        }
        None => false,
    };
    if positions_hold {
        return doc.native_set_selected_indices(id, &state.previous_selected);
    }

    match state.previous_value.as_deref() {
        Some(value) => {
            doc.native_set_value(id, value)?;
            // Value no longer among the options; fall back to position
            if doc.selected_index(id).is_none() {
                doc.native_set_selected_index(id, state.previous_index)?;
            }
            Ok(())
        }
        None => doc.native_set_selected_index(id, None),
    }
}

fn restore_radio(doc: &mut Document, id: NodeId, state: &AppliedFillState) -> Result<(), DomError> {
    let group = doc.named_group(id);

    match state.previous_index.and_then(|i| group.get(i).copied()) {
        Some(member) => {
            doc.native_set_checked(member, true)?;
            notify(doc, member)
        }
        None => {
            for member in group {
                if doc.checked(member) {
                    doc.native_set_checked(member, false)?;
                    notify(doc, member)?;
                }
            }
            Ok(())
        }
    }
}
