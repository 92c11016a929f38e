use tracing::{debug, info, warn};

use crate::detect::{
    classifier::detect_role, field_model::FieldRole, hints::extract_label_text,
    registry::ElementRegistry,
};
use crate::dom::{
    dom_model::{Document, EventKind, NodeId},
    error::DomError,
};
use crate::fill::{
    fill_model::AppliedFillState,
    matcher::{Choice, checkbox_state, resolve_choice},
};
use crate::plan::plan_model::{FillPlan, FillPlanEntry};

/// Notification sequence sent after every write, so reactive code and
/// native validation re-evaluate.
pub(crate) fn notify(doc: &mut Document, id: NodeId) -> Result<(), DomError> {
    doc.dispatch(id, EventKind::Input)?;
    doc.dispatch(id, EventKind::Change)?;
    doc.dispatch(id, EventKind::Blur)
}

/// Apply a plan in order and return the log of changes that actually
/// happened. Unresolved keys are skipped; a failing entry is logged and
/// the rest of the plan still runs.
pub fn apply_fill_plan(
    doc: &mut Document,
    registry: &ElementRegistry,
    plan: &FillPlan,
) -> Vec<AppliedFillState> {
    let mut applied = Vec::new();

    for entry in plan {
        let Some(id) = registry.resolve(doc, &entry.el_key) else {
            debug!(el_key = %entry.el_key, "skipping unresolved element key");
            continue;
        };

        let role = detect_role(doc, id);
        match apply_entry(doc, id, role, entry) {
            Ok(Some(state)) => {
                debug!(el_key = %entry.el_key, role = role.as_str(), "applied entry");
                applied.push(state);
            }
            Ok(None) => {
                debug!(el_key = %entry.el_key, role = role.as_str(), "no matching choice, left untouched");
            }
            Err(e) => {
                warn!(el_key = %entry.el_key, role = role.as_str(), error = %e, "failed to apply entry");
            }
        }
    }

    info!(entries = plan.len(), applied = applied.len(), "fill plan applied");
    applied
}

fn apply_entry(
    doc: &mut Document,
    id: NodeId,
    role: FieldRole,
    entry: &FillPlanEntry,
) -> Result<Option<AppliedFillState>, DomError> {
    match role {
        FieldRole::Text
        | FieldRole::Textarea
        | FieldRole::Tel
        | FieldRole::Email
        | FieldRole::Date
        | FieldRole::Custom
        | FieldRole::Contenteditable => apply_text(doc, id, role, entry).map(Some),
        FieldRole::Select => apply_select(doc, id, entry),
        FieldRole::Radio => apply_radio(doc, id, entry),
        FieldRole::Checkbox => apply_checkbox(doc, id, entry).map(Some),
    }
}

/// Whether the element stores its text in a value slot rather than in
/// its children.
pub(crate) fn has_value_slot(doc: &Document, id: NodeId) -> bool {
    matches!(doc.tag(id), Some("input" | "textarea"))
}

pub(crate) fn read_text(doc: &Document, id: NodeId) -> String {
    if has_value_slot(doc, id) {
        doc.control_value(id)
    } else {
        doc.text_content(id)
    }
}

pub(crate) fn write_text(doc: &mut Document, id: NodeId, text: &str) -> Result<(), DomError> {
    if has_value_slot(doc, id) {
        doc.native_set_value(id, text)
    } else {
        doc.set_text(id, text)
    }
}

fn apply_text(
    doc: &mut Document,
    id: NodeId,
    role: FieldRole,
    entry: &FillPlanEntry,
) -> Result<AppliedFillState, DomError> {
    let separator = match role {
        FieldRole::Textarea | FieldRole::Contenteditable => "\n",
        _ => ", ",
    };

    let previous = read_text(doc, id);
    write_text(doc, id, &entry.value.joined(separator))?;
    notify(doc, id)?;

    let mut state = AppliedFillState::new(&entry.el_key, role);
    state.previous_value = Some(previous);
    Ok(state)
}

fn select_choices(doc: &Document, select: NodeId) -> Vec<Choice> {
    doc.options(select)
        .into_iter()
        .map(|option| Choice {
            text: doc.option_text(option),
            label: Some(doc.option_label(option)),
            value: Some(doc.option_value(option)),
        })
        .collect()
}

fn apply_select(
    doc: &mut Document,
    id: NodeId,
    entry: &FillPlanEntry,
) -> Result<Option<AppliedFillState>, DomError> {
    let choices = select_choices(doc, id);
    let Some(target) = resolve_choice(&choices, entry.option_match.as_ref(), &entry.value) else {
        return Ok(None);
    };

    let mut state = AppliedFillState::new(&entry.el_key, FieldRole::Select);
    state.previous_value = doc.select_value(id);
    state.previous_index = doc.selected_index(id);
    state.previous_selected = doc.selected_indices(id);

    doc.native_set_selected_index(id, Some(target))?;
    notify(doc, id)?;
    Ok(Some(state))
}

pub(crate) fn member_choice(doc: &Document, member: NodeId) -> Choice {
    let value = doc.control_value(member);
    Choice {
        text: extract_label_text(doc, member).unwrap_or_else(|| value.clone()),
        label: doc.attr(member, "aria-label").map(str::to_string),
        value: Some(value),
    }
}

fn apply_radio(
    doc: &mut Document,
    id: NodeId,
    entry: &FillPlanEntry,
) -> Result<Option<AppliedFillState>, DomError> {
    let group = doc.named_group(id);
    let choices: Vec<Choice> = group.iter().map(|m| member_choice(doc, *m)).collect();
    let Some(target) = resolve_choice(&choices, entry.option_match.as_ref(), &entry.value) else {
        return Ok(None);
    };

    let previous = group.iter().position(|m| doc.checked(*m));
    let mut state = AppliedFillState::new(&entry.el_key, FieldRole::Radio);
    state.previous_index = previous;
    state.previous_value = previous.map(|i| doc.control_value(group[i]));
    state.radio_group_name = doc
        .attr(id, "name")
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let member = group[target];
    doc.native_set_checked(member, true)?;
    notify(doc, member)?;
    Ok(Some(state))
}

fn apply_checkbox(
    doc: &mut Document,
    id: NodeId,
    entry: &FillPlanEntry,
) -> Result<AppliedFillState, DomError> {
    let own = member_choice(doc, id);
    let desired = checkbox_state(&own, entry.option_match.as_ref(), &entry.value);

    let mut state = AppliedFillState::new(&entry.el_key, FieldRole::Checkbox);
    state.previous_checked = Some(doc.checked(id));

    doc.native_set_checked(id, desired)?;
    notify(doc, id)?;
    Ok(state)
}
