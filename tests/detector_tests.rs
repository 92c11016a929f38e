use form_autofill::{
    detect::{
        classifier::{ControlKind, classify_role},
        detector::{DetectOptions, Scope, detect},
        field_model::{FieldRole, FieldUiFlag},
        registry::{ELEMENT_KEY_ATTR, ElementRegistry},
    },
    dom::dom_model::TreeRoot,
};
use serde_json::json;

use crate::common::utils::{by_name, key_of, load_page, page_with, scan};

mod common;

// ============================================================================
// 1. Eligibility and roles
// ============================================================================

#[test]
fn contact_form_yields_expected_roles_in_order() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let roles: Vec<FieldRole> = candidates.iter().map(|c| c.role).collect();
    assert_eq!(
        roles,
        vec![
            FieldRole::Text,
            FieldRole::Email,
            FieldRole::Tel,
            FieldRole::Date,
            FieldRole::Textarea,
            FieldRole::Select,
            FieldRole::Radio,
            FieldRole::Checkbox,
            FieldRole::Contenteditable,
            FieldRole::Custom,
        ]
    );
    assert_eq!(registry.len(), candidates.len());
}

#[test]
fn non_data_disabled_and_unrendered_controls_are_excluded() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let names: Vec<&str> = candidates
        .iter()
        .filter_map(|c| c.hints.name_or_id.as_deref())
        .collect();
    for excluded in ["csrf", "resume", "legacy", "ghost"] {
        assert!(!names.contains(&excluded), "{excluded} should be excluded");
    }
}

#[test]
fn invisible_editable_region_is_still_eligible() {
    let mut doc = page_with(json!([
        { "tag": "div", "attrs": { "id": "draft", "contenteditable": "" }, "rendered": false },
        { "tag": "input", "attrs": { "name": "gone" }, "rendered": false }
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].role, FieldRole::Contenteditable);
}

#[test]
fn role_classification_is_pure() {
    let input = |t: &str| ControlKind::Input {
        input_type: t.to_string(),
    };
    assert_eq!(classify_role(&input("email")), FieldRole::Email);
    assert_eq!(classify_role(&input("tel")), FieldRole::Tel);
    assert_eq!(classify_role(&input("date")), FieldRole::Date);
    assert_eq!(classify_role(&input("number")), FieldRole::Text);
    assert_eq!(classify_role(&input("search")), FieldRole::Text);
    assert_eq!(classify_role(&ControlKind::TextArea), FieldRole::Textarea);
    assert_eq!(classify_role(&ControlKind::Other), FieldRole::Custom);
}

// ============================================================================
// 2. Identity keys
// ============================================================================

#[test]
fn rescan_of_unchanged_document_keeps_every_key() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();

    let first: Vec<String> = scan(&mut doc, &mut registry).into_iter().map(|c| c.el_key).collect();
    let second: Vec<String> = scan(&mut doc, &mut registry).into_iter().map(|c| c.el_key).collect();

    assert_eq!(first, second);
    assert!(first.iter().all(|k| k.starts_with("el-")));
}

#[test]
fn keys_survive_snapshot_round_trip() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let before: Vec<String> = scan(&mut doc, &mut registry).into_iter().map(|c| c.el_key).collect();

    let json = serde_json::to_string(&doc.to_snapshot()).unwrap();
    let mut reloaded = form_autofill::dom::dom_model::Document::from_json(&json).unwrap();
    let after: Vec<String> = scan(&mut reloaded, &mut registry).into_iter().map(|c| c.el_key).collect();

    assert_eq!(before, after);
}

#[test]
fn keys_resolve_to_their_elements() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let email = by_name(&doc, "email");
    let key = key_of(&candidates, "email");
    assert_eq!(registry.resolve(&doc, &key), Some(email));
    assert_eq!(doc.attr(email, ELEMENT_KEY_ATTR), Some(key.as_str()));
}

#[test]
fn duplicated_keys_are_reminted() {
    let mut doc = page_with(json!([
        { "tag": "input", "attrs": { "name": "a", "data-autofill-key": "el-copied" } },
        { "tag": "input", "attrs": { "name": "b", "data-autofill-key": "el-copied" } }
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates[0].el_key, "el-copied");
    assert_ne!(candidates[1].el_key, "el-copied");
    assert_eq!(
        registry.resolve(&doc, &candidates[1].el_key),
        Some(by_name(&doc, "b"))
    );
}

#[test]
fn removed_element_key_stops_resolving() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);
    let key = key_of(&candidates, "phone");

    let phone = by_name(&doc, "phone");
    doc.remove(phone);
    assert_eq!(registry.resolve(&doc, &key), None);

    scan(&mut doc, &mut registry);
    assert_eq!(registry.resolve(&doc, &key), None);
}

#[test]
fn rescan_drops_keys_of_now_skipped_controls() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);
    let key = key_of(&candidates, "fullName");

    let name = by_name(&doc, "fullName");
    doc.native_set_value(name, "Ada").unwrap();
    detect(
        &mut doc,
        Scope::Document,
        DetectOptions { skip_prefilled: true },
        &mut registry,
    );

    assert_eq!(registry.resolve(&doc, &key), None);
}

// ============================================================================
// 3. Radio groups
// ============================================================================

#[test]
fn radio_group_yields_one_candidate_with_all_options() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let radios: Vec<_> = candidates.iter().filter(|c| c.role == FieldRole::Radio).collect();
    assert_eq!(radios.len(), 1);

    let options = radios[0].options.as_ref().unwrap();
    assert_eq!(options.len(), 3);
    let texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["Female", "Male", "Prefer not to say"]);
    assert_eq!(options[2].idx, 2);
    assert_eq!(options[2].value_attr.as_deref(), Some("other"));
    assert_eq!(radios[0].hints.group_title.as_deref(), Some("Gender"));
}

#[test]
fn same_name_in_different_forms_are_separate_groups() {
    let mut doc = page_with(json!([
        { "tag": "form", "children": [
            { "tag": "input", "attrs": { "type": "radio", "name": "plan", "value": "a" } },
            { "tag": "input", "attrs": { "type": "radio", "name": "plan", "value": "b" } }
        ]},
        { "tag": "form", "children": [
            { "tag": "input", "attrs": { "type": "radio", "name": "plan", "value": "c" } }
        ]}
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].options.as_ref().unwrap().len(), 2);
    assert_eq!(candidates[1].options.as_ref().unwrap().len(), 1);
}

#[test]
fn unnamed_radios_are_singletons() {
    let mut doc = page_with(json!([
        { "tag": "input", "attrs": { "type": "radio", "value": "x" } },
        { "tag": "input", "attrs": { "type": "radio", "value": "y" } }
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.options.as_ref().unwrap().len() == 1));
}

#[test]
fn unlabeled_choice_falls_back_to_ordinal_text() {
    let mut doc = page_with(json!([
        { "tag": "input", "attrs": { "type": "radio", "name": "r", "value": "" } }
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let option = &candidates[0].options.as_ref().unwrap()[0];
    assert_eq!(option.text, "Option 1");
    assert_eq!(option.value_attr, None);
}

// ============================================================================
// 4. skipPrefilled
// ============================================================================

#[test]
fn prefilled_text_is_skipped_only_when_asked() {
    let make = || {
        page_with(json!([
            { "tag": "label", "attrs": { "for": "first" }, "children": [{ "text": "First name" }] },
            { "tag": "input", "attrs": { "id": "first", "name": "first", "value": "John" } }
        ]))
    };
    let mut registry = ElementRegistry::new();

    let mut doc = make();
    let skipped = detect(&mut doc, Scope::Document, DetectOptions { skip_prefilled: true }, &mut registry);
    assert!(skipped.is_empty());

    let mut doc = make();
    let kept = detect(&mut doc, Scope::Document, DetectOptions { skip_prefilled: false }, &mut registry);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].hints.label.as_deref(), Some("First name"));
    assert_eq!(doc.control_value(by_name(&doc, "first")), "John");
    assert!(doc.events().is_empty());
}

#[test]
fn prefilled_radio_group_is_skipped_as_a_whole() {
    let mut doc = page_with(json!([
        { "tag": "input", "attrs": { "type": "radio", "name": "size", "value": "s" } },
        { "tag": "input", "attrs": { "type": "radio", "name": "size", "value": "m", "checked": "" } },
        { "tag": "input", "attrs": { "type": "radio", "name": "size", "value": "l" } }
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = detect(&mut doc, Scope::Document, DetectOptions { skip_prefilled: true }, &mut registry);

    assert!(candidates.is_empty());
}

#[test]
fn default_first_option_does_not_count_as_prefilled() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = detect(&mut doc, Scope::Document, DetectOptions { skip_prefilled: true }, &mut registry);

    assert!(candidates.iter().any(|c| c.role == FieldRole::Select));
}

// ============================================================================
// 5. Hints and constraints
// ============================================================================

#[test]
fn hints_cover_every_source() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);
    let find = |name: &str| {
        candidates
            .iter()
            .find(|c| c.hints.name_or_id.as_deref() == Some(name))
            .unwrap()
    };

    assert_eq!(find("fullName").hints.label.as_deref(), Some("Full name"));
    assert_eq!(find("email").hints.aria.as_deref(), Some("Email address"));
    assert_eq!(find("email").hints.placeholder.as_deref(), Some("you@example.com"));
    assert_eq!(find("phone").hints.neighbor_text.as_deref(), Some("Phone number"));
    assert_eq!(find("birthday").hints.title.as_deref(), Some("Date of birth"));
    assert_eq!(find("bio").hints.label.as_deref(), Some("About you"));
    assert_eq!(find("newsletter").hints.label.as_deref(), Some("Subscribe to newsletter"));
    assert_eq!(find("notes").hints.aria.as_deref(), Some("Notes"));
}

#[test]
fn primary_hint_prefers_label_then_aria() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates[0].hints.primary(), Some("Full name"));
    assert_eq!(candidates[1].hints.primary(), Some("Email address"));
}

#[test]
fn aria_labelledby_joins_referenced_text() {
    let mut doc = page_with(json!([
        { "tag": "span", "attrs": { "id": "l1" }, "children": [{ "text": "Billing" }] },
        { "tag": "span", "attrs": { "id": "l2" }, "children": [{ "text": "ZIP" }] },
        { "tag": "input", "attrs": { "name": "zip", "aria-labelledby": "l1 l2" } }
    ]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates[0].hints.aria.as_deref(), Some("Billing ZIP"));
}

#[test]
fn required_markers_are_not_neighbor_text() {
    let mut doc = page_with(json!([{
        "tag": "div",
        "children": [
            { "tag": "div", "children": [
                { "tag": "input", "attrs": { "name": "code" } },
                { "text": " (required) " }
            ]}
        ]
    }]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates[0].hints.neighbor_text, None);
}

#[test]
fn ancestor_sibling_text_is_used_within_depth() {
    let mut doc = page_with(json!([{
        "tag": "div",
        "children": [
            { "tag": "p", "children": [{ "text": "Company" }] },
            { "tag": "div", "children": [{ "tag": "input", "attrs": { "name": "company" } }] }
        ]
    }]));
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    assert_eq!(candidates[0].hints.neighbor_text.as_deref(), Some("Company"));
}

#[test]
fn constraints_reflect_validation_attributes() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let name = &candidates[0].constraints;
    assert_eq!(name.required, Some(true));
    assert_eq!(name.maxlength, Some(80));

    let phone = &candidates[2].constraints;
    assert_eq!(phone.pattern.as_deref(), Some("[0-9 +-]+"));
    assert_eq!(phone.required, None);

    assert_eq!(candidates[4].constraints.minlength, Some(10));
}

#[test]
fn only_enumerable_roles_carry_options() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    for candidate in &candidates {
        assert_eq!(candidate.options.is_some(), candidate.role.is_enumerable());
    }
    let select = candidates.iter().find(|c| c.role == FieldRole::Select).unwrap();
    let options = select.options.as_ref().unwrap();
    assert_eq!(options.len(), 4);
    assert_eq!(options[1].text, "China");
    assert_eq!(options[1].value_attr.as_deref(), Some("cn"));
}

// ============================================================================
// 6. Shadow trees
// ============================================================================

#[test]
fn shadow_scope_is_scanned_separately_and_flagged() {
    let mut doc = load_page("shadow_form.json");
    let mut registry = ElementRegistry::new();

    let light = scan(&mut doc, &mut registry);
    assert_eq!(light.len(), 1);
    assert_eq!(light[0].ui_flags, None);

    let host = doc
        .tree_elements(TreeRoot::Document)
        .into_iter()
        .find(|id| doc.tag(*id) == Some("checkout-address"))
        .unwrap();
    let shadow = detect(&mut doc, Scope::ShadowRoot(host), DetectOptions::default(), &mut registry);

    assert_eq!(shadow.len(), 2);
    assert_eq!(shadow[0].hints.label.as_deref(), Some("Street"));
    assert_eq!(
        shadow[0].ui_flags,
        Some(vec![FieldUiFlag::ShadowDom, FieldUiFlag::ReactControlled])
    );
    assert_eq!(shadow[1].ui_flags, Some(vec![FieldUiFlag::ShadowDom]));
}

#[test]
fn candidate_wire_format_is_camel_case() {
    let mut doc = load_page("contact_form.json");
    let mut registry = ElementRegistry::new();
    let candidates = scan(&mut doc, &mut registry);

    let value = serde_json::to_value(&candidates[0]).unwrap();
    assert!(value["elKey"].as_str().unwrap().starts_with("el-"));
    assert_eq!(value["role"], "text");
    assert_eq!(value["hints"]["nameOrId"], "fullName");
    assert!(value.get("options").is_none());
}
