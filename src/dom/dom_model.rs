use std::collections::BTreeMap;

use crate::dom::{
    error::DomError,
    snapshot::{PageSnapshot, SnapshotElement, SnapshotNode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub rendered: bool,
    pub shadow_host: bool,

    // ---- Control state ----
    pub value: String,
    pub checked: bool,
    pub selected: bool,

    /// Last value a reactive framework observed. `None` when no framework
    /// watches this control.
    pub tracker: Option<String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Lowercased `type` attribute of an input, "text" when absent.
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_checkable(&self) -> bool {
        self.tag == "input" && matches!(self.input_type().as_str(), "checkbox" | "radio")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
    Change,
    Blur,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub target: NodeId,
    pub kind: EventKind,
}

/// A change a reactive framework picked up from a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkUpdate {
    pub target: NodeId,
    pub value: String,
}

/// The tree a node belongs to: the main document or a shadow tree hosted
/// by an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeRoot {
    Document,
    Shadow(NodeId),
}

/// In-memory page model: an arena of nodes plus the event journal.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: Option<String>,
    pub title: String,
    nodes: Vec<Node>,
    root: NodeId,
    events: Vec<DomEvent>,
    framework_updates: Vec<FrameworkUpdate>,
}

impl Document {
    // =====================================================================
    // Loading / export
    // =====================================================================

    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut doc = Document {
            url: snapshot.url.clone(),
            title: snapshot.title.clone(),
            nodes: vec![],
            root: NodeId(0),
            events: vec![],
            framework_updates: vec![],
        };
        doc.root = doc.load_node(&snapshot.root, None);
        doc.settle_controls();
        doc
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let snapshot: PageSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn to_snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            url: self.url.clone(),
            title: self.title.clone(),
            root: self.export_node(self.root),
        }
    }

    fn load_node(&mut self, node: &SnapshotNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());

        let el = match node {
            SnapshotNode::Text { text } => {
                self.nodes.push(Node {
                    parent,
                    children: vec![],
                    data: NodeData::Text(text.clone()),
                });
                return id;
            }
            SnapshotNode::Element(el) => el,
        };

        let attrs: BTreeMap<String, String> = el
            .attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        let checked = el.checked.unwrap_or_else(|| attrs.contains_key("checked"));
        let selected = el.selected.unwrap_or_else(|| attrs.contains_key("selected"));

        self.nodes.push(Node {
            parent,
            children: vec![],
            data: NodeData::Element(Element {
                tag: el.tag.to_ascii_lowercase(),
                attrs,
                rendered: el.rendered,
                shadow_host: el.shadow_root,
                value: String::new(),
                checked,
                selected,
                // Synced once the whole tree is loaded
                tracker: el.framework_controlled.then(String::new),
            }),
        });

        let children: Vec<NodeId> = el
            .children
            .iter()
            .map(|child| self.load_node(child, Some(id)))
            .collect();
        self.nodes[id.0].children = children;

        let value = match &el.value {
            Some(v) => v.clone(),
            None => self.default_value(id),
        };
        if let NodeData::Element(e) = &mut self.nodes[id.0].data {
            e.value = value;
        }

        id
    }

    fn default_value(&self, id: NodeId) -> String {
        match self.element(id) {
            Some(el) if el.tag == "input" => match el.attr("value") {
                Some(value) => value.to_string(),
                None if el.is_checkable() => "on".to_string(),
                None => String::new(),
            },
            Some(el) if el.tag == "textarea" => self.text_content(id),
            _ => String::new(),
        }
    }

    /// Apply the browser's load-time defaults: a single-select always has
    /// one selected option, and framework trackers start in sync.
    fn settle_controls(&mut self) {
        let selects: Vec<NodeId> = self
            .all_elements()
            .into_iter()
            .filter(|id| self.tag(*id) == Some("select") && self.attr(*id, "multiple").is_none())
            .collect();

        for select in selects {
            let options = self.options(select);
            let selected: Vec<NodeId> = options
                .iter()
                .copied()
                .filter(|o| self.element(*o).is_some_and(|e| e.selected))
                .collect();

            let keep = match selected.last() {
                Some(last) => Some(*last),
                None => options.first().copied(),
            };
            for option in options {
                if let Some(NodeData::Element(e)) = self.nodes.get_mut(option.0).map(|n| &mut n.data) {
                    e.selected = Some(option) == keep;
                }
            }
        }

        let controlled: Vec<NodeId> = self
            .all_elements()
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(|e| e.tracker.is_some()))
            .collect();
        for id in controlled {
            let value = self.tracked_value(id);
            if let Ok(el) = self.element_mut(id) {
                el.tracker = Some(value);
            }
        }
    }

    fn export_node(&self, id: NodeId) -> SnapshotNode {
        let node = &self.nodes[id.0];
        match &node.data {
            NodeData::Text(text) => SnapshotNode::Text { text: text.clone() },
            NodeData::Element(el) => {
                let mut out = SnapshotElement::new(&el.tag);
                out.attrs = el.attrs.clone();
                out.children = node.children.iter().map(|c| self.export_node(*c)).collect();
                out.rendered = el.rendered;
                out.shadow_root = el.shadow_host;
                out.framework_controlled = el.tracker.is_some();
                if matches!(el.tag.as_str(), "input" | "textarea") {
                    out.value = Some(el.value.clone());
                }
                if el.is_checkable() {
                    out.checked = Some(el.checked);
                }
                if el.tag == "option" {
                    out.selected = Some(el.selected);
                }
                SnapshotNode::Element(out)
            }
        }
    }

    // =====================================================================
    // Tree access
    // =====================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Ok(el),
            Some(NodeData::Text(_)) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?
            .attrs
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?.attrs.remove(&name.to_ascii_lowercase());
        Ok(())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Parent element within the same tree. A shadow tree's top-level
    /// nodes have no parent element; their host lives in the outer tree.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(id.0)?.parent?;
        if self.element(parent)?.shadow_host {
            return None;
        }
        Some(parent)
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(id.0)?.parent?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|s| *s == id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|s| self.element(*s).is_some())
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes.get(current.0).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Detach a node (and its subtree) from the document.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id.0).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes[id.0].parent = None;
    }

    pub fn tree_root(&self, id: NodeId) -> TreeRoot {
        let mut current = self.nodes.get(id.0).and_then(|n| n.parent);
        while let Some(ancestor) = current {
            if self.element(ancestor).is_some_and(|e| e.shadow_host) {
                return TreeRoot::Shadow(ancestor);
            }
            current = self.nodes[ancestor.0].parent;
        }
        TreeRoot::Document
    }

    /// Elements of one tree in document order. Shadow hosts are included,
    /// their shadow contents are not.
    pub fn tree_elements(&self, root: TreeRoot) -> Vec<NodeId> {
        let mut out = Vec::new();
        match root {
            TreeRoot::Document => {
                if self.element(self.root).is_some() {
                    out.push(self.root);
                }
                self.collect_light_descendants(self.root, &mut out);
            }
            TreeRoot::Shadow(host) => {
                for child in self.children(host) {
                    if self.element(*child).is_some() {
                        out.push(*child);
                        self.collect_light_descendants(*child, &mut out);
                    }
                }
            }
        }
        out
    }

    /// Element descendants of `id` within its own tree, in document order.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_light_descendants(id, &mut out);
        out
    }

    fn collect_light_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.element(id).is_some_and(|e| e.shadow_host) {
            return;
        }
        for child in self.children(id) {
            if self.element(*child).is_some() {
                out.push(*child);
                self.collect_light_descendants(*child, out);
            }
        }
    }

    fn all_elements(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.element(*id).is_some())
            .collect()
    }

    pub fn get_element_by_id(&self, root: TreeRoot, id_value: &str) -> Option<NodeId> {
        if id_value.is_empty() {
            return None;
        }
        self.tree_elements(root)
            .into_iter()
            .find(|id| self.attr(*id, "id") == Some(id_value))
    }

    /// Shorthand for `getElementById` on the main document.
    pub fn by_id(&self, id_value: &str) -> Option<NodeId> {
        self.get_element_by_id(TreeRoot::Document, id_value)
    }

    /// Closest inclusive ancestor with the given tag, within the same tree.
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.tag(node) == Some(tag) {
                return Some(node);
            }
            current = self.parent_element(node);
        }
        None
    }

    pub fn form_owner(&self, id: NodeId) -> Option<NodeId> {
        if let Some(form_ref) = self.attr(id, "form") {
            return self
                .get_element_by_id(self.tree_root(id), form_ref)
                .filter(|f| self.tag(*f) == Some("form"));
        }
        self.closest(id, "form")
    }

    // =====================================================================
    // Text and rendering
    // =====================================================================

    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.nodes.get(id.0) else {
            return String::new();
        };
        match &node.data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element(el) if el.shadow_host => String::new(),
            NodeData::Element(_) => node
                .children
                .iter()
                .map(|c| self.text_content(*c))
                .collect(),
        }
    }

    /// Rendered text with whitespace collapsed.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_rendered_text(id, &mut raw);
        collapse_whitespace(&raw)
    }

    fn collect_rendered_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(el) => {
                if !el.rendered || el.has_attr("hidden") || el.shadow_host {
                    return;
                }
                for child in &node.children {
                    out.push(' ');
                    self.collect_rendered_text(*child, out);
                }
            }
        }
    }

    /// Whether the element has a layout box: it and every ancestor
    /// (across shadow boundaries) is rendered.
    pub fn is_rendered(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(el) = self.element(node) {
                if !el.rendered || el.has_attr("hidden") {
                    return false;
                }
            }
            current = self.nodes.get(node.0).and_then(|n| n.parent);
        }
        true
    }

    pub fn is_content_editable(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            match self.attr(node, "contenteditable").map(|v| v.trim().to_ascii_lowercase()) {
                Some(v) if v.is_empty() || v == "true" || v == "plaintext-only" => return true,
                Some(v) if v == "false" => return false,
                _ => {}
            }
            current = self.parent_element(node);
        }
        false
    }

    // =====================================================================
    // Control state
    // =====================================================================

    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendant_elements(select)
            .into_iter()
            .filter(|id| self.tag(*id) == Some("option"))
            .collect()
    }

    pub fn option_text(&self, option: NodeId) -> String {
        collapse_whitespace(&self.text_content(option))
    }

    pub fn option_label(&self, option: NodeId) -> String {
        match self.attr(option, "label") {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self.option_text(option),
        }
    }

    pub fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(value) => value.to_string(),
            None => self.option_text(option),
        }
    }

    pub fn selected_index(&self, select: NodeId) -> Option<usize> {
        self.options(select)
            .iter()
            .position(|o| self.element(*o).is_some_and(|e| e.selected))
    }

    /// Positions of every selected option; more than one only for
    /// `<select multiple>`.
    pub fn selected_indices(&self, select: NodeId) -> Vec<usize> {
        self.options(select)
            .iter()
            .enumerate()
            .filter(|(_, o)| self.element(**o).is_some_and(|e| e.selected))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn select_value(&self, select: NodeId) -> Option<String> {
        let options = self.options(select);
        let index = self.selected_index(select)?;
        Some(self.option_value(options[index]))
    }

    /// What a script reading `.value` (or the text of a non-control)
    /// would see.
    pub fn control_value(&self, id: NodeId) -> String {
        match self.element(id) {
            Some(el) if matches!(el.tag.as_str(), "input" | "textarea") => el.value.clone(),
            Some(el) if el.tag == "select" => self.select_value(id).unwrap_or_default(),
            Some(_) => self.text_content(id),
            None => String::new(),
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| e.checked)
    }

    fn tracked_value(&self, id: NodeId) -> String {
        match self.element(id) {
            Some(el) if el.is_checkable() => el.checked.to_string(),
            _ => self.control_value(id),
        }
    }

    /// Inputs of the same type sharing this input's name and form owner,
    /// in document order. An unnamed input is its own group.
    pub fn named_group(&self, id: NodeId) -> Vec<NodeId> {
        let Some(el) = self.element(id) else {
            return vec![];
        };
        let name = el.attr("name").unwrap_or_default();
        if name.is_empty() || el.tag != "input" {
            return vec![id];
        }
        let input_type = el.input_type();
        let owner = self.form_owner(id);

        let mut members: Vec<NodeId> = self
            .tree_elements(self.tree_root(id))
            .into_iter()
            .filter(|other| {
                self.element(*other).is_some_and(|o| {
                    o.tag == "input" && o.input_type() == input_type && o.attr("name") == Some(name)
                }) && self.form_owner(*other) == owner
            })
            .collect();
        if !members.contains(&id) {
            members.push(id);
        }
        members
    }

    // =====================================================================
    // Mutation
    // =====================================================================

    /// Plain property assignment. A reactive framework intercepts this
    /// path and records the value as already seen, so the following
    /// input event carries no change for it.
    pub fn assign_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.native_set_value(id, value)?;
        let tracked = self.tracked_value(id);
        let el = self.element_mut(id)?;
        if el.tracker.is_some() {
            el.tracker = Some(tracked);
        }
        Ok(())
    }

    /// Write through the prototype's value setter, leaving any framework
    /// tracker untouched.
    pub fn native_set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let tag = self.element(id).map(|e| e.tag.clone()).ok_or_else(|| self.missing(id))?;
        match tag.as_str() {
            "input" => {
                let el = self.element_mut(id)?;
                if el.input_type() == "file" && !value.is_empty() {
                    return Err(DomError::InvalidState {
                        node: id,
                        reason: "a file input may only be set to the empty string".into(),
                    });
                }
                el.value = value.to_string();
                Ok(())
            }
            "textarea" => {
                self.element_mut(id)?.value = value.to_string();
                Ok(())
            }
            "select" => {
                let index = self
                    .options(id)
                    .iter()
                    .position(|o| self.option_value(*o) == value);
                self.native_set_selected_index(id, index)
            }
            _ => Err(DomError::Unsupported {
                tag,
                operation: "value assignment",
            }),
        }
    }

    pub fn native_set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), DomError> {
        let el = self.element(id).ok_or_else(|| self.missing(id))?;
        if !el.is_checkable() {
            return Err(DomError::Unsupported {
                tag: el.tag.clone(),
                operation: "checked assignment",
            });
        }

        if checked && el.input_type() == "radio" {
            for other in self.named_group(id) {
                if other != id {
                    self.element_mut(other)?.checked = false;
                }
            }
        }
        self.element_mut(id)?.checked = checked;
        Ok(())
    }

    /// Select the option at `index`; `None` or an out-of-range index
    /// leaves nothing selected.
    pub fn native_set_selected_index(
        &mut self,
        select: NodeId,
        index: Option<usize>,
    ) -> Result<(), DomError> {
        self.native_set_selected_indices(select, index.as_slice())
    }

    /// Select exactly the options at `indices`, deselecting the rest.
    /// Out-of-range positions are ignored.
    pub fn native_set_selected_indices(
        &mut self,
        select: NodeId,
        indices: &[usize],
    ) -> Result<(), DomError> {
        let el = self.element(select).ok_or_else(|| self.missing(select))?;
        if el.tag != "select" {
            return Err(DomError::Unsupported {
                tag: el.tag.clone(),
                operation: "option selection",
            });
        }
        for (i, option) in self.options(select).into_iter().enumerate() {
            self.element_mut(option)?.selected = indices.contains(&i);
        }
        Ok(())
    }

    /// Replace an element's children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let el = self.element(id).ok_or_else(|| self.missing(id))?;
        if matches!(el.tag.as_str(), "input" | "textarea" | "select") {
            return Err(DomError::Unsupported {
                tag: el.tag.clone(),
                operation: "text replacement",
            });
        }

        let old = std::mem::take(&mut self.nodes[id.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let text_id = NodeId(self.nodes.len());
            self.nodes.push(Node {
                parent: Some(id),
                children: vec![],
                data: NodeData::Text(text.to_string()),
            });
            self.nodes[id.0].children.push(text_id);
        }
        Ok(())
    }

    fn missing(&self, id: NodeId) -> DomError {
        if self.nodes.get(id.0).is_some() {
            DomError::NotAnElement(id)
        } else {
            DomError::UnknownNode(id)
        }
    }

    // =====================================================================
    // Events
    // =====================================================================

    pub fn dispatch(&mut self, id: NodeId, kind: EventKind) -> Result<(), DomError> {
        if self.nodes.get(id.0).is_none() {
            return Err(DomError::UnknownNode(id));
        }
        self.events.push(DomEvent { target: id, kind });

        if matches!(kind, EventKind::Input | EventKind::Change) {
            let current = self.tracked_value(id);
            let observed = match self.element_mut(id) {
                Ok(el) if el.tracker.as_ref().is_some_and(|seen| *seen != current) => {
                    el.tracker = Some(current.clone());
                    true
                }
                _ => false,
            };
            if observed {
                self.framework_updates.push(FrameworkUpdate {
                    target: id,
                    value: current,
                });
            }
        }
        Ok(())
    }

    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn events_for(&self, id: NodeId) -> Vec<EventKind> {
        self.events
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.kind)
            .collect()
    }

    pub fn framework_updates(&self) -> &[FrameworkUpdate] {
        &self.framework_updates
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
