use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::detect::{
    detector::{DetectOptions, Scope, detect},
    field_model::FieldCandidate,
    registry::ElementRegistry,
};
use crate::dom::dom_model::Document;
use crate::fill::{
    applier::apply_fill_plan,
    fill_model::{AppliedFillState, LastApplication},
    rollback::rollback_fill_plan,
};
use crate::plan::{parser::normalize_entries, plan_model::FillPlan};

/// Commands understood by the page-bound context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ContentCommand {
    CollectFieldCandidates {
        #[serde(default)]
        skip_prefilled: bool,
    },
    ApplyFillPlan {
        #[serde(deserialize_with = "lenient_plan")]
        plan: FillPlan,
    },
    RollbackFillPlan,
}

/// Plan entries sent to the page go through the same per-entry
/// normalization as model output; one bad entry never sinks the message.
fn lenient_plan<'de, D>(deserializer: D) -> Result<FillPlan, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(normalize_entries(&entries))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<FieldCandidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<Vec<AppliedFillState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContentResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// The live document together with the identity registry and the
/// last-application slot.
pub struct PageContext {
    doc: Document,
    registry: ElementRegistry,
    last: LastApplication,
}

impl PageContext {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            registry: ElementRegistry::new(),
            last: LastApplication::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn collect_field_candidates(&mut self, skip_prefilled: bool) -> Vec<FieldCandidate> {
        self.collect_in_scope(Scope::Document, skip_prefilled)
    }

    pub fn collect_in_scope(&mut self, scope: Scope, skip_prefilled: bool) -> Vec<FieldCandidate> {
        detect(
            &mut self.doc,
            scope,
            DetectOptions { skip_prefilled },
            &mut self.registry,
        )
    }

    /// Apply a plan; the resulting log replaces any earlier one.
    pub fn apply_fill_plan(&mut self, plan: &FillPlan) -> Vec<AppliedFillState> {
        let applied = apply_fill_plan(&mut self.doc, &self.registry, plan);
        if let Some(discarded) = self.last.replace(applied.clone()) {
            if !discarded.is_empty() {
                debug!(discarded = discarded.len(), "previous application is no longer reversible");
            }
        }
        applied
    }

    /// Undo the last application and clear the slot.
    pub fn rollback_fill_plan(&mut self) -> usize {
        let states = self.last.take();
        rollback_fill_plan(&mut self.doc, &self.registry, &states)
    }

    pub fn last_application(&self) -> &[AppliedFillState] {
        self.last.peek()
    }

    /// Reload a saved application log, e.g. one written by an earlier run.
    pub fn restore_last_application(&mut self, states: Vec<AppliedFillState>) {
        self.last.replace(states);
    }

    pub fn handle(&mut self, command: ContentCommand) -> ContentResponse {
        match command {
            ContentCommand::CollectFieldCandidates { skip_prefilled } => ContentResponse {
                ok: true,
                candidates: Some(self.collect_field_candidates(skip_prefilled)),
                ..ContentResponse::default()
            },
            ContentCommand::ApplyFillPlan { plan } => ContentResponse {
                ok: true,
                applied: Some(self.apply_fill_plan(&plan)),
                ..ContentResponse::default()
            },
            ContentCommand::RollbackFillPlan => ContentResponse {
                ok: true,
                restored: Some(self.rollback_fill_plan()),
                ..ContentResponse::default()
            },
        }
    }

    /// Handle a raw JSON message. Anything that is not a known command
    /// gets an `ok: false` reply instead of an error.
    pub fn handle_json(&mut self, message: &str) -> ContentResponse {
        match serde_json::from_str::<ContentCommand>(message) {
            Ok(command) => self.handle(command),
            Err(e) => {
                warn!(error = %e, "unknown page command");
                ContentResponse::failure("Unknown message")
            }
        }
    }
}
