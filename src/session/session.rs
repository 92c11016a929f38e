use std::path::Path;

use tracing::{debug, info};

use crate::cli::config::{FillConfig, ModelConfig};
use crate::detect::field_model::FieldCandidate;
use crate::dom::dom_model::Document;
use crate::fill::fill_model::AppliedFillState;
use crate::model::ai_model::{
    GEMINI_DEFAULT_ENDPOINT, GEMINI_DEFAULT_MODEL, GeminiBackend, MockPlanModel, OllamaBackend,
    PlanModel,
};
use crate::plan::{
    parser::request_fill_plan,
    plan_model::{FillPlan, PlanOutcome, PlanRequest, ProfileData},
    prompt::compose_instructions,
};
use crate::session::{
    error::AutofillError,
    page::PageContext,
    site_memory::{SiteMemoryStore, host_from_url},
};
use crate::trace::{
    logger::TraceLogger,
    trace::{TraceEvent, TraceOperation},
};

/// Build the configured model backend. Fails fast when the provider
/// needs credentials that are not configured.
pub fn build_model(config: &ModelConfig) -> Result<Box<dyn PlanModel>, AutofillError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AutofillError::MissingCredentials {
                    provider: config.provider.clone(),
                })?;
            let mut backend = GeminiBackend::new(api_key);
            backend.endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| GEMINI_DEFAULT_ENDPOINT.to_string());
            backend.model = config
                .model
                .clone()
                .unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string());
            backend.temperature = config.temperature;
            backend.top_p = config.top_p;
            Ok(Box::new(backend))
        }
        "ollama" => {
            let mut backend = OllamaBackend::default();
            if let Some(endpoint) = &config.endpoint {
                backend.endpoint = endpoint.clone();
            }
            if let Some(model) = &config.model {
                backend.model = model.clone();
            }
            Ok(Box::new(backend))
        }
        // Offline runs: always plans nothing
        "mock" => Ok(Box::new(MockPlanModel::with_responses([Ok("[]".to_string())]))),
        other => Err(AutofillError::UnknownProvider(other.to_string())),
    }
}

pub fn load_profile(path: &str) -> Result<ProfileData, AutofillError> {
    if path.trim().is_empty() {
        return Err(AutofillError::MissingProfile);
    }
    let load_err = |reason: String| AutofillError::ProfileLoad {
        path: path.to_string(),
        reason,
    };
    let content = std::fs::read_to_string(Path::new(path)).map_err(|e| load_err(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))
}

/// Drives scan, plan, apply and rollback for one page. Every step takes
/// `&mut self`, so a session never runs two operations at once.
pub struct AutofillSession {
    config: FillConfig,
    page: PageContext,
    model: Option<Box<dyn PlanModel>>,
    profile: Option<ProfileData>,
    site_memory: SiteMemoryStore,
    tracer: TraceLogger,
    candidates: Vec<FieldCandidate>,
    host: Option<String>,
}

impl AutofillSession {
    pub fn new(doc: Document, model: Box<dyn PlanModel>, config: FillConfig) -> Self {
        Self::build(doc, Some(model), config)
    }

    /// A session that only applies ready-made plans; `request_plan`
    /// fails with [`AutofillError::NoModel`].
    pub fn without_model(doc: Document, config: FillConfig) -> Self {
        Self::build(doc, None, config)
    }

    fn build(doc: Document, model: Option<Box<dyn PlanModel>>, config: FillConfig) -> Self {
        let host = doc.url.as_deref().and_then(host_from_url);
        Self {
            config,
            page: PageContext::new(doc),
            model,
            profile: None,
            site_memory: SiteMemoryStore::new(),
            tracer: TraceLogger::disabled(),
            candidates: vec![],
            host,
        }
    }

    pub fn with_profile(mut self, profile: ProfileData) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_site_memory(mut self, store: SiteMemoryStore) -> Self {
        self.site_memory = store;
        self
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut PageContext {
        &mut self.page
    }

    pub fn into_page(self) -> PageContext {
        self.page
    }

    pub fn candidates(&self) -> &[FieldCandidate] {
        &self.candidates
    }

    pub fn site_memory(&self) -> &SiteMemoryStore {
        &self.site_memory
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn scan(&mut self) -> &[FieldCandidate] {
        self.candidates = self
            .page
            .collect_field_candidates(self.config.skip_prefilled_fields);

        info!(candidates = self.candidates.len(), "page scanned");
        self.tracer.log(
            &TraceEvent::now(TraceOperation::Scan)
                .with_host(self.host())
                .with_candidates(self.candidates.len()),
        );
        &self.candidates
    }

    /// Ask the model for a plan covering the last scan.
    pub fn request_plan(&mut self) -> Result<PlanOutcome, AutofillError> {
        let result = self.request_plan_inner();

        let mut event = TraceEvent::now(TraceOperation::Plan)
            .with_host(self.host())
            .with_candidates(self.candidates.len());
        event = match &result {
            Ok(outcome) => event
                .with_plan_entries(outcome.fill_plan.len())
                .with_repaired(outcome.repaired),
            Err(e) => event.with_error(e),
        };
        self.tracer.log(&event);

        result
    }

    fn request_plan_inner(&self) -> Result<PlanOutcome, AutofillError> {
        if self.candidates.is_empty() {
            return Err(AutofillError::EmptyCandidates);
        }
        let model = self.model.as_deref().ok_or(AutofillError::NoModel)?;
        let profile = self.profile.clone().ok_or(AutofillError::MissingProfile)?;

        let site_memory = match (&self.host, self.config.enable_site_memory) {
            (Some(host), true) => self.site_memory.get(host).cloned(),
            _ => None,
        };
        debug!(has_site_memory = site_memory.is_some(), "composing plan request");

        let request = PlanRequest {
            instructions: compose_instructions(
                &self.config.instruction_options(),
                self.host(),
                site_memory.is_some(),
            ),
            profile,
            field_candidates: self.candidates.clone(),
            site_memory,
        };

        let outcome = request_fill_plan(model, &request)?;
        info!(
            entries = outcome.fill_plan.len(),
            repaired = outcome.repaired,
            "fill plan received"
        );
        Ok(outcome)
    }

    /// Apply a plan and remember its confident mappings for this site.
    pub fn apply(&mut self, plan: &FillPlan) -> Result<Vec<AppliedFillState>, AutofillError> {
        if plan.is_empty() {
            self.tracer.log(
                &TraceEvent::now(TraceOperation::Apply)
                    .with_host(self.host())
                    .with_error(AutofillError::EmptyPlan),
            );
            return Err(AutofillError::EmptyPlan);
        }

        let applied = self.page.apply_fill_plan(plan);

        if self.config.enable_site_memory {
            if let Some(host) = &self.host {
                // Only entries that actually changed a control are confirmed
                let confirmed: FillPlan = plan
                    .iter()
                    .filter(|entry| applied.iter().any(|state| state.el_key == entry.el_key))
                    .cloned()
                    .collect();
                self.site_memory.remember(
                    host,
                    &self.candidates,
                    &confirmed,
                    self.config.min_confidence,
                );
            }
        }

        self.tracer.log(
            &TraceEvent::now(TraceOperation::Apply)
                .with_host(self.host())
                .with_plan_entries(plan.len())
                .with_applied(applied.len()),
        );
        Ok(applied)
    }

    /// Undo the most recent application. Returns the number of restored
    /// controls; zero when there was nothing to undo.
    pub fn rollback(&mut self) -> usize {
        let restored = self.page.rollback_fill_plan();
        self.tracer.log(
            &TraceEvent::now(TraceOperation::Rollback)
                .with_host(self.host())
                .with_restored(restored),
        );
        restored
    }
}
