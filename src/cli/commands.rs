use std::path::Path;

use tracing::info;

use crate::cli::config::AppConfig;
use crate::dom::dom_model::Document;
use crate::fill::fill_model::AppliedFillState;
use crate::plan::{parser::parse_plan, plan_model::FillPlan};
use crate::session::{
    error::AutofillError,
    page::PageContext,
    session::{AutofillSession, build_model, load_profile},
};
use crate::trace::{
    logger::TraceLogger,
    trace::{TraceEvent, TraceOperation},
};

// ============================================================================
// scan subcommand
// ============================================================================

pub fn cmd_scan(
    page: &str,
    skip_prefilled: bool,
    output: Option<&str>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_page(page)?;
    let mut context = PageContext::new(doc);
    let candidates =
        context.collect_field_candidates(skip_prefilled || config.fill.skip_prefilled_fields);

    info!(page, candidates = candidates.len(), "scan complete");
    write_or_print(output, &serde_json::to_string_pretty(&candidates)?)?;
    Ok(())
}

// ============================================================================
// plan subcommand
// ============================================================================

pub fn cmd_plan(
    page: &str,
    profile: Option<&str>,
    skip_prefilled: bool,
    output: Option<&str>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = build_session(page, profile, skip_prefilled, config)?;
    session.scan();
    let outcome = session.request_plan()?;

    if outcome.repaired {
        eprintln!("Model output needed one repair round-trip");
    }
    write_or_print(output, &serde_json::to_string_pretty(&outcome.fill_plan)?)?;
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

pub fn cmd_fill(
    page: &str,
    plan_path: Option<&str>,
    profile: Option<&str>,
    output: &str,
    log_path: &str,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // A ready-made plan needs neither a model backend nor a profile
    let (mut session, plan_file) = match plan_path {
        Some(path) => {
            let plan = load_plan_file(path)?;
            let session = AutofillSession::without_model(load_page(page)?, config.fill.clone())
                .with_tracer(TraceLogger::from_path(config.trace.path.as_deref()));
            (session, Some(plan))
        }
        None => (build_session(page, profile, false, config)?, None),
    };
    session.scan();

    let plan: FillPlan = match plan_file {
        Some(plan) => plan,
        None => session.request_plan()?.fill_plan,
    };

    let applied = session.apply(&plan)?;
    let doc = session.into_page().into_document();

    std::fs::write(output, serde_json::to_string_pretty(&doc.to_snapshot())?)?;
    std::fs::write(log_path, serde_json::to_string_pretty(&applied)?)?;

    println!(
        "Applied {} of {} plan entries; snapshot written to {}, change log to {}",
        applied.len(),
        plan.len(),
        output,
        log_path
    );
    Ok(())
}

// ============================================================================
// rollback subcommand
// ============================================================================

pub fn cmd_rollback(
    page: &str,
    log_path: &str,
    output: &str,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_page(page)?;
    let states: Vec<AppliedFillState> = serde_json::from_str(&std::fs::read_to_string(log_path)?)?;

    let mut context = PageContext::new(doc);
    // Rebuild the registry from the keys stamped during fill
    context.collect_field_candidates(false);
    context.restore_last_application(states);
    let restored = context.rollback_fill_plan();

    let tracer = TraceLogger::from_path(config.trace.path.as_deref());
    tracer.log(&TraceEvent::now(TraceOperation::Rollback).with_restored(restored));

    std::fs::write(
        output,
        serde_json::to_string_pretty(&context.into_document().to_snapshot())?,
    )?;
    println!("Restored {} controls; snapshot written to {}", restored, output);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

pub fn load_page(path: &str) -> Result<Document, AutofillError> {
    let content = std::fs::read_to_string(path)?;
    Ok(Document::from_json(&content)?)
}

/// Read a plan written by `plan` or by hand. It goes through the same
/// validation as model output, so a fence or a bad entry is tolerated.
pub fn load_plan_file(path: &str) -> Result<FillPlan, AutofillError> {
    let content = std::fs::read_to_string(path)?;
    parse_plan(&content).ok_or_else(|| AutofillError::PlanFile {
        path: path.to_string(),
    })
}

/// Wire up a session: backend and profile are checked before the page
/// is even loaded, so configuration problems surface first.
fn build_session(
    page: &str,
    profile: Option<&str>,
    skip_prefilled: bool,
    config: &AppConfig,
) -> Result<AutofillSession, AutofillError> {
    let model = build_model(&config.model)?;
    let profile = load_profile(profile.unwrap_or(&config.fill.active_profile))?;
    let doc = load_page(page)?;

    let mut fill = config.fill.clone();
    fill.skip_prefilled_fields |= skip_prefilled;

    Ok(AutofillSession::new(doc, model, fill)
        .with_profile(profile)
        .with_tracer(TraceLogger::from_path(config.trace.path.as_deref())))
}

fn write_or_print(output: Option<&str>, content: &str) -> std::io::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}
