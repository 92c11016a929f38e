use std::fs;
use std::path::Path;

use clap::Parser;
use form_autofill::cli::commands::{cmd_fill, cmd_rollback, cmd_scan, load_page, load_plan_file};
use form_autofill::cli::config::{AppConfig, Cli, Commands, load_config, resolve_config};
use form_autofill::detect::field_model::FieldCandidate;
use form_autofill::fill::fill_model::AppliedFillState;
use form_autofill::session::page::PageContext;
use serde_json::json;

use crate::common::utils::{by_name, fixture_path, key_of};

mod common;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_scan_minimal() {
    let cli = Cli::parse_from(["form-autofill", "scan", "--page", "page.json"]);
    match cli.command {
        Commands::Scan {
            page,
            skip_prefilled,
            output,
        } => {
            assert_eq!(page, "page.json");
            assert!(!skip_prefilled);
            assert!(output.is_none());
        }
        _ => panic!("Expected Scan command"),
    }
}

#[test]
fn cli_parse_plan_all_args() {
    let cli = Cli::parse_from([
        "form-autofill",
        "plan",
        "--page",
        "page.json",
        "--profile",
        "me.json",
        "--skip-prefilled",
        "-o",
        "plan.json",
    ]);
    match cli.command {
        Commands::Plan {
            page,
            profile,
            skip_prefilled,
            output,
        } => {
            assert_eq!(page, "page.json");
            assert_eq!(profile.as_deref(), Some("me.json"));
            assert!(skip_prefilled);
            assert_eq!(output.as_deref(), Some("plan.json"));
        }
        _ => panic!("Expected Plan command"),
    }
}

#[test]
fn cli_parse_fill_defaults_log_path() {
    let cli = Cli::parse_from(["form-autofill", "fill", "--page", "p.json", "-o", "filled.json"]);
    match cli.command {
        Commands::Fill {
            plan, output, log, ..
        } => {
            assert!(plan.is_none());
            assert_eq!(output, "filled.json");
            assert_eq!(log, "applied.json");
        }
        _ => panic!("Expected Fill command"),
    }
}

#[test]
fn cli_parse_rollback_requires_output() {
    assert!(Cli::try_parse_from(["form-autofill", "rollback", "--page", "p.json"]).is_err());

    let cli = Cli::parse_from([
        "form-autofill",
        "rollback",
        "--page",
        "p.json",
        "--log",
        "changes.json",
        "--output",
        "restored.json",
    ]);
    assert!(matches!(cli.command, Commands::Rollback { ref log, .. } if log == "changes.json"));
}

#[test]
fn cli_parse_global_flags() {
    let cli = Cli::parse_from([
        "form-autofill",
        "scan",
        "--page",
        "p.json",
        "-vv",
        "--provider",
        "ollama",
        "--model",
        "qwen2.5:7b",
        "--endpoint",
        "http://gpu-box:11434/api/generate",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.provider.as_deref(), Some("ollama"));
    assert_eq!(cli.model.as_deref(), Some("qwen2.5:7b"));
    assert_eq!(cli.endpoint.as_deref(), Some("http://gpu-box:11434/api/generate"));
    assert!(cli.api_key.is_none());
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("/nonexistent/form-autofill.yaml"));
    assert_eq!(config, AppConfig::default());
}

#[test]
fn config_default_values() {
    let config = AppConfig::default();
    assert_eq!(config.model.provider, "gemini");
    assert_eq!(config.model.temperature, 0.2);
    assert_eq!(config.model.top_p, 0.9);
    assert_eq!(config.fill.active_profile, "profile.default.json");
    assert_eq!(config.fill.min_confidence, 0.6);
    assert_eq!(config.fill.max_summary_chars, 500);
    assert_eq!(config.fill.phone_format, "+86-000-0000-0000");
    assert!(config.fill.enable_site_memory);
    assert!(!config.fill.skip_prefilled_fields);
    assert!(config.trace.path.is_none());
}

#[test]
fn config_partial_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form-autofill.yaml");
    fs::write(
        &path,
        "model:\n  provider: ollama\n  topP: 0.5\nfill:\n  minConfidence: 0.8\n  skipPrefilledFields: true\ntrace:\n  path: trace.jsonl\n",
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.model.provider, "ollama");
    assert_eq!(config.model.top_p, 0.5);
    assert_eq!(config.model.temperature, 0.2);
    assert_eq!(config.fill.min_confidence, 0.8);
    assert!(config.fill.skip_prefilled_fields);
    assert_eq!(config.fill.max_summary_chars, 500);
    assert_eq!(config.trace.path.as_deref(), Some("trace.jsonl"));
}

#[test]
fn config_malformed_yaml_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "model: [unclosed").unwrap();
    assert_eq!(load_config(path.to_str()), AppConfig::default());
}

#[test]
fn config_yaml_roundtrip() {
    let config = AppConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(yaml.contains("activeProfile"));
    let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn resolve_config_priority() {
    let mut file_config = AppConfig::default();
    file_config.model.api_key = Some("from-file".into());
    file_config.model.model = Some("gemini-1.5-pro".into());

    // Env only fills in when nothing else set a key
    let cli = Cli::parse_from(["form-autofill", "scan", "--page", "p.json"]);
    let config = resolve_config(file_config.clone(), &cli, Some("from-env".into()));
    assert_eq!(config.model.api_key.as_deref(), Some("from-file"));
    assert_eq!(config.model.model.as_deref(), Some("gemini-1.5-pro"));

    let config = resolve_config(AppConfig::default(), &cli, Some("from-env".into()));
    assert_eq!(config.model.api_key.as_deref(), Some("from-env"));

    let config = resolve_config(AppConfig::default(), &cli, Some("  ".into()));
    assert!(config.model.api_key.is_none());

    let cli = Cli::parse_from([
        "form-autofill",
        "scan",
        "--page",
        "p.json",
        "--api-key",
        "from-cli",
        "--provider",
        "mock",
        "--model",
        "override",
    ]);
    let config = resolve_config(file_config, &cli, Some("from-env".into()));
    assert_eq!(config.model.api_key.as_deref(), Some("from-cli"));
    assert_eq!(config.model.provider, "mock");
    assert_eq!(config.model.model.as_deref(), Some("override"));
}

// ============================================================================
// Command Tests
// ============================================================================

fn mock_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.model.provider = "mock".into();
    config
}

/// Scan the fixture once and save the keyed snapshot, as a browser
/// extension would leave the page after collecting candidates.
fn keyed_snapshot(dir: &Path) -> (String, Vec<FieldCandidate>) {
    let mut page = PageContext::new(load_page(fixture_path("contact_form.json").to_str().unwrap()).unwrap());
    let candidates = page.collect_field_candidates(false);
    let path = dir.join("page.json");
    fs::write(&path, serde_json::to_string(&page.into_document().to_snapshot()).unwrap()).unwrap();
    (path.to_str().unwrap().to_string(), candidates)
}

fn path_in(dir: &Path, name: &str) -> String {
    dir.join(name).to_str().unwrap().to_string()
}

#[test]
fn scan_command_writes_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let output = path_in(dir.path(), "out/candidates.json");
    let page = fixture_path("contact_form.json");

    cmd_scan(page.to_str().unwrap(), false, Some(&output), &AppConfig::default()).unwrap();

    let candidates: Vec<FieldCandidate> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(candidates.len(), 10);
    assert!(candidates.iter().all(|c| c.el_key.starts_with("el-")));
}

#[test]
fn fill_then_rollback_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let (page, candidates) = keyed_snapshot(dir.path());

    let plan = json!([
        { "elKey": key_of(&candidates, "fullName"), "targetKey": "fullName", "value": "Ada Lovelace", "confidence": 0.95 },
        { "elKey": key_of(&candidates, "newsletter"), "targetKey": "newsletter", "value": "yes", "confidence": 0.7 },
        { "elKey": key_of(&candidates, "gender"), "targetKey": "gender", "value": "Female", "confidence": 0.9 }
    ]);
    let plan_path = path_in(dir.path(), "plan.json");
    fs::write(&plan_path, plan.to_string()).unwrap();

    let profile = fixture_path("profile.json");
    let filled = path_in(dir.path(), "filled.json");
    let log = path_in(dir.path(), "applied.json");
    cmd_fill(&page, Some(&plan_path), profile.to_str(), &filled, &log, &mock_config()).unwrap();

    let doc = load_page(&filled).unwrap();
    assert_eq!(doc.control_value(by_name(&doc, "fullName")), "Ada Lovelace");
    assert!(doc.checked(by_name(&doc, "newsletter")));

    let states: Vec<AppliedFillState> = serde_json::from_str(&fs::read_to_string(&log).unwrap()).unwrap();
    assert_eq!(states.len(), 3);

    let restored = path_in(dir.path(), "restored.json");
    cmd_rollback(&filled, &log, &restored, &mock_config()).unwrap();

    let doc = load_page(&restored).unwrap();
    assert_eq!(doc.control_value(by_name(&doc, "fullName")), "");
    assert!(!doc.checked(by_name(&doc, "newsletter")));
    assert!(!doc.checked(by_name(&doc, "gender")));
}

#[test]
fn fill_from_plan_file_needs_no_model_or_profile() {
    let dir = tempfile::tempdir().unwrap();
    let (page, candidates) = keyed_snapshot(dir.path());

    // Fenced, with one entry lacking elKey and an out-of-range confidence
    let plan = json!([
        { "elKey": key_of(&candidates, "email"), "targetKey": "email", "value": "ada@example.com", "confidence": 3 },
        { "targetKey": "fullName", "value": "Ada Lovelace", "confidence": 0.9 }
    ]);
    let plan_path = path_in(dir.path(), "plan.json");
    fs::write(&plan_path, format!("```json\n{plan:#}\n```\n")).unwrap();

    let filled = path_in(dir.path(), "filled.json");
    let log = path_in(dir.path(), "applied.json");
    cmd_fill(&page, Some(&plan_path), None, &filled, &log, &AppConfig::default()).unwrap();

    let doc = load_page(&filled).unwrap();
    assert_eq!(doc.control_value(by_name(&doc, "email")), "ada@example.com");
    assert_eq!(doc.control_value(by_name(&doc, "fullName")), "");

    let plan = load_plan_file(&plan_path).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].confidence, 1.0);
}

#[test]
fn fill_rejects_a_plan_file_that_is_not_an_array() {
    let dir = tempfile::tempdir().unwrap();
    let (page, _) = keyed_snapshot(dir.path());
    let plan_path = path_in(dir.path(), "plan.json");
    fs::write(&plan_path, r#"{"elKey":"el-1"}"#).unwrap();

    let filled = path_in(dir.path(), "filled.json");
    let err = cmd_fill(
        &page,
        Some(&plan_path),
        None,
        &filled,
        &path_in(dir.path(), "applied.json"),
        &AppConfig::default(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("plan.json"));
    assert!(!Path::new(&filled).exists());
}

#[test]
fn fill_without_credentials_fails_before_touching_the_page() {
    let dir = tempfile::tempdir().unwrap();
    let filled = path_in(dir.path(), "filled.json");
    let page = fixture_path("contact_form.json");

    let err = cmd_fill(
        page.to_str().unwrap(),
        None,
        None,
        &filled,
        &path_in(dir.path(), "applied.json"),
        &AppConfig::default(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("GEMINI_API_KEY"));
    assert!(!Path::new(&filled).exists());
}

#[test]
fn fill_with_empty_model_plan_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let page = fixture_path("contact_form.json");
    let profile = fixture_path("profile.json");
    let filled = path_in(dir.path(), "filled.json");

    let err = cmd_fill(
        page.to_str().unwrap(),
        None,
        profile.to_str(),
        &filled,
        &path_in(dir.path(), "applied.json"),
        &mock_config(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("no entries"));
    assert!(!Path::new(&filled).exists());
}

#[test]
fn load_page_reports_missing_file() {
    assert!(load_page("/nonexistent/page.json").is_err());
}
