use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::plan::prompt::InstructionOptions;

pub const DEFAULT_CONFIG_PATH: &str = "form-autofill.yaml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Detect form fields, plan a fill with a language model, apply and roll it back"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Model provider: gemini, ollama or mock
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// API key for the model provider
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model API endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect fillable fields in a page snapshot
    Scan {
        /// Page snapshot JSON file
        #[arg(long)]
        page: String,

        /// Leave out controls that already hold a value
        #[arg(long)]
        skip_prefilled: bool,

        /// Write candidates here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Scan a page and ask the model for a fill plan
    Plan {
        #[arg(long)]
        page: String,

        /// Profile JSON file (default: fill.activeProfile)
        #[arg(long)]
        profile: Option<String>,

        #[arg(long)]
        skip_prefilled: bool,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Apply a fill plan to a page snapshot
    Fill {
        #[arg(long)]
        page: String,

        /// Existing plan JSON; when absent a plan is requested from the model
        #[arg(long)]
        plan: Option<String>,

        #[arg(long)]
        profile: Option<String>,

        /// Where to write the filled snapshot
        #[arg(short, long)]
        output: String,

        /// Where to write the applied change log
        #[arg(long, default_value = "applied.json")]
        log: String,
    },

    /// Undo a recorded fill on a previously filled snapshot
    Rollback {
        /// Snapshot written by `fill`
        #[arg(long)]
        page: String,

        /// Change log written by `fill`
        #[arg(long, default_value = "applied.json")]
        log: String,

        #[arg(short, long)]
        output: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-autofill.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub fill: FillConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model: None,
            endpoint: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillConfig {
    #[serde(default = "default_profile")]
    pub active_profile: String,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,

    #[serde(default = "default_phone_format")]
    pub phone_format: String,

    #[serde(default = "default_true")]
    pub enable_site_memory: bool,

    #[serde(default)]
    pub skip_prefilled_fields: bool,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            active_profile: default_profile(),
            min_confidence: default_min_confidence(),
            max_summary_chars: default_max_summary_chars(),
            phone_format: default_phone_format(),
            enable_site_memory: true,
            skip_prefilled_fields: false,
        }
    }
}

impl FillConfig {
    pub fn instruction_options(&self) -> InstructionOptions {
        InstructionOptions {
            min_confidence: self.min_confidence,
            max_summary_chars: self.max_summary_chars,
            phone_format: self.phone_format.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// JSONL trace file; tracing is off when unset.
    pub path: Option<String>,
}

// Serde default helpers
fn default_provider() -> String { "gemini".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_top_p() -> f32 { 0.9 }
fn default_profile() -> String { "profile.default.json".to_string() }
fn default_min_confidence() -> f64 { 0.6 }
fn default_max_summary_chars() -> usize { 500 }
fn default_phone_format() -> String { "+86-000-0000-0000".to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Resolution (merge CLI args with config file)
// ============================================================================

/// Apply CLI overrides and the API key environment fallback.
/// Priority: CLI flag > config file > env > defaults.
pub fn resolve_config(mut config: AppConfig, cli: &Cli, env_api_key: Option<String>) -> AppConfig {
    if let Some(provider) = &cli.provider {
        config.model.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.model.model = Some(model.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.model.endpoint = Some(endpoint.clone());
    }

    let file_key = config.model.api_key.take().filter(|k| !k.trim().is_empty());
    config.model.api_key = cli
        .api_key
        .clone()
        .or(file_key)
        .or(env_api_key.filter(|k| !k.trim().is_empty()));

    config
}
