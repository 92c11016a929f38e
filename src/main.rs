use clap::Parser;
use form_autofill::cli::commands::{cmd_fill, cmd_plan, cmd_rollback, cmd_scan};
use form_autofill::cli::config::{API_KEY_ENV, Cli, Commands, load_config, resolve_config};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("form_autofill={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Resolve settings: CLI > config > env > defaults
    let config = resolve_config(
        load_config(cli.config.as_deref()),
        &cli,
        std::env::var(API_KEY_ENV).ok(),
    );

    match &cli.command {
        Commands::Scan {
            page,
            skip_prefilled,
            output,
        } => cmd_scan(page, *skip_prefilled, output.as_deref(), &config)?,
        Commands::Plan {
            page,
            profile,
            skip_prefilled,
            output,
        } => cmd_plan(
            page,
            profile.as_deref(),
            *skip_prefilled,
            output.as_deref(),
            &config,
        )?,
        Commands::Fill {
            page,
            plan,
            profile,
            output,
            log,
        } => cmd_fill(page, plan.as_deref(), profile.as_deref(), output, log, &config)?,
        Commands::Rollback { page, log, output } => cmd_rollback(page, log, output, &config)?,
    }

    Ok(())
}
