//! Mesh Bandwidth Tester - Main CLI Application
//!
//! Loads the configuration, starts the log listener, runs the benchmark (or
//! prints the batch plan with `--dry-run`) and drains the log queue on exit.

use clap::Parser;
use mesh_bandwidth_tester::{
    app::{App, RunPlan},
    cli::Cli,
    config::{display_config_summary, load_config},
    error::Result,
    logging::{LogConfig, LogListener},
    output::SummaryFormatter,
    PKG_NAME, VERSION,
};
use std::io::IsTerminal;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}", e.format_for_console(use_color));
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic; returns the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    let dry_run = cli.dry_run;
    let loaded = load_config(cli)?;
    let config = loaded.config;
    let formatter = SummaryFormatter::new(config.enable_color);

    if dry_run {
        for warning in &loaded.warnings {
            eprintln!("Warning: {}", warning);
        }
        print!("{}", formatter.format_plan(&RunPlan::from_config(&config)));
        return Ok(0);
    }

    let (listener, logger) = LogListener::start(LogConfig::from_config(&config))?;

    logger
        .info(&format!("{} v{} starting", PKG_NAME, VERSION))
        .field("session", logger.session_id())
        .log()
        .await;
    if loaded.env_file_loaded {
        logger.debug("Loaded configuration from .env file").log().await;
    }
    for warning in &loaded.warnings {
        logger.warn(warning).log().await;
    }
    logger
        .info(&format!(
            "IP addresses loaded from '{}': {:?}",
            config.ip_file_path.display(),
            config.nodes
        ))
        .log()
        .await;
    if config.debug {
        for line in display_config_summary(&config).lines() {
            logger.debug(line).log().await;
        }
    }

    let show_progress = std::io::stderr().is_terminal();
    let app = App::new(config, &logger).with_progress(show_progress);
    let outcome = app.run().await;

    let code = match &outcome {
        Ok(summary) => {
            print!("{}", formatter.format_run(summary));
            summary.exit_code()
        }
        Err(e) => {
            logger.critical(&format!("Critical error: {}", e)).error_info(e).log().await;
            e.exit_code()
        }
    };

    drop(app);
    drop(logger);
    listener.shutdown().await?;

    outcome.map(|_| code)
}
