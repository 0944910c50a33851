//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::{
        env::EnvManager,
        nodes::{load_nodes, NodeSource},
    },
    error::Result,
    models::Config,
};

/// A validated configuration plus what happened while building it
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub node_source: NodeSource,
    pub env_file_loaded: bool,
    /// Non-fatal findings, logged once the logger is up
    pub warnings: Vec<String>,
}

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Defaults, then `.env`, then process environment, then CLI flags; then validate
    pub fn parse(&self) -> Result<LoadedConfig> {
        let mut config = Config::default();

        let env_file_loaded = EnvManager::load_env_file()?;
        let mut warnings = EnvManager::validate_current_env();
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        let (nodes, node_source) = load_nodes(&config.ip_file_path)?;
        config.nodes = nodes;
        if node_source == NodeSource::BuiltinDefault {
            warnings.push(format!(
                "File '{}' not found. Using default node list.",
                config.ip_file_path.display()
            ));
        }

        config.validate()?;
        warnings.extend(config.warnings());

        Ok(LoadedConfig {
            config,
            node_source,
            env_file_loaded,
            warnings,
        })
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(mode) = cli.mode {
            config.mode = mode;
        }
        if let Some(path) = &cli.ip_file_path {
            config.ip_file_path = path.clone();
        }
        if let Some(dir) = &cli.output_dir {
            config.output_root = dir.clone();
        }
        if let Some(retries) = cli.retries {
            config.retry_attempts = retries;
        }
        if let Some(workers) = cli.workers {
            config.max_workers = Some(workers);
        }
        if let Some(secs) = cli.settle_secs {
            config.settle_delay_secs = secs;
        }

        config.enable_color = cli.use_colors();
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<LoadedConfig> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Mode: {}", config.mode));
    summary.push(format!("Node list: {}", config.ip_file_path.display()));
    summary.push(format!("Nodes: {}", config.nodes.len()));
    summary.push(format!("Interfaces: {}", config.interfaces.join(", ")));
    summary.push(format!("Ports: {}-{}", config.min_port, config.max_port));
    summary.push(format!(
        "SSH: {}@*:{}{}",
        config.username,
        config.ssh_port,
        if config.password.is_some() { " (password)" } else { "" }
    ));
    summary.push(format!("Retries: {}", config.retry_attempts));
    summary.push(format!("Settle delay: {}s", config.settle_delay_secs));
    summary.push(format!(
        "Dispatch workers: {}",
        config
            .max_workers
            .map(|w| w.to_string())
            .unwrap_or_else(|| "auto".to_string())
    ));

    summary.join("\n")
}
