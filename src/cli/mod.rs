//! CLI module for the Mayanetra command-line interface.
//!
//! Running without a subcommand (or with `serve`) starts the server. Other subcommands:
//! - `predict <TEXT>` - Classify a piece of text offline with the local artifacts
//! - `config check` - Validate configuration file and model artifacts

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::validation::prediction_text;
use crate::classifier::{locate_artifacts, Detector, Verdict};
use crate::config::{Config, ServeMode};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "mayanetra")]
#[command(author, version, about = "AI-generated vs human-written text detector", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "mayanetra.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Override the serving mode from the configuration file
    #[arg(long, value_enum)]
    pub mode: Option<ServeMode>,

    /// Secret used to sign session cookies
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Skip startup self-checks (for development only)
    #[arg(long)]
    pub skip_checks: bool,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Classify text with the local model artifacts
    Predict {
        /// Text to classify
        text: String,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

impl Cli {
    /// Whether this invocation should start the server
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }

    /// Load the configuration file and apply command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(&self.config)?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.server.mode = mode;
        }
        if let Some(secret) = self.secret_key.as_deref().filter(|s| !s.is_empty()) {
            config.auth.secret_key = secret.to_string();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Predict { text, json }) => cmd_predict(cli, text, *json),
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli).await,
        Some(Commands::Serve) | None => {
            // Serving is handled in main.rs
            Ok(())
        }
    }
}

/// One-line human readable verdict
pub fn format_verdict(verdict: &Verdict) -> String {
    match verdict.ai_probability {
        Some(p) => format!("{} (AI probability: {:.4})", verdict.label, p),
        None => verdict.label.to_string(),
    }
}

/// Classify a single text and print the verdict
fn cmd_predict(cli: &Cli, text: &str, json: bool) -> Result<()> {
    let config = cli.load_config()?;

    let Some(text) = prediction_text(text) else {
        anyhow::bail!("Please enter some text.");
    };

    let detector = Detector::load(&config.model).context("Failed to load model artifacts")?;
    let verdict = detector.predict(text);

    if json {
        println!("{}", serde_json::to_string(&verdict)?);
    } else {
        println!("{}", format_verdict(&verdict));
    }

    Ok(())
}

/// Validate configuration file
async fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
    }

    let config = match cli.load_config() {
        Ok(config) => {
            println!("[OK] Configuration is valid!");
            config
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    };

    println!();
    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Host:         {}", config.server.host);
    println!("  Port:         {}", config.server.port);
    println!("  Mode:         {}", config.server.mode);
    if config.server.mode == ServeMode::Accounts {
        println!("  Database:     {}", config.server.database_path().display());
    }
    println!();
    println!("Model:");
    let search: Vec<String> = config
        .model
        .search_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    println!("  Search Paths: {}", search.join(", "));
    println!("  Vectorizer:   {}", config.model.vectorizer_file);
    println!("  Classifier:   {}", config.model.classifier_file);
    println!(
        "  AI Class:     {}",
        config
            .model
            .ai_class
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    println!();

    let mut warnings = Vec::new();

    match locate_artifacts(
        &config.model.search_paths,
        &config.model.vectorizer_file,
        &config.model.classifier_file,
    ) {
        Ok((vectorizer, classifier)) => {
            println!("Artifacts:");
            println!("  Vectorizer:   {}", vectorizer.display());
            println!("  Classifier:   {}", classifier.display());
            match Detector::load(&config.model) {
                Ok(detector) => println!(
                    "  [OK] Loaded (AI class {}, probabilities: {})",
                    detector.ai_class(),
                    detector.has_probability()
                ),
                Err(e) => warnings.push(format!("Model artifacts failed to load: {}", e)),
            }
            println!();
        }
        Err(e) => warnings.push(e.to_string()),
    }

    if config.auth.uses_insecure_secret() {
        warnings.push(
            "No secret key set - session cookies are signed with the development fallback"
                .to_string(),
        );
    }

    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("  [!] {}", warning);
        }
        println!();
    }

    Ok(())
}
