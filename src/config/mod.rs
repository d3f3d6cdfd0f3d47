use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::classifier::ClassLabel;

/// Development-only signing secret used when neither the config file nor
/// `SECRET_KEY` provide one.
pub const INSECURE_SECRET_KEY: &str = "mayanetra-dev-secret-change-me";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which route table a process serves.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    /// Stateless form page, no accounts and no database
    Demo,
    /// Accounts, sessions and per-user prediction history
    Accounts,
}

impl std::fmt::Display for ServeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeMode::Demo => write!(f, "demo"),
            ServeMode::Accounts => write!(f, "accounts"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default = "default_mode")]
    pub mode: ServeMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            database_file: default_database_file(),
            mode: default_mode(),
        }
    }
}

impl ServerConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./instance")
}

fn default_database_file() -> String {
    "mayanetra.db".to_string()
}

fn default_mode() -> ServeMode {
    ServeMode::Accounts
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Lifetime of a login session in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

impl AuthConfig {
    pub fn uses_insecure_secret(&self) -> bool {
        self.secret_key == INSECURE_SECRET_KEY
    }
}

fn default_secret_key() -> String {
    INSECURE_SECRET_KEY.to_string()
}

/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Directories searched in order for the two artifact files
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,
    #[serde(default = "default_vectorizer_file")]
    pub vectorizer_file: String,
    #[serde(default = "default_classifier_file")]
    pub classifier_file: String,
    /// Classifier class that means "AI-generated". When unset, a string class
    /// starting with "ai" (any case) or the integer class `1` is used.
    #[serde(default)]
    pub ai_class: Option<ClassLabel>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            vectorizer_file: default_vectorizer_file(),
            classifier_file: default_classifier_file(),
            ai_class: None,
        }
    }
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("."), PathBuf::from("models")]
}

fn default_vectorizer_file() -> String {
    "tfidf_vectorizer.json".to_string()
}

fn default_classifier_file() -> String {
    "logistic_regression_model.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let ttl = self.auth.session_ttl_days;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl) {
            anyhow::bail!(
                "auth.session_ttl_days must be between 1 and {}, got {}",
                MAX_SESSION_TTL_DAYS,
                ttl
            );
        }
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            model: ModelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.mode, ServeMode::Accounts);
        assert_eq!(
            config.server.database_path(),
            PathBuf::from("./instance/mayanetra.db")
        );
        assert_eq!(
            config.model.search_paths,
            vec![PathBuf::from("."), PathBuf::from("models")]
        );
        assert!(config.auth.uses_insecure_secret());
        assert!(config.model.ai_class.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [server]
            port = 8000
            mode = "demo"

            [model]
            ai_class = "generated"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.mode, ServeMode::Demo);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.model.ai_class,
            Some(ClassLabel::Text("generated".to_string()))
        );
        assert_eq!(config.auth.session_ttl_days, 7);
    }

    #[test]
    fn test_integer_ai_class() {
        let config = Config::parse("[model]\nai_class = 0\n").unwrap();
        assert_eq!(config.model.ai_class, Some(ClassLabel::Int(0)));
    }

    #[test]
    fn test_session_ttl_bounds() {
        let config = Config::parse("[auth]\nsession_ttl_days = 3650\n").unwrap();
        assert_eq!(config.auth.session_ttl_days, MAX_SESSION_TTL_DAYS);

        for ttl in ["0", "-1", "3651", "9223372036854775807"] {
            let content = format!("[auth]\nsession_ttl_days = {}\n", ttl);
            let err = Config::parse(&content).unwrap_err();
            assert!(err.to_string().contains("session_ttl_days"), "{}", ttl);
        }
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        assert!(Config::parse("[server]\nmode = \"cluster\"\n").is_err());
    }
}
