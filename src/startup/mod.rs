//! Startup self-checks module
//!
//! This module performs system verification before the server starts accepting requests.
//! Checks include:
//! - Model artifacts loaded
//! - Database connectivity and schema (accounts mode)
//! - Data directory is writable (accounts mode)
//! - Session secret is not the development fallback

use serde::Serialize;
use tracing::{error, info, warn};

use crate::classifier::Detector;
use crate::config::{Config, ServeMode};
use crate::DbPool;

/// Result of a single startup check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Whether this check is critical (failure should abort startup)
    pub critical: bool,
    /// Human-readable message describing the result
    pub message: String,
    /// Additional details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            critical: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            passed: false,
            critical,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Aggregated startup check results
#[derive(Debug, Clone, Serialize)]
pub struct StartupCheckReport {
    /// All check results
    pub checks: Vec<CheckResult>,
    /// Whether all critical checks passed
    pub all_critical_passed: bool,
    /// Whether all checks passed (including non-critical)
    pub all_passed: bool,
    /// Summary message
    pub summary: String,
}

impl StartupCheckReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let all_critical_passed = checks.iter().filter(|c| c.critical).all(|c| c.passed);
        let all_passed = checks.iter().all(|c| c.passed);

        let failed_critical = checks
            .iter()
            .filter(|c| c.critical && !c.passed)
            .count();
        let failed_non_critical = checks
            .iter()
            .filter(|c| !c.critical && !c.passed)
            .count();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();

        let summary = if all_passed {
            format!("All {} startup checks passed", total)
        } else if all_critical_passed {
            format!(
                "{}/{} checks passed ({} non-critical warnings)",
                passed, total, failed_non_critical
            )
        } else {
            format!(
                "{}/{} checks passed ({} critical failures)",
                passed, total, failed_critical
            )
        };

        Self {
            checks,
            all_critical_passed,
            all_passed,
            summary,
        }
    }
}

/// Run all startup self-checks
pub async fn run_startup_checks(
    config: &Config,
    detector: Option<&Detector>,
    db: Option<&DbPool>,
) -> StartupCheckReport {
    info!("Running startup self-checks...");

    let mut checks = Vec::new();

    // 1. Model artifacts
    checks.push(check_model(detector));

    if config.server.mode == ServeMode::Accounts {
        // 2. Database connectivity and schema
        match db {
            Some(db) => {
                checks.push(check_database_connectivity(db).await);
                checks.push(check_database_schema(db).await);
            }
            None => checks.push(
                CheckResult::fail("database_connectivity", "No database configured", true)
                    .with_details("Accounts mode requires the history database"),
            ),
        }

        // 3. Directory writability check
        checks.push(check_directory_writability(config));
    }

    // 4. Session secret
    checks.push(check_session_secret(config));

    let report = StartupCheckReport::new(checks);

    // Log results
    for check in &report.checks {
        if check.passed {
            info!(
                check = %check.name,
                message = %check.message,
                "Startup check PASSED"
            );
        } else if check.critical {
            error!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (CRITICAL)"
            );
        } else {
            warn!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (non-critical)"
            );
        }
    }

    info!(
        summary = %report.summary,
        all_passed = report.all_passed,
        all_critical_passed = report.all_critical_passed,
        "Startup checks completed"
    );

    report
}

fn check_model(detector: Option<&Detector>) -> CheckResult {
    match detector {
        Some(detector) => CheckResult::pass("model_artifacts", "Model artifacts loaded")
            .with_details(format!(
                "AI class: {}; probabilities: {}",
                detector.ai_class(),
                detector.has_probability()
            )),
        // Non-critical: the pages still render, /predict answers 500
        None => CheckResult::fail("model_artifacts", "Model artifacts not loaded", false)
            .with_details("Prediction requests will fail until the artifacts are installed"),
    }
}

/// Check database connectivity
async fn check_database_connectivity(db: &DbPool) -> CheckResult {
    match sqlx::query("SELECT 1").fetch_one(db).await {
        Ok(_) => CheckResult::pass(
            "database_connectivity",
            "Database connection successful",
        ),
        Err(e) => CheckResult::fail(
            "database_connectivity",
            "Failed to connect to database",
            true,
        )
        .with_details(e.to_string()),
    }
}

/// Check that the account and history tables exist
async fn check_database_schema(db: &DbPool) -> CheckResult {
    let result: Result<Vec<(String,)>, _> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'"
    )
    .fetch_all(db)
    .await;

    match result {
        Ok(tables) => {
            let table_names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

            let essential_tables = ["users", "predictions"];
            let missing: Vec<&str> = essential_tables
                .iter()
                .filter(|t| !table_names.contains(*t))
                .copied()
                .collect();

            if missing.is_empty() {
                CheckResult::pass(
                    "database_schema",
                    format!("Database schema valid ({} tables)", tables.len()),
                )
                .with_details(format!("Tables: {}", table_names.join(", ")))
            } else {
                CheckResult::fail(
                    "database_schema",
                    "Missing essential database tables",
                    true,
                )
                .with_details(format!("Missing: {}", missing.join(", ")))
            }
        }
        Err(e) => CheckResult::fail(
            "database_schema",
            "Failed to query database schema",
            true,
        )
        .with_details(e.to_string()),
    }
}

/// Check that the data directory is writable
fn check_directory_writability(config: &Config) -> CheckResult {
    let data_dir = &config.server.data_dir;

    let test_file = data_dir.join(".mayanetra_write_test");

    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = std::fs::remove_file(&test_file);
            CheckResult::pass(
                "directory_writability",
                "Data directory is writable",
            )
            .with_details(format!("Path: {}", data_dir.display()))
        }
        Err(e) => CheckResult::fail(
            "directory_writability",
            "Data directory is not writable",
            true,
        )
        .with_details(format!("{}: {}", data_dir.display(), e)),
    }
}

fn check_session_secret(config: &Config) -> CheckResult {
    if config.auth.uses_insecure_secret() {
        CheckResult::fail(
            "session_secret",
            "Using the built-in development secret key",
            false,
        )
        .with_details("Set SECRET_KEY so session cookies cannot be forged")
    } else {
        CheckResult::pass("session_secret", "Session secret configured")
    }
}
