//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use jenkinsfly_config::ConfigError;
use jenkinsfly_core::{InputRejected, ValidationErrors};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

/// One rejected field, shown under the main validation error.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(jenkinsfly::field), help("setting: {field}"))]
pub struct FieldDiagnostic {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Validation ───────────────────────────────────────────────────
    #[error("Settings rejected: {summary}")]
    #[diagnostic(
        code(jenkinsfly::validation),
        help("Nothing was saved. Fix the settings below and try again.")
    )]
    Validation {
        summary: String,
        #[related]
        fields: Vec<FieldDiagnostic>,
    },

    #[error("Invalid value for {key}: {reason}")]
    #[diagnostic(code(jenkinsfly::invalid_input))]
    InvalidInput { key: String, reason: String },

    // ── Connection test ──────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(jenkinsfly::auth_failed),
        help(
            "Check the username, password/API token, and crumb.\n\
             Run: jenkinsfly config set-password --project {project}"
        )
    )]
    AuthFailed { message: String, project: String },

    #[error("Could not connect to {url}: {message}")]
    #[diagnostic(
        code(jenkinsfly::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k) or --ca-cert."
        )
    )]
    ConnectionFailed { url: String, message: String },

    // ── Projects & favorites ─────────────────────────────────────────
    #[error("Project '{name}' not found in settings")]
    #[diagnostic(
        code(jenkinsfly::project_not_found),
        help(
            "Available projects: {available}\n\
             Create one with: jenkinsfly --project {name} config init"
        )
    )]
    ProjectNotFound { name: String, available: String },

    #[error("Job '{name}' is not a favorite")]
    #[diagnostic(
        code(jenkinsfly::favorite_not_found),
        help("Run: jenkinsfly favorites list")
    )]
    FavoriteNotFound { name: String },

    #[error("Job '{name}' is already a favorite")]
    #[diagnostic(code(jenkinsfly::favorite_exists))]
    FavoriteExists { name: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {reason}")]
    #[diagnostic(
        code(jenkinsfly::prompt),
        help("Use `config set` or `config set-password --password-stdin` when not on a terminal.")
    )]
    Prompt { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(jenkinsfly::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::InvalidInput { .. } => exit_code::USAGE,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::ProjectNotFound { .. } | Self::FavoriteNotFound { .. } => exit_code::NOT_FOUND,
            Self::FavoriteExists { .. } => exit_code::CONFLICT,
            _ => exit_code::GENERAL,
        }
    }

    pub fn invalid_input(key: &str, err: &InputRejected) -> Self {
        Self::InvalidInput {
            key: key.to_owned(),
            reason: err.to_string(),
        }
    }
}

impl From<ValidationErrors> for CliError {
    fn from(errors: ValidationErrors) -> Self {
        let summary = errors.to_string();
        let fields = errors
            .into_errors()
            .into_iter()
            .map(|e| FieldDiagnostic {
                field: e.field.to_string(),
                message: e.message,
            })
            .collect();
        Self::Validation { summary, fields }
    }
}
