use thiserror::Error;

use crate::config::types::SandboxKind;

/// Errors raised by the outer surfaces: configuration, scenarios and sandbox
/// construction. Mediated namespace operations never fail.
#[derive(Error, Debug)]
pub enum ScopeboxError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    // Sandbox errors
    #[error("Sandbox kind '{kind}' is not available: {reason}")]
    SandboxUnavailable { kind: SandboxKind, reason: String },

    #[error("Sandbox not found: {name}")]
    SandboxNotFound { name: String },

    #[error("Sandbox name already exists: {name}")]
    SandboxExists { name: String },

    // Scenario errors
    #[error("Invalid scenario: {0}")]
    Scenario(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScopeboxError>;
