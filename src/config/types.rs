use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeboxConfig {
    pub sandbox: SandboxConfig,
}

/// The isolation strategy used for a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    /// Interception proxy in front of a per-instance shadow namespace
    Proxy,
    /// Snapshot the global namespace on activation, diff and restore on deactivation
    Snapshot,
    /// Use the proxy when interception is available, else the snapshot
    #[default]
    Auto,
}

impl SandboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::Snapshot => "snapshot",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for SandboxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Which sandbox kind to create when none is requested
    pub default_kind: SandboxKind,
    /// Development diagnostics: restore logs, straggling-write warnings,
    /// and the development escape keys
    pub development: bool,
    /// Treat `mockTop`/`mockSafariTop` like `top` (test harnesses only)
    pub test_allowances: bool,
    /// Whether the host supports fine-grained interception
    pub interception_available: bool,
    /// Keys mirrored to the global namespace in addition to the baseline
    pub extra_escape_keys: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            default_kind: SandboxKind::default(),
            development: false,
            test_allowances: false,
            interception_available: true,
            extra_escape_keys: Vec::new(),
        }
    }
}
