use serde::Serialize;

use crate::config::types::SandboxKind;
use crate::namespace::{NamespaceOps, PropertyKey};

/// Summary of a sandbox instance
#[derive(Debug, Clone, Serialize)]
pub struct SandboxInfo {
    /// Module name
    pub name: String,
    /// Sandbox kind identifier
    pub kind: SandboxKind,
    /// Whether the sandbox is currently active
    pub running: bool,
    /// Keys the module has diverged from the global namespace
    pub modified_keys: Vec<String>,
}

/// Contract between a sandbox and the orchestrator that mounts modules.
///
/// One sandbox is constructed per loaded module. The orchestrator calls
/// [`Sandbox::activate`] before running module code and
/// [`Sandbox::deactivate`] after unmount or suspension, possibly many times
/// across remounts.
pub trait Sandbox {
    /// Returns the module name this sandbox belongs to
    fn name(&self) -> &str;

    /// Returns the sandbox kind (never `Auto`)
    fn kind(&self) -> SandboxKind;

    /// The namespace view handed to module code
    fn proxy(&self) -> &dyn NamespaceOps;

    fn activate(&mut self);

    fn deactivate(&mut self);

    fn is_running(&self) -> bool;

    /// Keys recorded as diverged by this sandbox
    fn modified_keys(&self) -> Vec<PropertyKey>;

    /// Get information about the sandbox instance
    fn info(&self) -> SandboxInfo {
        SandboxInfo {
            name: self.name().to_string(),
            kind: self.kind(),
            running: self.is_running(),
            modified_keys: self.modified_keys().iter().map(ToString::to_string).collect(),
        }
    }
}
