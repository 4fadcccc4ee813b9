use serde::Serialize;
use tracing::debug;

use crate::config::types::SandboxKind;
use crate::error::{Result, ScopeboxError};
use crate::sandbox::env::SandboxEnv;
use crate::sandbox::proxy::ProxySandbox;
use crate::sandbox::snapshot::SnapshotSandbox;
use crate::sandbox::traits::Sandbox;

/// Create a sandbox for module `name`.
///
/// `Auto` picks the proxy sandbox when the host supports interception and
/// falls back to the snapshot sandbox otherwise.
pub fn create_sandbox(
    kind: SandboxKind,
    name: &str,
    env: &SandboxEnv,
) -> Result<Box<dyn Sandbox>> {
    let kind = resolve_sandbox_kind(kind, env)?;
    debug!(sandbox = %name, kind = %kind, "Creating sandbox");

    match kind {
        SandboxKind::Proxy => Ok(Box::new(ProxySandbox::new(name, env))),
        SandboxKind::Snapshot => Ok(Box::new(SnapshotSandbox::new(name, env))),
        SandboxKind::Auto => {
            // Already resolved by resolve_sandbox_kind
            unreachable!()
        }
    }
}

/// Resolve the sandbox kind, handling Auto selection.
pub fn resolve_sandbox_kind(requested: SandboxKind, env: &SandboxEnv) -> Result<SandboxKind> {
    let interception = env.options().interception_available;
    match requested {
        SandboxKind::Auto if interception => Ok(SandboxKind::Proxy),
        SandboxKind::Auto => Ok(SandboxKind::Snapshot),
        SandboxKind::Proxy if !interception => Err(ScopeboxError::SandboxUnavailable {
            kind: SandboxKind::Proxy,
            reason: "the host does not support property interception".to_string(),
        }),
        other => Ok(other),
    }
}

/// Get information about the sandbox kinds usable in this environment.
pub fn available_sandboxes(env: &SandboxEnv) -> Vec<SandboxKindInfo> {
    let interception = env.options().interception_available;
    vec![
        SandboxKindInfo {
            name: "proxy",
            available: interception,
            description: "Interception proxy over a per-module shadow namespace",
            unavailable_reason: if interception {
                None
            } else {
                Some("Host does not support property interception")
            },
        },
        SandboxKindInfo {
            name: "snapshot",
            available: true,
            description: "Snapshot and restore of the global namespace (single active module)",
            unavailable_reason: None,
        },
    ]
}

/// Information about a sandbox kind.
#[derive(Debug, Clone, Serialize)]
pub struct SandboxKindInfo {
    pub name: &'static str,
    pub available: bool,
    pub description: &'static str,
    pub unavailable_reason: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::GlobalNamespace;
    use crate::sandbox::env::SandboxOptions;

    fn env(interception_available: bool) -> SandboxEnv {
        SandboxEnv::new(
            GlobalNamespace::new(),
            SandboxOptions {
                interception_available,
                ..SandboxOptions::default()
            },
        )
    }

    #[test]
    fn test_auto_prefers_proxy() {
        let sandbox = create_sandbox(SandboxKind::Auto, "app", &env(true)).unwrap();
        assert_eq!(sandbox.kind(), SandboxKind::Proxy);
        assert_eq!(sandbox.name(), "app");
    }

    #[test]
    fn test_auto_falls_back_to_snapshot() {
        let sandbox = create_sandbox(SandboxKind::Auto, "app", &env(false)).unwrap();
        assert_eq!(sandbox.kind(), SandboxKind::Snapshot);
    }

    #[test]
    fn test_explicit_proxy_without_interception_fails() {
        let err = create_sandbox(SandboxKind::Proxy, "app", &env(false))
            .err()
            .unwrap();
        assert!(matches!(err, ScopeboxError::SandboxUnavailable { .. }));
    }

    #[test]
    fn test_available_sandboxes() {
        let kinds = available_sandboxes(&env(false));
        assert_eq!(kinds.len(), 2);
        assert!(!kinds[0].available);
        assert!(kinds[1].available);
    }
}
