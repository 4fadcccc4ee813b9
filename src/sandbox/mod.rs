mod env;
mod factory;
mod proxy;
mod snapshot;
mod traits;
pub mod whitelist;

pub use env::{SandboxEnv, SandboxOptions};
pub use factory::{available_sandboxes, create_sandbox, resolve_sandbox_kind, SandboxKindInfo};
pub use proxy::{ProxySandbox, ProxyWindow};
pub use snapshot::{ModifiedProps, SnapshotSandbox, LEGACY_TRACKED_KEY};
pub use traits::{Sandbox, SandboxInfo};
pub use whitelist::EscapeWhitelist;
