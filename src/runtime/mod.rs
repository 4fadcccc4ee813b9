//! Process-wide state shared by every sandbox instance.
//!
//! Each piece is created once by the host and injected into sandboxes by
//! reference; nothing here is reachable through a static.

mod context;
mod counter;
mod tasks;

pub use context::{RunningApp, RunningContext};
pub use counter::ActiveSandboxCounter;
pub use tasks::TaskQueue;
