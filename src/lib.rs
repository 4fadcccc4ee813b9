pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod namespace;
pub mod rebind;
pub mod runtime;
pub mod sandbox;
pub mod scenario;

pub use error::{Result, ScopeboxError};
