//! The sandbox side: script evaluation wired to the capability graph.

pub mod api;
pub mod capability;
pub mod ds;
pub mod eval;
pub mod plugin;
pub mod script;

pub use api::{SandboxError, SandboxRunner};
