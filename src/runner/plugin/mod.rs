//! Super-global scope and host resolvers.
//!
//! Lookup order for a free name in a script:
//!
//! ```text
//! 1. block scopes (let/const)
//! 2. script scope (var, assignments to undeclared names)
//! 3. undefined / NaN / Infinity
//! 4. super-global scope ← capability roots and console live here
//! ```
//!
//! - **[`PluginResolver`]**: provides names and their methods
//! - **[`SuperGlobalEnvironment`]**: ordered resolvers with a value cache
//! - **[`CapabilityResolver`]**: `window`, `location`, `document`, ...
//! - **[`ConsoleResolver`]**: `console.*` through the `log` facade

pub mod host;
pub mod resolver;
pub mod super_global;
pub mod types;

pub use host::{CapabilityResolver, ConsoleLine, ConsoleResolver, ConsoleSink};
pub use resolver::PluginResolver;
pub use super_global::SuperGlobalEnvironment;
pub use types::EvalContext;
