//! Resolver trait for lazy resolution of super-global names.
//!
//! The sandbox exposes a handful of names nobody declares in the script:
//! the capability roots and host objects such as `console`. Each comes from
//! a `PluginResolver`.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

/// Resolvers are queried in registration order when a name lookup reaches
/// the super-global scope. The first resolver that claims a name wins.
pub trait PluginResolver {
    /// Cheap membership check. Must not materialize the value.
    fn has_binding(&self, name: &str) -> bool;

    /// Materialize the value for `name`. Called only after `has_binding`
    /// returned `true`; the result is cached by the super-global scope.
    fn resolve(&self, name: &str) -> Result<JsValue, JErrorType>;

    /// Run `object_name.method_name(args)`. `None` when the method does not
    /// exist on that object.
    fn call_method(
        &self,
        object_name: &str,
        method_name: &str,
        args: &[JsValue],
    ) -> Option<Result<JsValue, JErrorType>>;

    /// Human-readable name for log records.
    fn name(&self) -> &str;
}
