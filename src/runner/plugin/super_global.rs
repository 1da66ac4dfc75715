//! Super-global environment, the bottom of the scope chain.
//!
//! Names that are not declared in any script scope are looked up here:
//!
//! ```text
//! script: location.href
//!      ↓
//! 1. block scopes → not found
//! 2. script scope → not found
//! 3. super-global → "location" claimed by the capability resolver
//!      ↓
//! 4. cache the node for window.location
//! ```
//!
//! ```
//! use warden::runner::ds::error::JErrorType;
//! use warden::runner::ds::value::{JsNumberType, JsValue};
//! use warden::runner::plugin::resolver::PluginResolver;
//! use warden::runner::plugin::super_global::SuperGlobalEnvironment;
//!
//! struct Answer;
//!
//! impl PluginResolver for Answer {
//!     fn has_binding(&self, name: &str) -> bool {
//!         name == "answer"
//!     }
//!
//!     fn resolve(&self, _name: &str) -> Result<JsValue, JErrorType> {
//!         Ok(JsValue::Number(JsNumberType::Integer(42)))
//!     }
//!
//!     fn call_method(&self, _obj: &str, _method: &str, _args: &[JsValue])
//!         -> Option<Result<JsValue, JErrorType>> {
//!         None
//!     }
//!
//!     fn name(&self) -> &str { "answer" }
//! }
//!
//! let mut sg = SuperGlobalEnvironment::new();
//! sg.add_resolver(Box::new(Answer));
//! assert_eq!(
//!     sg.resolve_binding("answer").unwrap(),
//!     JsValue::Number(JsNumberType::Integer(42))
//! );
//! assert!(sg.resolve_binding("question").is_err());
//! ```

use std::collections::HashMap;

use log::trace;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::resolver::PluginResolver;

/// A name some resolver has already materialized.
struct Resolved {
    owner: usize,
    value: JsValue,
}

/// Read-only to scripts: assigning to one of these names creates a script
/// binding that shadows it.
#[derive(Default)]
pub struct SuperGlobalEnvironment {
    resolvers: Vec<Box<dyn PluginResolver>>,
    resolved: HashMap<String, Resolved>,
}

impl SuperGlobalEnvironment {
    pub fn new() -> Self {
        SuperGlobalEnvironment::default()
    }

    /// Resolvers are asked in the order they were added.
    pub fn add_resolver(&mut self, resolver: Box<dyn PluginResolver>) {
        self.resolvers.push(resolver);
    }

    fn owner_of(&self, name: &str) -> Option<usize> {
        match self.resolved.get(name) {
            Some(entry) => Some(entry.owner),
            None => self.resolvers.iter().position(|r| r.has_binding(name)),
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.owner_of(name).is_some()
    }

    /// `name.method(args)` on a host object. `None` when no resolver owns
    /// `name` or the owner has no such method.
    pub fn call_method(
        &self,
        name: &str,
        method: &str,
        args: &[JsValue],
    ) -> Option<Result<JsValue, JErrorType>> {
        let owner = self.owner_of(name)?;
        self.resolvers[owner].call_method(name, method, args)
    }

    /// Each name is materialized once per run; later lookups hit the cache.
    pub fn resolve_binding(&mut self, name: &str) -> Result<JsValue, JErrorType> {
        if let Some(entry) = self.resolved.get(name) {
            return Ok(entry.value.clone());
        }
        let owner = self
            .owner_of(name)
            .ok_or_else(|| JErrorType::ReferenceError(format!("{} is not defined", name)))?;
        trace!("'{}' resolved by {}", name, self.resolvers[owner].name());
        let value = self.resolvers[owner].resolve(name)?;
        self.resolved.insert(
            name.to_string(),
            Resolved {
                owner,
                value: value.clone(),
            },
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::plugin::host::{ConsoleResolver, CONSOLE};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting(Rc<Cell<usize>>);

    impl PluginResolver for Counting {
        fn has_binding(&self, name: &str) -> bool {
            name == "window" || name == CONSOLE
        }

        fn resolve(&self, _name: &str) -> Result<JsValue, JErrorType> {
            self.0.set(self.0.get() + 1);
            Ok(JsValue::Null)
        }

        fn call_method(&self, _: &str, _: &str, _: &[JsValue]) -> Option<Result<JsValue, JErrorType>> {
            None
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_first_resolver_wins_and_value_is_cached() {
        let calls = Rc::new(Cell::new(0));
        let mut sg = SuperGlobalEnvironment::new();
        sg.add_resolver(Box::new(Counting(Rc::clone(&calls))));
        sg.add_resolver(Box::new(ConsoleResolver::new()));

        assert_eq!(sg.resolve_binding("window").unwrap(), JsValue::Null);
        assert_eq!(sg.resolve_binding("window").unwrap(), JsValue::Null);
        assert_eq!(calls.get(), 1);

        // `console` is claimed by the earlier resolver, which has no methods.
        assert!(sg.call_method(CONSOLE, "log", &[]).is_none());
        assert!(!sg.has_name("document"));
    }
}
