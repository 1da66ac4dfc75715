//! Evaluation context shared by the evaluator and the host resolvers.

use std::collections::HashMap;
use std::rc::Rc;

use crate::runner::capability::CapabilityGraph;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::trace::ExecutionTrace;
use crate::runner::plugin::resolver::PluginResolver;
use crate::runner::plugin::super_global::SuperGlobalEnvironment;

#[derive(Debug, Clone)]
struct Binding {
    value: JsValue,
    mutable: bool,
    lexical: bool,
}

/// Scopes, the super-global fallback and the call-site trace of one run.
///
/// `scopes[0]` is the script scope holding `var` declarations; every block
/// pushes another scope for its `let` and `const` bindings.
pub struct EvalContext {
    scopes: Vec<HashMap<String, Binding>>,
    pub super_global: SuperGlobalEnvironment,
    pub global_this: Option<JsValue>,
    pub trace: ExecutionTrace,
    graph: Option<Rc<CapabilityGraph>>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            scopes: vec![HashMap::new()],
            super_global: SuperGlobalEnvironment::new(),
            global_this: None,
            trace: ExecutionTrace::new(),
            graph: None,
        }
    }

    pub fn add_resolver(&mut self, resolver: Box<dyn PluginResolver>) {
        self.super_global.add_resolver(resolver);
    }

    pub fn attach_graph(&mut self, graph: Rc<CapabilityGraph>) {
        self.graph = Some(graph);
    }

    pub fn graph(&self) -> Result<Rc<CapabilityGraph>, JErrorType> {
        self.graph.clone().ok_or_else(|| {
            JErrorType::TypeError("no capability graph is attached to this context".to_string())
        })
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// `var name [= value]`. Redeclaring keeps the old value unless a new
    /// one is given.
    pub fn declare_var(&mut self, name: &str, value: Option<JsValue>) -> Result<(), JErrorType> {
        if self.scopes.iter().any(|s| s.get(name).map_or(false, |b| b.lexical)) {
            return Err(already_declared(name));
        }
        let script_scope = &mut self.scopes[0];
        match script_scope.get_mut(name) {
            Some(binding) => {
                if let Some(value) = value {
                    binding.value = value;
                }
            }
            None => {
                script_scope.insert(
                    name.to_string(),
                    Binding {
                        value: value.unwrap_or(JsValue::Undefined),
                        mutable: true,
                        lexical: false,
                    },
                );
            }
        }
        Ok(())
    }

    /// `let` / `const` in the innermost scope.
    pub fn declare_lexical(&mut self, name: &str, value: JsValue, mutable: bool) -> Result<(), JErrorType> {
        let depth = self.scopes.len();
        let scope = &mut self.scopes[depth - 1];
        if scope.contains_key(name) {
            return Err(already_declared(name));
        }
        scope.insert(
            name.to_string(),
            Binding {
                value,
                mutable,
                lexical: true,
            },
        );
        Ok(())
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains_key(name)) || self.super_global.has_name(name)
    }

    /// Scopes innermost first, then the global value properties, then the
    /// super-global resolvers.
    pub fn get_binding(&mut self, name: &str) -> Result<JsValue, JErrorType> {
        if let Some(binding) = self.scopes.iter().rev().find_map(|s| s.get(name)) {
            return Ok(binding.value.clone());
        }
        match name {
            "undefined" => return Ok(JsValue::Undefined),
            "NaN" => return Ok(JsValue::Number(JsNumberType::NaN)),
            "Infinity" => return Ok(JsValue::Number(JsNumberType::PositiveInfinity)),
            _ => {}
        }
        self.super_global.resolve_binding(name)
    }

    /// Assigns to the nearest binding of `name`. An undeclared name becomes
    /// a script-scope binding, shadowing any super-global of that name.
    pub fn set_binding(&mut self, name: &str, value: JsValue) -> Result<(), JErrorType> {
        match self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
            Some(binding) if !binding.mutable => Err(JErrorType::TypeError(format!(
                "Assignment to constant variable '{}'",
                name
            ))),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => {
                self.scopes[0].insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: true,
                        lexical: false,
                    },
                );
                Ok(())
            }
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

fn already_declared(name: &str) -> JErrorType {
    JErrorType::SyntaxError(format!("Identifier '{}' has already been declared", name))
}


impl std::fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("scopes", &self.scopes)
            .field("global_this", &self.global_this)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}
