//! Resolvers for the names every sandboxed script can see.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error, info, log, warn, Level};

use crate::runner::capability::CapabilityGraph;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::resolver::PluginResolver;

pub const CONSOLE: &str = "console";
const CONSOLE_TARGET: &str = "warden::console";

/// Binds the capability roots and their known members.
pub struct CapabilityResolver {
    bindings: HashMap<String, JsValue>,
}

impl CapabilityResolver {
    pub fn new(graph: &CapabilityGraph) -> Self {
        CapabilityResolver {
            bindings: graph.bindings().into_iter().collect(),
        }
    }
}

impl PluginResolver for CapabilityResolver {
    fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    fn resolve(&self, name: &str) -> Result<JsValue, JErrorType> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| JErrorType::ReferenceError(format!("{} is not defined", name)))
    }

    fn call_method(
        &self,
        _object_name: &str,
        _method_name: &str,
        _args: &[JsValue],
    ) -> Option<Result<JsValue, JErrorType>> {
        None
    }

    fn name(&self) -> &str {
        "capabilities"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub level: Level,
    pub text: String,
}

/// Shared record of console output, for callers that want to inspect it.
pub type ConsoleSink = Rc<RefCell<Vec<ConsoleLine>>>;

/// `console.log` and friends, written through the `log` facade.
#[derive(Default)]
pub struct ConsoleResolver {
    sink: Option<ConsoleSink>,
}

impl ConsoleResolver {
    pub fn new() -> Self {
        ConsoleResolver { sink: None }
    }

    pub fn with_sink(sink: ConsoleSink) -> Self {
        ConsoleResolver { sink: Some(sink) }
    }

    fn write(&self, level: Level, args: &[JsValue]) {
        let text = args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        match level {
            Level::Error => error!(target: CONSOLE_TARGET, "{}", text),
            Level::Warn => warn!(target: CONSOLE_TARGET, "{}", text),
            Level::Info => info!(target: CONSOLE_TARGET, "{}", text),
            Level::Debug => debug!(target: CONSOLE_TARGET, "{}", text),
            Level::Trace => log!(target: CONSOLE_TARGET, Level::Trace, "{}", text),
        }
        if let Some(sink) = &self.sink {
            sink.borrow_mut().push(ConsoleLine { level, text });
        }
    }
}

impl PluginResolver for ConsoleResolver {
    fn has_binding(&self, name: &str) -> bool {
        name == CONSOLE
    }

    fn resolve(&self, _name: &str) -> Result<JsValue, JErrorType> {
        Ok(JsValue::Native(CONSOLE.to_string()))
    }

    fn call_method(
        &self,
        object_name: &str,
        method_name: &str,
        args: &[JsValue],
    ) -> Option<Result<JsValue, JErrorType>> {
        if object_name != CONSOLE {
            return None;
        }
        let level = match method_name {
            "log" | "info" => Level::Info,
            "warn" => Level::Warn,
            "error" => Level::Error,
            "debug" => Level::Debug,
            "trace" => Level::Trace,
            _ => return None,
        };
        self.write(level, args);
        Some(Ok(JsValue::Undefined))
    }

    fn name(&self) -> &str {
        CONSOLE
    }
}
