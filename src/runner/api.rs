//! Running a script against the capability graph.

use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::channel::BlockingChannel;
use crate::runner::capability::classifier::{build_classifier, ClassifierMode};
use crate::runner::capability::schema::CapabilitySchema;
use crate::runner::capability::CapabilityGraph;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::statement::execute_statement_list;
use crate::runner::eval::trace::TraceFrame;
use crate::runner::plugin::host::{CapabilityResolver, ConsoleResolver, ConsoleSink};
use crate::runner::plugin::types::EvalContext;
use crate::runner::script::{CompiledScript, SCRIPT_PADDING};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SandboxError {
    #[error("script does not parse: {0}")]
    Syntax(String),
    #[error("script aborted: {0}")]
    Aborted(#[from] JErrorType),
}

/// Executes scripts with the capability roots bound as free variables and
/// the primary root as `this`.
///
/// Runs share one [`BlockingChannel`], so a channel poisoned by a timeout
/// stays poisoned for later runs.
pub struct SandboxRunner {
    channel: Rc<BlockingChannel>,
    schema: CapabilitySchema,
    mode: ClassifierMode,
    console: Option<ConsoleSink>,
}

impl SandboxRunner {
    pub fn new(channel: BlockingChannel) -> Self {
        SandboxRunner {
            channel: Rc::new(channel),
            schema: CapabilitySchema::browser_default(),
            mode: ClassifierMode::default(),
            console: None,
        }
    }

    pub fn with_schema(mut self, schema: CapabilitySchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_classifier_mode(mut self, mode: ClassifierMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_console_sink(mut self, sink: ConsoleSink) -> Self {
        self.console = Some(sink);
        self
    }

    pub fn channel(&self) -> &BlockingChannel {
        &self.channel
    }

    /// Runs `source` to completion. The script's own completion value is
    /// not reported.
    pub fn run(&self, source: &str) -> Result<(), SandboxError> {
        self.evaluate(source).map(|_| ())
    }

    /// Like [`run`](Self::run), returning the value of the last statement.
    pub fn evaluate(&self, source: &str) -> Result<JsValue, SandboxError> {
        let params: Vec<String> = self
            .schema
            .free_variables()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let script = CompiledScript::compile(source, &params)
            .map_err(|e| SandboxError::Syntax(e.to_string()))?;
        debug!("compiled script {}:\n{}", script.id(), script.listing());

        let classifier = build_classifier(self.mode, &script, &self.schema);
        let graph = Rc::new(CapabilityGraph::new(
            self.schema.clone(),
            classifier,
            Rc::clone(&self.channel),
        ));

        let mut ctx = EvalContext::new();
        ctx.global_this = graph.primary_root().map(JsValue::Node);
        ctx.add_resolver(Box::new(CapabilityResolver::new(&graph)));
        ctx.add_resolver(Box::new(match &self.console {
            Some(sink) => ConsoleResolver::with_sink(Rc::clone(sink)),
            None => ConsoleResolver::new(),
        }));
        ctx.attach_graph(graph);
        ctx.trace.push(TraceFrame::script(script.id(), SCRIPT_PADDING.pre));

        let completion = execute_statement_list(&script.program().body, &mut ctx)?;
        Ok(completion.get_value())
    }
}
