//! Deciding whether a property access ends a chain.
//!
//! A terminal access is resolved through the channel right away. A
//! navigational one only extends the path and yields a new node, because the
//! script is about to read a member of the result.

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::AccessorPath;
use crate::runner::capability::schema::{CapabilitySchema, Member};
use crate::runner::eval::trace::ExecutionTrace;
use crate::runner::script::{CompiledScript, ScriptPadding, SCRIPT_PADDING};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Terminal,
    Navigational,
}

pub trait Classifier {
    fn classify(&self, prefix: &AccessorPath, property: &str, trace: &ExecutionTrace) -> Continuation;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Declared members only; everything undeclared is terminal.
    Schema,
    /// Source lookahead only.
    Lookahead,
    /// Declared members first, source lookahead for the rest.
    Hybrid,
}

impl Default for ClassifierMode {
    fn default() -> Self {
        ClassifierMode::Hybrid
    }
}

/// Builds the classifier a run of `script` uses under `mode`.
pub fn build_classifier(
    mode: ClassifierMode,
    script: &CompiledScript,
    schema: &CapabilitySchema,
) -> Box<dyn Classifier> {
    match mode {
        ClassifierMode::Lookahead => Box::new(LookaheadClassifier::new(script)),
        ClassifierMode::Schema => Box::new(SchemaClassifier::new(schema.clone(), TerminalClassifier)),
        ClassifierMode::Hybrid => Box::new(SchemaClassifier::new(
            schema.clone(),
            LookaheadClassifier::new(script),
        )),
    }
}

/// Treats every access as terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalClassifier;

impl Classifier for TerminalClassifier {
    fn classify(&self, _prefix: &AccessorPath, _property: &str, _trace: &ExecutionTrace) -> Continuation {
        Continuation::Terminal
    }
}

/// Looks at the script character right after the accessed property token.
/// A following `.` or `[` means the script keeps navigating.
#[derive(Debug, Clone)]
pub struct LookaheadClassifier {
    script: Uuid,
    lines: Vec<Vec<char>>,
    padding: ScriptPadding,
}

impl LookaheadClassifier {
    pub fn new(script: &CompiledScript) -> Self {
        LookaheadClassifier {
            script: script.id(),
            lines: script.source().split('\n').map(|l| l.chars().collect()).collect(),
            padding: *SCRIPT_PADDING,
        }
    }

    fn next_char(&self, line: usize, column: usize, width: usize) -> Option<char> {
        let index = line.checked_sub(self.padding.pre + 1)?;
        let at = (column + width).checked_sub(1)?;
        self.lines.get(index)?.get(at).copied()
    }
}

impl Classifier for LookaheadClassifier {
    fn classify(&self, prefix: &AccessorPath, property: &str, trace: &ExecutionTrace) -> Continuation {
        let frame = match trace.find_script_frame(self.script) {
            Some(frame) => frame,
            None => {
                debug!(
                    "no call site for '{}' in script {}, treating as terminal",
                    prefix.child(property),
                    self.script
                );
                return Continuation::Terminal;
            }
        };
        match self.next_char(frame.line, frame.column, frame.width) {
            Some('.') | Some('[') => Continuation::Navigational,
            _ => Continuation::Terminal,
        }
    }
}

/// Answers from the declared schema and hands undeclared members to
/// `fallback`.
#[derive(Debug, Clone)]
pub struct SchemaClassifier<F> {
    schema: CapabilitySchema,
    fallback: F,
}

impl<F: Classifier> SchemaClassifier<F> {
    pub fn new(schema: CapabilitySchema, fallback: F) -> Self {
        SchemaClassifier { schema, fallback }
    }
}

impl<F: Classifier> Classifier for SchemaClassifier<F> {
    fn classify(&self, prefix: &AccessorPath, property: &str, trace: &ExecutionTrace) -> Continuation {
        match self.schema.member_at(prefix, property) {
            Some(Member::Navigable(_)) => Continuation::Navigational,
            Some(Member::Terminal) | Some(Member::Constant(_)) => Continuation::Terminal,
            None => self.fallback.classify(prefix, property, trace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::CallSite;
    use crate::runner::eval::trace::TraceFrame;

    fn trace_at(script: &CompiledScript, line: usize, column: usize, width: usize) -> ExecutionTrace {
        let mut trace = ExecutionTrace::new();
        trace.push(TraceFrame::script(script.id(), SCRIPT_PADDING.pre));
        trace.set_position(CallSite { line, column, width });
        trace
    }

    fn path(s: &str) -> AccessorPath {
        AccessorPath::root(s)
    }

    #[test]
    fn test_lookahead_dot_and_bracket_are_navigational() {
        let script = CompiledScript::compile("window.location.href\nwindow.document['title']", &[]).unwrap();
        let classifier = LookaheadClassifier::new(&script);
        // `location` at column 8, followed by `.`
        let trace = trace_at(&script, 1, 8, 8);
        assert_eq!(classifier.classify(&path("window"), "location", &trace), Continuation::Navigational);
        // `href` at column 17 runs to the end of the line.
        let trace = trace_at(&script, 1, 17, 4);
        assert_eq!(classifier.classify(&path("window.location"), "href", &trace), Continuation::Terminal);
        // `document` followed by `[`
        let trace = trace_at(&script, 2, 8, 8);
        assert_eq!(classifier.classify(&path("window"), "document", &trace), Continuation::Navigational);
    }

    #[test]
    fn test_lookahead_other_characters_are_terminal() {
        let script = CompiledScript::compile("var t = window.name + 1;", &[]).unwrap();
        let classifier = LookaheadClassifier::new(&script);
        let trace = trace_at(&script, 1, 16, 4);
        assert_eq!(classifier.classify(&path("window"), "name", &trace), Continuation::Terminal);
    }

    #[test]
    fn test_lookahead_without_frame_is_terminal() {
        let script = CompiledScript::compile("window.location.href", &[]).unwrap();
        let other = CompiledScript::compile("window.location.href", &[]).unwrap();
        let classifier = LookaheadClassifier::new(&script);
        let trace = trace_at(&other, 1, 8, 8);
        assert_eq!(classifier.classify(&path("window"), "location", &trace), Continuation::Terminal);
        assert_eq!(
            classifier.classify(&path("window"), "location", &ExecutionTrace::new()),
            Continuation::Terminal
        );
    }

    #[test]
    fn test_schema_classifier_prefers_declarations() {
        let schema = CapabilitySchema::new().navigable(
            "window",
            CapabilitySchema::new()
                .navigable("history", CapabilitySchema::new())
                .terminal("name"),
        );
        // A source position that would say "navigational" for anything.
        let script = CompiledScript::compile("window.x.y", &[]).unwrap();
        let trace = trace_at(&script, 1, 8, 1);
        let hybrid = SchemaClassifier::new(schema.clone(), LookaheadClassifier::new(&script));
        assert_eq!(hybrid.classify(&path("window"), "name", &trace), Continuation::Terminal);
        assert_eq!(hybrid.classify(&path("window"), "history", &trace), Continuation::Navigational);
        assert_eq!(hybrid.classify(&path("window"), "x", &trace), Continuation::Navigational);

        let strict = SchemaClassifier::new(schema, TerminalClassifier);
        assert_eq!(strict.classify(&path("window"), "x", &trace), Continuation::Terminal);
        assert_eq!(strict.classify(&path("window"), "history", &trace), Continuation::Navigational);
    }

    #[test]
    fn test_mode_parses_from_lowercase() {
        let mode: ClassifierMode = serde_json::from_str("\"lookahead\"").unwrap();
        assert_eq!(mode, ClassifierMode::Lookahead);
        assert_eq!(ClassifierMode::default(), ClassifierMode::Hybrid);
    }
}
