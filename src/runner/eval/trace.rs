//! Call-site frames kept by the evaluator.
//!
//! A script frame tracks the position of the member access currently being
//! evaluated, in the coordinates of the compiled listing (script line plus
//! the wrapper padding). Native frames sit on top while host methods run.

use uuid::Uuid;

use crate::parser::ast::CallSite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOrigin {
    Script(Uuid),
    Native(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub origin: FrameOrigin,
    /// Lines the listing adds in front of the script text.
    pub line_offset: usize,
    pub line: usize,
    pub column: usize,
    pub width: usize,
}

impl TraceFrame {
    pub fn script(id: Uuid, line_offset: usize) -> Self {
        TraceFrame {
            origin: FrameOrigin::Script(id),
            line_offset,
            line: 0,
            column: 0,
            width: 0,
        }
    }

    pub fn native(name: impl Into<String>) -> Self {
        TraceFrame {
            origin: FrameOrigin::Native(name.into()),
            line_offset: 0,
            line: 0,
            column: 0,
            width: 0,
        }
    }

    pub fn belongs_to(&self, script: Uuid) -> bool {
        self.origin == FrameOrigin::Script(script)
    }
}

/// Newest frame last.
#[derive(Debug, Clone, Default)]
pub struct ExecutionTrace {
    frames: Vec<TraceFrame>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        ExecutionTrace { frames: vec![] }
    }

    pub fn push(&mut self, frame: TraceFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<TraceFrame> {
        self.frames.pop()
    }

    /// Moves the newest script frame to `site`.
    pub fn set_position(&mut self, site: CallSite) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| matches!(f.origin, FrameOrigin::Script(_)))
        {
            frame.line = site.line + frame.line_offset;
            frame.column = site.column;
            frame.width = site.width;
        }
    }

    /// Newest frame that belongs to `script`.
    pub fn find_script_frame(&self, script: Uuid) -> Option<&TraceFrame> {
        self.frames.iter().rev().find(|f| f.belongs_to(script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_lands_on_newest_script_frame() {
        let outer = Uuid::new_v4();
        let inner = Uuid::new_v4();
        let mut trace = ExecutionTrace::new();
        trace.push(TraceFrame::script(outer, 2));
        trace.push(TraceFrame::script(inner, 2));
        trace.push(TraceFrame::native("console.log"));
        trace.set_position(CallSite {
            line: 1,
            column: 8,
            width: 8,
        });
        let frame = trace.find_script_frame(inner).unwrap();
        assert_eq!((frame.line, frame.column, frame.width), (3, 8, 8));
        assert_eq!(trace.find_script_frame(outer).unwrap().line, 0);
        assert!(trace.find_script_frame(Uuid::new_v4()).is_none());
    }
}
