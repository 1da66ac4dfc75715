//! Compiled scripts and the wrapper they are listed in.
//!
//! A script runs as the body of an anonymous function whose parameters are
//! the free variables:
//!
//! ```text
//! function anonymous(window,location,document
//! ) {
//! <script text>
//! }
//! ```
//!
//! Call-site frames report lines of that listing, so anything mapping a frame
//! back to the script text has to strip the lines the wrapper adds in front.

use uuid::Uuid;

use crate::parser::ast::ProgramData;
use crate::parser::{ParseResult, ScriptParser};

const CALIBRATION_MARKER: &str = "noop";

/// Lines the wrapper adds around the script text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptPadding {
    pub pre: usize,
    pub post: usize,
}

impl ScriptPadding {
    /// Measures the wrapper by listing a one-line marker script.
    fn calibrate() -> ScriptPadding {
        let listing = CompiledScript::listing_for(&[], CALIBRATION_MARKER);
        let lines: Vec<&str> = listing.split('\n').collect();
        let pre = lines
            .iter()
            .position(|line| *line == CALIBRATION_MARKER)
            .unwrap_or(0);
        ScriptPadding {
            pre,
            post: lines.len() - pre - 1,
        }
    }
}

lazy_static! {
    pub static ref SCRIPT_PADDING: ScriptPadding = ScriptPadding::calibrate();
}

#[derive(Debug, Clone)]
pub struct CompiledScript {
    id: Uuid,
    source: String,
    params: Vec<String>,
    program: ProgramData,
}

impl CompiledScript {
    pub fn compile(source: &str, params: &[String]) -> ParseResult<Self> {
        let program = ScriptParser::parse_to_ast_from_str(source)?;
        Ok(CompiledScript {
            id: Uuid::new_v4(),
            source: source.to_string(),
            params: params.to_vec(),
            program,
        })
    }

    pub fn listing_for(params: &[String], source: &str) -> String {
        format!("function anonymous({}\n) {{\n{}\n}}", params.join(","), source)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &ProgramData {
        &self.program
    }

    pub fn listing(&self) -> String {
        CompiledScript::listing_for(&self.params, &self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_is_measured_from_listing() {
        assert_eq!(*SCRIPT_PADDING, ScriptPadding { pre: 2, post: 1 });
    }

    #[test]
    fn test_listing_places_script_after_padding() {
        let params = vec!["window".to_string(), "location".to_string()];
        let script = CompiledScript::compile("var a = 1;\nwindow.name", &params).unwrap();
        let listing = script.listing();
        let lines: Vec<&str> = listing.split('\n').collect();
        assert_eq!(lines[0], "function anonymous(window,location");
        assert_eq!(lines[SCRIPT_PADDING.pre], "var a = 1;");
        assert_eq!(lines[SCRIPT_PADDING.pre + 1], "window.name");
        assert_eq!(lines.len(), 2 + SCRIPT_PADDING.pre + SCRIPT_PADDING.post);
    }

    #[test]
    fn test_compile_reports_syntax_errors() {
        assert!(CompiledScript::compile("var = ;", &[]).is_err());
    }
}
