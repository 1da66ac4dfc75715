mod api;
pub mod ast;
#[allow(non_fmt_panics)]
#[cfg(test)]
mod unit_tests;
mod util;

pub use api::{ParseResult, Rule, ScriptParser};
pub use util::line_col;
