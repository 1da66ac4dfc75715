//! Evaluation of the script AST.

pub mod expression;
pub mod statement;
pub mod trace;
pub mod types;

pub use types::{Completion, EvalResult, ValueResult};
