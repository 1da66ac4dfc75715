use thiserror::Error;

use crate::channel::ChannelError;
use crate::runner::ds::value::JsValue;

/// Script-level failures. Any of them aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JErrorType {
    #[error("Uncaught reference error: {0}.")]
    ReferenceError(String),
    #[error("Uncaught type error: {0}.")]
    TypeError(String),
    #[error("Uncaught syntax error: {0}.")]
    SyntaxError(String),
    #[error("Uncaught {0}")]
    Thrown(JsValue),
    #[error("Uncaught channel error: {0}")]
    Channel(#[from] ChannelError),
}
