//! Core types for the evaluation engine.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

/// Result of a statement that completed normally. Abrupt completions travel
/// as `Err` and abort the run, since the script subset has no handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub value: Option<JsValue>,
}

impl Completion {
    pub fn normal() -> Self {
        Completion { value: None }
    }

    pub fn normal_with_value(value: JsValue) -> Self {
        Completion { value: Some(value) }
    }

    /// The value, or undefined if none.
    pub fn get_value(&self) -> JsValue {
        self.value.clone().unwrap_or(JsValue::Undefined)
    }

    /// Keeps an earlier value when this completion carries none.
    pub fn update_empty(self, value: Option<JsValue>) -> Self {
        match self.value {
            Some(_) => self,
            None => Completion { value },
        }
    }
}

pub type EvalResult = Result<Completion, JErrorType>;

pub type ValueResult = Result<JsValue, JErrorType>;
