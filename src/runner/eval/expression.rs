//! Expression evaluation.
//!
//! Member access on a capability node is where the sandbox meets the
//! privileged graph: the evaluator records the call site in the trace and
//! hands the access to the [`CapabilityGraph`](crate::runner::capability::CapabilityGraph).

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, CallSite, ExpressionType, LiteralData, LiteralType,
    LogicalOperator, MemberExpressionType, NumberLiteralType, UnaryOperator,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::trace::TraceFrame;
use crate::runner::plugin::types::EvalContext;

use super::types::ValueResult;

/// Evaluate an expression and return its value.
pub fn evaluate_expression(expr: &ExpressionType, ctx: &mut EvalContext) -> ValueResult {
    match expr {
        ExpressionType::Literal(lit) => Ok(evaluate_literal(lit)),

        ExpressionType::Identifier(id) => ctx.get_binding(&id.name),

        ExpressionType::ThisExpression { .. } => {
            Ok(ctx.global_this.clone().unwrap_or(JsValue::Undefined))
        }

        ExpressionType::MemberExpression(member) => evaluate_member_expression(member, ctx),

        ExpressionType::CallExpression {
            callee, arguments, ..
        } => evaluate_call_expression(callee, arguments, ctx),

        ExpressionType::UnaryExpression {
            operator, argument, ..
        } => evaluate_unary_expression(operator, argument, ctx),

        ExpressionType::BinaryExpression {
            operator,
            left,
            right,
            ..
        } => {
            let left_val = evaluate_expression(left, ctx)?;
            let right_val = evaluate_expression(right, ctx)?;
            Ok(apply_binary_operator(*operator, &left_val, &right_val))
        }

        ExpressionType::LogicalExpression {
            operator,
            left,
            right,
            ..
        } => evaluate_logical_expression(operator, left, right, ctx),

        ExpressionType::AssignmentExpression {
            operator,
            left,
            right,
            ..
        } => evaluate_assignment_expression(operator, left, right, ctx),
    }
}

fn evaluate_literal(lit: &LiteralData) -> JsValue {
    match &lit.value {
        LiteralType::NullLiteral => JsValue::Null,
        LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
        LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
        LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(i)) => {
            JsValue::Number(JsNumberType::Integer(*i))
        }
        LiteralType::NumberLiteral(NumberLiteralType::FloatLiteral(f)) => JsValue::from_f64(*f),
    }
}

// ============================================================================
// Member access
// ============================================================================

fn evaluate_member_expression(member: &MemberExpressionType, ctx: &mut EvalContext) -> ValueResult {
    let object = evaluate_expression(member.object(), ctx)?;
    let key = property_key(member, ctx)?;
    get_member(&object, &key, member.call_site(), ctx)
}

/// `a.b` yields `"b"`; `a[expr]` yields the string form of `expr`.
fn property_key(member: &MemberExpressionType, ctx: &mut EvalContext) -> Result<String, JErrorType> {
    match member {
        MemberExpressionType::SimpleMemberExpression { property, .. } => Ok(property.name.clone()),
        MemberExpressionType::ComputedMemberExpression { property, .. } => {
            let value = evaluate_expression(property, ctx)?;
            Ok(to_string(&value))
        }
    }
}

fn get_member(object: &JsValue, key: &str, site: CallSite, ctx: &mut EvalContext) -> ValueResult {
    match object {
        JsValue::Node(node) => {
            ctx.trace.set_position(site);
            let graph = ctx.graph()?;
            graph.get(node, key, &ctx.trace)
        }
        JsValue::Json(value) => Ok(json_member(value, key)),
        JsValue::String(s) => Ok(string_member(s, key)),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read properties of {} (reading '{}')",
            object, key
        ))),
        JsValue::Boolean(_) | JsValue::Number(_) | JsValue::Native(_) => Ok(JsValue::Undefined),
    }
}

fn json_member(value: &JsonValue, key: &str) -> JsValue {
    match value {
        JsonValue::Object(map) => map.get(key).map(JsValue::from_json).unwrap_or(JsValue::Undefined),
        JsonValue::Array(items) if key == "length" => {
            JsValue::Number(JsNumberType::Integer(items.len() as i64))
        }
        JsonValue::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map(JsValue::from_json)
            .unwrap_or(JsValue::Undefined),
        _ => JsValue::Undefined,
    }
}

fn string_member(s: &str, key: &str) -> JsValue {
    if key == "length" {
        return JsValue::Number(JsNumberType::Integer(s.encode_utf16().count() as i64));
    }
    // Indexes count UTF-16 code units, like `length`. Half of a surrogate
    // pair reads as U+FFFD.
    key.parse::<usize>()
        .ok()
        .and_then(|i| s.encode_utf16().nth(i))
        .map(|unit| JsValue::String(String::from_utf16_lossy(&[unit])))
        .unwrap_or(JsValue::Undefined)
}

/// Writes `value` to `object[key]` and returns the resulting value of the
/// assignment expression. On a node this is what the coordinator echoed.
fn put_member(object: &JsValue, key: &str, value: JsValue, ctx: &mut EvalContext) -> ValueResult {
    match object {
        JsValue::Node(node) => {
            let graph = ctx.graph()?;
            graph.set(node, key, &value)
        }
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot set properties of {} (setting '{}')",
            object, key
        ))),
        JsValue::Json(_) => Err(JErrorType::TypeError(format!(
            "Cannot assign to '{}' of a value received from the host",
            key
        ))),
        // Writes to primitives are dropped.
        _ => Ok(value),
    }
}

// ============================================================================
// Calls
// ============================================================================

fn evaluate_call_expression(
    callee: &ExpressionType,
    arguments: &[ExpressionType],
    ctx: &mut EvalContext,
) -> ValueResult {
    match callee {
        ExpressionType::MemberExpression(member) => {
            let object = evaluate_expression(member.object(), ctx)?;
            let method = property_key(member, ctx)?;
            let args = evaluate_arguments(arguments, ctx)?;
            call_method(&object, &method, &args, ctx)
        }
        other => {
            evaluate_expression(other, ctx)?;
            evaluate_arguments(arguments, ctx)?;
            Err(JErrorType::TypeError(format!(
                "{} is not a function",
                describe_callee(other)
            )))
        }
    }
}

fn evaluate_arguments(arguments: &[ExpressionType], ctx: &mut EvalContext) -> Result<Vec<JsValue>, JErrorType> {
    arguments.iter().map(|a| evaluate_expression(a, ctx)).collect()
}

fn call_method(object: &JsValue, method: &str, args: &[JsValue], ctx: &mut EvalContext) -> ValueResult {
    match object {
        JsValue::Native(name) => {
            ctx.trace.push(TraceFrame::native(format!("{}.{}", name, method)));
            let result = ctx.super_global.call_method(name, method, args);
            ctx.trace.pop();
            result.unwrap_or_else(|| {
                Err(JErrorType::TypeError(format!("{}.{} is not a function", name, method)))
            })
        }
        JsValue::Node(node) => Err(JErrorType::TypeError(format!(
            "{} cannot be called: only property reads and writes reach the host",
            node.path().child(method)
        ))),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read properties of {} (reading '{}')",
            object, method
        ))),
        _ => Err(JErrorType::TypeError(format!("{} is not a function", method))),
    }
}

fn describe_callee(expr: &ExpressionType) -> String {
    match expr {
        ExpressionType::Identifier(id) => id.name.clone(),
        ExpressionType::ThisExpression { .. } => "this".to_string(),
        _ => "expression".to_string(),
    }
}

// ============================================================================
// Assignment
// ============================================================================

fn evaluate_assignment_expression(
    operator: &AssignmentOperator,
    left: &ExpressionType,
    right: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    match left {
        ExpressionType::Identifier(id) => {
            let value = match operator {
                AssignmentOperator::Equals => evaluate_expression(right, ctx)?,
                AssignmentOperator::AddEquals => {
                    let current = ctx.get_binding(&id.name)?;
                    let rhs = evaluate_expression(right, ctx)?;
                    add_values(&current, &rhs)
                }
            };
            ctx.set_binding(&id.name, value.clone())?;
            Ok(value)
        }
        ExpressionType::MemberExpression(member) => {
            let object = evaluate_expression(member.object(), ctx)?;
            let key = property_key(member, ctx)?;
            let value = match operator {
                AssignmentOperator::Equals => evaluate_expression(right, ctx)?,
                AssignmentOperator::AddEquals => {
                    let current = match &object {
                        // The target is about to be written, so read its
                        // current value instead of navigating.
                        JsValue::Node(node) => ctx.graph()?.fetch(node, &key)?,
                        _ => get_member(&object, &key, member.call_site(), ctx)?,
                    };
                    let rhs = evaluate_expression(right, ctx)?;
                    add_values(&current, &rhs)
                }
            };
            put_member(&object, &key, value, ctx)
        }
        _ => Err(JErrorType::SyntaxError(
            "Invalid left-hand side in assignment".to_string(),
        )),
    }
}

// ============================================================================
// Operators
// ============================================================================

fn evaluate_unary_expression(
    operator: &UnaryOperator,
    argument: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    if let (UnaryOperator::TypeOf, ExpressionType::Identifier(id)) = (operator, argument) {
        // typeof tolerates undeclared names.
        return match ctx.get_binding(&id.name) {
            Ok(value) => Ok(JsValue::String(get_typeof_string(&value).to_string())),
            Err(JErrorType::ReferenceError(_)) => Ok(JsValue::String("undefined".to_string())),
            Err(e) => Err(e),
        };
    }
    let value = evaluate_expression(argument, ctx)?;
    Ok(match operator {
        UnaryOperator::TypeOf => JsValue::String(get_typeof_string(&value).to_string()),
        UnaryOperator::LogicalNot => JsValue::Boolean(!to_boolean(&value)),
        UnaryOperator::Minus => JsValue::from_f64(-to_number(&value).as_f64()),
    })
}

fn evaluate_logical_expression(
    operator: &LogicalOperator,
    left: &ExpressionType,
    right: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    let left_val = evaluate_expression(left, ctx)?;
    match operator {
        LogicalOperator::Or if to_boolean(&left_val) => Ok(left_val),
        LogicalOperator::And if !to_boolean(&left_val) => Ok(left_val),
        _ => evaluate_expression(right, ctx),
    }
}

pub fn apply_binary_operator(operator: BinaryOperator, left: &JsValue, right: &JsValue) -> JsValue {
    match operator {
        BinaryOperator::Add => add_values(left, right),
        BinaryOperator::Subtract => numeric(left, right, |a, b| a - b),
        BinaryOperator::Multiply => numeric(left, right, |a, b| a * b),
        BinaryOperator::Divide => numeric(left, right, |a, b| a / b),
        BinaryOperator::Modulo => numeric(left, right, |a, b| a % b),
        BinaryOperator::StrictlyEqual => JsValue::Boolean(strict_equality(left, right)),
        BinaryOperator::StrictlyUnequal => JsValue::Boolean(!strict_equality(left, right)),
        BinaryOperator::LooselyEqual => JsValue::Boolean(loose_equality(left, right)),
        BinaryOperator::LooselyUnequal => JsValue::Boolean(!loose_equality(left, right)),
        BinaryOperator::LessThan => compare(left, right, |o| o == Ordering::Less),
        BinaryOperator::LessThanEqual => compare(left, right, |o| o != Ordering::Greater),
        BinaryOperator::GreaterThan => compare(left, right, |o| o == Ordering::Greater),
        BinaryOperator::GreaterThanEqual => compare(left, right, |o| o != Ordering::Less),
    }
}

fn add_values(left: &JsValue, right: &JsValue) -> JsValue {
    let stringy = |v: &JsValue| !matches!(v, JsValue::Undefined | JsValue::Null | JsValue::Boolean(_) | JsValue::Number(_));
    if stringy(left) || stringy(right) {
        return JsValue::String(format!("{}{}", to_string(left), to_string(right)));
    }
    numeric(left, right, |a, b| a + b)
}

fn numeric<F>(left: &JsValue, right: &JsValue, op: F) -> JsValue
where
    F: Fn(f64, f64) -> f64,
{
    JsValue::from_f64(op(to_number(left).as_f64(), to_number(right).as_f64()))
}

/// Strings compare by code units, everything else numerically. Any NaN makes
/// the comparison false.
fn compare<F>(left: &JsValue, right: &JsValue, accept: F) -> JsValue
where
    F: Fn(Ordering) -> bool,
{
    let ordering = match (left, right) {
        (JsValue::String(a), JsValue::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
        _ => to_number(left).as_f64().partial_cmp(&to_number(right).as_f64()),
    };
    JsValue::Boolean(ordering.map_or(false, accept))
}

fn strict_equality(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn loose_equality(left: &JsValue, right: &JsValue) -> bool {
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        return strict_equality(left, right);
    }
    match (left, right) {
        (JsValue::Null, JsValue::Undefined) | (JsValue::Undefined, JsValue::Null) => true,
        (JsValue::Number(_), JsValue::String(_)) | (JsValue::String(_), JsValue::Number(_)) => {
            to_number(left).as_f64() == to_number(right).as_f64()
        }
        (JsValue::Boolean(_), _) => loose_equality(&JsValue::Number(to_number(left)), right),
        (_, JsValue::Boolean(_)) => loose_equality(left, &JsValue::Number(to_number(right))),
        _ => false,
    }
}

// ============================================================================
// Conversions
// ============================================================================

pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => {
            let f = n.as_f64();
            !(f == 0.0 || f.is_nan())
        }
        JsValue::String(s) => !s.is_empty(),
        JsValue::Json(_) | JsValue::Node(_) | JsValue::Native(_) => true,
    }
}

pub fn get_typeof_string(value: &JsValue) -> &'static str {
    match value {
        JsValue::Undefined => "undefined",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Null | JsValue::Json(_) | JsValue::Node(_) | JsValue::Native(_) => "object",
    }
}

pub fn to_number(value: &JsValue) -> JsNumberType {
    match value {
        JsValue::Undefined => JsNumberType::NaN,
        JsValue::Null | JsValue::Boolean(false) => JsNumberType::Integer(0),
        JsValue::Boolean(true) => JsNumberType::Integer(1),
        JsValue::Number(n) => n.clone(),
        JsValue::String(s) => string_to_number(s.trim()),
        JsValue::Json(_) | JsValue::Node(_) | JsValue::Native(_) => JsNumberType::NaN,
    }
}

fn string_to_number(s: &str) -> JsNumberType {
    match s {
        "" => JsNumberType::Integer(0),
        "Infinity" | "+Infinity" => JsNumberType::PositiveInfinity,
        "-Infinity" => JsNumberType::NegativeInfinity,
        _ if s.starts_with("0x") || s.starts_with("0X") => i64::from_str_radix(&s[2..], 16)
            .map(JsNumberType::Integer)
            .unwrap_or(JsNumberType::NaN),
        // Rust accepts "inf" and "nan" spellings that scripts do not.
        _ if !s.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) => JsNumberType::NaN,
        _ => s
            .parse::<f64>()
            .map(JsNumberType::from_f64)
            .unwrap_or(JsNumberType::NaN),
    }
}

pub fn to_string(value: &JsValue) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(f: f64) -> JsValue {
        JsValue::from_f64(f)
    }

    fn s(v: &str) -> JsValue {
        JsValue::String(v.to_string())
    }

    #[test]
    fn test_add_concatenates_when_a_string_is_involved() {
        assert_eq!(apply_binary_operator(BinaryOperator::Add, &s("a"), &num(1.0)), s("a1"));
        assert_eq!(apply_binary_operator(BinaryOperator::Add, &num(1.0), &num(2.5)), num(3.5));
        assert_eq!(
            apply_binary_operator(BinaryOperator::Add, &JsValue::Null, &JsValue::Boolean(true)),
            num(1.0)
        );
    }

    #[test]
    fn test_arithmetic_edge_cases() {
        assert_eq!(
            apply_binary_operator(BinaryOperator::Divide, &num(1.0), &num(0.0)),
            JsValue::Number(JsNumberType::PositiveInfinity)
        );
        assert_eq!(
            apply_binary_operator(BinaryOperator::Divide, &num(0.0), &num(0.0)),
            JsValue::Number(JsNumberType::NaN)
        );
        assert_eq!(apply_binary_operator(BinaryOperator::Modulo, &num(-7.0), &num(3.0)), num(-1.0));
        assert_eq!(apply_binary_operator(BinaryOperator::Divide, &num(7.0), &num(2.0)), num(3.5));
    }

    #[test]
    fn test_equality() {
        let nan = JsValue::Number(JsNumberType::NaN);
        assert_eq!(apply_binary_operator(BinaryOperator::StrictlyEqual, &nan, &nan), JsValue::Boolean(false));
        assert_eq!(
            apply_binary_operator(BinaryOperator::LooselyEqual, &s("1"), &num(1.0)),
            JsValue::Boolean(true)
        );
        assert_eq!(
            apply_binary_operator(BinaryOperator::LooselyEqual, &JsValue::Null, &JsValue::Undefined),
            JsValue::Boolean(true)
        );
        assert_eq!(
            apply_binary_operator(BinaryOperator::StrictlyEqual, &JsValue::Null, &JsValue::Undefined),
            JsValue::Boolean(false)
        );
        assert_eq!(
            apply_binary_operator(BinaryOperator::LooselyEqual, &JsValue::Boolean(true), &s("1")),
            JsValue::Boolean(true)
        );
        assert_eq!(
            apply_binary_operator(BinaryOperator::StrictlyEqual, &num(2.0), &JsValue::Number(JsNumberType::Float(2.0))),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn test_relational() {
        assert_eq!(apply_binary_operator(BinaryOperator::LessThan, &s("a"), &s("b")), JsValue::Boolean(true));
        assert_eq!(apply_binary_operator(BinaryOperator::LessThan, &s("10"), &num(9.0)), JsValue::Boolean(false));
        assert_eq!(
            apply_binary_operator(BinaryOperator::GreaterThanEqual, &JsValue::Undefined, &num(0.0)),
            JsValue::Boolean(false)
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(to_number(&s(" 42 ")), JsNumberType::Integer(42));
        assert_eq!(to_number(&s("0x1f")), JsNumberType::Integer(31));
        assert_eq!(to_number(&s("inf")), JsNumberType::NaN);
        assert_eq!(to_number(&s("1e3")), JsNumberType::Integer(1000));
        assert!(!to_boolean(&s("")));
        assert!(to_boolean(&JsValue::Json(serde_json::json!([]))));
        assert_eq!(get_typeof_string(&JsValue::Null), "object");
    }

    #[test]
    fn test_json_and_string_members() {
        let doc = serde_json::json!({"items": [1, "two"], "n": null});
        assert_eq!(json_member(&doc, "n"), JsValue::Null);
        assert_eq!(json_member(&doc["items"], "length"), num(2.0));
        assert_eq!(json_member(&doc["items"], "1"), s("two"));
        assert_eq!(json_member(&doc, "missing"), JsValue::Undefined);
        assert_eq!(string_member("héllo", "length"), num(5.0));
        assert_eq!(string_member("héllo", "1"), s("é"));
        assert_eq!(string_member("a😀b", "length"), num(4.0));
        assert_eq!(string_member("a😀b", "3"), s("b"));
        assert_eq!(string_member("a😀b", "1"), s("\u{fffd}"));
        assert_eq!(string_member("a😀b", "4"), JsValue::Undefined);
    }
}
