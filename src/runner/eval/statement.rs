//! Statement execution.

use crate::parser::ast::{
    ExpressionType, StatementType, VariableDeclarationData, VariableDeclarationKind,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

use super::expression::{evaluate_expression, to_boolean};
use super::types::{Completion, EvalResult};

/// Execute a statement and return its completion.
pub fn execute_statement(stmt: &StatementType, ctx: &mut EvalContext) -> EvalResult {
    match stmt {
        StatementType::EmptyStatement { .. } => Ok(Completion::normal()),

        StatementType::ExpressionStatement { expression, .. } => {
            let value = evaluate_expression(expression, ctx)?;
            Ok(Completion::normal_with_value(value))
        }

        StatementType::BlockStatement { body, .. } => execute_block_statement(body, ctx),

        StatementType::DeclarationStatement(decl) => execute_variable_declaration(decl, ctx),

        StatementType::IfStatement {
            test,
            consequent,
            alternate,
            ..
        } => execute_if_statement(test, consequent, alternate.as_deref(), ctx),

        StatementType::ThrowStatement { argument, .. } => {
            let value = evaluate_expression(argument, ctx)?;
            Err(JErrorType::Thrown(value))
        }
    }
}

/// Statements in order; the value is the last one produced.
pub fn execute_statement_list(body: &[StatementType], ctx: &mut EvalContext) -> EvalResult {
    let mut last = Completion::normal();
    for stmt in body {
        let completion = execute_statement(stmt, ctx)?;
        last = completion.update_empty(last.value);
    }
    Ok(last)
}

fn execute_block_statement(body: &[StatementType], ctx: &mut EvalContext) -> EvalResult {
    ctx.push_scope();
    let result = execute_statement_list(body, ctx);
    ctx.pop_scope();
    result
}

fn execute_variable_declaration(decl: &VariableDeclarationData, ctx: &mut EvalContext) -> EvalResult {
    for declarator in &decl.declarations {
        let name = &declarator.id.name;
        let value = match &declarator.init {
            Some(init) => Some(evaluate_expression(init, ctx)?),
            None => None,
        };
        match decl.kind {
            VariableDeclarationKind::Var => ctx.declare_var(name, value)?,
            VariableDeclarationKind::Let => {
                ctx.declare_lexical(name, value.unwrap_or(JsValue::Undefined), true)?
            }
            VariableDeclarationKind::Const => {
                let value = value.ok_or_else(|| {
                    JErrorType::SyntaxError(format!("Missing initializer in const declaration '{}'", name))
                })?;
                ctx.declare_lexical(name, value, false)?
            }
        }
    }
    Ok(Completion::normal())
}

fn execute_if_statement(
    test: &ExpressionType,
    consequent: &StatementType,
    alternate: Option<&StatementType>,
    ctx: &mut EvalContext,
) -> EvalResult {
    let test_val = evaluate_expression(test, ctx)?;
    if to_boolean(&test_val) {
        execute_statement(consequent, ctx)
    } else if let Some(alt) = alternate {
        execute_statement(alt, ctx)
    } else {
        Ok(Completion::normal())
    }
}
