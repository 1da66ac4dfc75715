use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};
use pest::{Parser, Span};
use pest_derive::Parser;

use super::ast::*;
use super::util::{line_col, unescape_string};

#[derive(Parser)]
#[grammar = "parser/script_grammar.pest"] // relative to src
pub struct ScriptParser;

const TAB_WIDTH: usize = 2;

pub type ParseResult<T> = Result<T, Error<Rule>>;

impl ScriptParser {
    pub fn parse_to_ast_from_str(script: &str) -> ParseResult<ProgramData> {
        let mut pairs = ScriptParser::parse(Rule::script, script)?;
        let script_pair = pairs.next().ok_or_else(|| {
            custom_error("Empty parse result".to_string(), Span::new(script, 0, 0))
        })?;
        AstBuilder { script }.build_program(script_pair)
    }

    /// Renders the token tree of a script, one rule per line. Used for
    /// debugging grammar issues.
    pub fn parse_to_token_tree(script: &str) -> ParseResult<String> {
        let pairs = ScriptParser::parse(Rule::script, script)?;
        let mut tree = vec![];
        for pair in pairs {
            tree.push(pair_to_string(pair, 0).join("\n"));
        }
        Ok(tree.join("\n"))
    }
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    tree.push(format!(
        "{}{:?} => ({},{}) #{:?}",
        " ".repeat(level * TAB_WIDTH),
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    ));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

fn custom_error(message: String, span: Option<Span>) -> Error<Rule> {
    match span {
        Some(span) => Error::new_from_span(ErrorVariant::CustomError { message }, span),
        None => Error::new_from_pos(
            ErrorVariant::CustomError { message },
            pest::Position::from_start(""),
        ),
    }
}

fn get_unexpected_error(id: i32, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    Meta {
        start_index: span.start(),
        end_index: span.end(),
    }
}

fn expect_next<'i>(pairs: &mut Pairs<'i, Rule>, parent: Span<'i>, id: i32) -> ParseResult<Pair<'i, Rule>> {
    pairs.next().ok_or_else(|| {
        custom_error(format!("Missing child node - {}", id), Some(parent))
    })
}

struct AstBuilder<'s> {
    script: &'s str,
}

impl<'s> AstBuilder<'s> {
    fn build_program(&self, pair: Pair<Rule>) -> ParseResult<ProgramData> {
        let meta = get_meta(&pair);
        let mut body = vec![];
        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::statement => body.push(self.build_statement(inner_pair)?),
                Rule::EOI => { /* Do nothing */ }
                _ => return Err(get_unexpected_error(1, &inner_pair)),
            }
        }
        Ok(ProgramData { meta, body })
    }

    fn build_statement(&self, pair: Pair<Rule>) -> ParseResult<StatementType> {
        let span = pair.as_span();
        let inner_pair = expect_next(&mut pair.into_inner(), span, 2)?;
        let meta = get_meta(&inner_pair);
        let inner_span = inner_pair.as_span();
        Ok(match inner_pair.as_rule() {
            Rule::variable_statement => {
                StatementType::DeclarationStatement(self.build_variable_statement(inner_pair)?)
            }
            Rule::block_statement => {
                let mut body = vec![];
                for statement_pair in inner_pair.into_inner() {
                    body.push(self.build_statement(statement_pair)?);
                }
                StatementType::BlockStatement { meta, body }
            }
            Rule::if_statement => {
                let mut inner_iter = inner_pair.into_inner();
                // if_keyword
                expect_next(&mut inner_iter, inner_span, 3)?;
                let test = self.build_expression(expect_next(&mut inner_iter, inner_span, 4)?)?;
                let consequent =
                    self.build_statement(expect_next(&mut inner_iter, inner_span, 5)?)?;
                let alternate = match inner_iter.next() {
                    Some(_else_keyword) => Some(Box::new(
                        self.build_statement(expect_next(&mut inner_iter, inner_span, 6)?)?,
                    )),
                    None => None,
                };
                StatementType::IfStatement {
                    meta,
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate,
                }
            }
            Rule::throw_statement => {
                let mut inner_iter = inner_pair.into_inner();
                // throw_keyword
                expect_next(&mut inner_iter, inner_span, 7)?;
                let argument = self.build_expression(expect_next(&mut inner_iter, inner_span, 8)?)?;
                StatementType::ThrowStatement {
                    meta,
                    argument: Box::new(argument),
                }
            }
            Rule::empty_statement => StatementType::EmptyStatement { meta },
            Rule::expression_statement => {
                let expression =
                    self.build_expression(expect_next(&mut inner_pair.into_inner(), inner_span, 9)?)?;
                StatementType::ExpressionStatement {
                    meta,
                    expression: Box::new(expression),
                }
            }
            _ => return Err(get_unexpected_error(10, &inner_pair)),
        })
    }

    fn build_variable_statement(&self, pair: Pair<Rule>) -> ParseResult<VariableDeclarationData> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner_iter = pair.into_inner();
        let kind_pair = expect_next(&mut inner_iter, span, 11)?;
        let kind = match kind_pair.as_str() {
            "var" => VariableDeclarationKind::Var,
            "let" => VariableDeclarationKind::Let,
            "const" => VariableDeclarationKind::Const,
            _ => return Err(get_unexpected_error(12, &kind_pair)),
        };
        let mut declarations = vec![];
        for declaration_pair in inner_iter {
            let declarator_meta = get_meta(&declaration_pair);
            let declarator_span = declaration_pair.as_span();
            let mut declarator_iter = declaration_pair.into_inner();
            let binding_pair = expect_next(&mut declarator_iter, declarator_span, 13)?;
            let id = IdentifierData {
                name: binding_pair.as_str().to_string(),
                meta: get_meta(&binding_pair),
            };
            let init = match declarator_iter.next() {
                Some(init_pair) => Some(Box::new(self.build_expression(init_pair)?)),
                None => None,
            };
            if kind == VariableDeclarationKind::Const && init.is_none() {
                return Err(custom_error(
                    "Missing initializer in const declaration".to_string(),
                    Some(declarator_span),
                ));
            }
            declarations.push(VariableDeclaratorData {
                meta: declarator_meta,
                id,
                init,
            });
        }
        Ok(VariableDeclarationData {
            meta,
            kind,
            declarations,
        })
    }

    fn build_expression(&self, pair: Pair<Rule>) -> ParseResult<ExpressionType> {
        let span = pair.as_span();
        match pair.as_rule() {
            Rule::expression | Rule::primary_expression => {
                self.build_expression(expect_next(&mut pair.into_inner(), span, 14)?)
            }
            Rule::assignment_expression => self.build_assignment_expression(pair),
            Rule::logical_or_expression
            | Rule::logical_and_expression
            | Rule::equality_expression
            | Rule::relational_expression
            | Rule::additive_expression
            | Rule::multiplicative_expression => self.build_binary_chain(pair),
            Rule::unary_expression => self.build_unary_expression(pair),
            Rule::left_hand_side_expression => self.build_left_hand_side_expression(pair),
            Rule::this_keyword => Ok(ExpressionType::ThisExpression {
                meta: get_meta(&pair),
            }),
            Rule::identifier => Ok(ExpressionType::Identifier(IdentifierData {
                name: pair.as_str().to_string(),
                meta: get_meta(&pair),
            })),
            Rule::literal => self.build_literal(pair),
            _ => Err(get_unexpected_error(15, &pair)),
        }
    }

    fn build_assignment_expression(&self, pair: Pair<Rule>) -> ParseResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner_iter = pair.into_inner();
        let first = expect_next(&mut inner_iter, span, 16)?;
        let operator_pair = match inner_iter.next() {
            Some(p) => p,
            None => return self.build_expression(first),
        };
        let operator = match operator_pair.as_str() {
            "=" => AssignmentOperator::Equals,
            "+=" => AssignmentOperator::AddEquals,
            _ => return Err(get_unexpected_error(17, &operator_pair)),
        };
        let left = self.build_expression(first)?;
        match left {
            ExpressionType::Identifier(_) | ExpressionType::MemberExpression(_) => {}
            _ => {
                return Err(custom_error(
                    "Invalid left-hand side in assignment".to_string(),
                    Some(span),
                ))
            }
        }
        let right = self.build_expression(expect_next(&mut inner_iter, span, 18)?)?;
        Ok(ExpressionType::AssignmentExpression {
            meta,
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Folds `operand (operator operand)*` into a left-associative tree.
    fn build_binary_chain(&self, pair: Pair<Rule>) -> ParseResult<ExpressionType> {
        let span = pair.as_span();
        let mut inner_iter = pair.into_inner();
        let mut left = self.build_expression(expect_next(&mut inner_iter, span, 19)?)?;
        while let Some(operator_pair) = inner_iter.next() {
            let right = self.build_expression(expect_next(&mut inner_iter, span, 20)?)?;
            let meta = Meta {
                start_index: left.get_meta().start_index,
                end_index: right.get_meta().end_index,
            };
            let (left_box, right_box) = (Box::new(left), Box::new(right));
            left = match operator_pair.as_rule() {
                Rule::logical_or_operator => ExpressionType::LogicalExpression {
                    meta,
                    operator: LogicalOperator::Or,
                    left: left_box,
                    right: right_box,
                },
                Rule::logical_and_operator => ExpressionType::LogicalExpression {
                    meta,
                    operator: LogicalOperator::And,
                    left: left_box,
                    right: right_box,
                },
                _ => ExpressionType::BinaryExpression {
                    meta,
                    operator: get_binary_operator(&operator_pair)?,
                    left: left_box,
                    right: right_box,
                },
            };
        }
        Ok(left)
    }

    fn build_unary_expression(&self, pair: Pair<Rule>) -> ParseResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let mut inner_iter = pair.into_inner();
        let first = expect_next(&mut inner_iter, span, 21)?;
        if first.as_rule() != Rule::unary_operator {
            return self.build_expression(first);
        }
        let operator = match first.as_str() {
            "!" => UnaryOperator::LogicalNot,
            "-" => UnaryOperator::Minus,
            "typeof" => UnaryOperator::TypeOf,
            _ => return Err(get_unexpected_error(22, &first)),
        };
        let argument = self.build_expression(expect_next(&mut inner_iter, span, 23)?)?;
        Ok(ExpressionType::UnaryExpression {
            meta,
            operator,
            argument: Box::new(argument),
        })
    }

    fn build_left_hand_side_expression(&self, pair: Pair<Rule>) -> ParseResult<ExpressionType> {
        let span = pair.as_span();
        let mut inner_iter = pair.into_inner();
        let mut object = self.build_expression(expect_next(&mut inner_iter, span, 24)?)?;
        for suffix_pair in inner_iter {
            let meta = Meta {
                start_index: object.get_meta().start_index,
                end_index: suffix_pair.as_span().end(),
            };
            let suffix_span = suffix_pair.as_span();
            object = match suffix_pair.as_rule() {
                Rule::member_suffix => {
                    let member_pair = expect_next(&mut suffix_pair.into_inner(), suffix_span, 25)?;
                    self.build_member_expression(member_pair, object, meta)?
                }
                Rule::call_suffix => {
                    let mut arguments = vec![];
                    for argument_pair in suffix_pair.into_inner() {
                        arguments.push(self.build_expression(argument_pair)?);
                    }
                    ExpressionType::CallExpression {
                        meta,
                        callee: Box::new(object),
                        arguments,
                    }
                }
                _ => return Err(get_unexpected_error(26, &suffix_pair)),
            };
        }
        Ok(object)
    }

    fn build_member_expression(
        &self,
        pair: Pair<Rule>,
        object: ExpressionType,
        meta: Meta,
    ) -> ParseResult<ExpressionType> {
        let span = pair.as_span();
        Ok(ExpressionType::MemberExpression(match pair.as_rule() {
            Rule::dot_member => {
                let name_pair = expect_next(&mut pair.into_inner(), span, 27)?;
                let (line, column) = line_col(self.script, name_pair.as_span().start());
                let name = name_pair.as_str().to_string();
                MemberExpressionType::SimpleMemberExpression {
                    meta,
                    object: Box::new(object),
                    call_site: CallSite {
                        line,
                        column,
                        width: name.chars().count(),
                    },
                    property: IdentifierData {
                        name,
                        meta: get_meta(&name_pair),
                    },
                }
            }
            Rule::computed_member => {
                // The continuation of a computed access is whatever follows `]`.
                let (line, column) = line_col(self.script, span.end());
                let property =
                    self.build_expression(expect_next(&mut pair.into_inner(), span, 28)?)?;
                MemberExpressionType::ComputedMemberExpression {
                    meta,
                    object: Box::new(object),
                    property: Box::new(property),
                    call_site: CallSite {
                        line,
                        column,
                        width: 0,
                    },
                }
            }
            _ => return Err(get_unexpected_error(29, &pair)),
        }))
    }

    fn build_literal(&self, pair: Pair<Rule>) -> ParseResult<ExpressionType> {
        let meta = get_meta(&pair);
        let span = pair.as_span();
        let inner_pair = expect_next(&mut pair.into_inner(), span, 30)?;
        let value = match inner_pair.as_rule() {
            Rule::null_literal => LiteralType::NullLiteral,
            Rule::boolean_literal => LiteralType::BooleanLiteral(inner_pair.as_str() == "true"),
            Rule::numeric_literal => {
                LiteralType::NumberLiteral(get_number_literal(&inner_pair)?)
            }
            Rule::string_literal => {
                let inner_span = inner_pair.as_span();
                let characters = expect_next(&mut inner_pair.into_inner(), inner_span, 31)?;
                let s = unescape_string(characters.as_str())
                    .map_err(|message| custom_error(message, Some(characters.as_span())))?;
                LiteralType::StringLiteral(s)
            }
            _ => return Err(get_unexpected_error(32, &inner_pair)),
        };
        Ok(ExpressionType::Literal(LiteralData { meta, value }))
    }
}

fn get_binary_operator(pair: &Pair<Rule>) -> ParseResult<BinaryOperator> {
    Ok(match pair.as_str() {
        "==" => BinaryOperator::LooselyEqual,
        "!=" => BinaryOperator::LooselyUnequal,
        "===" => BinaryOperator::StrictlyEqual,
        "!==" => BinaryOperator::StrictlyUnequal,
        "<" => BinaryOperator::LessThan,
        "<=" => BinaryOperator::LessThanEqual,
        ">" => BinaryOperator::GreaterThan,
        ">=" => BinaryOperator::GreaterThanEqual,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Modulo,
        _ => return Err(get_unexpected_error(33, pair)),
    })
}

fn get_number_literal(pair: &Pair<Rule>) -> ParseResult<NumberLiteralType> {
    let text = pair.as_str();
    if !text.contains(|c: char| c == '.' || c == 'e' || c == 'E') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(NumberLiteralType::IntegerLiteral(i));
        }
    }
    text.parse::<f64>()
        .map(NumberLiteralType::FloatLiteral)
        .map_err(|e| custom_error(format!("Invalid number literal: {}", e), Some(pair.as_span())))
}
