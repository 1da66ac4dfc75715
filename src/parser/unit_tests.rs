use super::api::Rule;
use super::api::ScriptParser;
use super::ast::*;

use pest::consumes_to;
use pest::parses_to;
use pest::Parser;

fn parse_single_expression(script: &str) -> ExpressionType {
    let program = ScriptParser::parse_to_ast_from_str(script).unwrap();
    assert_eq!(program.body.len(), 1, "expected a single statement");
    match program.body.into_iter().next().unwrap() {
        StatementType::ExpressionStatement { expression, .. } => *expression,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_integer_numeric_literal() {
    parses_to! {
        parser: ScriptParser,
        input: "10",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 2)
        ]
    };
}

#[test]
fn test_dot_member() {
    parses_to! {
        parser: ScriptParser,
        input: ".href",
        rule: Rule::dot_member,
        tokens: [
            dot_member(0, 5, [
                identifier_name(1, 5)
            ])
        ]
    };
}

#[test]
fn test_member_chain_tokens() {
    parses_to! {
        parser: ScriptParser,
        input: "window.location",
        rule: Rule::left_hand_side_expression,
        tokens: [
            left_hand_side_expression(0, 15, [
                primary_expression(0, 6, [
                    identifier(0, 6)
                ]),
                member_suffix(6, 15, [
                    dot_member(6, 15, [
                        identifier_name(7, 15)
                    ])
                ])
            ])
        ]
    };
}

#[test]
fn test_single_quoted_string() {
    parses_to! {
        parser: ScriptParser,
        input: "'hi'",
        rule: Rule::string_literal,
        tokens: [
            string_literal(0, 4, [
                single_string_characters(1, 3)
            ])
        ]
    };
}

#[test]
fn test_reserved_words_are_not_identifiers() {
    assert!(ScriptParser::parse(Rule::identifier, "var").is_err());
    assert!(ScriptParser::parse(Rule::identifier, "this").is_err());
    // A reserved word is still a valid member name.
    assert!(ScriptParser::parse(Rule::dot_member, ".if").is_ok());
}

#[test]
fn test_member_chain_call_sites() {
    let expr = parse_single_expression("window.location.href");
    let outer = match expr {
        ExpressionType::MemberExpression(m) => m,
        other => panic!("expected member expression, got {:?}", other),
    };
    match &outer {
        MemberExpressionType::SimpleMemberExpression {
            property,
            call_site,
            object,
            ..
        } => {
            assert_eq!(property.name, "href");
            assert_eq!(
                *call_site,
                CallSite {
                    line: 1,
                    column: 17,
                    width: 4
                }
            );
            match object.as_ref() {
                ExpressionType::MemberExpression(MemberExpressionType::SimpleMemberExpression {
                    property,
                    call_site,
                    ..
                }) => {
                    assert_eq!(property.name, "location");
                    assert_eq!(
                        *call_site,
                        CallSite {
                            line: 1,
                            column: 8,
                            width: 8
                        }
                    );
                }
                other => panic!("expected inner member expression, got {:?}", other),
            }
        }
        other => panic!("expected simple member expression, got {:?}", other),
    }
}

#[test]
fn test_computed_member_call_site_points_after_bracket() {
    let expr = parse_single_expression("document['title'].length");
    match expr {
        ExpressionType::MemberExpression(MemberExpressionType::SimpleMemberExpression {
            object,
            ..
        }) => match *object {
            ExpressionType::MemberExpression(
                MemberExpressionType::ComputedMemberExpression { call_site, .. },
            ) => {
                assert_eq!(
                    call_site,
                    CallSite {
                        line: 1,
                        column: 18,
                        width: 0
                    }
                );
            }
            other => panic!("expected computed member, got {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_member_assignment() {
    let expr = parse_single_expression("window.document.title = \"hi\"");
    match expr {
        ExpressionType::AssignmentExpression {
            operator,
            left,
            right,
            ..
        } => {
            assert_eq!(operator, AssignmentOperator::Equals);
            assert!(matches!(*left, ExpressionType::MemberExpression(_)));
            match *right {
                ExpressionType::Literal(LiteralData {
                    value: LiteralType::StringLiteral(ref s),
                    ..
                }) => assert_eq!(s, "hi"),
                ref other => panic!("expected string literal, got {:?}", other),
            }
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_binary_precedence() {
    let expr = parse_single_expression("1 + 2 * 3 === 7");
    match expr {
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::StrictlyEqual,
            left,
            ..
        } => match *left {
            ExpressionType::BinaryExpression {
                operator: BinaryOperator::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                ExpressionType::BinaryExpression {
                    operator: BinaryOperator::Multiply,
                    ..
                }
            )),
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_statements_without_semicolons() {
    let program = ScriptParser::parse_to_ast_from_str(
        "var a = 1\nlet b = a\n// note\nif (a) { b = 2 } else b = 3\nthrow 'x'",
    )
    .unwrap();
    assert_eq!(program.body.len(), 4);
    assert!(matches!(
        program.body[0],
        StatementType::DeclarationStatement(VariableDeclarationData {
            kind: VariableDeclarationKind::Var,
            ..
        })
    ));
    assert!(matches!(program.body[2], StatementType::IfStatement { .. }));
    assert!(matches!(program.body[3], StatementType::ThrowStatement { .. }));
}

#[test]
fn test_invalid_assignment_target() {
    assert!(ScriptParser::parse_to_ast_from_str("1 = 2").is_err());
    assert!(ScriptParser::parse_to_ast_from_str("const x;").is_err());
}
