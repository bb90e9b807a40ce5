//! Type parsing.
//!
//! Grammar: `'&'? base ('[]' | '[N]' | '*')* '?'?` where base is a keyword
//! type, a function type or an identifier (resolved later).

use super::Parser;
use crate::ast::{NumberKind, TypeExpr, TypeExprKind};
use crate::token::TokenKind;

pub fn parse_type(parser: &mut Parser) -> Option<TypeExpr> {
    let span = parser.current_span();

    let is_ref = if parser.at(&TokenKind::Amp) {
        parser.eat();
        true
    } else {
        false
    };

    let base_span = parser.current_span();
    let mut ty = match parser.current().clone() {
        TokenKind::KwVoid => {
            parser.eat();
            TypeExpr::new(TypeExprKind::Void, base_span)
        }
        TokenKind::KwBool => {
            parser.eat();
            TypeExpr::new(TypeExprKind::Bool, base_span)
        }
        TokenKind::KwErr => {
            parser.eat();
            TypeExpr::new(TypeExprKind::Error, base_span)
        }
        TokenKind::TyI(bits) => {
            parser.eat();
            TypeExpr::new(
                TypeExprKind::Number {
                    kind: NumberKind::Signed,
                    bits,
                },
                base_span,
            )
        }
        TokenKind::TyU(bits) => {
            parser.eat();
            TypeExpr::new(
                TypeExprKind::Number {
                    kind: NumberKind::Unsigned,
                    bits,
                },
                base_span,
            )
        }
        TokenKind::TyF(bits) => {
            parser.eat();
            TypeExpr::new(
                TypeExprKind::Number {
                    kind: NumberKind::Float,
                    bits,
                },
                base_span,
            )
        }
        TokenKind::KwFn => parse_function_type(parser)?,
        TokenKind::Ident(name) => {
            parser.eat();
            let generic_args = if parser.at(&TokenKind::Less) {
                parser.parse_list(
                    (&TokenKind::Less, "expected '<'"),
                    (&TokenKind::Greater, "expected '>'"),
                    parse_type,
                )?
            } else {
                Vec::new()
            };
            TypeExpr::new(TypeExprKind::Named { name, generic_args }, base_span)
        }
        _ => return parser.report(base_span, "expected type specifier"),
    };

    loop {
        match parser.current() {
            TokenKind::BracketL => {
                parser.eat();
                match parser.current().clone() {
                    TokenKind::BracketR => {
                        parser.eat();
                        ty = TypeExpr::new(TypeExprKind::Slice(Box::new(ty)), span);
                    }
                    TokenKind::IntLit(len) if len >= 0 => {
                        parser.eat();
                        parser.expect(&TokenKind::BracketR, "expected ']' in array type")?;
                        ty = TypeExpr::new(
                            TypeExprKind::Array {
                                elem: Box::new(ty),
                                len: len as u64,
                            },
                            span,
                        );
                    }
                    _ => {
                        let loc = parser.current_span();
                        return parser.report(loc, "expected ']' or array length in type");
                    }
                }
            }
            TokenKind::Star => {
                parser.eat();
                ty = TypeExpr::new(TypeExprKind::Pointer(Box::new(ty)), span);
            }
            _ => break,
        }
    }

    if parser.at(&TokenKind::Question) {
        parser.eat();
        ty = TypeExpr::new(TypeExprKind::Optional(Box::new(ty)), span);
    }

    if is_ref {
        ty = TypeExpr::new(TypeExprKind::Ref(Box::new(ty)), span);
    }

    Some(ty)
}

fn parse_function_type(parser: &mut Parser) -> Option<TypeExpr> {
    let span = parser.current_span();
    parser.eat(); // 'fn'

    let params = parser.parse_list(
        (&TokenKind::ParenL, "expected '(' in function type"),
        (&TokenKind::ParenR, "expected ')' in function type"),
        parse_type,
    )?;

    parser.expect(&TokenKind::ReturnArrow, "expected '->' in function type")?;
    let ret = parse_type(parser)?;

    Some(TypeExpr::new(
        TypeExprKind::Function {
            params,
            ret: Box::new(ret),
        },
        span,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagnosticEngine;
    use crate::lexer::Lexer;
    use crate::source::FileId;

    fn parse(source: &str) -> Option<TypeExpr> {
        let mut diags = DiagnosticEngine::new();
        let (tokens, _) = Lexer::new(source, FileId(0)).tokenize();
        let mut parser = Parser::new(tokens, &mut diags);
        parse_type(&mut parser)
    }

    #[test]
    fn parses_primitives() {
        assert_eq!(parse("void").unwrap().name(), "void");
        assert_eq!(parse("i32").unwrap().name(), "i32");
        assert_eq!(parse("u8").unwrap().name(), "u8");
        assert_eq!(parse("f64").unwrap().name(), "f64");
        assert_eq!(parse("bool").unwrap().name(), "bool");
    }

    #[test]
    fn parses_suffixes() {
        assert_eq!(parse("i32[]").unwrap().name(), "i32[]");
        assert_eq!(parse("i32[4]").unwrap().name(), "i32[4]");
        assert_eq!(parse("Point*").unwrap().name(), "Point*");
        assert_eq!(parse("i32?").unwrap().name(), "i32?");
        assert_eq!(parse("&Point").unwrap().name(), "&Point");
        assert_eq!(parse("u8[16]*?").unwrap().name(), "u8[16]*?");
    }

    #[test]
    fn parses_generic_named_type() {
        assert_eq!(parse("Vec<i32>").unwrap().name(), "Vec<i32>");
    }

    #[test]
    fn parses_function_type() {
        assert_eq!(
            parse("fn(i32, bool) -> void").unwrap().name(),
            "fn(i32,bool) -> void"
        );
    }

    #[test]
    fn rejects_non_type() {
        assert!(parse("42").is_none());
    }
}
