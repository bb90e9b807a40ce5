//! Expression parsing: Pratt-style precedence climbing over a prefix /
//! postfix / primary split.

use super::types::parse_type;
use super::{decl, Parser};
use crate::ast::*;
use crate::token::TokenKind;

pub fn parse_expr(parser: &mut Parser) -> Option<Expr> {
    let lhs = parse_prefix_expr(parser)?;
    parse_expr_tail(parser, lhs)
}

/// Binary climb plus the loose `..` and `orelse` tails.
pub fn parse_expr_tail(parser: &mut Parser, lhs: Expr) -> Option<Expr> {
    let mut expr = parse_expr_rhs(parser, lhs, 0)?;

    if parser.at(&TokenKind::DotDot) {
        let span = parser.current_span();
        parser.eat();
        let end_lhs = parse_prefix_expr(parser)?;
        let end = parse_expr_rhs(parser, end_lhs, 0)?;
        expr = Expr::Range(RangeExpr {
            start: Box::new(expr),
            end: Box::new(end),
            span,
        });
    }

    if parser.at(&TokenKind::KwOrElse) {
        let span = parser.current_span();
        parser.eat();
        // Right-associative: the fallback swallows the rest.
        let fallback = parse_expr(parser)?;
        expr = Expr::OrElse(OrElseExpr {
            inner: Box::new(expr),
            fallback: Box::new(fallback),
            span,
        });
    }

    Some(expr)
}

fn precedence(kind: &TokenKind) -> i32 {
    match kind {
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 6,
        TokenKind::Plus | TokenKind::Minus => 5,
        TokenKind::Less | TokenKind::Greater | TokenKind::LessEq | TokenKind::GreaterEq => 4,
        TokenKind::EqualEqual | TokenKind::BangEqual => 3,
        TokenKind::AmpAmp => 2,
        TokenKind::PipePipe => 1,
        _ => -1,
    }
}

fn binary_op(kind: &TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::LessEq => BinaryOp::Le,
        TokenKind::GreaterEq => BinaryOp::Ge,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::Ne,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        _ => unreachable!("not a binary operator"),
    }
}

fn parse_expr_rhs(parser: &mut Parser, mut lhs: Expr, min_prec: i32) -> Option<Expr> {
    loop {
        let cur_prec = precedence(parser.current());
        if cur_prec < min_prec {
            return Some(lhs);
        }

        let op_span = parser.current_span();
        let op = binary_op(parser.current());
        parser.eat();

        let mut rhs = parse_prefix_expr(parser)?;
        if cur_prec < precedence(parser.current()) {
            rhs = parse_expr_rhs(parser, rhs, cur_prec + 1)?;
        }

        lhs = Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span: op_span,
        });
    }
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Option<Expr> {
    let span = parser.current_span();
    let kind = parser.current().clone();

    match kind {
        TokenKind::Minus => {
            parser.eat();
            let operand = parse_prefix_expr(parser)?;
            Some(Expr::Unary(UnaryExpr {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
                span,
            }))
        }
        TokenKind::Bang => {
            parser.eat();
            let operand = parse_prefix_expr(parser)?;
            Some(Expr::Unary(UnaryExpr {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                span,
            }))
        }
        TokenKind::Amp => {
            parser.eat();
            let inner = parse_prefix_expr(parser)?;
            Some(Expr::Ref(RefExpr {
                inner: Box::new(inner),
                span,
            }))
        }
        TokenKind::Star => {
            parser.eat();
            let inner = parse_prefix_expr(parser)?;
            Some(Expr::Deref(DerefExpr {
                inner: Box::new(inner),
                span,
            }))
        }
        _ => parse_postfix_expr(parser),
    }
}

fn parse_postfix_expr(parser: &mut Parser) -> Option<Expr> {
    let mut expr = parse_primary(parser)?;

    loop {
        match parser.current() {
            TokenKind::BracketL => {
                let span = parser.current_span();
                parser.eat();
                let index = parser.with_no_restrictions(parse_expr)?;
                parser.expect(&TokenKind::BracketR, "expected ']'")?;
                expr = Expr::ArrayAt(ArrayAtExpr {
                    array: Box::new(expr),
                    index: Box::new(index),
                    span,
                });
            }
            TokenKind::ParenL => {
                let span = parser.current_span();
                let args = parser.with_no_restrictions(|p| {
                    p.parse_list(
                        (&TokenKind::ParenL, "expected '('"),
                        (&TokenKind::ParenR, "expected ')'"),
                        parse_expr,
                    )
                })?;
                expr = Expr::Call(CallExpr {
                    callee: Box::new(expr),
                    generic_args: Vec::new(),
                    args,
                    span,
                });
            }
            TokenKind::Less if parser.generic_args_ahead(&TokenKind::ParenL) => {
                let span = parser.current_span();
                let generic_args = parser.parse_list(
                    (&TokenKind::Less, "expected '<'"),
                    (&TokenKind::Greater, "expected '>'"),
                    parse_type,
                )?;
                let args = parser.with_no_restrictions(|p| {
                    p.parse_list(
                        (&TokenKind::ParenL, "expected '('"),
                        (&TokenKind::ParenR, "expected ')'"),
                        parse_expr,
                    )
                })?;
                expr = Expr::Call(CallExpr {
                    callee: Box::new(expr),
                    generic_args,
                    args,
                    span,
                });
            }
            TokenKind::Dot => {
                let span = parser.current_span();
                parser.eat();
                let (field, _) = parser.expect_ident("expected field identifier")?;
                expr = Expr::Member(MemberExpr {
                    base: Box::new(expr),
                    field,
                    span,
                });
            }
            _ => break,
        }
    }

    // `Name?` — reference to a declared error constant.
    if parser.at(&TokenKind::Question) {
        let span = parser.current_span();
        if let Expr::DeclRef(declref) = &expr {
            let name = declref.name.clone();
            parser.eat();
            expr = Expr::ErrRef(ErrRefExpr { name, span });
        } else {
            return parser.report(span, "expected identifier before '?'");
        }
    }

    // `e!` — unwrap.
    if parser.at(&TokenKind::Bang) {
        let span = parser.current_span();
        parser.eat();
        expr = Expr::Unwrap(UnwrapExpr {
            inner: Box::new(expr),
            span,
        });
    }

    Some(expr)
}

fn parse_primary(parser: &mut Parser) -> Option<Expr> {
    let span = parser.current_span();

    match parser.current().clone() {
        TokenKind::ParenL => {
            parser.eat();
            let inner = parser.with_no_restrictions(parse_expr)?;
            parser.expect(&TokenKind::ParenR, "expected ')'")?;
            Some(Expr::Group(GroupExpr {
                inner: Box::new(inner),
                span,
            }))
        }
        TokenKind::IntLit(value) => {
            parser.eat();
            Some(Expr::IntLit(IntLit { value, span }))
        }
        TokenKind::FloatLit(value) => {
            parser.eat();
            Some(Expr::FloatLit(FloatLit { value, span }))
        }
        TokenKind::CharLit(value) => {
            parser.eat();
            Some(Expr::CharLit(CharLit { value, span }))
        }
        TokenKind::KwTrue | TokenKind::KwFalse => {
            let value = parser.at(&TokenKind::KwTrue);
            parser.eat();
            Some(Expr::BoolLit(BoolLit { value, span }))
        }
        TokenKind::StrLit(value) => {
            parser.eat();
            Some(Expr::StrLit(StrLit { value, span }))
        }
        TokenKind::KwNull => {
            parser.eat();
            Some(Expr::NullLit(span))
        }
        TokenKind::Ident(name) => {
            parser.eat();

            // `A::B::x` — module-qualified path.
            if parser.at(&TokenKind::ColonColon) {
                let mut segments = vec![name];
                while parser.at(&TokenKind::ColonColon) {
                    parser.eat();
                    let (segment, _) = parser.expect_ident("expected identifier after '::'")?;
                    segments.push(segment);
                }
                return Some(Expr::ModulePath(ModulePathExpr { segments, span }));
            }

            let struct_init_ahead = !parser.restrictions().struct_not_allowed
                && (parser.at(&TokenKind::BraceL)
                    || parser.generic_args_ahead(&TokenKind::BraceL));
            if struct_init_ahead {
                let generic_args = if parser.at(&TokenKind::Less) {
                    parser.parse_list(
                        (&TokenKind::Less, "expected '<'"),
                        (&TokenKind::Greater, "expected '>'"),
                        parse_type,
                    )?
                } else {
                    Vec::new()
                };

                let fields = parser.parse_list(
                    (&TokenKind::BraceL, "expected '{'"),
                    (&TokenKind::BraceR, "expected '}'"),
                    parse_field_init,
                )?;

                return Some(Expr::StructInit(StructInitExpr {
                    name,
                    generic_args,
                    fields,
                    span,
                }));
            }

            Some(Expr::DeclRef(DeclRefExpr { name, span }))
        }
        TokenKind::Dot => {
            parser.eat();
            let (field, _) = parser.expect_ident("expected field identifier after '.'")?;
            Some(Expr::SelfMember(SelfMemberExpr { field, span }))
        }
        TokenKind::BraceL => {
            let elems = parser.parse_list(
                (&TokenKind::BraceL, "expected '{'"),
                (&TokenKind::BraceR, "expected '}'"),
                parse_expr,
            )?;
            Some(Expr::ArrayInit(ArrayInitExpr { elems, span }))
        }
        TokenKind::At => {
            parser.eat();
            let (name, _) = parser.expect_ident("expected error identifier after '@'")?;
            Some(Expr::ErrorInPlace(ErrorInPlaceExpr { name, span }))
        }
        TokenKind::KwCatch => {
            parser.eat();
            let inner = parse_expr(parser)?;
            Some(Expr::Catch(CatchExpr {
                inner: Box::new(inner),
                span,
            }))
        }
        TokenKind::KwTry => {
            parser.eat();
            let inner = parse_expr(parser)?;
            Some(Expr::Try(TryExpr {
                inner: Box::new(inner),
                span,
            }))
        }
        TokenKind::KwSizeof => {
            parser.eat();
            parser.expect(&TokenKind::ParenL, "expected '(' after 'sizeof'")?;
            let ty = parse_type(parser)?;
            parser.expect(&TokenKind::ParenR, "expected ')'")?;
            Some(Expr::Sizeof(SizeofExpr { ty, span }))
        }
        TokenKind::KwErr => {
            parser.eat();
            let errors = parser.parse_list(
                (&TokenKind::BraceL, "expected '{'"),
                (&TokenKind::BraceR, "expected '}'"),
                decl::parse_err_decl,
            )?;
            Some(Expr::ErrGroup(ErrGroupExpr { errors, span }))
        }
        TokenKind::KwImport => {
            parser.eat();
            let mut path = Vec::new();
            let (first, _) = parser.expect_ident("expected identifier after 'import'")?;
            path.push(first);
            while parser.at(&TokenKind::ColonColon) {
                parser.eat();
                let (segment, _) = parser.expect_ident("expected identifier after '::'")?;
                path.push(segment);
            }
            Some(Expr::Import(ImportExpr { path, span }))
        }
        _ => parser.report(span, "expected expression"),
    }
}

fn parse_field_init(parser: &mut Parser) -> Option<FieldInit> {
    let span = parser.current_span();
    let (name, _) = parser.expect_ident("expected field initialization")?;
    parser.expect(&TokenKind::Colon, "expected ':'")?;
    let value = parse_expr(parser)?;
    Some(FieldInit { name, value, span })
}
