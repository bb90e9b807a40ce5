//! Statement parsing.

use super::recovery;
use super::{decl, expr, Parser, Restrictions};
use crate::ast::*;
use crate::token::TokenKind;

pub fn parse_statement(parser: &mut Parser) -> Option<Stmt> {
    match parser.current() {
        TokenKind::KwIf => parse_if_stmt(parser).map(Stmt::If),
        TokenKind::KwWhile => parse_while_stmt(parser).map(Stmt::While),
        TokenKind::KwFor => parse_for_stmt(parser).map(Stmt::For),
        TokenKind::KwReturn => parse_return_stmt(parser).map(Stmt::Return),
        TokenKind::KwLet | TokenKind::KwConst => parse_decl_stmt(parser).map(Stmt::Decl),
        TokenKind::KwDefer | TokenKind::KwErrDefer => parse_defer_stmt(parser).map(Stmt::Defer),
        TokenKind::KwSwitch => parse_switch_stmt(parser).map(Stmt::Switch),
        TokenKind::BraceL => parse_block(parser).map(Stmt::Block),
        _ => parse_assignment_or_expr(parser, true),
    }
}

/// `'{' statement* '}'`, or a single statement when `one_stmt` callers use
/// [`parse_block_or_stmt`] (defer bodies, switch arms).
pub fn parse_block(parser: &mut Parser) -> Option<Block> {
    let span = parser.current_span();
    parser.expect(&TokenKind::BraceL, "expected '{'")?;

    let mut stmts = Vec::new();
    loop {
        if parser.at(&TokenKind::BraceR) {
            break;
        }
        if parser.at_eof() || recovery::is_top_level_starter(parser.current()) {
            let loc = parser.current_span();
            return parser.report(loc, "expected '}' at the end of a block");
        }

        match parse_statement(parser) {
            Some(stmt) => stmts.push(stmt),
            None => recovery::synchronize(parser),
        }
    }

    parser.expect(&TokenKind::BraceR, "expected '}' at the end of a block")?;
    Some(Block { stmts, span })
}

/// Either a braced block or a single statement wrapped into a block.
pub fn parse_block_or_stmt(parser: &mut Parser) -> Option<Block> {
    if parser.at(&TokenKind::BraceL) {
        return parse_block(parser);
    }
    let span = parser.current_span();
    let stmt = parse_statement(parser)?;
    Some(Block {
        stmts: vec![stmt],
        span,
    })
}

fn parse_if_stmt(parser: &mut Parser) -> Option<IfStmt> {
    let span = parser.current_span();
    parser.eat(); // 'if'

    parser.expect(&TokenKind::ParenL, "expected '('")?;
    let cond = parser.with_restrictions(Restrictions::STRUCT_NOT_ALLOWED, expr::parse_expr)?;
    parser.expect(&TokenKind::ParenR, "expected ')'")?;

    if !parser.at(&TokenKind::BraceL) {
        let loc = parser.current_span();
        return parser.report(loc, "expected 'if' body");
    }
    let then_block = parse_block(parser)?;

    if !parser.at(&TokenKind::KwElse) {
        return Some(IfStmt {
            cond,
            then_block,
            else_block: None,
            span,
        });
    }
    parser.eat(); // 'else'

    let else_block = if parser.at(&TokenKind::KwIf) {
        let else_if = parse_if_stmt(parser)?;
        let else_span = else_if.span;
        Block {
            stmts: vec![Stmt::If(else_if)],
            span: else_span,
        }
    } else {
        if !parser.at(&TokenKind::BraceL) {
            let loc = parser.current_span();
            return parser.report(loc, "expected 'else' body");
        }
        parse_block(parser)?
    };

    Some(IfStmt {
        cond,
        then_block,
        else_block: Some(else_block),
        span,
    })
}

fn parse_while_stmt(parser: &mut Parser) -> Option<WhileStmt> {
    let span = parser.current_span();
    parser.eat(); // 'while'

    parser.expect(&TokenKind::ParenL, "expected '('")?;
    let cond = parser.with_restrictions(Restrictions::STRUCT_NOT_ALLOWED, expr::parse_expr)?;
    parser.expect(&TokenKind::ParenR, "expected ')'")?;

    if !parser.at(&TokenKind::BraceL) {
        let loc = parser.current_span();
        return parser.report(loc, "expected 'while' body");
    }
    let body = parse_block(parser)?;

    Some(WhileStmt { cond, body, span })
}

/// `for (iter, ...) |capture, ...| { .. }`
fn parse_for_stmt(parser: &mut Parser) -> Option<ForStmt> {
    let span = parser.current_span();
    parser.eat(); // 'for'

    let iterators = parser.with_restrictions(Restrictions::STRUCT_NOT_ALLOWED, |p| {
        p.parse_list(
            (&TokenKind::ParenL, "expected '('"),
            (&TokenKind::ParenR, "expected ')'"),
            expr::parse_expr,
        )
    })?;

    let captures = parser.parse_list(
        (&TokenKind::Pipe, "expected '|'"),
        (&TokenKind::Pipe, "expected '|'"),
        |p| {
            let (name, span) = p.expect_ident("expected capture identifier")?;
            Some(CaptureDecl { name, span })
        },
    )?;

    if !parser.at(&TokenKind::BraceL) {
        let loc = parser.current_span();
        return parser.report(loc, "expected 'for' body");
    }
    let body = parse_block(parser)?;

    Some(ForStmt {
        iterators,
        captures,
        body,
        span,
    })
}

fn parse_return_stmt(parser: &mut Parser) -> Option<ReturnStmt> {
    let span = parser.current_span();
    parser.eat(); // 'return'

    if parser.restrictions().return_not_allowed {
        return parser.report(span, "unexpected return statement inside a defer");
    }

    let value = if parser.at(&TokenKind::Semicolon) {
        None
    } else {
        Some(expr::parse_expr(parser)?)
    };

    parser.expect(
        &TokenKind::Semicolon,
        "expected ';' at the end of a return statement",
    )?;

    Some(ReturnStmt { value, span })
}

fn parse_decl_stmt(parser: &mut Parser) -> Option<DeclStmt> {
    let span = parser.current_span();
    let is_mutable = parser.at(&TokenKind::KwLet);
    parser.eat(); // 'let' or 'const'

    let var = decl::parse_var_decl(parser, is_mutable, false)?;
    parser.expect(&TokenKind::Semicolon, "expected ';' after declaration")?;

    Some(DeclStmt { var, span })
}

fn parse_defer_stmt(parser: &mut Parser) -> Option<DeferStmt> {
    let span = parser.current_span();
    let is_errdefer = parser.at(&TokenKind::KwErrDefer);
    parser.eat(); // 'defer' or 'errdefer'

    let block =
        parser.with_restrictions(Restrictions::RETURN_NOT_ALLOWED, parse_block_or_stmt)?;

    Some(DeferStmt {
        block,
        is_errdefer,
        span,
    })
}

fn parse_switch_stmt(parser: &mut Parser) -> Option<SwitchStmt> {
    let span = parser.current_span();
    parser.eat(); // 'switch'

    parser.expect(&TokenKind::ParenL, "expected '('")?;
    let cond = parser.with_restrictions(Restrictions::STRUCT_NOT_ALLOWED, expr::parse_expr)?;
    parser.expect(&TokenKind::ParenR, "expected ')'")?;

    parser.expect(&TokenKind::BraceL, "expected '{'")?;

    let mut cases = Vec::new();
    let mut else_block: Option<Block> = None;

    while parser.at(&TokenKind::KwCase) || parser.at(&TokenKind::KwElse) {
        let case_span = parser.current_span();
        let is_else = parser.at(&TokenKind::KwElse);
        parser.eat(); // 'case' or 'else'

        let cond = if is_else {
            None
        } else {
            Some(expr::parse_expr(parser)?)
        };

        parser.expect(&TokenKind::SwitchArrow, "expected '=>'")?;
        let block = parse_block_or_stmt(parser)?;

        match cond {
            Some(cond) => cases.push(CaseStmt {
                cond,
                block,
                span: case_span,
            }),
            None => {
                if else_block.is_some() {
                    recovery::synchronize_on(parser, &[TokenKind::BraceR]);
                    parser.eat(); // '}'
                    return parser.report(case_span, "only one else is permitted in a switch");
                }
                else_block = Some(block);
            }
        }
    }

    let Some(else_block) = else_block else {
        recovery::synchronize_on(parser, &[TokenKind::BraceR]);
        parser.eat(); // '}'
        return parser.report(span, "expected an else case");
    };

    parser.expect(&TokenKind::BraceR, "expected '}'")?;

    Some(SwitchStmt {
        cond,
        cases,
        else_block,
        span,
    })
}

/// A statement that starts with an expression: either an assignment
/// (plain or compound) or a bare expression statement.
fn parse_assignment_or_expr(parser: &mut Parser, expect_semicolon: bool) -> Option<Stmt> {
    let lhs = expr::parse_prefix_expr(parser)?;

    let op = match parser.current() {
        TokenKind::Assign => None,
        TokenKind::PlusAssign => Some(BinaryOp::Add),
        TokenKind::MinusAssign => Some(BinaryOp::Sub),
        TokenKind::StarAssign => Some(BinaryOp::Mul),
        TokenKind::SlashAssign => Some(BinaryOp::Div),
        _ => {
            let e = expr::parse_expr_tail(parser, lhs)?;
            if expect_semicolon {
                parser.expect(
                    &TokenKind::Semicolon,
                    "expected ';' at the end of expression",
                )?;
            }
            return Some(Stmt::Expr(e));
        }
    };

    if !lhs.is_assignable() {
        let span = lhs.span();
        return parser.report(span, "expected variable on the LHS of an assignment");
    }

    let span = parser.current_span();
    parser.eat(); // assignment operator

    let value = expr::parse_expr(parser)?;
    if expect_semicolon {
        parser.expect(
            &TokenKind::Semicolon,
            "expected ';' at the end of assignment",
        )?;
    }

    Some(Stmt::Assign(Assignment {
        target: lhs,
        value,
        op,
        span,
    }))
}
