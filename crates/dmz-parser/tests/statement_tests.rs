//! Tests for statement parsing.

use dmz_parser::ast::*;
use dmz_parser::source::FileId;
use dmz_parser::{DiagnosticEngine, Lexer, Parser};

/// Parses the body of `fn main() -> void { <source> }`.
fn parse_stmts(source: &str) -> Vec<Stmt> {
    let wrapped = format!("fn main() -> void {{ {source} }}");
    let mut diags = DiagnosticEngine::new();
    let (tokens, lex_errors) = Lexer::new(&wrapped, FileId(0)).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
    let (decls, ok) = Parser::new(tokens, &mut diags).parse_source_file(true);
    assert!(ok, "parse failed: {:?}", diags.diagnostics());
    match decls.into_iter().next() {
        Some(Decl::Function(f)) => f.body.unwrap().stmts,
        other => panic!("expected main, got {other:?}"),
    }
}

fn parse_stmt_err(source: &str) -> Vec<String> {
    let wrapped = format!("fn main() -> void {{ {source} }}");
    let mut diags = DiagnosticEngine::new();
    let (tokens, _) = Lexer::new(&wrapped, FileId(0)).tokenize();
    let (_, ok) = Parser::new(tokens, &mut diags).parse_source_file(true);
    assert!(!ok, "expected a parse failure");
    diags
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn parses_let_and_const() {
    let stmts = parse_stmts("let x: i32 = 42; const y = 10;");
    match &stmts[0] {
        Stmt::Decl(d) => {
            assert!(d.var.is_mutable);
            assert_eq!(d.var.name, "x");
            assert!(d.var.ty.is_some());
        }
        other => panic!("expected decl, got {other:?}"),
    }
    match &stmts[1] {
        Stmt::Decl(d) => {
            assert!(!d.var.is_mutable);
            assert!(d.var.ty.is_none());
        }
        other => panic!("expected decl, got {other:?}"),
    }
}

#[test]
fn parses_if_else_if_chain() {
    let stmts = parse_stmts("if (a) { } else if (b) { } else { }");
    let Stmt::If(outer) = &stmts[0] else {
        panic!("expected if");
    };
    let else_block = outer.else_block.as_ref().unwrap();
    assert!(matches!(&else_block.stmts[0], Stmt::If(inner) if inner.else_block.is_some()));
}

#[test]
fn condition_identifier_brace_is_not_struct_init() {
    // With StructNotAllowed, `x {` must start the body, not a struct.
    let stmts = parse_stmts("if (x) { let y: i32 = 1; }");
    let Stmt::If(if_stmt) = &stmts[0] else {
        panic!("expected if");
    };
    assert!(matches!(if_stmt.cond, Expr::DeclRef(_)));
    assert_eq!(if_stmt.then_block.stmts.len(), 1);
}

#[test]
fn parses_while() {
    let stmts = parse_stmts("while (i < 10) { i = i + 1; }");
    let Stmt::While(w) = &stmts[0] else {
        panic!("expected while");
    };
    assert!(matches!(w.cond, Expr::Binary(_)));
}

#[test]
fn parses_for_with_captures() {
    let stmts = parse_stmts("for (0..10, items) |i, item| { }");
    let Stmt::For(f) = &stmts[0] else {
        panic!("expected for");
    };
    assert_eq!(f.iterators.len(), 2);
    assert!(matches!(f.iterators[0], Expr::Range(_)));
    assert_eq!(f.captures[0].name, "i");
    assert_eq!(f.captures[1].name, "item");
}

#[test]
fn parses_switch_with_else() {
    let stmts = parse_stmts("switch (x) { case 1 => { } case 2 => f(); else => { } }");
    let Stmt::Switch(s) = &stmts[0] else {
        panic!("expected switch");
    };
    assert_eq!(s.cases.len(), 2);
    // The single-statement arm wraps into a block.
    assert_eq!(s.cases[1].block.stmts.len(), 1);
}

#[test]
fn switch_without_else_is_an_error() {
    let errors = parse_stmt_err("switch (x) { case 1 => { } }");
    assert!(errors.iter().any(|e| e.contains("expected an else case")));
}

#[test]
fn switch_with_two_elses_is_an_error() {
    let errors = parse_stmt_err("switch (x) { else => { } else => { } }");
    assert!(errors.iter().any(|e| e.contains("only one else is permitted")));
}

#[test]
fn parses_defer_and_errdefer() {
    let stmts = parse_stmts("defer f(); errdefer { g(); }");
    assert!(matches!(&stmts[0], Stmt::Defer(d) if !d.is_errdefer));
    assert!(matches!(&stmts[1], Stmt::Defer(d) if d.is_errdefer));
}

#[test]
fn return_inside_defer_is_an_error() {
    let errors = parse_stmt_err("defer { return; }");
    assert!(errors
        .iter()
        .any(|e| e.contains("unexpected return statement inside a defer")));
}

#[test]
fn parses_compound_assignment() {
    let stmts = parse_stmts("x += 2;");
    let Stmt::Assign(a) = &stmts[0] else {
        panic!("expected assignment");
    };
    assert_eq!(a.op, Some(BinaryOp::Add));
}

#[test]
fn assignment_to_literal_is_an_error() {
    let errors = parse_stmt_err("1 = 2;");
    assert!(errors
        .iter()
        .any(|e| e.contains("expected variable on the LHS of an assignment")));
}

#[test]
fn member_assignment_target_parses() {
    let stmts = parse_stmts("p.x = 3;");
    let Stmt::Assign(a) = &stmts[0] else {
        panic!("expected assignment");
    };
    assert!(matches!(a.target, Expr::Member(_)));
}

#[test]
fn missing_semicolon_recovers() {
    let errors = parse_stmt_err("let x: i32 = 1\nlet y: i32 = 2;");
    assert!(errors.iter().any(|e| e.contains("expected ';'")));
}
