//! Tests for expression parsing.

use dmz_parser::ast::*;
use dmz_parser::source::FileId;
use dmz_parser::{DiagnosticEngine, Lexer, Parser};

/// Parses `<source>` as the initializer of a let.
fn parse_expr(source: &str) -> Expr {
    let wrapped = format!("fn main() -> void {{ let it = {source}; }}");
    let mut diags = DiagnosticEngine::new();
    let (tokens, lex_errors) = Lexer::new(&wrapped, FileId(0)).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
    let (decls, ok) = Parser::new(tokens, &mut diags).parse_source_file(true);
    assert!(ok, "parse failed: {:?}", diags.diagnostics());
    match decls.into_iter().next() {
        Some(Decl::Function(f)) => match f.body.unwrap().stmts.into_iter().next() {
            Some(Stmt::Decl(d)) => d.var.init.unwrap(),
            other => panic!("expected decl statement, got {other:?}"),
        },
        other => panic!("expected main, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let Expr::Binary(add) = parse_expr("1 + 2 * 3") else {
        panic!("expected binary");
    };
    assert_eq!(add.op, BinaryOp::Add);
    let Expr::Binary(mul) = *add.rhs else {
        panic!("expected rhs binary");
    };
    assert_eq!(mul.op, BinaryOp::Mul);
}

#[test]
fn comparison_binds_tighter_than_logical() {
    let Expr::Binary(and) = parse_expr("a < b && c == d") else {
        panic!("expected binary");
    };
    assert_eq!(and.op, BinaryOp::And);
    assert!(matches!(*and.lhs, Expr::Binary(b) if b.op == BinaryOp::Lt));
    assert!(matches!(*and.rhs, Expr::Binary(b) if b.op == BinaryOp::Eq));
}

#[test]
fn or_is_loosest_binary() {
    let Expr::Binary(or) = parse_expr("a && b || c") else {
        panic!("expected binary");
    };
    assert_eq!(or.op, BinaryOp::Or);
}

#[test]
fn unary_binds_tighter_than_binary() {
    let Expr::Binary(sub) = parse_expr("-a - b") else {
        panic!("expected binary");
    };
    assert_eq!(sub.op, BinaryOp::Sub);
    assert!(matches!(*sub.lhs, Expr::Unary(u) if u.op == UnaryOp::Neg));
}

#[test]
fn parses_ref_and_deref() {
    assert!(matches!(parse_expr("&x"), Expr::Ref(_)));
    assert!(matches!(parse_expr("*p"), Expr::Deref(_)));
}

#[test]
fn parses_call_chain_and_members() {
    let Expr::Member(outer) = parse_expr("point.pos.x") else {
        panic!("expected member");
    };
    assert_eq!(outer.field, "x");
    assert!(matches!(*outer.base, Expr::Member(_)));

    let Expr::Call(call) = parse_expr("v.len()") else {
        panic!("expected call");
    };
    assert!(matches!(*call.callee, Expr::Member(_)));
}

#[test]
fn parses_generic_call() {
    let Expr::Call(call) = parse_expr("id<i32>(7)") else {
        panic!("expected call");
    };
    assert_eq!(call.generic_args.len(), 1);
    assert_eq!(call.generic_args[0].name(), "i32");
    assert_eq!(call.args.len(), 1);
}

#[test]
fn less_than_is_not_a_generic_call() {
    let Expr::Binary(cmp) = parse_expr("a < b") else {
        panic!("expected comparison");
    };
    assert_eq!(cmp.op, BinaryOp::Lt);
}

#[test]
fn parses_index_and_slicing() {
    let Expr::ArrayAt(at) = parse_expr("a[2]") else {
        panic!("expected index");
    };
    assert!(matches!(*at.index, Expr::IntLit(_)));

    let Expr::ArrayAt(slice) = parse_expr("a[1..n]") else {
        panic!("expected index");
    };
    assert!(matches!(*slice.index, Expr::Range(_)));
}

#[test]
fn parses_struct_instantiation() {
    let Expr::StructInit(init) = parse_expr("Point { x: 1, y: 2 }") else {
        panic!("expected struct init");
    };
    assert_eq!(init.name, "Point");
    assert_eq!(init.fields.len(), 2);
    assert_eq!(init.fields[0].name, "x");
}

#[test]
fn parses_generic_struct_instantiation() {
    let Expr::StructInit(init) = parse_expr("Pair<i32, f64> { first: 1, second: 2.0 }") else {
        panic!("expected struct init");
    };
    assert_eq!(init.generic_args.len(), 2);
}

#[test]
fn parses_array_instantiation() {
    let Expr::ArrayInit(init) = parse_expr("{1, 2, 3}") else {
        panic!("expected array init");
    };
    assert_eq!(init.elems.len(), 3);

    let Expr::ArrayInit(empty) = parse_expr("{}") else {
        panic!("expected array init");
    };
    assert!(empty.elems.is_empty());
}

#[test]
fn parses_error_constructs() {
    assert!(matches!(parse_expr("@NotFound"), Expr::ErrorInPlace(_)));
    assert!(matches!(parse_expr("NotFound?"), Expr::ErrRef(_)));
    assert!(matches!(parse_expr("catch result"), Expr::Catch(_)));
    assert!(matches!(parse_expr("try open()"), Expr::Try(_)));
    assert!(matches!(parse_expr("open()!"), Expr::Unwrap(_)));
}

#[test]
fn parses_orelse_right_associative() {
    let Expr::OrElse(outer) = parse_expr("a orelse b orelse c") else {
        panic!("expected orelse");
    };
    assert!(matches!(*outer.fallback, Expr::OrElse(_)));
}

#[test]
fn parses_err_group_expression() {
    let Expr::ErrGroup(group) = parse_expr("err { A, B }") else {
        panic!("expected err group");
    };
    assert_eq!(group.errors.len(), 2);
}

#[test]
fn parses_sizeof() {
    let Expr::Sizeof(s) = parse_expr("sizeof(i64)") else {
        panic!("expected sizeof");
    };
    assert_eq!(s.ty.name(), "i64");
}

#[test]
fn parses_self_member() {
    assert!(matches!(parse_expr(".field"), Expr::SelfMember(_)));
}

#[test]
fn parses_module_path_and_import_expr() {
    let Expr::ModulePath(path) = parse_expr("std::io::stdin") else {
        panic!("expected module path");
    };
    assert_eq!(path.segments, vec!["std", "io", "stdin"]);

    let Expr::Import(import) = parse_expr("import std::io") else {
        panic!("expected import expr");
    };
    assert_eq!(import.path, vec!["std", "io"]);
}

#[test]
fn parses_literals() {
    assert!(matches!(parse_expr("null"), Expr::NullLit(_)));
    assert!(matches!(parse_expr("'a'"), Expr::CharLit(c) if c.value == b'a'));
    assert!(matches!(parse_expr("\"hi\""), Expr::StrLit(s) if s.value == "hi"));
    assert!(matches!(parse_expr("true"), Expr::BoolLit(b) if b.value));
    assert!(matches!(parse_expr("1.25"), Expr::FloatLit(_)));
}

#[test]
fn grouping_clears_restrictions() {
    // Inside parens a struct literal is fine even in a condition.
    let wrapped = "fn main() -> void { if ((Point { x: 1 }).x) { } }";
    let mut diags = DiagnosticEngine::new();
    let (tokens, _) = Lexer::new(wrapped, FileId(0)).tokenize();
    let (_, ok) = Parser::new(tokens, &mut diags).parse_source_file(true);
    assert!(ok, "parse failed: {:?}", diags.diagnostics());
}
