//! Tests for declaration parsing.

use dmz_parser::ast::*;
use dmz_parser::source::FileId;
use dmz_parser::{DiagnosticEngine, Lexer, Parser};

fn parse(source: &str) -> Vec<Decl> {
    let mut diags = DiagnosticEngine::new();
    let (tokens, lex_errors) = Lexer::new(source, FileId(0)).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
    let (decls, ok) = Parser::new(tokens, &mut diags).parse_source_file(false);
    assert!(ok, "parse failed: {:?}", diags.diagnostics());
    decls
}

fn parse_err(source: &str) -> Vec<String> {
    let mut diags = DiagnosticEngine::new();
    let (tokens, _) = Lexer::new(source, FileId(0)).tokenize();
    let (_, ok) = Parser::new(tokens, &mut diags).parse_source_file(false);
    assert!(!ok, "expected a parse failure");
    diags
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn parses_function_declaration() {
    let decls = parse("fn add(a: i32, b: i32) -> i32 { return a + b; }");
    match &decls[0] {
        Decl::Function(f) => {
            assert_eq!(f.name, "add");
            assert_eq!(f.params.len(), 2);
            assert_eq!(f.params[0].name, "a");
            assert_eq!(f.return_type.name(), "i32");
            assert!(f.body.is_some());
            assert!(!f.is_extern);
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn parses_extern_function_with_vararg() {
    let decls = parse("extern fn printf2(fmt: u8*, ...) -> i32;");
    match &decls[0] {
        Decl::Function(f) => {
            assert!(f.is_extern);
            assert!(f.body.is_none());
            assert!(f.params[1].is_vararg);
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn extern_function_with_body_is_an_error() {
    let errors = parse_err("extern fn f() -> void { }");
    assert!(errors.iter().any(|e| e.contains("extern fn cannot have a body")));
}

#[test]
fn parses_member_function() {
    let decls = parse("fn Vec.push(value: i32) -> void { }");
    match &decls[0] {
        Decl::Function(f) => {
            assert_eq!(f.name, "push");
            assert_eq!(f.struct_name.as_deref(), Some("Vec"));
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn parses_generic_function() {
    let decls = parse("fn id<T>(x: T) -> T { return x; }");
    match &decls[0] {
        Decl::Function(f) => {
            assert_eq!(f.generic_params.len(), 1);
            assert_eq!(f.generic_params[0].name, "T");
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn parses_struct_declaration() {
    let decls = parse("struct Point { x: i32, y: i32, }");
    match &decls[0] {
        Decl::Struct(s) => {
            assert_eq!(s.name, "Point");
            assert_eq!(s.fields.len(), 2);
            assert_eq!(s.fields[1].name, "y");
        }
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn parses_generic_struct() {
    let decls = parse("struct Pair<A, B> { first: A, second: B }");
    match &decls[0] {
        Decl::Struct(s) => {
            assert_eq!(s.generic_params.len(), 2);
            assert_eq!(s.fields[0].ty.name(), "A");
        }
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn parses_err_group() {
    let decls = parse("err IoError { NotFound, Denied }");
    match &decls[0] {
        Decl::ErrGroup(g) => {
            assert_eq!(g.name, "IoError");
            assert_eq!(g.errors.len(), 2);
            assert_eq!(g.errors[0].name, "NotFound");
        }
        other => panic!("expected err group, got {other:?}"),
    }
}

#[test]
fn parses_nested_module() {
    let decls = parse("module std::io;\nfn read() -> void { }");
    match &decls[0] {
        Decl::Module(outer) => {
            assert_eq!(outer.name, "std");
            match &outer.decls[0] {
                Decl::Module(inner) => {
                    assert_eq!(inner.name, "io");
                    assert_eq!(inner.decls.len(), 1);
                }
                other => panic!("expected nested module, got {other:?}"),
            }
        }
        other => panic!("expected module, got {other:?}"),
    }
}

#[test]
fn parses_import_with_alias() {
    let decls = parse("import std::io as io2;\nfn f() -> void { }");
    match &decls[0] {
        Decl::Import(i) => {
            assert_eq!(i.module_id(), "std::io");
            assert_eq!(i.binding(), "io2");
        }
        other => panic!("expected import, got {other:?}"),
    }
}

#[test]
fn parses_pub_modifier() {
    let decls = parse("pub fn api() -> void { }\npub struct S { x: i32 }");
    assert!(matches!(&decls[0], Decl::Function(f) if f.is_public));
    assert!(matches!(&decls[1], Decl::Struct(s) if s.is_public));
}

#[test]
fn parses_test_declaration() {
    let decls = parse("test \"adds numbers\" { let x: i32 = 1; }");
    match &decls[0] {
        Decl::Test(t) => {
            assert_eq!(t.name, "adds numbers");
            assert_eq!(t.body.stmts.len(), 1);
        }
        other => panic!("expected test, got {other:?}"),
    }
}

#[test]
fn vararg_must_be_last() {
    let errors = parse_err("extern fn f(x: ..., y: i32) -> void;");
    assert!(errors
        .iter()
        .any(|e| e.contains("vararg '...' can only be in the last argument")));
}

#[test]
fn recovery_continues_after_bad_declaration() {
    let mut diags = DiagnosticEngine::new();
    let (tokens, _) = Lexer::new("garbage;\nfn ok() -> void { }", FileId(0)).tokenize();
    let (decls, ok) = Parser::new(tokens, &mut diags).parse_source_file(false);
    assert!(!ok);
    assert!(diags.has_errors());
    // The good declaration still parsed.
    assert!(decls
        .iter()
        .any(|d| matches!(d, Decl::Function(f) if f.name == "ok")));
}
