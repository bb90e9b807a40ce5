//! Tests for the two-phase resolver.

use dmz_parser::source::FileId;
use dmz_parser::{DiagnosticEngine, Lexer, Parser};
use dmz_sema::{DeclKind, ResolvedProgram, Sema, Ty};

fn resolve(source: &str) -> (Option<ResolvedProgram>, Vec<String>) {
    let mut diags = DiagnosticEngine::new();
    let (tokens, lex_errors) = Lexer::new(source, FileId(0)).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
    let (ast, _) = Parser::new(tokens, &mut diags).parse_source_file(false);
    let prog = Sema::resolve(&ast, &mut diags);
    let messages = diags
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect();
    (prog, messages)
}

fn resolve_ok(source: &str) -> ResolvedProgram {
    let (prog, messages) = resolve(source);
    prog.unwrap_or_else(|| panic!("resolution failed: {messages:?}"))
}

fn resolve_err(source: &str) -> Vec<String> {
    let (prog, messages) = resolve(source);
    assert!(prog.is_none(), "expected resolution to fail");
    messages
}

fn find_function<'a>(prog: &'a ResolvedProgram, symbol: &str) -> &'a dmz_sema::FunctionData {
    prog.decls
        .iter()
        .find_map(|d| match &d.kind {
            DeclKind::Function(f) if d.symbol == symbol => Some(f),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no function with symbol '{symbol}'"))
}

#[test]
fn resolves_hello_add() {
    let prog = resolve_ok(
        "fn add(a: i32, b: i32) -> i32 { return a + b; }\n\
         fn main() -> void { let x: i32 = add(2, 3); }",
    );
    let add = find_function(&prog, "add");
    assert_eq!(add.ret, Ty::I32);
    assert_eq!(add.params.len(), 2);
    // `main` was renamed during symbol-name assignment.
    let main = find_function(&prog, "__builtin_main");
    assert!(main.body.is_some());
}

#[test]
fn unresolved_symbol_is_an_error() {
    let errors = resolve_err("fn main() -> void { let x: i32 = missing; }");
    assert!(errors.iter().any(|e| e.contains("symbol 'missing' not found")));
}

#[test]
fn use_before_initialization_is_an_error() {
    let errors = resolve_err("fn main() -> void { let x: i32; let y: i32 = x + 1; }");
    assert!(errors.iter().any(|e| e.contains("'x' is not initialized")));
}

#[test]
fn struct_containing_itself_is_an_error() {
    let errors = resolve_err("struct A { next: A }\nfn main() -> void { }");
    assert!(errors.iter().any(|e| e.contains("struct 'A' contains itself")));
}

#[test]
fn struct_through_pointer_breaks_the_cycle() {
    resolve_ok("struct Node { next: Node*, value: i32 }\nfn main() -> void { }");
}

#[test]
fn mutating_a_const_is_an_error() {
    let errors = resolve_err("fn main() -> void { const x: i32 = 1; x = 2; }");
    assert!(errors.iter().any(|e| e.contains("'x' cannot be mutated")));
}

#[test]
fn deferred_const_initialization_is_allowed() {
    resolve_ok("fn main() -> void { const x: i32; x = 2; let y: i32 = x; }");
}

#[test]
fn non_void_function_must_return_on_all_paths() {
    let errors = resolve_err(
        "fn f(c: bool) -> i32 { if (c) { return 1; } }\nfn main() -> void { }",
    );
    assert!(errors
        .iter()
        .any(|e| e.contains("doesn't return a value on every path")));
}

#[test]
fn return_type_must_unify() {
    let errors = resolve_err(
        "struct P { x: i32 }\nfn f() -> i32 { return P { x: 1 }; }\nfn main() -> void { }",
    );
    assert!(errors.iter().any(|e| e.contains("unexpected return type")));
}

#[test]
fn optional_return_accepts_value_and_error() {
    resolve_ok(
        "fn f(fail: bool) -> i32? { if (fail) { return @Broken; } return 3; }\n\
         fn main() -> void { }",
    );
}

#[test]
fn generic_call_specializes_once_per_tuple() {
    let prog = resolve_ok(
        "fn id<T>(x: T) -> T { return x; }\n\
         fn main() -> void {\n\
             let a: i32 = id<i32>(7);\n\
             let b: i32 = id<i32>(9);\n\
             let c: f64 = id<f64>(1.5);\n\
         }",
    );
    let template = find_function(&prog, "id");
    assert_eq!(template.specializations.len(), 2);

    // Same tuple -> same instance (specialization determinism).
    let (_, first) = template
        .specializations
        .iter()
        .find(|(key, _)| key == &vec![Ty::I32])
        .unwrap();
    let spec = prog.function(*first);
    assert_eq!(spec.ret, Ty::I32);
    assert!(spec.body.is_some());
    assert_eq!(prog.decl(*first).symbol, "id<i32>");
}

#[test]
fn generic_call_without_arguments_is_an_error() {
    let errors = resolve_err(
        "fn id<T>(x: T) -> T { return x; }\nfn main() -> void { let a: i32 = id(7); }",
    );
    assert!(errors
        .iter()
        .any(|e| e.contains("generic function without specialization")));
}

#[test]
fn generic_struct_specializes_from_type_position() {
    let prog = resolve_ok(
        "struct Box<T> { value: T }\n\
         fn main() -> void { let b: Box<i32> = Box<i32> { value: 4 }; }",
    );
    let strukt = prog
        .decls
        .iter()
        .find(|d| d.symbol == "Box<i32>")
        .expect("specialized struct");
    let DeclKind::Struct(data) = &strukt.kind else {
        panic!("expected struct");
    };
    assert_eq!(data.fields.len(), 1);
}

#[test]
fn defer_snapshots_are_lifo() {
    let prog = resolve_ok(
        "fn main() -> void { defer println(1); defer println(2); println(3); }",
    );
    let main = find_function(&prog, "__builtin_main");
    assert_eq!(main.defers.len(), 2);
    let body = main.body.as_ref().unwrap();
    // Block exit runs the defers in reverse registration order.
    let order: Vec<u32> = body.defers.iter().map(|d| d.0).collect();
    assert_eq!(order, vec![1, 0]);
}

#[test]
fn errdefer_only_joins_error_returns() {
    let prog = resolve_ok(
        "fn f(fail: bool) -> i32? {\n\
             defer println(1);\n\
             errdefer println(2);\n\
             if (fail) { return @Bad; }\n\
             return 0;\n\
         }\n\
         fn main() -> void { }",
    );
    let f = find_function(&prog, "f");
    assert!(f.defers[0].is_errdefer == false);
    assert!(f.defers[1].is_errdefer);

    let mut snapshots = Vec::new();
    collect_return_defers(f.body.as_ref().unwrap(), &mut snapshots);
    // Error return sees [errdefer, defer]; normal return only [defer].
    assert!(snapshots.contains(&vec![1, 0]));
    assert!(snapshots.contains(&vec![0]));
}

fn collect_return_defers(block: &dmz_sema::ResolvedBlock, out: &mut Vec<Vec<u32>>) {
    use dmz_sema::ResolvedStmt;
    for stmt in &block.stmts {
        match stmt {
            ResolvedStmt::Return { defers, .. } => {
                out.push(defers.iter().map(|d| d.0).collect());
            }
            ResolvedStmt::If {
                then_block,
                else_block,
                ..
            } => {
                collect_return_defers(then_block, out);
                if let Some(else_block) = else_block {
                    collect_return_defers(else_block, out);
                }
            }
            ResolvedStmt::Block(inner) => collect_return_defers(inner, out),
            _ => {}
        }
    }
}

#[test]
fn member_function_and_self_member_resolve() {
    let prog = resolve_ok(
        "struct Counter { count: i32 }\n\
         fn Counter.bump(amount: i32) -> void { }\n\
         fn main() -> void {\n\
             let c: Counter = Counter { count: 0 };\n\
             c.bump(2);\n\
         }",
    );
    let strukt = prog.decls.iter().find(|d| d.name == "Counter").unwrap();
    let DeclKind::Struct(data) = &strukt.kind else {
        panic!("expected struct");
    };
    assert_eq!(data.methods.len(), 1);
    let method = prog.function(data.methods[0]);
    // Implicit self pointer parameter.
    assert_eq!(method.params.len(), 2);
    let (self_ty, by_ref, _) = prog.param(method.params[0]);
    assert!(matches!(self_ty, Ty::Pointer(_)));
    assert!(by_ref);
}

#[test]
fn self_member_outside_struct_is_an_error() {
    let errors = resolve_err("fn main() -> void { let x: i32 = .field; }");
    assert!(errors
        .iter()
        .any(|e| e.contains("self member outside a struct")));
}

#[test]
fn switch_cases_must_be_constant() {
    let errors = resolve_err(
        "fn main() -> void { let n: i32 = 1; switch (n) { case n => { } else => { } } }",
    );
    assert!(errors
        .iter()
        .any(|e| e.contains("condition in case must be a constant value")));
}

#[test]
fn try_requires_an_error_union() {
    let errors = resolve_err("fn main() -> void { let x: i32 = try 3; }");
    assert!(errors.iter().any(|e| e.contains("expect error union when using try")));
}

#[test]
fn orelse_types_must_match() {
    let errors = resolve_err(
        "fn f() -> i32? { return 1; }\n\
         struct S { x: i32 }\n\
         fn main() -> void { let s: S = S { x: 1 }; let v: i32 = f() orelse s; }",
    );
    assert!(errors.iter().any(|e| e.contains("orelse")));
}

#[test]
fn unreachable_statement_after_return_warns() {
    let (prog, messages) = resolve(
        "fn f() -> i32 { return 1; let dead: i32 = 2; }\nfn main() -> void { }",
    );
    assert!(prog.is_some());
    assert!(messages.iter().any(|m| m.contains("unreachable statement")));
}

#[test]
fn modules_merge_into_scoped_symbols() {
    let prog = resolve_ok(
        "module math;\n\
         pub fn double(x: i32) -> i32 { return x * 2; }",
    );
    assert!(prog
        .decls
        .iter()
        .any(|d| d.symbol == "math.double"));
}

#[test]
fn module_member_access_respects_pub() {
    let errors = resolve_err(
        "fn main() -> void { let x: i32 = math::secret(); }\n\
         module math;\n\
         fn secret() -> i32 { return 1; }",
    );
    assert!(errors.iter().any(|e| e.contains("private to its module")));
}

#[test]
fn public_module_member_is_callable() {
    resolve_ok(
        "fn main() -> void { let x: i32 = math::double(2); }\n\
         module math;\n\
         pub fn double(x: i32) -> i32 { return x * 2; }",
    );
}

#[test]
fn reserved_names_are_rejected() {
    let errors = resolve_err("fn printf() -> void { }\nfn main() -> void { }");
    assert!(errors.iter().any(|e| e.contains("reserved function name")));
}

#[test]
fn main_signature_is_checked() {
    let errors = resolve_err("fn main() -> i32 { return 0; }");
    assert!(errors
        .iter()
        .any(|e| e.contains("'main' function is expected to have 'void' type")));
}

#[test]
fn local_error_group_members_resolve() {
    resolve_ok(
        "fn main() -> void {\n\
             const Errors = err { NotFound, Denied };\n\
             let e: err = Errors.NotFound;\n\
             let f: err = Denied?;\n\
         }",
    );
}

#[test]
fn argument_count_mismatch_is_an_error() {
    let errors = resolve_err(
        "fn add(a: i32, b: i32) -> i32 { return a + b; }\n\
         fn main() -> void { let x: i32 = add(1); }",
    );
    assert!(errors
        .iter()
        .any(|e| e.contains("argument count mismatch in function call, expected 2 actual 1")));
}

#[test]
fn calling_a_non_function_is_an_error() {
    let errors = resolve_err("fn main() -> void { let x: i32 = 1; let y: i32 = x(); }");
    assert!(errors.iter().any(|e| e.contains("calling non-function symbol")));
}

#[test]
fn tests_resolve_with_optional_void_return() {
    let prog = resolve_ok(
        "test \"it works\" { let x: i32 = 1; }\nfn main() -> void { }",
    );
    let test = prog
        .decls
        .iter()
        .find_map(|d| match &d.kind {
            DeclKind::Function(f) if f.is_test => Some(f),
            _ => None,
        })
        .expect("test function");
    assert_eq!(test.ret, Ty::optional_of(Ty::Void));
    assert!(test.body.is_some());
}
