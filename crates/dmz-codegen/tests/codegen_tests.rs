//! Tests for IR lowering: resolved programs in, IR text out.

use dmz_codegen::Codegen;
use dmz_parser::source::FileId;
use dmz_parser::{DiagnosticEngine, Lexer, Parser};
use dmz_sema::{ResolvedProgram, Sema};

fn resolve(source: &str) -> ResolvedProgram {
    let mut diags = DiagnosticEngine::new();
    let (tokens, lex_errors) = Lexer::new(source, FileId(0)).tokenize();
    assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
    let (ast, _) = Parser::new(tokens, &mut diags).parse_source_file(false);
    Sema::resolve(&ast, &mut diags)
        .unwrap_or_else(|| panic!("resolution failed: {:?}", diags.diagnostics()))
}

fn lower(source: &str) -> String {
    Codegen::generate(&resolve(source), "test.dmz", false).to_string()
}

fn lower_tests(source: &str) -> String {
    Codegen::generate(&resolve(source), "test.dmz", true).to_string()
}

#[test]
fn hello_add_emits_wrapped_main() {
    let ir = lower(
        "fn add(a: i32, b: i32) -> i32 { return a + b; }\n\
         fn main() -> void { let x: i32 = add(2, 3); }",
    );
    assert!(ir.contains("define i32 @add(i32 %a, i32 %b)"));
    assert!(ir.contains("define void @__builtin_main()"));
    assert!(ir.contains("call i32 @add(i32 2, i32 3)"));
    // The synthetic wrapper calls the user main and returns 0.
    assert!(ir.contains("define i32 @main()"));
    assert!(ir.contains("call void @__builtin_main()"));
    assert!(ir.contains("ret i32 0"));
    // The success sentinel is always present.
    assert!(ir.contains("@err.str.SUCCESS"));
}

#[test]
fn compiling_twice_is_deterministic() {
    let source = "fn mix(a: i32, b: f64) -> f64 { return b; }\n\
                  struct P { x: i32, y: i32 }\n\
                  err E { Oops }\n\
                  fn main() -> void { let p: P = P { x: 1, y: 2 }; }";
    assert_eq!(lower(source), lower(source));
}

#[test]
fn generic_specializations_emit_separately() {
    let ir = lower(
        "fn id<T>(x: T) -> T { return x; }\n\
         fn main() -> void { let y: i32 = id<i32>(7); let z: f64 = id<f64>(1.5); }",
    );
    assert!(ir.contains("define i32 @\"id<i32>\"(i32 %x)"));
    assert!(ir.contains("define double @\"id<f64>\"(double %x)"));
    // The template itself never emits.
    assert!(!ir.contains("@id("));
}

#[test]
fn defers_run_in_lifo_order() {
    let ir = lower(
        "fn main() -> void { defer println(1); defer println(2); println(3); }",
    );
    let three = ir.find("call void @println(i32 3)").expect("println(3)");
    let two = ir.find("call void @println(i32 2)").expect("println(2)");
    let one = ir.find("call void @println(i32 1)").expect("println(1)");
    assert!(three < two && two < one, "defers must expand in reverse order");
}

#[test]
fn optional_layout_and_sret_convention() {
    let ir = lower(
        "fn f() -> i32? { return 3; }\n\
         fn main() -> void { let x: i32 = f() orelse 0; }",
    );
    assert!(ir.contains("%err.struct.i32 = type { i32, ptr }"));
    assert!(ir.contains("define void @f(ptr sret(%err.struct.i32) %ret)"));
    // Call sites allocate the return buffer themselves.
    assert!(ir.contains("struct.ret.tmp"));
}

#[test]
fn struct_types_declare_before_bodies() {
    let ir = lower(
        "struct Node { next: Node*, value: i32 }\n\
         fn main() -> void { let n: Node = Node { next: null, value: 1 }; }",
    );
    assert!(ir.contains("%struct.Node = type { ptr, i32 }"));
    assert!(ir.contains("alloca %struct.Node"));
    // Every stack slot gets an entry-block zero fill.
    assert!(ir.contains("call void @llvm.memset.p0.i64(ptr %n, i8 0"));
}

#[test]
fn struct_params_pass_by_pointer_with_attrs() {
    let ir = lower(
        "struct P { x: i32 }\n\
         fn takes(p: P) -> i32 { return p.x; }\n\
         fn by_ref(p: &P) -> i32 { return p.x; }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("readonly byval(%struct.P)"));
    assert!(ir.contains("byref(%struct.P)"));
}

#[test]
fn short_circuit_lowers_to_phi() {
    let ir = lower(
        "fn f(a: bool, b: bool) -> bool { return a && b; }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("and.rhs"));
    assert!(ir.contains("and.merge"));
    assert!(ir.contains("phi i1"));
}

#[test]
fn error_tags_are_interned_globals() {
    let ir = lower(
        "err IoError { NotFound }\n\
         fn f(fail: bool) -> i32? { if (fail) { return IoError.NotFound; } return 1; }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("@err.str.NotFound"));
    assert!(ir.contains("@err.str.SUCCESS"));
}

#[test]
fn error_in_place_tag_is_global() {
    let ir = lower(
        "fn f() -> i32? { return @Broken; }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("@error.str.Broken"));
}

#[test]
fn try_propagates_through_the_error_slot() {
    let ir = lower(
        "fn inner() -> i32? { return 1; }\n\
         fn outer() -> i32? { let v: i32 = try inner(); return v; }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("try.error"));
    assert!(ir.contains("try.exit"));
}

#[test]
fn unwrap_outside_optional_function_aborts() {
    let ir = lower(
        "fn inner() -> i32? { return 1; }\n\
         fn main() -> void { let v: i32 = inner()!; }",
    );
    assert!(ir.contains("call void @llvm.trap()"));
}

#[test]
fn slices_lower_to_ptr_len_pairs() {
    let ir = lower(
        "fn main() -> void {\n\
             let a: i32[4] = {1, 2, 3, 4};\n\
             let s: i32[] = a[0..4];\n\
         }",
    );
    assert!(ir.contains("alloca { ptr, i64 }"));
    assert!(ir.contains("tmp.slice"));
}

#[test]
fn for_loop_checks_parallel_lengths() {
    let ir = lower(
        "fn main() -> void {\n\
             let a: i32[2] = {1, 2};\n\
             let b: i32[2] = {3, 4};\n\
             for (a[0..2], b[0..2]) |x, y| { println(x); }\n\
         }",
    );
    assert!(ir.contains("for.cond"));
    assert!(ir.contains("for.increment"));
    assert!(ir.contains("for.not.equal.length"));
    assert!(ir.contains("non-equal lengths"));
}

#[test]
fn switch_lowers_to_multiway_branch() {
    let ir = lower(
        "fn f(n: i32) -> i32 {\n\
             switch (n) { case 1 => { return 10; } case 2 => { return 20; } else => { return 0; } }\n\
         }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("switch i32"));
    assert!(ir.contains("i32 1, label"));
    assert!(ir.contains("i32 2, label"));
    assert!(ir.contains("switch.else"));
}

#[test]
fn numeric_casts_dispatch_on_kind() {
    let ir = lower(
        "fn f(a: i32, b: u32, c: f64) -> f64 {\n\
             let widened: i64 = a;\n\
             let converted: f64 = b;\n\
             return c;\n\
         }\n\
         fn main() -> void { }",
    );
    assert!(ir.contains("sext i32"));
    assert!(ir.contains("uitofp i32"));
}

#[test]
fn println_builtin_body_calls_printf() {
    let ir = lower("fn main() -> void { println(42); }");
    assert!(ir.contains("declare i32 @printf(ptr, ...)"));
    assert!(ir.contains("define void @println(i32 %n)"));
    assert!(ir.contains("call i32 (ptr, ...) @printf"));
}

#[test]
fn test_mode_emits_a_test_runner_main() {
    let ir = lower_tests(
        "test \"always passes\" { let x: i32 = 1; }\n\
         test failing { return @Nope; }",
    );
    assert!(ir.contains("define void @always_passes(ptr sret(%err.struct.void) %ret)"));
    assert!(ir.contains("define void @failing(ptr sret(%err.struct.void) %ret)"));
    assert!(ir.contains("FAILED test %s: %s"));
    // The runner returns the failure count, not a constant.
    assert!(ir.contains("define i32 @main()"));
    assert!(!ir.contains("call void @__builtin_main"));
}

#[test]
fn sizeof_folds_to_target_size() {
    let ir = lower(
        "struct P { a: i32, b: i64 }\n\
         fn main() -> void { let s: u64 = sizeof(P); }",
    );
    // i32 + pad + i64 under C layout.
    assert!(ir.contains("store i64 16"));
}

#[test]
fn member_access_uses_field_indices() {
    let ir = lower(
        "struct P { x: i32, y: i32 }\n\
         fn main() -> void { let p: P = P { x: 1, y: 2 }; let v: i32 = p.y; }",
    );
    assert!(ir.contains("getelementptr inbounds %struct.P, ptr %p, i32 0, i32 1"));
}
