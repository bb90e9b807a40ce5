//! Tests for the CFG builder.

use dmz_parser::source::FileId;
use dmz_parser::{DiagnosticEngine, Lexer, Parser};
use dmz_sema::cfg::{Cfg, CfgBuilder};
use dmz_sema::{DeclKind, ResolvedProgram, Sema};

fn resolve(source: &str) -> ResolvedProgram {
    let mut diags = DiagnosticEngine::new();
    let (tokens, _) = Lexer::new(source, FileId(0)).tokenize();
    let (ast, _) = Parser::new(tokens, &mut diags).parse_source_file(false);
    Sema::resolve(&ast, &mut diags).unwrap_or_else(|| {
        panic!("resolution failed: {:?}", diags.diagnostics());
    })
}

fn cfg_for<'a>(prog: &'a ResolvedProgram, name: &str) -> Cfg<'a> {
    let fun = prog
        .decls
        .iter()
        .find_map(|d| match &d.kind {
            DeclKind::Function(f) if d.symbol == name => Some(f),
            _ => None,
        })
        .expect("function not found");
    CfgBuilder::build(prog, fun)
}

/// Reachable-edge walk from entry.
fn reachable_blocks(cfg: &Cfg) -> Vec<usize> {
    let mut seen = vec![false; cfg.blocks.len()];
    let mut worklist = vec![cfg.entry];
    while let Some(bb) = worklist.pop() {
        if std::mem::replace(&mut seen[bb], true) {
            continue;
        }
        for (succ, reachable) in &cfg.blocks[bb].successors {
            if *reachable {
                worklist.push(*succ);
            }
        }
    }
    seen.iter()
        .enumerate()
        .filter(|(_, s)| **s)
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn exit_is_block_zero_and_entry_is_last() {
    let prog = resolve("fn add(a: i32, b: i32) -> i32 { return a + b; }\nfn main() -> void { }");
    let cfg = cfg_for(&prog, "add");
    assert_eq!(cfg.exit, 0);
    assert_eq!(cfg.entry, cfg.blocks.len() - 1);
    // entry -> body(return) -> exit.
    assert!(reachable_blocks(&cfg).contains(&cfg.exit));
}

#[test]
fn if_branches_both_reach_the_join() {
    let prog = resolve(
        "fn f(c: bool) -> i32 { if (c) { return 1; } return 2; }\nfn main() -> void { }",
    );
    let cfg = cfg_for(&prog, "f");
    let reachable = reachable_blocks(&cfg);
    // Both returns live in distinct blocks that reach the exit.
    assert!(reachable.contains(&cfg.exit));
    assert!(reachable.len() >= 4);
}

#[test]
fn while_latch_loops_back_to_the_header() {
    let prog = resolve(
        "fn f() -> void { let i: i32 = 0; while (i < 3) { i = i + 1; } }\nfn main() -> void { }",
    );
    let cfg = cfg_for(&prog, "f");
    // Some block has a successor with a smaller index on a true edge and
    // also appears as its own predecessor chain (the loop).
    let has_back_edge = cfg
        .blocks
        .iter()
        .enumerate()
        .any(|(i, b)| b.successors.iter().any(|(s, _)| *s > i));
    assert!(has_back_edge);
}

#[test]
fn while_false_body_edge_is_unreachable() {
    let prog = resolve("fn f() -> void { while (false) { println(1); } }\nfn main() -> void { }");
    let cfg = cfg_for(&prog, "f");

    // The header has one unreachable (body) and one reachable (exit) edge.
    let header = cfg
        .blocks
        .iter()
        .find(|b| b.successors.len() == 2)
        .expect("loop header");
    let reachable_edges: Vec<bool> = header.successors.iter().map(|(_, r)| *r).collect();
    assert!(reachable_edges.contains(&true));
    assert!(reachable_edges.contains(&false));
}

#[test]
fn constant_switch_marks_sibling_cases_unreachable() {
    let prog = resolve(
        "fn f() -> void {\n\
             switch (2) { case 1 => println(1); case 2 => println(2); else => println(3); }\n\
         }\n\
         fn main() -> void { }",
    );
    let cfg = cfg_for(&prog, "f");
    let header = cfg
        .blocks
        .iter()
        .find(|b| b.successors.len() == 3)
        .expect("switch header");
    let reachable_count = header.successors.iter().filter(|(_, r)| *r).count();
    // Only the matching case stays reachable.
    assert_eq!(reachable_count, 1);
}

#[test]
fn return_defers_sink_before_the_exit() {
    let prog = resolve(
        "fn f() -> void { defer println(1); return; }\nfn main() -> void { }",
    );
    let cfg = cfg_for(&prog, "f");
    // The defer body contributes statements between the return and exit.
    let total_stmts: usize = cfg.blocks.iter().map(|b| b.stmts.len()).sum();
    assert!(total_stmts >= 3, "defer statements missing from the CFG");
}

#[test]
fn for_loop_builds_header_and_latch() {
    let prog = resolve(
        "fn f() -> void { for (0..3) |i| { println(1); } }\nfn main() -> void { }",
    );
    let cfg = cfg_for(&prog, "f");
    assert!(reachable_blocks(&cfg).contains(&cfg.exit));
}
