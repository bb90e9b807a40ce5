//! Phase sequencing.
//!
//! lex -> parse -> import/merge -> resolve (-> checks) -> lower -> backend,
//! with the `-dump` early exits between phases. Diagnostics for a phase
//! are flushed together before the driver refuses to advance.

use crate::merge;
use crate::options::Options;
use crate::stats::Stats;
use anyhow::Context;
use dmz_codegen::Codegen;
use dmz_parser::ast::Decl;
use dmz_parser::{DiagnosticEngine, Lexer, Parser, SourceMap, Token};
use dmz_sema::cfg::CfgBuilder;
use dmz_sema::{DeclKind, Sema};
use std::io::Write as _;
use std::process::{Command, Stdio};

pub fn run(options: Options) -> anyhow::Result<i32> {
    let mut stats = Stats::default();
    let code = run_phases(&options, &mut stats);
    if options.print_stats {
        stats.print();
    }
    code
}

fn run_phases(options: &Options, stats: &mut Stats) -> anyhow::Result<i32> {
    // Source checks.
    if options.sources.is_empty() {
        eprintln!("error: no source files specified");
        return Ok(1);
    }
    let mut bad_sources = false;
    for source in &options.sources {
        if source.extension().and_then(|e| e.to_str()) != Some("dmz") {
            eprintln!(
                "error: unexpected source file extension '{}'",
                source.extension().and_then(|e| e.to_str()).unwrap_or("")
            );
            bad_sources = true;
        }
        if !source.exists() {
            eprintln!("error: failed to open '{}'", source.display());
            bad_sources = true;
        }
    }
    if bad_sources {
        return Ok(1);
    }

    let mut map = SourceMap::new();
    let mut diags = DiagnosticEngine::new();

    // Lexer pass.
    let mut token_streams: Vec<Vec<Token>> = Vec::new();
    for source in &options.sources {
        let text = std::fs::read_to_string(source)
            .with_context(|| format!("failed to read '{}'", source.display()))?;
        let file = map.add(source);
        let (tokens, errors) = Stats::time(&mut stats.lex_ms, || {
            Lexer::new(&text, file).tokenize()
        });
        for error in errors {
            diags.error(error.span(), error.to_string());
        }
        token_streams.push(tokens);
    }

    if options.lexer_dump {
        for (source, tokens) in options.sources.iter().zip(&token_streams) {
            println!("; {}", source.display());
            for token in tokens {
                println!("{}:{}: {}", token.span.line, token.span.col, token.kind);
            }
        }
        diags.flush(&map);
        return Ok(if diags.has_errors() { 1 } else { 0 });
    }
    if diags.has_errors() {
        diags.flush(&map);
        return Ok(1);
    }

    // Parser pass: only the first file of a program build must have main.
    let mut ast: Vec<Decl> = Vec::new();
    let mut parse_ok = true;
    for (index, tokens) in token_streams.into_iter().enumerate() {
        let expect_main = index == 0 && !options.module && !options.test;
        let (decls, ok) = Stats::time(&mut stats.parse_ms, || {
            Parser::new(tokens, &mut diags).parse_source_file(expect_main)
        });
        parse_ok &= ok;
        ast.extend(decls);
    }

    if options.ast_dump {
        print!("{}", dmz_parser::ast::dump_decls(&ast));
        diags.flush(&map);
        return Ok(if diags.has_errors() || !parse_ok { 1 } else { 0 });
    }
    if diags.has_errors() || !parse_ok {
        diags.flush(&map);
        return Ok(1);
    }

    // Include pass: discover and merge module units.
    let merged = Stats::time(&mut stats.import_ms, || {
        let units = merge::collect_module_units(&options.includes, &mut map);
        merge::merge_modules(units, &mut diags)
    });
    match merged {
        Some(merged) => ast.extend(merged),
        None => {
            diags.flush(&map);
            return Ok(1);
        }
    }

    if options.import_dump {
        print!("{}", dmz_parser::ast::dump_decls(&ast));
        diags.flush(&map);
        return Ok(0);
    }

    // Semantic pass.
    let prog = Stats::time(&mut stats.semantic_ms, || Sema::resolve(&ast, &mut diags));

    if options.res_dump {
        if let Some(prog) = &prog {
            print!("{}", dmz_sema::dump::dump_program(prog));
        }
        diags.flush(&map);
        return Ok(if prog.is_some() { 0 } else { 1 });
    }
    if options.cfg_dump {
        if let Some(prog) = &prog {
            for decl in &prog.decls {
                let DeclKind::Function(fun) = &decl.kind else {
                    continue;
                };
                if fun.body.is_none() {
                    continue;
                }
                println!("{}:", decl.symbol);
                print!("{}", CfgBuilder::build(prog, fun).dump(&map));
            }
        }
        diags.flush(&map);
        return Ok(if prog.is_some() { 0 } else { 1 });
    }

    let Some(prog) = prog else {
        diags.flush(&map);
        return Ok(1);
    };
    diags.flush(&map); // surviving warnings

    // Codegen pass.
    let source_name = options.sources[0].display().to_string();
    let module = Stats::time(&mut stats.codegen_ms, || {
        Codegen::generate(&prog, &source_name, options.test)
    });
    let text = module.to_string();

    if options.llvm_dump {
        print!("{text}");
        return Ok(0);
    }

    // Backend handoff over a pipe.
    Stats::time(&mut stats.backend_ms, || backend_pass(options, &text))
}

/// Feeds the IR text to the child backend (`lli` for run/test, `clang`
/// otherwise) through stdin and propagates its exit status.
fn backend_pass(options: &Options, text: &str) -> anyhow::Result<i32> {
    let mut command = if options.run || options.test {
        let mut c = Command::new("lli");
        c.arg("-O3");
        c
    } else {
        let mut c = Command::new("clang");
        c.args(["-O0", "-x", "ir", "-"]);
        if options.module {
            c.arg("-c");
        }
        if let Some(output) = &options.output {
            c.arg("-o").arg(output);
        }
        c
    };

    let mut child = command
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn '{:?}'", command.get_program()))?;

    child
        .stdin
        .take()
        .expect("child stdin was piped")
        .write_all(text.as_bytes())
        .context("failed to write IR to the backend")?;

    let status = child.wait().context("failed to wait for the backend")?;
    Ok(status.code().unwrap_or(1))
}
