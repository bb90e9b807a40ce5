//! Module discovery and merging.
//!
//! Walks every include directory for `.dmz` files, parses each without
//! requiring a `main`, and merges same-named module declarations by
//! recursive union on their declaration vectors.

use dmz_parser::ast::{Decl, ModuleDecl};
use dmz_parser::{DiagnosticEngine, Lexer, Parser, SourceMap};
use std::path::Path;

/// Parses every module unit under the include directories. Units that
/// fail to parse are skipped (their diagnostics were already reported by
/// a dedicated engine so broken library files do not fail the build).
pub fn collect_module_units(
    includes: &[std::path::PathBuf],
    map: &mut SourceMap,
) -> Vec<ModuleDecl> {
    let mut modules = Vec::new();

    for include in includes {
        if !include.exists() {
            eprintln!(
                "warning: the include directory does not exist: {}",
                include.display()
            );
            continue;
        }
        if !include.is_dir() {
            eprintln!(
                "warning: the include directory is not a directory: {}",
                include.display()
            );
            continue;
        }
        walk_dir(include, map, &mut modules);
    }

    modules
}

fn walk_dir(dir: &Path, map: &mut SourceMap, modules: &mut Vec<ModuleDecl>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk_dir(&path, map, modules);
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("dmz") {
            continue;
        }
        let Ok(source) = std::fs::read_to_string(&path) else {
            continue;
        };

        let file = map.add(&path);
        let mut unit_diags = DiagnosticEngine::new();
        let (tokens, lex_errors) = Lexer::new(&source, file).tokenize();
        if !lex_errors.is_empty() {
            continue;
        }
        let (decls, ok) = Parser::new(tokens, &mut unit_diags).parse_source_file(false);
        if !ok {
            continue;
        }

        for decl in decls {
            if let Decl::Module(module) = decl {
                modules.push(module);
            }
        }
    }
}

/// Recursive union: duplicate module names merge into one node, any other
/// duplicate is a diagnostic.
pub fn merge_module_decls(
    into: &mut Vec<Decl>,
    from: Vec<Decl>,
    diags: &mut DiagnosticEngine,
) -> bool {
    let mut ok = true;

    for decl in from {
        let existing = decl.name().and_then(|name| {
            into.iter_mut()
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        });

        match existing {
            None => into.push(decl),
            Some(slot) => match (slot, decl) {
                (Decl::Module(target), Decl::Module(source)) => {
                    ok &= merge_module_decls(&mut target.decls, source.decls, diags);
                }
                (_, other) => {
                    let name = other.name().unwrap_or("<anonymous>").to_string();
                    diags.error(
                        other.span(),
                        format!("'{name}' already declared in the module"),
                    );
                    ok = false;
                }
            },
        }
    }

    ok
}

/// Merges the discovered units into one module list appended to the AST.
pub fn merge_modules(
    units: Vec<ModuleDecl>,
    diags: &mut DiagnosticEngine,
) -> Option<Vec<Decl>> {
    let mut merged: Vec<Decl> = Vec::new();
    let mut ok = true;
    for unit in units {
        ok &= merge_module_decls(&mut merged, vec![Decl::Module(unit)], diags);
    }
    ok.then_some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmz_parser::source::FileId;
    use dmz_parser::Lexer;

    fn parse_modules(source: &str) -> Vec<ModuleDecl> {
        let mut diags = DiagnosticEngine::new();
        let (tokens, _) = Lexer::new(source, FileId(0)).tokenize();
        let (decls, ok) = Parser::new(tokens, &mut diags).parse_source_file(false);
        assert!(ok, "parse failed: {:?}", diags.diagnostics());
        decls
            .into_iter()
            .filter_map(|d| match d {
                Decl::Module(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn merges_same_module_across_units() {
        let mut units = parse_modules("module util;\nfn a() -> void {}");
        units.extend(parse_modules("module util;\nfn b() -> void {}"));

        let mut diags = DiagnosticEngine::new();
        let merged = merge_modules(units, &mut diags).unwrap();
        assert_eq!(merged.len(), 1);
        match &merged[0] {
            Decl::Module(m) => {
                assert_eq!(m.name, "util");
                assert_eq!(m.decls.len(), 2);
            }
            _ => panic!("expected module"),
        }
    }

    #[test]
    fn merges_nested_module_paths() {
        let mut units = parse_modules("module std::io;\nfn read() -> void {}");
        units.extend(parse_modules("module std::fmt;\nfn print() -> void {}"));

        let mut diags = DiagnosticEngine::new();
        let merged = merge_modules(units, &mut diags).unwrap();
        assert_eq!(merged.len(), 1);
        match &merged[0] {
            Decl::Module(std_module) => {
                assert_eq!(std_module.name, "std");
                assert_eq!(std_module.decls.len(), 2);
            }
            _ => panic!("expected module"),
        }
    }

    #[test]
    fn duplicate_function_in_module_is_an_error() {
        let mut units = parse_modules("module util;\nfn a() -> void {}");
        units.extend(parse_modules("module util;\nfn a() -> void {}"));

        let mut diags = DiagnosticEngine::new();
        assert!(merge_modules(units, &mut diags).is_none());
        assert!(diags.has_errors());
    }
}
