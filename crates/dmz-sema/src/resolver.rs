//! Two-phase semantic analysis.
//!
//! The declaration pass builds resolved shells for every module, struct,
//! error group and function signature; the body pass resolves statements
//! and expressions, specializing generics on demand, and runs the
//! flow-sensitive checks after each function body.

mod decl;
mod expr;
mod generics;
mod stmt;

use crate::resolved::*;
use crate::ty::Ty;
use dmz_parser::ast;
use dmz_parser::diag::DiagnosticEngine;
use dmz_parser::source::{FileId, Span};
use rustc_hash::FxHashMap;

/// Names that user code may not declare.
const RESERVED_NAMES: &[&str] = &["printf", "println"];

pub struct Sema<'a> {
    pub(crate) diags: &'a mut DiagnosticEngine,
    pub(crate) prog: ResolvedProgram,

    /// Lexical scope stack; the outermost level holds the roots.
    pub(crate) scopes: Vec<FxHashMap<String, DeclId>>,
    /// Mirrors the scope stack: defers registered per scope.
    pub(crate) defer_scopes: Vec<Vec<DeferId>>,
    /// Defer table of the function currently being resolved.
    pub(crate) fn_defers: Vec<DeferBlock>,

    pub(crate) current_fn: Option<DeclId>,
    pub(crate) current_struct: Option<DeclId>,

    /// Dotted module path -> resolved module; read-only after the
    /// declaration pass.
    pub(crate) modules_for_import: FxHashMap<String, DeclId>,

    /// AST bodies kept alive for the body pass and for re-resolving
    /// generic templates during specialization.
    pub(crate) fn_asts: FxHashMap<DeclId, &'a ast::FunctionDecl>,
    pub(crate) struct_asts: FxHashMap<DeclId, &'a ast::StructDecl>,
    pub(crate) test_bodies: FxHashMap<DeclId, &'a ast::Block>,

    /// Function declarations in body-resolution order.
    pub(crate) body_order: Vec<DeclId>,
}

impl<'a> Sema<'a> {
    pub fn new(diags: &'a mut DiagnosticEngine) -> Self {
        Self {
            diags,
            prog: ResolvedProgram::default(),
            scopes: Vec::new(),
            defer_scopes: Vec::new(),
            fn_defers: Vec::new(),
            current_fn: None,
            current_struct: None,
            modules_for_import: FxHashMap::default(),
            fn_asts: FxHashMap::default(),
            struct_asts: FxHashMap::default(),
            test_bodies: FxHashMap::default(),
            body_order: Vec::new(),
        }
    }

    /// Resolves the merged AST into a typed tree. Returns `None` if any
    /// diagnostic error was reported.
    pub fn resolve(ast: &'a [ast::Decl], diags: &'a mut DiagnosticEngine) -> Option<ResolvedProgram> {
        let mut sema = Sema::new(diags);
        sema.declare_builtins();
        sema.resolve_decl_pass(ast);
        sema.assign_symbol_names();
        sema.resolve_body_pass();

        if sema.diags.has_errors() {
            return None;
        }
        Some(sema.prog)
    }

    fn builtin_span() -> Span {
        Span::new(FileId(0), 0, 0)
    }

    /// `printf` (extern, vararg) and `println(n: i32)`; both names are
    /// reserved.
    fn declare_builtins(&mut self) {
        let span = Self::builtin_span();

        let fmt = self.prog.add_decl(ResolvedDecl {
            name: "fmt".into(),
            symbol: "fmt".into(),
            span,
            is_public: true,
            parent: None,
            kind: DeclKind::Param {
                ty: Ty::ptr_to(Ty::U8),
                by_ref: false,
                is_vararg: false,
            },
        });
        let vararg = self.prog.add_decl(ResolvedDecl {
            name: "...".into(),
            symbol: "...".into(),
            span,
            is_public: true,
            parent: None,
            kind: DeclKind::Param {
                ty: Ty::Void,
                by_ref: false,
                is_vararg: true,
            },
        });
        let printf = self.prog.add_decl(ResolvedDecl {
            name: "printf".into(),
            symbol: "printf".into(),
            span,
            is_public: true,
            parent: None,
            kind: DeclKind::Function(FunctionData {
                ret: Ty::I32,
                params: vec![fmt, vararg],
                body: None,
                is_extern: true,
                is_test: false,
                owner: None,
                generic_params: Vec::new(),
                specializations: Vec::new(),
                defers: Vec::new(),
            }),
        });
        self.prog.roots.push(printf);

        let n = self.prog.add_decl(ResolvedDecl {
            name: "n".into(),
            symbol: "n".into(),
            span,
            is_public: true,
            parent: None,
            kind: DeclKind::Param {
                ty: Ty::I32,
                by_ref: false,
                is_vararg: false,
            },
        });
        let println = self.prog.add_decl(ResolvedDecl {
            name: "println".into(),
            symbol: "println".into(),
            span,
            is_public: true,
            parent: None,
            kind: DeclKind::Function(FunctionData {
                ret: Ty::Void,
                params: vec![n],
                body: None,
                is_extern: false,
                is_test: false,
                owner: None,
                generic_params: Vec::new(),
                specializations: Vec::new(),
                defers: Vec::new(),
            }),
        });
        self.prog.roots.push(println);
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
        self.defer_scopes.push(Vec::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
        self.defer_scopes.pop();
    }

    /// Binds without a redeclaration check (environment reconstruction).
    pub(crate) fn bind(&mut self, id: DeclId) {
        let name = self.prog.decl(id).name.clone();
        self.scopes
            .last_mut()
            .expect("no scope to bind into")
            .insert(name, id);
    }

    /// Inserts into the innermost scope, reporting redeclarations and
    /// reserved-name collisions.
    pub(crate) fn insert_decl(&mut self, id: DeclId) -> bool {
        let name = self.prog.decl(id).name.clone();
        let span = self.prog.decl(id).span;

        if RESERVED_NAMES.contains(&name.as_str()) {
            self.diags.error(
                span,
                format!("'{name}' is a reserved function name and cannot be redeclared"),
            );
            return false;
        }
        if self
            .scopes
            .last()
            .expect("no scope to insert into")
            .contains_key(&name)
        {
            self.diags.error(span, format!("redeclaration of '{name}'"));
            return false;
        }
        self.scopes.last_mut().unwrap().insert(name, id);
        true
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<DeclId> {
        for scope in self.scopes.iter().rev() {
            if let Some(id) = scope.get(name) {
                return Some(*id);
            }
        }
        None
    }

    /// Rebuilds the lexical environment of a declaration (global scope
    /// plus its module chain) and runs `f` inside it, saving and restoring
    /// all resolution state. Used for function bodies and specialization.
    pub(crate) fn with_env<T>(
        &mut self,
        parent: Option<DeclId>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved_scopes = std::mem::take(&mut self.scopes);
        let saved_defer_scopes = std::mem::take(&mut self.defer_scopes);
        let saved_fn_defers = std::mem::take(&mut self.fn_defers);
        let saved_fn = self.current_fn.take();
        let saved_struct = self.current_struct.take();

        self.push_scope();
        for root in self.prog.roots.clone() {
            self.bind(root);
        }

        let mut chain = Vec::new();
        let mut cursor = parent;
        while let Some(id) = cursor {
            if matches!(self.prog.decl(id).kind, DeclKind::Module { .. }) {
                chain.push(id);
            }
            cursor = self.prog.decl(id).parent;
        }
        for module in chain.into_iter().rev() {
            self.push_scope();
            let members = match &self.prog.decl(module).kind {
                DeclKind::Module { decls } => decls.clone(),
                _ => unreachable!(),
            };
            for member in members {
                self.bind(member);
            }
        }

        let result = f(self);

        self.scopes = saved_scopes;
        self.defer_scopes = saved_defer_scopes;
        self.fn_defers = saved_fn_defers;
        self.current_fn = saved_fn;
        self.current_struct = saved_struct;
        result
    }

    // ========================================================================
    // Defers
    // ========================================================================

    /// Snapshot of visible defers in reverse registration order. With
    /// `scope_only`, only the innermost scope contributes (block exit);
    /// errdefers are included only when exiting via an error path.
    pub(crate) fn snapshot_defers(&self, scope_only: bool, is_error: bool) -> Vec<DeferId> {
        let mut snapshot = Vec::new();
        for scope in self.defer_scopes.iter().rev() {
            for id in scope.iter().rev() {
                if !is_error && self.fn_defers[id.0 as usize].is_errdefer {
                    continue;
                }
                snapshot.push(*id);
            }
            if scope_only {
                break;
            }
        }
        snapshot
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// `pub` is enforced at module boundaries: a non-pub declaration is
    /// visible only from inside its own module chain.
    pub(crate) fn is_visible(&self, member: DeclId) -> bool {
        if self.prog.decl(member).is_public {
            return true;
        }
        let Some(target) = self.prog.enclosing_module(member) else {
            return true;
        };
        let mut cursor = self.current_fn.and_then(|f| self.prog.decl(f).parent);
        while let Some(id) = cursor {
            if id == target {
                return true;
            }
            cursor = self.prog.decl(id).parent;
        }
        false
    }

    // ========================================================================
    // Symbol names
    // ========================================================================

    /// Post-order walk assigning `module.path.name` symbols; `main`
    /// becomes `__builtin_main`; member functions take the struct's
    /// symbol prefix; error constants take the module prefix directly.
    fn assign_symbol_names(&mut self) {
        let mut stack: Vec<(DeclId, String)> = self
            .prog
            .roots
            .iter()
            .map(|id| (*id, String::new()))
            .collect();

        while let Some((id, prefix)) = stack.pop() {
            let decl = self.prog.decl(id);
            let symbol = if decl.name == "main"
                && matches!(decl.kind, DeclKind::Function(_))
                && decl.parent.is_none()
            {
                "__builtin_main".to_string()
            } else {
                format!("{prefix}{}", sanitize(&decl.name))
            };
            let child_prefix = format!("{symbol}.");
            self.prog.decl_mut(id).symbol = symbol;

            match &self.prog.decl(id).kind {
                DeclKind::Module { decls } => {
                    for child in decls.clone() {
                        stack.push((child, child_prefix.clone()));
                    }
                }
                DeclKind::Struct(data) => {
                    for method in data.methods.clone() {
                        stack.push((method, child_prefix.clone()));
                    }
                    // Specializations created during the declaration pass
                    // predate their template's symbol; re-derive them.
                    let specializations = data.specializations.clone();
                    for (args, specialized) in specializations {
                        let symbol = format!(
                            "{}{}",
                            self.prog.decl(id).symbol,
                            Ty::symbol_suffix(&args, &self.prog)
                        );
                        self.prog.decl_mut(specialized).symbol = symbol;
                    }
                }
                DeclKind::ErrGroup { errors } => {
                    // Error tags use the module prefix, not the group's.
                    for err in errors.clone() {
                        stack.push((err, prefix.clone()));
                    }
                }
                DeclKind::Var { ty, .. } => {
                    if let Ty::ErrorGroup(group) = ty {
                        stack.push((*group, prefix.clone()));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Symbols may not contain whitespace (test names can).
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
