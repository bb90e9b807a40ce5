//! Declaration pass: resolved shells for modules, structs, error groups,
//! functions and imports, plus type resolution and the struct-cycle check.

use super::Sema;
use crate::resolved::*;
use crate::ty::Ty;
use dmz_parser::ast::{self, Decl, TypeExprKind};
use dmz_parser::source::Span;
use rustc_hash::FxHashSet;

struct PendingFn<'a> {
    ast: &'a ast::FunctionDecl,
    parent: Option<DeclId>,
}

struct PendingTest<'a> {
    ast: &'a ast::TestDecl,
    parent: Option<DeclId>,
}

impl<'a> Sema<'a> {
    pub(crate) fn resolve_decl_pass(&mut self, ast: &'a [ast::Decl]) {
        let mut pending_fns = Vec::new();
        let mut pending_tests = Vec::new();
        let mut pending_imports = Vec::new();

        // Shells first: modules, structs, error groups, module constants.
        let root_ids = self.resolve_decl_shells(
            ast,
            None,
            "",
            &mut pending_fns,
            &mut pending_tests,
            &mut pending_imports,
        );
        self.prog.roots.extend(root_ids);

        // Struct fields resolve once every struct shell exists.
        self.resolve_all_struct_fields();

        // Function signatures see the full module environments.
        for pending in pending_fns {
            if let Some(id) = self.resolve_function_shell(pending.ast, pending.parent) {
                self.attach_to_parent(id, pending.parent);
            }
        }
        for pending in pending_tests {
            let id = self.resolve_test_shell(pending.ast, pending.parent);
            self.attach_to_parent(id, pending.parent);
        }

        // Imports must name modules that exist after merging.
        for import in pending_imports {
            if let Some(id) = self.resolve_import_decl(import) {
                self.prog.roots.push(id);
            }
        }
    }

    fn attach_to_parent(&mut self, id: DeclId, parent: Option<DeclId>) {
        // Member functions attach to their struct regardless of module.
        let owner = match &self.prog.decl(id).kind {
            DeclKind::Function(f) => f.owner,
            _ => None,
        };
        if let Some(strukt) = owner {
            match &mut self.prog.decl_mut(strukt).kind {
                DeclKind::Struct(data) => data.methods.push(id),
                _ => unreachable!(),
            }
            return;
        }

        match parent {
            None => self.prog.roots.push(id),
            Some(parent_id) => match &mut self.prog.decl_mut(parent_id).kind {
                DeclKind::Module { decls } => decls.push(id),
                _ => unreachable!("functions can only nest in modules"),
            },
        }
    }

    fn resolve_decl_shells(
        &mut self,
        decls: &'a [ast::Decl],
        parent: Option<DeclId>,
        path: &str,
        pending_fns: &mut Vec<PendingFn<'a>>,
        pending_tests: &mut Vec<PendingTest<'a>>,
        pending_imports: &mut Vec<&'a ast::ImportDecl>,
    ) -> Vec<DeclId> {
        let mut ids = Vec::new();
        let mut names = FxHashSet::default();

        for decl in decls {
            if let Some(name) = decl.name() {
                if !matches!(decl, Decl::Module(_) | Decl::Import(_)) && !names.insert(name.to_string())
                {
                    self.diags
                        .error(decl.span(), format!("redeclaration of '{name}'"));
                    continue;
                }
            }

            match decl {
                Decl::Module(m) => {
                    let id = self.resolve_module_shell(
                        m,
                        parent,
                        path,
                        pending_fns,
                        pending_tests,
                        pending_imports,
                    );
                    ids.push(id);
                }
                Decl::Struct(s) => {
                    let id = self.resolve_struct_shell(s, parent);
                    ids.push(id);
                }
                Decl::ErrGroup(g) => {
                    let id = self.resolve_err_group_shell(g, parent);
                    ids.push(id);
                }
                Decl::Var(v) => {
                    if let Some(id) = self.resolve_module_var(v, parent) {
                        ids.push(id);
                    }
                }
                Decl::Function(f) => pending_fns.push(PendingFn { ast: f, parent }),
                Decl::Test(t) => pending_tests.push(PendingTest { ast: t, parent }),
                Decl::Import(i) => {
                    if parent.is_some() {
                        self.diags
                            .error(i.span, "imports are only allowed at the top level");
                    } else {
                        pending_imports.push(i);
                    }
                }
            }
        }

        ids
    }

    fn resolve_module_shell(
        &mut self,
        module: &'a ast::ModuleDecl,
        parent: Option<DeclId>,
        path: &str,
        pending_fns: &mut Vec<PendingFn<'a>>,
        pending_tests: &mut Vec<PendingTest<'a>>,
        pending_imports: &mut Vec<&'a ast::ImportDecl>,
    ) -> DeclId {
        let id = self.prog.add_decl(ResolvedDecl {
            name: module.name.clone(),
            symbol: String::new(),
            span: module.span,
            is_public: true,
            parent,
            kind: DeclKind::Module { decls: Vec::new() },
        });

        let module_path = if path.is_empty() {
            module.name.clone()
        } else {
            format!("{path}::{}", module.name)
        };
        self.modules_for_import.insert(module_path.clone(), id);

        let children = self.resolve_decl_shells(
            &module.decls,
            Some(id),
            &module_path,
            pending_fns,
            pending_tests,
            pending_imports,
        );
        match &mut self.prog.decl_mut(id).kind {
            DeclKind::Module { decls } => *decls = children,
            _ => unreachable!(),
        }

        id
    }

    fn resolve_struct_shell(&mut self, s: &'a ast::StructDecl, parent: Option<DeclId>) -> DeclId {
        let id = self.prog.add_decl(ResolvedDecl {
            name: s.name.clone(),
            symbol: String::new(),
            span: s.span,
            is_public: s.is_public,
            parent,
            kind: DeclKind::Struct(StructData {
                fields: Vec::new(),
                methods: Vec::new(),
                generic_params: Vec::new(),
                specializations: Vec::new(),
            }),
        });

        let generic_params: Vec<DeclId> = s
            .generic_params
            .iter()
            .map(|g| {
                self.prog.add_decl(ResolvedDecl {
                    name: g.name.clone(),
                    symbol: g.name.clone(),
                    span: g.span,
                    is_public: true,
                    parent: Some(id),
                    kind: DeclKind::GenericParam { bound: None },
                })
            })
            .collect();

        // Fields get placeholder types; the field pass fills them in.
        let mut field_names = FxHashSet::default();
        let mut fields = Vec::new();
        for (index, field) in s.fields.iter().enumerate() {
            if !field_names.insert(field.name.clone()) {
                self.diags.error(
                    field.span,
                    format!("field '{}' is already declared", field.name),
                );
                continue;
            }
            fields.push(self.prog.add_decl(ResolvedDecl {
                name: field.name.clone(),
                symbol: field.name.clone(),
                span: field.span,
                is_public: true,
                parent: Some(id),
                kind: DeclKind::Field {
                    ty: Ty::DefaultInit,
                    index: index as u32,
                },
            }));
        }

        match &mut self.prog.decl_mut(id).kind {
            DeclKind::Struct(data) => {
                data.fields = fields;
                data.generic_params = generic_params;
            }
            _ => unreachable!(),
        }

        self.struct_asts.insert(id, s);
        id
    }

    fn resolve_err_group_shell(&mut self, g: &'a ast::ErrGroupDecl, parent: Option<DeclId>) -> DeclId {
        let id = self.prog.add_decl(ResolvedDecl {
            name: g.name.clone(),
            symbol: String::new(),
            span: g.span,
            is_public: g.is_public,
            parent,
            kind: DeclKind::ErrGroup { errors: Vec::new() },
        });

        let mut names = FxHashSet::default();
        let mut errors = Vec::new();
        for err in &g.errors {
            if !names.insert(err.name.clone()) {
                self.diags
                    .error(err.span, format!("redeclaration of '{}'", err.name));
                continue;
            }
            errors.push(self.prog.add_decl(ResolvedDecl {
                name: err.name.clone(),
                symbol: err.name.clone(),
                span: err.span,
                is_public: true,
                parent: Some(id),
                kind: DeclKind::Err,
            }));
        }

        match &mut self.prog.decl_mut(id).kind {
            DeclKind::ErrGroup { errors: slot } => *slot = errors,
            _ => unreachable!(),
        }
        id
    }

    /// Module-level variables: only `const NAME = err { ... };` bindings.
    fn resolve_module_var(&mut self, v: &'a ast::VarDecl, parent: Option<DeclId>) -> Option<DeclId> {
        if v.is_mutable {
            return report(self, v.span, "module-level variables must be const");
        }
        let Some(ast::Expr::ErrGroup(group)) = &v.init else {
            return report(
                self,
                v.span,
                "only error-group constants are allowed at module level",
            );
        };

        let group_decl = ast::ErrGroupDecl {
            name: v.name.clone(),
            errors: group.errors.clone(),
            is_public: v.is_public,
            span: group.span,
        };
        // The group shell owns the error constants; the binding just
        // carries the group type.
        let group_id = self.resolve_err_group_shell_owned(group_decl, parent);

        let init = ResolvedExpr::new(
            ResolvedExprKind::DeclRef(group_id),
            Ty::ErrorGroup(group_id),
            v.span,
        );
        let id = self.prog.add_decl(ResolvedDecl {
            name: v.name.clone(),
            symbol: String::new(),
            span: v.span,
            is_public: v.is_public,
            parent,
            kind: DeclKind::Var {
                ty: Ty::ErrorGroup(group_id),
                mutable: false,
                init: Some(init),
            },
        });
        Some(id)
    }

    fn resolve_err_group_shell_owned(
        &mut self,
        g: ast::ErrGroupDecl,
        parent: Option<DeclId>,
    ) -> DeclId {
        // Same shape as the borrowed shell; lifetime forces a copy here.
        let id = self.prog.add_decl(ResolvedDecl {
            name: g.name.clone(),
            symbol: String::new(),
            span: g.span,
            is_public: g.is_public,
            parent,
            kind: DeclKind::ErrGroup { errors: Vec::new() },
        });
        let mut names = FxHashSet::default();
        let mut errors = Vec::new();
        for err in &g.errors {
            if !names.insert(err.name.clone()) {
                self.diags
                    .error(err.span, format!("redeclaration of '{}'", err.name));
                continue;
            }
            errors.push(self.prog.add_decl(ResolvedDecl {
                name: err.name.clone(),
                symbol: err.name.clone(),
                span: err.span,
                is_public: true,
                parent: Some(id),
                kind: DeclKind::Err,
            }));
        }
        match &mut self.prog.decl_mut(id).kind {
            DeclKind::ErrGroup { errors: slot } => *slot = errors,
            _ => unreachable!(),
        }
        id
    }

    // ========================================================================
    // Functions
    // ========================================================================

    pub(crate) fn resolve_function_shell(
        &mut self,
        f: &'a ast::FunctionDecl,
        parent: Option<DeclId>,
    ) -> Option<DeclId> {
        if super::RESERVED_NAMES.contains(&f.name.as_str()) {
            return report(
                self,
                f.span,
                format!(
                    "'{}' is a reserved function name and cannot be used for user-defined functions",
                    f.name
                ),
            );
        }

        self.with_env(parent, |sema| {
            sema.push_scope();

            // Generic parameters resolve to themselves in the template.
            let generic_params: Vec<DeclId> = f
                .generic_params
                .iter()
                .map(|g| {
                    let id = sema.prog.add_decl(ResolvedDecl {
                        name: g.name.clone(),
                        symbol: g.name.clone(),
                        span: g.span,
                        is_public: true,
                        parent,
                        kind: DeclKind::GenericParam { bound: None },
                    });
                    sema.bind(id);
                    id
                })
                .collect();

            let owner = match &f.struct_name {
                Some(struct_name) => {
                    let Some(strukt) = sema.lookup(struct_name).filter(|id| {
                        matches!(sema.prog.decl(*id).kind, DeclKind::Struct(_))
                    }) else {
                        sema.diags.error(
                            f.span,
                            format!("'{struct_name}' is not a struct type"),
                        );
                        sema.pop_scope();
                        return None;
                    };
                    Some(strukt)
                }
                None => None,
            };

            let ret = match sema.resolve_type(&f.return_type) {
                Some(ty) => ty,
                None => {
                    sema.diags.error(
                        f.span,
                        format!(
                            "function '{}' has invalid '{}' type",
                            f.name,
                            f.return_type.name()
                        ),
                    );
                    sema.pop_scope();
                    return None;
                }
            };

            if f.name == "main" && parent.is_none() && owner.is_none() {
                if ret != Ty::Void {
                    sema.diags
                        .error(f.span, "'main' function is expected to have 'void' type");
                    sema.pop_scope();
                    return None;
                }
                if !f.params.is_empty() {
                    sema.diags
                        .error(f.span, "'main' function is expected to take no arguments");
                    sema.pop_scope();
                    return None;
                }
            }

            sema.push_scope();
            let mut params = Vec::new();
            if let Some(strukt) = owner {
                params.push(sema.make_self_param(strukt, f.span));
            }
            for param in &f.params {
                let Some(id) = sema.resolve_param_decl(param) else {
                    sema.pop_scope();
                    sema.pop_scope();
                    return None;
                };
                if !sema.insert_decl(id) {
                    sema.pop_scope();
                    sema.pop_scope();
                    return None;
                }
                params.push(id);
            }
            sema.pop_scope();
            sema.pop_scope();

            let id = sema.prog.add_decl(ResolvedDecl {
                name: f.name.clone(),
                symbol: String::new(),
                span: f.span,
                is_public: f.is_public,
                parent: owner.or(parent),
                kind: DeclKind::Function(FunctionData {
                    ret,
                    params,
                    body: None,
                    is_extern: f.is_extern,
                    is_test: false,
                    owner,
                    generic_params,
                    specializations: Vec::new(),
                    defers: Vec::new(),
                }),
            });

            if f.body.is_some() {
                sema.fn_asts.insert(id, f);
                sema.body_order.push(id);
            }
            Some(id)
        })
    }

    pub(crate) fn make_self_param(&mut self, strukt: DeclId, span: Span) -> DeclId {
        self.prog.add_decl(ResolvedDecl {
            name: "self".into(),
            symbol: "self".into(),
            span,
            is_public: true,
            parent: Some(strukt),
            kind: DeclKind::Param {
                ty: Ty::ptr_to(Ty::Struct(strukt)),
                by_ref: true,
                is_vararg: false,
            },
        })
    }

    pub(crate) fn resolve_param_decl(&mut self, param: &ast::ParamDecl) -> Option<DeclId> {
        if param.is_vararg {
            return Some(self.prog.add_decl(ResolvedDecl {
                name: param.name.clone(),
                symbol: param.name.clone(),
                span: param.span,
                is_public: true,
                parent: None,
                kind: DeclKind::Param {
                    ty: Ty::Void,
                    by_ref: false,
                    is_vararg: true,
                },
            }));
        }

        let (type_expr, by_ref) = match &param.ty.kind {
            TypeExprKind::Ref(inner) => (inner.as_ref(), true),
            _ => (&param.ty, false),
        };

        let ty = self.resolve_type(type_expr)?;
        if ty == Ty::Void {
            return report(
                self,
                param.span,
                format!(
                    "parameter '{}' has invalid '{}' type",
                    param.name,
                    param.ty.name()
                ),
            );
        }

        Some(self.prog.add_decl(ResolvedDecl {
            name: param.name.clone(),
            symbol: param.name.clone(),
            span: param.span,
            is_public: true,
            parent: None,
            kind: DeclKind::Param {
                ty,
                by_ref,
                is_vararg: false,
            },
        }))
    }

    fn resolve_test_shell(&mut self, t: &'a ast::TestDecl, parent: Option<DeclId>) -> DeclId {
        let id = self.prog.add_decl(ResolvedDecl {
            name: t.name.clone(),
            symbol: String::new(),
            span: t.span,
            is_public: true,
            parent,
            kind: DeclKind::Function(FunctionData {
                ret: Ty::optional_of(Ty::Void),
                params: Vec::new(),
                body: None,
                is_extern: false,
                is_test: true,
                owner: None,
                generic_params: Vec::new(),
                specializations: Vec::new(),
                defers: Vec::new(),
            }),
        });
        self.test_bodies.insert(id, &t.body);
        self.body_order.push(id);
        id
    }

    fn resolve_import_decl(&mut self, import: &ast::ImportDecl) -> Option<DeclId> {
        let module_id = import.module_id();
        let Some(module) = self.modules_for_import.get(&module_id).copied() else {
            return report(
                self,
                import.span,
                format!("module '{module_id}' not found"),
            );
        };

        Some(self.prog.add_decl(ResolvedDecl {
            name: import.binding().to_string(),
            symbol: import.binding().to_string(),
            span: import.span,
            is_public: false,
            parent: None,
            kind: DeclKind::Import { module },
        }))
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub(crate) fn resolve_type(&mut self, t: &ast::TypeExpr) -> Option<Ty> {
        match &t.kind {
            TypeExprKind::Void => Some(Ty::Void),
            TypeExprKind::Bool => Some(Ty::Bool),
            TypeExprKind::Error => Some(Ty::Error),
            TypeExprKind::Number { kind, bits } => Some(Ty::Number {
                kind: *kind,
                bits: *bits,
            }),
            TypeExprKind::Named { name, generic_args } => {
                let Some(id) = self.lookup(name) else {
                    return report(self, t.span, format!("unable to resolve '{name}' type"));
                };
                match &self.prog.decl(id).kind {
                    DeclKind::Struct(data) => {
                        if data.is_generic() {
                            if generic_args.is_empty() {
                                return report(
                                    self,
                                    t.span,
                                    format!("'{name}' is a generic and needs specialization"),
                                );
                            }
                            let args: Option<Vec<Ty>> = generic_args
                                .iter()
                                .map(|arg| self.resolve_type(arg))
                                .collect();
                            let specialized = self.specialize_generic_struct(id, &args?, t.span)?;
                            Some(Ty::Struct(specialized))
                        } else {
                            if !generic_args.is_empty() {
                                return report(
                                    self,
                                    t.span,
                                    format!("'{name}' is not a generic struct"),
                                );
                            }
                            Some(Ty::Struct(id))
                        }
                    }
                    DeclKind::GenericParam { bound } => {
                        Some(bound.clone().unwrap_or(Ty::Generic(id)))
                    }
                    _ => report(self, t.span, format!("'{name}' is not a type")),
                }
            }
            TypeExprKind::Function { params, ret } => {
                let params: Option<Vec<Ty>> =
                    params.iter().map(|p| self.resolve_type(p)).collect();
                let ret = self.resolve_type(ret)?;
                Some(Ty::Function {
                    params: params?,
                    ret: Box::new(ret),
                })
            }
            TypeExprKind::Slice(inner) => Some(Ty::Slice(Box::new(self.resolve_type(inner)?))),
            TypeExprKind::Array { elem, len } => Some(Ty::Array {
                elem: Box::new(self.resolve_type(elem)?),
                len: *len,
            }),
            TypeExprKind::Pointer(inner) => {
                Some(Ty::Pointer(Box::new(self.resolve_type(inner)?)))
            }
            TypeExprKind::Optional(inner) => {
                Some(Ty::Optional(Box::new(self.resolve_type(inner)?)))
            }
            TypeExprKind::Ref(_) => report(
                self,
                t.span,
                "reference types are only allowed on parameters",
            ),
        }
    }

    // ========================================================================
    // Struct fields and cycles
    // ========================================================================

    fn resolve_all_struct_fields(&mut self) {
        // Sorted so that on-demand specializations created along the way
        // land in a deterministic arena order.
        let mut struct_ids: Vec<DeclId> = self
            .struct_asts
            .iter()
            .filter(|(id, _)| !self.prog.strukt(**id).is_generic())
            .map(|(id, _)| *id)
            .collect();
        struct_ids.sort_by_key(|id| id.0);

        for id in &struct_ids {
            self.resolve_struct_fields(*id);
        }
        for id in &struct_ids {
            self.check_struct_cycles(*id);
        }
    }

    pub(crate) fn resolve_struct_fields(&mut self, id: DeclId) {
        let ast = self.struct_asts.get(&id).copied();
        let parent = self.prog.decl(id).parent;
        let Some(ast) = ast else { return };

        self.with_env(parent, |sema| {
            let fields = sema.prog.strukt(id).fields.clone();
            for (field_id, field_ast) in fields.iter().zip(ast.fields.iter()) {
                let ty = match sema.resolve_type(&field_ast.ty) {
                    Some(Ty::Void) => {
                        sema.diags
                            .error(field_ast.span, "struct field cannot be void");
                        continue;
                    }
                    Some(ty) => ty,
                    None => continue,
                };
                match &mut sema.prog.decl_mut(*field_id).kind {
                    DeclKind::Field { ty: slot, .. } => *slot = ty,
                    _ => unreachable!(),
                }
            }
        });
    }

    /// Worklist walk over value-embedded struct references; pointers and
    /// slices break cycles.
    pub(crate) fn check_struct_cycles(&mut self, root: DeclId) -> bool {
        let mut worklist: Vec<(DeclId, FxHashSet<DeclId>)> = vec![(root, FxHashSet::default())];

        while let Some((current, mut visited)) = worklist.pop() {
            if !visited.insert(current) {
                self.diags.error(
                    self.prog.decl(current).span,
                    format!("struct '{}' contains itself", self.prog.decl(current).name),
                );
                return false;
            }

            for field in self.prog.strukt(current).fields.clone() {
                let DeclKind::Field { ty, .. } = &self.prog.decl(field).kind else {
                    unreachable!()
                };
                if let Some(nested) = embedded_struct(ty) {
                    worklist.push((nested, visited.clone()));
                }
            }
        }
        true
    }
}

/// The struct a field embeds by value, if any.
fn embedded_struct(ty: &Ty) -> Option<DeclId> {
    match ty {
        Ty::Struct(id) => Some(*id),
        Ty::Array { elem, .. } => embedded_struct(elem),
        Ty::Optional(inner) => embedded_struct(inner),
        _ => None,
    }
}

fn report<T>(sema: &mut Sema, span: Span, msg: impl Into<String>) -> Option<T> {
    sema.diags.error(span, msg);
    None
}
