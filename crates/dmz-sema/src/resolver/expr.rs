//! Body pass: expression resolution.

use super::Sema;
use crate::constexpr;
use crate::resolved::*;
use crate::ty::Ty;
use dmz_parser::ast::{self, UnaryOp};
use dmz_parser::source::Span;

impl<'a> Sema<'a> {
    pub(crate) fn resolve_expr(&mut self, e: &ast::Expr) -> Option<ResolvedExpr> {
        self.resolve_expr_inner(e, None, false)
    }

    /// Like [`Self::resolve_expr`] with a binding-name hint for anonymous
    /// error groups.
    pub(crate) fn resolve_expr_named(
        &mut self,
        e: &ast::Expr,
        hint: Option<&str>,
    ) -> Option<ResolvedExpr> {
        self.resolve_expr_inner(e, hint, false)
    }

    fn resolve_callee(&mut self, e: &ast::Expr) -> Option<ResolvedExpr> {
        self.resolve_expr_inner(e, None, true)
    }

    fn resolve_expr_inner(
        &mut self,
        e: &ast::Expr,
        hint: Option<&str>,
        is_callee: bool,
    ) -> Option<ResolvedExpr> {
        match e {
            ast::Expr::IntLit(lit) => Some(ResolvedExpr::new(
                ResolvedExprKind::IntLit(lit.value),
                Ty::I32,
                lit.span,
            )),
            ast::Expr::FloatLit(lit) => Some(ResolvedExpr::new(
                ResolvedExprKind::FloatLit(lit.value),
                Ty::F64,
                lit.span,
            )),
            ast::Expr::CharLit(lit) => Some(ResolvedExpr::new(
                ResolvedExprKind::CharLit(lit.value),
                Ty::Number {
                    kind: crate::ty::NumberKind::Signed,
                    bits: 8,
                },
                lit.span,
            )),
            ast::Expr::BoolLit(lit) => Some(ResolvedExpr::new(
                ResolvedExprKind::BoolLit(lit.value),
                Ty::Bool,
                lit.span,
            )),
            ast::Expr::StrLit(lit) => Some(ResolvedExpr::new(
                ResolvedExprKind::StrLit(lit.value.clone()),
                Ty::ptr_to(Ty::U8),
                lit.span,
            )),
            ast::Expr::NullLit(span) => Some(ResolvedExpr::new(
                ResolvedExprKind::NullLit,
                Ty::ptr_to(Ty::Void),
                *span,
            )),
            ast::Expr::DeclRef(declref) => {
                let Some(id) = self.lookup(&declref.name) else {
                    return self.report(
                        declref.span,
                        format!("symbol '{}' not found", declref.name),
                    );
                };
                self.ref_to_decl(id, declref.span, is_callee)
            }
            ast::Expr::ModulePath(path) => self.resolve_module_path(path, is_callee),
            ast::Expr::Member(member) => self.resolve_member_expr(member, is_callee),
            ast::Expr::SelfMember(member) => self.resolve_self_member_expr(member, is_callee),
            ast::Expr::ArrayAt(at) => self.resolve_array_at_expr(at),
            ast::Expr::ArrayInit(init) => self.resolve_array_init(init),
            ast::Expr::StructInit(init) => self.resolve_struct_init(init),
            ast::Expr::Group(group) => {
                let inner = self.resolve_expr(&group.inner)?;
                let ty = inner.ty.clone();
                Some(ResolvedExpr::new(
                    ResolvedExprKind::Group(Box::new(inner)),
                    ty,
                    group.span,
                ))
            }
            ast::Expr::Unary(unary) => self.resolve_unary(unary),
            ast::Expr::Binary(binary) => self.resolve_binary(binary),
            ast::Expr::Ref(r) => self.resolve_ref_expr(r),
            ast::Expr::Deref(d) => self.resolve_deref_expr(d),
            ast::Expr::Call(call) => self.resolve_call_expr(call),
            ast::Expr::Sizeof(s) => {
                let ty = self.resolve_type(&s.ty)?;
                Some(ResolvedExpr::new(
                    ResolvedExprKind::Sizeof(ty),
                    Ty::USIZE,
                    s.span,
                ))
            }
            ast::Expr::Range(range) => self.resolve_range_expr(range),
            ast::Expr::ErrorInPlace(tag) => Some(ResolvedExpr::new(
                ResolvedExprKind::ErrorTag(tag.name.clone()),
                Ty::Error,
                tag.span,
            )),
            ast::Expr::ErrRef(err) => {
                let found = self
                    .lookup(&err.name)
                    .filter(|id| matches!(self.prog.decl(*id).kind, DeclKind::Err));
                let Some(id) = found else {
                    return self
                        .report(err.span, format!("error '{}' not found", err.name));
                };
                Some(ResolvedExpr::new(
                    ResolvedExprKind::ErrRef(id),
                    Ty::Error,
                    err.span,
                ))
            }
            ast::Expr::Catch(c) => {
                let inner = self.resolve_expr(&c.inner)?;
                if !matches!(inner.ty, Ty::Optional(_)) {
                    return self.report(inner.span, "expect error union when using catch");
                }
                Some(ResolvedExpr::new(
                    ResolvedExprKind::Catch(Box::new(inner)),
                    Ty::Error,
                    c.span,
                ))
            }
            ast::Expr::Try(t) => {
                let inner = self.resolve_expr(&t.inner)?;
                let Ty::Optional(value_ty) = inner.ty.clone() else {
                    return self.report(inner.span, "expect error union when using try");
                };
                let defers = self.snapshot_defers(false, true);
                Some(ResolvedExpr::new(
                    ResolvedExprKind::Try {
                        inner: Box::new(inner),
                        defers,
                    },
                    *value_ty,
                    t.span,
                ))
            }
            ast::Expr::Unwrap(u) => {
                let inner = self.resolve_expr(&u.inner)?;
                let Ty::Optional(value_ty) = inner.ty.clone() else {
                    return self.report(inner.span, "expect error union when using '!'");
                };
                let defers = self.snapshot_defers(false, true);
                Some(ResolvedExpr::new(
                    ResolvedExprKind::Unwrap {
                        inner: Box::new(inner),
                        defers,
                    },
                    *value_ty,
                    u.span,
                ))
            }
            ast::Expr::OrElse(o) => {
                let inner = self.resolve_expr(&o.inner)?;
                let Ty::Optional(value_ty) = inner.ty.clone() else {
                    return self.report(inner.span, "expect error union when using orelse");
                };
                let fallback = self.resolve_expr(&o.fallback)?;
                if !value_ty.unifies(&fallback.ty) {
                    let value_name = value_ty.display(&self.prog);
                    let fallback_name = fallback.ty.display(&self.prog);
                    return self.report(
                        o.span,
                        format!(
                            "unexpected mismatch of types in orelse expression '{value_name}' and '{fallback_name}'"
                        ),
                    );
                }
                Some(ResolvedExpr::new(
                    ResolvedExprKind::OrElse {
                        inner: Box::new(inner),
                        fallback: Box::new(fallback),
                    },
                    *value_ty,
                    o.span,
                ))
            }
            ast::Expr::Import(import) => {
                let module_id = import.path.join("::");
                let Some(module) = self.modules_for_import.get(&module_id).copied() else {
                    return self
                        .report(import.span, format!("module '{module_id}' not found"));
                };
                Some(ResolvedExpr::new(
                    ResolvedExprKind::DeclRef(module),
                    Ty::Module(module),
                    import.span,
                ))
            }
            ast::Expr::ErrGroup(group) => self.resolve_err_group_expr(group, hint),
        }
    }

    /// Shared tail of decl-refs, module members and module paths.
    fn ref_to_decl(&mut self, id: DeclId, span: Span, is_callee: bool) -> Option<ResolvedExpr> {
        let name = self.prog.decl(id).name.clone();
        match &self.prog.decl(id).kind {
            DeclKind::Function(_) => {
                if !is_callee {
                    return self.report(span, format!("expected to call function '{name}'"));
                }
                let ty = self.prog.fn_ty(id);
                Some(ResolvedExpr::new(ResolvedExprKind::DeclRef(id), ty, span))
            }
            DeclKind::Struct(_) => {
                self.report(span, format!("expected an instance of '{name}'"))
            }
            DeclKind::Var { ty, .. } => {
                let mut expr =
                    ResolvedExpr::new(ResolvedExprKind::DeclRef(id), ty.clone(), span);
                expr.constant = constexpr::evaluate(&self.prog, &expr, false);
                Some(expr)
            }
            DeclKind::Param { ty, .. } | DeclKind::Capture { ty, .. } => Some(
                ResolvedExpr::new(ResolvedExprKind::DeclRef(id), ty.clone(), span),
            ),
            DeclKind::Err => Some(ResolvedExpr::new(
                ResolvedExprKind::ErrRef(id),
                Ty::Error,
                span,
            )),
            DeclKind::ErrGroup { .. } => Some(ResolvedExpr::new(
                ResolvedExprKind::DeclRef(id),
                Ty::ErrorGroup(id),
                span,
            )),
            DeclKind::Module { .. } => Some(ResolvedExpr::new(
                ResolvedExprKind::DeclRef(id),
                Ty::Module(id),
                span,
            )),
            DeclKind::Import { module } => {
                let module = *module;
                Some(ResolvedExpr::new(
                    ResolvedExprKind::DeclRef(module),
                    Ty::Module(module),
                    span,
                ))
            }
            DeclKind::GenericParam { .. } | DeclKind::Field { .. } => {
                self.report(span, format!("'{name}' cannot be used as a value here"))
            }
        }
    }

    fn resolve_module_path(
        &mut self,
        path: &ast::ModulePathExpr,
        is_callee: bool,
    ) -> Option<ResolvedExpr> {
        let first = &path.segments[0];
        let mut module = match self.lookup(first) {
            Some(id) => match &self.prog.decl(id).kind {
                DeclKind::Module { .. } => id,
                DeclKind::Import { module } => *module,
                _ => {
                    return self
                        .report(path.span, format!("'{first}' is not a module"));
                }
            },
            None => match self.modules_for_import.get(first) {
                Some(id) => *id,
                None => {
                    return self
                        .report(path.span, format!("module '{first}' not found"));
                }
            },
        };

        for segment in &path.segments[1..path.segments.len() - 1] {
            let Some(next) = self.lookup_in_module(module, segment) else {
                let module_name = self.prog.decl(module).name.clone();
                return self.report(
                    path.span,
                    format!("module '{module_name}' has no member called '{segment}'"),
                );
            };
            if !matches!(self.prog.decl(next).kind, DeclKind::Module { .. }) {
                return self
                    .report(path.span, format!("'{segment}' is not a module"));
            }
            module = next;
        }

        let last = path.segments.last().unwrap();
        let Some(target) = self.lookup_in_module(module, last) else {
            let module_name = self.prog.decl(module).name.clone();
            return self.report(
                path.span,
                format!("module '{module_name}' has no member called '{last}'"),
            );
        };
        if !self.is_visible(target) {
            return self.report(
                path.span,
                format!("'{last}' is private to its module"),
            );
        }
        self.ref_to_decl(target, path.span, is_callee)
    }

    pub(crate) fn lookup_in_module(&self, module: DeclId, name: &str) -> Option<DeclId> {
        let DeclKind::Module { decls } = &self.prog.decl(module).kind else {
            return None;
        };
        decls
            .iter()
            .copied()
            .find(|id| self.prog.decl(*id).name == name)
    }

    fn resolve_member_expr(
        &mut self,
        member: &ast::MemberExpr,
        is_callee: bool,
    ) -> Option<ResolvedExpr> {
        let base = self.resolve_expr(&member.base)?;

        let base_ty = match &base.ty {
            Ty::Pointer(inner) => (**inner).clone(),
            other => other.clone(),
        };

        match base_ty {
            Ty::Struct(strukt) => {
                self.resolve_struct_member(base, strukt, &member.field, member.span, is_callee)
            }
            Ty::Module(module) => {
                let Some(target) = self.lookup_in_module(module, &member.field) else {
                    let module_name = self.prog.decl(module).name.clone();
                    return self.report(
                        member.span,
                        format!(
                            "module '{module_name}' has no member called '{}'",
                            member.field
                        ),
                    );
                };
                if !self.is_visible(target) {
                    return self.report(
                        member.span,
                        format!("'{}' is private to its module", member.field),
                    );
                }
                // Module bases have no runtime value; the member lowers
                // like a direct reference.
                self.ref_to_decl(target, member.span, is_callee)
            }
            Ty::ErrorGroup(group) => {
                let DeclKind::ErrGroup { errors } = &self.prog.decl(group).kind else {
                    unreachable!()
                };
                let found = errors
                    .iter()
                    .copied()
                    .find(|id| self.prog.decl(*id).name == member.field);
                let Some(err) = found else {
                    return self.report(
                        member.span,
                        format!("error group has no member called '{}'", member.field),
                    );
                };
                Some(ResolvedExpr::new(
                    ResolvedExprKind::ErrRef(err),
                    Ty::Error,
                    member.span,
                ))
            }
            other => {
                let name = other.display(&self.prog);
                self.report(
                    member.base.span(),
                    format!("cannot access member of '{name}'"),
                )
            }
        }
    }

    fn resolve_struct_member(
        &mut self,
        base: ResolvedExpr,
        strukt: DeclId,
        field: &str,
        span: Span,
        is_callee: bool,
    ) -> Option<ResolvedExpr> {
        let data = self.prog.strukt(strukt);

        if let Some(field_id) = data
            .fields
            .iter()
            .copied()
            .find(|id| self.prog.decl(*id).name == field)
        {
            let DeclKind::Field { ty, .. } = &self.prog.decl(field_id).kind else {
                unreachable!()
            };
            let ty = ty.clone();
            return Some(ResolvedExpr::new(
                ResolvedExprKind::Member {
                    base: Box::new(base),
                    member: field_id,
                },
                ty,
                span,
            ));
        }

        if let Some(method) = data
            .methods
            .iter()
            .copied()
            .find(|id| self.prog.decl(*id).name == field)
        {
            if !is_callee {
                return self.report(
                    span,
                    format!("expected to call member function '{field}'"),
                );
            }
            let ty = self.prog.fn_ty(method);
            return Some(ResolvedExpr::new(
                ResolvedExprKind::Member {
                    base: Box::new(base),
                    member: method,
                },
                ty,
                span,
            ));
        }

        let struct_name = self.prog.decl(strukt).name.clone();
        self.report(
            span,
            format!("struct '{struct_name}' has no member called '{field}'"),
        )
    }

    fn resolve_self_member_expr(
        &mut self,
        member: &ast::SelfMemberExpr,
        is_callee: bool,
    ) -> Option<ResolvedExpr> {
        let Some(strukt) = self.current_struct else {
            return self.report(
                member.span,
                "unexpected use of self member outside a struct",
            );
        };
        let current_fn = self.current_fn.expect("self member outside a function");
        let self_param = self.prog.function(current_fn).params[0];

        let (self_ty, _, _) = self.prog.param(self_param);
        let base = ResolvedExpr::new(
            ResolvedExprKind::DeclRef(self_param),
            self_ty.clone(),
            member.span,
        );
        self.resolve_struct_member(base, strukt, &member.field, member.span, is_callee)
    }

    fn resolve_array_at_expr(&mut self, at: &ast::ArrayAtExpr) -> Option<ResolvedExpr> {
        let array = self.resolve_expr(&at.array)?;

        let elem_ty = match &array.ty {
            Ty::Array { elem, .. } => (**elem).clone(),
            Ty::Slice(elem) => (**elem).clone(),
            Ty::Pointer(elem) => (**elem).clone(),
            other => {
                let name = other.display(&self.prog);
                return self.report(
                    at.array.span(),
                    format!("cannot access element of '{name}'"),
                );
            }
        };

        let index = self.resolve_expr(&at.index)?;
        let ty = if index.ty == Ty::Range {
            Ty::Slice(Box::new(elem_ty))
        } else {
            if !index.ty.is_numeric() {
                return self.report(index.span, "array index must be numeric");
            }
            elem_ty
        };

        Some(ResolvedExpr::new(
            ResolvedExprKind::ArrayAt {
                array: Box::new(array),
                index: Box::new(index),
            },
            ty,
            at.span,
        ))
    }

    fn resolve_array_init(&mut self, init: &ast::ArrayInitExpr) -> Option<ResolvedExpr> {
        if init.elems.is_empty() {
            return Some(ResolvedExpr::new(
                ResolvedExprKind::ArrayInit(Vec::new()),
                Ty::DefaultInit,
                init.span,
            ));
        }

        let mut elems = Vec::with_capacity(init.elems.len());
        let mut elem_ty: Option<Ty> = None;
        for elem in &init.elems {
            let mut resolved = self.resolve_expr(elem)?;
            resolved.constant = constexpr::evaluate(&self.prog, &resolved, false);

            match &elem_ty {
                None => elem_ty = Some(resolved.ty.clone()),
                Some(ty) if ty.unifies(&resolved.ty) => {}
                Some(_) => {
                    return self.report(
                        resolved.span,
                        "unexpected different types in array instantiation",
                    );
                }
            }
            elems.push(resolved);
        }

        let ty = Ty::Array {
            elem: Box::new(elem_ty.unwrap()),
            len: elems.len() as u64,
        };
        Some(ResolvedExpr::new(
            ResolvedExprKind::ArrayInit(elems),
            ty,
            init.span,
        ))
    }

    fn resolve_struct_init(&mut self, init: &ast::StructInitExpr) -> Option<ResolvedExpr> {
        let Some(found) = self.lookup(&init.name) else {
            return self.report(
                init.span,
                format!("'{}' is not a struct type", init.name),
            );
        };
        if !matches!(self.prog.decl(found).kind, DeclKind::Struct(_)) {
            return self.report(
                init.span,
                format!("'{}' is not a struct type", init.name),
            );
        }

        let strukt = if self.prog.strukt(found).is_generic() {
            if init.generic_args.is_empty() {
                return self.report(
                    init.span,
                    format!("'{}' is a generic and needs specialization", init.name),
                );
            }
            let args: Option<Vec<Ty>> = init
                .generic_args
                .iter()
                .map(|arg| self.resolve_type(arg))
                .collect();
            self.specialize_generic_struct(found, &args?, init.span)?
        } else {
            if !init.generic_args.is_empty() {
                return self.report(
                    init.span,
                    format!("'{}' is not a generic struct", init.name),
                );
            }
            found
        };

        // Resolve named initializers, then emit one entry per declared
        // field (missing ones default-init to the zeroed slot).
        let mut resolved_inits: Vec<(DeclId, ResolvedExpr, Span)> = Vec::new();
        let mut error = false;
        for field_init in &init.fields {
            let field_decl = self
                .prog
                .strukt(strukt)
                .fields
                .iter()
                .copied()
                .find(|id| self.prog.decl(*id).name == field_init.name);

            let Some(field_decl) = field_decl else {
                self.diags.error(
                    field_init.span,
                    format!(
                        "'{}' has no field named '{}'",
                        init.name, field_init.name
                    ),
                );
                error = true;
                continue;
            };
            if resolved_inits.iter().any(|(id, _, _)| *id == field_decl) {
                self.diags.error(
                    field_init.span,
                    format!("field '{}' is already initialized", field_init.name),
                );
                error = true;
                continue;
            }

            let Some(mut value) = self.resolve_expr(&field_init.value) else {
                error = true;
                continue;
            };
            let DeclKind::Field { ty: field_ty, .. } = &self.prog.decl(field_decl).kind
            else {
                unreachable!()
            };
            if !field_ty.unifies(&value.ty) {
                let value_name = value.ty.display(&self.prog);
                let field_name = field_ty.display(&self.prog);
                self.diags.error(
                    value.span,
                    format!(
                        "'{value_name}' cannot be used to initialize a field of type '{field_name}'"
                    ),
                );
                error = true;
                continue;
            }
            value.constant = constexpr::evaluate(&self.prog, &value, false);
            resolved_inits.push((field_decl, value, field_init.span));
        }

        if error {
            return None;
        }

        let mut fields = Vec::new();
        for field_decl in self.prog.strukt(strukt).fields.clone() {
            let init_value = resolved_inits
                .iter()
                .position(|(id, _, _)| *id == field_decl);
            let resolved = match init_value {
                Some(pos) => {
                    let (_, value, span) = resolved_inits.remove(pos);
                    ResolvedFieldInit {
                        field: field_decl,
                        value,
                        span,
                    }
                }
                None => ResolvedFieldInit {
                    field: field_decl,
                    value: ResolvedExpr::new(
                        ResolvedExprKind::DefaultInit,
                        Ty::DefaultInit,
                        init.span,
                    ),
                    span: init.span,
                },
            };
            fields.push(resolved);
        }

        Some(ResolvedExpr::new(
            ResolvedExprKind::StructInit { strukt, fields },
            Ty::Struct(strukt),
            init.span,
        ))
    }

    fn resolve_unary(&mut self, unary: &ast::UnaryExpr) -> Option<ResolvedExpr> {
        let operand = self.resolve_expr(&unary.operand)?;

        if !operand.ty.is_numeric() {
            let name = operand.ty.display(&self.prog);
            let symbol = match unary.op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            };
            return self.report(
                operand.span,
                format!("'{name}' cannot be used as an operand to unary operator '{symbol}'"),
            );
        }

        let ty = match unary.op {
            UnaryOp::Neg => operand.ty.clone(),
            UnaryOp::Not => Ty::Bool,
        };
        Some(ResolvedExpr::new(
            ResolvedExprKind::Unary {
                op: unary.op,
                operand: Box::new(operand),
            },
            ty,
            unary.span,
        ))
    }

    fn resolve_binary(&mut self, binary: &ast::BinaryExpr) -> Option<ResolvedExpr> {
        let lhs = self.resolve_expr(&binary.lhs)?;
        let rhs = self.resolve_expr(&binary.rhs)?;

        for side in [&lhs, &rhs] {
            if !side.ty.is_numeric() {
                let name = side.ty.display(&self.prog);
                return self.report(
                    side.span,
                    format!("'{name}' cannot be used as an operand to a binary operator"),
                );
            }
        }

        let ty = if binary.op.produces_bool() {
            Ty::Bool
        } else {
            lhs.ty.clone()
        };
        Some(ResolvedExpr::new(
            ResolvedExprKind::Binary {
                op: binary.op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            binary.span,
        ))
    }

    fn resolve_ref_expr(&mut self, r: &ast::RefExpr) -> Option<ResolvedExpr> {
        let inner = self.resolve_expr(&r.inner)?;

        let addressable = inner.kind.is_assignable()
            || matches!(
                inner.kind,
                ResolvedExprKind::StructInit { .. } | ResolvedExprKind::ArrayInit(_)
            )
            || inner.ty.is_aggregate();
        if !addressable {
            return self.report(inner.span, "cannot take the address of this expression");
        }

        let ty = Ty::ptr_to(inner.ty.clone());
        Some(ResolvedExpr::new(
            ResolvedExprKind::Ref(Box::new(inner)),
            ty,
            r.span,
        ))
    }

    fn resolve_deref_expr(&mut self, d: &ast::DerefExpr) -> Option<ResolvedExpr> {
        let inner = self.resolve_expr(&d.inner)?;
        let Ty::Pointer(pointee) = inner.ty.clone() else {
            let name = inner.ty.display(&self.prog);
            return self.report(inner.span, format!("cannot dereference '{name}'"));
        };
        Some(ResolvedExpr::new(
            ResolvedExprKind::Deref(Box::new(inner)),
            *pointee,
            d.span,
        ))
    }

    fn resolve_range_expr(&mut self, range: &ast::RangeExpr) -> Option<ResolvedExpr> {
        let start = self.resolve_expr(&range.start)?;
        let end = self.resolve_expr(&range.end)?;
        for side in [&start, &end] {
            if !side.ty.is_numeric() {
                return self.report(side.span, "range bounds must be numeric");
            }
        }
        Some(ResolvedExpr::new(
            ResolvedExprKind::Range {
                start: Box::new(start),
                end: Box::new(end),
            },
            Ty::Range,
            range.span,
        ))
    }

    fn resolve_err_group_expr(
        &mut self,
        group: &ast::ErrGroupExpr,
        hint: Option<&str>,
    ) -> Option<ResolvedExpr> {
        let name = hint.unwrap_or("err").to_string();
        let parent = self
            .current_fn
            .and_then(|f| self.prog.enclosing_module(f));
        let prefix = match parent {
            Some(module) => format!("{}.", self.prog.decl(module).symbol),
            None => String::new(),
        };

        let group_id = self.prog.add_decl(ResolvedDecl {
            name: name.clone(),
            symbol: format!("{prefix}{name}"),
            span: group.span,
            is_public: false,
            parent,
            kind: DeclKind::ErrGroup { errors: Vec::new() },
        });

        let mut errors = Vec::new();
        for err in &group.errors {
            let err_id = self.prog.add_decl(ResolvedDecl {
                name: err.name.clone(),
                symbol: format!("{prefix}{}", err.name),
                span: err.span,
                is_public: true,
                parent: Some(group_id),
                kind: DeclKind::Err,
            });
            // Error constants become directly visible in the current scope.
            if !self.insert_decl(err_id) {
                return None;
            }
            errors.push(err_id);
        }
        match &mut self.prog.decl_mut(group_id).kind {
            DeclKind::ErrGroup { errors: slot } => *slot = errors,
            _ => unreachable!(),
        }

        Some(ResolvedExpr::new(
            ResolvedExprKind::DeclRef(group_id),
            Ty::ErrorGroup(group_id),
            group.span,
        ))
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn resolve_call_expr(&mut self, call: &ast::CallExpr) -> Option<ResolvedExpr> {
        let mut callee = self.resolve_callee(&call.callee)?;

        // Direct target, when the callee names a function declaration.
        let mut target = match &callee.kind {
            ResolvedExprKind::DeclRef(id)
                if matches!(self.prog.decl(*id).kind, DeclKind::Function(_)) =>
            {
                Some(*id)
            }
            ResolvedExprKind::Member { member, .. }
                if matches!(self.prog.decl(*member).kind, DeclKind::Function(_)) =>
            {
                Some(*member)
            }
            _ => None,
        };

        // Generic functions specialize on demand; the call then points at
        // the concrete instance, never the template.
        if let Some(template) = target {
            if self.prog.function(template).is_generic() {
                if call.generic_args.is_empty() {
                    return self.report(
                        call.span,
                        "try to call a generic function without specialization",
                    );
                }
                let args: Option<Vec<Ty>> = call
                    .generic_args
                    .iter()
                    .map(|arg| self.resolve_type(arg))
                    .collect();
                let specialized = self.specialize_generic_function(template, &args?, call.span)?;

                let ty = self.prog.fn_ty(specialized);
                callee = match callee.kind {
                    ResolvedExprKind::Member { base, .. } => ResolvedExpr::new(
                        ResolvedExprKind::Member {
                            base,
                            member: specialized,
                        },
                        ty,
                        callee.span,
                    ),
                    _ => ResolvedExpr::new(
                        ResolvedExprKind::DeclRef(specialized),
                        ty,
                        callee.span,
                    ),
                };
                target = Some(specialized);
            } else if !call.generic_args.is_empty() {
                let name = self.prog.decl(template).name.clone();
                return self.report(call.span, format!("'{name}' is not a generic function"));
            }
        }

        let Ty::Function { params, ret } = callee.ty.clone() else {
            return self.report(call.span, "calling non-function symbol");
        };

        let is_member_call = target
            .map(|id| self.prog.function(id).owner.is_some())
            .unwrap_or(false)
            && matches!(callee.kind, ResolvedExprKind::Member { .. });

        // The implicit receiver fills the first parameter of member calls.
        let expected: Vec<Ty> = if is_member_call {
            params[1..].to_vec()
        } else {
            params
        };

        let is_vararg = target
            .map(|id| {
                let f = self.prog.function(id);
                f.params
                    .last()
                    .map(|p| self.prog.param(*p).2)
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        if call.args.len() != expected.len() && (!is_vararg || call.args.len() < expected.len()) {
            return self.report(
                call.span,
                format!(
                    "argument count mismatch in function call, expected {} actual {}",
                    expected.len(),
                    call.args.len()
                ),
            );
        }

        let mut args = Vec::with_capacity(call.args.len());
        for (idx, arg) in call.args.iter().enumerate() {
            let mut resolved = self.resolve_expr(arg)?;
            if let Some(param_ty) = expected.get(idx) {
                if !param_ty.unifies(&resolved.ty) {
                    let actual = resolved.ty.display(&self.prog);
                    let wanted = param_ty.display(&self.prog);
                    return self.report(
                        resolved.span,
                        format!(
                            "unexpected type of argument '{actual}' expected '{wanted}'"
                        ),
                    );
                }
            }
            resolved.constant = constexpr::evaluate(&self.prog, &resolved, false);
            args.push(resolved);
        }

        Some(ResolvedExpr::new(
            ResolvedExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            *ret,
            call.span,
        ))
    }
}
