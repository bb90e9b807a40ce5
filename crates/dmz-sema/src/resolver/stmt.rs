//! Body pass: statement resolution and per-function flow checks.

use super::Sema;
use crate::cfg;
use crate::constexpr;
use crate::resolved::*;
use crate::ty::Ty;
use dmz_parser::ast;
use dmz_parser::source::Span;

impl<'a> Sema<'a> {
    pub(crate) fn resolve_body_pass(&mut self) {
        for fn_id in self.body_order.clone() {
            if self.prog.function(fn_id).is_generic() {
                continue; // templates specialize on demand
            }
            self.resolve_function_body(fn_id);
        }
    }

    pub(crate) fn resolve_function_body(&mut self, fn_id: DeclId) {
        let body_ast = match self.fn_asts.get(&fn_id) {
            Some(f) => f.body.as_ref().expect("pending body without AST"),
            None => match self.test_bodies.get(&fn_id) {
                Some(body) => *body,
                None => return,
            },
        };
        let parent = self.prog.decl(fn_id).parent;

        self.with_env(parent, |sema| {
            sema.resolve_body_in_env(fn_id, body_ast);
        });
    }

    /// Resolves a function body inside an already prepared environment;
    /// specialization calls this directly under its substitution scope.
    pub(crate) fn resolve_body_in_env(&mut self, fn_id: DeclId, body_ast: &ast::Block) {
        self.current_fn = Some(fn_id);
        self.current_struct = self.prog.function(fn_id).owner;

        self.push_scope();
        for param in self.prog.function(fn_id).params.clone() {
            self.bind(param);
        }

        let body = self.resolve_block(body_ast);
        self.pop_scope();

        if let Some(body) = body {
            let defers = std::mem::take(&mut self.fn_defers);
            let span = self.prog.decl(fn_id).span;
            {
                let data = self.prog.function_mut(fn_id);
                data.body = Some(body);
                data.defers = defers;
            }
            cfg::run_flow_sensitive_checks(
                &self.prog,
                self.prog.function(fn_id),
                span,
                &mut *self.diags,
            );
        }
    }

    pub(crate) fn resolve_block(&mut self, block: &ast::Block) -> Option<ResolvedBlock> {
        self.push_scope();

        let mut stmts = Vec::new();
        let mut error = false;
        let mut after_return = 0u32;

        for stmt in &block.stmts {
            let resolved = self.resolve_stmt(stmt);
            if !error && after_return == 1 {
                self.diags.warning(stmt.span(), "unreachable statement");
                after_return = 2;
            }
            if matches!(stmt, ast::Stmt::Return(_)) && after_return == 0 {
                after_return = 1;
            }

            match resolved {
                Some(resolved) => stmts.push(resolved),
                None => error = true,
            }
        }

        // Block-exit defers; returns already carry the transitive set.
        let defers = if matches!(stmts.last(), Some(ResolvedStmt::Return { .. })) {
            Vec::new()
        } else {
            self.snapshot_defers(true, false)
        };

        self.pop_scope();

        if error {
            return None;
        }
        Some(ResolvedBlock {
            stmts,
            defers,
            span: block.span,
        })
    }

    fn resolve_stmt(&mut self, stmt: &ast::Stmt) -> Option<ResolvedStmt> {
        match stmt {
            ast::Stmt::Expr(e) => Some(ResolvedStmt::Expr(self.resolve_expr(e)?)),
            ast::Stmt::Block(b) => Some(ResolvedStmt::Block(self.resolve_block(b)?)),
            ast::Stmt::If(s) => self.resolve_if_stmt(s),
            ast::Stmt::While(s) => self.resolve_while_stmt(s),
            ast::Stmt::For(s) => self.resolve_for_stmt(s),
            ast::Stmt::Switch(s) => self.resolve_switch_stmt(s),
            ast::Stmt::Return(s) => self.resolve_return_stmt(s),
            ast::Stmt::Decl(s) => self.resolve_decl_stmt(s),
            ast::Stmt::Assign(s) => self.resolve_assignment(s),
            ast::Stmt::Defer(s) => self.resolve_defer_stmt(s),
        }
    }

    fn check_condition(&mut self, cond: &ast::Expr) -> Option<ResolvedExpr> {
        let mut resolved = self.resolve_expr(cond)?;
        if !resolved.ty.is_numeric() {
            let name = resolved.ty.display(&self.prog);
            self.diags.error(
                resolved.span,
                format!("unexpected type in condition '{name}'"),
            );
            return None;
        }
        resolved.constant = constexpr::evaluate(&self.prog, &resolved, false);
        Some(resolved)
    }

    fn resolve_if_stmt(&mut self, s: &ast::IfStmt) -> Option<ResolvedStmt> {
        let cond = self.check_condition(&s.cond)?;
        let then_block = self.resolve_block(&s.then_block)?;
        let else_block = match &s.else_block {
            Some(block) => Some(self.resolve_block(block)?),
            None => None,
        };

        Some(ResolvedStmt::If {
            cond,
            then_block,
            else_block,
            span: s.span,
        })
    }

    fn resolve_while_stmt(&mut self, s: &ast::WhileStmt) -> Option<ResolvedStmt> {
        let cond = self.check_condition(&s.cond)?;
        let body = self.resolve_block(&s.body)?;

        Some(ResolvedStmt::While {
            cond,
            body,
            span: s.span,
        })
    }

    fn resolve_for_stmt(&mut self, s: &ast::ForStmt) -> Option<ResolvedStmt> {
        if s.iterators.len() != s.captures.len() {
            return self.report(s.span, "for loop needs one capture per iterator");
        }
        if s.iterators.is_empty() {
            return self.report(s.span, "for loop needs at least one iterator");
        }

        let mut iters = Vec::new();
        let mut captures = Vec::new();

        self.push_scope();
        for (iter, capture) in s.iterators.iter().zip(&s.captures) {
            let Some(resolved) = self.resolve_expr(iter) else {
                self.pop_scope();
                return None;
            };

            let (ty, indirect) = match &resolved.ty {
                Ty::Range => (Ty::ISIZE, false),
                Ty::Slice(elem) => ((**elem).clone(), true),
                other => {
                    let name = other.display(&self.prog);
                    self.diags.error(
                        resolved.span,
                        format!("for iterator must be a range or a slice, got '{name}'"),
                    );
                    self.pop_scope();
                    return None;
                }
            };

            let capture_id = self.prog.add_decl(ResolvedDecl {
                name: capture.name.clone(),
                symbol: capture.name.clone(),
                span: capture.span,
                is_public: true,
                parent: None,
                kind: DeclKind::Capture { ty, indirect },
            });
            if !self.insert_decl(capture_id) {
                self.pop_scope();
                return None;
            }

            iters.push(resolved);
            captures.push(capture_id);
        }

        let body = self.resolve_block(&s.body);
        self.pop_scope();

        Some(ResolvedStmt::For {
            iters,
            captures,
            body: body?,
            span: s.span,
        })
    }

    fn resolve_switch_stmt(&mut self, s: &ast::SwitchStmt) -> Option<ResolvedStmt> {
        let cond = self.check_condition(&s.cond)?;

        let mut cases = Vec::new();
        for case in &s.cases {
            cases.push(self.resolve_case_stmt(case)?);
        }

        let else_block = self.resolve_block(&s.else_block)?;

        Some(ResolvedStmt::Switch {
            cond,
            cases,
            else_block,
            span: s.span,
        })
    }

    fn resolve_case_stmt(&mut self, case: &ast::CaseStmt) -> Option<ResolvedCase> {
        let mut cond = self.resolve_expr(&case.cond)?;
        cond.constant = constexpr::evaluate(&self.prog, &cond, false);
        if cond.constant.is_none() {
            return self.report(cond.span, "condition in case must be a constant value");
        }

        let block = self.resolve_block(&case.block)?;

        Some(ResolvedCase {
            cond,
            block,
            span: case.span,
        })
    }

    fn resolve_return_stmt(&mut self, s: &ast::ReturnStmt) -> Option<ResolvedStmt> {
        let Some(fn_id) = self.current_fn else {
            return self.report(s.span, "unexpected return stmt outside a function");
        };
        let ret = self.prog.function(fn_id).ret.clone();

        // `void?` functions may return bare (success leaves the zeroed
        // error slot in place).
        let voidish =
            ret == Ty::Void || matches!(&ret, Ty::Optional(inner) if **inner == Ty::Void);
        if ret == Ty::Void && s.value.is_some() {
            return self.report(s.span, "unexpected return value in void function");
        }
        if !voidish && s.value.is_none() {
            return self.report(s.span, "expected a return value");
        }

        let mut value = None;
        if let Some(expr) = &s.value {
            let mut resolved = self.resolve_expr(expr)?;

            let matches_ret = match &ret {
                // An optional return accepts the value, an error, or a
                // ready-made optional of the same shape.
                Ty::Optional(inner) => {
                    resolved.ty == Ty::Error
                        || resolved.ty.unifies(inner)
                        || resolved.ty.unifies(&ret)
                }
                other => resolved.ty.unifies(other),
            };
            if !matches_ret {
                let expected = ret.display(&self.prog);
                let actual = resolved.ty.display(&self.prog);
                return self.report(
                    resolved.span,
                    format!("unexpected return type, expected '{expected}' actual '{actual}'"),
                );
            }

            resolved.constant = constexpr::evaluate(&self.prog, &resolved, false);
            value = Some(resolved);
        }

        let is_error = matches!(&value, Some(v) if v.ty == Ty::Error);
        let defers = self.snapshot_defers(false, is_error);

        Some(ResolvedStmt::Return {
            value,
            defers,
            span: s.span,
        })
    }

    fn resolve_decl_stmt(&mut self, s: &ast::DeclStmt) -> Option<ResolvedStmt> {
        let var = self.resolve_var_decl(&s.var)?;
        if !self.insert_decl(var) {
            return None;
        }
        Some(ResolvedStmt::Decl { var, span: s.span })
    }

    fn resolve_var_decl(&mut self, v: &ast::VarDecl) -> Option<DeclId> {
        if v.ty.is_none() && v.init.is_none() {
            return self.report(
                v.span,
                "an uninitialized variable is expected to have a type specifier",
            );
        }

        let mut init = match &v.init {
            Some(expr) => Some(self.resolve_expr_named(expr, Some(&v.name))?),
            None => None,
        };

        let ty = match &v.ty {
            Some(type_expr) => {
                let ty = self.resolve_type(type_expr)?;
                if let Some(init) = &init {
                    if !ty.unifies(&init.ty) {
                        return self.report(init.span, "initializer type mismatch");
                    }
                }
                ty
            }
            None => init.as_ref().unwrap().ty.clone(),
        };

        // Module and error-group bindings are compile-time only; ranges
        // and unbound generics never materialize at all.
        if matches!(ty, Ty::Void | Ty::DefaultInit | Ty::Range | Ty::Generic(_)) {
            return self.report(
                v.span,
                format!("variable '{}' has invalid type", v.name),
            );
        }

        if let Some(init) = init.as_mut() {
            init.constant = constexpr::evaluate(&self.prog, init, false);
        }

        Some(self.prog.add_decl(ResolvedDecl {
            name: v.name.clone(),
            symbol: v.name.clone(),
            span: v.span,
            is_public: v.is_public,
            parent: None,
            kind: DeclKind::Var {
                ty,
                mutable: v.is_mutable,
                init,
            },
        }))
    }

    fn resolve_assignment(&mut self, s: &ast::Assignment) -> Option<ResolvedStmt> {
        let mut value = self.resolve_expr(&s.value)?;
        let target = self.resolve_expr(&s.target)?;

        if !target.kind.is_assignable() {
            return self.report(target.span, "expected variable on the LHS of an assignment");
        }
        if target.ty == Ty::Void {
            return self.report(target.span, "reference to void declaration in assignment LHS");
        }
        if !target.ty.unifies(&value.ty) {
            let value_ty = value.ty.display(&self.prog);
            let target_ty = target.ty.display(&self.prog);
            return self.report(
                value.span,
                format!(
                    "assigned value type '{value_ty}' doesn't match variable type '{target_ty}'"
                ),
            );
        }

        value.constant = constexpr::evaluate(&self.prog, &value, false);

        // `a += b` resolves as `a = a + b`.
        if let Some(op) = s.op {
            if !target.ty.is_numeric() {
                let target_ty = target.ty.display(&self.prog);
                return self.report(
                    target.span,
                    format!("cannot use operator '{}=' on type '{target_ty}'", op.symbol()),
                );
            }
            let lhs_value = self.resolve_expr(&s.target)?;
            let ty = lhs_value.ty.clone();
            let span = s.span;
            value = ResolvedExpr::new(
                ResolvedExprKind::Binary {
                    op,
                    lhs: Box::new(lhs_value),
                    rhs: Box::new(value),
                },
                ty,
                span,
            );
        }

        Some(ResolvedStmt::Assign {
            target,
            value,
            span: s.span,
        })
    }

    fn resolve_defer_stmt(&mut self, s: &ast::DeferStmt) -> Option<ResolvedStmt> {
        let block = self.resolve_block(&s.block)?;

        let id = DeferId(self.fn_defers.len() as u32);
        self.fn_defers.push(DeferBlock {
            block,
            is_errdefer: s.is_errdefer,
            span: s.span,
        });
        self.defer_scopes
            .last_mut()
            .expect("no defer scope")
            .push(id);

        Some(ResolvedStmt::Defer { id, span: s.span })
    }

    pub(crate) fn report<T>(&mut self, span: Span, msg: impl Into<String>) -> Option<T> {
        self.diags.error(span, msg);
        None
    }
}
