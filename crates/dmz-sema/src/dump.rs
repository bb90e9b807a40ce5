//! Indented text dump of the resolved tree, used by `-res-dump`.

use crate::resolved::*;
use std::fmt::Write as _;

pub fn dump_program(prog: &ResolvedProgram) -> String {
    let mut out = String::new();
    for root in &prog.roots {
        dump_decl(&mut out, prog, *root, 0);
    }
    out
}

fn pad(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn dump_decl(out: &mut String, prog: &ResolvedProgram, id: DeclId, level: usize) {
    pad(out, level);
    let decl = prog.decl(id);
    match &decl.kind {
        DeclKind::Module { decls } => {
            let _ = writeln!(out, "ResolvedModuleDecl {}", decl.symbol);
            for child in decls {
                dump_decl(out, prog, *child, level + 1);
            }
        }
        DeclKind::Function(f) => {
            let kind = if f.is_extern {
                "ResolvedExternFunctionDecl"
            } else if f.is_generic() {
                "ResolvedGenericFunctionDecl"
            } else if f.is_test {
                "ResolvedTestDecl"
            } else {
                "ResolvedFunctionDecl"
            };
            let _ = writeln!(out, "{kind} {} -> {}", decl.symbol, f.ret.display(prog));
            for param in &f.params {
                let (ty, by_ref, vararg) = prog.param(*param);
                pad(out, level + 1);
                if vararg {
                    let _ = writeln!(out, "ResolvedParamDecl ...");
                } else {
                    let amp = if by_ref { "&" } else { "" };
                    let _ = writeln!(
                        out,
                        "ResolvedParamDecl {}: {amp}{}",
                        prog.decl(*param).name,
                        ty.display(prog)
                    );
                }
            }
            if let Some(body) = &f.body {
                dump_block(out, prog, body, level + 1);
            }
            for (_, specialized) in &f.specializations {
                dump_decl(out, prog, *specialized, level + 1);
            }
        }
        DeclKind::Struct(s) => {
            let kind = if s.is_generic() {
                "ResolvedGenericStructDecl"
            } else {
                "ResolvedStructDecl"
            };
            let _ = writeln!(out, "{kind} {}", decl.symbol);
            for field in &s.fields {
                let DeclKind::Field { ty, index } = &prog.decl(*field).kind else {
                    unreachable!()
                };
                pad(out, level + 1);
                let _ = writeln!(
                    out,
                    "ResolvedFieldDecl [{index}] {}: {}",
                    prog.decl(*field).name,
                    ty.display(prog)
                );
            }
            for method in &s.methods {
                dump_decl(out, prog, *method, level + 1);
            }
            for (_, specialized) in &s.specializations {
                dump_decl(out, prog, *specialized, level + 1);
            }
        }
        DeclKind::ErrGroup { errors } => {
            let _ = writeln!(out, "ResolvedErrGroupDecl {}", decl.symbol);
            for err in errors {
                pad(out, level + 1);
                let _ = writeln!(out, "ResolvedErrDecl {}", prog.decl(*err).symbol);
            }
        }
        DeclKind::Var { ty, mutable, .. } => {
            let kind = if *mutable { "let" } else { "const" };
            let _ = writeln!(
                out,
                "ResolvedVarDecl {kind} {}: {}",
                decl.symbol,
                ty.display(prog)
            );
        }
        DeclKind::Import { module } => {
            let _ = writeln!(
                out,
                "ResolvedImportDecl {} -> {}",
                decl.name,
                prog.decl(*module).symbol
            );
        }
        _ => {
            let _ = writeln!(out, "ResolvedDecl {}", decl.name);
        }
    }
}

fn dump_block(out: &mut String, prog: &ResolvedProgram, block: &ResolvedBlock, level: usize) {
    pad(out, level);
    out.push_str("ResolvedBlock\n");
    for stmt in &block.stmts {
        dump_stmt(out, prog, stmt, level + 1);
    }
    for defer in &block.defers {
        pad(out, level + 1);
        let _ = writeln!(out, "ResolvedDeferRefStmt #{}", defer.0);
    }
}

fn dump_stmt(out: &mut String, prog: &ResolvedProgram, stmt: &ResolvedStmt, level: usize) {
    match stmt {
        ResolvedStmt::Expr(e) => dump_expr(out, prog, e, level),
        ResolvedStmt::Block(b) => dump_block(out, prog, b, level),
        ResolvedStmt::If {
            cond,
            then_block,
            else_block,
            ..
        } => {
            pad(out, level);
            out.push_str("ResolvedIfStmt\n");
            dump_expr(out, prog, cond, level + 1);
            dump_block(out, prog, then_block, level + 1);
            if let Some(else_block) = else_block {
                dump_block(out, prog, else_block, level + 1);
            }
        }
        ResolvedStmt::While { cond, body, .. } => {
            pad(out, level);
            out.push_str("ResolvedWhileStmt\n");
            dump_expr(out, prog, cond, level + 1);
            dump_block(out, prog, body, level + 1);
        }
        ResolvedStmt::For {
            iters,
            captures,
            body,
            ..
        } => {
            pad(out, level);
            let names: Vec<_> = captures
                .iter()
                .map(|c| prog.decl(*c).name.as_str())
                .collect();
            let _ = writeln!(out, "ResolvedForStmt |{}|", names.join(", "));
            for iter in iters {
                dump_expr(out, prog, iter, level + 1);
            }
            dump_block(out, prog, body, level + 1);
        }
        ResolvedStmt::Switch {
            cond,
            cases,
            else_block,
            ..
        } => {
            pad(out, level);
            out.push_str("ResolvedSwitchStmt\n");
            dump_expr(out, prog, cond, level + 1);
            for case in cases {
                pad(out, level + 1);
                out.push_str("ResolvedCaseStmt\n");
                dump_expr(out, prog, &case.cond, level + 2);
                dump_block(out, prog, &case.block, level + 2);
            }
            pad(out, level + 1);
            out.push_str("ResolvedElseBlock\n");
            dump_block(out, prog, else_block, level + 2);
        }
        ResolvedStmt::Return { value, defers, .. } => {
            pad(out, level);
            out.push_str("ResolvedReturnStmt\n");
            if let Some(value) = value {
                dump_expr(out, prog, value, level + 1);
            }
            for defer in defers {
                pad(out, level + 1);
                let _ = writeln!(out, "ResolvedDeferRefStmt #{}", defer.0);
            }
        }
        ResolvedStmt::Decl { var, .. } => {
            pad(out, level);
            let DeclKind::Var {
                ty, mutable, init, ..
            } = &prog.decl(*var).kind
            else {
                unreachable!()
            };
            let kind = if *mutable { "let" } else { "const" };
            let _ = writeln!(
                out,
                "ResolvedDeclStmt {kind} {}: {}",
                prog.decl(*var).name,
                ty.display(prog)
            );
            if let Some(init) = init {
                dump_expr(out, prog, init, level + 1);
            }
        }
        ResolvedStmt::Assign { target, value, .. } => {
            pad(out, level);
            out.push_str("ResolvedAssignment\n");
            dump_expr(out, prog, target, level + 1);
            dump_expr(out, prog, value, level + 1);
        }
        ResolvedStmt::Defer { id, .. } => {
            pad(out, level);
            let _ = writeln!(out, "ResolvedDeferStmt #{}", id.0);
        }
    }
}

fn dump_expr(out: &mut String, prog: &ResolvedProgram, expr: &ResolvedExpr, level: usize) {
    pad(out, level);
    let ty = expr.ty.display(prog);
    match &expr.kind {
        ResolvedExprKind::IntLit(v) => {
            let _ = writeln!(out, "ResolvedIntLiteral {v}: {ty}");
        }
        ResolvedExprKind::FloatLit(v) => {
            let _ = writeln!(out, "ResolvedFloatLiteral {v}: {ty}");
        }
        ResolvedExprKind::CharLit(c) => {
            let _ = writeln!(out, "ResolvedCharLiteral {:?}: {ty}", *c as char);
        }
        ResolvedExprKind::BoolLit(b) => {
            let _ = writeln!(out, "ResolvedBoolLiteral {b}: {ty}");
        }
        ResolvedExprKind::StrLit(s) => {
            let _ = writeln!(out, "ResolvedStringLiteral {s:?}: {ty}");
        }
        ResolvedExprKind::NullLit => {
            let _ = writeln!(out, "ResolvedNullLiteral: {ty}");
        }
        ResolvedExprKind::DeclRef(id) => {
            let _ = writeln!(out, "ResolvedDeclRefExpr {}: {ty}", prog.decl(*id).name);
        }
        ResolvedExprKind::Member { base, member } => {
            let _ = writeln!(out, "ResolvedMemberExpr .{}: {ty}", prog.decl(*member).name);
            dump_expr(out, prog, base, level + 1);
        }
        ResolvedExprKind::ArrayAt { array, index } => {
            let _ = writeln!(out, "ResolvedArrayAtExpr: {ty}");
            dump_expr(out, prog, array, level + 1);
            dump_expr(out, prog, index, level + 1);
        }
        ResolvedExprKind::ArrayInit(elems) => {
            let _ = writeln!(out, "ResolvedArrayInstantiationExpr: {ty}");
            for elem in elems {
                dump_expr(out, prog, elem, level + 1);
            }
        }
        ResolvedExprKind::StructInit { strukt, fields } => {
            let _ = writeln!(
                out,
                "ResolvedStructInstantiationExpr {}: {ty}",
                prog.decl(*strukt).symbol
            );
            for field in fields {
                pad(out, level + 1);
                let _ = writeln!(out, "ResolvedFieldInitStmt {}", prog.decl(field.field).name);
                dump_expr(out, prog, &field.value, level + 2);
            }
        }
        ResolvedExprKind::Group(inner) => {
            let _ = writeln!(out, "ResolvedGroupingExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
        }
        ResolvedExprKind::Unary { op, operand } => {
            let _ = writeln!(out, "ResolvedUnaryOperator {op:?}: {ty}");
            dump_expr(out, prog, operand, level + 1);
        }
        ResolvedExprKind::Binary { op, lhs, rhs } => {
            let _ = writeln!(out, "ResolvedBinaryOperator {}: {ty}", op.symbol());
            dump_expr(out, prog, lhs, level + 1);
            dump_expr(out, prog, rhs, level + 1);
        }
        ResolvedExprKind::Ref(inner) => {
            let _ = writeln!(out, "ResolvedRefPtrExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
        }
        ResolvedExprKind::Deref(inner) => {
            let _ = writeln!(out, "ResolvedDerefPtrExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
        }
        ResolvedExprKind::Call { callee, args } => {
            let _ = writeln!(out, "ResolvedCallExpr: {ty}");
            dump_expr(out, prog, callee, level + 1);
            for arg in args {
                dump_expr(out, prog, arg, level + 1);
            }
        }
        ResolvedExprKind::Sizeof(of) => {
            let _ = writeln!(out, "ResolvedSizeofExpr {}: {ty}", of.display(prog));
        }
        ResolvedExprKind::Range { start, end } => {
            let _ = writeln!(out, "ResolvedRangeExpr: {ty}");
            dump_expr(out, prog, start, level + 1);
            dump_expr(out, prog, end, level + 1);
        }
        ResolvedExprKind::ErrorTag(tag) => {
            let _ = writeln!(out, "ResolvedErrorInPlaceExpr @{tag}: {ty}");
        }
        ResolvedExprKind::ErrRef(id) => {
            let _ = writeln!(out, "ResolvedErrDeclRefExpr {}: {ty}", prog.decl(*id).symbol);
        }
        ResolvedExprKind::Catch(inner) => {
            let _ = writeln!(out, "ResolvedCatchErrorExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
        }
        ResolvedExprKind::Try { inner, .. } => {
            let _ = writeln!(out, "ResolvedTryErrorExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
        }
        ResolvedExprKind::OrElse { inner, fallback } => {
            let _ = writeln!(out, "ResolvedOrElseErrorExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
            dump_expr(out, prog, fallback, level + 1);
        }
        ResolvedExprKind::Unwrap { inner, .. } => {
            let _ = writeln!(out, "ResolvedErrUnwrapExpr: {ty}");
            dump_expr(out, prog, inner, level + 1);
        }
        ResolvedExprKind::DefaultInit => {
            let _ = writeln!(out, "ResolvedDefaultInitExpr");
        }
    }
    if let Some(value) = expr.constant {
        pad(out, level + 1);
        let _ = writeln!(out, "| value: {value}");
    }
}
