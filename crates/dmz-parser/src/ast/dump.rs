//! Indented text dump of the AST, used by `-ast-dump` and `-import-dump`.

use super::*;
use std::fmt::Write;

pub fn dump_decls(decls: &[Decl]) -> String {
    let mut out = String::new();
    for decl in decls {
        dump_decl(&mut out, decl, 0);
    }
    out
}

fn pad(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn dump_decl(out: &mut String, decl: &Decl, level: usize) {
    pad(out, level);
    match decl {
        Decl::Module(m) => {
            let _ = writeln!(out, "ModuleDecl {}", m.name);
            for d in &m.decls {
                dump_decl(out, d, level + 1);
            }
        }
        Decl::Import(i) => {
            let _ = writeln!(
                out,
                "ImportDecl {}{}",
                i.module_id(),
                i.alias.as_ref().map(|a| format!(" as {a}")).unwrap_or_default()
            );
        }
        Decl::Function(f) => {
            let kind = if f.is_extern { "ExternFunctionDecl" } else { "FunctionDecl" };
            let owner = f
                .struct_name
                .as_ref()
                .map(|s| format!("{s}."))
                .unwrap_or_default();
            let generics = if f.generic_params.is_empty() {
                String::new()
            } else {
                let names: Vec<_> = f.generic_params.iter().map(|g| g.name.as_str()).collect();
                format!("<{}>", names.join(","))
            };
            let _ = writeln!(out, "{kind} {owner}{}{generics} -> {}", f.name, f.return_type.name());
            for p in &f.params {
                pad(out, level + 1);
                if p.is_vararg {
                    let _ = writeln!(out, "ParamDecl ...");
                } else {
                    let _ = writeln!(out, "ParamDecl {}: {}", p.name, p.ty.name());
                }
            }
            if let Some(body) = &f.body {
                dump_block(out, body, level + 1);
            }
        }
        Decl::Struct(s) => {
            let _ = writeln!(out, "StructDecl {}", s.name);
            for field in &s.fields {
                pad(out, level + 1);
                let _ = writeln!(out, "FieldDecl {}: {}", field.name, field.ty.name());
            }
        }
        Decl::ErrGroup(g) => {
            let _ = writeln!(out, "ErrGroupDecl {}", g.name);
            for e in &g.errors {
                pad(out, level + 1);
                let _ = writeln!(out, "ErrDecl {}", e.name);
            }
        }
        Decl::Var(v) => {
            let _ = writeln!(out, "VarDecl {}{}", if v.is_mutable { "" } else { "const " }, v.name);
            if let Some(init) = &v.init {
                dump_expr(out, init, level + 1);
            }
        }
        Decl::Test(t) => {
            let _ = writeln!(out, "TestDecl {:?}", t.name);
            dump_block(out, &t.body, level + 1);
        }
    }
}

fn dump_block(out: &mut String, block: &Block, level: usize) {
    pad(out, level);
    out.push_str("Block\n");
    for stmt in &block.stmts {
        dump_stmt(out, stmt, level + 1);
    }
}

fn dump_stmt(out: &mut String, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::Expr(e) => dump_expr(out, e, level),
        Stmt::Block(b) => dump_block(out, b, level),
        Stmt::If(s) => {
            pad(out, level);
            out.push_str("IfStmt\n");
            dump_expr(out, &s.cond, level + 1);
            dump_block(out, &s.then_block, level + 1);
            if let Some(e) = &s.else_block {
                dump_block(out, e, level + 1);
            }
        }
        Stmt::While(s) => {
            pad(out, level);
            out.push_str("WhileStmt\n");
            dump_expr(out, &s.cond, level + 1);
            dump_block(out, &s.body, level + 1);
        }
        Stmt::For(s) => {
            pad(out, level);
            let names: Vec<_> = s.captures.iter().map(|c| c.name.as_str()).collect();
            let _ = writeln!(out, "ForStmt |{}|", names.join(", "));
            for iter in &s.iterators {
                dump_expr(out, iter, level + 1);
            }
            dump_block(out, &s.body, level + 1);
        }
        Stmt::Switch(s) => {
            pad(out, level);
            out.push_str("SwitchStmt\n");
            dump_expr(out, &s.cond, level + 1);
            for case in &s.cases {
                pad(out, level + 1);
                out.push_str("CaseStmt\n");
                dump_expr(out, &case.cond, level + 2);
                dump_block(out, &case.block, level + 2);
            }
            pad(out, level + 1);
            out.push_str("ElseBlock\n");
            dump_block(out, &s.else_block, level + 2);
        }
        Stmt::Return(s) => {
            pad(out, level);
            out.push_str("ReturnStmt\n");
            if let Some(v) = &s.value {
                dump_expr(out, v, level + 1);
            }
        }
        Stmt::Decl(s) => {
            pad(out, level);
            let _ = writeln!(
                out,
                "DeclStmt {}{}",
                if s.var.is_mutable { "" } else { "const " },
                s.var.name
            );
            if let Some(init) = &s.var.init {
                dump_expr(out, init, level + 1);
            }
        }
        Stmt::Assign(s) => {
            pad(out, level);
            let op = s.op.map(|o| format!("{}=", o.symbol())).unwrap_or_else(|| "=".into());
            let _ = writeln!(out, "Assignment {op}");
            dump_expr(out, &s.target, level + 1);
            dump_expr(out, &s.value, level + 1);
        }
        Stmt::Defer(s) => {
            pad(out, level);
            let _ = writeln!(out, "{}", if s.is_errdefer { "ErrDeferStmt" } else { "DeferStmt" });
            dump_block(out, &s.block, level + 1);
        }
    }
}

fn dump_expr(out: &mut String, expr: &Expr, level: usize) {
    pad(out, level);
    match expr {
        Expr::IntLit(e) => {
            let _ = writeln!(out, "IntLiteral {}", e.value);
        }
        Expr::FloatLit(e) => {
            let _ = writeln!(out, "FloatLiteral {}", e.value);
        }
        Expr::CharLit(e) => {
            let _ = writeln!(out, "CharLiteral {:?}", e.value as char);
        }
        Expr::BoolLit(e) => {
            let _ = writeln!(out, "BoolLiteral {}", e.value);
        }
        Expr::StrLit(e) => {
            let _ = writeln!(out, "StringLiteral {:?}", e.value);
        }
        Expr::NullLit(_) => out.push_str("NullLiteral\n"),
        Expr::DeclRef(e) => {
            let _ = writeln!(out, "DeclRefExpr {}", e.name);
        }
        Expr::ModulePath(e) => {
            let _ = writeln!(out, "ModulePathExpr {}", e.segments.join("::"));
        }
        Expr::Member(e) => {
            let _ = writeln!(out, "MemberExpr .{}", e.field);
            dump_expr(out, &e.base, level + 1);
        }
        Expr::SelfMember(e) => {
            let _ = writeln!(out, "SelfMemberExpr .{}", e.field);
        }
        Expr::ArrayAt(e) => {
            out.push_str("ArrayAtExpr\n");
            dump_expr(out, &e.array, level + 1);
            dump_expr(out, &e.index, level + 1);
        }
        Expr::ArrayInit(e) => {
            out.push_str("ArrayInstantiationExpr\n");
            for elem in &e.elems {
                dump_expr(out, elem, level + 1);
            }
        }
        Expr::StructInit(e) => {
            let _ = writeln!(out, "StructInstantiationExpr {}", e.name);
            for field in &e.fields {
                pad(out, level + 1);
                let _ = writeln!(out, "FieldInit {}", field.name);
                dump_expr(out, &field.value, level + 2);
            }
        }
        Expr::Group(e) => {
            out.push_str("GroupingExpr\n");
            dump_expr(out, &e.inner, level + 1);
        }
        Expr::Unary(e) => {
            let sym = match e.op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            };
            let _ = writeln!(out, "UnaryOperator {sym}");
            dump_expr(out, &e.operand, level + 1);
        }
        Expr::Binary(e) => {
            let _ = writeln!(out, "BinaryOperator {}", e.op.symbol());
            dump_expr(out, &e.lhs, level + 1);
            dump_expr(out, &e.rhs, level + 1);
        }
        Expr::Ref(e) => {
            out.push_str("RefPtrExpr\n");
            dump_expr(out, &e.inner, level + 1);
        }
        Expr::Deref(e) => {
            out.push_str("DerefPtrExpr\n");
            dump_expr(out, &e.inner, level + 1);
        }
        Expr::Call(e) => {
            out.push_str("CallExpr\n");
            dump_expr(out, &e.callee, level + 1);
            for arg in &e.args {
                dump_expr(out, arg, level + 1);
            }
        }
        Expr::Sizeof(e) => {
            let _ = writeln!(out, "SizeofExpr {}", e.ty.name());
        }
        Expr::Range(e) => {
            out.push_str("RangeExpr\n");
            dump_expr(out, &e.start, level + 1);
            dump_expr(out, &e.end, level + 1);
        }
        Expr::ErrorInPlace(e) => {
            let _ = writeln!(out, "ErrorInPlaceExpr @{}", e.name);
        }
        Expr::ErrRef(e) => {
            let _ = writeln!(out, "ErrDeclRefExpr {}?", e.name);
        }
        Expr::Catch(e) => {
            out.push_str("CatchErrorExpr\n");
            dump_expr(out, &e.inner, level + 1);
        }
        Expr::Try(e) => {
            out.push_str("TryErrorExpr\n");
            dump_expr(out, &e.inner, level + 1);
        }
        Expr::OrElse(e) => {
            out.push_str("OrElseErrorExpr\n");
            dump_expr(out, &e.inner, level + 1);
            dump_expr(out, &e.fallback, level + 1);
        }
        Expr::Unwrap(e) => {
            out.push_str("ErrUnwrapExpr\n");
            dump_expr(out, &e.inner, level + 1);
        }
        Expr::Import(e) => {
            let _ = writeln!(out, "ImportExpr {}", e.path.join("::"));
        }
        Expr::ErrGroup(e) => {
            out.push_str("ErrorGroupExpr\n");
            for err in &e.errors {
                pad(out, level + 1);
                let _ = writeln!(out, "ErrDecl {}", err.name);
            }
        }
    }
}
