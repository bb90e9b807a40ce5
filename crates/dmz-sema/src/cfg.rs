//! Per-function control-flow graph and the flow-sensitive checks that run
//! over it.
//!
//! The graph is built bottom-up from the exit block backward: block 0 is
//! the function exit, the entry block is allocated last (highest index).
//! Edges carry a `reachable` flag fed by the constant evaluator so that
//! branch pruning knowledge flows into the checks.

use crate::constexpr;
use crate::resolved::{
    DeclId, DeclKind, FunctionData, ResolvedBlock, ResolvedExpr, ResolvedExprKind,
    ResolvedProgram, ResolvedStmt,
};
use crate::ty::Ty;
use dmz_parser::diag::DiagnosticEngine;
use dmz_parser::source::{SourceMap, Span};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// A statement slot in a basic block: resolved statements and the
/// expressions nested inside them both participate in the dataflow.
#[derive(Debug, Clone, Copy)]
pub enum CfgStmt<'a> {
    Stmt(&'a ResolvedStmt),
    Expr(&'a ResolvedExpr),
}

#[derive(Debug, Default)]
pub struct BasicBlock<'a> {
    pub predecessors: BTreeSet<(usize, bool)>,
    pub successors: BTreeSet<(usize, bool)>,
    /// Pushed while walking backward; reverse-iterate for source order.
    pub stmts: Vec<CfgStmt<'a>>,
}

#[derive(Debug, Default)]
pub struct Cfg<'a> {
    pub blocks: Vec<BasicBlock<'a>>,
    pub entry: usize,
    pub exit: usize,
}

impl<'a> Cfg<'a> {
    fn insert_new_block(&mut self) -> usize {
        self.blocks.push(BasicBlock::default());
        self.blocks.len() - 1
    }

    fn insert_new_block_before(&mut self, before: usize, reachable: bool) -> usize {
        let block = self.insert_new_block();
        self.insert_edge(block, before, reachable);
        block
    }

    fn insert_edge(&mut self, from: usize, to: usize, reachable: bool) {
        self.blocks[from].successors.insert((to, reachable));
        self.blocks[to].predecessors.insert((from, reachable));
    }

    fn insert_stmt(&mut self, stmt: CfgStmt<'a>, block: usize) {
        self.blocks[block].stmts.push(stmt);
    }

    pub fn dump(&self, map: &SourceMap) -> String {
        let mut out = String::new();
        for i in (0..self.blocks.len()).rev() {
            let tag = if i == self.entry {
                " (entry)"
            } else if i == self.exit {
                " (exit)"
            } else {
                ""
            };
            let _ = writeln!(out, "[{i}{tag}]");

            let fmt_edges = |edges: &BTreeSet<(usize, bool)>| {
                edges
                    .iter()
                    .map(|(id, reachable)| {
                        if *reachable {
                            format!("{id}")
                        } else {
                            format!("{id}(U)")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            let _ = writeln!(out, "  preds: {}", fmt_edges(&self.blocks[i].predecessors));
            let _ = writeln!(out, "  succs: {}", fmt_edges(&self.blocks[i].successors));

            for stmt in self.blocks[i].stmts.iter().rev() {
                let (name, span) = match stmt {
                    CfgStmt::Stmt(s) => (stmt_name(s), s.span()),
                    CfgStmt::Expr(e) => (expr_name(e), e.span),
                };
                let _ = writeln!(out, "    {} at {}", name, span.display(map));
            }
        }
        out
    }
}

fn stmt_name(stmt: &ResolvedStmt) -> &'static str {
    match stmt {
        ResolvedStmt::Expr(_) => "Expr",
        ResolvedStmt::Block(_) => "Block",
        ResolvedStmt::If { .. } => "IfStmt",
        ResolvedStmt::While { .. } => "WhileStmt",
        ResolvedStmt::For { .. } => "ForStmt",
        ResolvedStmt::Switch { .. } => "SwitchStmt",
        ResolvedStmt::Return { .. } => "ReturnStmt",
        ResolvedStmt::Decl { .. } => "DeclStmt",
        ResolvedStmt::Assign { .. } => "Assignment",
        ResolvedStmt::Defer { .. } => "DeferStmt",
    }
}

fn expr_name(expr: &ResolvedExpr) -> &'static str {
    match &expr.kind {
        ResolvedExprKind::Call { .. } => "CallExpr",
        ResolvedExprKind::DeclRef(_) => "DeclRefExpr",
        ResolvedExprKind::Binary { .. } => "BinaryOperator",
        ResolvedExprKind::Unary { .. } => "UnaryOperator",
        _ => "Expr",
    }
}

pub struct CfgBuilder<'a> {
    cfg: Cfg<'a>,
    prog: &'a ResolvedProgram,
    fun: &'a FunctionData,
}

impl<'a> CfgBuilder<'a> {
    pub fn build(prog: &'a ResolvedProgram, fun: &'a FunctionData) -> Cfg<'a> {
        let body = fun.body.as_ref().expect("cannot build a CFG without a body");
        let mut builder = CfgBuilder {
            cfg: Cfg::default(),
            prog,
            fun,
        };
        builder.cfg.exit = builder.cfg.insert_new_block();

        let body_block = builder.insert_block(body, builder.cfg.exit);

        builder.cfg.entry = builder.cfg.insert_new_block_before(body_block, true);
        builder.cfg
    }

    fn insert_block(&mut self, block: &'a ResolvedBlock, mut succ: usize) -> usize {
        let fun = self.fun;
        // Built backward, so the block's own defers sink in first.
        for defer in &block.defers {
            succ = self.insert_block(&fun.defers[defer.0 as usize].block, succ);
        }

        let mut insert_new_block = true;
        for stmt in block.stmts.iter().rev() {
            if insert_new_block && !is_terminator(stmt) {
                succ = self.cfg.insert_new_block_before(succ, true);
            }
            insert_new_block = matches!(
                stmt,
                ResolvedStmt::While { .. } | ResolvedStmt::For { .. }
            );
            succ = self.insert_stmt(stmt, succ);
        }

        succ
    }

    fn insert_stmt(&mut self, stmt: &'a ResolvedStmt, block: usize) -> usize {
        match stmt {
            ResolvedStmt::If { .. } => self.insert_if_stmt(stmt, block),
            ResolvedStmt::While { .. } => self.insert_while_stmt(stmt, block),
            ResolvedStmt::For { .. } => self.insert_for_stmt(stmt, block),
            ResolvedStmt::Switch { .. } => self.insert_switch_stmt(stmt, block),
            ResolvedStmt::Return { .. } => self.insert_return_stmt(stmt, block),
            ResolvedStmt::Expr(expr) => self.insert_expr(expr, block),
            ResolvedStmt::Assign { target, value, .. } => {
                self.cfg.insert_stmt(CfgStmt::Stmt(stmt), block);
                if !matches!(target.kind, ResolvedExprKind::DeclRef(_)) {
                    self.insert_expr(target, block);
                }
                self.insert_expr(value, block)
            }
            ResolvedStmt::Decl { var, .. } => {
                let prog = self.prog;
                self.cfg.insert_stmt(CfgStmt::Stmt(stmt), block);
                if let DeclKind::Var {
                    init: Some(init), ..
                } = &prog.decl(*var).kind
                {
                    return self.insert_expr(init, block);
                }
                block
            }
            ResolvedStmt::Block(inner) => self.insert_block(inner, block),
            ResolvedStmt::Defer { .. } => block,
        }
    }

    fn insert_return_stmt(&mut self, stmt: &'a ResolvedStmt, mut block: usize) -> usize {
        let fun = self.fun;
        let ResolvedStmt::Return { value, defers, .. } = stmt else {
            unreachable!()
        };

        for defer in defers {
            block = self.insert_block(&fun.defers[defer.0 as usize].block, block);
        }

        let block = self.cfg.insert_new_block_before(self.cfg.exit, true);
        self.cfg.insert_stmt(CfgStmt::Stmt(stmt), block);
        if let Some(value) = value {
            return self.insert_expr(value, block);
        }
        block
    }

    fn insert_expr(&mut self, expr: &'a ResolvedExpr, block: usize) -> usize {
        self.cfg.insert_stmt(CfgStmt::Expr(expr), block);

        match &expr.kind {
            ResolvedExprKind::Call { callee, args } => {
                for arg in args.iter().rev() {
                    self.insert_expr(arg, block);
                }
                self.insert_expr(callee, block);
                block
            }
            ResolvedExprKind::Member { base, .. } => self.insert_expr(base, block),
            ResolvedExprKind::Group(inner)
            | ResolvedExprKind::Ref(inner)
            | ResolvedExprKind::Deref(inner)
            | ResolvedExprKind::Catch(inner) => self.insert_expr(inner, block),
            ResolvedExprKind::Unary { operand, .. } => self.insert_expr(operand, block),
            ResolvedExprKind::Binary { lhs, rhs, .. } => {
                self.insert_expr(rhs, block);
                self.insert_expr(lhs, block)
            }
            ResolvedExprKind::ArrayAt { array, index } => {
                self.insert_expr(index, block);
                self.insert_expr(array, block)
            }
            ResolvedExprKind::ArrayInit(elems) => {
                for elem in elems.iter().rev() {
                    self.insert_expr(elem, block);
                }
                block
            }
            ResolvedExprKind::StructInit { fields, .. } => {
                for field in fields.iter().rev() {
                    self.insert_expr(&field.value, block);
                }
                block
            }
            ResolvedExprKind::Range { start, end } => {
                self.insert_expr(end, block);
                self.insert_expr(start, block)
            }
            ResolvedExprKind::OrElse { inner, fallback } => {
                self.insert_expr(fallback, block);
                self.insert_expr(inner, block)
            }
            ResolvedExprKind::Try { inner, defers }
            | ResolvedExprKind::Unwrap { inner, defers } => {
                let fun = self.fun;
                let mut block = block;
                for defer in defers {
                    block = self.insert_block(&fun.defers[defer.0 as usize].block, block);
                }
                self.insert_expr(inner, block)
            }
            _ => block,
        }
    }

    fn insert_if_stmt(&mut self, stmt: &'a ResolvedStmt, exit: usize) -> usize {
        let ResolvedStmt::If {
            cond,
            then_block,
            else_block,
            ..
        } = stmt
        else {
            unreachable!()
        };

        let mut false_block = exit;
        if let Some(else_block) = else_block {
            false_block = self.insert_block(else_block, exit);
        }

        let true_block = self.insert_block(then_block, exit);
        let entry = self.cfg.insert_new_block();

        let value = constexpr::to_bool(constexpr::evaluate(self.prog, cond, true));
        self.cfg
            .insert_edge(entry, true_block, value != Some(false));
        self.cfg
            .insert_edge(entry, false_block, !value.unwrap_or(false));

        self.cfg.insert_stmt(CfgStmt::Stmt(stmt), entry);
        self.insert_expr(cond, entry);
        entry
    }

    fn insert_while_stmt(&mut self, stmt: &'a ResolvedStmt, exit: usize) -> usize {
        let ResolvedStmt::While { cond, body, .. } = stmt else {
            unreachable!()
        };

        let latch = self.cfg.insert_new_block();
        let body_block = self.insert_block(body, latch);

        let header = self.cfg.insert_new_block();
        self.cfg.insert_edge(latch, header, true);

        let value = constexpr::to_bool(constexpr::evaluate(self.prog, cond, true));
        self.cfg
            .insert_edge(header, body_block, value != Some(false));
        self.cfg
            .insert_edge(header, exit, !value.unwrap_or(false));

        self.cfg.insert_stmt(CfgStmt::Stmt(stmt), header);
        self.insert_expr(cond, header);

        header
    }

    fn insert_for_stmt(&mut self, stmt: &'a ResolvedStmt, exit: usize) -> usize {
        let ResolvedStmt::For { iters, body, .. } = stmt else {
            unreachable!()
        };

        let latch = self.cfg.insert_new_block();
        let body_block = self.insert_block(body, latch);

        let header = self.cfg.insert_new_block();
        self.cfg.insert_edge(latch, header, true);
        // A for loop may run zero times; both edges stay reachable.
        self.cfg.insert_edge(header, body_block, true);
        self.cfg.insert_edge(header, exit, true);

        self.cfg.insert_stmt(CfgStmt::Stmt(stmt), header);
        for iter in iters.iter().rev() {
            self.insert_expr(iter, header);
        }

        header
    }

    fn insert_switch_stmt(&mut self, stmt: &'a ResolvedStmt, exit: usize) -> usize {
        let ResolvedStmt::Switch {
            cond,
            cases,
            else_block,
            ..
        } = stmt
        else {
            unreachable!()
        };

        let value = constexpr::evaluate(self.prog, cond, true);

        let mut case_blocks = Vec::with_capacity(cases.len() + 1);
        for case in cases {
            case_blocks.push(self.insert_block(&case.block, exit));
        }
        let else_target = self.insert_block(else_block, exit);

        let entry = self.cfg.insert_new_block();

        // With a constant scrutinee, only the matching case is reachable.
        let mut reachable_case = None;
        for (i, case) in cases.iter().enumerate() {
            let case_value = constexpr::evaluate(self.prog, &case.cond, true);
            if value.is_some() && case_value.is_some() && value == case_value {
                reachable_case = Some(i);
            }
        }

        for (i, case) in cases.iter().enumerate() {
            let case_value = constexpr::evaluate(self.prog, &case.cond, true);
            let reachable =
                value.is_none() || case_value.is_none() || reachable_case == Some(i);
            self.cfg.insert_edge(entry, case_blocks[i], reachable);
        }
        self.cfg.insert_edge(
            entry,
            else_target,
            value.is_none() || reachable_case.is_none(),
        );

        self.cfg.insert_stmt(CfgStmt::Stmt(stmt), entry);
        self.insert_expr(cond, entry);
        entry
    }
}

fn is_terminator(stmt: &ResolvedStmt) -> bool {
    matches!(
        stmt,
        ResolvedStmt::If { .. }
            | ResolvedStmt::While { .. }
            | ResolvedStmt::For { .. }
            | ResolvedStmt::Return { .. }
    )
}

// ============================================================================
// Flow-sensitive checks
// ============================================================================

/// Runs both checks over a freshly built CFG. Returns `true` on error.
pub fn run_flow_sensitive_checks(
    prog: &ResolvedProgram,
    fun: &FunctionData,
    fn_span: Span,
    diags: &mut DiagnosticEngine,
) -> bool {
    let cfg = CfgBuilder::build(prog, fun);
    let mut error = false;
    error |= check_return_on_all_paths(prog, fun, fn_span, &cfg, diags);
    error |= check_variable_initialization(prog, &cfg, diags);
    error
}

/// A non-void function must return on every reachable path.
fn check_return_on_all_paths(
    _prog: &ResolvedProgram,
    fun: &FunctionData,
    fn_span: Span,
    cfg: &Cfg,
    diags: &mut DiagnosticEngine,
) -> bool {
    // `void?` succeeds by falling off the end with a zeroed error slot.
    if fun.ret == Ty::Void
        || matches!(&fun.ret, Ty::Optional(inner) if **inner == Ty::Void)
    {
        return false;
    }

    let mut return_count = 0usize;
    let mut exit_reached = false;

    let mut visited = BTreeSet::new();
    let mut worklist = vec![cfg.entry];

    while let Some(bb) = worklist.pop() {
        if !visited.insert(bb) {
            continue;
        }

        exit_reached |= bb == cfg.exit;

        let block = &cfg.blocks[bb];
        if let Some(CfgStmt::Stmt(ResolvedStmt::Return { .. })) = block.stmts.first() {
            return_count += 1;
            continue;
        }

        for (succ, reachable) in &block.successors {
            if *reachable {
                worklist.push(*succ);
            }
        }
    }

    if exit_reached || return_count == 0 {
        diags.error(
            fn_span,
            if return_count > 0 {
                "non-void function doesn't return a value on every path"
            } else {
                "non-void function doesn't return a value"
            },
        );
        return true;
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Bottom,
    Unassigned,
    Assigned,
    Top,
}

fn join(a: State, b: State) -> State {
    if a == b {
        return a;
    }
    if a == State::Bottom {
        return b;
    }
    if b == State::Bottom {
        return a;
    }
    State::Top
}

/// Forward dataflow over the lattice `⊥ < Unassigned|Assigned < ⊤`:
/// reads of not-definitely-assigned variables and writes to already
/// assigned immutables are diagnosed.
fn check_variable_initialization(
    prog: &ResolvedProgram,
    cfg: &Cfg,
    diags: &mut DiagnosticEngine,
) -> bool {
    type Lattice = FxHashMap<DeclId, State>;

    let mut lattices: Vec<Lattice> = vec![Lattice::default(); cfg.blocks.len()];
    let mut pending: Vec<(Span, String)> = Vec::new();

    let mut changed = true;
    while changed {
        changed = false;
        pending.clear();

        for bb in (1..cfg.blocks.len()).rev() {
            let block = &cfg.blocks[bb];

            let mut tmp = Lattice::default();
            for (pred, _) in &block.predecessors {
                for (decl, state) in &lattices[*pred] {
                    let merged = join(*tmp.get(decl).unwrap_or(&State::Bottom), *state);
                    tmp.insert(*decl, merged);
                }
            }

            for stmt in block.stmts.iter().rev() {
                match stmt {
                    CfgStmt::Stmt(ResolvedStmt::Decl { var, .. }) => {
                        let has_init = matches!(
                            &prog.decl(*var).kind,
                            DeclKind::Var { init: Some(_), .. }
                        );
                        tmp.insert(
                            *var,
                            if has_init {
                                State::Assigned
                            } else {
                                State::Unassigned
                            },
                        );
                    }
                    CfgStmt::Stmt(ResolvedStmt::Assign { target, .. }) => {
                        let mut base = target;
                        while let ResolvedExprKind::Member { base: inner, .. } = &base.kind {
                            base = inner;
                        }
                        // A non-decl-ref base is a temporary, freely mutable.
                        let ResolvedExprKind::DeclRef(decl) = base.kind else {
                            continue;
                        };

                        let (mutable, through_indirection) = match &prog.decl(decl).kind {
                            DeclKind::Var { mutable, ty, .. } => {
                                (*mutable, matches!(ty, Ty::Pointer(_)))
                            }
                            DeclKind::Param { ty, by_ref, .. } => {
                                (false, *by_ref || matches!(ty, Ty::Pointer(_)))
                            }
                            _ => (true, false),
                        };

                        let state = *tmp.get(&decl).unwrap_or(&State::Bottom);
                        if !mutable && !through_indirection && state != State::Unassigned {
                            pending.push((
                                target.span,
                                format!("'{}' cannot be mutated", prog.decl(decl).name),
                            ));
                        }
                        tmp.insert(decl, State::Assigned);
                    }
                    CfgStmt::Expr(expr) => {
                        let ResolvedExprKind::DeclRef(decl) = expr.kind else {
                            continue;
                        };
                        let DeclKind::Var { init, .. } = &prog.decl(decl).kind else {
                            continue;
                        };
                        if init.is_some() {
                            tmp.insert(decl, State::Assigned);
                        }
                        if *tmp.get(&decl).unwrap_or(&State::Bottom) != State::Assigned {
                            pending.push((
                                expr.span,
                                format!("'{}' is not initialized", prog.decl(decl).name),
                            ));
                        }
                    }
                    _ => {}
                }
            }

            if lattices[bb] != tmp {
                lattices[bb] = tmp;
                changed = true;
            }
        }
    }

    for (span, message) in &pending {
        diags.error(*span, message.clone());
    }
    !pending.is_empty()
}
