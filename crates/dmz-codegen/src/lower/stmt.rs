//! Statement lowering.

use super::Codegen;
use crate::ir::{Instr, IrType, Terminator, Value};
use crate::layout;
use dmz_sema::{
    DeclKind, DeferId, ResolvedBlock, ResolvedCase, ResolvedExpr, ResolvedExprKind, ResolvedStmt,
    Ty,
};

impl<'a> Codegen<'a> {
    pub(crate) fn generate_block(&mut self, block: &ResolvedBlock) {
        for stmt in &block.stmts {
            self.generate_stmt(stmt);
            // The block terminated early (return on every path).
            if !self.b.has_insert_point() {
                break;
            }
        }
        if self.b.has_insert_point() {
            self.generate_defers(&block.defers);
        }
    }

    pub(crate) fn generate_defers(&mut self, defers: &[DeferId]) {
        let prog = self.prog;
        let fn_id = self.current_fn.expect("defers outside a function");
        for defer in defers {
            self.generate_block(&prog.function(fn_id).defers[defer.0 as usize].block);
        }
    }

    fn generate_stmt(&mut self, stmt: &ResolvedStmt) {
        match stmt {
            ResolvedStmt::Expr(expr) => {
                self.generate_expr(expr, false);
            }
            ResolvedStmt::Block(block) => self.generate_block(block),
            ResolvedStmt::If {
                cond,
                then_block,
                else_block,
                ..
            } => self.generate_if_stmt(cond, then_block, else_block.as_ref()),
            ResolvedStmt::While { cond, body, .. } => self.generate_while_stmt(cond, body),
            ResolvedStmt::For {
                iters,
                captures,
                body,
                span,
            } => self.generate_for_stmt(iters, captures, body, *span),
            ResolvedStmt::Switch {
                cond,
                cases,
                else_block,
                ..
            } => self.generate_switch_stmt(cond, cases, else_block),
            ResolvedStmt::Return { value, defers, .. } => {
                self.generate_return_stmt(value.as_ref(), defers)
            }
            ResolvedStmt::Decl { var, .. } => self.generate_decl_stmt(*var),
            ResolvedStmt::Assign { target, value, .. } => {
                let value_val = self.generate_expr(value, false);
                let target_ptr = self.generate_expr(target, true);
                if let (Some(value_val), Some(target_ptr)) = (value_val, target_ptr) {
                    self.store_value(value_val, target_ptr, &value.ty, &target.ty);
                }
            }
            // Registration point only; expansion happens at scope exits.
            ResolvedStmt::Defer { .. } => {}
        }
    }

    fn generate_return_stmt(&mut self, value: Option<&ResolvedExpr>, defers: &[DeferId]) {
        let fn_id = self.current_fn.expect("return outside a function");
        let ret_ty = self.prog.function(fn_id).ret.clone();

        if let Some(value) = value {
            let generated = self.generate_expr(value, false);
            if let Some(generated) = generated {
                let ret_val = self.ret_val.clone().expect("missing return slot");
                if value.ty == Ty::Error {
                    // Error returns fill the error slot of the optional.
                    let optional_ir = self.ty_to_ir(&ret_ty);
                    let slot = self.struct_gep(optional_ir, ret_val, 1);
                    self.store_value(generated, slot, &Ty::Error, &Ty::Error);
                } else if let Ty::Optional(inner) = &ret_ty {
                    if matches!(value.ty, Ty::Optional(_)) {
                        // A whole optional copies across.
                        self.store_value(generated, ret_val, &value.ty, &ret_ty);
                    } else {
                        let inner = (**inner).clone();
                        let optional_ir = self.ty_to_ir(&ret_ty);
                        let slot = self.struct_gep(optional_ir, ret_val, 0);
                        self.store_value(generated, slot, &value.ty, &inner);
                    }
                } else {
                    self.store_value(generated, ret_val, &value.ty, &ret_ty);
                }
            }
        }

        self.generate_defers(defers);

        let ret_block = self.ret_block.expect("missing return block");
        self.b.branch_to(ret_block);
    }

    fn generate_if_stmt(
        &mut self,
        cond: &ResolvedExpr,
        then_block: &ResolvedBlock,
        else_block: Option<&ResolvedBlock>,
    ) {
        let true_bb = self.b.append_block("if.true");
        let exit_bb = self.b.append_block("if.exit");
        let else_bb = if else_block.is_some() {
            self.b.append_block("if.false")
        } else {
            exit_bb
        };

        let cond_val = self.generate_expr(cond, false).unwrap_or(Value::Undef);
        let cond_bool = self.to_bool(cond_val, &cond.ty);
        self.b.terminate(Terminator::CondBr {
            cond: cond_bool,
            then_block: true_bb,
            else_block: else_bb,
        });

        self.b.position_at(true_bb);
        self.generate_block(then_block);
        self.b.branch_to(exit_bb);

        if let Some(else_block) = else_block {
            self.b.position_at(else_bb);
            self.generate_block(else_block);
            self.b.branch_to(exit_bb);
        }

        self.b.position_at(exit_bb);
    }

    fn generate_while_stmt(&mut self, cond: &ResolvedExpr, body: &ResolvedBlock) {
        let header = self.b.append_block("while.cond");
        let body_bb = self.b.append_block("while.body");
        let exit = self.b.append_block("while.exit");

        self.b.branch_to(header);
        self.b.position_at(header);
        let cond_val = self.generate_expr(cond, false).unwrap_or(Value::Undef);
        let cond_bool = self.to_bool(cond_val, &cond.ty);
        self.b.terminate(Terminator::CondBr {
            cond: cond_bool,
            then_block: body_bb,
            else_block: exit,
        });

        self.b.position_at(body_bb);
        self.generate_block(body);
        self.b.branch_to(header);

        self.b.position_at(exit);
    }

    /// Parallel iterators share one counter; slice captures advance an
    /// element pointer, range captures advance the value itself. With
    /// more than one capture a runtime length check aborts on mismatch.
    fn generate_for_stmt(
        &mut self,
        iters: &[ResolvedExpr],
        captures: &[dmz_sema::DeclId],
        body: &ResolvedBlock,
        span: dmz_parser::source::Span,
    ) {
        let prog = self.prog;
        let header = self.b.append_block("for.cond");
        let increment = self.b.append_block("for.increment");

        let isize_ty = Ty::ISIZE;
        let isize_ir = self.ty_to_ir(&isize_ty);
        let counter = self.alloc_stack("for.counter", &isize_ty);

        let mut slots: Vec<Value> = Vec::with_capacity(captures.len());
        let mut lengths: Vec<Value> = Vec::with_capacity(captures.len());

        for (iter, capture) in iters.iter().zip(captures) {
            let name = format!("for.capture.{}", prog.decl(*capture).name);
            match &iter.kind {
                ResolvedExprKind::Range { start, end } => {
                    let slot = self.alloc_stack(&name, &isize_ty);
                    let start_val = self.generate_expr(start, false).unwrap();
                    let start_val = self.cast_to(start_val, &start.ty, &isize_ty);
                    self.b.push(Instr::Store {
                        ty: isize_ir.clone(),
                        value: start_val.clone(),
                        ptr: slot.clone(),
                    });
                    self.decl_values.insert(*capture, slot.clone());
                    slots.push(slot);

                    let end_val = self.generate_expr(end, false).unwrap();
                    let end_val = self.cast_to(end_val, &end.ty, &isize_ty);
                    let length = self.b.temp();
                    self.b.push(Instr::Bin {
                        dest: length.clone(),
                        op: "sub",
                        ty: isize_ir.clone(),
                        lhs: end_val,
                        rhs: start_val,
                    });
                    lengths.push(length);
                }
                _ => {
                    // Slice iterator: the slot holds the running element
                    // pointer, the length loads from the slice header.
                    let slice_ir = self.ty_to_ir(&iter.ty);
                    let slot = self.b.alloc_stack(&name, IrType::Ptr, layout::POINTER_SIZE);
                    self.decl_values.insert(*capture, slot.clone());

                    let slice_ptr = self.generate_expr(iter, true).unwrap();
                    let data_ptr_slot = self.struct_gep(slice_ir.clone(), slice_ptr.clone(), 0);
                    let data_ptr = self.b.temp();
                    self.b.push(Instr::Load {
                        dest: data_ptr.clone(),
                        ty: IrType::Ptr,
                        ptr: data_ptr_slot,
                    });
                    self.b.push(Instr::Store {
                        ty: IrType::Ptr,
                        value: data_ptr,
                        ptr: slot.clone(),
                    });
                    slots.push(slot);

                    let len_slot = self.struct_gep(slice_ir, slice_ptr, 1);
                    let length = self.b.temp();
                    self.b.push(Instr::Load {
                        dest: length.clone(),
                        ty: isize_ir.clone(),
                        ptr: len_slot,
                    });
                    lengths.push(length);
                }
            }
        }

        // Lengths of parallel iterators must agree at run time.
        if captures.len() > 1 {
            let mismatch = self.b.append_block("for.not.equal.length");
            for i in 1..captures.len() {
                let differs = self.b.temp();
                self.b.push(Instr::Cmp {
                    dest: differs.clone(),
                    float: false,
                    cond: "ne",
                    ty: isize_ir.clone(),
                    lhs: lengths[0].clone(),
                    rhs: lengths[i].clone(),
                });
                let next = self.b.append_block("for.check.length");
                self.b.terminate(Terminator::CondBr {
                    cond: differs,
                    then_block: mismatch,
                    else_block: next,
                });
                self.b.position_at(next);
            }
            self.b.branch_to(header);

            self.b.position_at(mismatch);
            self.emit_abort(&format!(
                "{}:{}: Aborted: for loop over objects with non-equal lengths\n",
                span.line, span.col
            ));
        } else {
            self.b.branch_to(header);
        }

        let body_bb = self.b.append_block("for.body");
        let exit = self.b.append_block("for.exit");

        self.b.position_at(header);
        let count = self.load_value(counter.clone(), &isize_ty);
        let in_range = self.b.temp();
        self.b.push(Instr::Cmp {
            dest: in_range.clone(),
            float: false,
            cond: "slt",
            ty: isize_ir.clone(),
            lhs: count,
            rhs: lengths[0].clone(),
        });
        self.b.terminate(Terminator::CondBr {
            cond: in_range,
            then_block: body_bb,
            else_block: exit,
        });

        self.b.position_at(body_bb);
        self.generate_block(body);
        self.b.branch_to(increment);

        self.b.position_at(increment);
        let count = self.load_value(counter.clone(), &isize_ty);
        let bumped = self.b.temp();
        self.b.push(Instr::Bin {
            dest: bumped.clone(),
            op: "add",
            ty: isize_ir.clone(),
            lhs: count,
            rhs: Value::int(64, 1),
        });
        self.b.push(Instr::Store {
            ty: isize_ir.clone(),
            value: bumped,
            ptr: counter,
        });
        for ((iter, capture), slot) in iters.iter().zip(captures).zip(&slots) {
            match &iter.kind {
                ResolvedExprKind::Range { .. } => {
                    let current = self.load_value(slot.clone(), &isize_ty);
                    let advanced = self.b.temp();
                    self.b.push(Instr::Bin {
                        dest: advanced.clone(),
                        op: "add",
                        ty: isize_ir.clone(),
                        lhs: current,
                        rhs: Value::int(64, 1),
                    });
                    self.b.push(Instr::Store {
                        ty: isize_ir.clone(),
                        value: advanced,
                        ptr: slot.clone(),
                    });
                }
                _ => {
                    let DeclKind::Capture { ty: elem_ty, .. } = &prog.decl(*capture).kind
                    else {
                        unreachable!()
                    };
                    let elem_ir = self.ty_to_ir(elem_ty);
                    let current = self.b.temp();
                    self.b.push(Instr::Load {
                        dest: current.clone(),
                        ty: IrType::Ptr,
                        ptr: slot.clone(),
                    });
                    let advanced = self.b.temp();
                    self.b.push(Instr::Gep {
                        dest: advanced.clone(),
                        base_ty: elem_ir,
                        base: current,
                        indices: vec![(IrType::Int(32), Value::int(32, 1))],
                    });
                    self.b.push(Instr::Store {
                        ty: IrType::Ptr,
                        value: advanced,
                        ptr: slot.clone(),
                    });
                }
            }
        }
        self.b.branch_to(header);

        self.b.position_at(exit);
    }

    fn generate_switch_stmt(
        &mut self,
        cond: &ResolvedExpr,
        cases: &[ResolvedCase],
        else_block: &ResolvedBlock,
    ) {
        let else_bb = self.b.append_block("switch.else");
        let exit_bb = self.b.append_block("switch.exit");

        let cond_val = self.generate_expr(cond, false).unwrap_or(Value::Undef);
        let cond_ir = self.ty_to_ir(&cond.ty);

        let mut arms = Vec::with_capacity(cases.len());
        for case in cases {
            let value = case
                .cond
                .constant
                .expect("case conditions are constant-checked");
            let case_bb = self.b.append_block("switch.case");
            arms.push((value, case_bb));
        }

        self.b.terminate(Terminator::Switch {
            ty: cond_ir,
            value: cond_val,
            default: else_bb,
            cases: arms.clone(),
        });

        for (case, (_, case_bb)) in cases.iter().zip(&arms) {
            self.b.position_at(*case_bb);
            self.generate_block(&case.block);
            self.b.branch_to(exit_bb);
        }

        self.b.position_at(else_bb);
        self.generate_block(else_block);
        self.b.branch_to(exit_bb);

        self.b.position_at(exit_bb);
    }

    fn generate_decl_stmt(&mut self, var: dmz_sema::DeclId) {
        let prog = self.prog;
        let DeclKind::Var { ty, init, .. } = &prog.decl(var).kind else {
            unreachable!()
        };
        // Error groups and modules have no runtime value.
        if matches!(ty, Ty::ErrorGroup(_) | Ty::Module(_)) {
            return;
        }

        let name = prog.decl(var).name.clone();
        let slot = self.alloc_stack(&name, ty);
        self.decl_values.insert(var, slot.clone());

        if let Some(init) = init {
            if init.ty == Ty::DefaultInit {
                return; // the entry-block memset already zeroed the slot
            }
            if let Some(value) = self.generate_expr(init, false) {
                self.store_value(value, slot, &init.ty, ty);
            }
        }
    }

    /// printf-then-trap used by the for-loop length check and failed
    /// unwraps outside optional-returning functions.
    pub(crate) fn emit_abort(&mut self, message: &str) {
        let fmt = self.module.global_string("global.str", message);
        let printf_ty = IrType::Function {
            params: vec![IrType::Ptr],
            ret: Box::new(IrType::Int(32)),
            vararg: true,
        };
        let dest = self.b.temp();
        self.b.push(Instr::Call {
            dest: Some(dest),
            fn_ty: printf_ty,
            callee: Value::Global("printf".into()),
            args: vec![(IrType::Ptr, Value::Global(fmt), None)],
        });
        self.b.push(Instr::Trap);
        self.b.terminate(Terminator::Unreachable);
    }
}
