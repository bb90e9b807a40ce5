//! Expression lowering.
//!
//! `keep_pointer` asks for the storage location instead of the loaded
//! value; aggregates are always handled by pointer.

use super::Codegen;
use crate::ir::{Attr, Instr, IrType, Terminator, Value};
use crate::layout;
use dmz_parser::ast::BinaryOp;
use dmz_sema::{
    DeclId, DeclKind, DeferId, NumberKind, ResolvedExpr, ResolvedExprKind, ResolvedFieldInit, Ty,
};

impl<'a> Codegen<'a> {
    pub(crate) fn generate_expr(
        &mut self,
        expr: &ResolvedExpr,
        keep_pointer: bool,
    ) -> Option<Value> {
        // Folded expressions lower straight to constants.
        if let Some(value) = expr.constant {
            if expr.ty.is_numeric() {
                return Some(Value::int(Self::numeric_bits(&expr.ty), value));
            }
        }

        match &expr.kind {
            ResolvedExprKind::IntLit(v) => {
                Some(Value::int(Self::numeric_bits(&expr.ty), *v))
            }
            ResolvedExprKind::FloatLit(v) => Some(Value::FloatConst(*v)),
            ResolvedExprKind::CharLit(c) => Some(Value::int(8, *c as i64)),
            ResolvedExprKind::BoolLit(b) => Some(Value::bool(*b)),
            ResolvedExprKind::StrLit(s) => {
                let name = self.module.global_string("global.str", s);
                Some(Value::Global(name))
            }
            ResolvedExprKind::NullLit => Some(Value::Null),
            ResolvedExprKind::DeclRef(id) => self.generate_decl_ref(*id, keep_pointer),
            ResolvedExprKind::Member { base, member } => {
                self.generate_member_expr(base, *member, keep_pointer)
            }
            ResolvedExprKind::ArrayAt { array, index } => {
                self.generate_array_at(array, index, &expr.ty, keep_pointer)
            }
            ResolvedExprKind::ArrayInit(elems) => self.generate_array_init(elems, &expr.ty),
            ResolvedExprKind::StructInit { strukt, fields } => {
                self.generate_struct_init(*strukt, fields, &expr.ty)
            }
            ResolvedExprKind::Group(inner) => self.generate_expr(inner, keep_pointer),
            ResolvedExprKind::Unary { op, operand } => self.generate_unary(*op, operand),
            ResolvedExprKind::Binary { op, lhs, rhs } => {
                self.generate_binary(*op, lhs, rhs)
            }
            ResolvedExprKind::Ref(inner) => self.generate_expr(inner, true),
            ResolvedExprKind::Deref(inner) => {
                let ptr = self.generate_expr(inner, false)?;
                if keep_pointer {
                    Some(ptr)
                } else {
                    Some(self.load_value(ptr, &expr.ty))
                }
            }
            ResolvedExprKind::Call { callee, args } => {
                self.generate_call(callee, args, &expr.ty)
            }
            ResolvedExprKind::Sizeof(ty) => {
                Some(Value::int(64, layout::size_of(self.prog, ty) as i64))
            }
            ResolvedExprKind::Range { .. } => {
                unreachable!("ranges only occur under for loops and slicing")
            }
            ResolvedExprKind::ErrorTag(name) => {
                let global = format!("error.str.{name}");
                self.module.named_global_string(&global, name);
                Some(Value::Global(global))
            }
            ResolvedExprKind::ErrRef(id) => Some(
                self.decl_values
                    .get(id)
                    .expect("error constant without a tag global")
                    .clone(),
            ),
            ResolvedExprKind::Catch(inner) => self.generate_catch(inner, keep_pointer),
            ResolvedExprKind::Try { inner, defers } => {
                self.generate_try("try", inner, defers, &expr.ty, keep_pointer, expr.span)
            }
            ResolvedExprKind::Unwrap { inner, defers } => {
                self.generate_try("unwrap", inner, defers, &expr.ty, keep_pointer, expr.span)
            }
            ResolvedExprKind::OrElse { inner, fallback } => {
                self.generate_orelse(inner, fallback, &expr.ty, keep_pointer)
            }
            ResolvedExprKind::DefaultInit => None,
        }
    }

    fn generate_decl_ref(&mut self, id: DeclId, mut keep_pointer: bool) -> Option<Value> {
        let prog = self.prog;
        match &prog.decl(id).kind {
            DeclKind::Function(_) => Some(Value::Global(prog.decl(id).symbol.clone())),
            DeclKind::Capture { ty, indirect: true } => {
                let slot = self.decl_values[&id].clone();
                let ptr = self.b.temp();
                self.b.push(Instr::Load {
                    dest: ptr.clone(),
                    ty: IrType::Ptr,
                    ptr: slot,
                });
                if keep_pointer || Self::is_aggregate(ty) {
                    Some(ptr)
                } else {
                    Some(self.load_value(ptr, ty))
                }
            }
            DeclKind::Var { ty, .. }
            | DeclKind::Param { ty, .. }
            | DeclKind::Capture { ty, .. } => {
                let slot = self.decl_values[&id].clone();
                keep_pointer |= Self::is_aggregate(ty);
                if keep_pointer {
                    Some(slot)
                } else {
                    Some(self.load_value(slot, ty))
                }
            }
            _ => unreachable!("decl-ref to a declaration without a value"),
        }
    }

    fn generate_member_expr(
        &mut self,
        base: &ResolvedExpr,
        member: DeclId,
        mut keep_pointer: bool,
    ) -> Option<Value> {
        let prog = self.prog;
        let DeclKind::Field { ty: field_ty, index } = &prog.decl(member).kind else {
            unreachable!("member lowering on a non-field declaration")
        };

        // Auto-deref: a pointer base contributes its value, a struct base
        // its storage.
        let (struct_ty, base_ptr) = match &base.ty {
            Ty::Pointer(inner) => {
                let inner = (**inner).clone();
                let ptr = self.generate_expr(base, false)?;
                (self.ty_to_ir(&inner), ptr)
            }
            other => {
                let other = other.clone();
                let ptr = self.generate_expr(base, true)?;
                (self.ty_to_ir(&other), ptr)
            }
        };

        let field_ptr = self.struct_gep(struct_ty, base_ptr, *index);
        keep_pointer |= Self::is_aggregate(field_ty);
        if keep_pointer {
            Some(field_ptr)
        } else {
            Some(self.load_value(field_ptr, field_ty))
        }
    }

    fn generate_array_at(
        &mut self,
        array: &ResolvedExpr,
        index: &ResolvedExpr,
        result_ty: &Ty,
        mut keep_pointer: bool,
    ) -> Option<Value> {
        if let ResolvedExprKind::Range { start, end } = &index.kind {
            return self.generate_slice(result_ty, array, start, end);
        }

        let index_val = self.generate_expr(index, false)?;
        let index_ir = self.ty_to_ir(&index.ty);

        let elem_ir = self.ty_to_ir(result_ty);
        let element_ptr = match &array.ty {
            Ty::Pointer(_) => {
                let base = self.generate_expr(array, false)?;
                let dest = self.b.temp();
                self.b.push(Instr::Gep {
                    dest: dest.clone(),
                    base_ty: elem_ir,
                    base,
                    indices: vec![(index_ir, index_val)],
                });
                dest
            }
            Ty::Array { .. } => {
                let array_ty = array.ty.clone();
                let base = self.generate_expr(array, true)?;
                let array_ir = self.ty_to_ir(&array_ty);
                let dest = self.b.temp();
                self.b.push(Instr::Gep {
                    dest: dest.clone(),
                    base_ty: array_ir,
                    base,
                    indices: vec![
                        (IrType::Int(32), Value::int(32, 0)),
                        (index_ir, index_val),
                    ],
                });
                dest
            }
            Ty::Slice(_) => {
                let slice_ir = self.ty_to_ir(&array.ty.clone());
                let slice_ptr = self.generate_expr(array, true)?;
                let data_slot = self.struct_gep(slice_ir, slice_ptr, 0);
                let data = self.b.temp();
                self.b.push(Instr::Load {
                    dest: data.clone(),
                    ty: IrType::Ptr,
                    ptr: data_slot,
                });
                let dest = self.b.temp();
                self.b.push(Instr::Gep {
                    dest: dest.clone(),
                    base_ty: elem_ir,
                    base: data,
                    indices: vec![(index_ir, index_val)],
                });
                dest
            }
            _ => unreachable!("indexing a non-indexable type"),
        };

        keep_pointer |= Self::is_aggregate(result_ty);
        if keep_pointer {
            Some(element_ptr)
        } else {
            Some(self.load_value(element_ptr, result_ty))
        }
    }

    /// `a[lo..hi]` builds a `{ptr, length}` temporary: `base + lo` and
    /// `hi - lo` widened to the size integer.
    fn generate_slice(
        &mut self,
        slice_ty: &Ty,
        from: &ResolvedExpr,
        start: &ResolvedExpr,
        end: &ResolvedExpr,
    ) -> Option<Value> {
        let Ty::Slice(elem) = slice_ty else {
            unreachable!("slicing must produce a slice")
        };
        let elem_ir = self.ty_to_ir(elem);
        let slice_ir = self.ty_to_ir(slice_ty);

        let data = match &from.ty {
            Ty::Array { .. } => self.generate_expr(from, true)?,
            Ty::Pointer(_) => self.generate_expr(from, false)?,
            Ty::Slice(_) => {
                let from_ir = self.ty_to_ir(&from.ty.clone());
                let slice_ptr = self.generate_expr(from, true)?;
                let data_slot = self.struct_gep(from_ir, slice_ptr, 0);
                let dest = self.b.temp();
                self.b.push(Instr::Load {
                    dest: dest.clone(),
                    ty: IrType::Ptr,
                    ptr: data_slot,
                });
                dest
            }
            _ => unreachable!("slicing a non-indexable type"),
        };

        let tmp = self.b.alloc_stack(
            "tmp.slice",
            slice_ir.clone(),
            layout::size_of(self.prog, slice_ty),
        );

        let start_val = self.generate_expr(start, false)?;
        let end_val = self.generate_expr(end, false)?;

        let start_ir = self.ty_to_ir(&start.ty);
        let base = self.b.temp();
        self.b.push(Instr::Gep {
            dest: base.clone(),
            base_ty: elem_ir,
            base: data,
            indices: vec![(start_ir.clone(), start_val.clone())],
        });

        let end_val = self.cast_to(end_val, &end.ty, &start.ty);
        let length = self.b.temp();
        self.b.push(Instr::Bin {
            dest: length.clone(),
            op: "sub",
            ty: start_ir,
            lhs: end_val,
            rhs: start_val,
        });

        let data_slot = self.struct_gep(slice_ir.clone(), tmp.clone(), 0);
        self.b.push(Instr::Store {
            ty: IrType::Ptr,
            value: base,
            ptr: data_slot,
        });
        let len_slot = self.struct_gep(slice_ir, tmp.clone(), 1);
        let length = self.cast_to(length, &start.ty, &Ty::USIZE);
        self.b.push(Instr::Store {
            ty: IrType::Int(64),
            value: length,
            ptr: len_slot,
        });

        Some(tmp)
    }

    fn generate_array_init(&mut self, elems: &[ResolvedExpr], ty: &Ty) -> Option<Value> {
        if *ty == Ty::DefaultInit {
            return None;
        }
        let Ty::Array { elem, .. } = ty else {
            unreachable!("array instantiation with a non-array type")
        };
        let array_ir = self.ty_to_ir(ty);
        let tmp = self
            .b
            .alloc_stack("tmp.array", array_ir.clone(), layout::size_of(self.prog, ty));

        for (i, init) in elems.iter().enumerate() {
            let value = self.generate_expr(init, false)?;
            let dest = self.b.temp();
            self.b.push(Instr::Gep {
                dest: dest.clone(),
                base_ty: array_ir.clone(),
                base: tmp.clone(),
                indices: vec![
                    (IrType::Int(32), Value::int(32, 0)),
                    (IrType::Int(32), Value::int(32, i as i64)),
                ],
            });
            self.store_value(value, dest, &init.ty, elem);
        }

        Some(tmp)
    }

    fn generate_struct_init(
        &mut self,
        strukt: DeclId,
        fields: &[ResolvedFieldInit],
        ty: &Ty,
    ) -> Option<Value> {
        let prog = self.prog;
        let name = format!("tmp.struct.{}", prog.decl(strukt).name);
        let tmp = self.alloc_stack(&name, ty);
        let struct_ir = self.ty_to_ir(ty);

        for init in fields {
            // Default-initialized fields keep their zeroed slot.
            if init.value.ty == Ty::DefaultInit {
                continue;
            }
            let DeclKind::Field { ty: field_ty, index } = &prog.decl(init.field).kind else {
                unreachable!()
            };
            let value = self.generate_expr(&init.value, false)?;
            let dest = self.struct_gep(struct_ir.clone(), tmp.clone(), *index);
            self.store_value(value, dest, &init.value.ty, field_ty);
        }

        Some(tmp)
    }

    fn generate_unary(
        &mut self,
        op: dmz_parser::ast::UnaryOp,
        operand: &ResolvedExpr,
    ) -> Option<Value> {
        use dmz_parser::ast::UnaryOp;
        let value = self.generate_expr(operand, false)?;

        match op {
            UnaryOp::Neg => {
                let ir = self.ty_to_ir(&operand.ty);
                let dest = self.b.temp();
                if operand.ty.is_float() {
                    self.b.push(Instr::Bin {
                        dest: dest.clone(),
                        op: "fsub",
                        ty: ir,
                        lhs: Value::FloatConst(-0.0),
                        rhs: value,
                    });
                } else {
                    self.b.push(Instr::Bin {
                        dest: dest.clone(),
                        op: "sub",
                        ty: ir,
                        lhs: Value::int(Self::numeric_bits(&operand.ty), 0),
                        rhs: value,
                    });
                }
                Some(dest)
            }
            UnaryOp::Not => {
                let as_bool = self.to_bool(value, &operand.ty);
                let dest = self.b.temp();
                self.b.push(Instr::Bin {
                    dest: dest.clone(),
                    op: "xor",
                    ty: IrType::Int(1),
                    lhs: as_bool,
                    rhs: Value::bool(true),
                });
                Some(dest)
            }
        }
    }

    fn generate_binary(
        &mut self,
        op: BinaryOp,
        lhs: &ResolvedExpr,
        rhs: &ResolvedExpr,
    ) -> Option<Value> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return self.generate_short_circuit(op, lhs, rhs);
        }

        let lhs_val = self.generate_expr(lhs, false)?;
        let rhs_val = self.generate_expr(rhs, false)?;
        let rhs_val = self.cast_to(rhs_val, &rhs.ty, &lhs.ty);

        let kind = Self::numeric_kind(&lhs.ty);
        let float = kind == NumberKind::Float;
        let ty = self.ty_to_ir(&lhs.ty);
        let dest = self.b.temp();

        let arith = |int_op: &'static str, float_op: &'static str| {
            if float {
                float_op
            } else {
                int_op
            }
        };

        match op {
            BinaryOp::Add => self.b.push(Instr::Bin {
                dest: dest.clone(),
                op: arith("add", "fadd"),
                ty,
                lhs: lhs_val,
                rhs: rhs_val,
            }),
            BinaryOp::Sub => self.b.push(Instr::Bin {
                dest: dest.clone(),
                op: arith("sub", "fsub"),
                ty,
                lhs: lhs_val,
                rhs: rhs_val,
            }),
            BinaryOp::Mul => self.b.push(Instr::Bin {
                dest: dest.clone(),
                op: arith("mul", "fmul"),
                ty,
                lhs: lhs_val,
                rhs: rhs_val,
            }),
            BinaryOp::Div => {
                let op = match kind {
                    NumberKind::Signed => "sdiv",
                    NumberKind::Unsigned => "udiv",
                    NumberKind::Float => "fdiv",
                };
                self.b.push(Instr::Bin {
                    dest: dest.clone(),
                    op,
                    ty,
                    lhs: lhs_val,
                    rhs: rhs_val,
                });
            }
            BinaryOp::Rem => {
                let op = match kind {
                    NumberKind::Signed => "srem",
                    NumberKind::Unsigned => "urem",
                    NumberKind::Float => "frem",
                };
                self.b.push(Instr::Bin {
                    dest: dest.clone(),
                    op,
                    ty,
                    lhs: lhs_val,
                    rhs: rhs_val,
                });
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let cond = match (op, kind) {
                    (BinaryOp::Lt, NumberKind::Signed) => "slt",
                    (BinaryOp::Lt, NumberKind::Unsigned) => "ult",
                    (BinaryOp::Lt, NumberKind::Float) => "ult",
                    (BinaryOp::Le, NumberKind::Signed) => "sle",
                    (BinaryOp::Le, NumberKind::Unsigned) => "ule",
                    (BinaryOp::Le, NumberKind::Float) => "ule",
                    (BinaryOp::Gt, NumberKind::Signed) => "sgt",
                    (BinaryOp::Gt, NumberKind::Unsigned) => "ugt",
                    (BinaryOp::Gt, NumberKind::Float) => "ugt",
                    (BinaryOp::Ge, NumberKind::Signed) => "sge",
                    (BinaryOp::Ge, NumberKind::Unsigned) => "uge",
                    (BinaryOp::Ge, NumberKind::Float) => "uge",
                    _ => unreachable!(),
                };
                self.b.push(Instr::Cmp {
                    dest: dest.clone(),
                    float,
                    cond,
                    ty,
                    lhs: lhs_val,
                    rhs: rhs_val,
                });
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let cond = match (op, float) {
                    (BinaryOp::Eq, false) => "eq",
                    (BinaryOp::Eq, true) => "ueq",
                    (BinaryOp::Ne, false) => "ne",
                    (BinaryOp::Ne, true) => "une",
                    _ => unreachable!(),
                };
                self.b.push(Instr::Cmp {
                    dest: dest.clone(),
                    float,
                    cond,
                    ty,
                    lhs: lhs_val,
                    rhs: rhs_val,
                });
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }

        Some(dest)
    }

    /// `&&`/`||` lower via a rhs block, a merge block and a phi fed the
    /// short-circuited constant from every predecessor that skipped rhs.
    fn generate_short_circuit(
        &mut self,
        op: BinaryOp,
        lhs: &ResolvedExpr,
        rhs: &ResolvedExpr,
    ) -> Option<Value> {
        let is_or = op == BinaryOp::Or;
        let rhs_bb = self.b.append_block(if is_or { "or.rhs" } else { "and.rhs" });
        let merge_bb = self
            .b
            .append_block(if is_or { "or.merge" } else { "and.merge" });

        let (true_bb, false_bb) = if is_or {
            (merge_bb, rhs_bb)
        } else {
            (rhs_bb, merge_bb)
        };
        self.generate_conditional_operator(lhs, true_bb, false_bb);

        self.b.position_at(rhs_bb);
        let rhs_val = self.generate_expr(rhs, false)?;
        let rhs_bool = self.to_bool(rhs_val, &rhs.ty);
        let rhs_end = self.b.current_block();
        self.b.terminate(Terminator::Br(merge_bb));

        self.b.position_at(merge_bb);
        let mut incomings = Vec::new();
        for pred in self.b.predecessors(merge_bb) {
            if pred == rhs_end {
                incomings.push((rhs_bool.clone(), pred));
            } else {
                incomings.push((Value::bool(is_or), pred));
            }
        }
        let dest = self.b.temp();
        self.b.push(Instr::Phi {
            dest: dest.clone(),
            ty: IrType::Int(1),
            incomings,
        });
        Some(dest)
    }

    /// Splits nested `&&`/`||` into branch chains.
    fn generate_conditional_operator(
        &mut self,
        expr: &ResolvedExpr,
        true_bb: usize,
        false_bb: usize,
    ) {
        if let ResolvedExprKind::Binary { op, lhs, rhs } = &expr.kind {
            if *op == BinaryOp::Or {
                let next = self.b.append_block("or.lhs.false");
                self.generate_conditional_operator(lhs, true_bb, next);
                self.b.position_at(next);
                self.generate_conditional_operator(rhs, true_bb, false_bb);
                return;
            }
            if *op == BinaryOp::And {
                let next = self.b.append_block("and.lhs.true");
                self.generate_conditional_operator(lhs, next, false_bb);
                self.b.position_at(next);
                self.generate_conditional_operator(rhs, true_bb, false_bb);
                return;
            }
        }

        let value = self.generate_expr(expr, false).unwrap_or(Value::Undef);
        let as_bool = self.to_bool(value, &expr.ty);
        self.b.terminate(Terminator::CondBr {
            cond: as_bool,
            then_block: true_bb,
            else_block: false_bb,
        });
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn generate_call(
        &mut self,
        callee: &ResolvedExpr,
        args: &[ResolvedExpr],
        result_ty: &Ty,
    ) -> Option<Value> {
        let prog = self.prog;

        let (callee_val, target, receiver) = match &callee.kind {
            ResolvedExprKind::DeclRef(id)
                if matches!(prog.decl(*id).kind, DeclKind::Function(_)) =>
            {
                (
                    Value::Global(prog.decl(*id).symbol.clone()),
                    Some(*id),
                    None,
                )
            }
            ResolvedExprKind::Member { base, member }
                if matches!(prog.decl(*member).kind, DeclKind::Function(_)) =>
            {
                (
                    Value::Global(prog.decl(*member).symbol.clone()),
                    Some(*member),
                    Some(base.as_ref()),
                )
            }
            _ => (self.generate_expr(callee, false)?, None, None),
        };

        let Ty::Function { params, ret } = &callee.ty else {
            unreachable!("call through a non-function type")
        };
        let params = params.clone();
        let ret = (**ret).clone();

        let uses_sret = Self::is_aggregate(&ret);
        let vararg = target
            .map(|id| {
                prog.function(id)
                    .params
                    .last()
                    .map(|p| prog.param(*p).2)
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        // Per-parameter attributes reconstructed from the declaration
        // when the target is known, from the type otherwise.
        let param_info: Vec<(Ty, bool)> = match target {
            Some(id) => prog
                .function(id)
                .params
                .iter()
                .filter(|p| !prog.param(**p).2)
                .map(|p| {
                    let (ty, by_ref, _) = prog.param(*p);
                    (ty.clone(), by_ref)
                })
                .collect(),
            None => params.iter().map(|ty| (ty.clone(), false)).collect(),
        };

        let mut ir_params = Vec::new();
        let mut call_args: Vec<(IrType, Value, Option<Attr>)> = Vec::new();
        let mut result_slot = None;

        if uses_sret {
            let ret_ir = self.ty_to_ir(&ret);
            let slot = self.alloc_stack("struct.ret.tmp", &ret);
            ir_params.push(IrType::Ptr);
            call_args.push((IrType::Ptr, slot.clone(), Some(Attr::SRet(ret_ir))));
            result_slot = Some(slot);
        }

        let mut param_iter = param_info.iter();

        if let Some(base) = receiver {
            param_iter.next();
            let value = match &base.ty {
                Ty::Pointer(_) => self.generate_expr(base, false)?,
                _ => self.generate_expr(base, true)?,
            };
            ir_params.push(IrType::Ptr);
            call_args.push((IrType::Ptr, value, None));
        }

        for arg in args {
            match param_iter.next() {
                Some((param_ty, by_ref)) => {
                    let (ir, attr) = self.param_attr(param_ty, *by_ref);
                    let value = if Self::is_aggregate(&arg.ty) || *by_ref {
                        self.generate_expr(arg, true)?
                    } else {
                        let value = self.generate_expr(arg, false)?;
                        self.cast_to(value, &arg.ty, param_ty)
                    };
                    ir_params.push(ir.clone());
                    call_args.push((ir, value, attr));
                }
                None => {
                    // Trailing vararg arguments pass through unchanged.
                    let value = if Self::is_aggregate(&arg.ty) {
                        self.generate_expr(arg, true)?
                    } else {
                        self.generate_expr(arg, false)?
                    };
                    let ir = self.ty_to_ir(&arg.ty);
                    call_args.push((ir, value, None));
                }
            }
        }

        let ret_ir = if uses_sret {
            IrType::Void
        } else {
            self.ty_to_ir(&ret)
        };
        let fn_ty = IrType::Function {
            params: ir_params,
            ret: Box::new(ret_ir.clone()),
            vararg,
        };

        let dest = if uses_sret || ret == Ty::Void {
            None
        } else {
            Some(self.b.temp())
        };
        self.b.push(Instr::Call {
            dest: dest.clone(),
            fn_ty,
            callee: callee_val,
            args: call_args,
        });

        if uses_sret {
            return result_slot;
        }
        if *result_ty == Ty::Void {
            return None;
        }
        dest
    }

    // ========================================================================
    // Error-union constructs
    // ========================================================================

    /// `catch e` reads the error slot.
    fn generate_catch(&mut self, inner: &ResolvedExpr, keep_pointer: bool) -> Option<Value> {
        let optional_ir = self.ty_to_ir(&inner.ty.clone());
        let optional_ptr = self.generate_expr(inner, true)?;
        let error_ptr = self.struct_gep(optional_ir, optional_ptr, 1);
        if keep_pointer {
            Some(error_ptr)
        } else {
            Some(self.load_value(error_ptr, &Ty::Error))
        }
    }

    /// `try e` / `e!`: on a set error slot, run the error-path defers and
    /// either propagate through the optional return or abort.
    fn generate_try(
        &mut self,
        label: &str,
        inner: &ResolvedExpr,
        defers: &[DeferId],
        value_ty: &Ty,
        mut keep_pointer: bool,
        span: dmz_parser::source::Span,
    ) -> Option<Value> {
        let error_bb = self.b.append_block(&format!("{label}.error"));
        let exit_bb = self.b.append_block(&format!("{label}.exit"));

        let optional_ir = self.ty_to_ir(&inner.ty.clone());
        let optional_ptr = self.generate_expr(inner, true)?;
        let error_ptr = self.struct_gep(optional_ir.clone(), optional_ptr.clone(), 1);
        let error = self.load_value(error_ptr, &Ty::Error);

        let has_error = self.to_bool(error.clone(), &Ty::Error);
        self.b.terminate(Terminator::CondBr {
            cond: has_error,
            then_block: error_bb,
            else_block: exit_bb,
        });

        self.b.position_at(error_bb);
        self.generate_defers(defers);

        let fn_id = self.current_fn.expect("try outside a function");
        let fn_ret = self.prog.function(fn_id).ret.clone();
        if matches!(fn_ret, Ty::Optional(_)) {
            let ret_ir = self.ty_to_ir(&fn_ret);
            let ret_val = self.ret_val.clone().expect("optional return without slot");
            let slot = self.struct_gep(ret_ir, ret_val, 1);
            self.store_value(error, slot, &Ty::Error, &Ty::Error);
            let ret_block = self.ret_block.expect("missing return block");
            self.b.branch_to(ret_block);
        } else {
            let fn_name = self.prog.decl(fn_id).name.clone();
            self.emit_abort(&format!(
                "{}:{}: Aborted: caught an error in function '{}' that does not return an optional\n",
                span.line, span.col, fn_name
            ));
        }

        self.b.position_at(exit_bb);

        if *value_ty == Ty::Void {
            return None;
        }
        let value_ptr = self.struct_gep(optional_ir, optional_ptr, 0);
        keep_pointer |= Self::is_aggregate(value_ty);
        if keep_pointer {
            Some(value_ptr)
        } else {
            Some(self.load_value(value_ptr, value_ty))
        }
    }

    /// `e orelse f` copies the value slot, overwriting it with `f` when
    /// the error slot is set.
    fn generate_orelse(
        &mut self,
        inner: &ResolvedExpr,
        fallback: &ResolvedExpr,
        result_ty: &Ty,
        mut keep_pointer: bool,
    ) -> Option<Value> {
        let fallback_bb = self.b.append_block("orelse.fallback");
        let exit_bb = self.b.append_block("orelse.exit");

        let optional_ir = self.ty_to_ir(&inner.ty.clone());
        let optional_ptr = self.generate_expr(inner, true)?;
        let error_ptr = self.struct_gep(optional_ir.clone(), optional_ptr.clone(), 1);
        let error = self.load_value(error_ptr, &Ty::Error);

        let result = self.alloc_stack("tmp.orelse", result_ty);
        let value_ptr = self.struct_gep(optional_ir, optional_ptr, 0);
        if Self::is_aggregate(result_ty) {
            self.store_value(value_ptr, result.clone(), result_ty, result_ty);
        } else {
            let value = self.load_value(value_ptr, result_ty);
            self.store_value(value, result.clone(), result_ty, result_ty);
        }

        let has_error = self.to_bool(error, &Ty::Error);
        self.b.terminate(Terminator::CondBr {
            cond: has_error,
            then_block: fallback_bb,
            else_block: exit_bb,
        });

        self.b.position_at(fallback_bb);
        let fallback_val = self.generate_expr(fallback, false)?;
        self.store_value(fallback_val, result.clone(), &fallback.ty, result_ty);
        self.b.branch_to(exit_bb);

        self.b.position_at(exit_bb);
        keep_pointer |= Self::is_aggregate(result_ty);
        if keep_pointer {
            Some(result)
        } else {
            Some(self.load_value(result, result_ty))
        }
    }
}
