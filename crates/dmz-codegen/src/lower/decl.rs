//! Declaration emission: struct types (opaque then bodied), error-tag
//! globals, prototypes, bodies, and the synthesized `main`.

use super::Codegen;
use crate::ir::{Attr, FunctionBuilder, Instr, IrType, Terminator, Value};
use dmz_sema::{DeclId, DeclKind, ResolvedProgram, Ty};

impl<'a> Codegen<'a> {
    fn each_struct(prog: &ResolvedProgram) -> Vec<DeclId> {
        (0..prog.decls.len() as u32)
            .map(DeclId)
            .filter(|id| match &prog.decl(*id).kind {
                DeclKind::Struct(data) => !data.is_generic(),
                _ => false,
            })
            .collect()
    }

    fn each_function(prog: &ResolvedProgram) -> Vec<DeclId> {
        (0..prog.decls.len() as u32)
            .map(DeclId)
            .filter(|id| match &prog.decl(*id).kind {
                DeclKind::Function(data) => !data.is_generic(),
                _ => false,
            })
            .collect()
    }

    /// First pass: opaque named types, so fields can forward-reference.
    pub(crate) fn generate_struct_decls(&mut self) {
        for id in Self::each_struct(self.prog) {
            let name = self.struct_type_name(id);
            self.module.declare_struct(&name);
        }
    }

    /// Second pass: bodies.
    pub(crate) fn generate_struct_definitions(&mut self) {
        for id in Self::each_struct(self.prog) {
            let name = self.struct_type_name(id);
            let mut field_types = Vec::new();
            for field in self.prog.strukt(id).fields.clone() {
                let DeclKind::Field { ty, .. } = &self.prog.decl(field).kind else {
                    unreachable!()
                };
                let ty = ty.clone();
                field_types.push(self.ty_to_ir(&ty));
            }
            self.module.define_struct(&name, field_types);
        }
    }

    /// `err.str.SUCCESS` plus one interned tag per error constant.
    pub(crate) fn generate_error_globals(&mut self) {
        self.module
            .named_global_string("err.str.SUCCESS", "SUCCESS");

        for idx in 0..self.prog.decls.len() as u32 {
            let id = DeclId(idx);
            if !matches!(self.prog.decl(id).kind, DeclKind::Err) {
                continue;
            }
            let symbol = self.prog.decl(id).symbol.clone();
            let name = format!("err.str.{symbol}");
            self.module.named_global_string(&name, &symbol);
            self.decl_values.insert(id, Value::Global(name));
        }
    }

    /// Extern prototypes; defined functions emit in the body pass.
    pub(crate) fn generate_function_decls(&mut self) {
        for id in Self::each_function(self.prog) {
            let data = self.prog.function(id);
            if !data.is_extern {
                continue;
            }
            let (params, ret, vararg, _) = self.fn_signature(id);
            let name = self.prog.decl(id).symbol.clone();
            self.module.functions.push(crate::ir::IrFunction {
                name,
                ret,
                params,
                vararg,
                blocks: Vec::new(),
            });
        }
    }

    pub(crate) fn generate_function_bodies(&mut self) {
        for id in Self::each_function(self.prog) {
            let data = self.prog.function(id);
            if data.is_extern {
                continue;
            }
            if data.is_test && !self.test_mode {
                continue;
            }
            if data.body.is_none() {
                // The one bodiless non-extern function is the builtin.
                if self.prog.decl(id).symbol == "println" {
                    self.generate_builtin_println(id);
                }
                continue;
            }
            self.generate_function_body(id);
        }
    }

    fn generate_function_body(&mut self, fn_id: DeclId) {
        let (params, ret_ir, vararg, uses_sret) = self.fn_signature(fn_id);
        let symbol = self.prog.decl(fn_id).symbol.clone();
        self.b = FunctionBuilder::new(symbol, ret_ir, params, vararg);
        self.current_fn = Some(fn_id);

        let data = self.prog.function(fn_id);
        let ret_ty = data.ret.clone();
        let param_ids = data.params.clone();

        self.ret_val = if uses_sret {
            Some(Value::Local("ret".into()))
        } else if ret_ty != Ty::Void {
            Some(self.alloc_stack("retval", &ret_ty))
        } else {
            None
        };
        let ret_block = self.b.append_block("return");
        self.ret_block = Some(ret_block);

        // Scalar parameters move to zero-initialized stack slots so the
        // rest of lowering can treat every declaration as a pointer;
        // aggregates and by-ref parameters already arrive as pointers.
        for param_id in param_ids {
            let (ty, by_ref, is_vararg) = {
                let (ty, by_ref, is_vararg) = self.prog.param(param_id);
                (ty.clone(), by_ref, is_vararg)
            };
            if is_vararg {
                continue;
            }
            let name = self.prog.decl(param_id).name.clone();
            if by_ref || Self::is_aggregate(&ty) {
                self.decl_values.insert(param_id, Value::Local(name));
                continue;
            }
            let slot = self.alloc_stack(&format!("{name}.addr"), &ty);
            self.store_value(Value::Local(name), slot.clone(), &ty, &ty);
            self.decl_values.insert(param_id, slot);
        }

        let prog = self.prog;
        let body = prog
            .function(fn_id)
            .body
            .as_ref()
            .expect("function body pass without a body");
        self.generate_block(body);

        self.b.branch_to(ret_block);
        self.b.position_at(ret_block);
        if uses_sret || ret_ty == Ty::Void {
            self.b.terminate(Terminator::Ret {
                ty: IrType::Void,
                value: None,
            });
        } else {
            let value = self.load_value(self.ret_val.clone().unwrap(), &ret_ty);
            let ir = self.ty_to_ir(&ret_ty);
            self.b.terminate(Terminator::Ret {
                ty: ir,
                value: Some(value),
            });
        }

        let finished = std::mem::replace(
            &mut self.b,
            FunctionBuilder::new("<none>", IrType::Void, Vec::new(), false),
        );
        self.module.functions.push(finished.finish());
    }

    /// `println(n)` lowers to `printf("%d\n", n)`.
    fn generate_builtin_println(&mut self, fn_id: DeclId) {
        let (params, ret_ir, vararg, _) = self.fn_signature(fn_id);
        self.b = FunctionBuilder::new("println", ret_ir, params, vararg);

        let fmt = self.module.global_string("global.str", "%d\n");
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
            args: vec![
                (IrType::Ptr, Value::Global(fmt), None),
                (IrType::Int(32), Value::Local("n".into()), None),
            ],
        });
        self.b.terminate(Terminator::Ret {
            ty: IrType::Void,
            value: None,
        });

        let finished = std::mem::replace(
            &mut self.b,
            FunctionBuilder::new("<none>", IrType::Void, Vec::new(), false),
        );
        self.module.functions.push(finished.finish());
    }

    /// In test mode, `main` runs every test and returns the failure
    /// count; otherwise it calls `__builtin_main` and returns 0.
    pub(crate) fn generate_main_wrapper(&mut self) {
        if self.test_mode {
            self.generate_test_main();
            return;
        }
        if !self.module.has_function("__builtin_main") {
            return;
        }

        let mut b = FunctionBuilder::new("main", IrType::Int(32), Vec::new(), false);
        b.push(Instr::Call {
            dest: None,
            fn_ty: IrType::Function {
                params: Vec::new(),
                ret: Box::new(IrType::Void),
                vararg: false,
            },
            callee: Value::Global("__builtin_main".into()),
            args: Vec::new(),
        });
        b.terminate(Terminator::Ret {
            ty: IrType::Int(32),
            value: Some(Value::int(32, 0)),
        });
        self.module.functions.push(b.finish());
    }

    fn generate_test_main(&mut self) {
        let tests: Vec<DeclId> = Self::each_function(self.prog)
            .into_iter()
            .filter(|id| self.prog.function(*id).is_test)
            .collect();

        let optional_void = Ty::optional_of(Ty::Void);
        let optional_ir = self.ty_to_ir(&optional_void);

        let fail_fmt = self.module.global_string("global.str", "FAILED test %s: %s\n");
        let printf_ty = IrType::Function {
            params: vec![IrType::Ptr],
            ret: Box::new(IrType::Int(32)),
            vararg: true,
        };

        self.b = FunctionBuilder::new("main", IrType::Int(32), Vec::new(), false);
        let failures = self
            .b
            .alloc_stack("failures", IrType::Int(32), 4);

        for test in tests {
            let symbol = self.prog.decl(test).symbol.clone();
            let name = self.prog.decl(test).name.clone();
            let name_str = self.module.global_string("test.str", &name);

            let result = self.b.alloc_stack(
                "test.result",
                optional_ir.clone(),
                crate::layout::size_of(self.prog, &optional_void),
            );
            self.b.push(Instr::Call {
                dest: None,
                fn_ty: IrType::Function {
                    params: vec![IrType::Ptr],
                    ret: Box::new(IrType::Void),
                    vararg: false,
                },
                callee: Value::Global(symbol),
                args: vec![(
                    IrType::Ptr,
                    result.clone(),
                    Some(Attr::SRet(optional_ir.clone())),
                )],
            });

            let error_ptr = self.struct_gep(optional_ir.clone(), result, 1);
            let error = self.load_value(error_ptr, &Ty::Error);
            let failed = self.to_bool(error.clone(), &Ty::Error);

            let fail_block = self.b.append_block("test.fail");
            let next_block = self.b.append_block("test.next");
            self.b.terminate(Terminator::CondBr {
                cond: failed,
                then_block: fail_block,
                else_block: next_block,
            });

            self.b.position_at(fail_block);
            let dest = self.b.temp();
            self.b.push(Instr::Call {
                dest: Some(dest),
                fn_ty: printf_ty.clone(),
                callee: Value::Global("printf".into()),
                args: vec![
                    (IrType::Ptr, Value::Global(fail_fmt.clone()), None),
                    (IrType::Ptr, Value::Global(name_str), None),
                    (IrType::Ptr, error, None),
                ],
            });
            let count = self.load_value(failures.clone(), &Ty::I32);
            let bumped = self.b.temp();
            self.b.push(Instr::Bin {
                dest: bumped.clone(),
                op: "add",
                ty: IrType::Int(32),
                lhs: count,
                rhs: Value::int(32, 1),
            });
            self.b.push(Instr::Store {
                ty: IrType::Int(32),
                value: bumped,
                ptr: failures.clone(),
            });
            self.b.branch_to(next_block);
            self.b.position_at(next_block);
        }

        let total = self.load_value(failures, &Ty::I32);
        self.b.terminate(Terminator::Ret {
            ty: IrType::Int(32),
            value: Some(total),
        });

        let finished = std::mem::replace(
            &mut self.b,
            FunctionBuilder::new("<none>", IrType::Void, Vec::new(), false),
        );
        self.module.functions.push(finished.finish());
    }
}
