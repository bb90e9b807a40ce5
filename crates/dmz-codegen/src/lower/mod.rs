//! Lowering of the resolved tree into the SSA module.
//!
//! Layout conventions:
//! - struct and optional returns go through a leading `sret` pointer
//!   parameter and the function's nominal return becomes void;
//! - `Optional<T>` is a two-field struct `{ T-or-i1, ptr }` whose error
//!   pointer is null when a value is present;
//! - aggregates are handled by pointer everywhere (`keep_pointer`);
//! - every stack slot is zero-filled from the entry block.

mod decl;
mod expr;
mod stmt;

use crate::ir::{Attr, FunctionBuilder, Instr, IrModule, IrParam, IrType, Value};
use crate::layout;
use dmz_sema::{DeclId, NumberKind, ResolvedProgram, Ty};
use rustc_hash::FxHashMap;

pub struct Codegen<'a> {
    pub(crate) prog: &'a ResolvedProgram,
    pub(crate) module: IrModule,
    /// Parameter/variable/capture slots and error-tag globals.
    pub(crate) decl_values: FxHashMap<DeclId, Value>,
    pub(crate) current_fn: Option<DeclId>,
    pub(crate) ret_val: Option<Value>,
    pub(crate) ret_block: Option<usize>,
    pub(crate) b: FunctionBuilder,
    pub(crate) test_mode: bool,
}

impl<'a> Codegen<'a> {
    /// Lowers the whole program into a printable module.
    pub fn generate(prog: &'a ResolvedProgram, source_name: &str, test_mode: bool) -> IrModule {
        let mut codegen = Codegen {
            prog,
            module: IrModule::new(source_name),
            decl_values: FxHashMap::default(),
            current_fn: None,
            ret_val: None,
            ret_block: None,
            b: FunctionBuilder::new("<none>", IrType::Void, Vec::new(), false),
            test_mode,
        };

        codegen.generate_struct_decls();
        codegen.generate_error_globals();
        codegen.generate_function_decls();
        codegen.generate_struct_definitions();
        codegen.generate_function_bodies();
        codegen.generate_main_wrapper();

        codegen.module
    }

    // ========================================================================
    // Type mapping
    // ========================================================================

    pub(crate) fn struct_type_name(&self, id: DeclId) -> String {
        format!("struct.{}", self.prog.decl(id).symbol)
    }

    fn optional_type_name(&self, inner: &Ty) -> String {
        format!("err.struct.{}", inner.display(self.prog))
    }

    pub(crate) fn ty_to_ir(&mut self, ty: &Ty) -> IrType {
        match ty {
            Ty::Void => IrType::Void,
            Ty::Bool => IrType::Int(1),
            Ty::Number { kind, bits } => match kind {
                NumberKind::Float => match bits {
                    16 => IrType::Half,
                    32 => IrType::Float,
                    64 => IrType::Double,
                    _ => unreachable!("float type has an incorrect size"),
                },
                _ => IrType::Int(*bits),
            },
            Ty::Pointer(_) | Ty::Error | Ty::Function { .. } => IrType::Ptr,
            Ty::Struct(id) => IrType::Struct(self.struct_type_name(*id)),
            Ty::Array { elem, len } => IrType::Array {
                elem: Box::new(self.ty_to_ir(elem)),
                len: *len,
            },
            Ty::Slice(_) => IrType::slice(),
            Ty::Optional(inner) => {
                let name = self.optional_type_name(inner);
                if !self.module.has_struct(&name) {
                    let value_ty = if **inner == Ty::Void {
                        IrType::Int(1)
                    } else {
                        self.ty_to_ir(inner)
                    };
                    self.module
                        .define_struct(&name, vec![value_ty, IrType::Ptr]);
                }
                IrType::Struct(name)
            }
            Ty::Range | Ty::Module(_) | Ty::ErrorGroup(_) | Ty::Generic(_) | Ty::DefaultInit => {
                unreachable!("type {ty:?} is not materialized")
            }
        }
    }

    /// Whether values of this type live behind a pointer and return
    /// through an sret buffer.
    pub(crate) fn is_aggregate(ty: &Ty) -> bool {
        ty.is_aggregate()
    }

    pub(crate) fn alloc_stack(&mut self, name: &str, ty: &Ty) -> Value {
        let ir = self.ty_to_ir(ty);
        let bytes = layout::size_of(self.prog, ty);
        self.b.alloc_stack(name, ir, bytes)
    }

    // ========================================================================
    // Value-level rules reused everywhere
    // ========================================================================

    /// Boolification: pointers and errors compare against null, integers
    /// against zero (identity for i1), floats ordered-not-equal 0.0.
    pub(crate) fn to_bool(&mut self, value: Value, ty: &Ty) -> Value {
        match ty {
            Ty::Pointer(_) | Ty::Error | Ty::Function { .. } => {
                let dest = self.b.temp();
                self.b.push(Instr::Cmp {
                    dest: dest.clone(),
                    float: false,
                    cond: "ne",
                    ty: IrType::Ptr,
                    lhs: value,
                    rhs: Value::Null,
                });
                dest
            }
            Ty::Bool => value,
            Ty::Number {
                kind: NumberKind::Float,
                ..
            } => {
                let ir = self.ty_to_ir(ty);
                let dest = self.b.temp();
                self.b.push(Instr::Cmp {
                    dest: dest.clone(),
                    float: true,
                    cond: "one",
                    ty: ir,
                    lhs: value,
                    rhs: Value::FloatConst(0.0),
                });
                dest
            }
            Ty::Number { bits, .. } => {
                if *bits == 1 {
                    return value;
                }
                let ir = self.ty_to_ir(ty);
                let dest = self.b.temp();
                self.b.push(Instr::Cmp {
                    dest: dest.clone(),
                    float: false,
                    cond: "ne",
                    ty: ir,
                    lhs: value,
                    rhs: Value::int(*bits, 0),
                });
                dest
            }
            _ => unreachable!("unsupported type in to_bool"),
        }
    }

    fn numeric_bits(ty: &Ty) -> u32 {
        match ty {
            Ty::Bool => 1,
            Ty::Number { bits, .. } => *bits,
            _ => unreachable!("not a numeric type"),
        }
    }

    fn numeric_kind(ty: &Ty) -> NumberKind {
        match ty {
            Ty::Bool => NumberKind::Unsigned,
            Ty::Number { kind, .. } => *kind,
            _ => unreachable!("not a numeric type"),
        }
    }

    fn cast(&mut self, op: &'static str, value: Value, from: &Ty, to: &Ty) -> Value {
        let from_ir = self.ty_to_ir(from);
        let to_ir = self.ty_to_ir(to);
        let dest = self.b.temp();
        self.b.push(Instr::Cast {
            dest: dest.clone(),
            op,
            from: from_ir,
            value,
            to: to_ir,
        });
        dest
    }

    /// Numeric conversion matrix; pointer-to-pointer is identity.
    pub(crate) fn cast_to(&mut self, value: Value, from: &Ty, to: &Ty) -> Value {
        if from == to {
            return value;
        }
        let pointerish =
            |ty: &Ty| matches!(ty, Ty::Pointer(_) | Ty::Error | Ty::Function { .. });
        if pointerish(from) && pointerish(to) {
            return value;
        }
        if !from.is_numeric() || !to.is_numeric() {
            return value;
        }

        let (from_kind, to_kind) = (Self::numeric_kind(from), Self::numeric_kind(to));
        let (from_bits, to_bits) = (Self::numeric_bits(from), Self::numeric_bits(to));

        match (from_kind, to_kind) {
            (NumberKind::Float, NumberKind::Float) => {
                if from_bits > to_bits {
                    self.cast("fptrunc", value, from, to)
                } else if from_bits < to_bits {
                    self.cast("fpext", value, from, to)
                } else {
                    value
                }
            }
            (NumberKind::Float, NumberKind::Signed) => self.cast("fptosi", value, from, to),
            (NumberKind::Float, NumberKind::Unsigned) => self.cast("fptoui", value, from, to),
            (NumberKind::Signed, NumberKind::Float) => self.cast("sitofp", value, from, to),
            (NumberKind::Unsigned, NumberKind::Float) => self.cast("uitofp", value, from, to),
            (from_int, _) => {
                if from_bits == to_bits {
                    value
                } else if from_bits > to_bits {
                    self.cast("trunc", value, from, to)
                } else if from_int == NumberKind::Signed && from_bits != 1 {
                    self.cast("sext", value, from, to)
                } else {
                    self.cast("zext", value, from, to)
                }
            }
        }
    }

    /// Stores through a pointer: aggregates copy, scalars cast-and-store.
    pub(crate) fn store_value(&mut self, value: Value, ptr: Value, from: &Ty, to: &Ty) {
        if Self::is_aggregate(from) {
            let bytes = layout::size_of(self.prog, from);
            self.b.push(Instr::Memcpy {
                dest: ptr,
                src: value,
                bytes,
            });
            return;
        }
        let value = self.cast_to(value, from, to);
        let ir = self.ty_to_ir(to);
        self.b.push(Instr::Store {
            ty: ir,
            value,
            ptr,
        });
    }

    pub(crate) fn load_value(&mut self, ptr: Value, ty: &Ty) -> Value {
        let ir = self.ty_to_ir(ty);
        let dest = self.b.temp();
        self.b.push(Instr::Load {
            dest: dest.clone(),
            ty: ir,
            ptr,
        });
        dest
    }

    /// Element pointer into a struct-shaped type.
    pub(crate) fn struct_gep(&mut self, struct_ty: IrType, base: Value, index: u32) -> Value {
        let dest = self.b.temp();
        self.b.push(Instr::Gep {
            dest: dest.clone(),
            base_ty: struct_ty,
            base,
            indices: vec![
                (IrType::Int(32), Value::int(32, 0)),
                (IrType::Int(32), Value::int(32, index as i64)),
            ],
        });
        dest
    }

    // ========================================================================
    // Calling conventions
    // ========================================================================

    /// The attribute for one parameter, reconstructed from its type and
    /// (when known) its declaration.
    pub(crate) fn param_attr(&mut self, ty: &Ty, by_ref: bool) -> (IrType, Option<Attr>) {
        let ir = self.ty_to_ir(ty);
        if by_ref {
            return (IrType::Ptr, Some(Attr::ByRef(ir)));
        }
        match ty {
            Ty::Struct(_) | Ty::Optional(_) | Ty::Slice(_) | Ty::Array { .. } => {
                (IrType::Ptr, Some(Attr::ByVal(ir)))
            }
            _ => (ir, None),
        }
    }

    /// IR signature of a function declaration: `(params, ret, vararg,
    /// uses_sret)`.
    pub(crate) fn fn_signature(&mut self, fn_id: DeclId) -> (Vec<IrParam>, IrType, bool, bool) {
        let data = self.prog.function(fn_id);
        let ret = data.ret.clone();
        let param_ids = data.params.clone();

        let uses_sret = Self::is_aggregate(&ret);
        let mut params = Vec::new();
        let mut vararg = false;

        if uses_sret {
            let ret_ir = self.ty_to_ir(&ret);
            params.push(IrParam {
                name: "ret".into(),
                ty: IrType::Ptr,
                attrs: vec![Attr::SRet(ret_ir)],
            });
        }

        for param_id in param_ids {
            let (ty, by_ref, is_vararg) = {
                let (ty, by_ref, is_vararg) = self.prog.param(param_id);
                (ty.clone(), by_ref, is_vararg)
            };
            if is_vararg {
                vararg = true;
                continue;
            }
            let (ir, attr) = self.param_attr(&ty, by_ref);
            let mut attrs = Vec::new();
            if let Some(attr) = attr {
                // Immutable by-value structs are only read by the callee.
                if matches!(attr, Attr::ByVal(_)) && matches!(ty, Ty::Struct(_)) {
                    attrs.push(Attr::ReadOnly);
                }
                attrs.push(attr);
            }
            params.push(IrParam {
                name: self.prog.decl(param_id).name.clone(),
                ty: ir,
                attrs,
            });
        }

        let ret_ir = if uses_sret {
            IrType::Void
        } else {
            self.ty_to_ir(&ret)
        };
        (params, ret_ir, vararg, uses_sret)
    }
}
