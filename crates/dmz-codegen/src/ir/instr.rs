//! Instructions and terminators.

use super::ty::IrType;
use super::value::Value;

/// Parameter/argument attributes carried through calls and prototypes.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// Caller-allocated return buffer (struct return convention).
    SRet(IrType),
    /// Aggregate passed by value through a pointer.
    ByVal(IrType),
    /// Passed by reference.
    ByRef(IrType),
    ReadOnly,
}

impl std::fmt::Display for Attr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attr::SRet(ty) => write!(f, "sret({ty})"),
            Attr::ByVal(ty) => write!(f, "byval({ty})"),
            Attr::ByRef(ty) => write!(f, "byref({ty})"),
            Attr::ReadOnly => write!(f, "readonly"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Instr {
    Alloca {
        dest: Value,
        ty: IrType,
    },
    /// Zero fill planted in the entry block for every stack slot.
    Memset {
        ptr: Value,
        bytes: u64,
    },
    Memcpy {
        dest: Value,
        src: Value,
        bytes: u64,
    },
    Store {
        ty: IrType,
        value: Value,
        ptr: Value,
    },
    Load {
        dest: Value,
        ty: IrType,
        ptr: Value,
    },
    /// `add`, `fadd`, `sub`, `sdiv`, `urem`, ...
    Bin {
        dest: Value,
        op: &'static str,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    /// `icmp <cond>` / `fcmp <cond>`.
    Cmp {
        dest: Value,
        float: bool,
        cond: &'static str,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    /// `sext`, `zext`, `trunc`, `sitofp`, `fptrunc`, `ptrtoint`, ...
    Cast {
        dest: Value,
        op: &'static str,
        from: IrType,
        value: Value,
        to: IrType,
    },
    /// `getelementptr` with explicit index types.
    Gep {
        dest: Value,
        base_ty: IrType,
        base: Value,
        indices: Vec<(IrType, Value)>,
    },
    Call {
        dest: Option<Value>,
        fn_ty: IrType,
        callee: Value,
        args: Vec<(IrType, Value, Option<Attr>)>,
    },
    Phi {
        dest: Value,
        ty: IrType,
        incomings: Vec<(Value, usize)>,
    },
    /// `call void @llvm.trap()`.
    Trap,
}

#[derive(Debug, Clone)]
pub enum Terminator {
    Br(usize),
    CondBr {
        cond: Value,
        then_block: usize,
        else_block: usize,
    },
    Switch {
        ty: IrType,
        value: Value,
        default: usize,
        cases: Vec<(i64, usize)>,
    },
    Ret {
        ty: IrType,
        value: Option<Value>,
    },
    Unreachable,
}
