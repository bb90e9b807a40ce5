//! Resolved types.
//!
//! A closed family: structural equality everywhere except `Struct`,
//! `Module` and `ErrorGroup`, which compare by declaration identity (the
//! `DeclId` *is* the identity). The whole family is `Hash` so concrete
//! type tuples can key specialization caches.

use crate::resolved::{DeclId, ResolvedProgram};

pub use dmz_parser::ast::NumberKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    Bool,
    Number { kind: NumberKind, bits: u32 },
    Struct(DeclId),
    ErrorGroup(DeclId),
    Module(DeclId),
    Generic(DeclId),
    Pointer(Box<Ty>),
    Array { elem: Box<Ty>, len: u64 },
    Slice(Box<Ty>),
    Optional(Box<Ty>),
    /// The error tag type; represented as a pointer to an interned string.
    Error,
    /// `lo..hi`; only occurs as a `for` iterator or slicing index.
    Range,
    Function { params: Vec<Ty>, ret: Box<Ty> },
    /// Transient type of `{}` and omitted struct fields: the slot keeps
    /// its entry-block zero fill.
    DefaultInit,
}

impl Ty {
    pub const ISIZE: Ty = Ty::Number {
        kind: NumberKind::Signed,
        bits: 64,
    };
    pub const USIZE: Ty = Ty::Number {
        kind: NumberKind::Unsigned,
        bits: 64,
    };
    pub const I32: Ty = Ty::Number {
        kind: NumberKind::Signed,
        bits: 32,
    };
    pub const U8: Ty = Ty::Number {
        kind: NumberKind::Unsigned,
        bits: 8,
    };
    pub const F64: Ty = Ty::Number {
        kind: NumberKind::Float,
        bits: 64,
    };

    pub fn ptr_to(inner: Ty) -> Ty {
        Ty::Pointer(Box::new(inner))
    }

    pub fn optional_of(inner: Ty) -> Ty {
        Ty::Optional(Box::new(inner))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Number { .. } | Ty::Bool)
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Ty::Number {
                kind: NumberKind::Float,
                ..
            }
        )
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Ty::Struct(_) | Ty::Optional(_) | Ty::Slice(_) | Ty::Array { .. }
        )
    }

    /// The value slot type of an optional; identity otherwise.
    pub fn value_ty(&self) -> &Ty {
        match self {
            Ty::Optional(inner) => inner,
            other => other,
        }
    }

    /// Loose comparison used for assignments, arguments and returns.
    /// Numbers (and bool) unify across kind and width; a cast is inserted
    /// during lowering. Nominal types compare by identity; the null
    /// pointer (`void*`) unifies with any pointer.
    pub fn unifies(&self, other: &Ty) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Ty::DefaultInit, _) | (_, Ty::DefaultInit) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Ty::Pointer(a), Ty::Pointer(b)) => {
                **a == Ty::Void || **b == Ty::Void || a.unifies(b)
            }
            (Ty::Optional(a), Ty::Optional(b)) => a.unifies(b),
            (Ty::Slice(a), Ty::Slice(b)) => a.unifies(b),
            (
                Ty::Array { elem: a, len: la },
                Ty::Array { elem: b, len: lb },
            ) => la == lb && a.unifies(b),
            (
                Ty::Function { params: pa, ret: ra },
                Ty::Function { params: pb, ret: rb },
            ) => pa == pb && ra == rb,
            _ => false,
        }
    }

    /// Source-like rendering; declaration names come from the program.
    pub fn display(&self, prog: &ResolvedProgram) -> String {
        match self {
            Ty::Void => "void".into(),
            Ty::Bool => "bool".into(),
            Ty::Number { kind, bits } => match kind {
                NumberKind::Signed => format!("i{bits}"),
                NumberKind::Unsigned => format!("u{bits}"),
                NumberKind::Float => format!("f{bits}"),
            },
            Ty::Struct(id) | Ty::ErrorGroup(id) | Ty::Module(id) | Ty::Generic(id) => {
                prog.decl(*id).name.clone()
            }
            Ty::Pointer(inner) => format!("{}*", inner.display(prog)),
            Ty::Array { elem, len } => format!("{}[{len}]", elem.display(prog)),
            Ty::Slice(inner) => format!("{}[]", inner.display(prog)),
            Ty::Optional(inner) => format!("{}?", inner.display(prog)),
            Ty::Error => "err".into(),
            Ty::Range => "range".into(),
            Ty::Function { params, ret } => {
                let params: Vec<_> = params.iter().map(|t| t.display(prog)).collect();
                format!("fn({}) -> {}", params.join(","), ret.display(prog))
            }
            Ty::DefaultInit => "<default>".into(),
        }
    }

    /// Rendering used in specialization symbol suffixes: `<i32,f64>`.
    pub fn symbol_suffix(args: &[Ty], prog: &ResolvedProgram) -> String {
        let parts: Vec<_> = args.iter().map(|t| t.display(prog)).collect();
        format!("<{}>", parts.join(","))
    }
}
