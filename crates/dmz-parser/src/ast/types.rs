//! Syntactic types.

use crate::source::Span;

/// How a numeric type is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Signed,
    Unsigned,
    Float,
}

/// A type as written in source, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Void,
    Bool,
    /// The error tag type, written `err`.
    Error,
    Number { kind: NumberKind, bits: u32 },
    /// Identifier in type position; resolved later to a struct or a
    /// generic type parameter. Generic arguments select a specialization.
    Named {
        name: String,
        generic_args: Vec<TypeExpr>,
    },
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    Slice(Box<TypeExpr>),
    Array { elem: Box<TypeExpr>, len: u64 },
    Pointer(Box<TypeExpr>),
    Optional(Box<TypeExpr>),
    /// By-reference parameter type (`&T`); only valid on parameters.
    Ref(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn void(span: Span) -> Self {
        Self::new(TypeExprKind::Void, span)
    }

    /// Source-like rendering used in diagnostics.
    pub fn name(&self) -> String {
        match &self.kind {
            TypeExprKind::Void => "void".into(),
            TypeExprKind::Bool => "bool".into(),
            TypeExprKind::Error => "err".into(),
            TypeExprKind::Number { kind, bits } => match kind {
                NumberKind::Signed => format!("i{bits}"),
                NumberKind::Unsigned => format!("u{bits}"),
                NumberKind::Float => format!("f{bits}"),
            },
            TypeExprKind::Named { name, generic_args } => {
                if generic_args.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<_> = generic_args.iter().map(|t| t.name()).collect();
                    format!("{name}<{}>", args.join(","))
                }
            }
            TypeExprKind::Function { params, ret } => {
                let params: Vec<_> = params.iter().map(|t| t.name()).collect();
                format!("fn({}) -> {}", params.join(","), ret.name())
            }
            TypeExprKind::Slice(inner) => format!("{}[]", inner.name()),
            TypeExprKind::Array { elem, len } => format!("{}[{len}]", elem.name()),
            TypeExprKind::Pointer(inner) => format!("{}*", inner.name()),
            TypeExprKind::Optional(inner) => format!("{}?", inner.name()),
            TypeExprKind::Ref(inner) => format!("&{}", inner.name()),
        }
    }
}
