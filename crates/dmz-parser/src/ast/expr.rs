//! Expression AST nodes.

use super::{ErrDecl, TypeExpr};
use crate::source::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(IntLit),
    FloatLit(FloatLit),
    CharLit(CharLit),
    BoolLit(BoolLit),
    StrLit(StrLit),
    NullLit(Span),
    DeclRef(DeclRefExpr),
    /// `A::B::x` — module-qualified reference.
    ModulePath(ModulePathExpr),
    Member(MemberExpr),
    /// `.field` inside a member function.
    SelfMember(SelfMemberExpr),
    ArrayAt(ArrayAtExpr),
    ArrayInit(ArrayInitExpr),
    StructInit(StructInitExpr),
    Group(GroupExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    /// `&e`
    Ref(RefExpr),
    /// `*e`
    Deref(DerefExpr),
    Call(CallExpr),
    Sizeof(SizeofExpr),
    Range(RangeExpr),
    /// `@Name` — globally interned error tag.
    ErrorInPlace(ErrorInPlaceExpr),
    /// `Name?` — reference to a declared error constant.
    ErrRef(ErrRefExpr),
    Catch(CatchExpr),
    Try(TryExpr),
    OrElse(OrElseExpr),
    /// `e!` — unwrap, propagating the error like `try`.
    Unwrap(UnwrapExpr),
    /// `import A::B` in expression position.
    Import(ImportExpr),
    /// `err { A, B }` — anonymous error group.
    ErrGroup(ErrGroupExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit(e) => e.span,
            Expr::FloatLit(e) => e.span,
            Expr::CharLit(e) => e.span,
            Expr::BoolLit(e) => e.span,
            Expr::StrLit(e) => e.span,
            Expr::NullLit(span) => *span,
            Expr::DeclRef(e) => e.span,
            Expr::ModulePath(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::SelfMember(e) => e.span,
            Expr::ArrayAt(e) => e.span,
            Expr::ArrayInit(e) => e.span,
            Expr::StructInit(e) => e.span,
            Expr::Group(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Ref(e) => e.span,
            Expr::Deref(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Sizeof(e) => e.span,
            Expr::Range(e) => e.span,
            Expr::ErrorInPlace(e) => e.span,
            Expr::ErrRef(e) => e.span,
            Expr::Catch(e) => e.span,
            Expr::Try(e) => e.span,
            Expr::OrElse(e) => e.span,
            Expr::Unwrap(e) => e.span,
            Expr::Import(e) => e.span,
            Expr::ErrGroup(e) => e.span,
        }
    }

    /// Whether this expression may appear on the LHS of an assignment.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::DeclRef(_)
                | Expr::Member(_)
                | Expr::SelfMember(_)
                | Expr::ArrayAt(_)
                | Expr::Deref(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLit {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharLit {
    pub value: u8,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclRefExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModulePathExpr {
    pub segments: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub base: Box<Expr>,
    pub field: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfMemberExpr {
    pub field: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayAtExpr {
    pub array: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInitExpr {
    pub elems: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructInitExpr {
    pub name: String,
    pub generic_args: Vec<TypeExpr>,
    pub fields: Vec<FieldInit>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// Whether the operator yields `bool` regardless of operand type.
    pub fn produces_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::And
                | BinaryOp::Or
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerefExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub generic_args: Vec<TypeExpr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeofExpr {
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeExpr {
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInPlaceExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrRefExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrElseExpr {
    pub inner: Box<Expr>,
    pub fallback: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwrapExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportExpr {
    pub path: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrGroupExpr {
    pub errors: Vec<ErrDecl>,
    pub span: Span,
}
