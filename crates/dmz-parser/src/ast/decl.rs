//! Declaration AST nodes.

use super::{Block, Expr, TypeExpr};
use crate::source::Span;

/// Top-level (or module-level) declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Module(ModuleDecl),
    Import(ImportDecl),
    Function(FunctionDecl),
    Struct(StructDecl),
    ErrGroup(ErrGroupDecl),
    Var(VarDecl),
    Test(TestDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Module(d) => d.span,
            Decl::Import(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Struct(d) => d.span,
            Decl::ErrGroup(d) => d.span,
            Decl::Var(d) => d.span,
            Decl::Test(d) => d.span,
        }
    }

    /// Name the declaration introduces, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Decl::Module(d) => Some(&d.name),
            Decl::Import(d) => Some(d.binding()),
            Decl::Function(d) => Some(&d.name),
            Decl::Struct(d) => Some(&d.name),
            Decl::ErrGroup(d) => Some(&d.name),
            Decl::Var(d) => Some(&d.name),
            Decl::Test(_) => None,
        }
    }
}

/// `module A;` — `module A::B;` parses into nested module declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: String,
    pub decls: Vec<Decl>,
    pub span: Span,
}

/// `import A::B::C [as D];`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: Vec<String>,
    pub alias: Option<String>,
    pub span: Span,
}

impl ImportDecl {
    /// The identifier the import binds in scope.
    pub fn binding(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| self.path.last().expect("import with empty path"))
    }

    pub fn module_id(&self) -> String {
        self.path.join("::")
    }
}

/// `[pub] [extern] fn name[.struct][<T,..>](params) -> type { .. }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    /// Owning struct identifier for member functions (`fn Vec.push`).
    pub struct_name: Option<String>,
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeExpr,
    /// `None` for extern functions.
    pub body: Option<Block>,
    pub is_extern: bool,
    pub is_public: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericParam {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub is_vararg: bool,
    pub span: Span,
}

/// `[pub] struct Name[<T,..>] { field: type, .. }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub generic_params: Vec<GenericParam>,
    pub fields: Vec<FieldDecl>,
    pub is_public: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `err Name { A, B, }`
#[derive(Debug, Clone, PartialEq)]
pub struct ErrGroupDecl {
    pub name: String,
    pub errors: Vec<ErrDecl>,
    pub is_public: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrDecl {
    pub name: String,
    pub span: Span,
}

/// `[pub] let|const name[: type] [= expr];`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub is_mutable: bool,
    pub is_public: bool,
    pub span: Span,
}

/// `test "name" { .. }` — body may return errors (implicit `void?`).
#[derive(Debug, Clone, PartialEq)]
pub struct TestDecl {
    pub name: String,
    pub body: Block,
    pub span: Span,
}
