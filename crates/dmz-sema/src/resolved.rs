//! The resolved tree.
//!
//! Ownership is strictly tree-shaped: declarations live in a flat arena on
//! [`ResolvedProgram`] and every back-reference (decl-ref targets, struct
//! owners, parents, defer snapshots) is an index into that arena or into
//! the enclosing function's defer table.

use crate::ty::Ty;
use dmz_parser::ast::{BinaryOp, UnaryOp};
use dmz_parser::source::Span;

/// Index of a declaration in [`ResolvedProgram::decls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

/// Index of a defer block in the enclosing function's defer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferId(pub u32);

#[derive(Debug, Default)]
pub struct ResolvedProgram {
    pub decls: Vec<ResolvedDecl>,
    /// Top-level declarations in source order.
    pub roots: Vec<DeclId>,
}

impl ResolvedProgram {
    pub fn decl(&self, id: DeclId) -> &ResolvedDecl {
        &self.decls[id.0 as usize]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut ResolvedDecl {
        &mut self.decls[id.0 as usize]
    }

    pub fn add_decl(&mut self, decl: ResolvedDecl) -> DeclId {
        self.decls.push(decl);
        DeclId(self.decls.len() as u32 - 1)
    }

    pub fn function(&self, id: DeclId) -> &FunctionData {
        match &self.decl(id).kind {
            DeclKind::Function(f) => f,
            _ => unreachable!("declaration {id:?} is not a function"),
        }
    }

    pub fn function_mut(&mut self, id: DeclId) -> &mut FunctionData {
        match &mut self.decl_mut(id).kind {
            DeclKind::Function(f) => f,
            _ => unreachable!("declaration {id:?} is not a function"),
        }
    }

    pub fn strukt(&self, id: DeclId) -> &StructData {
        match &self.decl(id).kind {
            DeclKind::Struct(s) => s,
            _ => unreachable!("declaration {id:?} is not a struct"),
        }
    }

    pub fn strukt_mut(&mut self, id: DeclId) -> &mut StructData {
        match &mut self.decl_mut(id).kind {
            DeclKind::Struct(s) => s,
            _ => unreachable!("declaration {id:?} is not a struct"),
        }
    }

    /// The function type of a function declaration.
    pub fn fn_ty(&self, id: DeclId) -> Ty {
        let f = self.function(id);
        let params = f
            .params
            .iter()
            .filter(|p| !self.param(**p).2)
            .map(|p| self.param(*p).0.clone())
            .collect();
        Ty::Function {
            params,
            ret: Box::new(f.ret.clone()),
        }
    }

    /// `(ty, by_ref, is_vararg)` of a parameter declaration.
    pub fn param(&self, id: DeclId) -> (&Ty, bool, bool) {
        match &self.decl(id).kind {
            DeclKind::Param {
                ty,
                by_ref,
                is_vararg,
            } => (ty, *by_ref, *is_vararg),
            _ => unreachable!("declaration {id:?} is not a parameter"),
        }
    }

    /// Walks `parent` links to the enclosing module, if any.
    pub fn enclosing_module(&self, mut id: DeclId) -> Option<DeclId> {
        while let Some(parent) = self.decl(id).parent {
            if matches!(self.decl(parent).kind, DeclKind::Module { .. }) {
                return Some(parent);
            }
            id = parent;
        }
        None
    }
}

#[derive(Debug)]
pub struct ResolvedDecl {
    pub name: String,
    /// Mangled name: enclosing module identifiers joined with `.`; `main`
    /// becomes `__builtin_main`; specializations append their arguments.
    pub symbol: String,
    pub span: Span,
    pub is_public: bool,
    /// Enclosing module or struct; non-owning back-reference.
    pub parent: Option<DeclId>,
    pub kind: DeclKind,
}

#[derive(Debug)]
pub enum DeclKind {
    Module {
        decls: Vec<DeclId>,
    },
    Function(FunctionData),
    Struct(StructData),
    Field {
        ty: Ty,
        index: u32,
    },
    Param {
        ty: Ty,
        by_ref: bool,
        is_vararg: bool,
    },
    Var {
        ty: Ty,
        mutable: bool,
        init: Option<ResolvedExpr>,
    },
    /// `for`-loop capture. `indirect` captures (slice iterators) hold the
    /// current element pointer in their slot.
    Capture {
        ty: Ty,
        indirect: bool,
    },
    ErrGroup {
        errors: Vec<DeclId>,
    },
    /// An error constant; the symbol doubles as the interned tag.
    Err,
    GenericParam {
        bound: Option<Ty>,
    },
    Import {
        module: DeclId,
    },
}

#[derive(Debug)]
pub struct FunctionData {
    pub ret: Ty,
    pub params: Vec<DeclId>,
    /// `None` for extern functions and generic templates.
    pub body: Option<ResolvedBlock>,
    pub is_extern: bool,
    pub is_test: bool,
    /// Owning struct for member functions.
    pub owner: Option<DeclId>,
    pub generic_params: Vec<DeclId>,
    /// Specializations keyed by their concrete type-argument tuple.
    pub specializations: Vec<(Vec<Ty>, DeclId)>,
    /// All defer blocks registered in this function, in registration order.
    pub defers: Vec<DeferBlock>,
}

impl FunctionData {
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

#[derive(Debug)]
pub struct StructData {
    pub fields: Vec<DeclId>,
    pub methods: Vec<DeclId>,
    pub generic_params: Vec<DeclId>,
    pub specializations: Vec<(Vec<Ty>, DeclId)>,
}

impl StructData {
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

#[derive(Debug)]
pub struct DeferBlock {
    pub block: ResolvedBlock,
    pub is_errdefer: bool,
    pub span: Span,
}

#[derive(Debug)]
pub struct ResolvedBlock {
    pub stmts: Vec<ResolvedStmt>,
    /// This block's own (non-err) defers, in reverse registration order;
    /// emitted when the block falls off its end. Return statements carry
    /// the full transitive snapshot instead.
    pub defers: Vec<DeferId>,
    pub span: Span,
}

#[derive(Debug)]
pub enum ResolvedStmt {
    Expr(ResolvedExpr),
    Block(ResolvedBlock),
    If {
        cond: ResolvedExpr,
        then_block: ResolvedBlock,
        else_block: Option<ResolvedBlock>,
        span: Span,
    },
    While {
        cond: ResolvedExpr,
        body: ResolvedBlock,
        span: Span,
    },
    For {
        iters: Vec<ResolvedExpr>,
        captures: Vec<DeclId>,
        body: ResolvedBlock,
        span: Span,
    },
    Switch {
        cond: ResolvedExpr,
        cases: Vec<ResolvedCase>,
        else_block: ResolvedBlock,
        span: Span,
    },
    Return {
        value: Option<ResolvedExpr>,
        /// Snapshot of visible defers (reverse registration order),
        /// errdefers included only on error returns.
        defers: Vec<DeferId>,
        span: Span,
    },
    Decl {
        var: DeclId,
        span: Span,
    },
    Assign {
        target: ResolvedExpr,
        value: ResolvedExpr,
        span: Span,
    },
    /// Marker for where a defer was registered; carries no flow itself.
    Defer {
        id: DeferId,
        span: Span,
    },
}

impl ResolvedStmt {
    pub fn span(&self) -> Span {
        match self {
            ResolvedStmt::Expr(e) => e.span,
            ResolvedStmt::Block(b) => b.span,
            ResolvedStmt::If { span, .. }
            | ResolvedStmt::While { span, .. }
            | ResolvedStmt::For { span, .. }
            | ResolvedStmt::Switch { span, .. }
            | ResolvedStmt::Return { span, .. }
            | ResolvedStmt::Decl { span, .. }
            | ResolvedStmt::Assign { span, .. }
            | ResolvedStmt::Defer { span, .. } => *span,
        }
    }
}

#[derive(Debug)]
pub struct ResolvedCase {
    pub cond: ResolvedExpr,
    pub block: ResolvedBlock,
    pub span: Span,
}

#[derive(Debug)]
pub struct ResolvedFieldInit {
    pub field: DeclId,
    pub value: ResolvedExpr,
    pub span: Span,
}

#[derive(Debug)]
pub struct ResolvedExpr {
    pub kind: ResolvedExprKind,
    pub ty: Ty,
    pub span: Span,
    /// Cached result of the constant evaluator.
    pub constant: Option<i64>,
}

impl ResolvedExpr {
    pub fn new(kind: ResolvedExprKind, ty: Ty, span: Span) -> Self {
        Self {
            kind,
            ty,
            span,
            constant: None,
        }
    }
}

#[derive(Debug)]
pub enum ResolvedExprKind {
    IntLit(i64),
    FloatLit(f64),
    CharLit(u8),
    BoolLit(bool),
    StrLit(String),
    NullLit,
    DeclRef(DeclId),
    Member {
        base: Box<ResolvedExpr>,
        member: DeclId,
    },
    ArrayAt {
        array: Box<ResolvedExpr>,
        index: Box<ResolvedExpr>,
    },
    ArrayInit(Vec<ResolvedExpr>),
    StructInit {
        strukt: DeclId,
        fields: Vec<ResolvedFieldInit>,
    },
    Group(Box<ResolvedExpr>),
    Unary {
        op: UnaryOp,
        operand: Box<ResolvedExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ResolvedExpr>,
        rhs: Box<ResolvedExpr>,
    },
    Ref(Box<ResolvedExpr>),
    Deref(Box<ResolvedExpr>),
    Call {
        callee: Box<ResolvedExpr>,
        args: Vec<ResolvedExpr>,
    },
    Sizeof(Ty),
    Range {
        start: Box<ResolvedExpr>,
        end: Box<ResolvedExpr>,
    },
    /// `@Name` — interned tag, no declaration.
    ErrorTag(String),
    /// Reference to a declared error constant.
    ErrRef(DeclId),
    Catch(Box<ResolvedExpr>),
    Try {
        inner: Box<ResolvedExpr>,
        defers: Vec<DeferId>,
    },
    OrElse {
        inner: Box<ResolvedExpr>,
        fallback: Box<ResolvedExpr>,
    },
    Unwrap {
        inner: Box<ResolvedExpr>,
        defers: Vec<DeferId>,
    },
    DefaultInit,
}

impl ResolvedExprKind {
    /// Whether this expression designates a storage location.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            ResolvedExprKind::DeclRef(_)
                | ResolvedExprKind::Member { .. }
                | ResolvedExprKind::ArrayAt { .. }
                | ResolvedExprKind::Deref(_)
        )
    }
}
