//! Semantic analysis for the DMZ language.
//!
//! Two-phase resolution over the parser's AST: the declaration pass builds
//! the resolved-tree skeleton, the body pass resolves statements and
//! expressions, specializes generics on demand, folds constants and runs
//! flow-sensitive checks over a per-function CFG.

pub mod cfg;
pub mod constexpr;
pub mod dump;
pub mod resolved;
pub mod resolver;
pub mod ty;

pub use resolved::{
    DeclId, DeclKind, DeferBlock, DeferId, FunctionData, ResolvedBlock, ResolvedCase,
    ResolvedDecl, ResolvedExpr, ResolvedExprKind, ResolvedFieldInit, ResolvedProgram,
    ResolvedStmt, StructData,
};
pub use resolver::Sema;
pub use ty::{NumberKind, Ty};
