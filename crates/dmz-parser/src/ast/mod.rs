//! Untyped AST produced by the parser.
//!
//! One enum per node family (declarations, statements, expressions,
//! syntactic types), with one struct per variant carrying its span.

mod decl;
mod dump;
mod expr;
mod stmt;
mod types;

pub use decl::*;
pub use dump::dump_decls;
pub use expr::*;
pub use stmt::*;
pub use types::*;
