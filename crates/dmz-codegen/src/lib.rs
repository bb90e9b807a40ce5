//! IR lowering for DMZ.
//!
//! Lowers the resolved tree into a typed SSA module and prints it in the
//! LLVM-style text form the external backend consumes.

pub mod ir;
pub mod layout;
pub mod lower;

pub use ir::module::IrModule;
pub use lower::Codegen;
