//! The typed SSA module model.

pub mod builder;
pub mod instr;
pub mod module;
pub mod pretty;
pub mod ty;
pub mod value;

pub use builder::FunctionBuilder;
pub use instr::{Attr, Instr, Terminator};
pub use module::{IrBlock, IrFunction, IrGlobal, IrModule, IrParam};
pub use ty::IrType;
pub use value::Value;
