//! Module, function and block containers.

use super::instr::{Attr, Instr, Terminator};
use super::ty::IrType;

#[derive(Debug)]
pub struct IrModule {
    pub source_name: String,
    /// Named struct types: created opaque in a first pass, bodied in a
    /// second pass so self-referential fields resolve.
    pub structs: Vec<(String, Option<Vec<IrType>>)>,
    pub globals: Vec<IrGlobal>,
    pub functions: Vec<IrFunction>,
}

/// A global string constant (error tags, format strings).
#[derive(Debug)]
pub struct IrGlobal {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl IrModule {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            structs: Vec::new(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn declare_struct(&mut self, name: &str) {
        if !self.structs.iter().any(|(n, _)| n == name) {
            self.structs.push((name.to_string(), None));
        }
    }

    pub fn define_struct(&mut self, name: &str, body: Vec<IrType>) {
        match self.structs.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = Some(body),
            None => self.structs.push((name.to_string(), Some(body))),
        }
    }

    pub fn has_struct(&self, name: &str) -> bool {
        self.structs.iter().any(|(n, _)| n == name)
    }

    /// Interns a NUL-terminated string constant, returning its name.
    pub fn global_string(&mut self, prefix: &str, text: &str) -> String {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);

        if let Some(existing) = self
            .globals
            .iter()
            .find(|g| g.bytes == bytes && g.name.starts_with(prefix))
        {
            return existing.name.clone();
        }
        let name = format!("{prefix}.{}", self.globals.len());
        self.globals.push(IrGlobal {
            name: name.clone(),
            bytes,
        });
        name
    }

    /// Adds a global string under an exact name (error tags).
    pub fn named_global_string(&mut self, name: &str, text: &str) {
        if self.globals.iter().any(|g| g.name == name) {
            return;
        }
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.globals.push(IrGlobal {
            name: name.to_string(),
            bytes,
        });
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }
}

#[derive(Debug)]
pub struct IrParam {
    pub name: String,
    pub ty: IrType,
    pub attrs: Vec<Attr>,
}

#[derive(Debug)]
pub struct IrFunction {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<IrParam>,
    pub vararg: bool,
    /// Empty for declarations.
    pub blocks: Vec<IrBlock>,
}

impl IrFunction {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The function type used at call sites.
    pub fn fn_ty(&self) -> IrType {
        IrType::Function {
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.ret.clone()),
            vararg: self.vararg,
        }
    }
}

#[derive(Debug)]
pub struct IrBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub term: Option<Terminator>,
}
