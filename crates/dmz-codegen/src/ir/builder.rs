//! Function construction with an insertion point.
//!
//! Stack allocations and their zero fills are staged separately and
//! spliced at the top of the entry block when the function is finished,
//! mirroring the two entry-block insertion points of the lowering design.

use super::instr::{Instr, Terminator};
use super::module::{IrBlock, IrFunction, IrParam};
use super::ty::IrType;
use super::value::Value;
use rustc_hash::FxHashSet;

pub struct FunctionBuilder {
    pub f: IrFunction,
    current: Option<usize>,
    allocas: Vec<Instr>,
    memsets: Vec<Instr>,
    names: FxHashSet<String>,
    next_temp: u32,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, ret: IrType, params: Vec<IrParam>, vararg: bool) -> Self {
        let mut names = FxHashSet::default();
        for param in &params {
            names.insert(param.name.clone());
        }
        let mut builder = Self {
            f: IrFunction {
                name: name.into(),
                ret,
                params,
                vararg,
                blocks: Vec::new(),
            },
            current: None,
            allocas: Vec::new(),
            memsets: Vec::new(),
            names,
            next_temp: 0,
        };
        let entry = builder.append_block("entry");
        builder.position_at(entry);
        builder
    }

    pub fn append_block(&mut self, label: &str) -> usize {
        let label = self.unique_name(label);
        self.f.blocks.push(IrBlock {
            label,
            instrs: Vec::new(),
            term: None,
        });
        self.f.blocks.len() - 1
    }

    fn unique_name(&mut self, base: &str) -> String {
        if self.names.insert(base.to_string()) {
            return base.to_string();
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{base}{counter}");
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn position_at(&mut self, block: usize) {
        self.current = Some(block);
    }

    pub fn clear_insert_point(&mut self) {
        self.current = None;
    }

    pub fn has_insert_point(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_block(&self) -> usize {
        self.current.expect("no insertion point")
    }

    pub fn temp(&mut self) -> Value {
        let value = Value::Temp(self.next_temp);
        self.next_temp += 1;
        value
    }

    pub fn local(&mut self, base: &str) -> Value {
        Value::Local(self.unique_name(base))
    }

    pub fn push(&mut self, instr: Instr) {
        let block = self.current.expect("instruction emitted without insertion point");
        debug_assert!(self.f.blocks[block].term.is_none());
        self.f.blocks[block].instrs.push(instr);
    }

    pub fn terminate(&mut self, term: Terminator) {
        let block = self.current.expect("terminator emitted without insertion point");
        debug_assert!(self.f.blocks[block].term.is_none());
        self.f.blocks[block].term = Some(term);
        self.current = None;
    }

    /// Branches to `target` unless the current block already terminated,
    /// then clears the insertion point.
    pub fn branch_to(&mut self, target: usize) {
        if let Some(block) = self.current {
            if self.f.blocks[block].term.is_none() {
                self.f.blocks[block].term = Some(Terminator::Br(target));
            }
        }
        self.current = None;
    }

    /// Blocks whose terminator targets `target`; used to wire phis.
    pub fn predecessors(&self, target: usize) -> Vec<usize> {
        let mut preds = Vec::new();
        for (idx, block) in self.f.blocks.iter().enumerate() {
            let hits = match &block.term {
                Some(Terminator::Br(t)) => *t == target,
                Some(Terminator::CondBr {
                    then_block,
                    else_block,
                    ..
                }) => *then_block == target || *else_block == target,
                Some(Terminator::Switch { default, cases, .. }) => {
                    *default == target || cases.iter().any(|(_, t)| *t == target)
                }
                _ => false,
            };
            if hits {
                preds.push(idx);
            }
        }
        preds
    }

    /// Stages a stack slot plus its entry-block zero fill.
    pub fn alloc_stack(&mut self, name: &str, ty: IrType, bytes: u64) -> Value {
        let dest = self.local(name);
        self.allocas.push(Instr::Alloca {
            dest: dest.clone(),
            ty,
        });
        self.memsets.push(Instr::Memset {
            ptr: dest.clone(),
            bytes,
        });
        dest
    }

    pub fn finish(mut self) -> IrFunction {
        let mut prelude = std::mem::take(&mut self.allocas);
        prelude.append(&mut self.memsets);
        let entry = &mut self.f.blocks[0];
        prelude.append(&mut entry.instrs);
        entry.instrs = prelude;

        // Dangling blocks (both arms returned before a join) stay valid.
        for block in &mut self.f.blocks {
            if block.term.is_none() {
                block.term = Some(Terminator::Unreachable);
            }
        }
        self.f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocas_splice_before_entry_code() {
        let mut b = FunctionBuilder::new("f", IrType::Void, Vec::new(), false);
        b.push(Instr::Trap);
        let slot = b.alloc_stack("x", IrType::Int(32), 4);
        b.terminate(Terminator::Ret {
            ty: IrType::Void,
            value: None,
        });

        let f = b.finish();
        assert!(matches!(f.blocks[0].instrs[0], Instr::Alloca { .. }));
        assert!(matches!(f.blocks[0].instrs[1], Instr::Memset { .. }));
        assert!(matches!(f.blocks[0].instrs[2], Instr::Trap));
        assert_eq!(slot, Value::Local("x".into()));
    }

    #[test]
    fn labels_are_uniqued() {
        let mut b = FunctionBuilder::new("f", IrType::Void, Vec::new(), false);
        let a = b.append_block("if.true");
        let c = b.append_block("if.true");
        assert_eq!(b.f.blocks[a].label, "if.true");
        assert_eq!(b.f.blocks[c].label, "if.true1");
    }
}
