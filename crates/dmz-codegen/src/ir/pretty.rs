//! Text emission of the SSA module.
//!
//! Output is deterministic: structs, globals and functions print in
//! creation order, so compiling the same program twice yields identical
//! text.

use super::instr::{Instr, Terminator};
use super::module::{IrFunction, IrGlobal, IrModule};
use super::ty::{format_struct_name, IrType};
use std::fmt;

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '<translation_unit>'")?;
        writeln!(f, "source_filename = \"{}\"", self.source_name)?;
        writeln!(f)?;

        for (name, body) in &self.structs {
            match body {
                Some(fields) => {
                    let fields: Vec<String> = fields.iter().map(|t| t.to_string()).collect();
                    writeln!(
                        f,
                        "{} = type {{ {} }}",
                        format_struct_name(name),
                        fields.join(", ")
                    )?;
                }
                None => writeln!(f, "{} = type opaque", format_struct_name(name))?,
            }
        }
        if !self.structs.is_empty() {
            writeln!(f)?;
        }

        for global in &self.globals {
            write_global(f, global)?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
        }

        writeln!(f, "declare void @llvm.memset.p0.i64(ptr, i8, i64, i1)")?;
        writeln!(f, "declare void @llvm.memcpy.p0.p0.i64(ptr, ptr, i64, i1)")?;
        writeln!(f, "declare void @llvm.trap()")?;
        writeln!(f)?;

        for function in &self.functions {
            write_function(f, function)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_global(f: &mut fmt::Formatter<'_>, global: &IrGlobal) -> fmt::Result {
    let mut text = String::new();
    for byte in &global.bytes {
        match byte {
            b' '..=b'~' if *byte != b'"' && *byte != b'\\' => text.push(*byte as char),
            _ => text.push_str(&format!("\\{byte:02X}")),
        }
    }
    writeln!(
        f,
        "@{} = private constant [{} x i8] c\"{}\"",
        quote_symbol(&global.name),
        global.bytes.len(),
        text
    )
}

fn quote_symbol(name: &str) -> String {
    let bare = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
    if bare {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, function: &IrFunction) -> fmt::Result {
    let params: Vec<String> = function
        .params
        .iter()
        .map(|p| {
            let attrs: String = p
                .attrs
                .iter()
                .map(|a| format!(" {a}"))
                .collect::<Vec<_>>()
                .join("");
            if function.is_declaration() {
                format!("{}{attrs}", p.ty)
            } else {
                format!("{}{attrs} %{}", p.ty, p.name)
            }
        })
        .collect();
    let mut params = params.join(", ");
    if function.vararg {
        if !params.is_empty() {
            params.push_str(", ");
        }
        params.push_str("...");
    }

    if function.is_declaration() {
        return writeln!(
            f,
            "declare {} @{}({})",
            function.ret,
            quote_symbol(&function.name),
            params
        );
    }

    writeln!(
        f,
        "define {} @{}({}) {{",
        function.ret,
        quote_symbol(&function.name),
        params
    )?;
    for block in &function.blocks {
        writeln!(f, "{}:", block.label)?;
        for instr in &block.instrs {
            write_instr(f, function, instr)?;
        }
        if let Some(term) = &block.term {
            write_terminator(f, function, term)?;
        }
    }
    writeln!(f, "}}")
}

fn label(function: &IrFunction, block: usize) -> &str {
    &function.blocks[block].label
}

fn write_instr(f: &mut fmt::Formatter<'_>, function: &IrFunction, instr: &Instr) -> fmt::Result {
    match instr {
        Instr::Alloca { dest, ty } => writeln!(f, "  {dest} = alloca {ty}"),
        Instr::Memset { ptr, bytes } => writeln!(
            f,
            "  call void @llvm.memset.p0.i64(ptr {ptr}, i8 0, i64 {bytes}, i1 false)"
        ),
        Instr::Memcpy { dest, src, bytes } => writeln!(
            f,
            "  call void @llvm.memcpy.p0.p0.i64(ptr {dest}, ptr {src}, i64 {bytes}, i1 false)"
        ),
        Instr::Store { ty, value, ptr } => writeln!(f, "  store {ty} {value}, ptr {ptr}"),
        Instr::Load { dest, ty, ptr } => writeln!(f, "  {dest} = load {ty}, ptr {ptr}"),
        Instr::Bin {
            dest,
            op,
            ty,
            lhs,
            rhs,
        } => writeln!(f, "  {dest} = {op} {ty} {lhs}, {rhs}"),
        Instr::Cmp {
            dest,
            float,
            cond,
            ty,
            lhs,
            rhs,
        } => {
            let kind = if *float { "fcmp" } else { "icmp" };
            writeln!(f, "  {dest} = {kind} {cond} {ty} {lhs}, {rhs}")
        }
        Instr::Cast {
            dest,
            op,
            from,
            value,
            to,
        } => writeln!(f, "  {dest} = {op} {from} {value} to {to}"),
        Instr::Gep {
            dest,
            base_ty,
            base,
            indices,
        } => {
            write!(f, "  {dest} = getelementptr inbounds {base_ty}, ptr {base}")?;
            for (ty, value) in indices {
                write!(f, ", {ty} {value}")?;
            }
            writeln!(f)
        }
        Instr::Call {
            dest,
            fn_ty,
            callee,
            args,
        } => {
            write!(f, "  ")?;
            if let Some(dest) = dest {
                write!(f, "{dest} = ")?;
            }
            // Vararg calls spell out the full function type.
            let printed_ty = match fn_ty {
                IrType::Function { vararg: true, .. } => fn_ty.to_string(),
                IrType::Function { ret, .. } => ret.to_string(),
                other => other.to_string(),
            };
            write!(f, "call {printed_ty} {callee}(")?;
            for (i, (ty, value, attr)) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                match attr {
                    Some(attr) => write!(f, "{ty} {attr} {value}")?,
                    None => write!(f, "{ty} {value}")?,
                }
            }
            writeln!(f, ")")
        }
        Instr::Phi {
            dest,
            ty,
            incomings,
        } => {
            write!(f, "  {dest} = phi {ty} ")?;
            for (i, (value, block)) in incomings.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "[ {value}, %{} ]", label(function, *block))?;
            }
            writeln!(f)
        }
        Instr::Trap => writeln!(f, "  call void @llvm.trap()"),
    }
}

fn write_terminator(
    f: &mut fmt::Formatter<'_>,
    function: &IrFunction,
    term: &Terminator,
) -> fmt::Result {
    match term {
        Terminator::Br(target) => writeln!(f, "  br label %{}", label(function, *target)),
        Terminator::CondBr {
            cond,
            then_block,
            else_block,
        } => writeln!(
            f,
            "  br i1 {cond}, label %{}, label %{}",
            label(function, *then_block),
            label(function, *else_block)
        ),
        Terminator::Switch {
            ty,
            value,
            default,
            cases,
        } => {
            writeln!(
                f,
                "  switch {ty} {value}, label %{} [",
                label(function, *default)
            )?;
            for (case_value, target) in cases {
                writeln!(f, "    {ty} {case_value}, label %{}", label(function, *target))?;
            }
            writeln!(f, "  ]")
        }
        Terminator::Ret { ty, value } => match value {
            Some(value) => writeln!(f, "  ret {ty} {value}"),
            None => writeln!(f, "  ret void"),
        },
        Terminator::Unreachable => writeln!(f, "  unreachable"),
    }
}
