//! IR-level types.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    Void,
    Int(u32),
    Half,
    Float,
    Double,
    Ptr,
    /// Named struct type, printed `%struct.name`.
    Struct(String),
    /// Anonymous struct type, printed `{ a, b }`; used for slices.
    LiteralStruct(Vec<IrType>),
    Array {
        elem: Box<IrType>,
        len: u64,
    },
    Function {
        params: Vec<IrType>,
        ret: Box<IrType>,
        vararg: bool,
    },
}

impl IrType {
    pub fn slice() -> IrType {
        IrType::LiteralStruct(vec![IrType::Ptr, IrType::Int(64)])
    }
}

/// Struct names with characters outside LLVM's bare-identifier set
/// (specializations carry `<>`) print quoted.
pub(crate) fn format_struct_name(name: &str) -> String {
    let bare = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
    if bare {
        format!("%{name}")
    } else {
        format!("%\"{name}\"")
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{bits}"),
            IrType::Half => write!(f, "half"),
            IrType::Float => write!(f, "float"),
            IrType::Double => write!(f, "double"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Struct(name) => write!(f, "{}", format_struct_name(name)),
            IrType::LiteralStruct(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")
            }
            IrType::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            IrType::Function {
                params,
                ret,
                vararg,
            } => {
                write!(f, "{ret} (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                if *vararg {
                    if !params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_basic_types() {
        assert_eq!(IrType::Int(32).to_string(), "i32");
        assert_eq!(IrType::Double.to_string(), "double");
        assert_eq!(IrType::Ptr.to_string(), "ptr");
        assert_eq!(IrType::slice().to_string(), "{ ptr, i64 }");
        assert_eq!(
            IrType::Array {
                elem: Box::new(IrType::Int(8)),
                len: 4
            }
            .to_string(),
            "[4 x i8]"
        );
    }

    #[test]
    fn quotes_specialized_struct_names() {
        assert_eq!(
            IrType::Struct("struct.Vec<i32>".into()).to_string(),
            "%\"struct.Vec<i32>\""
        );
        assert_eq!(
            IrType::Struct("struct.Point".into()).to_string(),
            "%struct.Point"
        );
    }
}
