//! SSA values.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Named local (parameters, allocas): `%name`.
    Local(String),
    /// Numbered temporary: `%tN`.
    Temp(u32),
    IntConst { bits: u32, value: i64 },
    FloatConst(f64),
    /// Module-level symbol: `@name`.
    Global(String),
    Null,
    Undef,
}

impl Value {
    pub fn int(bits: u32, value: i64) -> Value {
        Value::IntConst { bits, value }
    }

    pub fn bool(value: bool) -> Value {
        Value::IntConst {
            bits: 1,
            value: value as i64,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(name) => write!(f, "%{name}"),
            Value::Temp(n) => write!(f, "%t{n}"),
            Value::IntConst { value, .. } => write!(f, "{value}"),
            Value::FloatConst(value) => {
                // Debug formatting always keeps a '.' or exponent, which
                // the backend's float parser requires.
                write!(f, "{value:?}")
            }
            Value::Global(name) => {
                let bare = name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
                if bare {
                    write!(f, "@{name}")
                } else {
                    write!(f, "@\"{name}\"")
                }
            }
            Value::Null => write!(f, "null"),
            Value::Undef => write!(f, "undef"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_values() {
        assert_eq!(Value::Local("retval".into()).to_string(), "%retval");
        assert_eq!(Value::Temp(3).to_string(), "%t3");
        assert_eq!(Value::int(32, 42).to_string(), "42");
        assert_eq!(Value::FloatConst(1.5).to_string(), "1.5");
        assert_eq!(Value::Global("err.str.SUCCESS".into()).to_string(), "@err.str.SUCCESS");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
