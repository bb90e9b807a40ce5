//! Token definitions for the DMZ language.

use std::fmt;

/// A lexed token kind, possibly carrying literal data.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Identifiers and literals
    Ident(String),
    IntLit(i64),
    FloatLit(f64),
    CharLit(u8),
    StrLit(String),

    // Numeric type keywords
    TyI(u32),
    TyU(u32),
    TyF(u32),

    // Keywords
    KwFn,
    KwLet,
    KwConst,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwReturn,
    KwStruct,
    KwExtern,
    KwDefer,
    KwErrDefer,
    KwErr,
    KwCatch,
    KwTry,
    KwOrElse,
    KwModule,
    KwImport,
    KwAs,
    KwSwitch,
    KwCase,
    KwPub,
    KwTest,
    KwTrue,
    KwFalse,
    KwNull,
    KwSizeof,
    KwVoid,
    KwBool,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AmpAmp,
    PipePipe,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    EqualEqual,
    BangEqual,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Bang,
    Question,
    Amp,
    Pipe,
    At,
    ColonColon,
    Dot,
    DotDot,
    DotDotDot,
    ReturnArrow,
    SwitchArrow,

    // Delimiters
    BraceL,
    BraceR,
    ParenL,
    ParenR,
    BracketL,
    BracketR,
    Semicolon,
    Comma,
    Colon,

    Unknown(char),
    Eof,
}

impl TokenKind {
    /// Human-readable name used in "expected X" diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(_) => "identifier".into(),
            TokenKind::IntLit(_) => "integer literal".into(),
            TokenKind::FloatLit(_) => "float literal".into(),
            TokenKind::CharLit(_) => "char literal".into(),
            TokenKind::StrLit(_) => "string literal".into(),
            TokenKind::TyI(n) => format!("'i{n}'"),
            TokenKind::TyU(n) => format!("'u{n}'"),
            TokenKind::TyF(n) => format!("'f{n}'"),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            TokenKind::KwFn => "fn",
            TokenKind::KwLet => "let",
            TokenKind::KwConst => "const",
            TokenKind::KwIf => "if",
            TokenKind::KwElse => "else",
            TokenKind::KwWhile => "while",
            TokenKind::KwFor => "for",
            TokenKind::KwReturn => "return",
            TokenKind::KwStruct => "struct",
            TokenKind::KwExtern => "extern",
            TokenKind::KwDefer => "defer",
            TokenKind::KwErrDefer => "errdefer",
            TokenKind::KwErr => "err",
            TokenKind::KwCatch => "catch",
            TokenKind::KwTry => "try",
            TokenKind::KwOrElse => "orelse",
            TokenKind::KwModule => "module",
            TokenKind::KwImport => "import",
            TokenKind::KwAs => "as",
            TokenKind::KwSwitch => "switch",
            TokenKind::KwCase => "case",
            TokenKind::KwPub => "pub",
            TokenKind::KwTest => "test",
            TokenKind::KwTrue => "true",
            TokenKind::KwFalse => "false",
            TokenKind::KwNull => "null",
            TokenKind::KwSizeof => "sizeof",
            TokenKind::KwVoid => "void",
            TokenKind::KwBool => "bool",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::Bang => "!",
            TokenKind::Question => "?",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::At => "@",
            TokenKind::ColonColon => "::",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::DotDotDot => "...",
            TokenKind::ReturnArrow => "->",
            TokenKind::SwitchArrow => "=>",
            TokenKind::BraceL => "{",
            TokenKind::BraceR => "}",
            TokenKind::ParenL => "(",
            TokenKind::ParenR => ")",
            TokenKind::BracketL => "[",
            TokenKind::BracketR => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Unknown(_) => "<unknown>",
            TokenKind::Eof => "<eof>",
            _ => "<token>",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "id({s})"),
            TokenKind::IntLit(v) => write!(f, "int({v})"),
            TokenKind::FloatLit(v) => write!(f, "float({v})"),
            TokenKind::CharLit(c) => write!(f, "char({})", *c as char),
            TokenKind::StrLit(s) => write!(f, "string({s:?})"),
            TokenKind::TyI(n) => write!(f, "i{n}"),
            TokenKind::TyU(n) => write!(f, "u{n}"),
            TokenKind::TyF(n) => write!(f, "f{n}"),
            TokenKind::Unknown(c) => write!(f, "unknown({c})"),
            other => write!(f, "{}", other.text()),
        }
    }
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: crate::source::Span,
}
