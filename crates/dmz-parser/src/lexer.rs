//! Lexer for the DMZ language, built on logos.
//!
//! The logos-derived enum does the raw tokenization; the [`Lexer`] wrapper
//! tracks line/column positions and converts into the parser-facing
//! [`Token`] type.

use crate::source::{FileId, Span};
use crate::token::{Token, TokenKind};
use logos::Logos;
use thiserror::Error;

#[derive(Logos, Debug, Clone, PartialEq)]
enum RawToken {
    // Whitespace and comments (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    // Keywords (must come before identifiers)
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("return")]
    Return,
    #[token("struct")]
    Struct,
    #[token("extern")]
    Extern,
    #[token("defer")]
    Defer,
    #[token("errdefer")]
    ErrDefer,
    #[token("err")]
    Err,
    #[token("catch")]
    Catch,
    #[token("try")]
    Try,
    #[token("orelse")]
    OrElse,
    #[token("module")]
    Module,
    #[token("import")]
    Import,
    #[token("as")]
    As,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("pub")]
    Pub,
    #[token("test")]
    Test,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("sizeof")]
    Sizeof,
    #[token("void")]
    Void,
    #[token("bool")]
    Bool,

    // Numeric type keywords; higher priority than identifiers
    #[regex(r"i[0-9]+", parse_int_bits, priority = 10)]
    TyI(u32),
    #[regex(r"u[0-9]+", parse_int_bits, priority = 10)]
    TyU(u32),
    #[regex(r"f(16|32|64)", parse_float_bits, priority = 10)]
    TyF(u32),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    FloatLit(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok(), priority = 5)]
    IntLit(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StrLit(String),

    #[regex(r"'([^'\\\n]|\\.)'", parse_char)]
    CharLit(u8),

    // Multi-character operators before their prefixes
    #[token("...")]
    DotDotDot,
    #[token("..")]
    DotDot,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("->")]
    ReturnArrow,
    #[token("=>")]
    SwitchArrow,
    #[token("::")]
    ColonColon,

    // Single-character tokens
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("@")]
    At,
    #[token(".")]
    Dot,
    #[token("{")]
    BraceL,
    #[token("}")]
    BraceR,
    #[token("(")]
    ParenL,
    #[token(")")]
    ParenR,
    #[token("[")]
    BracketL,
    #[token("]")]
    BracketR,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

fn parse_int_bits(lex: &mut logos::Lexer<RawToken>) -> Option<u32> {
    let bits: u32 = lex.slice()[1..].parse().ok()?;
    (1..=128).contains(&bits).then_some(bits)
}

fn parse_float_bits(lex: &mut logos::Lexer<RawToken>) -> Option<u32> {
    lex.slice()[1..].parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<RawToken>) -> Option<String> {
    let s = lex.slice();
    unescape(&s[1..s.len() - 1])
}

fn parse_char(lex: &mut logos::Lexer<RawToken>) -> Option<u8> {
    let s = lex.slice();
    let inner = unescape(&s[1..s.len() - 1])?;
    inner.bytes().next()
}

fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, span: Span },
    #[error("malformed literal '{text}'")]
    MalformedLiteral { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. } => *span,
            LexError::MalformedLiteral { span, .. } => *span,
        }
    }
}

/// Tokenizes a single source file.
pub struct Lexer<'a> {
    source: &'a str,
    file: FileId,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: FileId) -> Self {
        Self { source, file }
    }

    /// Produces the full token vector (EOF-terminated) plus any lex errors.
    pub fn tokenize(self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut lexer = RawToken::lexer(self.source);
        let mut line = 1u32;
        let mut col = 1u32;
        let mut last_end = 0usize;

        while let Some(result) = lexer.next() {
            let range = lexer.span();

            // Advance the position over whatever was skipped.
            for c in self.source[last_end..range.start].chars() {
                if c == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
            }

            let span = Span::new(self.file, line, col);
            match result {
                Ok(raw) => tokens.push(Token {
                    kind: convert(raw),
                    span,
                }),
                Err(()) => {
                    let ch = self.source[range.start..].chars().next().unwrap_or('\0');
                    errors.push(LexError::UnexpectedCharacter { ch, span });
                }
            }

            for c in self.source[range.start..range.end].chars() {
                if c == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
            }
            last_end = range.end;
        }

        for c in self.source[last_end..].chars() {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.file, line, col),
        });

        (tokens, errors)
    }
}

fn convert(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Fn => TokenKind::KwFn,
        RawToken::Let => TokenKind::KwLet,
        RawToken::Const => TokenKind::KwConst,
        RawToken::If => TokenKind::KwIf,
        RawToken::Else => TokenKind::KwElse,
        RawToken::While => TokenKind::KwWhile,
        RawToken::For => TokenKind::KwFor,
        RawToken::Return => TokenKind::KwReturn,
        RawToken::Struct => TokenKind::KwStruct,
        RawToken::Extern => TokenKind::KwExtern,
        RawToken::Defer => TokenKind::KwDefer,
        RawToken::ErrDefer => TokenKind::KwErrDefer,
        RawToken::Err => TokenKind::KwErr,
        RawToken::Catch => TokenKind::KwCatch,
        RawToken::Try => TokenKind::KwTry,
        RawToken::OrElse => TokenKind::KwOrElse,
        RawToken::Module => TokenKind::KwModule,
        RawToken::Import => TokenKind::KwImport,
        RawToken::As => TokenKind::KwAs,
        RawToken::Switch => TokenKind::KwSwitch,
        RawToken::Case => TokenKind::KwCase,
        RawToken::Pub => TokenKind::KwPub,
        RawToken::Test => TokenKind::KwTest,
        RawToken::True => TokenKind::KwTrue,
        RawToken::False => TokenKind::KwFalse,
        RawToken::Null => TokenKind::KwNull,
        RawToken::Sizeof => TokenKind::KwSizeof,
        RawToken::Void => TokenKind::KwVoid,
        RawToken::Bool => TokenKind::KwBool,
        RawToken::TyI(n) => TokenKind::TyI(n),
        RawToken::TyU(n) => TokenKind::TyU(n),
        RawToken::TyF(n) => TokenKind::TyF(n),
        RawToken::Ident(s) => TokenKind::Ident(s),
        RawToken::IntLit(v) => TokenKind::IntLit(v),
        RawToken::FloatLit(v) => TokenKind::FloatLit(v),
        RawToken::StrLit(s) => TokenKind::StrLit(s),
        RawToken::CharLit(c) => TokenKind::CharLit(c),
        RawToken::DotDotDot => TokenKind::DotDotDot,
        RawToken::DotDot => TokenKind::DotDot,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::LessEq => TokenKind::LessEq,
        RawToken::GreaterEq => TokenKind::GreaterEq,
        RawToken::EqualEqual => TokenKind::EqualEqual,
        RawToken::BangEqual => TokenKind::BangEqual,
        RawToken::PlusAssign => TokenKind::PlusAssign,
        RawToken::MinusAssign => TokenKind::MinusAssign,
        RawToken::StarAssign => TokenKind::StarAssign,
        RawToken::SlashAssign => TokenKind::SlashAssign,
        RawToken::ReturnArrow => TokenKind::ReturnArrow,
        RawToken::SwitchArrow => TokenKind::SwitchArrow,
        RawToken::ColonColon => TokenKind::ColonColon,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Less => TokenKind::Less,
        RawToken::Greater => TokenKind::Greater,
        RawToken::Assign => TokenKind::Assign,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Question => TokenKind::Question,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::At => TokenKind::At,
        RawToken::Dot => TokenKind::Dot,
        RawToken::BraceL => TokenKind::BraceL,
        RawToken::BraceR => TokenKind::BraceR,
        RawToken::ParenL => TokenKind::ParenL,
        RawToken::ParenR => TokenKind::ParenR,
        RawToken::BracketL => TokenKind::BracketL,
        RawToken::BracketR => TokenKind::BracketR,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Whitespace | RawToken::LineComment => {
            unreachable!("whitespace and comments are skipped")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source, FileId(0)).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_function_header() {
        let toks = kinds("fn add(a: i32) -> i32 {}");
        assert_eq!(
            toks,
            vec![
                TokenKind::KwFn,
                TokenKind::Ident("add".into()),
                TokenKind::ParenL,
                TokenKind::Ident("a".into()),
                TokenKind::Colon,
                TokenKind::TyI(32),
                TokenKind::ParenR,
                TokenKind::ReturnArrow,
                TokenKind::TyI(32),
                TokenKind::BraceL,
                TokenKind::BraceR,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numeric_type_keywords_beat_identifiers() {
        assert_eq!(kinds("u8")[0], TokenKind::TyU(8));
        assert_eq!(kinds("i1")[0], TokenKind::TyI(1));
        assert_eq!(kinds("f64")[0], TokenKind::TyF(64));
        assert_eq!(kinds("index")[0], TokenKind::Ident("index".into()));
    }

    #[test]
    fn lexes_ranges_and_varargs() {
        assert_eq!(
            &kinds("0..10")[0..3],
            &[
                TokenKind::IntLit(0),
                TokenKind::DotDot,
                TokenKind::IntLit(10)
            ]
        );
        assert_eq!(kinds("...")[0], TokenKind::DotDotDot);
    }

    #[test]
    fn lexes_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\t""#)[0],
            TokenKind::StrLit("a\n\t".to_string())
        );
        assert_eq!(kinds(r"'\n'")[0], TokenKind::CharLit(b'\n'));
    }

    #[test]
    fn tracks_line_and_column() {
        let (tokens, _) = Lexer::new("fn\n  main", FileId(0)).tokenize();
        assert_eq!((tokens[0].span.line, tokens[0].span.col), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.col), (2, 3));
    }

    #[test]
    fn reports_unknown_characters() {
        let (_, errors) = Lexer::new("let x = $;", FileId(0)).tokenize();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            LexError::UnexpectedCharacter { ch: '$', .. }
        ));
    }

    #[test]
    fn comments_are_skipped() {
        let toks = kinds("// a comment\nlet");
        assert_eq!(toks[0], TokenKind::KwLet);
    }
}
