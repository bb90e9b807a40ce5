//! Recursive-descent parser for DMZ.
//!
//! The parser owns a pre-lexed token vector with one-token lookahead. On a
//! parse error it reports a diagnostic, marks the AST incomplete and
//! resynchronizes, so one run can surface many errors.

pub mod decl;
pub mod expr;
pub mod recovery;
pub mod stmt;
pub mod types;

use crate::ast::Decl;
use crate::diag::DiagnosticEngine;
use crate::source::Span;
use crate::token::{Token, TokenKind};

/// Restriction flags modulating primary-expression parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Restrictions {
    /// Inside `if`/`while`/`switch`/`for` conditions: `ident {` is not a
    /// struct instantiation.
    pub struct_not_allowed: bool,
    /// Inside `defer`/`errdefer` bodies.
    pub return_not_allowed: bool,
}

impl Restrictions {
    pub const STRUCT_NOT_ALLOWED: Restrictions = Restrictions {
        struct_not_allowed: true,
        return_not_allowed: false,
    };
    pub const RETURN_NOT_ALLOWED: Restrictions = Restrictions {
        struct_not_allowed: false,
        return_not_allowed: true,
    };
}

pub struct Parser<'d> {
    tokens: Vec<Token>,
    pos: usize,
    restrictions: Restrictions,
    incomplete: bool,
    diags: &'d mut DiagnosticEngine,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diags: &'d mut DiagnosticEngine) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            pos: 0,
            restrictions: Restrictions::default(),
            incomplete: false,
            diags,
        }
    }

    /// Parses the whole file. Returns the declarations and a success flag:
    /// the AST is complete and (when `expect_main`) a `main` was found.
    pub fn parse_source_file(mut self, expect_main: bool) -> (Vec<Decl>, bool) {
        let decls = decl::parse_top_level_decls(&mut self);

        let has_main = decls
            .iter()
            .any(|d| matches!(d, Decl::Function(f) if f.name == "main" && f.struct_name.is_none()));

        if expect_main && !has_main && !self.incomplete {
            let span = self.current_span();
            self.error(span, "main function not found");
        }

        let ok = !self.incomplete && (has_main || !expect_main);
        (decls, ok)
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    pub fn current(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    #[inline]
    pub fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    /// Advances past the current token and returns it.
    pub fn eat(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    #[inline]
    pub fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(kind)
    }

    #[inline]
    pub fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|k| self.at(k))
    }

    #[inline]
    pub fn at_eof(&self) -> bool {
        matches!(self.current(), TokenKind::Eof)
    }

    /// Consumes the current token if it matches, otherwise reports `msg`.
    pub fn expect(&mut self, kind: &TokenKind, msg: &str) -> Option<Token> {
        if self.at(kind) {
            Some(self.eat())
        } else {
            self.report(self.current_span(), msg)
        }
    }

    pub fn expect_ident(&mut self, msg: &str) -> Option<(String, Span)> {
        let span = self.current_span();
        match self.current() {
            TokenKind::Ident(_) => {
                let tok = self.eat();
                match tok.kind {
                    TokenKind::Ident(name) => Some((name, span)),
                    _ => unreachable!(),
                }
            }
            _ => self.report(span, msg),
        }
    }

    // ========================================================================
    // Errors and restrictions
    // ========================================================================

    pub fn error(&mut self, span: Span, msg: impl Into<String>) {
        self.diags.error(span, msg);
    }

    /// Reports an error and yields `None` so callers can propagate.
    pub fn report<T>(&mut self, span: Span, msg: impl Into<String>) -> Option<T> {
        self.diags.error(span, msg);
        None
    }

    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    pub fn restrictions(&self) -> Restrictions {
        self.restrictions
    }

    /// Runs `f` with additional restrictions, restoring the mask after.
    pub fn with_restrictions<T>(
        &mut self,
        add: Restrictions,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let prev = self.restrictions;
        self.restrictions.struct_not_allowed |= add.struct_not_allowed;
        self.restrictions.return_not_allowed |= add.return_not_allowed;
        let result = f(self);
        self.restrictions = prev;
        result
    }

    /// Runs `f` with a cleared restriction mask (inside grouping parens).
    pub fn with_no_restrictions<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let prev = self.restrictions;
        self.restrictions = Restrictions::default();
        let result = f(self);
        self.restrictions = prev;
        result
    }

    // ========================================================================
    // List parsing
    // ========================================================================

    /// Parses `open (item (',' item)* ','?)? close`; shared by parameter,
    /// argument, generic, field, field-init, error, array-init and capture
    /// lists.
    pub fn parse_list<T>(
        &mut self,
        open: (&TokenKind, &str),
        close: (&TokenKind, &str),
        mut item: impl FnMut(&mut Self) -> Option<T>,
    ) -> Option<Vec<T>> {
        self.expect(open.0, open.1)?;

        let mut list = Vec::new();
        loop {
            if self.at(close.0) {
                break;
            }
            list.push(item(self)?);
            if !self.at(&TokenKind::Comma) {
                break;
            }
            self.eat();
        }

        self.expect(close.0, close.1)?;
        Some(list)
    }

    /// Lookahead for `'<' types '>'` followed by `then`, to tell generic
    /// argument lists apart from comparisons.
    pub fn generic_args_ahead(&self, then: &TokenKind) -> bool {
        if !matches!(self.current(), TokenKind::Less) {
            return false;
        }
        let mut depth = 0usize;
        for offset in 0..64 {
            match self.peek_kind(offset) {
                TokenKind::Less => depth += 1,
                TokenKind::Greater => {
                    depth -= 1;
                    if depth == 0 {
                        return std::mem::discriminant(self.peek_kind(offset + 1))
                            == std::mem::discriminant(then);
                    }
                }
                TokenKind::Ident(_)
                | TokenKind::TyI(_)
                | TokenKind::TyU(_)
                | TokenKind::TyF(_)
                | TokenKind::KwVoid
                | TokenKind::KwBool
                | TokenKind::Star
                | TokenKind::Question
                | TokenKind::Amp
                | TokenKind::BracketL
                | TokenKind::BracketR
                | TokenKind::IntLit(_)
                | TokenKind::Comma => {}
                _ => return false,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::source::FileId;

    fn parser_for<'d>(source: &str, diags: &'d mut DiagnosticEngine) -> Parser<'d> {
        let (tokens, errors) = Lexer::new(source, FileId(0)).tokenize();
        assert!(errors.is_empty());
        Parser::new(tokens, diags)
    }

    #[test]
    fn reports_missing_main() {
        let mut diags = DiagnosticEngine::new();
        let parser = parser_for("fn util() -> void {}", &mut diags);
        let (decls, ok) = parser.parse_source_file(true);
        assert_eq!(decls.len(), 1);
        assert!(!ok);
        assert!(diags.has_errors());
    }

    #[test]
    fn empty_file_has_zero_decls() {
        let mut diags = DiagnosticEngine::new();
        let parser = parser_for("", &mut diags);
        let (decls, ok) = parser.parse_source_file(true);
        assert!(decls.is_empty());
        assert!(!ok);
    }

    #[test]
    fn module_unit_does_not_need_main() {
        let mut diags = DiagnosticEngine::new();
        let parser = parser_for("module util;\nfn helper() -> void {}", &mut diags);
        let (decls, ok) = parser.parse_source_file(false);
        assert_eq!(decls.len(), 1);
        assert!(ok);
        assert!(!diags.has_errors());
    }

    #[test]
    fn generic_lookahead_distinguishes_comparison() {
        let mut diags = DiagnosticEngine::new();
        let p = parser_for("<i32>(", &mut diags);
        assert!(p.generic_args_ahead(&TokenKind::ParenL));

        let mut diags = DiagnosticEngine::new();
        let p = parser_for("< b; foo(", &mut diags);
        assert!(!p.generic_args_ahead(&TokenKind::ParenL));
    }
}
