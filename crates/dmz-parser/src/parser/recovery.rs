//! Error recovery: token-skipping strategies used after parse errors.

use super::Parser;
use crate::token::TokenKind;

/// Tokens that may legally start a top-level declaration.
pub const TOP_LEVEL_STARTERS: &[TokenKind] = &[
    TokenKind::KwFn,
    TokenKind::KwStruct,
    TokenKind::KwExtern,
    TokenKind::KwModule,
    TokenKind::KwImport,
    TokenKind::KwErr,
    TokenKind::KwTest,
    TokenKind::KwPub,
];

pub fn is_top_level_starter(kind: &TokenKind) -> bool {
    TOP_LEVEL_STARTERS
        .iter()
        .any(|k| std::mem::discriminant(k) == std::mem::discriminant(kind))
}

/// Consumes tokens until the next balanced `}`, a top-level `;`, or a
/// token that can start a top-level declaration.
pub fn synchronize(parser: &mut Parser) {
    parser.mark_incomplete();

    let mut braces = 0usize;
    loop {
        match parser.current() {
            TokenKind::Eof => break,
            TokenKind::BraceL => {
                braces += 1;
            }
            TokenKind::BraceR => {
                if braces == 0 {
                    break;
                }
                if braces == 1 {
                    parser.eat();
                    break;
                }
                braces -= 1;
            }
            TokenKind::Semicolon if braces == 0 => {
                parser.eat();
                break;
            }
            kind if is_top_level_starter(kind) => break,
            _ => {}
        }
        parser.eat();
    }
}

/// Consumes tokens until one of `kinds` (or EOF) is the current token.
pub fn synchronize_on(parser: &mut Parser, kinds: &[TokenKind]) {
    parser.mark_incomplete();
    while !parser.at_eof() && !parser.at_any(kinds) {
        parser.eat();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagnosticEngine;
    use crate::lexer::Lexer;
    use crate::source::FileId;

    #[test]
    fn synchronize_stops_at_top_level_keyword() {
        let mut diags = DiagnosticEngine::new();
        let (tokens, _) = Lexer::new("garbage tokens fn main", FileId(0)).tokenize();
        let mut parser = Parser::new(tokens, &mut diags);
        synchronize(&mut parser);
        assert!(parser.at(&TokenKind::KwFn));
    }

    #[test]
    fn synchronize_eats_balanced_braces() {
        let mut diags = DiagnosticEngine::new();
        let (tokens, _) = Lexer::new("{ nested { x } } let", FileId(0)).tokenize();
        let mut parser = Parser::new(tokens, &mut diags);
        synchronize(&mut parser);
        assert!(parser.at(&TokenKind::KwLet));
    }
}
