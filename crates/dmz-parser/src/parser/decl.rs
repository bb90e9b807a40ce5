//! Declaration parsing.

use super::recovery::{self, TOP_LEVEL_STARTERS};
use super::types::parse_type;
use super::{stmt, Parser};
use crate::ast::*;
use crate::token::TokenKind;

/// Parses declarations until EOF; used for the top level of a file.
pub fn parse_top_level_decls(parser: &mut Parser) -> Vec<Decl> {
    let mut decls = Vec::new();

    while !parser.at_eof() {
        if let Some(decl) = parse_top_level_decl(parser) {
            decls.push(decl);
        } else {
            recovery::synchronize_on(parser, TOP_LEVEL_STARTERS);
        }
    }

    decls
}

fn parse_top_level_decl(parser: &mut Parser) -> Option<Decl> {
    let is_public = if parser.at(&TokenKind::KwPub) {
        parser.eat();
        true
    } else {
        false
    };

    match parser.current() {
        TokenKind::KwModule => parse_module_decl(parser).map(Decl::Module),
        TokenKind::KwImport => parse_import_decl(parser).map(Decl::Import),
        TokenKind::KwFn | TokenKind::KwExtern => {
            parse_function_decl(parser, is_public).map(Decl::Function)
        }
        TokenKind::KwStruct => parse_struct_decl(parser, is_public).map(Decl::Struct),
        TokenKind::KwErr => parse_err_group_decl(parser, is_public).map(Decl::ErrGroup),
        TokenKind::KwLet | TokenKind::KwConst => {
            parse_module_var_decl(parser, is_public).map(Decl::Var)
        }
        TokenKind::KwTest => parse_test_decl(parser).map(Decl::Test),
        _ => {
            let span = parser.current_span();
            parser.report(
                span,
                "expected function, struct, err, module or import declaration on the top level",
            )
        }
    }
}

/// `module A::B::C;` nests the following declarations under `C`.
pub fn parse_module_decl(parser: &mut Parser) -> Option<ModuleDecl> {
    let span = parser.current_span();
    parser.expect(&TokenKind::KwModule, "expected 'module'")?;

    let mut path = Vec::new();
    let (first, _) = parser.expect_ident("expected identifier after 'module'")?;
    path.push(first);
    while parser.at(&TokenKind::ColonColon) {
        parser.eat();
        let (segment, _) = parser.expect_ident("expected identifier after '::'")?;
        path.push(segment);
    }

    parser.expect(
        &TokenKind::Semicolon,
        "expected ';' after module declaration",
    )?;

    let decls = parse_in_module_decls(parser);

    // Innermost module owns the declarations; outer segments nest it.
    let mut module = ModuleDecl {
        name: path.pop().expect("module path cannot be empty"),
        decls,
        span,
    };
    while let Some(name) = path.pop() {
        module = ModuleDecl {
            name,
            decls: vec![Decl::Module(module)],
            span,
        };
    }
    Some(module)
}

fn parse_in_module_decls(parser: &mut Parser) -> Vec<Decl> {
    let mut decls = Vec::new();

    while !parser.at_eof() && !parser.at(&TokenKind::KwModule) {
        let is_public = if parser.at(&TokenKind::KwPub) {
            parser.eat();
            true
        } else {
            false
        };

        let decl = match parser.current() {
            TokenKind::KwFn | TokenKind::KwExtern => {
                parse_function_decl(parser, is_public).map(Decl::Function)
            }
            TokenKind::KwStruct => parse_struct_decl(parser, is_public).map(Decl::Struct),
            TokenKind::KwErr => parse_err_group_decl(parser, is_public).map(Decl::ErrGroup),
            TokenKind::KwLet | TokenKind::KwConst => {
                parse_module_var_decl(parser, is_public).map(Decl::Var)
            }
            TokenKind::KwTest => parse_test_decl(parser).map(Decl::Test),
            _ => {
                let span = parser.current_span();
                parser.report(
                    span,
                    "expected function, struct, err or variable declaration inside a module",
                )
            }
        };

        match decl {
            Some(decl) => decls.push(decl),
            None => recovery::synchronize_on(parser, TOP_LEVEL_STARTERS),
        }
    }

    decls
}

/// `import A::B::C [as D];`
pub fn parse_import_decl(parser: &mut Parser) -> Option<ImportDecl> {
    let span = parser.current_span();
    parser.expect(&TokenKind::KwImport, "expected 'import'")?;

    let mut path = Vec::new();
    let (first, _) = parser.expect_ident("expected identifier after 'import'")?;
    path.push(first);
    while parser.at(&TokenKind::ColonColon) {
        parser.eat();
        let (segment, _) = parser.expect_ident("expected identifier after '::'")?;
        path.push(segment);
    }

    let alias = if parser.at(&TokenKind::KwAs) {
        parser.eat();
        let (alias, _) = parser.expect_ident("expected identifier after 'as'")?;
        Some(alias)
    } else {
        None
    };

    parser.expect(
        &TokenKind::Semicolon,
        "expected ';' after import declaration",
    )?;

    Some(ImportDecl { path, alias, span })
}

/// `[extern] fn name[.struct][<T,..>](params) -> type { .. }`
pub fn parse_function_decl(parser: &mut Parser, is_public: bool) -> Option<FunctionDecl> {
    let span = parser.current_span();

    let is_extern = if parser.at(&TokenKind::KwExtern) {
        parser.eat();
        true
    } else {
        false
    };

    parser.expect(&TokenKind::KwFn, "expected 'fn'")?;

    let (mut name, _) = parser.expect_ident("expected identifier after 'fn'")?;
    let mut struct_name = None;

    if parser.at(&TokenKind::Dot) {
        parser.eat();
        let (member, _) = parser.expect_ident("expected identifier after '.'")?;
        struct_name = Some(name);
        name = member;
    }

    let generic_params = parse_generic_params(parser)?;
    if is_extern && !generic_params.is_empty() {
        return parser.report(span, "extern fn cannot be generic");
    }

    let params = parser.parse_list(
        (&TokenKind::ParenL, "expected '('"),
        (&TokenKind::ParenR, "expected ')'"),
        parse_param_decl,
    )?;

    if let Some(vararg_pos) = params.iter().position(|p| p.is_vararg) {
        if vararg_pos + 1 != params.len() {
            let span = params[vararg_pos].span;
            return parser.report(span, "vararg '...' can only be in the last argument");
        }
    }

    parser.expect(&TokenKind::ReturnArrow, "expected '->'")?;
    let return_type = parse_type(parser)?;

    let body = if is_extern {
        if parser.at(&TokenKind::BraceL) {
            let span = parser.current_span();
            return parser.report(span, "extern fn cannot have a body");
        }
        parser.expect(&TokenKind::Semicolon, "expected ';'")?;
        None
    } else {
        if !parser.at(&TokenKind::BraceL) {
            let span = parser.current_span();
            return parser.report(span, "expected function body");
        }
        Some(stmt::parse_block(parser)?)
    };

    Some(FunctionDecl {
        name,
        struct_name,
        generic_params,
        params,
        return_type,
        body,
        is_extern,
        is_public,
        span,
    })
}

fn parse_generic_params(parser: &mut Parser) -> Option<Vec<GenericParam>> {
    if !parser.at(&TokenKind::Less) {
        return Some(Vec::new());
    }
    parser.parse_list(
        (&TokenKind::Less, "expected '<'"),
        (&TokenKind::Greater, "expected '>'"),
        |p| {
            let (name, span) = p.expect_ident("expected generic type identifier")?;
            Some(GenericParam { name, span })
        },
    )
}

/// `...` or `name ':' type`.
fn parse_param_decl(parser: &mut Parser) -> Option<ParamDecl> {
    let span = parser.current_span();

    if parser.at(&TokenKind::DotDotDot) {
        parser.eat();
        return Some(ParamDecl {
            name: "...".into(),
            ty: TypeExpr::void(span),
            is_vararg: true,
            span,
        });
    }

    let (name, _) = parser.expect_ident("expected parameter declaration")?;
    parser.expect(&TokenKind::Colon, "expected ':'")?;
    let ty = parse_type(parser)?;

    Some(ParamDecl {
        name,
        ty,
        is_vararg: false,
        span,
    })
}

/// `struct Name[<T,..>] { field: type, .. }`
pub fn parse_struct_decl(parser: &mut Parser, is_public: bool) -> Option<StructDecl> {
    let span = parser.current_span();
    parser.eat(); // 'struct'

    let (name, _) = parser.expect_ident("expected identifier after 'struct'")?;
    let generic_params = parse_generic_params(parser)?;

    let fields = parser.parse_list(
        (&TokenKind::BraceL, "expected '{'"),
        (&TokenKind::BraceR, "expected '}'"),
        parse_field_decl,
    )?;

    Some(StructDecl {
        name,
        generic_params,
        fields,
        is_public,
        span,
    })
}

fn parse_field_decl(parser: &mut Parser) -> Option<FieldDecl> {
    let span = parser.current_span();
    let (name, _) = parser.expect_ident("expected field declaration")?;
    parser.expect(&TokenKind::Colon, "expected ':'")?;
    let ty = parse_type(parser)?;
    Some(FieldDecl { name, ty, span })
}

/// `err Name { A, B, }`
pub fn parse_err_group_decl(parser: &mut Parser, is_public: bool) -> Option<ErrGroupDecl> {
    let span = parser.current_span();
    parser.expect(&TokenKind::KwErr, "expected 'err'")?;

    let (name, _) = parser.expect_ident("expected identifier after 'err'")?;
    let errors = parser.parse_list(
        (&TokenKind::BraceL, "expected '{'"),
        (&TokenKind::BraceR, "expected '}'"),
        parse_err_decl,
    )?;

    Some(ErrGroupDecl {
        name,
        errors,
        is_public,
        span,
    })
}

pub fn parse_err_decl(parser: &mut Parser) -> Option<ErrDecl> {
    let (name, span) = parser.expect_ident("expected error identifier")?;
    Some(ErrDecl { name, span })
}

/// Module-level `let`/`const` declaration (statement form lives in stmt.rs).
fn parse_module_var_decl(parser: &mut Parser, is_public: bool) -> Option<VarDecl> {
    let is_mutable = parser.at(&TokenKind::KwLet);
    parser.eat(); // 'let' or 'const'

    let var = parse_var_decl(parser, is_mutable, is_public)?;
    parser.expect(&TokenKind::Semicolon, "expected ';' after declaration")?;
    Some(var)
}

/// `name[: type] [= expr]` — after `let`/`const` was consumed.
pub fn parse_var_decl(parser: &mut Parser, is_mutable: bool, is_public: bool) -> Option<VarDecl> {
    let span = parser.current_span();
    let (name, _) = parser.expect_ident("expected identifier")?;

    let ty = if parser.at(&TokenKind::Colon) {
        parser.eat();
        Some(parse_type(parser)?)
    } else {
        None
    };

    let init = if parser.at(&TokenKind::Assign) {
        parser.eat();
        Some(super::expr::parse_expr(parser)?)
    } else {
        None
    };

    Some(VarDecl {
        name,
        ty,
        init,
        is_mutable,
        is_public,
        span,
    })
}

/// `test "name" { .. }`
pub fn parse_test_decl(parser: &mut Parser) -> Option<TestDecl> {
    let span = parser.current_span();
    parser.expect(&TokenKind::KwTest, "expected 'test'")?;

    let name = match parser.current().clone() {
        TokenKind::StrLit(s) => {
            parser.eat();
            s
        }
        TokenKind::Ident(s) => {
            parser.eat();
            s
        }
        _ => {
            let span = parser.current_span();
            return parser.report(span, "expected test name");
        }
    };

    if !parser.at(&TokenKind::BraceL) {
        let span = parser.current_span();
        return parser.report(span, "expected test body");
    }
    let body = stmt::parse_block(parser)?;

    Some(TestDecl { name, body, span })
}
