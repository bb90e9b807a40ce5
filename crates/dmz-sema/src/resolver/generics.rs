//! On-demand monomorphization.
//!
//! A specialization re-resolves the template's AST under a scope where
//! each generic identifier is bound to its concrete type. Instances are
//! cached on the template, keyed by the concrete type-argument tuple, so
//! requesting the same tuple twice yields the same declaration.

use super::Sema;
use crate::resolved::*;
use crate::ty::Ty;
use dmz_parser::source::Span;

impl<'a> Sema<'a> {
    pub(crate) fn specialize_generic_function(
        &mut self,
        template: DeclId,
        args: &[Ty],
        span: Span,
    ) -> Option<DeclId> {
        let arity = self.prog.function(template).generic_params.len();
        if args.len() != arity {
            return self.report(
                span,
                format!("expected {arity} generic arguments, got {}", args.len()),
            );
        }

        if let Some((_, existing)) = self
            .prog
            .function(template)
            .specializations
            .iter()
            .find(|(key, _)| key == args)
        {
            return Some(*existing);
        }

        let Some(fn_ast) = self.fn_asts.get(&template).copied() else {
            return self.report(span, "generic function has no body to specialize");
        };
        let parent = self.prog.decl(template).parent;
        let symbol = format!(
            "{}{}",
            self.prog.decl(template).symbol,
            Ty::symbol_suffix(args, &self.prog)
        );

        self.with_env(parent, |sema| {
            sema.push_scope();
            for (generic, arg) in fn_ast.generic_params.iter().zip(args) {
                let bound = sema.prog.add_decl(ResolvedDecl {
                    name: generic.name.clone(),
                    symbol: generic.name.clone(),
                    span: generic.span,
                    is_public: true,
                    parent,
                    kind: DeclKind::GenericParam {
                        bound: Some(arg.clone()),
                    },
                });
                sema.bind(bound);
            }

            let owner = sema.prog.function(template).owner;
            let ret = sema.resolve_type(&fn_ast.return_type)?;

            sema.push_scope();
            let mut params = Vec::new();
            if let Some(strukt) = owner {
                params.push(sema.make_self_param(strukt, fn_ast.span));
            }
            for param in &fn_ast.params {
                let id = sema.resolve_param_decl(param)?;
                sema.bind(id);
                params.push(id);
            }
            sema.pop_scope();

            let specialized = sema.prog.add_decl(ResolvedDecl {
                name: fn_ast.name.clone(),
                symbol,
                span: fn_ast.span,
                is_public: sema.prog.decl(template).is_public,
                parent: sema.prog.decl(template).parent,
                kind: DeclKind::Function(FunctionData {
                    ret,
                    params,
                    body: None,
                    is_extern: false,
                    is_test: false,
                    owner,
                    generic_params: Vec::new(),
                    specializations: Vec::new(),
                    defers: Vec::new(),
                }),
            });

            // Register before resolving the body so recursive calls to the
            // same instance reuse it instead of specializing forever.
            sema.prog
                .function_mut(template)
                .specializations
                .push((args.to_vec(), specialized));

            let body_ast = fn_ast.body.as_ref().expect("generic template without body");
            sema.resolve_body_in_env(specialized, body_ast);

            sema.pop_scope();
            Some(specialized)
        })
    }

    pub(crate) fn specialize_generic_struct(
        &mut self,
        template: DeclId,
        args: &[Ty],
        span: Span,
    ) -> Option<DeclId> {
        let arity = self.prog.strukt(template).generic_params.len();
        if args.len() != arity {
            return self.report(
                span,
                format!("expected {arity} generic arguments, got {}", args.len()),
            );
        }

        if let Some((_, existing)) = self
            .prog
            .strukt(template)
            .specializations
            .iter()
            .find(|(key, _)| key == args)
        {
            return Some(*existing);
        }

        let Some(struct_ast) = self.struct_asts.get(&template).copied() else {
            return self.report(span, "generic struct has no definition to specialize");
        };
        let parent = self.prog.decl(template).parent;
        let symbol = format!(
            "{}{}",
            self.prog.decl(template).symbol,
            Ty::symbol_suffix(args, &self.prog)
        );

        self.with_env(parent, |sema| {
            sema.push_scope();
            for (generic, arg) in struct_ast.generic_params.iter().zip(args) {
                let bound = sema.prog.add_decl(ResolvedDecl {
                    name: generic.name.clone(),
                    symbol: generic.name.clone(),
                    span: generic.span,
                    is_public: true,
                    parent,
                    kind: DeclKind::GenericParam {
                        bound: Some(arg.clone()),
                    },
                });
                sema.bind(bound);
            }

            let specialized = sema.prog.add_decl(ResolvedDecl {
                name: struct_ast.name.clone(),
                symbol,
                span: struct_ast.span,
                is_public: sema.prog.decl(template).is_public,
                parent,
                kind: DeclKind::Struct(StructData {
                    fields: Vec::new(),
                    methods: Vec::new(),
                    generic_params: Vec::new(),
                    specializations: Vec::new(),
                }),
            });
            sema.prog
                .strukt_mut(template)
                .specializations
                .push((args.to_vec(), specialized));

            let mut fields = Vec::new();
            for (index, field) in struct_ast.fields.iter().enumerate() {
                let ty = sema.resolve_type(&field.ty)?;
                if ty == Ty::Void {
                    return sema.report(field.span, "struct field cannot be void");
                }
                fields.push(sema.prog.add_decl(ResolvedDecl {
                    name: field.name.clone(),
                    symbol: field.name.clone(),
                    span: field.span,
                    is_public: true,
                    parent: Some(specialized),
                    kind: DeclKind::Field {
                        ty,
                        index: index as u32,
                    },
                }));
            }
            match &mut sema.prog.decl_mut(specialized).kind {
                DeclKind::Struct(data) => data.fields = fields,
                _ => unreachable!(),
            }

            sema.check_struct_cycles(specialized);

            sema.pop_scope();
            Some(specialized)
        })
    }
}
