#![allow(dead_code)]

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::pipeline::Pass;

pub fn run_pass<P: Pass>(mut pass: P, module: &mut Module) -> Diagnostics {
    let mut diags = Diagnostics::new();
    pass.run(module, &mut diags).expect("pass failed");
    diags
}

pub fn class(name: &str, members: Vec<Member>) -> TypeDecl {
    let mut ty = TypeDecl::new(name, TypeKind::Class);
    ty.members = members;
    ty
}

pub fn module_of(types: Vec<TypeDecl>) -> Module {
    Module::new(types.into_iter().map(Decl::Type).collect())
}

pub fn method(name: &str, ret: Ty, params: Vec<Param>, stmts: Vec<Stmt>) -> MethodDecl {
    let mut m = MethodDecl::new(name, ret);
    m.params = params;
    m.body = Some(Block::new(stmts));
    m
}

pub fn void_method(name: &str, params: Vec<Param>, stmts: Vec<Stmt>) -> MethodDecl {
    method(name, Ty::prim(PrimTy::Void), params, stmts)
}

pub fn field(name: &str, ty: Ty) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        modifiers: Modifiers::default(),
        attributes: Vec::new(),
        ty,
        init: None,
    }
}

pub fn int_ty() -> Ty {
    Ty::prim(PrimTy::I32)
}

pub fn str_ty() -> Ty {
    Ty::prim(PrimTy::Str)
}

/// `trace(n)`: the side effect the mini interpreter records.
pub fn trace(n: i64) -> Stmt {
    Stmt::Expr(Expr::invoke(Expr::ident("trace"), vec![Expr::int(n)]))
}

pub fn set_var(name: &str, value: Expr) -> Stmt {
    Stmt::Expr(Expr::assign(Expr::ident(name), value))
}

pub fn var(name: &str) -> Expr {
    Expr::ident(name)
}

/// The method named `name` in `ty`, or a panic naming what is missing.
pub fn find_method<'a>(ty: &'a TypeDecl, name: &str) -> &'a MethodDecl {
    ty.methods()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("no method `{}` in `{}`", name, ty.name))
}

pub fn first_type(module: &Module) -> &TypeDecl {
    module.types().next().expect("module has no types")
}
