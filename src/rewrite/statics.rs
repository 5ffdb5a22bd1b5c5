//! Static constructor reification. The target has no static initializer
//! blocks, so each one becomes an idempotent static method guarded by a
//! ran-flag, called from every entry point into the type: static methods
//! and instance constructors.

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;

pub struct ReifyStaticCtors;

fn flag_name(ty: &str) -> String {
    format!("{}_cctorRan", ty)
}

fn cctor_name(ty: &str) -> String {
    format!("{}_cctor", ty)
}

fn cctor_call(ty: &str) -> Stmt {
    Stmt::Expr(Expr::static_call(ty, &cctor_name(ty), vec![]))
}

fn reify(ty: &mut TypeDecl) {
    let Some(pos) = ty
        .members
        .iter()
        .position(|m| matches!(m, Member::Ctor(c) if c.modifiers.is_static))
    else {
        return;
    };
    let Member::Ctor(cctor) = ty.members.remove(pos) else {
        unreachable!("position points at a ctor");
    };
    let ty_name = ty.name.clone();
    let flag = flag_name(&ty_name);

    let flag_ref = Expr::member(Expr::type_ref(Ty::named(ty_name.clone())), flag.clone());
    let mut stmts = vec![
        Stmt::if_then(flag_ref.clone(), Stmt::Return(None)),
        Stmt::Expr(Expr::assign(flag_ref, Expr::bool(true))),
    ];
    stmts.extend(cctor.body.stmts);

    let mut method = MethodDecl::new(cctor_name(&ty_name), Ty::prim(PrimTy::Void));
    method.modifiers = Modifiers::private_static();
    method.body = Some(Block::new(stmts));

    // Call sites: everything that can be the first code of the type to run.
    let call = cctor_call(&ty_name);
    for member in &mut ty.members {
        match member {
            Member::Method(m) if m.modifiers.is_static => {
                if let Some(body) = &mut m.body {
                    body.stmts.insert(0, call.clone());
                }
            }
            Member::Ctor(c) if !c.modifiers.is_static => {
                c.body.stmts.insert(0, call.clone());
            }
            Member::Property(p) if p.modifiers.is_static => {
                if let Some(Accessor { body: Some(b) }) = &mut p.getter {
                    b.stmts.insert(0, call.clone());
                }
                if let Some(Accessor { body: Some(b) }) = &mut p.setter {
                    b.stmts.insert(0, call.clone());
                }
            }
            _ => {}
        }
    }

    ty.members.insert(
        pos,
        Member::Field(FieldDecl {
            name: flag,
            modifiers: Modifiers::private_static(),
            attributes: Vec::new(),
            ty: Ty::prim(PrimTy::Bool),
            init: Some(Expr::bool(false)),
        }),
    );
    ty.members.insert(pos + 1, Member::Method(method));
}

impl Pass for ReifyStaticCtors {
    fn name(&self) -> &'static str {
        "reify-static-ctors"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            reify(ty);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_statics.rs"]
mod tests;
