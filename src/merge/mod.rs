//! Overload merging. The target language resolves members by name alone, so
//! every overload group collapses into one dispatcher method that inspects
//! `arguments` at runtime and forwards to the renamed implementations.

pub mod ctors;

use indexmap::IndexMap;

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;

// --- shared dispatch machinery (also used for constructors) ---

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds the unified parameter list for a group of overloads. Positions
/// where every overload agrees on the type keep it; disagreeing positions
/// widen to `any` and take a name joined from the overloads' names.
/// Positions past the shortest overload become optional.
pub(crate) fn unify_params(param_lists: &[&[Param]]) -> Vec<Param> {
    let max_arity = param_lists.iter().map(|p| p.len()).max().unwrap_or(0);
    let min_arity = param_lists.iter().map(|p| p.len()).min().unwrap_or(0);
    let mut unified = Vec::with_capacity(max_arity);
    for pos in 0..max_arity {
        let at_pos: Vec<&Param> = param_lists.iter().filter_map(|ps| ps.get(pos)).collect();
        let first_ty = &at_pos[0].ty;
        let same_ty = at_pos.iter().all(|p| p.ty.kind == first_ty.kind);
        let ty = if same_ty {
            first_ty.clone()
        } else {
            Ty::prim(PrimTy::Any)
        };
        let mut names: Vec<&str> = Vec::new();
        for p in &at_pos {
            if !names.contains(&p.name.as_str()) {
                names.push(&p.name);
            }
        }
        let name = if names.len() == 1 {
            names[0].to_string()
        } else {
            let mut joined = names[0].to_string();
            for n in &names[1..] {
                joined.push_str("Or");
                joined.push_str(&capitalize(n));
            }
            joined
        };
        let mut param = Param::new(name, ty);
        param.optional = pos >= min_arity;
        unified.push(param);
    }
    unified
}

/// The runtime constructor to test a parameter against, or `None` when the
/// parameter cannot be checked (interfaces and delegates have no runtime
/// identity, generic parameters and `any` match everything).
pub(crate) fn guard_ty(ty: &Ty) -> Option<Ty> {
    match &ty.kind {
        TyKind::Prim(p) => match p.erased() {
            PrimTy::Number => Some(Ty::named("Number")),
            PrimTy::Bool => Some(Ty::named("Boolean")),
            PrimTy::Str => Some(Ty::named("String")),
            _ => None,
        },
        TyKind::Array(_) => Some(Ty::named("Array")),
        TyKind::Named { name, .. } => match &ty.annot {
            Some(SemTy::Named { shape, .. }) => match shape {
                TypeShape::Interface | TypeShape::Delegate => None,
                TypeShape::Enum => Some(Ty::named("Number")),
                TypeShape::Class | TypeShape::Struct => Some(Ty::named(name.clone())),
            },
            Some(SemTy::GenericParam(_)) => None,
            _ => Some(Ty::named(name.clone())),
        },
        TyKind::Func { .. } => None,
        TyKind::Nullable(inner) => guard_ty(inner),
    }
}

/// The guard selecting one overload: an arity test on `arguments.length`
/// plus a runtime type test per checkable parameter.
pub(crate) fn dispatch_guard(params: &[Param], unified: &[Param]) -> Expr {
    let mut guard = Expr::binary(
        Expr::member(Expr::ident("arguments"), "length"),
        BinOp::Eq,
        Expr::int(params.len() as i64),
    );
    for (pos, param) in params.iter().enumerate() {
        let Some(check) = guard_ty(&param.ty) else {
            continue;
        };
        let test = Expr::is_test(Expr::ident(unified[pos].name.clone()), check);
        guard = Expr::binary(guard, BinOp::And, test);
    }
    guard
}

/// Builds the if/else-if dispatch chain. `branches` pairs each overload's
/// guard with its forwarding statement; the last overload becomes the
/// terminal else branch.
pub(crate) fn dispatch_chain(mut branches: Vec<(Expr, Stmt)>) -> Vec<Stmt> {
    let Some((_, last)) = branches.pop() else {
        return Vec::new();
    };
    let mut chain = last;
    while let Some((guard, stmt)) = branches.pop() {
        chain = Stmt::if_else(guard, stmt, chain);
    }
    vec![chain]
}

fn is_void(ty: &Ty) -> bool {
    matches!(ty.kind, TyKind::Prim(PrimTy::Void))
}

// --- MergeOverloads ---

/// Collapses each same-name method group into renamed private
/// implementations plus one public dispatcher. Interface groups become a
/// single bodiless signature with the unified parameters.
pub struct MergeOverloads;

fn impl_name(name: &str, index: usize) -> String {
    format!("{}_{}", name, index)
}

fn merge_type(ty: &mut TypeDecl) {
    // (name, is_static) -> member indices, in declaration order.
    let mut groups: IndexMap<(String, bool), Vec<usize>> = IndexMap::new();
    for (i, member) in ty.members.iter().enumerate() {
        if let Member::Method(m) = member {
            groups
                .entry((m.name.clone(), m.modifiers.is_static))
                .or_default()
                .push(i);
        }
    }
    groups.retain(|_, idxs| idxs.len() > 1);
    if groups.is_empty() {
        return;
    }

    let is_interface = ty.kind == TypeKind::Interface;
    let mut remove: Vec<usize> = Vec::new();
    let mut dispatchers: Vec<(usize, MethodDecl)> = Vec::new();

    for ((name, is_static), idxs) in &groups {
        let methods: Vec<&MethodDecl> = idxs
            .iter()
            .map(|&i| match &ty.members[i] {
                Member::Method(m) => m,
                _ => unreachable!("group indices point at methods"),
            })
            .collect();
        let param_lists: Vec<&[Param]> = methods.iter().map(|m| m.params.as_slice()).collect();
        let unified = unify_params(&param_lists);
        let ret = if methods
            .iter()
            .all(|m| m.ret.kind == methods[0].ret.kind)
        {
            methods[0].ret.clone()
        } else {
            Ty::prim(PrimTy::Any)
        };

        let mut dispatcher = MethodDecl::new(name.clone(), ret.clone());
        dispatcher.modifiers = methods[0].modifiers;
        dispatcher.params = unified.clone();

        if is_interface {
            dispatcher.body = None;
            remove.extend(idxs);
            dispatchers.push((idxs[0], dispatcher));
            continue;
        }

        let receiver = if *is_static {
            Expr::type_ref(Ty::named(ty.name.clone()))
        } else {
            Expr::this()
        };
        let mut branches = Vec::with_capacity(methods.len());
        for (index, m) in methods.iter().enumerate() {
            let guard = dispatch_guard(&m.params, &unified);
            let args: Vec<Expr> = unified[..m.params.len()]
                .iter()
                .map(|p| Expr::ident(p.name.clone()))
                .collect();
            let call = Expr::invoke(
                Expr::member(receiver.clone(), impl_name(name, index)),
                args,
            );
            let stmt = if is_void(&m.ret) {
                Stmt::Expr(call)
            } else {
                Stmt::Return(Some(call))
            };
            branches.push((guard, stmt));
        }
        dispatcher.body = Some(Block::new(dispatch_chain(branches)));

        for (index, &i) in idxs.iter().enumerate() {
            let Member::Method(m) = &mut ty.members[i] else {
                unreachable!("group indices point at methods");
            };
            m.name = impl_name(name, index);
            m.modifiers.is_private = true;
        }
        dispatchers.push((idxs[0], dispatcher));
    }

    // Insert each dispatcher ahead of its first implementation; indices are
    // patched from the back so earlier insertions stay valid.
    dispatchers.sort_by_key(|(i, _)| *i);
    for (i, d) in dispatchers.into_iter().rev() {
        ty.members.insert(i, Member::Method(d));
        for r in &mut remove {
            if *r >= i {
                *r += 1;
            }
        }
    }
    remove.sort_unstable();
    for i in remove.into_iter().rev() {
        ty.members.remove(i);
    }
}

impl Pass for MergeOverloads {
    fn name(&self) -> &'static str {
        "merge-overloads"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            merge_type(ty);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_merge.rs"]
mod tests;
