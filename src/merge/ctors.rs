//! Constructor merging. A class ends up with exactly one real constructor:
//! either its single original one, or a dispatcher that calls the base
//! initializer for the selected overload and then forwards to the renamed
//! implementation, which survives as a private method.

use indexmap::IndexMap;

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::merge::{dispatch_chain, dispatch_guard, unify_params};
use crate::pipeline::Pass;
use crate::visit::{self, VisitorMut};

const PASS: &str = "merge-ctors";

/// Replaces parameter references with the caller's argument expressions when
/// hoisting initializer arguments into the dispatcher.
struct Substitute {
    map: IndexMap<String, Expr>,
}

impl VisitorMut for Substitute {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let ExprKind::Ident(name) = &expr.kind {
            if let Some(replacement) = self.map.get(name) {
                *expr = replacement.clone();
                return;
            }
        }
        visit::walk_expr(self, expr);
    }
}

fn substitute(args: &[Expr], params: &[Param], actuals: &[Expr]) -> Vec<Expr> {
    let mut sub = Substitute {
        map: params
            .iter()
            .zip(actuals)
            .map(|(p, a)| (p.name.clone(), a.clone()))
            .collect(),
    };
    args.iter()
        .cloned()
        .map(|mut e| {
            sub.visit_expr(&mut e);
            e
        })
        .collect()
}

/// The first base type that resolves to a class. Unresolved bases are taken
/// for classes unless they follow the `IFoo` interface convention.
pub(crate) fn base_class_name(module: &Module, ty: &TypeDecl) -> Option<String> {
    let base = ty.base_types.first()?;
    let name = base.name()?;
    if let Some(decl) = module.find_type(name) {
        if decl.kind == TypeKind::Interface {
            return None;
        }
    } else {
        let mut chars = name.chars();
        if chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_uppercase()) {
            return None;
        }
    }
    Some(name.to_string())
}

fn impl_name(index: usize) -> String {
    format!("constructor_{}", index)
}

struct SuperCallFinder {
    found: bool,
}

impl VisitorMut for SuperCallFinder {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let ExprKind::Invoke { target, .. } = &expr.kind {
            if matches!(target.kind, ExprKind::Base) {
                self.found = true;
                return;
            }
        }
        visit::walk_expr(self, expr);
    }
}

fn calls_super(block: &Block) -> bool {
    let mut finder = SuperCallFinder { found: false };
    let mut probe = block.clone();
    finder.visit_block(&mut probe);
    finder.found
}

fn super_call(args: Vec<Expr>) -> Stmt {
    Stmt::Expr(Expr::invoke(Expr::base(), args))
}

/// Whether an initializer argument can bind to a parameter of `ty`.
/// `None` when the argument carries no usable type information.
fn arg_matches(arg: &Expr, ty: &Ty) -> Option<bool> {
    if let TyKind::Nullable(inner) = &ty.kind {
        return arg_matches(arg, inner);
    }
    if let Some(sem) = arg.sem_ty() {
        return match (sem, &ty.kind) {
            (SemTy::Prim(p), TyKind::Prim(q)) => match p.erased() {
                PrimTy::Any => None,
                erased => Some(erased == q.erased()),
            },
            (SemTy::Prim(p), _) => match p.erased() {
                PrimTy::Any => None,
                _ => Some(false),
            },
            (SemTy::Array(_), kind) => Some(matches!(kind, TyKind::Array(_))),
            (SemTy::Named { name, .. }, TyKind::Named { name: want, .. }) => Some(name == want),
            (
                SemTy::Named {
                    shape: TypeShape::Enum,
                    ..
                },
                TyKind::Prim(q),
            ) => Some(q.is_numeric()),
            (SemTy::Named { .. }, _) => Some(false),
            (SemTy::GenericParam(_), _) => None,
        };
    }
    match &arg.kind {
        ExprKind::Lit(lit) => match lit {
            Lit::Int(_) | Lit::Float(_) | Lit::Char(_) | Lit::CharCode { .. } => {
                Some(matches!(&ty.kind, TyKind::Prim(p) if p.is_numeric()))
            }
            Lit::Str(_) => Some(matches!(ty.kind, TyKind::Prim(PrimTy::Str))),
            Lit::Bool(_) => Some(matches!(ty.kind, TyKind::Prim(PrimTy::Bool))),
            Lit::Null => None,
        },
        ExprKind::New { ty: made, .. } => match (&made.kind, &ty.kind) {
            (TyKind::Named { name, .. }, TyKind::Named { name: want, .. }) => Some(name == want),
            _ => None,
        },
        _ => None,
    }
}

/// Resolves the sibling a `this(...)` initializer chains to. Arity narrows
/// the candidates; same-arity siblings are separated by matching the
/// arguments against their parameter types, and a remaining tie is an error
/// rather than a guess.
fn chain_target(
    ty_name: &str,
    ctors: &[CtorDecl],
    index: usize,
    args: &[Expr],
) -> Result<usize, TranslateError> {
    let candidates: Vec<usize> = ctors
        .iter()
        .enumerate()
        .filter(|&(i, c)| i != index && c.params.len() == args.len())
        .map(|(i, _)| i)
        .collect();
    match candidates.as_slice() {
        [] => Err(TranslateError::Unsupported {
            pass: PASS,
            decl: format!("{}.constructor", ty_name),
            detail: "this-initializer target not found".to_string(),
        }),
        &[only] => Ok(only),
        _ => {
            let mut viable = candidates.iter().copied().filter(|&i| {
                args.iter()
                    .zip(&ctors[i].params)
                    .all(|(a, p)| arg_matches(a, &p.ty) != Some(false))
            });
            match (viable.next(), viable.next()) {
                (Some(target), None) => Ok(target),
                _ => Err(TranslateError::Unsupported {
                    pass: PASS,
                    decl: format!("{}.constructor", ty_name),
                    detail: "ambiguous this-initializer target".to_string(),
                }),
            }
        }
    }
}

fn ctor_impl_method(ctor: CtorDecl, index: usize) -> MethodDecl {
    let mut m = MethodDecl::new(impl_name(index), Ty::prim(PrimTy::Void));
    m.modifiers = Modifiers {
        is_private: true,
        ..Modifiers::default()
    };
    m.params = ctor.params;
    m.body = Some(ctor.body);
    m
}

/// The statements a dispatcher branch runs before forwarding: the base
/// initializer, plus the inlined body call of a this-chained target.
fn branch_prologue(
    ty_name: &str,
    ctors: &[CtorDecl],
    index: usize,
    actuals: &[Expr],
    has_base: bool,
) -> Result<Vec<Stmt>, TranslateError> {
    let ctor = &ctors[index];
    let mut stmts = Vec::new();
    match &ctor.init {
        None => {
            if has_base {
                stmts.push(super_call(vec![]));
            }
        }
        Some(CtorInit {
            kind: CtorInitKind::Base,
            args,
        }) => {
            stmts.push(super_call(substitute(args, &ctor.params, actuals)));
        }
        Some(CtorInit {
            kind: CtorInitKind::This,
            args,
        }) => {
            let chained = substitute(args, &ctor.params, actuals);
            let target = chain_target(ty_name, ctors, index, args)?;
            if matches!(
                ctors[target].init,
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    ..
                })
            ) {
                return Err(TranslateError::Unsupported {
                    pass: PASS,
                    decl: format!("{}.constructor", ty_name),
                    detail: "chained this-initializers are not supported".to_string(),
                });
            }
            match &ctors[target].init {
                Some(CtorInit {
                    kind: CtorInitKind::Base,
                    args: base_args,
                }) => {
                    stmts.push(super_call(substitute(
                        base_args,
                        &ctors[target].params,
                        &chained,
                    )));
                }
                _ => {
                    if has_base {
                        stmts.push(super_call(vec![]));
                    }
                }
            }
            stmts.push(Stmt::Expr(Expr::invoke(
                Expr::member(Expr::this(), impl_name(target)),
                chained,
            )));
        }
    }
    Ok(stmts)
}

fn merge_type(module_view: &Module, ty: &mut TypeDecl) -> Result<(), TranslateError> {
    if ty.kind != TypeKind::Class {
        return Ok(());
    }
    let has_base = base_class_name(module_view, ty).is_some();

    let ctor_indices: Vec<usize> = ty
        .members
        .iter()
        .enumerate()
        .filter_map(|(i, m)| match m {
            Member::Ctor(c) if !c.modifiers.is_static => Some(i),
            _ => None,
        })
        .collect();

    // Every class gets at least one constructor so base initialization and
    // field setup have somewhere to live.
    if ctor_indices.is_empty() {
        let mut ctor = CtorDecl::new();
        if has_base {
            ctor.init = Some(CtorInit {
                kind: CtorInitKind::Base,
                args: vec![],
            });
        }
        ty.members.push(Member::Ctor(ctor));
        return Ok(());
    }

    if ctor_indices.len() == 1 {
        let Member::Ctor(c) = &mut ty.members[ctor_indices[0]] else {
            unreachable!("index points at a ctor");
        };
        // An already-merged dispatcher calls super inside its branches.
        if has_base && c.init.is_none() && !calls_super(&c.body) {
            c.init = Some(CtorInit {
                kind: CtorInitKind::Base,
                args: vec![],
            });
        }
        return Ok(());
    }

    let ctors: Vec<CtorDecl> = ctor_indices
        .iter()
        .map(|&i| match &ty.members[i] {
            Member::Ctor(c) => c.clone(),
            _ => unreachable!("index points at a ctor"),
        })
        .collect();
    let param_lists: Vec<&[Param]> = ctors.iter().map(|c| c.params.as_slice()).collect();
    let unified = unify_params(&param_lists);

    let mut branches = Vec::with_capacity(ctors.len());
    for (index, ctor) in ctors.iter().enumerate() {
        let guard = dispatch_guard(&ctor.params, &unified);
        let actuals: Vec<Expr> = unified[..ctor.params.len()]
            .iter()
            .map(|p| Expr::ident(p.name.clone()))
            .collect();
        let mut stmts = branch_prologue(&ty.name, &ctors, index, &actuals, has_base)?;
        stmts.push(Stmt::Expr(Expr::invoke(
            Expr::member(Expr::this(), impl_name(index)),
            actuals,
        )));
        branches.push((guard, Stmt::Block(Block::new(stmts))));
    }

    let mut dispatcher = CtorDecl::new();
    dispatcher.params = unified;
    dispatcher.body = Block::new(dispatch_chain(branches));

    // Implementations stay where their ctors were, as private methods; the
    // dispatcher takes the first slot.
    let mut next = 0usize;
    for &i in &ctor_indices {
        let Member::Ctor(c) = &ty.members[i] else {
            unreachable!("index points at a ctor");
        };
        ty.members[i] = Member::Method(ctor_impl_method(c.clone(), next));
        next += 1;
    }
    ty.members
        .insert(ctor_indices[0], Member::Ctor(dispatcher));
    Ok(())
}

/// Merges constructor overloads and guarantees every class has one.
pub struct MergeCtors;

impl Pass for MergeCtors {
    fn name(&self) -> &'static str {
        "merge-ctors"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let view = module.clone();
        for ty in module.types_mut() {
            merge_type(&view, ty)?;
        }
        Ok(())
    }
}
