//! Structural lowering: passes that normalize the shape of declarations
//! before the merging and rewriting stages run. Nothing here depends on
//! semantic annotations beyond resolved type names.

pub mod members;

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;
use crate::visit::{self, VisitorMut};

// --- FixBadNames ---

/// Compiler-generated names can contain characters the target language
/// rejects (`<Main>m__0` and friends). Replace each offending character
/// with an underscore, everywhere a name can occur.
pub struct FixBadNames;

fn fix_name(name: &mut String) {
    if name.contains(['<', '>', '$']) {
        *name = name.replace(['<', '>', '$'], "_");
    }
}

struct NameFixer;

impl VisitorMut for NameFixer {
    fn visit_type_decl(&mut self, ty: &mut TypeDecl) {
        fix_name(&mut ty.name);
        visit::walk_type_decl(self, ty);
    }

    fn visit_member(&mut self, member: &mut Member) {
        match member {
            Member::Field(f) => fix_name(&mut f.name),
            Member::Method(m) => fix_name(&mut m.name),
            Member::Property(p) => fix_name(&mut p.name),
            Member::Event(e) => fix_name(&mut e.name),
            Member::Delegate(d) => fix_name(&mut d.name),
            Member::EnumMember(m) => fix_name(&mut m.name),
            _ => {}
        }
        visit::walk_member(self, member);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Ident(name) => fix_name(name),
            ExprKind::Member { name, .. } => fix_name(name),
            _ => {}
        }
        if let Some(Annot::Member(m)) = &mut expr.annot {
            fix_name(&mut m.name);
        }
        visit::walk_expr(self, expr);
    }

    fn visit_ty(&mut self, ty: &mut Ty) {
        if let TyKind::Named { name, .. } = &mut ty.kind {
            fix_name(name);
        }
        visit::walk_ty(self, ty);
    }
}

impl Pass for FixBadNames {
    fn name(&self) -> &'static str {
        "fix-bad-names"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        NameFixer.visit_module(module);
        Ok(())
    }
}

// --- LiftNestedClasses ---

/// Hoists nested type declarations to the top level as `Outer_Inner`,
/// rewriting references. A generic type nested inside a generic type cannot
/// be lifted without capturing the outer parameters twice, and is an error.
pub struct LiftNestedClasses;

struct NestedRename {
    /// dotted `Outer.Inner` and bare `Inner` (scoped to the outer type) both
    /// map to the lifted name.
    dotted: Vec<(String, String)>,
}

impl NestedRename {
    fn apply(&self, name: &mut String) {
        for (from, to) in &self.dotted {
            if name == from {
                *name = to.clone();
                return;
            }
        }
    }
}

impl VisitorMut for NestedRename {
    fn visit_ty(&mut self, ty: &mut Ty) {
        if let TyKind::Named { name, .. } = &mut ty.kind {
            self.apply(name);
        }
        visit::walk_ty(self, ty);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Some(annot) = &mut expr.annot {
            match annot {
                Annot::Ty(sem) => rename_sem(sem, self),
                Annot::Member(m) => self.apply(&mut m.declaring_type),
            }
        }
        visit::walk_expr(self, expr);
    }
}

fn rename_sem(sem: &mut SemTy, renames: &NestedRename) {
    match sem {
        SemTy::Named { name, .. } => renames.apply(name),
        SemTy::Array(inner) => rename_sem(inner, renames),
        _ => {}
    }
}

impl Pass for LiftNestedClasses {
    fn name(&self) -> &'static str {
        "lift-nested-classes"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        // A lifted type may itself contain nested types; iterate until none
        // remain.
        loop {
            let mut lifted: Vec<TypeDecl> = Vec::new();
            let mut global = NestedRename { dotted: Vec::new() };

            for outer in module.types_mut() {
                let mut local = NestedRename { dotted: Vec::new() };
                let mut kept = Vec::with_capacity(outer.members.len());
                for member in outer.members.drain(..) {
                    match member {
                        Member::Type(mut inner) => {
                            if !outer.type_params.is_empty() && !inner.type_params.is_empty() {
                                return Err(TranslateError::NestedGenericType {
                                    pass: "lift-nested-classes",
                                    outer: outer.name.clone(),
                                    inner: inner.name.clone(),
                                });
                            }
                            let lifted_name = format!("{}_{}", outer.name, inner.name);
                            global.dotted.push((
                                format!("{}.{}", outer.name, inner.name),
                                lifted_name.clone(),
                            ));
                            local.dotted.push((inner.name.clone(), lifted_name.clone()));
                            // Once top-level, a private restriction means
                            // nothing.
                            inner.modifiers.is_private = false;
                            inner.modifiers.is_protected = false;
                            // The inner type sees the outer's parameters.
                            inner.type_params = outer
                                .type_params
                                .iter()
                                .cloned()
                                .chain(inner.type_params)
                                .collect();
                            inner.name = lifted_name;
                            lifted.push(inner);
                        }
                        other => kept.push(other),
                    }
                }
                outer.members = kept;
                // Bare references to the inner name are only valid inside
                // the declaring type; dotted ones are rewritten module-wide
                // below.
                if !local.dotted.is_empty() {
                    for member in &mut outer.members {
                        local.visit_member(member);
                    }
                }
            }

            if lifted.is_empty() {
                return Ok(());
            }
            for t in &mut lifted {
                global.visit_type_decl(t);
            }
            global.visit_module(module);
            module.decls.extend(lifted.into_iter().map(Decl::Type));
        }
    }
}

// --- StripConstraints ---

/// Generic constraints have no target-side counterpart.
pub struct StripConstraints;

impl Pass for StripConstraints {
    fn name(&self) -> &'static str {
        "strip-constraints"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            ty.constraints.clear();
            for m in ty.methods_mut() {
                m.constraints.clear();
            }
        }
        Ok(())
    }
}

// --- FlattenNamespaces ---

/// Hoists every type out of its namespace, preserving declaration order.
/// Namespace qualification is assumed to already be folded into type names
/// where it matters.
pub struct FlattenNamespaces;

fn flatten_into(decls: Vec<Decl>, out: &mut Vec<Decl>) {
    for decl in decls {
        match decl {
            Decl::Namespace(ns) => flatten_into(ns.decls, out),
            Decl::Type(t) => out.push(Decl::Type(t)),
        }
    }
}

impl Pass for FlattenNamespaces {
    fn name(&self) -> &'static str {
        "flatten-namespaces"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let decls = std::mem::take(&mut module.decls);
        flatten_into(decls, &mut module.decls);
        Ok(())
    }
}

// --- StructToClass ---

/// The target has no value types; structs become classes. Copy semantics
/// are not preserved, which matches the source programs this pipeline is
/// used on.
pub struct StructToClass;

struct StructShapeFixer;

impl VisitorMut for StructShapeFixer {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Some(annot) = &mut expr.annot {
            match annot {
                Annot::Ty(sem) => sem_struct_to_class(sem),
                Annot::Member(m) => {
                    if let Some(ty) = &mut m.ty {
                        sem_struct_to_class(ty);
                    }
                }
            }
        }
        visit::walk_expr(self, expr);
    }
}

fn sem_struct_to_class(sem: &mut SemTy) {
    match sem {
        SemTy::Named { shape, .. } => {
            if *shape == TypeShape::Struct {
                *shape = TypeShape::Class;
            }
        }
        SemTy::Array(inner) => sem_struct_to_class(inner),
        _ => {}
    }
}

impl Pass for StructToClass {
    fn name(&self) -> &'static str {
        "struct-to-class"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            if ty.kind == TypeKind::Struct {
                ty.kind = TypeKind::Class;
            }
        }
        StructShapeFixer.visit_module(module);
        Ok(())
    }
}

// --- AddAbstractMethodBodies ---

/// Abstract methods on classes get a throwing body so the emitted class is
/// complete. Interface methods stay bodiless.
pub struct AddAbstractMethodBodies;

impl Pass for AddAbstractMethodBodies {
    fn name(&self) -> &'static str {
        "add-abstract-method-bodies"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            if ty.kind == TypeKind::Interface {
                continue;
            }
            for m in ty.methods_mut() {
                if m.body.is_none() {
                    m.body = Some(Block::new(vec![Stmt::Throw(Some(Expr::new_obj(
                        Ty::named("Error"),
                        vec![Expr::new(ExprKind::Lit(Lit::Str("abstract".to_string())))],
                    )))]));
                }
            }
        }
        Ok(())
    }
}

// --- StripEnumBaseTypes ---

/// Enum underlying types (`enum E : byte`) carry no information once all
/// numerics are one type.
pub struct StripEnumBaseTypes;

impl Pass for StripEnumBaseTypes {
    fn name(&self) -> &'static str {
        "strip-enum-base-types"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            if ty.kind == TypeKind::Enum {
                ty.base_types.clear();
            }
        }
        Ok(())
    }
}

// --- StripAttributes ---

pub struct StripAttributes;

impl Pass for StripAttributes {
    fn name(&self) -> &'static str {
        "strip-attributes"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            ty.attributes.clear();
            for member in &mut ty.members {
                match member {
                    Member::Field(f) => f.attributes.clear(),
                    Member::Method(m) => m.attributes.clear(),
                    Member::Ctor(c) => c.attributes.clear(),
                    Member::Property(p) => p.attributes.clear(),
                    Member::Indexer(i) => i.attributes.clear(),
                    Member::Operator(o) => o.attributes.clear(),
                    Member::Event(e) => e.attributes.clear(),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

// --- StripModifiers ---

/// Drops modifiers the target cannot express. `const` fields survive as
/// statics so existing references stay valid.
pub struct StripModifiers;

fn strip(m: &mut Modifiers) {
    if m.is_const {
        m.is_const = false;
        m.is_static = true;
    }
    m.is_virtual = false;
    m.is_override = false;
    m.is_sealed = false;
    m.is_readonly = false;
    m.is_internal = false;
}

impl Pass for StripModifiers {
    fn name(&self) -> &'static str {
        "strip-modifiers"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            strip(&mut ty.modifiers);
            for member in &mut ty.members {
                match member {
                    Member::Field(f) => strip(&mut f.modifiers),
                    Member::Method(m) => strip(&mut m.modifiers),
                    Member::Ctor(c) => strip(&mut c.modifiers),
                    Member::Property(p) => strip(&mut p.modifiers),
                    Member::Indexer(i) => strip(&mut i.modifiers),
                    Member::Operator(o) => strip(&mut o.modifiers),
                    Member::Event(e) => strip(&mut e.modifiers),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

// --- RemoveEmptySwitch ---

/// A switch with no sections does nothing; keep the scrutinee only when it
/// could have side effects.
pub struct RemoveEmptySwitch;

fn is_pure(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::This | ExprKind::Base | ExprKind::Lit(_)
        | ExprKind::TypeRef(_) => true,
        ExprKind::Member { target, .. } => is_pure(target),
        _ => false,
    }
}

struct EmptySwitchRemover;

impl VisitorMut for EmptySwitchRemover {
    fn visit_block(&mut self, block: &mut Block) {
        visit::for_each_seq_mut(block, &mut |stmts| {
            let mut i = 0;
            while i < stmts.len() {
                let replace = match &stmts[i] {
                    Stmt::Switch { scrutinee, sections } if sections.is_empty() => {
                        Some(if is_pure(scrutinee) {
                            None
                        } else {
                            Some(scrutinee.clone())
                        })
                    }
                    _ => None,
                };
                match replace {
                    Some(None) => {
                        stmts.remove(i);
                    }
                    Some(Some(e)) => {
                        stmts[i] = Stmt::Expr(e);
                        i += 1;
                    }
                    None => i += 1,
                }
            }
        });
    }
}

impl Pass for RemoveEmptySwitch {
    fn name(&self) -> &'static str {
        "remove-empty-switch"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        EmptySwitchRemover.visit_module(module);
        Ok(())
    }
}

// --- MakeWhileLoop ---

/// `for (;;)` and `for (; true;)` become `while (true)`, the form the goto
/// dispatcher and emitter expect for endless loops.
pub struct MakeWhileLoop;

struct ForToWhile;

impl VisitorMut for ForToWhile {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        visit::walk_stmt(self, stmt);
        if let Stmt::For {
            init,
            cond,
            update,
            body,
        } = stmt
        {
            let endless = match cond {
                None => true,
                Some(Expr {
                    kind: ExprKind::Lit(Lit::Bool(true)),
                    ..
                }) => true,
                _ => false,
            };
            if init.is_empty() && update.is_empty() && endless {
                let body = std::mem::replace(body, Box::new(Stmt::Block(Block::default())));
                *stmt = Stmt::While {
                    cond: Expr::bool(true),
                    body,
                };
            }
        }
    }
}

impl Pass for MakeWhileLoop {
    fn name(&self) -> &'static str {
        "make-while-loop"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        ForToWhile.visit_module(module);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_lower.rs"]
mod tests;
