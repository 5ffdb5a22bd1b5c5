//! Type and API rewriting: erases the source type system down to the
//! target's scalars, maps framework surface onto the runtime shims, and
//! normalizes exception handling to single untyped catch clauses.

pub mod statics;

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;
use crate::visit::{self, VisitorMut};

// --- ReplaceFrameworkMembers ---

/// Maps framework member accesses onto the target runtime: the host math
/// object where names line up, `N`-prefixed shim classes everywhere else.
/// Instance helpers on scalar receivers become static shim calls taking the
/// receiver as the first argument.
pub struct ReplaceFrameworkMembers;

/// Math members that exist on the host math object under a different name.
const MATH_MEMBERS: &[(&str, &str)] = &[
    ("Abs", "abs"),
    ("Acos", "acos"),
    ("Asin", "asin"),
    ("Atan", "atan"),
    ("Atan2", "atan2"),
    ("Ceiling", "ceil"),
    ("Cos", "cos"),
    ("Exp", "exp"),
    ("Floor", "floor"),
    ("Log", "log"),
    ("Max", "max"),
    ("Min", "min"),
    ("Pow", "pow"),
    ("Round", "round"),
    ("Sin", "sin"),
    ("Sqrt", "sqrt"),
    ("Tan", "tan"),
    ("PI", "PI"),
    ("E", "E"),
];

/// Static framework classes with a shim counterpart.
const STATIC_SHIMS: &[(&str, &str)] = &[
    ("Console", "NConsole"),
    ("Array", "NArray"),
    ("String", "NString"),
    ("Object", "NObject"),
    ("Convert", "NConvert"),
];

/// The shim class handling instance helpers for a scalar receiver, plus
/// whether the member name gets the `Generic` prefix.
fn scalar_shim(sem: &SemTy) -> Option<(&'static str, bool)> {
    match sem {
        SemTy::Prim(p) => match p.erased() {
            PrimTy::Str => Some(("NString", false)),
            PrimTy::Bool => Some(("NBoolean", false)),
            PrimTy::Number => Some(("NNumber", false)),
            PrimTy::Any => Some(("NObject", true)),
            _ => None,
        },
        _ => None,
    }
}

fn is_type_receiver(expr: &Expr, name: &str) -> bool {
    match &expr.kind {
        ExprKind::TypeRef(ty) => ty.name() == Some(name),
        ExprKind::Ident(id) => id == name,
        _ => false,
    }
}

fn receiver_sem(expr: &Expr) -> Option<&SemTy> {
    expr.sem_ty()
}

fn has_length_ref(expr: &Expr) -> bool {
    if let ExprKind::Member { target, name } = &expr.kind {
        if name == "Length" {
            if let Some(sem) = receiver_sem(target) {
                return sem.is_array() || sem.is_string();
            }
        }
    }
    false
}

struct FrameworkRewriter;

impl VisitorMut for FrameworkRewriter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        visit::walk_expr(self, expr);

        // Array and string lengths become the target `length` field.
        if has_length_ref(expr) {
            let ExprKind::Member { target, .. } =
                std::mem::replace(&mut expr.kind, ExprKind::This)
            else {
                unreachable!();
            };
            *expr = Expr::member(*target, "length").with_annot(Annot::Ty(SemTy::Prim(
                PrimTy::Number,
            )));
            return;
        }

        // Math.X: host name where one exists, NMath otherwise.
        if let ExprKind::Member { target, name } = &mut expr.kind {
            if is_type_receiver(target, "Math") {
                match MATH_MEMBERS.iter().find(|(from, _)| from == name) {
                    Some((_, to)) => *name = to.to_string(),
                    None => **target = Expr::type_ref(Ty::named("NMath")),
                }
                return;
            }
            for (from, to) in STATIC_SHIMS {
                if is_type_receiver(target, from) {
                    **target = Expr::type_ref(Ty::named(*to));
                    return;
                }
            }
        }

        // Instance helpers on scalar receivers.
        let ExprKind::Invoke { target, .. } = &expr.kind else {
            return;
        };
        let ExprKind::Member { target: recv, name } = &target.kind else {
            return;
        };
        let Some(sem) = receiver_sem(recv) else {
            return;
        };
        // String equality is just value equality in the target.
        if sem.is_string() && name == "Equals" {
            let ExprKind::Invoke { target, args } =
                std::mem::replace(&mut expr.kind, ExprKind::This)
            else {
                unreachable!();
            };
            let ExprKind::Member { target: recv, .. } = target.kind else {
                unreachable!();
            };
            let mut args = args;
            let right = args.remove(0);
            *expr = Expr::binary(*recv, BinOp::Eq, right)
                .with_annot(Annot::Ty(SemTy::Prim(PrimTy::Bool)));
            return;
        }
        let Some((shim, generic_prefix)) = scalar_shim(sem) else {
            return;
        };
        let annot = expr.annot.take();
        let ExprKind::Invoke { target, args } = std::mem::replace(&mut expr.kind, ExprKind::This)
        else {
            unreachable!();
        };
        let ExprKind::Member { target: recv, name } = target.kind else {
            unreachable!();
        };
        let name = if generic_prefix {
            format!("Generic{}", name)
        } else {
            name
        };
        let mut shim_args = vec![*recv];
        shim_args.extend(args);
        *expr = Expr::static_call(shim, &name, shim_args);
        expr.annot = annot;
    }
}

impl Pass for ReplaceFrameworkMembers {
    fn name(&self) -> &'static str {
        "replace-framework-members"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        FrameworkRewriter.visit_module(module);
        Ok(())
    }
}

// --- CharsToNumbers ---

/// Characters are numbers in the target. Char literals keep their original
/// spelling as a trailing comment, and string indexing reads a code point.
pub struct CharsToNumbers;

struct CharRewriter;

impl VisitorMut for CharRewriter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        visit::walk_expr(self, expr);
        match &mut expr.kind {
            ExprKind::Lit(lit @ Lit::Char(_)) => {
                let Lit::Char(c) = *lit else { unreachable!() };
                *lit = Lit::CharCode {
                    code: c as u32,
                    text: c.to_string(),
                };
            }
            ExprKind::Index { target, args }
                if args.len() == 1
                    && target.sem_ty().is_some_and(SemTy::is_string) =>
            {
                let ExprKind::Index { target, args } =
                    std::mem::replace(&mut expr.kind, ExprKind::This)
                else {
                    unreachable!();
                };
                *expr = Expr::invoke(Expr::member(*target, "charCodeAt"), args)
                    .with_annot(Annot::Ty(SemTy::Prim(PrimTy::Number)));
            }
            _ => {}
        }
    }
}

impl Pass for CharsToNumbers {
    fn name(&self) -> &'static str {
        "chars-to-numbers"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        CharRewriter.visit_module(module);
        Ok(())
    }
}

// --- ErasePrimitiveTypes ---

/// Collapses every scalar type to the target's `number`/`boolean`/`string`/
/// `any`, and unwraps nullables. Semantic annotations are left alone; they
/// record what the front end resolved.
pub struct ErasePrimitiveTypes;

struct TypeEraser;

impl VisitorMut for TypeEraser {
    fn visit_ty(&mut self, ty: &mut Ty) {
        if let TyKind::Nullable(inner) = &mut ty.kind {
            let inner = std::mem::replace(
                &mut **inner,
                Ty::prim(PrimTy::Any),
            );
            *ty = inner;
        }
        if let TyKind::Prim(p) = &mut ty.kind {
            *p = p.erased();
        }
        visit::walk_ty(self, ty);
    }
}

impl Pass for ErasePrimitiveTypes {
    fn name(&self) -> &'static str {
        "erase-primitive-types"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        TypeEraser.visit_module(module);
        Ok(())
    }
}

// --- ReplaceDefaultValues ---

/// The value a variable of `ty` holds before assignment: zero for numerics
/// and enums, false for booleans, a zero-initialized instance for value
/// types, null for everything else.
pub(crate) fn default_value_expr(ty: &Ty) -> Expr {
    match &ty.kind {
        TyKind::Prim(p) => match p.erased() {
            PrimTy::Number => Expr::int(0),
            PrimTy::Bool => Expr::bool(false),
            _ => Expr::null(),
        },
        TyKind::Named { .. } => match &ty.annot {
            Some(SemTy::Named {
                shape: TypeShape::Enum,
                ..
            }) => Expr::int(0),
            Some(SemTy::Named {
                shape: TypeShape::Struct,
                ..
            }) => Expr::new_obj(ty.clone(), vec![]),
            _ => Expr::null(),
        },
        TyKind::Nullable(_) | TyKind::Array(_) | TyKind::Func { .. } => Expr::null(),
    }
}

/// Rewrites `default(T)` expressions to the value they denote.
pub struct ReplaceDefaultValues;

struct DefaultRewriter;

impl VisitorMut for DefaultRewriter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        visit::walk_expr(self, expr);
        if let ExprKind::Default(ty) = &expr.kind {
            let value = default_value_expr(ty);
            *expr = value;
        }
    }
}

impl Pass for ReplaceDefaultValues {
    fn name(&self) -> &'static str {
        "replace-default-values"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        DefaultRewriter.visit_module(module);
        Ok(())
    }
}

// --- FillNewArrays ---

/// A sized array allocation leaves every element undefined in the target
/// until written. After `xs = new T[n]`, insert a loop assigning each element
/// its source-language default, unless the code's first use of the array is
/// already an element write.
pub struct FillNewArrays;

fn sized_uninit_array(expr: &Expr) -> Option<&Ty> {
    match &expr.kind {
        ExprKind::NewArray {
            elem_ty,
            len: Some(len),
            init,
        } if init.is_empty() && !matches!(len.kind, ExprKind::Lit(Lit::Int(0))) => Some(elem_ty),
        _ => None,
    }
}

/// Structural identity for the simple assignment targets these statements
/// use: identifiers, `this`, and member chains over them.
fn same_var(a: &Expr, b: &Expr) -> bool {
    match (&a.kind, &b.kind) {
        (ExprKind::Ident(x), ExprKind::Ident(y)) => x == y,
        (ExprKind::This, ExprKind::This) => true,
        (
            ExprKind::Member {
                target: at,
                name: an,
            },
            ExprKind::Member {
                target: bt,
                name: bn,
            },
        ) => an == bn && same_var(at, bt),
        _ => false,
    }
}

fn is_simple_target(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::This => true,
        ExprKind::Member { target, .. } => is_simple_target(target),
        _ => false,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ArrayUse {
    Read,
    Write,
}

struct FirstElementUse {
    var: Expr,
    found: Option<ArrayUse>,
}

impl VisitorMut for FirstElementUse {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if self.found.is_some() {
            return;
        }
        if let ExprKind::Assign { target, .. } = &expr.kind {
            if let ExprKind::Index { target: recv, .. } = &target.kind {
                if same_var(recv, &self.var) {
                    self.found = Some(ArrayUse::Write);
                    return;
                }
            }
        }
        if let ExprKind::Index { target, .. } = &expr.kind {
            if same_var(target, &self.var) {
                self.found = Some(ArrayUse::Read);
                return;
            }
        }
        visit::walk_expr(self, expr);
    }
}

fn first_element_use(stmts: &[Stmt], var: &Expr) -> Option<ArrayUse> {
    let mut finder = FirstElementUse {
        var: var.clone(),
        found: None,
    };
    for stmt in stmts {
        let mut probe = stmt.clone();
        finder.visit_stmt(&mut probe);
        if finder.found.is_some() {
            break;
        }
    }
    finder.found
}

fn index_expr(target: Expr, arg: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        target: Box::new(target),
        args: vec![arg],
    })
}

fn fill_loop(var: &Expr, elem_ty: &Ty) -> Stmt {
    let i = || Expr::ident("_ai");
    Stmt::For {
        init: vec![Stmt::var_decl(
            "_ai",
            Some(Ty::prim(PrimTy::Number)),
            Some(Expr::int(0)),
        )],
        cond: Some(Expr::binary(
            i(),
            BinOp::Lt,
            Expr::member(var.clone(), "length"),
        )),
        update: vec![Expr::new(ExprKind::Unary {
            op: UnOp::Inc,
            expr: Box::new(i()),
        })],
        body: Box::new(Stmt::Expr(Expr::assign(
            index_expr(var.clone(), i()),
            default_value_expr(elem_ty),
        ))),
    }
}

struct ArrayFiller;

impl VisitorMut for ArrayFiller {
    fn visit_block(&mut self, block: &mut Block) {
        visit::for_each_seq_mut(block, &mut |stmts| {
            let mut i = 0;
            while i < stmts.len() {
                let created = match &stmts[i] {
                    Stmt::VarDecl {
                        name,
                        init: Some(e),
                        ..
                    } => sized_uninit_array(e).map(|t| (Expr::ident(name.clone()), t.clone())),
                    Stmt::Expr(Expr {
                        kind:
                            ExprKind::Assign {
                                target,
                                op: AssignOp::Assign,
                                value,
                            },
                        ..
                    }) if is_simple_target(target) => {
                        sized_uninit_array(value).map(|t| ((**target).clone(), t.clone()))
                    }
                    _ => None,
                };
                if let Some((var, elem_ty)) = created {
                    if first_element_use(&stmts[i + 1..], &var) != Some(ArrayUse::Write) {
                        stmts.insert(i + 1, fill_loop(&var, &elem_ty));
                        i += 1;
                    }
                }
                i += 1;
            }
        });
    }
}

impl Pass for FillNewArrays {
    fn name(&self) -> &'static str {
        "fill-new-arrays"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        ArrayFiller.visit_module(module);
        Ok(())
    }
}

// --- InitializeFields ---

/// Fields without an initializer are undefined in the target until written;
/// give each one its source-language default so reads before assignment
/// behave the same.
pub struct InitializeFields;

impl Pass for InitializeFields {
    fn name(&self) -> &'static str {
        "initialize-fields"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            if ty.kind == TypeKind::Interface {
                continue;
            }
            for member in &mut ty.members {
                let Member::Field(f) = member else {
                    continue;
                };
                if f.init.is_none() {
                    f.init = Some(default_value_expr(&f.ty));
                }
            }
        }
        Ok(())
    }
}

// --- FixCatches ---

/// The target allows one untyped catch clause per try. Typed clauses merge
/// into a single clause whose body tests the caught value against each
/// original clause's type in order; without a catch-all, the value is
/// rethrown.
pub struct FixCatches;

fn is_catch_all(clause: &CatchClause) -> bool {
    match &clause.ty {
        None => true,
        Some(ty) => match &ty.kind {
            TyKind::Prim(PrimTy::Object | PrimTy::Any) => true,
            TyKind::Named { name, .. } => name == "Exception" || name == "Error",
            _ => false,
        },
    }
}

fn rename_catch_var(body: &mut Block, from: &str, to: &str) {
    struct Renamer {
        from: String,
        to: String,
    }
    impl VisitorMut for Renamer {
        fn visit_expr(&mut self, expr: &mut Expr) {
            if let ExprKind::Ident(name) = &mut expr.kind {
                if *name == self.from {
                    *name = self.to.clone();
                }
            }
            visit::walk_expr(self, expr);
        }
    }
    Renamer {
        from: from.to_string(),
        to: to.to_string(),
    }
    .visit_block(body);
}

fn merge_catches(catches: Vec<CatchClause>) -> Vec<CatchClause> {
    if catches.is_empty() {
        return catches;
    }
    if catches.len() == 1 && is_catch_all(&catches[0]) {
        let Some(mut only) = catches.into_iter().next() else {
            return Vec::new();
        };
        only.ty = None;
        if only.var.is_none() {
            only.var = Some("_ex".to_string());
        }
        return vec![only];
    }

    let merged_var = catches
        .iter()
        .find_map(|c| c.var.clone())
        .unwrap_or_else(|| "_ex".to_string());
    let mut branches: Vec<(Option<Expr>, Stmt)> = Vec::new();
    let mut saw_catch_all = false;
    for mut clause in catches {
        if let Some(var) = &clause.var {
            if *var != merged_var {
                rename_catch_var(&mut clause.body, var, &merged_var);
            }
        }
        let body = Stmt::Block(clause.body.clone());
        if is_catch_all(&clause) {
            branches.push((None, body));
            saw_catch_all = true;
            break;
        }
        let ty = match clause.ty {
            Some(t) => t,
            None => continue,
        };
        let guard = Expr::is_test(Expr::ident(merged_var.clone()), ty);
        branches.push((Some(guard), body));
    }
    if !saw_catch_all {
        branches.push((None, Stmt::Throw(Some(Expr::ident(merged_var.clone())))));
    }

    let mut chain = match branches.pop() {
        Some((_, stmt)) => stmt,
        None => Stmt::Block(Block::default()),
    };
    while let Some((guard, stmt)) = branches.pop() {
        match guard {
            Some(g) => chain = Stmt::if_else(g, stmt, chain),
            None => chain = stmt,
        }
    }
    vec![CatchClause {
        var: Some(merged_var),
        ty: None,
        body: Block::new(vec![chain]),
    }]
}

struct CatchFixer;

impl VisitorMut for CatchFixer {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        visit::walk_stmt(self, stmt);
        if let Stmt::Try { catches, .. } = stmt {
            if catches.iter().any(|c| c.ty.is_some() || c.var.is_none()) || catches.len() > 1 {
                let taken = std::mem::take(catches);
                *catches = merge_catches(taken);
            }
        }
    }
}

impl Pass for FixCatches {
    fn name(&self) -> &'static str {
        "fix-catches"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        CatchFixer.visit_module(module);
        Ok(())
    }
}

// --- FixEmptyThrow ---

/// A bare rethrow has no target-side form; it becomes an explicit throw of
/// the enclosing catch variable.
pub struct FixEmptyThrow;

struct ThrowFixer<'d> {
    catch_var: Option<String>,
    diags: &'d mut Diagnostics,
}

impl VisitorMut for ThrowFixer<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                self.visit_block(body);
                // Catch bodies see their own variable; the try body and
                // finally keep the enclosing one.
                for clause in catches {
                    let saved =
                        std::mem::replace(&mut self.catch_var, clause.var.clone());
                    self.visit_block(&mut clause.body);
                    self.catch_var = saved;
                }
                if let Some(fin) = finally {
                    self.visit_block(fin);
                }
            }
            Stmt::Throw(None) => match &self.catch_var {
                Some(var) => *stmt = Stmt::Throw(Some(Expr::ident(var.clone()))),
                None => self.diags.warn(
                    "fix-empty-throw",
                    "<body>",
                    "bare throw outside of a catch clause",
                ),
            },
            _ => visit::walk_stmt(self, stmt),
        }
    }
}

impl Pass for FixEmptyThrow {
    fn name(&self) -> &'static str {
        "fix-empty-throw"
    }

    fn run(&mut self, module: &mut Module, diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let mut fixer = ThrowFixer {
            catch_var: None,
            diags,
        };
        fixer.visit_module(module);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_rewrite.rs"]
mod tests;
