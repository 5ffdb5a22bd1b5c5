//! Declaration reordering. The target binds class references in static
//! initializers and extends-clauses at evaluation time, so every type must
//! be emitted after the types it depends on. Dependencies come from base
//! types and from static field initializers, followed transitively through
//! the static methods and constructors those initializers call.

use indexmap::{IndexMap, IndexSet};

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;

/// Applies `f` to each expression directly held by `stmt`, recursing
/// through nested statements.
fn stmt_exprs(stmt: &Stmt, f: &mut impl FnMut(&Expr)) {
    match stmt {
        Stmt::Block(b) => {
            for s in &b.stmts {
                stmt_exprs(s, f);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            f(cond);
            stmt_exprs(then_branch, f);
            if let Some(e) = else_branch {
                stmt_exprs(e, f);
            }
        }
        Stmt::While { cond, body } => {
            f(cond);
            stmt_exprs(body, f);
        }
        Stmt::DoWhile { body, cond } => {
            stmt_exprs(body, f);
            f(cond);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            for s in init {
                stmt_exprs(s, f);
            }
            if let Some(c) = cond {
                f(c);
            }
            for u in update {
                f(u);
            }
            stmt_exprs(body, f);
        }
        Stmt::Switch {
            scrutinee,
            sections,
        } => {
            f(scrutinee);
            for sec in sections {
                for label in &sec.labels {
                    if let CaseLabel::Case(e) = label {
                        f(e);
                    }
                }
                for s in &sec.stmts {
                    stmt_exprs(s, f);
                }
            }
        }
        Stmt::Return(e) | Stmt::Throw(e) => {
            if let Some(e) = e {
                f(e);
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            for s in &body.stmts {
                stmt_exprs(s, f);
            }
            for c in catches {
                for s in &c.body.stmts {
                    stmt_exprs(s, f);
                }
            }
            if let Some(fin) = finally {
                for s in &fin.stmts {
                    stmt_exprs(s, f);
                }
            }
        }
        Stmt::Expr(e) => f(e),
        Stmt::VarDecl { init, .. } => {
            if let Some(e) = init {
                f(e);
            }
        }
        Stmt::Label(_) | Stmt::Goto(_) | Stmt::Break { .. } | Stmt::Continue { .. } => {}
    }
}

struct RefScan<'m> {
    module: &'m Module,
    current: String,
    refs: IndexSet<String>,
    /// `Type::member` keys already followed; cycles between static methods
    /// must not recurse forever.
    visited: IndexSet<String>,
}

impl RefScan<'_> {
    fn note(&mut self, name: &str) {
        if name != self.current && self.module.find_type(name).is_some() {
            self.refs.insert(name.to_string());
        }
    }

    fn type_of_receiver(&self, recv: &Expr) -> Option<String> {
        let name = match &recv.kind {
            ExprKind::TypeRef(ty) => ty.name()?,
            ExprKind::Ident(n) => n,
            ExprKind::This => return Some(self.current.clone()),
            _ => return None,
        };
        self.module.find_type(name).map(|t| t.name.clone())
    }

    fn scan_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.note(name),
            ExprKind::TypeRef(ty) => {
                if let Some(name) = ty.name() {
                    self.note(name);
                }
            }
            ExprKind::Invoke { target, args } => {
                for a in args {
                    self.scan_expr(a);
                }
                if let ExprKind::Member { target: recv, name } = &target.kind {
                    if let Some(ty_name) = self.type_of_receiver(recv) {
                        self.note(&ty_name);
                        self.follow_methods(&ty_name, name);
                        return;
                    }
                }
                self.scan_expr(target);
            }
            ExprKind::New { ty, args } => {
                for a in args {
                    self.scan_expr(a);
                }
                if let Some(name) = ty.name() {
                    self.note(name);
                    self.follow_ctors(name);
                }
            }
            ExprKind::Member { target, .. } => self.scan_expr(target),
            ExprKind::NewArray { len, init, .. } => {
                if let Some(l) = len {
                    self.scan_expr(l);
                }
                for e in init {
                    self.scan_expr(e);
                }
            }
            ExprKind::Index { target, args } => {
                self.scan_expr(target);
                for a in args {
                    self.scan_expr(a);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.scan_expr(left);
                self.scan_expr(right);
            }
            ExprKind::Unary { expr, .. } => self.scan_expr(expr),
            ExprKind::Assign { target, value, .. } => {
                self.scan_expr(target);
                self.scan_expr(value);
            }
            ExprKind::Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                self.scan_expr(cond);
                self.scan_expr(then_expr);
                self.scan_expr(else_expr);
            }
            ExprKind::Lambda { body, .. } => {
                for s in &body.stmts {
                    stmt_exprs(s, &mut |e| self.scan_expr(e));
                }
            }
            ExprKind::Is { expr, .. }
            | ExprKind::As { expr, .. }
            | ExprKind::Cast { expr, .. } => self.scan_expr(expr),
            ExprKind::This
            | ExprKind::Base
            | ExprKind::TypeOf(_)
            | ExprKind::Lit(_)
            | ExprKind::Default(_) => {}
        }
    }

    fn scan_block(&mut self, block: &Block) {
        for s in &block.stmts {
            stmt_exprs(s, &mut |e| self.scan_expr(e));
        }
    }

    fn follow_methods(&mut self, ty_name: &str, method: &str) {
        let key = format!("{}::{}", ty_name, method);
        if !self.visited.insert(key) {
            return;
        }
        let Some(ty) = self.module.find_type(ty_name) else {
            return;
        };
        let saved = std::mem::replace(&mut self.current, ty_name.to_string());
        for m in ty.methods() {
            if m.name == method {
                if let Some(body) = &m.body {
                    self.scan_block(body);
                }
            }
        }
        self.current = saved;
        self.note(ty_name);
    }

    fn follow_ctors(&mut self, ty_name: &str) {
        let key = format!("{}::constructor", ty_name);
        if !self.visited.insert(key) {
            return;
        }
        let Some(ty) = self.module.find_type(ty_name) else {
            return;
        };
        let saved = std::mem::replace(&mut self.current, ty_name.to_string());
        for member in &ty.members {
            match member {
                Member::Ctor(c) => {
                    if let Some(init) = &c.init {
                        for a in &init.args {
                            self.scan_expr(a);
                        }
                    }
                    self.scan_block(&c.body);
                }
                Member::Field(f) if !f.modifiers.is_static => {
                    if let Some(init) = &f.init {
                        self.scan_expr(init);
                    }
                }
                _ => {}
            }
        }
        self.current = saved;
        self.note(ty_name);
    }
}

/// Everything `ty` must be emitted after.
fn type_refs(module: &Module, ty: &TypeDecl) -> IndexSet<String> {
    let mut scan = RefScan {
        module,
        current: ty.name.clone(),
        refs: IndexSet::new(),
        visited: IndexSet::new(),
    };
    for base in &ty.base_types {
        if let Some(name) = base.name() {
            scan.note(name);
        }
    }
    for f in ty.fields() {
        if f.modifiers.is_static {
            if let Some(init) = &f.init {
                scan.scan_expr(init);
            }
        }
    }
    scan.refs
}

/// Reorders top-level types so dependencies come first. Mutual references
/// are left where the bounded relocation loop last put them.
pub struct OrderClasses;

impl Pass for OrderClasses {
    fn name(&self) -> &'static str {
        "order-classes"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let refs: IndexMap<String, IndexSet<String>> = module
            .types()
            .map(|t| (t.name.clone(), type_refs(module, t)))
            .collect();

        let n = module.decls.len();
        let max_iters = n * n + 1;
        for _ in 0..max_iters {
            let names: Vec<Option<String>> = module
                .decls
                .iter()
                .map(|d| match d {
                    Decl::Type(t) => Some(t.name.clone()),
                    Decl::Namespace(_) => None,
                })
                .collect();
            let mut relocation: Option<(usize, usize)> = None;
            'search: for (i, earlier) in names.iter().enumerate() {
                let Some(earlier) = earlier else { continue };
                let Some(needed) = refs.get(earlier) else { continue };
                for (j, later) in names.iter().enumerate().skip(i + 1) {
                    let Some(later) = later else { continue };
                    let mutual = refs
                        .get(later)
                        .is_some_and(|r| r.contains(earlier));
                    if needed.contains(later) && !mutual {
                        relocation = Some((i, j));
                        break 'search;
                    }
                }
            }
            let Some((i, j)) = relocation else {
                break;
            };
            let moved = module.decls.remove(j);
            module.decls.insert(i, moved);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/t_order.rs"]
mod tests;
