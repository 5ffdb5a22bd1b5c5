//! In-place tree traversal. Passes implement [`VisitorMut`] and override the
//! hooks they care about; each hook defaults to the matching `walk_*` free
//! function, which descends into children. An override that still wants the
//! descent calls `walk_*` itself.

use crate::ast::*;

pub trait VisitorMut {
    fn visit_module(&mut self, module: &mut Module) {
        walk_module(self, module);
    }

    fn visit_decl(&mut self, decl: &mut Decl) {
        walk_decl(self, decl);
    }

    fn visit_type_decl(&mut self, ty: &mut TypeDecl) {
        walk_type_decl(self, ty);
    }

    fn visit_member(&mut self, member: &mut Member) {
        walk_member(self, member);
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
    }

    fn visit_ty(&mut self, ty: &mut Ty) {
        walk_ty(self, ty);
    }
}

pub fn walk_module<V: VisitorMut + ?Sized>(v: &mut V, module: &mut Module) {
    for decl in &mut module.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: VisitorMut + ?Sized>(v: &mut V, decl: &mut Decl) {
    match decl {
        Decl::Namespace(ns) => {
            for d in &mut ns.decls {
                v.visit_decl(d);
            }
        }
        Decl::Type(t) => v.visit_type_decl(t),
    }
}

pub fn walk_type_decl<V: VisitorMut + ?Sized>(v: &mut V, ty: &mut TypeDecl) {
    for base in &mut ty.base_types {
        v.visit_ty(base);
    }
    for member in &mut ty.members {
        v.visit_member(member);
    }
}

pub fn walk_member<V: VisitorMut + ?Sized>(v: &mut V, member: &mut Member) {
    match member {
        Member::Field(f) => {
            v.visit_ty(&mut f.ty);
            if let Some(init) = &mut f.init {
                v.visit_expr(init);
            }
        }
        Member::Method(m) => {
            v.visit_ty(&mut m.ret);
            for p in &mut m.params {
                walk_param(v, p);
            }
            if let Some(body) = &mut m.body {
                v.visit_block(body);
            }
        }
        Member::Ctor(c) => {
            for p in &mut c.params {
                walk_param(v, p);
            }
            if let Some(init) = &mut c.init {
                for arg in &mut init.args {
                    v.visit_expr(arg);
                }
            }
            v.visit_block(&mut c.body);
        }
        Member::Property(p) => {
            v.visit_ty(&mut p.ty);
            if let Some(Accessor { body: Some(b) }) = &mut p.getter {
                v.visit_block(b);
            }
            if let Some(Accessor { body: Some(b) }) = &mut p.setter {
                v.visit_block(b);
            }
        }
        Member::Indexer(i) => {
            v.visit_ty(&mut i.ty);
            for p in &mut i.params {
                walk_param(v, p);
            }
            if let Some(Accessor { body: Some(b) }) = &mut i.getter {
                v.visit_block(b);
            }
            if let Some(Accessor { body: Some(b) }) = &mut i.setter {
                v.visit_block(b);
            }
        }
        Member::Operator(o) => {
            v.visit_ty(&mut o.ret);
            for p in &mut o.params {
                walk_param(v, p);
            }
            v.visit_block(&mut o.body);
        }
        Member::Event(e) => v.visit_ty(&mut e.ty),
        Member::Delegate(d) => {
            v.visit_ty(&mut d.ret);
            for p in &mut d.params {
                walk_param(v, p);
            }
        }
        Member::EnumMember(m) => {
            if let Some(value) = &mut m.value {
                v.visit_expr(value);
            }
        }
        Member::Type(t) => v.visit_type_decl(t),
    }
}

fn walk_param<V: VisitorMut + ?Sized>(v: &mut V, param: &mut Param) {
    v.visit_ty(&mut param.ty);
    if let Some(default) = &mut param.default {
        v.visit_expr(default);
    }
}

pub fn walk_block<V: VisitorMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Block(b) => v.visit_block(b),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(e) = else_branch {
                v.visit_stmt(e);
            }
        }
        Stmt::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        Stmt::DoWhile { body, cond } => {
            v.visit_stmt(body);
            v.visit_expr(cond);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            for s in init {
                v.visit_stmt(s);
            }
            if let Some(c) = cond {
                v.visit_expr(c);
            }
            for u in update {
                v.visit_expr(u);
            }
            v.visit_stmt(body);
        }
        Stmt::Switch {
            scrutinee,
            sections,
        } => {
            v.visit_expr(scrutinee);
            for sec in sections {
                for label in &mut sec.labels {
                    if let CaseLabel::Case(e) = label {
                        v.visit_expr(e);
                    }
                }
                for s in &mut sec.stmts {
                    v.visit_stmt(s);
                }
            }
        }
        Stmt::Label(_) | Stmt::Goto(_) | Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Return(e) | Stmt::Throw(e) => {
            if let Some(e) = e {
                v.visit_expr(e);
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            v.visit_block(body);
            for c in catches {
                if let Some(ty) = &mut c.ty {
                    v.visit_ty(ty);
                }
                v.visit_block(&mut c.body);
            }
            if let Some(fin) = finally {
                v.visit_block(fin);
            }
        }
        Stmt::Expr(e) => v.visit_expr(e),
        Stmt::VarDecl { ty, init, .. } => {
            if let Some(ty) = ty {
                v.visit_ty(ty);
            }
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
    }
}

pub fn walk_expr<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Ident(_) | ExprKind::This | ExprKind::Base | ExprKind::Lit(_) => {}
        ExprKind::Member { target, .. } => v.visit_expr(target),
        ExprKind::TypeRef(ty) | ExprKind::TypeOf(ty) | ExprKind::Default(ty) => v.visit_ty(ty),
        ExprKind::Invoke { target, args } => {
            v.visit_expr(target);
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::New { ty, args } => {
            v.visit_ty(ty);
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::NewArray { elem_ty, len, init } => {
            v.visit_ty(elem_ty);
            if let Some(l) = len {
                v.visit_expr(l);
            }
            for e in init {
                v.visit_expr(e);
            }
        }
        ExprKind::Index { target, args } => {
            v.visit_expr(target);
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Unary { expr, .. } => v.visit_expr(expr),
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Cond {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        ExprKind::Lambda { params, body } => {
            for p in params {
                walk_param(v, p);
            }
            v.visit_block(body);
        }
        ExprKind::Is { expr, ty } | ExprKind::As { expr, ty } | ExprKind::Cast { ty, expr } => {
            v.visit_expr(expr);
            v.visit_ty(ty);
        }
    }
}

pub fn walk_ty<V: VisitorMut + ?Sized>(v: &mut V, ty: &mut Ty) {
    match &mut ty.kind {
        TyKind::Prim(_) => {}
        TyKind::Named { args, .. } => {
            for a in args {
                v.visit_ty(a);
            }
        }
        TyKind::Array(t) | TyKind::Nullable(t) => v.visit_ty(t),
        TyKind::Func { params, ret } => {
            for p in params {
                v.visit_ty(&mut p.ty);
            }
            v.visit_ty(ret);
        }
    }
}

/// Applies `f` to every statement sequence in `block`, outermost first. A
/// sequence is any `Vec<Stmt>` position: block bodies, switch sections, for
/// initializers, try/catch/finally bodies. Single-statement positions (loop
/// bodies, if branches) are not sequences and are only descended through.
pub fn for_each_seq_mut(block: &mut Block, f: &mut impl FnMut(&mut Vec<Stmt>)) {
    f(&mut block.stmts);
    for stmt in &mut block.stmts {
        seq_in_stmt(stmt, f);
    }
}

fn seq_in_stmt(stmt: &mut Stmt, f: &mut impl FnMut(&mut Vec<Stmt>)) {
    match stmt {
        Stmt::Block(b) => for_each_seq_mut(b, f),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            seq_in_stmt(then_branch, f);
            if let Some(e) = else_branch {
                seq_in_stmt(e, f);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => seq_in_stmt(body, f),
        Stmt::For { init, body, .. } => {
            f(init);
            for s in init.iter_mut() {
                seq_in_stmt(s, f);
            }
            seq_in_stmt(body, f);
        }
        Stmt::Switch { sections, .. } => {
            for sec in sections {
                f(&mut sec.stmts);
                for s in &mut sec.stmts {
                    seq_in_stmt(s, f);
                }
            }
        }
        Stmt::Try {
            body,
            catches,
            finally,
            ..
        } => {
            for_each_seq_mut(body, f);
            for c in catches {
                for_each_seq_mut(&mut c.body, f);
            }
            if let Some(fin) = finally {
                for_each_seq_mut(fin, f);
            }
        }
        _ => {}
    }
}
