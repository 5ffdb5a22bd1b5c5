//! Member-level lowering: properties, indexers, operators, delegates and
//! events all become plain methods, fields and function types. Access-site
//! rewrites are driven by the front end's member annotations.

use indexmap::{IndexMap, IndexSet};

use crate::ast::*;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::pipeline::Pass;
use crate::visit::{self, VisitorMut};

fn getter_name(prop: &str) -> String {
    format!("get_{}", prop)
}

fn setter_name(prop: &str) -> String {
    format!("set_{}", prop)
}

fn backing_field_name(prop: &str) -> String {
    format!("_{}", prop)
}

/// Receiver for a member of `decl` reached without an explicit target.
fn implicit_receiver(m: &MemberRef) -> Expr {
    if m.is_static {
        Expr::type_ref(Ty::named(m.declaring_type.clone()))
    } else {
        Expr::this()
    }
}

// --- PropertiesToMethods ---

/// Replaces every property with `get_X`/`set_X` methods and rewrites all
/// annotated accesses. Trivial accessors get a private backing field `_X`.
pub struct PropertiesToMethods;

/// Names of the types declared in this module. Accesses to members of other
/// types (framework surface) are left for the framework rewrite.
pub(crate) fn local_type_names(module: &Module) -> IndexSet<String> {
    module.types().map(|t| t.name.clone()).collect()
}

/// A trivial property keeps no logic of its own and lowers to a plain field.
fn is_trivial(prop: &PropertyDecl) -> bool {
    !matches!(prop.getter, Some(Accessor { body: Some(_) }))
        && !matches!(prop.setter, Some(Accessor { body: Some(_) }))
}

/// (declaring type, property) pairs that lower to accessor methods. Trivial
/// properties become fields and their accesses stay plain member accesses.
fn accessor_props(module: &Module) -> IndexSet<(String, String)> {
    let mut props = IndexSet::new();
    for ty in module.types() {
        for member in &ty.members {
            if let Member::Property(p) = member {
                if ty.kind == TypeKind::Interface || !is_trivial(p) {
                    props.insert((ty.name.clone(), p.name.clone()));
                }
            }
        }
    }
    // A trivial property still needs accessors when it implements an
    // interface property, since callers through the interface use them.
    for ty in module.types() {
        for base in &ty.base_types {
            let Some(iface) = base.name().and_then(|n| module.find_type(n)) else {
                continue;
            };
            if iface.kind != TypeKind::Interface {
                continue;
            }
            for member in &iface.members {
                if let Member::Property(p) = member {
                    props.insert((ty.name.clone(), p.name.clone()));
                }
            }
        }
    }
    props
}

fn is_prop_ref(expr: &Expr, props: &IndexSet<(String, String)>) -> bool {
    matches!(
        expr.member_ref(),
        Some(MemberRef {
            kind: MemberKind::Property,
            declaring_type,
            name,
            ..
        }) if props.contains(&(declaring_type.clone(), name.clone()))
    ) && matches!(expr.kind, ExprKind::Member { .. } | ExprKind::Ident(_))
}

/// Splits a property-access expression into (receiver, member ref).
fn split_prop(expr: Expr) -> (Expr, MemberRef) {
    let m = match expr.member_ref() {
        Some(m) => m.clone(),
        None => unreachable!("checked by is_prop_ref"),
    };
    let recv = match expr.kind {
        ExprKind::Member { target, .. } => *target,
        ExprKind::Ident(_) => implicit_receiver(&m),
        _ => unreachable!("checked by is_prop_ref"),
    };
    (recv, m)
}

fn getter_call(recv: Expr, m: &MemberRef) -> Expr {
    let call = Expr::invoke(Expr::member(recv, getter_name(&m.name)), vec![]);
    match &m.ty {
        Some(t) => call.with_annot(Annot::Ty(t.clone())),
        None => call,
    }
}

fn setter_call(recv: Expr, m: &MemberRef, value: Expr) -> Expr {
    Expr::invoke(Expr::member(recv, setter_name(&m.name)), vec![value])
}

struct PropAccessRewriter {
    props: IndexSet<(String, String)>,
}

impl VisitorMut for PropAccessRewriter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let ExprKind::Assign { target, .. } = &expr.kind {
            if is_prop_ref(target, &self.props) {
                let ExprKind::Assign { target, op, value } =
                    std::mem::replace(&mut expr.kind, ExprKind::This)
                else {
                    unreachable!();
                };
                let mut value = *value;
                self.visit_expr(&mut value);
                let (mut recv, m) = split_prop(*target);
                self.visit_expr(&mut recv);
                let value = match op {
                    AssignOp::Assign => value,
                    // Compound assignment reads through the getter first.
                    // The receiver is duplicated, which is fine for the
                    // simple receivers these programs use.
                    AssignOp::Add => {
                        Expr::binary(getter_call(recv.clone(), &m), BinOp::Add, value)
                    }
                    AssignOp::Sub => {
                        Expr::binary(getter_call(recv.clone(), &m), BinOp::Sub, value)
                    }
                };
                *expr = setter_call(recv, &m, value);
                return;
            }
        }
        visit::walk_expr(self, expr);
        if is_prop_ref(expr, &self.props) {
            let taken = std::mem::replace(expr, Expr::this());
            let (recv, m) = split_prop(taken);
            *expr = getter_call(recv, &m);
        }
    }
}

fn accessor_method(
    ty_name: &str,
    prop: &PropertyDecl,
    name: String,
    is_setter: bool,
    body: Option<Block>,
) -> MethodDecl {
    let mut method = MethodDecl::new(name, if is_setter { Ty::prim(PrimTy::Void) } else { prop.ty.clone() });
    method.modifiers = prop.modifiers;
    if is_setter {
        method.params = vec![Param::new("value", prop.ty.clone())];
    }
    method.body = body.or_else(|| {
        // Trivial accessor: read or write the backing field.
        let recv = if prop.modifiers.is_static {
            Expr::type_ref(Ty::named(ty_name))
        } else {
            Expr::this()
        };
        let field = Expr::member(recv, backing_field_name(&prop.name));
        Some(Block::new(vec![if is_setter {
            Stmt::Expr(Expr::assign(field, Expr::ident("value")))
        } else {
            Stmt::Return(Some(field))
        }]))
    });
    method
}

impl Pass for PropertiesToMethods {
    fn name(&self) -> &'static str {
        "properties-to-methods"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let props = accessor_props(module);
        PropAccessRewriter {
            props: props.clone(),
        }
        .visit_module(module);
        for ty in module.types_mut() {
            let is_interface = ty.kind == TypeKind::Interface;
            let ty_name = ty.name.clone();
            let mut members = Vec::with_capacity(ty.members.len());
            for member in ty.members.drain(..) {
                let Member::Property(prop) = member else {
                    members.push(member);
                    continue;
                };
                if !props.contains(&(ty_name.clone(), prop.name.clone())) {
                    // Trivial property: a plain field is enough.
                    members.push(Member::Field(FieldDecl {
                        name: prop.name,
                        modifiers: prop.modifiers,
                        attributes: prop.attributes,
                        ty: prop.ty,
                        init: None,
                    }));
                    continue;
                }
                let needs_backing = !is_interface
                    && (matches!(prop.getter, Some(Accessor { body: None }))
                        || matches!(prop.setter, Some(Accessor { body: None })));
                if needs_backing {
                    members.push(Member::Field(FieldDecl {
                        name: backing_field_name(&prop.name),
                        modifiers: Modifiers {
                            is_private: true,
                            is_static: prop.modifiers.is_static,
                            ..Modifiers::default()
                        },
                        attributes: Vec::new(),
                        ty: prop.ty.clone(),
                        init: None,
                    }));
                }
                if let Some(acc) = prop.getter.clone() {
                    let body = if is_interface { None } else { acc.body };
                    let mut m =
                        accessor_method(&ty_name, &prop, getter_name(&prop.name), false, body);
                    if is_interface {
                        m.body = None;
                    }
                    members.push(Member::Method(m));
                }
                if let Some(acc) = prop.setter.clone() {
                    let body = if is_interface { None } else { acc.body };
                    let mut m =
                        accessor_method(&ty_name, &prop, setter_name(&prop.name), true, body);
                    if is_interface {
                        m.body = None;
                    }
                    members.push(Member::Method(m));
                }
            }
            ty.members = members;
        }
        Ok(())
    }
}

// --- ExpandIndexers ---

/// Rewrites user-defined index accesses (`x[i]` on a type with an indexer)
/// into `get_Item`/`set_Item` calls. Array and string indexing is left
/// alone. Runs to a fixed point since a rewrite can expose another indexer
/// access in its own arguments.
pub struct ExpandIndexers;

fn is_indexer_ref(expr: &Expr, local: &IndexSet<String>) -> bool {
    matches!(
        expr.member_ref(),
        Some(MemberRef {
            kind: MemberKind::Property,
            name,
            declaring_type,
            ..
        }) if name == "Item" && local.contains(declaring_type)
    ) && matches!(expr.kind, ExprKind::Index { .. })
}

struct IndexerRewriter {
    local: IndexSet<String>,
    changed: bool,
}

impl VisitorMut for IndexerRewriter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let ExprKind::Assign { target, .. } = &expr.kind {
            if is_indexer_ref(target, &self.local) {
                let ExprKind::Assign { target, op, value } =
                    std::mem::replace(&mut expr.kind, ExprKind::This)
                else {
                    unreachable!();
                };
                let ExprKind::Index { target: recv, args } = target.kind else {
                    unreachable!("checked by is_indexer_ref");
                };
                let value = match op {
                    AssignOp::Assign => *value,
                    AssignOp::Add | AssignOp::Sub => {
                        let read = Expr::invoke(
                            Expr::member((*recv).clone(), getter_name("Item")),
                            args.clone(),
                        );
                        let bin = if op == AssignOp::Add { BinOp::Add } else { BinOp::Sub };
                        Expr::binary(read, bin, *value)
                    }
                };
                let mut set_args = args;
                set_args.push(value);
                *expr = Expr::invoke(Expr::member(*recv, setter_name("Item")), set_args);
                self.changed = true;
                return;
            }
        }
        visit::walk_expr(self, expr);
        if is_indexer_ref(expr, &self.local) {
            let taken = std::mem::replace(expr, Expr::this());
            let m = match taken.member_ref() {
                Some(m) => m.clone(),
                None => unreachable!("checked by is_indexer_ref"),
            };
            let ExprKind::Index { target, args } = taken.kind else {
                unreachable!("checked by is_indexer_ref");
            };
            let call = Expr::invoke(Expr::member(*target, getter_name("Item")), args);
            *expr = match &m.ty {
                Some(t) => call.with_annot(Annot::Ty(t.clone())),
                None => call,
            };
            self.changed = true;
        }
    }
}

impl Pass for ExpandIndexers {
    fn name(&self) -> &'static str {
        "expand-indexers"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        const MAX_ITERS: usize = 16;
        let local = local_type_names(module);
        for _ in 0..MAX_ITERS {
            let mut rewriter = IndexerRewriter {
                local: local.clone(),
                changed: false,
            };
            rewriter.visit_module(module);
            if !rewriter.changed {
                break;
            }
        }
        Ok(())
    }
}

// --- IndexersToMethods ---

/// Replaces indexer declarations with `get_Item`/`set_Item` methods.
pub struct IndexersToMethods;

impl Pass for IndexersToMethods {
    fn name(&self) -> &'static str {
        "indexers-to-methods"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            let is_interface = ty.kind == TypeKind::Interface;
            let mut members = Vec::with_capacity(ty.members.len());
            for member in ty.members.drain(..) {
                let Member::Indexer(idx) = member else {
                    members.push(member);
                    continue;
                };
                if let Some(acc) = idx.getter {
                    let mut m = MethodDecl::new(getter_name("Item"), idx.ty.clone());
                    m.modifiers = idx.modifiers;
                    m.params = idx.params.clone();
                    m.body = if is_interface { None } else { acc.body };
                    members.push(Member::Method(m));
                }
                if let Some(acc) = idx.setter {
                    let mut m = MethodDecl::new(setter_name("Item"), Ty::prim(PrimTy::Void));
                    m.modifiers = idx.modifiers;
                    m.params = idx.params.clone();
                    m.params.push(Param::new("value", idx.ty.clone()));
                    m.body = if is_interface { None } else { acc.body };
                    members.push(Member::Method(m));
                }
            }
            ty.members = members;
        }
        Ok(())
    }
}

// --- OperatorDeclsToMethods ---

/// Operator declarations become public static methods with the standard
/// `op_*` names.
pub struct OperatorDeclsToMethods;

impl Pass for OperatorDeclsToMethods {
    fn name(&self) -> &'static str {
        "operator-decls-to-methods"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        for ty in module.types_mut() {
            for member in &mut ty.members {
                let Member::Operator(op) = member else {
                    continue;
                };
                let mut m = MethodDecl::new(op.op.method_name(), op.ret.clone());
                m.modifiers = op.modifiers;
                m.modifiers.is_static = true;
                m.params = op.params.clone();
                m.body = Some(op.body.clone());
                *member = Member::Method(m);
            }
        }
        Ok(())
    }
}

// --- ExpandOperators ---

/// Rewrites binary expressions over types that declare a matching operator
/// method into explicit static calls: `a + b` becomes `T.op_Addition(a, b)`.
pub struct ExpandOperators;

const OPERATOR_KINDS: &[OperatorKind] = &[
    OperatorKind::Addition,
    OperatorKind::Subtraction,
    OperatorKind::Multiply,
    OperatorKind::Division,
    OperatorKind::Equality,
    OperatorKind::Inequality,
    OperatorKind::LessThan,
    OperatorKind::LessThanOrEqual,
    OperatorKind::GreaterThan,
    OperatorKind::GreaterThanOrEqual,
];

struct OperatorRewriter {
    /// type name -> operator method names it declares
    registry: IndexMap<String, Vec<&'static str>>,
}

impl OperatorRewriter {
    fn operator_for<'e>(&self, op: BinOp, operand: &'e Expr) -> Option<(&'e str, &'static str)> {
        let name = operand.sem_ty()?.type_name()?;
        let methods = self.registry.get(name)?;
        let wanted = OPERATOR_KINDS
            .iter()
            .find(|k| k.bin_op() == op)?
            .method_name();
        methods.contains(&wanted).then_some((name, wanted))
    }
}

impl VisitorMut for OperatorRewriter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        visit::walk_expr(self, expr);
        let ExprKind::Binary { left, op, right } = &expr.kind else {
            return;
        };
        // The declaring operand wins; for mixed expressions like
        // `scalar * vector` the right side carries the declaration.
        let hit = self
            .operator_for(*op, left)
            .or_else(|| self.operator_for(*op, right));
        let Some((ty_name, method)) = hit else {
            return;
        };
        let ty_name = ty_name.to_string();
        let ExprKind::Binary { left, right, .. } =
            std::mem::replace(&mut expr.kind, ExprKind::This)
        else {
            unreachable!();
        };
        *expr = Expr::static_call(&ty_name, method, vec![*left, *right]);
    }
}

impl Pass for ExpandOperators {
    fn name(&self) -> &'static str {
        "expand-operators"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let mut registry: IndexMap<String, Vec<&'static str>> = IndexMap::new();
        for ty in module.types() {
            let ops: Vec<&'static str> = ty
                .methods()
                .filter(|m| m.modifiers.is_static)
                .filter_map(|m| {
                    OPERATOR_KINDS
                        .iter()
                        .map(|k| k.method_name())
                        .find(|n| *n == m.name)
                })
                .collect();
            if !ops.is_empty() {
                registry.insert(ty.name.clone(), ops);
            }
        }
        OperatorRewriter { registry }.visit_module(module);
        Ok(())
    }
}

// --- InlineDelegates ---

/// Delegate declarations disappear: every reference to a delegate type is
/// replaced by the equivalent function type. Events become plain fields of
/// the `NEvent` shim, initialized in place.
pub struct InlineDelegates;

struct DelegateInliner {
    /// delegate name -> (params, ret)
    sigs: IndexMap<String, (Vec<Param>, Ty)>,
}

impl VisitorMut for DelegateInliner {
    fn visit_ty(&mut self, ty: &mut Ty) {
        visit::walk_ty(self, ty);
        let TyKind::Named { name, .. } = &ty.kind else {
            return;
        };
        if let Some((params, ret)) = self.sigs.get(name) {
            ty.kind = TyKind::Func {
                params: params.clone(),
                ret: Box::new(ret.clone()),
            };
        }
    }
}

impl Pass for InlineDelegates {
    fn name(&self) -> &'static str {
        "inline-delegates"
    }

    fn run(&mut self, module: &mut Module, _diags: &mut Diagnostics) -> Result<(), TranslateError> {
        let mut sigs: IndexMap<String, (Vec<Param>, Ty)> = IndexMap::new();
        for ty in module.types() {
            for member in &ty.members {
                if let Member::Delegate(d) = member {
                    sigs.insert(d.name.clone(), (d.params.clone(), d.ret.clone()));
                }
            }
        }
        for ty in module.types_mut() {
            let mut members = Vec::with_capacity(ty.members.len());
            for member in ty.members.drain(..) {
                match member {
                    Member::Delegate(_) => {}
                    Member::Event(e) => {
                        members.push(Member::Field(FieldDecl {
                            name: e.name,
                            modifiers: e.modifiers,
                            attributes: Vec::new(),
                            ty: Ty::named("NEvent"),
                            init: Some(Expr::new_obj(Ty::named("NEvent"), vec![])),
                        }));
                    }
                    other => members.push(other),
                }
            }
            ty.members = members;
        }
        DelegateInliner { sigs }.visit_module(module);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/t_members.rs"]
mod tests;
