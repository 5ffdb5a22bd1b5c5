use super::*;
use crate::ast::*;
use crate::merge::ctors::MergeCtors;
use crate::test_util::*;

#[test]
fn test_unify_params_marks_optional_past_min_arity() {
    let one = vec![Param::new("x", int_ty())];
    let two = vec![Param::new("x", int_ty()), Param::new("y", int_ty())];
    let unified = unify_params(&[&one, &two]);
    assert_eq!(unified.len(), 2);
    assert!(!unified[0].optional);
    assert!(unified[1].optional);
    assert_eq!(unified[0].ty, int_ty());
}

#[test]
fn test_unify_params_widens_disagreeing_types() {
    let a = vec![Param::new("n", int_ty())];
    let b = vec![Param::new("s", str_ty())];
    let unified = unify_params(&[&a, &b]);
    assert_eq!(unified[0].ty, Ty::prim(PrimTy::Any));
    assert_eq!(unified[0].name, "nOrS");
}

#[test]
fn test_guard_ty_skips_unverifiable_types() {
    assert_eq!(guard_ty(&Ty::prim(PrimTy::I32)), Some(Ty::named("Number")));
    assert_eq!(guard_ty(&Ty::prim(PrimTy::Str)), Some(Ty::named("String")));
    assert_eq!(guard_ty(&Ty::array(int_ty())), Some(Ty::named("Array")));
    let iface = Ty::named("IReader").with_annot(SemTy::named("IReader", TypeShape::Interface));
    assert_eq!(guard_ty(&iface), None);
    let en = Ty::named("Color").with_annot(SemTy::named("Color", TypeShape::Enum));
    assert_eq!(guard_ty(&en), Some(Ty::named("Number")));
    let func = Ty {
        kind: TyKind::Func {
            params: vec![],
            ret: Box::new(Ty::prim(PrimTy::Void)),
        },
        annot: None,
    };
    assert_eq!(guard_ty(&func), None);
}

fn overloaded_class() -> TypeDecl {
    class(
        "Counter",
        vec![
            Member::Method(void_method(
                "add",
                vec![Param::new("x", int_ty())],
                vec![trace(1)],
            )),
            Member::Method(void_method(
                "add",
                vec![Param::new("x", int_ty()), Param::new("y", int_ty())],
                vec![trace(2)],
            )),
        ],
    )
}

#[test]
fn test_merge_overloads_two_arities() {
    let mut module = module_of(vec![overloaded_class()]);
    run_pass(MergeOverloads, &mut module);

    let cls = first_type(&module);
    let names: Vec<&str> = cls.methods().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["add", "add_0", "add_1"]);

    let dispatcher = find_method(cls, "add");
    assert_eq!(dispatcher.params.len(), 2);
    assert!(dispatcher.params[1].optional);
    let body = dispatcher.body.as_ref().expect("dispatcher body");
    // One if with the arity-1 guard; the arity-2 overload is the terminal
    // else branch.
    match &body.stmts[0] {
        Stmt::If {
            cond, else_branch, ..
        } => {
            assert!(else_branch.is_some());
            // arguments.length == 1, conjoined with a Number test on x.
            match &cond.kind {
                ExprKind::Binary { op: BinOp::And, left, .. } => match &left.kind {
                    ExprKind::Binary { op: BinOp::Eq, right, .. } => {
                        assert_eq!(**right, Expr::int(1));
                    }
                    other => panic!("unexpected arity guard: {:?}", other),
                },
                other => panic!("unexpected guard: {:?}", other),
            }
        }
        other => panic!("dispatcher is not an if chain: {:?}", other),
    }

    for name in ["add_0", "add_1"] {
        assert!(find_method(cls, name).modifiers.is_private, "{} is private", name);
    }
}

#[test]
fn test_merge_overloads_static_group_dispatches_on_type() {
    let mut a = void_method("parse", vec![Param::new("s", str_ty())], vec![]);
    a.modifiers.is_static = true;
    let mut b = void_method("parse", vec![Param::new("n", int_ty())], vec![]);
    b.modifiers.is_static = true;
    let mut module = module_of(vec![class("P", vec![Member::Method(a), Member::Method(b)])]);

    run_pass(MergeOverloads, &mut module);

    let cls = first_type(&module);
    let dispatcher = find_method(cls, "parse");
    assert!(dispatcher.modifiers.is_static);
    assert_eq!(dispatcher.params[0].name, "sOrN");
    let body = dispatcher.body.as_ref().expect("body");
    // Same arity on both sides, so the runtime type test is what separates
    // them; the forwarding receiver is the type itself.
    match &body.stmts[0] {
        Stmt::If { then_branch, .. } => match &**then_branch {
            Stmt::Expr(Expr {
                kind: ExprKind::Invoke { target, .. },
                ..
            }) => match &target.kind {
                ExprKind::Member { target, name } => {
                    assert_eq!(name, "parse_0");
                    assert!(matches!(target.kind, ExprKind::TypeRef(_)));
                }
                other => panic!("unexpected call target: {:?}", other),
            },
            other => panic!("unexpected branch: {:?}", other),
        },
        other => panic!("dispatcher is not an if chain: {:?}", other),
    }
}

#[test]
fn test_merge_overloads_skips_singletons() {
    let mut module = module_of(vec![class(
        "S",
        vec![Member::Method(void_method("only", vec![], vec![]))],
    )]);
    let before = module.clone();
    run_pass(MergeOverloads, &mut module);
    assert_eq!(module, before);
}

#[test]
fn test_interface_overloads_collapse_to_one_signature() {
    let mut a = MethodDecl::new("read", int_ty());
    a.params = vec![Param::new("i", int_ty())];
    a.body = None;
    let mut b = MethodDecl::new("read", int_ty());
    b.params = vec![Param::new("i", int_ty()), Param::new("len", int_ty())];
    b.body = None;
    let mut iface = class("IReader", vec![Member::Method(a), Member::Method(b)]);
    iface.kind = TypeKind::Interface;
    let mut module = module_of(vec![iface]);

    run_pass(MergeOverloads, &mut module);

    let iface = first_type(&module);
    let methods: Vec<&MethodDecl> = iface.methods().collect();
    assert_eq!(methods.len(), 1, "one unified signature");
    assert_eq!(methods[0].name, "read");
    assert!(methods[0].body.is_none());
    assert!(methods[0].params[1].optional);
}

// --- constructors ---

fn ctor(params: Vec<Param>, init: Option<CtorInit>, stmts: Vec<Stmt>) -> CtorDecl {
    let mut c = CtorDecl::new();
    c.params = params;
    c.init = init;
    c.body = Block::new(stmts);
    c
}

#[test]
fn test_class_without_ctor_gains_one() {
    let mut with_base = class("Child", vec![]);
    with_base.base_types = vec![Ty::named("Parent")];
    let mut module = module_of(vec![class("Root", vec![]), with_base]);

    run_pass(MergeCtors, &mut module);

    let root = module.find_type("Root").expect("Root");
    let c = root.ctors().next().expect("ctor added");
    assert!(c.init.is_none());
    let child = module.find_type("Child").expect("Child");
    let c = child.ctors().next().expect("ctor added");
    assert_eq!(
        c.init,
        Some(CtorInit {
            kind: CtorInitKind::Base,
            args: vec![],
        })
    );
}

#[test]
fn test_two_ctors_merge_into_dispatcher() {
    let mut cls = class(
        "Point",
        vec![
            Member::Ctor(ctor(vec![], None, vec![trace(1)])),
            Member::Ctor(ctor(
                vec![Param::new("x", int_ty())],
                Some(CtorInit {
                    kind: CtorInitKind::Base,
                    args: vec![var("x")],
                }),
                vec![trace(2)],
            )),
        ],
    );
    cls.base_types = vec![Ty::named("Shape")];
    let mut module = module_of(vec![cls]);

    run_pass(MergeCtors, &mut module);

    let cls = first_type(&module);
    let ctors: Vec<&CtorDecl> = cls.ctors().collect();
    assert_eq!(ctors.len(), 1, "exactly one constructor remains");
    let dispatcher = ctors[0];
    assert_eq!(dispatcher.params.len(), 1);
    assert!(dispatcher.params[0].optional);

    let names: Vec<&str> = cls.methods().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["constructor_0", "constructor_1"]);

    // Each branch initializes the base class, then forwards.
    match &dispatcher.body.stmts[0] {
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            let Stmt::Block(then) = &**then_branch else {
                panic!("branch is not a block");
            };
            assert!(
                matches!(&then.stmts[0], Stmt::Expr(Expr { kind: ExprKind::Invoke { target, .. }, .. })
                    if matches!(target.kind, ExprKind::Base)),
                "branch starts with the base initializer"
            );
            let Stmt::Block(els) = &**else_branch.as_ref().expect("else branch") else {
                panic!("else branch is not a block");
            };
            // The second overload's base args come from the unified params.
            match &els.stmts[0] {
                Stmt::Expr(Expr {
                    kind: ExprKind::Invoke { target, args },
                    ..
                }) => {
                    assert!(matches!(target.kind, ExprKind::Base));
                    assert_eq!(args[0], var("x"));
                }
                other => panic!("unexpected else prologue: {:?}", other),
            }
        }
        other => panic!("dispatcher is not an if chain: {:?}", other),
    }
}

#[test]
fn test_this_chained_ctor_inlines_its_target() {
    let mut cls = class(
        "Buf",
        vec![
            Member::Ctor(ctor(
                vec![],
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    args: vec![Expr::int(16)],
                }),
                vec![],
            )),
            Member::Ctor(ctor(
                vec![Param::new("cap", int_ty())],
                Some(CtorInit {
                    kind: CtorInitKind::Base,
                    args: vec![var("cap")],
                }),
                vec![trace(1)],
            )),
        ],
    );
    cls.base_types = vec![Ty::named("Base")];
    let mut module = module_of(vec![cls]);

    run_pass(MergeCtors, &mut module);

    let cls = first_type(&module);
    let dispatcher = cls.ctors().next().expect("dispatcher");
    let Stmt::If { then_branch, .. } = &dispatcher.body.stmts[0] else {
        panic!("dispatcher is not an if chain");
    };
    let Stmt::Block(then) = &**then_branch else {
        panic!("branch is not a block");
    };
    // super(16) through the chained target's base args, the target's body,
    // then this overload's own body.
    assert_eq!(then.stmts.len(), 3);
    match &then.stmts[0] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { target, args },
            ..
        }) => {
            assert!(matches!(target.kind, ExprKind::Base));
            assert_eq!(args[0], Expr::int(16));
        }
        other => panic!("unexpected prologue: {:?}", other),
    }
    match &then.stmts[1] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { target, args },
            ..
        }) => {
            match &target.kind {
                ExprKind::Member { name, .. } => assert_eq!(name, "constructor_1"),
                other => panic!("unexpected chain call: {:?}", other),
            }
            assert_eq!(args[0], Expr::int(16));
        }
        other => panic!("chained target not inlined: {:?}", other),
    }
}

#[test]
fn test_this_chain_selects_the_same_arity_overload_by_type() {
    // C(int), C(string) and C() : this("hi") — the chain must reach the
    // string overload even though both siblings take one argument.
    let cls = class(
        "C",
        vec![
            Member::Ctor(ctor(vec![Param::new("x", int_ty())], None, vec![trace(1)])),
            Member::Ctor(ctor(vec![Param::new("s", str_ty())], None, vec![trace(2)])),
            Member::Ctor(ctor(
                vec![],
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    args: vec![Expr::new(ExprKind::Lit(Lit::Str("hi".to_string())))],
                }),
                vec![],
            )),
        ],
    );
    let mut module = module_of(vec![cls]);

    run_pass(MergeCtors, &mut module);

    let cls = first_type(&module);
    let dispatcher = cls.ctors().next().expect("dispatcher");
    // The zero-argument overload is the terminal else branch.
    let Stmt::If { else_branch, .. } = &dispatcher.body.stmts[0] else {
        panic!("dispatcher is not an if chain");
    };
    let Stmt::If { else_branch, .. } = &**else_branch.as_ref().expect("second branch") else {
        panic!("dispatcher chain is too short");
    };
    let Stmt::Block(tail) = &**else_branch.as_ref().expect("terminal branch") else {
        panic!("terminal branch is not a block");
    };
    match &tail.stmts[0] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { target, args },
            ..
        }) => {
            match &target.kind {
                ExprKind::Member { name, .. } => assert_eq!(name, "constructor_1"),
                other => panic!("unexpected chain call: {:?}", other),
            }
            assert_eq!(args[0].kind, ExprKind::Lit(Lit::Str("hi".to_string())));
        }
        other => panic!("chain not forwarded: {:?}", other),
    }
}

#[test]
fn test_annotated_this_chain_argument_resolves_class_overloads() {
    // The front end's type annotation separates two class-typed siblings.
    let arg = var("p").with_annot(Annot::Ty(SemTy::named("Pen", TypeShape::Class)));
    let cls = class(
        "Sketch",
        vec![
            Member::Ctor(ctor(
                vec![Param::new("b", Ty::named("Brush"))],
                None,
                vec![trace(1)],
            )),
            Member::Ctor(ctor(
                vec![Param::new("p", Ty::named("Pen"))],
                None,
                vec![trace(2)],
            )),
            Member::Ctor(ctor(
                vec![Param::new("p", Ty::named("Pen")), Param::new("w", int_ty())],
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    args: vec![arg],
                }),
                vec![],
            )),
        ],
    );
    let mut module = module_of(vec![cls]);

    run_pass(MergeCtors, &mut module);

    let cls = first_type(&module);
    let dispatcher = cls.ctors().next().expect("dispatcher");
    let Stmt::If { else_branch, .. } = &dispatcher.body.stmts[0] else {
        panic!("dispatcher is not an if chain");
    };
    let Stmt::If { else_branch, .. } = &**else_branch.as_ref().expect("second branch") else {
        panic!("dispatcher chain is too short");
    };
    let Stmt::Block(tail) = &**else_branch.as_ref().expect("terminal branch") else {
        panic!("terminal branch is not a block");
    };
    assert!(
        matches!(&tail.stmts[0], Stmt::Expr(Expr { kind: ExprKind::Invoke { target, .. }, .. })
            if matches!(&target.kind, ExprKind::Member { name, .. } if name == "constructor_1")),
        "chain bound the wrong sibling: {:?}",
        tail.stmts[0]
    );
}

#[test]
fn test_undecidable_this_chain_is_rejected() {
    // `this(null)` gives no way to pick between two same-arity class-typed
    // overloads; guessing would run the wrong body.
    let cls = class(
        "Doc",
        vec![
            Member::Ctor(ctor(
                vec![Param::new("r", Ty::named("Reader"))],
                None,
                vec![],
            )),
            Member::Ctor(ctor(
                vec![Param::new("w", Ty::named("Writer"))],
                None,
                vec![],
            )),
            Member::Ctor(ctor(
                vec![],
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    args: vec![Expr::null()],
                }),
                vec![],
            )),
        ],
    );
    let mut module = module_of(vec![cls]);

    let mut diags = crate::diagnostics::Diagnostics::new();
    let err = MergeCtors
        .run(&mut module, &mut diags)
        .expect_err("ambiguous chain should fail");
    assert!(err.to_string().contains("ambiguous"), "{}", err);
}

#[test]
fn test_chained_this_initializers_are_rejected() {
    let cls = class(
        "Bad",
        vec![
            Member::Ctor(ctor(
                vec![],
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    args: vec![Expr::int(1)],
                }),
                vec![],
            )),
            Member::Ctor(ctor(
                vec![Param::new("n", int_ty())],
                Some(CtorInit {
                    kind: CtorInitKind::This,
                    args: vec![var("n"), var("n")],
                }),
                vec![],
            )),
            Member::Ctor(ctor(
                vec![Param::new("a", int_ty()), Param::new("b", int_ty())],
                None,
                vec![],
            )),
        ],
    );
    let mut module = module_of(vec![cls]);

    let mut diags = crate::diagnostics::Diagnostics::new();
    let err = MergeCtors
        .run(&mut module, &mut diags)
        .expect_err("chained this-initializers should fail");
    assert!(err.to_string().contains("this-initializer"), "{}", err);
}

#[test]
fn test_ctor_merge_is_idempotent() {
    let mut cls = class(
        "Point",
        vec![
            Member::Ctor(ctor(vec![], None, vec![])),
            Member::Ctor(ctor(vec![Param::new("x", int_ty())], None, vec![])),
        ],
    );
    cls.base_types = vec![Ty::named("Shape")];
    let mut module = module_of(vec![cls]);

    run_pass(MergeCtors, &mut module);
    let once = module.clone();
    run_pass(MergeCtors, &mut module);

    assert_eq!(module, once, "a merged class does not change again");
}
