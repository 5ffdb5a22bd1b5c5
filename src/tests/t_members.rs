use crate::ast::*;
use crate::lower::members::*;
use crate::test_util::*;

fn prop(name: &str, ty: Ty, getter: Option<Option<Block>>, setter: Option<Option<Block>>) -> PropertyDecl {
    PropertyDecl {
        name: name.to_string(),
        modifiers: Modifiers::default(),
        attributes: Vec::new(),
        ty,
        getter: getter.map(|body| Accessor { body }),
        setter: setter.map(|body| Accessor { body }),
    }
}

fn prop_ref(recv: Expr, declaring: &str, name: &str) -> Expr {
    Expr::member(recv, name).with_annot(Annot::Member(MemberRef {
        declaring_type: declaring.to_string(),
        name: name.to_string(),
        kind: MemberKind::Property,
        is_static: false,
        ty: Some(SemTy::Prim(PrimTy::I32)),
    }))
}

#[test]
fn test_trivial_property_becomes_field() {
    let cls = class(
        "Counter",
        vec![
            Member::Property(prop("Count", int_ty(), Some(None), Some(None))),
            Member::Method(void_method(
                "peek",
                vec![],
                vec![Stmt::ret(Some(prop_ref(var("c"), "Counter", "Count")))],
            )),
        ],
    );
    let mut module = module_of(vec![cls]);

    run_pass(PropertiesToMethods, &mut module);

    let cls = first_type(&module);
    let f = cls.fields().next().expect("field");
    assert_eq!(f.name, "Count");
    assert_eq!(f.ty, int_ty());
    // Field access needs no accessor call.
    let body = find_method(cls, "peek").body.as_ref().expect("body");
    match &body.stmts[0] {
        Stmt::Return(Some(e)) => assert!(matches!(e.kind, ExprKind::Member { .. })),
        other => panic!("unexpected stmt: {:?}", other),
    }
}

#[test]
fn test_custom_property_becomes_accessor_methods() {
    let getter_body = Block::new(vec![Stmt::ret(Some(Expr::member(Expr::this(), "n")))]);
    let cls = class(
        "Counter",
        vec![
            Member::Field(field("n", int_ty())),
            Member::Property(prop("Count", int_ty(), Some(Some(getter_body)), Some(None))),
            Member::Method(void_method(
                "bump",
                vec![],
                vec![
                    Stmt::expr(Expr::assign(
                        prop_ref(var("c"), "Counter", "Count"),
                        Expr::int(1),
                    )),
                    Stmt::expr(Expr::new(ExprKind::Assign {
                        target: Box::new(prop_ref(var("c"), "Counter", "Count")),
                        op: AssignOp::Add,
                        value: Box::new(Expr::int(2)),
                    })),
                ],
            )),
        ],
    );
    let mut module = module_of(vec![cls]);

    run_pass(PropertiesToMethods, &mut module);

    let cls = first_type(&module);
    let names: Vec<&str> = cls.methods().map(|m| m.name.as_str()).collect();
    assert!(names.contains(&"get_Count"));
    assert!(names.contains(&"set_Count"));
    // The auto setter wrote a backing field, so one gets declared.
    let fields: Vec<&str> = cls.fields().map(|f| f.name.as_str()).collect();
    assert!(fields.contains(&"_Count"), "backing field declared: {:?}", fields);
    let setter = find_method(cls, "set_Count");
    assert_eq!(setter.params.len(), 1);
    assert_eq!(setter.params[0].name, "value");

    let body = find_method(cls, "bump").body.as_ref().expect("body");
    // Plain assignment goes straight to the setter.
    match &body.stmts[0] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { target, args },
            ..
        }) => {
            match &target.kind {
                ExprKind::Member { name, .. } => assert_eq!(name, "set_Count"),
                other => panic!("unexpected target: {:?}", other),
            }
            assert_eq!(args.len(), 1);
        }
        other => panic!("assignment not rewritten: {:?}", other),
    }
    // Compound assignment reads through the getter.
    match &body.stmts[1] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { args, .. },
            ..
        }) => match &args[0].kind {
            ExprKind::Binary { left, op, .. } => {
                assert_eq!(*op, BinOp::Add);
                match &left.kind {
                    ExprKind::Invoke { target, .. } => match &target.kind {
                        ExprKind::Member { name, .. } => assert_eq!(name, "get_Count"),
                        other => panic!("unexpected inner target: {:?}", other),
                    },
                    other => panic!("compound read not a getter call: {:?}", other),
                }
            }
            other => panic!("unexpected setter argument: {:?}", other),
        },
        other => panic!("compound assignment not rewritten: {:?}", other),
    }
}

#[test]
fn test_interface_property_forces_accessors_on_implementor() {
    let mut iface = class(
        "ICounted",
        vec![Member::Property(prop("Count", int_ty(), Some(None), None))],
    );
    iface.kind = TypeKind::Interface;
    let mut impl_cls = class(
        "Bag",
        vec![Member::Property(prop("Count", int_ty(), Some(None), Some(None)))],
    );
    impl_cls.base_types = vec![Ty::named("ICounted")];
    let mut module = module_of(vec![iface, impl_cls]);

    run_pass(PropertiesToMethods, &mut module);

    let iface = module.find_type("ICounted").expect("ICounted");
    let m = find_method(iface, "get_Count");
    assert!(m.body.is_none(), "interface accessor stays bodiless");
    let bag = module.find_type("Bag").expect("Bag");
    assert!(bag.methods().any(|m| m.name == "get_Count"));
    assert!(bag.fields().any(|f| f.name == "_Count"));
}

#[test]
fn test_framework_property_access_is_left_alone() {
    // `s.Length` resolves to a type this module does not declare; the
    // framework rewrite owns it.
    let access = Expr::member(var("s"), "Length").with_annot(Annot::Member(MemberRef {
        declaring_type: "String".to_string(),
        name: "Length".to_string(),
        kind: MemberKind::Property,
        is_static: false,
        ty: Some(SemTy::Prim(PrimTy::I32)),
    }));
    let mut module = module_of(vec![class(
        "S",
        vec![Member::Method(void_method(
            "len",
            vec![],
            vec![Stmt::ret(Some(access))],
        ))],
    )]);
    let before = module.clone();

    run_pass(PropertiesToMethods, &mut module);

    assert_eq!(module, before);
}

fn item_ref(recv: Expr, args: Vec<Expr>, declaring: &str) -> Expr {
    Expr::new(ExprKind::Index {
        target: Box::new(recv),
        args,
    })
    .with_annot(Annot::Member(MemberRef {
        declaring_type: declaring.to_string(),
        name: "Item".to_string(),
        kind: MemberKind::Property,
        is_static: false,
        ty: Some(SemTy::Prim(PrimTy::I32)),
    }))
}

#[test]
fn test_indexer_access_becomes_item_calls() {
    let body = vec![
        Stmt::ret(Some(item_ref(var("grid"), vec![Expr::int(3)], "Grid"))),
        Stmt::expr(Expr::assign(
            item_ref(var("grid"), vec![Expr::int(3)], "Grid"),
            Expr::int(7),
        )),
    ];
    let mut module = module_of(vec![
        class("Grid", vec![]),
        class("U", vec![Member::Method(void_method("go", vec![], body))]),
    ]);

    run_pass(ExpandIndexers, &mut module);

    let u = module.find_type("U").expect("U");
    let body = find_method(u, "go").body.as_ref().expect("body");
    match &body.stmts[0] {
        Stmt::Return(Some(Expr {
            kind: ExprKind::Invoke { target, args },
            ..
        })) => {
            match &target.kind {
                ExprKind::Member { name, .. } => assert_eq!(name, "get_Item"),
                other => panic!("unexpected target: {:?}", other),
            }
            assert_eq!(args.len(), 1);
        }
        other => panic!("read not rewritten: {:?}", other),
    }
    match &body.stmts[1] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { target, args },
            ..
        }) => {
            match &target.kind {
                ExprKind::Member { name, .. } => assert_eq!(name, "set_Item"),
                other => panic!("unexpected target: {:?}", other),
            }
            assert_eq!(args.len(), 2, "index args then value");
        }
        other => panic!("write not rewritten: {:?}", other),
    }
}

#[test]
fn test_array_indexing_is_left_alone() {
    let body = vec![Stmt::ret(Some(Expr::new(ExprKind::Index {
        target: Box::new(var("xs")),
        args: vec![Expr::int(0)],
    })))];
    let mut module = module_of(vec![class(
        "U",
        vec![Member::Method(void_method("first", vec![], body))],
    )]);
    let before = module.clone();

    run_pass(ExpandIndexers, &mut module);

    assert_eq!(module, before);
}

#[test]
fn test_indexer_decl_becomes_item_methods() {
    let idx = IndexerDecl {
        modifiers: Modifiers::default(),
        attributes: Vec::new(),
        ty: int_ty(),
        params: vec![Param::new("i", int_ty())],
        getter: Some(Accessor {
            body: Some(Block::new(vec![Stmt::ret(Some(Expr::int(0)))])),
        }),
        setter: Some(Accessor { body: Some(Block::default()) }),
    };
    let mut module = module_of(vec![class("Grid", vec![Member::Indexer(idx)])]);

    run_pass(IndexersToMethods, &mut module);

    let grid = first_type(&module);
    let getter = find_method(grid, "get_Item");
    assert_eq!(getter.params.len(), 1);
    assert_eq!(getter.ret, int_ty());
    let setter = find_method(grid, "set_Item");
    assert_eq!(setter.params.len(), 2);
    assert_eq!(setter.params[1].name, "value");
    assert_eq!(setter.ret, Ty::prim(PrimTy::Void));
}

#[test]
fn test_operator_decl_and_use_become_static_call() {
    let op = OperatorDecl {
        modifiers: Modifiers {
            is_public: true,
            is_static: true,
            ..Modifiers::default()
        },
        attributes: Vec::new(),
        op: OperatorKind::Addition,
        ret: Ty::named("Vec2"),
        params: vec![Param::new("a", Ty::named("Vec2")), Param::new("b", Ty::named("Vec2"))],
        body: Block::new(vec![Stmt::ret(Some(Expr::null()))]),
    };
    let vec2 = class("Vec2", vec![Member::Operator(op)]);
    let use_body = vec![Stmt::ret(Some(Expr::binary(
        var("a").with_annot(Annot::Ty(SemTy::named("Vec2", TypeShape::Class))),
        BinOp::Add,
        var("b").with_annot(Annot::Ty(SemTy::named("Vec2", TypeShape::Class))),
    )))];
    let user = class("U", vec![Member::Method(void_method("sum", vec![], use_body))]);
    let mut module = module_of(vec![vec2, user]);

    run_pass(OperatorDeclsToMethods, &mut module);
    run_pass(ExpandOperators, &mut module);

    let vec2 = module.find_type("Vec2").expect("Vec2");
    let m = find_method(vec2, "op_Addition");
    assert!(m.modifiers.is_static);
    let u = module.find_type("U").expect("U");
    let body = find_method(u, "sum").body.as_ref().expect("body");
    match &body.stmts[0] {
        Stmt::Return(Some(e)) => {
            assert_eq!(
                e,
                &Expr::static_call(
                    "Vec2",
                    "op_Addition",
                    vec![
                        var("a").with_annot(Annot::Ty(SemTy::named("Vec2", TypeShape::Class))),
                        var("b").with_annot(Annot::Ty(SemTy::named("Vec2", TypeShape::Class))),
                    ],
                )
            );
        }
        other => panic!("operator use not rewritten: {:?}", other),
    }
}

#[test]
fn test_untyped_binary_is_left_alone() {
    let body = vec![Stmt::ret(Some(Expr::binary(var("a"), BinOp::Add, var("b"))))];
    let mut module = module_of(vec![class(
        "U",
        vec![Member::Method(void_method("sum", vec![], body))],
    )]);
    let before = module.clone();

    run_pass(ExpandOperators, &mut module);

    assert_eq!(module, before);
}

#[test]
fn test_delegates_inline_to_function_types() {
    let del = DelegateDecl {
        name: "Handler".to_string(),
        modifiers: Modifiers::default(),
        type_params: Vec::new(),
        ret: Ty::prim(PrimTy::Void),
        params: vec![Param::new("n", int_ty())],
    };
    let cls = class(
        "Bus",
        vec![
            Member::Delegate(del),
            Member::Field(field("onTick", Ty::named("Handler"))),
            Member::Event(EventDecl {
                name: "Changed".to_string(),
                modifiers: Modifiers::default(),
                attributes: Vec::new(),
                ty: Ty::named("Handler"),
            }),
        ],
    );
    let mut module = module_of(vec![cls]);

    run_pass(InlineDelegates, &mut module);

    let bus = first_type(&module);
    assert!(
        !bus.members.iter().any(|m| matches!(m, Member::Delegate(_))),
        "delegate declaration removed"
    );
    let on_tick = bus.fields().find(|f| f.name == "onTick").expect("onTick");
    match &on_tick.ty.kind {
        TyKind::Func { params, ret } => {
            assert_eq!(params.len(), 1);
            assert_eq!(**ret, Ty::prim(PrimTy::Void));
        }
        other => panic!("delegate type not inlined: {:?}", other),
    }
    let changed = bus.fields().find(|f| f.name == "Changed").expect("Changed");
    assert_eq!(changed.ty, Ty::named("NEvent"));
    assert!(matches!(
        changed.init,
        Some(Expr {
            kind: ExprKind::New { .. },
            ..
        })
    ));
}
