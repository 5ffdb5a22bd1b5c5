use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::lower::*;
use crate::pipeline::Pass;
use crate::test_util::*;

#[test]
fn test_fix_bad_names_rewrites_generated_names() {
    let mut cls = class(
        "Program",
        vec![Member::Method(void_method(
            "<Main>m__0",
            vec![],
            vec![Stmt::expr(Expr::invoke(Expr::ident("<Main>m__1"), vec![]))],
        ))],
    );
    cls.members.push(Member::Field(field("state$1", int_ty())));
    let mut module = module_of(vec![cls]);

    run_pass(FixBadNames, &mut module);

    let cls = first_type(&module);
    assert_eq!(cls.methods().next().expect("method").name, "_Main_m__0");
    assert_eq!(cls.fields().next().expect("field").name, "state_1");
    let body = cls.methods().next().expect("method").body.as_ref().expect("body");
    match &body.stmts[0] {
        Stmt::Expr(Expr {
            kind: ExprKind::Invoke { target, .. },
            ..
        }) => match &target.kind {
            ExprKind::Ident(n) => assert_eq!(n, "_Main_m__1"),
            other => panic!("unexpected call target: {:?}", other),
        },
        other => panic!("unexpected stmt: {:?}", other),
    }
}

#[test]
fn test_lift_nested_class_renames_references() {
    let inner = class("Node", vec![]);
    let mut outer = class(
        "Tree",
        vec![
            Member::Type(inner),
            // Bare reference, valid only inside the declaring type.
            Member::Field(field("root", Ty::named("Node"))),
        ],
    );
    outer.modifiers.is_public = true;
    let other = class(
        "Walker",
        vec![Member::Field(field("cur", Ty::named("Tree.Node")))],
    );
    let mut module = module_of(vec![outer, other]);

    run_pass(LiftNestedClasses, &mut module);

    let names: Vec<&str> = module.types().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Tree", "Walker", "Tree_Node"]);
    let tree = module.find_type("Tree").expect("Tree");
    assert_eq!(tree.fields().next().expect("field").ty, Ty::named("Tree_Node"));
    let walker = module.find_type("Walker").expect("Walker");
    assert_eq!(walker.fields().next().expect("field").ty, Ty::named("Tree_Node"));
}

#[test]
fn test_lift_nested_class_inherits_outer_type_params() {
    let inner = class("Entry", vec![]);
    let mut outer = class("Map", vec![Member::Type(inner)]);
    outer.type_params = vec!["K".to_string(), "V".to_string()];
    let mut module = module_of(vec![outer]);

    run_pass(LiftNestedClasses, &mut module);

    let entry = module.find_type("Map_Entry").expect("lifted type");
    assert_eq!(entry.type_params, vec!["K".to_string(), "V".to_string()]);
}

#[test]
fn test_lift_generic_inside_generic_is_an_error() {
    let mut inner = class("Inner", vec![]);
    inner.type_params = vec!["U".to_string()];
    let mut outer = class("Outer", vec![Member::Type(inner)]);
    outer.type_params = vec!["T".to_string()];
    let mut module = module_of(vec![outer]);

    let mut diags = Diagnostics::new();
    let err = LiftNestedClasses
        .run(&mut module, &mut diags)
        .expect_err("lifting should fail");
    assert!(err.to_string().contains("Inner"), "error names the type: {}", err);
}

#[test]
fn test_flatten_namespaces_preserves_order() {
    let module = Module::new(vec![
        Decl::Namespace(NamespaceDecl {
            name: "App".to_string(),
            decls: vec![
                Decl::Type(class("A", vec![])),
                Decl::Namespace(NamespaceDecl {
                    name: "App.Util".to_string(),
                    decls: vec![Decl::Type(class("B", vec![]))],
                }),
            ],
        }),
        Decl::Type(class("C", vec![])),
    ]);
    let mut module = module;

    run_pass(FlattenNamespaces, &mut module);

    let names: Vec<&str> = module.types().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(module.decls.len(), 3);
}

#[test]
fn test_struct_becomes_class() {
    let mut point = class("Point", vec![Member::Field(field("x", int_ty()))]);
    point.kind = TypeKind::Struct;
    let user = class(
        "User",
        vec![Member::Method(void_method(
            "go",
            vec![],
            vec![Stmt::expr(
                Expr::ident("p")
                    .with_annot(Annot::Ty(SemTy::named("Point", TypeShape::Struct))),
            )],
        ))],
    );
    let mut module = module_of(vec![point, user]);

    run_pass(StructToClass, &mut module);

    assert_eq!(module.find_type("Point").expect("Point").kind, TypeKind::Class);
    let user = module.find_type("User").expect("User");
    let body = user.methods().next().expect("go").body.as_ref().expect("body");
    match &body.stmts[0] {
        Stmt::Expr(e) => {
            assert_eq!(e.sem_ty(), Some(&SemTy::named("Point", TypeShape::Class)));
        }
        other => panic!("unexpected stmt: {:?}", other),
    }
}

#[test]
fn test_abstract_method_gets_throwing_body() {
    let mut m = MethodDecl::new("render", Ty::prim(PrimTy::Void));
    m.modifiers.is_abstract = true;
    m.body = None;
    let mut cls = class("Widget", vec![Member::Method(m)]);
    cls.modifiers.is_abstract = true;

    let mut iface_m = MethodDecl::new("render", Ty::prim(PrimTy::Void));
    iface_m.body = None;
    let mut iface = class("IWidget", vec![Member::Method(iface_m)]);
    iface.kind = TypeKind::Interface;

    let mut module = module_of(vec![cls, iface]);
    run_pass(AddAbstractMethodBodies, &mut module);

    let cls = module.find_type("Widget").expect("Widget");
    let body = find_method(cls, "render").body.as_ref().expect("body added");
    assert!(matches!(body.stmts[0], Stmt::Throw(Some(_))));
    let iface = module.find_type("IWidget").expect("IWidget");
    assert!(find_method(iface, "render").body.is_none(), "interface methods stay bodiless");
}

#[test]
fn test_strip_modifiers_const_survives_as_static() {
    let mut f = field("MaxDepth", int_ty());
    f.modifiers.is_const = true;
    f.init = Some(Expr::int(16));
    let mut module = module_of(vec![class("Limits", vec![Member::Field(f)])]);

    run_pass(StripModifiers, &mut module);

    let f = first_type(&module).fields().next().expect("field");
    assert!(!f.modifiers.is_const);
    assert!(f.modifiers.is_static);
}

#[test]
fn test_remove_empty_switch() {
    let body = vec![
        Stmt::Switch {
            scrutinee: Expr::ident("x"),
            sections: vec![],
        },
        Stmt::Switch {
            scrutinee: Expr::invoke(Expr::ident("next"), vec![]),
            sections: vec![],
        },
        Stmt::ret(None),
    ];
    let mut module = module_of(vec![class(
        "S",
        vec![Member::Method(void_method("go", vec![], body))],
    )]);

    run_pass(RemoveEmptySwitch, &mut module);

    let body = find_method(first_type(&module), "go").body.as_ref().expect("body");
    assert_eq!(body.stmts.len(), 2, "pure scrutinee dropped, impure kept");
    assert!(
        matches!(&body.stmts[0], Stmt::Expr(Expr { kind: ExprKind::Invoke { .. }, .. })),
        "side-effecting scrutinee survives as an expression statement"
    );
}

#[test]
fn test_endless_for_becomes_while_true() {
    let body = vec![Stmt::For {
        init: vec![],
        cond: None,
        update: vec![],
        body: Box::new(Stmt::Block(Block::new(vec![Stmt::ret(None)]))),
    }];
    let mut module = module_of(vec![class(
        "L",
        vec![Member::Method(void_method("spin", vec![], body))],
    )]);

    run_pass(MakeWhileLoop, &mut module);

    let body = find_method(first_type(&module), "spin").body.as_ref().expect("body");
    match &body.stmts[0] {
        Stmt::While { cond, .. } => assert_eq!(cond, &Expr::bool(true)),
        other => panic!("for loop not rewritten: {:?}", other),
    }
}

#[test]
fn test_counted_for_is_left_alone() {
    let for_stmt = Stmt::For {
        init: vec![Stmt::var_decl("i", Some(int_ty()), Some(Expr::int(0)))],
        cond: Some(Expr::binary(var("i"), BinOp::Lt, Expr::int(10))),
        update: vec![Expr::new(ExprKind::Unary {
            op: UnOp::Inc,
            expr: Box::new(var("i")),
        })],
        body: Box::new(Stmt::Block(Block::default())),
    };
    let mut module = module_of(vec![class(
        "L",
        vec![Member::Method(void_method("count", vec![], vec![for_stmt]))],
    )]);
    let before = module.clone();

    run_pass(MakeWhileLoop, &mut module);

    assert_eq!(module, before);
}

#[test]
fn test_lowering_is_a_noop_on_plain_declarations() {
    let mut module = module_of(vec![class(
        "Plain",
        vec![
            Member::Field(field("n", int_ty())),
            Member::Method(void_method(
                "bump",
                vec![Param::new("by", int_ty())],
                vec![Stmt::expr(Expr::assign(
                    Expr::member(Expr::this(), "n"),
                    Expr::binary(Expr::member(Expr::this(), "n"), BinOp::Add, var("by")),
                ))],
            )),
        ],
    )]);
    let before = module.clone();

    run_pass(FixBadNames, &mut module);
    run_pass(LiftNestedClasses, &mut module);
    run_pass(StripConstraints, &mut module);
    run_pass(FlattenNamespaces, &mut module);
    run_pass(StructToClass, &mut module);
    run_pass(AddAbstractMethodBodies, &mut module);
    run_pass(StripEnumBaseTypes, &mut module);
    run_pass(StripAttributes, &mut module);
    run_pass(StripModifiers, &mut module);
    run_pass(RemoveEmptySwitch, &mut module);
    run_pass(MakeWhileLoop, &mut module);

    assert_eq!(module, before, "no trigger, no change");
}
