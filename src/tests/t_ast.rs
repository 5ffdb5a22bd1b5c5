use super::*;
use crate::test_util::*;
use indoc::indoc;

#[test]
fn test_module_dump_shape() {
    let mut x = field("x", int_ty());
    x.init = Some(Expr::int(0));
    let reset = void_method(
        "reset",
        vec![],
        vec![Stmt::Expr(Expr::assign(
            Expr::member(Expr::this(), "x"),
            Expr::int(0),
        ))],
    );
    let module = module_of(vec![class(
        "Point",
        vec![Member::Field(x), Member::Method(reset)],
    )]);

    let expected = indoc! {"
        Class: Point
          Field: x: int = 0
          Method: reset() -> void
            Expr: this.x = 0
    "};
    assert_eq!(module.to_string(), expected);
}

#[test]
fn test_compound_exprs_print_parenthesized() {
    let sum = Expr::binary(var("a"), BinOp::Add, Expr::int(2));
    assert_eq!(sum.to_string(), "(a + 2)");
    let test = Expr::is_test(var("x"), Ty::prim(PrimTy::Number));
    assert_eq!(test.to_string(), "(x is number)");
}

#[test]
fn test_find_type_sees_only_top_level_types() {
    let inner = TypeDecl::new("Inner", TypeKind::Class);
    let ns = Decl::Namespace(NamespaceDecl {
        name: "Lib".to_string(),
        decls: vec![Decl::Type(inner)],
    });
    let module = Module::new(vec![ns, Decl::Type(TypeDecl::new("Top", TypeKind::Class))]);
    assert!(module.find_type("Top").is_some());
    assert!(module.find_type("Inner").is_none(), "namespaces are opaque here");
}
