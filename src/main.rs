use clap::Parser as ClapParser;

use jslower::ast::*;
use jslower::Diagnostics;

#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Also dump the tree before translation.
    #[clap(long)]
    dump: bool,
}

/// A small annotated input tree exercising overload merging, property
/// lowering and goto elimination.
fn demo_module() -> Module {
    let mut counter = TypeDecl::new("Counter", TypeKind::Class);

    counter.members.push(Member::Field(FieldDecl {
        name: "count".to_string(),
        modifiers: Modifiers::default(),
        attributes: Vec::new(),
        ty: Ty::prim(PrimTy::I32),
        init: None,
    }));

    // add() / add(int): an overload group.
    let mut add0 = MethodDecl::new("add", Ty::prim(PrimTy::Void));
    add0.body = Some(Block::new(vec![Stmt::Expr(Expr::new(ExprKind::Assign {
        target: Box::new(Expr::member(Expr::this(), "count")),
        op: AssignOp::Add,
        value: Box::new(Expr::int(1)),
    }))]));
    counter.members.push(Member::Method(add0));

    let mut add1 = MethodDecl::new("add", Ty::prim(PrimTy::Void));
    add1.params = vec![Param::new("amount", Ty::prim(PrimTy::I32))];
    add1.body = Some(Block::new(vec![Stmt::Expr(Expr::new(ExprKind::Assign {
        target: Box::new(Expr::member(Expr::this(), "count")),
        op: AssignOp::Add,
        value: Box::new(Expr::ident("amount")),
    }))]));
    counter.members.push(Member::Method(add1));

    // A countdown written with goto/label control flow.
    let mut drain = MethodDecl::new("drain", Ty::prim(PrimTy::Void));
    drain.body = Some(Block::new(vec![
        Stmt::label("again"),
        Stmt::if_then(
            Expr::binary(
                Expr::member(Expr::this(), "count"),
                BinOp::Gt,
                Expr::int(0),
            ),
            Stmt::Block(Block::new(vec![
                Stmt::Expr(Expr::new(ExprKind::Assign {
                    target: Box::new(Expr::member(Expr::this(), "count")),
                    op: AssignOp::Sub,
                    value: Box::new(Expr::int(1)),
                })),
                Stmt::goto("again"),
            ])),
        ),
    ]));
    counter.members.push(Member::Method(drain));

    Module::new(vec![Decl::Type(counter)])
}

fn main() {
    let args = Args::parse();
    let mut module = demo_module();
    if args.dump {
        println!("--- input ---");
        print!("{}", module);
    }

    let mut diags = Diagnostics::new();
    match jslower::translate(&mut module, &mut diags) {
        Ok(()) => {
            println!("--- output ---");
            print!("{}", module);
            for w in diags.warnings() {
                eprintln!("warning: [{}] {}: {}", w.pass, w.context, w.message);
            }
        }
        Err(e) => eprintln!("error: {}", e),
    }
}
