use std::fmt;

// -- Types ---

/// Scalar type kinds. The source language's scalar kinds and the target's
/// erased kinds (`Number`, `Any`) share one enum: the erasure pass rewrites
/// the former into the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimTy {
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    Str,
    Object,
    Void,
    // Target-side kinds produced by erasure.
    Number,
    Any,
}

impl PrimTy {
    /// The target scalar kind this source kind erases to.
    pub fn erased(self) -> PrimTy {
        match self {
            PrimTy::Bool => PrimTy::Bool,
            PrimTy::Str => PrimTy::Str,
            PrimTy::Void => PrimTy::Void,
            PrimTy::Object => PrimTy::Any,
            PrimTy::Char
            | PrimTy::I8
            | PrimTy::U8
            | PrimTy::I16
            | PrimTy::U16
            | PrimTy::I32
            | PrimTy::U32
            | PrimTy::I64
            | PrimTy::U64
            | PrimTy::F32
            | PrimTy::F64
            | PrimTy::Decimal => PrimTy::Number,
            PrimTy::Number => PrimTy::Number,
            PrimTy::Any => PrimTy::Any,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.erased(), PrimTy::Number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ty {
    pub kind: TyKind,
    /// Resolved source type, when the front end knew it.
    pub annot: Option<SemTy>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TyKind {
    Prim(PrimTy),
    Named { name: String, args: Vec<Ty> },
    Array(Box<Ty>),
    Func { params: Vec<Param>, ret: Box<Ty> },
    Nullable(Box<Ty>),
}

impl Ty {
    pub fn prim(p: PrimTy) -> Ty {
        Ty {
            kind: TyKind::Prim(p),
            annot: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Ty {
        Ty {
            kind: TyKind::Named {
                name: name.into(),
                args: Vec::new(),
            },
            annot: None,
        }
    }

    pub fn named_args(name: impl Into<String>, args: Vec<Ty>) -> Ty {
        Ty {
            kind: TyKind::Named {
                name: name.into(),
                args,
            },
            annot: None,
        }
    }

    pub fn array(elem: Ty) -> Ty {
        Ty {
            kind: TyKind::Array(Box::new(elem)),
            annot: None,
        }
    }

    pub fn with_annot(mut self, sem: SemTy) -> Ty {
        self.annot = Some(sem);
        self
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TyKind::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

// -- Semantic annotations ---

/// The shape of a resolved named type, as reported by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
}

/// A resolved source type attached to an expression or type node by the
/// front end. Passes read these as ground truth and never contradict them.
#[derive(Debug, Clone, PartialEq)]
pub enum SemTy {
    Prim(PrimTy),
    Array(Box<SemTy>),
    Named { name: String, shape: TypeShape },
    GenericParam(String),
}

impl SemTy {
    pub fn named(name: impl Into<String>, shape: TypeShape) -> SemTy {
        SemTy::Named {
            name: name.into(),
            shape,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, SemTy::Array(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, SemTy::Prim(PrimTy::Str))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, SemTy::Prim(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(
            self,
            SemTy::Named {
                shape: TypeShape::Enum,
                ..
            }
        )
    }

    pub fn is_interface(&self) -> bool {
        matches!(
            self,
            SemTy::Named {
                shape: TypeShape::Interface,
                ..
            }
        )
    }

    pub fn is_delegate(&self) -> bool {
        matches!(
            self,
            SemTy::Named {
                shape: TypeShape::Delegate,
                ..
            }
        )
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            SemTy::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Field,
    Property,
    Event,
    Ctor,
}

/// A resolved member reference attached to a member-access or invocation node.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRef {
    pub declaring_type: String,
    pub name: String,
    pub kind: MemberKind,
    pub is_static: bool,
    /// The member's value type (field type, property type, method return).
    pub ty: Option<SemTy>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annot {
    Ty(SemTy),
    Member(MemberRef),
}

// -- Expressions ---

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub annot: Option<Annot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(String),
    Member {
        target: Box<Expr>,
        name: String,
    },
    /// A type used as a receiver for static members.
    TypeRef(Ty),
    Invoke {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        ty: Ty,
        args: Vec<Expr>,
    },
    NewArray {
        elem_ty: Ty,
        len: Option<Box<Expr>>,
        init: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    Cond {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Lambda {
        params: Vec<Param>,
        body: Block,
    },
    This,
    Base,
    TypeOf(Ty),
    Lit(Lit),
    Is {
        expr: Box<Expr>,
        ty: Ty,
    },
    As {
        expr: Box<Expr>,
        ty: Ty,
    },
    Cast {
        ty: Ty,
        expr: Box<Expr>,
    },
    /// `default(T)` in the source language.
    Default(Ty),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Char(char),
    /// A char literal already lowered to its code point, keeping the original
    /// spelling as a comment for the emitted source.
    CharCode { code: u32, text: String },
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Expr {
        Expr { kind, annot: None }
    }

    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::new(ExprKind::Ident(name.into()))
    }

    pub fn member(target: Expr, name: impl Into<String>) -> Expr {
        Expr::new(ExprKind::Member {
            target: Box::new(target),
            name: name.into(),
        })
    }

    pub fn type_ref(ty: Ty) -> Expr {
        Expr::new(ExprKind::TypeRef(ty))
    }

    pub fn invoke(target: Expr, args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Invoke {
            target: Box::new(target),
            args,
        })
    }

    /// `Shim.name(args)` — a call to a static member of a shim namespace.
    pub fn static_call(type_name: &str, name: &str, args: Vec<Expr>) -> Expr {
        Expr::invoke(Expr::member(Expr::type_ref(Ty::named(type_name)), name), args)
    }

    pub fn new_obj(ty: Ty, args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::New { ty, args })
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::new(ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn assign(target: Expr, value: Expr) -> Expr {
        Expr::new(ExprKind::Assign {
            target: Box::new(target),
            op: AssignOp::Assign,
            value: Box::new(value),
        })
    }

    pub fn is_test(expr: Expr, ty: Ty) -> Expr {
        Expr::new(ExprKind::Is {
            expr: Box::new(expr),
            ty,
        })
    }

    pub fn int(value: i64) -> Expr {
        Expr::new(ExprKind::Lit(Lit::Int(value)))
    }

    pub fn bool(value: bool) -> Expr {
        Expr::new(ExprKind::Lit(Lit::Bool(value)))
    }

    pub fn null() -> Expr {
        Expr::new(ExprKind::Lit(Lit::Null))
    }

    pub fn this() -> Expr {
        Expr::new(ExprKind::This)
    }

    pub fn base() -> Expr {
        Expr::new(ExprKind::Base)
    }

    pub fn with_annot(mut self, annot: Annot) -> Expr {
        self.annot = Some(annot);
        self
    }

    /// The resolved type of this expression, if the front end attached one.
    /// A member annotation yields the member's value type.
    pub fn sem_ty(&self) -> Option<&SemTy> {
        match &self.annot {
            Some(Annot::Ty(t)) => Some(t),
            Some(Annot::Member(m)) => m.ty.as_ref(),
            None => None,
        }
    }

    pub fn member_ref(&self) -> Option<&MemberRef> {
        match &self.annot {
            Some(Annot::Member(m)) => Some(m),
            _ => None,
        }
    }
}

// -- Statements ---

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Block {
        Block { stmts }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    Switch {
        scrutinee: Expr,
        sections: Vec<SwitchSection>,
    },
    Label(String),
    Goto(String),
    Break {
        /// Label of the construct this break escapes, when a pass has
        /// annotated it. An unannotated break binds its nearest enclosing
        /// loop or switch.
        target: Option<String>,
    },
    Continue {
        target: Option<String>,
    },
    Return(Option<Expr>),
    Throw(Option<Expr>),
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Expr(Expr),
    VarDecl {
        name: String,
        ty: Option<Ty>,
        init: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchSection {
    pub labels: Vec<CaseLabel>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Case(Expr),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub var: Option<String>,
    pub ty: Option<Ty>,
    pub body: Block,
}

impl Stmt {
    pub fn expr(e: Expr) -> Stmt {
        Stmt::Expr(e)
    }

    pub fn ret(e: Option<Expr>) -> Stmt {
        Stmt::Return(e)
    }

    pub fn goto(label: impl Into<String>) -> Stmt {
        Stmt::Goto(label.into())
    }

    pub fn label(label: impl Into<String>) -> Stmt {
        Stmt::Label(label.into())
    }

    pub fn var_decl(name: impl Into<String>, ty: Option<Ty>, init: Option<Expr>) -> Stmt {
        Stmt::VarDecl {
            name: name.into(),
            ty,
            init,
        }
    }

    pub fn if_then(cond: Expr, then_branch: Stmt) -> Stmt {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: None,
        }
    }

    pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Stmt {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        }
    }
}

// -- Declarations ---

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub decls: Vec<Decl>,
}

impl Module {
    pub fn new(decls: Vec<Decl>) -> Module {
        Module { decls }
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Type(t) => Some(t),
            Decl::Namespace(_) => None,
        })
    }

    pub fn types_mut(&mut self) -> impl Iterator<Item = &mut TypeDecl> {
        self.decls.iter_mut().filter_map(|d| match d {
            Decl::Type(t) => Some(t),
            Decl::Namespace(_) => None,
        })
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub name: String,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub is_public: bool,
    pub is_private: bool,
    pub is_protected: bool,
    pub is_internal: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_sealed: bool,
    pub is_readonly: bool,
    pub is_const: bool,
}

impl Modifiers {
    pub fn statik() -> Modifiers {
        Modifiers {
            is_static: true,
            ..Modifiers::default()
        }
    }

    pub fn private_static() -> Modifiers {
        Modifiers {
            is_private: true,
            is_static: true,
            ..Modifiers::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub type_param: String,
    pub bounds: Vec<Ty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub type_params: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub attributes: Vec<Attribute>,
    pub base_types: Vec<Ty>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> TypeDecl {
        TypeDecl {
            name: name.into(),
            kind,
            modifiers: Modifiers::default(),
            type_params: Vec::new(),
            constraints: Vec::new(),
            attributes: Vec::new(),
            base_types: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut MethodDecl> {
        self.members.iter_mut().filter_map(|m| match m {
            Member::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn ctors(&self) -> impl Iterator<Item = &CtorDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Ctor(c) => Some(c),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Ctor(CtorDecl),
    Property(PropertyDecl),
    Indexer(IndexerDecl),
    Operator(OperatorDecl),
    Event(EventDecl),
    Delegate(DelegateDecl),
    EnumMember(EnumMemberDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub ty: Ty,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamModifier {
    #[default]
    None,
    Ref,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
    pub default: Option<Expr>,
    pub modifier: ParamModifier,
    /// Marked by overload merging for positions past the minimum arity.
    pub optional: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Ty) -> Param {
        Param {
            name: name.into(),
            ty,
            default: None,
            modifier: ParamModifier::None,
            optional: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub type_params: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub ret: Ty,
    pub params: Vec<Param>,
    pub body: Option<Block>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, ret: Ty) -> MethodDecl {
        MethodDecl {
            name: name.into(),
            modifiers: Modifiers::default(),
            attributes: Vec::new(),
            type_params: Vec::new(),
            constraints: Vec::new(),
            ret,
            params: Vec::new(),
            body: Some(Block::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorInitKind {
    Base,
    This,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtorInit {
    pub kind: CtorInitKind,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtorDecl {
    /// `constructor`, or `constructor_N` once renamed by merging.
    pub name: String,
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub params: Vec<Param>,
    pub init: Option<CtorInit>,
    pub body: Block,
}

impl CtorDecl {
    pub fn new() -> CtorDecl {
        CtorDecl {
            name: "constructor".to_string(),
            modifiers: Modifiers::default(),
            attributes: Vec::new(),
            params: Vec::new(),
            init: None,
            body: Block::default(),
        }
    }
}

impl Default for CtorDecl {
    fn default() -> Self {
        Self::new()
    }
}

/// A property accessor. `body: None` marks a trivial (auto) accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub ty: Ty,
    pub getter: Option<Accessor>,
    pub setter: Option<Accessor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexerDecl {
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub ty: Ty,
    pub params: Vec<Param>,
    pub getter: Option<Accessor>,
    pub setter: Option<Accessor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Addition,
    Subtraction,
    Multiply,
    Division,
    Equality,
    Inequality,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl OperatorKind {
    pub fn method_name(self) -> &'static str {
        match self {
            OperatorKind::Addition => "op_Addition",
            OperatorKind::Subtraction => "op_Subtraction",
            OperatorKind::Multiply => "op_Multiply",
            OperatorKind::Division => "op_Division",
            OperatorKind::Equality => "op_Equality",
            OperatorKind::Inequality => "op_Inequality",
            OperatorKind::LessThan => "op_LessThan",
            OperatorKind::LessThanOrEqual => "op_LessThanOrEqual",
            OperatorKind::GreaterThan => "op_GreaterThan",
            OperatorKind::GreaterThanOrEqual => "op_GreaterThanOrEqual",
        }
    }

    pub fn bin_op(self) -> BinOp {
        match self {
            OperatorKind::Addition => BinOp::Add,
            OperatorKind::Subtraction => BinOp::Sub,
            OperatorKind::Multiply => BinOp::Mul,
            OperatorKind::Division => BinOp::Div,
            OperatorKind::Equality => BinOp::Eq,
            OperatorKind::Inequality => BinOp::Ne,
            OperatorKind::LessThan => BinOp::Lt,
            OperatorKind::LessThanOrEqual => BinOp::Le,
            OperatorKind::GreaterThan => BinOp::Gt,
            OperatorKind::GreaterThanOrEqual => BinOp::Ge,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDecl {
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub op: OperatorKind,
    pub ret: Ty,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub attributes: Vec<Attribute>,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub type_params: Vec<String>,
    pub ret: Ty,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    pub name: String,
    pub value: Option<Expr>,
}

// -- Display ---

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.decls {
            decl.fmt_with_indent(f, 0)?;
        }
        Ok(())
    }
}

impl Decl {
    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        match self {
            Decl::Namespace(ns) => {
                writeln!(f, "{}Namespace: {}", indent(level), ns.name)?;
                for d in &ns.decls {
                    d.fmt_with_indent(f, level + 1)?;
                }
                Ok(())
            }
            Decl::Type(t) => t.fmt_with_indent(f, level),
        }
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_indent(f, 0)
    }
}

impl TypeDecl {
    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let pad = indent(level);
        let kind = match self.kind {
            TypeKind::Class => "Class",
            TypeKind::Interface => "Interface",
            TypeKind::Struct => "Struct",
            TypeKind::Enum => "Enum",
        };
        write!(f, "{}{}: {}", pad, kind, self.name)?;
        if !self.type_params.is_empty() {
            write!(f, "<{}>", self.type_params.join(", "))?;
        }
        if !self.base_types.is_empty() {
            let bases: Vec<String> = self.base_types.iter().map(|b| b.to_string()).collect();
            write!(f, " : {}", bases.join(", "))?;
        }
        writeln!(f)?;
        for m in &self.members {
            m.fmt_with_indent(f, level + 1)?;
        }
        Ok(())
    }
}

impl Member {
    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let pad = indent(level);
        match self {
            Member::Field(fd) => {
                write!(f, "{}Field: {}: {}", pad, fd.name, fd.ty)?;
                if let Some(init) = &fd.init {
                    write!(f, " = {}", init)?;
                }
                writeln!(f)
            }
            Member::Method(m) => {
                writeln!(
                    f,
                    "{}Method: {}({}) -> {}{}",
                    pad,
                    m.name,
                    fmt_params(&m.params),
                    m.ret,
                    if m.modifiers.is_static { " [static]" } else { "" },
                )?;
                if let Some(body) = &m.body {
                    for s in &body.stmts {
                        s.fmt_with_indent(f, level + 1)?;
                    }
                }
                Ok(())
            }
            Member::Ctor(c) => {
                writeln!(
                    f,
                    "{}Ctor: {}({}){}",
                    pad,
                    c.name,
                    fmt_params(&c.params),
                    if c.modifiers.is_static { " [static]" } else { "" },
                )?;
                if let Some(init) = &c.init {
                    let kind = match init.kind {
                        CtorInitKind::Base => "base",
                        CtorInitKind::This => "this",
                    };
                    writeln!(f, "{}Init: {}({})", indent(level + 1), kind, fmt_exprs(&init.args))?;
                }
                for s in &c.body.stmts {
                    s.fmt_with_indent(f, level + 1)?;
                }
                Ok(())
            }
            Member::Property(p) => writeln!(f, "{}Property: {}: {}", pad, p.name, p.ty),
            Member::Indexer(i) => {
                writeln!(f, "{}Indexer: [{}]: {}", pad, fmt_params(&i.params), i.ty)
            }
            Member::Operator(o) => writeln!(f, "{}Operator: {}", pad, o.op.method_name()),
            Member::Event(e) => writeln!(f, "{}Event: {}: {}", pad, e.name, e.ty),
            Member::Delegate(d) => {
                writeln!(f, "{}Delegate: {}({}) -> {}", pad, d.name, fmt_params(&d.params), d.ret)
            }
            Member::EnumMember(m) => {
                write!(f, "{}EnumMember: {}", pad, m.name)?;
                if let Some(v) = &m.value {
                    write!(f, " = {}", v)?;
                }
                writeln!(f)
            }
            Member::Type(t) => t.fmt_with_indent(f, level),
        }
    }
}

fn fmt_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            format!(
                "{}{}: {}",
                p.name,
                if p.optional { "?" } else { "" },
                p.ty
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_exprs(exprs: &[Expr]) -> String {
    exprs
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Stmt {
    fn fmt_with_indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let pad = indent(level);
        match self {
            Stmt::Block(b) => {
                writeln!(f, "{}Block", pad)?;
                for s in &b.stmts {
                    s.fmt_with_indent(f, level + 1)?;
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                writeln!(f, "{}If: {}", pad, cond)?;
                then_branch.fmt_with_indent(f, level + 1)?;
                if let Some(e) = else_branch {
                    writeln!(f, "{}Else", pad)?;
                    e.fmt_with_indent(f, level + 1)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                writeln!(f, "{}While: {}", pad, cond)?;
                body.fmt_with_indent(f, level + 1)
            }
            Stmt::DoWhile { body, cond } => {
                writeln!(f, "{}DoWhile: {}", pad, cond)?;
                body.fmt_with_indent(f, level + 1)
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                writeln!(f, "{}For", pad)?;
                for s in init {
                    s.fmt_with_indent(f, level + 1)?;
                }
                if let Some(c) = cond {
                    writeln!(f, "{}Cond: {}", indent(level + 1), c)?;
                }
                for u in update {
                    writeln!(f, "{}Update: {}", indent(level + 1), u)?;
                }
                body.fmt_with_indent(f, level + 1)
            }
            Stmt::Switch {
                scrutinee,
                sections,
            } => {
                writeln!(f, "{}Switch: {}", pad, scrutinee)?;
                for sec in sections {
                    for l in &sec.labels {
                        match l {
                            CaseLabel::Case(e) => writeln!(f, "{}Case: {}", indent(level + 1), e)?,
                            CaseLabel::Default => writeln!(f, "{}Default", indent(level + 1))?,
                        }
                    }
                    for s in &sec.stmts {
                        s.fmt_with_indent(f, level + 2)?;
                    }
                }
                Ok(())
            }
            Stmt::Label(l) => writeln!(f, "{}Label: {}", pad, l),
            Stmt::Goto(l) => writeln!(f, "{}Goto: {}", pad, l),
            Stmt::Break { target } => match target {
                Some(t) => writeln!(f, "{}Break: {}", pad, t),
                None => writeln!(f, "{}Break", pad),
            },
            Stmt::Continue { target } => match target {
                Some(t) => writeln!(f, "{}Continue: {}", pad, t),
                None => writeln!(f, "{}Continue", pad),
            },
            Stmt::Return(e) => match e {
                Some(e) => writeln!(f, "{}Return: {}", pad, e),
                None => writeln!(f, "{}Return", pad),
            },
            Stmt::Throw(e) => match e {
                Some(e) => writeln!(f, "{}Throw: {}", pad, e),
                None => writeln!(f, "{}Throw", pad),
            },
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                writeln!(f, "{}Try", pad)?;
                for s in &body.stmts {
                    s.fmt_with_indent(f, level + 1)?;
                }
                for c in catches {
                    match (&c.var, &c.ty) {
                        (Some(v), Some(t)) => writeln!(f, "{}Catch: {}: {}", pad, v, t)?,
                        (Some(v), None) => writeln!(f, "{}Catch: {}", pad, v)?,
                        _ => writeln!(f, "{}Catch", pad)?,
                    }
                    for s in &c.body.stmts {
                        s.fmt_with_indent(f, level + 1)?;
                    }
                }
                if let Some(fin) = finally {
                    writeln!(f, "{}Finally", pad)?;
                    for s in &fin.stmts {
                        s.fmt_with_indent(f, level + 1)?;
                    }
                }
                Ok(())
            }
            Stmt::Expr(e) => writeln!(f, "{}Expr: {}", pad, e),
            Stmt::VarDecl { name, ty, init } => {
                write!(f, "{}Var: {}", pad, name)?;
                if let Some(t) = ty {
                    write!(f, ": {}", t)?;
                }
                if let Some(i) = init {
                    write!(f, " = {}", i)?;
                }
                writeln!(f)
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_indent(f, 0)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(n) => write!(f, "{}", n),
            ExprKind::Member { target, name } => write!(f, "{}.{}", target, name),
            ExprKind::TypeRef(t) => write!(f, "{}", t),
            ExprKind::Invoke { target, args } => write!(f, "{}({})", target, fmt_exprs(args)),
            ExprKind::New { ty, args } => write!(f, "new {}({})", ty, fmt_exprs(args)),
            ExprKind::NewArray { elem_ty, len, init } => {
                write!(f, "new {}[", elem_ty)?;
                if let Some(l) = len {
                    write!(f, "{}", l)?;
                }
                write!(f, "]")?;
                if !init.is_empty() {
                    write!(f, " {{{}}}", fmt_exprs(init))?;
                }
                Ok(())
            }
            ExprKind::Index { target, args } => write!(f, "{}[{}]", target, fmt_exprs(args)),
            ExprKind::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Unary { op, expr } => match op {
                UnOp::Neg => write!(f, "-{}", expr),
                UnOp::Not => write!(f, "!{}", expr),
                UnOp::BitNot => write!(f, "~{}", expr),
                UnOp::Inc => write!(f, "{}++", expr),
                UnOp::Dec => write!(f, "{}--", expr),
            },
            ExprKind::Assign { target, op, value } => {
                let op = match op {
                    AssignOp::Assign => "=",
                    AssignOp::Add => "+=",
                    AssignOp::Sub => "-=",
                };
                write!(f, "{} {} {}", target, op, value)
            }
            ExprKind::Cond {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "({} ? {} : {})", cond, then_expr, else_expr),
            ExprKind::Lambda { params, body } => {
                write!(f, "({}) => {{ {} stmts }}", fmt_params(params), body.stmts.len())
            }
            ExprKind::This => write!(f, "this"),
            ExprKind::Base => write!(f, "super"),
            ExprKind::TypeOf(t) => write!(f, "typeof({})", t),
            ExprKind::Lit(l) => write!(f, "{}", l),
            ExprKind::Is { expr, ty } => write!(f, "({} is {})", expr, ty),
            ExprKind::As { expr, ty } => write!(f, "({} as {})", expr, ty),
            ExprKind::Cast { ty, expr } => write!(f, "(({}){})", ty, expr),
            ExprKind::Default(t) => write!(f, "default({})", t),
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(v) => write!(f, "{}", v),
            Lit::Float(v) => write!(f, "{}", v),
            Lit::Bool(v) => write!(f, "{}", v),
            Lit::Str(s) => write!(f, "\"{}\"", s),
            Lit::Char(c) => write!(f, "'{}'", c.escape_default()),
            Lit::CharCode { code, text } => write!(f, "{} /*{}*/", code, text),
            Lit::Null => write!(f, "null"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TyKind::Prim(p) => {
                let s = match p {
                    PrimTy::Bool => "boolean",
                    PrimTy::Char => "char",
                    PrimTy::I8 => "sbyte",
                    PrimTy::U8 => "byte",
                    PrimTy::I16 => "short",
                    PrimTy::U16 => "ushort",
                    PrimTy::I32 => "int",
                    PrimTy::U32 => "uint",
                    PrimTy::I64 => "long",
                    PrimTy::U64 => "ulong",
                    PrimTy::F32 => "float",
                    PrimTy::F64 => "double",
                    PrimTy::Decimal => "decimal",
                    PrimTy::Str => "string",
                    PrimTy::Object => "object",
                    PrimTy::Void => "void",
                    PrimTy::Number => "number",
                    PrimTy::Any => "any",
                };
                write!(f, "{}", s)
            }
            TyKind::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            TyKind::Array(t) => write!(f, "{}[]", t),
            TyKind::Func { params, ret } => write!(f, "({}) => {}", fmt_params(params), ret),
            TyKind::Nullable(t) => write!(f, "{}?", t),
        }
    }
}

#[cfg(test)]
#[path = "tests/t_ast.rs"]
mod tests;
