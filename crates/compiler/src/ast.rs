//! Abstract syntax tree for Tau
//!
//! A closed hierarchy of node families, each carrying a [`Span`]. Nodes
//! also carry the mutable annotation slots the later passes fill in:
//! the binder sets `symbol` handles and scope handles, the type checker
//! sets `semantic_type` fields (initialized to [`Type::Phony`]), and the
//! offsets pass sets the frame `size` of every function. Code generation
//! only reads.

use crate::symbols::{ScopeId, SymbolId, Type};
use crate::tokens::{Span, Token};

/// An identifier leaf wrapping its token. After binding, `symbol` points
/// at the declaration this name resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Id {
    pub token: Token,
    pub span: Span,
    pub symbol: Option<SymbolId>,
    pub semantic_type: Type,
}

impl Id {
    pub fn new(token: Token) -> Self {
        let span = token.span;
        Id {
            token,
            span,
            symbol: None,
            semantic_type: Type::Phony,
        }
    }

    pub fn name(&self) -> &str {
        &self.token.text
    }
}

/// Ordered sequence of top-level function declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<FuncDecl>,
    pub span: Span,
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub id: Id,
    pub params: Vec<ParamDecl>,
    pub ret_type: TypeAst,
    pub body: CompoundStmt,
    pub span: Span,
    pub scope: Option<ScopeId>,
    /// Frame slot count, set by the offsets pass.
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub id: Id,
    pub type_ast: TypeAst,
    pub span: Span,
    pub semantic_type: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub id: Id,
    pub type_ast: TypeAst,
    pub span: Span,
    pub semantic_type: Type,
}

/// A syntactic type with its checked semantic counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAst {
    pub kind: TypeAstKind,
    pub span: Span,
    pub semantic_type: Type,
}

impl TypeAst {
    pub fn new(kind: TypeAstKind, span: Span) -> Self {
        TypeAst {
            kind,
            span,
            semantic_type: Type::Phony,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeAstKind {
    Int,
    Bool,
    Void,
    Array {
        /// Optional size expression between the brackets.
        size: Option<Box<Expr>>,
        element: Box<TypeAst>,
    },
}

/// Declarations then statements, with its own local scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundStmt {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
    pub span: Span,
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Compound(CompoundStmt),
    Assign {
        lhs: Expr,
        rhs: Expr,
    },
    If {
        cond: Expr,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return {
        expr: Option<Expr>,
        /// Scope the `return` appears in, set by the binder.
        scope: Option<ScopeId>,
    },
    /// A `call` statement wrapping a call expression.
    Call(Expr),
    Print(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub semantic_type: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            semantic_type: Type::Phony,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Id(Id),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Array indexing; parsed and typechecked but never lowered.
    ArrayCell {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    IntLiteral(i64),
    BoolLiteral(bool),
    Binary {
        op: Token,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: Token,
        operand: Box<Expr>,
    },
}
