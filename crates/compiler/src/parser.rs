//! Recursive-descent parser for Tau
//!
//! Grammar (EBNF, `{}` repetition, `[]` option):
//!
//! ```text
//! program  := funcDec { funcDec }
//! funcDec  := "func" ID "(" [ param { "," param } ] ")" [ ":" type ] compound
//! param    := ID ":" type
//! type     := "void" | "int" | "bool" | "[" [ expr ] "]" type
//! compound := "{" { varDec } { stmt } [ return ] "}"
//! varDec   := "var" ID ":" type
//! stmt     := while | if | print | call | compound | assign
//! while    := "while" expr compound
//! if       := "if" expr compound [ "else" compound ]
//! print    := "print" expr
//! call     := "call" ID "(" [ expr { "," expr } ] ")"
//! assign   := ID { "[" expr "]" } "=" expr
//! return   := "return" expr
//! expr     := expr1 { "or" expr1 }
//! expr1    := expr2 { "and" expr2 }
//! expr2    := expr3 { (< <= == != > >=) expr3 }
//! expr3    := expr4 { (+ -) expr4 }
//! expr4    := base { (* /) base }
//! base     := { "not" | "-" }
//!             ( INT | "true" | "false" | "call" ID "(" args ")"
//!             | ID [ "(" args ")" | { "[" expr "]" } ] | "(" expr ")" )
//! ```
//!
//! `call` is accepted in expression position as well as statement
//! position; both produce a call expression. An omitted return type reads
//! as `void`.

use crate::ast::{
    CompoundStmt, Expr, ExprKind, FuncDecl, Id, ParamDecl, Program, Stmt, StmtKind, TypeAst,
    TypeAstKind, VarDecl,
};
use crate::error::{CompileError, Result};
use crate::scanner::Scanner;
use crate::tokens::{Token, TokenKind};

const FIRST_EXPR: [TokenKind; 8] = [
    TokenKind::LParen,
    TokenKind::Minus,
    TokenKind::Call,
    TokenKind::False,
    TokenKind::Not,
    TokenKind::True,
    TokenKind::Id,
    TokenKind::IntLit,
];

const FIRST_STMT: [TokenKind; 6] = [
    TokenKind::While,
    TokenKind::If,
    TokenKind::Print,
    TokenKind::Call,
    TokenKind::LBrace,
    TokenKind::Id,
];

pub struct Parser {
    scanner: Scanner,
}

impl Parser {
    pub fn new(scanner: Scanner) -> Self {
        Parser { scanner }
    }

    fn current(&self) -> TokenKind {
        self.scanner.peek().kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    fn error(&self, msg: impl Into<String>) -> CompileError {
        CompileError::new(msg, self.scanner.peek().span)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if !self.check(kind) {
            return Err(self.error(format!("expected {}", kind)));
        }
        Ok(self.scanner.advance())
    }

    pub fn parse(&mut self) -> Result<Program> {
        let mut decls = vec![self.func_decl()?];
        while self.check(TokenKind::Func) {
            decls.push(self.func_decl()?);
        }
        self.expect(TokenKind::Eof)?;
        let span = decls[0].span.to(decls[decls.len() - 1].span);
        Ok(Program {
            decls,
            span,
            scope: None,
        })
    }

    fn func_decl(&mut self) -> Result<FuncDecl> {
        let begin = self.expect(TokenKind::Func)?;
        let id = Id::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.check(TokenKind::Id) {
            params.push(self.param()?);
            while self.check(TokenKind::Comma) {
                self.expect(TokenKind::Comma)?;
                params.push(self.param()?);
            }
        }
        let close = self.expect(TokenKind::RParen)?;
        let ret_type = if self.check(TokenKind::Colon) {
            self.expect(TokenKind::Colon)?;
            self.type_name()?
        } else {
            TypeAst::new(TypeAstKind::Void, close.span)
        };
        let body = self.compound_stmt()?;
        let span = begin.span.to(body.span);
        Ok(FuncDecl {
            id,
            params,
            ret_type,
            body,
            span,
            scope: None,
            size: 0,
        })
    }

    fn param(&mut self) -> Result<ParamDecl> {
        let id = Id::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::Colon)?;
        let type_ast = self.type_name()?;
        let span = id.span.to(type_ast.span);
        Ok(ParamDecl {
            id,
            type_ast,
            span,
            semantic_type: crate::symbols::Type::Phony,
        })
    }

    fn type_name(&mut self) -> Result<TypeAst> {
        match self.current() {
            TokenKind::Void => {
                let token = self.expect(TokenKind::Void)?;
                Ok(TypeAst::new(TypeAstKind::Void, token.span))
            }
            TokenKind::Int => {
                let token = self.expect(TokenKind::Int)?;
                Ok(TypeAst::new(TypeAstKind::Int, token.span))
            }
            TokenKind::Bool => {
                let token = self.expect(TokenKind::Bool)?;
                Ok(TypeAst::new(TypeAstKind::Bool, token.span))
            }
            TokenKind::LBracket => {
                let begin = self.expect(TokenKind::LBracket)?;
                let size = if FIRST_EXPR.contains(&self.current()) {
                    Some(Box::new(self.expr()?))
                } else {
                    None
                };
                self.expect(TokenKind::RBracket)?;
                let element = self.type_name()?;
                let span = begin.span.to(element.span);
                Ok(TypeAst::new(
                    TypeAstKind::Array {
                        size,
                        element: Box::new(element),
                    },
                    span,
                ))
            }
            _ => Err(self.error("expected a type")),
        }
    }

    fn compound_stmt(&mut self) -> Result<CompoundStmt> {
        let begin = self.expect(TokenKind::LBrace)?;
        let mut decls = Vec::new();
        while self.check(TokenKind::Var) {
            decls.push(self.var_decl()?);
        }
        let mut stmts = Vec::new();
        while FIRST_STMT.contains(&self.current()) {
            stmts.push(self.stmt()?);
        }
        if self.check(TokenKind::Return) {
            stmts.push(self.return_stmt()?);
        }
        let end = self.expect(TokenKind::RBrace)?;
        Ok(CompoundStmt {
            decls,
            stmts,
            span: begin.span.to(end.span),
            scope: None,
        })
    }

    fn var_decl(&mut self) -> Result<VarDecl> {
        let begin = self.expect(TokenKind::Var)?;
        let id = Id::new(self.expect(TokenKind::Id)?);
        self.expect(TokenKind::Colon)?;
        let type_ast = self.type_name()?;
        let span = begin.span.to(type_ast.span);
        Ok(VarDecl {
            id,
            type_ast,
            span,
            semantic_type: crate::symbols::Type::Phony,
        })
    }

    fn stmt(&mut self) -> Result<Stmt> {
        match self.current() {
            TokenKind::While => self.while_stmt(),
            TokenKind::LBrace => {
                let body = self.compound_stmt()?;
                let span = body.span;
                Ok(Stmt {
                    kind: StmtKind::Compound(body),
                    span,
                })
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::Print => self.print_stmt(),
            TokenKind::Call => self.call_stmt(),
            TokenKind::Id => self.assign_stmt(),
            _ => Err(self.error("syntax error")),
        }
    }

    fn while_stmt(&mut self) -> Result<Stmt> {
        let begin = self.expect(TokenKind::While)?;
        let cond = self.expr()?;
        let body = self.compound_stmt()?;
        let span = begin.span.to(body.span);
        let body = Stmt {
            span: body.span,
            kind: StmtKind::Compound(body),
        };
        Ok(Stmt {
            kind: StmtKind::While {
                cond,
                body: Box::new(body),
            },
            span,
        })
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        let begin = self.expect(TokenKind::If)?;
        let cond = self.expr()?;
        let then_body = self.compound_stmt()?;
        let then_stmt = Stmt {
            span: then_body.span,
            kind: StmtKind::Compound(then_body),
        };
        let mut end = then_stmt.span;
        let else_stmt = if self.check(TokenKind::Else) {
            self.expect(TokenKind::Else)?;
            let else_body = self.compound_stmt()?;
            end = else_body.span;
            Some(Box::new(Stmt {
                span: else_body.span,
                kind: StmtKind::Compound(else_body),
            }))
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_stmt: Box::new(then_stmt),
                else_stmt,
            },
            span: begin.span.to(end),
        })
    }

    fn print_stmt(&mut self) -> Result<Stmt> {
        let begin = self.expect(TokenKind::Print)?;
        let expr = self.expr()?;
        let span = begin.span.to(expr.span);
        Ok(Stmt {
            kind: StmtKind::Print(expr),
            span,
        })
    }

    fn call_stmt(&mut self) -> Result<Stmt> {
        let call = self.call_expr()?;
        let span = call.span;
        Ok(Stmt {
            kind: StmtKind::Call(call),
            span,
        })
    }

    /// `"call" ID "(" [ expr { "," expr } ] ")"`, shared by statement and
    /// expression position.
    fn call_expr(&mut self) -> Result<Expr> {
        let begin = self.expect(TokenKind::Call)?;
        let id = Id::new(self.expect(TokenKind::Id)?);
        let callee = Expr::new(ExprKind::Id(id.clone()), id.span);
        let (args, end) = self.call_args()?;
        let span = begin.span.to(end.span);
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    /// `"(" [ expr { "," expr } ] ")"`; returns the closing paren for spans.
    fn call_args(&mut self) -> Result<(Vec<Expr>, Token)> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if FIRST_EXPR.contains(&self.current()) {
            args.push(self.expr()?);
            while self.check(TokenKind::Comma) {
                self.expect(TokenKind::Comma)?;
                args.push(self.expr()?);
            }
        }
        let end = self.expect(TokenKind::RParen)?;
        Ok((args, end))
    }

    fn assign_stmt(&mut self) -> Result<Stmt> {
        let id = Id::new(self.expect(TokenKind::Id)?);
        let mut lhs = Expr::new(ExprKind::Id(id.clone()), id.span);
        while self.check(TokenKind::LBracket) {
            lhs = self.array_cell(lhs)?;
        }
        self.expect(TokenKind::Equal)?;
        let rhs = self.expr()?;
        let span = lhs.span.to(rhs.span);
        Ok(Stmt {
            kind: StmtKind::Assign { lhs, rhs },
            span,
        })
    }

    fn array_cell(&mut self, array: Expr) -> Result<Expr> {
        self.expect(TokenKind::LBracket)?;
        let index = self.expr()?;
        let end = self.expect(TokenKind::RBracket)?;
        let span = array.span.to(end.span);
        Ok(Expr::new(
            ExprKind::ArrayCell {
                array: Box::new(array),
                index: Box::new(index),
            },
            span,
        ))
    }

    fn return_stmt(&mut self) -> Result<Stmt> {
        let begin = self.expect(TokenKind::Return)?;
        let expr = self.expr()?;
        let span = begin.span.to(expr.span);
        Ok(Stmt {
            kind: StmtKind::Return {
                expr: Some(expr),
                scope: None,
            },
            span,
        })
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut expr = self.and_expr()?;
        while self.check(TokenKind::Or) {
            let op = self.expect(TokenKind::Or)?;
            let right = self.and_expr()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;
        while self.check(TokenKind::And) {
            let op = self.expect(TokenKind::And)?;
            let right = self.comparison()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.additive()?;
        while matches!(
            self.current(),
            TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::EqualEqual
                | TokenKind::BangEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
        ) {
            let op = self.scanner.advance();
            let right = self.additive()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut expr = self.multiplicative()?;
        while matches!(self.current(), TokenKind::Plus | TokenKind::Minus) {
            let op = self.scanner.advance();
            let right = self.multiplicative()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.base()?;
        while matches!(self.current(), TokenKind::Star | TokenKind::Slash) {
            let op = self.scanner.advance();
            let right = self.base()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn base(&mut self) -> Result<Expr> {
        if matches!(self.current(), TokenKind::Not | TokenKind::Minus) {
            let op = self.scanner.advance();
            let operand = self.base()?;
            let span = op.span.to(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        match self.current() {
            TokenKind::IntLit => {
                let token = self.expect(TokenKind::IntLit)?;
                let value: i64 = token
                    .text
                    .parse()
                    .map_err(|_| CompileError::new("Integer literal out of range", token.span))?;
                Ok(Expr::new(ExprKind::IntLiteral(value), token.span))
            }
            TokenKind::True => {
                let token = self.expect(TokenKind::True)?;
                Ok(Expr::new(ExprKind::BoolLiteral(true), token.span))
            }
            TokenKind::False => {
                let token = self.expect(TokenKind::False)?;
                Ok(Expr::new(ExprKind::BoolLiteral(false), token.span))
            }
            TokenKind::Call => self.call_expr(),
            TokenKind::Id => {
                let id = Id::new(self.expect(TokenKind::Id)?);
                let mut expr = Expr::new(ExprKind::Id(id.clone()), id.span);
                if self.check(TokenKind::LParen) {
                    let (args, end) = self.call_args()?;
                    let span = id.span.to(end.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                } else {
                    while self.check(TokenKind::LBracket) {
                        expr = self.array_cell(expr)?;
                    }
                }
                Ok(expr)
            }
            TokenKind::LParen => {
                self.expect(TokenKind::LParen)?;
                let expr = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error("syntax error")),
        }
    }
}

fn binary(op: Token, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_program(source: &str) -> Result<Program> {
        Parser::new(Scanner::new(source)?).parse()
    }

    fn parse_expression(source: &str) -> Expr {
        let mut parser = Parser::new(Scanner::new(source).unwrap());
        parser.expr().unwrap()
    }

    #[test]
    fn test_minimal_program() {
        let program = parse_program("func main(): int { return 0 }").unwrap();
        assert_eq!(program.decls.len(), 1);
        let main = &program.decls[0];
        assert_eq!(main.id.name(), "main");
        assert!(main.params.is_empty());
        assert_eq!(main.ret_type.kind, TypeAstKind::Int);
        assert_eq!(main.body.stmts.len(), 1);
    }

    #[test]
    fn test_omitted_return_type_is_void() {
        let program = parse_program("func f() { }").unwrap();
        assert_eq!(program.decls[0].ret_type.kind, TypeAstKind::Void);
    }

    #[test]
    fn test_params() {
        let program = parse_program("func add(a: int, b: int): int { return 1 }").unwrap();
        let add = &program.decls[0];
        assert_eq!(add.params.len(), 2);
        assert_eq!(add.params[0].id.name(), "a");
        assert_eq!(add.params[1].id.name(), "b");
    }

    #[test]
    fn test_precedence_mul_binds_tighter_than_add() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse_expression("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op.kind, TokenKind::Plus);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary { ref op, .. } if op.kind == TokenKind::Star
                ));
            }
            other => panic!("expected binary op, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_comparison_over_and_over_or() {
        // a < b and c or d parses as ((a < b) and c) or d
        let expr = parse_expression("a < b and c or d");
        match expr.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(op.kind, TokenKind::Or);
                match left.kind {
                    ExprKind::Binary { op, left, .. } => {
                        assert_eq!(op.kind, TokenKind::And);
                        assert!(matches!(
                            left.kind,
                            ExprKind::Binary { ref op, .. } if op.kind == TokenKind::Less
                        ));
                    }
                    other => panic!("expected and, got {:?}", other),
                }
            }
            other => panic!("expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_stacking() {
        let expr = parse_expression("not not - 1");
        match expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(op.kind, TokenKind::Not);
                assert!(matches!(operand.kind, ExprKind::Unary { .. }));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_call_in_expression_position() {
        let expr = parse_expression("1 + call f(2)");
        match expr.kind {
            ExprKind::Binary { right, .. } => {
                assert!(matches!(right.kind, ExprKind::Call { .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_call_tail_without_keyword() {
        let expr = parse_expression("f(1, 2)");
        match expr.kind {
            ExprKind::Call { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_array_indexing_nests() {
        let expr = parse_expression("a[1][2]");
        match expr.kind {
            ExprKind::ArrayCell { array, .. } => {
                assert!(matches!(array.kind, ExprKind::ArrayCell { .. }));
            }
            other => panic!("expected array cell, got {:?}", other),
        }
    }

    #[test]
    fn test_array_type_with_size() {
        let program = parse_program("func f() { var a: [10]int }").unwrap();
        let decl = &program.decls[0].body.decls[0];
        match &decl.type_ast.kind {
            TypeAstKind::Array { size, element } => {
                assert!(size.is_some());
                assert_eq!(element.kind, TypeAstKind::Int);
            }
            other => panic!("expected array type, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_and_while() {
        let program = parse_program(
            "func main(): int { var x: int x = 3 while x > 0 { if x == 1 { print x } else { } x = x - 1 } return 0 }",
        )
        .unwrap();
        let body = &program.decls[0].body;
        assert_eq!(body.decls.len(), 1);
        assert_eq!(body.stmts.len(), 3);
        assert!(matches!(body.stmts[1].kind, StmtKind::While { .. }));
    }

    #[test]
    fn test_parse_error_names_expected_token() {
        let err = parse_program("func main( { }").unwrap_err();
        assert_eq!(err.msg, "expected )");
    }

    #[test]
    fn test_missing_main_body_is_an_error() {
        let err = parse_program("func main()").unwrap_err();
        assert_eq!(err.msg, "expected {");
    }

    #[test]
    fn test_statement_after_return_is_an_error() {
        // return closes the compound; only "}" may follow
        let err = parse_program("func main(): int { return 0 print 1 }").unwrap_err();
        assert_eq!(err.msg, "expected }");
    }
}
