//! Static type checking
//!
//! Assigns a concrete semantic type to every expression, declaration,
//! type node, and id leaf, and fails fast on the first violation. The
//! enclosing function's return type is threaded down the walk so that
//! `return` statements can be checked in place. After a successful run no
//! node retains the phony placeholder type.

use crate::ast::{
    CompoundStmt, Expr, ExprKind, FuncDecl, Program, Stmt, StmtKind, TypeAst, TypeAstKind, VarDecl,
};
use crate::error::{CompileError, Result};
use crate::symbols::{SymbolTable, Type};
use crate::tokens::{Span, TokenKind};

/// Type-check `program`, filling in every `semantic_type` slot.
pub fn check(program: &mut Program, symbols: &mut SymbolTable) -> Result<()> {
    let mut checker = TypeChecker { symbols };
    for decl in &mut program.decls {
        checker.func_decl(decl)?;
    }
    Ok(())
}

struct TypeChecker<'a> {
    symbols: &'a mut SymbolTable,
}

impl TypeChecker<'_> {
    fn func_decl(&mut self, ast: &mut FuncDecl) -> Result<()> {
        let mut params = Vec::with_capacity(ast.params.len());
        for param in &mut ast.params {
            self.type_ast(&mut param.type_ast)?;
            let ty = param.type_ast.semantic_type.clone();
            if ty == Type::Void {
                return Err(CompileError::new(
                    "Parameter type must be int or bool",
                    param.span,
                ));
            }
            param.id.semantic_type = ty.clone();
            param.semantic_type = ty.clone();
            if let Some(symbol) = param.id.symbol {
                self.symbols.symbol_mut(symbol).semantic_type = ty.clone();
            }
            params.push(ty);
        }
        self.type_ast(&mut ast.ret_type)?;
        let ret = ast.ret_type.semantic_type.clone();
        let func_type = Type::Func(params, Box::new(ret.clone()));
        ast.id.semantic_type = func_type.clone();
        if let Some(symbol) = ast.id.symbol {
            self.symbols.symbol_mut(symbol).semantic_type = func_type;
        }
        self.compound(&mut ast.body, &ret)
    }

    fn compound(&mut self, ast: &mut CompoundStmt, ret: &Type) -> Result<()> {
        for decl in &mut ast.decls {
            self.var_decl(decl)?;
        }
        for stmt in &mut ast.stmts {
            self.stmt(stmt, ret)?;
        }
        Ok(())
    }

    fn var_decl(&mut self, ast: &mut VarDecl) -> Result<()> {
        self.type_ast(&mut ast.type_ast)?;
        let ty = ast.type_ast.semantic_type.clone();
        if ty == Type::Void {
            return Err(CompileError::new(
                "Variable type must be int or bool",
                ast.span,
            ));
        }
        ast.id.semantic_type = ty.clone();
        ast.semantic_type = ty.clone();
        if let Some(symbol) = ast.id.symbol {
            self.symbols.symbol_mut(symbol).semantic_type = ty;
        }
        Ok(())
    }

    fn type_ast(&mut self, ast: &mut TypeAst) -> Result<()> {
        ast.semantic_type = match &mut ast.kind {
            TypeAstKind::Int => Type::Int,
            TypeAstKind::Bool => Type::Bool,
            TypeAstKind::Void => Type::Void,
            TypeAstKind::Array { size, element } => {
                if let Some(size) = size {
                    self.expr(size)?;
                    if size.semantic_type != Type::Int {
                        return Err(CompileError::new("Array size must be int", size.span));
                    }
                }
                self.type_ast(element)?;
                if element.semantic_type == Type::Void {
                    return Err(CompileError::new(
                        "Array element type must be int or bool",
                        ast.span,
                    ));
                }
                Type::Array(Box::new(element.semantic_type.clone()))
            }
        };
        Ok(())
    }

    fn stmt(&mut self, ast: &mut Stmt, ret: &Type) -> Result<()> {
        match &mut ast.kind {
            StmtKind::Compound(compound) => self.compound(compound, ret),
            StmtKind::Assign { lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                if lhs.semantic_type != rhs.semantic_type {
                    return Err(CompileError::new("Assign type mismatch", lhs.span));
                }
                Ok(())
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.expr(cond)?;
                if cond.semantic_type != Type::Bool {
                    return Err(CompileError::new("If condition must be bool", cond.span));
                }
                self.stmt(then_stmt, ret)?;
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt, ret)?;
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                self.expr(cond)?;
                if cond.semantic_type != Type::Bool {
                    return Err(CompileError::new("While condition must be bool", cond.span));
                }
                self.stmt(body, ret)
            }
            StmtKind::Return { expr, .. } => {
                match expr {
                    Some(expr) => {
                        self.expr(expr)?;
                        if expr.semantic_type != *ret {
                            return Err(CompileError::new("Return type mismatch", expr.span));
                        }
                    }
                    None => {
                        if *ret != Type::Void {
                            return Err(CompileError::new("Return type mismatch", ast.span));
                        }
                    }
                }
                Ok(())
            }
            StmtKind::Call(call) => self.expr(call),
            StmtKind::Print(expr) => self.expr(expr),
        }
    }

    fn expr(&mut self, ast: &mut Expr) -> Result<()> {
        ast.semantic_type = match &mut ast.kind {
            ExprKind::Id(id) => {
                let symbol = id.symbol.ok_or_else(|| {
                    CompileError::new(format!("Undefined identifier {}", id.name()), id.span)
                })?;
                id.semantic_type = self.symbols.symbol(symbol).semantic_type.clone();
                id.semantic_type.clone()
            }
            ExprKind::IntLiteral(_) => Type::Int,
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::Call { callee, args } => self.call(callee, args, ast.span)?,
            ExprKind::ArrayCell { array, index } => {
                self.expr(array)?;
                self.expr(index)?;
                if index.semantic_type != Type::Int {
                    return Err(CompileError::new("Array index must be int", index.span));
                }
                Type::Int
            }
            ExprKind::Binary { op, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                match op.kind {
                    TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                        if left.semantic_type != Type::Int {
                            return Err(CompileError::new(
                                "Binary operation is valid for int only",
                                left.span,
                            ));
                        }
                        if right.semantic_type != Type::Int {
                            return Err(CompileError::new(
                                "Binary operation is valid for int only",
                                right.span,
                            ));
                        }
                        Type::Int
                    }
                    TokenKind::Less
                    | TokenKind::LessEqual
                    | TokenKind::Greater
                    | TokenKind::GreaterEqual
                    | TokenKind::EqualEqual
                    | TokenKind::BangEqual => {
                        if left.semantic_type != right.semantic_type {
                            return Err(CompileError::new(
                                "Binary operation is valid for same types only",
                                ast.span,
                            ));
                        }
                        Type::Bool
                    }
                    TokenKind::And | TokenKind::Or => {
                        if left.semantic_type != Type::Bool {
                            return Err(CompileError::new(
                                "Binary operation is valid for bool only",
                                left.span,
                            ));
                        }
                        if right.semantic_type != Type::Bool {
                            return Err(CompileError::new(
                                "Binary operation is valid for bool only",
                                right.span,
                            ));
                        }
                        Type::Bool
                    }
                    other => {
                        return Err(CompileError::new(
                            format!("Unknown binary operator {}", other),
                            op.span,
                        ));
                    }
                }
            }
            ExprKind::Unary { op, operand } => {
                self.expr(operand)?;
                match op.kind {
                    TokenKind::Minus => {
                        if operand.semantic_type != Type::Int {
                            return Err(CompileError::new(
                                "Unary operation is valid for int only",
                                operand.span,
                            ));
                        }
                        Type::Int
                    }
                    TokenKind::Not => {
                        if operand.semantic_type != Type::Bool {
                            return Err(CompileError::new(
                                "Unary operation is valid for bool only",
                                operand.span,
                            ));
                        }
                        Type::Bool
                    }
                    other => {
                        return Err(CompileError::new(
                            format!("Unknown unary operator {}", other),
                            op.span,
                        ));
                    }
                }
            }
        };
        Ok(())
    }

    /// A call's callee must already carry a function type (declarations
    /// bind left to right, so any resolvable callee does). Arity and
    /// positional argument types are both enforced.
    fn call(&mut self, callee: &mut Expr, args: &mut [Expr], span: Span) -> Result<Type> {
        self.expr(callee)?;
        let (params, ret) = match &callee.semantic_type {
            Type::Func(params, ret) => (params.clone(), (**ret).clone()),
            _ => {
                return Err(CompileError::new("Call of non-function", callee.span));
            }
        };
        if args.len() != params.len() {
            let name = match &callee.kind {
                ExprKind::Id(id) => id.name().to_string(),
                _ => "<expr>".to_string(),
            };
            return Err(CompileError::new(
                format!("Wrong number of arguments for function {}", name),
                span,
            ));
        }
        for (arg, param) in args.iter_mut().zip(&params) {
            self.expr(arg)?;
            if arg.semantic_type != *param {
                return Err(CompileError::new("Argument type mismatch", arg.span));
            }
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn checked(source: &str) -> Program {
        let mut program = Parser::new(Scanner::new(source).unwrap()).parse().unwrap();
        let mut symbols = bindings::bind(&mut program).unwrap();
        check(&mut program, &mut symbols).unwrap();
        program
    }

    fn check_err(source: &str) -> CompileError {
        let mut program = Parser::new(Scanner::new(source).unwrap()).parse().unwrap();
        let mut symbols = bindings::bind(&mut program).unwrap();
        check(&mut program, &mut symbols).unwrap_err()
    }

    fn assert_exprs_concrete(expr: &Expr) {
        assert!(!expr.semantic_type.is_phony(), "phony type at {:?}", expr.span);
        match &expr.kind {
            ExprKind::Id(id) => assert!(!id.semantic_type.is_phony()),
            ExprKind::Call { callee, args } => {
                assert_exprs_concrete(callee);
                args.iter().for_each(assert_exprs_concrete);
            }
            ExprKind::ArrayCell { array, index } => {
                assert_exprs_concrete(array);
                assert_exprs_concrete(index);
            }
            ExprKind::Binary { left, right, .. } => {
                assert_exprs_concrete(left);
                assert_exprs_concrete(right);
            }
            ExprKind::Unary { operand, .. } => assert_exprs_concrete(operand),
            ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) => {}
        }
    }

    fn assert_stmts_concrete(stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Compound(c) => {
                c.decls.iter().for_each(|d| {
                    assert!(!d.semantic_type.is_phony());
                    assert!(!d.id.semantic_type.is_phony());
                });
                c.stmts.iter().for_each(assert_stmts_concrete);
            }
            StmtKind::Assign { lhs, rhs } => {
                assert_exprs_concrete(lhs);
                assert_exprs_concrete(rhs);
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                assert_exprs_concrete(cond);
                assert_stmts_concrete(then_stmt);
                if let Some(e) = else_stmt {
                    assert_stmts_concrete(e);
                }
            }
            StmtKind::While { cond, body } => {
                assert_exprs_concrete(cond);
                assert_stmts_concrete(body);
            }
            StmtKind::Return { expr, .. } => {
                if let Some(e) = expr {
                    assert_exprs_concrete(e);
                }
            }
            StmtKind::Call(e) | StmtKind::Print(e) => assert_exprs_concrete(e),
        }
    }

    #[test]
    fn test_no_phony_types_survive() {
        let program = checked(
            "func add(a: int, b: int): int { return a + b } \
             func main(): int { var x: int var p: bool x = 10 p = x > 3 and true \
             while p { print call add(x, 2) p = false } return 0 }",
        );
        for decl in &program.decls {
            assert!(!decl.id.semantic_type.is_phony());
            assert!(!decl.ret_type.semantic_type.is_phony());
            for param in &decl.params {
                assert!(!param.semantic_type.is_phony());
                assert!(!param.id.semantic_type.is_phony());
            }
            decl.body.decls.iter().for_each(|d| {
                assert!(!d.semantic_type.is_phony());
            });
            decl.body.stmts.iter().for_each(assert_stmts_concrete);
        }
    }

    #[test]
    fn test_function_symbol_gets_func_type() {
        let program = checked("func add(a: int, b: int): int { return a + b } func main(): int { return 0 }");
        assert_eq!(
            program.decls[0].id.semantic_type,
            Type::Func(vec![Type::Int, Type::Int], Box::new(Type::Int))
        );
    }

    #[test]
    fn test_arithmetic_requires_int() {
        let err = check_err("func main(): int { print true + 1 return 0 }");
        assert_eq!(err.msg, "Binary operation is valid for int only");
        let err = check_err("func main(): int { print 1 + true return 0 }");
        assert_eq!(err.msg, "Binary operation is valid for int only");
    }

    #[test]
    fn test_logical_requires_bool() {
        let err = check_err("func main(): int { if 1 and true { } return 0 }");
        assert_eq!(err.msg, "Binary operation is valid for bool only");
    }

    #[test]
    fn test_comparison_requires_same_types() {
        let err = check_err("func main(): int { if 1 == true { } return 0 }");
        assert_eq!(err.msg, "Binary operation is valid for same types only");
        // bool == bool is fine
        checked("func main(): int { if true == false { } return 0 }");
    }

    #[test]
    fn test_unary_operand_types() {
        let err = check_err("func main(): int { print - true return 0 }");
        assert_eq!(err.msg, "Unary operation is valid for int only");
        let err = check_err("func main(): int { if not 1 { } return 0 }");
        assert_eq!(err.msg, "Unary operation is valid for bool only");
    }

    #[test]
    fn test_conditions_must_be_bool() {
        let err = check_err("func main(): int { if 1 { } return 0 }");
        assert_eq!(err.msg, "If condition must be bool");
        let err = check_err("func main(): int { while 1 { } return 0 }");
        assert_eq!(err.msg, "While condition must be bool");
    }

    #[test]
    fn test_assign_type_mismatch() {
        let err = check_err("func main(): int { var x: int x = true return 0 }");
        assert_eq!(err.msg, "Assign type mismatch");
    }

    #[test]
    fn test_return_type_mismatch() {
        let err = check_err("func main(): int { return true }");
        assert_eq!(err.msg, "Return type mismatch");
    }

    #[test]
    fn test_call_arity() {
        let err = check_err(
            "func add(a: int, b: int): int { return a + b } func main(): int { return call add(1) }",
        );
        assert_eq!(err.msg, "Wrong number of arguments for function add");
    }

    #[test]
    fn test_call_argument_types() {
        let err = check_err(
            "func add(a: int, b: int): int { return a + b } func main(): int { return call add(1, true) }",
        );
        assert_eq!(err.msg, "Argument type mismatch");
    }

    #[test]
    fn test_call_of_non_function() {
        let err = check_err("func main(): int { var x: int return call x() }");
        assert_eq!(err.msg, "Call of non-function");
    }

    #[test]
    fn test_void_parameter_rejected() {
        let err = check_err("func f(a: void) { } func main(): int { return 0 }");
        assert_eq!(err.msg, "Parameter type must be int or bool");
    }

    #[test]
    fn test_void_variable_rejected() {
        let err = check_err("func main(): int { var x: void return 0 }");
        assert_eq!(err.msg, "Variable type must be int or bool");
    }

    #[test]
    fn test_array_rules() {
        // index must be int, cell reads as int
        checked("func main(): int { var a: [10]int print a[3] return 0 }");
        let err = check_err("func main(): int { var a: [10]int print a[true] return 0 }");
        assert_eq!(err.msg, "Array index must be int");
        let err = check_err("func main(): int { var a: [true]int return 0 }");
        assert_eq!(err.msg, "Array size must be int");
        let err = check_err("func main(): int { var a: [10]void return 0 }");
        assert_eq!(err.msg, "Array element type must be int or bool");
    }
}
