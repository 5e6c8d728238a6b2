//! Scope construction and name resolution
//!
//! Walks the freshly parsed tree, builds the scope tree (global scope on
//! the program, a function scope per declaration, a local scope per
//! compound statement), and points every [`Id`] at the symbol it names.
//! Resolution is sequential: a function body sees the functions declared
//! at or before it, its own parameters, and enclosing locals. Shadowing
//! across nested scopes is legal; redeclaring a name inside one scope is
//! not.

use crate::ast::{
    CompoundStmt, Expr, ExprKind, FuncDecl, Id, Program, Stmt, StmtKind, TypeAst, TypeAstKind,
};
use crate::error::{CompileError, Result};
use crate::symbols::{ScopeId, ScopeKind, SymbolTable};

/// Bind `program`, returning the populated symbol table.
pub fn bind(program: &mut Program) -> Result<SymbolTable> {
    let mut binder = Binder {
        symbols: SymbolTable::new(),
    };
    binder.program(program)?;
    Ok(binder.symbols)
}

struct Binder {
    symbols: SymbolTable,
}

impl Binder {
    fn program(&mut self, ast: &mut Program) -> Result<()> {
        let global = self.symbols.new_scope(ScopeKind::Global, None, ast.span);
        ast.scope = Some(global);
        for decl in &mut ast.decls {
            let name = decl.id.name().to_string();
            let symbol = self.symbols.declare(global, &name).ok_or_else(|| {
                let msg = if name == "main" {
                    "main function already declared".to_string()
                } else {
                    format!("Function {} already declared", name)
                };
                CompileError::new(msg, decl.id.span)
            })?;
            decl.id.symbol = Some(symbol);
            self.func_decl(decl, global)?;
        }
        if self.symbols.lookup_local(global, "main").is_none() {
            return Err(CompileError::new("No main function declared", ast.span));
        }
        Ok(())
    }

    fn func_decl(&mut self, ast: &mut FuncDecl, outer: ScopeId) -> Result<()> {
        let scope = self.symbols.new_scope(ScopeKind::Func, Some(outer), ast.span);
        ast.scope = Some(scope);
        for param in &mut ast.params {
            let symbol = self
                .symbols
                .declare(scope, param.id.name())
                .ok_or_else(|| {
                    CompileError::new(
                        format!("Parameter {} already declared", param.id.name()),
                        param.id.span,
                    )
                })?;
            param.id.symbol = Some(symbol);
            self.type_ast(&mut param.type_ast, scope)?;
        }
        self.type_ast(&mut ast.ret_type, scope)?;
        self.compound(&mut ast.body, scope)
    }

    fn compound(&mut self, ast: &mut CompoundStmt, outer: ScopeId) -> Result<()> {
        let scope = self.symbols.new_scope(ScopeKind::Local, Some(outer), ast.span);
        ast.scope = Some(scope);
        for decl in &mut ast.decls {
            let symbol = self.symbols.declare(scope, decl.id.name()).ok_or_else(|| {
                CompileError::new(
                    format!("Variable {} already declared", decl.id.name()),
                    decl.id.span,
                )
            })?;
            decl.id.symbol = Some(symbol);
            self.type_ast(&mut decl.type_ast, scope)?;
        }
        for stmt in &mut ast.stmts {
            self.stmt(stmt, scope)?;
        }
        Ok(())
    }

    fn stmt(&mut self, ast: &mut Stmt, scope: ScopeId) -> Result<()> {
        match &mut ast.kind {
            StmtKind::Compound(compound) => self.compound(compound, scope),
            StmtKind::Assign { lhs, rhs } => {
                self.expr(lhs, scope)?;
                self.expr(rhs, scope)
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.expr(cond, scope)?;
                self.stmt(then_stmt, scope)?;
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt, scope)?;
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                self.expr(cond, scope)?;
                self.stmt(body, scope)
            }
            StmtKind::Return {
                expr,
                scope: enclosing,
            } => {
                *enclosing = Some(scope);
                if let Some(expr) = expr {
                    self.expr(expr, scope)?;
                }
                Ok(())
            }
            StmtKind::Call(call) => self.expr(call, scope),
            StmtKind::Print(expr) => self.expr(expr, scope),
        }
    }

    fn expr(&mut self, ast: &mut Expr, scope: ScopeId) -> Result<()> {
        match &mut ast.kind {
            ExprKind::Id(id) => self.id(id, scope),
            ExprKind::Call { callee, args } => {
                self.expr(callee, scope)?;
                for arg in args {
                    self.expr(arg, scope)?;
                }
                Ok(())
            }
            ExprKind::ArrayCell { array, index } => {
                self.expr(array, scope)?;
                self.expr(index, scope)
            }
            ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) => Ok(()),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left, scope)?;
                self.expr(right, scope)
            }
            ExprKind::Unary { operand, .. } => self.expr(operand, scope),
        }
    }

    fn id(&mut self, ast: &mut Id, scope: ScopeId) -> Result<()> {
        match self.symbols.lookup(scope, ast.name()) {
            Some(symbol) => {
                ast.symbol = Some(symbol);
                Ok(())
            }
            None => Err(CompileError::new(
                format!("Undefined identifier {}", ast.name()),
                ast.span,
            )),
        }
    }

    fn type_ast(&mut self, ast: &mut TypeAst, scope: ScopeId) -> Result<()> {
        if let TypeAstKind::Array { size, element } = &mut ast.kind {
            if let Some(size) = size {
                self.expr(size, scope)?;
            }
            self.type_ast(element, scope)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::tokens::Coord;

    fn bound(source: &str) -> (Program, SymbolTable) {
        let mut program = Parser::new(Scanner::new(source).unwrap()).parse().unwrap();
        let symbols = bind(&mut program).unwrap();
        (program, symbols)
    }

    fn bind_err(source: &str) -> CompileError {
        let mut program = Parser::new(Scanner::new(source).unwrap()).parse().unwrap();
        bind(&mut program).unwrap_err()
    }

    #[test]
    fn test_every_id_has_a_symbol() {
        let (program, symbols) = bound(
            "func add(a: int, b: int): int { return a + b } \
             func main(): int { var x: int x = 3 return call add(x, 2) }",
        );
        for decl in &program.decls {
            assert!(decl.id.symbol.is_some());
            assert!(decl.scope.is_some());
            for param in &decl.params {
                assert!(param.id.symbol.is_some());
            }
            assert!(decl.body.scope.is_some());
        }
        // a + b resolves to the two parameters, in declaration order
        let add = &program.decls[0];
        let ret = &add.body.stmts[0];
        if let StmtKind::Return { expr: Some(expr), .. } = &ret.kind {
            if let ExprKind::Binary { left, right, .. } = &expr.kind {
                let (a, b) = match (&left.kind, &right.kind) {
                    (ExprKind::Id(a), ExprKind::Id(b)) => (a, b),
                    other => panic!("expected ids, got {:?}", other),
                };
                assert_eq!(a.symbol, symbols.lookup(add.scope.unwrap(), "a"));
                assert_eq!(b.symbol, symbols.lookup(add.scope.unwrap(), "b"));
            }
        }
    }

    #[test]
    fn test_symbol_scope_is_ancestor_of_use() {
        let (program, symbols) = bound(
            "func main(): int { var x: int { var y: int y = x } return 0 }",
        );
        let body = &program.decls[0].body;
        let inner = match &body.stmts[0].kind {
            StmtKind::Compound(c) => c,
            other => panic!("expected compound, got {:?}", other),
        };
        // x was declared in the outer local scope but used in the inner one
        if let StmtKind::Assign { rhs, .. } = &inner.stmts[0].kind {
            if let ExprKind::Id(x) = &rhs.kind {
                let symbol = symbols.symbol(x.symbol.unwrap());
                assert_eq!(symbol.scope, body.scope.unwrap());
            }
        }
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let (program, symbols) = bound(
            "func main(): int { var x: int { var x: bool { x = true } } return 0 }",
        );
        let body = &program.decls[0].body;
        let mid = match &body.stmts[0].kind {
            StmtKind::Compound(c) => c,
            other => panic!("expected compound, got {:?}", other),
        };
        let inner = match &mid.stmts[0].kind {
            StmtKind::Compound(c) => c,
            other => panic!("expected compound, got {:?}", other),
        };
        if let StmtKind::Assign { lhs, .. } = &inner.stmts[0].kind {
            if let ExprKind::Id(x) = &lhs.kind {
                // resolves to the bool x in the middle scope, not the outer int x
                let symbol = symbols.symbol(x.symbol.unwrap());
                assert_eq!(symbol.scope, mid.scope.unwrap());
            }
        }
    }

    #[test]
    fn test_undefined_identifier() {
        let err = bind_err("func main(): int { print y return 0 }");
        assert_eq!(err.msg, "Undefined identifier y");
        assert_eq!(err.span.start, Coord::new(26, 1));
    }

    #[test]
    fn test_duplicate_main_rejected() {
        let err = bind_err("func main(): int { return 0 } func main(): int { return 1 }");
        assert_eq!(err.msg, "main function already declared");
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let err = bind_err(
            "func f(): int { return 0 } func f(): int { return 1 } func main(): int { return 0 }",
        );
        assert_eq!(err.msg, "Function f already declared");
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = bind_err("func f(a: int, a: int): int { return 0 } func main(): int { return 0 }");
        assert_eq!(err.msg, "Parameter a already declared");
    }

    #[test]
    fn test_duplicate_local_rejected() {
        let err = bind_err("func main(): int { var x: int var x: int return 0 }");
        assert_eq!(err.msg, "Variable x already declared");
    }

    #[test]
    fn test_missing_main_rejected() {
        let err = bind_err("func f(): int { return 0 }");
        assert_eq!(err.msg, "No main function declared");
    }

    #[test]
    fn test_function_sees_itself_but_not_later_functions() {
        // self-recursion works
        bound("func fact(n: int): int { return n } func main(): int { return call fact(3) }");
        // a call to a function declared later does not resolve
        let err = bind_err("func main(): int { return call f(1) } func f(n: int): int { return n }");
        assert_eq!(err.msg, "Undefined identifier f");
    }
}
