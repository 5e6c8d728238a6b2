//! Frame-offset assignment
//!
//! Computes the stack frame layout every call relies on. Relative to a
//! function's FP:
//!
//! ```text
//!   -(2+n)  parameter n-1 (last)
//!     ...
//!     -2    parameter 0
//!     -1    return value slot
//!      0    saved return address
//!      1    saved FP
//!      2    saved SP
//!      3    first local
//!     ...
//!   size-1  top of frame
//! ```
//!
//! Parameters get offsets `-2, -3, …` in declaration order. Locals get a
//! single slot each (arrays are not lowered) from a running counter that
//! starts at 3 and never resets, so every local in a function has a
//! distinct slot even across sibling compounds. The frame size adds four
//! slots past the high-water mark for the return slot, the bookkeeping
//! triple, and the outgoing-argument region; calls with more than three
//! arguments widen the frame so argument slots stay clear of locals.

use crate::ast::{CompoundStmt, Expr, ExprKind, FuncDecl, Program, Stmt, StmtKind, TypeAstKind};
use crate::symbols::SymbolTable;

/// Assign every parameter and local its frame slot and size every frame.
pub fn assign(program: &mut Program, symbols: &mut SymbolTable) {
    for decl in &mut program.decls {
        func_decl(decl, symbols);
    }
}

fn func_decl(ast: &mut FuncDecl, symbols: &mut SymbolTable) {
    for (i, param) in ast.params.iter().enumerate() {
        if let Some(symbol) = param.id.symbol {
            symbols.symbol_mut(symbol).offset = -2 - i as i64;
        }
    }
    let mut layout = Layout {
        symbols,
        next: 3,
        max_call_args: 0,
    };
    layout.compound(&ast.body);
    let headroom = 4 + (layout.max_call_args as i64 - 3).max(0);
    ast.size = layout.next + headroom;
}

struct Layout<'a> {
    symbols: &'a mut SymbolTable,
    /// Next free local slot; the final value is the frame's high-water mark.
    next: i64,
    /// Widest argument list of any call in the function.
    max_call_args: usize,
}

impl Layout<'_> {
    fn compound(&mut self, ast: &CompoundStmt) {
        for decl in &ast.decls {
            if let Some(symbol) = decl.id.symbol {
                self.symbols.symbol_mut(symbol).offset = self.next;
            }
            // One slot regardless of the declared type
            self.next += 1;
            if let TypeAstKind::Array { size: Some(size), .. } = &decl.type_ast.kind {
                self.expr(size);
            }
        }
        for stmt in &ast.stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, ast: &Stmt) {
        match &ast.kind {
            StmtKind::Compound(compound) => self.compound(compound),
            StmtKind::Assign { lhs, rhs } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.expr(cond);
                self.stmt(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond);
                self.stmt(body);
            }
            StmtKind::Return { expr, .. } => {
                if let Some(expr) = expr {
                    self.expr(expr);
                }
            }
            StmtKind::Call(call) => self.expr(call),
            StmtKind::Print(expr) => self.expr(expr),
        }
    }

    fn expr(&mut self, ast: &Expr) {
        match &ast.kind {
            ExprKind::Call { callee, args } => {
                self.max_call_args = self.max_call_args.max(args.len());
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::ArrayCell { array, index } => {
                self.expr(array);
                self.expr(index);
            }
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Id(_) | ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) => {}
        }
    }
}
