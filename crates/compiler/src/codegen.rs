//! Code generation for the Tau stack machine
//!
//! Walks the fully annotated tree and emits a flat instruction list. The
//! calling convention matches the frame layout of the offsets pass:
//!
//! - The caller writes argument `i` at `SP - 2 - i` and calls through the
//!   callee's label; `Call` leaves the return address on the eval stack.
//! - The prologue spills the return address to slot 0, saves the caller's
//!   FP and SP in slots 1 and 2, then sets `FP <- SP` and bumps SP by the
//!   frame size.
//! - `return e` writes `e` into the slot at `FP - 1`; after the call the
//!   caller reads it back from `SP - 1`.
//! - The epilogue reloads the return address, restores SP and FP from the
//!   saved slots, and jumps indirect.
//!
//! Boolean operators never materialize intermediate values: `and`, `or`,
//! and `not` compile to short-circuit branch trees via [`CodeGen::control`],
//! and only produce a 0/1 when a value is genuinely needed.

use crate::ast::{CompoundStmt, Expr, ExprKind, FuncDecl, Program, Stmt, StmtKind};
use crate::error::{CompileError, Result};
use crate::symbols::SymbolTable;
use crate::tokens::TokenKind;
use tau_vm::{Insn, Op};

/// Generate the instruction list for a bound, typed, offset program.
pub fn generate(program: &Program, symbols: &SymbolTable) -> Result<Vec<Insn>> {
    let mut codegen = CodeGen {
        symbols,
        insns: Vec::new(),
        next_label: 0,
    };
    codegen.program(program)?;
    Ok(codegen.insns)
}

struct CodeGen<'a> {
    symbols: &'a SymbolTable,
    insns: Vec<Insn>,
    next_label: usize,
}

impl CodeGen<'_> {
    fn emit(&mut self, op: Op) {
        self.insns.push(Insn::new(op));
    }

    fn note(&mut self, op: Op, comment: &str) {
        self.insns.push(Insn::with_comment(op, comment));
    }

    /// A label no other emission in this run can collide with.
    fn fresh(&mut self, prefix: &str) -> String {
        let label = format!("{}{}", prefix, self.next_label);
        self.next_label += 1;
        label
    }

    fn program(&mut self, ast: &Program) -> Result<()> {
        self.emit(Op::PushLabel("main".to_string()));
        self.emit(Op::Call);
        self.emit(Op::Halt);
        for decl in &ast.decls {
            self.emit(Op::Label(decl.id.name().to_string()));
            self.func_decl(decl)?;
        }
        // sentinel in case control ever falls past the last function
        self.emit(Op::Halt);
        Ok(())
    }

    fn func_decl(&mut self, ast: &FuncDecl) -> Result<()> {
        self.prologue(ast.size);
        self.compound(&ast.body)?;
        // tail epilogue for bodies that fall off the end
        self.epilogue();
        Ok(())
    }

    /// On entry the return address sits on the eval stack (pushed by
    /// `Call`) and SP still points at the caller's frame top.
    fn prologue(&mut self, size: i64) {
        self.note(Op::PushSp(0), "address of return-address slot");
        self.emit(Op::Swap);
        self.emit(Op::Store);
        self.note(Op::PushSp(1), "address of saved-FP slot");
        self.note(Op::PushFp(0), "FP value to save");
        self.emit(Op::Store);
        self.note(Op::PushSp(2), "address of saved-SP slot");
        self.note(Op::PushSp(0), "SP value to save");
        self.emit(Op::Store);
        self.emit(Op::PushSp(0));
        self.note(Op::PopFp, "FP <- SP");
        self.emit(Op::PushSp(size));
        self.note(Op::PopSp, "SP <- SP + frame size");
    }

    /// SP must be restored before FP: the saved-FP slot is addressed
    /// through the callee's FP, which the final pop replaces.
    fn epilogue(&mut self) {
        self.note(Op::PushFp(0), "return address");
        self.emit(Op::Load);
        self.note(Op::PushFp(2), "saved SP");
        self.emit(Op::Load);
        self.emit(Op::PopSp);
        self.note(Op::PushFp(1), "saved FP");
        self.emit(Op::Load);
        self.emit(Op::PopFp);
        self.emit(Op::JumpIndirect);
    }

    fn compound(&mut self, ast: &CompoundStmt) -> Result<()> {
        for decl in &ast.decls {
            if matches!(decl.semantic_type, crate::symbols::Type::Array(_)) {
                return Err(CompileError::new(
                    "Arrays are not supported in code generation",
                    decl.span,
                ));
            }
        }
        for stmt in &ast.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, ast: &Stmt) -> Result<()> {
        match &ast.kind {
            StmtKind::Compound(compound) => self.compound(compound),
            StmtKind::Assign { lhs, rhs } => {
                self.lval(lhs)?;
                self.rval(rhs)?;
                self.emit(Op::Store);
                Ok(())
            }
            StmtKind::Print(expr) => {
                self.rval(expr)?;
                self.emit(Op::Print);
                Ok(())
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let else_label = self.fresh("else");
                let exit_label = self.fresh("exit");
                self.control(cond, &else_label, false)?;
                self.stmt(then_stmt)?;
                self.emit(Op::Jump(exit_label.clone()));
                self.emit(Op::Label(else_label));
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt)?;
                }
                self.emit(Op::Label(exit_label));
                Ok(())
            }
            StmtKind::While { cond, body } => {
                let top_label = self.fresh("top");
                let exit_label = self.fresh("exit");
                self.emit(Op::Label(top_label.clone()));
                self.control(cond, &exit_label, false)?;
                self.stmt(body)?;
                self.emit(Op::Jump(top_label));
                self.emit(Op::Label(exit_label));
                Ok(())
            }
            StmtKind::Return { expr, .. } => {
                if let Some(expr) = expr {
                    self.note(Op::PushFp(-1), "return value slot");
                    self.rval(expr)?;
                    self.emit(Op::Store);
                }
                self.epilogue();
                Ok(())
            }
            StmtKind::Call(call) => {
                self.rval(call)?;
                // the fetched return value is unused in statement position
                self.emit(Op::Pop);
                Ok(())
            }
        }
    }

    /// Push the address an assignable expression denotes: a label index
    /// for globals, `FP + offset` for parameters and locals.
    fn lval(&mut self, ast: &Expr) -> Result<()> {
        match &ast.kind {
            ExprKind::Id(id) => {
                let symbol_id = id.symbol.ok_or_else(|| {
                    CompileError::new(format!("Undefined identifier {}", id.name()), id.span)
                })?;
                if self.symbols.is_global(symbol_id) {
                    self.emit(Op::PushLabel(id.name().to_string()));
                } else {
                    let offset = self.symbols.symbol(symbol_id).offset;
                    self.emit(Op::PushFp(offset));
                }
                Ok(())
            }
            ExprKind::ArrayCell { .. } => Err(CompileError::new(
                "Arrays are not supported in code generation",
                ast.span,
            )),
            _ => Err(CompileError::new("Expression is not assignable", ast.span)),
        }
    }

    /// Push the value an expression evaluates to.
    fn rval(&mut self, ast: &Expr) -> Result<()> {
        match &ast.kind {
            ExprKind::Id(_) => {
                self.lval(ast)?;
                self.emit(Op::Load);
                Ok(())
            }
            ExprKind::IntLiteral(value) => {
                self.emit(Op::PushImmediate(*value));
                Ok(())
            }
            ExprKind::BoolLiteral(value) => {
                self.emit(Op::PushImmediate(*value as i64));
                Ok(())
            }
            ExprKind::Call { callee, args } => {
                for (i, arg) in args.iter().enumerate() {
                    self.note(Op::PushSp(-(i as i64) - 2), "argument slot");
                    self.rval(arg)?;
                    self.emit(Op::Store);
                }
                self.lval(callee)?;
                self.emit(Op::Call);
                self.note(Op::PushSp(-1), "return value slot");
                self.emit(Op::Load);
                Ok(())
            }
            ExprKind::ArrayCell { .. } => Err(CompileError::new(
                "Arrays are not supported in code generation",
                ast.span,
            )),
            ExprKind::Binary { op, left, right } => {
                if let Some(insn) = arithmetic_op(op.kind) {
                    self.rval(left)?;
                    self.rval(right)?;
                    self.emit(insn);
                    return Ok(());
                }
                if let Some(insn) = comparison_op(op.kind) {
                    self.rval(left)?;
                    self.rval(right)?;
                    self.emit(insn);
                    return Ok(());
                }
                match op.kind {
                    TokenKind::And | TokenKind::Or => self.materialize_bool(ast),
                    other => Err(CompileError::new(
                        format!("Unknown binary operator {}", other),
                        op.span,
                    )),
                }
            }
            ExprKind::Unary { op, operand } => match op.kind {
                TokenKind::Minus => {
                    self.rval(operand)?;
                    self.emit(Op::PushImmediate(-1));
                    self.emit(Op::Mul);
                    Ok(())
                }
                TokenKind::Not => self.materialize_bool(ast),
                other => Err(CompileError::new(
                    format!("Unknown unary operator {}", other),
                    op.span,
                )),
            },
        }
    }

    /// Turn a short-circuit boolean expression into a 0/1 on the stack.
    fn materialize_bool(&mut self, ast: &Expr) -> Result<()> {
        let true_label = self.fresh("true");
        let exit_label = self.fresh("exit");
        self.control(ast, &true_label, true)?;
        self.emit(Op::PushImmediate(0));
        self.emit(Op::Jump(exit_label.clone()));
        self.emit(Op::Label(true_label));
        self.emit(Op::PushImmediate(1));
        self.emit(Op::Label(exit_label));
        Ok(())
    }

    /// Emit code that jumps to `label` iff `expr` evaluates to `sense`,
    /// and falls through otherwise, short-circuiting along the way.
    fn control(&mut self, expr: &Expr, label: &str, sense: bool) -> Result<()> {
        match &expr.kind {
            ExprKind::BoolLiteral(value) => {
                if *value == sense {
                    self.emit(Op::Jump(label.to_string()));
                }
                Ok(())
            }
            ExprKind::Id(_) | ExprKind::Call { .. } => {
                self.rval(expr)?;
                self.branch(label, sense);
                Ok(())
            }
            ExprKind::Unary { op, operand } if op.kind == TokenKind::Not => {
                self.control(operand, label, !sense)
            }
            ExprKind::Binary { op, left, right } => match op.kind {
                TokenKind::And => {
                    if sense {
                        let exit_label = self.fresh("exit");
                        self.control(left, &exit_label, false)?;
                        self.control(right, label, true)?;
                        self.emit(Op::Label(exit_label));
                    } else {
                        self.control(left, label, false)?;
                        self.control(right, label, false)?;
                    }
                    Ok(())
                }
                TokenKind::Or => {
                    if sense {
                        self.control(left, label, true)?;
                        self.control(right, label, true)?;
                    } else {
                        let exit_label = self.fresh("exit");
                        self.control(left, &exit_label, true)?;
                        self.control(right, label, false)?;
                        self.emit(Op::Label(exit_label));
                    }
                    Ok(())
                }
                _ => match comparison_op(op.kind) {
                    Some(insn) => {
                        self.rval(left)?;
                        self.rval(right)?;
                        self.emit(insn);
                        self.branch(label, sense);
                        Ok(())
                    }
                    None => Err(CompileError::new(
                        "Cannot branch on this expression",
                        expr.span,
                    )),
                },
            },
            _ => Err(CompileError::new(
                "Cannot branch on this expression",
                expr.span,
            )),
        }
    }

    fn branch(&mut self, label: &str, sense: bool) {
        if sense {
            self.emit(Op::JumpIfNotZero(label.to_string()));
        } else {
            self.emit(Op::JumpIfZero(label.to_string()));
        }
    }
}

fn arithmetic_op(kind: TokenKind) -> Option<Op> {
    let op = match kind {
        TokenKind::Plus => Op::Add,
        TokenKind::Minus => Op::Sub,
        TokenKind::Star => Op::Mul,
        TokenKind::Slash => Op::Div,
        _ => return None,
    };
    Some(op)
}

fn comparison_op(kind: TokenKind) -> Option<Op> {
    let op = match kind {
        TokenKind::Less => Op::LessThan,
        TokenKind::LessEqual => Op::LessThanEqual,
        TokenKind::Greater => Op::GreaterThan,
        TokenKind::GreaterEqual => Op::GreaterThanEqual,
        TokenKind::EqualEqual => Op::Equal,
        TokenKind::BangEqual => Op::NotEqual,
        _ => return None,
    };
    Some(op)
}
