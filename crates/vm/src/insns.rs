//! Instruction set for the Tau stack machine
//!
//! Every instruction is an [`Op`] plus an optional comment that survives
//! disassembly and re-assembly. Each opcode has a verbose and a concise
//! mnemonic; both forms are accepted by the assembler and either can be
//! emitted by [`dis`].

use std::fmt;

/// A single VM instruction: opcode plus optional trailing comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Insn {
    pub op: Op,
    pub comment: Option<String>,
}

impl Insn {
    pub fn new(op: Op) -> Self {
        Insn { op, comment: None }
    }

    pub fn with_comment(op: Op, comment: impl Into<String>) -> Self {
        Insn {
            op,
            comment: Some(comment.into()),
        }
    }
}

impl From<Op> for Insn {
    fn from(op: Op) -> Self {
        Insn::new(op)
    }
}

/// The closed opcode set.
///
/// Stack diagrams read bottom-to-top, `x` below `y` means `y` is on top.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Jump target marker. No stack effect; execution falls through.
    Label(String),
    /// No effect.
    Noop,
    /// `PC <- label`.
    Jump(String),
    /// Pop `v`; `PC <- label` iff `v == 0`.
    JumpIfZero(String),
    /// Pop `v`; `PC <- label` iff `v != 0`.
    JumpIfNotZero(String),
    /// Pop `v`; `PC <- v`.
    JumpIndirect,
    /// Push the immediate value.
    PushImmediate(i64),
    /// Push the instruction index of the label.
    PushLabel(String),
    /// Pop address; push `memory[address]`.
    Load,
    /// Pop `v`, pop address; `memory[address] <- v`.
    Store,
    /// Pop `y`, pop `x`; push `x + y`.
    Add,
    /// Pop `y`, pop `x`; push `x - y`.
    Sub,
    /// Pop `y`, pop `x`; push `x * y`.
    Mul,
    /// Pop `y`, pop `x`; push `x / y` (floor division).
    Div,
    /// Pop `v`; push `-v`.
    Negate,
    /// Pop `y`, pop `x`; push `1` if `x < y` else `0`.
    LessThan,
    /// Pop `y`, pop `x`; push `1` if `x > y` else `0`.
    GreaterThan,
    /// Pop `y`, pop `x`; push `1` if `x <= y` else `0`.
    LessThanEqual,
    /// Pop `y`, pop `x`; push `1` if `x >= y` else `0`.
    GreaterThanEqual,
    /// Pop `y`, pop `x`; push `1` if `x == y` else `0`.
    Equal,
    /// Pop `y`, pop `x`; push `1` if `x != y` else `0`.
    NotEqual,
    /// Pop `v`; push `1` if `v == 0` else `0`.
    Not,
    /// Pop `v`; write `v` and a newline to the output sink.
    Print,
    /// Push `FP + offset`.
    PushFp(i64),
    /// Pop `v`; `FP <- v`.
    PopFp,
    /// Push `SP + offset`.
    PushSp(i64),
    /// Pop `v`; `SP <- v`.
    PopSp,
    /// Discard the top of stack.
    Pop,
    /// Swap the top two stack entries.
    Swap,
    /// Pop the call target; push the return address (`PC + 1`); `PC <- target`.
    Call,
    /// Spill the whole eval stack into memory at SP, followed by its length.
    SaveEvalStack,
    /// Reload an eval stack previously spilled by `SaveEvalStack`.
    RestoreEvalStack,
    /// Stop execution.
    Halt,
}

impl Op {
    /// Verbose or concise mnemonic for this opcode.
    pub fn mnemonic(&self, long: bool) -> &'static str {
        let (verbose, concise) = match self {
            Op::Label(_) => ("Label", "lab"),
            Op::Noop => ("Noop", "noop"),
            Op::Jump(_) => ("Jump", "j"),
            Op::JumpIfZero(_) => ("JumpIfZero", "jz"),
            Op::JumpIfNotZero(_) => ("JumpIfNotZero", "jnz"),
            Op::JumpIndirect => ("JumpIndirect", "ji"),
            Op::PushImmediate(_) => ("PushImmediate", "push"),
            Op::PushLabel(_) => ("PushLabel", "pushl"),
            Op::Load => ("Load", "ld"),
            Op::Store => ("Store", "st"),
            Op::Add => ("Add", "add"),
            Op::Sub => ("Sub", "sub"),
            Op::Mul => ("Mul", "mul"),
            Op::Div => ("Div", "div"),
            Op::Negate => ("Negate", "neg"),
            Op::LessThan => ("LessThan", "lt"),
            Op::GreaterThan => ("GreaterThan", "gt"),
            Op::LessThanEqual => ("LessThanEqual", "leq"),
            Op::GreaterThanEqual => ("GreaterThanEqual", "geq"),
            Op::Equal => ("Equal", "eq"),
            Op::NotEqual => ("NotEqual", "neq"),
            Op::Not => ("Not", "not"),
            Op::Print => ("Print", "print"),
            Op::PushFp(_) => ("PushFP", "pushFP"),
            Op::PopFp => ("PopFP", "popFP"),
            Op::PushSp(_) => ("PushSP", "pushSP"),
            Op::PopSp => ("PopSP", "popSP"),
            Op::Pop => ("Pop", "pop"),
            Op::Swap => ("Swap", "swap"),
            Op::Call => ("Call", "call"),
            Op::SaveEvalStack => ("SaveEvalStack", "save"),
            Op::RestoreEvalStack => ("RestoreEvalStack", "restore"),
            Op::Halt => ("Halt", "halt"),
        };
        if long { verbose } else { concise }
    }

    /// The label operand, if this opcode carries one.
    pub fn label(&self) -> Option<&str> {
        match self {
            Op::Label(l)
            | Op::Jump(l)
            | Op::JumpIfZero(l)
            | Op::JumpIfNotZero(l)
            | Op::PushLabel(l) => Some(l),
            _ => None,
        }
    }
}

/// Disassemble one instruction.
///
/// `long` selects the verbose mnemonic; `indent` prefixes spaces (labels
/// are never indented, so listings read like assembly source).
pub fn dis(insn: &Insn, long: bool, indent: usize) -> String {
    let indentation = match insn.op {
        Op::Label(_) => String::new(),
        _ => " ".repeat(indent),
    };
    let mut out = format!("{}{}", indentation, insn.op.mnemonic(long));
    match &insn.op {
        Op::Label(l)
        | Op::Jump(l)
        | Op::JumpIfZero(l)
        | Op::JumpIfNotZero(l)
        | Op::PushLabel(l) => {
            out.push_str(&format!(" {:?}", l));
        }
        Op::PushImmediate(v) => out.push_str(&format!(" {}", v)),
        Op::PushFp(v) | Op::PushSp(v) => out.push_str(&format!(" {}", v)),
        _ => {}
    }
    if let Some(comment) = &insn.comment {
        out.push_str(&format!(" {:?}", comment));
    }
    out
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", dis(self, true, 0))
    }
}

/// Render a whole instruction list as assembly text, one instruction per
/// line in the requested form. The result re-assembles to an equal list.
pub fn dump(insns: &[Insn], long: bool) -> String {
    let mut out = String::new();
    for insn in insns {
        out.push_str(&dis(insn, long, 8));
        out.push('\n');
    }
    out
}

/// Numbered instruction listing for verbose runs.
pub fn dump_listing(insns: &[Insn], out: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(out, "Instructions:")?;
    for (i, insn) in insns.iter().enumerate() {
        writeln!(out, "[{:5}] {}", i, dis(insn, false, 8))?;
    }
    Ok(())
}
