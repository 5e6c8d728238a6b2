//! Runtime error types for the stack machine.

use std::fmt;

/// Fatal conditions raised while building or running an [`Execution`].
///
/// Every variant aborts the current invocation; there is no recovery.
///
/// [`Execution`]: crate::machine::Execution
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    /// Two `Label` instructions carry the same name.
    DuplicateLabel(String),
    /// An instruction references a label that is never defined.
    UndefinedLabel(String),
    /// An instruction needed more stack entries than were present.
    StackUnderflow { pc: usize },
    /// A load or store touched memory outside the legal range.
    OutOfBoundsMemory { addr: i64, pc: usize },
    /// `Div` with a zero divisor.
    DivisionByZero { pc: usize },
    /// A popped jump or call target does not index the instruction list.
    BadJumpTarget { target: i64, pc: usize },
    /// A positional program argument was not an integer.
    BadArgument(String),
    /// SP did not return to its initial value when the program halted.
    UnbalancedStackPointer { sp: i64, expected: i64 },
    /// Writing program output failed.
    Io(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::DuplicateLabel(label) => write!(f, "Duplicate label: {}", label),
            VmError::UndefinedLabel(label) => write!(f, "Undefined label: {}", label),
            VmError::StackUnderflow { pc } => write!(f, "Stack underflow at pc {}", pc),
            VmError::OutOfBoundsMemory { addr, pc } => {
                write!(f, "Out of bounds memory access {} at pc {}", addr, pc)
            }
            VmError::DivisionByZero { pc } => write!(f, "Division by zero at pc {}", pc),
            VmError::BadJumpTarget { target, pc } => {
                write!(f, "Bad jump target {} at pc {}", target, pc)
            }
            VmError::BadArgument(arg) => write!(f, "Invalid argument: {}", arg),
            VmError::UnbalancedStackPointer { sp, expected } => {
                write!(f, "Stack pointer not restored: SP is {}, expected {}", sp, expected)
            }
            VmError::Io(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(e: std::io::Error) -> Self {
        VmError::Io(e.to_string())
    }
}
