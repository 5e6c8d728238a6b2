//! Tau stack virtual machine
//!
//! The execution substrate for compiled Tau programs: a closed instruction
//! set ([`Insn`]/[`Op`]), a textual assembly format that round-trips
//! through [`asm::parse`] and [`insns::dump`], and the [`Execution`]
//! machine that runs instructions against an evaluation stack, a flat
//! integer memory, and the PC/FP/SP registers.
//!
//! The compiler crate produces `Vec<Insn>`; [`invoke`] launches it with a
//! program argument list the way the CLI driver does.

pub mod asm;
pub mod error;
pub mod insns;
pub mod machine;

pub use error::VmError;
pub use insns::{Insn, Op, dis, dump, dump_listing};
pub use machine::{Execution, MEMORY_SLOTS, invoke};
