//! Tau compiler library
//!
//! Compiles Tau source through a linear pipeline into instructions for
//! the stack VM in `tau-vm`, then executes them:
//!
//! ```text
//! source -> tokens -> AST -> bind -> typecheck -> offsets -> codegen -> VM
//! ```
//!
//! [`compile`] runs the whole pipeline; [`compile_until`] stops after a
//! named phase (the `--stopafter` switch); [`run_file`] is the driver
//! entry the `tauc` binary and the test harness share.

pub mod ast;
pub mod bindings;
pub mod codegen;
pub mod error;
pub mod offsets;
pub mod parser;
pub mod scanner;
pub mod symbols;
pub mod testing;
pub mod tokens;
pub mod typecheck;

pub use error::CompileError;
pub use parser::Parser;
pub use scanner::Scanner;
pub use symbols::{SymbolTable, Type};
pub use testing::{TestManifest, TestRunner};

use std::fs;
use std::io;
use std::path::Path;

use tau_vm::Insn;

/// Compilation phases `--stopafter` can halt behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanner,
    Parser,
    Bindings,
    Typecheck,
    Offsets,
}

/// Compile Tau source to a VM instruction list.
pub fn compile(source: &str) -> error::Result<Vec<Insn>> {
    let scanner = Scanner::new(source)?;
    let mut program = Parser::new(scanner).parse()?;
    let mut symbols = bindings::bind(&mut program)?;
    typecheck::check(&mut program, &mut symbols)?;
    offsets::assign(&mut program, &mut symbols);
    codegen::generate(&program, &symbols)
}

/// Run the pipeline, stopping after `phase`. `None` compiles fully and
/// yields the instruction list; an early stop yields `None`.
pub fn compile_until(source: &str, phase: Option<Phase>) -> error::Result<Option<Vec<Insn>>> {
    let scanner = Scanner::new(source)?;
    if phase == Some(Phase::Scanner) {
        return Ok(None);
    }
    let mut program = Parser::new(scanner).parse()?;
    if phase == Some(Phase::Parser) {
        return Ok(None);
    }
    let mut symbols = bindings::bind(&mut program)?;
    if phase == Some(Phase::Bindings) {
        return Ok(None);
    }
    typecheck::check(&mut program, &mut symbols)?;
    if phase == Some(Phase::Typecheck) {
        return Ok(None);
    }
    offsets::assign(&mut program, &mut symbols);
    if phase == Some(Phase::Offsets) {
        return Ok(None);
    }
    codegen::generate(&program, &symbols).map(Some)
}

/// Compile and execute a source file the way the CLI does: compile (or
/// stop early), dump the instruction listing when verbose, then launch
/// the VM with the given positional integer arguments. Program output
/// goes to stdout, diagnostics to stderr.
pub fn run_file(
    path: &Path,
    args: &[String],
    verbose: bool,
    stop_after: Option<Phase>,
) -> Result<(), String> {
    let source =
        fs::read_to_string(path).map_err(|e| format!("Failed to read source file: {}", e))?;
    run_source(&source, args, verbose, stop_after)
}

/// [`run_file`] for source text already in memory.
pub fn run_source(
    source: &str,
    args: &[String],
    verbose: bool,
    stop_after: Option<Phase>,
) -> Result<(), String> {
    let insns = match compile_until(source, stop_after).map_err(|e| e.to_string())? {
        Some(insns) => insns,
        None => return Ok(()),
    };
    if verbose {
        tau_vm::dump_listing(&insns, &mut io::stderr()).map_err(|e| e.to_string())?;
    }
    let mut stdout = io::stdout();
    tau_vm::invoke(insns, args, verbose, &mut stdout).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_compile_until_stops_early() {
        // this program scans and parses but does not bind
        let source = "func main(): int { print y return 0 }";
        assert_eq!(compile_until(source, Some(Phase::Scanner)).unwrap(), None);
        assert_eq!(compile_until(source, Some(Phase::Parser)).unwrap(), None);
        let err = compile_until(source, Some(Phase::Bindings)).unwrap_err();
        assert_eq!(err.msg, "Undefined identifier y");
    }

    #[test]
    fn test_compile_until_none_compiles_fully() {
        let insns = compile_until("func main(): int { return 0 }", None)
            .unwrap()
            .unwrap();
        assert!(!insns.is_empty());
    }

    #[test]
    fn test_error_rendering_carries_position() {
        let err = compile("func main(): int { print y return 0 }").unwrap_err();
        assert_eq!(err.to_string(), "1:26: Undefined identifier y");
    }

    #[test]
    fn test_run_file_reads_and_executes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("three.tau");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "func main(): int {{ print 3 return 0 }}").unwrap();
        run_file(&path, &[], false, None).unwrap();
    }

    #[test]
    fn test_run_file_missing_file() {
        let err = run_file(Path::new("/nonexistent/x.tau"), &[], false, None).unwrap_err();
        assert!(err.starts_with("Failed to read source file"));
    }

    #[test]
    fn test_run_source_rejects_bad_arguments() {
        let err = run_source(
            "func main(): int { return 0 }",
            &["ten".to_string()],
            false,
            None,
        )
        .unwrap_err();
        assert_eq!(err, "Invalid argument: ten");
    }
}
