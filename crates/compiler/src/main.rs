//! Tau compiler CLI
//!
//! Compiles a .tau file and runs it on the stack VM in one shot:
//!
//! ```text
//! tauc --file program.tau [--verbose] [--stopafter <phase>] [args...]
//! ```
//!
//! Trailing positional arguments are passed to the Tau program as
//! integers. Errors print as `line:col: message` on stderr and exit
//! nonzero.

use clap::{Parser as ClapParser, ValueEnum};
use std::path::PathBuf;
use std::process;

use tauc::Phase;

#[derive(ClapParser)]
#[command(name = "tauc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tau compiler - compile and run Tau programs", long_about = None)]
struct Cli {
    /// The file to compile
    #[arg(long)]
    file: PathBuf,

    /// Cause the compiler and the VM to be more verbose
    #[arg(long)]
    verbose: bool,

    /// Stop after a certain phase
    #[arg(long, value_enum, value_name = "PHASE")]
    stopafter: Option<PhaseArg>,

    /// Arguments to pass to the program as integers
    args: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PhaseArg {
    Scanner,
    Parser,
    Bindings,
    Typecheck,
    Offsets,
}

impl From<PhaseArg> for Phase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Scanner => Phase::Scanner,
            PhaseArg::Parser => Phase::Parser,
            PhaseArg::Bindings => Phase::Bindings,
            PhaseArg::Typecheck => Phase::Typecheck,
            PhaseArg::Offsets => Phase::Offsets,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let stop_after = cli.stopafter.map(Phase::from);
    if let Err(e) = tauc::run_file(&cli.file, &cli.args, cli.verbose, stop_after) {
        eprintln!("{}", e);
        process::exit(1);
    }
}
