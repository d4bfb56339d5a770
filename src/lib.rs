//! adlc - analysis description language front end
//!
//! Turns an ADL analysis file into a flat, branch-free instruction stream
//! that a code generator can consume one instruction at a time.
//!
//! # Example
//!
//! ```no_run
//! use adlc::{compile, Result};
//!
//! fn main() -> Result<()> {
//!     let mut stream = compile("obj goodJets : jet\n  select pT(jet) > 30\n")?;
//!     while let Some(instruction) = stream.take() {
//!         println!("{}", instruction);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

// Public modules
pub mod frontend;
pub mod middle;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use frontend::{CompileError, Compiler};
pub use middle::{Instruction, InstructionStream, Opcode, Operand};

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::util::config::CompilerConfig;

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiler name
pub const NAME: &str = "adlc (ADL front-end compiler)";

/// Compile ADL source with the default configuration
pub fn compile(source: &str) -> Result<InstructionStream> {
    compile_with_config(source, &CompilerConfig::default())
}

/// Compile ADL source honouring `config`
pub fn compile_with_config(
    source: &str,
    config: &CompilerConfig,
) -> Result<InstructionStream> {
    let stream = Compiler::with_config(config).compile(source)?;
    Ok(stream)
}

/// Compile an ADL file
pub fn compile_file(
    path: &Path,
    config: &CompilerConfig,
) -> Result<InstructionStream> {
    debug!("Compiling file {}", path.display());
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    compile_with_config(&source, config)
        .with_context(|| format!("Failed to compile: {}", path.display()))
}
