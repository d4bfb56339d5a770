//! Intermediate representation and lowering
//!
//! This module handles the transformation from AST to a flat instruction
//! stream, and the interface code generators consume it through.

pub mod backend;
pub mod ir;
pub mod ir_gen;

pub use backend::{drive, render_listing, Backend, BackendError, ListingBackend};
pub use ir::{Instruction, InstructionStream, Opcode, Operand, Species};
pub use ir_gen::{lower, IrGenerator, LoweringConfig, LoweringError, LoweringResult};
