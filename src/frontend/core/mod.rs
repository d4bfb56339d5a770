//! Core front-end algorithms
//!
//! The lexer and the parser; lowering lives in `middle`.

pub mod lexer;
pub mod parser;

pub use lexer::tokenize;
pub use parser::parse;
