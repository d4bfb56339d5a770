//! Parser module
//!
//! Recursive descent over blocks, with a precedence climber for
//! expressions. This module provides the entry point turning a token list
//! into an [`Ast`].

pub mod ast;
pub mod parser_state;
pub mod pratt;
pub mod statements;
#[cfg(test)]
mod tests;

pub use ast::*;
pub use parser_state::{ParseError, ParseResult, ParserState};
pub use pratt::*;

pub use crate::frontend::core::lexer::tokens::*;

use tracing::debug;

/// Parse tokens into a syntax tree
///
/// Blocks are read until the first token that starts none; anything left
/// over at that point is an error.
pub fn parse(tokens: &[Token]) -> Result<Ast, ParseError> {
    debug!("parse: {} tokens", tokens.len());
    let mut state = ParserState::new(tokens);
    state.parse_blocks()?;

    if !state.at_end() {
        return Err(state.error_here(
            "Unexpected token follows a block - expected either a continuation of the previous block or the start of a new one",
        ));
    }

    let ast = state.into_ast();
    debug!(
        "parse: {} blocks, {} nodes",
        ast.children(ast.root()).len(),
        ast.len()
    );
    Ok(ast)
}
