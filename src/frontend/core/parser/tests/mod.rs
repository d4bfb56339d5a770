//! Parser tests module
//!
//! - blocks: every top-level block and its children
//! - expressions: precedence, associativity and primaries
//! - errors: rejected input and the token each error names
//! - fuzz: generated expressions and arbitrary text

mod errors;
mod fuzz;

use crate::frontend::core::lexer::tokenize;
use crate::frontend::core::parser::{parse, Ast, NodeId, NodeKind, ParseError};

pub(super) fn parse_source(source: &str) -> Ast {
    parse(&tokenize(source).unwrap()).unwrap()
}

pub(super) fn parse_err(source: &str) -> ParseError {
    parse(&tokenize(source).unwrap()).unwrap_err()
}

/// The `n`th top-level block
pub(super) fn block(
    ast: &Ast,
    n: usize,
) -> NodeId {
    ast.child(ast.root(), n).unwrap()
}

pub(super) fn lexeme(
    ast: &Ast,
    id: NodeId,
) -> &str {
    &ast.token(id).unwrap().lexeme
}

/// Kinds of a node's children, for shape assertions
pub(super) fn child_kinds(
    ast: &Ast,
    id: NodeId,
) -> Vec<NodeKind> {
    ast.children(id).iter().map(|&c| ast.kind(c)).collect()
}
