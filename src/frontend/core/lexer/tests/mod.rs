//! Lexer tests module
//!
//! - basic: token boundaries, positions, whitespace
//! - literals: numbers and strings
//! - keywords: keyword table lookups
//! - comments: comment handling
//! - errors: malformed input

mod comments;
mod literals;

use crate::frontend::core::lexer::{tokenize, Token, TokenKind};

/// Tokens the parser would see
pub(super) fn significant(source: &str) -> Vec<Token> {
    tokenize(source)
        .unwrap()
        .into_iter()
        .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
        .collect()
}

/// Kinds of the tokens the parser would see
pub(super) fn kinds(source: &str) -> Vec<TokenKind> {
    significant(source).into_iter().map(|t| t.kind).collect()
}

/// Lexemes of the tokens the parser would see
pub(super) fn lexemes(source: &str) -> Vec<String> {
    significant(source).into_iter().map(|t| t.lexeme).collect()
}
