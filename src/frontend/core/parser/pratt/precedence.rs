//! Operator precedence for the expression climber
//!
//! Higher binds tighter. Tokens without an entry are not binary operators
//! and end an expression.

use crate::frontend::core::lexer::tokens::TokenKind;

pub const BP_LOGICAL: u8 = 10;
pub const BP_COMPARISON: u8 = 20;
pub const BP_OPTIMIZE: u8 = 30;
pub const BP_INTERVAL: u8 = 40;
pub const BP_TERM: u8 = 70;
pub const BP_FACTOR: u8 = 80;
pub const BP_RAISE: u8 = 90;
pub const BP_DOT: u8 = 100;
pub const BP_ARROW: u8 = 110;

/// Operator associativity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Binding power and associativity of a binary operator
pub fn binary_precedence(kind: TokenKind) -> Option<(u8, Assoc)> {
    let entry = match kind {
        TokenKind::ArrowIndex => (BP_ARROW, Assoc::Left),
        TokenKind::DotIndex => (BP_DOT, Assoc::Left),
        TokenKind::Raise => (BP_RAISE, Assoc::Right),
        TokenKind::Multiply | TokenKind::Divide => (BP_FACTOR, Assoc::Left),
        TokenKind::Plus | TokenKind::Minus => (BP_TERM, Assoc::Left),
        TokenKind::Within | TokenKind::Outside => (BP_INTERVAL, Assoc::Left),
        TokenKind::Maximize | TokenKind::Minimize => (BP_OPTIMIZE, Assoc::Left),
        TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::Le
        | TokenKind::Ge
        | TokenKind::Eq
        | TokenKind::Ne => (BP_COMPARISON, Assoc::Left),
        TokenKind::And | TokenKind::Or => (BP_LOGICAL, Assoc::Left),
        _ => return None,
    };
    Some(entry)
}

/// Minimum binding power for the right operand of an operator
pub fn right_binding_power(
    bp: u8,
    assoc: Assoc,
) -> u8 {
    match assoc {
        Assoc::Left => bp + 1,
        Assoc::Right => bp,
    }
}
