//! Expression parsing by precedence climbing
//!
//! Expressions are parsed separately from the block grammar: a primary is
//! read by [`nud`] and then extended with binary operators whose binding
//! power is at least the current minimum.

pub mod nud;
pub mod precedence;

pub use precedence::*;

use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseResult, ParserState};

impl ParserState {
    /// `EXPRESSION -> E`
    pub fn parse_expression(&mut self) -> ParseResult<NodeId> {
        let inner = self.precedence_climber(0)?;
        Ok(self.ast.wrap(NodeKind::Expression, None, &[inner]))
    }

    /// `CONDITION -> E`
    pub fn parse_condition(&mut self) -> ParseResult<NodeId> {
        let inner = self.precedence_climber(0)?;
        Ok(self.ast.wrap(NodeKind::Condition, None, &[inner]))
    }

    /// Parse a primary, then fold in operators binding at least `min_bp`
    ///
    /// Operator nodes are terminals holding the operator token with the
    /// left and right operands as children.
    pub fn precedence_climber(
        &mut self,
        min_bp: u8,
    ) -> ParseResult<NodeId> {
        let mut lhs = self.parse_primary()?;

        loop {
            if BP_TERM >= min_bp {
                self.split_glued_literal();
            }

            let Some((bp, assoc)) = binary_precedence(self.current().kind) else {
                break;
            };
            if bp < min_bp {
                break;
            }

            let op = self.bump();
            let rhs = self.precedence_climber(right_binding_power(bp, assoc))?;
            lhs = self.ast.wrap(NodeKind::Terminal, Some(op), &[lhs, rhs]);
        }

        Ok(lhs)
    }
}
