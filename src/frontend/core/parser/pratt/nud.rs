//! Primary expression parsing (nud - null denotation)

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseError, ParseResult, ParserState};
use crate::frontend::core::parser::pratt::precedence::BP_INTERVAL;

impl ParserState {
    /// Parse a primary expression
    pub fn parse_primary(&mut self) -> ParseResult<NodeId> {
        let tok = self.bump();

        match tok.kind {
            // E -> - E
            TokenKind::Minus => {
                let operand = self.parse_primary()?;
                Ok(self.ast.wrap(NodeKind::Negate, Some(tok), &[operand]))
            }
            // E -> not E
            TokenKind::Not => {
                let operand = self.parse_primary()?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[operand]))
            }
            // E -> ( E )
            TokenKind::OpenParen => {
                let inner = self.precedence_climber(0)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            // E -> { PARTICLE_LIST } FUNCTION
            TokenKind::OpenCurly => {
                let list = self.parse_particle_list()?;
                self.expect(TokenKind::CloseCurly)?;
                let func = self.bump();
                if !func.kind.is_particle_function() {
                    return Err(ParseError::at(
                        &func,
                        "A particle function must follow a particle list in curly braces",
                    ));
                }
                Ok(self.ast.wrap(NodeKind::Terminal, Some(func), &[list]))
            }
            // E -> [ E , E ]
            TokenKind::OpenBracket => {
                let lower = self.parse_primary()?;
                self.skip(TokenKind::Comma);
                let upper = self.parse_primary()?;
                self.expect(TokenKind::CloseBracket)?;
                Ok(self.ast.wrap(NodeKind::Interval, None, &[lower, upper]))
            }
            // E -> sort ( E , ascend|descend )
            TokenKind::Sort => {
                self.expect(TokenKind::OpenParen)?;
                let value = self.precedence_climber(0)?;
                self.expect(TokenKind::Comma)?;
                let order = self.bump();
                if !matches!(order.kind, TokenKind::Ascend | TokenKind::Descend) {
                    return Err(ParseError::at(
                        &order,
                        "Sorting order must be either ascend or descend",
                    ));
                }
                let order = self.ast.terminal(order);
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[value, order]))
            }
            // E -> anyoccurrences ( E in E )
            TokenKind::AnyOccurrences => {
                self.expect(TokenKind::OpenParen)?;
                let needle = self.precedence_climber(BP_INTERVAL + 1)?;
                self.expect(TokenKind::Within)?;
                let haystack = self.precedence_climber(BP_INTERVAL + 1)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self
                    .ast
                    .wrap(NodeKind::Terminal, Some(tok), &[needle, haystack]))
            }
            kind if kind.is_numeric_function() => {
                self.expect(TokenKind::OpenParen)?;
                let argument = self.precedence_climber(0)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[argument]))
            }
            kind if kind.is_particle_function() => {
                // without parentheses the argument is implicit (object
                // criteria) or supplied by a `.` accessor
                if !self.skip(TokenKind::OpenParen) {
                    return Ok(self.ast.terminal(tok));
                }
                let list = self.parse_particle_list()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[list]))
            }
            TokenKind::FHemisphere => {
                self.expect(TokenKind::OpenParen)?;
                let id = self.parse_id()?;
                self.expect(TokenKind::Comma)?;
                let first = self.parse_integer("FHemisphere requires integer argument in position 2")?;
                self.expect(TokenKind::Comma)?;
                let second = self.parse_integer("FHemisphere requires integer argument in position 3")?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self
                    .ast
                    .wrap(NodeKind::Terminal, Some(tok), &[id, first, second]))
            }
            TokenKind::FMegajets | TokenKind::FMr => {
                self.expect(TokenKind::OpenParen)?;
                let id = self.parse_id()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[id]))
            }
            TokenKind::FMtr => {
                self.expect(TokenKind::OpenParen)?;
                let id = self.parse_id()?;
                self.expect(TokenKind::Comma)?;
                let met = if self.at(TokenKind::Metlv) {
                    let met = self.bump();
                    self.ast.terminal(met)
                } else {
                    self.parse_id()?
                };
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[id, met]))
            }
            TokenKind::TtbarNnlorec => {
                self.expect(TokenKind::OpenParen)?;
                let mut arguments = Vec::with_capacity(4);
                for position in 1..=4 {
                    if position > 1 {
                        self.expect(TokenKind::Comma)?;
                    }
                    let message = format!(
                        "Only numerical arguments are allowed in position {} of NNLO rec",
                        position
                    );
                    arguments.push(self.parse_number(&message)?);
                }
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &arguments))
            }
            kind if kind.is_event_variable() => Ok(self.ast.terminal(tok)),
            // E -> ID ( VARIABLE_LIST ) for external functions, otherwise a
            // plain variable reference
            TokenKind::VarName | TokenKind::Str => {
                if !self.skip(TokenKind::OpenParen) {
                    return Ok(self.ast.terminal(tok));
                }
                let call = self.ast.push(NodeKind::UserFunction, Some(tok));
                self.parse_variable_list(call)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(call)
            }
            TokenKind::Min | TokenKind::Max => {
                self.expect(TokenKind::OpenParen)?;
                let node = self.ast.terminal(tok);
                self.parse_variable_list(node)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(node)
            }
            kind if kind.is_numeric() => Ok(self.ast.terminal(tok)),
            _ => Err(ParseError::at(&tok, "Invalid token used in expression")),
        }
    }
}
