//! `def` blocks

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseError, ParseResult, ParserState};

const PARTICLE_WITHOUT_KEYWORD: &str =
    "Cannot use a particle in a definition without specifying the \"particle\" keyword";

impl ParserState {
    /// `DEFINITION -> def ID (= | :) DEF_RVALUE`
    pub fn parse_definition(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Def)?;
        let id = self.parse_id()?;
        let assign = self.bump();
        if !matches!(assign.kind, TokenKind::Assign | TokenKind::Colon) {
            return Err(ParseError::at(
                &assign,
                "Unknown token for definition assignment, expected '=' or ':'",
            ));
        }
        let rvalue = self.parse_def_rvalue()?;
        Ok(self.ast.wrap(NodeKind::Definition, None, &[id, rvalue]))
    }

    fn parse_def_rvalue(&mut self) -> ParseResult<NodeId> {
        let kind = self.current().kind;
        match kind {
            TokenKind::OpenCurly => {
                self.bump();
                let list = self.ast.push(NodeKind::VariableList, None);
                self.parse_variable_list(list)?;
                self.expect(TokenKind::CloseCurly)?;
                Ok(list)
            }
            // OME ( DESCRIPTION , { VARIABLE_LIST } , int )
            TokenKind::Ome => {
                let ome = self.bump();
                self.expect(TokenKind::OpenParen)?;
                let description = self.parse_description()?;
                self.expect(TokenKind::Comma)?;
                self.expect(TokenKind::OpenCurly)?;
                let list = self.ast.push(NodeKind::VariableList, None);
                self.parse_variable_list(list)?;
                self.expect(TokenKind::CloseCurly)?;
                self.expect(TokenKind::Comma)?;
                let index = self.parse_integer("Integer required for indexing")?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self
                    .ast
                    .wrap(NodeKind::Terminal, Some(ome), &[description, list, index]))
            }
            TokenKind::Constituents => {
                let constituents = self.bump();
                let list = self.parse_particle_list()?;
                Ok(self
                    .ast
                    .wrap(NodeKind::Terminal, Some(constituents), &[list]))
            }
            TokenKind::Extern => {
                let external = self.bump();
                if !self.at(TokenKind::Str) {
                    return Err(ParseError::at(
                        &external,
                        "External functions must be given an explicit code string to run",
                    ));
                }
                let code = self.parse_id()?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(external), &[code]))
            }
            TokenKind::CorrectionLib => {
                let correction = self.bump();
                if !self.at(TokenKind::Str) {
                    return Err(ParseError::at(
                        &correction,
                        "Correctionlib correction sets must be given an exact string for a file name",
                    ));
                }
                let file = self.parse_id()?;
                if !self.at(TokenKind::Str) {
                    return Err(ParseError::at(
                        &correction,
                        "Correctionlib correction set includes must be given an exact string for a key",
                    ));
                }
                let key = self.parse_id()?;
                Ok(self
                    .ast
                    .wrap(NodeKind::Terminal, Some(correction), &[file, key]))
            }
            TokenKind::Add | TokenKind::ParticleKeyword => {
                let keyword = self.bump();
                let sum = self.parse_particle_sum()?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(keyword), &[sum]))
            }
            kind if kind.is_particle_species() => Err(self.error_here(PARTICLE_WITHOUT_KEYWORD)),
            TokenKind::VarName | TokenKind::Str if self.peek_kind(1) == TokenKind::OpenBracket => {
                Err(self.error_here(PARTICLE_WITHOUT_KEYWORD))
            }
            _ => self.parse_expression(),
        }
    }
}
