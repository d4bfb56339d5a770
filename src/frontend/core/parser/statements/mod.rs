//! Block-level grammar
//!
//! Each top-level block is recognized by its leading keyword. Blocks may
//! appear in any order and are parsed greedily until a token that opens no
//! block is reached.

pub mod definitions;
pub mod info;
pub mod objects;
pub mod particles;
pub mod regions;

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::parser_state::{ParseResult, ParserState};

impl ParserState {
    /// Parse blocks into the root until none starts at the current token
    pub fn parse_blocks(&mut self) -> ParseResult<()> {
        loop {
            let block = match self.current().kind {
                TokenKind::AdlInfo => self.parse_info()?,
                TokenKind::CountsFormat => self.parse_count_format()?,
                TokenKind::Def => self.parse_definition()?,
                TokenKind::Table => self.parse_table()?,
                TokenKind::Obj => self.parse_object()?,
                TokenKind::Comp => self.parse_composite()?,
                TokenKind::Algo => self.parse_region()?,
                TokenKind::HistoList => self.parse_histo_list()?,
                _ => return Ok(()),
            };
            let root = self.ast.root();
            self.ast.attach(root, block);
        }
    }
}
