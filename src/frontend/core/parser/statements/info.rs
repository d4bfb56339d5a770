//! Metadata blocks: `info`, `countsformat` and `table`

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseError, ParseResult, ParserState};

impl ParserState {
    /// `INFO -> info ID INITIALIZATION*`
    pub fn parse_info(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::AdlInfo)?;
        let info = self.ast.push(NodeKind::Info, None);
        let id = self.parse_id()?;
        self.ast.attach(info, id);

        loop {
            let kind = self.current().kind;
            if kind.is_block_start() || kind == TokenKind::Eof {
                return Ok(info);
            }
            if !starts_initialization(kind) {
                return Err(self.error_here("Unexpected token after an initialization block"));
            }
            let init = self.parse_initialization()?;
            self.ast.attach(info, init);
        }
    }

    /// One `key value` line of an info block; the key token holds the value
    fn parse_initialization(&mut self) -> ParseResult<NodeId> {
        let key = self.bump();
        let values = match key.kind {
            TokenKind::TrgE | TokenKind::TrgM | TokenKind::SkipHistos | TokenKind::SkipEfs => {
                self.expect(TokenKind::Assign)?;
                vec![self.parse_integer("Invalid non-integer assignment")?]
            }
            TokenKind::Lumi | TokenKind::SqrtS => {
                vec![self.parse_number("Non-numerical value given for numerical field")?]
            }
            TokenKind::Experiment => vec![self.parse_id()?],
            TokenKind::Systematic => {
                let enabled = self.parse_bool()?;
                let up = self.bump();
                if up.kind != TokenKind::Str {
                    return Err(ParseError::at(
                        &up,
                        "Invalid systematic up identifier, expected string",
                    ));
                }
                let down = self.bump();
                if down.kind != TokenKind::Str {
                    return Err(ParseError::at(
                        &down,
                        "Invalid systematic down identifier, expected string",
                    ));
                }
                let up = self.ast.terminal(up);
                let down = self.ast.terminal(down);
                let vtype = self.parse_syst_vtype()?;
                vec![enabled, up, down, vtype]
            }
            TokenKind::Title
            | TokenKind::Publication
            | TokenKind::Id
            | TokenKind::ArXiv
            | TokenKind::Doi
            | TokenKind::Hepdata => vec![self.parse_description()?],
            _ => return Err(ParseError::at(&key, "Invalid token in info block")),
        };
        Ok(self.ast.wrap(NodeKind::Terminal, Some(key), &values))
    }

    fn parse_syst_vtype(&mut self) -> ParseResult<NodeId> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::WeightMc
            | TokenKind::WeightJvt
            | TokenKind::WeightPileup
            | TokenKind::WeightLeptonSf
            | TokenKind::WeightBtagSf
            | TokenKind::TTree => Ok(self.ast.terminal(tok)),
            _ => Err(ParseError::at(&tok, "Expected a valid systematics type")),
        }
    }

    /// `COUNT_FORMAT -> countsformat ID COUNT_PROCESS*`
    pub fn parse_count_format(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::CountsFormat)?;
        let format = self.ast.push(NodeKind::CountFormat, None);
        let id = self.parse_id()?;
        self.ast.attach(format, id);

        while self.at(TokenKind::Process) {
            let process = self.parse_count_process()?;
            self.ast.attach(format, process);
        }
        Ok(format)
    }

    /// `COUNT_PROCESS -> process ID , DESCRIPTION [, ERR_TYPE [, ERR_TYPE]]`
    fn parse_count_process(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Process)?;
        let process = self.ast.push(NodeKind::CountProcess, None);
        let id = self.parse_id()?;
        self.ast.attach(process, id);
        if !self.at(TokenKind::Comma) {
            return Err(self.error_here(
                "Invalid end of argument. Needs at least 2 arguments separated by commas",
            ));
        }
        self.bump();
        let description = self.parse_description()?;
        self.ast.attach(process, description);

        for _ in 0..2 {
            if !self.skip(TokenKind::Comma) {
                break;
            }
            let err = self.bump();
            if !matches!(err.kind, TokenKind::ErrStat | TokenKind::ErrSyst) {
                return Err(ParseError::at(&err, "Expected error type 'syst' or 'stat'"));
            }
            let err = self.ast.terminal(err);
            self.ast.attach(process, err);
        }
        Ok(process)
    }

    /// `TABLE -> table ID tabletype ID nvars int errors BOOL number+`
    pub fn parse_table(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Table)?;
        let table = self.ast.push(NodeKind::TableDef, None);
        let id = self.parse_id()?;
        self.expect(TokenKind::TableType)?;
        let table_type = self.parse_id()?;
        self.expect(TokenKind::NVars)?;
        let nvars = self.parse_integer("Only integers are allowed to specify NVars")?;
        self.expect(TokenKind::Errors)?;
        let errors = self.parse_bool()?;
        for child in [id, table_type, nvars, errors] {
            self.ast.attach(table, child);
        }
        self.parse_numbers(table)?;
        Ok(table)
    }
}

fn starts_initialization(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::SkipHistos
            | TokenKind::SkipEfs
            | TokenKind::Title
            | TokenKind::Experiment
            | TokenKind::Id
            | TokenKind::Publication
            | TokenKind::SqrtS
            | TokenKind::Lumi
            | TokenKind::ArXiv
            | TokenKind::Doi
            | TokenKind::Hepdata
            | TokenKind::Systematic
            | TokenKind::TrgE
            | TokenKind::TrgM
    )
}
