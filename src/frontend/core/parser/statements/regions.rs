//! `algo` regions, histograms and histogram lists

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseError, ParseResult, ParserState};

const BIN_COUNT: &str = "Only integers are allowed to specify binning quantity on histograms";
const LOWER_BOUND: &str = "Only numerical types are allowed for the lower bound of a histogram";
const UPPER_BOUND: &str = "Only numerical types are allowed for the upper bound of a histogram";

impl ParserState {
    /// `REGION -> algo ID REGION_COMMAND*`
    pub fn parse_region(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Algo)?;
        let region = self.ast.push(NodeKind::Region, None);
        let id = self.parse_id()?;
        self.ast.attach(region, id);

        while starts_region_command(self.current().kind) {
            let command = self.parse_region_command()?;
            self.ast.attach(region, command);
        }
        Ok(region)
    }

    fn parse_region_command(&mut self) -> ParseResult<NodeId> {
        if self.at(TokenKind::ApplyHm) {
            return self.parse_apply_hm();
        }

        let tok = self.bump();
        match tok.kind {
            TokenKind::Select => {
                let selection = self.parse_region_selection()?;
                Ok(self.ast.wrap(NodeKind::RegionSelect, None, &[selection]))
            }
            TokenKind::Reject => {
                let selection = self.parse_region_selection()?;
                Ok(self.ast.wrap(NodeKind::RegionReject, Some(tok), &[selection]))
            }
            TokenKind::Weight => {
                let id = self.parse_id()?;
                let value = self.parse_expression()?;
                Ok(self.ast.wrap(NodeKind::WeightCmd, None, &[id, value]))
            }
            TokenKind::Bin => {
                let condition = self.parse_condition()?;
                Ok(self.ast.wrap(NodeKind::BinCmd, None, &[condition]))
            }
            TokenKind::Use | TokenKind::Take => {
                let id = self.parse_id()?;
                Ok(self.ast.wrap(NodeKind::RegionUse, None, &[id]))
            }
            TokenKind::Bins => {
                let value = self.parse_expression()?;
                let bins = self.ast.wrap(NodeKind::BinsCmd, None, &[value]);
                self.parse_numbers(bins)?;
                Ok(bins)
            }
            TokenKind::Save => {
                let id = self.parse_id()?;
                let save = self.ast.wrap(NodeKind::Terminal, Some(tok), &[id]);
                if self.skip(TokenKind::Csv) {
                    self.parse_variable_list(save)?;
                }
                Ok(save)
            }
            TokenKind::Print => {
                let print = self.ast.terminal(tok);
                self.parse_variable_list(print)?;
                Ok(print)
            }
            TokenKind::Counts => {
                let id = self.parse_id()?;
                let counts = self.ast.wrap(NodeKind::Terminal, Some(tok), &[id]);
                self.parse_counts(counts)?;
                Ok(counts)
            }
            TokenKind::Histo if self.at(TokenKind::Use) => {
                self.bump();
                let id = self.parse_id()?;
                Ok(self.ast.wrap(NodeKind::HistoUse, None, &[id]))
            }
            TokenKind::Histo => {
                let histogram = self.ast.push(NodeKind::Histogram, None);
                self.parse_histogram(histogram)?;
                Ok(histogram)
            }
            TokenKind::Sort => {
                let value = self.parse_expression()?;
                let order = self.bump();
                if !matches!(order.kind, TokenKind::Ascend | TokenKind::Descend) {
                    return Err(ParseError::at(
                        &order,
                        "Token after a sort expression must specify ascending or descending",
                    ));
                }
                let order = self.ast.terminal(order);
                Ok(self.ast.wrap(NodeKind::SortCmd, None, &[value, order]))
            }
            TokenKind::Hlt => {
                let description = self.parse_description()?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(tok), &[description]))
            }
            TokenKind::LepSf | TokenKind::BtagSf | TokenKind::XsLumiCorrSf => {
                Ok(self.ast.terminal(tok))
            }
            _ => Err(ParseError::at(&tok, "Unexpected token in region block")),
        }
    }

    /// `select` / `reject` argument: `all`, `none` or an if-or-condition
    fn parse_region_selection(&mut self) -> ParseResult<NodeId> {
        if matches!(self.current().kind, TokenKind::All | TokenKind::Nothing) {
            let tok = self.bump();
            let tok = self.ast.terminal(tok);
            return Ok(self.ast.wrap(NodeKind::Condition, None, &[tok]));
        }
        self.parse_if_or_condition()
    }

    /// `COUNTS -> COUNT (, COUNT)*`
    fn parse_counts(
        &mut self,
        parent: NodeId,
    ) -> ParseResult<()> {
        loop {
            let count = self.parse_count()?;
            self.ast.attach(parent, count);
            if !self.skip(TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    /// `COUNT -> number ((+ | - | +-) number)*`
    fn parse_count(&mut self) -> ParseResult<NodeId> {
        const MESSAGE: &str = "A numerical type is needed for counts";

        let count = self.ast.push(NodeKind::Count, None);
        let value = self.parse_number(MESSAGE)?;
        self.ast.attach(count, value);
        loop {
            self.split_glued_literal();
            if !matches!(
                self.current().kind,
                TokenKind::Plus | TokenKind::Minus | TokenKind::Pm
            ) {
                return Ok(count);
            }
            let op = self.bump();
            let op = self.ast.terminal(op);
            let value = self.parse_number(MESSAGE)?;
            self.ast.attach(count, op);
            self.ast.attach(count, value);
        }
    }

    /// `HISTOGRAM -> ID , DESCRIPTION , int , number , number , [int , number , number ,] E [, E]`
    ///
    /// A second binning triple makes the histogram two-dimensional and
    /// requires a second expression.
    pub fn parse_histogram(
        &mut self,
        histogram: NodeId,
    ) -> ParseResult<()> {
        let id = self.parse_id()?;
        self.ast.attach(histogram, id);
        self.expect(TokenKind::Comma)?;
        let description = self.parse_description()?;
        self.ast.attach(histogram, description);
        self.expect(TokenKind::Comma)?;
        self.parse_binning(histogram)?;

        let two_dimensional = self.peek_kind(1) == TokenKind::Comma;
        if two_dimensional {
            self.parse_binning(histogram)?;
        }

        let value = self.parse_expression()?;
        self.ast.attach(histogram, value);
        if two_dimensional {
            self.expect(TokenKind::Comma)?;
            let value = self.parse_expression()?;
            self.ast.attach(histogram, value);
        }
        Ok(())
    }

    /// `int , number , number ,`
    fn parse_binning(
        &mut self,
        histogram: NodeId,
    ) -> ParseResult<()> {
        let bins = self.parse_integer(BIN_COUNT)?;
        self.expect(TokenKind::Comma)?;
        let lower = self.parse_number(LOWER_BOUND)?;
        self.expect(TokenKind::Comma)?;
        let upper = self.parse_number(UPPER_BOUND)?;
        self.expect(TokenKind::Comma)?;
        for child in [bins, lower, upper] {
            self.ast.attach(histogram, child);
        }
        Ok(())
    }

    /// `HISTO_LIST -> histolist ID (histo HISTOGRAM)*`
    pub fn parse_histo_list(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::HistoList)?;
        let list = self.ast.push(NodeKind::HistoList, None);
        let id = self.parse_id()?;
        self.ast.attach(list, id);

        while self.skip(TokenKind::Histo) {
            let entry = self.ast.push(NodeKind::HistoListHistogram, None);
            self.parse_histogram(entry)?;
            self.ast.attach(list, entry);
        }
        Ok(list)
    }
}

fn starts_region_command(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Select
            | TokenKind::Reject
            | TokenKind::Bins
            | TokenKind::Bin
            | TokenKind::Save
            | TokenKind::Print
            | TokenKind::Weight
            | TokenKind::Counts
            | TokenKind::Histo
            | TokenKind::Sort
            | TokenKind::Use
            | TokenKind::Take
            | TokenKind::Hlt
            | TokenKind::ApplyHm
            | TokenKind::LepSf
            | TokenKind::BtagSf
            | TokenKind::XsLumiCorrSf
    )
}
