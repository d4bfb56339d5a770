//! Particles, particle lists and the small terminal productions shared by
//! every block: ids, numbers, booleans, descriptions and variable lists

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseError, ParseResult, ParserState};
use crate::frontend::core::parser::pratt::precedence::BP_ARROW;

impl ParserState {
    /// `ID -> string | varname`
    pub fn parse_id(&mut self) -> ParseResult<NodeId> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::VarName | TokenKind::Str => Ok(self.ast.terminal(tok)),
            TokenKind::Integer => Err(ParseError::at(
                &tok,
                "Invalid ID, integers for ID must be put in quotes.",
            )),
            _ => Err(ParseError::at(
                &tok,
                "Invalid ID, allowed types are variable-type names and strings",
            )),
        }
    }

    pub fn parse_integer(
        &mut self,
        message: &str,
    ) -> ParseResult<NodeId> {
        let tok = self.bump();
        if tok.kind != TokenKind::Integer {
            return Err(ParseError::at(&tok, message));
        }
        Ok(self.ast.terminal(tok))
    }

    /// Any numeric literal
    pub fn parse_number(
        &mut self,
        message: &str,
    ) -> ParseResult<NodeId> {
        let tok = self.bump();
        if !tok.kind.is_numeric() {
            return Err(ParseError::at(&tok, message));
        }
        Ok(self.ast.terminal(tok))
    }

    /// `BOOL -> true | false`
    pub fn parse_bool(&mut self) -> ParseResult<NodeId> {
        let tok = self.bump();
        if !matches!(tok.kind, TokenKind::True | TokenKind::False) {
            return Err(ParseError::at(
                &tok,
                "Expected boolean, but token is not interpretable as a boolean",
            ));
        }
        Ok(self.ast.terminal(tok))
    }

    /// `DESCRIPTION -> string+`
    ///
    /// The first string is the node; any further strings hang off it.
    pub fn parse_description(&mut self) -> ParseResult<NodeId> {
        let tok = self.bump();
        if tok.kind != TokenKind::Str {
            return Err(ParseError::at(&tok, "Expected string for description"));
        }
        let description = self.ast.terminal(tok);
        while self.at(TokenKind::Str) {
            let more = self.bump();
            let more = self.ast.terminal(more);
            self.ast.attach(description, more);
        }
        Ok(description)
    }

    /// `BIN_OR_BOX_VALUES -> number+`, attached to `parent`
    pub fn parse_numbers(
        &mut self,
        parent: NodeId,
    ) -> ParseResult<()> {
        loop {
            let value = self.parse_number("Needs a numerical value for box argument")?;
            self.ast.attach(parent, value);
            if !self.current().kind.is_numeric() {
                return Ok(());
            }
        }
    }

    /// `VARIABLE_LIST -> (EXPRESSION [,])*`, attached to `parent`
    pub fn parse_variable_list(
        &mut self,
        parent: NodeId,
    ) -> ParseResult<()> {
        while !ends_variable_list(self.current().kind) {
            let value = self.parse_expression()?;
            self.ast.attach(parent, value);
            self.skip(TokenKind::Comma);
        }
        Ok(())
    }

    /// Comma separated arguments; juxtaposed or `+`-joined particles form
    /// one summed argument
    pub fn parse_particle_list(&mut self) -> ParseResult<NodeId> {
        let list = self.ast.push(NodeKind::ParticleList, None);
        loop {
            let first = self.parse_particle()?;
            if self.continues_sum() {
                let sum = self.ast.wrap(NodeKind::ParticleSum, None, &[first]);
                self.parse_particle_sum_into(sum)?;
                self.ast.attach(list, sum);
            } else {
                self.ast.attach(list, first);
            }
            if !self.skip(TokenKind::Comma) {
                return Ok(list);
            }
        }
    }

    /// `PARTICLE_SUM -> PARTICLE ([+] PARTICLE)*`
    pub fn parse_particle_sum(&mut self) -> ParseResult<NodeId> {
        let sum = self.ast.push(NodeKind::ParticleSum, None);
        let first = self.parse_particle()?;
        self.ast.attach(sum, first);
        self.parse_particle_sum_into(sum)?;
        Ok(sum)
    }

    fn parse_particle_sum_into(
        &mut self,
        sum: NodeId,
    ) -> ParseResult<()> {
        while self.continues_sum() {
            self.skip(TokenKind::Plus);
            let term = self.parse_particle()?;
            self.ast.attach(sum, term);
        }
        Ok(())
    }

    fn continues_sum(&self) -> bool {
        let kind = self.current().kind;
        kind == TokenKind::Plus || starts_particle(kind)
    }

    /// `NAMED_PARTICLE_LIST -> PARTICLE ID (, PARTICLE ID)*`
    pub fn parse_named_particle_list(&mut self) -> ParseResult<NodeId> {
        let list = self.ast.push(NodeKind::NamedParticleList, None);
        loop {
            let particle = self.parse_particle()?;
            let name = self.parse_id()?;
            self.ast.attach(list, particle);
            self.ast.attach(list, name);
            if !self.skip(TokenKind::Comma) {
                return Ok(list);
            }
        }
    }

    /// A single particle term
    pub fn parse_particle(&mut self) -> ParseResult<NodeId> {
        let kind = self.current().kind;
        match kind {
            TokenKind::First | TokenKind::Second => {
                let helper = self.bump();
                self.expect(TokenKind::OpenParen)?;
                let inner = self.parse_particle()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(helper), &[inner]))
            }
            TokenKind::This => {
                let this = self.bump();
                Ok(self.ast.terminal(this))
            }
            TokenKind::Gen | TokenKind::Jet | TokenKind::FJet
                if self.peek_kind(1) == TokenKind::Constituents =>
            {
                let species = self.bump();
                let species = self.ast.terminal(species);
                let constituents = self.bump();
                Ok(self
                    .ast
                    .wrap(NodeKind::Terminal, Some(constituents), &[species]))
            }
            kind if kind.is_particle_species() => {
                let species = self.bump();
                let particle = self.ast.terminal(species);
                self.parse_index(particle)?;
                Ok(particle)
            }
            TokenKind::Minus => {
                let minus = self.bump();
                let inner = self.parse_particle()?;
                Ok(self.ast.wrap(NodeKind::Terminal, Some(minus), &[inner]))
            }
            _ if self.peek_kind(1) == TokenKind::ArrowIndex => self.precedence_climber(BP_ARROW),
            _ => {
                let particle = self.parse_id()?;
                self.parse_index(particle)?;
                Ok(particle)
            }
        }
    }

    /// `INDEX -> [int] | [int:int] | _ int | epsilon`
    ///
    /// The `Index` child is only attached when an index is written.
    fn parse_index(
        &mut self,
        particle: NodeId,
    ) -> ParseResult<()> {
        const MESSAGE: &str = "Only integers are allowed to be used as indices";

        if self.skip(TokenKind::Underscore) {
            let at = self.parse_integer(MESSAGE)?;
            let index = self.ast.wrap(NodeKind::Index, None, &[at]);
            self.ast.attach(particle, index);
            return Ok(());
        }
        if !self.skip(TokenKind::OpenBracket) {
            return Ok(());
        }

        let index = self.ast.push(NodeKind::Index, None);
        let from = self.parse_integer(MESSAGE)?;
        self.ast.attach(index, from);
        if self.skip(TokenKind::Colon) {
            let to = self.parse_integer(MESSAGE)?;
            self.ast.attach(index, to);
        }
        self.expect(TokenKind::CloseBracket)?;
        self.ast.attach(particle, index);
        Ok(())
    }
}

fn starts_particle(kind: TokenKind) -> bool {
    kind.is_particle_species()
        || matches!(
            kind,
            TokenKind::VarName
                | TokenKind::Str
                | TokenKind::Minus
                | TokenKind::First
                | TokenKind::Second
                | TokenKind::This
        )
}

fn ends_variable_list(kind: TokenKind) -> bool {
    kind.is_block_start()
        || matches!(
            kind,
            TokenKind::Eof
                | TokenKind::CloseCurly
                | TokenKind::CloseParen
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::Select
                | TokenKind::Print
                | TokenKind::Histo
                | TokenKind::Reject
                | TokenKind::Bins
                | TokenKind::Bin
                | TokenKind::Save
                | TokenKind::Weight
                | TokenKind::Counts
                | TokenKind::Sort
                | TokenKind::Use
                | TokenKind::Take
        )
}
