//! `obj` and `comp` blocks, their criteria and the actions a selection
//! can take

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::{NodeId, NodeKind};
use crate::frontend::core::parser::parser_state::{ParseError, ParseResult, ParserState};

impl ParserState {
    /// `OBJECT -> obj ID (: | take | =) (union ( PARTICLE_LIST ) | PARTICLE CRITERIA)`
    pub fn parse_object(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Obj)?;
        let object = self.ast.push(NodeKind::Object, None);
        let id = self.parse_id()?;
        self.ast.attach(object, id);
        self.expect_object_assignment()?;

        if self.at(TokenKind::Union) {
            let union = self.bump();
            self.expect(TokenKind::OpenParen)?;
            let list = self.parse_particle_list()?;
            self.expect(TokenKind::CloseParen)?;
            let union = self.ast.wrap(NodeKind::Terminal, Some(union), &[list]);
            self.ast.attach(object, union);
            return Ok(object);
        }

        let source = self.parse_particle()?;
        self.ast.attach(object, source);
        self.parse_criteria(object, false)?;
        Ok(object)
    }

    /// `COMPOSITE -> comp ID (: | take | =) (comb | disjoint) ( NAMED_PARTICLE_LIST ) COMPOSITE_CRITERIA`
    pub fn parse_composite(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Comp)?;
        let composite = self.ast.push(NodeKind::Composite, None);
        let id = self.parse_id()?;
        self.ast.attach(composite, id);
        self.expect_object_assignment()?;

        let combination = self.bump();
        if !matches!(combination.kind, TokenKind::Comb | TokenKind::Disjoint) {
            return Err(ParseError::at(
                &combination,
                "Invalid input to a composite statement, need either comb or disjoint",
            ));
        }
        self.expect(TokenKind::OpenParen)?;
        let members = self.parse_named_particle_list()?;
        self.expect(TokenKind::CloseParen)?;
        let combination = self
            .ast
            .wrap(NodeKind::Terminal, Some(combination), &[members]);
        self.ast.attach(composite, combination);

        self.parse_criteria(composite, true)?;
        Ok(composite)
    }

    fn expect_object_assignment(&mut self) -> ParseResult<()> {
        let tok = self.bump();
        if !matches!(tok.kind, TokenKind::Colon | TokenKind::Take | TokenKind::Assign) {
            return Err(ParseError::at(
                &tok,
                "Expected symbol for object definition, either ':' or '=' or TAKE",
            ));
        }
        Ok(())
    }

    /// `CRITERIA -> CRITERION*`; composites also accept member definitions
    fn parse_criteria(
        &mut self,
        parent: NodeId,
        composite: bool,
    ) -> ParseResult<()> {
        loop {
            let criterion = match self.current().kind {
                TokenKind::Select | TokenKind::Reject | TokenKind::Print | TokenKind::Histo => {
                    self.parse_criterion()?
                }
                TokenKind::ParticleKeyword if composite => self.parse_member_definition()?,
                _ => return Ok(()),
            };
            self.ast.attach(parent, criterion);
        }
    }

    /// `particle ID (= | :) PARTICLE_SUM` inside a composite
    fn parse_member_definition(&mut self) -> ParseResult<NodeId> {
        let keyword = self.expect(TokenKind::ParticleKeyword)?;
        let id = self.parse_id()?;
        let assign = self.bump();
        if !matches!(assign.kind, TokenKind::Assign | TokenKind::Colon) {
            return Err(ParseError::at(
                &assign,
                "Unknown token for particle definition assignment, expected '=' or ':'",
            ));
        }
        let sum = self.parse_particle_sum()?;
        let value = self.ast.wrap(NodeKind::Terminal, Some(keyword), &[sum]);
        Ok(self.ast.wrap(NodeKind::Definition, None, &[id, value]))
    }

    fn parse_criterion(&mut self) -> ParseResult<NodeId> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::Select => {
                let action = self.parse_action()?;
                Ok(self.ast.wrap(NodeKind::ObjectSelect, None, &[action]))
            }
            TokenKind::Reject => {
                let condition = self.parse_condition()?;
                Ok(self
                    .ast
                    .wrap(NodeKind::ObjectReject, Some(tok), &[condition]))
            }
            TokenKind::Print => {
                let print = self.ast.terminal(tok);
                self.parse_variable_list(print)?;
                Ok(print)
            }
            TokenKind::Histo => {
                let histogram = self.ast.push(NodeKind::Histogram, None);
                self.parse_histogram(histogram)?;
                Ok(histogram)
            }
            _ => Err(ParseError::at(&tok, "Invalid token for a criterion")),
        }
    }

    /// `IF_OR_CONDITION -> CONDITION [? ACTION : ACTION]`
    pub fn parse_if_or_condition(&mut self) -> ParseResult<NodeId> {
        let statement = self.ast.push(NodeKind::IfStatement, None);
        let condition = self.parse_condition()?;
        self.ast.attach(statement, condition);
        if self.skip(TokenKind::QuestionMark) {
            let then = self.parse_action()?;
            self.expect(TokenKind::Colon)?;
            let otherwise = self.parse_action()?;
            self.ast.attach(statement, then);
            self.ast.attach(statement, otherwise);
        }
        Ok(statement)
    }

    pub fn parse_action(&mut self) -> ParseResult<NodeId> {
        match self.current().kind {
            TokenKind::Print => {
                let print = self.bump();
                let print = self.ast.terminal(print);
                self.parse_variable_list(print)?;
                Ok(print)
            }
            TokenKind::All | TokenKind::Nothing | TokenKind::LepSf | TokenKind::BtagSf => {
                let tok = self.bump();
                Ok(self.ast.terminal(tok))
            }
            TokenKind::ApplyPtf => self.parse_apply_ptf(),
            TokenKind::ApplyHm => self.parse_apply_hm(),
            _ => self.parse_if_or_condition(),
        }
    }

    /// `applyPTF ( E )` or `applyPTF ( ID [ E [, E [, E , E]] ] )`
    fn parse_apply_ptf(&mut self) -> ParseResult<NodeId> {
        let apply = self.expect(TokenKind::ApplyPtf)?;
        let apply = self.ast.terminal(apply);
        self.expect(TokenKind::OpenParen)?;

        if self.current().kind.is_name() && self.peek_kind(1) == TokenKind::OpenBracket {
            let id = self.parse_id()?;
            self.ast.attach(apply, id);
            self.expect(TokenKind::OpenBracket)?;
            let mut arguments = 0;
            loop {
                let argument = self.parse_expression()?;
                self.ast.attach(apply, argument);
                arguments += 1;
                if arguments == 4 || !self.skip(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::CloseBracket)?;
        } else {
            let argument = self.parse_expression()?;
            self.ast.attach(apply, argument);
        }

        self.expect(TokenKind::CloseParen)?;
        Ok(apply)
    }

    /// `applyHM ( ID ( E [, E] ) == int )`
    pub(crate) fn parse_apply_hm(&mut self) -> ParseResult<NodeId> {
        let apply = self.expect(TokenKind::ApplyHm)?;
        let apply = self.ast.terminal(apply);
        self.expect(TokenKind::OpenParen)?;
        let id = self.parse_id()?;
        self.ast.attach(apply, id);

        self.expect(TokenKind::OpenParen)?;
        let first = self.parse_expression()?;
        self.ast.attach(apply, first);
        if self.skip(TokenKind::Comma) {
            let second = self.parse_expression()?;
            self.ast.attach(apply, second);
        }
        self.expect(TokenKind::CloseParen)?;

        self.expect(TokenKind::Eq)?;
        let expected = self.parse_integer(
            "Only integers are allowed for comparison in applying hit-or-miss",
        )?;
        self.ast.attach(apply, expected);
        self.expect(TokenKind::CloseParen)?;
        Ok(apply)
    }
}
