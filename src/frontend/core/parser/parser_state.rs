//! Parser state and error handling

use crate::frontend::core::lexer::tokens::*;
use crate::frontend::core::parser::ast::Ast;
use crate::util::span::Span;

/// Parse error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// A production could not accept the token
    #[error("Failed to parse \"{lexeme}\", at line {line}, column {column}: {message}")]
    Syntax {
        lexeme: String,
        line: usize,
        column: usize,
        message: String,
    },
    /// Expected a specific token
    #[error(
        "Failed to parse \"{lexeme}\", at line {line}, column {column}: Unexpected token, expected a token of type {expected}, got token of type {found}"
    )]
    ExpectedToken {
        expected: TokenKind,
        found: TokenKind,
        lexeme: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Error pointing at `token`
    pub fn at(
        token: &Token,
        message: impl Into<String>,
    ) -> Self {
        ParseError::Syntax {
            lexeme: token.lexeme.clone(),
            line: token.line(),
            column: token.column(),
            message: message.into(),
        }
    }

    /// Lexeme of the offending token
    pub fn lexeme(&self) -> &str {
        match self {
            ParseError::Syntax { lexeme, .. } | ParseError::ExpectedToken { lexeme, .. } => lexeme,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. } | ParseError::ExpectedToken { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Syntax { column, .. } | ParseError::ExpectedToken { column, .. } => *column,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parser state for recursive descent
///
/// Holds only the tokens the grammar cares about: comments, whitespace and
/// line breaks are dropped on construction. Reading past the end yields an
/// end-of-file token.
pub struct ParserState {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
    pub(crate) ast: Ast,
}

impl ParserState {
    pub fn new(tokens: &[Token]) -> Self {
        let eof = tokens
            .iter()
            .rev()
            .find(|t| t.kind == TokenKind::Eof)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, "", Span::dummy()));
        let tokens = tokens
            .iter()
            .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
            .cloned()
            .collect();

        Self {
            tokens,
            pos: 0,
            eof,
            ast: Ast::new(),
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn current(&self) -> &Token {
        self.peek(0)
    }

    /// Token `n` positions ahead of the current one
    pub fn peek(
        &self,
        n: usize,
    ) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    pub fn peek_kind(
        &self,
        n: usize,
    ) -> TokenKind {
        self.peek(n).kind
    }

    /// The most recently consumed token
    pub fn previous(&self) -> Option<&Token> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
    }

    /// Consume and return the current token
    pub fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    pub fn at(
        &self,
        kind: TokenKind,
    ) -> bool {
        self.current().kind == kind
    }

    pub fn skip(
        &mut self,
        kind: TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or fail naming what was found
    pub fn expect(
        &mut self,
        kind: TokenKind,
    ) -> ParseResult<Token> {
        if self.at(kind) {
            return Ok(self.bump());
        }
        let found = self.current();
        Err(ParseError::ExpectedToken {
            expected: kind,
            found: found.kind,
            lexeme: found.lexeme.clone(),
            line: found.line(),
            column: found.column(),
        })
    }

    /// Error at the current token
    pub fn error_here(
        &self,
        message: impl Into<String>,
    ) -> ParseError {
        ParseError::at(self.current(), message)
    }

    /// Split a signed literal written flush against the previous token
    ///
    /// `pt(j)-5` lexes as `... ) -5`; in operator position the literal is
    /// really a subtraction, so it becomes `-` followed by `5`. Returns
    /// whether a split happened.
    pub fn split_glued_literal(&mut self) -> bool {
        let current = self.current();
        if !current.kind.is_numeric() || !current.lexeme.starts_with('-') {
            return false;
        }
        let glued = self
            .previous()
            .is_some_and(|prev| prev.span.touches(&current.span));
        if !glued {
            return false;
        }

        let literal = current.clone();
        let start = literal.span.start;
        let minus = Token::new(TokenKind::Minus, "-", Span::new(start, start.advance(1)));
        let unsigned = Token::new(
            literal.kind,
            &literal.lexeme[1..],
            Span::new(start.advance(1), literal.span.end),
        );
        self.tokens[self.pos] = minus;
        self.tokens.insert(self.pos + 1, unsigned);
        true
    }

    pub fn into_ast(self) -> Ast {
        self.ast
    }
}
