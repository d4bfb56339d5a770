//! Tokenizer implementation
//!
//! ADL is scanned one physical line at a time. A running buffer collects
//! characters until the character class changes, then the buffer is
//! classified as a whole by the keyword table.

use super::keywords::{classify, is_mantissa};
use super::tokens::{LexError, Token, TokenKind};
use crate::util::span::Span;

/// Characters that always form a one-character token
const STANDALONE: &[char] = &['(', ')', ',', '{', '}', '[', ']'];

/// Operator characters, grouped together when adjacent
const SYMBOLS: &[char] = &[
    '=', '!', '~', '<', '>', '(', ')', '[', ']', '{', '}', ':', '&', '|', '+', '-', '*', '/', '?',
    '^', ',', '.',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Symbol,
    Space,
    Word,
}

fn char_class(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if SYMBOLS.contains(&c) {
        CharClass::Symbol
    } else {
        CharClass::Word
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Comment,
    Quoted,
}

/// Main lexer structure
#[derive(Debug, Default)]
pub struct Lexer {
    tokens: Vec<Token>,
    lines: usize,
}

impl Lexer {
    /// Create a new lexer
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens produced so far
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Scan one physical line (without its line terminator)
    pub fn lex_line(
        &mut self,
        line: usize,
        text: &str,
    ) -> Result<(), LexError> {
        let mut scanner = LineScanner {
            chars: text.chars().collect(),
            line,
            column: 1,
            buffer: String::new(),
            mode: Mode::Code,
            tokens: &mut self.tokens,
        };
        scanner.run()?;
        self.lines = self.lines.max(line);
        Ok(())
    }

    /// Append the end-of-file token and return the token list
    pub fn finish(mut self) -> Vec<Token> {
        let span = Span::on_line(self.lines + 1, 1, 0);
        self.tokens.push(Token::new(TokenKind::Eof, "", span));
        self.tokens
    }
}

struct LineScanner<'t> {
    chars: Vec<char>,
    line: usize,
    /// Column of the first character in `buffer`
    column: usize,
    buffer: String,
    mode: Mode,
    tokens: &'t mut Vec<Token>,
}

impl LineScanner<'_> {
    fn run(&mut self) -> Result<(), LexError> {
        for i in 0..self.chars.len() {
            let c = self.chars[i];
            let next = self.chars.get(i + 1).copied();

            match self.mode {
                Mode::Comment => {
                    self.buffer.push(c);
                    continue;
                }
                Mode::Quoted => {
                    self.buffer.push(c);
                    if c == '"' {
                        self.flush()?;
                        self.mode = Mode::Code;
                    }
                    continue;
                }
                Mode::Code => {}
            }

            match c {
                '#' => {
                    self.flush()?;
                    self.mode = Mode::Comment;
                    self.buffer.push(c);
                    continue;
                }
                '"' => {
                    self.flush()?;
                    self.mode = Mode::Quoted;
                    self.buffer.push(c);
                    continue;
                }
                _ if STANDALONE.contains(&c) || (c == '_' && self.underscore_stands_alone(next)) => {
                    self.flush()?;
                    self.buffer.push(c);
                    self.flush()?;
                    continue;
                }
                _ => {}
            }

            if let Some(prev) = self.buffer.chars().last() {
                if char_class(prev) != char_class(c) && !self.continues_number(prev, c, next) {
                    self.flush()?;
                }
            }
            self.buffer.push(c);
        }

        self.flush()?;
        let span = Span::on_line(self.line, self.column, 1);
        self.tokens.push(Token::new(TokenKind::Newline, "\n", span));
        Ok(())
    }

    /// `_` splits off at the start of a word and in the `jet_0` index form
    fn underscore_stands_alone(
        &self,
        next: Option<char>,
    ) -> bool {
        match self.buffer.chars().last() {
            None => true,
            Some(prev) if char_class(prev) != CharClass::Word => true,
            Some(_) => {
                next.is_some_and(|n| n.is_ascii_digit())
                    && classify(&self.buffer).is_particle_species()
            }
        }
    }

    /// Exceptions to the class-change rule that keep numeric literals whole
    fn continues_number(
        &self,
        prev: char,
        c: char,
        next: Option<char>,
    ) -> bool {
        let next_is_digit = next.is_some_and(|n| n.is_ascii_digit());

        if matches!(prev, '-' | '+') && c.is_ascii_digit() {
            let candidate = format!("{}{}", self.buffer, c);
            return classify(&candidate).is_numeric();
        }
        if prev == '.' && c.is_ascii_digit() {
            return true;
        }
        if c == '.' && next_is_digit {
            return true;
        }
        matches!(c, '+' | '-') && next_is_digit && is_mantissa(&self.buffer)
    }

    fn flush(&mut self) -> Result<(), LexError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let lexeme = std::mem::take(&mut self.buffer);
        let len = lexeme.chars().count();
        let kind = classify(&lexeme);

        if kind == TokenKind::Error {
            return Err(if lexeme.starts_with('"') {
                LexError::UnterminatedString {
                    lexeme,
                    line: self.line,
                    column: self.column,
                }
            } else {
                LexError::MalformedToken {
                    lexeme,
                    line: self.line,
                    column: self.column,
                }
            });
        }

        let token = Token::new(kind, lexeme, Span::on_line(self.line, self.column, len));
        super::log_token(&token);
        self.tokens.push(token);
        self.column += len;
        Ok(())
    }
}
