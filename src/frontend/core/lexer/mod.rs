//! Lexer module
//! Split into the token vocabulary, the ordered keyword table and the
//! line-oriented tokenizer

pub mod keywords;
pub mod tokenizer;
pub mod tokens;

#[cfg(test)]
mod tests;

// Re-export types
pub use keywords::classify;
pub use tokenizer::Lexer;
pub use tokens::{LexError, Token, TokenKind};

/// Tokenize ADL source text
///
/// The result keeps comments, whitespace and line breaks so that a listing
/// can reproduce the layout; the parser filters them out. The last token is
/// always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    tracing::debug!("Lexing source ({} bytes)", source.len());

    let mut lexer = Lexer::new();
    for (index, line) in source.lines().enumerate() {
        lexer.lex_line(index + 1, line)?;
    }
    let tokens = lexer.finish();
    tokens.iter().for_each(log_token);

    tracing::debug!("Lexing complete, {} tokens", tokens.len());
    Ok(tokens)
}

/// Log a token for debugging
fn log_token(token: &Token) {
    match token.kind {
        TokenKind::Space | TokenKind::Newline => {}
        kind => tracing::trace!(
            "token {} {:?} at {}",
            kind.name(),
            token.lexeme,
            token.span.start
        ),
    }
}

/// Render a token list as `KIND: lexeme, ` entries, one source line per row
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token.kind {
            TokenKind::Newline => out.push('\n'),
            TokenKind::Eof => {}
            kind => {
                out.push_str(kind.name());
                out.push_str(": ");
                out.push_str(&token.lexeme);
                out.push_str(", ");
            }
        }
    }
    out
}
