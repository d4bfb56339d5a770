//! Comment tests

use super::kinds;
use crate::frontend::core::lexer::{tokenize, TokenKind};

#[cfg(test)]
mod lexer_comments_tests {
    use super::*;

    #[test]
    fn test_comment_absorbs_rest_of_line() {
        let tokens = tokenize("def x = 5 # a (comment) with \"quotes\"\ndef y = 6").unwrap();
        let comment = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Comment)
            .unwrap();
        assert_eq!(comment.lexeme, "# a (comment) with \"quotes\"");
        assert_eq!(comment.column(), 11);
        assert_eq!(kinds("def x = 5 # c\ndef y = 6").len(), 8);
    }

    #[test]
    fn test_hash_inside_string_is_not_comment() {
        assert_eq!(kinds("\"#1\""), vec![TokenKind::Str]);
    }

    #[test]
    fn test_comment_only_line() {
        assert!(kinds("# nothing here").is_empty());
    }
}
