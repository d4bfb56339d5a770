//! Literal tests

use super::{kinds, lexemes, significant};
use crate::frontend::core::lexer::{classify, TokenKind};
use proptest::prelude::*;

#[cfg(test)]
mod lexer_literals_tests {
    use super::*;

    #[test]
    fn test_scientific_keeps_lexeme() {
        let tokens = significant("-3.14e+2");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Scientific);
        assert_eq!(tokens[0].lexeme, "-3.14e+2");
    }

    #[test]
    fn test_numeric_kinds() {
        assert_eq!(kinds("30"), vec![TokenKind::Integer]);
        assert_eq!(kinds("2.5"), vec![TokenKind::Decimal]);
        assert_eq!(kinds(".5"), vec![TokenKind::Decimal]);
        assert_eq!(kinds("-0.4"), vec![TokenKind::Decimal]);
        assert_eq!(kinds("1e-3"), vec![TokenKind::Scientific]);
        assert_eq!(kinds("6.5E10"), vec![TokenKind::Scientific]);
    }

    #[test]
    fn test_negative_literal_after_space() {
        assert_eq!(lexemes("x > -5"), vec!["x", ">", "-5"]);
    }

    #[test]
    fn test_minus_before_name_is_operator() {
        assert_eq!(kinds("-x"), vec![TokenKind::Minus, TokenKind::VarName]);
    }

    #[test]
    fn test_plus_does_not_sign_literals() {
        assert_eq!(
            kinds("a+5"),
            vec![TokenKind::VarName, TokenKind::Plus, TokenKind::Integer]
        );
    }

    #[test]
    fn test_string_with_spaces_and_symbols() {
        let tokens = significant("title \"Search for (new) physics, #1\"");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Str);
        assert_eq!(tokens[1].lexeme, "\"Search for (new) physics, #1\"");
        assert_eq!(tokens[1].unquoted(), "Search for (new) physics, #1");
    }

    proptest! {
        #[test]
        fn prop_integers_round_trip(n in any::<i32>()) {
            let text = n.to_string();
            let tokens = significant(&text);
            prop_assert_eq!(tokens.len(), 1);
            prop_assert_eq!(tokens[0].kind, TokenKind::Integer);
            prop_assert_eq!(&tokens[0].lexeme, &text);
        }

        #[test]
        fn prop_decimals_keep_lexeme(whole in 0u32..100000, frac in 0u32..100000, neg in any::<bool>()) {
            let text = format!("{}{}.{}", if neg { "-" } else { "" }, whole, frac);
            let tokens = significant(&text);
            prop_assert_eq!(tokens.len(), 1);
            prop_assert_eq!(tokens[0].kind, TokenKind::Decimal);
            prop_assert_eq!(&tokens[0].lexeme, &text);
        }

        #[test]
        fn prop_scientific_keeps_lexeme(m in 0u32..1000, e in 0u32..40, sign in prop::sample::select(vec!["", "+", "-"])) {
            let text = format!("{}.5e{}{}", m, sign, e);
            prop_assert_eq!(classify(&text), TokenKind::Scientific);
            let tokens = significant(&text);
            prop_assert_eq!(tokens.len(), 1);
            prop_assert_eq!(&tokens[0].lexeme, &text);
        }
    }
}
