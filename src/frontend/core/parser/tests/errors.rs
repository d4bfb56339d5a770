//! Parse error tests

use super::*;
use crate::frontend::core::lexer::TokenKind;

#[test]
fn test_object_missing_assignment() {
    let err = parse_err("obj X jet");
    assert_eq!(err.lexeme(), "jet");
    assert_eq!((err.line(), err.column()), (1, 7));
    assert!(err
        .to_string()
        .ends_with("Expected symbol for object definition, either ':' or '=' or TAKE"));
}

#[test]
fn test_definition_needs_particle_keyword() {
    let err = parse_err("def lead = jet[0]");
    assert_eq!(err.lexeme(), "jet");
    assert!(err.to_string().contains("\"particle\" keyword"));

    let err = parse_err("def lead = jets[0]");
    assert_eq!(err.lexeme(), "jets");
}

#[test]
fn test_definition_assignment_symbol() {
    let err = parse_err("def x > 5");
    assert!(err
        .to_string()
        .ends_with("Unknown token for definition assignment, expected '=' or ':'"));
}

#[test]
fn test_integer_id() {
    let err = parse_err("def 5 = 3");
    assert!(err.to_string().ends_with("integers for ID must be put in quotes."));
}

#[test]
fn test_leftover_token() {
    let err = parse_err("def x = 1\n)");
    assert_eq!(err.lexeme(), ")");
    assert_eq!(err.line(), 2);
    assert!(err.to_string().contains("Unexpected token follows a block"));
}

#[test]
fn test_missing_close_paren() {
    let err = parse_err("def x = pt(jet");
    match err {
        ParseError::ExpectedToken { expected, found, .. } => {
            assert_eq!(expected, TokenKind::CloseParen);
            assert_eq!(found, TokenKind::Eof);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_histogram_bin_count() {
    let err = parse_err("algo r\n histo h, \"d\", 2.5, 0, 1, met");
    assert_eq!(err.lexeme(), "2.5");
    assert!(err.to_string().contains("binning quantity"));
}

#[test]
fn test_non_integer_index() {
    let err = parse_err("def x = pt(jet[a])");
    assert_eq!(err.lexeme(), "a");
    assert!(err.to_string().ends_with("Only integers are allowed to be used as indices"));
}

#[test]
fn test_invalid_info_entry() {
    let err = parse_err("info a\n select x");
    assert!(err.to_string().ends_with("Unexpected token after an initialization block"));
}

#[test]
fn test_table_nvars() {
    let err = parse_err("table t tabletype eff nvars x errors true 1 2 3");
    assert!(err.to_string().ends_with("Only integers are allowed to specify NVars"));
}

#[test]
fn test_bins_need_numbers() {
    let err = parse_err("algo r\n bins met x");
    assert_eq!(err.lexeme(), "x");
}
