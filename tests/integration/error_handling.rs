//! Error handling integration tests
//!
//! Each stage reports the offending lexeme with its line and column.

use adlc::frontend::{CompileError, Compiler};
use adlc::middle::LoweringError;
use adlc::{compile, compile_file};
use adlc::util::config::CompilerConfig;
use std::path::Path;

#[test]
fn test_empty_source_compiles_to_nothing() {
    let stream = compile("").unwrap();
    assert!(stream.is_empty());

    let stream = compile("# only a comment\n\n").unwrap();
    assert!(stream.is_empty());
}

#[test]
fn test_unterminated_string_position() {
    let err = Compiler::new()
        .compile("info a\n  title \"never closed\n")
        .unwrap_err();
    let CompileError::LexError(err) = err else {
        panic!("expected a lexical error, got {:?}", err);
    };
    assert_eq!(err.line(), 2);
    assert_eq!(err.column(), 9);
}

#[test]
fn test_parse_error_position() {
    let err = Compiler::new()
        .compile("def x = 1\nobj j : jet\n  select pt > )\n")
        .unwrap_err();
    let CompileError::ParseError(err) = err else {
        panic!("expected a parse error, got {:?}", err);
    };
    assert_eq!(err.line(), 3);
    assert!(err.to_string().starts_with("Failed to parse"));
}

#[test]
fn test_trailing_garbage_is_rejected() {
    assert!(compile("def x = 1\n)\n").is_err());
}

#[test]
fn test_this_outside_object() {
    let err = Compiler::new().compile("def x = pt(this)\n").unwrap_err();
    let CompileError::LoweringError(err) = err else {
        panic!("expected a lowering error, got {:?}", err);
    };
    assert!(matches!(err, LoweringError::Conversion { line: 1, .. }));
    assert!(err
        .to_string()
        .contains("A particle must be given explicitly outside of an object block"));
}

#[test]
fn test_unsupported_constructs() {
    for source in [
        "def a = fMTR(jets, met)\n",
        "def b = fhemisphere(jets, 1, 2)\n",
        "region sr\n  select met > 0 ? print met : all\n",
    ] {
        let err = Compiler::new().compile(source).unwrap_err();
        assert!(
            matches!(
                err,
                CompileError::LoweringError(LoweringError::NotImplemented { .. })
            ),
            "{}: {:?}",
            source,
            err
        );
    }
}

#[test]
fn test_missing_file() {
    let err = compile_file(
        Path::new("/nonexistent/analysis.adl"),
        &CompilerConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Failed to read file"));
}
