//! Generated-input tests for the expression grammar

use super::*;
use crate::frontend::core::lexer::tokenize;
use proptest::prelude::*;
use quickcheck::{quickcheck, TestResult};

/// Identifiers that are not keywords
fn identifier_strategy() -> impl Strategy<Value = String> {
    "v[a-z0-9_]{0,8}"
}

fn number_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[0-9]{1,6}", "[0-9]{1,3}\\.[0-9]{1,3}"]
}

fn bin_op_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("/"),
        Just("^"),
        Just("<"),
        Just(">="),
        Just("=="),
        Just("and"),
        Just("or"),
    ]
}

/// Well-formed expressions
fn expr_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![identifier_strategy(), number_strategy()];
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), bin_op_strategy(), inner.clone())
                .prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            inner.clone().prop_map(|e| format!("({})", e)),
            inner.clone().prop_map(|e| format!("abs({})", e)),
            inner.prop_map(|e| format!("not {}", e)),
        ]
    })
}

proptest! {
    #[test]
    fn prop_valid_expressions_parse(expr in expr_strategy()) {
        let ast = parse(&tokenize(&format!("def x = {}", expr)).unwrap());
        prop_assert!(ast.is_ok(), "{}: {:?}", expr, ast.err());
    }

    #[test]
    fn prop_nested_parens(depth in 1..64usize) {
        let source = format!("def x = {}1{}", "(".repeat(depth), ")".repeat(depth));
        prop_assert!(parse(&tokenize(&source).unwrap()).is_ok());
    }

    #[test]
    fn prop_parents_point_back(count in 1..20usize) {
        let source: String = (0..count).map(|i| format!("def v{} = {} + met * 2\n", i, i)).collect();
        let ast = parse_source(&source);
        for id in ast.preorder() {
            for &child in ast.children(id) {
                prop_assert_eq!(ast.parent(child), Some(id));
            }
        }
    }
}

#[test]
fn quickcheck_integer_definitions() {
    fn prop(n: u32) -> TestResult {
        let ast = parse_source(&format!("def x = {}", n));
        let def = block(&ast, 0);
        TestResult::from_bool(ast.kind(def) == NodeKind::Definition)
    }
    quickcheck(prop as fn(u32) -> TestResult);
}

#[test]
fn quickcheck_arbitrary_text_never_panics() {
    fn prop(text: String) -> TestResult {
        // errors are fine; panics are not
        if let Ok(tokens) = tokenize(&text) {
            let _ = parse(&tokens);
        }
        TestResult::passed()
    }
    quickcheck(prop as fn(String) -> TestResult);
}
