#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;

fn parse(expressions: &[&str]) -> CharRanges {
    let owned: Vec<String> = expressions.iter().map(|e| (*e).to_owned()).collect();
    CharRanges::parse_expressions(&owned).expect("valid expressions")
}

#[test]
fn paren_range_is_inclusive() {
    let set = parse(&["(a-f)"]);
    assert!(set.contains('a'));
    assert!(set.contains('c'));
    assert!(set.contains('f'));
    assert!(!set.contains('g'));
    assert!(!set.contains('A'));
}

#[test]
fn bracket_list_contains_exactly_its_characters() {
    let set = parse(&["[xyz_]"]);
    assert!(set.contains('x'));
    assert!(set.contains('_'));
    assert!(!set.contains('a'));
}

#[test]
fn expressions_union() {
    let set = parse(&["(a-z)", "digits", "[_]"]);
    assert!(set.contains('q'));
    assert!(set.contains('7'));
    assert!(set.contains('_'));
    assert!(!set.contains('-'));
}

#[test]
fn named_sets() {
    let set = parse(&["letters"]);
    assert!(set.contains('a'));
    assert!(set.contains('Z'));
    assert!(!set.contains('0'));

    let set = parse(&["spacing"]);
    assert!(set.contains(' '));
    assert!(set.contains('\t'));

    let set = parse(&["linebreak"]);
    assert!(set.contains('\n'));
    assert!(set.contains('\r'));
}

#[test]
fn malformed_expressions_are_rejected() {
    let reject = |expr: &str| {
        let owned = vec![expr.to_owned()];
        assert!(
            CharRanges::parse_expressions(&owned).is_err(),
            "expected '{expr}' to be rejected"
        );
    };
    reject("(z-a)");
    reject("(a-a)");
    reject("(ab)");
    reject("(a-b-c)");
    reject("[aa]");
    reject("[]");
    reject("glyphs");
    reject("(a-\u{0301})");
}
