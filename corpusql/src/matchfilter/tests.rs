use super::*;
use crate::context::ExecutionContext;
use crate::engine::memory::{MemoryDocument, MemoryField, MemoryIndex};
use crate::engine::{ForwardIndexAccessor, MatchInfo};
use crate::errors::QueryError;
use crate::extensions::QueryExtensions;
use crate::metadata::{AnnotatedFieldDesc, AnnotationDesc, IndexStructure};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

fn word(capture: &str) -> MatchFilter {
    MatchFilter::token_annotation(capture, "word")
}

fn structure() -> IndexStructure {
    IndexStructure::new().with_field(
        "contents",
        AnnotatedFieldDesc::default()
            .with_annotation("word", AnnotationDesc::default())
            .with_annotation("length", AnnotationDesc::default()),
    )
}

fn forward_index() -> MemoryIndex {
    MemoryIndex::new().with_document(
        MemoryDocument::new().with_field(
            "contents",
            MemoryField::from_words(&["The", "the", "Öl", "ol"])
                .with_annotation("length", &["3", "3", "2", "10"]),
        ),
    )
}

fn span(start: u32) -> MatchInfo {
    MatchInfo::Span {
        start,
        end: start + 1,
    }
}

/// Translate `filter` and evaluate it with captures `A`, `B` (and `C` if given)
/// at the given token positions.
fn evaluate(filter: &MatchFilter, extensions: &QueryExtensions, positions: &[u32]) -> ConstraintValue {
    let structure = structure();
    let context =
        ExecutionContext::new(&structure, "contents", "word", MatchSensitivity::Insensitive)
            .unwrap();
    let mut annotations = BTreeSet::new();
    let expr = ConstraintExpr::translate(filter, &context, extensions, &mut annotations).unwrap();
    let captures: BTreeMap<String, MatchInfo> = ["A", "B", "C"]
        .iter()
        .zip(positions.iter())
        .map(|(name, pos)| (name.to_string(), span(*pos)))
        .collect();
    let index = forward_index();
    let ctx = MatchContext {
        doc: 0,
        captures: &captures,
        forward_index: &index,
        field: "contents",
        extensions,
    };
    expr.evaluate(&ctx)
}

#[test]
fn compare_operators() {
    for (symbol, operator) in [
        ("=", CompareOperator::Equal),
        ("!=", CompareOperator::NotEqual),
        ("<", CompareOperator::Less),
        ("<=", CompareOperator::LessOrEqual),
        (">", CompareOperator::Greater),
        (">=", CompareOperator::GreaterOrEqual),
    ]
    .iter()
    {
        assert_eq!(*symbol, operator.symbol());
        assert_eq!(*operator, CompareOperator::from_str(symbol).unwrap());
    }
    assert!(CompareOperator::from_str("<>").is_err());
    assert!(CompareOperator::LessOrEqual.holds(std::cmp::Ordering::Equal));
    assert!(!CompareOperator::Less.holds(std::cmp::Ordering::Equal));
    assert!(CompareOperator::NotEqual.holds(std::cmp::Ordering::Greater));
}

#[test]
fn referenced_captures() {
    let filter = MatchFilter::implication(
        MatchFilter::and(word("A"), MatchFilter::string("x")),
        MatchFilter::or(
            MatchFilter::same_tokens("B", "C", "lemma", None),
            MatchFilter::not(MatchFilter::function_call("f", "D")),
        ),
    );
    assert_eq!(vec!["A", "B", "C", "D"], filter.referenced_captures());
}

#[test]
fn translation_resolves_defaults() {
    let structure = structure();
    let context =
        ExecutionContext::new(&structure, "contents", "word", MatchSensitivity::Insensitive)
            .unwrap();
    let extensions = QueryExtensions::default();
    let mut annotations = BTreeSet::new();
    let filter = MatchFilter::and(
        MatchFilter::equals(word("A"), word("B"), None),
        MatchFilter::token_annotation_equals(
            "A",
            "length",
            "3",
            Some(MatchSensitivity::Sensitive),
        ),
    );
    let expr = ConstraintExpr::translate(&filter, &context, &extensions, &mut annotations).unwrap();
    insta::assert_snapshot!(expr.to_string(), @"AND(CMP(A.word, =, B.word, i), EQ(A.length, '3', s))");
    assert_eq!(
        vec!["length", "word"],
        annotations.into_iter().collect::<Vec<_>>()
    );
}

#[test]
fn translation_errors() {
    let structure = structure();
    let context =
        ExecutionContext::new(&structure, "contents", "word", MatchSensitivity::Insensitive)
            .unwrap();
    let extensions = QueryExtensions::default();
    let mut annotations = BTreeSet::new();
    assert_matches!(
        ConstraintExpr::translate(
            &MatchFilter::token_annotation("A", "lemma"),
            &context,
            &extensions,
            &mut annotations
        ),
        Err(QueryError::InvalidQuery(_))
    );
    assert_matches!(
        ConstraintExpr::translate(
            &MatchFilter::function_call("isUpper", "A"),
            &context,
            &extensions,
            &mut annotations
        ),
        Err(QueryError::InvalidQuery(_))
    );
}

#[test]
fn equality_follows_sensitivity() {
    let extensions = QueryExtensions::default();
    let insensitive = MatchFilter::equals(word("A"), word("B"), None);
    assert_eq!(ConstraintValue::Bool(true), evaluate(&insensitive, &extensions, &[0, 1]));
    // diacritics are ignored as well
    assert_eq!(ConstraintValue::Bool(true), evaluate(&insensitive, &extensions, &[2, 3]));

    let sensitive = MatchFilter::equals(word("A"), word("B"), Some(MatchSensitivity::Sensitive));
    assert_eq!(ConstraintValue::Bool(false), evaluate(&sensitive, &extensions, &[0, 1]));

    let same = MatchFilter::same_tokens("A", "B", "word", Some(MatchSensitivity::CaseInsensitive));
    assert_eq!(ConstraintValue::Bool(true), evaluate(&same, &extensions, &[0, 1]));
    assert_eq!(ConstraintValue::Bool(false), evaluate(&same, &extensions, &[2, 3]));

    let literal = MatchFilter::token_annotation_equals("A", "word", "the", None);
    assert_eq!(ConstraintValue::Bool(true), evaluate(&literal, &extensions, &[0]));
}

#[test]
fn numeric_comparison() {
    let extensions = QueryExtensions::default();
    let length = |c| MatchFilter::token_annotation(c, "length");
    let less = MatchFilter::compare(length("A"), length("B"), CompareOperator::Less, None);
    // 2 < 10 numerically, although "2" > "10" as strings
    assert_eq!(ConstraintValue::Bool(true), evaluate(&less, &extensions, &[2, 3]));

    let words = MatchFilter::compare(word("A"), word("B"), CompareOperator::Less, None);
    assert_eq!(ConstraintValue::Bool(false), evaluate(&words, &extensions, &[2, 3]));
}

#[test]
fn undefined_values() {
    let extensions = QueryExtensions::default();
    let missing = MatchFilter::equals(word("A"), word("C"), None);
    assert_eq!(ConstraintValue::Undefined, evaluate(&missing, &extensions, &[0, 1]));
    assert_eq!(
        ConstraintValue::Undefined,
        evaluate(&MatchFilter::not(missing.clone()), &extensions, &[0, 1])
    );
    // undefined is false in boolean context
    let implication = MatchFilter::implication(missing, MatchFilter::string(""));
    assert_eq!(ConstraintValue::Bool(true), evaluate(&implication, &extensions, &[0, 1]));
    let either = MatchFilter::or(
        MatchFilter::equals(word("A"), word("C"), None),
        MatchFilter::string("yes"),
    );
    assert_eq!(ConstraintValue::Bool(true), evaluate(&either, &extensions, &[0, 1]));
}

fn is_capitalized(ctx: &MatchContext, info: &MatchInfo) -> ConstraintValue {
    let (start, _) = info.span();
    match ctx
        .forward_index
        .token_value(ctx.doc, ctx.field, "word", start)
    {
        Some(word) => ConstraintValue::Bool(word.chars().next().map_or(false, char::is_uppercase)),
        None => ConstraintValue::Undefined,
    }
}

#[test]
fn filter_functions() {
    let mut extensions = QueryExtensions::default();
    extensions.register_filter("isCapitalized", is_capitalized);
    let filter = MatchFilter::function_call("isCapitalized", "A");
    assert_eq!(ConstraintValue::Bool(true), evaluate(&filter, &extensions, &[0]));
    assert_eq!(ConstraintValue::Bool(false), evaluate(&filter, &extensions, &[1]));
    let missing_capture = MatchFilter::function_call("isCapitalized", "C");
    assert_eq!(ConstraintValue::Undefined, evaluate(&missing_capture, &extensions, &[0]));
}
