use assert_matches::assert_matches;
use corpusql::config::CompilerConfiguration;
use corpusql::context::ExecutionContext;
use corpusql::engine::memory::{MemoryDocument, MemoryField, MemoryIndex};
use corpusql::engine::{MatchInfo, SpanIndex, SpanMatch};
use corpusql::errors::QueryError;
use corpusql::extensions::QueryExtensions;
use corpusql::matchfilter::MatchFilter;
use corpusql::metadata::IndexStructure;
use corpusql::textpattern::{RelationOperatorInfo, RelationTarget, TextPattern};
use corpusql::translate::{translate, Translator};
use corpusql::{MatchSensitivity, PositionOperation, SpanMode, TagAdjust};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const STRUCTURE: &str = r#"
[fields.contents]
relations = true

[fields.contents.annotations.word]

[fields.contents.annotations.lemma]

[fields.contents.annotations.pos]
sensitivities = ["s"]
"#;

const CONFIG: &str = r#"
[defaults]
field = "contents"
annotation = "word"
sensitivity = "i"
"#;

fn corpus() -> MemoryIndex {
    let first = MemoryField::from_words(&[
        "The", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog",
    ])
    .with_annotation(
        "lemma",
        &["the", "quick", "brown", "fox", "jump", "over", "the", "lazy", "dog"],
    )
    .with_annotation(
        "pos",
        &["DET", "ADJ", "ADJ", "NOUN", "VERB", "ADP", "DET", "ADJ", "NOUN"],
    )
    .with_relation("dep::nsubj", (4, 5), (3, 4))
    .with_relation("dep::amod", (3, 4), (1, 2))
    .with_relation("dep::amod", (3, 4), (2, 3))
    .with_relation("dep::obl", (4, 5), (8, 9))
    .with_root_relation("dep::root", (4, 5))
    .with_tag("s", 0, 9, &[("id", "s1")]);
    let second = MemoryField::from_words(&["the", "the", "dog", "barks"])
        .with_annotation("lemma", &["the", "the", "dog", "bark"])
        .with_annotation("pos", &["DET", "DET", "NOUN", "VERB"])
        .with_relation("dep::nsubj", (3, 4), (2, 3))
        .with_relation("ud::det", (2, 3), (1, 2))
        .with_root_relation("dep::root", (3, 4))
        .with_tag("s", 0, 4, &[("id", "s2")]);
    MemoryIndex::new()
        .with_document(MemoryDocument::new().with_field("contents", first))
        .with_document(MemoryDocument::new().with_field("contents", second))
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn find(pattern: &TextPattern) -> Vec<SpanMatch> {
    init_logging();
    let structure = IndexStructure::from_toml(STRUCTURE).unwrap();
    let config = CompilerConfiguration::from_toml(CONFIG).unwrap();
    let context = ExecutionContext::from_config(&structure, &config).unwrap();
    let plan = translate(pattern, &context, &config).unwrap();
    corpus()
        .find_spans(&plan, "contents")
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn spans(pattern: &TextPattern) -> Vec<(u32, u32, u32)> {
    let mut result: Vec<_> = find(pattern)
        .into_iter()
        .map(|m| (m.doc, m.start, m.end))
        .collect();
    result.dedup();
    result
}

fn spans_without_rewriting(pattern: &TextPattern) -> Vec<(u32, u32, u32)> {
    let structure = IndexStructure::from_toml(STRUCTURE).unwrap();
    let config = CompilerConfiguration::from_toml(CONFIG).unwrap();
    let context = ExecutionContext::from_config(&structure, &config).unwrap();
    let extensions = QueryExtensions::default();
    let plan = Translator::new(&extensions, &config.limits)
        .without_rewriting()
        .translate(pattern, &context)
        .unwrap();
    let mut result: Vec<_> = corpus()
        .find_spans(&plan, "contents")
        .unwrap()
        .map(|m| m.map(|m| (m.doc, m.start, m.end)))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    result.dedup();
    result
}

fn relation(operator: &str, target: TextPattern, span_mode: SpanMode) -> RelationTarget {
    RelationTarget::new(
        RelationOperatorInfo::from_operator(operator).unwrap(),
        target,
        span_mode,
        None,
    )
    .unwrap()
}

#[test]
fn sequence_with_optional_gap() {
    let pattern = TextPattern::sequence(vec![
        TextPattern::term("the"),
        TextPattern::repetition(TextPattern::any_token(1, 1).unwrap(), 0, 2).unwrap(),
        TextPattern::regex("fo.*"),
    ])
    .unwrap();
    assert_eq!(vec![(0, 0, 4)], spans(&pattern));
}

#[test]
fn rewriting_keeps_the_matches() {
    let the = || TextPattern::term("the");
    let patterns = vec![
        TextPattern::regex("fox"),
        TextPattern::regex("(?-i)The"),
        TextPattern::regex("th.*"),
        TextPattern::not(TextPattern::not(the()).unwrap()).unwrap(),
        TextPattern::or(vec![the(), TextPattern::term("dog"), the()]).unwrap(),
        TextPattern::sequence(vec![
            the(),
            TextPattern::repetition(TextPattern::any_token(1, 1).unwrap(), 1, 2).unwrap(),
        ])
        .unwrap(),
        TextPattern::sequence(vec![
            TextPattern::any_token(0, 1).unwrap(),
            TextPattern::term("dog"),
        ])
        .unwrap(),
        TextPattern::and(vec![
            TextPattern::term_with("DET", Some("pos"), None),
            TextPattern::not(TextPattern::term_with(
                "The",
                Some("word"),
                Some(MatchSensitivity::Sensitive),
            ))
            .unwrap(),
        ])
        .unwrap(),
    ];
    for pattern in patterns.iter() {
        let rewritten = spans(pattern);
        assert!(!rewritten.is_empty(), "{:?}", pattern);
        assert_eq!(spans_without_rewriting(pattern), rewritten);
    }
}

#[test]
fn regex_and_term_find_the_same_tokens() {
    assert_eq!(
        spans(&TextPattern::term("fox")),
        spans(&TextPattern::regex("fox"))
    );
    assert_eq!(
        vec![(0, 0, 1)],
        spans(&TextPattern::regex("(?-i)The"))
    );
    assert_eq!(
        spans(&TextPattern::regex("(?-i)The")),
        spans(&TextPattern::term_with("The", None, Some(MatchSensitivity::Sensitive)))
    );
}

#[test]
fn constrained_captures() {
    let pattern = TextPattern::constrained(
        TextPattern::sequence(vec![
            TextPattern::capture(TextPattern::any_token(1, 1).unwrap(), "A").unwrap(),
            TextPattern::capture(TextPattern::any_token(1, 1).unwrap(), "B").unwrap(),
        ])
        .unwrap(),
        MatchFilter::equals(
            MatchFilter::token_annotation("A", "word"),
            MatchFilter::token_annotation("B", "word"),
            None,
        ),
    );
    let matches = find(&pattern);
    assert_eq!(1, matches.len());
    assert_eq!((1, 0, 2), (matches[0].doc, matches[0].start, matches[0].end));
    assert_eq!(
        Some(&MatchInfo::Span { start: 1, end: 2 }),
        matches[0].captures.get("B")
    );
}

#[test]
fn constraint_on_other_annotation() {
    let pattern = TextPattern::constrained(
        TextPattern::capture(TextPattern::regex_with("N.*", Some("pos"), None), "A").unwrap(),
        MatchFilter::token_annotation_equals("A", "lemma", "dog", None),
    );
    assert_eq!(vec![(0, 8, 9), (1, 2, 3)], spans(&pattern));
}

#[test]
fn relation_match_returns_the_source() {
    let pattern = TextPattern::relation_match(
        TextPattern::term("jumps"),
        vec![relation("-nsubj->", TextPattern::term("fox"), SpanMode::Source)],
    )
    .unwrap();
    let matches = find(&pattern);
    assert_eq!(1, matches.len());
    assert_eq!((0, 4, 5), (matches[0].doc, matches[0].start, matches[0].end));
    assert_matches!(
        matches[0].captures.get("nsubj"),
        Some(MatchInfo::Relation(r)) if r.full_type == "dep::nsubj"
    );
}

#[test]
fn relation_target_may_be_left_open() {
    let pattern = TextPattern::relation_match(
        TextPattern::term("fox"),
        vec![relation("-amod->", TextPattern::default_value(), SpanMode::Source)],
    )
    .unwrap();
    // one match per relation, both with the same span
    let matches = find(&pattern);
    assert_eq!(2, matches.len());
    assert_eq!(vec![(0, 3, 4)], spans(&pattern));

    let two_children = TextPattern::relation_match(
        TextPattern::term("jumps"),
        vec![
            relation("-nsubj->", TextPattern::default_value(), SpanMode::Source),
            relation("-obl->", TextPattern::term("dog"), SpanMode::Source),
        ],
    )
    .unwrap();
    assert_eq!(vec![(0, 4, 5)], spans(&two_children));
}

#[test]
fn untyped_relations_match_every_class() {
    let any_type = TextPattern::relation_match(
        TextPattern::term("dog"),
        vec![relation("-->", TextPattern::term("the"), SpanMode::Source)],
    )
    .unwrap();
    assert_eq!(vec![(1, 2, 3)], spans(&any_type));

    let dependency_only = TextPattern::relation_match(
        TextPattern::term("dog"),
        vec![relation("-dep::det->", TextPattern::term("the"), SpanMode::Source)],
    )
    .unwrap();
    assert_eq!(Vec::<(u32, u32, u32)>::new(), spans(&dependency_only));
}

#[test]
fn root_relations() {
    let pattern = TextPattern::root_relation_match(vec![relation(
        "^-->",
        TextPattern::default_value(),
        SpanMode::Target,
    )])
    .unwrap();
    assert_eq!(vec![(0, 4, 5), (1, 3, 4)], spans(&pattern));
}

#[test]
fn default_value_outside_operands() {
    let structure = IndexStructure::from_toml(STRUCTURE).unwrap();
    let config = CompilerConfiguration::default();
    let context = ExecutionContext::from_config(&structure, &config).unwrap();
    let pattern =
        TextPattern::sequence(vec![TextPattern::default_value(), TextPattern::term("dog")])
            .unwrap();
    assert_matches!(
        translate(&pattern, &context, &config),
        Err(QueryError::InvalidQuery(_))
    );
}

#[test]
fn within_sentence_tags() {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        "id".to_string(),
        corpusql::textpattern::MatchValue::Regex("s2".to_string()),
    );
    let sentence = TextPattern::tags("s", attributes, TagAdjust::FullTag, None).unwrap();
    let pattern = TextPattern::position_filter(
        TextPattern::term("the"),
        sentence,
        PositionOperation::Within,
        false,
    );
    assert_eq!(vec![(1, 0, 1), (1, 1, 2)], spans(&pattern));

    let start = TextPattern::sequence(vec![
        TextPattern::tags("s", BTreeMap::new(), TagAdjust::LeadingEdge, None).unwrap(),
        TextPattern::term("the"),
    ])
    .unwrap();
    assert_eq!(vec![(0, 0, 1), (1, 0, 1)], spans(&start));
}

#[test]
fn configured_limits() {
    let structure = IndexStructure::from_toml(STRUCTURE).unwrap();
    let config = CompilerConfiguration::from_toml("[limits]\nregex_nest_limit = 2\n").unwrap();
    assert_eq!("contents", config.defaults.field);
    let context = ExecutionContext::from_config(&structure, &config).unwrap();
    assert_matches!(
        translate(&TextPattern::regex("((((a))))"), &context, &config),
        Err(QueryError::PatternTooLarge(_))
    );
    assert!(translate(&TextPattern::regex("a|b"), &context, &config).is_ok());
}

#[test]
fn unknown_default_annotation() {
    let structure = IndexStructure::from_toml(STRUCTURE).unwrap();
    let config = CompilerConfiguration::from_toml("[defaults]\nannotation = \"morph\"\n").unwrap();
    assert!(ExecutionContext::from_config(&structure, &config).is_err());
    assert_matches!(
        CompilerConfiguration::from_toml("[defaults]\nsensitivity = \"x\"\n"),
        Err(QueryError::TomlDeserializer(_))
    );
}
