use super::*;
use crate::matchfilter::CompareOperator;
use crate::textpattern::RelationOperatorInfo;
use assert_matches::assert_matches;
use corpusql_core::types::RelationDirection;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn seq(clauses: Vec<TextPattern>) -> TextPattern {
    TextPattern::sequence(clauses).unwrap()
}

fn annotated(annotation: &str, value: &str) -> TextPattern {
    TextPattern::term_with(value, Some(annotation), None)
}

fn cql(pattern: &TextPattern) -> String {
    to_cql(pattern).unwrap()
}

fn no_attributes() -> BTreeMap<String, MatchValue> {
    BTreeMap::new()
}

fn target(operator: &str, clause: TextPattern, capture: Option<&str>) -> RelationTarget {
    let info = RelationOperatorInfo::from_operator(operator).unwrap();
    let span_mode = if info.is_root() {
        SpanMode::Target
    } else {
        SpanMode::Source
    };
    RelationTarget::new(info, clause, span_mode, capture).unwrap()
}

#[test]
fn sequence_with_optional_gap() {
    let pattern = seq(vec![
        TextPattern::term("the"),
        TextPattern::repetition(TextPattern::any_token(1, 1).unwrap(), 0, 2).unwrap(),
        TextPattern::regex("fo.*"),
    ]);
    insta::assert_snapshot!(cql(&pattern), @"the []{0,2} fo.*");
}

#[test]
fn values_are_quoted_when_needed() {
    assert_eq!("'hello world'", cql(&TextPattern::term("hello world")));
    assert_eq!(r"'a\\.b'", cql(&TextPattern::term("a.b")));
    assert_eq!(r"'it\'s'", cql(&TextPattern::regex("it's")));
    assert_eq!("'.*'", cql(&TextPattern::regex(".*")));
    assert_eq!("x+", cql(&TextPattern::regex("x+")));
}

#[test]
fn sensitivity_prefixes() {
    let sensitive = TextPattern::term_with("The", None, Some(MatchSensitivity::Sensitive));
    assert_eq!("'(?-i)The'", cql(&sensitive));
    let insensitive =
        TextPattern::term_with("be", Some("lemma"), Some(MatchSensitivity::Insensitive));
    assert_eq!("[lemma='(?i)be']", cql(&insensitive));

    let case_only = TextPattern::term_with("a", None, Some(MatchSensitivity::CaseInsensitive));
    assert_matches!(
        to_cql(&case_only),
        Err(QueryError::UnsupportedSerialization(_))
    );
}

#[test]
fn token_brackets() {
    assert_eq!("[lemma='be']", cql(&annotated("lemma", "be")));

    let both = TextPattern::and(vec![
        annotated("lemma", "be"),
        TextPattern::not(annotated("pos", "VERB")).unwrap(),
    ])
    .unwrap();
    assert_eq!("[lemma='be' & pos!='VERB']", cql(&both));

    let nested = TextPattern::and(vec![
        TextPattern::or(vec![annotated("lemma", "a"), annotated("lemma", "b")]).unwrap(),
        annotated("pos", "N"),
    ])
    .unwrap();
    assert_eq!("[(lemma='a' | lemma='b') & pos='N']", cql(&nested));

    let negated_or = TextPattern::not(
        TextPattern::or(vec![annotated("pos", "N"), annotated("pos", "V")]).unwrap(),
    )
    .unwrap();
    assert_eq!("[!(pos='N' | pos='V')]", cql(&negated_or));

    // Mixed with an unannotated term, so each side gets its own brackets
    let mixed = TextPattern::and(vec![annotated("pos", "N"), TextPattern::term("dog")]).unwrap();
    assert_eq!("[pos='N'] & dog", cql(&mixed));
}

#[test]
fn parentheses_follow_precedence() {
    let a = || TextPattern::term("a");
    let b = || TextPattern::term("b");
    let c = || TextPattern::term("c");

    let or_of_seq = TextPattern::or(vec![seq(vec![a(), b()]), c()]).unwrap();
    assert_eq!("a b | c", cql(&or_of_seq));

    let seq_of_or = seq(vec![TextPattern::or(vec![a(), b()]).unwrap(), c()]);
    assert_eq!("(a | b) c", cql(&seq_of_or));

    let and_of_or = TextPattern::and(vec![TextPattern::or(vec![a(), b()]).unwrap(), c()]).unwrap();
    assert_eq!("(a | b) & c", cql(&and_of_or));

    let repeated = TextPattern::repetition(seq(vec![a(), b()]), 1, UNLIMITED).unwrap();
    assert_eq!("(a b)+", cql(&repeated));

    let captured_seq = TextPattern::capture(seq(vec![a(), b()]), "A").unwrap();
    assert_eq!("A:(a b)", cql(&captured_seq));

    let seq_of_captures = seq(vec![TextPattern::capture(a(), "A").unwrap(), b()]);
    assert_eq!("A:a b", cql(&seq_of_captures));

    let captured_repetition =
        TextPattern::capture(TextPattern::repetition(a(), 0, 1).unwrap(), "A").unwrap();
    assert_eq!("A:a?", cql(&captured_repetition));

    let repeated_capture =
        TextPattern::repetition(TextPattern::capture(a(), "A").unwrap(), 2, 2).unwrap();
    assert_eq!("(A:a){2}", cql(&repeated_capture));
}

#[test]
fn repetition_operators() {
    let any = |min, max| cql(&TextPattern::any_token(min, max).unwrap());
    assert_eq!("[]", any(1, 1));
    assert_eq!("[]*", any(0, UNLIMITED));
    assert_eq!("[]+", any(1, UNLIMITED));
    assert_eq!("[]?", any(0, 1));
    assert_eq!("[]{3,}", any(3, UNLIMITED));
    assert_eq!("[]{3}", any(3, 3));
    assert_eq!("[]{2,5}", any(2, 5));
}

#[test]
fn expansions() {
    let right =
        TextPattern::expansion(TextPattern::term("a"), ExpansionDirection::Right, 1, 3).unwrap();
    assert_eq!("a []{1,3}", cql(&right));
    let left =
        TextPattern::expansion(TextPattern::term("a"), ExpansionDirection::Left, 0, UNLIMITED)
            .unwrap();
    assert_eq!("[]* a", cql(&left));
    let inside = TextPattern::or(vec![right, TextPattern::term("b")]).unwrap();
    assert_eq!("a []{1,3} | b", cql(&inside));
}

#[test]
fn position_filters() {
    let sentence = TextPattern::tags("s", no_attributes(), TagAdjust::FullTag, None).unwrap();
    let words = seq(vec![TextPattern::term("a"), TextPattern::term("b")]);
    let within =
        TextPattern::position_filter(words.clone(), sentence.clone(), PositionOperation::Within, false);
    assert_eq!("a b within <s/>", cql(&within));

    let containing = TextPattern::position_filter(
        sentence.clone(),
        TextPattern::or(vec![TextPattern::term("a"), TextPattern::term("b")]).unwrap(),
        PositionOperation::Containing,
        false,
    );
    assert_eq!("<s/> containing a | b", cql(&containing));

    let nested = TextPattern::position_filter(
        within.clone(),
        sentence.clone(),
        PositionOperation::Within,
        false,
    );
    assert_eq!("(a b within <s/>) within <s/>", cql(&nested));

    let inverted =
        TextPattern::position_filter(words.clone(), sentence.clone(), PositionOperation::Within, true);
    assert_matches!(to_cql(&inverted), Err(QueryError::UnsupportedSerialization(_)));
    let starts_at =
        TextPattern::position_filter(words, sentence, PositionOperation::StartsAt, false);
    assert_matches!(to_cql(&starts_at), Err(QueryError::UnsupportedSerialization(_)));
}

#[test]
fn tags() {
    let mut attributes = no_attributes();
    attributes.insert("id".to_string(), MatchValue::Regex("b.*".to_string()));
    attributes.insert("n".to_string(), MatchValue::int_range(1, 3).unwrap());

    let full = TextPattern::tags("s", attributes.clone(), TagAdjust::FullTag, None).unwrap();
    assert_eq!("<s id='b.*' n=in[1,3]/>", cql(&full));
    let leading =
        TextPattern::tags("s", attributes.clone(), TagAdjust::LeadingEdge, None).unwrap();
    assert_eq!("<s id='b.*' n=in[1,3]>", cql(&leading));
    let trailing = TextPattern::tags("s", no_attributes(), TagAdjust::TrailingEdge, None).unwrap();
    assert_eq!("</s>", cql(&trailing));
    let captured =
        TextPattern::tags("s", no_attributes(), TagAdjust::FullTag, Some("S")).unwrap();
    assert_eq!("S:<s/>", cql(&captured));

    let trailing_with_attributes =
        TextPattern::tags("s", attributes, TagAdjust::TrailingEdge, None).unwrap();
    assert_matches!(
        to_cql(&trailing_with_attributes),
        Err(QueryError::UnsupportedSerialization(_))
    );
}

#[test]
fn relations() {
    let single = TextPattern::relation_match(
        TextPattern::term("run"),
        vec![target("-nsubj->", TextPattern::term("dog"), None)],
    )
    .unwrap();
    assert_eq!("run -nsubj-> dog", cql(&single));

    let two = TextPattern::relation_match(
        TextPattern::any_token(1, 1).unwrap(),
        vec![
            target("-nsubj->", TextPattern::term("dog"), None),
            target("!-obj->", TextPattern::any_token(1, 1).unwrap(), Some("o")),
        ],
    )
    .unwrap();
    assert_eq!("[] -nsubj-> dog ; o:!-obj-> []", cql(&two));

    let aligned = TextPattern::relation_match(
        TextPattern::term("fox"),
        vec![target("==>nl?", TextPattern::any_ngram(), None)],
    )
    .unwrap();
    assert_eq!("fox ==>nl? []*", cql(&aligned));

    let root =
        TextPattern::root_relation_match(vec![target("^-->", TextPattern::term("run"), None)])
            .unwrap();
    assert_eq!("^--> run", cql(&root));

    let standalone = TextPattern::relation_target(target("-amod->", TextPattern::term("big"), None));
    assert_eq!("_ -amod-> big", cql(&standalone));

    let sequence_target = TextPattern::relation_match(
        TextPattern::term("run"),
        vec![target(
            "-->",
            seq(vec![TextPattern::term("a"), TextPattern::term("dog")]),
            None,
        )],
    )
    .unwrap();
    assert_eq!("run --> (a dog)", cql(&sequence_target));
}

#[test]
fn relations_without_text_form() {
    let full_span = RelationTarget::new(
        RelationOperatorInfo::of_type("nsubj"),
        TextPattern::term("dog"),
        SpanMode::FullSpan,
        None,
    )
    .unwrap();
    let pattern = TextPattern::relation_match(TextPattern::term("run"), vec![full_span]).unwrap();
    assert_matches!(to_cql(&pattern), Err(QueryError::UnsupportedSerialization(_)));

    let with_source_version = RelationTarget::new(
        RelationOperatorInfo::new("", RelationDirection::Both, Some("nl"), false, true, false)
            .unwrap()
            .with_source_version(Some("en")),
        TextPattern::any_ngram(),
        SpanMode::Source,
        None,
    )
    .unwrap();
    let pattern =
        TextPattern::relation_match(TextPattern::term("fox"), vec![with_source_version]).unwrap();
    assert_matches!(to_cql(&pattern), Err(QueryError::UnsupportedSerialization(_)));
}

#[test]
fn function_calls() {
    let call = TextPattern::function_call(
        "rspan",
        vec![
            FunctionArg::Pattern(seq(vec![TextPattern::term("a"), TextPattern::term("b")])),
            FunctionArg::Str("all".to_string()),
            FunctionArg::Int(3),
        ],
    )
    .unwrap();
    assert_eq!("rspan(a b, 'all', 3)", cql(&call));

    let with_default = TextPattern::function_call(
        "rel",
        vec![
            FunctionArg::Str("nsubj".to_string()),
            FunctionArg::Pattern(TextPattern::default_value()),
        ],
    )
    .unwrap();
    assert_eq!("rel('nsubj', _)", cql(&with_default));
}

#[test]
fn nodes_without_text_form() {
    let a = TextPattern::term("a");
    let unsupported = vec![
        TextPattern::fixed_span(1, 3).unwrap(),
        TextPattern::edge(a.clone(), true),
        TextPattern::filter_ngrams(a.clone(), PositionOperation::Containing, 1, 3).unwrap(),
        TextPattern::settings(a.clone(), BTreeMap::new()),
        TextPattern::doc_version(a, "nl").unwrap(),
    ];
    for pattern in unsupported {
        assert_matches!(
            to_cql(&pattern),
            Err(QueryError::UnsupportedSerialization(_)),
            "{:?}",
            pattern
        );
    }
}

#[test]
fn constrained_captures() {
    let any = || TextPattern::any_token(1, 1).unwrap();
    let pattern = TextPattern::constrained(
        seq(vec![
            TextPattern::capture(any(), "A").unwrap(),
            TextPattern::capture(any(), "B").unwrap(),
        ]),
        MatchFilter::equals(
            MatchFilter::token_annotation("A", "word"),
            MatchFilter::token_annotation("B", "word"),
            None,
        ),
    );
    insta::assert_snapshot!(cql(&pattern), @"A:[] B:[] :: A.word = B.word");

    let filter = MatchFilter::equals(
        MatchFilter::token_annotation("A", "word"),
        MatchFilter::string("x"),
        None,
    );
    let within_constraint = TextPattern::constrained(
        TextPattern::position_filter(
            TextPattern::capture(any(), "A").unwrap(),
            TextPattern::tags("s", no_attributes(), TagAdjust::FullTag, None).unwrap(),
            PositionOperation::Within,
            false,
        ),
        filter.clone(),
    );
    assert_eq!("A:[] within <s/> :: A.word = 'x'", cql(&within_constraint));

    let nested = TextPattern::capture(TextPattern::constrained(any(), filter), "C").unwrap();
    assert_eq!("C:([] :: A.word = 'x')", cql(&nested));
}

#[test]
fn filter_precedence() {
    let x = || MatchFilter::function_call("f", "A");
    let y = || MatchFilter::function_call("g", "B");
    let z = || MatchFilter::string("z");

    let and_of_or = MatchFilter::and(MatchFilter::or(x(), y()), z());
    assert_eq!("(f(A) | g(B)) & 'z'", filter_to_cql(&and_of_or).unwrap());

    let or_of_and = MatchFilter::or(MatchFilter::and(x(), y()), z());
    assert_eq!("f(A) & g(B) | 'z'", filter_to_cql(&or_of_and).unwrap());

    let right_nested = MatchFilter::or(x(), MatchFilter::or(y(), z()));
    assert_eq!("f(A) | (g(B) | 'z')", filter_to_cql(&right_nested).unwrap());

    let implication = MatchFilter::implication(MatchFilter::or(x(), y()), z());
    assert_eq!("f(A) | g(B) -> 'z'", filter_to_cql(&implication).unwrap());

    let not_equals = MatchFilter::not(MatchFilter::equals(
        MatchFilter::token_annotation("A", "word"),
        MatchFilter::token_annotation("B", "word"),
        None,
    ));
    assert_eq!("!(A.word = B.word)", filter_to_cql(&not_equals).unwrap());

    let compare = MatchFilter::compare(
        MatchFilter::token_annotation("A", "pos"),
        MatchFilter::string("N"),
        CompareOperator::NotEqual,
        Some(MatchSensitivity::Sensitive),
    );
    assert_eq!("A.pos != 'N'", filter_to_cql(&compare).unwrap());
    assert_eq!("!f(A)", filter_to_cql(&MatchFilter::not(x())).unwrap());
}

#[test]
fn filters_without_text_form() {
    let same = MatchFilter::same_tokens("A", "B", "lemma", None);
    assert_matches!(
        filter_to_cql(&same),
        Err(QueryError::UnsupportedSerialization(_))
    );
    let equals_string = MatchFilter::token_annotation_equals("A", "word", "x", None);
    assert_matches!(
        filter_to_cql(&equals_string),
        Err(QueryError::UnsupportedSerialization(_))
    );
}
