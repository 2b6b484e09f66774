use assert_matches::assert_matches;
use corpusql::errors::QueryError;
use corpusql::matchfilter::MatchFilter;
use corpusql::serializer::{from_json_str, to_cql, to_json_string};
use corpusql::textpattern::{RelationOperatorInfo, RelationTarget, TextPattern};
use corpusql::{SpanMode, TagAdjust};
use pretty_assertions::assert_eq;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct SavedQuery {
    name: String,
    pattern: TextPattern,
    #[serde(default)]
    filter: Option<MatchFilter>,
}

fn subject_of_run() -> TextPattern {
    TextPattern::relation_match(
        TextPattern::term("run"),
        vec![RelationTarget::new(
            RelationOperatorInfo::of_type("nsubj"),
            TextPattern::term("dog"),
            SpanMode::Source,
            None,
        )
        .unwrap()],
    )
    .unwrap()
}

fn equal_neighbours() -> TextPattern {
    TextPattern::constrained(
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
    )
}

#[test]
fn query_texts() {
    let gap = TextPattern::sequence(vec![
        TextPattern::term("the"),
        TextPattern::repetition(TextPattern::any_token(1, 1).unwrap(), 0, 2).unwrap(),
        TextPattern::regex("fo.*"),
    ])
    .unwrap();
    assert_eq!("the []{0,2} fo.*", to_cql(&gap).unwrap());
    assert_eq!("run -nsubj-> dog", to_cql(&subject_of_run()).unwrap());
    assert_eq!(
        "A:[] B:[] :: A.word = B.word",
        to_cql(&equal_neighbours()).unwrap()
    );
}

#[test]
fn json_strings_round_trip() {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        "type".to_string(),
        corpusql::textpattern::MatchValue::Regex("q.*".to_string()),
    );
    let patterns = vec![
        subject_of_run(),
        equal_neighbours(),
        TextPattern::position_filter(
            TextPattern::term_with("be", Some("lemma"), None),
            TextPattern::tags("s", attributes, TagAdjust::FullTag, Some("S")).unwrap(),
            corpusql::PositionOperation::Within,
            false,
        ),
    ];
    for pattern in patterns {
        let json = to_json_string(&pattern).unwrap();
        assert_eq!(pattern, from_json_str(&json).unwrap(), "{}", json);
    }
}

#[test]
fn relation_match_from_json() {
    let json = r#"{
        "type": "relmatch",
        "parent": {"type": "term", "value": "run"},
        "children": [
            {"type": "reltarget", "relType": "nsubj", "clause": {"type": "term", "value": "dog"}}
        ]
    }"#;
    let pattern = from_json_str(json).unwrap();
    assert_eq!(subject_of_run(), pattern);
    assert_matches!(&pattern, TextPattern::RelationMatch(m) => {
        assert_eq!(&TextPattern::term("run"), m.parent());
        assert_eq!(1, m.children().len());
        assert_eq!("nsubj", m.children()[0].operator_info().type_regex());
        assert_eq!(SpanMode::Source, m.children()[0].span_mode());
    });
}

#[test]
fn patterns_inside_other_documents() {
    let saved = SavedQuery {
        name: "neighbours".to_string(),
        pattern: equal_neighbours(),
        filter: Some(MatchFilter::token_annotation_equals("A", "pos", "NOUN", None)),
    };
    let json = serde_json::to_string_pretty(&saved).unwrap();
    let read: SavedQuery = serde_json::from_str(&json).unwrap();
    assert_eq!(saved, read);

    let value = serde_json::to_value(&saved).unwrap();
    assert_eq!("constrained", value["pattern"]["type"]);
    assert_eq!("mf-token-annotation-string", value["filter"]["type"]);
}

#[test]
fn invalid_documents() {
    assert_matches!(from_json_str("{\"type\": "), Err(QueryError::Json(_)));
    assert_matches!(
        from_json_str(r#"{"type": "wildcard", "value": "a*"}"#),
        Err(QueryError::InvalidJson(_))
    );

    let nested = r#"{"name": "x", "pattern": {"type": "fuzzy", "value": "a"}}"#;
    let error = serde_json::from_str::<SavedQuery>(nested).unwrap_err();
    assert!(error.to_string().contains("deprecated"), "{}", error);

    let bad_bounds = r#"{"name": "x", "pattern": {"type": "anytoken", "min": 3, "max": 1}}"#;
    assert!(serde_json::from_str::<SavedQuery>(bad_bounds).is_err());
}
