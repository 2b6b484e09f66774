//! The span query plan produced by translation and executed by an index engine.
//!
//! Field names in the plan are index field names as produced by
//! [`annotation_field`](corpusql_core::util::fieldname::annotation_field)
//! (e.g. `contents%word@i`), except where a node only needs the token
//! stream of an annotated field (e.g. `contents`).

use crate::matchfilter::ConstraintExpr;
use crate::textpattern::MatchValue;
use corpusql_core::types::{
    ExpansionDirection, PositionOperation, RelationDirection, SpanMode, TagAdjust, UNLIMITED,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpanQuery {
    /// Tokens with exactly this (desensitized) value
    Term { field: String, value: String },
    /// Tokens whose (desensitized) value fully matches the pattern
    Regex { field: String, pattern: String },
    /// All spans of `min..=max` tokens of an annotated field
    AnyToken { field: String, min: u32, max: u32 },
    /// Spans matched by every clause
    And(Vec<SpanQuery>),
    /// Like `And`, but each clause must match a different relation
    RelationAnd(Vec<SpanQuery>),
    Or(Vec<SpanQuery>),
    /// Single tokens not matched by the clause
    Not { field: String, clause: Box<SpanQuery> },
    Sequence(Vec<SpanQuery>),
    /// `min..=max` adjacent clause matches; with `min == 0` the empty span at
    /// every position of `field` matches too
    Repetition {
        field: String,
        clause: Box<SpanQuery>,
        min: u32,
        max: u32,
    },
    Expansion {
        field: String,
        clause: Box<SpanQuery>,
        direction: ExpansionDirection,
        min: u32,
        max: u32,
    },
    PositionFilter {
        producer: Box<SpanQuery>,
        filter: Box<SpanQuery>,
        operation: PositionOperation,
        invert: bool,
        adjust_leading: i32,
        adjust_trailing: i32,
    },
    /// N-grams of `min..=max` tokens standing in a position relation to a clause match
    FilterNGrams {
        field: String,
        clause: Box<SpanQuery>,
        operation: PositionOperation,
        min: u32,
        max: u32,
    },
    CaptureGroup { clause: Box<SpanQuery>, name: String },
    Edge { clause: Box<SpanQuery>, trailing: bool },
    FixedSpan { field: String, start: u32, end: u32 },
    /// Markup spans (stored as relations of the inline tag class)
    Tags {
        relations_field: String,
        type_regex: String,
        attributes: BTreeMap<String, MatchValue>,
        adjust: TagAdjust,
        capture_as: String,
    },
    Relations {
        relations_field: String,
        type_regex: String,
        direction: RelationDirection,
        span_mode: SpanMode,
        capture_as: String,
    },
    /// Change the span of hits to the source, target or full span of their relations
    RelationSpanAdjust {
        clause: Box<SpanQuery>,
        span_mode: SpanMode,
    },
    /// Capture all relations from a source hit to matches of the targets
    CaptureRelationsBetweenSpans {
        source: Box<SpanQuery>,
        targets: Vec<AlignmentTarget>,
    },
    /// Capture all relations inside a hit, or inside one of its captures
    CaptureRelationsWithinSpan {
        clause: Box<SpanQuery>,
        within_capture: Option<String>,
        relations_field: String,
        type_regex: String,
        capture_as: String,
    },
    Constrained {
        clause: Box<SpanQuery>,
        constraint: ConstraintExpr,
        forward_index: ForwardIndexRequest,
    },
}

/// Target of an alignment operator in another version of the document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AlignmentTarget {
    pub relations_field: String,
    pub type_regex: String,
    pub target: Box<SpanQuery>,
    /// Annotated field of the target version, e.g. `contents__nl`
    pub target_field: String,
    pub capture_as: String,
    /// Keep source hits without any matching relation
    pub optional: bool,
}

/// The forward index annotations a constraint needs to be evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ForwardIndexRequest {
    pub field: String,
    pub annotations: BTreeSet<String>,
}

impl SpanQuery {
    pub fn any_ngram(field: &str) -> SpanQuery {
        SpanQuery::AnyToken {
            field: field.to_string(),
            min: 0,
            max: UNLIMITED,
        }
    }

    pub fn is_any_ngram(&self) -> bool {
        matches!(self, SpanQuery::AnyToken { min: 0, max, .. } if *max == UNLIMITED)
    }

    /// Names of all captures a hit of this plan can have.
    pub fn capture_names(&self) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.collect_capture_names(&mut result);
        result
    }

    fn collect_capture_names(&self, result: &mut BTreeSet<String>) {
        match self {
            SpanQuery::Term { .. }
            | SpanQuery::Regex { .. }
            | SpanQuery::AnyToken { .. }
            | SpanQuery::FixedSpan { .. } => {}
            SpanQuery::And(clauses)
            | SpanQuery::RelationAnd(clauses)
            | SpanQuery::Or(clauses)
            | SpanQuery::Sequence(clauses) => {
                for c in clauses {
                    c.collect_capture_names(result);
                }
            }
            // negated clauses never contribute captures
            SpanQuery::Not { .. } => {}
            SpanQuery::Repetition { clause, .. }
            | SpanQuery::Expansion { clause, .. }
            | SpanQuery::FilterNGrams { clause, .. }
            | SpanQuery::Edge { clause, .. }
            | SpanQuery::RelationSpanAdjust { clause, .. }
            | SpanQuery::Constrained { clause, .. } => clause.collect_capture_names(result),
            SpanQuery::PositionFilter {
                producer,
                filter,
                invert,
                ..
            } => {
                producer.collect_capture_names(result);
                if !invert {
                    filter.collect_capture_names(result);
                }
            }
            SpanQuery::CaptureGroup { clause, name } => {
                result.insert(name.clone());
                clause.collect_capture_names(result);
            }
            SpanQuery::Tags { capture_as, .. } | SpanQuery::Relations { capture_as, .. } => {
                result.insert(capture_as.clone());
            }
            SpanQuery::CaptureRelationsBetweenSpans { source, targets } => {
                source.collect_capture_names(result);
                for t in targets {
                    result.insert(t.capture_as.clone());
                    t.target.collect_capture_names(result);
                }
            }
            SpanQuery::CaptureRelationsWithinSpan {
                clause, capture_as, ..
            } => {
                result.insert(capture_as.clone());
                clause.collect_capture_names(result);
            }
        }
    }
}

fn fmt_max(max: u32) -> String {
    if max == UNLIMITED {
        "INF".to_string()
    } else {
        max.to_string()
    }
}

fn fmt_operation(operation: PositionOperation, invert: bool) -> String {
    let code = operation.code().to_uppercase();
    if invert {
        format!("NOT{}", code)
    } else {
        code
    }
}

impl fmt::Display for MatchValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchValue::Regex(regex) => write!(f, "{}", regex),
            MatchValue::IntRange { min, max } => write!(f, "[{}..{}]", min, max),
        }
    }
}

impl fmt::Display for SpanQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpanQuery::Term { field, value } => write!(f, "TERM({}, {})", field, value),
            SpanQuery::Regex { field, pattern } => write!(f, "REGEX({}, {})", field, pattern),
            SpanQuery::AnyToken { min, max, .. } => {
                write!(f, "ANYTOKEN({}, {})", min, fmt_max(*max))
            }
            SpanQuery::And(clauses) => write!(f, "AND({})", clauses.iter().join(", ")),
            SpanQuery::RelationAnd(clauses) => write!(f, "RAND({})", clauses.iter().join(", ")),
            SpanQuery::Or(clauses) => write!(f, "OR({})", clauses.iter().join(", ")),
            SpanQuery::Not { clause, .. } => write!(f, "NOT({})", clause),
            SpanQuery::Sequence(clauses) => write!(f, "SEQ({})", clauses.iter().join(", ")),
            SpanQuery::Repetition {
                clause, min, max, ..
            } => {
                write!(f, "REP({}, {}, {})", clause, min, fmt_max(*max))
            }
            SpanQuery::Expansion {
                clause,
                direction,
                min,
                max,
                ..
            } => write!(
                f,
                "EXPAND({}, {}, {}, {})",
                clause,
                direction,
                min,
                fmt_max(*max)
            ),
            SpanQuery::PositionFilter {
                producer,
                filter,
                operation,
                invert,
                adjust_leading,
                adjust_trailing,
            } => {
                write!(
                    f,
                    "POSFILTER({}, {}, {}",
                    producer,
                    filter,
                    fmt_operation(*operation, *invert)
                )?;
                if *adjust_leading != 0 || *adjust_trailing != 0 {
                    write!(f, ", {}, {}", adjust_leading, adjust_trailing)?;
                }
                write!(f, ")")
            }
            SpanQuery::FilterNGrams {
                clause,
                operation,
                min,
                max,
                ..
            } => write!(
                f,
                "FILTERNGRAMS({}, {}, {}, {})",
                clause,
                fmt_operation(*operation, false),
                min,
                fmt_max(*max)
            ),
            SpanQuery::CaptureGroup { clause, name } => write!(f, "CAPTURE({}, {})", clause, name),
            SpanQuery::Edge { clause, trailing } => write!(
                f,
                "EDGE({}, {})",
                clause,
                if *trailing { "TRAILING" } else { "LEADING" }
            ),
            SpanQuery::FixedSpan { start, end, .. } => write!(f, "FIXEDSPAN({}, {})", start, end),
            SpanQuery::Tags {
                relations_field,
                type_regex,
                attributes,
                adjust,
                capture_as,
            } => {
                write!(f, "TAGS({}, {}", relations_field, type_regex)?;
                if !attributes.is_empty() {
                    let attributes = attributes
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .join(", ");
                    write!(f, ", {{{}}}", attributes)?;
                }
                write!(f, ", {}, {})", adjust, capture_as)
            }
            SpanQuery::Relations {
                relations_field,
                type_regex,
                direction,
                span_mode,
                capture_as,
            } => write!(
                f,
                "REL({}, {}, {}, {}, {})",
                relations_field, type_regex, direction, span_mode, capture_as
            ),
            SpanQuery::RelationSpanAdjust { clause, span_mode } => {
                write!(f, "RSPAN({}, {})", clause, span_mode)
            }
            SpanQuery::CaptureRelationsBetweenSpans { source, targets } => {
                let targets = targets
                    .iter()
                    .map(|t| {
                        format!(
                            "{}: {} -> {}{}",
                            t.capture_as,
                            t.type_regex,
                            t.target,
                            if t.optional { " (optional)" } else { "" }
                        )
                    })
                    .join(", ");
                write!(f, "RCAPALIGN({}, [{}])", source, targets)
            }
            SpanQuery::CaptureRelationsWithinSpan {
                clause,
                within_capture,
                type_regex,
                capture_as,
                ..
            } => match within_capture {
                Some(within) => write!(
                    f,
                    "RCAPWITHIN({}, {}, {}, {})",
                    clause, within, type_regex, capture_as
                ),
                None => write!(f, "RCAPWITHIN({}, {}, {})", clause, type_regex, capture_as),
            },
            SpanQuery::Constrained {
                clause, constraint, ..
            } => write!(f, "CONSTRAINED({}, {})", clause, constraint),
        }
    }
}
