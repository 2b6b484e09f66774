//! A positional index held in memory that evaluates plans by brute force.
//!
//! Meant for tests and very small corpora: every node is evaluated for a
//! whole document at once.

use super::{DocId, ForwardIndexAccessor, MatchInfo, RelationInfo, SpanIndex, SpanMatch};
use crate::errors::{QueryError, Result};
use crate::extensions::QueryExtensions;
use crate::matchfilter::MatchContext;
use crate::plan::{AlignmentTarget, SpanQuery};
use crate::textpattern::MatchValue;
use corpusql_core::{
    types::{ExpansionDirection, MatchSensitivity, RelationDirection, SpanMode, TagAdjust},
    util::{
        compile_full_match,
        fieldname::{ANNOT_SEPARATOR, CLASS_INLINE_TAG, CLASS_TYPE_SEPARATOR, SENSITIVITY_SEPARATOR},
    },
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct StoredTag {
    name: String,
    start: u32,
    end: u32,
    attributes: BTreeMap<String, String>,
}

/// Tokens, relations and markup of one annotated field of a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryField {
    tokens: Vec<BTreeMap<String, String>>,
    relations: Vec<RelationInfo>,
    tags: Vec<StoredTag>,
}

impl MemoryField {
    /// Create a field with one token per value of the `word` annotation.
    pub fn from_words(words: &[&str]) -> MemoryField {
        MemoryField::default().with_annotation("word", words)
    }

    /// Set the values of an annotation, one per token.
    pub fn with_annotation(mut self, annotation: &str, values: &[&str]) -> MemoryField {
        if self.tokens.len() < values.len() {
            self.tokens.resize_with(values.len(), BTreeMap::new);
        }
        for (token, value) in self.tokens.iter_mut().zip(values.iter()) {
            token.insert(annotation.to_string(), value.to_string());
        }
        self
    }

    /// Add a relation with its full type (e.g. `dep::nsubj`) from the source
    /// span to the target span.
    pub fn with_relation(mut self, full_type: &str, source: (u32, u32), target: (u32, u32)) -> MemoryField {
        self.relations.push(RelationInfo {
            full_type: full_type.to_string(),
            source_start: source.0,
            source_end: source.1,
            target_start: target.0,
            target_end: target.1,
        });
        self
    }

    /// Add a relation without a source (e.g. the root of a dependency tree).
    pub fn with_root_relation(self, full_type: &str, target: (u32, u32)) -> MemoryField {
        self.with_relation(full_type, (target.0, target.0), target)
    }

    pub fn with_tag(mut self, name: &str, start: u32, end: u32, attributes: &[(&str, &str)]) -> MemoryField {
        self.tags.push(StoredTag {
            name: name.to_string(),
            start,
            end,
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    pub fn len(&self) -> u32 {
        self.tokens.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A document with one or more annotated fields (e.g. `contents` and its
/// parallel version `contents__nl`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryDocument {
    fields: BTreeMap<String, MemoryField>,
}

impl MemoryDocument {
    pub fn new() -> MemoryDocument {
        MemoryDocument::default()
    }

    pub fn with_field(mut self, name: &str, field: MemoryField) -> MemoryDocument {
        self.fields.insert(name.to_string(), field);
        self
    }
}

#[derive(Clone, Default)]
pub struct MemoryIndex {
    documents: Vec<MemoryDocument>,
    extensions: QueryExtensions,
}

impl MemoryIndex {
    pub fn new() -> MemoryIndex {
        MemoryIndex::default()
    }

    /// Add a document; its id is its position in the index.
    pub fn with_document(mut self, document: MemoryDocument) -> MemoryIndex {
        self.documents.push(document);
        self
    }

    /// Use these extensions to evaluate filter functions in constraints.
    pub fn with_extensions(mut self, extensions: QueryExtensions) -> MemoryIndex {
        self.extensions = extensions;
        self
    }
}

impl ForwardIndexAccessor for MemoryIndex {
    fn token_value(
        &self,
        doc: DocId,
        field: &str,
        annotation: &str,
        position: u32,
    ) -> Option<String> {
        self.documents
            .get(doc as usize)?
            .fields
            .get(field)?
            .tokens
            .get(position as usize)?
            .get(annotation)
            .cloned()
    }
}

impl SpanIndex for MemoryIndex {
    fn find_spans<'a>(
        &'a self,
        plan: &'a SpanQuery,
        field: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<SpanMatch>> + 'a>> {
        let field = field.to_string();
        let it = self
            .documents
            .iter()
            .enumerate()
            .filter_map(move |(doc_id, doc)| {
                doc.fields.get(&field)?;
                let evaluator = DocEvaluator {
                    index: self,
                    doc_id: doc_id as DocId,
                    doc,
                };
                let matches: Vec<Result<SpanMatch>> = match evaluator.eval(plan) {
                    Ok(hits) => hits
                        .into_iter()
                        .map(|h| {
                            Ok(SpanMatch {
                                doc: doc_id as DocId,
                                start: h.start,
                                end: h.end,
                                captures: h.captures,
                            })
                        })
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                Some(matches)
            })
            .flatten();
        Ok(Box::new(it))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Hit {
    start: u32,
    end: u32,
    captures: BTreeMap<String, MatchInfo>,
    /// Relations matched for this hit, in clause order
    relations: Vec<RelationInfo>,
}

impl Hit {
    fn span(start: u32, end: u32) -> Hit {
        Hit {
            start,
            end,
            captures: BTreeMap::new(),
            relations: Vec::new(),
        }
    }

    fn with_span(&self, start: u32, end: u32) -> Hit {
        Hit {
            start,
            end,
            captures: self.captures.clone(),
            relations: self.relations.clone(),
        }
    }

    fn merged(&self, other: &Hit, start: u32, end: u32) -> Hit {
        let mut result = self.with_span(start, end);
        result
            .captures
            .extend(other.captures.iter().map(|(k, v)| (k.clone(), v.clone())));
        result.relations.extend(other.relations.iter().cloned());
        result
    }

    fn bounds(&self) -> (u32, u32) {
        (self.start, self.end)
    }
}

fn sorted(mut hits: Vec<Hit>) -> Vec<Hit> {
    hits.sort();
    hits.dedup();
    hits
}

/// Split an index field name like `contents%word@i`.
fn split_index_field(name: &str) -> Result<(&str, &str, MatchSensitivity)> {
    let malformed = || QueryError::InvalidQuery(format!("malformed index field name '{}'", name));
    let (field, rest) = name.split_once(ANNOT_SEPARATOR).ok_or_else(malformed)?;
    let (annotation, sensitivity) = rest.rsplit_once(SENSITIVITY_SEPARATOR).ok_or_else(malformed)?;
    Ok((field, annotation, MatchSensitivity::from_code(sensitivity)?))
}

fn direction_matches(relation: &RelationInfo, direction: RelationDirection) -> bool {
    match direction {
        RelationDirection::Root => relation.is_root(),
        RelationDirection::Forward => {
            !relation.is_root() && relation.target_start >= relation.source_start
        }
        RelationDirection::Backward => {
            !relation.is_root() && relation.target_start < relation.source_start
        }
        RelationDirection::Both => !relation.is_root(),
    }
}

fn relation_span(relation: &RelationInfo, span_mode: SpanMode) -> (u32, u32) {
    match span_mode {
        SpanMode::Source => (relation.source_start, relation.source_end),
        SpanMode::Target => (relation.target_start, relation.target_end),
        SpanMode::FullSpan | SpanMode::AllSpans => relation.full_span(),
    }
}

fn attribute_matches(value: Option<&String>, expected: &MatchValue) -> Result<bool> {
    let value = match value {
        Some(v) => v,
        None => return Ok(false),
    };
    Ok(match expected {
        MatchValue::Regex(regex) => compile_full_match(regex)?.is_match(value),
        MatchValue::IntRange { min, max } => value
            .trim()
            .parse::<i64>()
            .map(|v| *min <= v && v <= *max)
            .unwrap_or(false),
    })
}

struct DocEvaluator<'i> {
    index: &'i MemoryIndex,
    doc_id: DocId,
    doc: &'i MemoryDocument,
}

impl<'i> DocEvaluator<'i> {
    fn field(&self, name: &str) -> Option<&'i MemoryField> {
        self.doc.fields.get(name)
    }

    fn field_length(&self, name: &str) -> u32 {
        self.field(name).map(|f| f.len()).unwrap_or(0)
    }

    /// All spans of `min..=max` tokens in a field of the given length.
    fn ngrams(length: u32, min: u32, max: u32) -> Vec<Hit> {
        let mut result = Vec::new();
        for start in 0..=length {
            let upper = max.min(length - start);
            if min > upper {
                continue;
            }
            for n in min..=upper {
                result.push(Hit::span(start, start + n));
            }
        }
        result
    }

    fn token_hits<F>(&self, index_field: &str, matches: F) -> Result<Vec<Hit>>
    where
        F: Fn(&str) -> bool,
    {
        let (field, annotation, sensitivity) = split_index_field(index_field)?;
        let mut result = Vec::new();
        if let Some(field) = self.field(field) {
            for (position, token) in field.tokens.iter().enumerate() {
                if let Some(value) = token.get(annotation) {
                    if matches(&sensitivity.desensitize(value)) {
                        result.push(Hit::span(position as u32, position as u32 + 1));
                    }
                }
            }
        }
        Ok(result)
    }

    fn relations_field(&self, relations_field: &str) -> Result<Option<&'i MemoryField>> {
        let (field, _, _) = split_index_field(relations_field)?;
        Ok(self.field(field))
    }

    /// Combine hits with identical spans from all clauses.
    fn intersect(&self, clauses: &[SpanQuery], unique_relations: bool) -> Result<Vec<Hit>> {
        let mut iter = clauses.iter();
        let mut result = match iter.next() {
            Some(first) => self.eval(first)?,
            None => return Ok(Vec::new()),
        };
        for clause in iter {
            let hits = self.eval(clause)?;
            let mut combined = Vec::new();
            for a in result.iter() {
                for b in hits.iter().filter(|b| b.bounds() == a.bounds()) {
                    if unique_relations && b.relations.iter().any(|r| a.relations.contains(r)) {
                        continue;
                    }
                    combined.push(a.merged(b, a.start, a.end));
                }
            }
            result = sorted(combined);
        }
        Ok(result)
    }

    /// Concatenate adjacent hits.
    fn concat(left: &[Hit], right: &[Hit]) -> Vec<Hit> {
        let mut result = Vec::new();
        for a in left {
            for b in right.iter().filter(|b| b.start == a.end) {
                result.push(a.merged(b, a.start, b.end));
            }
        }
        sorted(result)
    }

    fn eval(&self, query: &SpanQuery) -> Result<Vec<Hit>> {
        let result = match query {
            SpanQuery::Term { field, value } => self.token_hits(field, |v| v == value)?,
            SpanQuery::Regex { field, pattern } => {
                let regex = compile_full_match(pattern)?;
                self.token_hits(field, |v| regex.is_match(v))?
            }
            SpanQuery::AnyToken { field, min, max } => {
                DocEvaluator::ngrams(self.field_length(field), *min, *max)
            }
            SpanQuery::And(clauses) => self.intersect(clauses, false)?,
            SpanQuery::RelationAnd(clauses) => self.intersect(clauses, true)?,
            SpanQuery::Or(clauses) => {
                let mut result = Vec::new();
                for c in clauses {
                    result.extend(self.eval(c)?);
                }
                result
            }
            SpanQuery::Not { field, clause } => {
                let excluded: BTreeSet<(u32, u32)> =
                    self.eval(clause)?.iter().map(Hit::bounds).collect();
                (0..self.field_length(field))
                    .filter(|p| !excluded.contains(&(*p, p + 1)))
                    .map(|p| Hit::span(p, p + 1))
                    .collect()
            }
            SpanQuery::Sequence(clauses) => {
                let mut iter = clauses.iter();
                let mut result = match iter.next() {
                    Some(first) => self.eval(first)?,
                    None => Vec::new(),
                };
                for c in iter {
                    result = DocEvaluator::concat(&result, &self.eval(c)?);
                }
                result
            }
            SpanQuery::Repetition {
                field,
                clause,
                min,
                max,
            } => {
                let hits = self.eval(clause)?;
                let length = self.field_length(field);
                let mut result = Vec::new();
                if *min == 0 {
                    result.extend((0..=length).map(|p| Hit::span(p, p)));
                }
                let mut current = hits.clone();
                let limit = (*max).min(length.saturating_add(1));
                let mut n = 1;
                while n <= limit && !current.is_empty() {
                    if n >= *min {
                        result.extend(current.iter().cloned());
                    }
                    current = DocEvaluator::concat(&current, &hits);
                    n += 1;
                }
                result
            }
            SpanQuery::Expansion {
                field,
                clause,
                direction,
                min,
                max,
            } => {
                let length = self.field_length(field);
                let mut result = Vec::new();
                for h in self.eval(clause)? {
                    match direction {
                        ExpansionDirection::Left => {
                            let upper = (*max).min(h.start);
                            if *min <= upper {
                                for n in *min..=upper {
                                    result.push(h.with_span(h.start - n, h.end));
                                }
                            }
                        }
                        ExpansionDirection::Right => {
                            let upper = (*max).min(length.saturating_sub(h.end));
                            if *min <= upper {
                                for n in *min..=upper {
                                    result.push(h.with_span(h.start, h.end + n));
                                }
                            }
                        }
                    }
                }
                result
            }
            SpanQuery::PositionFilter {
                producer,
                filter,
                operation,
                invert,
                adjust_leading,
                adjust_trailing,
            } => {
                let filter_hits = self.eval(filter)?;
                let mut result = Vec::new();
                for p in self.eval(producer)? {
                    let adjusted = (
                        (i64::from(p.start) + i64::from(*adjust_leading)).max(0) as u32,
                        (i64::from(p.end) + i64::from(*adjust_trailing)).max(0) as u32,
                    );
                    let found = filter_hits
                        .iter()
                        .find(|f| operation.holds(adjusted, f.bounds()));
                    match (found, invert) {
                        (None, true) => result.push(p),
                        (Some(f), false) => {
                            let mut kept = p.clone();
                            kept.captures
                                .extend(f.captures.iter().map(|(k, v)| (k.clone(), v.clone())));
                            result.push(kept);
                        }
                        _ => {}
                    }
                }
                result
            }
            SpanQuery::FilterNGrams {
                field,
                clause,
                operation,
                min,
                max,
            } => {
                let hits = self.eval(clause)?;
                DocEvaluator::ngrams(self.field_length(field), *min, *max)
                    .into_iter()
                    .filter(|n| hits.iter().any(|h| operation.holds(n.bounds(), h.bounds())))
                    .collect()
            }
            SpanQuery::CaptureGroup { clause, name } => self
                .eval(clause)?
                .into_iter()
                .map(|mut h| {
                    h.captures.insert(
                        name.clone(),
                        MatchInfo::Span {
                            start: h.start,
                            end: h.end,
                        },
                    );
                    h
                })
                .collect(),
            SpanQuery::Edge { clause, trailing } => self
                .eval(clause)?
                .into_iter()
                .map(|h| {
                    let edge = if *trailing { h.end } else { h.start };
                    h.with_span(edge, edge)
                })
                .collect(),
            SpanQuery::FixedSpan { field, start, end } => {
                if *end <= self.field_length(field) {
                    vec![Hit::span(*start, *end)]
                } else {
                    Vec::new()
                }
            }
            SpanQuery::Tags {
                relations_field,
                type_regex,
                attributes,
                adjust,
                capture_as,
            } => self.eval_tags(relations_field, type_regex, attributes, *adjust, capture_as)?,
            SpanQuery::Relations {
                relations_field,
                type_regex,
                direction,
                span_mode,
                capture_as,
            } => {
                let regex = compile_full_match(type_regex)?;
                let mut result = Vec::new();
                if let Some(field) = self.relations_field(relations_field)? {
                    for r in field.relations.iter() {
                        if regex.is_match(&r.full_type) && direction_matches(r, *direction) {
                            let (start, end) = relation_span(r, *span_mode);
                            let mut hit = Hit::span(start, end);
                            hit.captures
                                .insert(capture_as.clone(), MatchInfo::Relation(r.clone()));
                            hit.relations.push(r.clone());
                            result.push(hit);
                        }
                    }
                }
                result
            }
            SpanQuery::RelationSpanAdjust { clause, span_mode } => self
                .eval(clause)?
                .into_iter()
                .map(|h| {
                    let (start, end) = match (h.relations.first(), span_mode) {
                        (None, _) => h.bounds(),
                        (Some(_), SpanMode::AllSpans) => h
                            .relations
                            .iter()
                            .map(RelationInfo::full_span)
                            .fold(h.bounds(), |(s, e), (rs, re)| (s.min(rs), e.max(re))),
                        (Some(first), mode) => relation_span(first, *mode),
                    };
                    h.with_span(start, end)
                })
                .collect(),
            SpanQuery::CaptureRelationsBetweenSpans { source, targets } => {
                let mut result = self.eval(source)?;
                for target in targets {
                    result = self.capture_alignment(result, target)?;
                }
                result
            }
            SpanQuery::CaptureRelationsWithinSpan {
                clause,
                within_capture,
                relations_field,
                type_regex,
                capture_as,
            } => {
                let regex = compile_full_match(type_regex)?;
                let field = self.relations_field(relations_field)?;
                let mut result = Vec::new();
                for mut h in self.eval(clause)? {
                    let (start, end) = match within_capture {
                        Some(c) => h.captures.get(c).map(MatchInfo::span).unwrap_or((0, 0)),
                        None => h.bounds(),
                    };
                    let captured: Vec<RelationInfo> = field
                        .map(|f| f.relations.as_slice())
                        .unwrap_or(&[])
                        .iter()
                        .filter(|r| {
                            regex.is_match(&r.full_type)
                                && r.source_start >= start
                                && r.source_end <= end
                                && r.target_start >= start
                                && r.target_end <= end
                        })
                        .cloned()
                        .collect();
                    h.captures
                        .insert(capture_as.clone(), MatchInfo::RelationList(captured));
                    result.push(h);
                }
                result
            }
            SpanQuery::Constrained {
                clause,
                constraint,
                forward_index,
            } => self
                .eval(clause)?
                .into_iter()
                .filter(|h| {
                    let ctx = MatchContext {
                        doc: self.doc_id,
                        captures: &h.captures,
                        forward_index: self.index,
                        field: &forward_index.field,
                        extensions: &self.index.extensions,
                    };
                    constraint.matches(&ctx)
                })
                .collect(),
        };
        Ok(sorted(result))
    }

    fn eval_tags(
        &self,
        relations_field: &str,
        type_regex: &str,
        attributes: &BTreeMap<String, MatchValue>,
        adjust: TagAdjust,
        capture_as: &str,
    ) -> Result<Vec<Hit>> {
        let regex = compile_full_match(type_regex)?;
        let mut result = Vec::new();
        let field = match self.relations_field(relations_field)? {
            Some(field) => field,
            None => return Ok(result),
        };
        for tag in field.tags.iter() {
            let full_type = format!("{}{}{}", CLASS_INLINE_TAG, CLASS_TYPE_SEPARATOR, tag.name);
            if !regex.is_match(&full_type) {
                continue;
            }
            let mut all_match = true;
            for (name, expected) in attributes.iter() {
                if !attribute_matches(tag.attributes.get(name), expected)? {
                    all_match = false;
                    break;
                }
            }
            if !all_match {
                continue;
            }
            let (start, end) = match adjust {
                TagAdjust::FullTag => (tag.start, tag.end),
                TagAdjust::LeadingEdge => (tag.start, tag.start),
                TagAdjust::TrailingEdge => (tag.end, tag.end),
            };
            let mut hit = Hit::span(start, end);
            hit.captures.insert(
                capture_as.to_string(),
                MatchInfo::Span {
                    start: tag.start,
                    end: tag.end,
                },
            );
            result.push(hit);
        }
        Ok(result)
    }

    /// Capture the relations from each source hit to a target hit in another
    /// version of the document.
    fn capture_alignment(&self, sources: Vec<Hit>, target: &AlignmentTarget) -> Result<Vec<Hit>> {
        let regex = compile_full_match(&target.type_regex)?;
        let relations: Vec<&RelationInfo> = match self.relations_field(&target.relations_field)? {
            Some(field) => field
                .relations
                .iter()
                .filter(|r| regex.is_match(&r.full_type))
                .collect(),
            None => Vec::new(),
        };
        let target_hits = self.eval(&target.target)?;
        let mut result = Vec::new();
        for h in sources {
            let aligned: Vec<RelationInfo> = relations
                .iter()
                .filter(|r| r.source_start >= h.start && r.source_end <= h.end)
                .map(|r| (*r).clone())
                .collect();
            let covering = aligned.iter().fold(None, |acc: Option<(u32, u32)>, r| {
                Some(match acc {
                    None => (r.target_start, r.target_end),
                    Some((s, e)) => (s.min(r.target_start), e.max(r.target_end)),
                })
            });
            let found = covering.and_then(|span| target_hits.iter().find(|t| t.bounds() == span));
            match found {
                Some(t) => {
                    let mut kept = h.merged(t, h.start, h.end);
                    kept.captures
                        .insert(target.capture_as.clone(), MatchInfo::RelationList(aligned));
                    result.push(kept);
                }
                None if target.optional => result.push(h),
                None => {}
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusql_core::types::{PositionOperation, UNLIMITED};
    use pretty_assertions::assert_eq;

    fn example() -> MemoryIndex {
        MemoryIndex::new().with_document(
            MemoryDocument::new().with_field(
                "contents",
                MemoryField::from_words(&["The", "quick", "fox", "jumps"])
                    .with_annotation("pos", &["DET", "ADJ", "NOUN", "VERB"])
                    .with_relation("dep::nsubj", (3, 4), (2, 3))
                    .with_relation("dep::amod", (2, 3), (1, 2))
                    .with_root_relation("dep::root", (3, 4))
                    .with_tag("s", 0, 4, &[("id", "1")]),
            ),
        )
    }

    fn spans(index: &MemoryIndex, plan: &SpanQuery) -> Vec<(u32, u32)> {
        index
            .find_spans(plan, "contents")
            .unwrap()
            .map(|m| {
                let m = m.unwrap();
                (m.start, m.end)
            })
            .collect()
    }

    fn word(value: &str) -> SpanQuery {
        SpanQuery::Term {
            field: "contents%word@i".to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn terms_are_desensitized() {
        let index = example();
        assert_eq!(vec![(0, 1)], spans(&index, &word("the")));
        let sensitive = SpanQuery::Term {
            field: "contents%word@s".to_string(),
            value: "the".to_string(),
        };
        assert_eq!(Vec::<(u32, u32)>::new(), spans(&index, &sensitive));
    }

    #[test]
    fn sequence_with_gap() {
        let index = example();
        let plan = SpanQuery::Sequence(vec![
            word("the"),
            SpanQuery::AnyToken {
                field: "contents".to_string(),
                min: 0,
                max: 2,
            },
            SpanQuery::Regex {
                field: "contents%word@i".to_string(),
                pattern: "fo.*".to_string(),
            },
        ]);
        assert_eq!(vec![(0, 3)], spans(&index, &plan));
    }

    #[test]
    fn relations_and_span_modes() {
        let index = example();
        let rel = |span_mode| SpanQuery::Relations {
            relations_field: "contents%_relation@s".to_string(),
            type_regex: "(dep)::(nsubj)".to_string(),
            direction: RelationDirection::Both,
            span_mode,
            capture_as: "nsubj".to_string(),
        };
        assert_eq!(vec![(3, 4)], spans(&index, &rel(SpanMode::Source)));
        assert_eq!(vec![(2, 3)], spans(&index, &rel(SpanMode::Target)));
        assert_eq!(vec![(2, 4)], spans(&index, &rel(SpanMode::FullSpan)));

        let root = SpanQuery::Relations {
            relations_field: "contents%_relation@s".to_string(),
            type_regex: ".*".to_string(),
            direction: RelationDirection::Root,
            span_mode: SpanMode::Target,
            capture_as: "root".to_string(),
        };
        assert_eq!(vec![(3, 4)], spans(&index, &root));
    }

    #[test]
    fn tags_and_position_filter() {
        let index = example();
        let tags = SpanQuery::Tags {
            relations_field: "contents%_relation@s".to_string(),
            type_regex: "(__tag)::(s)".to_string(),
            attributes: BTreeMap::new(),
            adjust: TagAdjust::FullTag,
            capture_as: "s".to_string(),
        };
        assert_eq!(vec![(0, 4)], spans(&index, &tags));
        let within = SpanQuery::PositionFilter {
            producer: Box::new(word("fox")),
            filter: Box::new(tags),
            operation: PositionOperation::Within,
            invert: false,
            adjust_leading: 0,
            adjust_trailing: 0,
        };
        assert_eq!(vec![(2, 3)], spans(&index, &within));
    }

    #[test]
    fn negation_and_repetition() {
        let index = example();
        let not_the = SpanQuery::Not {
            field: "contents".to_string(),
            clause: Box::new(word("the")),
        };
        assert_eq!(vec![(1, 2), (2, 3), (3, 4)], spans(&index, &not_the));
        let rep = SpanQuery::Repetition {
            field: "contents".to_string(),
            clause: Box::new(not_the),
            min: 2,
            max: UNLIMITED,
        };
        assert_eq!(vec![(1, 3), (1, 4), (2, 4)], spans(&index, &rep));
    }

    #[test]
    fn optional_repetition_in_a_shorter_parallel_field() {
        let index = MemoryIndex::new().with_document(
            MemoryDocument::new()
                .with_field("contents", MemoryField::from_words(&["The", "quick", "fox", "jumps"]))
                .with_field("contents__nl", MemoryField::from_words(&["De", "vos"])),
        );
        let optional_fox = SpanQuery::Repetition {
            field: "contents__nl".to_string(),
            clause: Box::new(SpanQuery::Term {
                field: "contents__nl%word@i".to_string(),
                value: "vos".to_string(),
            }),
            min: 0,
            max: 1,
        };
        let mut found = spans(&index, &optional_fox);
        found.sort();
        // empty matches only at the positions of the Dutch version
        assert_eq!(vec![(0, 0), (1, 1), (1, 2), (2, 2)], found);
    }

    #[test]
    fn forward_index_lookup() {
        let index = example();
        assert_eq!(
            Some("NOUN".to_string()),
            index.token_value(0, "contents", "pos", 2)
        );
        assert_eq!(None, index.token_value(0, "contents", "pos", 9));
        assert_eq!(None, index.token_value(1, "contents", "pos", 0));
    }
}
